use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::UserView;
use crate::schema::pits;

/// A named area of the floor grouping gaming tables.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(belongs_to(crate::models::user::User, foreign_key = created_by))]
#[diesel(table_name = pits)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Pit {
    pub id: i32,
    pub name: String,
    pub created_by: i32,
}

#[derive(Insertable)]
#[diesel(table_name = pits)]
pub struct NewPit {
    pub name: String,
    pub created_by: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PitView {
    pub id: i32,
    pub name: String,
    pub created_by: UserView,
}
