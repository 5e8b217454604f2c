use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::Role;
use crate::schema::users;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i32,
    pub username: String, // Will be unique
    pub email: String,
    pub password_hash: String,
    pub role: Option<Role>,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<Role>,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

// For account creation from the API, the admin CLI and start-up seeding
pub struct UserInput {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Option<Role>,
    pub is_staff: bool,
}

/// Public representation of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}
