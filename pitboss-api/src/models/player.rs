use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{Money, TableView, UserView};
use crate::schema::players;

/// Whole minutes played between `start` and `end`, or 0 if either is unset.
pub fn play_time_minutes(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> i64 {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).num_seconds().div_euclid(60),
        _ => 0,
    }
}

/// A player tracked at a table by a pit boss.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(belongs_to(crate::models::gaming_table::GamingTable, foreign_key = table_id))]
#[diesel(table_name = players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Player {
    pub id: i32,
    pub name: String,
    pub table_id: Option<i32>, // Cleared when the table is removed
    pub buy_in: Money,
    pub cash_out: Money,
    pub average_bet: Money,
    pub session_start: Option<NaiveDateTime>,
    pub session_end: Option<NaiveDateTime>,
    pub reward_points: i32,
    pub description: Option<String>,
    pub entered_by: i32,
}

impl Player {
    pub fn play_time(&self) -> i64 {
        play_time_minutes(self.session_start, self.session_end)
    }
}

#[derive(Insertable)]
#[diesel(table_name = players)]
pub struct NewPlayer {
    pub name: String,
    pub table_id: Option<i32>,
    pub buy_in: Money,
    pub cash_out: Money,
    pub average_bet: Money,
    pub session_start: Option<NaiveDateTime>,
    pub session_end: Option<NaiveDateTime>,
    pub reward_points: i32,
    pub description: Option<String>,
    pub entered_by: i32,
}

/// Replacement values for a player. `None` keeps the stored value.
#[derive(Default)]
pub struct PlayerChanges {
    pub name: Option<String>,
    pub table_id: Option<i32>,
    pub buy_in: Option<Money>,
    pub cash_out: Option<Money>,
    pub average_bet: Option<Money>,
    pub session_start: Option<NaiveDateTime>,
    pub session_end: Option<NaiveDateTime>,
    pub reward_points: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerView {
    pub id: i32,
    pub name: String,
    pub table: Option<TableView>,
    #[ts(type = "string")]
    pub buy_in: Money,
    #[ts(type = "string")]
    pub cash_out: Money,
    #[ts(type = "string")]
    pub average_bet: Money,
    #[ts(type = "string | null")]
    pub session_start: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub session_end: Option<NaiveDateTime>,
    pub reward_points: i32,
    pub description: Option<String>,
    pub entered_by: UserView,
    /// Minutes between session start and end.
    pub play_time: i64,
}
