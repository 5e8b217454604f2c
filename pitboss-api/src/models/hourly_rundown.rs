use chrono::NaiveDateTime;
use diesel::{Associations, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{Money, MoneyError, TableView, UserView};
use crate::schema::hourly_rundowns;

/// Profit or loss of a table for the hour: float minus drop.
pub fn profit_loss(float_amount: Money, drop_amount: Money) -> Result<Money, MoneyError> {
    float_amount.checked_sub(drop_amount)
}

/// An hourly cash snapshot for a table.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(belongs_to(crate::models::gaming_table::GamingTable, foreign_key = table_id))]
#[diesel(table_name = hourly_rundowns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HourlyRundown {
    pub id: i32,
    pub table_id: i32,
    pub timestamp: NaiveDateTime,
    pub float_amount: Money,
    pub drop_amount: Money,
    pub profit_loss: Money, // Last persisted value of float - drop
    pub entered_by: i32,
}

impl HourlyRundown {
    /// Profit/loss computed from the stored amounts.
    pub fn computed_profit_loss(&self) -> Result<Money, MoneyError> {
        profit_loss(self.float_amount, self.drop_amount)
    }
}

#[derive(Insertable)]
#[diesel(table_name = hourly_rundowns)]
pub struct NewHourlyRundown {
    pub table_id: i32,
    pub timestamp: NaiveDateTime,
    pub float_amount: Money,
    pub drop_amount: Money,
    pub profit_loss: Money,
    pub entered_by: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RundownView {
    pub id: i32,
    pub table: TableView,
    #[ts(type = "string")]
    pub timestamp: NaiveDateTime,
    #[ts(type = "string")]
    pub float_amount: Money,
    #[ts(type = "string")]
    pub drop_amount: Money,
    #[ts(type = "string")]
    pub profit_loss: Money,
    pub entered_by: UserView,
}
