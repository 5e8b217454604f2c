use std::fmt;
use std::str::FromStr;

use diesel::{
    Associations, Identifiable, Insertable, Queryable, Selectable,
    deserialize::{self, FromSql},
    serialize::{self, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::{PitView, UserView};
use crate::schema::gaming_tables;

/// The game dealt at a table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TS,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
pub enum GameType {
    Blackjack,
    Craps,
    Roulette,
    Poker,
    Baccarat,
}

impl GameType {
    pub const ALL: [GameType; 5] = [
        GameType::Blackjack,
        GameType::Craps,
        GameType::Roulette,
        GameType::Poker,
        GameType::Baccarat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GameType::Blackjack => "Blackjack",
            GameType::Craps => "Craps",
            GameType::Roulette => "Roulette",
            GameType::Poker => "Poker",
            GameType::Baccarat => "Baccarat",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("\"{}\" is not a valid choice.", s))
    }
}

impl ToSql<Text, Sqlite> for GameType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for GameType {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(s.parse::<GameType>()?)
    }
}

/// A gaming table inside a pit.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(belongs_to(crate::models::pit::Pit))]
#[diesel(table_name = gaming_tables)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GamingTable {
    pub id: i32,
    pub name: String,
    pub game_type: GameType,
    pub pit_id: i32, // Foreign key to Pit
    pub created_by: i32,
}

#[derive(Insertable)]
#[diesel(table_name = gaming_tables)]
pub struct NewGamingTable {
    pub name: String,
    pub game_type: GameType,
    pub pit_id: i32,
    pub created_by: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableView {
    pub id: i32,
    pub name: String,
    pub game_type: GameType,
    pub pit: PitView,
    pub created_by: UserView,
}
