use std::fmt;
use std::str::FromStr;

use diesel::{
    deserialize::{self, FromSql},
    serialize::{self, Output, ToSql},
    sql_types::Text,
    sqlite::Sqlite,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The floor role held by a user. A user holds at most one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    diesel::expression::AsExpression,
    diesel::deserialize::FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Supervisor,
    PitBoss,
}

/// Something an endpoint may require of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, edit and remove pits and tables.
    ManageFloor,
    /// Read hourly rundowns.
    ViewRundowns,
    /// Create, edit and remove players.
    ManagePlayers,
    /// Create, edit and remove hourly rundowns.
    SubmitRundowns,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Supervisor, Role::PitBoss];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Supervisor => "supervisor",
            Role::PitBoss => "pit_boss",
        }
    }

    /// Exhaustive capability table. Adding a role or a capability makes this
    /// fail to compile until the new pairings are decided.
    pub fn grants(self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Supervisor, Capability::ManageFloor) => true,
            (Role::Supervisor, Capability::ViewRundowns) => true,
            (Role::Supervisor, Capability::ManagePlayers) => false,
            (Role::Supervisor, Capability::SubmitRundowns) => false,
            (Role::PitBoss, Capability::ManageFloor) => false,
            (Role::PitBoss, Capability::ViewRundowns) => true,
            (Role::PitBoss, Capability::ManagePlayers) => true,
            (Role::PitBoss, Capability::SubmitRundowns) => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "supervisor" => Ok(Role::Supervisor),
            "pit_boss" => Ok(Role::PitBoss),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl ToSql<Text, Sqlite> for Role {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(serialize::IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Role {
    fn from_sql(
        bytes: <Sqlite as diesel::backend::Backend>::RawValue<'_>,
    ) -> deserialize::Result<Self> {
        let s = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(s.parse::<Role>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_mutually_exclusive_for_floor_work() {
        for capability in [Capability::ManageFloor, Capability::ManagePlayers] {
            let holders: Vec<Role> = Role::ALL
                .into_iter()
                .filter(|r| r.grants(capability))
                .collect();
            assert_eq!(holders.len(), 1, "{:?} held by {:?}", capability, holders);
        }
        assert!(Role::Supervisor.grants(Capability::ManageFloor));
        assert!(Role::PitBoss.grants(Capability::ManagePlayers));
        assert!(Role::PitBoss.grants(Capability::SubmitRundowns));
        assert!(!Role::Supervisor.grants(Capability::SubmitRundowns));
    }

    #[test]
    fn test_both_roles_view_rundowns() {
        assert!(Role::ALL.iter().all(|r| r.grants(Capability::ViewRundowns)));
    }

    #[test]
    fn test_role_string_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("Supervisor".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&Role::PitBoss).unwrap(),
            "\"pit_boss\""
        );
    }
}
