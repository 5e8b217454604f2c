use std::collections::HashMap;

use diesel::prelude::*;

use crate::models::{GameType, GamingTable, NewGamingTable, Pit, PitView, TableView};
use crate::orm::db::{enable_foreign_keys, last_insert_id};
use crate::orm::pit::pit_views;
use crate::orm::user::{take_user_view, user_views_by_id};

/// Creates a table in `table_pit_id`.
///
/// # Arguments
/// * `conn` - Database connection
/// * `table_name` - Display name of the table
/// * `table_game_type` - Game dealt at the table
/// * `table_pit_id` - ID of the pit the table stands in
/// * `creator_id` - ID of the supervisor creating it
///
/// # Returns
/// * `Ok(GamingTable)` - The stored table
/// * `Err(diesel::result::Error)` - A foreign key violation if the pit does
///   not exist, otherwise a database error
pub fn insert_table(
    conn: &mut SqliteConnection,
    table_name: String,
    table_game_type: GameType,
    table_pit_id: i32,
    creator_id: i32,
) -> Result<GamingTable, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    enable_foreign_keys(conn)?;

    let new_table = NewGamingTable {
        name: table_name,
        game_type: table_game_type,
        pit_id: table_pit_id,
        created_by: creator_id,
    };

    diesel::insert_into(gaming_tables)
        .values(&new_table)
        .execute(conn)?;

    let last_id = last_insert_id(conn)?;
    gaming_tables
        .filter(id.eq(last_id))
        .select(GamingTable::as_select())
        .first(conn)
}

pub fn get_table_by_id(
    conn: &mut SqliteConnection,
    table_id: i32,
) -> Result<Option<GamingTable>, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    gaming_tables
        .filter(id.eq(table_id))
        .select(GamingTable::as_select())
        .first(conn)
        .optional()
}

pub fn get_all_tables(
    conn: &mut SqliteConnection,
) -> Result<Vec<GamingTable>, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    gaming_tables
        .order(id.asc())
        .select(GamingTable::as_select())
        .load(conn)
}

/// Gets all tables in a pit.
pub fn get_tables_by_pit(
    conn: &mut SqliteConnection,
    table_pit_id: i32,
) -> Result<Vec<GamingTable>, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    gaming_tables
        .filter(pit_id.eq(table_pit_id))
        .order(id.asc())
        .select(GamingTable::as_select())
        .load(conn)
}

/// Updates a table, keeping stored values for every `None`.
///
/// # Arguments
/// * `conn` - Database connection
/// * `table_id` - ID of the table to update
/// * `new_name` - Optional new name
/// * `new_game_type` - Optional new game
/// * `new_pit_id` - Optional pit to move the table to
///
/// # Returns
/// * `Ok(GamingTable)` - The updated table
/// * `Err(diesel::result::Error)` - `NotFound` for an unknown table, a
///   foreign key violation for an unknown pit, otherwise a database error
pub fn update_table(
    conn: &mut SqliteConnection,
    table_id: i32,
    new_name: Option<String>,
    new_game_type: Option<GameType>,
    new_pit_id: Option<i32>,
) -> Result<GamingTable, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    enable_foreign_keys(conn)?;

    let current = gaming_tables
        .filter(id.eq(table_id))
        .select(GamingTable::as_select())
        .first(conn)?;

    diesel::update(gaming_tables.filter(id.eq(table_id)))
        .set((
            name.eq(new_name.unwrap_or(current.name)),
            game_type.eq(new_game_type.unwrap_or(current.game_type)),
            pit_id.eq(new_pit_id.unwrap_or(current.pit_id)),
        ))
        .execute(conn)?;

    gaming_tables
        .filter(id.eq(table_id))
        .select(GamingTable::as_select())
        .first(conn)
}

/// Deletes a table. Its rundowns are deleted and its players are detached.
pub fn delete_table(
    conn: &mut SqliteConnection,
    table_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::*;
    enable_foreign_keys(conn)?;
    diesel::delete(gaming_tables.filter(id.eq(table_id))).execute(conn)
}

/// Builds nested views for `rows`: each embeds its pit (with that pit's
/// creator) and its own creator.
pub fn table_views(
    conn: &mut SqliteConnection,
    rows: Vec<GamingTable>,
) -> Result<Vec<TableView>, diesel::result::Error> {
    use crate::schema::pits::dsl::{id as pit_pk, pits};

    let mut pit_ids: Vec<i32> = rows.iter().map(|t| t.pit_id).collect();
    pit_ids.sort_unstable();
    pit_ids.dedup();

    let parent_pits = pits
        .filter(pit_pk.eq_any(&pit_ids))
        .select(Pit::as_select())
        .load(conn)?;
    let parent_views: HashMap<i32, PitView> = pit_views(conn, parent_pits)?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let creator_ids: Vec<i32> = rows.iter().map(|t| t.created_by).collect();
    let creators = user_views_by_id(conn, &creator_ids)?;

    rows.into_iter()
        .map(|table| {
            let pit = parent_views
                .get(&table.pit_id)
                .cloned()
                .ok_or(diesel::result::Error::NotFound)?;
            Ok(TableView {
                id: table.id,
                name: table.name,
                game_type: table.game_type,
                pit,
                created_by: take_user_view(&creators, table.created_by)?,
            })
        })
        .collect()
}

pub fn get_table_view(
    conn: &mut SqliteConnection,
    table_id: i32,
) -> Result<Option<TableView>, diesel::result::Error> {
    match get_table_by_id(conn, table_id)? {
        Some(table) => Ok(table_views(conn, vec![table])?.pop()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::orm::pit::{delete_pit, insert_pit};
    use crate::orm::testing::{create_test_user, setup_test_db};

    #[test]
    fn test_insert_table_and_nested_view() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let pit = insert_pit(&mut conn, "Pit 1".to_string(), sup.id).unwrap();

        let table = insert_table(&mut conn, "BJ-01".to_string(), GameType::Blackjack, pit.id, sup.id)
            .expect("insert table");
        assert_eq!(table.game_type, GameType::Blackjack);

        let view = get_table_view(&mut conn, table.id).unwrap().unwrap();
        assert_eq!(view.name, "BJ-01");
        assert_eq!(view.pit.id, pit.id);
        assert_eq!(view.pit.name, "Pit 1");
        assert_eq!(view.pit.created_by.username, "sup");
        assert_eq!(view.created_by.id, sup.id);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["game_type"], "Blackjack");
        assert_eq!(json["pit"]["created_by"]["username"], "sup");
    }

    #[test]
    fn test_insert_table_rejects_missing_pit() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);

        let result = insert_table(&mut conn, "Orphan".to_string(), GameType::Craps, 4242, sup.id);
        assert!(result.is_err());
        assert!(get_all_tables(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_update_table_keeps_unset_fields() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let pit_a = insert_pit(&mut conn, "A".to_string(), sup.id).unwrap();
        let pit_b = insert_pit(&mut conn, "B".to_string(), sup.id).unwrap();
        let table = insert_table(&mut conn, "R-1".to_string(), GameType::Roulette, pit_a.id, sup.id)
            .unwrap();

        let moved = update_table(&mut conn, table.id, None, None, Some(pit_b.id)).unwrap();
        assert_eq!(moved.name, "R-1");
        assert_eq!(moved.game_type, GameType::Roulette);
        assert_eq!(moved.pit_id, pit_b.id);

        let renamed =
            update_table(&mut conn, table.id, Some("P-1".to_string()), Some(GameType::Poker), None)
                .unwrap();
        assert_eq!(renamed.name, "P-1");
        assert_eq!(renamed.game_type, GameType::Poker);
        assert_eq!(renamed.pit_id, pit_b.id);

        assert_eq!(get_tables_by_pit(&mut conn, pit_a.id).unwrap().len(), 0);
        assert_eq!(get_tables_by_pit(&mut conn, pit_b.id).unwrap().len(), 1);
    }

    #[test]
    fn test_deleting_pit_cascades_to_tables() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let pit = insert_pit(&mut conn, "Gone".to_string(), sup.id).unwrap();
        insert_table(&mut conn, "T1".to_string(), GameType::Baccarat, pit.id, sup.id).unwrap();
        insert_table(&mut conn, "T2".to_string(), GameType::Craps, pit.id, sup.id).unwrap();

        delete_pit(&mut conn, pit.id).unwrap();
        assert!(get_all_tables(&mut conn).unwrap().is_empty());
    }
}
