use std::collections::HashMap;

use diesel::prelude::*;

use crate::models::{GamingTable, NewPlayer, Player, PlayerChanges, PlayerView, TableView};
use crate::orm::db::{enable_foreign_keys, last_insert_id};
use crate::orm::gaming_table::table_views;
use crate::orm::user::{take_user_view, user_views_by_id};

/// Inserts a player and returns the stored row.
///
/// # Arguments
/// * `conn` - Database connection
/// * `new_player` - The player, optionally seated at a table
///
/// # Returns
/// * `Ok(Player)` - The stored player
/// * `Err(diesel::result::Error)` - A foreign key violation if the table
///   does not exist, otherwise a database error
pub fn insert_player(
    conn: &mut SqliteConnection,
    new_player: NewPlayer,
) -> Result<Player, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    enable_foreign_keys(conn)?;

    diesel::insert_into(players)
        .values(&new_player)
        .execute(conn)?;

    let last_id = last_insert_id(conn)?;
    players
        .filter(id.eq(last_id))
        .select(Player::as_select())
        .first(conn)
}

pub fn get_player(
    conn: &mut SqliteConnection,
    player_id: i32,
) -> Result<Option<Player>, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    players
        .filter(id.eq(player_id))
        .select(Player::as_select())
        .first(conn)
        .optional()
}

pub fn get_all_players(conn: &mut SqliteConnection) -> Result<Vec<Player>, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    players
        .order(id.asc())
        .select(Player::as_select())
        .load(conn)
}

/// Gets the players currently seated at a table.
pub fn get_players_by_table(
    conn: &mut SqliteConnection,
    seated_at: i32,
) -> Result<Vec<Player>, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    players
        .filter(table_id.eq(seated_at))
        .order(id.asc())
        .select(Player::as_select())
        .load(conn)
}

/// Writes every field set in `changes` over the stored player.
///
/// # Arguments
/// * `conn` - Database connection
/// * `player_id` - ID of the player to update
/// * `changes` - Fields to overwrite; `None` keeps the stored value
///
/// # Returns
/// * `Ok(Player)` - The updated player
/// * `Err(diesel::result::Error)` - `NotFound` for an unknown player, a
///   foreign key violation for an unknown table, otherwise a database error
pub fn update_player(
    conn: &mut SqliteConnection,
    player_id: i32,
    changes: PlayerChanges,
) -> Result<Player, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    enable_foreign_keys(conn)?;

    let current = players
        .filter(id.eq(player_id))
        .select(Player::as_select())
        .first(conn)?;

    diesel::update(players.filter(id.eq(player_id)))
        .set((
            name.eq(changes.name.unwrap_or(current.name)),
            table_id.eq(changes.table_id.or(current.table_id)),
            buy_in.eq(changes.buy_in.unwrap_or(current.buy_in)),
            cash_out.eq(changes.cash_out.unwrap_or(current.cash_out)),
            average_bet.eq(changes.average_bet.unwrap_or(current.average_bet)),
            session_start.eq(changes.session_start.or(current.session_start)),
            session_end.eq(changes.session_end.or(current.session_end)),
            reward_points.eq(changes.reward_points.unwrap_or(current.reward_points)),
            description.eq(changes.description.or(current.description)),
        ))
        .execute(conn)?;

    players
        .filter(id.eq(player_id))
        .select(Player::as_select())
        .first(conn)
}

pub fn delete_player(
    conn: &mut SqliteConnection,
    player_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::players::dsl::*;
    enable_foreign_keys(conn)?;
    diesel::delete(players.filter(id.eq(player_id))).execute(conn)
}

/// Builds nested views for `rows`, batching the table and user lookups.
pub fn player_views(
    conn: &mut SqliteConnection,
    rows: Vec<Player>,
) -> Result<Vec<PlayerView>, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::{gaming_tables, id as table_pk};

    let mut seated: Vec<i32> = rows.iter().filter_map(|p| p.table_id).collect();
    seated.sort_unstable();
    seated.dedup();

    let seated_tables = gaming_tables
        .filter(table_pk.eq_any(&seated))
        .select(GamingTable::as_select())
        .load(conn)?;
    let tables: HashMap<i32, TableView> = table_views(conn, seated_tables)?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let entered_ids: Vec<i32> = rows.iter().map(|p| p.entered_by).collect();
    let entered = user_views_by_id(conn, &entered_ids)?;

    rows.into_iter()
        .map(|player| {
            let play_time = player.play_time();
            let table = match player.table_id {
                Some(tid) => Some(
                    tables
                        .get(&tid)
                        .cloned()
                        .ok_or(diesel::result::Error::NotFound)?,
                ),
                None => None,
            };
            Ok(PlayerView {
                id: player.id,
                name: player.name,
                table,
                buy_in: player.buy_in,
                cash_out: player.cash_out,
                average_bet: player.average_bet,
                session_start: player.session_start,
                session_end: player.session_end,
                reward_points: player.reward_points,
                description: player.description,
                entered_by: take_user_view(&entered, player.entered_by)?,
                play_time,
            })
        })
        .collect()
}

pub fn get_player_view(
    conn: &mut SqliteConnection,
    player_id: i32,
) -> Result<Option<PlayerView>, diesel::result::Error> {
    match get_player(conn, player_id)? {
        Some(player) => Ok(player_views(conn, vec![player])?.pop()),
        None => Ok(None),
    }
}
