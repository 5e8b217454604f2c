//! Hourly rundowns.
//!
//! `profit_loss` is written together with `float_amount` and `drop_amount`
//! on every insert and update. Reads go through [`rundown_views`], which
//! repairs a stored value that no longer matches the amounts.

use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;

use crate::models::{
    GamingTable, HourlyRundown, Money, MoneyError, NewHourlyRundown, RundownView, TableView,
    profit_loss as compute_profit_loss,
};
use crate::orm::db::{enable_foreign_keys, last_insert_id};
use crate::orm::gaming_table::table_views;
use crate::orm::user::{take_user_view, user_views_by_id};

fn money_error(e: MoneyError) -> diesel::result::Error {
    diesel::result::Error::SerializationError(Box::new(e))
}

/// Records a rundown for `rundown_table_id`, stamped with the current time.
///
/// # Arguments
/// * `conn` - Database connection
/// * `rundown_table_id` - ID of the table counted
/// * `float` - Chips in the tray
/// * `drop` - Cash dropped into the box
/// * `entered_by_id` - ID of the pit boss recording it
///
/// # Returns
/// * `Ok(HourlyRundown)` - The stored rundown with its profit/loss
/// * `Err(diesel::result::Error)` - A foreign key violation if the table
///   does not exist, otherwise a database error
pub fn insert_rundown(
    conn: &mut SqliteConnection,
    rundown_table_id: i32,
    float: Money,
    drop: Money,
    entered_by_id: i32,
) -> Result<HourlyRundown, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;
    enable_foreign_keys(conn)?;

    let new_rundown = NewHourlyRundown {
        table_id: rundown_table_id,
        timestamp: Utc::now().naive_utc(),
        float_amount: float,
        drop_amount: drop,
        profit_loss: compute_profit_loss(float, drop).map_err(money_error)?,
        entered_by: entered_by_id,
    };

    diesel::insert_into(hourly_rundowns)
        .values(&new_rundown)
        .execute(conn)?;

    let last_id = last_insert_id(conn)?;
    hourly_rundowns
        .filter(id.eq(last_id))
        .select(HourlyRundown::as_select())
        .first(conn)
}

pub fn get_rundown(
    conn: &mut SqliteConnection,
    rundown_id: i32,
) -> Result<Option<HourlyRundown>, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;
    hourly_rundowns
        .filter(id.eq(rundown_id))
        .select(HourlyRundown::as_select())
        .first(conn)
        .optional()
}

/// Lists rundowns newest first, optionally only those of one table.
pub fn list_rundowns(
    conn: &mut SqliteConnection,
    for_table: Option<i32>,
) -> Result<Vec<HourlyRundown>, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;

    let mut query = hourly_rundowns
        .select(HourlyRundown::as_select())
        .order((timestamp.desc(), id.desc()))
        .into_boxed();
    if let Some(tid) = for_table {
        query = query.filter(table_id.eq(tid));
    }
    query.load(conn)
}

/// Changes the amounts and/or table of a rundown and stores the new
/// profit/loss. The timestamp is never touched.
///
/// # Arguments
/// * `conn` - Database connection
/// * `rundown_id` - ID of the rundown to update
/// * `new_table_id` - Optional table to move the rundown to
/// * `new_float` - Optional new float amount
/// * `new_drop` - Optional new drop amount
///
/// # Returns
/// * `Ok(HourlyRundown)` - The updated rundown
/// * `Err(diesel::result::Error)` - `NotFound` for an unknown rundown, a
///   foreign key violation for an unknown table, otherwise a database error
pub fn update_rundown(
    conn: &mut SqliteConnection,
    rundown_id: i32,
    new_table_id: Option<i32>,
    new_float: Option<Money>,
    new_drop: Option<Money>,
) -> Result<HourlyRundown, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;
    enable_foreign_keys(conn)?;

    let current = hourly_rundowns
        .filter(id.eq(rundown_id))
        .select(HourlyRundown::as_select())
        .first(conn)?;

    let float = new_float.unwrap_or(current.float_amount);
    let drop = new_drop.unwrap_or(current.drop_amount);

    diesel::update(hourly_rundowns.filter(id.eq(rundown_id)))
        .set((
            table_id.eq(new_table_id.unwrap_or(current.table_id)),
            float_amount.eq(float),
            drop_amount.eq(drop),
            profit_loss.eq(compute_profit_loss(float, drop).map_err(money_error)?),
        ))
        .execute(conn)?;

    hourly_rundowns
        .filter(id.eq(rundown_id))
        .select(HourlyRundown::as_select())
        .first(conn)
}

pub fn delete_rundown(
    conn: &mut SqliteConnection,
    rundown_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;
    enable_foreign_keys(conn)?;
    diesel::delete(hourly_rundowns.filter(id.eq(rundown_id))).execute(conn)
}

/// Makes sure the stored profit/loss of `rundown` equals float minus drop.
///
/// Only a row that disagrees is written back.
pub fn refresh_profit_loss(
    conn: &mut SqliteConnection,
    mut rundown: HourlyRundown,
) -> Result<HourlyRundown, diesel::result::Error> {
    use crate::schema::hourly_rundowns::dsl::*;

    let computed = rundown.computed_profit_loss().map_err(money_error)?;
    if rundown.profit_loss != computed {
        warn!(
            "Rundown {} had stale profit_loss {} (expected {}), repairing",
            rundown.id, rundown.profit_loss, computed
        );
        diesel::update(hourly_rundowns.filter(id.eq(rundown.id)))
            .set(profit_loss.eq(computed))
            .execute(conn)?;
        rundown.profit_loss = computed;
    }
    Ok(rundown)
}

/// Builds nested views for `rows`. Stale profit/loss values are repaired
/// first, so every view carries float minus drop.
pub fn rundown_views(
    conn: &mut SqliteConnection,
    rows: Vec<HourlyRundown>,
) -> Result<Vec<RundownView>, diesel::result::Error> {
    use crate::schema::gaming_tables::dsl::{gaming_tables, id as table_pk};

    let rows = rows
        .into_iter()
        .map(|r| refresh_profit_loss(conn, r))
        .collect::<Result<Vec<_>, _>>()?;

    let mut table_ids: Vec<i32> = rows.iter().map(|r| r.table_id).collect();
    table_ids.sort_unstable();
    table_ids.dedup();

    let owning_tables = gaming_tables
        .filter(table_pk.eq_any(&table_ids))
        .select(GamingTable::as_select())
        .load(conn)?;
    let tables: HashMap<i32, TableView> = table_views(conn, owning_tables)?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let entered_ids: Vec<i32> = rows.iter().map(|r| r.entered_by).collect();
    let entered = user_views_by_id(conn, &entered_ids)?;

    rows.into_iter()
        .map(|rundown| {
            Ok(RundownView {
                id: rundown.id,
                table: tables
                    .get(&rundown.table_id)
                    .cloned()
                    .ok_or(diesel::result::Error::NotFound)?,
                timestamp: rundown.timestamp,
                float_amount: rundown.float_amount,
                drop_amount: rundown.drop_amount,
                profit_loss: rundown.profit_loss,
                entered_by: take_user_view(&entered, rundown.entered_by)?,
            })
        })
        .collect()
}

pub fn get_rundown_view(
    conn: &mut SqliteConnection,
    rundown_id: i32,
) -> Result<Option<RundownView>, diesel::result::Error> {
    match get_rundown(conn, rundown_id)? {
        Some(rundown) => Ok(rundown_views(conn, vec![rundown])?.pop()),
        None => Ok(None),
    }
}
