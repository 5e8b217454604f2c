//! API endpoints for gaming table management.
//!
//! # Authorization Rules
//! - Supervisors can perform every operation
//! - Everyone else receives 403

use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::error::{ApiError, Validator};
use crate::logged_json::LoggedJson;
use crate::models::{GameType, TableView};
use crate::orm::gaming_table::{
    delete_table, get_all_tables, get_table_by_id, get_table_view, get_tables_by_pit,
    insert_table, table_views, update_table,
};
use crate::orm::pit::get_pit_by_id;
use crate::session_guards::SupervisorUser;

pub const TABLE_NAME_MAX: usize = 50;

/// Request payload for creating or updating a table. `pit` is a pit id.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TableRequest {
    pub name: Option<String>,
    pub game_type: Option<String>,
    pub pit: Option<i32>,
}

fn game_type(v: &mut Validator, value: Option<&String>) -> Option<GameType> {
    match value?.parse::<GameType>() {
        Ok(g) => Some(g),
        Err(msg) => {
            v.add("game_type", msg);
            None
        }
    }
}

/// Create Table endpoint.
///
/// - **URL:** `/api/1/tables`
/// - **Method:** `POST`
/// - **Authorization:** Supervisor
///
/// ```json
/// { "name": "BJ-01", "game_type": "Blackjack", "pit": 1 }
/// ```
///
/// `game_type` is one of Blackjack, Craps, Roulette, Poker or Baccarat. An
/// unknown pit is a 404 and nothing is stored.
#[post("/1/tables", data = "<request>")]
pub async fn create_table(
    db: DbConn,
    caller: SupervisorUser,
    request: LoggedJson<TableRequest>,
) -> Result<status::Created<Json<TableView>>, ApiError> {
    let mut v = Validator::new();
    let name = v.required_text("name", request.name.as_ref(), TABLE_NAME_MAX);
    if request.game_type.is_none() {
        v.add("game_type", crate::api::error::REQUIRED);
    }
    let game = game_type(&mut v, request.game_type.as_ref());
    let pit_id = v.required("pit", request.pit);
    v.finish()?;

    let (Some(name), Some(game), Some(pit_id)) = (name, game, pit_id) else {
        return Err(ApiError::BadRequest("Invalid table".to_string()));
    };
    let creator_id = caller.user.id;

    let view = db
        .run(move |conn| {
            if get_pit_by_id(conn, pit_id)?.is_none() {
                return Err(ApiError::not_found("Pit", pit_id));
            }
            let table = insert_table(conn, name, game, pit_id, creator_id)?;
            get_table_view(conn, table.id)?.ok_or_else(|| ApiError::not_found("Table", table.id))
        })
        .await?;

    info!(
        "Table {} '{}' ({}) created in pit {} by {}",
        view.id, view.name, view.game_type, view.pit.id, caller.user.username
    );
    Ok(status::Created::new(format!("/api/1/tables/{}", view.id)).body(Json(view)))
}

/// List Tables endpoint.
///
/// - **URL:** `/api/1/tables[?pit=<pit_id>]`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor
#[get("/1/tables?<pit>")]
pub async fn list_tables(
    db: DbConn,
    _caller: SupervisorUser,
    pit: Option<i32>,
) -> Result<Json<Vec<TableView>>, ApiError> {
    let views = db
        .run(move |conn| {
            let tables = match pit {
                Some(pit_id) => get_tables_by_pit(conn, pit_id)?,
                None => get_all_tables(conn)?,
            };
            table_views(conn, tables)
        })
        .await?;
    Ok(Json(views))
}

/// Get Table endpoint.
///
/// - **URL:** `/api/1/tables/<table_id>`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor
#[get("/1/tables/<table_id>")]
pub async fn get_table(
    db: DbConn,
    _caller: SupervisorUser,
    table_id: i32,
) -> Result<Json<TableView>, ApiError> {
    db.run(move |conn| get_table_view(conn, table_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Table", table_id))
}

/// Update Table endpoint.
///
/// - **URL:** `/api/1/tables/<table_id>`
/// - **Method:** `PUT`
/// - **Authorization:** Supervisor
///
/// Only the supplied fields change. Moving the table to an unknown pit is
/// a 404.
#[put("/1/tables/<table_id>", data = "<request>")]
pub async fn update_table_endpoint(
    db: DbConn,
    _caller: SupervisorUser,
    table_id: i32,
    request: LoggedJson<TableRequest>,
) -> Result<Json<TableView>, ApiError> {
    let mut v = Validator::new();
    let name = v.text("name", request.name.as_ref(), TABLE_NAME_MAX);
    let game = game_type(&mut v, request.game_type.as_ref());
    let pit_id = request.pit;
    v.finish()?;

    db.run(move |conn| {
        if get_table_by_id(conn, table_id)?.is_none() {
            return Err(ApiError::not_found("Table", table_id));
        }
        if let Some(pit_id) = pit_id {
            if get_pit_by_id(conn, pit_id)?.is_none() {
                return Err(ApiError::not_found("Pit", pit_id));
            }
        }
        update_table(conn, table_id, name, game, pit_id)?;
        get_table_view(conn, table_id)?.ok_or_else(|| ApiError::not_found("Table", table_id))
    })
    .await
    .map(Json)
}

/// Delete Table endpoint.
///
/// - **URL:** `/api/1/tables/<table_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Supervisor
///
/// Deletes the table's rundowns and unseats its players.
#[delete("/1/tables/<table_id>")]
pub async fn delete_table_endpoint(
    db: DbConn,
    caller: SupervisorUser,
    table_id: i32,
) -> Result<Status, ApiError> {
    let deleted = db.run(move |conn| delete_table(conn, table_id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Table", table_id));
    }
    info!("Table {} deleted by {}", table_id, caller.user.username);
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        create_table,
        list_tables,
        get_table,
        update_table_endpoint,
        delete_table_endpoint
    ]
}
