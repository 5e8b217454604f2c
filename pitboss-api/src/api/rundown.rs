//! API endpoints for hourly rundowns.
//!
//! # Authorization Rules
//! - Supervisors and pit bosses can list and read rundowns
//! - Only pit bosses can create, update or delete them
//!
//! Every response carries `profit_loss = float_amount - drop_amount`.

use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::error::{ApiError, REQUIRED, Validator};
use crate::logged_json::LoggedJson;
use crate::models::{AmountInput, RundownView};
use crate::orm::gaming_table::get_table_by_id;
use crate::orm::hourly_rundown::{
    delete_rundown, get_rundown, get_rundown_view, insert_rundown, list_rundowns, rundown_views,
    update_rundown,
};
use crate::session_guards::{RundownReader, RundownWriter};

/// Request payload for recording or correcting a rundown. `table` is a
/// table id; the timestamp is always set by the server.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct RundownRequest {
    #[serde(alias = "table_id")]
    pub table: Option<i32>,
    #[ts(type = "string | number | null")]
    pub float_amount: Option<AmountInput>,
    #[ts(type = "string | number | null")]
    pub drop_amount: Option<AmountInput>,
}

/// Create Rundown endpoint.
///
/// - **URL:** `/api/1/rundowns`
/// - **Method:** `POST`
/// - **Authorization:** Pit boss
///
/// ```json
/// { "table": 5, "float_amount": "1000.00", "drop_amount": "650.00" }
/// ```
///
/// Returns 201 with `"profit_loss": "350.00"`. An unknown table is a 404.
#[post("/1/rundowns", data = "<request>")]
pub async fn create_rundown(
    db: DbConn,
    caller: RundownWriter,
    request: LoggedJson<RundownRequest>,
) -> Result<status::Created<Json<RundownView>>, ApiError> {
    let mut v = Validator::new();
    let table_id = v.required("table", request.table);
    if request.float_amount.is_none() {
        v.add("float_amount", REQUIRED);
    }
    if request.drop_amount.is_none() {
        v.add("drop_amount", REQUIRED);
    }
    let float = v.amount("float_amount", request.float_amount.as_ref());
    let drop = v.amount("drop_amount", request.drop_amount.as_ref());
    v.finish()?;

    let (Some(table_id), Some(float), Some(drop)) = (table_id, float, drop) else {
        return Err(ApiError::BadRequest("Invalid rundown".to_string()));
    };
    let entered_by = caller.user.id;

    let view = db
        .run(move |conn| {
            if get_table_by_id(conn, table_id)?.is_none() {
                return Err(ApiError::not_found("Table", table_id));
            }
            let rundown = insert_rundown(conn, table_id, float, drop, entered_by)?;
            get_rundown_view(conn, rundown.id)?
                .ok_or_else(|| ApiError::not_found("Rundown", rundown.id))
        })
        .await?;

    info!(
        "Rundown {} for table {} recorded by {}: profit_loss={}",
        view.id, view.table.id, caller.user.username, view.profit_loss
    );
    Ok(status::Created::new(format!("/api/1/rundowns/{}", view.id)).body(Json(view)))
}

/// List Rundowns endpoint.
///
/// - **URL:** `/api/1/rundowns[?table=<table_id>]`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor or pit boss
///
/// Newest first.
#[get("/1/rundowns?<table>")]
pub async fn list_rundowns_endpoint(
    db: DbConn,
    _caller: RundownReader,
    table: Option<i32>,
) -> Result<Json<Vec<RundownView>>, ApiError> {
    let views = db
        .run(move |conn| {
            let rundowns = list_rundowns(conn, table)?;
            rundown_views(conn, rundowns)
        })
        .await?;
    Ok(Json(views))
}

/// Get Rundown endpoint.
///
/// - **URL:** `/api/1/rundowns/<rundown_id>`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor or pit boss
#[get("/1/rundowns/<rundown_id>")]
pub async fn get_rundown_endpoint(
    db: DbConn,
    _caller: RundownReader,
    rundown_id: i32,
) -> Result<Json<RundownView>, ApiError> {
    db.run(move |conn| get_rundown_view(conn, rundown_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Rundown", rundown_id))
}

/// Update Rundown endpoint.
///
/// - **URL:** `/api/1/rundowns/<rundown_id>`
/// - **Method:** `PUT`
/// - **Authorization:** Pit boss
///
/// Only the supplied fields change; the timestamp never does.
#[put("/1/rundowns/<rundown_id>", data = "<request>")]
pub async fn update_rundown_endpoint(
    db: DbConn,
    _caller: RundownWriter,
    rundown_id: i32,
    request: LoggedJson<RundownRequest>,
) -> Result<Json<RundownView>, ApiError> {
    let mut v = Validator::new();
    let float = v.amount("float_amount", request.float_amount.as_ref());
    let drop = v.amount("drop_amount", request.drop_amount.as_ref());
    let table_id = request.table;
    v.finish()?;

    db.run(move |conn| {
        if get_rundown(conn, rundown_id)?.is_none() {
            return Err(ApiError::not_found("Rundown", rundown_id));
        }
        if let Some(table_id) = table_id {
            if get_table_by_id(conn, table_id)?.is_none() {
                return Err(ApiError::not_found("Table", table_id));
            }
        }
        update_rundown(conn, rundown_id, table_id, float, drop)?;
        get_rundown_view(conn, rundown_id)?
            .ok_or_else(|| ApiError::not_found("Rundown", rundown_id))
    })
    .await
    .map(Json)
}

/// Delete Rundown endpoint.
///
/// - **URL:** `/api/1/rundowns/<rundown_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Pit boss
#[delete("/1/rundowns/<rundown_id>")]
pub async fn delete_rundown_endpoint(
    db: DbConn,
    caller: RundownWriter,
    rundown_id: i32,
) -> Result<Status, ApiError> {
    let deleted = db.run(move |conn| delete_rundown(conn, rundown_id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Rundown", rundown_id));
    }
    info!("Rundown {} deleted by {}", rundown_id, caller.user.username);
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        create_rundown,
        list_rundowns_endpoint,
        get_rundown_endpoint,
        update_rundown_endpoint,
        delete_rundown_endpoint
    ]
}
