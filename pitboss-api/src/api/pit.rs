//! API endpoints for pit management.
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
use crate::api::error::{ApiError, Validator, is_unique_violation};
use crate::logged_json::LoggedJson;
use crate::models::PitView;
use crate::orm::pit::{
    delete_pit, get_all_pits, get_pit_by_id, get_pit_by_name, get_pit_view, insert_pit, pit_views,
    update_pit,
};
use crate::session_guards::SupervisorUser;

pub const PIT_NAME_MAX: usize = 50;
const DUPLICATE_NAME: &str = "pit with this name already exists.";

/// Request payload for creating or updating a pit.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct PitRequest {
    pub name: Option<String>,
}

fn duplicate_name(e: diesel::result::Error) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::field("name", DUPLICATE_NAME)
    } else {
        ApiError::from(e)
    }
}

/// Create Pit endpoint.
///
/// - **URL:** `/api/1/pits`
/// - **Method:** `POST`
/// - **Authorization:** Supervisor
///
/// ```json
/// { "name": "High Limit" }
/// ```
///
/// Returns 201 with the pit view; its creator is the caller. A name that is
/// already taken is a 400 on `name`.
#[post("/1/pits", data = "<request>")]
pub async fn create_pit(
    db: DbConn,
    caller: SupervisorUser,
    request: LoggedJson<PitRequest>,
) -> Result<status::Created<Json<PitView>>, ApiError> {
    let mut v = Validator::new();
    let name = v.required_text("name", request.name.as_ref(), PIT_NAME_MAX);
    v.finish()?;
    let name = name.unwrap_or_default();
    let creator_id = caller.user.id;

    let view = db
        .run(move |conn| {
            if get_pit_by_name(conn, &name)?.is_some() {
                return Err(ApiError::field("name", DUPLICATE_NAME));
            }
            let pit = insert_pit(conn, name, creator_id).map_err(duplicate_name)?;
            get_pit_view(conn, pit.id)?.ok_or_else(|| ApiError::not_found("Pit", pit.id))
        })
        .await?;

    info!("Pit {} '{}' created by {}", view.id, view.name, caller.user.username);
    Ok(status::Created::new(format!("/api/1/pits/{}", view.id)).body(Json(view)))
}

/// List Pits endpoint.
///
/// - **URL:** `/api/1/pits`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor
#[get("/1/pits")]
pub async fn list_pits(db: DbConn, _caller: SupervisorUser) -> Result<Json<Vec<PitView>>, ApiError> {
    let views = db
        .run(|conn| {
            let pits = get_all_pits(conn)?;
            pit_views(conn, pits)
        })
        .await?;
    Ok(Json(views))
}

/// Get Pit endpoint.
///
/// - **URL:** `/api/1/pits/<pit_id>`
/// - **Method:** `GET`
/// - **Authorization:** Supervisor
#[get("/1/pits/<pit_id>")]
pub async fn get_pit(
    db: DbConn,
    _caller: SupervisorUser,
    pit_id: i32,
) -> Result<Json<PitView>, ApiError> {
    db.run(move |conn| get_pit_view(conn, pit_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Pit", pit_id))
}

/// Update Pit endpoint.
///
/// - **URL:** `/api/1/pits/<pit_id>`
/// - **Method:** `PUT`
/// - **Authorization:** Supervisor
///
/// An absent `name` leaves the pit unchanged.
#[put("/1/pits/<pit_id>", data = "<request>")]
pub async fn update_pit_endpoint(
    db: DbConn,
    _caller: SupervisorUser,
    pit_id: i32,
    request: LoggedJson<PitRequest>,
) -> Result<Json<PitView>, ApiError> {
    let mut v = Validator::new();
    let name = v.text("name", request.name.as_ref(), PIT_NAME_MAX);
    v.finish()?;

    db.run(move |conn| {
        if get_pit_by_id(conn, pit_id)?.is_none() {
            return Err(ApiError::not_found("Pit", pit_id));
        }
        if let Some(new_name) = &name {
            if let Some(existing) = get_pit_by_name(conn, new_name)? {
                if existing.id != pit_id {
                    return Err(ApiError::field("name", DUPLICATE_NAME));
                }
            }
        }
        update_pit(conn, pit_id, name).map_err(duplicate_name)?;
        get_pit_view(conn, pit_id)?.ok_or_else(|| ApiError::not_found("Pit", pit_id))
    })
    .await
    .map(Json)
}

/// Delete Pit endpoint.
///
/// - **URL:** `/api/1/pits/<pit_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Supervisor
///
/// The pit's tables, and their rundowns, are deleted with it.
#[delete("/1/pits/<pit_id>")]
pub async fn delete_pit_endpoint(
    db: DbConn,
    caller: SupervisorUser,
    pit_id: i32,
) -> Result<Status, ApiError> {
    let deleted = db.run(move |conn| delete_pit(conn, pit_id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Pit", pit_id));
    }
    info!("Pit {} deleted by {}", pit_id, caller.user.username);
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        create_pit,
        list_pits,
        get_pit,
        update_pit_endpoint,
        delete_pit_endpoint
    ]
}
