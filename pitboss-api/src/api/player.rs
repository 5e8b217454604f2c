//! API endpoints for player tracking.
//!
//! # Authorization Rules
//! - Pit bosses can perform every operation
//! - Everyone else receives 403
//!
//! `PATCH /api/1/players/<id>` adjusts funds: `buy_in` is added to the stored
//! buy-in while `cash_out` replaces the stored cash-out. `PUT` replaces every
//! supplied field, buy-in included.

use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::error::{ApiError, Validator};
use crate::logged_json::LoggedJson;
use crate::models::{AmountInput, Money, NewPlayer, PlayerChanges, PlayerView};
use crate::orm::gaming_table::get_table_by_id;
use crate::orm::player::{
    delete_player, get_all_players, get_player, get_player_view, get_players_by_table,
    insert_player, player_views, update_player,
};
use crate::session_guards::PitBossUser;

pub const PLAYER_NAME_MAX: usize = 100;
const SESSION_ORDER: &str = "Session end must not be before session start.";

/// Request payload for creating or replacing a player. Amounts may be sent
/// as strings (`"250.00"`) or numbers; `table` is a table id.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct PlayerRequest {
    pub name: Option<String>,
    pub table: Option<i32>,
    #[ts(type = "string | number | null")]
    pub buy_in: Option<AmountInput>,
    #[ts(type = "string | number | null")]
    pub cash_out: Option<AmountInput>,
    #[ts(type = "string | number | null")]
    pub average_bet: Option<AmountInput>,
    pub session_start: Option<String>,
    pub session_end: Option<String>,
    pub reward_points: Option<i32>,
    pub description: Option<String>,
}

/// Request payload for the funds update.
#[derive(Deserialize, Serialize, TS)]
#[ts(export)]
pub struct FundsRequest {
    /// Amount to add to the stored buy-in; may be negative.
    #[ts(type = "string | number | null")]
    pub buy_in: Option<AmountInput>,
    /// New cash-out total.
    #[ts(type = "string | number | null")]
    pub cash_out: Option<AmountInput>,
}

/// Adds `delta` to a stored buy-in. The result may not be negative.
pub fn apply_buy_in(stored: Money, delta: Money) -> Result<Money, String> {
    let total = stored.checked_add(delta).map_err(|e| e.to_string())?;
    if total.is_negative() {
        return Err("Buy-in cannot drop below 0.".to_string());
    }
    Ok(total)
}

fn check_session_order(
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<(), ApiError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ApiError::field("session_end", SESSION_ORDER)),
        _ => Ok(()),
    }
}

fn ensure_table(conn: &mut SqliteConnection, table_id: Option<i32>) -> Result<(), ApiError> {
    if let Some(table_id) = table_id {
        if get_table_by_id(conn, table_id)?.is_none() {
            return Err(ApiError::not_found("Table", table_id));
        }
    }
    Ok(())
}

/// Checks every field of `request`. `name` is mandatory when `creating`.
fn validate_player(request: &PlayerRequest, creating: bool) -> Result<PlayerChanges, ApiError> {
    let mut v = Validator::new();
    let name = if creating {
        v.required_text("name", request.name.as_ref(), PLAYER_NAME_MAX)
    } else {
        v.text("name", request.name.as_ref(), PLAYER_NAME_MAX)
    };
    let changes = PlayerChanges {
        name,
        table_id: request.table,
        buy_in: v.amount("buy_in", request.buy_in.as_ref()),
        cash_out: v.amount("cash_out", request.cash_out.as_ref()),
        average_bet: v.amount("average_bet", request.average_bet.as_ref()),
        session_start: v.datetime("session_start", request.session_start.as_ref()),
        session_end: v.datetime("session_end", request.session_end.as_ref()),
        reward_points: v.non_negative("reward_points", request.reward_points),
        description: request.description.clone(),
    };
    v.finish()?;
    Ok(changes)
}

/// Create Player endpoint.
///
/// - **URL:** `/api/1/players`
/// - **Method:** `POST`
/// - **Authorization:** Pit boss
///
/// ```json
/// {
///   "name": "Ada",
///   "table": 3,
///   "buy_in": "500.00",
///   "average_bet": "25.00",
///   "session_start": "2025-03-14T20:00:00Z"
/// }
/// ```
///
/// Only `name` is required. Omitted amounts default to 0.00 and omitted
/// reward points to 0.
#[post("/1/players", data = "<request>")]
pub async fn create_player(
    db: DbConn,
    caller: PitBossUser,
    request: LoggedJson<PlayerRequest>,
) -> Result<status::Created<Json<PlayerView>>, ApiError> {
    let fields = validate_player(&request, true)?;
    check_session_order(fields.session_start, fields.session_end)?;

    let new_player = NewPlayer {
        name: fields.name.unwrap_or_default(),
        table_id: fields.table_id,
        buy_in: fields.buy_in.unwrap_or(Money::ZERO),
        cash_out: fields.cash_out.unwrap_or(Money::ZERO),
        average_bet: fields.average_bet.unwrap_or(Money::ZERO),
        session_start: fields.session_start,
        session_end: fields.session_end,
        reward_points: fields.reward_points.unwrap_or(0),
        description: fields.description,
        entered_by: caller.user.id,
    };

    let view = db
        .run(move |conn| {
            ensure_table(conn, new_player.table_id)?;
            let player = insert_player(conn, new_player)?;
            get_player_view(conn, player.id)?.ok_or_else(|| ApiError::not_found("Player", player.id))
        })
        .await?;

    info!("Player {} '{}' entered by {}", view.id, view.name, caller.user.username);
    Ok(status::Created::new(format!("/api/1/players/{}", view.id)).body(Json(view)))
}

/// List Players endpoint.
///
/// - **URL:** `/api/1/players[?table=<table_id>]`
/// - **Method:** `GET`
/// - **Authorization:** Pit boss
#[get("/1/players?<table>")]
pub async fn list_players(
    db: DbConn,
    _caller: PitBossUser,
    table: Option<i32>,
) -> Result<Json<Vec<PlayerView>>, ApiError> {
    let views = db
        .run(move |conn| {
            let players = match table {
                Some(table_id) => get_players_by_table(conn, table_id)?,
                None => get_all_players(conn)?,
            };
            player_views(conn, players)
        })
        .await?;
    Ok(Json(views))
}

/// Get Player endpoint.
///
/// - **URL:** `/api/1/players/<player_id>`
/// - **Method:** `GET`
/// - **Authorization:** Pit boss
#[get("/1/players/<player_id>")]
pub async fn get_player_endpoint(
    db: DbConn,
    _caller: PitBossUser,
    player_id: i32,
) -> Result<Json<PlayerView>, ApiError> {
    db.run(move |conn| get_player_view(conn, player_id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Player", player_id))
}

/// Update Player endpoint.
///
/// - **URL:** `/api/1/players/<player_id>`
/// - **Method:** `PUT`
/// - **Authorization:** Pit boss
///
/// Every supplied field replaces the stored value.
#[put("/1/players/<player_id>", data = "<request>")]
pub async fn update_player_endpoint(
    db: DbConn,
    _caller: PitBossUser,
    player_id: i32,
    request: LoggedJson<PlayerRequest>,
) -> Result<Json<PlayerView>, ApiError> {
    let changes = validate_player(&request, false)?;

    db.run(move |conn| {
        let current =
            get_player(conn, player_id)?.ok_or_else(|| ApiError::not_found("Player", player_id))?;
        ensure_table(conn, changes.table_id)?;
        check_session_order(
            changes.session_start.or(current.session_start),
            changes.session_end.or(current.session_end),
        )?;
        update_player(conn, player_id, changes)?;
        get_player_view(conn, player_id)?.ok_or_else(|| ApiError::not_found("Player", player_id))
    })
    .await
    .map(Json)
}

/// Update Player Funds endpoint.
///
/// - **URL:** `/api/1/players/<player_id>`
/// - **Method:** `PATCH`
/// - **Authorization:** Pit boss
///
/// ```json
/// { "buy_in": "100.00", "cash_out": "40.00" }
/// ```
///
/// `buy_in` is added to the stored buy-in (a negative value takes money
/// off, but the total may not go below 0). `cash_out` replaces the stored
/// cash-out.
#[patch("/1/players/<player_id>", data = "<request>")]
pub async fn update_player_funds(
    db: DbConn,
    caller: PitBossUser,
    player_id: i32,
    request: LoggedJson<FundsRequest>,
) -> Result<Json<PlayerView>, ApiError> {
    let mut v = Validator::new();
    let delta = v.signed_amount("buy_in", request.buy_in.as_ref());
    let cash_out = v.amount("cash_out", request.cash_out.as_ref());
    v.finish()?;

    let view = db
        .run(move |conn| {
            let current = get_player(conn, player_id)?
                .ok_or_else(|| ApiError::not_found("Player", player_id))?;

            let buy_in = match delta {
                Some(delta) => Some(
                    apply_buy_in(current.buy_in, delta)
                        .map_err(|msg| ApiError::field("buy_in", msg))?,
                ),
                None => None,
            };

            update_player(
                conn,
                player_id,
                PlayerChanges {
                    buy_in,
                    cash_out,
                    ..Default::default()
                },
            )?;
            get_player_view(conn, player_id)?
                .ok_or_else(|| ApiError::not_found("Player", player_id))
        })
        .await?;

    info!(
        "Player {} funds updated by {}: buy_in={} cash_out={}",
        view.id, caller.user.username, view.buy_in, view.cash_out
    );
    Ok(Json(view))
}

/// Delete Player endpoint.
///
/// - **URL:** `/api/1/players/<player_id>`
/// - **Method:** `DELETE`
/// - **Authorization:** Pit boss
#[delete("/1/players/<player_id>")]
pub async fn delete_player_endpoint(
    db: DbConn,
    caller: PitBossUser,
    player_id: i32,
) -> Result<Status, ApiError> {
    let deleted = db.run(move |conn| delete_player(conn, player_id)).await?;
    if deleted == 0 {
        return Err(ApiError::not_found("Player", player_id));
    }
    info!("Player {} deleted by {}", player_id, caller.user.username);
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![
        create_player,
        list_players,
        get_player_endpoint,
        update_player_endpoint,
        update_player_funds,
        delete_player_endpoint
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_buy_in_deltas_accumulate() {
        let start = money("100.00");
        let stepwise = apply_buy_in(apply_buy_in(start, money("25.50")).unwrap(), money("74.50"))
            .unwrap();
        let combined = apply_buy_in(start, money("100.00")).unwrap();
        assert_eq!(stepwise, combined);
        assert_eq!(stepwise, money("200.00"));
    }

    #[test]
    fn test_buy_in_cannot_go_negative() {
        assert_eq!(apply_buy_in(money("10.00"), money("-10.00")), Ok(Money::ZERO));
        assert!(apply_buy_in(money("10.00"), money("-10.01")).is_err());
    }

    #[test]
    fn test_validate_player_reports_bad_fields() {
        let request = PlayerRequest {
            name: None,
            table: None,
            buy_in: Some(AmountInput::Text("abc".to_string())),
            cash_out: None,
            average_bet: Some(AmountInput::Text("-5".to_string())),
            session_start: Some("not a date".to_string()),
            session_end: None,
            reward_points: Some(-1),
            description: None,
        };

        match validate_player(&request, true) {
            Err(ApiError::Validation(fields)) => {
                let mut names: Vec<&str> = fields.keys().map(String::as_str).collect();
                names.sort_unstable();
                assert_eq!(
                    names,
                    vec!["average_bet", "buy_in", "name", "reward_points", "session_start"]
                );
            }
            _ => panic!("expected validation errors"),
        }

        // The same body without a name is fine for an update
        let partial = PlayerRequest {
            name: None,
            table: Some(2),
            buy_in: None,
            cash_out: None,
            average_bet: None,
            session_start: None,
            session_end: None,
            reward_points: Some(3),
            description: Some("regular".to_string()),
        };
        let changes = validate_player(&partial, false).unwrap();
        assert_eq!(changes.table_id, Some(2));
        assert_eq!(changes.reward_points, Some(3));
    }

    #[test]
    fn test_session_order() {
        let start = NaiveDateTime::parse_from_str("2025-03-14 20:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        let before = start - chrono::Duration::minutes(1);
        assert!(check_session_order(Some(start), Some(start)).is_ok());
        assert!(check_session_order(Some(start), None).is_ok());
        assert!(check_session_order(Some(start), Some(before)).is_err());
    }
}
