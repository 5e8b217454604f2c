//! API endpoints for staff-only user administration.

use rocket::Route;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::error::{ApiError, is_unique_violation};
use crate::logged_json::LoggedJson;
use crate::models::{Role, UserInput, UserView};
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_username, insert_user, list_all_users, list_users_by_role};
use crate::session_guards::AdminUser;

#[derive(Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserView,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn register_with_role(
    db: DbConn,
    request: RegisterRequest,
    role: Role,
) -> Result<status::Created<Json<RegisterResponse>>, ApiError> {
    let (username, email, password) = match (
        non_empty(&request.username),
        non_empty(&request.email),
        request.password.filter(|p| !p.is_empty()),
    ) {
        (Some(u), Some(e), Some(p)) => (u, e, p),
        _ => return Err(ApiError::BadRequest("All fields are required".to_string())),
    };

    let user = db
        .run(move |conn| {
            if get_user_by_username(conn, &username)?.is_some() {
                return Err(ApiError::field(
                    "username",
                    "A user with that username already exists.",
                ));
            }
            insert_user(
                conn,
                UserInput {
                    username,
                    email,
                    password_hash: hash_password(&password),
                    role: Some(role),
                    is_staff: false,
                },
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::field("username", "A user with that username already exists.")
                } else {
                    ApiError::from(e)
                }
            })
        })
        .await?;

    info!("Registered {} '{}'", role, user.username);
    let label = match role {
        Role::Supervisor => "Supervisor",
        Role::PitBoss => "Pit Boss",
    };
    let location = format!("/api/1/users/{}", user.id);
    Ok(status::Created::new(location).body(Json(RegisterResponse {
        message: format!("{} registered successfully", label),
        user: UserView::from(&user),
    })))
}

/// Register Supervisor endpoint.
///
/// - **URL:** `/api/1/register-supervisor`
/// - **Method:** `POST`
/// - **Authorization:** Staff only
///
/// ```json
/// { "username": "sam", "email": "sam@example.com", "password": "secret" }
/// ```
///
/// Returns 201 with `{"message", "user"}`. Any missing field gives 400
/// `{"error": "All fields are required"}`.
#[post("/1/register-supervisor", data = "<request>")]
pub async fn register_supervisor(
    db: DbConn,
    _admin: AdminUser,
    request: LoggedJson<RegisterRequest>,
) -> Result<status::Created<Json<RegisterResponse>>, ApiError> {
    register_with_role(db, request.into_inner(), Role::Supervisor).await
}

/// Register Pit Boss endpoint.
///
/// - **URL:** `/api/1/register-pit-boss`
/// - **Method:** `POST`
/// - **Authorization:** Staff only
#[post("/1/register-pit-boss", data = "<request>")]
pub async fn register_pit_boss(
    db: DbConn,
    _admin: AdminUser,
    request: LoggedJson<RegisterRequest>,
) -> Result<status::Created<Json<RegisterResponse>>, ApiError> {
    register_with_role(db, request.into_inner(), Role::PitBoss).await
}

/// List Users endpoint.
///
/// - **URL:** `/api/1/users[?role=supervisor|pit_boss]`
/// - **Method:** `GET`
/// - **Authorization:** Staff only
#[get("/1/users?<role>")]
pub async fn list_users(
    db: DbConn,
    _admin: AdminUser,
    role: Option<String>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let role = match role {
        Some(name) => Some(
            name.parse::<Role>()
                .map_err(|msg| ApiError::field("role", msg))?,
        ),
        None => None,
    };

    let found = db
        .run(move |conn| match role {
            Some(r) => list_users_by_role(conn, r),
            None => list_all_users(conn),
        })
        .await?;

    Ok(Json(found.iter().map(UserView::from).collect()))
}

pub fn routes() -> Vec<Route> {
    routes![register_supervisor, register_pit_boss, list_users]
}
