//! API endpoints for logging in and out.

use rocket::http::{Cookie, CookieJar, Status};
use rocket::response::status;
use rocket::serde::json::{Json, Value, json};
use rocket::Route;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::error::ErrorResponse;
use crate::logged_json::LoggedJson;
use crate::models::UserView;
use crate::orm::login::{SESSION_COOKIE, process_login};
use crate::orm::logout::revoke_session;
use crate::session_guards::AuthenticatedUser;

/// Login request structure containing user credentials.
#[derive(Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Login endpoint.
///
/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Authentication:** None required
///
/// On success stores a session, sets the HTTP-only `session` cookie and
/// returns the user view. Empty credentials are a 400; an unknown user, a
/// wrong password and a deactivated account are all a 401 with the same
/// body.
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    cookies: &CookieJar<'_>,
    login: LoggedJson<LoginRequest>,
) -> Result<Json<UserView>, status::Custom<Json<ErrorResponse>>> {
    match process_login(&db, cookies, &login).await {
        Ok(user) => {
            info!("User '{}' logged in", user.username);
            Ok(Json(UserView::from(&user)))
        }
        Err(code) => {
            let error = match code {
                c if c == Status::BadRequest => "Username and password are required",
                c if c == Status::Unauthorized => "Invalid credentials",
                _ => "Internal server error",
            };
            Err(status::Custom(
                code,
                Json(ErrorResponse {
                    error: error.to_string(),
                    fields: None,
                }),
            ))
        }
    }
}

/// Logout endpoint.
///
/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
/// - **Authentication:** None required
///
/// Revokes the current session, if any, and removes the cookie. Always
/// succeeds.
#[post("/1/logout")]
pub async fn logout(db: DbConn, cookies: &CookieJar<'_>) -> Json<Value> {
    let cookie_value = cookies.get(SESSION_COOKIE).map(|c| c.value().to_string());

    if let Some(session_id) = cookie_value {
        if let Err(e) = db.run(move |conn| revoke_session(conn, &session_id)).await {
            warn!("Failed to revoke session: {:?}", e);
        }
        cookies.remove(Cookie::from(SESSION_COOKIE));
    }

    Json(json!({
        "message": "Logout successful",
        "status": "ok"
    }))
}

/// Current user endpoint.
///
/// - **URL:** `/api/1/me`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/me")]
pub fn me(auth_user: AuthenticatedUser) -> Json<UserView> {
    Json(UserView::from(&auth_user.user))
}

pub fn routes() -> Vec<Route> {
    routes![login, logout, me]
}
