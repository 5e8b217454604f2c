//! Session-based authentication and capability guards for Rocket routes.
//!
//! Every floor endpoint takes one of the guards below. Both failure kinds
//! answer 403: a missing, revoked or expired session (or a deactivated
//! account), and a valid session whose role lacks the route's capability.
//!
//! ```rust,ignore
//! #[post("/1/pits", data = "<body>")]
//! async fn create_pit(db: DbConn, caller: SupervisorUser, body: LoggedJson<PitRequest>) { .. }
//! ```

use chrono::Utc;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::DbConn;
use crate::models::{Capability, Session, User};
use crate::orm::login::SESSION_COOKIE;
use crate::schema::{sessions, users};

/// A request guard for routes that only need a logged-in user.
///
/// Checks, in order:
///
/// 1. The `session` cookie is present
/// 2. The session exists, is not revoked and has not expired
/// 3. The session's user exists and is active
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    /// Token of the session that authenticated this request.
    pub session_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => return Outcome::Error((Status::InternalServerError, ())),
        };

        let session_id = match request.cookies().get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => return Outcome::Error((Status::Forbidden, ())),
        };

        let lookup_id = session_id.clone();
        let lookup = db
            .run(move |conn| {
                let session = sessions::table
                    .filter(sessions::id.eq(&lookup_id))
                    .filter(sessions::revoked.eq(false))
                    .filter(
                        sessions::expires_at
                            .is_null()
                            .or(sessions::expires_at.gt(Utc::now().naive_utc())),
                    )
                    .select(Session::as_select())
                    .first(conn)
                    .optional()?;

                match session {
                    Some(session) => users::table
                        .filter(users::id.eq(session.user_id))
                        .select(User::as_select())
                        .first(conn)
                        .optional(),
                    None => Ok(None),
                }
            })
            .await;

        match lookup {
            Ok(Some(user)) if user.is_active => {
                Outcome::Success(AuthenticatedUser { user, session_id })
            }
            Ok(_) => Outcome::Error((Status::Forbidden, ())),
            Err(e) => {
                error!("Database error resolving session: {:?}", e);
                Outcome::Error((Status::InternalServerError, ()))
            }
        }
    }
}

impl AuthenticatedUser {
    /// Whether the user's role grants `capability`. Users without a role
    /// hold no capability.
    pub fn can(&self, capability: Capability) -> bool {
        self.user.role.is_some_and(|r| r.grants(capability))
    }
}

/// Creates a guard that admits users whose role grants `$capability`.
macro_rules! create_capability_guard {
    ($(#[$doc:meta])* $name:ident, $capability:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            pub user: User,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                let auth_user = match AuthenticatedUser::from_request(request).await {
                    Outcome::Success(user) => user,
                    Outcome::Error(e) => return Outcome::Error(e),
                    Outcome::Forward(f) => return Outcome::Forward(f),
                };

                if auth_user.can($capability) {
                    Outcome::Success($name {
                        user: auth_user.user,
                    })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
        }
    };
}

create_capability_guard!(
    /// Pit and table management.
    SupervisorUser,
    Capability::ManageFloor
);

create_capability_guard!(
    /// Player management.
    PitBossUser,
    Capability::ManagePlayers
);

create_capability_guard!(
    /// Creating, editing and deleting hourly rundowns.
    RundownWriter,
    Capability::SubmitRundowns
);

create_capability_guard!(
    /// Reading hourly rundowns.
    RundownReader,
    Capability::ViewRundowns
);

/// A request guard for administrative routes; requires `is_staff`.
#[derive(Debug)]
pub struct AdminUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let auth_user = match AuthenticatedUser::from_request(request).await {
            Outcome::Success(user) => user,
            Outcome::Error(e) => return Outcome::Error(e),
            Outcome::Forward(f) => return Outcome::Forward(f),
        };

        if auth_user.user.is_staff {
            Outcome::Success(AdminUser {
                user: auth_user.user,
            })
        } else {
            Outcome::Error((Status::Forbidden, ()))
        }
    }
}
