//! Database operations for user authentication and session management.
//!
//! This module provides the database layer for login: password hashing and
//! verification, session creation and the session cookie.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use diesel::prelude::*;
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use uuid::Uuid;

use crate::DbConn;
use crate::models::{NewSession, User};
use crate::orm::db::enable_foreign_keys;
use crate::orm::user::get_user_by_username;
use crate::schema::sessions;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Verifies a password against a stored Argon2 hash.
///
/// Returns `false` for a mismatch and for a hash that cannot be parsed.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hashes a password using Argon2 with a random salt.
///
/// # Panics
/// Panics if hashing fails (should not happen in normal operation)
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Hashing should succeed")
        .to_string()
}

/// Stores a new session for `user_id` and returns its token.
///
/// # Arguments
/// * `conn` - Database connection
/// * `user_id` - ID of the user logging in
///
/// # Returns
/// * `Ok(String)` - The new session token
/// * `Err(diesel::result::Error)` - Database error, including an unknown user
pub fn insert_session(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<String, diesel::result::Error> {
    enable_foreign_keys(conn)?;
    let session_token = generate_session_token();

    let new_session = NewSession {
        id: session_token.clone(),
        user_id,
        created_at: Utc::now().naive_utc(),
        expires_at: None,
        revoked: false,
    };

    diesel::insert_into(sessions::table)
        .values(&new_session)
        .execute(conn)?;

    Ok(session_token)
}

/// Sets the HTTP-only session cookie.
///
/// The `secure` flag is dropped for unit tests so the local client keeps
/// sending the cookie over plain HTTP.
fn set_session_cookie(cookies: &CookieJar<'_>, session_token: &str) {
    let secure_flag = !cfg!(test);
    let cookie = Cookie::build((SESSION_COOKIE, session_token.to_string()))
        .http_only(true)
        .secure(secure_flag)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookies.add(cookie);
}

/// Checks a username/password pair against the users table.
///
/// # Returns
/// * `Ok(User)` - Credentials match an active user
/// * `Err(Status::BadRequest)` - Empty username or password
/// * `Err(Status::Unauthorized)` - Unknown user, wrong password or inactive account
pub fn authenticate(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<User, Status> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(Status::BadRequest);
    }

    let user = match get_user_by_username(conn, username.trim()) {
        Ok(Some(user)) => user,
        Ok(None) => return Err(Status::Unauthorized),
        Err(e) => {
            error!("Database error finding user '{}': {:?}", username, e);
            return Err(Status::InternalServerError);
        }
    };

    if !user.is_active || !verify_password(password, &user.password_hash) {
        return Err(Status::Unauthorized);
    }

    Ok(user)
}

/// Processes a complete login: validates the credentials, stores a session
/// and sets the session cookie.
///
/// Unknown users and wrong passwords both yield `Unauthorized` so the
/// response does not reveal which usernames exist.
pub async fn process_login(
    db: &DbConn,
    cookies: &CookieJar<'_>,
    login: &crate::api::login::LoginRequest,
) -> Result<User, Status> {
    let username = login.username.clone();
    let password = login.password.clone();

    let (user, session_token) = db
        .run(move |conn| {
            let user = authenticate(conn, &username, &password)?;
            let token = insert_session(conn, user.id).map_err(|e| {
                error!("Error storing session: {:?}", e);
                Status::InternalServerError
            })?;
            Ok::<_, Status>((user, token))
        })
        .await?;

    set_session_cookie(cookies, &session_token);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Session};
    use crate::orm::testing::{create_test_user, setup_test_db};
    use crate::orm::user::set_user_role;

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct_password");

        assert!(verify_password("correct_password", &hash));
        assert!(!verify_password("wrong_password", &hash));
        assert!(!verify_password("correct_password", "not-a-phc-string"));
    }

    #[test]
    fn test_authenticate() {
        let mut conn = setup_test_db();
        let user = create_test_user(&mut conn, "floorboss", "s3cret", Some(Role::PitBoss), false);

        let ok = authenticate(&mut conn, "floorboss", "s3cret").expect("valid login");
        assert_eq!(ok.id, user.id);

        assert_eq!(
            authenticate(&mut conn, "floorboss", "wrong").unwrap_err(),
            Status::Unauthorized
        );
        assert_eq!(
            authenticate(&mut conn, "ghost", "s3cret").unwrap_err(),
            Status::Unauthorized
        );
        assert_eq!(
            authenticate(&mut conn, "  ", "s3cret").unwrap_err(),
            Status::BadRequest
        );

        // Role changes do not affect credentials
        set_user_role(&mut conn, user.id, None).unwrap();
        assert!(authenticate(&mut conn, "floorboss", "s3cret").is_ok());
    }

    #[test]
    fn test_inactive_user_cannot_authenticate() {
        use crate::schema::users::dsl::*;

        let mut conn = setup_test_db();
        let user = create_test_user(&mut conn, "retired", "pw", Some(Role::Supervisor), false);
        diesel::update(users.filter(id.eq(user.id)))
            .set(is_active.eq(false))
            .execute(&mut conn)
            .unwrap();

        assert_eq!(
            authenticate(&mut conn, "retired", "pw").unwrap_err(),
            Status::Unauthorized
        );
    }

    #[test]
    fn test_insert_session() {
        let mut conn = setup_test_db();
        let user = create_test_user(&mut conn, "sessioned", "pw", None, false);

        let token = insert_session(&mut conn, user.id).expect("session creation should succeed");

        let stored: Session = sessions::table
            .filter(sessions::id.eq(&token))
            .first(&mut conn)
            .expect("session stored");
        assert_eq!(stored.user_id, user.id);
        assert!(!stored.revoked);
        assert!(stored.expires_at.is_none());

        let now = Utc::now().naive_utc();
        assert!(stored.created_at <= now);
        assert!(stored.created_at > now - chrono::Duration::minutes(1));
    }
}
