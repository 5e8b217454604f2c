//! Database operations for logout and session revocation.

use diesel::prelude::*;

use crate::schema::sessions::dsl::*;

/// Marks a session as revoked.
///
/// The row is kept, so the token can never authenticate again while the
/// session history stays available.
///
/// # Arguments
/// * `conn` - Database connection
/// * `session_id` - Session token to revoke
///
/// # Returns
/// * `Ok(usize)` - Number of rows affected (1 for a known token, 0 otherwise)
/// * `Err(diesel::result::Error)` - Database error
pub fn revoke_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<usize, diesel::result::Error> {
    diesel::update(sessions.filter(id.eq(session_id)))
        .set(revoked.eq(true))
        .execute(conn)
}
