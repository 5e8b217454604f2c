use diesel::QueryableByName;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use rocket::fairing::AdHoc;
use rocket_sync_db_pools::{database, diesel};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[database("sqlite_db")]
pub struct DbConn(diesel::SqliteConnection);

/// Enables foreign key enforcement on this connection.
///
/// SQLite keeps foreign keys off by default and the setting is per
/// connection. Pooled connections are handed out in any order, so every
/// ORM function that writes a foreign key or relies on `ON DELETE CASCADE`
/// / `SET NULL` calls this first. It is a no-op inside an open transaction.
///
/// # Arguments
/// * `conn` - A mutable reference to a SQLite database connection
///
/// # Returns
/// * `Ok(())` - Foreign keys are enforced on `conn`
/// * `Err(diesel::result::Error)` - The PRAGMA failed
pub fn enable_foreign_keys(conn: &mut diesel::SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON")
}

/// Infallible variant used from fairings and test setup.
///
/// # Arguments
/// * `conn` - A mutable reference to a SQLite database connection
///
/// # Panics
/// Panics if the PRAGMA command fails to execute
pub fn set_foreign_keys(conn: &mut diesel::SqliteConnection) {
    enable_foreign_keys(conn).expect("Failed to enable foreign keys");
}

/// Creates a Rocket fairing that enables foreign key support on the first
/// pooled connection at ignition.
pub fn set_foreign_keys_fairing() -> AdHoc {
    AdHoc::on_ignite("Set Foreign Keys", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for foreign keys");
        conn.run(|c| {
            set_foreign_keys(c);
        })
        .await;
        rocket
    })
}

/// Runs all pending database migrations on the provided connection.
///
/// # Arguments
/// * `conn` - A mutable reference to a SQLite database connection
///
/// # Panics
/// Panics if any migration fails to run
pub fn run_pending_migrations(conn: &mut diesel::SqliteConnection) {
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run pending migrations");
}

/// Creates a Rocket fairing that runs database migrations on ignition.
pub fn run_migrations_fairing() -> AdHoc {
    AdHoc::on_ignite("Diesel Migrations", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for migration");
        conn.run(|c| {
            run_pending_migrations(c);
        })
        .await;
        rocket
    })
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = BigInt)]
    last_insert_rowid: i64,
}

/// Row id of the most recent successful insert on this connection.
///
/// # Arguments
/// * `conn` - The connection that ran the insert
///
/// # Returns
/// * `Ok(i32)` - The new row's id
/// * `Err(diesel::result::Error)` - Database error
pub fn last_insert_id(conn: &mut diesel::SqliteConnection) -> QueryResult<i32> {
    diesel::sql_query("SELECT last_insert_rowid() as last_insert_rowid")
        .get_result::<LastInsertRowId>(conn)
        .map(|row| row.last_insert_rowid as i32)
}
