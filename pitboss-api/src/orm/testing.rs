//! Test scaffolding: in-memory databases, seeded accounts and a ready-made
//! Rocket instance for integration tests.

use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};
use rocket_sync_db_pools::diesel;

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::admin_init_fairing::admin_init_fairing;
use crate::models::{Role, User, UserInput};
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_username, insert_user};

/// Accounts every `test_rocket()` instance starts with, as
/// `(username, password, role, is_staff)`. The staff account itself comes
/// from the admin initialization fairing (`admin` / `admin`).
pub const TEST_ACCOUNTS: [(&str, &str, Option<Role>, bool); 4] = [
    ("supervisor", "supervisorpass", Some(Role::Supervisor), false),
    ("pitboss", "pitbosspass", Some(Role::PitBoss), false),
    ("pitboss2", "pitbosspass2", Some(Role::PitBoss), false),
    ("norole", "norolepass", None, false),
];

/// Configures SQLite with performance-optimized settings for testing.
///
/// Sets the following PRAGMAs:
/// - `synchronous = OFF`: Disables synchronous writes for faster performance
/// - `journal_mode = OFF`: Disables rollback journal
///
/// These settings make SQLite faster but less durable - only use for testing.
///
/// # Panics
/// Panics if the PRAGMA commands fail to execute
fn set_sqlite_test_pragmas(conn: &mut diesel::SqliteConnection) {
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
    .expect("Failed to set SQLite PRAGMAs");
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test pragmas");
        conn.run(|c| {
            set_sqlite_test_pragmas(c);
        })
        .await;
        rocket
    })
}

/// Seeds [`TEST_ACCOUNTS`] so every test can log in as any floor role.
fn test_data_init_fairing() -> AdHoc {
    AdHoc::on_ignite("Test Data Initialization", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test data initialization");

        conn.run(|c| {
            for (username, password, role, is_staff) in TEST_ACCOUNTS {
                if let Err(e) = find_or_create_user(c, username, password, role, is_staff) {
                    error!("[test-data-init] Failed to create '{}': {:?}", username, e);
                }
            }
        })
        .await;

        rocket
    })
}

fn find_or_create_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
    role: Option<Role>,
    is_staff: bool,
) -> Result<User, diesel::result::Error> {
    if let Some(existing) = get_user_by_username(conn, username)? {
        return Ok(existing);
    }
    insert_user(
        conn,
        UserInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(password),
            role,
            is_staff,
        },
    )
}

/// Creates a user for unit tests, with email `<username>@example.com`.
///
/// # Panics
/// Panics if the insert fails
pub fn create_test_user(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
    role: Option<Role>,
    is_staff: bool,
) -> User {
    find_or_create_user(conn, username, password, role, is_staff).expect("insert test user")
}

/// Creates and configures a Rocket instance for testing with an in-memory
/// SQLite database.
///
/// The returned Rocket instance will have:
/// - A unique shared-cache in-memory SQLite database
/// - Database connection pool attached
/// - Foreign keys enabled
/// - Testing pragmas set
/// - All migrations run
/// - The default staff account plus [`TEST_ACCOUNTS`]
/// - API routes and JSON catchers mounted
pub fn test_rocket() -> Rocket<Build> {
    use uuid::Uuid;

    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let figment = rocket::Config::figment().merge(("databases", map!["sqlite_db" => db_config]));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::register_catchers(crate::mount_api_routes(rocket))
}

/// Creates a synchronous in-memory SQLite database connection for unit tests.
///
/// Runs all embedded migrations and enables foreign key support. Each call
/// returns a new, independent database.
pub fn setup_test_db() -> SqliteConnection {
    use diesel::Connection;

    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn);
    run_pending_migrations(&mut conn);
    conn
}
