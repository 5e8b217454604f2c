use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::Rocket;
use rocket::fairing::AdHoc;

use crate::models::{User, UserInput};
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::user::{get_user_by_username, insert_user};

/// Adds the default staff account if it is missing.
///
/// Credentials come from PITBOSS_DEFAULT_USERNAME, PITBOSS_DEFAULT_EMAIL and
/// PITBOSS_DEFAULT_PASSWORD.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", |rocket| async {
        dotenv().ok();

        let conn = match get_db_connection(&rocket).await {
            Some(conn) => conn,
            None => return Err(rocket),
        };

        let admin = AdminAccount::from_env();
        match conn.run(move |c| create_admin_user_if_needed(c, &admin)).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Admin user creation failed: {:?}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<rocket::Build>) -> Option<DbConn> {
    match DbConn::get_one(rocket).await {
        Some(conn) => Some(conn),
        None => {
            error!("[admin-init] ERROR: Could not get DB connection.");
            None
        }
    }
}

struct AdminAccount {
    username: String,
    email: String,
    password: String,
}

impl AdminAccount {
    fn from_env() -> Self {
        AdminAccount {
            username: env_or("PITBOSS_DEFAULT_USERNAME", "admin"),
            email: env_or("PITBOSS_DEFAULT_EMAIL", "admin@example.com"),
            password: env_or("PITBOSS_DEFAULT_PASSWORD", "admin"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn create_admin_user_if_needed(
    c: &mut SqliteConnection,
    admin: &AdminAccount,
) -> Result<(), diesel::result::Error> {
    if get_user_by_username(c, &admin.username)?.is_some() {
        info!("[admin-init] Admin user '{}' already exists", admin.username);
        return Ok(());
    }

    create_admin_user(c, admin)?;
    Ok(())
}

fn create_admin_user(
    c: &mut SqliteConnection,
    admin: &AdminAccount,
) -> Result<User, diesel::result::Error> {
    let admin_user = UserInput {
        username: admin.username.clone(),
        email: admin.email.clone(),
        password_hash: hash_password(&admin.password),
        role: None,
        is_staff: true,
    };

    match insert_user(c, admin_user) {
        Ok(user) => {
            info!("[admin-init] Created admin user: '{}'", admin.username);
            Ok(user)
        }
        Err(e) => {
            error!("[admin-init] ERROR creating admin user: {:?}", e);
            Err(e)
        }
    }
}
