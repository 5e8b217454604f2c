use std::io::{self, Write};

use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use pitboss_api::models::{Role, User, UserInput};
use pitboss_api::orm::login::hash_password;
use pitboss_api::orm::user::{
    delete_user, get_user_by_username, insert_user, list_all_users, list_users_by_role,
    set_user_role, update_password_hash,
};
use rpassword::read_password;

use super::utils::{SearchFilter, confirm};

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new user")]
    Add {
        #[arg(short, long, help = "Username used to log in")]
        username: String,
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
        #[arg(short, long, help = "Floor role: supervisor or pit_boss")]
        role: Option<String>,
        #[arg(long, help = "Grant staff (user administration) rights")]
        staff: bool,
    },
    #[command(about = "List users, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against usernames (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short, long, help = "Only list users with this role")]
        role: Option<String>,
    },
    #[command(about = "Change user password")]
    Passwd {
        #[arg(help = "Username")]
        username: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Set or clear a user's floor role")]
    SetRole {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "supervisor, pit_boss or none")]
        role: String,
    },
    #[command(about = "Remove users matching search term")]
    Rm {
        #[arg(help = "Search term to match usernames for removal (regex by default, use -F for fixed string)")]
        search_term: String,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_user_command(
    conn: &mut SqliteConnection,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add {
            username,
            email,
            password,
            role,
            staff,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            let role = parse_role(role.as_deref())?;
            let user = add_user_impl(conn, &username, &email, &password, role, staff)?;
            println!("User created successfully!");
            print_user(&user);
        }
        UserAction::Ls {
            search_term,
            fixed_string,
            role,
        } => {
            let role = parse_role(role.as_deref())?;
            let filter = SearchFilter::new(search_term, fixed_string)?;
            let users = list_users_impl(conn, &filter, role)?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("Users:");
                for user in &users {
                    print_user(user);
                }
            }
        }
        UserAction::Passwd { username, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            change_password_impl(conn, &username, &password)?;
            println!("Password changed successfully for user: {}", username);
        }
        UserAction::SetRole { username, role } => {
            let role = parse_role(Some(&role))?;
            set_role_impl(conn, &username, role)?;
            match role {
                Some(r) => println!("User '{}' is now a {}", username, r),
                None => println!("Cleared the role of user '{}'", username),
            }
        }
        UserAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => {
            let filter = SearchFilter::new(Some(search_term), fixed_string)?;
            remove_users_impl(conn, &filter, yes)?;
        }
    }
    Ok(())
}

/// `None`, an empty string and `"none"` all mean no floor role.
pub fn parse_role(role: Option<&str>) -> Result<Option<Role>, Box<dyn std::error::Error>> {
    match role.map(str::trim) {
        None | Some("") | Some("none") => Ok(None),
        Some(name) => Ok(Some(name.parse::<Role>()?)),
    }
}

fn print_user(user: &User) {
    let role = user.role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "  ID: {}, Username: {}, Email: {}, Role: {}, Staff: {}, Active: {}, Created: {}",
        user.id, user.username, user.email, role, user.is_staff, user.is_active, user.created_at
    );
}

pub fn add_user_impl(
    conn: &mut SqliteConnection,
    username: &str,
    email: &str,
    password: &str,
    role: Option<Role>,
    is_staff: bool,
) -> Result<User, Box<dyn std::error::Error>> {
    if get_user_by_username(conn, username)?.is_some() {
        return Err(format!("User '{}' already exists", username).into());
    }

    let user = insert_user(
        conn,
        UserInput {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password),
            role,
            is_staff,
        },
    )?;
    Ok(user)
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    filter: &SearchFilter,
    role: Option<Role>,
) -> Result<Vec<User>, Box<dyn std::error::Error>> {
    let users = match role {
        Some(r) => list_users_by_role(conn, r)?,
        None => list_all_users(conn)?,
    };
    Ok(filter.apply(users, |u| u.username.as_str()))
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user_by_username(conn, username)?
        .ok_or_else(|| format!("User '{}' not found", username))?;
    update_password_hash(conn, user.id, hash_password(password))?;
    Ok(())
}

pub fn set_role_impl(
    conn: &mut SqliteConnection,
    username: &str,
    role: Option<Role>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user_by_username(conn, username)?
        .ok_or_else(|| format!("User '{}' not found", username))?;
    set_user_role(conn, user.id, role)?;
    Ok(())
}

pub fn remove_users_impl(
    conn: &mut SqliteConnection,
    filter: &SearchFilter,
    yes: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    let matching_users = filter.apply(list_all_users(conn)?, |u| u.username.as_str());

    if matching_users.is_empty() {
        println!("No users found matching the search term.");
        return Ok(0);
    }

    println!("Found {} user(s) matching the search term:", matching_users.len());
    for user in &matching_users {
        print_user(user);
    }
    println!("Pits, tables, players and rundowns they created are removed with them.");

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} user(s)?",
            matching_users.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(0);
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for user in matching_users {
        match delete_user(conn, user.id) {
            Ok(rows) if rows > 0 => {
                deleted_count += 1;
                println!("Deleted user: {} (ID: {})", user.username, user.id);
            }
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "Failed to delete user {} (ID: {}): {}",
                user.username, user.id, e
            )),
        }
    }

    println!("Successfully deleted {} user(s).", deleted_count);

    if !errors.is_empty() {
        println!("Errors encountered:");
        for error in errors {
            println!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }

    Ok(deleted_count)
}

pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_api::orm::login::verify_password;
    use pitboss_api::orm::pit::{get_all_pits, insert_pit};
    use pitboss_api::orm::testing::setup_test_db;

    #[test]
    fn test_add_user_and_reject_duplicate() {
        let mut conn = setup_test_db();

        let user = add_user_impl(
            &mut conn,
            "sam",
            "sam@example.com",
            "secret",
            Some(Role::Supervisor),
            false,
        )
        .unwrap();
        assert_eq!(user.role, Some(Role::Supervisor));
        assert!(!user.is_staff);
        assert!(verify_password("secret", &user.password_hash));

        let err = add_user_impl(&mut conn, "sam", "other@example.com", "x", None, false)
            .err()
            .unwrap();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_list_users_by_role_and_search() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "boss-a", "a@example.com", "pw", Some(Role::PitBoss), false)
            .unwrap();
        add_user_impl(&mut conn, "boss-b", "b@example.com", "pw", Some(Role::PitBoss), false)
            .unwrap();
        add_user_impl(&mut conn, "sup", "s@example.com", "pw", Some(Role::Supervisor), false)
            .unwrap();

        let all = SearchFilter::new(None, false).unwrap();
        assert_eq!(list_users_impl(&mut conn, &all, None).unwrap().len(), 3);
        assert_eq!(
            list_users_impl(&mut conn, &all, Some(Role::PitBoss)).unwrap().len(),
            2
        );

        let only_b = SearchFilter::new(Some("-b$".to_string()), false).unwrap();
        let found = list_users_impl(&mut conn, &only_b, None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "boss-b");
    }

    #[test]
    fn test_change_password_and_role() {
        let mut conn = setup_test_db();
        add_user_impl(&mut conn, "pat", "pat@example.com", "old", None, false).unwrap();

        change_password_impl(&mut conn, "pat", "new").unwrap();
        set_role_impl(&mut conn, "pat", Some(Role::PitBoss)).unwrap();

        let pat = get_user_by_username(&mut conn, "pat").unwrap().unwrap();
        assert!(verify_password("new", &pat.password_hash));
        assert!(!verify_password("old", &pat.password_hash));
        assert_eq!(pat.role, Some(Role::PitBoss));

        assert!(change_password_impl(&mut conn, "ghost", "x").is_err());
        assert!(set_role_impl(&mut conn, "ghost", None).is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role(None).unwrap(), None);
        assert_eq!(parse_role(Some("none")).unwrap(), None);
        assert_eq!(parse_role(Some("pit_boss")).unwrap(), Some(Role::PitBoss));
        assert!(parse_role(Some("dealer")).is_err());
    }

    #[test]
    fn test_remove_users_cascades_to_their_pits() {
        let mut conn = setup_test_db();
        let sup = add_user_impl(&mut conn, "sup", "s@example.com", "pw", Some(Role::Supervisor), false)
            .unwrap();
        add_user_impl(&mut conn, "keep", "k@example.com", "pw", None, false).unwrap();
        insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();

        let filter = SearchFilter::new(Some("sup".to_string()), true).unwrap();
        assert_eq!(remove_users_impl(&mut conn, &filter, true).unwrap(), 1);

        assert!(get_user_by_username(&mut conn, "sup").unwrap().is_none());
        assert!(get_user_by_username(&mut conn, "keep").unwrap().is_some());
        assert!(get_all_pits(&mut conn).unwrap().is_empty());

        let nobody = SearchFilter::new(Some("zzz".to_string()), true).unwrap();
        assert_eq!(remove_users_impl(&mut conn, &nobody, true).unwrap(), 0);
    }
}
