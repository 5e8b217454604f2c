use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;

use crate::models::{NewUser, Role, User, UserInput, UserView};
use crate::orm::db::{enable_foreign_keys, last_insert_id};

/// Inserts a new user and returns the stored row.
pub fn insert_user(
    conn: &mut SqliteConnection,
    new_user: UserInput,
) -> Result<User, diesel::result::Error> {
    use crate::schema::users::dsl::*;

    let insertable_user = NewUser {
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        role: new_user.role,
        is_staff: new_user.is_staff,
        is_active: true,
        created_at: Utc::now().naive_utc(),
    };

    diesel::insert_into(users)
        .values(&insertable_user)
        .execute(conn)?;

    let last_id = last_insert_id(conn)?;
    users.filter(id.eq(last_id)).select(User::as_select()).first(conn)
}

pub fn get_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(conn)
        .optional()
}

pub fn get_user_by_username(
    conn: &mut SqliteConnection,
    user_name: &str,
) -> Result<Option<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .filter(username.eq(user_name))
        .select(User::as_select())
        .first(conn)
        .optional()
}

/// Lists every user, most recently created first.
pub fn list_all_users(conn: &mut SqliteConnection) -> Result<Vec<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .order((created_at.desc(), id.desc()))
        .select(User::as_select())
        .load(conn)
}

pub fn list_users_by_role(
    conn: &mut SqliteConnection,
    user_role: Role,
) -> Result<Vec<User>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    users
        .filter(role.eq(user_role))
        .order((created_at.desc(), id.desc()))
        .select(User::as_select())
        .load(conn)
}

pub fn update_password_hash(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_hash: String,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    diesel::update(users.filter(id.eq(user_id)))
        .set(password_hash.eq(new_hash))
        .execute(conn)
}

/// Changes a user's role. Only administrative callers reach this.
///
/// # Arguments
/// * `conn` - Database connection
/// * `user_id` - ID of the user to change
/// * `new_role` - The new role, or `None` to clear it
///
/// # Returns
/// * `Ok(usize)` - Number of rows affected (0 if the user does not exist)
/// * `Err(diesel::result::Error)` - Database error
pub fn set_user_role(
    conn: &mut SqliteConnection,
    user_id: i32,
    new_role: Option<Role>,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    diesel::update(users.filter(id.eq(user_id)))
        .set(role.eq(new_role))
        .execute(conn)
}

/// Deletes a user along with their sessions and every record they created.
///
/// # Arguments
/// * `conn` - Database connection
/// * `user_id` - ID of the user to delete
///
/// # Returns
/// * `Ok(usize)` - Number of rows affected (1 if the user existed, 0 if not)
/// * `Err(diesel::result::Error)` - Database error
pub fn delete_user(
    conn: &mut SqliteConnection,
    user_id: i32,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    enable_foreign_keys(conn)?;
    diesel::delete(users.filter(id.eq(user_id))).execute(conn)
}

/// Loads the public view of each listed user, keyed by id.
pub fn user_views_by_id(
    conn: &mut SqliteConnection,
    user_ids: &[i32],
) -> Result<HashMap<i32, UserView>, diesel::result::Error> {
    use crate::schema::users::dsl::*;
    let found = users
        .filter(id.eq_any(user_ids))
        .select(User::as_select())
        .load(conn)?;
    Ok(found.iter().map(|u| (u.id, UserView::from(u))).collect())
}

/// Looks up `user_id` in a map built by [`user_views_by_id`].
pub(crate) fn take_user_view(
    views: &HashMap<i32, UserView>,
    user_id: i32,
) -> Result<UserView, diesel::result::Error> {
    views
        .get(&user_id)
        .cloned()
        .ok_or(diesel::result::Error::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::testing::{create_test_user, setup_test_db};

    #[test]
    fn test_insert_and_find_user() {
        let mut conn = setup_test_db();

        let user = create_test_user(&mut conn, "sam", "pw", Some(Role::Supervisor), false);
        assert_eq!(user.username, "sam");
        assert_eq!(user.email, "sam@example.com");
        assert_eq!(user.role, Some(Role::Supervisor));
        assert!(user.is_active);
        assert!(!user.is_staff);

        let found = get_user_by_username(&mut conn, "sam").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(get_user_by_username(&mut conn, "nobody").unwrap().is_none());
        assert!(get_user(&mut conn, user.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_username_is_unique() {
        let mut conn = setup_test_db();
        create_test_user(&mut conn, "dup", "pw", None, false);

        let again = insert_user(
            &mut conn,
            UserInput {
                username: "dup".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "x".to_string(),
                role: None,
                is_staff: false,
            },
        );
        assert!(again.is_err());
    }

    #[test]
    fn test_list_users_by_role_and_set_role() {
        let mut conn = setup_test_db();
        let boss = create_test_user(&mut conn, "boss", "pw", Some(Role::PitBoss), false);
        create_test_user(&mut conn, "super", "pw", Some(Role::Supervisor), false);
        create_test_user(&mut conn, "admin", "pw", None, true);

        let bosses = list_users_by_role(&mut conn, Role::PitBoss).unwrap();
        assert_eq!(bosses.len(), 1);
        assert_eq!(bosses[0].id, boss.id);

        set_user_role(&mut conn, boss.id, Some(Role::Supervisor)).unwrap();
        assert!(list_users_by_role(&mut conn, Role::PitBoss).unwrap().is_empty());
        assert_eq!(list_users_by_role(&mut conn, Role::Supervisor).unwrap().len(), 2);
        assert_eq!(list_all_users(&mut conn).unwrap().len(), 3);
    }

    #[test]
    fn test_user_views_by_id_hides_nothing_it_should_not() {
        let mut conn = setup_test_db();
        let a = create_test_user(&mut conn, "a", "pw", Some(Role::PitBoss), false);
        let b = create_test_user(&mut conn, "b", "pw", None, false);

        let views = user_views_by_id(&mut conn, &[a.id, b.id, 999]).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[&a.id].username, "a");
        assert_eq!(views[&a.id].role, Some(Role::PitBoss));
        assert!(take_user_view(&views, 999).is_err());

        let json = serde_json::to_value(&views[&b.id]).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], serde_json::Value::Null);
    }
}
