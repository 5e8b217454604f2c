use diesel::prelude::*;

use crate::models::{NewPit, Pit, PitView};
use crate::orm::db::{enable_foreign_keys, last_insert_id};
use crate::orm::user::{take_user_view, user_views_by_id};

/// Creates a new pit owned by `creator_id`.
///
/// # Arguments
/// * `conn` - Database connection
/// * `pit_name` - Name of the pit, unique across the floor
/// * `creator_id` - ID of the supervisor creating it
///
/// # Returns
/// * `Ok(Pit)` - The stored pit
/// * `Err(diesel::result::Error)` - A unique violation if the name is taken,
///   otherwise a database error
pub fn insert_pit(
    conn: &mut SqliteConnection,
    pit_name: String,
    creator_id: i32,
) -> Result<Pit, diesel::result::Error> {
    use crate::schema::pits::dsl::*;
    enable_foreign_keys(conn)?;

    let new_pit = NewPit {
        name: pit_name,
        created_by: creator_id,
    };

    diesel::insert_into(pits).values(&new_pit).execute(conn)?;

    let last_id = last_insert_id(conn)?;
    pits.filter(id.eq(last_id)).select(Pit::as_select()).first(conn)
}

pub fn get_pit_by_id(
    conn: &mut SqliteConnection,
    pit_id: i32,
) -> Result<Option<Pit>, diesel::result::Error> {
    use crate::schema::pits::dsl::*;
    pits.filter(id.eq(pit_id))
        .select(Pit::as_select())
        .first(conn)
        .optional()
}

/// Gets a pit by exact name.
pub fn get_pit_by_name(
    conn: &mut SqliteConnection,
    pit_name: &str,
) -> Result<Option<Pit>, diesel::result::Error> {
    use crate::schema::pits::dsl::*;
    pits.filter(name.eq(pit_name))
        .select(Pit::as_select())
        .first(conn)
        .optional()
}

pub fn get_all_pits(conn: &mut SqliteConnection) -> Result<Vec<Pit>, diesel::result::Error> {
    use crate::schema::pits::dsl::*;
    pits.order(id.asc()).select(Pit::as_select()).load(conn)
}

/// Renames a pit, keeping the stored name when `new_name` is `None`.
pub fn update_pit(
    conn: &mut SqliteConnection,
    pit_id: i32,
    new_name: Option<String>,
) -> Result<Pit, diesel::result::Error> {
    use crate::schema::pits::dsl::*;

    if let Some(new_name) = new_name {
        diesel::update(pits.filter(id.eq(pit_id)))
            .set(name.eq(new_name))
            .execute(conn)?;
    }

    pits.filter(id.eq(pit_id)).select(Pit::as_select()).first(conn)
}

/// Deletes a pit. Its tables go with it, and through them its rundowns.
///
/// # Arguments
/// * `conn` - Database connection
/// * `pit_id` - ID of the pit to delete
///
/// # Returns
/// * `Ok(usize)` - Number of rows affected (1 if the pit existed, 0 if not)
/// * `Err(diesel::result::Error)` - Database error
pub fn delete_pit(conn: &mut SqliteConnection, pit_id: i32) -> Result<usize, diesel::result::Error> {
    use crate::schema::pits::dsl::*;
    enable_foreign_keys(conn)?;
    diesel::delete(pits.filter(id.eq(pit_id))).execute(conn)
}

/// Builds the nested views for `rows`, loading all creators in one query.
pub fn pit_views(
    conn: &mut SqliteConnection,
    rows: Vec<Pit>,
) -> Result<Vec<PitView>, diesel::result::Error> {
    let creator_ids: Vec<i32> = rows.iter().map(|p| p.created_by).collect();
    let creators = user_views_by_id(conn, &creator_ids)?;

    rows.into_iter()
        .map(|pit| {
            Ok(PitView {
                id: pit.id,
                name: pit.name,
                created_by: take_user_view(&creators, pit.created_by)?,
            })
        })
        .collect()
}

pub fn get_pit_view(
    conn: &mut SqliteConnection,
    pit_id: i32,
) -> Result<Option<PitView>, diesel::result::Error> {
    match get_pit_by_id(conn, pit_id)? {
        Some(pit) => Ok(pit_views(conn, vec![pit])?.pop()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::orm::testing::{create_test_user, setup_test_db};

    #[test]
    fn test_insert_and_view_pit() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);

        let pit = insert_pit(&mut conn, "Pit A".to_string(), sup.id).expect("insert pit");
        assert_eq!(pit.name, "Pit A");
        assert_eq!(pit.created_by, sup.id);

        let view = get_pit_view(&mut conn, pit.id).unwrap().unwrap();
        assert_eq!(view.name, "Pit A");
        assert_eq!(view.created_by.username, "sup");
        assert_eq!(view.created_by.role, Some(Role::Supervisor));

        assert!(get_pit_view(&mut conn, pit.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_pit_name_is_unique() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);

        insert_pit(&mut conn, "High Limit".to_string(), sup.id).unwrap();
        assert!(insert_pit(&mut conn, "High Limit".to_string(), sup.id).is_err());
        assert_eq!(get_all_pits(&mut conn).unwrap().len(), 1);
        assert!(get_pit_by_name(&mut conn, "High Limit").unwrap().is_some());
    }

    #[test]
    fn test_update_and_delete_pit() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let pit = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();

        let unchanged = update_pit(&mut conn, pit.id, None).unwrap();
        assert_eq!(unchanged.name, "Main");

        let renamed = update_pit(&mut conn, pit.id, Some("Main Floor".to_string())).unwrap();
        assert_eq!(renamed.name, "Main Floor");

        assert_eq!(delete_pit(&mut conn, pit.id).unwrap(), 1);
        assert_eq!(delete_pit(&mut conn, pit.id).unwrap(), 0);
        assert!(get_pit_by_id(&mut conn, pit.id).unwrap().is_none());
    }
}
