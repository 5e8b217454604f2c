// pitboss-api/tests/schema.rs
//
// Checks the constraints the migrations put on the database itself.
// Application logic is tested through the API tests.

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error};
use diesel::sqlite::SqliteConnection;

use pitboss_api::models::{GameType, Money, NewPlayer, PlayerChanges, Role};
use pitboss_api::orm::gaming_table::{get_all_tables, insert_table};
use pitboss_api::orm::hourly_rundown::{insert_rundown, list_rundowns};
use pitboss_api::orm::pit::insert_pit;
use pitboss_api::orm::player::{
    delete_player, get_all_players, get_player, insert_player, update_player,
};
use pitboss_api::orm::run_pending_migrations;
use pitboss_api::orm::testing::{create_test_user, setup_test_db};
use pitboss_api::orm::user::delete_user;
use pitboss_api::schema::{gaming_tables, players, users};

fn player(name: &str, table_id: Option<i32>, entered_by: i32) -> NewPlayer {
    NewPlayer {
        name: name.to_string(),
        table_id,
        buy_in: Money::ZERO,
        cash_out: Money::ZERO,
        average_bet: Money::ZERO,
        session_start: None,
        session_end: None,
        reward_points: 0,
        description: None,
        entered_by,
    }
}

#[test]
fn test_pit_names_are_unique() {
    let mut conn = setup_test_db();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);

    insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();
    let result = insert_pit(&mut conn, "Main".to_string(), sup.id);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    ));

    // Exact match only
    assert!(insert_pit(&mut conn, "main".to_string(), sup.id).is_ok());
}

#[test]
fn test_usernames_are_unique() {
    let mut conn = setup_test_db();
    create_test_user(&mut conn, "sam", "pw", None, false);

    let result = diesel::insert_into(users::table)
        .values((
            users::username.eq("sam"),
            users::email.eq("other@example.com"),
            users::password_hash.eq("x"),
        ))
        .execute(&mut conn);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
    ));
}

#[test]
fn test_unknown_role_and_game_type_are_rejected() {
    let mut conn = setup_test_db();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
    let pit = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();

    let result = diesel::sql_query(
        "INSERT INTO users (username, email, password_hash, role) VALUES ('x', 'x@example.com', 'x', 'dealer')",
    )
    .execute(&mut conn);
    assert!(matches!(result, Err(Error::DatabaseError(_, _))));

    let result = diesel::sql_query(format!(
        "INSERT INTO gaming_tables (name, game_type, pit_id, created_by) VALUES ('S-1', 'Slots', {}, {})",
        pit.id, sup.id
    ))
    .execute(&mut conn);
    assert!(matches!(result, Err(Error::DatabaseError(_, _))));
}

#[test]
fn test_table_requires_existing_pit() {
    let mut conn = setup_test_db();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);

    let result = insert_table(&mut conn, "Orphan".to_string(), GameType::Craps, 42, sup.id);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
    ));
    assert!(get_all_tables(&mut conn).unwrap().is_empty());
}

/// A migrated database on a connection that never enabled foreign keys,
/// like a pooled connection other than the one set up at ignition.
fn connection_without_foreign_keys() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    run_pending_migrations(&mut conn);
    conn
}

#[test]
fn test_writes_enforce_foreign_keys_on_any_connection() {
    let mut conn = connection_without_foreign_keys();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
    let boss = create_test_user(&mut conn, "boss", "pw", Some(Role::PitBoss), false);

    let result = insert_table(&mut conn, "Orphan".to_string(), GameType::Craps, 42, sup.id);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
    ));
    assert!(get_all_tables(&mut conn).unwrap().is_empty());

    let result = insert_player(&mut conn, player("Lost", Some(9999), boss.id));
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
    ));
    assert!(get_all_players(&mut conn).unwrap().is_empty());

    let result = insert_rundown(&mut conn, 9999, Money::ZERO, Money::ZERO, boss.id);
    assert!(matches!(
        result,
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
    ));

    let seated = insert_player(&mut conn, player("Ada", None, boss.id)).unwrap();
    let moved = update_player(
        &mut conn,
        seated.id,
        PlayerChanges {
            table_id: Some(9999),
            ..Default::default()
        },
    );
    assert!(matches!(
        moved,
        Err(Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _))
    ));
    assert_eq!(get_player(&mut conn, seated.id).unwrap().unwrap().table_id, None);
}

#[test]
fn test_player_funds_cannot_be_negative() {
    let mut conn = setup_test_db();
    let boss = create_test_user(&mut conn, "boss", "pw", Some(Role::PitBoss), false);
    let created = insert_player(&mut conn, player("Ada", None, boss.id)).unwrap();

    let result = diesel::update(players::table.filter(players::id.eq(created.id)))
        .set(players::buy_in.eq(Money::from_cents(-1).unwrap()))
        .execute(&mut conn);
    assert!(matches!(result, Err(Error::DatabaseError(_, _))));
}

#[test]
fn test_table_delete_cascades_and_detaches() {
    let mut conn = setup_test_db();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
    let boss = create_test_user(&mut conn, "boss", "pw", Some(Role::PitBoss), false);
    let pit = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();
    let table = insert_table(&mut conn, "BJ-01".to_string(), GameType::Blackjack, pit.id, sup.id)
        .unwrap();
    let seated = insert_player(&mut conn, player("Ada", Some(table.id), boss.id)).unwrap();
    insert_rundown(&mut conn, table.id, Money::ZERO, Money::ZERO, boss.id).unwrap();

    diesel::delete(gaming_tables::table.filter(gaming_tables::id.eq(table.id)))
        .execute(&mut conn)
        .unwrap();

    assert!(list_rundowns(&mut conn, None).unwrap().is_empty());
    let detached = get_player(&mut conn, seated.id).unwrap().unwrap();
    assert_eq!(detached.table_id, None);
    assert_eq!(delete_player(&mut conn, seated.id).unwrap(), 1);
}

#[test]
fn test_deleting_user_removes_their_records() {
    let mut conn = setup_test_db();
    let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
    let pit = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();
    insert_table(&mut conn, "BJ-01".to_string(), GameType::Blackjack, pit.id, sup.id).unwrap();

    assert_eq!(delete_user(&mut conn, sup.id).unwrap(), 1);
    assert!(get_all_tables(&mut conn).unwrap().is_empty());
}
