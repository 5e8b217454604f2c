use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use pitboss_api::models::{GameType, PitView, PlayerView, RundownView, TableView};
use pitboss_api::orm::gaming_table::{get_all_tables, get_tables_by_pit, table_views};
use pitboss_api::orm::hourly_rundown::{list_rundowns, rundown_views};
use pitboss_api::orm::pit::{get_all_pits, get_pit_by_id, get_pit_by_name, pit_views};
use pitboss_api::orm::player::{get_all_players, get_players_by_table, player_views};

use super::utils::SearchFilter;

#[derive(Subcommand)]
pub enum PitAction {
    #[command(about = "List pits, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against pit names (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
}

#[derive(Subcommand)]
pub enum TableAction {
    #[command(about = "List tables, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against table names (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(long, help = "Only tables in this pit (ID or name)")]
        pit: Option<String>,
        #[arg(long = "game-type", help = "Only tables dealing this game")]
        game_type: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PlayerAction {
    #[command(about = "List players, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term matched against player names (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(long, help = "Only players seated at this table ID")]
        table: Option<i32>,
    },
}

#[derive(Subcommand)]
pub enum RundownAction {
    #[command(about = "List hourly rundowns, newest first")]
    Ls {
        #[arg(long, help = "Only rundowns for this table ID")]
        table: Option<i32>,
    },
}

pub fn handle_pit_command(
    conn: &mut SqliteConnection,
    action: PitAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PitAction::Ls {
            search_term,
            fixed_string,
        } => {
            let filter = SearchFilter::new(search_term, fixed_string)?;
            let pits = list_pits_impl(conn, &filter)?;
            if pits.is_empty() {
                println!("No pits found.");
            } else {
                println!("Pits:");
                for pit in pits {
                    println!(
                        "  ID: {}, Name: {}, Created by: {}",
                        pit.id, pit.name, pit.created_by.username
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn handle_table_command(
    conn: &mut SqliteConnection,
    action: TableAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TableAction::Ls {
            search_term,
            fixed_string,
            pit,
            game_type,
        } => {
            let filter = SearchFilter::new(search_term, fixed_string)?;
            let pit_id = match pit {
                Some(identifier) => Some(resolve_pit_id(conn, &identifier)?),
                None => None,
            };
            let game_type = game_type.map(|g| g.parse::<GameType>()).transpose()?;

            let tables = list_tables_impl(conn, &filter, pit_id, game_type)?;
            if tables.is_empty() {
                println!("No tables found.");
            } else {
                println!("Tables:");
                for table in tables {
                    println!(
                        "  ID: {}, Name: {}, Game: {}, Pit: {} (ID: {})",
                        table.id, table.name, table.game_type, table.pit.name, table.pit.id
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn handle_player_command(
    conn: &mut SqliteConnection,
    action: PlayerAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        PlayerAction::Ls {
            search_term,
            fixed_string,
            table,
        } => {
            let filter = SearchFilter::new(search_term, fixed_string)?;
            let players = list_players_impl(conn, &filter, table)?;
            if players.is_empty() {
                println!("No players found.");
            } else {
                println!("Players:");
                for player in players {
                    let table = player
                        .table
                        .as_ref()
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  ID: {}, Name: {}, Table: {}, Buy-in: {}, Cash-out: {}, Play time: {} min",
                        player.id, player.name, table, player.buy_in, player.cash_out, player.play_time
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn handle_rundown_command(
    conn: &mut SqliteConnection,
    action: RundownAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RundownAction::Ls { table } => {
            let rundowns = list_rundowns_impl(conn, table)?;
            if rundowns.is_empty() {
                println!("No rundowns found.");
            } else {
                println!("Rundowns:");
                for r in rundowns {
                    println!(
                        "  ID: {}, Table: {}, At: {}, Float: {}, Drop: {}, P/L: {}, By: {}",
                        r.id,
                        r.table.name,
                        r.timestamp,
                        r.float_amount,
                        r.drop_amount,
                        r.profit_loss,
                        r.entered_by.username
                    );
                }
            }
        }
    }
    Ok(())
}

/// Resolves a pit given either its numeric ID or its exact name.
pub fn resolve_pit_id(
    conn: &mut SqliteConnection,
    pit_identifier: &str,
) -> Result<i32, Box<dyn std::error::Error>> {
    if let Ok(id) = pit_identifier.parse::<i32>() {
        match get_pit_by_id(conn, id)? {
            Some(_) => Ok(id),
            None => Err(format!("Pit with ID {} does not exist", id).into()),
        }
    } else {
        match get_pit_by_name(conn, pit_identifier)? {
            Some(pit) => Ok(pit.id),
            None => Err(format!("Pit with name '{}' does not exist", pit_identifier).into()),
        }
    }
}

pub fn list_pits_impl(
    conn: &mut SqliteConnection,
    filter: &SearchFilter,
) -> Result<Vec<PitView>, Box<dyn std::error::Error>> {
    let pits = filter.apply(get_all_pits(conn)?, |p| p.name.as_str());
    Ok(pit_views(conn, pits)?)
}

pub fn list_tables_impl(
    conn: &mut SqliteConnection,
    filter: &SearchFilter,
    pit_id: Option<i32>,
    game_type: Option<GameType>,
) -> Result<Vec<TableView>, Box<dyn std::error::Error>> {
    let tables = match pit_id {
        Some(id) => get_tables_by_pit(conn, id)?,
        None => get_all_tables(conn)?,
    };
    let tables = filter
        .apply(tables, |t| t.name.as_str())
        .into_iter()
        .filter(|t| game_type.is_none_or(|g| t.game_type == g))
        .collect();
    Ok(table_views(conn, tables)?)
}

pub fn list_players_impl(
    conn: &mut SqliteConnection,
    filter: &SearchFilter,
    table_id: Option<i32>,
) -> Result<Vec<PlayerView>, Box<dyn std::error::Error>> {
    let players = match table_id {
        Some(id) => get_players_by_table(conn, id)?,
        None => get_all_players(conn)?,
    };
    let players = filter.apply(players, |p| p.name.as_str());
    Ok(player_views(conn, players)?)
}

pub fn list_rundowns_impl(
    conn: &mut SqliteConnection,
    table_id: Option<i32>,
) -> Result<Vec<RundownView>, Box<dyn std::error::Error>> {
    let rundowns = list_rundowns(conn, table_id)?;
    Ok(rundown_views(conn, rundowns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitboss_api::models::{Money, NewPlayer, Role};
    use pitboss_api::orm::gaming_table::insert_table;
    use pitboss_api::orm::hourly_rundown::insert_rundown;
    use pitboss_api::orm::pit::insert_pit;
    use pitboss_api::orm::player::insert_player;
    use pitboss_api::orm::testing::{create_test_user, setup_test_db};

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn new_player(name: &str, table_id: Option<i32>, entered_by: i32) -> NewPlayer {
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
    fn test_resolve_pit_by_id_or_name() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let pit = insert_pit(&mut conn, "High Limit".to_string(), sup.id).unwrap();

        assert_eq!(resolve_pit_id(&mut conn, &pit.id.to_string()).unwrap(), pit.id);
        assert_eq!(resolve_pit_id(&mut conn, "High Limit").unwrap(), pit.id);
        assert!(resolve_pit_id(&mut conn, "999").is_err());
        assert!(resolve_pit_id(&mut conn, "Low Limit").is_err());
    }

    #[test]
    fn test_list_tables_filters() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let main = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();
        let vip = insert_pit(&mut conn, "VIP".to_string(), sup.id).unwrap();
        insert_table(&mut conn, "BJ-01".to_string(), GameType::Blackjack, main.id, sup.id).unwrap();
        insert_table(&mut conn, "CR-01".to_string(), GameType::Craps, main.id, sup.id).unwrap();
        insert_table(&mut conn, "BJ-02".to_string(), GameType::Blackjack, vip.id, sup.id).unwrap();

        let all = SearchFilter::new(None, false).unwrap();
        assert_eq!(list_tables_impl(&mut conn, &all, None, None).unwrap().len(), 3);

        let in_main = list_tables_impl(&mut conn, &all, Some(main.id), None).unwrap();
        assert_eq!(in_main.len(), 2);
        assert!(in_main.iter().all(|t| t.pit.name == "Main"));

        let blackjack =
            list_tables_impl(&mut conn, &all, None, Some(GameType::Blackjack)).unwrap();
        assert_eq!(blackjack.len(), 2);

        let bj = SearchFilter::new(Some("^BJ".to_string()), false).unwrap();
        let found = list_tables_impl(&mut conn, &bj, Some(vip.id), None).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "BJ-02");
    }

    #[test]
    fn test_list_players_and_rundowns_by_table() {
        let mut conn = setup_test_db();
        let sup = create_test_user(&mut conn, "sup", "pw", Some(Role::Supervisor), false);
        let boss = create_test_user(&mut conn, "boss", "pw", Some(Role::PitBoss), false);
        let pit = insert_pit(&mut conn, "Main".to_string(), sup.id).unwrap();
        let t1 = insert_table(&mut conn, "BJ-01".to_string(), GameType::Blackjack, pit.id, sup.id)
            .unwrap();
        let t2 = insert_table(&mut conn, "BJ-02".to_string(), GameType::Blackjack, pit.id, sup.id)
            .unwrap();

        insert_player(&mut conn, new_player("Ada", Some(t1.id), boss.id)).unwrap();
        insert_player(&mut conn, new_player("Bo", Some(t2.id), boss.id)).unwrap();
        insert_player(&mut conn, new_player("Cy", None, boss.id)).unwrap();

        let all = SearchFilter::new(None, false).unwrap();
        assert_eq!(list_players_impl(&mut conn, &all, None).unwrap().len(), 3);
        let at_t1 = list_players_impl(&mut conn, &all, Some(t1.id)).unwrap();
        assert_eq!(at_t1.len(), 1);
        assert_eq!(at_t1[0].name, "Ada");

        insert_rundown(&mut conn, t1.id, money("1000.00"), money("650.00"), boss.id).unwrap();
        insert_rundown(&mut conn, t2.id, money("10.00"), money("20.00"), boss.id).unwrap();

        let for_t1 = list_rundowns_impl(&mut conn, Some(t1.id)).unwrap();
        assert_eq!(for_t1.len(), 1);
        assert_eq!(for_t1[0].profit_loss, money("350.00"));
        assert_eq!(list_rundowns_impl(&mut conn, None).unwrap().len(), 2);
    }
}
