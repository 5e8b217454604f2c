/*!
 * Pit Boss administrative CLI.
 *
 * Works directly on the SQLite database named by `DATABASE_URL`, using the
 * ORM functions in `pitboss_api::orm` for every read and write. Users can be
 * created, listed, re-roled, re-passworded and removed; pits, tables,
 * players and hourly rundowns can be listed.
 *
 * List commands take an optional search term, a regex unless `-F` asks for
 * a fixed-string match. Run with --help for the full command set.
 */

mod admin_cli;

use admin_cli::floor_commands::{
    PitAction, PlayerAction, RundownAction, TableAction, handle_pit_command,
    handle_player_command, handle_rundown_command, handle_table_command,
};
use admin_cli::user_commands::{UserAction, handle_user_command};
use admin_cli::utils::establish_connection;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pitboss-admin")]
#[command(about = "Administrative CLI for the Pit Boss database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage user accounts")]
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    #[command(about = "Inspect pits")]
    Pit {
        #[command(subcommand)]
        action: PitAction,
    },
    #[command(about = "Inspect gaming tables")]
    Table {
        #[command(subcommand)]
        action: TableAction,
    },
    #[command(about = "Inspect players")]
    Player {
        #[command(subcommand)]
        action: PlayerAction,
    },
    #[command(about = "Inspect hourly rundowns")]
    Rundown {
        #[command(subcommand)]
        action: RundownAction,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut conn = establish_connection()?;

    match cli.command {
        Commands::User { action } => handle_user_command(&mut conn, action),
        Commands::Pit { action } => handle_pit_command(&mut conn, action),
        Commands::Table { action } => handle_table_command(&mut conn, action),
        Commands::Player { action } => handle_player_command(&mut conn, action),
        Commands::Rundown { action } => handle_rundown_command(&mut conn, action),
    }
}
