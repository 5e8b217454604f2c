use std::io::{self, Write};

use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use pitboss_api::orm::{enable_foreign_keys, run_pending_migrations};
use regex::Regex;

/// Opens `DATABASE_URL`, enables foreign keys and brings the schema up to
/// date so the CLI can run against a fresh file.
pub fn establish_connection() -> Result<SqliteConnection, Box<dyn std::error::Error>> {
    dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    enable_foreign_keys(&mut conn)?;
    run_pending_migrations(&mut conn);
    Ok(conn)
}

/// Search term used by the `ls` and `rm` commands.
pub enum SearchFilter {
    All,
    Fixed(String),
    Pattern(Regex),
}

impl SearchFilter {
    /// Regex by default, plain substring match with `-F`.
    pub fn new(
        search_term: Option<String>,
        fixed_string: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match search_term {
            None => Ok(SearchFilter::All),
            Some(term) if fixed_string => Ok(SearchFilter::Fixed(term)),
            Some(term) => {
                let regex = Regex::new(&term)
                    .map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
                Ok(SearchFilter::Pattern(regex))
            }
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            SearchFilter::All => true,
            SearchFilter::Fixed(term) => text.contains(term.as_str()),
            SearchFilter::Pattern(regex) => regex.is_match(text),
        }
    }

    /// Keeps the items whose `key` matches.
    pub fn apply<T>(&self, items: Vec<T>, key: impl Fn(&T) -> &str) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(key(item))).collect()
    }
}

/// Asks a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
