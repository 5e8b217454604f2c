mod db;
pub mod gaming_table;
pub mod hourly_rundown;
pub mod login;
pub mod logout;
pub mod pit;
pub mod player;
pub mod testing;
pub mod user;

pub use db::*;
