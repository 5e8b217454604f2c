pub mod floor_commands;
pub mod user_commands;
pub mod utils;
