pub mod gaming_table;
pub mod hourly_rundown;
pub mod money;
pub mod pit;
pub mod player;
pub mod role;
pub mod session;
pub mod user;

// Re-export models for easier access
pub use gaming_table::*;
pub use hourly_rundown::*;
pub use money::*;
pub use pit::*;
pub use player::*;
pub use role::*;
pub use session::*;
pub use user::*;
