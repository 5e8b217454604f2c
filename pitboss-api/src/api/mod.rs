pub mod error;
pub mod login;
pub mod pit;
pub mod player;
pub mod rundown;
pub mod status;
pub mod table;
pub mod user;

use rocket::Route;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(login::routes());
    routes.extend(pit::routes());
    routes.extend(player::routes());
    routes.extend(rundown::routes());
    routes.extend(status::routes());
    routes.extend(table::routes());
    routes.extend(user::routes());
    routes
}
