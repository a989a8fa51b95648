use rocket::Route;

pub(crate) mod auth;
mod common;
pub(crate) mod elections;
pub(crate) mod staff;
pub(crate) mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes.extend(voting::routes());
    routes.extend(staff::routes());
    routes
}
