#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod voting;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// The full server, configured from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LoggerFairing)
}

/// A server for tests, backed by the given store instead of a configured database.
#[cfg(test)]
pub(crate) fn rocket_for_db(db: store::Db) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("auth_ttl", 3600))
        .merge(("jwt_secret", "test-jwt-secret-do-not-use"))
        .merge(("log_level", "off"));
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(db)
}
