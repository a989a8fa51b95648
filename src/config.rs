use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{api::auth::LoginCredentials, db::user::ensure_staff_exists};
use crate::store::Db;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}


/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the persistent store.
#[derive(Deserialize)]
struct DbConfig {
    // non-secrets
    /// Without a URI, everything is kept in memory and lost on shutdown.
    db_uri: Option<String>,
    #[serde(default = "default_db_name")]
    db_name: String,
    default_staff_username: String,
    // secrets
    default_staff_password: String,
}

fn default_db_name() -> String {
    "elections".to_string()
}

/// A fairing that loads the store config, connects to MongoDB (or falls back
/// to an in-memory store), performs any setup necessary, and places the
/// resulting [`Db`] into managed state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let db = match config.db_uri {
            Some(uri) => {
                info!("Loaded database config, connecting...");
                let client = match MongoClient::with_uri_str(uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                match Db::mongo(client, &config.db_name).await {
                    Ok(db) => db,
                    Err(e) => {
                        error!("Failed to prepare database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, using a non-persistent in-memory store");
                Db::memory()
            }
        };

        // Ensure there is at least one staff account to manage elections with.
        let credentials = LoginCredentials {
            username: config.default_staff_username,
            password: config.default_staff_password,
        };
        if let Err(e) = ensure_staff_exists(&db, credentials).await {
            error!("Failed to create default staff account: {e}");
            return Err(rocket);
        }
        info!("...store online!");

        // Manage the state.
        rocket = rocket.manage(db);
        Ok(rocket)
    }
}
