use std::ops::{Deref, DerefMut};

use argon2::Config;
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{api::auth::LoginCredentials, mongodb::Id};
use crate::store::Db;

/// Core user account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Staff may manage elections, candidates and parties.
    pub is_staff: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date_joined: DateTime<Utc>,
}

impl UserCore {
    /// Create a user with a freshly salted hash of `password`.
    pub fn new(
        username: String,
        email: String,
        password: &str,
        is_staff: bool,
        date_joined: DateTime<Utc>,
    ) -> Result<Self> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash = argon2::hash_encoded(password.as_bytes(), &salt, &Config::default())?;
        Ok(Self {
            username,
            email,
            password_hash,
            is_staff,
            date_joined,
        })
    }

    /// Check whether the given password is correct.
    ///
    /// A malformed stored hash never verifies.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Make sure at least one staff account exists, so elections can be managed
/// on a fresh deployment.
///
/// If there is no staff at all, the user named in `credentials` is promoted,
/// or created with that password if they don't exist yet.
pub async fn ensure_staff_exists(db: &Db, credentials: LoginCredentials) -> Result<()> {
    if db.count_staff().await? > 0 {
        return Ok(());
    }

    if let Some(user) = db.user_by_username(&credentials.username).await? {
        warn!("No staff accounts found, promoting existing user {}", user.username);
        db.set_staff(user.id, true).await?;
    } else {
        warn!(
            "No staff accounts found, creating default staff user {}",
            credentials.username
        );
        let user = NewUser::new(
            credentials.username,
            String::new(),
            &credentials.password,
            true,
            Utc::now(),
        )?;
        db.insert_user(user).await?;
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::api::auth::Registration;

    impl NewUser {
        pub fn example() -> Self {
            Registration::example().try_into().unwrap()
        }

        pub fn example2() -> Self {
            Registration::example2().try_into().unwrap()
        }

        pub fn staff_example() -> Self {
            let mut user: Self = Registration::staff_example().try_into().unwrap();
            user.is_staff = true;
            user
        }
    }

    impl User {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                user: NewUser::example(),
            }
        }
    }
}
