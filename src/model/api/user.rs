use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::user::User};

/// A user's public profile. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: ApiId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            username: user.user.username,
            email: user.user.email,
            is_staff: user.user.is_staff,
            date_joined: user.user.date_joined,
        }
    }
}

/// A request to grant a user staff rights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub username: String,
}
