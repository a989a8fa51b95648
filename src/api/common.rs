use crate::error::{Error, Result};
use crate::model::{
    api::auth::AuthToken,
    db::{election::Election, user::User},
    mongodb::Id,
};
use crate::store::Db;

/// Look up the user an auth token was issued to.
pub async fn user_from_token<R>(token: &AuthToken<R>, db: &Db) -> Result<User> {
    db.user_by_id(token.id)
        .await?
        .ok_or_else(|| Error::not_found(format!("User with ID '{}'", token.id)))
}

/// Look up an election, or 404.
pub async fn get_election(election_id: Id, db: &Db) -> Result<Election> {
    db.election_by_id(election_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}
