use argon2::Error as Argon2Error;
use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    Request, Response,
};
use thiserror::Error;

use crate::model::mongodb::is_transient_transaction_error;

pub type Result<T> = std::result::Result<T, Error>;

/// Shown when a write lost a race with a concurrent one.
pub const CONFLICT_MESSAGE: &str = "The request clashed with another change, please try again";

/// A broken business rule, such as a duplicate signup or an over-full ballot.
///
/// The message is meant to be shown to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{1}")]
    Status(Status, String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
}

impl Error {
    /// Shorthand for a validation failure with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Shorthand for a 404 naming the missing thing.
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// The HTTP status this error should be reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::UnprocessableEntity,
            Self::Status(status, _) => *status,
            // Lost a race with a concurrent transaction; the client may retry.
            Self::Db(e) if is_transient_transaction_error(e) => Status::Conflict,
            Self::Db(_) | Self::Jwt(_) | Self::Argon2(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => warn!("{self}"),
        }

        // Never leak the details of internal failures.
        let message = match &self {
            _ if status.class() == StatusClass::ServerError => {
                "Internal server error".to_string()
            }
            Self::Db(_) => CONFLICT_MESSAGE.to_string(),
            _ => self.to_string(),
        };
        Response::build_from(message.respond_to(req)?)
            .status(status)
            .ok()
    }
}
