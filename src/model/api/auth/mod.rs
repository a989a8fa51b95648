mod credentials;
mod rights;
mod token;

pub use credentials::{LoginCredentials, Registration, MIN_PASSWORD_LENGTH};
pub use rights::{Member, Rights, Role, Staff};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
