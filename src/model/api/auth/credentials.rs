use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::db::user::NewUser;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_USERNAME_LENGTH: usize = 150;

/// A request to open a new member account. The passwords are in plaintext
/// and never stored directly.
#[derive(Clone, Deserialize, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl TryFrom<Registration> for NewUser {
    type Error = Error;

    /// Convert a [`Registration`] into a new member by hashing the password.
    /// This enforces a well-formed username and email, matching passwords,
    /// and the minimum password length.
    fn try_from(reg: Registration) -> Result<Self> {
        if reg.username.is_empty() || reg.username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(Error::validation(format!(
                "Username must be between 1 and {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if !reg
            .username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            return Err(Error::validation(
                "Username may only contain letters, digits and @/./+/-/_",
            ));
        }
        if !reg.email.contains('@') {
            return Err(Error::validation("Enter a valid email address"));
        }
        if reg.password1 != reg.password2 {
            return Err(Error::validation("The two password fields didn't match"));
        }
        if reg.password1.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        NewUser::new(reg.username, reg.email, &reg.password1, false, Utc::now())
    }
}

/// Raw login credentials, received from a user.
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(reg: Registration) -> String {
        match NewUser::try_from(reg) {
            Err(Error::Validation(e)) => e.message().to_string(),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("registration was accepted"),
        }
    }

    #[test]
    fn valid_registration() {
        let user = NewUser::try_from(Registration::example()).unwrap();
        assert_eq!(user.username, "alice112");
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.is_staff);
        assert_ne!(user.password_hash, "correcthorse");
    }

    #[test]
    fn invalid_registrations() {
        let reg = Registration {
            username: String::new(),
            ..Registration::example()
        };
        assert!(rejection(reg).starts_with("Username must be"));

        let reg = Registration {
            username: "alice 112".into(),
            ..Registration::example()
        };
        assert!(rejection(reg).starts_with("Username may only"));

        let reg = Registration {
            email: "alice.example.com".into(),
            ..Registration::example()
        };
        assert_eq!(rejection(reg), "Enter a valid email address");

        let reg = Registration {
            password2: "correcthorses".into(),
            ..Registration::example()
        };
        assert_eq!(rejection(reg), "The two password fields didn't match");

        let reg = Registration {
            password1: "short".into(),
            password2: "short".into(),
            ..Registration::example()
        };
        assert_eq!(rejection(reg), "Password must be at least 8 characters");
    }
}
