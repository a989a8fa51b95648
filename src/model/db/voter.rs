use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::mongodb::Id;

use super::{election::Election, user::User};

/// Core voter data: one user's registration for one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    pub election_id: Id,
    pub user_id: Id,
    pub has_voted: bool,
}

impl VoterCore {
    /// Register `user` for `election` at time `now`.
    ///
    /// Registration closes when the election starts.
    pub fn new(election: &Election, user: &User, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        if election.started_at(now) {
            return Err(ValidationError::new(format!(
                "Signup for {} closed when the election started",
                election.title
            )));
        }
        Ok(Self {
            election_id: election.id,
            user_id: user.id,
            has_voted: false,
        })
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::model::db::{election::NewElection, user::User};

    #[test]
    fn signup_before_start() {
        let election = Election {
            id: Id::new(),
            election: NewElection::future_example(),
        };
        let user = User::example();

        let voter = NewVoter::new(&election, &user, Utc::now()).unwrap();
        assert_eq!(voter.election_id, election.id);
        assert_eq!(voter.user_id, user.id);
        assert!(!voter.has_voted);
    }

    #[test]
    fn signup_closes_at_start() {
        let election = Election {
            id: Id::new(),
            election: NewElection::future_example(),
        };
        let user = User::example();

        let at_start = NewVoter::new(&election, &user, election.start_date);
        assert!(at_start.is_err());
        let after_start = NewVoter::new(&election, &user, election.start_date + Duration::hours(1));
        assert!(after_start.is_err());
        let just_before = NewVoter::new(&election, &user, election.start_date - Duration::seconds(1));
        assert!(just_before.is_ok());
    }
}
