use std::collections::HashSet;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::mongodb::Id;

use super::{candidate::Candidate, election::Election, voter::Voter};

/// Core vote data: an anonymous record of one voter's choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: Id,
    pub chosen_candidates: Vec<Id>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

impl VoteCore {
    /// Build a vote by `voter` for `chosen` candidates in `election`, timestamped `now`.
    ///
    /// Every rule that can be checked without touching the store is checked here,
    /// so an invalid vote is never written.
    pub fn new(
        election: &Election,
        chosen: &[Candidate],
        voter: &Voter,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if voter.election_id != election.id {
            return Err(ValidationError::new(format!(
                "You are not signed up to vote in {}",
                election.title
            )));
        }
        if voter.has_voted {
            return Err(ValidationError::new("You have already voted"));
        }
        if chosen.is_empty() {
            return Err(ValidationError::new("No candidates selected"));
        }
        if let Some(outsider) = chosen.iter().find(|c| c.election_id != election.id) {
            return Err(ValidationError::new(format!(
                "{} is not a candidate in {}",
                outsider.name, election.title
            )));
        }
        let mut seen = HashSet::new();
        if let Some(repeated) = chosen.iter().find(|c| !seen.insert(c.id)) {
            return Err(ValidationError::new(format!(
                "{} was chosen more than once",
                repeated.name
            )));
        }
        if chosen.len() > election.max_candidates_choice as usize {
            return Err(ValidationError::new(format!(
                "You can only choose up to {} candidates",
                election.max_candidates_choice
            )));
        }
        if now >= election.end_date {
            return Err(ValidationError::new(format!(
                "The {} has already ended",
                election.title
            )));
        }

        Ok(Self {
            election_id: election.id,
            chosen_candidates: chosen.iter().map(|c| c.id).collect(),
            timestamp: now,
        })
    }
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::model::db::{
        candidate::NewCandidate, election::NewElection, voter::NewVoter,
    };

    fn fixture(max_choice: u32) -> (Election, Vec<Candidate>, Voter) {
        let mut election = Election {
            id: Id::new(),
            election: NewElection::current_example(),
        };
        election.max_candidates_choice = max_choice;
        let candidates = vec![
            NewCandidate::example1(election.id),
            NewCandidate::example2(election.id),
        ]
        .into_iter()
        .map(|candidate| Candidate {
            id: Id::new(),
            candidate,
        })
        .collect();
        let voter = Voter {
            id: Id::new(),
            voter: NewVoter {
                election_id: election.id,
                user_id: Id::new(),
                has_voted: false,
            },
        };
        (election, candidates, voter)
    }

    fn message(result: Result<NewVote, ValidationError>) -> String {
        result.unwrap_err().message().to_string()
    }

    #[test]
    fn valid_vote() {
        let (election, candidates, voter) = fixture(1);
        let now = Utc::now();

        let vote = NewVote::new(&election, &candidates[..1], &voter, now).unwrap();
        assert_eq!(vote.election_id, election.id);
        assert_eq!(vote.chosen_candidates, vec![candidates[0].id]);
        assert_eq!(vote.timestamp, now);
    }

    #[test]
    fn too_many_candidates() {
        let (election, candidates, voter) = fixture(1);
        let result = NewVote::new(&election, &candidates, &voter, Utc::now());
        assert_eq!(message(result), "You can only choose up to 1 candidates");

        let (election, candidates, voter) = fixture(2);
        assert!(NewVote::new(&election, &candidates, &voter, Utc::now()).is_ok());
    }

    #[test]
    fn at_or_after_end() {
        let (election, candidates, voter) = fixture(1);

        let at_end = NewVote::new(&election, &candidates[..1], &voter, election.end_date);
        assert_eq!(message(at_end), "The Student Council has already ended");

        let after_end = election.end_date + Duration::minutes(1);
        assert!(NewVote::new(&election, &candidates[..1], &voter, after_end).is_err());

        let just_before = election.end_date - Duration::milliseconds(1);
        assert!(NewVote::new(&election, &candidates[..1], &voter, just_before).is_ok());
    }

    #[test]
    fn empty_selection() {
        let (election, _, voter) = fixture(1);
        let result = NewVote::new(&election, &[], &voter, Utc::now());
        assert_eq!(message(result), "No candidates selected");
    }

    #[test]
    fn foreign_candidate() {
        let (election, _, voter) = fixture(1);
        let (_, other_candidates, _) = fixture(1);
        let result = NewVote::new(&election, &other_candidates[..1], &voter, Utc::now());
        assert_eq!(message(result), "Ada Lovelace is not a candidate in Student Council");
    }

    #[test]
    fn repeated_candidate() {
        let (election, candidates, voter) = fixture(2);
        let chosen = vec![candidates[0].clone(), candidates[0].clone()];
        let result = NewVote::new(&election, &chosen, &voter, Utc::now());
        assert_eq!(message(result), "Ada Lovelace was chosen more than once");
    }

    #[test]
    fn voter_state() {
        let (election, candidates, mut voter) = fixture(1);

        voter.has_voted = true;
        let result = NewVote::new(&election, &candidates[..1], &voter, Utc::now());
        assert_eq!(message(result), "You have already voted");

        voter.has_voted = false;
        voter.election_id = Id::new();
        let result = NewVote::new(&election, &candidates[..1], &voter, Utc::now());
        assert_eq!(message(result), "You are not signed up to vote in Student Council");
    }
}
