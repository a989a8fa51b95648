use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{vote::Vote, voter::Voter},
};

/// A ballot, as submitted by a voter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub candidates: Vec<ApiId>,
}

/// Confirmation that a vote was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub id: ApiId,
    pub election_id: ApiId,
    pub chosen_candidates: Vec<ApiId>,
    pub timestamp: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            election_id: vote.election_id.into(),
            chosen_candidates: vote
                .vote
                .chosen_candidates
                .into_iter()
                .map(Into::into)
                .collect(),
            timestamp: vote.vote.timestamp,
        }
    }
}

/// A user's registration to vote in one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub user_id: ApiId,
    pub has_voted: bool,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id.into(),
            election_id: voter.election_id.into(),
            user_id: voter.user_id.into(),
            has_voted: voter.has_voted,
        }
    }
}
