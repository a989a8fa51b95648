use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{
    api::candidate::CandidateDescription,
    db::{candidate::Candidate, election::Election, party::Party, vote::Vote},
    mongodb::Id,
};

use super::ElectionDescription;

/// The number of votes one candidate received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate: CandidateDescription,
    pub votes: u64,
}

/// Vote counts for every candidate in an election, in slate order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election: ElectionDescription,
    /// Number of ballots cast.
    pub total_votes: u64,
    pub tally: Vec<CandidateTally>,
}

impl ElectionResults {
    /// Count each vote once for every candidate it chose.
    pub fn tally(
        election: Election,
        candidates: Vec<Candidate>,
        votes: &[Vote],
        parties: &[Party],
    ) -> Self {
        let mut counts: HashMap<Id, u64> = HashMap::new();
        for candidate_id in votes.iter().flat_map(|vote| &vote.chosen_candidates) {
            *counts.entry(*candidate_id).or_default() += 1;
        }

        let tally = candidates
            .into_iter()
            .map(|candidate| CandidateTally {
                votes: counts.get(&candidate.id).copied().unwrap_or(0),
                candidate: CandidateDescription::with_parties(candidate, parties),
            })
            .collect();

        Self {
            election: election.into(),
            total_votes: votes.len() as u64,
            tally,
        }
    }
}
