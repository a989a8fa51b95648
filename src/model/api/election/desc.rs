use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{candidate::CandidateDescription, id::ApiId},
    db::{candidate::Candidate, election::Election, party::Party},
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_candidates_choice: u32,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            title: election.election.title,
            description: election.election.description,
            image: election.election.image,
            start_date: election.election.start_date,
            end_date: election.election.end_date,
            max_candidates_choice: election.election.max_candidates_choice,
        }
    }
}

/// A page of elections, plus which of them the caller has voted in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionList {
    pub elections: Vec<ElectionDescription>,
    /// Empty unless logged in.
    pub has_voted: Vec<ApiId>,
}

/// An election together with its candidate slate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDetail {
    #[serde(flatten)]
    pub election: ElectionDescription,
    pub candidates: Vec<CandidateDescription>,
}

impl ElectionDetail {
    /// Put together the election's view, resolving each candidate's party from `parties`.
    pub fn assemble(election: Election, candidates: Vec<Candidate>, parties: &[Party]) -> Self {
        Self {
            election: election.into(),
            candidates: candidates
                .into_iter()
                .map(|candidate| CandidateDescription::with_parties(candidate, parties))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{
        db::{candidate::NewCandidate, election::NewElection, party::NewParty},
        mongodb::Id,
    };

    #[test]
    fn assemble_resolves_parties() {
        let election = Election {
            id: Id::new(),
            election: NewElection::current_example(),
        };
        let party = Party {
            id: Id::new(),
            party: NewParty::example(),
        };
        let mut affiliated = NewCandidate::example1(election.id);
        affiliated.party_id = Some(party.id);
        let candidates = vec![
            Candidate {
                id: Id::new(),
                candidate: affiliated,
            },
            Candidate {
                id: Id::new(),
                candidate: NewCandidate::example2(election.id),
            },
        ];

        let detail = ElectionDetail::assemble(election.clone(), candidates, &[party.clone()]);

        assert_eq!(detail.election.id, ApiId::from(election.id));
        assert_eq!(detail.candidates.len(), 2);
        assert_eq!(
            detail.candidates[0].party.as_ref().map(|p| &p.name),
            Some(&party.name)
        );
        assert_eq!(detail.candidates[1].party, None);
    }
}
