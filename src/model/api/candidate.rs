use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{
    api::{id::ApiId, party::PartyDescription},
    db::{candidate::{Candidate, NewCandidate}, party::Party},
};

pub const MAX_NAME_LENGTH: usize = 20;

/// A candidate specification, as submitted by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub election_id: ApiId,
    pub name: String,
    #[serde(default)]
    pub party_id: Option<ApiId>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl TryFrom<CandidateSpec> for NewCandidate {
    type Error = ValidationError;

    fn try_from(spec: CandidateSpec) -> Result<Self, Self::Error> {
        let name_length = spec.name.chars().count();
        if name_length == 0 || name_length > MAX_NAME_LENGTH {
            return Err(ValidationError::new(format!(
                "Candidate name must be between 1 and {MAX_NAME_LENGTH} characters"
            )));
        }
        Ok(Self {
            election_id: spec.election_id.into(),
            name: spec.name,
            party_id: spec.party_id.map(Into::into),
            picture: spec.picture,
        })
    }
}

/// An API-friendly candidate description, with their party spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub party: Option<PartyDescription>,
    pub picture: Option<String>,
}

impl CandidateDescription {
    /// Describe `candidate`, looking up their party in `parties`.
    ///
    /// A dangling party reference is shown as no party.
    pub fn with_parties(candidate: Candidate, parties: &[Party]) -> Self {
        let party = candidate
            .party_id
            .and_then(|id| parties.iter().find(|party| party.id == id))
            .cloned()
            .map(PartyDescription::from);
        Self {
            id: candidate.id.into(),
            election_id: candidate.election_id.into(),
            party,
            name: candidate.candidate.name,
            picture: candidate.candidate.picture,
        }
    }
}
