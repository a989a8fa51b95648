use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::db::election::NewElection;

pub const MAX_TITLE_LENGTH: usize = 30;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// An election specification, as submitted by staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_candidates_choice: u32,
}

impl TryFrom<ElectionSpec> for NewElection {
    type Error = ValidationError;

    /// Check the spec describes a sensible election.
    fn try_from(spec: ElectionSpec) -> Result<Self, Self::Error> {
        let title_length = spec.title.chars().count();
        if title_length == 0 || title_length > MAX_TITLE_LENGTH {
            return Err(ValidationError::new(format!(
                "Title must be between 1 and {MAX_TITLE_LENGTH} characters"
            )));
        }
        if spec.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::new(format!(
                "Description must be at most {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }
        if spec.end_date <= spec.start_date {
            return Err(ValidationError::new("End date must be after start date"));
        }
        if spec.max_candidates_choice == 0 {
            return Err(ValidationError::new(
                "Voters must be allowed to choose at least one candidate",
            ));
        }

        Ok(Self {
            title: spec.title,
            description: spec.description,
            image: spec.image,
            start_date: spec.start_date,
            end_date: spec.end_date,
            max_candidates_choice: spec.max_candidates_choice,
        })
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl From<NewElection> for ElectionSpec {
        fn from(election: NewElection) -> Self {
            Self {
                title: election.title,
                description: election.description,
                image: election.image,
                start_date: election.start_date,
                end_date: election.end_date,
                max_candidates_choice: election.max_candidates_choice,
            }
        }
    }

    impl ElectionSpec {
        pub fn current_example() -> Self {
            NewElection::current_example().into()
        }

        pub fn future_example() -> Self {
            NewElection::future_example().into()
        }
    }
}
