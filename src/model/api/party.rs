use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{
    api::id::ApiId,
    db::party::{NewParty, Party},
};

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// A party specification, as submitted by staff.
///
/// The creation date is not part of the spec: it is set when the party is
/// first created and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PartySpec {
    /// Validate the spec into a party created on `creation_date`.
    pub fn into_party(self, creation_date: NaiveDate) -> Result<NewParty, ValidationError> {
        let name_length = self.name.chars().count();
        if name_length == 0 || name_length > MAX_NAME_LENGTH {
            return Err(ValidationError::new(format!(
                "Party name must be between 1 and {MAX_NAME_LENGTH} characters"
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::new(format!(
                "Party description must be at most {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }
        Ok(NewParty {
            name: self.name,
            description: self.description,
            creation_date,
        })
    }
}

/// A brand new party, created today.
impl TryFrom<PartySpec> for NewParty {
    type Error = ValidationError;

    fn try_from(spec: PartySpec) -> Result<Self, Self::Error> {
        spec.into_party(Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDescription {
    pub id: ApiId,
    pub name: String,
    pub description: String,
    pub creation_date: NaiveDate,
}

impl From<Party> for PartyDescription {
    fn from(party: Party) -> Self {
        Self {
            id: party.id.into(),
            name: party.party.name,
            description: party.party.description,
            creation_date: party.party.creation_date,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length() {
        assert_eq!(
            NewParty::try_from(PartySpec::example()).unwrap(),
            NewParty::example()
        );

        let spec = PartySpec {
            name: "x".repeat(MAX_NAME_LENGTH + 1),
            ..PartySpec::example()
        };
        assert!(NewParty::try_from(spec).is_err());
    }

    #[test]
    fn description_length() {
        let spec = PartySpec {
            description: "x".repeat(MAX_DESCRIPTION_LENGTH),
            ..PartySpec::example()
        };
        assert!(NewParty::try_from(spec).is_ok());

        let spec = PartySpec {
            description: "x".repeat(MAX_DESCRIPTION_LENGTH + 1),
            ..PartySpec::example()
        };
        assert_eq!(
            NewParty::try_from(spec).unwrap_err().message(),
            "Party description must be at most 500 characters"
        );
    }

    #[test]
    fn creation_date_is_never_taken_from_the_client() {
        let spec: PartySpec = rocket::serde::json::serde_json::from_str(
            r#"{"name": "Reform", "description": "", "creation_date": "1900-01-01"}"#,
        )
        .unwrap();
        let party = NewParty::try_from(spec.clone()).unwrap();
        assert_eq!(party.creation_date, Utc::now().date_naive());

        let founded = NaiveDate::from_ymd_opt(1999, 5, 1).unwrap();
        assert_eq!(spec.into_party(founded).unwrap().creation_date, founded);
    }
}
