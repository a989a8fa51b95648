//! The persistent store behind every request.
//!
//! Routes never talk to MongoDB directly: they go through the [`Store`] trait
//! object held in [`Db`], so the same handlers run against MongoDB in
//! production and against [`MemoryStore`] in tests.

use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mongodb::{error::Error as DbError, Client};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::error::Result;
use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionCore, NewElection},
        party::{NewParty, Party},
        user::{NewUser, User},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{ensure_indexes_exist, Id},
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Message for a second signup by the same user for the same election.
pub const ALREADY_SIGNED_UP: &str = "You are already signed up to vote in this election";
/// Message for a second vote by the same voter.
pub const ALREADY_VOTED: &str = "You have already voted";
/// Message for a taken username.
pub const USERNAME_TAKEN: &str = "That username is already in use";

/// Which elections to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElectionFilter {
    All,
    /// Started at or before the instant and not yet ended.
    ActiveAt(DateTime<Utc>),
    /// Ended at or before the instant.
    FinishedAt(DateTime<Utc>),
    /// Case-insensitive substring of the title.
    TitleContains(String),
}

impl ElectionFilter {
    /// Does the given election pass this filter?
    pub fn matches(&self, election: &ElectionCore) -> bool {
        match self {
            Self::All => true,
            Self::ActiveAt(now) => election.active_at(*now),
            Self::FinishedAt(now) => election.finished_at(*now),
            Self::TitleContains(query) => election
                .title
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

/// Transactional save/query operations on every entity.
///
/// Lookups return `Ok(None)` for missing entities; `replace_*` and `delete_*`
/// return whether anything matched.
#[rocket::async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User>;
    async fn user_by_id(&self, id: Id) -> Result<Option<User>>;
    async fn user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn set_staff(&self, id: Id, is_staff: bool) -> Result<bool>;
    async fn count_staff(&self) -> Result<u64>;

    async fn insert_party(&self, party: NewParty) -> Result<Party>;
    async fn party_by_id(&self, id: Id) -> Result<Option<Party>>;
    async fn parties(&self) -> Result<Vec<Party>>;
    async fn replace_party(&self, party: &Party) -> Result<bool>;
    /// Also deletes every candidate affiliated with the party.
    async fn delete_party(&self, id: Id) -> Result<bool>;

    async fn insert_election(&self, election: NewElection) -> Result<Election>;
    async fn election_by_id(&self, id: Id) -> Result<Option<Election>>;
    /// Elections in creation order.
    async fn elections(&self, filter: ElectionFilter) -> Result<Vec<Election>>;
    async fn replace_election(&self, election: &Election) -> Result<bool>;
    /// Also deletes the election's candidates, voters and votes.
    async fn delete_election(&self, id: Id) -> Result<bool>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;
    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>>;
    /// The candidates that exist among `ids`; missing ones are skipped.
    async fn candidates_by_ids(&self, ids: &[Id]) -> Result<Vec<Candidate>>;
    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>>;
    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool>;
    async fn delete_candidate(&self, id: Id) -> Result<bool>;

    async fn voters_matching(&self, election_id: Id, user_id: Id) -> Result<Vec<Voter>>;
    async fn voters_for_user(&self, user_id: Id) -> Result<Vec<Voter>>;
    async fn voters_for_election(&self, election_id: Id) -> Result<Vec<Voter>>;
    /// Fails validation if the user already has a voter record for the election.
    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter>;

    /// Atomically mark the voter as having voted and record their vote.
    ///
    /// Fails validation, writing nothing, if the voter has already voted.
    async fn cast_vote(&self, voter_id: Id, vote: NewVote) -> Result<Vote>;
    async fn votes_for_election(&self, election_id: Id) -> Result<Vec<Vote>>;
}

/// A shared handle on the store, kept in Rocket's managed state.
#[derive(Clone)]
pub struct Db(Arc<dyn Store>);

impl Db {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self(Arc::new(MemoryStore::default()))
    }

    /// A MongoDB-backed store on the named database, with indexes in place.
    pub async fn mongo(client: Client, db_name: &str) -> std::result::Result<Self, DbError> {
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self(Arc::new(MongoStore::new(client, db))))
    }
}

impl Deref for Db {
    type Target = dyn Store;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Db {
    type Error = ();

    /// Get the store from the managed state.
    ///
    /// Panics iff the [`Db`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Db>>().await.unwrap();
        request::Outcome::Success(db.inner().clone())
    }
}
