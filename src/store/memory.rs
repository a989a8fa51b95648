use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        party::{NewParty, Party},
        user::{NewUser, User},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::Id,
};

use super::{ElectionFilter, Store, ALREADY_SIGNED_UP, ALREADY_VOTED, USERNAME_TAKEN};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    parties: Vec<Party>,
    elections: Vec<Election>,
    candidates: Vec<Candidate>,
    voters: Vec<Voter>,
    votes: Vec<Vote>,
}

/// A store that keeps everything in memory behind a single lock.
///
/// Every operation holds the lock from start to finish, so each one is
/// atomic with respect to all the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

/// Replace the entry with the same ID, returning whether one existed.
macro_rules! replace_by_id {
    ($table:expr, $new:expr) => {{
        match $table.iter_mut().find(|existing| existing.id == $new.id) {
            Some(existing) => {
                *existing = $new.clone();
                true
            }
            None => false,
        }
    }};
}

/// Remove the entry with the given ID, returning whether one existed.
macro_rules! remove_by_id {
    ($table:expr, $id:expr) => {{
        let before = $table.len();
        $table.retain(|existing| existing.id != $id);
        $table.len() != before
    }};
}

#[rocket::async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(Error::validation(USERNAME_TAKEN));
        }
        let user = User { id: Id::new(), user };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn set_staff(&self, id: Id, is_staff: bool) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_staff = is_staff;
                true
            }
            None => false,
        })
    }

    async fn count_staff(&self) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().filter(|u| u.is_staff).count() as u64)
    }

    async fn insert_party(&self, party: NewParty) -> Result<Party> {
        let mut tables = self.tables.lock().await;
        let party = Party { id: Id::new(), party };
        tables.parties.push(party.clone());
        Ok(party)
    }

    async fn party_by_id(&self, id: Id) -> Result<Option<Party>> {
        let tables = self.tables.lock().await;
        Ok(tables.parties.iter().find(|p| p.id == id).cloned())
    }

    async fn parties(&self) -> Result<Vec<Party>> {
        let tables = self.tables.lock().await;
        Ok(tables.parties.clone())
    }

    async fn replace_party(&self, party: &Party) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(replace_by_id!(tables.parties, party))
    }

    async fn delete_party(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !remove_by_id!(tables.parties, id) {
            return Ok(false);
        }
        tables.candidates.retain(|c| c.party_id != Some(id));
        Ok(true)
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let mut tables = self.tables.lock().await;
        let election = Election {
            id: Id::new(),
            election,
        };
        tables.elections.push(election.clone());
        Ok(election)
    }

    async fn election_by_id(&self, id: Id) -> Result<Option<Election>> {
        let tables = self.tables.lock().await;
        Ok(tables.elections.iter().find(|e| e.id == id).cloned())
    }

    async fn elections(&self, filter: ElectionFilter) -> Result<Vec<Election>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .elections
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn replace_election(&self, election: &Election) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(replace_by_id!(tables.elections, election))
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !remove_by_id!(tables.elections, id) {
            return Ok(false);
        }
        tables.candidates.retain(|c| c.election_id != id);
        tables.voters.retain(|v| v.election_id != id);
        tables.votes.retain(|v| v.election_id != id);
        Ok(true)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut tables = self.tables.lock().await;
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        tables.candidates.push(candidate.clone());
        Ok(candidate)
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn candidates_by_ids(&self, ids: &[Id]) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| c.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(replace_by_id!(tables.candidates, candidate))
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(remove_by_id!(tables.candidates, id))
    }

    async fn voters_matching(&self, election_id: Id, user_id: Id) -> Result<Vec<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .iter()
            .filter(|v| v.election_id == election_id && v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn voters_for_user(&self, user_id: Id) -> Result<Vec<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn voters_for_election(&self, election_id: Id) -> Result<Vec<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .iter()
            .filter(|v| v.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let mut tables = self.tables.lock().await;
        if tables
            .voters
            .iter()
            .any(|v| v.election_id == voter.election_id && v.user_id == voter.user_id)
        {
            return Err(Error::validation(ALREADY_SIGNED_UP));
        }
        let voter = Voter { id: Id::new(), voter };
        tables.voters.push(voter.clone());
        Ok(voter)
    }

    async fn cast_vote(&self, voter_id: Id, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        let voter = tables
            .voters
            .iter_mut()
            .find(|v| v.id == voter_id)
            .ok_or_else(|| Error::not_found(format!("Voter with ID '{voter_id}'")))?;
        if voter.has_voted {
            return Err(Error::validation(ALREADY_VOTED));
        }
        voter.has_voted = true;

        let vote = Vote { id: Id::new(), vote };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn votes_for_election(&self, election_id: Id) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .filter(|v| v.election_id == election_id)
            .cloned()
            .collect())
    }
}
