//! Eligibility and ballot rules for voters and votes.
//!
//! Every change to who may vote, and who has voted, goes through
//! [`VotingService`]. Business-rule violations surface as
//! [`Error::Validation`](crate::error::Error::Validation) with a message fit
//! for the end user.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::db::{
    candidate::Candidate,
    election::Election,
    user::User,
    vote::{NewVote, Vote},
    voter::{NewVoter, Voter},
};
use crate::store::{ElectionFilter, Store, ALREADY_SIGNED_UP};

pub struct VotingService<'a> {
    store: &'a dyn Store,
}

impl<'a> VotingService<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The voter records linking `user` to `election`; empty if they never signed up.
    pub async fn is_voter(&self, election: &Election, user: &User) -> Result<Vec<Voter>> {
        self.store.voters_matching(election.id, user.id).await
    }

    /// Sign `user` up to vote in `election`.
    pub async fn create_voter(&self, election: &Election, user: &User) -> Result<Voter> {
        if !self.is_voter(election, user).await?.is_empty() {
            return Err(Error::validation(ALREADY_SIGNED_UP));
        }
        let voter = NewVoter::new(election, user, Utc::now())?;

        // The store rejects a duplicate that slipped in since the check above.
        let voter = self.store.insert_voter(voter).await?;
        info!(
            "User {} signed up to vote in election {}",
            user.id, election.id
        );
        Ok(voter)
    }

    /// Cast `voter`'s ballot for the `chosen` candidates of `election`.
    ///
    /// The vote is validated in full before anything is written; the vote is
    /// then recorded and the voter marked as having voted in one atomic step.
    /// On success `voter.has_voted` is updated to match the store.
    pub async fn create_vote(
        &self,
        election: &Election,
        chosen: &[Candidate],
        voter: &mut Voter,
    ) -> Result<Vote> {
        let vote = NewVote::new(election, chosen, voter, Utc::now())?;
        let vote = self.store.cast_vote(voter.id, vote).await?;
        voter.has_voted = true;
        info!("Voter {} cast vote {} in election {}", voter.id, vote.id, election.id);
        Ok(vote)
    }

    /// Elections that have started and not yet ended.
    pub async fn get_active_elections(&self) -> Result<Vec<Election>> {
        self.store
            .elections(ElectionFilter::ActiveAt(Utc::now()))
            .await
    }

    /// Elections that have ended.
    pub async fn get_finished_elections(&self) -> Result<Vec<Election>> {
        self.store
            .elections(ElectionFilter::FinishedAt(Utc::now()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use rocket::local::asynchronous::Client;

    use crate::model::db::{
        candidate::NewCandidate,
        election::NewElection,
        user::NewUser,
    };
    use crate::store::{Db, ALREADY_VOTED};

    use super::*;

    /// Insert an election built from `election`, with three candidates, and a member.
    async fn setup(db: &Db, election: NewElection) -> (Election, Vec<Candidate>, User) {
        let election = db.insert_election(election).await.unwrap();
        let mut candidates = Vec::new();
        for candidate in [
            NewCandidate::example1(election.id),
            NewCandidate::example2(election.id),
            NewCandidate::example3(election.id),
        ] {
            candidates.push(db.insert_candidate(candidate).await.unwrap());
        }
        let user = db.insert_user(NewUser::example()).await.unwrap();
        (election, candidates, user)
    }

    /// Register `user` for `election` directly, whatever the election's state.
    async fn registered(db: &Db, election: &Election, user: &User) -> Voter {
        db.insert_voter(NewVoter {
            election_id: election.id,
            user_id: user.id,
            has_voted: false,
        })
        .await
        .unwrap()
    }

    fn assert_validation<T: std::fmt::Debug>(result: Result<T>, message: &str) {
        match result {
            Err(Error::Validation(e)) => assert_eq!(e.message(), message),
            other => panic!("expected validation error {message:?}, got {other:?}"),
        }
    }

    #[backend_test]
    async fn signup_once(_client: Client, db: Db) {
        let (election, _, user) = setup(&db, NewElection::future_example()).await;
        let service = VotingService::new(&*db);

        assert!(service.is_voter(&election, &user).await.unwrap().is_empty());

        let voter = service.create_voter(&election, &user).await.unwrap();
        assert_eq!(voter.election_id, election.id);
        assert_eq!(voter.user_id, user.id);
        assert!(!voter.has_voted);
        assert_eq!(vec![voter], service.is_voter(&election, &user).await.unwrap());

        assert_validation(
            service.create_voter(&election, &user).await,
            ALREADY_SIGNED_UP,
        );
        assert_eq!(1, db.voters_for_election(election.id).await.unwrap().len());
    }

    #[backend_test]
    async fn signup_closed_once_started(_client: Client, db: Db) {
        let (current, _, user) = setup(&db, NewElection::current_example()).await;
        let past = db.insert_election(NewElection::past_example()).await.unwrap();
        let service = VotingService::new(&*db);

        for election in [current, past] {
            assert_validation(
                service.create_voter(&election, &user).await,
                &format!("Signup for {} closed when the election started", election.title),
            );
            assert!(db.voters_for_election(election.id).await.unwrap().is_empty());
        }
    }

    #[backend_test]
    async fn vote_for_one_candidate(_client: Client, db: Db) {
        let (election, candidates, user) = setup(&db, NewElection::current_example()).await;
        let mut voter = registered(&db, &election, &user).await;
        let service = VotingService::new(&*db);

        let vote = service
            .create_vote(&election, &candidates[..1], &mut voter)
            .await
            .unwrap();

        assert_eq!(vote.election_id, election.id);
        assert_eq!(vote.chosen_candidates, vec![candidates[0].id]);
        assert!(voter.has_voted);

        let stored = service.is_voter(&election, &user).await.unwrap();
        assert!(stored[0].has_voted);
        assert_eq!(vec![vote], db.votes_for_election(election.id).await.unwrap());
    }

    #[backend_test]
    async fn too_many_candidates(_client: Client, db: Db) {
        let (election, candidates, user) = setup(&db, NewElection::current_example()).await;
        let mut voter = registered(&db, &election, &user).await;
        let service = VotingService::new(&*db);

        let result = service
            .create_vote(&election, &candidates[..2], &mut voter)
            .await;

        assert_validation(result, "You can only choose up to 1 candidates");
        assert!(!voter.has_voted);
        assert!(!service.is_voter(&election, &user).await.unwrap()[0].has_voted);
        assert!(db.votes_for_election(election.id).await.unwrap().is_empty());
    }

    #[backend_test]
    async fn vote_after_end(_client: Client, db: Db) {
        let (election, candidates, user) = setup(&db, NewElection::past_example()).await;
        let mut voter = registered(&db, &election, &user).await;
        let service = VotingService::new(&*db);

        let result = service
            .create_vote(&election, &candidates[..1], &mut voter)
            .await;

        assert_validation(result, "The Club Treasurer has already ended");
        assert!(!voter.has_voted);
        assert!(db.votes_for_election(election.id).await.unwrap().is_empty());
    }

    #[backend_test]
    async fn no_candidates(_client: Client, db: Db) {
        let (election, _, user) = setup(&db, NewElection::current_example()).await;
        let mut voter = registered(&db, &election, &user).await;
        let service = VotingService::new(&*db);

        let result = service.create_vote(&election, &[], &mut voter).await;

        assert_validation(result, "No candidates selected");
        assert!(db.votes_for_election(election.id).await.unwrap().is_empty());
    }

    #[backend_test]
    async fn vote_only_once(_client: Client, db: Db) {
        let (election, candidates, user) = setup(&db, NewElection::current_example()).await;
        let mut voter = registered(&db, &election, &user).await;
        let service = VotingService::new(&*db);

        // A stale copy of the voter, as a concurrent request would have read it.
        let mut stale = voter.clone();

        service
            .create_vote(&election, &candidates[..1], &mut voter)
            .await
            .unwrap();

        assert_validation(
            service
                .create_vote(&election, &candidates[1..2], &mut voter)
                .await,
            ALREADY_VOTED,
        );
        assert_validation(
            service
                .create_vote(&election, &candidates[1..2], &mut stale)
                .await,
            ALREADY_VOTED,
        );
        assert!(!stale.has_voted);
        assert_eq!(1, db.votes_for_election(election.id).await.unwrap().len());
    }

    #[backend_test]
    async fn active_and_finished_elections(_client: Client, db: Db) {
        let current = db
            .insert_election(NewElection::current_example())
            .await
            .unwrap();
        db.insert_election(NewElection::future_example())
            .await
            .unwrap();
        let past = db.insert_election(NewElection::past_example()).await.unwrap();
        let service = VotingService::new(&*db);

        assert_eq!(vec![current], service.get_active_elections().await.unwrap());
        assert_eq!(vec![past], service.get_finished_elections().await.unwrap());
    }
}
