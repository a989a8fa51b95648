use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    options::FindOptions,
    Client, Database,
};
use rocket::{
    futures::TryStreamExt,
    http::Status,
    tokio::time::{sleep, Duration},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result, CONFLICT_MESSAGE};
use crate::model::{
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        party::{NewParty, Party},
        user::{NewUser, User},
        vote::{NewVote, Vote},
        voter::{NewVoter, Voter},
    },
    mongodb::{
        is_duplicate_key_error, is_transient_transaction_error, is_unknown_commit_result, Coll,
        Id, MongoCollection,
    },
};

use super::{ElectionFilter, Store, ALREADY_SIGNED_UP, ALREADY_VOTED, USERNAME_TAKEN};

/// A store backed by a MongoDB database.
///
/// Multi-document operations run in transactions, so the server must be
/// part of a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// Fetch every document matching `filter`, in insertion order.
    async fn find_all<T>(&self, filter: Document) -> Result<Vec<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let found = self
            .coll::<T>()
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(found)
    }

    /// One attempt at flipping the voter's `has_voted` and inserting their
    /// vote in a single transaction, returning the new vote's ID.
    ///
    /// Transient transaction errors are passed up for the caller to retry.
    async fn try_cast_vote(&self, voter_id: Id, vote: &NewVote) -> Result<Id> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        // Only flips a voter that hasn't voted yet, so concurrent casts can't both succeed.
        let filter = doc! { "_id": voter_id, "has_voted": false };
        let update = doc! { "$set": { "has_voted": true } };
        let result = self
            .coll::<Voter>()
            .update_one_with_session(filter, update, None, &mut session)
            .await?;
        if result.modified_count != 1 {
            session.abort_transaction().await?;
            let exists = self
                .coll::<Voter>()
                .find_one(voter_id.as_doc(), None)
                .await?
                .is_some();
            return Err(if exists {
                Error::validation(ALREADY_VOTED)
            } else {
                Error::not_found(format!("Voter with ID '{voter_id}'"))
            });
        }

        let inserted = self
            .coll::<NewVote>()
            .insert_one_with_session(vote, None, &mut session)
            .await?;
        let id = inserted_id(inserted.inserted_id)?;

        // An unknown commit result is safe to retry once; committing twice is a no-op.
        if let Err(e) = session.commit_transaction().await {
            if !is_unknown_commit_result(&e) {
                return Err(e.into());
            }
            session.commit_transaction().await?;
        }
        Ok(id)
    }

    /// Insert a new document, returning the ID the database assigned.
    async fn insert<T>(&self, new: &T) -> Result<Id>
    where
        T: MongoCollection + Serialize,
    {
        let inserted = self.coll::<T>().insert_one(new, None).await?;
        inserted_id(inserted.inserted_id)
    }
}

/// Attempts at recording a vote before giving up on repeated write conflicts.
const MAX_VOTE_ATTEMPTS: u32 = 3;

/// How to proceed once a vote transaction lost a write conflict, given the
/// voter as it now stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterConflict {
    AlreadyVoted,
    Missing,
    Retry,
}

fn after_conflict(voter: Option<&Voter>) -> AfterConflict {
    match voter {
        Some(voter) if voter.has_voted => AfterConflict::AlreadyVoted,
        Some(_) => AfterConflict::Retry,
        None => AfterConflict::Missing,
    }
}

/// Extract the ID the database assigned to an inserted document.
fn inserted_id(bson: Bson) -> Result<Id> {
    bson.as_object_id().map(Id::from).ok_or_else(|| {
        Error::Status(
            Status::InternalServerError,
            format!("Inserted document was given a non-ObjectId ID: {bson}"),
        )
    })
}

/// Escape a user-supplied string for literal use inside a regex.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl From<&ElectionFilter> for Document {
    fn from(filter: &ElectionFilter) -> Self {
        match filter {
            ElectionFilter::All => doc! {},
            ElectionFilter::ActiveAt(now) => {
                let now = BsonDateTime::from_chrono(*now);
                doc! {
                    "start_date": { "$lte": now },
                    "end_date": { "$gt": now },
                }
            }
            ElectionFilter::FinishedAt(now) => doc! {
                "end_date": { "$lte": BsonDateTime::from_chrono(*now) },
            },
            ElectionFilter::TitleContains(query) => doc! {
                "title": { "$regex": escape_regex(query), "$options": "i" },
            },
        }
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        match self.insert(&user).await {
            Ok(id) => Ok(User { id, user }),
            Err(Error::Db(e)) if is_duplicate_key_error(&e) => {
                Err(Error::validation(USERNAME_TAKEN))
            }
            Err(e) => Err(e),
        }
    }

    async fn user_by_id(&self, id: Id) -> Result<Option<User>> {
        Ok(self.coll::<User>().find_one(id.as_doc(), None).await?)
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>> {
        let filter = doc! { "username": username };
        Ok(self.coll::<User>().find_one(filter, None).await?)
    }

    async fn set_staff(&self, id: Id, is_staff: bool) -> Result<bool> {
        let update = doc! { "$set": { "is_staff": is_staff } };
        let result = self
            .coll::<User>()
            .update_one(id.as_doc(), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn count_staff(&self) -> Result<u64> {
        let filter = doc! { "is_staff": true };
        Ok(self.coll::<User>().count_documents(filter, None).await?)
    }

    async fn insert_party(&self, party: NewParty) -> Result<Party> {
        let id = self.insert(&party).await?;
        Ok(Party { id, party })
    }

    async fn party_by_id(&self, id: Id) -> Result<Option<Party>> {
        Ok(self.coll::<Party>().find_one(id.as_doc(), None).await?)
    }

    async fn parties(&self) -> Result<Vec<Party>> {
        self.find_all(doc! {}).await
    }

    async fn replace_party(&self, party: &Party) -> Result<bool> {
        let result = self
            .coll::<NewParty>()
            .replace_one(party.id.as_doc(), &party.party, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_party(&self, id: Id) -> Result<bool> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .coll::<Party>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }
        self.coll::<Candidate>()
            .delete_many_with_session(doc! { "party_id": id }, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn insert_election(&self, election: NewElection) -> Result<Election> {
        let id = self.insert(&election).await?;
        Ok(Election { id, election })
    }

    async fn election_by_id(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.coll::<Election>().find_one(id.as_doc(), None).await?)
    }

    async fn elections(&self, filter: ElectionFilter) -> Result<Vec<Election>> {
        self.find_all(Document::from(&filter)).await
    }

    async fn replace_election(&self, election: &Election) -> Result<bool> {
        let result = self
            .coll::<NewElection>()
            .replace_one(election.id.as_doc(), &election.election, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        // Atomically delete the election and all associated data.
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = self
            .coll::<Election>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        let filter = doc! { "election_id": id };
        self.coll::<Candidate>()
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.coll::<Voter>()
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.coll::<Vote>()
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let id = self.insert(&candidate).await?;
        Ok(Candidate { id, candidate })
    }

    async fn candidate_by_id(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.coll::<Candidate>().find_one(id.as_doc(), None).await?)
    }

    async fn candidates_by_ids(&self, ids: &[Id]) -> Result<Vec<Candidate>> {
        self.find_all(doc! { "_id": { "$in": ids.to_vec() } }).await
    }

    async fn candidates_for_election(&self, election_id: Id) -> Result<Vec<Candidate>> {
        self.find_all(doc! { "election_id": election_id }).await
    }

    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let result = self
            .coll::<NewCandidate>()
            .replace_one(candidate.id.as_doc(), &candidate.candidate, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_candidate(&self, id: Id) -> Result<bool> {
        let result = self
            .coll::<Candidate>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn voters_matching(&self, election_id: Id, user_id: Id) -> Result<Vec<Voter>> {
        self.find_all(doc! { "election_id": election_id, "user_id": user_id })
            .await
    }

    async fn voters_for_user(&self, user_id: Id) -> Result<Vec<Voter>> {
        self.find_all(doc! { "user_id": user_id }).await
    }

    async fn voters_for_election(&self, election_id: Id) -> Result<Vec<Voter>> {
        self.find_all(doc! { "election_id": election_id }).await
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        // The unique (election_id, user_id) index rejects concurrent duplicates.
        match self.insert(&voter).await {
            Ok(id) => Ok(Voter { id, voter }),
            Err(Error::Db(e)) if is_duplicate_key_error(&e) => {
                Err(Error::validation(ALREADY_SIGNED_UP))
            }
            Err(e) => Err(e),
        }
    }

    async fn cast_vote(&self, voter_id: Id, vote: NewVote) -> Result<Vote> {
        for attempt in 1..=MAX_VOTE_ATTEMPTS {
            let result = self.try_cast_vote(voter_id, &vote).await;
            let err = match result {
                Ok(id) => return Ok(Vote { id, vote }),
                Err(Error::Db(e)) if is_transient_transaction_error(&e) => e,
                Err(e) => return Err(e),
            };
            warn!("Vote by voter {voter_id} conflicted on attempt {attempt}: {err}");

            // The winner may have been another request from the same voter.
            let voter = self
                .coll::<Voter>()
                .find_one(voter_id.as_doc(), None)
                .await?;
            match after_conflict(voter.as_ref()) {
                AfterConflict::AlreadyVoted => return Err(Error::validation(ALREADY_VOTED)),
                AfterConflict::Missing => {
                    return Err(Error::not_found(format!("Voter with ID '{voter_id}'")))
                }
                AfterConflict::Retry => {
                    sleep(Duration::from_millis(20 * attempt as u64)).await;
                }
            }
        }
        Err(Error::Status(Status::Conflict, CONFLICT_MESSAGE.to_string()))
    }

    async fn votes_for_election(&self, election_id: Id) -> Result<Vec<Vote>> {
        self.find_all(doc! { "election_id": election_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!(escape_regex("plain title"), "plain title");
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("(2024) [draft]"), "\\(2024\\) \\[draft\\]");
    }

    #[test]
    fn election_filter_documents() {
        assert_eq!(Document::from(&ElectionFilter::All), doc! {});

        let now = Utc::now();
        let active = Document::from(&ElectionFilter::ActiveAt(now));
        assert!(active.contains_key("start_date"));
        assert!(active.contains_key("end_date"));

        let finished = Document::from(&ElectionFilter::FinishedAt(now));
        assert!(!finished.contains_key("start_date"));
        assert!(finished.contains_key("end_date"));

        let search = Document::from(&ElectionFilter::TitleContains("a+b".to_string()));
        let title = search.get_document("title").unwrap();
        assert_eq!(title.get_str("$regex").unwrap(), "a\\+b");
        assert_eq!(title.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn vote_conflicts() {
        let mut voter = Voter {
            id: Id::new(),
            voter: NewVoter {
                election_id: Id::new(),
                user_id: Id::new(),
                has_voted: false,
            },
        };
        // The winning transaction hasn't committed yet.
        assert_eq!(after_conflict(Some(&voter)), AfterConflict::Retry);

        // The winning transaction was this voter's other vote.
        voter.has_voted = true;
        assert_eq!(after_conflict(Some(&voter)), AfterConflict::AlreadyVoted);

        // The election was deleted meanwhile.
        assert_eq!(after_conflict(None), AfterConflict::Missing);
    }
}
