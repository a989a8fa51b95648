use std::collections::HashSet;

use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Member},
        candidate::CandidateDescription,
        election::{ElectionDescription, ElectionDetail, ElectionList, ElectionResults},
        id::ApiId,
        party::PartyDescription,
    },
    mongodb::Id,
};
use crate::store::{Db, ElectionFilter};
use crate::voting::VotingService;

use super::common::get_election;

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        active_elections,
        finished_elections,
        election,
        election_results,
        candidate,
        parties,
    ]
}

#[get("/elections?<search>")]
async fn elections(
    token: Option<AuthToken<Member>>,
    search: Option<String>,
    db: Db,
) -> Result<Json<ElectionList>> {
    let filter = match search {
        Some(query) if !query.trim().is_empty() => {
            ElectionFilter::TitleContains(query.trim().to_string())
        }
        _ => ElectionFilter::All,
    };
    let elections = db.elections(filter).await?;

    // Anonymous visitors have voted in nothing.
    let has_voted: Vec<ApiId> = match token {
        Some(token) => {
            let voted: HashSet<Id> = db
                .voters_for_user(token.id)
                .await?
                .into_iter()
                .filter(|voter| voter.has_voted)
                .map(|voter| voter.election_id)
                .collect();
            elections
                .iter()
                .filter(|election| voted.contains(&election.id))
                .map(|election| election.id.into())
                .collect()
        }
        None => Vec::new(),
    };

    Ok(Json(ElectionList {
        elections: elections.into_iter().map(Into::into).collect(),
        has_voted,
    }))
}

#[get("/elections/active")]
async fn active_elections(db: Db) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = VotingService::new(&*db).get_active_elections().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/elections/finished")]
async fn finished_elections(db: Db) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = VotingService::new(&*db).get_finished_elections().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/elections/<election_id>")]
async fn election(
    _token: AuthToken<Member>,
    election_id: Id,
    db: Db,
) -> Result<Json<ElectionDetail>> {
    let election = get_election(election_id, &db).await?;
    let candidates = db.candidates_for_election(election_id).await?;
    let parties = db.parties().await?;
    Ok(Json(ElectionDetail::assemble(election, candidates, &parties)))
}

#[get("/elections/<election_id>/results")]
async fn election_results(
    _token: AuthToken<Member>,
    election_id: Id,
    db: Db,
) -> Result<Json<ElectionResults>> {
    let election = get_election(election_id, &db).await?;
    let candidates = db.candidates_for_election(election_id).await?;
    let votes = db.votes_for_election(election_id).await?;
    let parties = db.parties().await?;
    Ok(Json(ElectionResults::tally(
        election, candidates, &votes, &parties,
    )))
}

#[get("/candidates/<candidate_id>")]
async fn candidate(candidate_id: Id, db: Db) -> Result<Json<CandidateDescription>> {
    let candidate = db
        .candidate_by_id(candidate_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    let parties = db.parties().await?;
    Ok(Json(CandidateDescription::with_parties(candidate, &parties)))
}

#[get("/parties")]
async fn parties(db: Db) -> Result<Json<Vec<PartyDescription>>> {
    let parties = db.parties().await?;
    Ok(Json(parties.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    use crate::model::{
        db::{
            candidate::NewCandidate,
            election::{Election, NewElection},
            party::NewParty,
            user::NewUser,
            vote::NewVote,
            voter::NewVoter,
        },
    };

    async fn insert_examples(db: &Db) -> (Election, Election, Election) {
        let current = db
            .insert_election(NewElection::current_example())
            .await
            .unwrap();
        let future = db
            .insert_election(NewElection::future_example())
            .await
            .unwrap();
        let past = db.insert_election(NewElection::past_example()).await.unwrap();
        (current, future, past)
    }

    fn ids(elections: &[ElectionDescription]) -> Vec<ApiId> {
        elections.iter().map(|election| election.id).collect()
    }

    #[backend_test]
    async fn list_all(client: Client, db: Db) {
        let (current, future, past) = insert_examples(&db).await;

        let response = client.get("/elections").dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let list: ElectionList = response.into_json().await.unwrap();
        assert_eq!(
            ids(&list.elections),
            vec![ApiId::from(current.id), ApiId::from(future.id), ApiId::from(past.id)]
        );
        assert!(list.has_voted.is_empty());
    }

    #[backend_test]
    async fn search_by_title(client: Client, db: Db) {
        let (_, future, _) = insert_examples(&db).await;

        let response = client
            .get("/elections?search=TRUSTEES")
            .dispatch()
            .await;

        let list: ElectionList = response.into_json().await.unwrap();
        assert_eq!(ids(&list.elections), vec![ApiId::from(future.id)]);
    }

    #[backend_test(member)]
    async fn list_marks_voted_elections(client: Client, db: Db) {
        let (current, future, _) = insert_examples(&db).await;
        let user = db
            .user_by_username(&NewUser::example().username)
            .await
            .unwrap()
            .unwrap();
        for (election, has_voted) in [(&current, true), (&future, false)] {
            db.insert_voter(NewVoter {
                election_id: election.id,
                user_id: user.id,
                has_voted,
            })
            .await
            .unwrap();
        }

        let response = client.get("/elections").dispatch().await;

        let list: ElectionList = response.into_json().await.unwrap();
        assert_eq!(list.elections.len(), 3);
        assert_eq!(list.has_voted, vec![ApiId::from(current.id)]);
    }

    #[backend_test]
    async fn active_and_finished(client: Client, db: Db) {
        let (current, _, past) = insert_examples(&db).await;

        let response = client.get(uri!(active_elections)).dispatch().await;
        let active: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(ids(&active), vec![ApiId::from(current.id)]);

        let response = client.get(uri!(finished_elections)).dispatch().await;
        let finished: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(ids(&finished), vec![ApiId::from(past.id)]);
    }

    #[backend_test(member)]
    async fn election_detail(client: Client, db: Db) {
        let (current, future, _) = insert_examples(&db).await;
        let party = db.insert_party(NewParty::example()).await.unwrap();
        let mut candidate = NewCandidate::example1(current.id);
        candidate.party_id = Some(party.id);
        db.insert_candidate(candidate).await.unwrap();
        db.insert_candidate(NewCandidate::example2(current.id))
            .await
            .unwrap();
        db.insert_candidate(NewCandidate::example3(future.id))
            .await
            .unwrap();

        let response = client.get(uri!(election(current.id))).dispatch().await;

        assert_eq!(Status::Ok, response.status());
        let detail: ElectionDetail = response.into_json().await.unwrap();
        assert_eq!(detail.election.title, current.title);
        let names: Vec<_> = detail.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(
            detail.candidates[0].party.as_ref().map(|p| p.name.as_str()),
            Some("Reform")
        );
    }

    #[backend_test(member)]
    async fn election_not_found(client: Client) {
        let response = client.get(uri!(election(Id::new()))).dispatch().await;

        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn election_detail_requires_login(client: Client, db: Db) {
        let (current, _, _) = insert_examples(&db).await;

        let response = client.get(uri!(election(current.id))).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .get(uri!(election_results(current.id)))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(member)]
    async fn results(client: Client, db: Db) {
        let (current, _, _) = insert_examples(&db).await;
        let ada = db
            .insert_candidate(NewCandidate::example1(current.id))
            .await
            .unwrap();
        let alan = db
            .insert_candidate(NewCandidate::example2(current.id))
            .await
            .unwrap();
        for chosen in [vec![ada.id], vec![ada.id], vec![alan.id]] {
            let voter = db
                .insert_voter(NewVoter {
                    election_id: current.id,
                    user_id: Id::new(),
                    has_voted: false,
                })
                .await
                .unwrap();
            let vote = NewVote {
                election_id: current.id,
                chosen_candidates: chosen,
                timestamp: Utc::now(),
            };
            db.cast_vote(voter.id, vote).await.unwrap();
        }

        let response = client
            .get(uri!(election_results(current.id)))
            .dispatch()
            .await;

        assert_eq!(Status::Ok, response.status());
        let results: ElectionResults = response.into_json().await.unwrap();
        assert_eq!(results.total_votes, 3);
        let tally: Vec<_> = results
            .tally
            .iter()
            .map(|t| (t.candidate.name.as_str(), t.votes))
            .collect();
        assert_eq!(tally, vec![("Ada Lovelace", 2), ("Alan Turing", 1)]);
    }

    #[backend_test]
    async fn candidate_and_parties(client: Client, db: Db) {
        let (current, _, _) = insert_examples(&db).await;
        let party = db.insert_party(NewParty::example()).await.unwrap();
        let candidate = db
            .insert_candidate(NewCandidate::example2(current.id))
            .await
            .unwrap();

        let response = client.get(uri!(candidate(candidate.id))).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let desc: CandidateDescription = response.into_json().await.unwrap();
        assert_eq!(desc.name, "Alan Turing");
        assert_eq!(desc.picture, candidate.picture);

        let response = client.get(uri!(candidate(Id::new()))).dispatch().await;
        assert_eq!(Status::NotFound, response.status());

        let response = client.get(uri!(parties)).dispatch().await;
        let parties: Vec<PartyDescription> = response.into_json().await.unwrap();
        assert_eq!(parties, vec![PartyDescription::from(party)]);
    }
}
