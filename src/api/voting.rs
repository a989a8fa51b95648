use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Member},
        vote::{VoteReceipt, VoteRequest, VoterDescription},
    },
    db::candidate::Candidate,
    mongodb::Id,
};
use crate::store::Db;
use crate::voting::VotingService;

use super::common::{get_election, user_from_token};

pub fn routes() -> Vec<Route> {
    routes![signup, voter, vote]
}

#[post("/elections/<election_id>/signup")]
async fn signup(
    token: AuthToken<Member>,
    election_id: Id,
    db: Db,
) -> Result<Json<VoterDescription>> {
    let election = get_election(election_id, &db).await?;
    let user = user_from_token(&token, &db).await?;

    let voter = VotingService::new(&*db)
        .create_voter(&election, &user)
        .await?;
    Ok(Json(voter.into()))
}

#[get("/elections/<election_id>/voter")]
async fn voter(
    token: AuthToken<Member>,
    election_id: Id,
    db: Db,
) -> Result<Json<VoterDescription>> {
    let election = get_election(election_id, &db).await?;
    let user = user_from_token(&token, &db).await?;

    let voter = VotingService::new(&*db)
        .is_voter(&election, &user)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("Voter registration for {}", election.title)))?;
    Ok(Json(voter.into()))
}

#[post("/elections/<election_id>/vote", data = "<ballot>", format = "json")]
async fn vote(
    token: AuthToken<Member>,
    election_id: Id,
    ballot: Json<VoteRequest>,
    db: Db,
) -> Result<Json<VoteReceipt>> {
    let election = get_election(election_id, &db).await?;
    let user = user_from_token(&token, &db).await?;
    let service = VotingService::new(&*db);

    // Only registered voters may vote.
    let mut voter = service
        .is_voter(&election, &user)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::not_found(format!(
                "Voter registration for {}; sign up before voting",
                election.title
            ))
        })?;

    // Resolve the chosen candidates, keeping the ballot's order and any repeats.
    let ids: Vec<Id> = ballot.candidates.iter().map(|id| **id).collect();
    let found = db.candidates_by_ids(&ids).await?;
    let chosen = ids
        .iter()
        .map(|id| {
            found
                .iter()
                .find(|candidate| candidate.id == *id)
                .cloned()
                .ok_or_else(|| Error::validation("Candidate does not exist"))
        })
        .collect::<Result<Vec<Candidate>>>()?;

    let vote = service.create_vote(&election, &chosen, &mut voter).await?;
    Ok(Json(vote.into()))
}
