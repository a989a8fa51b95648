use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Staff},
        candidate::{CandidateDescription, CandidateSpec},
        election::{ElectionDescription, ElectionSpec},
        party::{PartyDescription, PartySpec},
        user::{Promotion, UserDescription},
        vote::VoterDescription,
    },
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, NewElection},
        party::{NewParty, Party},
    },
    mongodb::Id,
};
use crate::store::Db;

use super::common::get_election;

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        modify_election,
        delete_election,
        election_voters,
        create_candidate,
        modify_candidate,
        delete_candidate,
        create_party,
        modify_party,
        delete_party,
        promote,
    ]
}

#[post("/staff/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Staff>,
    spec: Json<ElectionSpec>,
    db: Db,
) -> Result<Json<ElectionDescription>> {
    let election: NewElection = spec.0.try_into()?;
    let election = db.insert_election(election).await?;
    info!("Created election {} ({})", election.id, election.title);
    Ok(Json(election.into()))
}

#[put("/staff/elections/<election_id>", data = "<spec>", format = "json")]
async fn modify_election(
    _token: AuthToken<Staff>,
    election_id: Id,
    spec: Json<ElectionSpec>,
    db: Db,
) -> Result<Json<ElectionDescription>> {
    let election = Election {
        id: election_id,
        election: spec.0.try_into()?,
    };
    if !db.replace_election(&election).await? {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    Ok(Json(election.into()))
}

#[delete("/staff/elections/<election_id>")]
async fn delete_election(_token: AuthToken<Staff>, election_id: Id, db: Db) -> Result<()> {
    if !db.delete_election(election_id).await? {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    info!("Deleted election {election_id} with its candidates, voters and votes");
    Ok(())
}

#[get("/staff/elections/<election_id>/voters")]
async fn election_voters(
    _token: AuthToken<Staff>,
    election_id: Id,
    db: Db,
) -> Result<Json<Vec<VoterDescription>>> {
    get_election(election_id, &db).await?;
    let voters = db.voters_for_election(election_id).await?;
    Ok(Json(voters.into_iter().map(Into::into).collect()))
}

/// Check a candidate spec refers to things that exist.
async fn check_references(candidate: &NewCandidate, db: &Db) -> Result<()> {
    get_election(candidate.election_id, db).await?;
    if let Some(party_id) = candidate.party_id {
        if db.party_by_id(party_id).await?.is_none() {
            return Err(Error::validation(format!("No party with ID '{party_id}'")));
        }
    }
    Ok(())
}

async fn describe_candidate(candidate: Candidate, db: &Db) -> Result<CandidateDescription> {
    let parties = db.parties().await?;
    Ok(CandidateDescription::with_parties(candidate, &parties))
}

#[post("/staff/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Staff>,
    spec: Json<CandidateSpec>,
    db: Db,
) -> Result<Json<CandidateDescription>> {
    let candidate: NewCandidate = spec.0.try_into()?;
    check_references(&candidate, &db).await?;
    let candidate = db.insert_candidate(candidate).await?;
    Ok(Json(describe_candidate(candidate, &db).await?))
}

#[put("/staff/candidates/<candidate_id>", data = "<spec>", format = "json")]
async fn modify_candidate(
    _token: AuthToken<Staff>,
    candidate_id: Id,
    spec: Json<CandidateSpec>,
    db: Db,
) -> Result<Json<CandidateDescription>> {
    let existing = db
        .candidate_by_id(candidate_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate with ID '{candidate_id}'")))?;
    let candidate = Candidate {
        id: candidate_id,
        candidate: spec.0.try_into()?,
    };
    // Votes already cast for the candidate stay with its election.
    if candidate.election_id != existing.election_id {
        return Err(Error::validation(
            "A candidate cannot be moved to a different election",
        ));
    }
    check_references(&candidate, &db).await?;
    if !db.replace_candidate(&candidate).await? {
        return Err(Error::not_found(format!("Candidate with ID '{candidate_id}'")));
    }
    Ok(Json(describe_candidate(candidate, &db).await?))
}

#[delete("/staff/candidates/<candidate_id>")]
async fn delete_candidate(_token: AuthToken<Staff>, candidate_id: Id, db: Db) -> Result<()> {
    if !db.delete_candidate(candidate_id).await? {
        return Err(Error::not_found(format!("Candidate with ID '{candidate_id}'")));
    }
    Ok(())
}

#[post("/staff/parties", data = "<spec>", format = "json")]
async fn create_party(
    _token: AuthToken<Staff>,
    spec: Json<PartySpec>,
    db: Db,
) -> Result<Json<PartyDescription>> {
    let party: NewParty = spec.0.try_into()?;
    let party = db.insert_party(party).await?;
    Ok(Json(party.into()))
}

#[put("/staff/parties/<party_id>", data = "<spec>", format = "json")]
async fn modify_party(
    _token: AuthToken<Staff>,
    party_id: Id,
    spec: Json<PartySpec>,
    db: Db,
) -> Result<Json<PartyDescription>> {
    let existing = db
        .party_by_id(party_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Party with ID '{party_id}'")))?;
    let party = Party {
        id: party_id,
        party: spec.0.into_party(existing.creation_date)?,
    };
    if !db.replace_party(&party).await? {
        return Err(Error::not_found(format!("Party with ID '{party_id}'")));
    }
    Ok(Json(party.into()))
}

#[delete("/staff/parties/<party_id>")]
async fn delete_party(_token: AuthToken<Staff>, party_id: Id, db: Db) -> Result<()> {
    if !db.delete_party(party_id).await? {
        return Err(Error::not_found(format!("Party with ID '{party_id}'")));
    }
    info!("Deleted party {party_id} with its candidates");
    Ok(())
}

#[post("/staff/promote", data = "<promotion>", format = "json")]
async fn promote(
    _token: AuthToken<Staff>,
    promotion: Json<Promotion>,
    db: Db,
) -> Result<Json<UserDescription>> {
    let mut user = db
        .user_by_username(&promotion.username)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", promotion.username)))?;
    db.set_staff(user.id, true).await?;
    user.is_staff = true;
    info!("Granted staff rights to {}", user.username);
    Ok(Json(user.into()))
}
