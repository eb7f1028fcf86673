use db::{
    location::{LocationVote, LocationVoteSerializer},
    schema::location_votes,
    user::User,
    DbConn,
};
use diesel::{insert_into, prelude::*};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rocket::{http::Status, serde::json::Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, meetings::meeting_by_public_id};

/// A location suggestion from the place provider.
#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub types: Vec<String>,
}

fn place(
    place_id: &str,
    name: &str,
    address: &str,
    lat: f64,
    lng: f64,
    types: &[&str],
) -> Place {
    Place {
        place_id: place_id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        lat,
        lng,
        types: types.iter().map(|t| t.to_string()).collect(),
    }
}

// Static stand-in for a real place provider. The search/details/auto-pick
// contract is the stable part; the data behind it is not.
static PLACES: Lazy<Vec<Place>> = Lazy::new(|| {
    vec![
        place(
            "mock-place-1",
            "The Coffee House",
            "123 Main St, Springfield",
            37.7749,
            -122.4194,
            &["cafe", "food"],
        ),
        place(
            "mock-place-2",
            "Riverside Park",
            "456 River Rd, Springfield",
            37.7739,
            -122.4312,
            &["park", "outdoors"],
        ),
        place(
            "mock-place-3",
            "The Board Room",
            "789 Oak Ave, Springfield",
            37.7751,
            -122.4183,
            &["bar", "food"],
        ),
    ]
});

pub(crate) fn search_places(query: &str) -> Vec<Place> {
    let query = query.to_lowercase();
    PLACES
        .iter()
        .filter(|place| {
            place.name.to_lowercase().contains(&query)
                || place.address.to_lowercase().contains(&query)
                || place.types.iter().any(|t| t.contains(&query))
        })
        .cloned()
        .collect()
}

#[get("/places/search?<q>")]
pub async fn do_search(
    q: Option<String>,
    _user: User,
) -> Result<Json<Value>, ApiError> {
    let query = q.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::Validation(
            "Query parameter \"q\" is required".to_string(),
        ));
    }
    Ok(Json(json!({ "places": search_places(&query) })))
}

#[get("/places/<place_id>")]
pub async fn get_place_details(
    place_id: String,
    _user: User,
) -> Result<Json<Value>, ApiError> {
    let found = PLACES
        .iter()
        .find(|place| place.place_id == place_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Place not found".to_string()))?;
    Ok(Json(json!({ "place": found })))
}

#[get("/places/meetings/<meeting_id>/auto-pick")]
pub async fn auto_pick_location(
    meeting_id: String,
    _user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        meeting_by_public_id(&meeting_id, conn)?;
        // todo: score candidates by vote tallies and attendee proximity
        let picked = PLACES.first().cloned().ok_or_else(|| {
            ApiError::NotFound("Place not found".to_string())
        })?;
        Ok(Json(json!({ "place": picked })))
    })
    .await
}

#[derive(Debug, Serialize)]
pub struct PlaceTally {
    pub place_id: String,
    pub name: String,
    pub count: usize,
}

#[get("/meetings/<meeting_id>/location-votes")]
pub async fn list_location_votes(
    meeting_id: String,
    _user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let meeting = meeting_by_public_id(&meeting_id, conn)?;

        let votes = location_votes::table
            .filter(location_votes::meeting_id.eq(meeting.id))
            .order_by(location_votes::created_at.asc())
            .load::<LocationVote>(conn)?;

        let mut tally = votes
            .iter()
            .map(|vote| (vote.place_id.as_str(), vote.name.as_str()))
            .counts()
            .into_iter()
            .map(|((place_id, name), count)| PlaceTally {
                place_id: place_id.to_string(),
                name: name.to_string(),
                count,
            })
            .collect::<Vec<_>>();
        tally.sort_by(|a, b| b.count.cmp(&a.count));

        let serialized = votes
            .into_iter()
            .map(|vote| LocationVoteSerializer::from_db_ty(vote, conn))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Json(json!({ "votes": serialized, "tally": tally })))
    })
    .await
}

#[derive(Deserialize)]
pub struct LocationVotePayload {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[post(
    "/meetings/<meeting_id>/location-votes",
    data = "<payload>",
    format = "json"
)]
pub async fn cast_location_vote(
    meeting_id: String,
    user: User,
    payload: Json<LocationVotePayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();
    if payload.place_id.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(ApiError::Validation(
            "A place id and name are required".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meeting_by_public_id(&meeting_id, conn)?;

            let vote = insert_into(location_votes::table)
                .values((
                    location_votes::public_id
                        .eq(Uuid::now_v7().to_string()),
                    location_votes::meeting_id.eq(meeting.id),
                    location_votes::user_id.eq(user.id),
                    location_votes::place_id.eq(payload.place_id.trim()),
                    location_votes::name.eq(payload.name.trim()),
                    location_votes::address.eq(&payload.address),
                    location_votes::lat.eq(payload.lat),
                    location_votes::lng.eq(payload.lng),
                    location_votes::created_at.eq(diesel::dsl::now),
                ))
                .get_result::<LocationVote>(conn)?;

            let serialized = LocationVoteSerializer::from_db_ty(vote, conn)?;
            Ok((Status::Created, Json(json!({ "vote": serialized }))))
        })
    })
    .await
}

#[delete("/meetings/<meeting_id>/location-votes/<vote_id>")]
pub async fn delete_location_vote(
    meeting_id: String,
    vote_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meeting_by_public_id(&meeting_id, conn)?;

            let vote = location_votes::table
                .filter(location_votes::meeting_id.eq(meeting.id))
                .filter(location_votes::public_id.eq(&vote_id))
                .first::<LocationVote>(conn)
                .optional()?
                .ok_or_else(|| {
                    ApiError::NotFound("Vote not found".to_string())
                })?;

            if vote.user_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the voter can withdraw this vote".to_string(),
                ));
            }

            diesel::delete(
                location_votes::table
                    .filter(location_votes::id.eq(vote.id)),
            )
            .execute(conn)?;

            Ok(Status::NoContent)
        })
    })
    .await
}
