use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::user::UserView;

/// A single location suggestion vote. Votes are an append-log; tallying by
/// place id happens at read time.
#[derive(Debug, Queryable, Serialize, Clone)]
pub struct LocationVote {
    pub id: i64,
    pub public_id: String,
    pub meeting_id: i64,
    pub user_id: i64,
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct LocationVoteSerializer {
    pub id: String,
    pub user: UserView,
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub created_at: NaiveDateTime,
}

impl LocationVoteSerializer {
    pub fn from_db_ty(
        vote: LocationVote,
        conn: &mut SqliteConnection,
    ) -> QueryResult<LocationVoteSerializer> {
        let user = UserView::lookup(vote.user_id, conn)?;

        Ok(LocationVoteSerializer {
            id: vote.public_id,
            user,
            place_id: vote.place_id,
            name: vote.name,
            address: vote.address,
            lat: vote.lat,
            lng: vote.lng,
            created_at: vote.created_at,
        })
    }
}
