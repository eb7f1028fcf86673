use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    schema::meetings,
    user::{User, UserView},
};

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Rsvp {
    pub id: i64,
    pub public_id: String,
    pub meeting_id: i64,
    pub user_id: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpStatus {
    Pending,
    Yes,
    No,
    Maybe,
}

impl RsvpStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RsvpStatus::Pending => "PENDING",
            RsvpStatus::Yes => "YES",
            RsvpStatus::No => "NO",
            RsvpStatus::Maybe => "MAYBE",
        }
    }
}

/// The projection returned from the upsert endpoint: no joined user.
#[derive(Debug, Serialize)]
pub struct RsvpSerializer {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl RsvpSerializer {
    pub fn from_db_ty(
        rsvp: Rsvp,
        conn: &mut SqliteConnection,
    ) -> QueryResult<RsvpSerializer> {
        let meeting_public_id = meetings::table
            .filter(meetings::id.eq(rsvp.meeting_id))
            .select(meetings::public_id)
            .get_result::<String>(conn)?;

        let user_public_id = crate::schema::users::table
            .filter(crate::schema::users::id.eq(rsvp.user_id))
            .select(crate::schema::users::public_id)
            .get_result::<String>(conn)?;

        Ok(RsvpSerializer {
            id: rsvp.public_id,
            meeting_id: meeting_public_id,
            user_id: user_public_id,
            status: rsvp.status,
            created_at: rsvp.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RsvpWithUserSerializer {
    pub id: String,
    pub status: String,
    pub user: UserView,
    pub created_at: NaiveDateTime,
}

impl RsvpWithUserSerializer {
    pub fn from_db_ty(rsvp: Rsvp, user: User) -> RsvpWithUserSerializer {
        RsvpWithUserSerializer {
            id: rsvp.public_id,
            status: rsvp.status,
            user: UserView::from_db_ty(user),
            created_at: rsvp.created_at,
        }
    }
}
