use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    rsvp::{Rsvp, RsvpWithUserSerializer},
    schema::{meetings, rsvps, users},
    user::{User, UserView},
};

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Meeting {
    pub id: i64,
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub organizer_id: i64,
    pub group_id: Option<i64>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub quorum_threshold: i64,
    pub recurrence: String,
    pub status: String,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_place_id: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub parent_meeting_id: Option<i64>,
    pub reminder_sent_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Meeting lifecycle states. DRAFT is set once at creation; CONFIRMED and
/// PENDING_QUORUM are written only by the quorum engine; CANCELLED is the
/// one state an organizer may set directly, and it is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingStatus {
    Draft,
    PendingQuorum,
    Confirmed,
    Cancelled,
}

impl MeetingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingStatus::Draft => "DRAFT",
            MeetingStatus::PendingQuorum => "PENDING_QUORUM",
            MeetingStatus::Confirmed => "CONFIRMED",
            MeetingStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recurrence {
    None,
    Weekly,
    Biweekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "NONE",
            Recurrence::Weekly => "WEEKLY",
            Recurrence::Biweekly => "BIWEEKLY",
            Recurrence::Monthly => "MONTHLY",
        }
    }

    pub fn from_db(value: &str) -> Option<Recurrence> {
        match value {
            "NONE" => Some(Recurrence::None),
            "WEEKLY" => Some(Recurrence::Weekly),
            "BIWEEKLY" => Some(Recurrence::Biweekly),
            "MONTHLY" => Some(Recurrence::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeetingSerializer {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub organizer: UserView,
    pub group_id: Option<String>,
    pub date_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub quorum_threshold: i64,
    pub recurrence: String,
    pub status: String,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_place_id: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub parent_meeting_id: Option<String>,
    pub rsvps: Vec<RsvpWithUserSerializer>,
    pub created_at: NaiveDateTime,
}

impl MeetingSerializer {
    pub fn from_db_ty(
        meeting: Meeting,
        conn: &mut SqliteConnection,
    ) -> QueryResult<MeetingSerializer> {
        let organizer = UserView::lookup(meeting.organizer_id, conn)?;

        let group_public_id = match meeting.group_id {
            Some(group_id) => crate::schema::groups::table
                .filter(crate::schema::groups::id.eq(group_id))
                .select(crate::schema::groups::public_id)
                .get_result::<String>(conn)
                .optional()?,
            None => None,
        };

        let parent_public_id = match meeting.parent_meeting_id {
            Some(parent_id) => meetings::table
                .filter(meetings::id.eq(parent_id))
                .select(meetings::public_id)
                .get_result::<String>(conn)
                .optional()?,
            None => None,
        };

        let rsvps = rsvps::table
            .filter(rsvps::meeting_id.eq(meeting.id))
            .inner_join(users::table)
            .order_by(rsvps::created_at.asc())
            .load::<(Rsvp, User)>(conn)?
            .into_iter()
            .map(|(rsvp, user)| RsvpWithUserSerializer::from_db_ty(rsvp, user))
            .collect();

        Ok(MeetingSerializer {
            id: meeting.public_id,
            title: meeting.title,
            description: meeting.description,
            organizer,
            group_id: group_public_id,
            date_time: meeting.date_time,
            duration_minutes: meeting.duration_minutes,
            quorum_threshold: meeting.quorum_threshold,
            recurrence: meeting.recurrence,
            status: meeting.status,
            location_name: meeting.location_name,
            location_address: meeting.location_address,
            location_place_id: meeting.location_place_id,
            location_lat: meeting.location_lat,
            location_lng: meeting.location_lng,
            parent_meeting_id: parent_public_id,
            rsvps,
            created_at: meeting.created_at,
        })
    }
}
