use chrono::NaiveDateTime;
use db::{
    group::GroupMember,
    meeting::{Meeting, MeetingSerializer, MeetingStatus, Recurrence},
    schema::{group_members, groups, invites, location_votes, meetings, rsvps, users},
    user::User,
    DbConn,
};
use diesel::{insert_into, prelude::*};
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, notify, util::parse_date_time};

const DEFAULT_DURATION_MINUTES: i64 = 60;
const DEFAULT_QUORUM_THRESHOLD: i64 = 3;

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() || title.chars().count() > 200 {
        return Err(ApiError::Validation(
            "Title must be between 1 and 200 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_optional_fields(
    description: &Option<String>,
    duration_minutes: Option<i64>,
    quorum_threshold: Option<i64>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
) -> Result<(), ApiError> {
    if let Some(description) = description {
        if description.chars().count() > 2000 {
            return Err(ApiError::Validation(
                "Description must be at most 2000 characters".to_string(),
            ));
        }
    }
    if let Some(duration) = duration_minutes {
        if !(15..=480).contains(&duration) {
            return Err(ApiError::Validation(
                "Duration must be between 15 and 480 minutes".to_string(),
            ));
        }
    }
    if let Some(quorum) = quorum_threshold {
        if !(1..=100).contains(&quorum) {
            return Err(ApiError::Validation(
                "Minimum attendees must be between 1 and 100".to_string(),
            ));
        }
    }
    if let Some(lat) = location_lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::Validation(
                "Latitude must be between -90 and 90".to_string(),
            ));
        }
    }
    if let Some(lng) = location_lng {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ApiError::Validation(
                "Longitude must be between -180 and 180".to_string(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn meeting_by_public_id(
    public_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Meeting, ApiError> {
    meetings::table
        .filter(meetings::public_id.eq(public_id))
        .first::<Meeting>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Meeting not found".to_string()))
}

#[get("/meetings")]
pub async fn list_meetings(
    user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let rsvp_meeting_ids = rsvps::table
            .filter(rsvps::user_id.eq(user.id))
            .select(rsvps::meeting_id);

        let listed = meetings::table
            .filter(
                meetings::organizer_id
                    .eq(user.id)
                    .or(meetings::id.eq_any(rsvp_meeting_ids)),
            )
            .order_by(meetings::date_time.asc())
            .load::<Meeting>(conn)?
            .into_iter()
            .map(|meeting| MeetingSerializer::from_db_ty(meeting, conn))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Json(json!({ "meetings": listed })))
    })
    .await
}

#[get("/meetings/<meeting_id>")]
pub async fn get_meeting(
    meeting_id: String,
    _user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let meeting = meeting_by_public_id(&meeting_id, conn)?;
        let serialized = MeetingSerializer::from_db_ty(meeting, conn)?;
        Ok(Json(json!({ "meeting": serialized })))
    })
    .await
}

#[derive(Deserialize)]
pub struct CreateMeetingPayload {
    pub title: String,
    pub description: Option<String>,
    pub date_time: String,
    pub duration_minutes: Option<i64>,
    pub quorum_threshold: Option<i64>,
    pub recurrence: Option<Recurrence>,
    pub group_id: Option<String>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_place_id: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
}

#[post("/meetings", data = "<payload>", format = "json")]
pub async fn create_meeting(
    user: User,
    payload: Json<CreateMeetingPayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();

    validate_title(&payload.title)?;
    validate_optional_fields(
        &payload.description,
        payload.duration_minutes,
        payload.quorum_threshold,
        payload.location_lat,
        payload.location_lng,
    )?;
    let date_time = parse_date_time(&payload.date_time).ok_or_else(|| {
        ApiError::Validation("Please provide a valid date and time".to_string())
    })?;

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let group_id = match &payload.group_id {
                Some(group_public_id) => {
                    let group_id = groups::table
                        .filter(groups::public_id.eq(group_public_id))
                        .select(groups::id)
                        .get_result::<i64>(conn)
                        .optional()?
                        .ok_or_else(|| {
                            ApiError::NotFound("Group not found".to_string())
                        })?;
                    let is_member = group_members::table
                        .filter(GroupMember::of_user_in_group(
                            user.id, group_id,
                        ))
                        .count()
                        .get_result::<i64>(conn)?
                        > 0;
                    if !is_member {
                        return Err(ApiError::Forbidden(
                            "You are not a member of this group".to_string(),
                        ));
                    }
                    Some(group_id)
                }
                None => None,
            };

            let meeting = insert_into(meetings::table)
                .values((
                    meetings::public_id.eq(Uuid::now_v7().to_string()),
                    meetings::title.eq(payload.title.trim()),
                    meetings::description.eq(&payload.description),
                    meetings::organizer_id.eq(user.id),
                    meetings::group_id.eq(group_id),
                    meetings::date_time.eq(date_time),
                    meetings::duration_minutes.eq(payload
                        .duration_minutes
                        .unwrap_or(DEFAULT_DURATION_MINUTES)),
                    meetings::quorum_threshold.eq(payload
                        .quorum_threshold
                        .unwrap_or(DEFAULT_QUORUM_THRESHOLD)),
                    meetings::recurrence.eq(payload
                        .recurrence
                        .unwrap_or(Recurrence::None)
                        .as_str()),
                    meetings::status.eq(MeetingStatus::Draft.as_str()),
                    meetings::location_name.eq(&payload.location_name),
                    meetings::location_address.eq(&payload.location_address),
                    meetings::location_place_id.eq(&payload.location_place_id),
                    meetings::location_lat.eq(payload.location_lat),
                    meetings::location_lng.eq(payload.location_lng),
                    meetings::created_at.eq(diesel::dsl::now),
                ))
                .get_result::<Meeting>(conn)?;

            notify::meeting_created(
                conn,
                (user.name.as_str(), user.email.as_str()),
                &meeting.title,
                meeting.date_time,
            );

            let serialized = MeetingSerializer::from_db_ty(meeting, conn)?;
            Ok((Status::Created, Json(json!({ "meeting": serialized }))))
        })
    })
    .await
}

#[derive(Deserialize)]
pub struct UpdateMeetingPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_time: Option<String>,
    pub duration_minutes: Option<i64>,
    pub quorum_threshold: Option<i64>,
    pub recurrence: Option<Recurrence>,
    pub status: Option<MeetingStatus>,
    pub location_name: Option<String>,
    pub location_address: Option<String>,
    pub location_place_id: Option<String>,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
}

impl UpdateMeetingPayload {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date_time.is_none()
            && self.duration_minutes.is_none()
            && self.quorum_threshold.is_none()
            && self.recurrence.is_none()
            && self.status.is_none()
            && self.location_name.is_none()
            && self.location_address.is_none()
            && self.location_place_id.is_none()
            && self.location_lat.is_none()
            && self.location_lng.is_none()
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = meetings)]
struct MeetingChanges {
    title: Option<String>,
    description: Option<String>,
    date_time: Option<NaiveDateTime>,
    duration_minutes: Option<i64>,
    quorum_threshold: Option<i64>,
    recurrence: Option<String>,
    status: Option<String>,
    location_name: Option<String>,
    location_address: Option<String>,
    location_place_id: Option<String>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
}

#[put("/meetings/<meeting_id>", data = "<payload>", format = "json")]
pub async fn update_meeting(
    meeting_id: String,
    user: User,
    payload: Json<UpdateMeetingPayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.into_inner();

    if payload.is_empty() {
        return Err(ApiError::Validation(
            "At least one field must be provided".to_string(),
        ));
    }
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }
    validate_optional_fields(
        &payload.description,
        payload.duration_minutes,
        payload.quorum_threshold,
        payload.location_lat,
        payload.location_lng,
    )?;
    // CONFIRMED and PENDING_QUORUM belong to the quorum engine; the one
    // transition an organizer may force is cancellation.
    if let Some(status) = payload.status {
        if status != MeetingStatus::Cancelled {
            return Err(ApiError::Validation(
                "Status can only be set to CANCELLED".to_string(),
            ));
        }
    }
    let date_time = match &payload.date_time {
        Some(raw) => Some(parse_date_time(raw).ok_or_else(|| {
            ApiError::Validation(
                "Please provide a valid date and time".to_string(),
            )
        })?),
        None => None,
    };

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meeting_by_public_id(&meeting_id, conn)?;
            if meeting.organizer_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the organizer can update this meeting".to_string(),
                ));
            }

            let changes = MeetingChanges {
                title: payload.title.map(|title| title.trim().to_string()),
                description: payload.description,
                date_time,
                duration_minutes: payload.duration_minutes,
                quorum_threshold: payload.quorum_threshold,
                recurrence: payload
                    .recurrence
                    .map(|recurrence| recurrence.as_str().to_string()),
                status: payload
                    .status
                    .map(|status| status.as_str().to_string()),
                location_name: payload.location_name,
                location_address: payload.location_address,
                location_place_id: payload.location_place_id,
                location_lat: payload.location_lat,
                location_lng: payload.location_lng,
            };

            let updated = diesel::update(
                meetings::table.filter(meetings::id.eq(meeting.id)),
            )
            .set(changes)
            .get_result::<Meeting>(conn)?;

            let serialized = MeetingSerializer::from_db_ty(updated, conn)?;
            Ok(Json(json!({ "meeting": serialized })))
        })
    })
    .await
}

#[delete("/meetings/<meeting_id>")]
pub async fn delete_meeting(
    meeting_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meeting_by_public_id(&meeting_id, conn)?;
            if meeting.organizer_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the organizer can delete this meeting".to_string(),
                ));
            }

            // Attendees hear about the deletion before their RSVPs go away.
            let attendees = rsvps::table
                .filter(rsvps::meeting_id.eq(meeting.id))
                .inner_join(users::table)
                .select((users::name, users::email))
                .load::<(String, String)>(conn)?;
            notify::meeting_cancelled(conn, &attendees, &meeting.title);

            diesel::delete(
                rsvps::table.filter(rsvps::meeting_id.eq(meeting.id)),
            )
            .execute(conn)?;
            diesel::delete(
                location_votes::table
                    .filter(location_votes::meeting_id.eq(meeting.id)),
            )
            .execute(conn)?;
            diesel::delete(
                invites::table.filter(invites::meeting_id.eq(meeting.id)),
            )
            .execute(conn)?;
            diesel::update(
                meetings::table
                    .filter(meetings::parent_meeting_id.eq(meeting.id)),
            )
            .set(meetings::parent_meeting_id.eq(None::<i64>))
            .execute(conn)?;
            diesel::delete(
                meetings::table.filter(meetings::id.eq(meeting.id)),
            )
            .execute(conn)?;

            Ok(Status::NoContent)
        })
    })
    .await
}
