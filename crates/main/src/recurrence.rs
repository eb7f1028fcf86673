use chrono::{Days, Months, NaiveDateTime};
use db::{
    meeting::{Meeting, MeetingSerializer, MeetingStatus, Recurrence},
    schema::meetings,
    user::User,
    DbConn,
};
use diesel::{insert_into, prelude::*};
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, meetings::meeting_by_public_id};

const DEFAULT_INSTANCE_COUNT: i64 = 4;
const MAX_INSTANCE_COUNT: i64 = 52;

/// Advances a date by one recurrence step. MONTHLY clamps to the end of
/// shorter months (Jan 31 + 1 month = Feb 28/29).
pub(crate) fn next_date(
    current: NaiveDateTime,
    rule: Recurrence,
) -> Option<NaiveDateTime> {
    match rule {
        Recurrence::Weekly => current.checked_add_days(Days::new(7)),
        Recurrence::Biweekly => current.checked_add_days(Days::new(14)),
        Recurrence::Monthly => current.checked_add_months(Months::new(1)),
        Recurrence::None => None,
    }
}

/// Creates `count` new instances of `parent`, continuing strictly after the
/// latest existing instance (or the parent itself when there is none), so
/// repeated calls extend the series without overlap.
pub(crate) fn create_instances(
    conn: &mut SqliteConnection,
    parent: &Meeting,
    count: i64,
) -> Result<usize, ApiError> {
    let rule = Recurrence::from_db(&parent.recurrence)
        .filter(|rule| *rule != Recurrence::None)
        .ok_or_else(|| {
            ApiError::Validation("Meeting has no recurrence rule".to_string())
        })?;

    let mut anchor = meetings::table
        .filter(meetings::parent_meeting_id.eq(parent.id))
        .order_by(meetings::date_time.desc())
        .select(meetings::date_time)
        .first::<NaiveDateTime>(conn)
        .optional()?
        .unwrap_or(parent.date_time);

    let mut created = 0;
    for _ in 0..count {
        anchor = next_date(anchor, rule).ok_or_else(|| {
            ApiError::Validation(
                "Recurrence steps past the supported date range".to_string(),
            )
        })?;

        insert_into(meetings::table)
            .values((
                meetings::public_id.eq(Uuid::now_v7().to_string()),
                meetings::title.eq(&parent.title),
                meetings::description.eq(&parent.description),
                meetings::organizer_id.eq(parent.organizer_id),
                meetings::group_id.eq(parent.group_id),
                meetings::date_time.eq(anchor),
                meetings::duration_minutes.eq(parent.duration_minutes),
                meetings::quorum_threshold.eq(parent.quorum_threshold),
                meetings::recurrence.eq(&parent.recurrence),
                meetings::status.eq(MeetingStatus::Draft.as_str()),
                meetings::location_name.eq(&parent.location_name),
                meetings::location_address.eq(&parent.location_address),
                meetings::location_place_id.eq(&parent.location_place_id),
                meetings::location_lat.eq(parent.location_lat),
                meetings::location_lng.eq(parent.location_lng),
                meetings::parent_meeting_id.eq(parent.id),
                meetings::created_at.eq(diesel::dsl::now),
            ))
            .execute(conn)?;
        created += 1;
    }

    Ok(created)
}


#[derive(Deserialize)]
pub struct GenerateInstancesPayload {
    pub count: Option<i64>,
}

#[post("/meetings/<meeting_id>/instances", data = "<payload>", format = "json")]
pub async fn generate_instances(
    meeting_id: String,
    user: User,
    payload: Json<GenerateInstancesPayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let count = payload.into_inner().count.unwrap_or(DEFAULT_INSTANCE_COUNT);
    if !(1..=MAX_INSTANCE_COUNT).contains(&count) {
        return Err(ApiError::Validation(format!(
            "count must be between 1 and {MAX_INSTANCE_COUNT}"
        )));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let parent = meeting_by_public_id(&meeting_id, conn)?;
            if parent.organizer_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the organizer can generate instances".to_string(),
                ));
            }

            create_instances(conn, &parent, count)?;

            let instances = meetings::table
                .filter(meetings::parent_meeting_id.eq(parent.id))
                .order_by(meetings::date_time.asc())
                .load::<Meeting>(conn)?
                .into_iter()
                .map(|instance| MeetingSerializer::from_db_ty(instance, conn))
                .collect::<QueryResult<Vec<_>>>()?;

            Ok((Status::Created, Json(json!({ "instances": instances }))))
        })
    })
    .await
}
