use db::{
    meeting::{Meeting, MeetingStatus},
    rsvp::{Rsvp, RsvpSerializer, RsvpStatus, RsvpWithUserSerializer},
    schema::{invites, meetings, rsvps, users},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, meetings::meeting_by_public_id, notify};

/// Whether `user_id` may act on the RSVP list of `meeting`: the organizer,
/// anyone who already holds an RSVP, and anyone holding an invite that is
/// addressed to them for this meeting.
fn has_rsvp_access(
    meeting: &Meeting,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> QueryResult<bool> {
    if meeting.organizer_id == user_id {
        return Ok(true);
    }

    let holds_rsvp = rsvps::table
        .filter(rsvps::meeting_id.eq(meeting.id))
        .filter(rsvps::user_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)?
        > 0;
    if holds_rsvp {
        return Ok(true);
    }

    let holds_invite = invites::table
        .filter(invites::meeting_id.eq(meeting.id))
        .filter(invites::invitee_id.eq(user_id))
        .count()
        .get_result::<i64>(conn)?
        > 0;
    Ok(holds_invite)
}

/// The quorum engine. Reconciles a meeting's status with the current count
/// of YES RSVPs. Runs after every RSVP write; cancellation is terminal and
/// is never reopened here. A DRAFT meeting below quorum stays DRAFT — the
/// demotion branch only ever fires from CONFIRMED.
pub(crate) fn check_and_update_quorum(
    conn: &mut SqliteConnection,
    meeting_id: i64,
) -> QueryResult<()> {
    let meeting = match meetings::table
        .filter(meetings::id.eq(meeting_id))
        .first::<Meeting>(conn)
        .optional()?
    {
        Some(meeting) => meeting,
        None => return Ok(()),
    };

    if meeting.status == MeetingStatus::Cancelled.as_str() {
        return Ok(());
    }

    let yes_count = rsvps::table
        .filter(rsvps::meeting_id.eq(meeting.id))
        .filter(rsvps::status.eq(RsvpStatus::Yes.as_str()))
        .count()
        .get_result::<i64>(conn)?;

    let should_confirm = yes_count >= meeting.quorum_threshold;

    if should_confirm && meeting.status != MeetingStatus::Confirmed.as_str() {
        diesel::update(meetings::table.filter(meetings::id.eq(meeting.id)))
            .set(meetings::status.eq(MeetingStatus::Confirmed.as_str()))
            .execute(conn)?;

        tracing::info!(
            "meeting {} reached quorum ({yes_count}/{})",
            meeting.public_id,
            meeting.quorum_threshold
        );

        let attendees = rsvps::table
            .filter(rsvps::meeting_id.eq(meeting.id))
            .filter(rsvps::status.eq(RsvpStatus::Yes.as_str()))
            .inner_join(users::table)
            .select((users::name, users::email))
            .load::<(String, String)>(conn)?;
        notify::meeting_confirmed(
            conn,
            &attendees,
            &meeting.title,
            meeting.date_time,
        );
    } else if !should_confirm
        && meeting.status == MeetingStatus::Confirmed.as_str()
    {
        diesel::update(meetings::table.filter(meetings::id.eq(meeting.id)))
            .set(meetings::status.eq(MeetingStatus::PendingQuorum.as_str()))
            .execute(conn)?;

        tracing::info!(
            "meeting {} dropped below quorum ({yes_count}/{})",
            meeting.public_id,
            meeting.quorum_threshold
        );
    }

    Ok(())
}

#[derive(Deserialize)]
pub struct RsvpPayload {
    pub status: RsvpStatus,
}

#[put("/meetings/<meeting_id>/rsvps", data = "<payload>", format = "json")]
pub async fn upsert_rsvp(
    meeting_id: String,
    user: User,
    payload: Json<RsvpPayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let status = payload.into_inner().status;

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meeting_by_public_id(&meeting_id, conn)?;

            if !has_rsvp_access(&meeting, user.id, conn)? {
                return Err(ApiError::Forbidden(
                    "Access denied".to_string(),
                ));
            }

            let prev = rsvps::table
                .filter(rsvps::meeting_id.eq(meeting.id))
                .filter(rsvps::user_id.eq(user.id))
                .first::<Rsvp>(conn)
                .optional()?;

            let rsvp = match prev {
                Some(prev) => diesel::update(
                    rsvps::table.filter(rsvps::id.eq(prev.id)),
                )
                .set(rsvps::status.eq(status.as_str()))
                .get_result::<Rsvp>(conn)?,
                None => diesel::insert_into(rsvps::table)
                    .values((
                        rsvps::public_id.eq(Uuid::now_v7().to_string()),
                        rsvps::meeting_id.eq(meeting.id),
                        rsvps::user_id.eq(user.id),
                        rsvps::status.eq(status.as_str()),
                        rsvps::created_at.eq(diesel::dsl::now),
                    ))
                    .get_result::<Rsvp>(conn)?,
            };

            notify::rsvp_confirmation(
                conn,
                (user.name.as_str(), user.email.as_str()),
                &meeting.title,
                status.as_str(),
            );

            check_and_update_quorum(conn, meeting.id)?;

            let serialized = RsvpSerializer::from_db_ty(rsvp, conn)?;
            Ok(Json(json!({ "rsvp": serialized })))
        })
    })
    .await
}

#[get("/meetings/<meeting_id>/rsvps")]
pub async fn get_rsvps(
    meeting_id: String,
    user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let meeting = meeting_by_public_id(&meeting_id, conn)?;

        if !has_rsvp_access(&meeting, user.id, conn)? {
            return Err(ApiError::Forbidden("Access denied".to_string()));
        }

        let listed = rsvps::table
            .filter(rsvps::meeting_id.eq(meeting.id))
            .inner_join(users::table)
            .order_by(rsvps::created_at.asc())
            .load::<(Rsvp, User)>(conn)?
            .into_iter()
            .map(|(rsvp, attendee)| {
                RsvpWithUserSerializer::from_db_ty(rsvp, attendee)
            })
            .collect::<Vec<_>>();

        Ok(Json(json!({ "rsvps": listed })))
    })
    .await
}

#[delete("/meetings/<meeting_id>/rsvps")]
pub async fn delete_rsvp(
    meeting_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let meeting = meetings::table
                .filter(meetings::public_id.eq(&meeting_id))
                .first::<Meeting>(conn)
                .optional()?;

            let rsvp = match &meeting {
                Some(meeting) => rsvps::table
                    .filter(rsvps::meeting_id.eq(meeting.id))
                    .filter(rsvps::user_id.eq(user.id))
                    .first::<Rsvp>(conn)
                    .optional()?,
                None => None,
            };

            let (meeting, rsvp) = match (meeting, rsvp) {
                (Some(meeting), Some(rsvp)) => (meeting, rsvp),
                _ => {
                    return Err(ApiError::NotFound(
                        "RSVP not found".to_string(),
                    ))
                }
            };

            diesel::delete(rsvps::table.filter(rsvps::id.eq(rsvp.id)))
                .execute(conn)?;

            check_and_update_quorum(conn, meeting.id)?;

            Ok(Status::NoContent)
        })
    })
    .await
}
