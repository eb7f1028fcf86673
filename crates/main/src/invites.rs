use db::{
    group::{GroupMember, GroupRole},
    invite::{Invite, InviteSerializer, InviteStatus},
    rsvp::{Rsvp, RsvpStatus},
    schema::{group_members, groups, invites, meetings, rsvps, users},
    user::User,
    DbConn,
};
use diesel::{insert_into, prelude::*};
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, util::is_valid_email, util::parse_date_time};

#[get("/invites")]
pub async fn list_invites(
    user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let listed = invites::table
            .filter(
                invites::sender_id
                    .eq(user.id)
                    .or(invites::invitee_id.eq(user.id)),
            )
            .order_by(invites::created_at.desc())
            .load::<Invite>(conn)?
            .into_iter()
            .map(|invite| InviteSerializer::from_db_ty(invite, conn))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Json(json!({ "invites": listed })))
    })
    .await
}

#[get("/invites/token/<token>")]
pub async fn get_invite_by_token(
    token: String,
    _user: User,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    db.run(move |conn| {
        let invite = invite_by_token(&token, conn)?;
        let serialized = InviteSerializer::from_db_ty(invite, conn)?;
        Ok(Json(json!({ "invite": serialized })))
    })
    .await
}

fn invite_by_token(
    token: &str,
    conn: &mut SqliteConnection,
) -> Result<Invite, ApiError> {
    invites::table
        .filter(invites::token.eq(token))
        .first::<Invite>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Invite not found".to_string()))
}

#[derive(Deserialize)]
pub struct CreateInvitePayload {
    pub invitee_email: String,
    pub group_id: Option<String>,
    pub meeting_id: Option<String>,
    pub expires_at: Option<String>,
}

#[post("/invites", data = "<payload>", format = "json")]
pub async fn create_invite(
    user: User,
    payload: Json<CreateInvitePayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();

    if !is_valid_email(&payload.invitee_email) {
        return Err(ApiError::Validation(
            "Please provide a valid email address".to_string(),
        ));
    }
    let expires_at = match &payload.expires_at {
        Some(raw) => Some(parse_date_time(raw).ok_or_else(|| {
            ApiError::Validation(
                "Please provide a valid date and time".to_string(),
            )
        })?),
        None => None,
    };

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let invitee_email =
                payload.invitee_email.trim().to_ascii_lowercase();

            // The invitee may not have an account yet; in that case the id
            // is bound later, when they respond.
            let invitee_id = users::table
                .filter(users::email.eq(&invitee_email))
                .select(users::id)
                .get_result::<i64>(conn)
                .optional()?;

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

            let meeting_id = match &payload.meeting_id {
                Some(meeting_public_id) => {
                    let meeting = meetings::table
                        .filter(meetings::public_id.eq(meeting_public_id))
                        .select((meetings::id, meetings::organizer_id))
                        .get_result::<(i64, i64)>(conn)
                        .optional()?
                        .ok_or_else(|| {
                            ApiError::NotFound("Meeting not found".to_string())
                        })?;
                    if meeting.1 != user.id {
                        return Err(ApiError::Forbidden(
                            "Only the organizer can invite to this meeting"
                                .to_string(),
                        ));
                    }
                    Some(meeting.0)
                }
                None => None,
            };

            let invite = insert_into(invites::table)
                .values((
                    invites::public_id.eq(Uuid::now_v7().to_string()),
                    invites::token.eq(Uuid::new_v4().to_string()),
                    invites::sender_id.eq(user.id),
                    invites::invitee_id.eq(invitee_id),
                    invites::invitee_email.eq(&invitee_email),
                    invites::group_id.eq(group_id),
                    invites::meeting_id.eq(meeting_id),
                    invites::status.eq(InviteStatus::Pending.as_str()),
                    invites::expires_at.eq(expires_at),
                    invites::created_at.eq(diesel::dsl::now),
                ))
                .get_result::<Invite>(conn)?;

            let serialized = InviteSerializer::from_db_ty(invite, conn)?;
            Ok((Status::Created, Json(json!({ "invite": serialized }))))
        })
    })
    .await
}

#[derive(Deserialize)]
pub struct RespondInvitePayload {
    pub status: InviteStatus,
}

#[put("/invites/token/<token>/respond", data = "<payload>", format = "json")]
pub async fn respond_to_invite(
    token: String,
    user: User,
    payload: Json<RespondInvitePayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let status = payload.into_inner().status;

    if !matches!(status, InviteStatus::Accepted | InviteStatus::Declined) {
        return Err(ApiError::Validation(
            "Status must be ACCEPTED or DECLINED".to_string(),
        ));
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let invite = invite_by_token(&token, conn)?;

            if invite.status != InviteStatus::Pending.as_str() {
                return Err(ApiError::Conflict(
                    "Invite has already been responded to".to_string(),
                ));
            }
            if invite.is_expired() {
                return Err(ApiError::Gone(
                    "Invite has expired".to_string(),
                ));
            }
            // The stored invitee id may still be null when the invite was
            // addressed to an email without an account at creation time.
            if user.email != invite.invitee_email
                && invite.invitee_id != Some(user.id)
            {
                return Err(ApiError::Forbidden(
                    "This invite was not sent to you".to_string(),
                ));
            }

            let updated = diesel::update(
                invites::table.filter(invites::id.eq(invite.id)),
            )
            .set((
                invites::status.eq(status.as_str()),
                invites::invitee_id.eq(Some(user.id)),
            ))
            .get_result::<Invite>(conn)?;

            if status == InviteStatus::Accepted {
                if let Some(group_id) = invite.group_id {
                    accept_into_group(conn, group_id, user.id)?;
                }
                if let Some(meeting_id) = invite.meeting_id {
                    accept_into_meeting(conn, meeting_id, user.id)?;
                }
            }

            let serialized = InviteSerializer::from_db_ty(updated, conn)?;
            Ok(Json(json!({ "invite": serialized })))
        })
    })
    .await
}

/// Joins the responder to the group as MEMBER. Idempotent: an existing
/// membership row is left untouched, whatever its role.
fn accept_into_group(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> QueryResult<()> {
    let already_member = group_members::table
        .filter(GroupMember::of_user_in_group(user_id, group_id))
        .count()
        .get_result::<i64>(conn)?
        > 0;
    if already_member {
        return Ok(());
    }

    insert_into(group_members::table)
        .values((
            group_members::group_id.eq(group_id),
            group_members::user_id.eq(user_id),
            group_members::role.eq(GroupRole::Member.as_str()),
            group_members::created_at.eq(diesel::dsl::now),
        ))
        .execute(conn)?;
    Ok(())
}

/// Records a YES RSVP for the responder. Note: the quorum engine does not
/// run here — only direct RSVP writes trigger it.
fn accept_into_meeting(
    conn: &mut SqliteConnection,
    meeting_id: i64,
    user_id: i64,
) -> QueryResult<()> {
    let prev = rsvps::table
        .filter(rsvps::meeting_id.eq(meeting_id))
        .filter(rsvps::user_id.eq(user_id))
        .first::<Rsvp>(conn)
        .optional()?;

    match prev {
        Some(prev) => {
            diesel::update(rsvps::table.filter(rsvps::id.eq(prev.id)))
                .set(rsvps::status.eq(RsvpStatus::Yes.as_str()))
                .execute(conn)?;
        }
        None => {
            insert_into(rsvps::table)
                .values((
                    rsvps::public_id.eq(Uuid::now_v7().to_string()),
                    rsvps::meeting_id.eq(meeting_id),
                    rsvps::user_id.eq(user_id),
                    rsvps::status.eq(RsvpStatus::Yes.as_str()),
                    rsvps::created_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;
        }
    }
    Ok(())
}

#[delete("/invites/<invite_id>")]
pub async fn delete_invite(
    invite_id: String,
    user: User,
    db: DbConn,
) -> Result<Status, ApiError> {
    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let invite = invites::table
                .filter(invites::public_id.eq(&invite_id))
                .first::<Invite>(conn)
                .optional()?
                .ok_or_else(|| {
                    ApiError::NotFound("Invite not found".to_string())
                })?;

            if invite.sender_id != user.id {
                return Err(ApiError::Forbidden(
                    "Only the sender can delete this invite".to_string(),
                ));
            }

            diesel::delete(invites::table.filter(invites::id.eq(invite.id)))
                .execute(conn)?;

            Ok(Status::NoContent)
        })
    })
    .await
}
