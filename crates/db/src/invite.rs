use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    group::Group,
    meeting::Meeting,
    schema::{groups, meetings},
    user::UserView,
};

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct Invite {
    pub id: i64,
    pub public_id: String,
    pub token: String,
    pub sender_id: i64,
    pub invitee_id: Option<i64>,
    pub invitee_email: String,
    pub group_id: Option<i64>,
    pub meeting_id: Option<i64>,
    pub status: String,
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Invite {
    /// An invite past its expiry can no longer be responded to; the stored
    /// status stays PENDING, the check happens at response time.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| expires_at < Utc::now().naive_utc())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InviteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InviteStatus::Pending => "PENDING",
            InviteStatus::Accepted => "ACCEPTED",
            InviteStatus::Declined => "DECLINED",
            InviteStatus::Expired => "EXPIRED",
        }
    }
}

/// Summary of the meeting an invite points at.
#[derive(Debug, Serialize)]
pub struct InviteMeetingSerializer {
    pub id: String,
    pub title: String,
    pub date_time: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct InviteGroupSerializer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct InviteSerializer {
    pub id: String,
    pub token: String,
    pub sender: UserView,
    pub invitee_email: String,
    pub group: Option<InviteGroupSerializer>,
    pub meeting: Option<InviteMeetingSerializer>,
    pub status: String,
    pub expires_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl InviteSerializer {
    pub fn from_db_ty(
        invite: Invite,
        conn: &mut SqliteConnection,
    ) -> QueryResult<InviteSerializer> {
        let sender = UserView::lookup(invite.sender_id, conn)?;

        let group = match invite.group_id {
            Some(group_id) => groups::table
                .filter(groups::id.eq(group_id))
                .get_result::<Group>(conn)
                .optional()?
                .map(|group| InviteGroupSerializer {
                    id: group.public_id,
                    name: group.name,
                }),
            None => None,
        };

        let meeting = match invite.meeting_id {
            Some(meeting_id) => meetings::table
                .filter(meetings::id.eq(meeting_id))
                .get_result::<Meeting>(conn)
                .optional()?
                .map(|meeting| InviteMeetingSerializer {
                    id: meeting.public_id,
                    title: meeting.title,
                    date_time: meeting.date_time,
                }),
            None => None,
        };

        Ok(InviteSerializer {
            id: invite.public_id,
            token: invite.token,
            sender,
            invitee_email: invite.invitee_email,
            group,
            meeting,
            status: invite.status,
            expires_at: invite.expires_at,
            created_at: invite.created_at,
        })
    }
}
