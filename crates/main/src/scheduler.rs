//! Periodic jobs. Both passes are written to tolerate overlap and repeat
//! runs: the reminder sweep marks each meeting it has handled, and the
//! recurrence top-up anchors on the latest existing instance.
use chrono::{Duration, Utc};
use db::{
    meeting::{Meeting, MeetingStatus, Recurrence},
    rsvp::RsvpStatus,
    schema::{meetings, rsvps, users},
    DbConn,
};
use diesel::prelude::*;
use rocket::tokio::{self, task::JoinHandle, time};

use crate::{notify, recurrence};

const REMINDER_INTERVAL_SECS: u64 = 60 * 60;
const RECURRENCE_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// How far ahead of a meeting the reminder goes out.
const REMINDER_WINDOW_HOURS: i64 = 24;
/// Parents whose series runs out within this window get topped up.
const TOP_UP_WINDOW_DAYS: i64 = 7;
/// How many instances each top-up appends.
const TOP_UP_COUNT: i64 = 4;

/// Sends reminders for meetings starting within the next 24 hours that
/// have not been reminded about yet. Returns how many meetings were
/// handled.
pub fn reminder_sweep(conn: &mut SqliteConnection) -> QueryResult<usize> {
    let now = Utc::now().naive_utc();
    let horizon = now + Duration::hours(REMINDER_WINDOW_HOURS);

    let due = meetings::table
        .filter(meetings::date_time.ge(now))
        .filter(meetings::date_time.le(horizon))
        .filter(meetings::reminder_sent_at.is_null())
        .filter(meetings::status.eq_any([
            MeetingStatus::Confirmed.as_str(),
            MeetingStatus::PendingQuorum.as_str(),
        ]))
        .load::<Meeting>(conn)?;

    for meeting in &due {
        let attendees = rsvps::table
            .filter(rsvps::meeting_id.eq(meeting.id))
            .filter(rsvps::status.ne(RsvpStatus::No.as_str()))
            .inner_join(users::table)
            .select((users::name, users::email))
            .load::<(String, String)>(conn)?;

        notify::meeting_reminder(
            conn,
            &attendees,
            &meeting.title,
            meeting.date_time,
        );

        diesel::update(meetings::table.filter(meetings::id.eq(meeting.id)))
            .set(meetings::reminder_sent_at.eq(Some(now)))
            .execute(conn)?;

        tracing::info!(
            "sent reminders for meeting {} to {} attendees",
            meeting.public_id,
            attendees.len()
        );
    }

    Ok(due.len())
}

/// Extends every recurring series whose latest instance falls within the
/// next week. A failure for one parent is logged and does not abort the
/// pass. Returns how many parents were topped up.
pub fn recurrence_top_up(conn: &mut SqliteConnection) -> QueryResult<usize> {
    let horizon = Utc::now().naive_utc() + Duration::days(TOP_UP_WINDOW_DAYS);

    let parents = meetings::table
        .filter(meetings::recurrence.ne(Recurrence::None.as_str()))
        .filter(meetings::parent_meeting_id.is_null())
        .load::<Meeting>(conn)?;

    let mut topped_up = 0;
    for parent in parents {
        let latest = meetings::table
            .filter(meetings::parent_meeting_id.eq(parent.id))
            .order_by(meetings::date_time.desc())
            .select(meetings::date_time)
            .first(conn)
            .optional()?
            .unwrap_or(parent.date_time);

        if latest <= horizon {
            match recurrence::create_instances(conn, &parent, TOP_UP_COUNT) {
                Ok(created) => {
                    topped_up += 1;
                    tracing::info!(
                        "generated {created} instances for meeting {}",
                        parent.public_id
                    );
                }
                Err(e) => tracing::warn!(
                    "failed to generate instances for meeting {}: {e}",
                    parent.public_id
                ),
            }
        }
    }

    Ok(topped_up)
}

/// The running periodic jobs. Owned by the process root; started at
/// liftoff, stopped at shutdown. Each job holds its own injected database
/// handle.
pub struct Scheduler {
    reminder: JoinHandle<()>,
    recurrence: JoinHandle<()>,
}

impl Scheduler {
    pub fn start(reminder_db: DbConn, recurrence_db: DbConn) -> Scheduler {
        tracing::info!(
            "scheduler started: reminders (hourly) + recurrence (daily)"
        );

        let reminder = tokio::spawn(async move {
            let mut ticker = time::interval(time::Duration::from_secs(
                REMINDER_INTERVAL_SECS,
            ));
            loop {
                ticker.tick().await;
                if let Err(e) = reminder_db.run(reminder_sweep).await {
                    tracing::warn!("reminder sweep failed: {e}");
                }
            }
        });

        let recurrence = tokio::spawn(async move {
            let mut ticker = time::interval(time::Duration::from_secs(
                RECURRENCE_INTERVAL_SECS,
            ));
            loop {
                ticker.tick().await;
                if let Err(e) = recurrence_db.run(recurrence_top_up).await {
                    tracing::warn!("recurrence top-up failed: {e}");
                }
            }
        });

        Scheduler {
            reminder,
            recurrence,
        }
    }

    pub fn stop(self) {
        self.reminder.abort();
        self.recurrence.abort();
        tracing::info!("scheduler stopped");
    }
}
