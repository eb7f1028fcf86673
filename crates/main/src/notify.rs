//! Notification emails. Every helper here is best effort: a failure to
//! record or deliver a mail is logged and never surfaced to the caller,
//! so the state transition that triggered it always wins.
use chrono::NaiveDateTime;
use diesel::SqliteConnection;
use maud::html;

fn best_effort(
    conn: &mut SqliteConnection,
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    text_contents: &str,
) {
    if to.is_empty() {
        return;
    }
    if let Err(e) =
        email::send_mail(conn, to, subject, html_contents, text_contents)
    {
        tracing::warn!("failed to record email {subject:?}: {e}");
    }
}

pub fn meeting_created(
    conn: &mut SqliteConnection,
    organizer: (&str, &str),
    title: &str,
    date_time: NaiveDateTime,
) {
    let html = html! {
        p { "Your meeting " b { (title) } " has been created." }
        p { "It is scheduled for " (date_time) " (UTC)." }
    }
    .into_string();
    let text =
        format!("Your meeting \"{title}\" has been created for {date_time}.");
    best_effort(conn, vec![organizer], "Meeting created", &html, &text);
}

pub fn rsvp_confirmation(
    conn: &mut SqliteConnection,
    recipient: (&str, &str),
    title: &str,
    status: &str,
) {
    let html = html! {
        p {
            "Your RSVP for " b { (title) } " has been recorded as "
            b { (status) } "."
        }
    }
    .into_string();
    let text = format!("Your RSVP for \"{title}\" is now {status}.");
    best_effort(conn, vec![recipient], "RSVP confirmation", &html, &text);
}

pub fn meeting_confirmed(
    conn: &mut SqliteConnection,
    recipients: &[(String, String)],
    title: &str,
    date_time: NaiveDateTime,
) {
    let html = html! {
        p { b { (title) } " has reached quorum and is confirmed." }
        p { "See you on " (date_time) " (UTC)." }
    }
    .into_string();
    let text =
        format!("\"{title}\" is confirmed! It takes place on {date_time}.");
    let to = recipients
        .iter()
        .map(|(name, email)| (name.as_str(), email.as_str()))
        .collect();
    best_effort(conn, to, "Meeting confirmed", &html, &text);
}

pub fn meeting_cancelled(
    conn: &mut SqliteConnection,
    recipients: &[(String, String)],
    title: &str,
) {
    let html = html! {
        p { b { (title) } " has been cancelled by the organizer." }
    }
    .into_string();
    let text = format!("\"{title}\" has been cancelled.");
    let to = recipients
        .iter()
        .map(|(name, email)| (name.as_str(), email.as_str()))
        .collect();
    best_effort(conn, to, "Meeting cancelled", &html, &text);
}

pub fn meeting_reminder(
    conn: &mut SqliteConnection,
    recipients: &[(String, String)],
    title: &str,
    date_time: NaiveDateTime,
) {
    let html = html! {
        p { "Reminder: " b { (title) } " starts at " (date_time) " (UTC)." }
    }
    .into_string();
    let text = format!("Reminder: \"{title}\" starts at {date_time}.");
    let to = recipients
        .iter()
        .map(|(name, email)| (name.as_str(), email.as_str()))
        .collect();
    best_effort(conn, to, "Meeting reminder", &html, &text);
}
