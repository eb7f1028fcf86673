//! Sends emails. Every send attempt is recorded in the `emails` table on
//! the caller's connection; actual SMTP delivery only happens in release
//! builds, runs in the background, and is never awaited by the caller.
use db::schema::emails;
use diesel::prelude::*;
use uuid::Uuid;

#[cfg(debug_assertions)]
pub fn send_mail(
    conn: &mut SqliteConnection,
    to: Vec<(&str, &str)>,
    subject: &str,
    _html_contents: &str,
    text_contents: &str,
) -> QueryResult<()> {
    record_send(conn, &to, subject, text_contents)?;
    Ok(())
}

#[cfg(not(debug_assertions))]
pub fn send_mail(
    conn: &mut SqliteConnection,
    to: Vec<(&str, &str)>,
    subject: &str,
    html_contents: &str,
    text_contents: &str,
) -> QueryResult<()> {
    let msg_id = record_send(conn, &to, subject, text_contents)?;
    deliver(&to, subject, html_contents, text_contents, msg_id);
    Ok(())
}

fn record_send(
    conn: &mut SqliteConnection,
    to: &[(&str, &str)],
    subject: &str,
    text_contents: &str,
) -> QueryResult<String> {
    let msg_id = format!(
        "{}@{}",
        Uuid::now_v7(),
        std::env::var("SMTP_DOMAIN").unwrap_or_else(|_| "localhost".to_string())
    );

    let recipients = to
        .iter()
        .map(|(name, email)| format!("{name} <{email}>"))
        .collect::<Vec<_>>()
        .join(",");

    diesel::insert_into(emails::table)
        .values((
            emails::message_id.eq(&msg_id),
            emails::recipients.eq(&recipients),
            emails::subject.eq(subject),
            emails::contents.eq(text_contents),
        ))
        .execute(conn)?;

    Ok(msg_id)
}

#[cfg(not(debug_assertions))]
fn deliver(
    to: &[(&str, &str)],
    subject: &str,
    html_contents: &str,
    text_contents: &str,
    msg_id: String,
) {
    use lettre::{
        message::{header::ContentType, MultiPart, SinglePart},
        transport::smtp::authentication::Credentials,
        AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    };

    let mut msg = Message::builder().subject(subject);
    for (name, email) in to {
        msg = match format!("{name} <{email}>").parse() {
            Ok(mailbox) => msg.to(mailbox),
            Err(e) => {
                tracing::warn!("skipping malformed recipient {email}: {e}");
                msg
            }
        };
    }

    let msg = match msg.message_id(Some(msg_id.clone())).multipart(
        MultiPart::mixed()
            .singlepart(
                SinglePart::builder()
                    .content_type(ContentType::TEXT_PLAIN)
                    .body(text_contents.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .content_type(ContentType::TEXT_HTML)
                    .body(html_contents.to_string()),
            ),
    ) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("could not build email {msg_id}: {e}");
            return;
        }
    };

    let (host, username, password) = match (
        std::env::var("SMTP_HOST"),
        std::env::var("SMTP_USERNAME"),
        std::env::var("SMTP_PASSWORD"),
    ) {
        (Ok(host), Ok(username), Ok(password)) => (host, username, password),
        _ => {
            tracing::warn!(
                "SMTP_HOST/SMTP_USERNAME/SMTP_PASSWORD not configured; \
                 dropping email {msg_id}"
            );
            return;
        }
    };

    let mailer: AsyncSmtpTransport<Tokio1Executor> =
        match AsyncSmtpTransport::<Tokio1Executor>::relay(&host) {
            Ok(builder) => builder
                .credentials(Credentials::new(username, password))
                .build(),
            Err(e) => {
                tracing::warn!("could not build SMTP transport: {e}");
                return;
            }
        };

    // Delivery is best effort; failures are logged, never surfaced.
    rocket::tokio::spawn(async move {
        if let Err(e) = mailer.send(msg).await {
            tracing::warn!("failed to deliver email {msg_id}: {e}");
        }
    });
}
