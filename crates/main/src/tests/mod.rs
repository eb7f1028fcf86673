//! End-to-end tests of application behavior, driven through the JSON API
//! with a local client and checked against the database directly where the
//! API does not expose the detail under test.

use diesel::prelude::*;
use rocket::{
    http::{ContentType, Header, Status},
    local::blocking::Client,
};
use serde_json::{json, Value};

mod invites;
mod places;
mod recurrence;

pub(crate) const PASSWORD: &str = "random@string123!!:";

pub(crate) struct TestApp {
    pub client: Client,
    pub conn: SqliteConnection,
    _dir: tempfile::TempDir,
}

pub(crate) fn test_app() -> TestApp {
    // Each test gets its own database file; an ambient DATABASE_URL would
    // defeat that.
    std::env::remove_var("DATABASE_URL");

    let dir = tempfile::tempdir().expect("could not create temp dir");
    let db_path = dir.path().join("test.db").display().to_string();

    let client = Client::tracked(crate::make_rocket(&db_path))
        .expect("rocket failed to ignite");

    let conn = SqliteConnection::establish(&db_path)
        .expect("database connection failed");

    TestApp {
        client,
        conn,
        _dir: dir,
    }
}

pub(crate) fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

pub(crate) fn register(client: &Client, name: &str, email: &str) -> String {
    let response = client
        .post("/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    let body: Value = response.into_json().unwrap();
    body["token"].as_str().unwrap().to_string()
}

pub(crate) fn create_meeting(
    client: &Client,
    token: &str,
    title: &str,
    quorum_threshold: i64,
    date_time: &str,
    recurrence: &str,
) -> String {
    let response = client
        .post("/meetings")
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(
            json!({
                "title": title,
                "date_time": date_time,
                "quorum_threshold": quorum_threshold,
                "recurrence": recurrence,
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    let body: Value = response.into_json().unwrap();
    body["meeting"]["id"].as_str().unwrap().to_string()
}

pub(crate) fn create_invite(
    client: &Client,
    token: &str,
    payload: Value,
) -> Value {
    let response = client
        .post("/invites")
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(payload.to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    response.into_json().unwrap()
}

pub(crate) fn respond_to_invite<'c>(
    client: &'c Client,
    token: &str,
    invite_token: &str,
    status: &str,
) -> rocket::local::blocking::LocalResponse<'c> {
    client
        .put(format!("/invites/token/{invite_token}/respond"))
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(json!({ "status": status }).to_string())
        .dispatch()
}

pub(crate) fn put_rsvp<'c>(
    client: &'c Client,
    token: &str,
    meeting_id: &str,
    status: &str,
) -> rocket::local::blocking::LocalResponse<'c> {
    client
        .put(format!("/meetings/{meeting_id}/rsvps"))
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(json!({ "status": status }).to_string())
        .dispatch()
}

pub(crate) fn meeting_status(
    client: &Client,
    token: &str,
    meeting_id: &str,
) -> String {
    let response = client
        .get(format!("/meetings/{meeting_id}"))
        .header(bearer(token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().unwrap();
    body["meeting"]["status"].as_str().unwrap().to_string()
}

/// A future timestamp in the short ISO form the API accepts.
pub(crate) fn days_ahead(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days))
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

#[test]
fn basic_test_sequence() {
    let mut app = test_app();

    // (1) three accounts
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");
    let cass = register(&app.client, "Cass", "cass@example.com");

    // (2) a group, with Bert invited by email
    let response = app
        .client
        .post("/groups")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "name": "Tuesday people" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    let group_id = body["group"]["id"].as_str().unwrap().to_string();

    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com", "group_id": group_id }),
    );
    let invite_token = invite["invite"]["token"].as_str().unwrap();

    let response =
        respond_to_invite(&app.client, &bert, invite_token, "ACCEPTED");
    assert_eq!(response.status(), Status::Ok);

    let response = app
        .client
        .get(format!("/groups/{group_id}"))
        .header(bearer(&bert))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["group"]["members"].as_array().unwrap().len(), 2);

    // (3) a meeting with quorum 2, Bert and Cass invited
    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Board games",
        2,
        &days_ahead(10),
        "NONE",
    );
    assert_eq!(
        meeting_status(&app.client, &owner, &meeting_id),
        "DRAFT"
    );

    for (token, email) in
        [(&bert, "bert@example.com"), (&cass, "cass@example.com")]
    {
        let invite = create_invite(
            &app.client,
            &owner,
            json!({ "invitee_email": email, "meeting_id": meeting_id }),
        );
        let invite_token = invite["invite"]["token"].as_str().unwrap();
        let response =
            respond_to_invite(&app.client, token, invite_token, "ACCEPTED");
        assert_eq!(response.status(), Status::Ok);
    }

    // Both acceptances created YES RSVPs, but the invite path never runs
    // the quorum engine, so the meeting is still DRAFT.
    {
        use db::schema::rsvps;
        let yes_rows = rsvps::table
            .filter(rsvps::status.eq("YES"))
            .count()
            .get_result::<i64>(&mut app.conn)
            .unwrap();
        assert_eq!(yes_rows, 2);
    }
    assert_eq!(
        meeting_status(&app.client, &owner, &meeting_id),
        "DRAFT"
    );

    // (4) a direct RSVP write triggers the quorum check and confirms
    let response = put_rsvp(&app.client, &bert, &meeting_id, "YES");
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        meeting_status(&app.client, &owner, &meeting_id),
        "CONFIRMED"
    );

    // (5) the confirmation mail went to both YES holders
    {
        use db::email::EmailRow;
        use db::schema::emails;
        let sent = emails::table
            .filter(emails::subject.eq("Meeting confirmed"))
            .load::<EmailRow>(&mut app.conn)
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].recipients.contains("bert@example.com"));
        assert!(sent[0].recipients.contains("cass@example.com"));
    }

    // (6) the meeting shows up for attendees and organizer alike
    for token in [&owner, &bert, &cass] {
        let response = app
            .client
            .get("/meetings")
            .header(bearer(token))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["meetings"].as_array().unwrap().len(), 1);
    }

    // (7) deleting the meeting notifies attendees and removes their RSVPs
    let response = app
        .client
        .delete(format!("/meetings/{meeting_id}"))
        .header(bearer(&owner))
        .dispatch();
    assert_eq!(response.status(), Status::NoContent);

    {
        use db::schema::{emails, rsvps};
        let rsvp_rows = rsvps::table
            .count()
            .get_result::<i64>(&mut app.conn)
            .unwrap();
        assert_eq!(rsvp_rows, 0);

        let cancelled = emails::table
            .filter(emails::subject.eq("Meeting cancelled"))
            .count()
            .get_result::<i64>(&mut app.conn)
            .unwrap();
        assert_eq!(cancelled, 1);
    }
}
