use diesel::prelude::*;
use rocket::http::{ContentType, Status};
use serde_json::{json, Value};

use super::{
    bearer, create_invite, create_meeting, days_ahead, meeting_status,
    register, respond_to_invite, test_app,
};

#[test]
fn expired_invites_cannot_be_responded_to() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let invite = create_invite(
        &app.client,
        &owner,
        json!({
            "invitee_email": "bert@example.com",
            "expires_at": "2020-01-01T00:00",
        }),
    );
    let token = invite["invite"]["token"].as_str().unwrap();

    let response = respond_to_invite(&app.client, &bert, token, "ACCEPTED");
    assert_eq!(response.status(), Status::Gone);

    // The stored status is untouched; expiry is only checked at response
    // time.
    let response = app
        .client
        .get(format!("/invites/token/{token}"))
        .header(bearer(&bert))
        .dispatch();
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["invite"]["status"], "PENDING");
}

#[test]
fn invites_accept_at_most_one_response() {
    let mut app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Book club",
        5,
        &days_ahead(5),
        "NONE",
    );
    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com", "meeting_id": meeting_id }),
    );
    let token = invite["invite"]["token"].as_str().unwrap();

    let response = respond_to_invite(&app.client, &bert, token, "ACCEPTED");
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["invite"]["status"], "ACCEPTED");

    // Exactly one YES RSVP came out of the acceptance.
    use db::schema::rsvps;
    let rows = rsvps::table
        .filter(rsvps::status.eq("YES"))
        .count()
        .get_result::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(rows, 1);

    // Responding again conflicts and creates nothing new.
    let response = respond_to_invite(&app.client, &bert, token, "ACCEPTED");
    assert_eq!(response.status(), Status::Conflict);
    let response = respond_to_invite(&app.client, &bert, token, "DECLINED");
    assert_eq!(response.status(), Status::Conflict);

    let rows = rsvps::table
        .count()
        .get_result::<i64>(&mut app.conn)
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn accepting_a_meeting_invite_bypasses_the_quorum_engine() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Book club",
        1,
        &days_ahead(5),
        "NONE",
    );
    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com", "meeting_id": meeting_id }),
    );

    let response = respond_to_invite(
        &app.client,
        &bert,
        invite["invite"]["token"].as_str().unwrap(),
        "ACCEPTED",
    );
    assert_eq!(response.status(), Status::Ok);

    // One YES against a threshold of one, yet the invite path leaves the
    // status alone.
    assert_eq!(meeting_status(&app.client, &owner, &meeting_id), "DRAFT");
}

#[test]
fn declining_creates_nothing() {
    let mut app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let response = app
        .client
        .post("/groups")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "name": "Tuesday people" }).to_string())
        .dispatch();
    let body: Value = response.into_json().unwrap();
    let group_id = body["group"]["id"].as_str().unwrap();

    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com", "group_id": group_id }),
    );

    let response = respond_to_invite(
        &app.client,
        &bert,
        invite["invite"]["token"].as_str().unwrap(),
        "DECLINED",
    );
    assert_eq!(response.status(), Status::Ok);

    use db::schema::group_members;
    let members = group_members::table
        .count()
        .get_result::<i64>(&mut app.conn)
        .unwrap();
    // Only the owner's own membership row.
    assert_eq!(members, 1);
}

#[test]
fn only_the_addressee_may_respond() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let _bert = register(&app.client, "Bert", "bert@example.com");
    let sid = register(&app.client, "Sid", "sid@example.com");

    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com" }),
    );

    let response = respond_to_invite(
        &app.client,
        &sid,
        invite["invite"]["token"].as_str().unwrap(),
        "ACCEPTED",
    );
    assert_eq!(response.status(), Status::Forbidden);
}

#[test]
fn responding_binds_the_invitee_id() {
    let mut app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");

    // Addressed to an email with no account yet.
    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "late@example.com" }),
    );
    let token = invite["invite"]["token"].as_str().unwrap();

    {
        use db::invite::Invite;
        use db::schema::invites;
        let row = invites::table
            .first::<Invite>(&mut app.conn)
            .unwrap();
        assert_eq!(row.invitee_id, None);
    }

    let late = register(&app.client, "Late", "late@example.com");
    let response = respond_to_invite(&app.client, &late, token, "ACCEPTED");
    assert_eq!(response.status(), Status::Ok);

    {
        use db::invite::Invite;
        use db::schema::invites;
        let row = invites::table
            .first::<Invite>(&mut app.conn)
            .unwrap();
        assert!(row.invitee_id.is_some());
        assert_eq!(row.status, "ACCEPTED");
    }
}

#[test]
fn accepting_a_group_invite_never_downgrades_a_role() {
    let mut app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let response = app
        .client
        .post("/groups")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "name": "Tuesday people" }).to_string())
        .dispatch();
    let body: Value = response.into_json().unwrap();
    let group_id = body["group"]["id"].as_str().unwrap().to_string();

    // Look up Bert's public id to add him as an ADMIN directly.
    let response = app
        .client
        .get("/users/me")
        .header(bearer(&bert))
        .dispatch();
    let body: Value = response.into_json().unwrap();
    let bert_id = body["user"]["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .post(format!("/groups/{group_id}/members"))
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "user_id": bert_id, "role": "ADMIN" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Created);

    // Accepting a plain membership invite afterwards must not touch the
    // ADMIN role.
    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com", "group_id": group_id }),
    );
    let response = respond_to_invite(
        &app.client,
        &bert,
        invite["invite"]["token"].as_str().unwrap(),
        "ACCEPTED",
    );
    assert_eq!(response.status(), Status::Ok);

    use db::schema::group_members;
    let roles = group_members::table
        .select(group_members::role)
        .order_by(group_members::id.asc())
        .load::<String>(&mut app.conn)
        .unwrap();
    assert_eq!(roles, vec!["OWNER".to_string(), "ADMIN".to_string()]);
}

#[test]
fn invite_creation_authorization() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let sid = register(&app.client, "Sid", "sid@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Book club",
        2,
        &days_ahead(5),
        "NONE",
    );

    // Only the organizer can invite to a meeting.
    let response = app
        .client
        .post("/invites")
        .header(ContentType::JSON)
        .header(bearer(&sid))
        .body(
            json!({
                "invitee_email": "bert@example.com",
                "meeting_id": meeting_id,
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    // Unknown meeting.
    let response = app
        .client
        .post("/invites")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(
            json!({
                "invitee_email": "bert@example.com",
                "meeting_id": "no-such-meeting",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);

    // Group invites require membership.
    let response = app
        .client
        .post("/groups")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "name": "Tuesday people" }).to_string())
        .dispatch();
    let body: Value = response.into_json().unwrap();
    let group_id = body["group"]["id"].as_str().unwrap();

    let response = app
        .client
        .post("/invites")
        .header(ContentType::JSON)
        .header(bearer(&sid))
        .body(
            json!({
                "invitee_email": "bert@example.com",
                "group_id": group_id,
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    // Malformed invitee email.
    let response = app
        .client
        .post("/invites")
        .header(ContentType::JSON)
        .header(bearer(&owner))
        .body(json!({ "invitee_email": "not-an-email" }).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);
}

#[test]
fn only_the_sender_may_delete_an_invite() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let sid = register(&app.client, "Sid", "sid@example.com");

    let invite = create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com" }),
    );
    let invite_id = invite["invite"]["id"].as_str().unwrap();

    let response = app
        .client
        .delete(format!("/invites/{invite_id}"))
        .header(bearer(&sid))
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    let response = app
        .client
        .delete(format!("/invites/{invite_id}"))
        .header(bearer(&owner))
        .dispatch();
    assert_eq!(response.status(), Status::NoContent);

    let response = app
        .client
        .delete(format!("/invites/{invite_id}"))
        .header(bearer(&owner))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn invite_listing_is_scoped_to_sender_and_invitee() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");
    let sid = register(&app.client, "Sid", "sid@example.com");

    create_invite(
        &app.client,
        &owner,
        json!({ "invitee_email": "bert@example.com" }),
    );

    for (token, expected) in [(&owner, 1), (&bert, 1), (&sid, 0)] {
        let response = app
            .client
            .get("/invites")
            .header(bearer(token))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["invites"].as_array().unwrap().len(), expected);
    }
}
