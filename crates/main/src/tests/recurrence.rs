use rocket::http::{ContentType, Status};
use serde_json::{json, Value};

use super::{bearer, create_meeting, register, test_app};

fn generate<'a>(
    app: &'a super::TestApp,
    token: &str,
    meeting_id: &str,
    payload: Value,
) -> rocket::local::blocking::LocalResponse<'a> {
    app.client
        .post(format!("/meetings/{meeting_id}/instances"))
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(payload.to_string())
        .dispatch()
}

fn instance_dates(body: &Value) -> Vec<String> {
    body["instances"]
        .as_array()
        .unwrap()
        .iter()
        .map(|instance| {
            instance["date_time"].as_str().unwrap().to_string()
        })
        .collect()
}

#[test]
fn repeated_generation_extends_the_series() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Weekly sync",
        2,
        "2030-01-07T18:00:00",
        "WEEKLY",
    );

    let response = generate(&app, &owner, &meeting_id, json!({ "count": 2 }));
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    assert_eq!(
        instance_dates(&body),
        vec!["2030-01-14T18:00:00", "2030-01-21T18:00:00"]
    );

    // The second call continues strictly after the latest child.
    let response = generate(&app, &owner, &meeting_id, json!({ "count": 3 }));
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    assert_eq!(
        instance_dates(&body),
        vec![
            "2030-01-14T18:00:00",
            "2030-01-21T18:00:00",
            "2030-01-28T18:00:00",
            "2030-02-04T18:00:00",
            "2030-02-11T18:00:00",
        ]
    );

    for instance in body["instances"].as_array().unwrap() {
        assert_eq!(instance["status"], "DRAFT");
        assert_eq!(instance["parent_meeting_id"], json!(meeting_id));
        assert_eq!(instance["title"], "Weekly sync");
        assert_eq!(instance["quorum_threshold"], 2);
    }
}

#[test]
fn monthly_steps_clamp_to_short_months() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Month end review",
        2,
        "2030-01-31T10:00:00",
        "MONTHLY",
    );

    let response = generate(&app, &owner, &meeting_id, json!({ "count": 2 }));
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    assert_eq!(
        instance_dates(&body),
        vec!["2030-02-28T10:00:00", "2030-03-28T10:00:00"]
    );
}

#[test]
fn generation_guards_its_inputs() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let sid = register(&app.client, "Sid", "sid@example.com");

    let weekly_id = create_meeting(
        &app.client,
        &owner,
        "Weekly sync",
        2,
        "2030-01-07T18:00:00",
        "WEEKLY",
    );
    let one_off_id = create_meeting(
        &app.client,
        &owner,
        "One-off",
        2,
        "2030-01-07T18:00:00",
        "NONE",
    );

    for count in [0, 53] {
        let response =
            generate(&app, &owner, &weekly_id, json!({ "count": count }));
        assert_eq!(response.status(), Status::BadRequest);
    }

    let response = generate(&app, &owner, &one_off_id, json!({}));
    assert_eq!(response.status(), Status::BadRequest);

    let response = generate(&app, &sid, &weekly_id, json!({}));
    assert_eq!(response.status(), Status::Forbidden);

    let response = generate(&app, &owner, "no-such-meeting", json!({}));
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn omitted_count_defaults_to_four() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Fortnightly",
        2,
        "2030-06-01T09:00:00",
        "BIWEEKLY",
    );

    let response = generate(&app, &owner, &meeting_id, json!({}));
    assert_eq!(response.status(), Status::Created);
    let body: Value = response.into_json().unwrap();
    assert_eq!(
        instance_dates(&body),
        vec![
            "2030-06-15T09:00:00",
            "2030-06-29T09:00:00",
            "2030-07-13T09:00:00",
            "2030-07-27T09:00:00",
        ]
    );
}
