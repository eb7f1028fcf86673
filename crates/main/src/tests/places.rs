use rocket::http::{ContentType, Status};
use serde_json::{json, Value};

use super::{bearer, create_meeting, days_ahead, register, test_app};

#[test]
fn place_search_matches_name_address_and_type() {
    let app = test_app();
    let token = register(&app.client, "Olive", "olive@example.com");

    for (query, expected) in [("coffee", 1), ("springfield", 3), ("food", 2)] {
        let response = app
            .client
            .get(format!("/places/search?q={query}"))
            .header(bearer(&token))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().unwrap();
        assert_eq!(body["places"].as_array().unwrap().len(), expected);
    }

    let response = app
        .client
        .get("/places/search")
        .header(bearer(&token))
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let response = app
        .client
        .get("/places/mock-place-2")
        .header(bearer(&token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["place"]["name"], "Riverside Park");

    let response = app
        .client
        .get("/places/no-such-place")
        .header(bearer(&token))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn auto_pick_requires_a_real_meeting() {
    let app = test_app();
    let token = register(&app.client, "Olive", "olive@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &token,
        "Brunch",
        2,
        &days_ahead(5),
        "NONE",
    );

    let response = app
        .client
        .get(format!("/places/meetings/{meeting_id}/auto-pick"))
        .header(bearer(&token))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert!(body["place"]["place_id"].is_string());

    let response = app
        .client
        .get("/places/meetings/no-such-meeting/auto-pick")
        .header(bearer(&token))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}

#[test]
fn location_votes_tally_by_place() {
    let app = test_app();
    let owner = register(&app.client, "Olive", "olive@example.com");
    let bert = register(&app.client, "Bert", "bert@example.com");

    let meeting_id = create_meeting(
        &app.client,
        &owner,
        "Brunch",
        2,
        &days_ahead(5),
        "NONE",
    );

    let cast = |token: &str, place_id: &str, name: &str| {
        let response = app
            .client
            .post(format!("/meetings/{meeting_id}/location-votes"))
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(json!({ "place_id": place_id, "name": name }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created);
        let body: Value = response.into_json().unwrap();
        body["vote"]["id"].as_str().unwrap().to_string()
    };

    cast(&owner, "mock-place-1", "The Coffee House");
    let bert_vote = cast(&bert, "mock-place-1", "The Coffee House");
    cast(&bert, "mock-place-2", "Riverside Park");

    let response = app
        .client
        .get(format!("/meetings/{meeting_id}/location-votes"))
        .header(bearer(&owner))
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["votes"].as_array().unwrap().len(), 3);

    let tally = body["tally"].as_array().unwrap();
    assert_eq!(tally[0]["place_id"], "mock-place-1");
    assert_eq!(tally[0]["count"], 2);
    assert_eq!(tally[1]["count"], 1);

    // Votes can only be withdrawn by their caster.
    let response = app
        .client
        .delete(format!(
            "/meetings/{meeting_id}/location-votes/{bert_vote}"
        ))
        .header(bearer(&owner))
        .dispatch();
    assert_eq!(response.status(), Status::Forbidden);

    let response = app
        .client
        .delete(format!(
            "/meetings/{meeting_id}/location-votes/{bert_vote}"
        ))
        .header(bearer(&bert))
        .dispatch();
    assert_eq!(response.status(), Status::NoContent);

    let response = app
        .client
        .delete(format!(
            "/meetings/{meeting_id}/location-votes/{bert_vote}"
        ))
        .header(bearer(&bert))
        .dispatch();
    assert_eq!(response.status(), Status::NotFound);
}
