use chrono::Utc;
use db::DbConn;
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use request_ids::RequestIdFairing;
use rocket::{
    fairing::AdHoc,
    figment::{
        util::map,
        value::{Map, Value},
    },
    serde::json::Json,
    Build, Rocket,
};

pub mod auth;
pub mod error;
pub mod groups;
pub mod invites;
pub mod meetings;
pub mod notify;
pub mod places;
pub mod recurrence;
pub mod request_ids;
pub mod rsvps;
pub mod scheduler;
pub mod users;
pub mod util;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate rocket;

#[get("/health")]
fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../../migrations");

pub fn make_rocket(default_db: &str) -> Rocket<Build> {
    let db: Map<_, Value> = map![
        "url" => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| default_db.to_string())
            .into(),
        "pool_size" => 10.into(),
        "timeout" => 5.into(),
    ];

    let figment =
        rocket::Config::figment().merge(("databases", map!["database" => db]));

    rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("migrations", |rocket| async move {
            let db_conn = match DbConn::get_one(&rocket).await {
                Some(db_conn) => db_conn,
                None => return Err(rocket),
            };

            let ret: Result<(), Box<dyn std::error::Error + Send + Sync>> =
                db_conn
                    .run(move |conn| {
                        conn.run_pending_migrations(MIGRATIONS)?;
                        Ok(())
                    })
                    .await;

            match ret {
                Ok(_) => Ok(rocket),
                Err(_) => Err(rocket),
            }
        }))
        .mount(
            "/",
            routes![
                health,
                auth::register::do_register,
                auth::login::do_login,
                auth::me,
                users::profile,
                users::update_profile,
                meetings::list_meetings,
                meetings::get_meeting,
                meetings::create_meeting,
                meetings::update_meeting,
                meetings::delete_meeting,
                rsvps::upsert_rsvp,
                rsvps::get_rsvps,
                rsvps::delete_rsvp,
                invites::list_invites,
                invites::get_invite_by_token,
                invites::create_invite,
                invites::respond_to_invite,
                invites::delete_invite,
                recurrence::generate_instances,
                groups::list_groups,
                groups::get_group,
                groups::create_group,
                groups::update_group,
                groups::delete_group,
                groups::add_member,
                groups::update_member_role,
                groups::remove_member,
                places::do_search,
                places::get_place_details,
                places::auto_pick_location,
                places::list_location_votes,
                places::cast_location_vote,
                places::delete_location_vote,
            ],
        )
        .register(
            "/",
            catchers![
                error::unauthorized,
                error::not_found,
                error::unprocessable,
                error::fallback,
            ],
        )
        .attach(RequestIdFairing)
}
