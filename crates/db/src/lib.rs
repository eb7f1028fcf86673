pub mod email;
pub mod group;
pub mod invite;
pub mod location;
pub mod meeting;
pub mod rsvp;
/// Database schema
pub mod schema;
pub mod user;

use rocket_sync_db_pools::database;

// The sqlite pool shipped by rocket_sync_db_pools enables foreign keys and
// a busy timeout on every connection it hands out.
#[database("database")]
pub struct DbConn(diesel::SqliteConnection);
