use std::sync::Arc;

use db::DbConn;
use main::{make_rocket, scheduler::Scheduler};
use parking_lot::Mutex;
use rocket::fairing::AdHoc;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let scheduler_slot: Arc<Mutex<Option<Scheduler>>> =
        Arc::new(Mutex::new(None));
    let start_slot = scheduler_slot.clone();
    let stop_slot = scheduler_slot;

    let _ = make_rocket("rendezvous.db")
        .attach(AdHoc::on_liftoff("scheduler", move |rocket| {
            Box::pin(async move {
                let reminder_db = DbConn::get_one(rocket).await;
                let recurrence_db = DbConn::get_one(rocket).await;
                match (reminder_db, recurrence_db) {
                    (Some(reminder_db), Some(recurrence_db)) => {
                        *start_slot.lock() = Some(Scheduler::start(
                            reminder_db,
                            recurrence_db,
                        ));
                    }
                    _ => tracing::error!(
                        "could not obtain database handles for the scheduler"
                    ),
                }
            })
        }))
        .attach(AdHoc::on_shutdown("scheduler shutdown", move |_rocket| {
            Box::pin(async move {
                if let Some(running) = stop_slot.lock().take() {
                    running.stop();
                }
            })
        }))
        .launch()
        .await?;

    Ok(())
}
