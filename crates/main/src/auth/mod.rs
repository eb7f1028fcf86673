use db::user::{User, UserView};
use rocket::serde::json::Json;
use serde_json::{json, Value};

pub mod login;
pub mod register;

#[get("/auth/me")]
pub async fn me(user: User) -> Json<Value> {
    Json(json!({ "user": UserView::from_db_ty(user) }))
}
