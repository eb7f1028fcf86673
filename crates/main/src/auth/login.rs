use argon2::{Argon2, PasswordHash, PasswordVerifier};
use db::{
    schema::users,
    user::{issue_token, User, UserView},
    DbConn,
};
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;

#[derive(Deserialize)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

// A single message for both unknown-email and wrong-password so the endpoint
// does not reveal which addresses have accounts.
fn bad_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

#[post("/auth/login", data = "<payload>", format = "json")]
pub async fn do_login(
    payload: Json<LoginPayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.into_inner();

    db.run(move |conn| {
        let user = users::table
            .filter(users::email.eq(payload.email.trim().to_ascii_lowercase()))
            .first::<User>(conn)
            .optional()?
            .ok_or_else(bad_credentials)?;

        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| bad_credentials())?;
        Argon2::default()
            .verify_password(payload.password.as_bytes(), &parsed_hash)
            .map_err(|_| bad_credentials())?;

        let token = issue_token(&user);

        Ok(Json(json!({
            "user": UserView::from_db_ty(user),
            "token": token,
        })))
    })
    .await
}
