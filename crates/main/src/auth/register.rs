use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use db::{
    schema::users,
    user::{issue_token, User, UserView},
    DbConn,
};
use diesel::{
    dsl::{exists, now, select},
    insert_into,
    prelude::*,
};
use rand::rngs::OsRng;
use rocket::{http::Status, serde::json::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::ApiError, util::is_valid_email};

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() || self.name.chars().count() > 100 {
            return Err(ApiError::Validation(
                "Name must be between 1 and 100 characters".to_string(),
            ));
        }
        if !is_valid_email(&self.email) {
            return Err(ApiError::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }
        let password_len = self.password.chars().count();
        if !(8..=128).contains(&password_len) {
            return Err(ApiError::Validation(
                "Password must be between 8 and 128 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[post("/auth/register", data = "<payload>", format = "json")]
pub async fn do_register(
    payload: Json<RegisterPayload>,
    db: DbConn,
) -> Result<(Status, Json<Value>), ApiError> {
    let payload = payload.into_inner();
    payload.validate()?;

    // Hashing is deliberately done outside the database transaction.
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("password hashing failed: {e}");
            ApiError::Validation("Could not process that password".to_string())
        })?
        .to_string();

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let email = payload.email.trim().to_ascii_lowercase();

            let email_taken =
                select(exists(users::table.filter(users::email.eq(&email))))
                    .get_result::<bool>(conn)?;
            if email_taken {
                return Err(ApiError::Conflict(
                    "Email already in use".to_string(),
                ));
            }

            let user = insert_into(users::table)
                .values((
                    users::public_id.eq(Uuid::now_v7().to_string()),
                    users::name.eq(payload.name.trim()),
                    users::email.eq(&email),
                    users::password_hash.eq(&password_hash),
                    users::created_at.eq(now),
                ))
                .get_result::<User>(conn)?;

            let token = issue_token(&user);

            Ok((
                Status::Created,
                Json(json!({
                    "user": UserView::from_db_ty(user),
                    "token": token,
                })),
            ))
        })
    })
    .await
}
