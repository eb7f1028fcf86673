use db::{
    schema::users,
    user::{User, UserView},
    DbConn,
};
use diesel::prelude::*;
use rocket::serde::json::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::ApiError, util::is_valid_email};

#[get("/users/me")]
pub async fn profile(user: User) -> Json<Value> {
    Json(json!({ "user": UserView::from_db_ty(user) }))
}

#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[put("/users/me", data = "<payload>", format = "json")]
pub async fn update_profile(
    user: User,
    payload: Json<UpdateProfilePayload>,
    db: DbConn,
) -> Result<Json<Value>, ApiError> {
    let payload = payload.into_inner();

    if payload.name.is_none() && payload.email.is_none() {
        return Err(ApiError::Validation(
            "At least one field (name or email) must be provided".to_string(),
        ));
    }
    if let Some(name) = &payload.name {
        if name.trim().is_empty() || name.chars().count() > 100 {
            return Err(ApiError::Validation(
                "Name must be between 1 and 100 characters".to_string(),
            ));
        }
    }
    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation(
                "Please provide a valid email address".to_string(),
            ));
        }
    }

    db.run(move |conn| {
        conn.transaction::<_, ApiError, _>(|conn| {
            let email = payload
                .email
                .as_ref()
                .map(|email| email.trim().to_ascii_lowercase());

            if let Some(email) = &email {
                let taken_by_other = users::table
                    .filter(users::email.eq(email))
                    .filter(users::id.ne(user.id))
                    .count()
                    .get_result::<i64>(conn)?
                    > 0;
                if taken_by_other {
                    return Err(ApiError::Conflict(
                        "Email already in use".to_string(),
                    ));
                }
            }

            let updated = diesel::update(
                users::table.filter(users::id.eq(user.id)),
            )
            .set((
                payload
                    .name
                    .as_ref()
                    .map(|name| users::name.eq(name.trim().to_string())),
                email.map(|email| users::email.eq(email)),
            ))
            .get_result::<User>(conn)?;

            Ok(Json(json!({ "user": UserView::from_db_ty(updated) })))
        })
    })
    .await
}
