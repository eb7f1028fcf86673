use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use jsonwebtoken::{
    decode, encode, DecodingKey, EncodingKey, Header, Validation,
};
use once_cell::sync::Lazy;
use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::{schema::users, DbConn};

/// How long an issued bearer token stays valid.
const TOKEN_VALIDITY_DAYS: i64 = 7;

static TOKEN_SECRET: Lazy<String> = Lazy::new(|| {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!(
            "JWT_SECRET is not set; using an insecure development secret"
        );
        "insecure-development-secret-do-not-deploy".to_string()
    })
});

#[derive(Debug, Queryable, Serialize, Clone)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

/// The projection of a user embedded in other entities' responses.
#[derive(Debug, Serialize, Clone)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserView {
    pub fn from_db_ty(user: User) -> UserView {
        UserView {
            id: user.public_id,
            name: user.name,
            email: user.email,
        }
    }

    pub fn lookup(user_id: i64, conn: &mut SqliteConnection) -> QueryResult<UserView> {
        users::table
            .filter(users::id.eq(user_id))
            .get_result::<User>(conn)
            .map(UserView::from_db_ty)
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Issues a bearer token for the given user.
pub fn issue_token(user: &User) -> String {
    let claims = Claims {
        sub: user.public_id.clone(),
        exp: (Utc::now() + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TOKEN_SECRET.as_bytes()),
    )
    // HS256 encoding of a serializable struct cannot fail
    .unwrap()
}

/// Verifies a bearer token, returning the public id of the user it was
/// issued to.
pub fn verify_token(token: &str) -> Option<String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(TOKEN_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .ok()
}

#[derive(Debug)]
pub enum AuthError {
    TokenMissingOrMalformed,
    NoDatabase,
    Unauthorized,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, AuthError> {
        let db = try_outcome!(request
            .guard::<DbConn>()
            .await
            .map_error(|(t, _)| (t, AuthError::NoDatabase)));

        let token = request
            .headers()
            .get_one("Authorization")
            .and_then(|header| header.strip_prefix("Bearer "));

        let public_id = match token.and_then(verify_token) {
            Some(public_id) => public_id,
            None => {
                return rocket::request::Outcome::Error((
                    Status::Unauthorized,
                    AuthError::TokenMissingOrMalformed,
                ));
            }
        };

        let user = match db
            .run(move |conn| {
                users::table
                    .filter(users::public_id.eq(public_id))
                    .first(conn)
                    .optional()
            })
            .await
        {
            Ok(Some(user)) => Some(user),
            Ok(None) => None,
            Err(_) => {
                return rocket::request::Outcome::Error((
                    Status::InternalServerError,
                    AuthError::NoDatabase,
                ));
            }
        };

        match user {
            Some(user) => rocket::request::Outcome::Success(user),
            None => rocket::request::Outcome::Error((
                Status::Unauthorized,
                AuthError::Unauthorized,
            )),
        }
    }
}
