use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde_json::{json, Value};

/// The domain error taxonomy. Domain code returns these; the mapping to an
/// HTTP status happens only here, in the responder.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    Conflict(String),
    Gone(String),
    Validation(String),
    Unauthorized(String),
    Internal(diesel::result::Error),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Gone(_) => Status::Gone,
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg)
            | ApiError::Gone(msg)
            | ApiError::Validation(msg)
            | ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Internal(e) => {
                if cfg!(debug_assertions) {
                    format!("Internal server error: {e}")
                } else {
                    "Internal server error".to_string()
                }
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> ApiError {
        ApiError::Internal(e)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Internal(ref e) = self {
            tracing::error!("request failed with a database error: {e}");
        }

        let status = self.status();
        let mut response =
            Json(json!({ "error": self.message() })).respond_to(req)?;
        response.set_status(status);
        Ok(response)
    }
}

#[catch(401)]
pub fn unauthorized() -> Json<Value> {
    Json(json!({ "error": "Authentication required" }))
}

#[catch(404)]
pub fn not_found() -> Json<Value> {
    Json(json!({ "error": "Not found" }))
}

// Rocket reports body deserialization failures as 422; the API treats any
// malformed input as a plain validation failure.
#[catch(422)]
pub fn unprocessable() -> rocket::response::status::Custom<Json<Value>> {
    rocket::response::status::Custom(
        Status::BadRequest,
        Json(json!({ "error": "Validation failed" })),
    )
}

#[catch(default)]
pub fn fallback(status: Status, _req: &Request) -> Json<Value> {
    Json(json!({ "error": status.reason_lossy() }))
}
