use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

/// One row per outbound mail; the audit trail for every send attempt.
#[derive(Debug, Queryable, Serialize, Clone)]
pub struct EmailRow {
    pub id: i64,
    pub message_id: String,
    pub recipients: String,
    pub subject: String,
    pub contents: Option<String>,
    pub created_at: NaiveDateTime,
}
