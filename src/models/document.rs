use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_FILTER: &str = "General";

/// A file in the shared document repository.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    /// Name of the file inside the upload directory.
    pub file_name: String,
    /// Name the file had on the uploader's machine.
    pub original_name: String,
    /// Category tag such as `Safety` or `HR`.
    pub filter: String,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub file_name: String,
    pub original_name: String,
    pub filter: String,
    pub uploaded_by: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub filter: Option<String>,
}
