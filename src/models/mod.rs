//! Data models and DTOs (Data Transfer Objects)
//!
//! One file per entity: the stored record, its create payload and its
//! partial update payload.

pub mod advertisement;
pub mod blog;
pub mod booking;
pub mod center;
pub mod package;
pub mod payment;
pub mod profile;
pub mod volunteer;

// Re-export commonly used types
pub use advertisement::*;
pub use blog::*;
pub use booking::*;
pub use center::*;
pub use package::*;
pub use payment::*;
pub use profile::*;
pub use volunteer::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidationError;

/// Columns the gateway maintains on every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Update payload: the version the caller read plus the changed fields
#[derive(Debug, Deserialize)]
pub struct UpdateRequest<P> {
    pub version: i64,
    #[serde(flatten)]
    pub changes: P,
}

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Message-only response (no data)
#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Lowercase words separated by single hyphens
pub(crate) fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

/// Turn a title into a slug
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
