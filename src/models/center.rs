//! Information centers and their media

use super::RecordMeta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// `Deleted` is the soft-delete marker; deleted centers are hidden from lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CenterStatus {
    #[default]
    Active,
    Inactive,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationCenter {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub status: CenterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCenter {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub description: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub status: CenterStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CenterUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CenterStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Guess from a file extension; unknown extensions count as images
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "mov" | "webm" | "avi" | "mkv" => MediaType::Video,
            _ => MediaType::Image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterMedia {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub center_id: Uuid,
    pub media_type: MediaType,
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCenterMedia {
    #[serde(default = "Uuid::nil")]
    pub center_id: Uuid,
    pub media_type: MediaType,
    #[validate(url(message = "Media URL must be a valid URL"))]
    pub url: String,
    #[validate(length(max = 500))]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CenterMediaUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500))]
    pub caption: Option<String>,
}

/// A center with its media attached, for public pages
#[derive(Debug, Clone, Serialize)]
pub struct CenterWithMedia {
    #[serde(flatten)]
    pub center: InformationCenter,
    pub media: Vec<CenterMedia>,
}
