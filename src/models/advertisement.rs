//! Advertisements

use super::RecordMeta;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    #[default]
    Active,
    Paused,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advertisement {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    pub placement: String,
    #[serde(default)]
    pub status: AdStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAdvertisement {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: String,
    #[validate(url)]
    pub link_url: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Placement is required"))]
    pub placement: String,
    #[serde(default)]
    pub status: AdStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AdvertisementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub link_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50))]
    pub placement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AdStatus>,
}
