//! Tour packages

use super::{validate_slug, RecordMeta};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: f64,
    pub duration_days: u32,
    pub location: String,
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: PackageStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPackage {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "validate_slug", message = "Slug must be lowercase words joined by hyphens"))]
    pub slug: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "Duration must be at least one day"))]
    pub duration_days: u32,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: PackageStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PackageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PackageStatus>,
}
