//! Volunteer activities

use super::RecordMeta;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerActivity {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: String,
    pub description: String,
    pub location: String,
    pub activity_date: NaiveDate,
    pub max_volunteers: u32,
    #[serde(default)]
    pub status: ActivityStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewVolunteerActivity {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub activity_date: NaiveDate,
    #[validate(range(min = 1, message = "At least one volunteer slot is required"))]
    pub max_volunteers: u32,
    #[serde(default)]
    pub status: ActivityStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct VolunteerActivityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_volunteers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
}
