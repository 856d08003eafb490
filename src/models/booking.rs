//! Bookings and the public checkout payload

use super::RecordMeta;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Any status may follow any other; staff override freely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub client_id: Uuid,
    pub package_id: Uuid,
    #[serde(default)]
    pub status: BookingStatus,
    pub num_travelers: u32,
    pub total_amount: f64,
    pub travel_date: NaiveDate,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBooking {
    pub client_id: Uuid,
    pub package_id: Uuid,
    #[serde(default)]
    pub status: BookingStatus,
    #[validate(range(min = 1, message = "At least one traveler is required"))]
    pub num_travelers: u32,
    #[validate(range(min = 0.0, message = "Total cannot be negative"))]
    pub total_amount: f64,
    pub travel_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BookingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub num_travelers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub total_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
}

/// Public booking form
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub package_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub phone: Option<String>,
    #[validate(range(min = 1, max = 50, message = "Travelers must be between 1 and 50"))]
    pub num_travelers: u32,
    pub travel_date: NaiveDate,
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}
