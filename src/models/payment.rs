//! Payments

use super::RecordMeta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

/// Amounts are not reconciled against the booking total
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub booking_id: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub status: PaymentStatus,
    pub method: String,
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewPayment {
    pub booking_id: Uuid,
    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: f64,
    #[serde(default)]
    pub status: PaymentStatus,
    #[validate(length(min = 1, max = 50, message = "Payment method is required"))]
    pub method: String,
    #[validate(length(max = 100))]
    pub transaction_ref: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PaymentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 50))]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100))]
    pub transaction_ref: Option<String>,
}
