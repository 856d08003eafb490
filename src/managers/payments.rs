//! Payments

use super::{Entity, Manager};
use crate::audit::AuditAction;
use crate::db::Filter;
use crate::error::AppError;
use crate::models::{NewPayment, Payment, PaymentUpdate, RecordMeta};
use crate::table::{money, Column, TableSpec};
use uuid::Uuid;

impl Entity for Payment {
    type Create = NewPayment;
    type Update = PaymentUpdate;

    const TABLE: &'static str = "payments";
    const LABEL: &'static str = "Payment";

    const CREATED: AuditAction = AuditAction::PaymentCreated;
    const UPDATED: AuditAction = AuditAction::PaymentUpdated;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("created_at", "Date"),
            Column::new("booking_id", "Booking"),
            Column::new("amount", "Amount").render(money("amount")),
            Column::new("method", "Method"),
            Column::new("status", "Status"),
            Column::new("transaction_ref", "Reference").unsortable(),
        ])
        .search_keys(["booking_id", "method", "transaction_ref"])
        .filter_keys(["status", "method"])
    }
}

impl Manager<Payment> {
    /// Payments belonging to any of `booking_ids`
    pub async fn for_bookings(&self, booking_ids: &[Uuid]) -> Result<Vec<Payment>, AppError> {
        if booking_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = booking_ids.iter().map(|id| id.to_string());
        self.list(vec![Filter::is_in("booking_id", ids)]).await
    }
}
