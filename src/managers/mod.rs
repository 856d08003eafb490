//! Entity managers
//!
//! One generic [`Manager`] performs list/get/create/update/delete for every
//! entity through the data gateway. Entities describe their table, their
//! admin table columns and any list scoping; the per-entity modules add the
//! operations that only make sense for that entity.

pub mod advertisements;
pub mod blog;
pub mod bookings;
pub mod centers;
pub mod packages;
pub mod payments;
pub mod profiles;
pub mod volunteer;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::Claims;
use crate::db::{strip_meta, to_row, Filter, Query, Row, SharedGateway};
use crate::error::{conflict_error, not_found_error, validation_error, AppError};
use crate::models::RecordMeta;
use crate::table::{Exporter, TableSpec};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::marker::PhantomData;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

pub use bookings::{booking_total, BookingExporter, Checkout, CheckoutOutcome};

/// A stored record type with its own table
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Create: Serialize + DeserializeOwned + Validate + Send + Sync;
    type Update: Serialize + DeserializeOwned + Validate + Send + Sync;

    const TABLE: &'static str;
    /// Human name used in messages
    const LABEL: &'static str;

    const CREATED: AuditAction = AuditAction::RecordCreated;
    const UPDATED: AuditAction = AuditAction::RecordUpdated;
    const DELETED: AuditAction = AuditAction::RecordDeleted;

    fn meta(&self) -> &RecordMeta;

    /// Columns, search keys and category filters of the admin table
    fn table_spec() -> TableSpec;

    /// Filters applied to every read and write
    fn scope() -> Vec<Filter> {
        Vec::new()
    }

    /// Field and value marking a record deleted; `None` deletes for real
    fn soft_delete() -> Option<(&'static str, Value)> {
        None
    }

    /// Exporter used instead of the default CSV
    fn exporter() -> Option<Box<dyn Exporter>> {
        None
    }
}

pub(crate) fn decode<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| AppError::Internal(format!("Malformed record: {}", e)))
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("Failed to encode record: {}", e)))
}

pub struct Manager<T> {
    gateway: SharedGateway,
    audit: AuditLog,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Manager<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            audit: self.audit.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Manager<T> {
    pub fn new(gateway: SharedGateway, audit: AuditLog) -> Self {
        Self {
            gateway,
            audit,
            _entity: PhantomData,
        }
    }

    pub fn gateway(&self) -> &SharedGateway {
        &self.gateway
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn id_filters(id: Uuid) -> Vec<Filter> {
        let mut filters = T::scope();
        filters.push(Filter::eq("id", id.to_string()));
        filters
    }

    /// Records matching `filters`, newest first
    pub async fn list(&self, filters: Vec<Filter>) -> Result<Vec<T>, AppError> {
        let query = Query::table(T::TABLE)
            .filters(T::scope())
            .filters(filters)
            .order_by("created_at", true);
        let rows = self.gateway.select(&query).await?;
        debug!("Fetched {} {} records", rows.len(), T::LABEL);
        rows.into_iter().map(decode).collect()
    }

    /// Records as JSON values for the table view
    pub async fn rows(&self, filters: Vec<Filter>) -> Result<Vec<Value>, AppError> {
        self.list(filters).await?.iter().map(encode).collect()
    }

    pub async fn find(&self, filters: Vec<Filter>) -> Result<Option<T>, AppError> {
        let query = Query::table(T::TABLE)
            .filters(T::scope())
            .filters(filters)
            .limit(1);
        match self.gateway.select(&query).await?.into_iter().next() {
            Some(row) => Ok(Some(decode(row)?)),
            None => Ok(None),
        }
    }

    /// Fail with `Conflict` when another record already has `field == value`
    pub async fn ensure_unique(&self, field: &str, value: &str) -> Result<(), AppError> {
        let query = Query::table(T::TABLE).eq(field, value).limit(1);
        if !self.gateway.select(&query).await?.is_empty() {
            return Err(conflict_error(format!("{} with {} '{}' already exists", T::LABEL, field, value)));
        }
        Ok(())
    }

    /// Same check for an update, ignoring the record being updated
    pub async fn ensure_unique_except(&self, field: &str, value: &str, id: Uuid) -> Result<(), AppError> {
        let query = Query::table(T::TABLE)
            .eq(field, value)
            .filter(Filter::neq("id", id.to_string()))
            .limit(1);
        if !self.gateway.select(&query).await?.is_empty() {
            return Err(conflict_error(format!("{} with {} '{}' already exists", T::LABEL, field, value)));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<T, AppError> {
        self.find(vec![Filter::eq("id", id.to_string())])
            .await?
            .ok_or_else(|| not_found_error(format!("{} {} not found", T::LABEL, id)))
    }

    /// Validate and insert
    pub async fn create(&self, input: T::Create, actor: Option<&Claims>) -> Result<T, AppError> {
        input.validate().map_err(|e| validation_error(e.to_string()))?;
        self.insert_row(strip_meta(to_row(&input)?), actor).await
    }

    /// Insert a prepared row; callers have already validated it
    pub(crate) async fn insert_row(&self, row: Row, actor: Option<&Claims>) -> Result<T, AppError> {
        let stored = self.gateway.insert(T::TABLE, row).await?;
        let record: T = decode(stored)?;
        let id = record.meta().id;
        info!("{} {} created", T::LABEL, id);
        self.audit
            .record(T::CREATED, json!({ "table": T::TABLE, "id": id }), actor);
        Ok(record)
    }

    /// Apply a partial update written against `expected_version`
    pub async fn update(
        &self,
        id: Uuid,
        changes: T::Update,
        expected_version: i64,
        actor: Option<&Claims>,
    ) -> Result<T, AppError> {
        changes.validate().map_err(|e| validation_error(e.to_string()))?;
        let patch = strip_meta(to_row(&changes)?);
        if patch.is_empty() {
            return Err(validation_error("No changes supplied"));
        }
        let fields: Vec<String> = patch.keys().cloned().collect();

        let updated = self
            .gateway
            .update(T::TABLE, &Self::id_filters(id), patch, Some(expected_version))
            .await?;
        let record: T = match updated.into_iter().next() {
            Some(row) => decode(row)?,
            None => return Err(not_found_error(format!("{} {} not found", T::LABEL, id))),
        };

        info!("{} {} updated to version {}", T::LABEL, id, record.meta().version);
        self.audit.record(
            T::UPDATED,
            json!({ "table": T::TABLE, "id": id, "fields": fields, "version": record.meta().version }),
            actor,
        );
        Ok(record)
    }

    /// Delete, or flip the soft-delete marker
    pub async fn delete(&self, id: Uuid, actor: Option<&Claims>) -> Result<(), AppError> {
        let removed = match T::soft_delete() {
            Some((field, marker)) => {
                let mut patch = Row::new();
                patch.insert(field.to_string(), marker);
                self.gateway
                    .update(T::TABLE, &Self::id_filters(id), patch, None)
                    .await?
                    .len() as u64
            }
            None => self.gateway.delete(T::TABLE, &Self::id_filters(id)).await?,
        };
        if removed == 0 {
            return Err(not_found_error(format!("{} {} not found", T::LABEL, id)));
        }

        info!("{} {} deleted", T::LABEL, id);
        self.audit
            .record(T::DELETED, json!({ "table": T::TABLE, "id": id }), actor);
        Ok(())
    }
}
