//! Remote data gateway
//!
//! Every manager talks to storage through [`DataGateway`]: CRUD verbs against
//! named tables holding JSON records. The gateway owns the metadata columns
//! (`id`, `version`, `created_at`, `updated_at`); callers never set them.

pub mod memory;
pub mod postgres;
pub mod queries;

use crate::error::AppError;
use crate::values;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

pub use memory::MemoryGateway;
pub use postgres::PgGateway;

/// A stored record
pub type Row = Map<String, Value>;

/// Gateway handle shared across managers
pub type SharedGateway = Arc<dyn DataGateway>;

/// Columns maintained by the gateway itself
pub const META_FIELDS: [&str; 4] = ["id", "version", "created_at", "updated_at"];

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn neq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq(field.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Eq(f, _) | Filter::Neq(f, _) | Filter::In(f, _) => f,
        }
    }

    /// Evaluate against a row. A missing field never equals anything.
    pub fn matches(&self, row: &Row) -> bool {
        let actual = row.get(self.field()).filter(|v| !v.is_null());
        let same = |expected: &Value| actual.is_some_and(|a| values::compare(a, expected) == Ordering::Equal);
        match self {
            Filter::Eq(_, expected) => same(expected),
            Filter::Neq(_, expected) => !same(expected),
            Filter::In(_, options) => options.iter().any(same),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

/// A `select` against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(field, value))
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order.push(Order {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// CRUD verbs against named remote tables
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Rows matching every filter, in the requested order
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError>;

    /// Insert a record, returning it with metadata assigned
    async fn insert(&self, table: &str, record: Row) -> Result<Row, AppError>;

    /// Shallow-merge `patch` into every matching row. With
    /// `expected_version`, a version mismatch on any match fails the whole
    /// call with [`AppError::Conflict`].
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
        expected_version: Option<i64>,
    ) -> Result<Vec<Row>, AppError>;

    /// Remove matching rows, returning how many went away
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError>;

    /// Update the row whose `key_field` equals the record's, or insert it
    async fn upsert(&self, table: &str, key_field: &str, record: Row) -> Result<Row, AppError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Serialize a value into a row
pub fn to_row<T: Serialize>(value: &T) -> Result<Row, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::Internal(format!(
            "Expected an object record, got {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(format!("Failed to serialize record: {}", e))),
    }
}

/// Drop any caller supplied metadata
pub fn strip_meta(mut row: Row) -> Row {
    for field in META_FIELDS {
        row.remove(field);
    }
    row
}

/// Current time in the stored timestamp format
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Extract the version counter of a stored row
pub fn row_version(row: &Row) -> i64 {
    row.get("version").and_then(Value::as_i64).unwrap_or(0)
}

fn version_conflict(table: &str, expected: i64, actual: i64) -> AppError {
    AppError::Conflict(format!(
        "Record in '{}' was modified by someone else (expected version {}, found {})",
        table, expected, actual
    ))
}
