//! In-memory gateway
//!
//! Same semantics as the PostgreSQL gateway, used for local runs without a
//! database and throughout the tests.

use super::{
    row_version, strip_meta, timestamp_now, version_conflict, DataGateway, Filter, Query, Row,
};
use crate::error::AppError;
use crate::values;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Thread-safe table store
pub struct MemoryGateway {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn stamp_new(record: Row) -> Row {
        let now = timestamp_now();
        let mut row = strip_meta(record);
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        row.insert("version".to_string(), Value::from(1));
        row.insert("created_at".to_string(), Value::String(now.clone()));
        row.insert("updated_at".to_string(), Value::String(now));
        row
    }

    fn merge(row: &mut Row, patch: &Row) {
        let next_version = row_version(row) + 1;
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
        row.insert("version".to_string(), Value::from(next_version));
        row.insert("updated_at".to_string(), Value::String(timestamp_now()));
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl DataGateway for MemoryGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Row> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if !query.order.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .order
                    .iter()
                    .map(|o| values::compare_nulls_last(a.get(&o.field), b.get(&o.field), o.descending))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        debug!("select {} -> {} rows", query.table, rows.len());
        Ok(rows)
    }

    async fn insert(&self, table: &str, record: Row) -> Result<Row, AppError> {
        let row = Self::stamp_new(record);
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
        expected_version: Option<i64>,
    ) -> Result<Vec<Row>, AppError> {
        let patch = strip_meta(patch);
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let matched: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(row, filters))
            .map(|(i, _)| i)
            .collect();

        if let Some(expected) = expected_version {
            if let Some(stale) = matched.iter().map(|&i| row_version(&rows[i])).find(|v| *v != expected) {
                return Err(version_conflict(table, expected, stale));
            }
        }

        Ok(matched
            .into_iter()
            .map(|i| {
                Self::merge(&mut rows[i], &patch);
                rows[i].clone()
            })
            .collect())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(row, filters));
        Ok((before - rows.len()) as u64)
    }

    async fn upsert(&self, table: &str, key_field: &str, record: Row) -> Result<Row, AppError> {
        let key = record
            .get(key_field)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| AppError::BadRequest(format!("Upsert requires a '{}' value", key_field)))?;
        let filter = Filter::Eq(key_field.to_string(), key);

        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(existing) = rows.iter_mut().find(|row| filter.matches(row)) {
            Self::merge(existing, &strip_meta(record));
            return Ok(existing.clone());
        }

        let row = Self::stamp_new(record);
        rows.push(row.clone());
        Ok(row)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
