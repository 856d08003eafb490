//! PostgreSQL gateway
//!
//! Stores every logical table as JSONB documents in `records`. Writes run in
//! a transaction that locks the affected rows first.

use super::queries::{SqlBuilder, BOOTSTRAP, INSERT_RECORD, UPDATE_RECORD};
use super::{
    row_version, strip_meta, timestamp_now, version_conflict, DataGateway, Filter, Query, Row,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{GenericClient, Pool};
use postgres_types::{Json, ToSql};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

type Param = Box<dyn ToSql + Sync + Send>;

/// Gateway backed by a deadpool connection pool
pub struct PgGateway {
    pool: Pool,
}

impl PgGateway {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the record table and indexes if they don't exist
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        for statement in BOOTSTRAP {
            client.batch_execute(statement).await?;
        }
        info!("✅ Record tables initialized");
        Ok(())
    }
}

/// `WHERE` clause over `table_name` plus the filters
fn build_where(builder: &mut SqlBuilder, params: &mut Vec<Param>, table: &str, filters: &[Filter]) {
    let table_param = builder.param();
    builder.push(&format!(" WHERE table_name = {}", table_param));
    params.push(Box::new(table.to_string()));

    for filter in filters {
        let field = builder.field_expr();
        params.push(Box::new(filter.field().to_string()));
        let value = builder.param();
        builder.push(&predicate(filter, &field, &value));
        match filter {
            Filter::Eq(_, v) | Filter::Neq(_, v) => params.push(Box::new(Json(v.clone()))),
            Filter::In(_, vs) => params.push(Box::new(vs.iter().cloned().map(Json).collect::<Vec<_>>())),
        }
    }
}

/// One `AND` clause. Missing keys and JSON `null` never equal anything,
/// as in `Filter::matches`.
fn predicate(filter: &Filter, field: &str, value: &str) -> String {
    match filter {
        Filter::Eq(..) => format!(" AND jsonb_typeof({f}) <> 'null' AND {f} = {v}::jsonb", f = field, v = value),
        Filter::Neq(..) => format!(
            " AND ({f} IS NULL OR {f} = 'null'::jsonb OR {f} <> {v}::jsonb)",
            f = field,
            v = value
        ),
        Filter::In(..) => format!(
            " AND jsonb_typeof({f}) <> 'null' AND {f} = ANY({v}::jsonb[])",
            f = field,
            v = value
        ),
    }
}

fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect()
}

fn decode_data(row: &tokio_postgres::Row) -> Result<Row, AppError> {
    let Json(value): Json<Value> = row.try_get("data")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(format!("Stored record is not an object: {}", other))),
    }
}

fn record_id(row: &Row) -> Result<Uuid, AppError> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::Internal("Stored record has no valid id".to_string()))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))
}

fn map_unique_violation(e: tokio_postgres::Error, table: &str) -> AppError {
    if e.code() == Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION) {
        AppError::Conflict(format!("A record with the same key already exists in '{}'", table))
    } else {
        AppError::Database(e)
    }
}

async fn insert_with<C: GenericClient>(client: &C, table: &str, record: Row) -> Result<Row, AppError> {
    let id = Uuid::new_v4();
    let now = timestamp_now();
    let mut row = strip_meta(record);
    row.insert("id".to_string(), Value::String(id.to_string()));
    row.insert("version".to_string(), Value::from(1));
    row.insert("created_at".to_string(), Value::String(now.clone()));
    row.insert("updated_at".to_string(), Value::String(now.clone()));

    let data = Json(Value::Object(row.clone()));
    let at = parse_timestamp(&now)?;
    client
        .execute(INSERT_RECORD, &[&table, &id, &data, &at])
        .await
        .map_err(|e| map_unique_violation(e, table))?;
    Ok(row)
}

async fn merge_with<C: GenericClient>(client: &C, table: &str, mut row: Row, patch: &Row) -> Result<Row, AppError> {
    let id = record_id(&row)?;
    let version = row_version(&row) + 1;
    let now = timestamp_now();
    for (key, value) in patch {
        row.insert(key.clone(), value.clone());
    }
    row.insert("version".to_string(), Value::from(version));
    row.insert("updated_at".to_string(), Value::String(now.clone()));

    let data = Json(Value::Object(row.clone()));
    let at = parse_timestamp(&now)?;
    client
        .execute(UPDATE_RECORD, &[&data, &version, &at, &table, &id])
        .await
        .map_err(|e| map_unique_violation(e, table))?;
    Ok(row)
}

#[async_trait]
impl DataGateway for PgGateway {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
        let mut builder = SqlBuilder::new("SELECT data FROM records");
        let mut params: Vec<Param> = Vec::new();
        build_where(&mut builder, &mut params, &query.table, &query.filters);

        if !query.order.is_empty() {
            let clauses: Vec<String> = query
                .order
                .iter()
                .map(|o| {
                    let field = builder.field_expr();
                    params.push(Box::new(o.field.clone()));
                    let direction = if o.descending { "DESC" } else { "ASC" };
                    format!("NULLIF({}, 'null'::jsonb) {} NULLS LAST", field, direction)
                })
                .collect();
            builder.push(&format!(" ORDER BY {}", clauses.join(", ")));
        }
        if let Some(limit) = query.limit {
            builder.push(&format!(" LIMIT {}", limit));
        }

        let sql = builder.finish();
        debug!("select {}: {}", query.table, sql);
        let client = self.pool.get().await?;
        let rows = client.query(sql.as_str(), &param_refs(&params)).await?;
        rows.iter().map(decode_data).collect()
    }

    async fn insert(&self, table: &str, record: Row) -> Result<Row, AppError> {
        let client = self.pool.get().await?;
        insert_with(&client, table, record).await
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
        expected_version: Option<i64>,
    ) -> Result<Vec<Row>, AppError> {
        let patch = strip_meta(patch);
        let mut builder = SqlBuilder::new("SELECT data FROM records");
        let mut params: Vec<Param> = Vec::new();
        build_where(&mut builder, &mut params, table, filters);
        builder.push(" FOR UPDATE");
        let sql = builder.finish();

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let locked: Vec<Row> = tx
            .query(sql.as_str(), &param_refs(&params))
            .await?
            .iter()
            .map(decode_data)
            .collect::<Result<_, _>>()?;

        if let Some(expected) = expected_version {
            if let Some(stale) = locked.iter().map(row_version).find(|v| *v != expected) {
                return Err(version_conflict(table, expected, stale));
            }
        }

        let mut updated = Vec::with_capacity(locked.len());
        for row in locked {
            updated.push(merge_with(&tx, table, row, &patch).await?);
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError> {
        let mut builder = SqlBuilder::new("DELETE FROM records");
        let mut params: Vec<Param> = Vec::new();
        build_where(&mut builder, &mut params, table, filters);
        let sql = builder.finish();

        let client = self.pool.get().await?;
        Ok(client.execute(sql.as_str(), &param_refs(&params)).await?)
    }

    async fn upsert(&self, table: &str, key_field: &str, record: Row) -> Result<Row, AppError> {
        let key = record
            .get(key_field)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| AppError::BadRequest(format!("Upsert requires a '{}' value", key_field)))?;

        let mut builder = SqlBuilder::new("SELECT data FROM records");
        let mut params: Vec<Param> = Vec::new();
        build_where(&mut builder, &mut params, table, &[Filter::Eq(key_field.to_string(), key)]);
        builder.push(" LIMIT 1 FOR UPDATE");
        let sql = builder.finish();

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let existing = tx.query_opt(sql.as_str(), &param_refs(&params)).await?;
        let row = match existing {
            Some(row) => merge_with(&tx, table, decode_data(&row)?, &strip_meta(record)).await?,
            None => insert_with(&tx, table, record).await?,
        };
        tx.commit().await?;
        Ok(row)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
