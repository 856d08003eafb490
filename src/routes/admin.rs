//! Admin-only endpoints outside the generic managers:
//! settings, role changes and the audit trail.

use crate::audit::{audit_table_spec, AuditAction, AUDIT_TABLE};
use crate::auth::Claims;
use crate::db::Query as DbQuery;
use crate::error::ApiResult;
use crate::managers::encode;
use crate::models::{Profile, RoleChange, SuccessResponse};
use crate::settings::{Setting, WriteSetting};
use crate::state::SharedState;
use crate::table::{Column, ExportFile, ListPage, ListParams, TableSpec};
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

fn settings_table_spec() -> TableSpec {
    TableSpec::new(vec![
        Column::new("key", "Key"),
        Column::new("value", "Value"),
        Column::new("category", "Category"),
        Column::new("data_type", "Type"),
        Column::new("updated_at", "Updated"),
    ])
    .search_keys(["key", "value"])
    .filter_keys(["category", "data_type"])
}

/// GET /api/admin/settings
pub async fn list_settings(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<SuccessResponse<ListPage>>> {
    let spec = settings_table_spec();
    let params = ListParams::from_map(&query, &spec.filter_keys)?;
    let rows = state
        .settings
        .all()
        .await
        .iter()
        .map(encode)
        .collect::<ApiResult<Vec<_>>>()?;

    let page = spec.list(rows, &params, state.default_page_size);
    Ok(Json(SuccessResponse::with_data(
        format!("{} settings.", page.total),
        page,
    )))
}

/// PUT /api/admin/settings
///
/// Upsert one setting by key, then re-hydrate the cache so every reader
/// sees the stored state.
pub async fn write_setting(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<WriteSetting>,
) -> ApiResult<Json<SuccessResponse<Setting>>> {
    let key = req.key.clone();
    let setting = state.settings.write(req).await?;
    state.settings.refresh().await?;

    state.audit.record(
        AuditAction::SettingChanged,
        json!({ "key": key, "value": setting.value }),
        Some(&claims),
    );
    Ok(Json(SuccessResponse::with_data(
        format!("Setting '{}' saved.", key),
        setting,
    )))
}

/// POST /api/admin/settings/refresh
///
/// Drops the cache and hydrates it from the table again.
pub async fn refresh_settings(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Value>>> {
    let count = state.settings.invalidate().await?;
    state
        .audit
        .record(AuditAction::SettingsRefreshed, json!({ "keys": count }), Some(&claims));
    Ok(Json(SuccessResponse::with_data(
        "Settings reloaded.",
        json!({ "keys": count }),
    )))
}

/// PUT /api/admin/profiles/{id}/role
pub async fn change_role(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleChange>,
) -> ApiResult<Json<SuccessResponse<Profile>>> {
    let profile = state
        .profiles
        .change_role(id, req.role, req.version, Some(&claims))
        .await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} is now {}.", profile.email, profile.role),
        profile,
    )))
}

async fn audit_rows(state: &SharedState) -> ApiResult<Vec<Value>> {
    let rows = state
        .gateway
        .select(&DbQuery::table(AUDIT_TABLE).order_by("timestamp", true))
        .await?;
    Ok(rows.into_iter().map(Value::Object).collect())
}

/// GET /api/admin/audit-logs
pub async fn audit_logs(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<SuccessResponse<ListPage>>> {
    let spec = audit_table_spec();
    let params = ListParams::from_map(&query, &spec.filter_keys)?;
    let page = spec.list(audit_rows(&state).await?, &params, state.default_page_size);
    Ok(Json(SuccessResponse::with_data(
        format!("{} audit entries.", page.total),
        page,
    )))
}

/// GET /api/admin/audit-logs/export
pub async fn export_audit_logs(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ExportFile> {
    let spec = audit_table_spec();
    let params = ListParams::from_map(&query, &spec.filter_keys)?;
    let view = spec.apply(audit_rows(&state).await?, &params, state.default_page_size);
    Ok(view.export(None))
}
