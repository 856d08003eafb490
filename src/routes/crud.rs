//! Generic manager endpoints
//!
//! Every staff manager screen gets the same surface:
//!
//! - `GET    {base}`           one page of the table (search/sort/filter/paginate)
//! - `GET    {base}/export`    the whole filtered, sorted table as CSV
//! - `GET    {base}/{id}`      one record
//! - `POST   {base}`           create
//! - `PUT    {base}/{id}`      partial update carrying the version read
//! - `DELETE {base}/{id}`      delete (or archive, for soft-deleted entities)

use crate::auth::Claims;
use crate::error::ApiResult;
use crate::managers::{Entity, Manager};
use crate::models::{
    Advertisement, BlogPost, Booking, InformationCenter, MessageResponse, Package, Payment,
    Profile, SuccessResponse, UpdateRequest, VolunteerActivity,
};
use crate::state::{AppState, SharedState};
use crate::table::{ExportFile, ListPage, ListParams, TableView};
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Entities reachable through the generic endpoints
pub trait Managed: Entity {
    fn manager(state: &AppState) -> &Manager<Self>;

    /// Field that must stay unique across records on create
    fn unique_key(_input: &Self::Create) -> Option<(&'static str, String)> {
        None
    }

    /// Same field when an update changes it
    fn unique_change(_changes: &Self::Update) -> Option<(&'static str, String)> {
        None
    }
}

impl Managed for Profile {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.profiles
    }
}

impl Managed for Package {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.packages
    }

    fn unique_key(input: &Self::Create) -> Option<(&'static str, String)> {
        Some(("slug", input.slug.clone()))
    }

    fn unique_change(changes: &Self::Update) -> Option<(&'static str, String)> {
        changes.slug.clone().map(|slug| ("slug", slug))
    }
}

impl Managed for Booking {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.bookings
    }
}

impl Managed for Payment {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.payments
    }
}

impl Managed for InformationCenter {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.centers
    }
}

impl Managed for VolunteerActivity {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.volunteer
    }
}

impl Managed for Advertisement {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.advertisements
    }
}

impl Managed for BlogPost {
    fn manager(state: &AppState) -> &Manager<Self> {
        &state.blog
    }

    fn unique_key(input: &Self::Create) -> Option<(&'static str, String)> {
        Some(("slug", input.slug.clone()))
    }

    fn unique_change(changes: &Self::Update) -> Option<(&'static str, String)> {
        changes.slug.clone().map(|slug| ("slug", slug))
    }
}

/// List, export and fetch
pub fn read_routes<T: Managed>(base: &str) -> Router<SharedState> {
    Router::new()
        .route(base, get(list::<T>))
        .route(&format!("{}/export", base), get(export::<T>))
        .route(&format!("{}/{{id}}", base), get(fetch::<T>))
}

/// Full manager surface
pub fn routes<T: Managed>(base: &str) -> Router<SharedState> {
    Router::new()
        .route(base, get(list::<T>).post(create::<T>))
        .route(&format!("{}/export", base), get(export::<T>))
        .route(
            &format!("{}/{{id}}", base),
            get(fetch::<T>).put(update::<T>).delete(remove::<T>),
        )
}

async fn view<T: Managed>(state: &AppState, query: &HashMap<String, String>) -> ApiResult<TableView> {
    let spec = T::table_spec();
    let params = ListParams::from_map(query, &spec.filter_keys)?;
    let rows = T::manager(state).rows(Vec::new()).await?;
    Ok(spec.apply(rows, &params, state.default_page_size))
}

async fn list<T: Managed>(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<SuccessResponse<ListPage>>> {
    let page = ListPage::from(&view::<T>(&state, &query).await?);
    debug!("{} list: page {} of {}", T::LABEL, page.current_page, page.total_pages);
    Ok(Json(SuccessResponse::with_data(
        format!("{} records found.", page.total),
        page,
    )))
}

async fn export<T: Managed>(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ExportFile> {
    let view = view::<T>(&state, &query).await?;
    let exporter = T::exporter();
    Ok(view.export(exporter.as_deref()))
}

async fn fetch<T: Managed>(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<T>>> {
    let record = T::manager(&state).get(id).await?;
    Ok(Json(SuccessResponse::with_data(format!("{} found.", T::LABEL), record)))
}

async fn create<T: Managed>(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<T::Create>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<T>>)> {
    let manager = T::manager(&state);
    if let Some((field, value)) = T::unique_key(&input) {
        manager.ensure_unique(field, &value).await?;
    }
    let record = manager.create(input, Some(&claims)).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data(format!("{} created successfully.", T::LABEL), record)),
    ))
}

async fn update<T: Managed>(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequest<T::Update>>,
) -> ApiResult<Json<SuccessResponse<T>>> {
    let manager = T::manager(&state);
    if let Some((field, value)) = T::unique_change(&req.changes) {
        manager.ensure_unique_except(field, &value, id).await?;
    }
    let record = manager.update(id, req.changes, req.version, Some(&claims)).await?;
    Ok(Json(SuccessResponse::with_data(format!("{} updated successfully.", T::LABEL), record)))
}

async fn remove<T: Managed>(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    T::manager(&state).delete(id, Some(&claims)).await?;
    Ok(Json(MessageResponse::new(format!("{} deleted successfully.", T::LABEL))))
}
