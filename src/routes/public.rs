//! Public site endpoints
//!
//! Read-only views for anonymous visitors: bookable packages, published
//! posts, running ads, open centers, upcoming activities and the public
//! settings used for branding.

use crate::error::ApiResult;
use crate::managers::{encode, Entity};
use crate::models::{
    Advertisement, BlogPost, CenterWithMedia, Package, SuccessResponse, VolunteerActivity,
};
use crate::state::SharedState;
use crate::table::{ListPage, ListParams};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// GET /api/packages
pub async fn packages(
    State(state): State<SharedState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<SuccessResponse<ListPage>>> {
    let spec = Package::table_spec().filter_keys(["location"]);
    let params = ListParams::from_map(&query, &spec.filter_keys)?;
    let rows = state
        .packages
        .active()
        .await?
        .iter()
        .map(encode)
        .collect::<ApiResult<Vec<_>>>()?;

    let page = spec.list(rows, &params, state.default_page_size);
    Ok(Json(SuccessResponse::with_data(
        format!("{} packages available.", page.total),
        page,
    )))
}

/// GET /api/packages/{slug}
pub async fn package(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<SuccessResponse<Package>>> {
    let package = state.packages.by_slug(&slug).await?;
    Ok(Json(SuccessResponse::with_data("Package found.", package)))
}

/// GET /api/blog
pub async fn blog_posts(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Vec<BlogPost>>>> {
    let posts = state.blog.published().await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} posts.", posts.len()),
        posts,
    )))
}

/// GET /api/blog/{slug}
pub async fn blog_post(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<SuccessResponse<BlogPost>>> {
    let post = state.blog.published_by_slug(&slug).await?;
    Ok(Json(SuccessResponse::with_data("Post found.", post)))
}

#[derive(Debug, Deserialize)]
pub struct AdsQuery {
    pub placement: Option<String>,
}

/// GET /api/ads
pub async fn advertisements(
    State(state): State<SharedState>,
    Query(query): Query<AdsQuery>,
) -> ApiResult<Json<SuccessResponse<Vec<Advertisement>>>> {
    let ads = state.advertisements.active(query.placement.as_deref()).await?;
    Ok(Json(SuccessResponse::with_data(format!("{} ads.", ads.len()), ads)))
}

/// GET /api/centers
pub async fn centers(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<Vec<CenterWithMedia>>>> {
    let centers = state.centers.active().await?;
    let centers = state.center_media.attach(centers).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} centers.", centers.len()),
        centers,
    )))
}

/// GET /api/volunteer-activities
pub async fn volunteer_activities(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<Vec<VolunteerActivity>>>> {
    let activities = state.volunteer.upcoming().await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} upcoming activities.", activities.len()),
        activities,
    )))
}

/// GET /api/settings/public
pub async fn settings(State(state): State<SharedState>) -> Json<SuccessResponse<BTreeMap<String, String>>> {
    let snapshot = state.settings.snapshot().await;
    Json(SuccessResponse::with_data("Site settings.", snapshot))
}
