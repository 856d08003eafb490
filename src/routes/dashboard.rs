//! Role dashboards
//!
//! Each handler loads fresh records and hands them to the pure aggregations
//! in `crate::dashboard`.

use crate::auth::Claims;
use crate::dashboard::{
    self, AccountantDashboard, AdminDashboard, ClientDashboard, TourManagerDashboard,
};
use crate::error::ApiResult;
use crate::models::SuccessResponse;
use crate::state::SharedState;
use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

/// GET /api/dashboard/admin
pub async fn admin(State(state): State<SharedState>) -> ApiResult<Json<SuccessResponse<AdminDashboard>>> {
    let (bookings, payments, centers, profiles, activities) = tokio::try_join!(
        state.bookings.list(Vec::new()),
        state.payments.list(Vec::new()),
        state.centers.list(Vec::new()),
        state.profiles.list(Vec::new()),
        state.volunteer.list(Vec::new()),
    )?;
    let stats = dashboard::admin(&bookings, &payments, &centers, &profiles, &activities);
    Ok(Json(SuccessResponse::with_data("Admin overview.", stats)))
}

/// GET /api/dashboard/tour-manager
pub async fn tour_manager(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<TourManagerDashboard>>> {
    let (bookings, packages, centers, activities) = tokio::try_join!(
        state.bookings.list(Vec::new()),
        state.packages.list(Vec::new()),
        state.centers.list(Vec::new()),
        state.volunteer.list(Vec::new()),
    )?;
    let today = Utc::now().date_naive();
    let stats = dashboard::tour_manager(&bookings, &packages, &centers, &activities, today);
    Ok(Json(SuccessResponse::with_data("Operations overview.", stats)))
}

/// GET /api/dashboard/accountant
pub async fn accountant(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<AccountantDashboard>>> {
    let payments = state.payments.list(Vec::new()).await?;
    Ok(Json(SuccessResponse::with_data(
        "Finance overview.",
        dashboard::accountant(&payments),
    )))
}

/// GET /api/dashboard/client
pub async fn client(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<ClientDashboard>>> {
    let bookings = state.bookings.for_client(claims.sub).await?;
    let ids: Vec<Uuid> = bookings.iter().map(|b| b.meta.id).collect();
    let payments = state.payments.for_bookings(&ids).await?;
    let stats = dashboard::client(bookings, &payments, Utc::now().date_naive());
    Ok(Json(SuccessResponse::with_data("Your trips.", stats)))
}
