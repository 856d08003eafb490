//! Client self-service endpoints
//!
//! Everything here is scoped to the caller's own profile.

use crate::auth::Claims;
use crate::error::{not_found_error, ApiResult};
use crate::managers::{encode, Entity};
use crate::models::{Booking, Payment, SuccessResponse};
use crate::state::SharedState;
use crate::table::{ListPage, ListParams};
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use std::collections::HashMap;
use uuid::Uuid;

/// GET /api/client/bookings
pub async fn bookings(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<SuccessResponse<ListPage>>> {
    let spec = Booking::table_spec();
    let params = ListParams::from_map(&query, &spec.filter_keys)?;
    let rows = state
        .bookings
        .for_client(claims.sub)
        .await?
        .iter()
        .map(encode)
        .collect::<ApiResult<Vec<_>>>()?;

    let page = spec.list(rows, &params, state.default_page_size);
    Ok(Json(SuccessResponse::with_data(
        format!("{} bookings.", page.total),
        page,
    )))
}

/// GET /api/client/bookings/{id}
pub async fn booking(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<Booking>>> {
    let booking = state.bookings.get(id).await?;
    if booking.client_id != claims.sub {
        return Err(not_found_error(format!("Booking {} not found", id)));
    }
    Ok(Json(SuccessResponse::with_data("Booking found.", booking)))
}

/// GET /api/client/payments
pub async fn payments(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<Vec<Payment>>>> {
    let booking_ids: Vec<Uuid> = state
        .bookings
        .for_client(claims.sub)
        .await?
        .iter()
        .map(|b| b.meta.id)
        .collect();
    let payments = state.payments.for_bookings(&booking_ids).await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} payments.", payments.len()),
        payments,
    )))
}
