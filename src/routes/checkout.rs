//! Public booking checkout

use crate::auth::Claims;
use crate::error::ApiResult;
use crate::managers::{Checkout, CheckoutOutcome};
use crate::models::{CheckoutRequest, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

/// POST /api/checkout
///
/// Signed-in callers book under their own profile; anonymous callers are
/// matched to a profile by email, or one is created for them.
pub async fn checkout(
    State(state): State<SharedState>,
    claims: Option<Extension<Claims>>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<SuccessResponse<CheckoutOutcome>>)> {
    let flow = Checkout {
        profiles: &state.profiles,
        packages: &state.packages,
        bookings: &state.bookings,
        payments: &state.payments,
        settings: &state.settings,
    };
    let outcome = flow.run(req, claims.as_ref().map(|Extension(c)| c)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::with_data("Booking received. Payment is pending.", outcome)),
    ))
}
