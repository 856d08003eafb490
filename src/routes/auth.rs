//! Authentication route handlers
//!
//! Provides register, login, refresh and the current profile.

use crate::auth::{create_tokens, refresh_claims, verify_password, Claims, Role, TokenPair};
use crate::error::AppError;
use crate::models::{LoginRequest, Profile, RefreshRequest, RegisterRequest};
use crate::state::SharedState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;

// ============================================
// Response Types
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub profile: Profile,
    pub tokens: TokenPair,
    /// Dashboard to open after signing in
    pub home: &'static str,
}

impl AuthResponse {
    fn new(profile: Profile, tokens: TokenPair) -> Self {
        let home = profile.role.home_path();
        Self {
            success: true,
            profile,
            tokens,
            home,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub profile: Profile,
    pub home: &'static str,
}

// ============================================
// Route Handlers
// ============================================

/// POST /api/auth/register
///
/// Self-service sign up. New accounts are always clients.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let profile = state.profiles.register(req).await?;
    let tokens = create_tokens(&state.auth, profile.meta.id, &profile.email, Role::Client)?;

    info!("Registered {}", profile.email);
    Ok((StatusCode::CREATED, Json(AuthResponse::new(profile, tokens))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let profile = state.profiles.by_email(&req.email).await?.ok_or_else(invalid)?;
    let hash = profile.password_hash.as_deref().ok_or_else(invalid)?;
    if !verify_password(&req.password, hash)? {
        return Err(invalid());
    }

    let tokens = create_tokens(&state.auth, profile.meta.id, &profile.email, profile.role)?;
    Ok(Json(AuthResponse::new(profile, tokens)))
}

/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<SharedState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let claims = refresh_claims(&state.auth, &req.refresh_token)?;
    let profile = state
        .profiles
        .get(claims.sub)
        .await
        .map_err(|_| AppError::Unauthorized("Profile no longer exists".to_string()))?;

    let tokens = create_tokens(&state.auth, profile.meta.id, &profile.email, profile.role)?;
    Ok(Json(TokenResponse {
        success: true,
        tokens,
    }))
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, AppError> {
    let profile = state
        .profiles
        .get(claims.sub)
        .await
        .map_err(|_| AppError::Unauthorized("Profile no longer exists".to_string()))?;

    Ok(Json(MeResponse {
        success: true,
        home: profile.role.home_path(),
        profile,
    }))
}
