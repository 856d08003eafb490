//! Authentication middleware
//!
//! Extracts and validates JWT tokens, then checks the route capability table.

use crate::auth::{access_for, decode_token, Access, Claims, TokenType};
use crate::error::AppError;
use crate::state::SharedState;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))
}

fn authenticate(state: &SharedState, headers: &HeaderMap) -> Result<Option<Claims>, AppError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };
    let claims = decode_token(&state.auth, token)?;
    if claims.token_type != TokenType::Access {
        return Err(AppError::Unauthorized("Refresh tokens cannot authorize requests".to_string()));
    }
    Ok(Some(claims))
}

/// Guard every request against the capability table.
///
/// Public paths pass through, with claims attached when a valid token is
/// present. Protected paths without a valid token fail with 401 (redirect to
/// the auth page); a valid token with the wrong role fails with 403
/// (redirect to that role's home dashboard).
pub async fn route_guard(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let access = access_for(&path);

    let claims = match authenticate(&state, request.headers()) {
        Ok(claims) => claims,
        // A stale token should not lock anyone out of public pages
        Err(_) if access == Access::Public => None,
        Err(e) => return Err(e),
    };

    match (&access, &claims) {
        (Access::Public, _) => {}
        (_, None) => {
            return Err(AppError::Unauthorized("Authentication required".to_string()));
        }
        (access, Some(claims)) if !access.allows(claims.role) => {
            debug!("{} denied for role {}", path, claims.role);
            return Err(AppError::Forbidden {
                message: format!("Role '{}' cannot access {}", claims.role, path),
                home: claims.role.home_path().to_string(),
            });
        }
        _ => {}
    }

    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}
