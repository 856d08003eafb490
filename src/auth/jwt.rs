//! JWT token management
//!
//! Handles creation, validation, and refresh of JWT tokens.

use crate::auth::Role;
use crate::config::AuthConfig;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (profile ID)
    pub sub: Uuid,
    /// Profile email
    pub email: String,
    /// Profile role
    pub role: Role,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token pair response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn sign(config: &AuthConfig, claims: &Claims) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

/// Create access and refresh tokens for a profile
pub fn create_tokens(
    config: &AuthConfig,
    profile_id: Uuid,
    email: &str,
    role: Role,
) -> Result<TokenPair, AppError> {
    let now = Utc::now();

    let access_token = sign(
        config,
        &Claims {
            sub: profile_id,
            email: email.to_string(),
            role,
            exp: (now + Duration::minutes(config.access_token_minutes)).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Access,
        },
    )?;

    let refresh_token = sign(
        config,
        &Claims {
            sub: profile_id,
            email: email.to_string(),
            role,
            exp: (now + Duration::days(config.refresh_token_days)).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Refresh,
        },
    )?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_minutes * 60,
    })
}

/// Decode and validate a JWT token
pub fn decode_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Unauthorized(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Refresh tokens using a valid refresh token
/// Validate a refresh token and return its claims.
///
/// The caller re-issues tokens from the stored profile so role changes apply
/// on the next refresh.
pub fn refresh_claims(config: &AuthConfig, refresh_token: &str) -> Result<Claims, AppError> {
    let claims = decode_token(config, refresh_token)?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Invalid token type for refresh".to_string()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_round_trip() {
        let config = AuthConfig::default();
        let id = Uuid::new_v4();
        let pair = create_tokens(&config, id, "guide@wanderlust.test", Role::TourManager).unwrap();

        let claims = decode_token(&config, &pair.access_token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::TourManager);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(pair.expires_in, 15 * 60);
    }

    #[test]
    fn test_refresh_requires_refresh_token() {
        let config = AuthConfig::default();
        let pair = create_tokens(&config, Uuid::new_v4(), "c@x.test", Role::Client).unwrap();

        assert!(refresh_claims(&config, &pair.refresh_token).is_ok());
        assert!(matches!(
            refresh_claims(&config, &pair.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let config = AuthConfig::default();
        let pair = create_tokens(&config, Uuid::new_v4(), "c@x.test", Role::Client).unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        };
        assert!(decode_token(&other, &pair.access_token).is_err());
    }
}
