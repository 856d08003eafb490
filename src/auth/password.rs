//! Password hashing for profile sign-in (bcrypt)

use crate::error::{validation_error, AppError};
use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use tracing::warn;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.trim().is_empty() {
        return Err(validation_error("Password cannot be blank"));
    }
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// `Ok(false)` for a wrong password or a stored hash bcrypt cannot read
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    match verify(password, stored_hash) {
        Ok(matches) => Ok(matches),
        Err(BcryptError::InvalidHash(_) | BcryptError::InvalidPrefix(_)) => {
            warn!("Stored password hash is malformed; rejecting sign-in");
            Ok(false)
        }
        Err(e) => Err(AppError::Internal(format!("Failed to verify password: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }

    #[test]
    fn test_blank_password_and_bad_hash() {
        assert!(matches!(hash_password("   "), Err(AppError::Validation(_))));
        assert!(!verify_password("anything", "not-a-bcrypt-hash").unwrap());
    }
}
