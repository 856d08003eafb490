//! Profiles: registration, lookup by email, role changes and the admin seed

use super::{decode, Entity, Manager};
use crate::audit::AuditAction;
use crate::auth::{hash_password, Claims, Role};
use crate::config::AdminSeed;
use crate::db::{Filter, Row};
use crate::error::{not_found_error, validation_error, AppError};
use crate::models::{NewProfile, Profile, ProfileUpdate, RecordMeta, RegisterRequest};
use crate::table::{Column, TableSpec};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

impl Entity for Profile {
    type Create = NewProfile;
    type Update = ProfileUpdate;

    const TABLE: &'static str = "profiles";
    const LABEL: &'static str = "Profile";

    const CREATED: AuditAction = AuditAction::ProfileRegistered;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("full_name", "Name"),
            Column::new("email", "Email"),
            Column::new("phone", "Phone").unsortable(),
            Column::new("role", "Role"),
            Column::new("created_at", "Joined"),
        ])
        .search_keys(["full_name", "email", "phone"])
        .filter_keys(["role"])
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Manager<Profile> {
    pub async fn by_email(&self, email: &str) -> Result<Option<Profile>, AppError> {
        self.find(vec![Filter::eq("email", normalize_email(email))]).await
    }

    async fn insert_profile(&self, mut profile: NewProfile, actor: Option<&Claims>) -> Result<Profile, AppError> {
        profile.email = normalize_email(&profile.email);
        profile.validate().map_err(|e| validation_error(e.to_string()))?;
        self.ensure_unique("email", &profile.email).await?;
        self.create(profile, actor).await
    }

    /// Self-service sign up; always a client
    pub async fn register(&self, req: RegisterRequest) -> Result<Profile, AppError> {
        req.validate().map_err(|e| validation_error(e.to_string()))?;
        let profile = NewProfile {
            email: req.email,
            full_name: req.full_name,
            phone: req.phone,
            role: Role::Client,
            password_hash: Some(hash_password(&req.password)?),
        };
        self.insert_profile(profile, None).await
    }

    /// Profile for a checkout without a session: reuse a guest profile by
    /// email or create a client without credentials.
    ///
    /// An email that belongs to a registered account fails with
    /// `Unauthorized`; the caller has to sign in to book under it.
    pub async fn find_or_create_client(
        &self,
        full_name: &str,
        email: &str,
        phone: Option<String>,
    ) -> Result<Profile, AppError> {
        if let Some(existing) = self.by_email(email).await? {
            if existing.can_sign_in() {
                return Err(AppError::Unauthorized(
                    "An account exists for this email. Sign in to book.".to_string(),
                ));
            }
            return Ok(existing);
        }
        let profile = NewProfile {
            email: email.to_string(),
            full_name: full_name.to_string(),
            phone,
            role: Role::Client,
            password_hash: None,
        };
        self.insert_profile(profile, None).await
    }

    /// Admin-only role change, checked against the version the admin read
    pub async fn change_role(
        &self,
        id: Uuid,
        role: Role,
        expected_version: i64,
        actor: Option<&Claims>,
    ) -> Result<Profile, AppError> {
        let mut patch = Row::new();
        patch.insert("role".to_string(), Value::String(role.to_string()));
        let updated = self
            .gateway()
            .update(Profile::TABLE, &[Filter::eq("id", id.to_string())], patch, Some(expected_version))
            .await?;
        let profile: Profile = match updated.into_iter().next() {
            Some(row) => decode(row)?,
            None => return Err(not_found_error(format!("Profile {} not found", id))),
        };

        info!("Profile {} is now {}", profile.email, role);
        self.audit().record(
            AuditAction::RoleChanged,
            json!({ "profile_id": id, "role": role }),
            actor,
        );
        Ok(profile)
    }

    /// Create the configured admin account unless it exists
    pub async fn seed_admin(&self, seed: &AdminSeed) -> Result<(), AppError> {
        if self.by_email(&seed.email).await?.is_some() {
            return Ok(());
        }
        let profile = NewProfile {
            email: seed.email.clone(),
            full_name: "Administrator".to_string(),
            phone: None,
            role: Role::Admin,
            password_hash: Some(hash_password(&seed.password)?),
        };
        self.insert_profile(profile, None).await?;
        info!("Seeded admin account {}", seed.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::managers::testing::{claims, gateway};
    use pretty_assertions::assert_eq;

    fn register(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "sahara-nights".to_string(),
            full_name: "Amina Traveler".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_and_rejects_duplicates() {
        let (gateway, audit) = gateway();
        let manager: Manager<Profile> = Manager::new(gateway, audit);

        let profile = manager.register(register("Amina@Example.com")).await.unwrap();
        assert_eq!(profile.email, "amina@example.com");
        assert_eq!(profile.role, Role::Client);
        let hash = profile.password_hash.clone().unwrap();
        assert!(verify_password("sahara-nights", &hash).unwrap());

        let encoded = serde_json::to_value(&profile).unwrap();
        assert!(encoded.get("password_hash").is_none());

        let again = manager.register(register("amina@example.com")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_checkout_profile_is_reused() {
        let (gateway, audit) = gateway();
        let manager: Manager<Profile> = Manager::new(gateway, audit);

        let first = manager.find_or_create_client("Omar", "omar@example.com", None).await.unwrap();
        let second = manager.find_or_create_client("Omar B", "OMAR@example.com", None).await.unwrap();
        assert_eq!(first.meta.id, second.meta.id);
        assert!(!first.can_sign_in());
    }

    #[tokio::test]
    async fn test_guest_checkout_cannot_claim_registered_email() {
        let (gateway, audit) = gateway();
        let manager: Manager<Profile> = Manager::new(gateway, audit);
        manager.register(register("amina@example.com")).await.unwrap();

        let guest = manager.find_or_create_client("Someone", "Amina@Example.com", None).await;
        assert!(matches!(guest, Err(AppError::Unauthorized(_))));
        assert_eq!(manager.list(vec![]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_role_respects_version() {
        let (gateway, audit) = gateway();
        let manager: Manager<Profile> = Manager::new(gateway, audit);
        let admin = claims(Role::Admin);
        let profile = manager.register(register("guide@example.com")).await.unwrap();

        let promoted = manager
            .change_role(profile.meta.id, Role::TourManager, 1, Some(&admin))
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::TourManager);

        let stale = manager.change_role(profile.meta.id, Role::Accountant, 1, Some(&admin)).await;
        assert!(matches!(stale, Err(AppError::Conflict(_))));
    }
}
