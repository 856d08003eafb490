//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::audit::AuditLog;
use crate::config::{AppConfig, AuthConfig};
use crate::db::SharedGateway;
use crate::managers::Manager;
use crate::models::{
    Advertisement, BlogPost, Booking, CenterMedia, InformationCenter, Package, Payment, Profile,
    VolunteerActivity,
};
use crate::settings::SettingsStore;
use crate::storage::BucketStorage;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Remote data gateway (PostgreSQL or in-memory)
    pub gateway: SharedGateway,

    /// Cached site settings
    pub settings: SettingsStore,

    /// Upload buckets
    pub storage: BucketStorage,

    /// Fire-and-forget audit sink
    pub audit: AuditLog,

    /// JWT signing settings
    pub auth: AuthConfig,

    pub profiles: Manager<Profile>,
    pub packages: Manager<Package>,
    pub bookings: Manager<Booking>,
    pub payments: Manager<Payment>,
    pub centers: Manager<InformationCenter>,
    pub center_media: Manager<CenterMedia>,
    pub volunteer: Manager<VolunteerActivity>,
    pub advertisements: Manager<Advertisement>,
    pub blog: Manager<BlogPost>,

    /// Sitemap base when the `site_url` setting is unset
    pub site_url: String,

    pub default_page_size: usize,
}

impl AppState {
    pub fn new(gateway: SharedGateway, config: &AppConfig) -> Self {
        let audit = AuditLog::new(gateway.clone());
        Self {
            settings: SettingsStore::new(gateway.clone()),
            storage: BucketStorage::new(&config.storage),
            auth: config.auth.clone(),
            profiles: Manager::new(gateway.clone(), audit.clone()),
            packages: Manager::new(gateway.clone(), audit.clone()),
            bookings: Manager::new(gateway.clone(), audit.clone()),
            payments: Manager::new(gateway.clone(), audit.clone()),
            centers: Manager::new(gateway.clone(), audit.clone()),
            center_media: Manager::new(gateway.clone(), audit.clone()),
            volunteer: Manager::new(gateway.clone(), audit.clone()),
            advertisements: Manager::new(gateway.clone(), audit.clone()),
            blog: Manager::new(gateway.clone(), audit.clone()),
            site_url: config.site_url.clone(),
            default_page_size: config.default_page_size,
            audit,
            gateway,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
