//! Settings store
//!
//! Process-wide cache of site configuration (branding, SEO text, contact
//! details, fees). Values are opaque strings; coercion belongs to callers.
//!
//! Writes are applied to the cache before the remote upsert resolves. Each
//! write stamps its cache entry with a generation so a failed write can put
//! back exactly what it replaced, and leaves alone anything a later write
//! already put there.

use crate::db::{to_row, Query, Row, SharedGateway};
use crate::error::{validation_error, AppError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use validator::Validate;

pub const SETTINGS_TABLE: &str = "settings";

/// Keys read by the service itself
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_URL: &str = "site_url";
    pub const BOOKING_FEE: &str = "booking_fee";
    pub const MAINTENANCE_MODE: &str = "maintenance_mode";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub data_type: SettingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_category() -> String {
    "general".to_string()
}

impl Setting {
    fn from_row(row: Row) -> Result<Self, AppError> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| AppError::Internal(format!("Malformed setting row: {}", e)))
    }
}

/// Admin write payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WriteSetting {
    #[validate(length(min = 1, max = 100, message = "Key must be 1-100 characters"))]
    pub key: String,
    pub value: Option<String>,
    pub category: Option<String>,
    pub data_type: Option<SettingType>,
}

/// Boolean settings are stored as the literal string `true`
pub fn is_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    setting: Setting,
    generation: u64,
}

pub struct SettingsStore {
    gateway: SharedGateway,
    cache: RwLock<HashMap<String, CacheEntry>>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
}

impl SettingsStore {
    pub fn new(gateway: SharedGateway) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            gateway,
            cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            revision,
        }
    }

    fn notify(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver of the cache revision; every cache change bumps it
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Cached value, or `default` when the key is absent or null
    pub async fn get(&self, key: &str, default: &str) -> String {
        self.value(key).await.unwrap_or_else(|| default.to_string())
    }

    /// Cached value, `None` when absent or null
    pub async fn value(&self, key: &str) -> Option<String> {
        self.cache
            .read()
            .await
            .get(key)
            .and_then(|e| e.setting.value.clone())
    }

    /// Every cached setting, sorted by key
    pub async fn all(&self) -> Vec<Setting> {
        let cache = self.cache.read().await;
        let mut settings: Vec<Setting> = cache.values().map(|e| e.setting.clone()).collect();
        settings.sort_by(|a, b| a.key.cmp(&b.key));
        settings
    }

    /// Non-null values keyed by setting key
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.cache
            .read()
            .await
            .iter()
            .filter_map(|(k, e)| e.setting.value.clone().map(|v| (k.clone(), v)))
            .collect()
    }

    /// Re-fetch the whole table and replace the cache
    pub async fn refresh(&self) -> Result<usize, AppError> {
        let rows = self.gateway.select(&Query::table(SETTINGS_TABLE)).await?;
        let mut fresh = HashMap::with_capacity(rows.len());
        for row in rows {
            match Setting::from_row(row) {
                Ok(setting) => {
                    fresh.insert(
                        setting.key.clone(),
                        CacheEntry {
                            setting,
                            generation: 0,
                        },
                    );
                }
                Err(e) => warn!("Skipping setting: {}", e),
            }
        }

        let count = fresh.len();
        *self.cache.write().await = fresh;
        self.notify();
        debug!("Settings cache refreshed ({} keys)", count);
        Ok(count)
    }

    /// Drop the cache and hydrate it again
    pub async fn invalidate(&self) -> Result<usize, AppError> {
        self.cache.write().await.clear();
        self.notify();
        self.refresh().await
    }

    /// Optimistically write a setting, then upsert it by key.
    ///
    /// On failure the cache entry is restored to what this write replaced,
    /// unless a later write has touched the key since.
    pub async fn write(&self, input: WriteSetting) -> Result<Setting, AppError> {
        input.validate().map_err(|e| validation_error(e.to_string()))?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (shadow, previous) = {
            let mut cache = self.cache.write().await;
            let previous = cache.get(&input.key).cloned();
            let base = previous.as_ref().map(|e| &e.setting);
            let shadow = Setting {
                key: input.key.clone(),
                value: input.value.clone(),
                category: input
                    .category
                    .clone()
                    .or_else(|| base.map(|s| s.category.clone()))
                    .unwrap_or_else(default_category),
                data_type: input
                    .data_type
                    .or_else(|| base.map(|s| s.data_type))
                    .unwrap_or_default(),
                version: base.and_then(|s| s.version),
                updated_at: base.and_then(|s| s.updated_at.clone()),
            };
            cache.insert(
                input.key.clone(),
                CacheEntry {
                    setting: shadow.clone(),
                    generation,
                },
            );
            (shadow, previous)
        };
        self.notify();

        let record = to_row(&Setting {
            version: None,
            updated_at: None,
            ..shadow
        })?;

        let outcome = match self.gateway.upsert(SETTINGS_TABLE, "key", record).await {
            Ok(row) => Setting::from_row(row),
            Err(e) => Err(e),
        };

        let mut cache = self.cache.write().await;
        let stamp = cache.get(&input.key).map(|e| e.generation);
        // A refresh restamps entries with generation 0; only a later write outranks us
        let superseded = stamp.is_some_and(|g| g > generation);
        let still_ours = stamp == Some(generation);

        match outcome {
            Ok(confirmed) => {
                if !superseded {
                    cache.insert(
                        input.key.clone(),
                        CacheEntry {
                            setting: confirmed.clone(),
                            generation,
                        },
                    );
                }
                drop(cache);
                self.notify();
                info!("Setting '{}' saved", input.key);
                Ok(confirmed)
            }
            Err(e) => {
                if still_ours {
                    match previous {
                        Some(entry) => {
                            cache.insert(input.key.clone(), entry);
                        }
                        None => {
                            cache.remove(&input.key);
                        }
                    }
                    drop(cache);
                    self.notify();
                    warn!("Setting '{}' write failed, cache rolled back: {}", input.key, e);
                } else {
                    warn!("Setting '{}' write failed after the cache moved on: {}", input.key, e);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DataGateway, Filter, MemoryGateway};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Memory gateway whose upserts can be made to fail
    struct FlakyGateway {
        inner: MemoryGateway,
        fail_upserts: AtomicBool,
        hold_upserts: AtomicBool,
        release: Notify,
    }

    #[async_trait]
    impl DataGateway for FlakyGateway {
        async fn select(&self, query: &Query) -> Result<Vec<Row>, AppError> {
            self.inner.select(query).await
        }

        async fn insert(&self, table: &str, record: Row) -> Result<Row, AppError> {
            self.inner.insert(table, record).await
        }

        async fn update(
            &self,
            table: &str,
            filters: &[Filter],
            patch: Row,
            expected_version: Option<i64>,
        ) -> Result<Vec<Row>, AppError> {
            self.inner.update(table, filters, patch, expected_version).await
        }

        async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64, AppError> {
            self.inner.delete(table, filters).await
        }

        async fn upsert(&self, table: &str, key_field: &str, record: Row) -> Result<Row, AppError> {
            if self.hold_upserts.load(Ordering::SeqCst) {
                self.release.notified().await;
            }
            if self.fail_upserts.load(Ordering::SeqCst) {
                return Err(AppError::Internal("remote unavailable".to_string()));
            }
            self.inner.upsert(table, key_field, record).await
        }

        fn backend(&self) -> &'static str {
            "flaky"
        }
    }

    fn flaky() -> Arc<FlakyGateway> {
        Arc::new(FlakyGateway {
            inner: MemoryGateway::new(),
            fail_upserts: AtomicBool::new(false),
            hold_upserts: AtomicBool::new(false),
            release: Notify::new(),
        })
    }

    fn write(key: &str, value: Option<&str>) -> WriteSetting {
        WriteSetting {
            key: key.to_string(),
            value: value.map(str::to_string),
            category: None,
            data_type: None,
        }
    }

    #[tokio::test]
    async fn test_get_default_only_when_absent_or_null() {
        let store = SettingsStore::new(Arc::new(MemoryGateway::new()));
        assert_eq!(store.get("site_name", "Wanderlust").await, "Wanderlust");

        store.write(write("site_name", Some(""))).await.unwrap();
        assert_eq!(store.get("site_name", "Wanderlust").await, "");

        store.write(write("site_name", None)).await.unwrap();
        assert_eq!(store.get("site_name", "Wanderlust").await, "Wanderlust");
    }

    #[tokio::test]
    async fn test_write_upserts_by_key() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = SettingsStore::new(gateway.clone());

        let first = store.write(write("booking_fee", Some("25"))).await.unwrap();
        let second = store.write(write("booking_fee", Some("30"))).await.unwrap();
        assert_eq!(first.version, Some(1));
        assert_eq!(second.version, Some(2));

        let rows = gateway.select(&Query::table(SETTINGS_TABLE)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["value"], Value::from("30"));
    }

    #[tokio::test]
    async fn test_refresh_replaces_cache_and_notifies() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = SettingsStore::new(gateway.clone());
        let mut revisions = store.subscribe();

        gateway
            .upsert(
                SETTINGS_TABLE,
                "key",
                to_row(&serde_json::json!({ "key": "maintenance_mode", "value": "true" })).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(store.value(keys::MAINTENANCE_MODE).await, None);

        assert_eq!(store.refresh().await.unwrap(), 1);
        assert!(revisions.has_changed().unwrap());
        assert!(is_enabled(store.value(keys::MAINTENANCE_MODE).await.as_deref()));
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.get("maintenance_mode").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let gateway = flaky();
        let store = SettingsStore::new(gateway.clone());
        store.write(write("site_name", Some("Wanderlust"))).await.unwrap();

        gateway.fail_upserts.store(true, Ordering::SeqCst);
        assert!(store.write(write("site_name", Some("Broken"))).await.is_err());
        assert_eq!(store.get("site_name", "-").await, "Wanderlust");

        assert!(store.write(write("new_key", Some("x"))).await.is_err());
        assert_eq!(store.get("new_key", "-").await, "-");
        assert!(store.all().await.iter().all(|s| s.key != "new_key"));
    }

    #[tokio::test]
    async fn test_refresh_during_write_keeps_confirmed_value() {
        let gateway = flaky();
        let store = Arc::new(SettingsStore::new(gateway.clone()));
        store.write(write("site_name", Some("Wanderlust"))).await.unwrap();

        gateway.hold_upserts.store(true, Ordering::SeqCst);
        let pending = tokio::spawn({
            let store = store.clone();
            async move { store.write(write("site_name", Some("Wanderlust Tours"))).await }
        });
        while store.value("site_name").await.as_deref() != Some("Wanderlust Tours") {
            tokio::task::yield_now().await;
        }

        // Remote still holds the old value while the upsert is in flight
        store.refresh().await.unwrap();
        assert_eq!(store.get("site_name", "-").await, "Wanderlust");

        gateway.release.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(store.get("site_name", "-").await, "Wanderlust Tours");

        gateway.hold_upserts.store(false, Ordering::SeqCst);
        let later = store.write(write("site_name", Some("Wanderlust Travel"))).await.unwrap();
        assert_eq!(later.value.as_deref(), Some("Wanderlust Travel"));
        assert_eq!(store.get("site_name", "-").await, "Wanderlust Travel");
    }

    #[tokio::test]
    async fn test_empty_key_rejected_before_cache() {
        let store = SettingsStore::new(Arc::new(MemoryGateway::new()));
        assert!(matches!(store.write(write("", Some("x"))).await, Err(AppError::Validation(_))));
        assert!(store.all().await.is_empty());
    }

    #[test]
    fn test_is_enabled() {
        assert!(is_enabled(Some("true")));
        assert!(!is_enabled(Some("True")));
        assert!(!is_enabled(Some("1")));
        assert!(!is_enabled(None));
    }
}
