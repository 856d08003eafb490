//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    /// Hosted providers require TLS
    pub require_tls: bool,
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "wanderlust-dev-secret-change-in-production".to_string(),
            access_token_minutes: 15,
            refresh_token_days: 7,
        }
    }
}

/// File storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub public_base_url: String,
    pub buckets: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
            public_base_url: "http://localhost:3000/storage".to_string(),
            buckets: vec![
                "package-images".to_string(),
                "center-media".to_string(),
                "blog-images".to_string(),
                "advertisements".to_string(),
            ],
        }
    }
}

/// Optional bootstrap admin account
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// `None` runs the service on the in-memory gateway
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub site_url: String,
    pub default_page_size: usize,
    pub admin_seed: Option<AdminSeed>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: None,
            cors: CorsConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            site_url: "http://localhost:5173".to_string(),
            default_page_size: 10,
            admin_seed: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let server = ServerConfig {
            host: env_parse("HOST").unwrap_or_else(|| ServerConfig::default().host),
            port: env_parse("PORT").unwrap_or_else(|| ServerConfig::default().port),
        };

        let database = match std::env::var("DATABASE_URL") {
            Ok(database_url) => Some(Self::parse_database_url(&database_url)?),
            Err(_) => None,
        };

        let cors = CorsConfig {
            allowed_origins: env_list("ALLOWED_ORIGINS")
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(auth_defaults.jwt_secret),
            access_token_minutes: env_parse("ACCESS_TOKEN_MINUTES")
                .unwrap_or(auth_defaults.access_token_minutes),
            refresh_token_days: env_parse("REFRESH_TOKEN_DAYS")
                .unwrap_or(auth_defaults.refresh_token_days),
        };
        if auth.access_token_minutes <= 0 || auth.refresh_token_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "Token lifetimes must be positive".to_string(),
            ));
        }

        let storage_defaults = StorageConfig::default();
        let storage = StorageConfig {
            root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(storage_defaults.root),
            public_base_url: std::env::var("STORAGE_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(storage_defaults.public_base_url),
            buckets: env_list("STORAGE_BUCKETS").unwrap_or(storage_defaults.buckets),
        };

        let default_page_size = env_parse("DEFAULT_PAGE_SIZE").unwrap_or(10);
        if default_page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_PAGE_SIZE must be at least 1".to_string(),
            ));
        }

        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed { email, password }),
            (Ok(_), Err(_)) => return Err(ConfigError::MissingVar("ADMIN_PASSWORD".to_string())),
            _ => None,
        };

        Ok(Self {
            server,
            database,
            cors,
            auth,
            storage,
            site_url: std::env::var("SITE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            default_page_size,
            admin_seed,
        })
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(url: &str) -> Result<DatabaseConfig, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue(
                "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
            )
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()))?
            .to_string();

        let database = parsed.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(ConfigError::InvalidValue(
                "Missing database name in DATABASE_URL".to_string(),
            ));
        }

        let require_tls = parsed
            .query_pairs()
            .any(|(k, v)| k == "sslmode" && v == "require")
            || host.ends_with(".supabase.co")
            || host.contains("neon.tech");

        Ok(DatabaseConfig {
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().map(|p| p.to_string()).unwrap_or_default(),
            host,
            database,
            max_pool_size: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            require_tls,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|s| {
        s.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
