//! Authentication and authorization module
//!
//! Provides JWT-based authentication and the role-capability table that
//! gates every route.

mod capability;
mod jwt;
mod middleware;
mod password;

pub use capability::{access_for, Access};
pub use jwt::{create_tokens, decode_token, refresh_claims, Claims, TokenPair, TokenType};
pub use middleware::route_guard;
pub use password::{hash_password, verify_password};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access to every manager and setting
    Admin,
    /// Runs bookings, information centers and volunteer activities
    TourManager,
    /// Handles payments and revenue reporting
    Accountant,
    /// Books trips and sees their own bookings
    Client,
}

impl Role {
    /// Dashboard the role lands on after login
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin",
            Role::TourManager => "/tour-manager",
            Role::Accountant => "/accountant",
            Role::Client => "/dashboard",
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Role::Client)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Client
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::TourManager => write!(f, "tour_manager"),
            Role::Accountant => write!(f, "accountant"),
            Role::Client => write!(f, "client"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "tour_manager" => Ok(Role::TourManager),
            "accountant" => Ok(Role::Accountant),
            "client" => Ok(Role::Client),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}
