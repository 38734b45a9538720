//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Auto-logout policy
    #[serde(default)]
    pub auto_logout: RawAutoLogout,

    /// Offices seeded into the store at startup
    #[serde(default)]
    pub offices: Vec<RawOffice>,

    /// Home addresses seeded into the store at startup
    #[serde(default)]
    pub home_addresses: Vec<RawHomeAddress>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// How long a store call waits on a locked database
    pub store_busy_timeout_ms: Option<u64>,
}

/// Auto-logout settings. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAutoLogout {
    pub enabled: Option<bool>,

    /// Sessions older than this are closed by a sweep
    pub session_limit_seconds: Option<u64>,

    /// Time between scheduled sweeps
    pub interval_seconds: Option<u64>,
}

/// Raw office definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawOffice {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

/// Raw home address definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawHomeAddress {
    pub id: String,
    pub user_id: String,

    /// "primary" or "secondary"
    pub address_type: String,

    /// Set together with `longitude`, or not at all
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
