//! Validated policy structures

use crate::schema::{RawAutoLogout, RawConfig, RawHomeAddress, RawOffice, RawServiceConfig};
use attend_api::{AddressType, Coordinate, HomeAddress, Office};
use attend_util::{HomeAddressId, OfficeId, UserId, system_data_dir, system_socket_path};
use std::path::PathBuf;
use std::time::Duration;

/// Default session limit before auto-logout (2 hours)
pub const DEFAULT_SESSION_LIMIT: Duration = Duration::from_secs(2 * 60 * 60);

/// Default time between auto-logout sweeps (10 minutes)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default SQLite busy timeout
pub const DEFAULT_STORE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Service configuration
    pub service: ServiceConfig,

    /// Auto-logout policy
    pub auto_logout: AutoLogoutPolicy,

    /// Offices to seed into the store
    pub offices: Vec<Office>,

    /// Home addresses to seed into the store
    pub home_addresses: Vec<HomeAddress>,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            auto_logout: AutoLogoutPolicy::from_raw(raw.auto_logout),
            offices: raw.offices.into_iter().map(convert_office).collect(),
            home_addresses: raw
                .home_addresses
                .into_iter()
                .map(convert_home_address)
                .collect(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub store_busy_timeout: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(system_socket_path),
            data_dir: raw.data_dir.unwrap_or_else(system_data_dir),
            store_busy_timeout: raw
                .store_busy_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_STORE_BUSY_TIMEOUT),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: system_socket_path(),
            data_dir: system_data_dir(),
            store_busy_timeout: DEFAULT_STORE_BUSY_TIMEOUT,
        }
    }
}

/// When and how stale sessions are closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoLogoutPolicy {
    /// Run the scheduled sweep. Manual sweeps work either way.
    pub enabled: bool,
    pub session_limit: Duration,
    pub interval: Duration,
}

impl AutoLogoutPolicy {
    fn from_raw(raw: RawAutoLogout) -> Self {
        Self {
            enabled: raw.enabled.unwrap_or(true),
            session_limit: raw
                .session_limit_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_LIMIT),
            interval: raw
                .interval_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

impl Default for AutoLogoutPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            session_limit: DEFAULT_SESSION_LIMIT,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

// Conversion helpers

fn convert_office(raw: RawOffice) -> Office {
    Office {
        id: OfficeId::new(raw.id),
        name: raw.name,
        address: raw.address,
        center: Coordinate::new(raw.latitude, raw.longitude),
        radius_meters: raw.radius_meters,
    }
}

fn convert_home_address(raw: RawHomeAddress) -> HomeAddress {
    let center = match (raw.latitude, raw.longitude) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    };

    HomeAddress {
        id: HomeAddressId::new(raw.id),
        user_id: UserId::new(raw.user_id),
        address_type: raw.address_type.parse().unwrap_or(AddressType::Primary),
        center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_logout_defaults() {
        let policy = AutoLogoutPolicy::from_raw(RawAutoLogout::default());
        assert!(policy.enabled);
        assert_eq!(policy.session_limit, Duration::from_secs(7200));
        assert_eq!(policy.interval, Duration::from_secs(600));
    }

    #[test]
    fn home_address_coordinates_convert() {
        let raw = RawHomeAddress {
            id: "h1".into(),
            user_id: "alice".into(),
            address_type: "Secondary".into(),
            latitude: Some(37.8),
            longitude: Some(-122.41),
        };
        let home = convert_home_address(raw);
        assert_eq!(home.address_type, AddressType::Secondary);
        assert_eq!(home.center, Some(Coordinate::new(37.8, -122.41)));
    }

    #[test]
    fn service_busy_timeout_in_millis() {
        let service = ServiceConfig::from_raw(RawServiceConfig {
            store_busy_timeout_ms: Some(250),
            ..Default::default()
        });
        assert_eq!(service.store_busy_timeout, Duration::from_millis(250));
    }
}
