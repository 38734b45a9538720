//! Configuration parsing and validation for attendd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Service settings and auto-logout policy
//! - Office and home address definitions seeded into the store
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<Policy> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<Policy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), "Config validation failed");
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(Policy::from_raw(raw))
}

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const EXAMPLE: &str = r#"
        config_version = 1

        [service]
        store_busy_timeout_ms = 2000

        [auto_logout]
        enabled = true
        session_limit_seconds = 3600
        interval_seconds = 300

        [[offices]]
        id = "hq"
        name = "Headquarters"
        address = "1 Market St"
        latitude = 37.7749
        longitude = -122.4194
        radius_meters = 100.0

        [[home_addresses]]
        id = "alice-home"
        user_id = "alice"
        address_type = "primary"
        latitude = 37.80
        longitude = -122.41

        [[home_addresses]]
        id = "alice-cabin"
        user_id = "alice"
        address_type = "secondary"
    "#;

    #[test]
    fn parse_full_config() {
        let policy = parse_config(EXAMPLE).unwrap();
        assert_eq!(policy.offices.len(), 1);
        assert_eq!(policy.offices[0].id.as_str(), "hq");
        assert_eq!(policy.offices[0].radius_meters, 100.0);
        assert_eq!(policy.home_addresses.len(), 2);
        assert!(policy.home_addresses[1].center.is_none());
        assert_eq!(policy.auto_logout.session_limit, Duration::from_secs(3600));
        assert_eq!(policy.auto_logout.interval, Duration::from_secs(300));
        assert_eq!(policy.service.store_busy_timeout, Duration::from_secs(2));
    }

    #[test]
    fn parse_minimal_config() {
        let policy = parse_config("config_version = 1").unwrap();
        assert!(policy.offices.is_empty());
        assert_eq!(policy.auto_logout, AutoLogoutPolicy::default());
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_invalid_office() {
        let config = r#"
            config_version = 1

            [[offices]]
            id = "hq"
            name = "Headquarters"
            latitude = 37.7749
            longitude = -122.4194
            radius_meters = 0.0
        "#;

        let result = parse_config(config);
        assert!(matches!(result, Err(ConfigError::ValidationFailed { .. })));
    }

    #[test]
    fn reject_malformed_toml() {
        let result = parse_config("config_version = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXAMPLE.as_bytes()).unwrap();

        let policy = load_config(file.path()).unwrap();
        assert!(policy.offices.iter().any(|o| o.id.as_str() == "hq"));
    }

    #[test]
    fn shipped_example_is_valid() {
        let policy = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/../../config.example.toml"))
            .unwrap();
        assert_eq!(policy.offices.len(), 2);
        assert_eq!(policy.home_addresses.len(), 2);
        assert!(policy.home_addresses[1].center.is_none());
    }
}
