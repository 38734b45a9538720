//! Configuration validation

use crate::schema::{RawConfig, RawHomeAddress, RawOffice};
use attend_api::{AddressType, Coordinate, MAX_HOME_ADDRESSES_PER_USER};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Office '{office_id}': {message}")]
    OfficeError { office_id: String, message: String },

    #[error("Home address '{home_address_id}': {message}")]
    HomeAddressError {
        home_address_id: String,
        message: String,
    },

    #[error("Duplicate office ID: {0}")]
    DuplicateOfficeId(String),

    #[error("Duplicate home address ID: {0}")]
    DuplicateHomeAddressId(String),

    #[error("User '{user_id}' has more than one {address_type} home address")]
    DuplicateAddressType {
        user_id: String,
        address_type: AddressType,
    },

    #[error("User '{user_id}' has {count} home addresses (max {max})")]
    TooManyHomeAddresses {
        user_id: String,
        count: usize,
        max: usize,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen_ids = HashSet::new();
    for office in &config.offices {
        if !seen_ids.insert(&office.id) {
            errors.push(ValidationError::DuplicateOfficeId(office.id.clone()));
        }
        errors.extend(validate_office(office));
    }

    let mut seen_ids = HashSet::new();
    for home in &config.home_addresses {
        if !seen_ids.insert(&home.id) {
            errors.push(ValidationError::DuplicateHomeAddressId(home.id.clone()));
        }
        errors.extend(validate_home_address(home));
    }

    errors.extend(validate_home_slots(&config.home_addresses));

    if config.auto_logout.session_limit_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "auto_logout.session_limit_seconds must be greater than 0".into(),
        ));
    }
    if config.auto_logout.interval_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "auto_logout.interval_seconds must be greater than 0".into(),
        ));
    }

    errors
}

fn validate_office(office: &RawOffice) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: &str| ValidationError::OfficeError {
        office_id: office.id.clone(),
        message: message.into(),
    };

    if office.id.is_empty() {
        errors.push(err("id cannot be empty"));
    }
    if office.name.trim().is_empty() {
        errors.push(err("name cannot be empty"));
    }
    if !office.radius_meters.is_finite() || office.radius_meters <= 0.0 {
        errors.push(err("radius_meters must be a positive number"));
    }
    if !Coordinate::new(office.latitude, office.longitude).is_in_range() {
        errors.push(err("latitude/longitude out of range"));
    }

    errors
}

fn validate_home_address(home: &RawHomeAddress) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: String| ValidationError::HomeAddressError {
        home_address_id: home.id.clone(),
        message,
    };

    if home.id.is_empty() {
        errors.push(err("id cannot be empty".into()));
    }
    if home.user_id.is_empty() {
        errors.push(err("user_id cannot be empty".into()));
    }
    if let Err(e) = home.address_type.parse::<AddressType>() {
        errors.push(err(e));
    }

    match (home.latitude, home.longitude) {
        (Some(lat), Some(lon)) => {
            if !Coordinate::new(lat, lon).is_in_range() {
                errors.push(err("latitude/longitude out of range".into()));
            }
        }
        (None, None) => {}
        _ => errors.push(err("latitude and longitude must be set together".into())),
    }

    errors
}

fn validate_home_slots(homes: &[RawHomeAddress]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut per_user: HashMap<&str, Vec<AddressType>> = HashMap::new();

    for home in homes {
        // Unparseable types are reported by validate_home_address
        if let Ok(address_type) = home.address_type.parse::<AddressType>() {
            per_user
                .entry(home.user_id.as_str())
                .or_default()
                .push(address_type);
        }
    }

    let mut users: Vec<_> = per_user.into_iter().collect();
    users.sort_by(|a, b| a.0.cmp(b.0));

    for (user_id, types) in users {
        if types.len() > MAX_HOME_ADDRESSES_PER_USER {
            errors.push(ValidationError::TooManyHomeAddresses {
                user_id: user_id.to_string(),
                count: types.len(),
                max: MAX_HOME_ADDRESSES_PER_USER,
            });
        }

        for address_type in [AddressType::Primary, AddressType::Secondary] {
            if types.iter().filter(|t| **t == address_type).count() > 1 {
                errors.push(ValidationError::DuplicateAddressType {
                    user_id: user_id.to_string(),
                    address_type,
                });
            }
        }
    }

    errors
}
