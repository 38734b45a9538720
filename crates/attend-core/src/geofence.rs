//! Geofence evaluation against offices and home addresses

use attend_api::{Coordinate, GeofenceCheckResult, GeofenceTargetRef, HomeAddress, Office};
use tracing::debug;

use crate::{AttendanceError, AttendanceResult, haversine_distance};

/// Evaluate a coordinate against an office geofence
pub fn evaluate_office(coordinate: Coordinate, office: &Office) -> GeofenceCheckResult {
    let distance_meters = haversine_distance(coordinate, office.center);
    let within = distance_meters <= office.radius_meters;

    debug!(
        office_id = %office.id,
        distance_meters,
        radius_meters = office.radius_meters,
        within,
        "Evaluated office geofence"
    );

    GeofenceCheckResult {
        target: GeofenceTargetRef::Office {
            office_id: office.id.clone(),
            name: office.name.clone(),
        },
        within,
        distance_meters,
        radius_meters: office.radius_meters,
    }
}

/// Evaluate a coordinate against a home address geofence.
///
/// Fails with `MissingLocationData` when the address has no coordinates,
/// rather than guessing either way.
pub fn evaluate_home(
    coordinate: Coordinate,
    home: &HomeAddress,
) -> AttendanceResult<GeofenceCheckResult> {
    let center = home
        .center
        .ok_or_else(|| AttendanceError::MissingLocationData {
            home_address_id: home.id.clone(),
        })?;

    let radius_meters = home.radius_meters();
    let distance_meters = haversine_distance(coordinate, center);
    let within = distance_meters <= radius_meters;

    debug!(
        home_address_id = %home.id,
        distance_meters,
        within,
        "Evaluated home geofence"
    );

    Ok(GeofenceCheckResult {
        target: GeofenceTargetRef::Home {
            home_address_id: home.id.clone(),
            address_type: home.address_type,
        },
        within,
        distance_meters,
        radius_meters,
    })
}

/// Evaluate a coordinate against every office, closest first
pub fn evaluate_all(coordinate: Coordinate, offices: &[Office]) -> Vec<GeofenceCheckResult> {
    let mut results: Vec<_> = offices
        .iter()
        .map(|office| evaluate_office(coordinate, office))
        .collect();
    results.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
    results
}

/// Closest office to a coordinate, whether or not it is inside its geofence
pub fn nearest(coordinate: Coordinate, offices: &[Office]) -> Option<GeofenceCheckResult> {
    evaluate_all(coordinate, offices).into_iter().next()
}
