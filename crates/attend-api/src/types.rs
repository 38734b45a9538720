//! Shared types for the attendd API

use attend_util::{HomeAddressId, OfficeId, RecordId, UserId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Geofence radius applied to every home address, in meters
pub const HOME_GEOFENCE_RADIUS_METERS: f64 = 500.0;

/// Maximum number of registered home addresses per user
pub const MAX_HOME_ADDRESSES_PER_USER: usize = 2;

/// WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Office geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    /// Postal address, display only
    pub address: Option<String>,
    pub center: Coordinate,
    pub radius_meters: f64,
}

/// Slot a home address occupies for its user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Primary,
    Secondary,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Primary => "primary",
            AddressType::Secondary => "secondary",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(AddressType::Primary),
            "secondary" => Ok(AddressType::Secondary),
            other => Err(format!("Unknown address type: {}", other)),
        }
    }
}

/// Home address registered for a user. The geofence radius is fixed at
/// [`HOME_GEOFENCE_RADIUS_METERS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeAddress {
    pub id: HomeAddressId,
    pub user_id: UserId,
    pub address_type: AddressType,
    /// Unset when the address was never geocoded
    pub center: Option<Coordinate>,
}

impl HomeAddress {
    pub fn radius_meters(&self) -> f64 {
        HOME_GEOFENCE_RADIUS_METERS
    }
}

/// Kind of location a check-in is made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Office,
    Home,
    Other,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::Office => "office",
            LocationType::Home => "home",
            LocationType::Other => "other",
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "office" => Ok(LocationType::Office),
            "home" => Ok(LocationType::Home),
            "other" => Ok(LocationType::Other),
            other => Err(format!("Unknown location type: {}", other)),
        }
    }
}

/// Where an attendance record was checked in. Exactly one variant is set
/// at check-in and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationRef {
    Office { office_id: OfficeId },
    Home { home_address_id: HomeAddressId },
    Other,
}

impl LocationRef {
    pub fn location_type(&self) -> LocationType {
        match self {
            LocationRef::Office { .. } => LocationType::Office,
            LocationRef::Home { .. } => LocationType::Home,
            LocationRef::Other => LocationType::Other,
        }
    }
}

/// Check-out half of an attendance record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckOut {
    pub time: DateTime<Local>,
    pub coordinate: Coordinate,
}

/// One check-in/check-out cycle for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub location: LocationRef,
    pub check_in_time: DateTime<Local>,
    pub check_in_coordinate: Coordinate,
    /// `None` while the session is open
    pub check_out: Option<CheckOut>,
}

impl AttendanceRecord {
    /// Start a new open record
    pub fn open(
        user_id: UserId,
        location: LocationRef,
        check_in_time: DateTime<Local>,
        check_in_coordinate: Coordinate,
    ) -> Self {
        Self {
            id: RecordId::new(),
            user_id,
            location,
            check_in_time,
            check_in_coordinate,
            check_out: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }

    pub fn check_out_time(&self) -> Option<DateTime<Local>> {
        self.check_out.map(|c| c.time)
    }

    pub fn check_out_coordinate(&self) -> Option<Coordinate> {
        self.check_out.map(|c| c.coordinate)
    }

    /// Time between check-in and check-out, or until `now` while open
    pub fn duration(&self, now: DateTime<Local>) -> Duration {
        let end = self.check_out_time().unwrap_or(now);
        end.signed_duration_since(self.check_in_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Attendance record with its location resolved to a display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceView {
    pub record: AttendanceRecord,
    pub location_name: String,
}

/// Identity of the geofence a coordinate was evaluated against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeofenceTargetRef {
    Office {
        office_id: OfficeId,
        name: String,
    },
    Home {
        home_address_id: HomeAddressId,
        address_type: AddressType,
    },
}

/// Outcome of evaluating a coordinate against one geofence. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceCheckResult {
    pub target: GeofenceTargetRef,
    pub within: bool,
    pub distance_meters: f64,
    pub radius_meters: f64,
}

/// Why an attendance session was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutReason {
    /// The user checked out
    Explicit,
    /// The session exceeded the configured limit and was closed by a sweep
    AutoLogout,
}

/// Records closed by one auto-logout sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub cutoff: DateTime<Local>,
    pub closed: Vec<AttendanceRecord>,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// A local user acting for themselves
    Client,
    /// Local operator (same UID as the daemon, or root)
    Admin,
}

impl ClientRole {
    pub fn can_run_sweep(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }

    /// Check in, check out or read history for a user other than the
    /// connection's own
    pub fn can_act_for_others(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub auto_logout_enabled: bool,
    pub office_count: usize,
    /// The service clock is shifted by `ATTEND_MOCK_TIME`
    #[serde(default)]
    pub mock_time: bool,
}
