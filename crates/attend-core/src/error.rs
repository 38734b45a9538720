//! Attendance error taxonomy

use attend_api::{ErrorCode, LocationType};
use attend_store::StoreError;
use attend_util::{HomeAddressId, RecordId};
use std::fmt;
use thiserror::Error;

/// What a `NotFound` error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Office,
    HomeAddress,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotFoundKind::Office => "Office",
            NotFoundKind::HomeAddress => "Home address",
        })
    }
}

/// Errors reported by attendance transitions and queries. None of them are
/// retried by the engine.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Already checked in (record {record_id})")]
    AlreadyCheckedIn { record_id: RecordId },

    #[error("No active attendance session")]
    NoActiveSession,

    #[error("{kind} not found: {id}")]
    NotFound { kind: NotFoundKind, id: String },

    #[error("Location type '{location_type}' requires a target id")]
    MissingTarget { location_type: LocationType },

    #[error("Outside geofence: {distance_meters:.2}m away (limit {radius_meters}m)")]
    OutsideGeofence {
        distance_meters: f64,
        radius_meters: f64,
    },

    #[error("Home address {home_address_id} has no coordinates")]
    MissingLocationData { home_address_id: HomeAddressId },

    #[error("Concurrent write rejected: {0}")]
    StoreConflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AttendanceError::StoreConflict(msg),
            other => AttendanceError::Store(other),
        }
    }
}

impl AttendanceError {
    pub(crate) fn not_found(kind: NotFoundKind, id: impl fmt::Display) -> Self {
        AttendanceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// The request was refused on its merits, as opposed to failing because
    /// the store did
    pub fn is_refusal(&self) -> bool {
        !matches!(self, AttendanceError::Store(_))
    }

    /// Protocol error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AttendanceError::AlreadyCheckedIn { .. } => ErrorCode::AlreadyCheckedIn,
            AttendanceError::NoActiveSession => ErrorCode::NoActiveSession,
            AttendanceError::NotFound { .. } => ErrorCode::NotFound,
            AttendanceError::MissingTarget { .. } => ErrorCode::MissingTarget,
            AttendanceError::OutsideGeofence { .. } => ErrorCode::OutsideGeofence,
            AttendanceError::MissingLocationData { .. } => ErrorCode::MissingLocationData,
            AttendanceError::StoreConflict(_) => ErrorCode::StoreConflict,
            AttendanceError::Store(StoreError::Busy(_)) => ErrorCode::StoreUnavailable,
            AttendanceError::Store(_) => ErrorCode::InternalError,
        }
    }
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;
