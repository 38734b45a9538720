//! Command types for the attendd protocol

use attend_util::{ClientId, OfficeId, UserId};
use serde::{Deserialize, Serialize};

use crate::{
    API_VERSION, AttendanceView, ClientRole, Coordinate, GeofenceCheckResult, HealthStatus,
    LocationType, SweepSummary,
};

/// Default page size for attendance history
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    AlreadyCheckedIn,
    NoActiveSession,
    NotFound,
    MissingTarget,
    OutsideGeofence,
    MissingLocationData,
    StoreConflict,
    StoreUnavailable,
    PermissionDenied,
    RateLimited,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Open an attendance session for an authenticated user
    CheckIn {
        user_id: UserId,
        location_type: LocationType,
        coordinate: Coordinate,
        /// Office id or home address id, depending on `location_type`
        #[serde(default)]
        target_id: Option<String>,
    },

    /// Close the user's open session
    CheckOut {
        user_id: UserId,
        coordinate: Coordinate,
    },

    /// Run an auto-logout sweep for everyone, then check the user out
    CheckOutWithSweep {
        user_id: UserId,
        coordinate: Coordinate,
    },

    /// Get the user's open session
    GetStatus { user_id: UserId },

    /// Attendance history, newest first
    GetHistory {
        user_id: UserId,
        /// Another user's history (admin only)
        #[serde(default)]
        for_user: Option<UserId>,
        #[serde(default)]
        offset: usize,
        #[serde(default = "default_history_limit")]
        limit: usize,
    },

    /// Evaluate a coordinate against one office, or all offices by distance
    CheckLocation {
        coordinate: Coordinate,
        #[serde(default)]
        office_id: Option<OfficeId>,
    },

    /// Find the closest office to a coordinate
    NearestOffice { coordinate: Coordinate },

    /// Trigger an auto-logout sweep now (admin only)
    RunSweep,

    /// Get health status
    GetHealth,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    CheckedIn(AttendanceView),
    CheckedOut(AttendanceView),
    Status(AttendanceView),
    History { records: Vec<AttendanceView> },
    Geofence { results: Vec<GeofenceCheckResult> },
    NearestOffice { result: Option<GeofenceCheckResult> },
    Swept(SweepSummary),
    Health(HealthStatus),
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
    /// Login name of the peer, the only user a `Client` may act as
    pub user_id: Option<UserId>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
            user_id: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Whether this connection may issue commands on behalf of `user_id`
    pub fn may_act_as(&self, user_id: &UserId) -> bool {
        self.role.can_act_for_others() || self.user_id.as_ref() == Some(user_id)
    }
}
