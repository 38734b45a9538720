//! Audit event types

use attend_api::{CheckOutReason, LocationRef, LocationType};
use attend_util::{RecordId, UserId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Config loaded and seeded into the store
    PolicyLoaded {
        office_count: usize,
        home_address_count: usize,
    },

    CheckedIn {
        record_id: RecordId,
        user_id: UserId,
        location: LocationRef,
    },

    /// Check-in refused
    CheckInDenied {
        user_id: UserId,
        location_type: LocationType,
        reason: String,
    },

    CheckedOut {
        record_id: RecordId,
        user_id: UserId,
        reason: CheckOutReason,
        duration: Duration,
    },

    /// Auto-logout sweep finished
    SweepCompleted {
        cutoff: DateTime<Local>,
        closed_count: usize,
        failed_count: usize,
    },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(event, attend_util::now())
    }

    /// Event stamped with an explicit time, for callers holding a clock
    pub fn at(event: AuditEventType, timestamp: DateTime<Local>) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
