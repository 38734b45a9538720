//! Core events emitted by the engine

use attend_api::{AttendanceRecord, CheckOutReason};
use attend_util::RecordId;
use chrono::{DateTime, Local};

/// Events emitted by the attendance engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A user opened an attendance session
    CheckedIn {
        record: AttendanceRecord,
        location_name: String,
    },

    /// A session was closed, by the user or by auto-logout
    CheckedOut {
        record: AttendanceRecord,
        reason: CheckOutReason,
    },

    /// An auto-logout sweep finished
    SweepCompleted {
        cutoff: DateTime<Local>,
        closed: Vec<RecordId>,
        failed: Vec<RecordId>,
    },
}
