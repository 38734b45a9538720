//! Event types for attendd -> client streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, AttendanceRecord, CheckOutReason};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: attend_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A user opened an attendance session
    CheckedIn {
        record: AttendanceRecord,
        location_name: String,
    },

    /// A session was closed
    CheckedOut {
        record: AttendanceRecord,
        reason: CheckOutReason,
    },

    /// An auto-logout sweep finished
    SweepCompleted {
        cutoff: DateTime<Local>,
        closed_count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_event_serialization() {
        let event = Event::new(EventPayload::SweepCompleted {
            cutoff: attend_util::now(),
            closed_count: 3,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("sweep_completed"));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed.payload,
            EventPayload::SweepCompleted { closed_count: 3, .. }
        ));
    }
}
