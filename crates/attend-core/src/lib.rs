//! Attendance state machine and auto-logout for attendd
//!
//! This crate is the heart of attendd, containing:
//! - Haversine distance and geofence evaluation
//! - Per-user attendance state machine (Idle <-> CheckedIn)
//! - Auto-logout sweeper and its recurring scheduler
//! - The error taxonomy reported to the request layer

mod distance;
mod engine;
mod error;
mod events;
pub mod geofence;
mod scheduler;
mod sweeper;

pub use distance::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use scheduler::*;
pub use sweeper::*;
