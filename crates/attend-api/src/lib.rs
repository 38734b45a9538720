//! Protocol types for attendd IPC
//!
//! This crate defines the stable API between attendd and its clients:
//! - Domain values (coordinates, offices, home addresses, attendance records)
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
