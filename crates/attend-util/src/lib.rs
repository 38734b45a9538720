//! Shared utilities for attendd
//!
//! This crate provides:
//! - ID types (UserId, OfficeId, HomeAddressId, RecordId, ClientId)
//! - Time utilities (injectable clocks, mock time, formatting)
//! - Rate limiting helpers
//! - Default paths for socket, data, and config files

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
