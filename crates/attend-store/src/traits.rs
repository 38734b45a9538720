//! Store trait definitions

use attend_api::{AttendanceRecord, Coordinate, HomeAddress, Office};
use attend_util::{HomeAddressId, OfficeId, RecordId, UserId};
use chrono::{DateTime, Local};

use crate::{AuditEvent, StoreResult};

/// Main store trait
///
/// Every method is atomic on its own. Implementations must guarantee that a
/// user never has more than one open attendance record, and report a
/// violating insert as [`StoreError::Conflict`](crate::StoreError::Conflict).
pub trait Store: Send + Sync {
    // Offices

    /// Insert or replace an office
    fn upsert_office(&self, office: &Office) -> StoreResult<()>;

    fn get_office(&self, id: &OfficeId) -> StoreResult<Option<Office>>;

    /// All offices, ordered by id
    fn list_offices(&self) -> StoreResult<Vec<Office>>;

    // Home addresses

    /// Insert or replace a home address
    fn upsert_home_address(&self, home: &HomeAddress) -> StoreResult<()>;

    fn get_home_address(&self, id: &HomeAddressId) -> StoreResult<Option<HomeAddress>>;

    /// Home addresses registered for a user
    fn list_home_addresses(&self, user_id: &UserId) -> StoreResult<Vec<HomeAddress>>;

    // Attendance records

    /// Insert a new record. Fails with `Conflict` if the record is open and
    /// the user already has an open record.
    fn insert_record(&self, record: &AttendanceRecord) -> StoreResult<()>;

    /// The user's open record, if any
    fn get_open_record(&self, user_id: &UserId) -> StoreResult<Option<AttendanceRecord>>;

    /// Close the user's open record. Returns `None` when there was nothing to
    /// close, including when a concurrent writer closed it first.
    fn close_open_record(
        &self,
        user_id: &UserId,
        at: DateTime<Local>,
        coordinate: Coordinate,
    ) -> StoreResult<Option<AttendanceRecord>>;

    /// Close every open record checked in strictly before `cutoff`, using
    /// `at` as check-out time and the check-in coordinate as check-out
    /// coordinate. All closures commit together.
    fn close_expired(
        &self,
        cutoff: DateTime<Local>,
        at: DateTime<Local>,
    ) -> StoreResult<ExpiredClosure>;

    /// A user's records, newest check-in first
    fn list_records(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<AttendanceRecord>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Outcome of [`Store::close_expired`]
#[derive(Debug, Clone, Default)]
pub struct ExpiredClosure {
    /// Records closed, in check-in order
    pub closed: Vec<AttendanceRecord>,
    /// Records that could not be updated and were skipped
    pub failed: Vec<RecordId>,
}
