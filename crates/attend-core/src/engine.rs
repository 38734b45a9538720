//! Attendance state machine

use attend_api::{
    AttendanceRecord, AttendanceView, CheckOutReason, Coordinate, GeofenceCheckResult,
    LocationRef, LocationType,
};
use attend_config::{AutoLogoutPolicy, Policy};
use attend_store::{AuditEvent, AuditEventType, Store};
use attend_util::{Clock, HomeAddressId, OfficeId, UserId};
use chrono::{DateTime, Local, SubsecRound};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    AttendanceError, AttendanceResult, AutoLogoutSweeper, CoreEvent, NotFoundKind, SweepReport,
    geofence,
};

/// Capacity of the core event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Display name when a referenced office or home address no longer exists
pub const UNKNOWN_LOCATION_NAME: &str = "Unknown";

/// Display name for self-reported locations
pub const OTHER_LOCATION_NAME: &str = "Other location";

/// Check-in parameters supplied by the request layer
#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub location_type: LocationType,
    pub coordinate: Coordinate,
    /// Office id or home address id, depending on `location_type`
    pub target_id: Option<String>,
}

impl CheckInRequest {
    pub fn office(office_id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            location_type: LocationType::Office,
            coordinate,
            target_id: Some(office_id.into()),
        }
    }

    pub fn home(home_address_id: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            location_type: LocationType::Home,
            coordinate,
            target_id: Some(home_address_id.into()),
        }
    }

    pub fn other(coordinate: Coordinate) -> Self {
        Self {
            location_type: LocationType::Other,
            coordinate,
            target_id: None,
        }
    }

    fn target(&self) -> AttendanceResult<&str> {
        self.target_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(AttendanceError::MissingTarget {
                location_type: self.location_type,
            })
    }
}

/// Per-user Idle/CheckedIn state machine over the store.
///
/// The engine holds no per-user state of its own; the open record in the
/// store is the state. It is `Send + Sync` and meant to be shared behind an
/// `Arc` by request handlers and the auto-logout scheduler.
pub struct AttendanceEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    auto_logout: AutoLogoutPolicy,
    sweeper: Arc<AutoLogoutSweeper>,
    events: broadcast::Sender<CoreEvent>,
}

impl AttendanceEngine {
    pub fn new(policy: &Policy, store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let sweeper = Arc::new(AutoLogoutSweeper::new(
            store.clone(),
            clock.clone(),
            policy.auto_logout.session_limit,
            events.clone(),
        ));

        info!(
            session_limit_secs = policy.auto_logout.session_limit.as_secs(),
            "Attendance engine initialized"
        );

        Self {
            store,
            clock,
            auto_logout: policy.auto_logout,
            sweeper,
            events,
        }
    }

    /// Write the policy's offices and home addresses into the store
    pub fn load_policy(&self, policy: &Policy) -> AttendanceResult<()> {
        for office in &policy.offices {
            self.store.upsert_office(office)?;
        }
        for home in &policy.home_addresses {
            self.store.upsert_home_address(home)?;
        }

        info!(
            offices = policy.offices.len(),
            home_addresses = policy.home_addresses.len(),
            "Policy loaded into store"
        );
        self.audit(AuditEventType::PolicyLoaded {
            office_count: policy.offices.len(),
            home_address_count: policy.home_addresses.len(),
        });
        Ok(())
    }

    /// Subscribe to core events
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn auto_logout_policy(&self) -> AutoLogoutPolicy {
        self.auto_logout
    }

    /// Sweeper sharing this engine's store, clock and event channel
    pub fn sweeper(&self) -> Arc<AutoLogoutSweeper> {
        self.sweeper.clone()
    }

    /// Millisecond precision matches what the store keeps
    fn now(&self) -> DateTime<Local> {
        self.clock.now().trunc_subsecs(3)
    }

    /// Idle -> CheckedIn
    pub fn check_in(
        &self,
        user_id: &UserId,
        request: CheckInRequest,
    ) -> AttendanceResult<AttendanceRecord> {
        // A concurrent check-in that passed the open-record check in
        // `admit` loses at insert with StoreConflict.
        let result = self.admit(user_id, &request).and_then(|location| {
            let record =
                AttendanceRecord::open(user_id.clone(), location, self.now(), request.coordinate);
            self.store.insert_record(&record)?;
            Ok(record)
        });

        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_refusal() => {
                warn!(
                    user_id = %user_id,
                    location_type = %request.location_type,
                    error = %e,
                    "Check-in denied"
                );
                self.audit(AuditEventType::CheckInDenied {
                    user_id: user_id.clone(),
                    location_type: request.location_type,
                    reason: e.to_string(),
                });
                return Err(e);
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Check-in failed");
                return Err(e);
            }
        };

        let location_name = self.location_name(&record.location);
        info!(
            record_id = %record.id,
            user_id = %user_id,
            location = %location_name,
            "Checked in"
        );

        self.audit(AuditEventType::CheckedIn {
            record_id: record.id,
            user_id: user_id.clone(),
            location: record.location.clone(),
        });
        let _ = self.events.send(CoreEvent::CheckedIn {
            record: record.clone(),
            location_name,
        });

        Ok(record)
    }

    /// Check preconditions and resolve the location reference for a check-in
    fn admit(&self, user_id: &UserId, request: &CheckInRequest) -> AttendanceResult<LocationRef> {
        if let Some(open) = self.store.get_open_record(user_id)? {
            return Err(AttendanceError::AlreadyCheckedIn { record_id: open.id });
        }

        match request.location_type {
            LocationType::Office => {
                let office_id = OfficeId::new(request.target()?);
                let office = self
                    .store
                    .get_office(&office_id)?
                    .ok_or_else(|| AttendanceError::not_found(NotFoundKind::Office, &office_id))?;

                let result = geofence::evaluate_office(request.coordinate, &office);
                ensure_within(&result)?;
                Ok(LocationRef::Office { office_id })
            }
            LocationType::Home => {
                let home_address_id = HomeAddressId::new(request.target()?);
                // Only the user's own addresses are candidates
                let home = self
                    .store
                    .list_home_addresses(user_id)?
                    .into_iter()
                    .find(|home| home.id == home_address_id)
                    .ok_or_else(|| {
                        AttendanceError::not_found(NotFoundKind::HomeAddress, &home_address_id)
                    })?;

                // Addresses without coordinates cannot block attendance
                if home.center.is_some() {
                    let result = geofence::evaluate_home(request.coordinate, &home)?;
                    ensure_within(&result)?;
                } else {
                    debug!(home_address_id = %home.id, "Home address has no coordinates, skipping geofence");
                }
                Ok(LocationRef::Home { home_address_id })
            }
            LocationType::Other => Ok(LocationRef::Other),
        }
    }

    /// CheckedIn -> Idle. No geofence check on check-out.
    pub fn check_out(
        &self,
        user_id: &UserId,
        coordinate: Coordinate,
    ) -> AttendanceResult<AttendanceRecord> {
        let now = self.now();
        let record = self
            .store
            .close_open_record(user_id, now, coordinate)?
            .ok_or(AttendanceError::NoActiveSession)?;

        let duration = record.duration(now);
        info!(
            record_id = %record.id,
            user_id = %user_id,
            duration_secs = duration.as_secs(),
            "Checked out"
        );

        self.audit(AuditEventType::CheckedOut {
            record_id: record.id,
            user_id: user_id.clone(),
            reason: CheckOutReason::Explicit,
            duration,
        });
        let _ = self.events.send(CoreEvent::CheckedOut {
            record: record.clone(),
            reason: CheckOutReason::Explicit,
        });

        Ok(record)
    }

    /// Sweep expired sessions for everyone, then check the user out. Fails
    /// with `NoActiveSession` if the sweep already closed the user's session.
    pub fn check_out_with_sweep(
        &self,
        user_id: &UserId,
        coordinate: Coordinate,
    ) -> AttendanceResult<AttendanceRecord> {
        self.sweeper.sweep()?;
        self.check_out(user_id, coordinate)
    }

    /// Run an auto-logout sweep now
    pub fn sweep(&self) -> AttendanceResult<SweepReport> {
        self.sweeper.sweep()
    }

    /// The user's open record
    pub fn status(&self, user_id: &UserId) -> AttendanceResult<AttendanceRecord> {
        self.store
            .get_open_record(user_id)?
            .ok_or(AttendanceError::NoActiveSession)
    }

    /// The user's records, newest check-in first
    pub fn history(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        Ok(self.store.list_records(user_id, offset, limit)?)
    }

    /// Evaluate a coordinate against one office, or against all offices
    /// ordered by distance
    pub fn check_location(
        &self,
        coordinate: Coordinate,
        office_id: Option<&OfficeId>,
    ) -> AttendanceResult<Vec<GeofenceCheckResult>> {
        match office_id {
            Some(id) => {
                let office = self
                    .store
                    .get_office(id)?
                    .ok_or_else(|| AttendanceError::not_found(NotFoundKind::Office, id))?;
                Ok(vec![geofence::evaluate_office(coordinate, &office)])
            }
            None => {
                let offices = self.store.list_offices()?;
                Ok(geofence::evaluate_all(coordinate, &offices))
            }
        }
    }

    pub fn nearest_office(
        &self,
        coordinate: Coordinate,
    ) -> AttendanceResult<Option<GeofenceCheckResult>> {
        let offices = self.store.list_offices()?;
        Ok(geofence::nearest(coordinate, &offices))
    }

    /// Display name for a location reference. Never fails: lookups that
    /// miss or error fall back to "Unknown".
    pub fn location_name(&self, location: &LocationRef) -> String {
        match location {
            LocationRef::Office { office_id } => match self.store.get_office(office_id) {
                Ok(Some(office)) => office.name,
                Ok(None) => UNKNOWN_LOCATION_NAME.to_string(),
                Err(e) => {
                    debug!(office_id = %office_id, error = %e, "Office lookup failed");
                    UNKNOWN_LOCATION_NAME.to_string()
                }
            },
            LocationRef::Home { home_address_id } => {
                match self.store.get_home_address(home_address_id) {
                    Ok(Some(home)) => format!("Home ({})", home.address_type),
                    Ok(None) => UNKNOWN_LOCATION_NAME.to_string(),
                    Err(e) => {
                        debug!(home_address_id = %home_address_id, error = %e, "Home address lookup failed");
                        UNKNOWN_LOCATION_NAME.to_string()
                    }
                }
            }
            LocationRef::Other => OTHER_LOCATION_NAME.to_string(),
        }
    }

    /// Record paired with its resolved location name
    pub fn view(&self, record: AttendanceRecord) -> AttendanceView {
        let location_name = self.location_name(&record.location);
        AttendanceView {
            record,
            location_name,
        }
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self
            .store
            .append_audit(AuditEvent::at(event, self.clock.now()))
        {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

fn ensure_within(result: &GeofenceCheckResult) -> AttendanceResult<()> {
    if result.within {
        Ok(())
    } else {
        Err(AttendanceError::OutsideGeofence {
            distance_meters: result.distance_meters,
            radius_meters: result.radius_meters,
        })
    }
}
