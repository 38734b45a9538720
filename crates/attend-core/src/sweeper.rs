//! Auto-logout sweep: force-close sessions that outlived the session limit

use attend_api::{AttendanceRecord, CheckOutReason, SweepSummary};
use attend_store::{AuditEvent, AuditEventType, Store};
use attend_util::{Clock, RecordId};
use chrono::{DateTime, Local, SubsecRound};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{AttendanceResult, CoreEvent};

/// Result of one sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    /// Sessions checked in before this instant were expired
    pub cutoff: DateTime<Local>,
    /// Time written as check-out on every closed record
    pub swept_at: DateTime<Local>,
    pub closed: Vec<AttendanceRecord>,
    /// Records the store could not update; they stay open for the next sweep
    pub failed: Vec<RecordId>,
}

impl SweepReport {
    pub fn closed_count(&self) -> usize {
        self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.failed.is_empty()
    }

    pub fn into_summary(self) -> SweepSummary {
        SweepSummary {
            cutoff: self.cutoff,
            closed: self.closed,
        }
    }
}

/// Closes every open record older than the session limit.
///
/// Safe to call concurrently from the scheduler and from request handlers:
/// each sweep is a single store transaction, and a record is closed by at
/// most one of them.
pub struct AutoLogoutSweeper {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    session_limit: Duration,
    events: broadcast::Sender<CoreEvent>,
}

impl AutoLogoutSweeper {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        session_limit: Duration,
        events: broadcast::Sender<CoreEvent>,
    ) -> Self {
        Self {
            store,
            clock,
            session_limit,
            events,
        }
    }

    pub fn session_limit(&self) -> Duration {
        self.session_limit
    }

    /// Run one sweep over all users
    pub fn sweep(&self) -> AttendanceResult<SweepReport> {
        let now = self.clock.now().trunc_subsecs(3);
        let cutoff = chrono::Duration::from_std(self.session_limit)
            .ok()
            .and_then(|limit| now.checked_sub_signed(limit));

        let Some(cutoff) = cutoff else {
            // A limit reaching past the representable range expires nothing
            return Ok(SweepReport {
                cutoff: now,
                swept_at: now,
                closed: Vec::new(),
                failed: Vec::new(),
            });
        };

        let outcome = self.store.close_expired(cutoff, now)?;
        let report = SweepReport {
            cutoff,
            swept_at: now,
            closed: outcome.closed,
            failed: outcome.failed,
        };

        for record in &report.closed {
            info!(
                record_id = %record.id,
                user_id = %record.user_id,
                check_in_time = %record.check_in_time,
                "Session auto-logged out"
            );
            self.audit(AuditEventType::CheckedOut {
                record_id: record.id,
                user_id: record.user_id.clone(),
                reason: CheckOutReason::AutoLogout,
                duration: record.duration(now),
            });
            let _ = self.events.send(CoreEvent::CheckedOut {
                record: record.clone(),
                reason: CheckOutReason::AutoLogout,
            });
        }

        if !report.failed.is_empty() {
            warn!(
                failed = report.failed.len(),
                "Auto-logout sweep skipped records it could not close"
            );
        }

        if report.closed.is_empty() {
            debug!(cutoff = %cutoff, "Auto-logout sweep found nothing to close");
        } else {
            info!(
                cutoff = %cutoff,
                closed = report.closed.len(),
                "Auto-logout sweep completed"
            );
        }

        self.audit(AuditEventType::SweepCompleted {
            cutoff,
            closed_count: report.closed.len(),
            failed_count: report.failed.len(),
        });
        let _ = self.events.send(CoreEvent::SweepCompleted {
            cutoff,
            closed: report.closed.iter().map(|r| r.id).collect(),
            failed: report.failed.clone(),
        });

        Ok(report)
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
