//! SQLite-based store implementation

use attend_api::{
    AddressType, AttendanceRecord, CheckOut, Coordinate, HomeAddress, LocationRef, Office,
};
use attend_util::{HomeAddressId, OfficeId, RecordId, UserId};
use chrono::{DateTime, Local, TimeZone};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{AuditEvent, ExpiredClosure, Store, StoreResult};

/// Busy timeout applied when opening a store
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const RECORD_COLUMNS: &str = "id, user_id, location_type, office_id, home_address_id, \
     check_in_at, check_in_latitude, check_in_longitude, \
     check_out_at, check_out_latitude, check_out_longitude";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open or create a store, waiting up to `busy_timeout` on a locked
    /// database before failing with `StoreError::Busy`
    pub fn open_with_busy_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS offices (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                radius_meters REAL NOT NULL CHECK (radius_meters > 0)
            );

            CREATE TABLE IF NOT EXISTS home_addresses (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                address_type TEXT NOT NULL CHECK (address_type IN ('primary', 'secondary')),
                latitude REAL,
                longitude REAL,
                CHECK ((latitude IS NULL) = (longitude IS NULL)),
                UNIQUE (user_id, address_type)
            );

            -- Records reference offices and homes by id only; a missing
            -- target resolves to "Unknown" at read time.
            CREATE TABLE IF NOT EXISTS attendance_records (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                location_type TEXT NOT NULL,
                office_id TEXT,
                home_address_id TEXT,
                check_in_at INTEGER NOT NULL,
                check_in_latitude REAL NOT NULL,
                check_in_longitude REAL NOT NULL,
                check_out_at INTEGER,
                check_out_latitude REAL,
                check_out_longitude REAL,
                CHECK (
                    (location_type = 'office' AND office_id IS NOT NULL AND home_address_id IS NULL)
                    OR (location_type = 'home' AND home_address_id IS NOT NULL AND office_id IS NULL)
                    OR (location_type = 'other' AND office_id IS NULL AND home_address_id IS NULL)
                ),
                CHECK (
                    (check_out_at IS NULL) = (check_out_latitude IS NULL)
                    AND (check_out_at IS NULL) = (check_out_longitude IS NULL)
                )
            );

            -- At most one open record per user
            CREATE UNIQUE INDEX IF NOT EXISTS idx_records_one_open
                ON attendance_records(user_id) WHERE check_out_at IS NULL;

            CREATE INDEX IF NOT EXISTS idx_records_user_check_in
                ON attendance_records(user_id, check_in_at);

            CREATE INDEX IF NOT EXISTS idx_records_open_check_in
                ON attendance_records(check_in_at) WHERE check_out_at IS NULL;

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn upsert_office(&self, office: &Office) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO offices (id, name, address, latitude, longitude, radius_meters)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                radius_meters = excluded.radius_meters
            "#,
            params![
                office.id.as_str(),
                office.name,
                office.address,
                office.center.latitude,
                office.center.longitude,
                office.radius_meters,
            ],
        )?;

        debug!(office_id = %office.id, "Office upserted");
        Ok(())
    }

    fn get_office(&self, id: &OfficeId) -> StoreResult<Option<Office>> {
        let conn = self.conn.lock().unwrap();

        let office = conn
            .query_row(
                "SELECT id, name, address, latitude, longitude, radius_meters \
                 FROM offices WHERE id = ?",
                [id.as_str()],
                office_from_row,
            )
            .optional()?;

        Ok(office)
    }

    fn list_offices(&self) -> StoreResult<Vec<Office>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, address, latitude, longitude, radius_meters \
             FROM offices ORDER BY id",
        )?;
        let offices = stmt
            .query_map([], office_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(offices)
    }

    fn upsert_home_address(&self, home: &HomeAddress) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            r#"
            INSERT INTO home_addresses (id, user_id, address_type, latitude, longitude)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                address_type = excluded.address_type,
                latitude = excluded.latitude,
                longitude = excluded.longitude
            "#,
            params![
                home.id.as_str(),
                home.user_id.as_str(),
                home.address_type.as_str(),
                home.center.map(|c| c.latitude),
                home.center.map(|c| c.longitude),
            ],
        )?;

        debug!(home_address_id = %home.id, user_id = %home.user_id, "Home address upserted");
        Ok(())
    }

    fn get_home_address(&self, id: &HomeAddressId) -> StoreResult<Option<HomeAddress>> {
        let conn = self.conn.lock().unwrap();

        let home = conn
            .query_row(
                "SELECT id, user_id, address_type, latitude, longitude \
                 FROM home_addresses WHERE id = ?",
                [id.as_str()],
                home_from_row,
            )
            .optional()?;

        Ok(home)
    }

    fn list_home_addresses(&self, user_id: &UserId) -> StoreResult<Vec<HomeAddress>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, user_id, address_type, latitude, longitude \
             FROM home_addresses WHERE user_id = ? ORDER BY address_type",
        )?;
        let homes = stmt
            .query_map([user_id.as_str()], home_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(homes)
    }

    fn insert_record(&self, record: &AttendanceRecord) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let (office_id, home_address_id) = match &record.location {
            LocationRef::Office { office_id } => (Some(office_id.as_str()), None),
            LocationRef::Home { home_address_id } => (None, Some(home_address_id.as_str())),
            LocationRef::Other => (None, None),
        };

        conn.execute(
            &format!(
                "INSERT INTO attendance_records ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                RECORD_COLUMNS
            ),
            params![
                record.id.to_string(),
                record.user_id.as_str(),
                record.location.location_type().as_str(),
                office_id,
                home_address_id,
                record.check_in_time.timestamp_millis(),
                record.check_in_coordinate.latitude,
                record.check_in_coordinate.longitude,
                record.check_out.map(|c| c.time.timestamp_millis()),
                record.check_out.map(|c| c.coordinate.latitude),
                record.check_out.map(|c| c.coordinate.longitude),
            ],
        )?;

        debug!(record_id = %record.id, user_id = %record.user_id, "Attendance record inserted");
        Ok(())
    }

    fn get_open_record(&self, user_id: &UserId) -> StoreResult<Option<AttendanceRecord>> {
        let conn = self.conn.lock().unwrap();

        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM attendance_records \
                     WHERE user_id = ? AND check_out_at IS NULL",
                    RECORD_COLUMNS
                ),
                [user_id.as_str()],
                record_from_row,
            )
            .optional()?;

        Ok(record)
    }

    fn close_open_record(
        &self,
        user_id: &UserId,
        at: DateTime<Local>,
        coordinate: Coordinate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let open = tx
            .query_row(
                &format!(
                    "SELECT {} FROM attendance_records \
                     WHERE user_id = ? AND check_out_at IS NULL",
                    RECORD_COLUMNS
                ),
                [user_id.as_str()],
                record_from_row,
            )
            .optional()?;

        let Some(mut record) = open else {
            return Ok(None);
        };

        let changed = tx.execute(
            "UPDATE attendance_records \
             SET check_out_at = ?1, check_out_latitude = ?2, check_out_longitude = ?3 \
             WHERE id = ?4 AND check_out_at IS NULL",
            params![
                at.timestamp_millis(),
                coordinate.latitude,
                coordinate.longitude,
                record.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        tx.commit()?;

        record.check_out = Some(CheckOut {
            time: at,
            coordinate,
        });
        debug!(record_id = %record.id, user_id = %user_id, "Attendance record closed");
        Ok(Some(record))
    }

    fn close_expired(
        &self,
        cutoff: DateTime<Local>,
        at: DateTime<Local>,
    ) -> StoreResult<ExpiredClosure> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let expired = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM attendance_records \
                 WHERE check_out_at IS NULL AND check_in_at < ? \
                 ORDER BY check_in_at",
                RECORD_COLUMNS
            ))?;
            stmt.query_map([cutoff.timestamp_millis()], record_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut outcome = ExpiredClosure::default();
        for mut record in expired {
            let result = tx.execute(
                "UPDATE attendance_records \
                 SET check_out_at = ?1, \
                     check_out_latitude = check_in_latitude, \
                     check_out_longitude = check_in_longitude \
                 WHERE id = ?2 AND check_out_at IS NULL",
                params![at.timestamp_millis(), record.id.to_string()],
            );

            match result {
                Ok(1) => {
                    record.check_out = Some(CheckOut {
                        time: at,
                        coordinate: record.check_in_coordinate,
                    });
                    outcome.closed.push(record);
                }
                Ok(_) => {
                    debug!(record_id = %record.id, "Expired record already closed");
                }
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "Failed to close expired record, skipping");
                    outcome.failed.push(record.id);
                }
            }
        }

        tx.commit()?;

        debug!(
            cutoff = %cutoff,
            closed = outcome.closed.len(),
            failed = outcome.failed.len(),
            "Expired records closed"
        );
        Ok(outcome)
    }

    fn list_records(
        &self,
        user_id: &UserId,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM attendance_records WHERE user_id = ? \
             ORDER BY check_in_at DESC, rowid DESC LIMIT ? OFFSET ?",
            RECORD_COLUMNS
        ))?;
        let records = stmt
            .query_map(
                params![user_id.as_str(), limit as i64, offset as i64],
                record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.timestamp_millis(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp = datetime_from_millis(1, row.get(1)?)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp, event_json) = row?;
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

// Row mapping

fn datetime_from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Local>> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn office_from_row(row: &Row<'_>) -> rusqlite::Result<Office> {
    Ok(Office {
        id: OfficeId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        address: row.get(2)?,
        center: Coordinate::new(row.get(3)?, row.get(4)?),
        radius_meters: row.get(5)?,
    })
}

fn home_from_row(row: &Row<'_>) -> rusqlite::Result<HomeAddress> {
    let address_type: String = row.get(2)?;
    let address_type = address_type
        .parse::<AddressType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    let latitude: Option<f64> = row.get(3)?;
    let longitude: Option<f64> = row.get(4)?;

    Ok(HomeAddress {
        id: HomeAddressId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        address_type,
        center: latitude.zip(longitude).map(|(lat, lon)| Coordinate::new(lat, lon)),
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    let id: String = row.get(0)?;
    let id = RecordId::parse(&id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    let location_type: String = row.get(2)?;
    let office_id: Option<String> = row.get(3)?;
    let home_address_id: Option<String> = row.get(4)?;
    let location = match (location_type.as_str(), office_id, home_address_id) {
        ("office", Some(office_id), None) => LocationRef::Office {
            office_id: OfficeId::new(office_id),
        },
        ("home", None, Some(home_address_id)) => LocationRef::Home {
            home_address_id: HomeAddressId::new(home_address_id),
        },
        ("other", None, None) => LocationRef::Other,
        (other, _, _) => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("inconsistent location reference for type '{}'", other).into(),
            ));
        }
    };

    let check_out_at: Option<i64> = row.get(8)?;
    let check_out_latitude: Option<f64> = row.get(9)?;
    let check_out_longitude: Option<f64> = row.get(10)?;
    let check_out = match (check_out_at, check_out_latitude, check_out_longitude) {
        (Some(at), Some(lat), Some(lon)) => Some(CheckOut {
            time: datetime_from_millis(8, at)?,
            coordinate: Coordinate::new(lat, lon),
        }),
        _ => None,
    };

    Ok(AttendanceRecord {
        id,
        user_id: UserId::new(row.get::<_, String>(1)?),
        location,
        check_in_time: datetime_from_millis(5, row.get(5)?)?,
        check_in_coordinate: Coordinate::new(row.get(6)?, row.get(7)?),
        check_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuditEventType, StoreError};
    use chrono::Duration as ChronoDuration;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn hq() -> Office {
        Office {
            id: OfficeId::new("hq"),
            name: "Headquarters".into(),
            address: Some("1 Market St".into()),
            center: Coordinate::new(37.7749, -122.4194),
            radius_meters: 100.0,
        }
    }

    fn open_record(user: &str, at: DateTime<Local>) -> AttendanceRecord {
        AttendanceRecord::open(
            UserId::new(user),
            LocationRef::Office {
                office_id: OfficeId::new("hq"),
            },
            at,
            Coordinate::new(37.7749, -122.4194),
        )
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        let event = AuditEvent::new(AuditEventType::ServiceStarted);
        store.append_audit(event).unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, AuditEventType::ServiceStarted));
    }

    #[test]
    fn test_office_upsert() {
        let store = SqliteStore::in_memory().unwrap();
        let mut office = hq();
        store.upsert_office(&office).unwrap();

        office.radius_meters = 250.0;
        store.upsert_office(&office).unwrap();

        let offices = store.list_offices().unwrap();
        assert_eq!(offices.len(), 1);
        assert_eq!(offices[0], office);
        assert!(store.get_office(&OfficeId::new("nope")).unwrap().is_none());
    }

    #[test]
    fn test_home_addresses() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = UserId::new("alice");

        let primary = HomeAddress {
            id: HomeAddressId::new("h1"),
            user_id: alice.clone(),
            address_type: AddressType::Primary,
            center: Some(Coordinate::new(37.8, -122.41)),
        };
        let secondary = HomeAddress {
            id: HomeAddressId::new("h2"),
            user_id: alice.clone(),
            address_type: AddressType::Secondary,
            center: None,
        };
        store.upsert_home_address(&primary).unwrap();
        store.upsert_home_address(&secondary).unwrap();

        assert_eq!(store.list_home_addresses(&alice).unwrap().len(), 2);
        assert_eq!(
            store.get_home_address(&HomeAddressId::new("h2")).unwrap(),
            Some(secondary)
        );

        // A second primary address for the same user is rejected
        let duplicate = HomeAddress {
            id: HomeAddressId::new("h3"),
            ..primary
        };
        assert!(matches!(
            store.upsert_home_address(&duplicate),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_record_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let record = open_record("alice", t0());
        store.insert_record(&record).unwrap();

        assert_eq!(
            store.get_open_record(&UserId::new("alice")).unwrap(),
            Some(record.clone())
        );
        assert_eq!(
            store.list_records(&UserId::new("alice"), 0, 10).unwrap(),
            vec![record]
        );
    }

    #[test]
    fn test_second_open_record_conflicts() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_record(&open_record("alice", t0())).unwrap();

        let result = store.insert_record(&open_record("alice", t0()));
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        // Other users are unaffected
        store.insert_record(&open_record("bob", t0())).unwrap();
    }

    #[test]
    fn test_close_open_record() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = UserId::new("alice");
        let record = open_record("alice", t0());
        store.insert_record(&record).unwrap();

        let at = t0() + ChronoDuration::hours(1);
        let exit = Coordinate::new(37.0, -122.0);
        let closed = store.close_open_record(&alice, at, exit).unwrap().unwrap();
        assert_eq!(closed.id, record.id);
        assert_eq!(closed.check_out_time(), Some(at));
        assert_eq!(closed.check_out_coordinate(), Some(exit));

        assert!(store.get_open_record(&alice).unwrap().is_none());
        assert!(store.close_open_record(&alice, at, exit).unwrap().is_none());

        // Closed records do not block a new check-in
        store.insert_record(&open_record("alice", at)).unwrap();
    }

    #[test]
    fn test_close_expired() {
        let store = SqliteStore::in_memory().unwrap();
        let old = open_record("alice", t0());
        let fresh = open_record("bob", t0() + ChronoDuration::hours(2));
        store.insert_record(&old).unwrap();
        store.insert_record(&fresh).unwrap();

        let now = t0() + ChronoDuration::hours(3);
        let cutoff = now - ChronoDuration::hours(2);
        let outcome = store.close_expired(cutoff, now).unwrap();

        assert_eq!(outcome.closed.len(), 1);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.closed[0].id, old.id);
        assert_eq!(outcome.closed[0].check_out_time(), Some(now));
        assert_eq!(
            outcome.closed[0].check_out_coordinate(),
            Some(old.check_in_coordinate)
        );

        // Check-in exactly at the cutoff is not expired
        assert!(store.get_open_record(&UserId::new("bob")).unwrap().is_some());

        let again = store.close_expired(cutoff, now).unwrap();
        assert!(again.closed.is_empty());
    }

    #[test]
    fn test_history_ordering() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = UserId::new("alice");

        for hour in 0..3 {
            let start = t0() + ChronoDuration::hours(hour * 4);
            store.insert_record(&open_record("alice", start)).unwrap();
            store
                .close_open_record(&alice, start + ChronoDuration::hours(1), Coordinate::new(0.0, 0.0))
                .unwrap();
        }
        store.insert_record(&open_record("bob", t0())).unwrap();

        let history = store.list_records(&alice, 0, 10).unwrap();
        assert_eq!(history.len(), 3);
        assert!(
            history
                .windows(2)
                .all(|w| w[0].check_in_time > w[1].check_in_time)
        );

        let page = store.list_records(&alice, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, history[1].id);
    }

    #[test]
    fn test_on_disk_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendd.db");
        let record = open_record("alice", t0());

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_office(&hq()).unwrap();
            store.insert_record(&record).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_offices().unwrap().len(), 1);
        assert_eq!(
            store.get_open_record(&UserId::new("alice")).unwrap(),
            Some(record)
        );
    }
}
