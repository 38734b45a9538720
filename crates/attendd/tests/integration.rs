//! Integration tests for attendd
//!
//! These tests drive the engine against an on-disk store the way the
//! service does.

use attend_api::{CheckOutReason, Coordinate, LocationRef, LocationType};
use attend_config::{Policy, parse_config};
use attend_core::{AttendanceEngine, AttendanceError, CheckInRequest, CoreEvent};
use attend_store::{SqliteStore, Store};
use attend_util::{Clock, HomeAddressId, ManualClock, OfficeId, SystemClock, UserId};
use chrono::{Local, TimeZone};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tempfile::tempdir;

const CONFIG: &str = r#"
    config_version = 1

    [auto_logout]
    session_limit_seconds = 7200

    [[offices]]
    id = "hq"
    name = "Headquarters"
    latitude = 37.7749
    longitude = -122.4194
    radius_meters = 100.0

    [[home_addresses]]
    id = "alice-home"
    user_id = "alice"
    address_type = "primary"
    latitude = 37.80
    longitude = -122.41

    [[home_addresses]]
    id = "alice-cabin"
    user_id = "alice"
    address_type = "secondary"
"#;

const HQ: Coordinate = Coordinate::new(37.7749, -122.4194);
const NEAR_ALICE_HOME: Coordinate = Coordinate::new(37.802, -122.41);
// About 1 km north of alice-home
const FAR_FROM_ALICE_HOME: Coordinate = Coordinate::new(37.809, -122.41);

fn make_policy() -> Policy {
    parse_config(CONFIG).unwrap()
}

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Local.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
    ))
}

fn open_engine(db_path: &Path, clock: Arc<ManualClock>) -> AttendanceEngine {
    let policy = make_policy();
    let store = Arc::new(SqliteStore::open(db_path).unwrap());
    let engine = AttendanceEngine::new(&policy, store, clock);
    engine.load_policy(&policy).unwrap();
    engine
}

fn alice() -> UserId {
    UserId::new("alice")
}

#[test]
fn test_office_day() {
    let dir = tempdir().unwrap();
    let clock = start_clock();
    let engine = open_engine(&dir.path().join("attendd.db"), clock.clone());
    let mut events = engine.subscribe();

    let record = engine
        .check_in(&alice(), CheckInRequest::office("hq", HQ))
        .unwrap();
    assert_eq!(engine.view(record.clone()).location_name, "Headquarters");

    match events.try_recv().unwrap() {
        CoreEvent::CheckedIn {
            record: event_record,
            location_name,
        } => {
            assert_eq!(event_record.id, record.id);
            assert_eq!(location_name, "Headquarters");
        }
        other => panic!("Expected CheckedIn, got {:?}", other),
    }

    clock.advance(Duration::from_secs(3600));
    let closed = engine.check_out(&alice(), HQ).unwrap();
    assert_eq!(closed.id, record.id);
    assert_eq!(closed.check_out_time(), Some(clock.now()));
    assert_eq!(closed.duration(clock.now()), Duration::from_secs(3600));

    match events.try_recv().unwrap() {
        CoreEvent::CheckedOut { reason, .. } => assert_eq!(reason, CheckOutReason::Explicit),
        other => panic!("Expected CheckedOut, got {:?}", other),
    }

    assert!(matches!(
        engine.status(&alice()),
        Err(AttendanceError::NoActiveSession)
    ));
    assert!(matches!(
        engine.check_out(&alice(), HQ),
        Err(AttendanceError::NoActiveSession)
    ));
}

#[test]
fn test_home_check_in() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir.path().join("attendd.db"), start_clock());

    let err = engine
        .check_in(
            &alice(),
            CheckInRequest::home("alice-home", FAR_FROM_ALICE_HOME),
        )
        .unwrap_err();
    match err {
        AttendanceError::OutsideGeofence {
            distance_meters,
            radius_meters,
        } => {
            assert!((distance_meters - 1000.0).abs() < 10.0, "{}", distance_meters);
            assert_eq!(radius_meters, 500.0);
        }
        other => panic!("Expected OutsideGeofence, got {:?}", other),
    }

    // No coordinates on file, so nothing to enforce
    engine
        .check_in(&alice(), CheckInRequest::home("alice-cabin", FAR_FROM_ALICE_HOME))
        .unwrap();
    engine.check_out(&alice(), FAR_FROM_ALICE_HOME).unwrap();

    // Bob may not use Alice's address
    let err = engine
        .check_in(
            &UserId::new("bob"),
            CheckInRequest::home("alice-home", NEAR_ALICE_HOME),
        )
        .unwrap_err();
    assert!(matches!(err, AttendanceError::NotFound { .. }));

    let record = engine
        .check_in(&alice(), CheckInRequest::home("alice-home", NEAR_ALICE_HOME))
        .unwrap();
    assert_eq!(
        record.location,
        LocationRef::Home {
            home_address_id: HomeAddressId::new("alice-home")
        }
    );
}

#[test]
fn test_missing_target() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir.path().join("attendd.db"), start_clock());

    let err = engine
        .check_in(
            &alice(),
            CheckInRequest {
                location_type: LocationType::Office,
                coordinate: HQ,
                target_id: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, AttendanceError::MissingTarget { .. }));
    assert!(engine.history(&alice(), 0, 10).unwrap().is_empty());
}

#[test]
fn test_auto_logout_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("attendd.db");
    let clock = start_clock();

    let record = {
        let engine = open_engine(&db_path, clock.clone());
        engine
            .check_in(&alice(), CheckInRequest::other(NEAR_ALICE_HOME))
            .unwrap()
    };

    clock.advance(Duration::from_secs(2 * 3600 + 1));

    let engine = open_engine(&db_path, clock.clone());
    assert_eq!(engine.status(&alice()).unwrap().id, record.id);

    let report = engine.sweep().unwrap();
    assert_eq!(report.closed_count(), 1);
    assert_eq!(report.closed[0].id, record.id);
    assert_eq!(report.closed[0].check_out_time(), Some(clock.now()));
    assert_eq!(
        report.closed[0].check_out_coordinate(),
        Some(NEAR_ALICE_HOME)
    );

    // A second sweep has nothing left to do
    assert!(engine.sweep().unwrap().is_empty());

    let history = engine.history(&alice(), 0, 10).unwrap();
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_open());
}

#[test]
fn test_check_out_with_sweep_after_expiry() {
    let dir = tempdir().unwrap();
    let clock = start_clock();
    let engine = open_engine(&dir.path().join("attendd.db"), clock.clone());

    engine
        .check_in(&alice(), CheckInRequest::office("hq", HQ))
        .unwrap();
    engine
        .check_in(&UserId::new("bob"), CheckInRequest::office("hq", HQ))
        .unwrap();

    clock.advance(Duration::from_secs(3 * 3600));

    // The sweep closes both sessions before Alice's explicit check-out runs
    assert!(matches!(
        engine.check_out_with_sweep(&alice(), HQ),
        Err(AttendanceError::NoActiveSession)
    ));
    assert!(matches!(
        engine.status(&UserId::new("bob")),
        Err(AttendanceError::NoActiveSession)
    ));

    // Immediately checking in again is allowed
    engine
        .check_in(&alice(), CheckInRequest::office("hq", HQ))
        .unwrap();
}

#[test]
fn test_geofence_queries() {
    let dir = tempdir().unwrap();
    let engine = open_engine(&dir.path().join("attendd.db"), start_clock());

    let results = engine.check_location(HQ, None).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].within);

    let nearest = engine.nearest_office(FAR_FROM_ALICE_HOME).unwrap().unwrap();
    assert!(!nearest.within);
    assert!(nearest.distance_meters > 1000.0);

    assert!(matches!(
        engine.check_location(HQ, Some(&OfficeId::new("branch"))),
        Err(AttendanceError::NotFound { .. })
    ));
}

#[test]
fn test_concurrent_check_in_admits_one() {
    const THREADS: usize = 8;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("attendd.db");
    let policy = make_policy();

    // One connection per thread, all on the same database file
    let engines: Vec<AttendanceEngine> = (0..THREADS)
        .map(|_| {
            let store = Arc::new(SqliteStore::open(&db_path).unwrap());
            let engine = AttendanceEngine::new(&policy, store, Arc::new(SystemClock));
            engine.load_policy(&policy).unwrap();
            engine
        })
        .collect();

    let barrier = Barrier::new(THREADS);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = engines
            .iter()
            .map(|engine| {
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    engine.check_in(&alice(), CheckInRequest::office("hq", HQ))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(
                result,
                AttendanceError::AlreadyCheckedIn { .. } | AttendanceError::StoreConflict(_)
            ),
            "unexpected error: {:?}",
            result
        );
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let open = store
        .list_records(&alice(), 0, 100)
        .unwrap()
        .into_iter()
        .filter(|r| r.is_open())
        .count();
    assert_eq!(open, 1);
}

#[test]
fn test_random_interleavings_keep_one_open_session() {
    let dir = tempdir().unwrap();
    let clock = start_clock();
    let engine = open_engine(&dir.path().join("attendd.db"), clock.clone());
    let users: Vec<UserId> = ["alice", "bob", "carol"].into_iter().map(UserId::new).collect();
    let limit = engine.auto_logout_policy().session_limit;

    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..400 {
        let user = &users[rng.random_range(0..users.len())];
        let was_open = engine.store().get_open_record(user).unwrap().is_some();

        match rng.random_range(0..4) {
            0 => {
                let result = engine.check_in(user, CheckInRequest::office("hq", HQ));
                if was_open {
                    assert!(matches!(result, Err(AttendanceError::AlreadyCheckedIn { .. })));
                } else {
                    assert!(result.unwrap().is_open());
                }
            }
            1 => {
                let result = engine.check_out(user, HQ);
                if was_open {
                    assert!(!result.unwrap().is_open());
                } else {
                    assert!(matches!(result, Err(AttendanceError::NoActiveSession)));
                }
            }
            2 => clock.advance(Duration::from_secs(rng.random_range(0..3 * 3600))),
            _ => {
                let report = engine.sweep().unwrap();
                for record in &report.closed {
                    assert!(record.duration(clock.now()) > limit);
                }
                for user in &users {
                    if let Some(open) = engine.store().get_open_record(user).unwrap() {
                        assert!(open.duration(clock.now()) <= limit);
                    }
                }
            }
        }

        for user in &users {
            let open = engine
                .history(user, 0, 1000)
                .unwrap()
                .into_iter()
                .filter(|r| r.is_open())
                .count();
            assert!(open <= 1, "{} has {} open sessions", user, open);
        }
    }
}
