//! State invariants under arbitrary update sequences and concurrent readers

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use voltage_iopoint::{
    Direction, ErrorCode, EventKind, IoError, PointState, Quality, Timestamp,
};

fn io_error() -> impl Strategy<Value = IoError> {
    prop_oneof![
        Just(IoError::NotConnected),
        Just(IoError::Timeout),
        (0..3i32).prop_map(|code| IoError::TransferFailed { code }),
        (0..3i32).prop_map(|code| IoError::Rejected { code }),
    ]
}

/// Small value domain so repeated values are common
fn update() -> impl Strategy<Value = (i64, Result<i32, IoError>)> {
    (
        0..50i64,
        prop_oneof![
            3 => (0..3i32).prop_map(Ok::<i32, IoError>),
            1 => io_error().prop_map(Err::<i32, IoError>),
        ],
    )
}

proptest! {
    #[test]
    fn prop_change_time_is_monotonic_and_bounded(updates in prop::collection::vec(update(), 1..60)) {
        let state = PointState::<i32>::new(Direction::Input);
        let changed = state.event(EventKind::Changed);
        let mut now = 0i64;
        let mut last_change = state.load().change_time;

        for (step, result) in updates {
            now += step;
            let before = state.snapshot();
            let fired_before = changed.fire_count();
            let mask = state.update(Timestamp::from_millis(now), result).unwrap();
            let after = state.snapshot();

            prop_assert_eq!(after.update_time, Timestamp::from_millis(now));
            prop_assert!(after.change_time <= after.update_time);
            prop_assert!(after.change_time >= last_change);
            prop_assert_eq!(after.quality == Quality::Good, after.error == ErrorCode::None);

            match result {
                Ok(value) => prop_assert_eq!(after.value, value),
                Err(_) => prop_assert_eq!(after.value, before.value),
            }

            prop_assert_eq!(mask.value_changed, after.value != before.value);
            prop_assert_eq!(mask.quality_changed, after.quality != before.quality);
            prop_assert_eq!(changed.fire_count() - fired_before, u64::from(mask.any_changed()));
            if mask.any_changed() {
                prop_assert_eq!(after.change_time, after.update_time);
            } else {
                prop_assert_eq!(after.change_time, before.change_time);
            }
            last_change = after.change_time;
        }
    }

    #[test]
    fn prop_repeated_update_changes_nothing(
        first in update(),
        later in 0..1_000i64,
    ) {
        let state = PointState::<i32>::new(Direction::Input);
        let (at, result) = first;

        state.update(Timestamp::from_millis(at), result);
        let settled = state.snapshot();
        let mask = state.update(Timestamp::from_millis(at + later), result).unwrap();

        prop_assert!(!mask.any_changed());
        let again = state.snapshot();
        prop_assert_eq!(again.change_time, settled.change_time);
        prop_assert_eq!(again.value, settled.value);
        prop_assert_eq!(again.quality, settled.quality);
        prop_assert_eq!(again.error, settled.error);
    }
}

#[test]
fn test_concurrent_readers_never_observe_torn_state() {
    // The writer keeps value, update_time and change_time in lockstep;
    // any mix of two commits breaks that relation.
    let state = Arc::new(PointState::<i64>::new(Direction::Input));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let state = Arc::clone(&state);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0u64;
                let mut last = i64::MIN;
                while !done.load(Ordering::Acquire) {
                    let current = state.load();
                    if current.update_time.is_min() {
                        continue;
                    }
                    let millis = current.update_time.as_millis();
                    assert_eq!(current.value, millis);
                    assert_eq!(current.change_time, current.update_time);
                    assert_eq!(current.quality, Quality::Good);
                    assert!(millis >= last, "time went backwards");
                    last = millis;
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for millis in 1..=20_000i64 {
        state.update(Timestamp::from_millis(millis), Ok(millis));
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(state.load().value, 20_000);
}

#[test]
fn test_snapshot_survives_later_commits() {
    let state = PointState::<i64>::new(Direction::Output);
    state.update(Timestamp::from_millis(1), Ok(1));
    let held = state.snapshot();

    for millis in 2..10 {
        state.update(Timestamp::from_millis(millis), Ok(millis));
    }

    assert_eq!(held.value, 1);
    assert_eq!(held.update_time, Timestamp::from_millis(1));
    assert_eq!(state.load().value, 9);
}
