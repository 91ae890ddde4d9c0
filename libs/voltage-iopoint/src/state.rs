//! Per-direction point state
//!
//! [`PointState`] pairs a [`StateCell`] with its [`ChangeEventSet`] and is the
//! only way to mutate either: [`PointState::update`] commits first and fires
//! the resulting events afterwards.
//!
//! # Re-entrancy
//!
//! Events fire synchronously. A listener that calls `update` on the same
//! state while events are firing does not interleave with the running
//! dispatch: its update is queued and applied, in order, once the current
//! dispatch has finished.

use crate::attribute::{Attribute, Direction, EventKind};
use crate::cell::StateCell;
use crate::error::{IoError, PointError, Result};
use crate::event::{ChangeEventSet, EventHandle};
use crate::handle::ReadHandle;
use crate::time::Timestamp;
use crate::value::{ChangeMask, PointData, PointValue};
use arc_swap::Guard;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

type PendingUpdate<T> = (Timestamp, std::result::Result<T, IoError>);

struct Dispatch<T> {
    firing: bool,
    deferred: VecDeque<PendingUpdate<T>>,
}

/// Observable state of one direction (input or output) of a point
pub struct PointState<T: PointData> {
    direction: Direction,
    cell: Arc<StateCell<T>>,
    events: Arc<ChangeEventSet>,
    dispatch: Mutex<Dispatch<T>>,
}

impl<T: PointData> PointState<T> {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            cell: Arc::new(StateCell::new()),
            events: Arc::new(ChangeEventSet::new(direction)),
            dispatch: Mutex::new(Dispatch {
                firing: false,
                deferred: VecDeque::new(),
            }),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    // ========== Resolution ==========

    /// Resolve an attribute name owned by this state
    ///
    /// The `value` attribute is not resolved here: input and output share one
    /// physical value, so the composing point decides where it comes from.
    pub fn resolve_attribute(&self, name: &str) -> Option<Attribute> {
        Attribute::from_name(name).filter(|attribute| *attribute != Attribute::Value)
    }

    pub fn resolve_event(&self, name: &str) -> Option<EventHandle> {
        self.events.resolve(name)
    }

    pub fn event(&self, kind: EventKind) -> EventHandle {
        self.events.handle(kind)
    }

    /// Create a read handle for a non-value attribute
    ///
    /// The value attribute is reported as unknown; use
    /// [`PointState::value_read_handle`] for it.
    pub fn read_handle(&self, attribute: Attribute) -> Result<ReadHandle<T>> {
        match attribute {
            Attribute::Value => Err(PointError::UnknownAttribute(attribute.name().to_string())),
            _ => Ok(ReadHandle::new(Arc::clone(&self.cell), attribute)),
        }
    }

    pub fn value_read_handle(&self) -> ReadHandle<T> {
        ReadHandle::new(Arc::clone(&self.cell), Attribute::Value)
    }

    // ========== Access ==========

    /// Owned handle to the current snapshot
    pub fn snapshot(&self) -> Arc<PointValue<T>> {
        self.cell.snapshot()
    }

    /// Borrow the current snapshot without taking a lock
    #[inline]
    pub fn load(&self) -> Guard<Arc<PointValue<T>>> {
        self.cell.load()
    }

    /// Read-only view of the underlying cell
    pub fn cell(&self) -> &StateCell<T> {
        &self.cell
    }

    // ========== Mutation ==========

    /// Commit a value or error, then fire the events for what changed
    ///
    /// Returns the change mask of this commit, or `None` if the update was
    /// queued behind a dispatch that is still running.
    pub fn update(
        &self,
        timestamp: Timestamp,
        value_or_error: std::result::Result<T, IoError>,
    ) -> Option<ChangeMask> {
        {
            let mut dispatch = self.dispatch.lock();
            if dispatch.firing {
                debug!(
                    direction = self.direction.as_str(),
                    "Update queued behind running event dispatch"
                );
                dispatch.deferred.push_back((timestamp, value_or_error));
                return None;
            }
            dispatch.firing = true;
        }

        let _reset = DispatchReset { state: self };
        let mask = self.commit_and_notify(timestamp, value_or_error);

        loop {
            let next = {
                let mut dispatch = self.dispatch.lock();
                match dispatch.deferred.pop_front() {
                    Some(next) => next,
                    None => {
                        dispatch.firing = false;
                        break;
                    },
                }
            };
            self.commit_and_notify(next.0, next.1);
        }

        Some(mask)
    }

    fn commit_and_notify(
        &self,
        timestamp: Timestamp,
        value_or_error: std::result::Result<T, IoError>,
    ) -> ChangeMask {
        let mask = self.cell.update(timestamp, value_or_error);

        if mask.any_changed() {
            let state = self.cell.load();
            debug!(
                direction = self.direction.as_str(),
                quality = %state.quality,
                error = %state.error,
                time = %timestamp,
                "State changed: {:?}",
                state.value
            );
        }

        self.events.notify(mask);
        mask
    }
}

impl<T: PointData> std::fmt::Debug for PointState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointState")
            .field("direction", &self.direction)
            .field("cell", &self.cell)
            .finish_non_exhaustive()
    }
}

/// Clears the dispatch flag if a listener panics mid-dispatch
struct DispatchReset<'a, T: PointData> {
    state: &'a PointState<T>,
}

impl<T: PointData> Drop for DispatchReset<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut dispatch = self.state.dispatch.lock();
            dispatch.firing = false;
            dispatch.deferred.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::event::Event;
    use crate::value::{DataValue, Quality};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Barrier, Weak};
    use std::thread;

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn record(state: &PointState<f64>) -> Arc<Mutex<Vec<EventKind>>> {
        let fired = Arc::new(Mutex::new(Vec::new()));
        for kind in EventKind::ALL {
            let fired = Arc::clone(&fired);
            state
                .event(kind)
                .subscribe(move |event: &Event| fired.lock().push(event.kind()));
        }
        fired
    }

    #[test]
    fn test_value_attribute_not_resolved() {
        let state = PointState::<f64>::new(Direction::Input);
        assert_eq!(state.resolve_attribute("value"), None);
        assert_eq!(state.resolve_attribute("quality"), Some(Attribute::Quality));
        assert_eq!(state.resolve_attribute("bogus"), None);
    }

    #[test]
    fn test_read_handle_rejects_value() {
        let state = PointState::<f64>::new(Direction::Input);
        assert!(matches!(
            state.read_handle(Attribute::Value),
            Err(PointError::UnknownAttribute(_))
        ));
        assert_eq!(state.value_read_handle().attribute(), Attribute::Value);
    }

    #[test]
    fn test_scenario_first_commit_then_repeat() {
        let state = PointState::<f64>::new(Direction::Input);
        let fired = record(&state);

        let mask = state.update(ts(100), Ok(3.14)).unwrap();
        assert!(mask.value_changed && mask.quality_changed && mask.any_changed());

        let snap = state.snapshot();
        assert_eq!(snap.value, 3.14);
        assert_eq!(snap.quality, Quality::Good);
        assert_eq!(snap.error, ErrorCode::None);
        assert_eq!(snap.change_time, ts(100));
        assert_eq!(
            *fired.lock(),
            vec![
                EventKind::ValueChanged,
                EventKind::QualityChanged,
                EventKind::Changed
            ]
        );

        fired.lock().clear();
        let mask = state.update(ts(200), Ok(3.14)).unwrap();
        assert!(!mask.any_changed());
        assert!(fired.lock().is_empty());

        let snap = state.snapshot();
        assert_eq!(snap.change_time, ts(100));
        assert_eq!(snap.update_time, ts(200));
    }

    #[test]
    fn test_listener_sees_committed_state() {
        let state = Arc::new(PointState::<f64>::new(Direction::Input));
        let seen = Arc::new(Mutex::new(None));
        let handle = state.value_read_handle();
        {
            let seen = Arc::clone(&seen);
            state
                .event(EventKind::ValueChanged)
                .subscribe(move |_: &Event| *seen.lock() = Some(handle.read()));
        }

        state.update(ts(1), Ok(2.5));
        assert_eq!(*seen.lock(), Some(DataValue::Float(2.5)));
    }

    #[test]
    fn test_reentrant_update_is_deferred() {
        let state = Arc::new(PointState::<f64>::new(Direction::Input));
        let order = Arc::new(Mutex::new(Vec::new()));

        let weak: Weak<PointState<f64>> = Arc::downgrade(&state);
        {
            let order = Arc::clone(&order);
            state
                .event(EventKind::ValueChanged)
                .subscribe(move |_: &Event| {
                    let Some(state) = weak.upgrade() else { return };
                    let value = state.load().value;
                    order.lock().push(format!("value {}", value));
                    if value < 2.0 {
                        // Queued: must not run until this dispatch finishes
                        assert!(state.update(ts(2), Ok(2.0)).is_none());
                        assert_eq!(state.load().value, 1.0);
                    }
                });
        }
        {
            let order = Arc::clone(&order);
            state
                .event(EventKind::Changed)
                .subscribe(move |_: &Event| order.lock().push("changed".to_string()));
        }

        state.update(ts(1), Ok(1.0));

        assert_eq!(
            *order.lock(),
            vec!["value 1", "changed", "value 2", "changed"]
        );
        assert_eq!(state.load().value, 2.0);
        assert_eq!(state.load().update_time, ts(2));
    }

    #[test]
    fn test_error_update_fires_quality_not_value() {
        let state = PointState::<f64>::new(Direction::Output);
        state.update(ts(1), Ok(5.0));
        let fired = record(&state);

        state.update(ts(2), Err(IoError::TransferFailed { code: 1 }));
        assert_eq!(
            *fired.lock(),
            vec![EventKind::QualityChanged, EventKind::Changed]
        );
        assert_eq!(state.snapshot().value, 5.0);
    }

    #[test]
    fn test_update_from_other_thread_is_queued_during_dispatch() {
        let state = Arc::new(PointState::<f64>::new(Direction::Input));
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let first = Arc::new(AtomicBool::new(true));
        {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            state
                .event(EventKind::ValueChanged)
                .subscribe(move |_: &Event| {
                    if first.swap(false, Ordering::SeqCst) {
                        entered.wait();
                        release.wait();
                    }
                });
        }

        let other = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                entered.wait();
                let queued = state.update(ts(2), Ok(2.0));
                // Still the first commit: the queued one waits for the dispatch
                let seen = state.load().value;
                release.wait();
                (queued, seen)
            })
        };

        let mask = state.update(ts(1), Ok(1.0));
        let (queued, seen) = other.join().unwrap();

        assert!(mask.unwrap().value_changed);
        assert!(queued.is_none());
        assert_eq!(seen, 1.0);
        assert_eq!(state.load().value, 2.0);
        assert_eq!(state.load().update_time, ts(2));
        assert_eq!(state.event(EventKind::ValueChanged).fire_count(), 2);
    }

    #[test]
    fn test_update_recovers_after_listener_panic() {
        let state = PointState::<f64>::new(Direction::Input);
        let explode = Arc::new(AtomicBool::new(true));
        {
            let explode = Arc::clone(&explode);
            state
                .event(EventKind::Changed)
                .subscribe(move |_: &Event| {
                    if explode.load(Ordering::SeqCst) {
                        panic!("listener failure");
                    }
                });
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| state.update(ts(1), Ok(1.0))));
        assert!(result.is_err());
        // The commit happened before the listener ran
        assert_eq!(state.load().value, 1.0);

        explode.store(false, Ordering::SeqCst);
        let mask = state.update(ts(2), Ok(2.0));
        assert!(mask.is_some_and(|mask| mask.value_changed));
        assert_eq!(state.load().value, 2.0);
    }

    #[test]
    fn test_commits_always_notify() {
        let state = PointState::<f64>::new(Direction::Input);
        let fired = record(&state);

        state.update(ts(10), Ok(9.0));
        state.update(ts(20), Err(IoError::Timeout));

        let snap = state.snapshot();
        assert_eq!(snap.value, 9.0);
        assert_eq!(snap.quality, Quality::Bad);
        assert_eq!(snap.error, ErrorCode::Timeout);
        assert_eq!(fired.lock().len(), 5);
        assert_eq!(state.event(EventKind::Changed).fire_count(), 2);
    }
}
