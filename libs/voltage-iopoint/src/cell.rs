//! Double-buffered state cell
//!
//! A [`StateCell`] owns two [`PointValue`] buffers: the current one, published
//! through an [`ArcSwap`] so readers never take a lock, and a shadow one that
//! the writer fills in before publishing it.
//!
//! # Commit protocol
//!
//! ```text
//!  writer                              readers
//!  ──────                              ───────
//!  lock shadow slot                    load() current ──► snapshot A
//!  fill shadow from result + old (A)         │
//!  swap: shadow (B) becomes current          │ (still reading A)
//!  A becomes the new shadow            load() current ──► snapshot B
//! ```
//!
//! The shadow is reused when no reader still holds it; otherwise it is copied
//! on write. Either way the shadow is stale, so every field must be written
//! on every commit.
//!
//! Writes are crate-internal: outside this crate a cell is only reachable as
//! the read-only view returned by [`PointState::cell`], and every commit goes
//! through [`PointState::update`] so that events fire.
//!
//! ```compile_fail
//! use voltage_iopoint::{Direction, PointState, Timestamp};
//!
//! let state = PointState::<f64>::new(Direction::Input);
//! state.cell().update(Timestamp::from_millis(1), Ok(1.0));
//! ```
//!
//! [`PointState::cell`]: crate::state::PointState::cell
//! [`PointState::update`]: crate::state::PointState::update

use crate::attribute::Attribute;
use crate::error::IoError;
use crate::time::Timestamp;
use crate::value::{ChangeMask, DataValue, PointData, PointValue, Quality};
use arc_swap::{ArcSwap, Guard};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Double-buffered storage for one point direction
pub struct StateCell<T> {
    current: ArcSwap<PointValue<T>>,
    /// Shadow buffer; the lock also serialises writers
    shadow: Mutex<Option<Arc<PointValue<T>>>>,
}

impl<T: PointData> StateCell<T> {
    /// Create a cell in the prepared state (bad quality, not connected)
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(PointValue::default()),
            shadow: Mutex::new(Some(Arc::new(PointValue::default()))),
        }
    }

    // ========== Lock-free reads ==========

    /// Borrow the current snapshot
    ///
    /// The guard pins the snapshot; hold it only for short reads.
    #[inline]
    pub fn load(&self) -> Guard<Arc<PointValue<T>>> {
        self.current.load()
    }

    /// Get an owned handle to the current snapshot
    pub fn snapshot(&self) -> Arc<PointValue<T>> {
        self.current.load_full()
    }

    pub fn update_time(&self) -> Timestamp {
        self.load().update_time
    }

    pub fn value(&self) -> T {
        self.load().value.clone()
    }

    pub fn change_time(&self) -> Timestamp {
        self.load().change_time
    }

    pub fn quality(&self) -> Quality {
        self.load().quality
    }

    pub fn error(&self) -> crate::error::ErrorCode {
        self.load().error
    }

    /// Read one attribute of the current snapshot as a type-erased value
    pub fn read_attribute(&self, attribute: Attribute) -> DataValue {
        let state = self.load();
        match attribute {
            Attribute::UpdateTime => DataValue::Timestamp(state.update_time),
            Attribute::Value => state.value.to_data_value(),
            Attribute::ChangeTime => DataValue::Timestamp(state.change_time),
            Attribute::Quality => DataValue::Quality(state.quality),
            Attribute::Error => DataValue::Error(state.error),
        }
    }

    // ========== Writes ==========

    /// Start a write on the shadow buffer
    ///
    /// Blocks only other writers. Dropping the sentinel without calling
    /// [`WriteSentinel::commit`] discards the prepared state.
    pub(crate) fn write(&self) -> WriteSentinel<'_, T> {
        let mut shadow = self.shadow.lock();
        let old = self.current.load_full();
        let next = shadow
            .take()
            .unwrap_or_else(|| Arc::new(PointValue::clone(&old)));

        WriteSentinel {
            cell: self,
            shadow,
            old,
            next,
            committed: false,
        }
    }

    /// Commit a value or an error and report which fields changed
    ///
    /// On error the value of the previous commit is carried forward.
    pub(crate) fn update(
        &self,
        timestamp: Timestamp,
        value_or_error: Result<T, IoError>,
    ) -> ChangeMask {
        let mut sentinel = self.write();
        let (state, old) = sentinel.parts();

        state.update_time = timestamp;
        match value_or_error {
            Ok(value) => {
                state.value = value;
                state.quality = Quality::Good;
                state.error = crate::error::ErrorCode::None;
            },
            Err(err) => {
                state.value.clone_from(&old.value);
                state.quality = Quality::Bad;
                state.error = err.into();
            },
        }

        let mask = ChangeMask {
            value_changed: state.value != old.value,
            quality_changed: state.quality != old.quality,
            error_changed: state.error != old.error,
        };

        state.change_time = if mask.any_changed() {
            timestamp
        } else {
            old.change_time
        };

        sentinel.commit();
        mask
    }
}

impl<T: PointData> Default for StateCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PointData> std::fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCell")
            .field("current", &*self.load())
            .finish_non_exhaustive()
    }
}

/// Exclusive write access to a cell's shadow buffer
///
/// The prepared buffer starts out stale (the snapshot from two commits back),
/// so the writer must set every field before committing.
pub(crate) struct WriteSentinel<'a, T: PointData> {
    cell: &'a StateCell<T>,
    shadow: MutexGuard<'a, Option<Arc<PointValue<T>>>>,
    old: Arc<PointValue<T>>,
    next: Arc<PointValue<T>>,
    committed: bool,
}

impl<T: PointData> WriteSentinel<'_, T> {
    /// Prepared buffer and previous snapshot at once
    pub(crate) fn parts(&mut self) -> (&mut PointValue<T>, &PointValue<T>) {
        (Arc::make_mut(&mut self.next), &self.old)
    }

    /// Publish the prepared buffer; the replaced one becomes the shadow
    pub(crate) fn commit(mut self) {
        let previous = self.cell.current.swap(Arc::clone(&self.next));
        *self.shadow = Some(previous);
        self.committed = true;
    }
}

impl<T: PointData> Drop for WriteSentinel<'_, T> {
    fn drop(&mut self) {
        if !self.committed {
            *self.shadow = Some(Arc::clone(&self.next));
        }
    }
}
