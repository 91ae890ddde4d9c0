//! Read and write handles
//!
//! Handles are resolved once at binding time and then used on every access
//! without any name lookup.

use crate::attribute::Attribute;
use crate::cell::StateCell;
use crate::value::{DataValue, PointData};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Accessor for one attribute of a state cell
///
/// Reads go straight to the cell's current snapshot and never block.
pub struct ReadHandle<T> {
    cell: Arc<StateCell<T>>,
    attribute: Attribute,
}

impl<T: PointData> ReadHandle<T> {
    pub(crate) fn new(cell: Arc<StateCell<T>>, attribute: Attribute) -> Self {
        Self { cell, attribute }
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    pub fn read(&self) -> DataValue {
        self.cell.read_attribute(self.attribute)
    }
}

impl<T> Clone for ReadHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            attribute: self.attribute,
        }
    }
}

impl<T> fmt::Debug for ReadHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("attribute", &self.attribute)
            .finish()
    }
}

/// Slot holding the value waiting for the next write cycle
///
/// Only the most recent value is kept; a newer submission replaces an older
/// one that has not been written yet.
#[derive(Debug)]
pub struct PendingWrite<T> {
    slot: Mutex<Option<T>>,
}

impl<T> PendingWrite<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store a value, returning the one it replaced
    pub fn submit(&self, value: T) -> Option<T> {
        self.slot.lock().replace(value)
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T> Default for PendingWrite<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Accessor that queues values for the write task
pub struct WriteHandle<T> {
    pending: Arc<PendingWrite<T>>,
}

impl<T: PointData> WriteHandle<T> {
    pub(crate) fn new(pending: Arc<PendingWrite<T>>) -> Self {
        Self { pending }
    }

    /// Queue a value; it is sent on the next write cycle
    pub fn write(&self, value: T) {
        if let Some(replaced) = self.pending.submit(value) {
            debug!("Pending write replaced: {:?}", replaced);
        }
    }
}

impl<T> Clone for WriteHandle<T> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<T> fmt::Debug for WriteHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHandle").finish_non_exhaustive()
    }
}
