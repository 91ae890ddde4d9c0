//! Read and write tasks
//!
//! A task is invoked by the host scheduler once per cycle. Each invocation
//! runs the same state machine and falls back to idle when it returns:
//!
//! ```text
//! Idle ──► not connected? ──yes──► request_connect, commit NotConnected ──► Idle
//!               │ no
//!               ▼
//!          Transferring ──ok──► commit value ──────────────────────────────► Idle
//!               │ err
//!               ▼
//!          commit error ──► request_disconnect (if link is suspect) ───────► Idle
//! ```
//!
//! Tasks report nothing back to the scheduler; the outcome is visible only
//! through the point state and its events.

use crate::component::ValueTransfer;
use crate::error::IoError;
use crate::point::IoPoint;
use crate::time::Timestamp;
use crate::value::PointData;
use std::fmt;
use std::sync::Weak;
use tracing::{debug, trace, warn};

/// Per-invocation context supplied by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    scheduled_time: Timestamp,
}

impl ExecutionContext {
    pub fn new(scheduled_time: Timestamp) -> Self {
        Self { scheduled_time }
    }

    /// Logical time stamp of the cycle
    pub fn scheduled_time(&self) -> Timestamp {
        self.scheduled_time
    }
}

/// A unit of work the scheduler invokes once per cycle
pub trait Task: Send + Sync {
    fn kind(&self) -> TaskKind;

    fn execute(&self, context: &ExecutionContext);
}

/// Task identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Read,
    Write,
}

impl TaskKind {
    pub const READ: &'static str = "read";
    pub const WRITE: &'static str = "write";

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            Self::READ => Some(TaskKind::Read),
            Self::WRITE => Some(TaskKind::Write),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Read => Self::READ,
            TaskKind::Write => Self::WRITE,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How one cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do (write task with no pending value)
    Idle,
    /// Component was down; a connect was requested and NotConnected committed
    ConnectRequested,
    /// Value transferred and committed
    Transferred,
    /// Transfer failed; the error was committed
    ///
    /// A disconnect was requested too, unless the error was a
    /// [`IoError::Rejected`], which leaves the connection up.
    Failed(IoError),
    /// The owning point no longer exists
    Detached,
}

/// Connection handling shared by both tasks, after the error was committed
///
/// A component that notifies its error sinks synchronously on disconnect
/// updates the states again from inside this call.
fn handle_transfer_error<T: PointData>(
    point: &IoPoint<T>,
    component: &dyn ValueTransfer<T>,
    timestamp: Timestamp,
    error: IoError,
    task: TaskKind,
) {
    if error.invalidates_connection() {
        warn!(
            point = point.name(),
            component = component.name(),
            "{} failed, requesting disconnect: {}",
            task,
            error
        );
        component.request_disconnect(timestamp);
    } else {
        warn!(
            point = point.name(),
            component = component.name(),
            "{} failed: {}",
            task,
            error
        );
    }
}

// ============================================================================
// ReadTask
// ============================================================================

/// Reads the value from the component into the input state
pub struct ReadTask<T: PointData> {
    point: Weak<IoPoint<T>>,
}

impl<T: PointData> ReadTask<T> {
    pub(crate) fn new(point: Weak<IoPoint<T>>) -> Self {
        Self { point }
    }

    /// Run one read cycle
    pub fn perform(&self, timestamp: Timestamp) -> CycleOutcome {
        let Some(point) = self.point.upgrade() else {
            trace!("Read task invoked after point was dropped");
            return CycleOutcome::Detached;
        };
        let component = point.component();
        let state = point.input_state();

        if !component.is_connected() {
            debug!(
                point = point.name(),
                component = component.name(),
                "Not connected, requesting connect"
            );
            component.request_connect(timestamp);
            state.update(timestamp, Err(IoError::NotConnected));
            return CycleOutcome::ConnectRequested;
        }

        match component.read_value() {
            Ok(value) => {
                trace!(point = point.name(), "Read {:?}", value);
                state.update(timestamp, Ok(value));
                CycleOutcome::Transferred
            },
            Err(error) => {
                state.update(timestamp, Err(error));
                handle_transfer_error(&point, component, timestamp, error, TaskKind::Read);
                CycleOutcome::Failed(error)
            },
        }
    }
}

impl<T: PointData> Task for ReadTask<T> {
    fn kind(&self) -> TaskKind {
        TaskKind::Read
    }

    fn execute(&self, context: &ExecutionContext) {
        self.perform(context.scheduled_time());
    }
}

// ============================================================================
// WriteTask
// ============================================================================

/// Writes the pending value to the component and confirms it in the output state
pub struct WriteTask<T: PointData> {
    point: Weak<IoPoint<T>>,
}

impl<T: PointData> WriteTask<T> {
    pub(crate) fn new(point: Weak<IoPoint<T>>) -> Self {
        Self { point }
    }

    /// Run one write cycle
    ///
    /// A pending value stays queued while the component is disconnected and
    /// is consumed by the first write attempt, whether it succeeds or not.
    pub fn perform(&self, timestamp: Timestamp) -> CycleOutcome {
        let Some(point) = self.point.upgrade() else {
            trace!("Write task invoked after point was dropped");
            return CycleOutcome::Detached;
        };
        let pending = point.pending();
        if !pending.is_pending() {
            return CycleOutcome::Idle;
        }

        let component = point.component();
        let state = point.output_state();

        if !component.is_connected() {
            debug!(
                point = point.name(),
                component = component.name(),
                "Write pending but not connected, requesting connect"
            );
            component.request_connect(timestamp);
            state.update(timestamp, Err(IoError::NotConnected));
            return CycleOutcome::ConnectRequested;
        }

        let Some(value) = pending.take() else {
            return CycleOutcome::Idle;
        };

        match component.write_value(&value) {
            Ok(()) => {
                debug!(point = point.name(), "Wrote {:?}", value);
                state.update(timestamp, Ok(value));
                CycleOutcome::Transferred
            },
            Err(error) => {
                state.update(timestamp, Err(error));
                handle_transfer_error(&point, component, timestamp, error, TaskKind::Write);
                CycleOutcome::Failed(error)
            },
        }
    }
}

impl<T: PointData> Task for WriteTask<T> {
    fn kind(&self) -> TaskKind {
        TaskKind::Write
    }

    fn execute(&self, context: &ExecutionContext) {
        self.perform(context.scheduled_time());
    }
}
