//! VoltageEMS I/O Point Runtime
//!
//! State-and-task engine shared by every driver I/O point.
//!
//! # Key Components
//!
//! - **StateCell**: double-buffered value/quality/error storage with lock-free reads
//! - **ChangeEventSet**: value/quality/changed events fired after each commit
//! - **PointState**: attribute-addressed façade over one direction's cell and events
//! - **IoPoint**: input + output state bound to a connection-owning component
//! - **ReadTask / WriteTask**: per-cycle state machines invoked by the scheduler
//!
//! # Data flow
//!
//! ```text
//! scheduler ──execute──► ReadTask/WriteTask ──read/write──► component
//!                               │
//!                               ▼ update(ts, value | error)
//!                          PointState ──commit──► StateCell ◄── readers (lock-free)
//!                               │
//!                               ▼ notify(mask)
//!                         ChangeEventSet ──fire──► listeners
//! ```

pub mod attribute;
pub mod cell;
pub mod component;
pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod point;
pub mod state;
pub mod task;
pub mod time;
pub mod value;

// Re-exports
pub use attribute::{Attribute, Direction, Directions, EventKind, PointAttribute};
pub use cell::StateCell;
pub use component::{ErrorSink, ErrorSinkList, IoComponent, ValueTransfer};
pub use config::PointConfig;
pub use error::{ErrorCode, IoError, PointError, Result};
pub use event::{ChangeEventSet, Event, EventHandle, EventListener, SubscriptionId};
pub use handle::{PendingWrite, ReadHandle, WriteHandle};
pub use point::IoPoint;
pub use state::PointState;
pub use task::{CycleOutcome, ExecutionContext, ReadTask, Task, TaskKind, WriteTask};
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider, Timestamp};
pub use value::{ChangeMask, DataType, DataValue, PointData, PointValue, Quality};
