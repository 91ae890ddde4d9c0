//! I/O point
//!
//! An [`IoPoint`] composes an input and an output [`PointState`], the
//! component it transfers through, and the read/write tasks that drive it.
//!
//! # Name resolution
//!
//! | name                        | resolves to                                  |
//! |-----------------------------|----------------------------------------------|
//! | `updateTime`, `quality`, …  | input state attribute                        |
//! | `write.updateTime`, …       | output state attribute                       |
//! | `value`                     | input value (output value on output-only)    |
//! | `write.value`               | output value (last confirmed write)          |
//! | `valueChanged`, …           | input state event                            |
//! | `write.changed`, …          | output state event                           |
//! | `read`, `write`             | tasks                                        |
//!
//! Names of a direction the point does not expose do not resolve.

use crate::attribute::{Attribute, Direction, Directions, PointAttribute};
use crate::component::{ErrorSink, ValueTransfer};
use crate::config::PointConfig;
use crate::error::{IoError, PointError, Result};
use crate::event::EventHandle;
use crate::handle::{PendingWrite, ReadHandle, WriteHandle};
use crate::state::PointState;
use crate::task::{ReadTask, Task, TaskKind, WriteTask};
use crate::time::Timestamp;
use crate::value::{DataType, PointData};
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// A single typed I/O value bound to a component
pub struct IoPoint<T: PointData> {
    name: String,
    directions: Directions,
    component: Arc<dyn ValueTransfer<T>>,
    input: PointState<T>,
    output: PointState<T>,
    pending: Arc<PendingWrite<T>>,
    read_task: Arc<ReadTask<T>>,
    write_task: Arc<WriteTask<T>>,
}

impl<T: PointData> IoPoint<T> {
    /// Class name reported for introspection
    pub const CLASS_NAME: &'static str = "IoPoint";
    /// Stable class identifier reported for introspection
    pub const CLASS_UUID: &'static str = "6f1c2d0e-3b5a-4c8e-9a47-2e7d9b1f0c35";

    /// Create a point exposing both directions
    pub fn new(name: impl Into<String>, component: Arc<dyn ValueTransfer<T>>) -> Arc<Self> {
        Self::build(name.into(), Directions::default(), component)
    }

    /// Create a point from its configuration
    ///
    /// Fails if the configured data type does not match `T`.
    pub fn with_config(
        config: &PointConfig,
        component: Arc<dyn ValueTransfer<T>>,
    ) -> Result<Arc<Self>> {
        config.validate(T::DATA_TYPE)?;
        Ok(Self::build(
            config.name.clone(),
            config.directions,
            component,
        ))
    }

    fn build(
        name: String,
        directions: Directions,
        component: Arc<dyn ValueTransfer<T>>,
    ) -> Arc<Self> {
        let point = Arc::new_cyclic(|weak: &Weak<Self>| Self {
            name,
            directions,
            component,
            input: PointState::new(Direction::Input),
            output: PointState::new(Direction::Output),
            pending: Arc::new(PendingWrite::new()),
            read_task: Arc::new(ReadTask::new(weak.clone())),
            write_task: Arc::new(WriteTask::new(weak.clone())),
        });

        let sink: Weak<dyn ErrorSink> = Arc::downgrade(&point) as Weak<dyn ErrorSink>;
        point.component.add_error_sink(sink);

        info!(
            point = %point.name,
            component = point.component.name(),
            data_type = %T::DATA_TYPE,
            input = directions.input,
            output = directions.output,
            "Point attached"
        );
        point
    }

    // ========== Metadata ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    pub fn directions(&self) -> Directions {
        self.directions
    }

    // ========== States ==========

    pub fn input_state(&self) -> &PointState<T> {
        &self.input
    }

    pub fn output_state(&self) -> &PointState<T> {
        &self.output
    }

    pub fn state(&self, direction: Direction) -> &PointState<T> {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        }
    }

    pub(crate) fn component(&self) -> &dyn ValueTransfer<T> {
        self.component.as_ref()
    }

    pub(crate) fn pending(&self) -> &PendingWrite<T> {
        &self.pending
    }

    // ========== Tasks ==========

    pub fn read_task(&self) -> Arc<ReadTask<T>> {
        Arc::clone(&self.read_task)
    }

    pub fn write_task(&self) -> Arc<WriteTask<T>> {
        Arc::clone(&self.write_task)
    }

    /// Resolve `read` or `write` to the task of an exposed direction
    pub fn resolve_task(&self, name: &str) -> Option<Arc<dyn Task>> {
        match TaskKind::from_name(name)? {
            TaskKind::Read if self.directions.input => {
                Some(Arc::clone(&self.read_task) as Arc<dyn Task>)
            },
            TaskKind::Write if self.directions.output => {
                Some(Arc::clone(&self.write_task) as Arc<dyn Task>)
            },
            _ => None,
        }
    }

    // ========== Attributes & events ==========

    /// Resolve a point-level attribute name
    pub fn resolve_attribute(&self, name: &str) -> Option<PointAttribute> {
        let (direction, local) = Direction::split_name(name);

        if local == Attribute::VALUE {
            return self.resolve_value(direction);
        }
        if !self.directions.contains(direction) {
            return None;
        }

        self.state(direction)
            .resolve_attribute(local)
            .map(|attribute| PointAttribute {
                direction,
                attribute,
            })
    }

    /// Input and output share one physical value. Unqualified `value` reads
    /// what was last read from the device, falling back to the last confirmed
    /// write on output-only points.
    fn resolve_value(&self, direction: Direction) -> Option<PointAttribute> {
        let direction = match direction {
            Direction::Input if self.directions.input => Direction::Input,
            Direction::Input if self.directions.output => Direction::Output,
            Direction::Output if self.directions.output => Direction::Output,
            _ => return None,
        };
        Some(PointAttribute {
            direction,
            attribute: Attribute::Value,
        })
    }

    /// Resolve a point-level event name
    pub fn resolve_event(&self, name: &str) -> Option<EventHandle> {
        let (direction, local) = Direction::split_name(name);
        if !self.directions.contains(direction) {
            return None;
        }
        self.state(direction).resolve_event(local)
    }

    /// Create a read handle for a resolved attribute
    pub fn read_handle(&self, attribute: PointAttribute) -> Result<ReadHandle<T>> {
        if !self.directions.contains(attribute.direction) {
            return Err(PointError::UnknownAttribute(attribute.to_string()));
        }
        let state = self.state(attribute.direction);
        match attribute.attribute {
            Attribute::Value => Ok(state.value_read_handle()),
            other => state.read_handle(other),
        }
    }

    /// Create a write handle; only the value attribute is writable
    pub fn write_handle(&self, attribute: PointAttribute) -> Result<WriteHandle<T>> {
        if attribute.attribute != Attribute::Value {
            return Err(PointError::NotAccessible(attribute.to_string()));
        }
        if !self.directions.output {
            return Err(PointError::NotAccessible(format!(
                "{} (point '{}' is input-only)",
                attribute, self.name
            )));
        }
        Ok(WriteHandle::new(Arc::clone(&self.pending)))
    }

    /// Queue a value for the next write cycle
    pub fn submit_write(&self, value: T) -> Result<()> {
        self.write_handle(PointAttribute {
            direction: Direction::Output,
            attribute: Attribute::Value,
        })?
        .write(value);
        Ok(())
    }

    /// Whether a value is waiting for the write task
    pub fn has_pending_write(&self) -> bool {
        self.pending.is_pending()
    }
}

impl<T: PointData> ErrorSink for IoPoint<T> {
    fn component_state_changed(&self, timestamp: Timestamp, error: Option<IoError>) {
        match error {
            Some(error) => {
                debug!(point = %self.name, "Component down: {}", error);
                self.input.update(timestamp, Err(error));
                self.output.update(timestamp, Err(error));
            },
            // The next read cycle brings a fresh value
            None => debug!(point = %self.name, "Component up"),
        }
    }
}

impl<T: PointData> std::fmt::Debug for IoPoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoPoint")
            .field("name", &self.name)
            .field("data_type", &T::DATA_TYPE)
            .field("directions", &self.directions)
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}
