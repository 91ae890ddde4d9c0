//! I/O component contract
//!
//! The component owns the physical transport and its connection state. The
//! core only asks it to connect or disconnect and to transfer values; it
//! never retries on its own. Connection changes come back asynchronously
//! through the [`ErrorSink`]s registered with the component.

use crate::error::IoError;
use crate::time::Timestamp;
use parking_lot::RwLock;
use std::sync::Weak;
use tracing::trace;

/// Receiver of component state transitions
pub trait ErrorSink: Send + Sync {
    /// Called when the component connects (`error == None`) or loses its
    /// connection / fails to connect (`error == Some(..)`)
    fn component_state_changed(&self, timestamp: Timestamp, error: Option<IoError>);
}

/// Connection-owning component a point is attached to
///
/// `request_connect` and `request_disconnect` are fire-and-forget; completion
/// is signalled through [`ErrorSink::component_state_changed`].
pub trait IoComponent: Send + Sync {
    fn name(&self) -> &str;

    fn is_connected(&self) -> bool;

    fn request_connect(&self, timestamp: Timestamp);

    fn request_disconnect(&self, timestamp: Timestamp);

    /// Register a sink; the component must not keep it alive
    fn add_error_sink(&self, sink: Weak<dyn ErrorSink>);
}

/// Transfer primitives for one value type
///
/// Calls are synchronous and bounded by the component's own timeouts.
pub trait ValueTransfer<T>: IoComponent {
    fn read_value(&self) -> Result<T, IoError>;

    fn write_value(&self, value: &T) -> Result<(), IoError>;
}

/// Registration list for error sinks
///
/// Holds sinks weakly and drops the dead ones while notifying. Component
/// implementations embed this to satisfy [`IoComponent::add_error_sink`].
#[derive(Default)]
pub struct ErrorSinkList {
    sinks: RwLock<Vec<Weak<dyn ErrorSink>>>,
}

impl ErrorSinkList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sink: Weak<dyn ErrorSink>) {
        self.sinks.write().push(sink);
    }

    /// Number of sinks that are still alive
    pub fn len(&self) -> usize {
        self.sinks
            .read()
            .iter()
            .filter(|sink| sink.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a state transition to every live sink
    pub fn notify(&self, timestamp: Timestamp, error: Option<IoError>) {
        let live: Vec<_> = {
            let mut sinks = self.sinks.write();
            sinks.retain(|sink| sink.strong_count() > 0);
            sinks.iter().filter_map(Weak::upgrade).collect()
        };

        trace!(sinks = live.len(), ?error, "Component state changed");
        for sink in live {
            sink.component_state_changed(timestamp, error);
        }
    }
}

impl std::fmt::Debug for ErrorSinkList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorSinkList")
            .field("live", &self.len())
            .finish()
    }
}
