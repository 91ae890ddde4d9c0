//! Simulated device
//!
//! One register behind a link that takes a configurable number of cycles to
//! come up and can be told to fail or refuse transfers at random.

use crate::config::DeviceConfig;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Weak;
use tracing::{debug, info};
use voltage_iopoint::{
    ErrorSink, ErrorSinkList, IoComponent, IoError, Timestamp, ValueTransfer,
};

/// Device-side code reported for an injected transfer failure
pub const FAULT_CODE: i32 = 1;
/// Device-side code reported for an injected rejection
pub const REJECT_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Down,
    Connecting { remaining: u32 },
    Up,
}

pub struct SimulatedDevice {
    name: String,
    config: DeviceConfig,
    link: Mutex<Link>,
    register: Mutex<f64>,
    step: f64,
    rng: Mutex<StdRng>,
    sinks: ErrorSinkList,
}

impl SimulatedDevice {
    pub fn new(
        name: impl Into<String>,
        config: DeviceConfig,
        initial: f64,
        step: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: name.into(),
            config,
            link: Mutex::new(Link::Down),
            register: Mutex::new(initial),
            step,
            rng: Mutex::new(rng),
            sinks: ErrorSinkList::new(),
        }
    }

    /// Advance a pending connect by one cycle
    pub fn tick(&self, timestamp: Timestamp) {
        let came_up = {
            let mut link = self.link.lock();
            match *link {
                Link::Connecting { remaining } if remaining <= 1 => {
                    *link = Link::Up;
                    true
                },
                Link::Connecting { remaining } => {
                    *link = Link::Connecting {
                        remaining: remaining - 1,
                    };
                    false
                },
                Link::Down | Link::Up => false,
            }
        };

        if came_up {
            info!(device = %self.name, "Link up");
            self.sinks.notify(timestamp, None);
        }
    }

    pub fn register(&self) -> f64 {
        *self.register.lock()
    }

    fn inject_fault(&self) -> Option<IoError> {
        let roll: f64 = self.rng.lock().gen();
        if roll < self.config.failure_rate {
            Some(IoError::TransferFailed { code: FAULT_CODE })
        } else if roll < self.config.failure_rate + self.config.reject_rate {
            Some(IoError::Rejected { code: REJECT_CODE })
        } else {
            None
        }
    }
}

impl IoComponent for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected(&self) -> bool {
        *self.link.lock() == Link::Up
    }

    fn request_connect(&self, timestamp: Timestamp) {
        let came_up = {
            let mut link = self.link.lock();
            match *link {
                Link::Down if self.config.connect_latency_cycles == 0 => {
                    *link = Link::Up;
                    true
                },
                Link::Down => {
                    debug!(device = %self.name, "Connecting");
                    *link = Link::Connecting {
                        remaining: self.config.connect_latency_cycles,
                    };
                    false
                },
                Link::Connecting { .. } | Link::Up => false,
            }
        };

        if came_up {
            info!(device = %self.name, "Link up");
            self.sinks.notify(timestamp, None);
        }
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        let was = std::mem::replace(&mut *self.link.lock(), Link::Down);
        if was != Link::Down {
            info!(device = %self.name, "Link down");
            self.sinks.notify(timestamp, Some(IoError::NotConnected));
        }
    }

    fn add_error_sink(&self, sink: Weak<dyn ErrorSink>) {
        self.sinks.add(sink);
    }
}

impl ValueTransfer<f64> for SimulatedDevice {
    fn read_value(&self) -> Result<f64, IoError> {
        if !self.is_connected() {
            return Err(IoError::NotConnected);
        }
        if let Some(error) = self.inject_fault() {
            return Err(error);
        }
        let mut register = self.register.lock();
        *register += self.step;
        Ok(*register)
    }

    fn write_value(&self, value: &f64) -> Result<(), IoError> {
        if !self.is_connected() {
            return Err(IoError::NotConnected);
        }
        if let Some(error) = self.inject_fault() {
            return Err(error);
        }
        *self.register.lock() = *value;
        Ok(())
    }
}
