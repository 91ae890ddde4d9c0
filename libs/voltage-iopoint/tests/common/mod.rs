//! Test support: scripted component

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use voltage_iopoint::{
    ErrorSink, ErrorSinkList, IoComponent, IoError, PointData, Timestamp, ValueTransfer,
};

/// Component whose connection state and transfer results are scripted by the test
pub struct MockComponent<T> {
    connected: AtomicBool,
    report_disconnects: AtomicBool,
    pub connect_requests: AtomicUsize,
    pub disconnect_requests: AtomicUsize,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    read_results: Mutex<VecDeque<Result<T, IoError>>>,
    write_error: Mutex<Option<IoError>>,
    pub written: Mutex<Vec<T>>,
    sinks: ErrorSinkList,
}

impl<T: PointData> MockComponent<T> {
    pub fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            report_disconnects: AtomicBool::new(false),
            connect_requests: AtomicUsize::new(0),
            disconnect_requests: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            read_results: Mutex::new(VecDeque::new()),
            write_error: Mutex::new(None),
            written: Mutex::new(Vec::new()),
            sinks: ErrorSinkList::new(),
        })
    }

    pub fn queue_read(&self, result: Result<T, IoError>) {
        self.read_results.lock().push_back(result);
    }

    /// Notify the sinks synchronously from `request_disconnect`
    pub fn report_disconnects(&self) {
        self.report_disconnects.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, error: Option<IoError>) {
        *self.write_error.lock() = error;
    }

    /// Complete a connect and tell the sinks
    pub fn come_up(&self, timestamp: Timestamp) {
        self.connected.store(true, Ordering::SeqCst);
        self.sinks.notify(timestamp, None);
    }

    /// Lose the connection and tell the sinks
    pub fn go_down(&self, timestamp: Timestamp, error: IoError) {
        self.connected.store(false, Ordering::SeqCst);
        self.sinks.notify(timestamp, Some(error));
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn connects(&self) -> usize {
        self.connect_requests.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnect_requests.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl<T: PointData> IoComponent for MockComponent<T> {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn request_connect(&self, _timestamp: Timestamp) {
        self.connect_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        self.disconnect_requests.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if self.report_disconnects.load(Ordering::SeqCst) {
            self.sinks.notify(timestamp, Some(IoError::NotConnected));
        }
    }

    fn add_error_sink(&self, sink: Weak<dyn ErrorSink>) {
        self.sinks.add(sink);
    }
}

impl<T: PointData> ValueTransfer<T> for MockComponent<T> {
    fn read_value(&self) -> Result<T, IoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.read_results
            .lock()
            .pop_front()
            .unwrap_or(Err(IoError::Timeout))
    }

    fn write_value(&self, value: &T) -> Result<(), IoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = *self.write_error.lock() {
            return Err(error);
        }
        self.written.lock().push(value.clone());
        Ok(())
    }
}

pub fn ts(millis: i64) -> Timestamp {
    Timestamp::from_millis(millis)
}
