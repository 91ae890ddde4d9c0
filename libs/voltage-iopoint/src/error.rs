//! Error types for voltage-iopoint
//!
//! Two kinds of errors live here:
//! - [`IoError`]: transfer and connection faults reported by a component.
//!   These are never propagated as faults; they are recorded in the point
//!   state as an [`ErrorCode`] with bad quality.
//! - [`PointError`]: resolution and configuration errors.

use crate::value::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fault reported by an I/O component for a connect, read or write
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoError {
    #[error("Component is not connected")]
    NotConnected,

    #[error("Transfer failed (code {code})")]
    TransferFailed { code: i32 },

    #[error("Transfer timed out")]
    Timeout,

    /// The device answered but refused the request (e.g. illegal value)
    #[error("Request rejected by device (code {code})")]
    Rejected { code: i32 },
}

impl IoError {
    /// Whether this error means the connection can no longer be trusted
    ///
    /// A rejection is a well-formed answer from the device, so the link is
    /// still healthy. Everything else requires the component to reconnect.
    pub fn invalidates_connection(&self) -> bool {
        !matches!(self, IoError::Rejected { .. })
    }
}

// ========== Numeric error categories ==========

const CATEGORY_NONE: i64 = 0;
const CATEGORY_NOT_CONNECTED: i64 = 1;
const CATEGORY_TIMEOUT: i64 = 2;
const CATEGORY_TRANSFER_FAILED: i64 = 3;
const CATEGORY_REJECTED: i64 = 4;

/// Error code stored in the point state
///
/// `None` means no error; every other value goes with bad quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorCode {
    None,
    #[default]
    NotConnected,
    TransferFailed {
        code: i32,
    },
    Timeout,
    Rejected {
        code: i32,
    },
}

impl ErrorCode {
    /// Numeric representation exported through the `error` attribute
    ///
    /// ```text
    ///  63            32 31             0
    /// ┌────────────────┬────────────────┐
    /// │    category    │  device code   │
    /// └────────────────┴────────────────┘
    /// ```
    ///
    /// The device code is stored as its raw 32-bit pattern, so negative codes
    /// round-trip through [`ErrorCode::from_code`].
    pub fn code(&self) -> i64 {
        let (category, device) = match self {
            ErrorCode::None => (CATEGORY_NONE, 0),
            ErrorCode::NotConnected => (CATEGORY_NOT_CONNECTED, 0),
            ErrorCode::Timeout => (CATEGORY_TIMEOUT, 0),
            ErrorCode::TransferFailed { code } => (CATEGORY_TRANSFER_FAILED, *code),
            ErrorCode::Rejected { code } => (CATEGORY_REJECTED, *code),
        };
        (category << 32) | i64::from(device as u32)
    }

    /// Decode a value produced by [`ErrorCode::code`]
    pub fn from_code(value: i64) -> Option<Self> {
        let device = (value & 0xFFFF_FFFF) as u32 as i32;
        match (value >> 32, device) {
            (CATEGORY_NONE, 0) => Some(ErrorCode::None),
            (CATEGORY_NOT_CONNECTED, 0) => Some(ErrorCode::NotConnected),
            (CATEGORY_TIMEOUT, 0) => Some(ErrorCode::Timeout),
            (CATEGORY_TRANSFER_FAILED, code) => Some(ErrorCode::TransferFailed { code }),
            (CATEGORY_REJECTED, code) => Some(ErrorCode::Rejected { code }),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ErrorCode::None)
    }
}

impl From<IoError> for ErrorCode {
    fn from(err: IoError) -> Self {
        match err {
            IoError::NotConnected => ErrorCode::NotConnected,
            IoError::TransferFailed { code } => ErrorCode::TransferFailed { code },
            IoError::Timeout => ErrorCode::Timeout,
            IoError::Rejected { code } => ErrorCode::Rejected { code },
        }
    }
}

impl From<Option<IoError>> for ErrorCode {
    fn from(err: Option<IoError>) -> Self {
        err.map_or(ErrorCode::None, ErrorCode::from)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::None => f.write_str("none"),
            ErrorCode::NotConnected => f.write_str("not connected"),
            ErrorCode::TransferFailed { code } => write!(f, "transfer failed ({})", code),
            ErrorCode::Timeout => f.write_str("timeout"),
            ErrorCode::Rejected { code } => write!(f, "rejected ({})", code),
        }
    }
}

/// Resolution errors for attributes and handles, plus point configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The attribute exists but is not available through this kind of handle
    #[error("Attribute not accessible: {0}")]
    NotAccessible(String),

    #[error("Invalid point configuration: {0}")]
    InvalidConfig(String),

    #[error("Data type mismatch for point {point}: configured {configured}, expected {expected}")]
    DataTypeMismatch {
        point: String,
        configured: DataType,
        expected: DataType,
    },
}

pub type Result<T> = std::result::Result<T, PointError>;
