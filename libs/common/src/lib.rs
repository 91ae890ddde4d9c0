//! `VoltageEMS` basic library (basic library)
//!
//! Provides basic functions shared by all tools, including:
//! - logging functions
//! - configuration loading

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
