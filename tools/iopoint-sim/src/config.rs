//! Simulator configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use voltage_iopoint::{DataType, Directions, PointConfig};

/// Top-level simulator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Scheduler period
    pub cycle_interval_ms: u64,
    /// Stop after this many cycles; run until interrupted when unset
    pub max_cycles: Option<u64>,
    /// Seed for fault injection; random when unset
    pub seed: Option<u64>,
    pub device: DeviceConfig,
    pub points: Vec<SimPointConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 1000,
            max_cycles: None,
            seed: None,
            device: DeviceConfig::default(),
            points: vec![SimPointConfig {
                point: PointConfig::new("demo.pressure", DataType::Float64),
                initial: 0.0,
                step: 0.5,
                write_every: Some(5),
            }],
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cycle_interval_ms == 0 {
            bail!("cycle_interval_ms must be greater than zero");
        }
        self.device.validate()?;
        if self.points.is_empty() {
            bail!("at least one point must be configured");
        }

        let mut seen = HashSet::new();
        for sim_point in &self.points {
            sim_point.point.validate(DataType::Float64)?;
            if !seen.insert(sim_point.point.name.as_str()) {
                bail!("duplicate point name: {}", sim_point.point.name);
            }
            if sim_point.write_every == Some(0) {
                bail!("point '{}': write_every must be at least 1", sim_point.point.name);
            }
        }
        Ok(())
    }
}

/// Behaviour of the simulated device behind each point
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Cycles between a connect request and the link coming up
    pub connect_latency_cycles: u32,
    /// Probability that a transfer fails and breaks the link
    pub failure_rate: f64,
    /// Probability that the device refuses a transfer
    pub reject_rate: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            connect_latency_cycles: 2,
            failure_rate: 0.0,
            reject_rate: 0.0,
        }
    }
}

impl DeviceConfig {
    fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("failure_rate", self.failure_rate),
            ("reject_rate", self.reject_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("device.{} must be within 0.0..=1.0, got {}", name, rate);
            }
        }
        if self.failure_rate + self.reject_rate > 1.0 {
            bail!("device.failure_rate + device.reject_rate must not exceed 1.0");
        }
        Ok(())
    }
}

/// A simulated point: its point configuration plus the register waveform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimPointConfig {
    #[serde(flatten)]
    pub point: PointConfig,
    /// Register value at startup
    #[serde(default)]
    pub initial: f64,
    /// Amount the register moves on every successful read
    #[serde(default = "default_step")]
    pub step: f64,
    /// Submit a setpoint every N cycles (output points only)
    #[serde(default)]
    pub write_every: Option<u64>,
}

fn default_step() -> f64 {
    1.0
}

impl SimPointConfig {
    pub fn directions(&self) -> Directions {
        self.point.directions
    }
}
