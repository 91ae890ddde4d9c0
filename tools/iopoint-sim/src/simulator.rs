//! Cycle scheduler
//!
//! Stands in for the host scheduler: every cycle it advances the simulated
//! links, submits due setpoints and then executes each point's tasks with a
//! shared [`ExecutionContext`].
//!
//! ```text
//!  interval tick ──► device.tick ──► submit_write (due points)
//!                                          │
//!                                          ▼
//!                     read task ──► write task ──► change events ──► log
//! ```

use crate::config::SimConfig;
use crate::device::SimulatedDevice;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use voltage_iopoint::{
    Direction, ErrorCode, Event, ExecutionContext, IoPoint, Quality, Task, TimeProvider,
    Timestamp, ValueTransfer,
};

/// Counters updated from event listeners
#[derive(Debug, Default)]
pub struct SimStats {
    pub cycles: AtomicU64,
    pub changes: AtomicU64,
    pub writes_submitted: AtomicU64,
}

struct SimPoint {
    point: Arc<IoPoint<f64>>,
    device: Arc<SimulatedDevice>,
    tasks: Vec<Arc<dyn Task>>,
    write_every: Option<u64>,
}

/// Snapshot of one point for the end-of-run report
#[derive(Debug, Clone, PartialEq)]
pub struct PointSummary {
    pub name: String,
    pub direction: Direction,
    pub value: f64,
    pub quality: Quality,
    pub error: ErrorCode,
    pub update_time: Timestamp,
}

pub struct Simulator {
    points: Vec<SimPoint>,
    clock: Arc<dyn TimeProvider>,
    stats: Arc<SimStats>,
}

impl Simulator {
    pub fn new(config: &SimConfig, clock: Arc<dyn TimeProvider>) -> Result<Self> {
        let stats = Arc::new(SimStats::default());
        let mut points = Vec::with_capacity(config.points.len());

        for (index, sim_point) in config.points.iter().enumerate() {
            let device = Arc::new(SimulatedDevice::new(
                format!("sim-dev-{}", index),
                config.device,
                sim_point.initial,
                sim_point.step,
                config.seed.map(|seed| seed.wrapping_add(index as u64)),
            ));
            let point = IoPoint::with_config(
                &sim_point.point,
                Arc::clone(&device) as Arc<dyn ValueTransfer<f64>>,
            )
            .with_context(|| format!("creating point '{}'", sim_point.point.name))?;

            let tasks: Vec<Arc<dyn Task>> = ["read", "write"]
                .into_iter()
                .filter_map(|name| point.resolve_task(name))
                .collect();

            for event_name in ["changed", "write.changed"] {
                if let Some(event) = point.resolve_event(event_name) {
                    event.subscribe(change_logger(Arc::downgrade(&point), Arc::clone(&stats)));
                }
            }

            let write_every = if sim_point.directions().output {
                sim_point.write_every
            } else {
                None
            };

            points.push(SimPoint {
                point,
                device,
                tasks,
                write_every,
            });
        }

        info!(points = points.len(), "Simulator ready");
        Ok(Self {
            points,
            clock,
            stats,
        })
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn point(&self, name: &str) -> Option<&Arc<IoPoint<f64>>> {
        self.points
            .iter()
            .map(|sim_point| &sim_point.point)
            .find(|point| point.name() == name)
    }

    /// Run a single scheduler cycle
    pub fn cycle_once(&self) -> Timestamp {
        let now = self.clock.now();
        let cycle = self.stats.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let context = ExecutionContext::new(now);

        for sim_point in &self.points {
            sim_point.device.tick(now);

            if let Some(every) = sim_point.write_every {
                if cycle % every == 0 {
                    let setpoint = sim_point.device.register().round();
                    // Direction was checked when the point was set up
                    if sim_point.point.submit_write(setpoint).is_ok() {
                        self.stats.writes_submitted.fetch_add(1, Ordering::Relaxed);
                        debug!(point = sim_point.point.name(), setpoint, "Setpoint submitted");
                    }
                }
            }

            for task in &sim_point.tasks {
                task.execute(&context);
            }
        }
        now
    }

    /// Drive cycles on a fixed interval until `max_cycles` is reached
    ///
    /// Runs forever when `max_cycles` is `None`; cancel the future to stop.
    pub async fn run(&self, interval: Duration, max_cycles: Option<u64>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut executed = 0u64;
        loop {
            ticker.tick().await;
            self.cycle_once();
            executed += 1;
            if max_cycles.is_some_and(|max| executed >= max) {
                info!(cycles = executed, "Cycle limit reached");
                break;
            }
        }
    }

    /// Current state of every exposed direction of every point
    pub fn summary(&self) -> Vec<PointSummary> {
        let mut rows = Vec::new();
        for sim_point in &self.points {
            let point = &sim_point.point;
            for direction in [Direction::Input, Direction::Output] {
                if !point.directions().contains(direction) {
                    continue;
                }
                let state = point.state(direction).snapshot();
                rows.push(PointSummary {
                    name: point.name().to_string(),
                    direction,
                    value: state.value,
                    quality: state.quality,
                    error: state.error,
                    update_time: state.update_time,
                });
            }
        }
        rows
    }
}

fn change_logger(
    point: Weak<IoPoint<f64>>,
    stats: Arc<SimStats>,
) -> impl Fn(&Event) + Send + Sync + 'static {
    move |event: &Event| {
        stats.changes.fetch_add(1, Ordering::Relaxed);
        let Some(point) = point.upgrade() else {
            return;
        };
        let state = point.state(event.direction()).snapshot();
        info!(
            point = point.name(),
            direction = %event.direction(),
            value = state.value,
            quality = %state.quality,
            error = %state.error,
            error_code = state.error.code(),
            "Point changed"
        );
    }
}
