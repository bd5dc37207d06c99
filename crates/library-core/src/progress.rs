//! Simulated upload progress.
//!
//! The percentage only measures elapsed time while the insert command is in
//! flight, not transferred bytes.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::trace;

pub const COMPLETE: u8 = 100;

/// Read side of the progress bar.
#[derive(Debug, Clone, Default)]
pub struct ProgressMeter {
    percent: Arc<AtomicU8>,
    ticks: Arc<AtomicU32>,
}

impl ProgressMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    /// Number of timer ticks observed since the meter was created.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub(crate) fn set(&self, percent: u8) {
        self.percent.store(percent.min(COMPLETE), Ordering::SeqCst);
    }

    fn tick(&self, step: u8) -> u8 {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        let next = self.percent().saturating_add(step).min(COMPLETE);
        self.set(next);
        next
    }
}

/// Advances a [`ProgressMeter`] by `step` every `period` until it is full.
/// The task is aborted when the timer is stopped or dropped.
#[derive(Debug)]
pub struct ProgressTimer {
    handle: JoinHandle<()>,
}

impl ProgressTimer {
    /// Must be called from within a tokio runtime.
    pub fn start(meter: ProgressMeter, period: Duration, step: u8) -> Self {
        let step = step.max(1);
        let period = period.max(Duration::from_millis(1));
        let first_tick = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(first_tick, period);
            loop {
                interval.tick().await;
                let percent = meter.tick(step);
                trace!(percent, "upload progress");
                if percent >= COMPLETE {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
