//! Overall progress across concurrently running scale tasks.
//!
//! Each task owns one slot holding its completed fraction. The overall value
//! is the equal-weight mean of all slots. Slots only move forward, so the
//! overall value never decreases even when reports from different workers
//! interleave.
use log::warn;
use std::sync::{Mutex, PoisonError};

/// Receives per-task progress from worker threads.
pub trait ProgressSink: Sync {
    /// `fraction` is the completed share of task `task_index`, in `[0, 1]`.
    fn report(&self, task_index: usize, fraction: f64);
}

/// Sink that drops every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _task_index: usize, _fraction: f64) {}
}

type Listener = Box<dyn Fn(f64) + Send + Sync>;

/// Thread-safe aggregator forwarding the overall fraction to a listener.
pub struct ProgressAggregator {
    fractions: Mutex<Vec<f64>>,
    listener: Option<Listener>,
}

impl ProgressAggregator {
    pub fn new(task_count: usize) -> Self {
        Self {
            fractions: Mutex::new(vec![0.0; task_count]),
            listener: None,
        }
    }

    /// Listener is called with the overall fraction after every accepted report.
    pub fn with_listener(mut self, listener: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn task_count(&self) -> usize {
        self.lock().len()
    }

    pub fn current_overall(&self) -> f64 {
        overall(&self.lock())
    }

    /// Mark every task complete and publish `1.0`.
    pub fn finish(&self) {
        let mut slots = self.lock();
        slots.iter_mut().for_each(|f| *f = 1.0);
        if let Some(listener) = &self.listener {
            listener(1.0);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<f64>> {
        self.fractions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProgressSink for ProgressAggregator {
    fn report(&self, task_index: usize, fraction: f64) {
        let mut slots = self.lock();
        let Some(slot) = slots.get_mut(task_index) else {
            warn!(
                "progress report for task {task_index} ignored; only {} tasks registered",
                slots.len()
            );
            return;
        };
        if fraction.is_nan() {
            return;
        }
        *slot = slot.max(fraction.clamp(0.0, 1.0));
        // Listener runs under the lock so published values stay ordered.
        if let Some(listener) = &self.listener {
            listener(overall(&slots));
        }
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("fractions", &*self.lock())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

fn overall(slots: &[f64]) -> f64 {
    if slots.is_empty() {
        return 0.0;
    }
    slots.iter().sum::<f64>() / slots.len() as f64
}
