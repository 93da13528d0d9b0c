//! Upload progress reporting.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Progress of a single upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Rounded percentage in `0..=100`.
    pub percent: u8,
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Bytes expected in total.
    pub total: u64,
}

impl ProgressEvent {
    /// Translates a transport tick into a progress event.
    ///
    /// Returns `None` when the total is unknown or zero. The percentage is
    /// rounded half away from zero and clamped to `0..=100`.
    pub fn from_tick(tick: ProgressTick) -> Option<Self> {
        let total = tick.total.filter(|total| *total > 0)?;
        let ratio = tick.loaded as f64 / total as f64;
        let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;

        Some(Self {
            percent,
            loaded: tick.loaded,
            total,
        })
    }
}

/// Low-level progress notification emitted by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTick {
    /// Bytes transferred so far.
    pub loaded: u64,
    /// Bytes expected in total, if known.
    pub total: Option<u64>,
}

impl ProgressTick {
    /// Creates a new tick.
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        Self { loaded, total }
    }
}

/// Callback receiving [`ProgressEvent`]s.
///
/// Handlers run inline on the task that drives the request body, so they
/// should return quickly.
#[derive(Clone)]
pub struct ProgressHandler {
    inner: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
}

impl ProgressHandler {
    /// Wraps a callback.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// Invokes the callback.
    pub fn emit(&self, event: ProgressEvent) {
        (self.inner)(event);
    }
}

impl fmt::Debug for ProgressHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHandler").finish_non_exhaustive()
    }
}

/// Callback receiving raw [`ProgressTick`]s from a transport.
#[derive(Clone)]
pub struct TickHandler {
    inner: Arc<dyn Fn(ProgressTick) + Send + Sync>,
}

impl TickHandler {
    /// Wraps a callback.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(ProgressTick) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(handler),
        }
    }

    /// Forwards ticks with a known total to `handler` as progress events.
    pub fn translating(handler: ProgressHandler) -> Self {
        Self::new(move |tick| {
            if let Some(event) = ProgressEvent::from_tick(tick) {
                handler.emit(event);
            }
        })
    }

    /// Reports a tick.
    pub fn tick(&self, loaded: u64, total: Option<u64>) {
        (self.inner)(ProgressTick::new(loaded, total));
    }
}

impl fmt::Debug for TickHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickHandler").finish_non_exhaustive()
    }
}
