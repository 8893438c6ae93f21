//! Flush scheduling strategies.
//!
//! A policy decides *when* buffered updates are flushed, decoupled from the
//! bridge's guarantee *that* they eventually are. The bridge calls
//! [`DispatchPolicy::on_capture`] after buffering each foreign delta and
//! hands the policy a [`FlushHandle`] to trigger the actual flush.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default coalescing period. Broadcast hosts tend to throttle bursty
/// senders, so the default trades latency for throughput headroom.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(2000);

/// Type-erased trigger that asks the bridge to flush its outbound buffer.
#[derive(Clone)]
pub struct FlushHandle {
    trigger: Arc<dyn Fn() + Send + Sync>,
}

impl FlushHandle {
    pub(crate) fn new(trigger: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            trigger: Arc::new(trigger),
        }
    }

    /// Request a flush.
    pub fn flush(&self) {
        (self.trigger)();
    }
}

impl fmt::Debug for FlushHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FlushHandle")
    }
}

/// Decides when accumulated outbound updates are flushed.
pub trait DispatchPolicy: Send + Sync + 'static {
    /// Called after every buffered capture.
    fn on_capture(&self, flush: FlushHandle);

    /// Cancel any pending scheduled flush. Scheduled-but-unfired updates are
    /// NOT flushed here; callers that care must flush before tearing down.
    fn shutdown(&self) {}
}

/// Flush on every capture. Coalesces nothing beyond same-tick batching.
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl DispatchPolicy for Immediate {
    fn on_capture(&self, flush: FlushHandle) {
        flush.flush();
    }
}

/// Trailing-edge coalescing: at most one flush per period.
///
/// A capture schedules a flush `period` from now if none is scheduled; a
/// capture while one is pending changes nothing (no reschedule, no leading
/// flush). State machine: Idle -> (capture) -> Scheduled -> (period elapses)
/// -> flush -> Idle.
pub struct RateLimited {
    period: Duration,
    scheduled: Arc<AtomicBool>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimited {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            scheduled: Arc::new(AtomicBool::new(false)),
            pending: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for RateLimited {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT)
    }
}

impl DispatchPolicy for RateLimited {
    fn on_capture(&self, flush: FlushHandle) {
        if self.scheduled.swap(true, Ordering::AcqRel) {
            // Already Scheduled: no reschedule, no leading flush.
            return;
        }
        let scheduled = Arc::clone(&self.scheduled);
        let period = self.period;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(period).await;
            // Back to Idle before triggering, so a capture racing with the
            // flush schedules a fresh period instead of going silent.
            scheduled.store(false, Ordering::Release);
            flush.flush();
        });
        *self.pending.lock() = Some(handle);
    }

    fn shutdown(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
        self.scheduled.store(false, Ordering::Release);
    }
}
