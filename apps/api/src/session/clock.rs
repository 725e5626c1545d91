//! Countdown primitive. Knows nothing about questions or interviews.
//!
//! Each `start` spawns one tokio task that reports a `Tick` per elapsed second
//! and a single `Expired` when the countdown reaches zero. Once a handle is
//! cancelled the task never calls the sink again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClockHandleId(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick {
        handle: ClockHandleId,
        remaining_seconds: u32,
    },
    Expired {
        handle: ClockHandleId,
    },
}

impl ClockEvent {
    pub fn handle(&self) -> ClockHandleId {
        match self {
            ClockEvent::Tick { handle, .. } | ClockEvent::Expired { handle } => *handle,
        }
    }
}

pub type ClockSink = Arc<dyn Fn(ClockEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct Clock {
    tick: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

impl Clock {
    /// Starts a countdown of `duration_seconds` ticks. Must be called inside a tokio runtime.
    pub fn start(&self, duration_seconds: u32, sink: ClockSink) -> ClockHandle {
        let id = ClockHandleId(Uuid::new_v4());
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let tick = self.tick;

        let task = tokio::spawn(async move {
            let mut remaining = duration_seconds;
            let mut ticker = interval_at(Instant::now() + tick, tick);
            while remaining > 0 {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    return;
                }
                remaining -= 1;
                if remaining > 0 {
                    sink(ClockEvent::Tick {
                        handle: id,
                        remaining_seconds: remaining,
                    });
                }
            }
            if !flag.load(Ordering::Acquire) {
                sink(ClockEvent::Expired { handle: id });
            }
        });

        ClockHandle {
            id,
            cancelled,
            task: task.abort_handle(),
        }
    }
}

/// Owner of one running countdown. Dropping the handle cancels it.
#[derive(Debug)]
pub struct ClockHandle {
    id: ClockHandleId,
    cancelled: Arc<AtomicBool>,
    task: AbortHandle,
}

impl ClockHandle {
    pub fn id(&self) -> ClockHandleId {
        self.id
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }

    #[cfg(test)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
