//! Environment signal capability: fullscreen, page visibility and window focus.
//!
//! The engine only sees `SignalSource`; the HTTP layer feeds the in-process
//! `BroadcastSignalSource` from the browser's reports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Fullscreen,
    Visibility,
    Focus,
}

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Fullscreen, SignalKind::Visibility, SignalKind::Focus];
}

/// A state transition reported by the candidate's environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum EnvironmentSignal {
    Fullscreen { active: bool },
    Visibility { hidden: bool },
    Focus { focused: bool },
}

impl EnvironmentSignal {
    pub fn kind(&self) -> SignalKind {
        match self {
            EnvironmentSignal::Fullscreen { .. } => SignalKind::Fullscreen,
            EnvironmentSignal::Visibility { .. } => SignalKind::Visibility,
            EnvironmentSignal::Focus { .. } => SignalKind::Focus,
        }
    }
}

pub type SignalCallback = Arc<dyn Fn(EnvironmentSignal) + Send + Sync>;

pub trait SignalSource: Send + Sync {
    fn subscribe(&self, kind: SignalKind, callback: SignalCallback) -> Subscription;
}

/// Unsubscribes when dropped or when `unsubscribe` is called.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_kind: HashMap<SignalKind, Vec<(u64, SignalCallback)>>,
}

/// Fan-out source for one session. Callbacks run on the publisher's thread.
#[derive(Clone, Default)]
pub struct BroadcastSignalSource {
    listeners: Arc<Mutex<Listeners>>,
}

impl BroadcastSignalSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` to every subscriber of its kind. Returns how many were notified.
    pub fn publish(&self, signal: EnvironmentSignal) -> usize {
        // Snapshot so callbacks run without the lock held.
        let callbacks: Vec<SignalCallback> = {
            let listeners = self.lock();
            listeners
                .by_kind
                .get(&signal.kind())
                .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        for callback in &callbacks {
            callback(signal);
        }
        callbacks.len()
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        self.lock().by_kind.get(&kind).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SignalSource for BroadcastSignalSource {
    fn subscribe(&self, kind: SignalKind, callback: SignalCallback) -> Subscription {
        let id = {
            let mut listeners = self.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.by_kind.entry(kind).or_default().push((id, callback));
            id
        };

        let weak: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                let mut listeners = listeners.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(subs) = listeners.by_kind.get_mut(&kind) {
                    subs.retain(|(sub_id, _)| *sub_id != id);
                }
            }
        })
    }
}
