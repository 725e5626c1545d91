//! Integrity monitor: turns environment signals into violation log entries.
//!
//! Policy:
//! - fullscreen exit during an active question → `fullscreen_exit`, terminate after grace
//! - page hidden during an active question → `tab_change`, terminate after grace
//! - window blur during an active question → `window_blur`, logged only
//!
//! In `practice` mode every violation is logged only. The monitor flags; it never
//! decides the outcome of the interview.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::session::models::{InterviewMode, TerminationReason, Violation, ViolationKind};
use crate::session::signals::{
    EnvironmentSignal, SignalCallback, SignalKind, SignalSource, Subscription,
};

/// The question the candidate is currently answering. `number` is 1-based.
#[derive(Debug, Clone, Copy)]
pub struct ActiveQuestion<'a> {
    pub number: usize,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorAction {
    /// Signal is not a violation, or arrived with no active question.
    Ignore,
    Logged(ViolationKind),
    TerminateAfterGrace(TerminationReason),
}

pub struct IntegrityMonitor {
    mode: InterviewMode,
    subscriptions: Vec<Subscription>,
}

impl IntegrityMonitor {
    pub fn new(mode: InterviewMode) -> Self {
        Self {
            mode,
            subscriptions: Vec::new(),
        }
    }

    /// Subscribes `sink` to all three signal kinds for the session's lifetime.
    pub fn attach(&mut self, source: &dyn SignalSource, sink: SignalCallback) {
        self.detach();
        self.subscriptions = SignalKind::ALL
            .into_iter()
            .map(|kind| source.subscribe(kind, sink.clone()))
            .collect();
    }

    pub fn detach(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Applies the policy to one signal, appending to `log` when it is a violation.
    pub fn evaluate(
        &self,
        signal: EnvironmentSignal,
        active: Option<ActiveQuestion<'_>>,
        log: &mut Vec<Violation>,
        now: DateTime<Utc>,
    ) -> MonitorAction {
        let Some((kind, terminating)) = classify(signal) else {
            return MonitorAction::Ignore;
        };
        let Some(active) = active else {
            debug!(kind = kind.as_str(), "violation signal outside an active question ignored");
            return MonitorAction::Ignore;
        };

        log.push(Violation {
            kind,
            timestamp: now,
            question_number: active.number,
            question_text: active.text.to_string(),
        });
        warn!(
            kind = kind.as_str(),
            question_number = active.number,
            total = log.len(),
            "integrity violation recorded"
        );

        if terminating && self.mode == InterviewMode::Proctored {
            MonitorAction::TerminateAfterGrace(TerminationReason::Violation { kind })
        } else {
            MonitorAction::Logged(kind)
        }
    }
}

impl Drop for IntegrityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Maps a signal to its violation kind and whether it warrants termination.
fn classify(signal: EnvironmentSignal) -> Option<(ViolationKind, bool)> {
    match signal {
        EnvironmentSignal::Fullscreen { active: false } => {
            Some((ViolationKind::FullscreenExit, true))
        }
        EnvironmentSignal::Visibility { hidden: true } => Some((ViolationKind::TabChange, true)),
        EnvironmentSignal::Focus { focused: false } => Some((ViolationKind::WindowBlur, false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::signals::BroadcastSignalSource;
    use std::sync::{Arc, Mutex};

    fn active() -> Option<ActiveQuestion<'static>> {
        Some(ActiveQuestion {
            number: 2,
            text: "What is a lifetime?",
        })
    }

    #[test]
    fn test_fullscreen_exit_terminates_in_proctored_mode() {
        let monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        let mut log = Vec::new();
        let action = monitor.evaluate(
            EnvironmentSignal::Fullscreen { active: false },
            active(),
            &mut log,
            Utc::now(),
        );

        assert_eq!(
            action,
            MonitorAction::TerminateAfterGrace(TerminationReason::Violation {
                kind: ViolationKind::FullscreenExit
            })
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].question_number, 2);
        assert_eq!(log[0].question_text, "What is a lifetime?");
    }

    #[test]
    fn test_tab_change_terminates() {
        let monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        let mut log = Vec::new();
        let action = monitor.evaluate(
            EnvironmentSignal::Visibility { hidden: true },
            active(),
            &mut log,
            Utc::now(),
        );
        assert!(matches!(action, MonitorAction::TerminateAfterGrace(_)));
        assert_eq!(log[0].kind, ViolationKind::TabChange);
    }

    #[test]
    fn test_window_blur_is_logged_only() {
        let monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        let mut log = Vec::new();
        let action = monitor.evaluate(
            EnvironmentSignal::Focus { focused: false },
            active(),
            &mut log,
            Utc::now(),
        );
        assert_eq!(action, MonitorAction::Logged(ViolationKind::WindowBlur));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_practice_mode_never_terminates() {
        let monitor = IntegrityMonitor::new(InterviewMode::Practice);
        let mut log = Vec::new();
        let action = monitor.evaluate(
            EnvironmentSignal::Fullscreen { active: false },
            active(),
            &mut log,
            Utc::now(),
        );
        assert_eq!(action, MonitorAction::Logged(ViolationKind::FullscreenExit));
    }

    #[test]
    fn test_recovery_signals_are_not_violations() {
        let monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        let mut log = Vec::new();
        for signal in [
            EnvironmentSignal::Fullscreen { active: true },
            EnvironmentSignal::Visibility { hidden: false },
            EnvironmentSignal::Focus { focused: true },
        ] {
            assert_eq!(
                monitor.evaluate(signal, active(), &mut log, Utc::now()),
                MonitorAction::Ignore
            );
        }
        assert!(log.is_empty());
    }

    #[test]
    fn test_no_active_question_records_nothing() {
        let monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        let mut log = Vec::new();
        let action = monitor.evaluate(
            EnvironmentSignal::Visibility { hidden: true },
            None,
            &mut log,
            Utc::now(),
        );
        assert_eq!(action, MonitorAction::Ignore);
        assert!(log.is_empty());
    }

    #[test]
    fn test_attach_subscribes_every_kind_and_detach_releases() {
        let source = BroadcastSignalSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let mut monitor = IntegrityMonitor::new(InterviewMode::Proctored);
        monitor.attach(
            &source,
            Arc::new(move |signal| sink_seen.lock().unwrap().push(signal)),
        );

        for kind in SignalKind::ALL {
            assert_eq!(source.subscriber_count(kind), 1);
        }
        source.publish(EnvironmentSignal::Focus { focused: false });
        assert_eq!(seen.lock().unwrap().len(), 1);

        monitor.detach();
        assert!(!monitor.is_attached());
        for kind in SignalKind::ALL {
            assert_eq!(source.subscriber_count(kind), 0);
        }
    }
}
