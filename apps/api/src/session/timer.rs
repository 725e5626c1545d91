use tracing::debug;

use crate::session::clock::{Clock, ClockEvent, ClockHandle, ClockHandleId, ClockSink};
use crate::session::error::SessionError;
use crate::session::models::Question;

/// What a clock event means for the question currently being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Tick {
        question_index: usize,
        remaining_seconds: u32,
    },
    Expired {
        question_index: usize,
    },
    /// Event from a handle that was disarmed or replaced; must be ignored.
    Stale,
}

struct ArmedQuestion {
    handle: ClockHandle,
    question_index: usize,
    remaining_seconds: u32,
}

/// Binds one clock countdown to the active question. At most one is armed at a time.
pub struct QuestionTimer {
    clock: Clock,
    sink: ClockSink,
    armed: Option<ArmedQuestion>,
}

impl QuestionTimer {
    pub fn new(clock: Clock, sink: ClockSink) -> Self {
        Self {
            clock,
            sink,
            armed: None,
        }
    }

    pub fn arm(
        &mut self,
        question_index: usize,
        question: &Question,
    ) -> Result<ClockHandleId, SessionError> {
        if let Some(armed) = &self.armed {
            return Err(SessionError::AlreadyArmed {
                question_number: armed.question_index + 1,
            });
        }

        let handle = self
            .clock
            .start(question.time_limit_seconds, self.sink.clone());
        let id = handle.id();
        self.armed = Some(ArmedQuestion {
            handle,
            question_index,
            remaining_seconds: question.time_limit_seconds,
        });
        debug!(
            question_number = question_index + 1,
            time_limit = question.time_limit_seconds,
            "question timer armed"
        );
        Ok(id)
    }

    /// Cancels the active countdown without raising expiry. Returns the seconds left.
    pub fn disarm(&mut self) -> Option<u32> {
        let armed = self.armed.take()?;
        armed.handle.cancel();
        Some(armed.remaining_seconds)
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.armed.as_ref().map(|a| a.remaining_seconds)
    }

    #[cfg(test)]
    pub fn active_handle(&self) -> Option<ClockHandleId> {
        self.armed.as_ref().map(|a| a.handle.id())
    }

    /// Interprets a clock event against the armed handle.
    ///
    /// Expiry consumes the armed slot, so a second expiry for the same handle is stale.
    pub fn on_clock_event(&mut self, event: ClockEvent) -> TimerSignal {
        let matches = self
            .armed
            .as_ref()
            .is_some_and(|a| a.handle.id() == event.handle());
        if !matches {
            return TimerSignal::Stale;
        }

        match event {
            ClockEvent::Tick {
                remaining_seconds, ..
            } => match self.armed.as_mut() {
                Some(armed) => {
                    armed.remaining_seconds = remaining_seconds;
                    TimerSignal::Tick {
                        question_index: armed.question_index,
                        remaining_seconds,
                    }
                }
                None => TimerSignal::Stale,
            },
            ClockEvent::Expired { .. } => match self.armed.take() {
                Some(armed) => TimerSignal::Expired {
                    question_index: armed.question_index,
                },
                None => TimerSignal::Stale,
            },
        }
    }
}
