//! Session controller: the single owner of an `Interview`.
//!
//! States: collecting_info → confirming → interviewing → {completed | terminated}.
//!
//! Every mutation runs on the session's event queue (see `runtime`), one event at
//! a time. Timer expiry and manual submission both funnel through `accept`, which
//! enforces one response per question index; whichever is processed first wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::scoring::{ResponseScorer, ScoreOutcome};
use crate::session::clock::{Clock, ClockEvent, ClockSink};
use crate::session::error::SessionError;
use crate::session::models::{
    Interview, InterviewStatus, Question, Response, TerminationReason, NO_RESPONSE_TEXT,
};
use crate::session::monitor::{ActiveQuestion, IntegrityMonitor, MonitorAction};
use crate::session::observer::SessionObserver;
use crate::session::profile::ProfileField;
use crate::session::report::{FinalReport, ReportAggregator, SCORING_UNAVAILABLE_FEEDBACK};
use crate::session::signals::{EnvironmentSignal, SignalSource};
use crate::session::timer::{QuestionTimer, TimerSignal};

/// Asynchronous inputs that reach the controller through its event queue.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Clock(ClockEvent),
    Signal(EnvironmentSignal),
    GraceElapsed { reason: TerminationReason },
}

/// Enqueues an event on the owning session's queue.
pub type EngineSink = Arc<dyn Fn(EngineEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Delay between a terminating violation and the termination itself.
    pub grace_delay: Duration,
    /// Upper bound on one scoring call.
    pub scoring_timeout: Duration,
    /// Upper bound on one observer notification.
    pub persist_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            grace_delay: Duration::from_millis(1500),
            scoring_timeout: Duration::from_secs(20),
            persist_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub scorer: Arc<dyn ResponseScorer>,
    pub observer: Arc<dyn SessionObserver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitKind {
    Manual,
    Auto,
}

#[derive(Debug, Clone)]
struct Draft {
    question_index: usize,
    text: String,
}

/// Read-only view handed to API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub interview: Interview,
    pub current_question_index: Option<usize>,
    pub remaining_seconds: Option<u32>,
    pub missing_fields: Vec<ProfileField>,
    pub termination_pending: bool,
    pub report: Option<FinalReport>,
}

pub struct SessionController {
    interview: Interview,
    current_index: usize,
    timer: QuestionTimer,
    monitor: IntegrityMonitor,
    draft: Option<Draft>,
    termination_pending: bool,
    report: Option<FinalReport>,
    collaborators: Collaborators,
    settings: EngineSettings,
    sink: EngineSink,
}

impl SessionController {
    pub fn new(
        interview: Interview,
        collaborators: Collaborators,
        settings: EngineSettings,
        clock: Clock,
        sink: EngineSink,
    ) -> Self {
        let clock_sink: ClockSink = {
            let sink = Arc::clone(&sink);
            Arc::new(move |event| sink(EngineEvent::Clock(event)))
        };
        Self {
            monitor: IntegrityMonitor::new(interview.mode),
            timer: QuestionTimer::new(clock, clock_sink),
            interview,
            current_index: 0,
            draft: None,
            termination_pending: false,
            report: None,
            collaborators,
            settings,
            sink,
        }
    }

    /// Routes the environment's fullscreen/visibility/focus signals into this session.
    pub fn attach_signals(&mut self, source: &dyn SignalSource) {
        let sink = Arc::clone(&self.sink);
        self.monitor
            .attach(source, Arc::new(move |signal| sink(EngineEvent::Signal(signal))));
    }

    pub fn is_finished(&self) -> bool {
        self.interview.status.is_terminal()
    }

    pub fn current_question_index(&self) -> Option<usize> {
        (self.interview.status == InterviewStatus::Interviewing).then_some(self.current_index)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            interview: self.interview.clone(),
            current_question_index: self.current_question_index(),
            remaining_seconds: self.timer.remaining_seconds(),
            missing_fields: self.interview.candidate.missing_fields(),
            termination_pending: self.termination_pending,
            report: self.report.clone(),
        }
    }

    // ── info collection ────────────────────────────────────────────────────

    /// Sets one candidate field. Returns the fields still missing.
    pub fn provide_field(
        &mut self,
        field: ProfileField,
        value: &str,
    ) -> Result<Vec<ProfileField>, SessionError> {
        match self.interview.status {
            InterviewStatus::CollectingInfo | InterviewStatus::Confirming => {}
            status => {
                return Err(SessionError::InvalidTransition {
                    status,
                    action: "update the candidate profile",
                })
            }
        }

        self.interview.candidate.set(field, value)?;
        let missing = self.interview.candidate.missing_fields();
        self.interview.status = if missing.is_empty() {
            InterviewStatus::Confirming
        } else {
            InterviewStatus::CollectingInfo
        };
        Ok(missing)
    }

    /// Enters `interviewing` with a fixed question list and times the first question.
    pub fn start_interview(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if self.interview.status != InterviewStatus::Confirming {
            return Err(SessionError::InvalidTransition {
                status: self.interview.status,
                action: "start the interview",
            });
        }
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        self.interview.questions = questions;
        self.current_index = 0;
        self.timer.arm(0, &self.interview.questions[0])?;
        self.interview.status = InterviewStatus::Interviewing;
        self.interview.started_at = Some(Utc::now());

        info!(
            interview_id = %self.interview.id,
            questions = self.interview.questions.len(),
            mode = ?self.interview.mode,
            "interview started"
        );
        Ok(())
    }

    // ── answering ──────────────────────────────────────────────────────────

    /// Records the candidate's unsent text for the active question.
    pub fn update_draft(&mut self, question_index: usize, text: String) -> Result<(), SessionError> {
        self.ensure_answerable(question_index)?;
        self.draft = Some(Draft {
            question_index,
            text,
        });
        Ok(())
    }

    /// Manual submission for `question_index`, which must be the active question.
    pub async fn submit_response(
        &mut self,
        question_index: usize,
        text: String,
    ) -> Result<Response, SessionError> {
        self.accept(question_index, text, SubmitKind::Manual).await
    }

    /// Ends the session early. A no-op once the interview is terminal.
    pub async fn terminate_session(&mut self, reason: TerminationReason) -> Result<(), SessionError> {
        match self.interview.status {
            InterviewStatus::Interviewing => {}
            status if status.is_terminal() => {
                debug!(interview_id = %self.interview.id, %status, "terminate on terminal session ignored");
                return Ok(());
            }
            status => {
                return Err(SessionError::InvalidTransition {
                    status,
                    action: "terminate the session",
                })
            }
        }

        if let Some(draft) = self.draft.take() {
            self.flush_draft(draft).await;
        }

        warn!(interview_id = %self.interview.id, ?reason, "interview terminated");
        self.finish(InterviewStatus::Terminated, Some(reason)).await;
        Ok(())
    }

    pub async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Clock(event) => self.on_clock(event).await,
            EngineEvent::Signal(signal) => self.on_signal(signal),
            EngineEvent::GraceElapsed { reason } => {
                self.termination_pending = false;
                if let Err(e) = self.terminate_session(reason).await {
                    debug!(error = %e, "grace-delayed termination skipped");
                }
            }
        }
    }

    // ── internals ──────────────────────────────────────────────────────────

    async fn on_clock(&mut self, event: ClockEvent) {
        match self.timer.on_clock_event(event) {
            TimerSignal::Stale => debug!(?event, "stale clock event ignored"),
            TimerSignal::Tick { .. } => {}
            TimerSignal::Expired { question_index } => {
                let text = self
                    .draft
                    .take()
                    .filter(|d| d.question_index == question_index)
                    .map(|d| d.text)
                    .unwrap_or_default();
                info!(
                    interview_id = %self.interview.id,
                    question_number = question_index + 1,
                    "time expired; auto-submitting"
                );
                if let Err(e) = self.accept(question_index, text, SubmitKind::Auto).await {
                    error!(error = %e, "auto-submit failed");
                }
            }
        }
    }

    fn on_signal(&mut self, signal: EnvironmentSignal) {
        if self.interview.status != InterviewStatus::Interviewing {
            debug!(?signal, status = %self.interview.status, "signal outside interview ignored");
            return;
        }

        let index = self.current_index;
        let active = self
            .interview
            .questions
            .get(index)
            .map(|q| ActiveQuestion {
                number: index + 1,
                text: &q.text,
            });
        let action = self.monitor.evaluate(
            signal,
            active,
            &mut self.interview.violations,
            Utc::now(),
        );

        if let MonitorAction::TerminateAfterGrace(reason) = action {
            self.schedule_termination(reason);
        }
    }

    fn schedule_termination(&mut self, reason: TerminationReason) {
        if self.termination_pending {
            return;
        }
        self.termination_pending = true;

        let sink = Arc::clone(&self.sink);
        let delay = self.settings.grace_delay;
        info!(
            interview_id = %self.interview.id,
            grace_ms = delay.as_millis() as u64,
            "termination scheduled"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sink(EngineEvent::GraceElapsed { reason });
        });
    }

    fn ensure_answerable(&self, question_index: usize) -> Result<(), SessionError> {
        let question_number = question_index + 1;
        let known = question_index < self.interview.questions.len();
        match self.interview.status {
            InterviewStatus::Interviewing => {}
            InterviewStatus::Terminated => {
                return Err(SessionError::TerminationInFlight { question_number })
            }
            InterviewStatus::Completed if known => {
                return Err(SessionError::AlreadyAnswered { question_number })
            }
            status => {
                return Err(SessionError::InvalidTransition {
                    status,
                    action: "answer a question",
                })
            }
        }

        if self.interview.response_for(question_index).is_some() {
            return Err(SessionError::AlreadyAnswered { question_number });
        }
        if question_index != self.current_index {
            return Err(SessionError::NotActiveQuestion { question_number });
        }
        Ok(())
    }

    async fn accept(
        &mut self,
        question_index: usize,
        text: String,
        kind: SubmitKind,
    ) -> Result<Response, SessionError> {
        if let Err(e) = self.ensure_answerable(question_index) {
            debug!(error = %e, ?kind, "submission rejected");
            return Err(e);
        }

        let time_limit = self.interview.questions[question_index].time_limit_seconds;
        let time_used = match kind {
            SubmitKind::Manual => {
                let remaining = self.timer.disarm().unwrap_or(0);
                time_limit.saturating_sub(remaining)
            }
            SubmitKind::Auto => time_limit,
        };

        let response = self.record(question_index, text, time_used, kind).await;
        self.advance().await?;
        Ok(response)
    }

    /// Best-effort submission of in-flight text while terminating. Never fails.
    async fn flush_draft(&mut self, draft: Draft) {
        let question_number = draft.question_index + 1;
        if draft.text.trim().is_empty() {
            return;
        }
        if let Err(cause) = self.ensure_answerable(draft.question_index) {
            debug!(
                error = %SessionError::TerminationInFlight { question_number },
                %cause,
                "late submission dropped"
            );
            return;
        }

        let time_limit = self.interview.questions[draft.question_index].time_limit_seconds;
        let remaining = self.timer.disarm().unwrap_or(0);
        self.record(
            draft.question_index,
            draft.text,
            time_limit.saturating_sub(remaining),
            SubmitKind::Manual,
        )
        .await;
    }

    async fn record(
        &mut self,
        question_index: usize,
        text: String,
        time_used_seconds: u32,
        kind: SubmitKind,
    ) -> Response {
        let text = if kind == SubmitKind::Auto && text.trim().is_empty() {
            NO_RESPONSE_TEXT.to_string()
        } else {
            text
        };

        let question = &self.interview.questions[question_index];
        let outcome = self.score(question, &text, time_used_seconds).await;
        let response = Response {
            question_id: question.id.clone(),
            question_index,
            text,
            time_used_seconds,
            score: outcome.score,
            feedback: outcome.feedback,
            submitted_at: Utc::now(),
            auto_submitted: kind == SubmitKind::Auto,
        };

        self.interview.responses.push(response.clone());
        self.draft = None;
        info!(
            interview_id = %self.interview.id,
            question_number = question_index + 1,
            score = response.score,
            time_used = time_used_seconds,
            auto = response.auto_submitted,
            "response recorded"
        );

        self.persist(
            "response",
            self.collaborators
                .observer
                .on_response_recorded(self.interview.id, &response),
        )
        .await;
        response
    }

    async fn score(&self, question: &Question, text: &str, time_used_seconds: u32) -> ScoreOutcome {
        let timeout = self.settings.scoring_timeout;
        let call = self
            .collaborators
            .scorer
            .score(question, text, time_used_seconds);

        let failure = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(outcome)) => {
                return ScoreOutcome {
                    score: outcome.score.min(100),
                    feedback: outcome.feedback,
                }
            }
            Ok(Err(e)) => SessionError::ScoringUnavailable(e.to_string()),
            Err(_) => SessionError::ScoringUnavailable(format!(
                "no result within {}s",
                timeout.as_secs()
            )),
        };

        warn!(question_id = %question.id, error = %failure, "recording placeholder score");
        ScoreOutcome {
            score: 0,
            feedback: SCORING_UNAVAILABLE_FEEDBACK.to_string(),
        }
    }

    async fn advance(&mut self) -> Result<(), SessionError> {
        if self.current_index + 1 >= self.interview.questions.len() {
            self.finish(InterviewStatus::Completed, None).await;
            return Ok(());
        }
        self.current_index += 1;
        self.timer
            .arm(self.current_index, &self.interview.questions[self.current_index])?;
        Ok(())
    }

    async fn finish(&mut self, status: InterviewStatus, reason: Option<TerminationReason>) {
        self.timer.disarm();
        self.monitor.detach();
        self.draft = None;
        self.interview.status = status;
        self.interview.termination_reason = reason;
        self.interview.ended_at = Some(Utc::now());

        let report = ReportAggregator::generate(&self.interview);
        info!(
            interview_id = %self.interview.id,
            %status,
            answered = self.interview.responses.len(),
            total = self.interview.questions.len(),
            overall_score = report.overall_score,
            recommendation = ?report.recommendation,
            "interview finalized"
        );

        self.persist(
            "final report",
            self.collaborators.observer.on_session_finalized(&report),
        )
        .await;
        self.report = Some(report);
    }

    /// Runs one observer notification, giving up after `persist_timeout`.
    async fn persist(&self, what: &'static str, call: impl Future<Output = anyhow::Result<()>>) {
        let timeout = self.settings.persist_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(interview_id = %self.interview.id, error = %e, what, "persistence failed"),
            Err(_) => warn!(
                interview_id = %self.interview.id,
                what,
                timeout_ms = timeout.as_millis() as u64,
                "persistence timed out; continuing"
            ),
        }
    }
}

#[cfg(test)]
impl SessionController {
    pub fn interview(&self) -> &Interview {
        &self.interview
    }

    pub fn status(&self) -> InterviewStatus {
        self.interview.status
    }

    pub fn report(&self) -> Option<&FinalReport> {
        self.report.as_ref()
    }
}
