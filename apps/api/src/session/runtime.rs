//! Per-session event queue.
//!
//! `spawn_session` moves a `SessionController` into its own task. Clock events,
//! environment signals, grace expiries and API commands all arrive on one
//! unbounded channel and are applied strictly one at a time, so timer expiry and
//! manual submission can never interleave inside a state transition.
//!
//! Engine-internal producers hold only a weak sender: the task ends once every
//! `SessionHandle` is dropped. `SessionHandle::finished` flips to true when the
//! interview reaches a terminal status.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;
use uuid::Uuid;

use crate::session::clock::Clock;
use crate::session::controller::{
    Collaborators, EngineEvent, EngineSettings, EngineSink, SessionController, SessionSnapshot,
};
use crate::session::error::SessionError;
use crate::session::models::{Interview, Question, Response, TerminationReason};
use crate::session::profile::ProfileField;
use crate::session::signals::{BroadcastSignalSource, EnvironmentSignal};

type Reply<T> = oneshot::Sender<T>;

enum SessionCommand {
    ProvideField {
        field: ProfileField,
        value: String,
        reply: Reply<Result<Vec<ProfileField>, SessionError>>,
    },
    Start {
        questions: Vec<Question>,
        reply: Reply<Result<(), SessionError>>,
    },
    UpdateDraft {
        question_index: usize,
        text: String,
        reply: Reply<Result<(), SessionError>>,
    },
    Submit {
        question_index: usize,
        text: String,
        reply: Reply<Result<Response, SessionError>>,
    },
    Terminate {
        reason: TerminationReason,
        reply: Reply<Result<(), SessionError>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
}

enum SessionEvent {
    Engine(EngineEvent),
    Command(SessionCommand),
}

/// Cloneable front door to one running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<SessionEvent>,
    signals: BroadcastSignalSource,
    finished: watch::Receiver<bool>,
}

pub fn spawn_session(
    interview: Interview,
    collaborators: Collaborators,
    settings: EngineSettings,
    clock: Clock,
) -> SessionHandle {
    let id = interview.id;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (finished_tx, finished) = watch::channel(false);

    let weak = tx.downgrade();
    let sink: EngineSink = Arc::new(move |event| {
        if let Some(tx) = weak.upgrade() {
            let _ = tx.send(SessionEvent::Engine(event));
        }
    });

    let signals = BroadcastSignalSource::new();
    let mut controller = SessionController::new(interview, collaborators, settings, clock, sink);
    controller.attach_signals(&signals);

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::Engine(event) => controller.handle_event(event).await,
                SessionEvent::Command(command) => dispatch(&mut controller, command).await,
            }
            if controller.is_finished() {
                finished_tx.send_if_modified(|done| !std::mem::replace(done, true));
            }
        }
        debug!(interview_id = %id, "session queue closed");
    });

    SessionHandle {
        id,
        tx,
        signals,
        finished,
    }
}

async fn dispatch(controller: &mut SessionController, command: SessionCommand) {
    // A dropped receiver means the caller went away; the transition still stands.
    match command {
        SessionCommand::ProvideField {
            field,
            value,
            reply,
        } => {
            let _ = reply.send(controller.provide_field(field, &value));
        }
        SessionCommand::Start { questions, reply } => {
            let _ = reply.send(controller.start_interview(questions));
        }
        SessionCommand::UpdateDraft {
            question_index,
            text,
            reply,
        } => {
            let _ = reply.send(controller.update_draft(question_index, text));
        }
        SessionCommand::Submit {
            question_index,
            text,
            reply,
        } => {
            let _ = reply.send(controller.submit_response(question_index, text).await);
        }
        SessionCommand::Terminate { reason, reply } => {
            let _ = reply.send(controller.terminate_session(reason).await);
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(controller.snapshot());
        }
    }
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn provide_field(
        &self,
        field: ProfileField,
        value: String,
    ) -> Result<Vec<ProfileField>, SessionError> {
        self.request(|reply| SessionCommand::ProvideField {
            field,
            value,
            reply,
        })
        .await?
    }

    pub async fn start(&self, questions: Vec<Question>) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Start { questions, reply })
            .await?
    }

    pub async fn update_draft(&self, question_index: usize, text: String) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::UpdateDraft {
            question_index,
            text,
            reply,
        })
        .await?
    }

    pub async fn submit(&self, question_index: usize, text: String) -> Result<Response, SessionError> {
        self.request(|reply| SessionCommand::Submit {
            question_index,
            text,
            reply,
        })
        .await?
    }

    pub async fn terminate(&self, reason: TerminationReason) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Terminate { reason, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Resolves once the interview is completed or terminated.
    /// Returns immediately if the session task has already gone.
    /// The future does not keep the session alive.
    pub fn finished(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut finished = self.finished.clone();
        async move {
            let _ = finished.wait_for(|done| *done).await;
        }
    }

    /// Feeds one environment signal to the session's subscribers.
    /// Returns how many subscribers received it.
    pub fn publish_signal(&self, signal: EnvironmentSignal) -> usize {
        self.signals.publish(signal)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionEvent::Command(command(reply)))
            .map_err(|_| SessionError::SessionClosed(self.id))?;
        rx.await.map_err(|_| SessionError::SessionClosed(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{InterviewMode, InterviewStatus, ViolationKind, NO_RESPONSE_TEXT};
    use crate::session::signals::SignalKind;
    use crate::session::testing::{
        complete_profile, sample_questions, FakeScorer, RecordingObserver,
    };
    use std::time::Duration;

    fn spawn(mode: InterviewMode) -> (SessionHandle, Arc<RecordingObserver>) {
        spawn_with(mode, RecordingObserver::default())
    }

    fn spawn_with(
        mode: InterviewMode,
        observer: RecordingObserver,
    ) -> (SessionHandle, Arc<RecordingObserver>) {
        let observer = Arc::new(observer);
        let collaborators = Collaborators {
            scorer: Arc::new(FakeScorer::scoring(75)),
            observer: observer.clone(),
        };
        let interview = Interview::new(Uuid::new_v4(), mode, complete_profile());
        let handle = spawn_session(
            interview,
            collaborators,
            EngineSettings::default(),
            Clock::default(),
        );
        (handle, observer)
    }

    async fn started() -> (SessionHandle, Arc<RecordingObserver>) {
        let (handle, observer) = spawn(InterviewMode::Proctored);
        handle.start(sample_questions()).await.unwrap();
        (handle, observer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_before_start() {
        let (handle, _) = spawn(InterviewMode::Proctored);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.interview.status, InterviewStatus::Confirming);
        assert_eq!(snapshot.current_question_index, None);
        assert!(snapshot.missing_fields.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_is_visible_in_snapshot() {
        let (handle, _) = started().await;
        tokio::time::sleep(Duration::from_millis(7500)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_question_index, Some(0));
        assert_eq!(snapshot.remaining_seconds, Some(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_question_auto_submits_through_queue() {
        let (handle, _) = started().await;
        handle.submit(0, "first".to_string()).await.unwrap();
        handle.submit(1, "second".to_string()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.interview.responses.len(), 3);
        assert_eq!(snapshot.interview.responses[2].text, NO_RESPONSE_TEXT);
        assert!(snapshot.interview.responses[2].auto_submitted);
        assert_eq!(snapshot.current_question_index, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submissions_record_once() {
        let (handle, observer) = started().await;
        let other = handle.clone();

        let (a, b) = tokio::join!(
            handle.submit(0, "from tab one".to_string()),
            other.submit(0, "from tab two".to_string()),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let rejected = a.err().or(b.err()).unwrap();
        assert_eq!(rejected, SessionError::AlreadyAnswered { question_number: 1 });
        assert_eq!(observer.responses().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_violation_terminates_and_unsubscribes() {
        let (handle, observer) = started().await;
        handle.submit(0, "first".to_string()).await.unwrap();

        let delivered = handle.publish_signal(EnvironmentSignal::Fullscreen { active: false });
        assert_eq!(delivered, 1);
        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.interview.status, InterviewStatus::Terminated);
        assert_eq!(snapshot.interview.responses.len(), 1);
        assert_eq!(snapshot.interview.violations[0].kind, ViolationKind::FullscreenExit);
        assert_eq!(snapshot.interview.violations[0].question_number, 2);
        assert!(snapshot.report.is_some());
        assert_eq!(observer.reports().len(), 1);

        assert_eq!(handle.signals.subscriber_count(SignalKind::Fullscreen), 0);
        assert_eq!(
            handle.publish_signal(EnvironmentSignal::Visibility { hidden: true }),
            0
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_after_termination_is_rejected() {
        let (handle, _) = started().await;
        handle
            .terminate(TerminationReason::Requested { note: None })
            .await
            .unwrap();

        let err = handle.submit(0, "late".to_string()).await.unwrap_err();
        assert_eq!(err, SessionError::TerminationInFlight { question_number: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_store_does_not_stall_session() {
        let (handle, observer) = spawn_with(
            InterviewMode::Proctored,
            RecordingObserver::delayed(Duration::from_secs(300)),
        );
        handle.start(sample_questions()).await.unwrap();
        let persist_timeout = EngineSettings::default().persist_timeout;

        let before = tokio::time::Instant::now();
        handle.submit(0, "first".to_string()).await.unwrap();
        assert!(before.elapsed() <= persist_timeout + Duration::from_secs(1));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.current_question_index, Some(1));
        assert_eq!(snapshot.interview.responses.len(), 1);

        handle.publish_signal(EnvironmentSignal::Fullscreen { active: false });
        tokio::time::sleep(Duration::from_secs(10)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.interview.status, InterviewStatus::Terminated);
        assert!(snapshot.report.is_some());
        assert!(observer.responses().is_empty());
        assert!(observer.reports().is_empty());
    }
}
