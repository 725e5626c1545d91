use thiserror::Error;
use uuid::Uuid;

use crate::session::models::InterviewStatus;
use crate::session::profile::ProfileField;

/// Errors raised by the interview session engine.
///
/// `ScoringUnavailable` and `TerminationInFlight` are recovered inside the
/// engine and only ever reach logs; the rest are returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid {field}: {message}")]
    Validation { field: ProfileField, message: String },

    #[error("question {question_number} has already been answered")]
    AlreadyAnswered { question_number: usize },

    #[error("question timer is already armed for question {question_number}")]
    AlreadyArmed { question_number: usize },

    #[error("scoring unavailable: {0}")]
    ScoringUnavailable(String),

    #[error("session is terminating; submission for question {question_number} was not accepted")]
    TerminationInFlight { question_number: usize },

    #[error("cannot {action} while the interview is {status}")]
    InvalidTransition {
        status: InterviewStatus,
        action: &'static str,
    },

    #[error("question {question_number} is not the active question")]
    NotActiveQuestion { question_number: usize },

    #[error("an interview needs at least one question")]
    NoQuestions,

    #[error("session {0} is no longer running")]
    SessionClosed(Uuid),
}
