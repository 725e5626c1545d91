use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::profile::CandidateProfile;

/// Text recorded when a question times out with nothing typed.
pub const NO_RESPONSE_TEXT: &str = "No answer provided";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A question as issued by the question generator. Never mutated once issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub time_limit_seconds: u32,
    pub category: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

/// One recorded answer. Exactly one per question index, in question order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: String,
    pub question_index: usize,
    pub text: String,
    pub time_used_seconds: u32,
    pub score: u8,
    pub feedback: String,
    pub submitted_at: DateTime<Utc>,
    pub auto_submitted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    FullscreenExit,
    TabChange,
    WindowBlur,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::FullscreenExit => "fullscreen_exit",
            ViolationKind::TabChange => "tab_change",
            ViolationKind::WindowBlur => "window_blur",
        }
    }
}

/// Append-only integrity log entry. `question_number` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    pub question_number: usize,
    pub question_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    CollectingInfo,
    Confirming,
    Interviewing,
    Completed,
    Terminated,
}

impl InterviewStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InterviewStatus::Completed | InterviewStatus::Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::CollectingInfo => "collecting_info",
            InterviewStatus::Confirming => "confirming",
            InterviewStatus::Interviewing => "interviewing",
            InterviewStatus::Completed => "completed",
            InterviewStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects the integrity policy a session runs under.
///
/// `Proctored` terminates on fullscreen exit or tab change; `Practice` only logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    #[default]
    Proctored,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TerminationReason {
    Violation { kind: ViolationKind },
    Requested { note: Option<String> },
}

/// Aggregate root for one candidate's session. Owned and mutated only by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,
    pub mode: InterviewMode,
    pub candidate: CandidateProfile,
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
    pub violations: Vec<Violation>,
    pub status: InterviewStatus,
    pub termination_reason: Option<TerminationReason>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Interview {
    pub fn new(id: Uuid, mode: InterviewMode, candidate: CandidateProfile) -> Self {
        let status = if candidate.missing_fields().is_empty() {
            InterviewStatus::Confirming
        } else {
            InterviewStatus::CollectingInfo
        };
        Self {
            id,
            mode,
            candidate,
            questions: Vec::new(),
            responses: Vec::new(),
            violations: Vec::new(),
            status,
            termination_reason: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn response_for(&self, question_index: usize) -> Option<&Response> {
        self.responses
            .iter()
            .find(|r| r.question_index == question_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_serde_lowercase() {
        let d: Difficulty = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(d, Difficulty::Medium);
        assert_eq!(serde_json::to_string(&Difficulty::Hard).unwrap(), r#""hard""#);
    }

    #[test]
    fn test_termination_reason_is_tagged() {
        let reason = TerminationReason::Violation {
            kind: ViolationKind::TabChange,
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["type"], "violation");
        assert_eq!(json["kind"], "tab_change");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(InterviewStatus::Completed.is_terminal());
        assert!(InterviewStatus::Terminated.is_terminal());
        assert!(!InterviewStatus::Interviewing.is_terminal());
        assert!(!InterviewStatus::Confirming.is_terminal());
    }

    #[test]
    fn test_question_keywords_default_to_empty() {
        let q: Question = serde_json::from_str(
            r#"{"id":"q1","text":"What is ownership?","difficulty":"easy","time_limit_seconds":20,"category":"rust"}"#,
        )
        .unwrap();
        assert!(q.expected_keywords.is_empty());
    }
}
