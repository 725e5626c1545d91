//! Fakes shared by the session tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::scoring::{ResponseScorer, ScoreOutcome};
use crate::session::models::{Difficulty, Question, Response};
use crate::session::observer::SessionObserver;
use crate::session::profile::{CandidateProfile, ProfileField};
use crate::session::report::FinalReport;

/// Returns a fixed score, optionally failing or stalling.
pub struct FakeScorer {
    score: u8,
    fail_on: HashSet<String>,
    delay: Duration,
}

impl FakeScorer {
    pub fn scoring(score: u8) -> Self {
        Self {
            score,
            fail_on: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn failing_on(mut self, question_id: &str) -> Self {
        self.fail_on.insert(question_id.to_string());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ResponseScorer for FakeScorer {
    async fn score(
        &self,
        question: &Question,
        _response_text: &str,
        _time_used_seconds: u32,
    ) -> Result<ScoreOutcome, AppError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_on.contains(&question.id) {
            return Err(AppError::Llm("model unavailable".to_string()));
        }
        Ok(ScoreOutcome {
            score: self.score,
            feedback: format!("Clear explanation of {}", question.category),
        })
    }
}

/// Keeps every notification. `delayed` simulates a stalled store.
#[derive(Default)]
pub struct RecordingObserver {
    responses: Mutex<Vec<Response>>,
    reports: Mutex<Vec<FinalReport>>,
    delay: Duration,
}

impl RecordingObserver {
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<FinalReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionObserver for RecordingObserver {
    async fn on_response_recorded(
        &self,
        _interview_id: Uuid,
        response: &Response,
    ) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.responses.lock().unwrap().push(response.clone());
        Ok(())
    }

    async fn on_session_finalized(&self, report: &FinalReport) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

pub fn complete_profile() -> CandidateProfile {
    CandidateProfile {
        name: Some("Ada Lovelace".to_string()),
        email: Some("ada@example.com".to_string()),
        phone: Some("+44 20 7946 0958".to_string()),
        position: "Backend Engineer".to_string(),
        resume_text: "Ada Lovelace\nada@example.com\n+44 20 7946 0958".to_string(),
        extracted_fields: ProfileField::REQUIRED.to_vec(),
    }
}

/// Two easy (20s), two medium (60s), two hard (120s).
pub fn sample_questions() -> Vec<Question> {
    [
        (Difficulty::Easy, 20),
        (Difficulty::Easy, 20),
        (Difficulty::Medium, 60),
        (Difficulty::Medium, 60),
        (Difficulty::Hard, 120),
        (Difficulty::Hard, 120),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (difficulty, time_limit_seconds))| Question {
        id: format!("q{}", i + 1),
        text: format!("Question {}", i + 1),
        difficulty,
        time_limit_seconds,
        category: "rust".to_string(),
        expected_keywords: vec!["ownership".to_string()],
    })
    .collect()
}
