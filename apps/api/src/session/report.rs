//! Final report aggregation. Pure over a terminal `Interview`: no clock reads,
//! no randomness, so the same interview always yields the same report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::models::{
    Difficulty, Interview, InterviewStatus, TerminationReason, ViolationKind,
};

/// A response at or above this score counts as correct.
pub const CORRECTNESS_THRESHOLD: u8 = 60;

/// Feedback recorded when the scoring collaborator failed.
pub const SCORING_UNAVAILABLE_FEEDBACK: &str = "scoring unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Hire")]
    StrongHire,
    #[serde(rename = "Hire")]
    Hire,
    #[serde(rename = "No Hire")]
    NoHire,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongHire => "Strong Hire",
            Recommendation::Hire => "Hire",
            Recommendation::NoHire => "No Hire",
            Recommendation::InsufficientData => "Insufficient Data",
        }
    }

    fn from_score(overall_score: f64) -> Self {
        match overall_score {
            s if s >= 80.0 => Recommendation::StrongHire,
            s if s >= 60.0 => Recommendation::Hire,
            _ => Recommendation::NoHire,
        }
    }

    /// One tier lower. `NoHire` and `InsufficientData` are floors.
    fn downgraded(self) -> Self {
        match self {
            Recommendation::StrongHire => Recommendation::Hire,
            Recommendation::Hire => Recommendation::NoHire,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBreakdown {
    pub difficulty: Difficulty,
    pub count: usize,
    pub average: f64,
    pub accuracy_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_number: usize,
    pub question: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub answered: bool,
    pub auto_submitted: bool,
    pub score: u8,
    pub time_used_seconds: u32,
    pub time_limit_seconds: u32,
    pub feedback: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationSummary {
    pub total: usize,
    pub fullscreen_exit: usize,
    pub tab_change: usize,
    pub window_blur: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub interview_id: Uuid,
    pub candidate_name: Option<String>,
    pub position: String,
    pub status: InterviewStatus,
    pub termination_reason: Option<TerminationReason>,
    pub overall_score: f64,
    pub questions_total: usize,
    pub questions_answered: usize,
    pub breakdown: Vec<DifficultyBreakdown>,
    pub recommendation: Recommendation,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub question_results: Vec<QuestionResult>,
    pub violations: ViolationSummary,
    pub summary: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

pub struct ReportAggregator;

impl ReportAggregator {
    pub fn generate(interview: &Interview) -> FinalReport {
        let responses = &interview.responses;

        let overall_score = if responses.is_empty() {
            0.0
        } else {
            let total: u32 = responses.iter().map(|r| u32::from(r.score)).sum();
            round2(f64::from(total) / responses.len() as f64)
        };

        let breakdown = Difficulty::ALL
            .into_iter()
            .map(|difficulty| breakdown_for(interview, difficulty))
            .collect();

        let violations = summarize_violations(interview);

        let recommendation = if responses.is_empty() {
            Recommendation::InsufficientData
        } else {
            let base = Recommendation::from_score(overall_score);
            if interview.status == InterviewStatus::Terminated || violations.total > 0 {
                base.downgraded()
            } else {
                base
            }
        };

        let (strengths, improvements) = derive_feedback_lists(interview);
        let question_results = question_results(interview);

        let summary = format!(
            "{}/{} questions answered, overall score {:.1}/100, {} integrity violation(s).",
            responses.len(),
            interview.questions.len(),
            overall_score,
            violations.total
        );

        FinalReport {
            interview_id: interview.id,
            candidate_name: interview.candidate.name.clone(),
            position: interview.candidate.position.clone(),
            status: interview.status,
            termination_reason: interview.termination_reason.clone(),
            overall_score,
            questions_total: interview.questions.len(),
            questions_answered: responses.len(),
            breakdown,
            recommendation,
            strengths,
            improvements,
            question_results,
            violations,
            summary,
            started_at: interview.started_at,
            ended_at: interview.ended_at,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn breakdown_for(interview: &Interview, difficulty: Difficulty) -> DifficultyBreakdown {
    let scores: Vec<u8> = interview
        .responses
        .iter()
        .filter(|r| {
            interview
                .questions
                .get(r.question_index)
                .is_some_and(|q| q.difficulty == difficulty)
        })
        .map(|r| r.score)
        .collect();

    if scores.is_empty() {
        return DifficultyBreakdown {
            difficulty,
            count: 0,
            average: 0.0,
            accuracy_percentage: 0.0,
        };
    }

    let count = scores.len();
    let total: u32 = scores.iter().copied().map(u32::from).sum();
    let correct = scores
        .iter()
        .filter(|s| **s >= CORRECTNESS_THRESHOLD)
        .count();

    DifficultyBreakdown {
        difficulty,
        count,
        average: round2(f64::from(total) / count as f64),
        accuracy_percentage: round2(correct as f64 * 100.0 / count as f64),
    }
}

fn summarize_violations(interview: &Interview) -> ViolationSummary {
    let mut summary = ViolationSummary::default();
    for violation in &interview.violations {
        summary.total += 1;
        match violation.kind {
            ViolationKind::FullscreenExit => summary.fullscreen_exit += 1,
            ViolationKind::TabChange => summary.tab_change += 1,
            ViolationKind::WindowBlur => summary.window_blur += 1,
        }
    }
    summary
}

/// Splits per-response feedback into strengths (correct answers) and improvements,
/// keeping first-seen order and dropping duplicates and scoring placeholders.
fn derive_feedback_lists(interview: &Interview) -> (Vec<String>, Vec<String>) {
    let mut strengths: Vec<String> = Vec::new();
    let mut improvements: Vec<String> = Vec::new();

    for response in &interview.responses {
        let feedback = response.feedback.trim();
        if feedback.is_empty() || feedback == SCORING_UNAVAILABLE_FEEDBACK {
            continue;
        }
        let target = if response.score >= CORRECTNESS_THRESHOLD {
            &mut strengths
        } else {
            &mut improvements
        };
        if !target.iter().any(|existing| existing == feedback) {
            target.push(feedback.to_string());
        }
    }

    (strengths, improvements)
}

fn question_results(interview: &Interview) -> Vec<QuestionResult> {
    interview
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let response = interview.response_for(index);
            QuestionResult {
                question_number: index + 1,
                question: question.text.clone(),
                difficulty: question.difficulty,
                category: question.category.clone(),
                answered: response.is_some(),
                auto_submitted: response.is_some_and(|r| r.auto_submitted),
                score: response.map_or(0, |r| r.score),
                time_used_seconds: response.map_or(0, |r| r.time_used_seconds),
                time_limit_seconds: question.time_limit_seconds,
                feedback: response.map(|r| r.feedback.clone()).unwrap_or_default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::{InterviewMode, Question, Response, Violation};
    use crate::session::profile::CandidateProfile;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn interview(scores: &[u8], status: InterviewStatus) -> Interview {
        let difficulties = [
            Difficulty::Easy,
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Hard,
        ];
        let questions = difficulties
            .iter()
            .enumerate()
            .map(|(i, d)| Question {
                id: format!("q{}", i + 1),
                text: format!("Question {}", i + 1),
                difficulty: *d,
                time_limit_seconds: 60,
                category: "rust".to_string(),
                expected_keywords: vec![],
            })
            .collect();
        let responses = scores
            .iter()
            .enumerate()
            .map(|(i, s)| Response {
                question_id: format!("q{}", i + 1),
                question_index: i,
                text: "answer".to_string(),
                time_used_seconds: 30,
                score: *s,
                feedback: if *s >= 60 {
                    "Solid answer.".to_string()
                } else {
                    "Needs more depth.".to_string()
                },
                submitted_at: at(i as i64 * 60),
                auto_submitted: false,
            })
            .collect();

        Interview {
            id: Uuid::nil(),
            mode: InterviewMode::Proctored,
            candidate: CandidateProfile {
                name: Some("Ada Lovelace".to_string()),
                position: "Backend Engineer".to_string(),
                ..Default::default()
            },
            questions,
            responses,
            violations: vec![],
            status,
            termination_reason: None,
            started_at: Some(at(0)),
            ended_at: Some(at(600)),
        }
    }

    #[test]
    fn test_overall_score_is_mean() {
        let report = ReportAggregator::generate(&interview(
            &[90, 80, 70, 60, 50, 40],
            InterviewStatus::Completed,
        ));
        assert_eq!(report.overall_score, 65.0);
        assert_eq!(report.questions_answered, 6);
        assert_eq!(report.recommendation, Recommendation::Hire);
    }

    #[test]
    fn test_strong_hire_threshold() {
        let report = ReportAggregator::generate(&interview(
            &[80, 80, 80, 80, 80, 80],
            InterviewStatus::Completed,
        ));
        assert_eq!(report.recommendation, Recommendation::StrongHire);
    }

    #[test]
    fn test_no_responses_is_insufficient_data() {
        let report = ReportAggregator::generate(&interview(&[], InterviewStatus::Terminated));
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.recommendation, Recommendation::InsufficientData);
        assert!(report.breakdown.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_breakdown_per_difficulty() {
        let report = ReportAggregator::generate(&interview(
            &[100, 50, 60, 59, 20, 90],
            InterviewStatus::Completed,
        ));
        let easy = &report.breakdown[0];
        assert_eq!(easy.difficulty, Difficulty::Easy);
        assert_eq!(easy.count, 2);
        assert_eq!(easy.average, 75.0);
        assert_eq!(easy.accuracy_percentage, 50.0);

        let medium = &report.breakdown[1];
        assert_eq!(medium.accuracy_percentage, 50.0);

        let hard = &report.breakdown[2];
        assert_eq!(hard.average, 55.0);
    }

    #[test]
    fn test_termination_downgrades_one_tier() {
        let mut iv = interview(&[90, 90], InterviewStatus::Terminated);
        iv.termination_reason = Some(TerminationReason::Violation {
            kind: ViolationKind::TabChange,
        });
        let report = ReportAggregator::generate(&iv);
        assert_eq!(report.recommendation, Recommendation::Hire);
        assert_eq!(report.questions_answered, 2);
        assert_eq!(report.questions_total, 6);
    }

    #[test]
    fn test_violations_downgrade_completed_interview() {
        let mut iv = interview(&[70, 70, 70, 70, 70, 70], InterviewStatus::Completed);
        iv.violations.push(Violation {
            kind: ViolationKind::WindowBlur,
            timestamp: at(30),
            question_number: 1,
            question_text: "Question 1".to_string(),
        });
        let report = ReportAggregator::generate(&iv);
        assert_eq!(report.recommendation, Recommendation::NoHire);
        assert_eq!(report.violations.window_blur, 1);
        assert_eq!(report.violations.total, 1);
    }

    #[test]
    fn test_no_hire_is_a_floor() {
        let mut iv = interview(&[10, 10], InterviewStatus::Terminated);
        iv.violations.push(Violation {
            kind: ViolationKind::FullscreenExit,
            timestamp: at(30),
            question_number: 2,
            question_text: "Question 2".to_string(),
        });
        let report = ReportAggregator::generate(&iv);
        assert_eq!(report.recommendation, Recommendation::NoHire);
    }

    #[test]
    fn test_feedback_lists_are_deduplicated() {
        let mut iv = interview(&[90, 95, 10, 20, 0, 0], InterviewStatus::Completed);
        iv.responses[4].feedback = SCORING_UNAVAILABLE_FEEDBACK.to_string();
        let report = ReportAggregator::generate(&iv);
        assert_eq!(report.strengths, vec!["Solid answer.".to_string()]);
        assert_eq!(report.improvements, vec!["Needs more depth.".to_string()]);
    }

    #[test]
    fn test_unanswered_questions_appear_in_results() {
        let report = ReportAggregator::generate(&interview(&[75], InterviewStatus::Terminated));
        assert_eq!(report.question_results.len(), 6);
        assert!(report.question_results[0].answered);
        assert!(!report.question_results[1].answered);
        assert_eq!(report.question_results[1].score, 0);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let iv = interview(&[88, 42, 67, 73, 51, 99], InterviewStatus::Completed);
        let first = serde_json::to_string(&ReportAggregator::generate(&iv)).unwrap();
        let second = serde_json::to_string(&ReportAggregator::generate(&iv)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_recommendation_wire_names() {
        assert_eq!(
            serde_json::to_string(&Recommendation::StrongHire).unwrap(),
            r#""Strong Hire""#
        );
        assert_eq!(
            serde_json::to_string(&Recommendation::InsufficientData).unwrap(),
            r#""Insufficient Data""#
        );
    }
}
