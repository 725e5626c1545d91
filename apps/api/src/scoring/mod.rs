//! Response scoring: pluggable, trait-based scorer for individual answers.
//!
//! Default: `KeywordResponseScorer` (pure-Rust, deterministic, no network).
//! Optional: `LlmResponseScorer` (semantic via Claude, enabled by `ENABLE_LLM_SCORING`).
//!
//! `AppState` holds an `Arc<dyn ResponseScorer>`; the session engine wraps every
//! call in a timeout and falls back to a zero-score placeholder on failure.

pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::prompts::CANDIDATE_FACING_INSTRUCTION;
use crate::llm_client::LlmClient;
use crate::scoring::prompts::{SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM};
use crate::session::models::{Difficulty, Question, NO_RESPONSE_TEXT};

const EMPTY_ANSWER_FEEDBACK: &str = "No answer was provided.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    pub score: u8, // 0 – 100
    pub feedback: String,
}

#[async_trait]
pub trait ResponseScorer: Send + Sync {
    async fn score(
        &self,
        question: &Question,
        response_text: &str,
        time_used_seconds: u32,
    ) -> Result<ScoreOutcome, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordResponseScorer
// ────────────────────────────────────────────────────────────────────────────

/// Keyword-coverage scorer.
///
/// Algorithm:
/// 1. coverage = expected keywords found in the answer / expected keywords
///    (falls back to depth when the question lists no keywords)
/// 2. depth = min(word_count / target_words(difficulty), 1.0)
/// 3. score = round(70 × coverage + 30 × depth)
pub struct KeywordResponseScorer;

#[async_trait]
impl ResponseScorer for KeywordResponseScorer {
    async fn score(
        &self,
        question: &Question,
        response_text: &str,
        _time_used_seconds: u32,
    ) -> Result<ScoreOutcome, AppError> {
        Ok(score_by_keywords(question, response_text))
    }
}

fn target_words(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 15.0,
        Difficulty::Medium => 40.0,
        Difficulty::Hard => 80.0,
    }
}

pub fn is_empty_answer(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == NO_RESPONSE_TEXT
}

fn score_by_keywords(question: &Question, response_text: &str) -> ScoreOutcome {
    if is_empty_answer(response_text) {
        return ScoreOutcome {
            score: 0,
            feedback: EMPTY_ANSWER_FEEDBACK.to_string(),
        };
    }

    let text_lower = response_text.to_lowercase();
    let word_count = response_text.split_whitespace().count() as f64;
    let depth = (word_count / target_words(question.difficulty)).min(1.0);

    let (matched, missed): (Vec<&String>, Vec<&String>) = question
        .expected_keywords
        .iter()
        .partition(|kw| text_lower.contains(&kw.to_lowercase()));

    let coverage = if question.expected_keywords.is_empty() {
        depth
    } else {
        matched.len() as f64 / question.expected_keywords.len() as f64
    };

    let score = (70.0 * coverage + 30.0 * depth).round().clamp(0.0, 100.0) as u8;
    let feedback = build_feedback(&question.category, &matched, &missed, depth);

    ScoreOutcome { score, feedback }
}

fn join(keywords: &[&String]) -> String {
    keywords
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_feedback(category: &str, matched: &[&String], missed: &[&String], depth: f64) -> String {
    if matched.is_empty() && missed.is_empty() {
        return if depth < 0.5 {
            format!("Answer on {category} is too brief; add more detail.")
        } else {
            format!("Gave a detailed answer on {category}.")
        };
    }

    if missed.is_empty() {
        format!("Covered the key {category} concepts: {}.", join(matched))
    } else if matched.len() >= missed.len() {
        format!(
            "Good grasp of {category}; also discuss {}.",
            join(missed)
        )
    } else {
        format!("Review {category} fundamentals: {}.", join(missed))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmResponseScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmScore {
    score: f64,
    feedback: String,
}

/// Semantic scorer via Claude. Empty answers short-circuit to zero without a call.
pub struct LlmResponseScorer(pub LlmClient);

#[async_trait]
impl ResponseScorer for LlmResponseScorer {
    async fn score(
        &self,
        question: &Question,
        response_text: &str,
        time_used_seconds: u32,
    ) -> Result<ScoreOutcome, AppError> {
        if is_empty_answer(response_text) {
            return Ok(ScoreOutcome {
                score: 0,
                feedback: EMPTY_ANSWER_FEEDBACK.to_string(),
            });
        }

        let prompt = SCORE_PROMPT_TEMPLATE
            .replace("{question}", &question.text)
            .replace("{difficulty}", question.difficulty.as_str())
            .replace("{category}", &question.category)
            .replace("{keywords}", &question.expected_keywords.join(", "))
            .replace("{time_used}", &time_used_seconds.to_string())
            .replace("{time_limit}", &question.time_limit_seconds.to_string())
            .replace("{answer}", response_text);
        let prompt = format!("{prompt}\n\n{CANDIDATE_FACING_INSTRUCTION}");

        let scored: LlmScore = self
            .0
            .complete_json(&prompt, SCORE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Answer scoring failed: {e}")))?;

        Ok(ScoreOutcome {
            score: scored.score.round().clamp(0.0, 100.0) as u8,
            feedback: scored.feedback.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(difficulty: Difficulty, keywords: &[&str]) -> Question {
        Question {
            id: "q1".to_string(),
            text: "How does Rust prevent data races?".to_string(),
            difficulty,
            time_limit_seconds: 60,
            category: "concurrency".to_string(),
            expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_empty_answer_scores_zero() {
        let q = question(Difficulty::Easy, &["send", "sync"]);
        let outcome = KeywordResponseScorer.score(&q, "   ", 20).await.unwrap();
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.feedback, EMPTY_ANSWER_FEEDBACK);

        let outcome = KeywordResponseScorer
            .score(&q, NO_RESPONSE_TEXT, 20)
            .await
            .unwrap();
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn test_full_keyword_coverage_with_depth_scores_100() {
        let q = question(Difficulty::Easy, &["Send", "Sync", "borrow checker"]);
        let answer = "The borrow checker enforces aliasing rules at compile time and the \
                      Send and Sync marker traits restrict which types cross threads safely.";
        let outcome = score_by_keywords(&q, answer);
        assert_eq!(outcome.score, 100);
        assert!(outcome.feedback.starts_with("Covered the key concurrency concepts"));
    }

    #[test]
    fn test_partial_coverage_lists_missed_keywords() {
        let q = question(Difficulty::Medium, &["send", "sync", "mutex", "arc"]);
        let outcome = score_by_keywords(&q, "Types must be Send and Sync, wrapped in a Mutex.");
        // coverage 3/4 → 52.5, depth 10/40 → 7.5
        assert_eq!(outcome.score, 60);
        assert!(outcome.feedback.contains("arc"), "{}", outcome.feedback);
    }

    #[test]
    fn test_no_keywords_falls_back_to_depth() {
        let q = question(Difficulty::Easy, &[]);
        let outcome = score_by_keywords(&q, "Ownership.");
        assert!(outcome.score < 10);
        assert!(outcome.feedback.contains("too brief"));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let q = question(Difficulty::Hard, &["TOKIO"]);
        let outcome = score_by_keywords(&q, "I would use tokio.");
        assert!(outcome.score >= 70);
    }
}
