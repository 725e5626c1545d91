//! Question generation: pluggable, trait-based source of the fixed question list.
//!
//! Default: `StaticQuestionBank` (built-in, deterministic, no network).
//! Optional: `LlmQuestionGenerator` (resume-aware via Claude, used when an API key is set).
//!
//! Time limits always come from `QuestionPlan`, never from the generator's output.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::intake::prompts::{GENERATE_PROMPT_TEMPLATE, GENERATE_SYSTEM, MAX_RESUME_CHARS};
use crate::llm_client::LlmClient;
use crate::session::models::{Difficulty, Question};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyMix {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

impl Default for DifficultyMix {
    fn default() -> Self {
        Self {
            easy: 2,
            medium: 2,
            hard: 2,
        }
    }
}

impl DifficultyMix {
    pub fn count(&self, difficulty: Difficulty) -> usize {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    pub fn total(&self) -> usize {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            easy: 20,
            medium: 60,
            hard: 120,
        }
    }
}

impl TimeLimits {
    pub fn for_difficulty(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionPlan {
    pub mix: DifficultyMix,
    pub time_limits: TimeLimits,
}

/// A question before the plan assigns its id and time limit.
#[derive(Debug, Clone, Deserialize)]
struct Draft {
    text: String,
    difficulty: Difficulty,
    category: String,
    #[serde(default)]
    expected_keywords: Vec<String>,
}

impl QuestionPlan {
    /// Orders drafts easy → medium → hard, keeps `mix` of each and assigns ids
    /// and time limits. Fails if any difficulty is short.
    fn assemble(&self, drafts: Vec<Draft>) -> Result<Vec<Question>, AppError> {
        let mut questions = Vec::with_capacity(self.mix.total());
        for difficulty in Difficulty::ALL {
            let wanted = self.mix.count(difficulty);
            let picked: Vec<&Draft> = drafts
                .iter()
                .filter(|d| d.difficulty == difficulty && !d.text.trim().is_empty())
                .take(wanted)
                .collect();
            if picked.len() < wanted {
                return Err(AppError::Llm(format!(
                    "expected {wanted} {} questions, got {}",
                    difficulty.as_str(),
                    picked.len()
                )));
            }
            questions.extend(picked.into_iter().map(|d| Question {
                id: String::new(),
                text: d.text.trim().to_string(),
                difficulty,
                time_limit_seconds: self.time_limits.for_difficulty(difficulty),
                category: d.category.trim().to_string(),
                expected_keywords: d.expected_keywords.clone(),
            }));
        }
        for (i, q) in questions.iter_mut().enumerate() {
            q.id = format!("q{}", i + 1);
        }
        Ok(questions)
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        resume_text: &str,
        position: &str,
        plan: &QuestionPlan,
    ) -> Result<Vec<Question>, AppError>;
}

/// Tries `primary`, then falls back to the built-in bank so a session can always start.
pub async fn generate_with_fallback(
    primary: &dyn QuestionGenerator,
    resume_text: &str,
    position: &str,
    plan: &QuestionPlan,
) -> Vec<Question> {
    match primary.generate(resume_text, position, plan).await {
        Ok(questions) if !questions.is_empty() => questions,
        Ok(_) => {
            warn!("question generator returned nothing; using static bank");
            StaticQuestionBank.questions(plan)
        }
        Err(e) => {
            warn!(error = %e, "question generation failed; using static bank");
            StaticQuestionBank.questions(plan)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// StaticQuestionBank
// ────────────────────────────────────────────────────────────────────────────

struct BankEntry {
    text: &'static str,
    difficulty: Difficulty,
    category: &'static str,
    keywords: &'static [&'static str],
}

const BANK: &[BankEntry] = &[
    BankEntry {
        text: "What is the difference between a process and a thread?",
        difficulty: Difficulty::Easy,
        category: "operating systems",
        keywords: &["memory", "address space", "shared", "scheduling"],
    },
    BankEntry {
        text: "What does an HTTP status code in the 4xx range tell the client?",
        difficulty: Difficulty::Easy,
        category: "web",
        keywords: &["client error", "request", "404", "400"],
    },
    BankEntry {
        text: "Why would you add an index to a database table, and what does it cost?",
        difficulty: Difficulty::Easy,
        category: "databases",
        keywords: &["lookup", "write", "storage", "query"],
    },
    BankEntry {
        text: "How would you design retries for calls to an unreliable external service?",
        difficulty: Difficulty::Medium,
        category: "reliability",
        keywords: &["backoff", "idempotent", "timeout", "jitter", "limit"],
    },
    BankEntry {
        text: "Explain how you would cache the results of an expensive API and keep them fresh.",
        difficulty: Difficulty::Medium,
        category: "caching",
        keywords: &["ttl", "invalidation", "stale", "hit rate"],
    },
    BankEntry {
        text: "Compare optimistic and pessimistic locking. When would you choose each?",
        difficulty: Difficulty::Medium,
        category: "concurrency",
        keywords: &["conflict", "version", "lock", "contention"],
    },
    BankEntry {
        text: "Design a rate limiter for a public API that runs on several servers.",
        difficulty: Difficulty::Hard,
        category: "system design",
        keywords: &["token bucket", "distributed", "redis", "window", "consistency"],
    },
    BankEntry {
        text: "A service's p99 latency doubled after a deploy. Walk through how you would find the cause.",
        difficulty: Difficulty::Hard,
        category: "debugging",
        keywords: &["metrics", "profiling", "rollback", "traces", "regression"],
    },
    BankEntry {
        text: "How would you migrate a large table to a new schema with no downtime?",
        difficulty: Difficulty::Hard,
        category: "databases",
        keywords: &["backfill", "dual write", "migration", "rollback", "batch"],
    },
];

/// Built-in question set, used when no model is configured or generation fails.
pub struct StaticQuestionBank;

impl StaticQuestionBank {
    pub fn questions(&self, plan: &QuestionPlan) -> Vec<Question> {
        let mut questions = Vec::with_capacity(plan.mix.total());
        for difficulty in Difficulty::ALL {
            let wanted = plan.mix.count(difficulty);
            let available: Vec<&BankEntry> =
                BANK.iter().filter(|e| e.difficulty == difficulty).collect();
            if wanted > available.len() {
                warn!(
                    difficulty = difficulty.as_str(),
                    wanted,
                    available = available.len(),
                    "static bank is short; issuing fewer questions"
                );
            }
            questions.extend(available.into_iter().take(wanted).map(|e| Question {
                id: String::new(),
                text: e.text.to_string(),
                difficulty,
                time_limit_seconds: plan.time_limits.for_difficulty(difficulty),
                category: e.category.to_string(),
                expected_keywords: e.keywords.iter().map(|k| k.to_string()).collect(),
            }));
        }
        for (i, q) in questions.iter_mut().enumerate() {
            q.id = format!("q{}", i + 1);
        }
        questions
    }
}

#[async_trait]
impl QuestionGenerator for StaticQuestionBank {
    async fn generate(
        &self,
        _resume_text: &str,
        _position: &str,
        plan: &QuestionPlan,
    ) -> Result<Vec<Question>, AppError> {
        Ok(self.questions(plan))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmQuestionGenerator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    questions: Vec<Draft>,
}

/// Resume-aware questions via Claude.
pub struct LlmQuestionGenerator(pub LlmClient);

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(
        &self,
        resume_text: &str,
        position: &str,
        plan: &QuestionPlan,
    ) -> Result<Vec<Question>, AppError> {
        let resume: String = resume_text.chars().take(MAX_RESUME_CHARS).collect();
        let prompt = GENERATE_PROMPT_TEMPLATE
            .replace("{position}", position)
            .replace("{resume}", &resume)
            .replace("{easy}", &plan.mix.easy.to_string())
            .replace("{medium}", &plan.mix.medium.to_string())
            .replace("{hard}", &plan.mix.hard.to_string());

        let generated: GeneratedQuestions = self
            .0
            .complete_json(&prompt, GENERATE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Question generation failed: {e}")))?;

        let questions = plan.assemble(generated.questions)?;
        info!(count = questions.len(), "questions generated");
        Ok(questions)
    }
}
