use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::intake::questions::{DifficultyMix, QuestionPlan, TimeLimits};
use crate::session::controller::EngineSettings;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// When absent, the keyword scorer and the static question bank are used.
    pub anthropic_api_key: Option<String>,
    pub enable_llm_scoring: bool,
    pub violation_grace: Duration,
    pub scoring_timeout: Duration,
    pub persist_timeout: Duration,
    /// How long a finished session stays live before only its archived report remains.
    pub session_linger: Duration,
    pub question_plan: QuestionPlan,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = QuestionPlan::default();
        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            enable_llm_scoring: env_or("ENABLE_LLM_SCORING", false)?,
            violation_grace: Duration::from_millis(env_or("VIOLATION_GRACE_MS", 1500)?),
            scoring_timeout: Duration::from_secs(env_or("SCORING_TIMEOUT_SECS", 20)?),
            persist_timeout: Duration::from_secs(env_or("PERSIST_TIMEOUT_SECS", 5)?),
            session_linger: Duration::from_secs(env_or("SESSION_LINGER_SECS", 300)?),
            question_plan: QuestionPlan {
                mix: DifficultyMix {
                    easy: env_or("QUESTIONS_EASY", defaults.mix.easy)?,
                    medium: env_or("QUESTIONS_MEDIUM", defaults.mix.medium)?,
                    hard: env_or("QUESTIONS_HARD", defaults.mix.hard)?,
                },
                time_limits: TimeLimits {
                    easy: env_or("TIME_LIMIT_EASY", defaults.time_limits.easy)?,
                    medium: env_or("TIME_LIMIT_MEDIUM", defaults.time_limits.medium)?,
                    hard: env_or("TIME_LIMIT_HARD", defaults.time_limits.hard)?,
                },
            },
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            grace_delay: self.violation_grace,
            scoring_timeout: self.scoring_timeout,
            persist_timeout: self.persist_timeout,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
