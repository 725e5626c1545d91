use std::sync::Arc;

use crate::config::Config;
use crate::intake::questions::QuestionGenerator;
use crate::scoring::ResponseScorer;
use crate::session::registry::SessionRegistry;
use crate::session::store::PgInterviewStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
    /// Pluggable answer scorer. Default: KeywordResponseScorer. Swap via ENABLE_LLM_SCORING.
    pub scorer: Arc<dyn ResponseScorer>,
    /// Default: StaticQuestionBank. LlmQuestionGenerator when ANTHROPIC_API_KEY is set.
    pub question_generator: Arc<dyn QuestionGenerator>,
    pub store: Arc<PgInterviewStore>,
}
