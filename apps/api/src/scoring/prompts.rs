// Prompt constants for answer scoring.
// Reuses the JSON-only fragment from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for scoring one interview answer.
pub const SCORE_SYSTEM: &str = JSON_ONLY_SYSTEM;

/// Scoring prompt template. Replace `{question}`, `{difficulty}`, `{category}`,
/// `{keywords}`, `{time_used}`, `{time_limit}` and `{answer}` before sending.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"You are grading one answer from a timed technical interview.

QUESTION ({difficulty}, {category}): {question}
CONCEPTS A STRONG ANSWER MENTIONS: {keywords}
TIME USED: {time_used}s of {time_limit}s

CANDIDATE ANSWER:
{answer}

Grade on correctness, depth, and clarity. Do not reward length for its own sake.
Write one sentence of feedback addressed to the candidate: name what was done well
if the answer is strong, or the most important missing concept if it is not.

Return a JSON object with this EXACT schema (no extra fields):
{"score": 0-100, "feedback": "one sentence"}"#;
