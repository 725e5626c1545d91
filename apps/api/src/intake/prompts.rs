// Prompt constants for interview question generation.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for question generation.
pub const GENERATE_SYSTEM: &str = JSON_ONLY_SYSTEM;

/// Resume text beyond this many characters is cut before prompting.
pub const MAX_RESUME_CHARS: usize = 6000;

/// Question generation template. Replace `{position}`, `{resume}`, `{easy}`,
/// `{medium}` and `{hard}` before sending.
pub const GENERATE_PROMPT_TEMPLATE: &str = r#"You are preparing a timed technical interview for a {position} candidate.

CANDIDATE RESUME:
{resume}

Write exactly {easy} easy, {medium} medium and {hard} hard questions, in that order.
Easy questions check fundamentals and can be answered in a few sentences.
Medium questions ask the candidate to explain a design or trade-off.
Hard questions probe depth: failure modes, performance, or system design.
Tie questions to technologies on the resume where it makes sense.
For each question list 3 to 6 short concepts a strong answer would mention.

Return a JSON object with this EXACT schema (no extra fields):
{"questions": [{"text": "...", "difficulty": "easy" | "medium" | "hard", "category": "short topic", "expected_keywords": ["..."]}]}"#;
