//! Interview intake: resume extraction and question generation.

pub mod prompts;
pub mod questions;
pub mod resume;
