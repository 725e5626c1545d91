//! Resume intake: turns an uploaded file into resume text plus whatever contact
//! fields can be read from it. Anything not found is left for the candidate to type.

use std::sync::OnceLock;

use bytes::Bytes;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::session::profile::{normalize_field, CandidateProfile, ProfileField};

/// Lines scanned from the top of the resume when looking for the candidate's name.
const NAME_SCAN_LINES: usize = 5;

const HEADING_WORDS: &[&str] = &["resume", "résumé", "curriculum", "vitae", "cv", "profile"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_text: String,
}

impl ExtractedResume {
    /// Builds the initial profile, marking each field that came from the resume.
    pub fn into_profile(self, position: String) -> CandidateProfile {
        let extracted_fields = [
            (ProfileField::Name, self.name.is_some()),
            (ProfileField::Email, self.email.is_some()),
            (ProfileField::Phone, self.phone.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, found)| found.then_some(field))
        .collect();

        CandidateProfile {
            name: self.name,
            email: self.email,
            phone: self.phone,
            position,
            resume_text: self.resume_text,
            extracted_fields,
        }
    }
}

/// Reads a PDF or plain-text resume.
///
/// PDF parsing is CPU-bound and runs on the blocking pool.
pub async fn extract_resume_fields(
    bytes: Bytes,
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<ExtractedResume, AppError> {
    let text = if is_pdf(&bytes, content_type, file_name) {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed extracting resume: {e}"))
            })?
            .map_err(|e| AppError::UnprocessableEntity(format!("could not read PDF resume: {e}")))?
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            AppError::UnprocessableEntity("resume must be a PDF or UTF-8 text file".to_string())
        })?
    };

    if text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "resume contains no readable text".to_string(),
        ));
    }

    let extracted = parse_resume_text(&text);
    info!(
        chars = extracted.resume_text.len(),
        name = extracted.name.is_some(),
        email = extracted.email.is_some(),
        phone = extracted.phone.is_some(),
        "resume extracted"
    );
    Ok(extracted)
}

fn is_pdf(bytes: &[u8], content_type: Option<&str>, file_name: Option<&str>) -> bool {
    bytes.starts_with(b"%PDF")
        || content_type.is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"))
        || file_name.is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid regex")
    })
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?\(?\d[\d\s\-().]{8,}\d").expect("valid regex"))
}

/// Pulls name, email and phone out of resume text. Values that fail field
/// validation are dropped rather than stored.
pub fn parse_resume_text(text: &str) -> ExtractedResume {
    let email = email_regex()
        .find(text)
        .and_then(|m| normalize_field(ProfileField::Email, m.as_str()).ok());

    let phone = phone_regex()
        .find_iter(text)
        .find_map(|m| normalize_field(ProfileField::Phone, m.as_str()).ok());

    let name = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(NAME_SCAN_LINES)
        .find(|l| looks_like_name(l))
        .and_then(|l| normalize_field(ProfileField::Name, l).ok());

    debug!(?name, ?email, ?phone, "parsed resume fields");
    ExtractedResume {
        name,
        email,
        phone,
        resume_text: text.trim().to_string(),
    }
}

fn looks_like_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) || line.len() > 60 {
        return false;
    }
    if line.contains('@') || line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    words.iter().all(|w| {
        let lower = w.to_lowercase();
        w.chars().next().is_some_and(char::is_uppercase)
            && w.chars().all(|c| c.is_alphabetic() || "-'.".contains(c))
            && !HEADING_WORDS.contains(&lower.as_str())
    })
}
