use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::error::SessionError;

/// Candidate fields that must be present before an interview can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Email,
    Phone,
}

impl ProfileField {
    pub const REQUIRED: [ProfileField; 3] =
        [ProfileField::Name, ProfileField::Email, ProfileField::Phone];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::Name => "name",
            ProfileField::Email => "email",
            ProfileField::Phone => "phone",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: String,
    pub resume_text: String,
    /// Fields that were filled from the resume rather than typed by the candidate.
    pub extracted_fields: Vec<ProfileField>,
}

impl CandidateProfile {
    pub fn missing_fields(&self) -> Vec<ProfileField> {
        ProfileField::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn get(&self, field: ProfileField) -> Option<&str> {
        let value = match field {
            ProfileField::Name => &self.name,
            ProfileField::Email => &self.email,
            ProfileField::Phone => &self.phone,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Validates and stores one field. The previous value is kept on error.
    pub fn set(&mut self, field: ProfileField, value: &str) -> Result<(), SessionError> {
        let value = normalize_field(field, value)?;
        let slot = match field {
            ProfileField::Name => &mut self.name,
            ProfileField::Email => &mut self.email,
            ProfileField::Phone => &mut self.phone,
        };
        *slot = Some(value);
        self.extracted_fields.retain(|f| *f != field);
        Ok(())
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid regex")
    })
}

/// Trims and checks a raw field value, returning the stored form.
pub fn normalize_field(field: ProfileField, raw: &str) -> Result<String, SessionError> {
    let value = raw.trim();
    let invalid = |message: &str| SessionError::Validation {
        field,
        message: message.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("value cannot be empty"));
    }

    match field {
        ProfileField::Name => {
            if !value.chars().any(|c| c.is_alphabetic()) {
                return Err(invalid("name must contain letters"));
            }
            Ok(value.split_whitespace().collect::<Vec<_>>().join(" "))
        }
        ProfileField::Email => {
            if !email_regex().is_match(value) {
                return Err(invalid("not a valid email address"));
            }
            Ok(value.to_lowercase())
        }
        ProfileField::Phone => {
            let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
            let allowed = value
                .chars()
                .all(|c| c.is_ascii_digit() || " +-().".contains(c));
            if !allowed || !(10..=15).contains(&digits) {
                return Err(invalid("phone must have 10 to 15 digits"));
            }
            Ok(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_lists_all_when_empty() {
        let profile = CandidateProfile::default();
        assert_eq!(profile.missing_fields(), ProfileField::REQUIRED.to_vec());
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let profile = CandidateProfile {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(profile.missing_fields().contains(&ProfileField::Name));
    }

    #[test]
    fn test_set_email_normalizes_case() {
        let mut profile = CandidateProfile::default();
        profile.set(ProfileField::Email, " Ada@Example.COM ").unwrap();
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_invalid_email_is_rejected_and_previous_kept() {
        let mut profile = CandidateProfile {
            email: Some("ada@example.com".to_string()),
            ..Default::default()
        };
        let err = profile.set(ProfileField::Email, "not-an-email").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation {
                field: ProfileField::Email,
                ..
            }
        ));
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_phone_digit_count() {
        assert!(normalize_field(ProfileField::Phone, "+1 (555) 123-4567").is_ok());
        assert!(normalize_field(ProfileField::Phone, "12345").is_err());
        assert!(normalize_field(ProfileField::Phone, "555-CALL-NOW").is_err());
    }

    #[test]
    fn test_manual_entry_clears_extracted_marker() {
        let mut profile = CandidateProfile {
            name: Some("A Lovelace".to_string()),
            extracted_fields: vec![ProfileField::Name],
            ..Default::default()
        };
        profile.set(ProfileField::Name, "Ada   Lovelace").unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
        assert!(profile.extracted_fields.is_empty());
    }
}
