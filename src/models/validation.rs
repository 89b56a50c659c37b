//! Field-level validation shared by every workflow form.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Rejected form input. Shown inline next to the offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} is invalid: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Status cannot change from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("This visit has already been submitted")]
    AlreadySubmitted,
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Name of the field the message belongs to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidValue { field, .. } => Some(field),
            Self::IllegalTransition { .. } | Self::AlreadySubmitted => None,
        }
    }
}

/// Trimmed, non-empty text or `MissingField`.
pub fn require_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(trimmed.to_string())
}

/// `Some` value or `MissingField`.
pub fn require<T>(field: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::missing(field))
}

/// Backend ids are positive integers.
pub fn require_id(field: &str, value: Option<i64>) -> Result<i64, ValidationError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        Some(id) => Err(ValidationError::invalid(field, format!("{id} is not a valid id"))),
        None => Err(ValidationError::missing(field)),
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"))
}

fn digits_pattern(min: usize, max: usize) -> Regex {
    Regex::new(&format!(r"^[0-9]{{{min},{max}}}$")).expect("digit-count pattern")
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| digits_pattern(10, 11))
}

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| digits_pattern(11, 11))
}

/// Required e-mail address, trimmed.
pub fn require_email(field: &str, value: &str) -> Result<String, ValidationError> {
    let email = require_text(field, value)?;
    if !email_pattern().is_match(&email) {
        return Err(ValidationError::invalid(field, "not a valid e-mail address"));
    }
    Ok(email)
}

/// Required phone number of 10 or 11 digits.
pub fn require_phone(field: &str, value: &str) -> Result<String, ValidationError> {
    let phone = require_text(field, value)?;
    if !phone_pattern().is_match(&phone) {
        return Err(ValidationError::invalid(field, "expected 10 or 11 digits"));
    }
    Ok(phone)
}

/// Required 11-digit national identity number.
pub fn require_national_id(field: &str, value: &str) -> Result<String, ValidationError> {
    let id = require_text(field, value)?;
    if !national_id_pattern().is_match(&id) {
        return Err(ValidationError::invalid(field, "expected 11 digits"));
    }
    Ok(id)
}

fn icd10_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-TV-Z][0-9][0-9A-Z](\.[0-9A-Z]{1,4})?$").expect("static ICD-10 pattern")
    })
}

/// ICD-10 code such as `I10`, `E11.9` or `S72.001A`. Normalized to upper case.
pub fn normalize_icd10(code: &str) -> Result<String, ValidationError> {
    let normalized = code.trim().to_ascii_uppercase();
    if icd10_pattern().is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ValidationError::invalid(
            "icdCode",
            format!("'{}' is not an ICD-10 code", code.trim()),
        ))
    }
}
