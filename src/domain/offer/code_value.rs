//! Offer code value object.
//!
//! Shared by generic promo codes and tariff promo codes.
//!
//! # Validation Rules
//!
//! - Surrounding whitespace is ignored
//! - Length: 3-32 characters
//! - Characters: ASCII letters, digits, `-` and `_`
//! - Stored uppercase, so lookups are case-insensitive

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 32;

/// A code string in canonical form, e.g. `SPRING-2024`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeValue(String);

impl CodeValue {
    /// Parses and normalizes a code typed by a customer or an administrator.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the code is empty, has the wrong length
    /// or contains characters outside the allowed set.
    pub fn try_new(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }

        let len = trimmed.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(ValidationError::out_of_range(
                "code_length",
                MIN_LEN as i64,
                MAX_LEN as i64,
                len as i64,
            ));
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::invalid_format(
                "code",
                "letters, digits, '-' and '_' only",
            ));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CodeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CodeValue {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_new(&value)
    }
}

impl From<CodeValue> for String {
    fn from(code: CodeValue) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_uppercase_and_trims() {
        let code = CodeValue::try_new("  spring_2024 ").unwrap();
        assert_eq!(code.as_str(), "SPRING_2024");
    }

    #[test]
    fn accepts_boundary_lengths() {
        assert!(CodeValue::try_new("ABC").is_ok());
        assert!(CodeValue::try_new(&"A".repeat(32)).is_ok());
    }

    #[test]
    fn rejects_too_short() {
        assert!(matches!(
            CodeValue::try_new("AB"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_too_long() {
        assert!(CodeValue::try_new(&"A".repeat(33)).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            CodeValue::try_new("   "),
            Err(ValidationError::EmptyField { .. })
        ));
    }

    #[test]
    fn rejects_spaces_and_symbols() {
        assert!(CodeValue::try_new("SPRING 2024").is_err());
        assert!(CodeValue::try_new("FREE!").is_err());
        assert!(CodeValue::try_new("КОД123").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<CodeValue, _> = serde_json::from_str("\"welcome\"");
        assert_eq!(ok.unwrap().as_str(), "WELCOME");
        let bad: Result<CodeValue, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
