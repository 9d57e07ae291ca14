//! Validation result types

use serde::Deserialize;
use serde::Serialize;

/// Outcome of validating a filter value or a query.
///
/// Validation never fails with an error; callers decide whether an invalid
/// result blocks the operation or is coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the value satisfied the contract.
    pub valid: bool,
    /// Explanation when `valid` is `false`.
    pub message: Option<String>,
}

impl ValidationResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    /// A failing result with the given message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }

    /// Returns `true` if the result is valid.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None if self.valid => f.write_str("valid"),
            None => f.write_str("invalid"),
        }
    }
}
