//! Input Limits
//!
//! Validation applied to user submissions before they reach the chat backend:
//! - Oversized messages
//! - Control character injection (terminal escape sequences pasted into the composer)
//!
//! Attachment size is bounded separately when the file is loaded
//! (see [`crate::attachment`]).

use serde::{Deserialize, Serialize};

/// Configuration limits for the Conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorLimits {
    /// Maximum size of a single message in bytes (default: 32KB)
    pub max_message_size: usize,
    /// Maximum size of an image attachment in bytes (default: 20MB)
    pub max_attachment_bytes: u64,
}

impl Default for ConductorLimits {
    fn default() -> Self {
        Self {
            max_message_size: 32 * 1024,
            max_attachment_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Result of input validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    /// Input is valid
    Valid,
    /// Input is invalid with reason
    Invalid(String),
}

impl ValidationResult {
    /// Check if the result indicates valid input
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Get the error message if invalid
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid(msg) => Some(msg),
        }
    }
}

/// Input validator for surface events
#[derive(Clone, Debug, Default)]
pub struct InputValidator {
    limits: ConductorLimits,
}

impl InputValidator {
    /// Create a new input validator with the given limits
    #[must_use]
    pub fn new(limits: ConductorLimits) -> Self {
        Self { limits }
    }

    /// Validate a user message
    #[must_use]
    pub fn validate_message(&self, content: &str) -> ValidationResult {
        if content.len() > self.limits.max_message_size {
            return ValidationResult::Invalid(format!(
                "Message too large: {} bytes (max: {})",
                content.len(),
                self.limits.max_message_size
            ));
        }

        // Control characters other than newline, tab and CR
        if content
            .chars()
            .any(|c| c.is_control() && c != '\n' && c != '\t' && c != '\r')
        {
            return ValidationResult::Invalid(
                "Message contains invalid control characters".to_string(),
            );
        }

        ValidationResult::Valid
    }

    /// The limits in force
    #[must_use]
    pub fn limits(&self) -> &ConductorLimits {
        &self.limits
    }
}
