//! Shared error types for the engine.

use thiserror::Error;

use crate::core::types::Mode;

/// Main error type for compdef operations.
///
/// Structural conflicts during a merge are *not* errors; they are logged to
/// the diagnostic sink and the merge proceeds. The variants here are either
/// caller contract violations or the sink-overflow fault that aborts an
/// in-progress merge.
#[derive(Debug, Error)]
pub enum Error {
    /// A trait was constructed with, or asked to operate in, an illegal mode.
    #[error("illegal mode {mode} for {context}")]
    IllegalMode { context: &'static str, mode: Mode },

    /// A qualified name passed to an internal API was malformed.
    #[error("malformed qualified name {name:?}: {reason}")]
    MalformedName { name: String, reason: String },

    /// The diagnostic sink filled up; the merge is aborted.
    #[error("diagnostic sink overflow (capacity {capacity})")]
    DiagnosticOverflow { capacity: usize },

    /// A single attribute mutation was rejected.
    #[error("attribute {attribute} change rejected ({prev} -> {next}): {reason}")]
    RejectedAttribute {
        attribute: &'static str,
        prev: String,
        next: String,
        reason: String,
    },

    /// An operation was requested on a trait in the wrong processing state.
    #[error("illegal process state for {context}")]
    IllegalState { context: &'static str },

    /// Persistence envelope carries an unknown format version.
    #[error("unknown persistence format version {found} (expected <= {supported})")]
    UnknownVersion { found: u16, supported: u16 },

    /// Binary codec errors from the persistence layer.
    #[error(transparent)]
    Codec(#[from] postcard::Error),

    /// JSON errors from the persistence layer.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed-name error.
    pub fn malformed_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a rejected-attribute error.
    pub fn rejected(
        attribute: &'static str,
        prev: impl ToString,
        next: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::RejectedAttribute {
            attribute,
            prev: prev.to_string(),
            next: next.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using the crate error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = Error::IllegalMode {
            context: "blank trait construction",
            mode: Mode::Invalid,
        };
        assert!(err.to_string().contains("blank trait construction"));

        let err = Error::rejected("Access", "public", "private", "final base");
        assert!(err.to_string().contains("Access"));
        assert!(err.to_string().contains("final base"));
    }
}
