//! Bounded diagnostic accumulation for resolve/extract.
//!
//! Structural conflicts never abort a merge; they are appended here and the
//! offending delta fragment is discarded. The only hard failure is sink
//! overflow: once the capacity is reached, any further diagnostic raises
//! [`Error::DiagnosticOverflow`] and unwinds the merge.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{Error, Result};
use crate::core::types::Severity;

/// Machine-readable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// Base and delta carry differing UIDs during resolve.
    UidChangedOnResolve,
    /// Base and derived carry differing UIDs during extract.
    UidChangedOnExtract,
    /// A trait had to be forced into the resolved mode at finalization.
    ForcedResolve,
    /// A property delta was discarded during resolve.
    PropertyDiscardedOnResolve,
    /// A property delta was discarded during extract.
    PropertyDiscardedOnExtract,
    /// A behavior delta was discarded during resolve.
    BehaviorDiscardedOnResolve,
    /// A behavior delta was discarded during extract.
    BehaviorDiscardedOnExtract,
    /// A child component delta was discarded during resolve.
    ChildDiscardedOnResolve,
    /// A child component delta was discarded during extract.
    ChildDiscardedOnExtract,
    /// A member addition collided with a name reserved by the base.
    ReservedNameCollision,
    /// An interface could not be loaded through the loader.
    InterfaceMissing,
    /// An interface member failed signature-compatibility validation.
    InterfaceMismatch,
    /// An integration mapping could not be applied.
    IntegrationMismatch,
    /// A new child's super component could not be loaded.
    SuperMissing,
    /// A new child's super component is final.
    SuperFinal,
    /// A new child satisfies no declared aggregation category.
    CategoryViolation,
    /// A behavior exception entry was discarded.
    ExceptionDiscarded,
    /// Base and delta disagree on an attribute that must match.
    AttributeMismatch,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One accumulated diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    /// Dotted path of the trait the diagnostic concerns, e.g.
    /// `util.Cache$Entry.getKey()`.
    pub location: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.code, self.location, self.message
        )
    }
}

/// Append-only, bounded diagnostic sink.
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    items: Vec<Diagnostic>,
    capacity: usize,
}

impl DiagnosticSink {
    /// Default capacity used by [`DiagnosticSink::new`].
    pub const DEFAULT_CAPACITY: usize = 1_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DiagnosticSink {
            items: Vec::new(),
            capacity,
        }
    }

    /// Append a diagnostic, failing hard when the sink is full.
    pub fn log(
        &mut self,
        code: Code,
        severity: Severity,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(Error::DiagnosticOverflow {
                capacity: self.capacity,
            });
        }
        let diag = Diagnostic {
            code,
            severity,
            message: message.into(),
            location: location.into(),
        };
        log::debug!("{diag}");
        self.items.push(diag);
        Ok(())
    }

    pub fn warn(
        &mut self,
        code: Code,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.log(code, Severity::Warning, location, message)
    }

    pub fn info(
        &mut self,
        code: Code,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.log(code, Severity::Info, location, message)
    }

    /// True if any accumulated diagnostic is `Error` or worse.
    pub fn has_severe(&self) -> bool {
        self.items.iter().any(|d| d.severity >= Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_accumulates_and_reports_severity() {
        let mut sink = DiagnosticSink::new();
        sink.info(Code::AttributeMismatch, "a.B", "auto-corrected")
            .unwrap();
        sink.warn(Code::UidChangedOnResolve, "a.B.fire()", "uid mismatch")
            .unwrap();
        assert_eq!(sink.len(), 2);
        assert!(!sink.has_severe());

        sink.log(Code::InterfaceMissing, Severity::Error, "a.B", "gone")
            .unwrap();
        assert!(sink.has_severe());
    }

    #[test]
    fn overflow_is_a_hard_fault() {
        let mut sink = DiagnosticSink::with_capacity(1);
        sink.warn(Code::ForcedResolve, "x", "first").unwrap();
        let err = sink.warn(Code::ForcedResolve, "x", "second").unwrap_err();
        assert!(matches!(err, Error::DiagnosticOverflow { capacity: 1 }));
        assert_eq!(sink.len(), 1);
    }
}
