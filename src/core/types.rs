//! Common type definitions used across the codebase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Merge mode of a trait.
///
/// The mode is fixed when the trait is constructed; `Invalid` is a terminal
/// sink reached only through `invalidate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// A fully merged trait; the only mode the editing surface operates on.
    Resolved,
    /// A delta that extends a global base, producing a new named entity.
    Derivation,
    /// A delta that refines an existing entity without changing its identity.
    Modification,
    /// A discarded trait; every operation on it is a contract violation.
    Invalid,
}

impl Mode {
    /// True for the two delta modes.
    pub fn is_delta(&self) -> bool {
        matches!(self, Mode::Derivation | Mode::Modification)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Resolved => "resolved",
            Mode::Derivation => "derivation",
            Mode::Modification => "modification",
            Mode::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Processing state guarding that resolve/extract are finalized exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProcessState {
    #[default]
    New,
    Resolving,
    Resolved,
    Extracting,
}

/// Existence lifecycle of a sub-trait at one level.
///
/// Legal transitions are `Insert -> Update -> Delete` and `Update -> Delete`;
/// a `Delete` can be undone back to `Update`. `Not` means the name is
/// reserved but never materialized at this level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Exists {
    Not,
    Insert,
    #[default]
    Update,
    Delete,
}

impl fmt::Display for Exists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Exists::Not => "not",
            Exists::Insert => "insert",
            Exists::Update => "update",
            Exists::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Tool visibility of a trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Visibility {
    System,
    Hidden,
    Advanced,
    #[default]
    Visible,
}

/// Accessibility of a member.
///
/// Ordered so that escalation checks can compare variants directly:
/// `Private < Package < Protected < Public`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Access {
    Private,
    Package,
    Protected,
    #[default]
    Public,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Access::Private => "private",
            Access::Package => "package",
            Access::Protected => "protected",
            Access::Public => "public",
        };
        f.write_str(s)
    }
}

/// Static vs. instance scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Scope {
    #[default]
    Instance,
    Static,
}

/// Behavior synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Synchronization {
    #[default]
    NonSync,
    Monitor,
}

/// Abstract vs. concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Implementation {
    #[default]
    Concrete,
    Abstract,
}

/// Whether further levels may alter derivable attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Derivability {
    #[default]
    Derivable,
    Final,
}

/// Deprecation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Antiquity {
    #[default]
    Current,
    Deprecated,
}

/// Property persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Persistence {
    #[default]
    Transient,
    Persistent,
}

/// Local vs. remote distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Distribution {
    #[default]
    Local,
    Remote,
}

/// Parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    #[default]
    In,
    Out,
    InOut,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
        };
        f.write_str(s)
    }
}

/// Severity levels for diagnostics.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}
