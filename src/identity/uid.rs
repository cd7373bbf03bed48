//! Stable secondary identifiers.
//!
//! A UID is an identification tag unrelated to the trait information itself.
//! It lets derivation and modification traits repair links to their
//! super/base traits when the primary identifier (a name or a signature)
//! changes at the base level: the renamed member no longer matches by name,
//! but it still matches by UID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A stable secondary identifier, assigned once and propagated untouched
/// through resolve and extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(Uuid);

impl Uid {
    /// Generate a fresh UID.
    pub fn generate() -> Self {
        Uid(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Uid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Uid(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for Uid {
    fn from(value: Uuid) -> Self {
        Uid(value)
    }
}
