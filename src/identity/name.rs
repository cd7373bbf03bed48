//! Qualified component names.
//!
//! A global name is a dot-delimited package path plus a simple name, e.g.
//! `util.collections.Cache`. A child component is addressed by appending
//! `$` and the child's simple name to its containing component's qualified
//! name, e.g. `util.collections.Cache$Entry`. Qualified names are always
//! case-sensitive, regardless of the member-table case policy of the
//! component they identify.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{Error, Result};

/// A validated, case-sensitive qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    full: String,
}

impl QualifiedName {
    /// Parse and validate a qualified name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let full = name.into();
        validate(&full)?;
        Ok(QualifiedName { full })
    }

    /// The full dotted (and possibly `$`-suffixed) name.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// The simple (unqualified) name: everything after the last `$` or `.`.
    pub fn simple_name(&self) -> &str {
        let start = self
            .full
            .rfind(['$', '.'])
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.full[start..]
    }

    /// The global portion of the name (everything before the first `$`).
    pub fn global_name(&self) -> &str {
        match self.full.find('$') {
            Some(i) => &self.full[..i],
            None => &self.full,
        }
    }

    /// True if this name addresses a child component.
    pub fn is_child(&self) -> bool {
        self.full.contains('$')
    }

    /// The qualified name of the containing component, if any.
    pub fn parent(&self) -> Option<QualifiedName> {
        self.full.rfind('$').map(|i| QualifiedName {
            full: self.full[..i].to_string(),
        })
    }

    /// The qualified name of a child of this component.
    pub fn child(&self, simple: &str) -> Result<QualifiedName> {
        validate_simple(simple)
            .map_err(|reason| Error::malformed_name(simple, reason))?;
        Ok(QualifiedName {
            full: format!("{}${}", self.full, simple),
        })
    }

    /// The package portion of the global name, or an empty string for an
    /// unpackaged name.
    pub fn package(&self) -> &str {
        let global = self.global_name();
        match global.rfind('.') {
            Some(i) => &global[..i],
            None => "",
        }
    }
}

fn validate(full: &str) -> Result<()> {
    if full.is_empty() {
        return Err(Error::malformed_name(full, "empty name"));
    }

    let (global, children) = match full.find('$') {
        Some(i) => (&full[..i], Some(&full[i + 1..])),
        None => (full, None),
    };

    for segment in global.split('.') {
        validate_simple(segment).map_err(|reason| Error::malformed_name(full, reason))?;
    }

    if let Some(children) = children {
        for segment in children.split('$') {
            validate_simple(segment).map_err(|reason| Error::malformed_name(full, reason))?;
        }
    }

    Ok(())
}

fn validate_simple(segment: &str) -> std::result::Result<(), String> {
    let mut chars = segment.chars();
    match chars.next() {
        None => return Err("empty name segment".to_string()),
        Some(c) if c.is_alphabetic() || c == '_' => {}
        Some(c) => return Err(format!("segment starts with {c:?}")),
    }
    if let Some(c) = chars.find(|c| !c.is_alphanumeric() && *c != '_') {
        return Err(format!("segment contains {c:?}"));
    }
    Ok(())
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for QualifiedName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        QualifiedName::new(s)
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        QualifiedName::new(value)
    }
}

impl From<QualifiedName> for String {
    fn from(value: QualifiedName) -> Self {
        value.full
    }
}
