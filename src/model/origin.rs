//! Origin tracking: where a trait came from and why it exists at this level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The level a trait was introduced at, relative to the current delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OriginLevel {
    /// Added locally at this level.
    #[default]
    This,
    /// Inherited via modification (existed at a base level).
    Base,
    /// Inherited via derivation (existed at a super level).
    Super,
}

/// Why and where a trait exists.
///
/// Besides the level, a trait added at this level records whether it was
/// added manually and/or which other traits contribute to its existence
/// (an implemented interface, an integration map, a property needing an
/// accessor). The contributing traits are recorded by their unique
/// description strings (`"implements pkg.Runnable"`), not by reference,
/// which keeps the origin persistable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Origin {
    pub level: OriginLevel,
    pub manual: bool,
    traits: BTreeSet<String>,
}

impl Origin {
    /// An origin carrying no information at all.
    pub fn nothing() -> Self {
        Origin::default()
    }

    /// A manual origin at this level.
    pub fn manual() -> Self {
        Origin {
            manual: true,
            ..Origin::default()
        }
    }

    /// An origin at the given level with nothing else recorded.
    pub fn at(level: OriginLevel) -> Self {
        Origin {
            level,
            ..Origin::default()
        }
    }

    pub fn is_declared_at_this_level(&self) -> bool {
        self.level == OriginLevel::This
    }

    pub fn is_from_base(&self) -> bool {
        self.level == OriginLevel::Base
    }

    pub fn is_from_super(&self) -> bool {
        self.level == OriginLevel::Super
    }

    /// True if any trait contributes to this origin.
    pub fn is_from_trait(&self) -> bool {
        !self.traits.is_empty()
    }

    /// True if the given description contributes to this origin.
    pub fn has_trait(&self, description: &str) -> bool {
        self.traits.contains(description)
    }

    /// True if any contributing trait carries the given descriptor prefix
    /// (e.g. `"implements"`).
    pub fn has_descriptor(&self, descriptor: &str) -> bool {
        let prefix = format!("{descriptor} ");
        self.traits.iter().any(|t| t.starts_with(&prefix))
    }

    /// The names recorded under the given descriptor prefix.
    pub fn names_for(&self, descriptor: &str) -> Vec<&str> {
        let prefix = format!("{descriptor} ");
        self.traits
            .iter()
            .filter_map(|t| t.strip_prefix(prefix.as_str()))
            .collect()
    }

    /// All contributing trait descriptions.
    pub fn traits(&self) -> impl Iterator<Item = &str> {
        self.traits.iter().map(String::as_str)
    }

    pub fn add_trait(&mut self, description: impl Into<String>) {
        self.traits.insert(description.into());
    }

    pub fn remove_trait(&mut self, description: &str) {
        self.traits.remove(description);
    }

    /// True if any reason other than the manual bit keeps this trait alive.
    pub fn is_from_non_manual(&self) -> bool {
        self.level != OriginLevel::This || self.is_from_trait()
    }

    /// True if no reason at all keeps this trait alive.
    pub fn is_from_nothing(&self) -> bool {
        self.level == OriginLevel::This && !self.manual && self.traits.is_empty()
    }

    /// Drop everything but the manual bit; used when an extract finalizes.
    pub fn retain_manual_only(&mut self) {
        self.level = OriginLevel::This;
        self.traits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_has_no_reasons() {
        let origin = Origin::nothing();
        assert!(origin.is_from_nothing());
        assert!(!origin.is_from_non_manual());
    }

    #[test]
    fn contributing_traits_keep_an_origin_alive() {
        let mut origin = Origin::nothing();
        origin.add_trait("implements pkg.Runnable");
        assert!(!origin.is_from_nothing());
        assert!(origin.is_from_non_manual());
        assert!(origin.has_descriptor("implements"));
        assert_eq!(origin.names_for("implements"), vec!["pkg.Runnable"]);

        origin.remove_trait("implements pkg.Runnable");
        assert!(origin.is_from_nothing());
    }

    #[test]
    fn retain_manual_only_clears_level_and_traits() {
        let mut origin = Origin::at(OriginLevel::Super);
        origin.manual = true;
        origin.add_trait("property Size");
        origin.retain_manual_only();
        assert!(origin.manual);
        assert!(origin.is_declared_at_this_level());
        assert!(!origin.is_from_trait());
    }
}
