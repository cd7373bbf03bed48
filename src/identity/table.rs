//! Insertion-ordered member tables with a case-folding policy.
//!
//! Every member kind of a component (properties, behaviors, children,
//! interfaces) lives in a table keyed by a unique per-kind name. Definition
//! tables fold case on lookup (two members named `foo` and `Foo` collide);
//! Signature tables are case-sensitive, mirroring the reflected type
//! system's own rules. Iteration is always in insertion order.

use serde::{Deserialize, Serialize};

/// Key comparison policy for a [`TraitTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CaseMode {
    #[default]
    Insensitive,
    Sensitive,
}

impl CaseMode {
    fn keys_match(&self, a: &str, b: &str) -> bool {
        match self {
            CaseMode::Sensitive => a == b,
            CaseMode::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// An insertion-ordered map from member key to member, with case policy.
///
/// Tables are expected to stay small (tens of members); lookups scan the
/// entry list, which keeps the representation trivially serializable and
/// order-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitTable<T> {
    case: CaseMode,
    entries: Vec<(String, T)>,
}

impl<T> TraitTable<T> {
    /// Create an empty table with the given case policy.
    pub fn new(case: CaseMode) -> Self {
        TraitTable {
            case,
            entries: Vec::new(),
        }
    }

    /// The table's case policy.
    pub fn case(&self) -> CaseMode {
        self.case
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a member by key, honoring the case policy.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(k, _)| self.case.keys_match(k, key))
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        let case = self.case;
        self.entries
            .iter_mut()
            .find(|(k, _)| case.keys_match(k, key))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a member, replacing (in place) any member whose key matches
    /// under the case policy. Returns the replaced member.
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        let case = self.case;
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| case.keys_match(k, &key))
        {
            let old = std::mem::replace(&mut slot.1, value);
            slot.0 = key;
            Some(old)
        } else {
            self.entries.push((key, value));
            None
        }
    }

    /// Remove a member by key.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| self.case.keys_match(k, key))?;
        Some(self.entries.remove(pos).1)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().map(|(_, v)| v)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True if both tables contain exactly the same key set under this
    /// table's case policy, regardless of order.
    pub fn keys_equal(&self, other: &TraitTable<T>) -> bool {
        self.len() == other.len() && self.keys().all(|k| other.contains_key(k))
    }

    /// Keep only the entries whose value satisfies the predicate.
    pub fn retain(&mut self, mut f: impl FnMut(&str, &T) -> bool) {
        self.entries.retain(|(k, v)| f(k, v));
    }

    /// Map values into a new table with the same keys, order, and policy.
    pub fn map<U>(&self, mut f: impl FnMut(&str, &T) -> U) -> TraitTable<U> {
        TraitTable {
            case: self.case,
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), f(k, v)))
                .collect(),
        }
    }
}

impl<T> Default for TraitTable<T> {
    fn default() -> Self {
        TraitTable::new(CaseMode::Insensitive)
    }
}

impl<'a, T> IntoIterator for &'a TraitTable<T> {
    type Item = (&'a str, &'a T);
    type IntoIter = std::vec::IntoIter<(&'a str, &'a T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insensitive_tables_fold_case() {
        let mut tbl = TraitTable::new(CaseMode::Insensitive);
        assert!(tbl.insert("foo", 1).is_none());
        assert_eq!(tbl.insert("Foo", 2), Some(1));
        assert_eq!(tbl.len(), 1);
        assert_eq!(tbl.get("FOO"), Some(&2));
        // replacement keeps the position but adopts the new spelling
        assert_eq!(tbl.keys().collect::<Vec<_>>(), vec!["Foo"]);
    }

    #[test]
    fn sensitive_tables_keep_distinct_spellings() {
        let mut tbl = TraitTable::new(CaseMode::Sensitive);
        assert!(tbl.insert("foo", 1).is_none());
        assert!(tbl.insert("Foo", 2).is_none());
        assert_eq!(tbl.len(), 2);
        assert_eq!(tbl.get("foo"), Some(&1));
        assert_eq!(tbl.get("Foo"), Some(&2));
        assert_eq!(tbl.get("FOO"), None);
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut tbl = TraitTable::new(CaseMode::Insensitive);
        for key in ["zeta", "alpha", "mid"] {
            tbl.insert(key, ());
        }
        assert_eq!(
            tbl.keys().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
        tbl.remove("alpha");
        assert_eq!(tbl.keys().collect::<Vec<_>>(), vec!["zeta", "mid"]);
    }

    #[test]
    fn keys_equal_ignores_order() {
        let mut a = TraitTable::new(CaseMode::Insensitive);
        let mut b = TraitTable::new(CaseMode::Insensitive);
        a.insert("x", 1);
        a.insert("y", 2);
        b.insert("Y", 9);
        b.insert("X", 8);
        assert!(a.keys_equal(&b));
        b.insert("z", 0);
        assert!(!a.keys_equal(&b));
    }
}
