//! UID-then-name reconciliation of member collections.
//!
//! Given a base collection and a candidate collection (a delta during
//! resolve, a derived trait during extract), matching produces one entry per
//! base key, holding either the matching candidate or `None` for "apply a
//! null derivation", plus the candidates present only on the candidate side
//! (additions). The same reconciliation serves resolve and extract.

use std::collections::HashMap;

use crate::core::errors::Result;
use crate::core::types::Severity;
use crate::diagnostics::{Code, DiagnosticSink};
use crate::identity::{TraitTable, Uid};

/// Implemented by every member kind that lives in a matchable table.
pub(crate) trait MatchKey {
    fn match_key(&self) -> &str;
    fn match_uid(&self) -> Option<Uid>;
}

/// The outcome of matching one member table against another.
pub(crate) struct MatchResult<'a, T> {
    /// One entry per surviving base key, in base insertion order.
    pub entries: Vec<(String, Option<&'a T>)>,
    /// Candidates with no base counterpart, in candidate insertion order.
    pub additions: Vec<&'a T>,
}

/// Shared matching knobs for one member kind.
pub(crate) struct MatchSpec<'f, T> {
    /// Human label used in diagnostics ("property", "behavior", ...).
    pub kind: &'static str,
    /// Diagnostic code for an addition discarded over a reserved name.
    pub discard_code: Code,
    /// True when the match crosses a derivation boundary; base members the
    /// carry filter rejects are invisible to subclasses and drop out.
    pub for_derivation: bool,
    /// Whether a base member without a candidate carries forward across a
    /// derivation boundary.
    pub carries_forward: &'f dyn Fn(&T) -> bool,
}

/// Reconcile `candidate` against `base`.
pub(crate) fn match_members<'a, T: MatchKey>(
    base: &TraitTable<T>,
    candidate: &'a TraitTable<T>,
    spec: &MatchSpec<'_, T>,
    location: &str,
    sink: &mut DiagnosticSink,
) -> Result<MatchResult<'a, T>> {
    // fast path: no structural change
    if base.keys_equal(candidate) {
        let entries = base
            .keys()
            .map(|key| (key.to_string(), candidate.get(key)))
            .collect();
        return Ok(MatchResult {
            entries,
            additions: Vec::new(),
        });
    }

    // fast path: nothing on the candidate side at all
    if candidate.is_empty() {
        let entries = base
            .iter()
            .filter(|(_, member)| !spec.for_derivation || (spec.carries_forward)(member))
            .map(|(key, _)| (key.to_string(), None))
            .collect();
        return Ok(MatchResult {
            entries,
            additions: Vec::new(),
        });
    }

    // general path: match by UID first (repairing renames), then by name
    let candidates: Vec<(&str, &T)> = candidate.iter().collect();
    let mut consumed = vec![false; candidates.len()];

    let by_uid: HashMap<Uid, usize> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, (_, member))| member.match_uid().map(|uid| (uid, i)))
        .collect();

    let find_by_name = |name: &str, consumed: &[bool]| -> Option<usize> {
        candidates.iter().enumerate().position(|(i, (key, _))| {
            !consumed[i]
                && match candidate.case() {
                    crate::identity::CaseMode::Sensitive => *key == name,
                    crate::identity::CaseMode::Insensitive => key.eq_ignore_ascii_case(name),
                }
        })
    };

    let mut entries = Vec::with_capacity(base.len());
    for (key, member) in base.iter() {
        let found = member
            .match_uid()
            .and_then(|uid| by_uid.get(&uid).copied())
            .filter(|&i| !consumed[i])
            .or_else(|| find_by_name(key, &consumed));

        match found {
            Some(i) => {
                consumed[i] = true;
                entries.push((key.to_string(), Some(candidates[i].1)));
            }
            None => {
                if !spec.for_derivation || (spec.carries_forward)(member) {
                    entries.push((key.to_string(), None));
                }
            }
        }
    }

    // whatever was not consumed is an addition, unless its name collides
    // with a key the base already reserves
    let mut additions = Vec::new();
    for (i, (key, member)) in candidates.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        if base.contains_key(key) {
            sink.log(
                spec.discard_code,
                Severity::Warning,
                format!("{location}.{key}"),
                format!(
                    "discarding added {} {key:?}: the name is reserved at the base level",
                    spec.kind
                ),
            )?;
            continue;
        }
        additions.push(*member);
    }

    Ok(MatchResult { entries, additions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CaseMode;

    #[derive(Debug, PartialEq)]
    struct Member {
        key: String,
        uid: Option<Uid>,
    }

    impl Member {
        fn new(key: &str) -> Self {
            Member {
                key: key.to_string(),
                uid: None,
            }
        }

        fn with_uid(key: &str, uid: Uid) -> Self {
            Member {
                key: key.to_string(),
                uid: Some(uid),
            }
        }
    }

    impl MatchKey for Member {
        fn match_key(&self) -> &str {
            &self.key
        }

        fn match_uid(&self) -> Option<Uid> {
            self.uid
        }
    }

    fn table(members: Vec<Member>) -> TraitTable<Member> {
        let mut tbl = TraitTable::new(CaseMode::Insensitive);
        for m in members {
            tbl.insert(m.key.clone(), m);
        }
        tbl
    }

    fn spec(for_derivation: bool) -> MatchSpec<'static, Member> {
        MatchSpec {
            kind: "member",
            discard_code: Code::ReservedNameCollision,
            for_derivation,
            carries_forward: &|_| true,
        }
    }

    #[test]
    fn identical_key_sets_take_the_fast_path() {
        let base = table(vec![Member::new("a"), Member::new("b")]);
        let cand = table(vec![Member::new("a"), Member::new("b")]);
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec(false), "t", &mut sink).unwrap();
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries.iter().all(|(_, m)| m.is_some()));
        assert!(result.additions.is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_candidate_yields_null_derivations() {
        let base = table(vec![Member::new("a"), Member::new("b")]);
        let cand = table(vec![]);
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec(false), "t", &mut sink).unwrap();
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries.iter().all(|(_, m)| m.is_none()));
    }

    #[test]
    fn derivation_boundary_filters_members_that_do_not_carry() {
        let base = table(vec![Member::new("keep"), Member::new("drop")]);
        let cand = table(vec![]);
        let carry = |m: &Member| m.key == "keep";
        let spec = MatchSpec {
            kind: "member",
            discard_code: Code::ReservedNameCollision,
            for_derivation: true,
            carries_forward: &carry,
        };
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec, "t", &mut sink).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].0, "keep");
    }

    #[test]
    fn uid_match_repairs_a_rename() {
        let uid = Uid::generate();
        let base = table(vec![Member::with_uid("oldName", uid)]);
        let cand = table(vec![Member::with_uid("newName", uid)]);
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec(false), "t", &mut sink).unwrap();
        // the renamed candidate matches the base entry instead of becoming a
        // delete + insert pair
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].0, "oldName");
        assert_eq!(result.entries[0].1.unwrap().key, "newName");
        assert!(result.additions.is_empty());
    }

    #[test]
    fn unconsumed_candidates_become_additions() {
        let base = table(vec![Member::new("a")]);
        let cand = table(vec![Member::new("a"), Member::new("brandNew")]);
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec(false), "t", &mut sink).unwrap();
        assert_eq!(result.additions.len(), 1);
        assert_eq!(result.additions[0].key, "brandNew");
    }

    #[test]
    fn addition_colliding_with_reserved_base_name_is_discarded() {
        let uid = Uid::generate();
        // the base member "a" was renamed to "b" on the candidate side, so
        // "a" stays reserved; a second candidate named "a" must not sneak in
        let base = table(vec![Member::with_uid("a", uid)]);
        let cand = table(vec![Member::with_uid("b", uid), Member::new("a")]);
        let mut sink = DiagnosticSink::new();
        let result = match_members(&base, &cand, &spec(false), "t", &mut sink).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].1.unwrap().key, "b");
        assert!(result.additions.is_empty());
        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.iter().next().unwrap().code,
            Code::ReservedNameCollision
        );
    }
}
