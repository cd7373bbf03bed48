//! The lifecycle state shared by every mergeable entity, and the generic
//! halves of resolve/extract that every member kind delegates to.
//!
//! A trait is created "blank" by its own base, populated by `resolve`
//! (merge) or `extract` (diff), then finalized, which locks in the derived
//! state and discards delta-only bookkeeping. Only after finalization may a
//! trait be asked whether it is discardable.

use serde::{Deserialize, Serialize};

use crate::core::errors::{Error, Result};
use crate::core::types::{Mode, ProcessState};
use crate::diagnostics::Code;
use crate::identity::Uid;
use crate::model::origin::{Origin, OriginLevel};
use crate::model::MergeCtx;

/// Mergeable-entity state embedded in every member kind.
///
/// Equality ignores the transient resolve/extract bookkeeping (the
/// `prev_*` shadows and the process state) and the origin, which is
/// level-relative and recomputed by every resolve. A finalized tree thus
/// compares equal to its persisted round-trip and to the result of
/// re-resolving its own extracted delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitData {
    pub mode: Mode,
    pub uid: Option<Uid>,
    pub origin: Origin,
    /// Short documentation ("tool tip").
    pub tip: String,
    /// This level's long documentation text.
    pub text: String,
    /// Whether this level's text replaces (rather than appends to) the
    /// previous level's description.
    pub replace_text: bool,
    /// Base-level tip shadow.
    pub prev_tip: String,
    /// Base-level description shadow.
    pub prev_text: String,
    pub prev_replace_text: bool,
    #[serde(skip, default)]
    pub process_state: ProcessState,
}

impl PartialEq for TraitData {
    fn eq(&self, other: &Self) -> bool {
        self.mode == other.mode
            && self.uid == other.uid
            && self.tip == other.tip
            && self.description() == other.description()
    }
}

impl TraitData {
    /// Create trait state in the given mode. `Invalid` is rejected as a
    /// caller contract violation.
    pub fn new(mode: Mode) -> Result<Self> {
        if mode == Mode::Invalid {
            return Err(Error::IllegalMode {
                context: "trait construction",
                mode,
            });
        }
        Ok(TraitData {
            mode,
            uid: None,
            origin: Origin::nothing(),
            tip: String::new(),
            text: String::new(),
            replace_text: false,
            prev_tip: String::new(),
            prev_text: String::new(),
            prev_replace_text: false,
            process_state: ProcessState::New,
        })
    }

    /// Create blank trait state for a resolve/extract result. The blank
    /// state carries nothing of the base but its UID.
    pub fn blank_from(base: &TraitData, mode: Mode) -> Result<Self> {
        let mut data = TraitData::new(mode)?;
        data.uid = base.uid;
        Ok(data)
    }

    /// The complete description visible at this level.
    pub fn description(&self) -> String {
        compose_description(&self.text, &self.prev_text, self.replace_text)
    }

    /// True if this level carries any delta information of its own
    /// (documentation or a manual origin).
    pub fn has_local_delta(&self) -> bool {
        self.replace_text || !self.tip.is_empty() || !self.text.is_empty() || self.origin.manual
    }

    /// Merge the shared state of `base` and `delta` into the state for the
    /// derived trait. The derived mode is always the base's mode.
    pub fn resolve(
        base: &TraitData,
        delta: &TraitData,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<TraitData> {
        let mut derived = TraitData::blank_from(base, base.mode)?;

        // tip: the delta's, with the base's as the "previous" shadow
        derived.tip = delta.tip.clone();
        derived.prev_tip = if !delta.prev_tip.is_empty() {
            delta.prev_tip.clone()
        } else if !base.tip.is_empty() {
            base.tip.clone()
        } else {
            base.prev_tip.clone()
        };

        // description: if the delta overrode its base's description, keep
        // that override as the previous shadow; otherwise the shadow is the
        // delta's accumulated shadow appended to the base's description
        derived.text = delta.text.clone();
        derived.replace_text = delta.replace_text;
        if delta.prev_replace_text {
            derived.prev_text = delta.prev_text.clone();
            derived.prev_replace_text = true;
        } else {
            derived.prev_text =
                compose_description(&delta.prev_text, &base.description(), false);
            derived.prev_replace_text = base.replace_text || base.prev_replace_text;
        }

        // UIDs: the base's wins; a missing base UID adopts the delta's
        match base.uid {
            None => derived.uid = delta.uid,
            Some(uid) => {
                if delta.uid.is_some() && delta.uid != Some(uid) {
                    ctx.sink.warn(
                        Code::UidChangedOnResolve,
                        location,
                        "delta UID does not match the base UID",
                    )?;
                }
            }
        }

        // origin: super if the base came from a super level or the delta is
        // a derivation, otherwise base; the manual bit follows the delta
        derived.origin = Origin::at(if base.origin.is_from_super() || delta.mode == Mode::Derivation
        {
            OriginLevel::Super
        } else {
            OriginLevel::Base
        });
        derived.origin.manual = delta.origin.manual;

        derived.process_state = ProcessState::Resolving;
        Ok(derived)
    }

    /// Complete the resolve process; the trait will not resolve again.
    pub fn finalize_resolve(&mut self, location: &str, ctx: &mut MergeCtx<'_>) -> Result<()> {
        // the shadow survives in memory so a later extract can recognize a
        // tip that is identical to the inherited one
        if self.tip.is_empty() {
            self.tip = self.prev_tip.clone();
        }

        if self.mode != Mode::Resolved {
            ctx.sink.warn(
                Code::ForcedResolve,
                location,
                format!("forcing {} trait into resolved mode", self.mode),
            )?;
            self.mode = Mode::Resolved;
        }

        self.prev_replace_text = false;
        self.process_state = ProcessState::Resolved;
        Ok(())
    }

    /// Diff the shared state of `derived` against `base`, producing the
    /// state for the delta trait in the given (already validated) mode.
    pub fn extract(
        derived: &TraitData,
        base: &TraitData,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<TraitData> {
        if !mode.is_delta() {
            return Err(Error::IllegalMode {
                context: "extract result",
                mode,
            });
        }
        let mut delta = TraitData::blank_from(base, mode)?;

        // tip
        let mut tip = derived.tip.clone();
        let mut prev_tip = derived.prev_tip.clone();
        if derived.process_state == ProcessState::Resolved {
            // first extract against this trait: a tip identical to the one
            // inherited at resolve time is no delta at all
            if tip == prev_tip {
                tip.clear();
            }
            prev_tip.clear();
        }
        if !tip.is_empty() {
            if !base.tip.is_empty() {
                prev_tip = base.tip.clone();
            } else if !base.prev_tip.is_empty() {
                prev_tip = base.prev_tip.clone();
            }
        }
        delta.tip = tip;
        delta.prev_tip = prev_tip;

        // description
        let mut replace = derived.replace_text;
        let mut text = derived.text.clone();
        let mut prev_replace = derived.prev_replace_text;
        let mut prev_text = derived.prev_text.clone();
        match derived.process_state {
            ProcessState::Resolving => {
                // extracting the difference between two deltas during a
                // mode-pairing repair; identical changes cancel out
                if replace == base.replace_text && text == base.text {
                    replace = false;
                    text.clear();
                }
                prev_replace = false;
                prev_text.clear();
            }
            state => {
                if state == ProcessState::Resolved {
                    prev_replace = false;
                    prev_text.clear();
                }
                if replace || !text.is_empty() {
                    if base.replace_text || !base.text.is_empty() {
                        prev_replace = base.replace_text;
                        prev_text = base.text.clone();
                    } else if base.prev_replace_text || !base.prev_text.is_empty() {
                        prev_replace = base.prev_replace_text;
                        prev_text = base.prev_text.clone();
                    }
                }
            }
        }
        delta.replace_text = replace;
        delta.text = text;
        delta.prev_replace_text = prev_replace;
        delta.prev_text = prev_text;

        // UIDs
        match base.uid {
            None => delta.uid = derived.uid,
            Some(uid) => {
                if derived.uid.is_some() && derived.uid != Some(uid) {
                    ctx.sink.warn(
                        Code::UidChangedOnExtract,
                        location,
                        "derived UID does not match the base UID",
                    )?;
                }
            }
        }

        delta.process_state = ProcessState::Extracting;
        Ok(delta)
    }

    /// Complete the extract process; the trait will not extract again.
    pub fn finalize_extract(&mut self) {
        if self.mode != Mode::Resolved {
            // drop documentation redundant with the base level
            if self.tip == self.prev_tip {
                self.tip.clear();
            }
            if self.replace_text == self.prev_replace_text && self.text == self.prev_text {
                self.replace_text = false;
                self.text.clear();
            }
        }

        self.prev_tip.clear();
        self.prev_replace_text = false;
        self.prev_text.clear();

        // origin information other than the manual bit is re-derivable
        self.origin.retain_manual_only();
    }

    /// Discard this trait state and mark it unusable.
    pub fn invalidate(&mut self) {
        if self.mode != Mode::Invalid {
            self.mode = Mode::Invalid;
            self.uid = None;
            self.origin = Origin::nothing();
            self.tip.clear();
            self.prev_tip.clear();
            self.text.clear();
            self.prev_text.clear();
            self.replace_text = false;
            self.prev_replace_text = false;
        }
    }
}

/// Validate the mode pairing of a base and its would-be delta.
///
/// Legal pairings: resolved+derivation, resolved+modification,
/// derivation+modification, modification+modification. Returns `Ok(false)`
/// for pairings that must be repaired by extracting the delta against the
/// base first (the repair keeps `resolve` total over unexpected inputs).
/// An `Invalid` mode anywhere is a caller contract violation.
pub(crate) fn legal_pairing(base: Mode, delta: Mode) -> Result<bool> {
    if base == Mode::Invalid {
        return Err(Error::IllegalMode {
            context: "resolve base",
            mode: base,
        });
    }
    match delta {
        Mode::Modification => Ok(true),
        Mode::Derivation => Ok(base == Mode::Resolved),
        Mode::Resolved => Ok(false),
        Mode::Invalid => Err(Error::IllegalMode {
            context: "resolve delta",
            mode: delta,
        }),
    }
}

/// Build a trait description from this level's text and the previous
/// level's description.
pub(crate) fn compose_description(text: &str, prev: &str, replace: bool) -> String {
    if replace || prev.is_empty() {
        text.to_string()
    } else if text.is_empty() {
        prev.to_string()
    } else {
        format!("{prev}\n{text}")
    }
}

/// Determine what a full description adds beyond a base description.
pub(crate) fn extract_description(this_desc: &str, base_desc: &str) -> String {
    if this_desc == base_desc
        || (this_desc.len() == base_desc.len() + 1 && this_desc.ends_with('\n'))
    {
        String::new()
    } else if !base_desc.is_empty() && this_desc.starts_with(base_desc) {
        let rest = &this_desc[base_desc.len()..];
        rest.strip_prefix('\n').unwrap_or(rest).to_string()
    } else {
        this_desc.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::diagnostics::DiagnosticSink;
    use crate::loader::NullLoader;

    fn with_ctx<R>(f: impl FnOnce(&mut MergeCtx<'_>) -> R) -> (R, DiagnosticSink) {
        let loader = NullLoader;
        let options = EngineOptions::default();
        let mut sink = DiagnosticSink::new();
        let result = {
            let mut ctx = MergeCtx {
                loader: &loader,
                sink: &mut sink,
                options: &options,
            };
            f(&mut ctx)
        };
        (result, sink)
    }

    fn resolved() -> TraitData {
        let mut data = TraitData::new(Mode::Resolved).unwrap();
        data.process_state = ProcessState::Resolved;
        data
    }

    #[test]
    fn invalid_mode_is_rejected_at_construction() {
        assert!(matches!(
            TraitData::new(Mode::Invalid),
            Err(Error::IllegalMode { .. })
        ));
    }

    #[test]
    fn legal_pairings() {
        assert!(legal_pairing(Mode::Resolved, Mode::Derivation).unwrap());
        assert!(legal_pairing(Mode::Resolved, Mode::Modification).unwrap());
        assert!(legal_pairing(Mode::Derivation, Mode::Modification).unwrap());
        assert!(legal_pairing(Mode::Modification, Mode::Modification).unwrap());

        assert!(!legal_pairing(Mode::Resolved, Mode::Resolved).unwrap());
        assert!(!legal_pairing(Mode::Derivation, Mode::Derivation).unwrap());
        assert!(!legal_pairing(Mode::Modification, Mode::Derivation).unwrap());

        assert!(legal_pairing(Mode::Invalid, Mode::Modification).is_err());
        assert!(legal_pairing(Mode::Resolved, Mode::Invalid).is_err());
    }

    #[test]
    fn description_composition() {
        assert_eq!(compose_description("add", "base", false), "base\nadd");
        assert_eq!(compose_description("add", "base", true), "add");
        assert_eq!(compose_description("", "base", false), "base");
        assert_eq!(compose_description("add", "", false), "add");
    }

    #[test]
    fn description_extraction_strips_base_prefix() {
        assert_eq!(extract_description("base\nadd", "base"), "add");
        assert_eq!(extract_description("base", "base"), "");
        assert_eq!(extract_description("other", "base"), "other");
    }

    #[test]
    fn resolve_merges_documentation_and_origin() {
        let mut base = resolved();
        base.text = "base docs".to_string();
        base.uid = Some(Uid::generate());

        let mut delta = TraitData::new(Mode::Derivation).unwrap();
        delta.text = "more docs".to_string();
        delta.origin.manual = true;

        let (derived, sink) =
            with_ctx(|ctx| TraitData::resolve(&base, &delta, "t", ctx).unwrap());
        assert!(sink.is_empty());
        assert_eq!(derived.mode, Mode::Resolved);
        assert_eq!(derived.uid, base.uid);
        assert!(derived.origin.is_from_super());
        assert!(derived.origin.manual);
        assert_eq!(derived.text, "more docs");
        assert_eq!(derived.prev_text, "base docs");
        assert_eq!(derived.description(), "base docs\nmore docs");
    }

    #[test]
    fn resolve_reports_uid_mismatch() {
        let mut base = resolved();
        base.uid = Some(Uid::generate());
        let mut delta = TraitData::new(Mode::Modification).unwrap();
        delta.uid = Some(Uid::generate());

        let (_, sink) = with_ctx(|ctx| TraitData::resolve(&base, &delta, "t", ctx).unwrap());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.iter().next().unwrap().code, Code::UidChangedOnResolve);
    }

    #[test]
    fn extract_then_finalize_drops_redundant_documentation() {
        let mut base = resolved();
        base.tip = "shared tip".to_string();

        let mut derived = resolved();
        derived.tip = "shared tip".to_string();

        let (mut delta, sink) = with_ctx(|ctx| {
            TraitData::extract(&derived, &base, Mode::Modification, "t", ctx).unwrap()
        });
        assert!(sink.is_empty());
        delta.finalize_extract();
        assert!(delta.tip.is_empty());
        assert!(delta.text.is_empty());
        assert!(!delta.has_local_delta());
    }

    #[test]
    fn invalidate_is_terminal() {
        let mut data = resolved();
        data.tip = "tip".to_string();
        data.invalidate();
        assert_eq!(data.mode, Mode::Invalid);
        assert!(data.tip.is_empty());
        assert!(data.uid.is_none());
    }
}
