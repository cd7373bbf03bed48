//! Per-attribute-family flag merge rules.
//!
//! Each mergeable member carries a [`Flags`] struct of explicit typed fields
//! plus a parallel [`Specified`] bitset recording which families are
//! specified at the current level. A flag value is always meaningful on a
//! resolved trait; on a delta it is meaningful only where the family is
//! specified.
//!
//! Family rules:
//! - *flexible*: the delta wins whenever it specifies the family
//!   (visibility, synchronization, abstract/concrete, antiquity,
//!   persistence);
//! - *one-way*: only one direction is accepted, the reverse keeps the base
//!   value (access escalation, final escalation, instance-to-static for
//!   components, local-to-remote);
//! - *locked*: the family never changes across levels (behavior scope).
//!
//! Before any family is processed: if the base is final, nothing changes at
//! all and the base flags pass through unmodified.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::types::{
    Access, Antiquity, Derivability, Distribution, Exists, Implementation, Persistence, Scope,
    Synchronization, Visibility,
};

bitflags! {
    /// Which attribute families are explicitly specified at this level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Specified: u16 {
        const EXISTS       = 1 << 0;
        const VISIBILITY   = 1 << 1;
        const ACCESS       = 1 << 2;
        const SCOPE        = 1 << 3;
        const SYNC         = 1 << 4;
        const IMPL         = 1 << 5;
        const DERIVE       = 1 << 6;
        const ANTIQUITY    = 1 << 7;
        const PERSISTENCE  = 1 << 8;
        const DISTRIBUTION = 1 << 9;
    }
}

impl Serialize for Specified {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Specified {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // unknown bits from newer writers are dropped rather than rejected
        Ok(Specified::from_bits_truncate(u16::deserialize(deserializer)?))
    }
}

/// The bit-flag attributes shared by components, behaviors, and properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Flags {
    pub exists: Exists,
    pub visibility: Visibility,
    pub access: Access,
    pub scope: Scope,
    pub synchronization: Synchronization,
    pub implementation: Implementation,
    pub derivability: Derivability,
    pub antiquity: Antiquity,
    pub persistence: Persistence,
    pub distribution: Distribution,
    pub specified: Specified,
}

impl Flags {
    /// Flags for a resolved trait: every family meaningful.
    pub fn resolved() -> Self {
        Flags {
            specified: Specified::all(),
            ..Flags::default()
        }
    }

    /// Flags for a blank delta: nothing specified.
    pub fn unspecified() -> Self {
        Flags::default()
    }

    pub fn is_specified(&self, family: Specified) -> bool {
        self.specified.contains(family)
    }

    pub fn specify(&mut self, family: Specified) -> &mut Self {
        self.specified |= family;
        self
    }

    /// Whether a family carries a meaningful value at this level.
    fn meaningful(&self, family: Specified, resolved: bool) -> bool {
        resolved || self.is_specified(family)
    }

    /// True when this level pins the trait final.
    pub fn locks_final(&self, resolved: bool) -> bool {
        self.meaningful(Specified::DERIVE, resolved) && self.derivability == Derivability::Final
    }

    /// Fully resolved flags taking this delta's values where specified and
    /// the defaults elsewhere. Used when a delta member is promoted into a
    /// resolved tree as a brand-new insert.
    pub fn promote(&self) -> Flags {
        let mut flags = *self;
        flags.specified = Specified::all();
        flags.exists = Exists::Insert;
        flags
    }
}

/// Per-member-kind knobs for [`resolve_flags`].
#[derive(Debug, Clone, Copy)]
pub struct FlagPolicy {
    /// Signature levels are always fully specified; family checks treat
    /// every delta family as present.
    pub signature: bool,
    /// Components may escalate instance to static; behaviors never change
    /// scope across levels.
    pub scope_escalates: bool,
    /// Whether the surrounding component permits a local-to-remote
    /// escalation here (global component, public member).
    pub remote_allowed: bool,
}

impl FlagPolicy {
    pub fn component(signature: bool, remote_allowed: bool) -> Self {
        FlagPolicy {
            signature,
            scope_escalates: true,
            remote_allowed,
        }
    }

    pub fn behavior(signature: bool, remote_allowed: bool) -> Self {
        FlagPolicy {
            signature,
            scope_escalates: false,
            remote_allowed,
        }
    }

    pub fn property(signature: bool) -> Self {
        FlagPolicy {
            signature,
            scope_escalates: true,
            remote_allowed: false,
        }
    }
}

/// Apply a delta's flag families to a base's flags.
///
/// `exists` is deliberately untouched: its lifecycle is resolved separately
/// per entity kind. The derived `specified` set accumulates every family the
/// delta legally applied, so subsequent levels see them as meaningful.
pub fn resolve_flags(base: &Flags, delta: &Flags, base_resolved: bool, policy: &FlagPolicy) -> Flags {
    let mut derived = *base;

    let delta_has =
        |family: Specified| policy.signature || delta.is_specified(family);
    let base_has = |family: Specified| base.meaningful(family, base_resolved);

    // a final base locks every family
    if base.locks_final(base_resolved) {
        return derived;
    }

    // visibility is flexible
    if delta.is_specified(Specified::VISIBILITY) {
        derived.visibility = delta.visibility;
        derived.specified |= Specified::VISIBILITY;
    }

    // access is one-way: private -> package -> protected -> public
    if delta_has(Specified::ACCESS) {
        let mut access = delta.access;
        if base_has(Specified::ACCESS) && access < base.access {
            // reversal rejected, base kept
            access = base.access;
        }
        derived.access = access;
        derived.specified |= Specified::ACCESS;
    }

    // synchronization is flexible
    if delta_has(Specified::SYNC) {
        derived.synchronization = delta.synchronization;
        derived.specified |= Specified::SYNC;
    }

    // scope: instance -> static escalation for components, locked for
    // behaviors
    if policy.scope_escalates
        && delta.is_specified(Specified::SCOPE)
        && delta.scope == Scope::Static
    {
        derived.scope = Scope::Static;
        derived.specified |= Specified::SCOPE;
    }

    // abstract/concrete is flexible
    if delta.is_specified(Specified::IMPL) {
        derived.implementation = delta.implementation;
        derived.specified |= Specified::IMPL;
    }

    // final is one-way
    if delta_has(Specified::DERIVE) && delta.derivability == Derivability::Final {
        derived.derivability = Derivability::Final;
        derived.specified |= Specified::DERIVE;
    }

    // antiquity is flexible
    if delta_has(Specified::ANTIQUITY) {
        derived.antiquity = delta.antiquity;
        derived.specified |= Specified::ANTIQUITY;
    }

    // persistence is flexible
    if delta.is_specified(Specified::PERSISTENCE) {
        derived.persistence = delta.persistence;
        derived.specified |= Specified::PERSISTENCE;
    }

    // distribution is one-way, and only where the component allows it
    if delta.is_specified(Specified::DISTRIBUTION)
        && delta.distribution == Distribution::Remote
        && !(base_has(Specified::DISTRIBUTION) && base.distribution == Distribution::Remote)
        && policy.remote_allowed
    {
        derived.distribution = Distribution::Remote;
        derived.specified |= Specified::DISTRIBUTION;
    }

    derived
}

/// Diff a derived trait's flags against its base.
///
/// The delta carries the derived values, with a family marked specified only
/// where the value differs from a meaningful base value. `exists` resets to
/// `Update`; the caller resolves the exists lifecycle per entity kind.
pub fn extract_flags(derived: &Flags, base: &Flags, base_resolved: bool) -> Flags {
    let mut delta = *derived;
    delta.specified = Specified::empty();
    delta.exists = Exists::Update;

    let mut mark = |family: Specified, differs: bool| {
        if differs && base.meaningful(family, base_resolved) {
            delta.specified |= family;
        }
    };

    mark(
        Specified::VISIBILITY,
        derived.visibility != base.visibility,
    );
    mark(Specified::ACCESS, derived.access != base.access);
    mark(
        Specified::SYNC,
        derived.synchronization != base.synchronization,
    );
    mark(Specified::SCOPE, derived.scope != base.scope);
    mark(
        Specified::IMPL,
        derived.implementation != base.implementation,
    );
    mark(
        Specified::DERIVE,
        derived.derivability != base.derivability,
    );
    mark(Specified::ANTIQUITY, derived.antiquity != base.antiquity);
    mark(
        Specified::PERSISTENCE,
        derived.persistence != base.persistence,
    );
    mark(
        Specified::DISTRIBUTION,
        derived.distribution != base.distribution,
    );

    delta
}
