//! `Component` and the top-level resolve/extract orchestration.
//!
//! A component is the root trait kind: a named definition (global or
//! child), a structured property value, or a reflected external signature.
//! It owns three member tables (properties, behaviors, children), two
//! interface tables (implements, dispatches), at most one integration
//! mapping, and a table of aggregation categories.
//!
//! `resolve` runs top-down: identity and flags first, then behaviors,
//! then properties (property resolution consults behavior accessors),
//! then interface expansion, then deferred members, then categories and
//! children. `extract` runs the same order in reverse sense, producing
//! the minimal delta that rebuilds the derived tree from the base.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::core::errors::{Error, Result};
use crate::core::types::{Access, Derivability, Exists, Implementation, Mode, ProcessState, Scope};
use crate::diagnostics::Code;
use crate::identity::{CaseMode, QualifiedName, TraitTable, Uid};
use crate::model::base::{legal_pairing, TraitData};
use crate::model::behavior::Behavior;
use crate::model::flags::{extract_flags, resolve_flags, FlagPolicy, Flags, Specified};
use crate::model::integration::Integration;
use crate::model::interface::{Interface, InterfaceKind};
use crate::model::matching::{match_members, MatchKey, MatchSpec};
use crate::model::origin::Origin;
use crate::model::parameter::{DataType, Parameter, ReturnValue};
use crate::model::property::Property;
use crate::model::MergeCtx;

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// A named, derivable unit; global or aggregated as a child.
    Definition,
    /// A structured property value; carries properties only.
    ComplexValue,
    /// A reflected external class/interface shape.
    Signature,
}

impl ComponentKind {
    /// Member tables are case-insensitive for definitions and
    /// case-sensitive for signatures.
    pub fn member_case(&self) -> CaseMode {
        match self {
            ComponentKind::Signature => CaseMode::Sensitive,
            _ => CaseMode::Insensitive,
        }
    }
}

/// Where an aggregation category entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryOrigin {
    DeclaredHere,
    Inherited,
}

/// The root trait kind; see the module docs.
///
/// Equality ignores the transient `prev_flags` shadow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub data: TraitData,
    pub kind: ComponentKind,
    /// Global dotted name for a global definition or signature; simple name
    /// for a child.
    pub name: String,
    /// Global super for definitions; extended type for signatures.
    pub super_name: Option<String>,
    /// True only for derivation deltas.
    pub base_level: bool,
    pub flags: Flags,
    #[serde(skip)]
    pub prev_flags: Flags,
    pub integration: Option<Integration>,
    pub implements: TraitTable<Interface>,
    pub dispatches: TraitTable<Interface>,
    pub properties: TraitTable<Property>,
    pub behaviors: TraitTable<Behavior>,
    pub children: TraitTable<Component>,
    /// Permitted child super-types, each declared here or inherited.
    pub categories: TraitTable<CategoryOrigin>,
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.kind == other.kind
            && self.name == other.name
            && self.super_name == other.super_name
            && self.base_level == other.base_level
            && self.flags == other.flags
            && self.integration == other.integration
            && self.implements == other.implements
            && self.dispatches == other.dispatches
            && self.properties == other.properties
            && self.behaviors == other.behaviors
            && self.children == other.children
            && self.categories == other.categories
    }
}

impl Component {
    fn blank(kind: ComponentKind, mode: Mode, name: impl Into<String>) -> Result<Self> {
        let case = kind.member_case();
        Ok(Component {
            data: TraitData::new(mode)?,
            kind,
            name: name.into(),
            super_name: None,
            base_level: false,
            flags: if mode == Mode::Resolved {
                Flags::resolved()
            } else {
                Flags::unspecified()
            },
            prev_flags: Flags::unspecified(),
            integration: None,
            implements: TraitTable::new(CaseMode::Sensitive),
            dispatches: TraitTable::new(CaseMode::Sensitive),
            properties: TraitTable::new(case),
            behaviors: TraitTable::new(case),
            children: TraitTable::new(case),
            categories: TraitTable::new(CaseMode::Sensitive),
        })
    }

    /// A resolved root definition with no super.
    pub fn root_definition(name: &QualifiedName) -> Result<Self> {
        let mut root = Self::blank(ComponentKind::Definition, Mode::Resolved, name.as_str())?;
        root.flags.exists = Exists::Insert;
        root.data.process_state = ProcessState::Resolved;
        Ok(root)
    }

    /// A derivation delta declaring a new global definition on top of
    /// `super_name`.
    pub fn derivation(name: &QualifiedName, super_name: &QualifiedName) -> Result<Self> {
        let mut delta = Self::blank(ComponentKind::Definition, Mode::Derivation, name.as_str())?;
        delta.super_name = Some(super_name.as_str().to_string());
        delta.base_level = true;
        Ok(delta)
    }

    /// A modification delta refining an existing definition.
    pub fn modification(name: &QualifiedName) -> Result<Self> {
        Self::blank(ComponentKind::Definition, Mode::Modification, name.as_str())
    }

    /// A resolved reflected signature.
    pub fn signature(name: &QualifiedName) -> Result<Self> {
        let mut sig = Self::blank(ComponentKind::Signature, Mode::Resolved, name.as_str())?;
        sig.flags.exists = Exists::Insert;
        sig.data.process_state = ProcessState::Resolved;
        Ok(sig)
    }

    /// A resolved structured property value.
    pub fn complex_value(name: impl Into<String>) -> Result<Self> {
        let mut value = Self::blank(ComponentKind::ComplexValue, Mode::Resolved, name)?;
        value.data.process_state = ProcessState::Resolved;
        Ok(value)
    }

    /// The simple (unqualified) name.
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_final(&self) -> bool {
        self.flags
            .locks_final(self.data.mode == Mode::Resolved)
    }

    /// A delta carrying no information against this component.
    pub fn null_delta(&self, mode: Mode) -> Result<Component> {
        let mut delta = Self::blank(self.kind, mode, self.name.clone())?;
        delta.data.uid = self.data.uid;
        delta.flags.exists = Exists::Update;
        Ok(delta)
    }

    /// The delta mode `extract` would choose for this pair: a derivation
    /// when the base is a resolved definition with a different global
    /// identity, a modification otherwise.
    pub fn extract_mode(derived: &Component, base: &Component) -> Mode {
        if base.data.mode == Mode::Resolved
            && base.kind == ComponentKind::Definition
            && derived.name != base.name
        {
            Mode::Derivation
        } else {
            Mode::Modification
        }
    }

    /// Merge `base` with `delta`, producing a finalized resolved tree.
    ///
    /// An illegal mode pairing is repaired by first extracting the delta
    /// against the base, so any non-`Invalid` delta is accepted.
    pub fn resolve(
        base: &Component,
        delta: &Component,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Component> {
        debug!("resolving {} against {}", delta.name, base.name);
        let repaired;
        let delta = if legal_pairing(base.data.mode, delta.data.mode)? {
            delta
        } else {
            let mode = Self::extract_mode(delta, base);
            repaired = Self::extract_in(delta, base, mode, true, ctx)?;
            &repaired
        };
        let mut derived = Self::resolve_in(base, delta, true, ctx)?;
        derived.finalize_resolve(ctx)?;
        Ok(derived)
    }

    /// Diff `derived` against `base`, producing a finalized minimal delta.
    pub fn extract(
        derived: &Component,
        base: &Component,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Component> {
        debug!("extracting {} against {}", derived.name, base.name);
        let mode = Self::extract_mode(derived, base);
        let mut delta = Self::extract_in(derived, base, mode, true, ctx)?;
        delta.finalize_extract();
        Ok(delta)
    }

    fn resolve_in(
        base: &Component,
        delta: &Component,
        global: bool,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Component> {
        let derivation = delta.data.mode == Mode::Derivation;
        let signature_level = base.kind == ComponentKind::Signature;

        // identity
        let (name, super_name, base_level) = if derivation
            && base.data.mode == Mode::Resolved
            && !delta.name.is_empty()
            && delta.name != base.name
        {
            (delta.name.clone(), Some(base.name.clone()), true)
        } else {
            (base.name.clone(), base.super_name.clone(), base.base_level)
        };
        let path = name.clone();

        let data = TraitData::resolve(&base.data, &delta.data, &path, ctx)?;

        let remote_allowed = global && base.flags.access == Access::Public;
        let policy = FlagPolicy::component(signature_level, remote_allowed);
        let mut flags = resolve_flags(
            &base.flags,
            &delta.flags,
            base.data.mode == Mode::Resolved,
            &policy,
        );
        flags.exists = match base.flags.exists {
            Exists::Not => Exists::Not,
            Exists::Insert if delta.data.mode == Mode::Modification => Exists::Insert,
            _ => Exists::Update,
        };
        flags.specify(Specified::EXISTS);

        let mut derived = Component {
            data,
            kind: base.kind,
            name,
            super_name,
            base_level,
            flags,
            prev_flags: base.flags,
            integration: None,
            implements: TraitTable::new(CaseMode::Sensitive),
            dispatches: TraitTable::new(CaseMode::Sensitive),
            properties: TraitTable::new(base.kind.member_case()),
            behaviors: TraitTable::new(base.kind.member_case()),
            children: TraitTable::new(base.kind.member_case()),
            categories: TraitTable::new(CaseMode::Sensitive),
        };

        // a structured property value carries properties only
        if base.kind == ComponentKind::ComplexValue {
            let deferred =
                derived.resolve_properties(base, delta, derivation, signature_level, &path, ctx)?;
            for property in deferred {
                derived.promote_property(property, derivation, &path, ctx)?;
            }
            return Ok(derived);
        }

        // every base interface carries forward before expansion adds more
        for (_, entry) in base.implements.iter() {
            let carried = Interface::carry_forward(entry, delta.data.mode, &path, ctx)?;
            derived.implements.insert(entry.name.clone(), carried);
        }
        for (_, entry) in base.dispatches.iter() {
            let carried = Interface::carry_forward(entry, delta.data.mode, &path, ctx)?;
            derived.dispatches.insert(entry.name.clone(), carried);
        }

        // behaviors first, then properties
        let mut deferred_behaviors =
            derived.resolve_behaviors(base, delta, derivation, signature_level, &path, ctx)?;
        let deferred_properties =
            derived.resolve_properties(base, delta, derivation, signature_level, &path, ctx)?;

        // integration resolves at the global level only
        if global {
            derived.integration = Integration::resolve(
                base.integration.as_ref(),
                delta.integration.as_ref(),
                &path,
                ctx,
            )?;
            if let Some(integration) = derived.integration.clone() {
                derived.pull_integrated(&integration, &mut deferred_behaviors, &path, ctx)?;
            }
        } else if delta.integration.is_some() {
            ctx.sink.warn(
                Code::IntegrationMismatch,
                &path,
                "integration below the global level is ignored",
            )?;
            derived.integration = base.integration.clone();
        } else {
            derived.integration = base.integration.clone();
        }

        // newly added interfaces expand into the behavior table
        for kind in [InterfaceKind::Implements, InterfaceKind::Dispatches] {
            let (base_table, delta_table) = match kind {
                InterfaceKind::Implements => (&base.implements, &delta.implements),
                InterfaceKind::Dispatches => (&base.dispatches, &delta.dispatches),
            };
            let added: Vec<Interface> = delta_table
                .values()
                .filter(|entry| !base_table.contains_key(&entry.name))
                .cloned()
                .collect();
            for entry in added {
                derived.expand_interface(
                    entry,
                    kind,
                    derivation,
                    &mut deferred_behaviors,
                    &path,
                    ctx,
                )?;
            }
        }

        // whatever is still deferred is promoted or discarded
        for behavior in deferred_behaviors {
            derived.promote_behavior(behavior, derivation, &path, ctx)?;
        }
        for property in deferred_properties {
            derived.promote_property(property, derivation, &path, ctx)?;
        }

        // aggregation categories: the delta's are declared here, the base's
        // are inherited
        for (key, _) in base.categories.iter() {
            derived.categories.insert(key, CategoryOrigin::Inherited);
        }
        for (key, _) in delta.categories.iter() {
            derived.categories.insert(key, CategoryOrigin::DeclaredHere);
        }

        derived.resolve_children(base, delta, derivation, &path, ctx)?;

        Ok(derived)
    }

    fn resolve_behaviors(
        &mut self,
        base: &Component,
        delta: &Component,
        derivation: bool,
        signature_level: bool,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Vec<Behavior>> {
        let spec = MatchSpec {
            kind: "behavior",
            discard_code: Code::BehaviorDiscardedOnResolve,
            for_derivation: derivation,
            carries_forward: &Behavior::carries_to_derivation,
        };
        let matched = match_members(&base.behaviors, &delta.behaviors, &spec, path, ctx.sink)?;

        let remote_allowed = self.flags.access == Access::Public;
        for (key, candidate) in matched.entries {
            let base_member = base.behaviors.get(&key).ok_or(Error::IllegalState {
                context: "matched behavior key missing from base table",
            })?;
            let derived = match candidate {
                Some(delta_member) => {
                    // a delete delta removes the member outright
                    if delta_member.flags.is_specified(Specified::EXISTS)
                        && delta_member.flags.exists == Exists::Delete
                    {
                        continue;
                    }
                    Behavior::resolve(
                        base_member,
                        delta_member,
                        signature_level,
                        remote_allowed,
                        path,
                        ctx,
                    )?
                }
                None => {
                    let null = base_member.null_delta(delta.data.mode)?;
                    Behavior::resolve(
                        base_member,
                        &null,
                        signature_level,
                        remote_allowed,
                        path,
                        ctx,
                    )?
                }
            };
            self.behaviors
                .insert(derived.signature().to_string(), derived);
        }
        Ok(matched.additions.into_iter().cloned().collect())
    }

    fn resolve_properties(
        &mut self,
        base: &Component,
        delta: &Component,
        derivation: bool,
        signature_level: bool,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Vec<Property>> {
        let carries = |p: &Property| p.carries_to_derivation(&base.behaviors);
        let spec = MatchSpec {
            kind: "property",
            discard_code: Code::PropertyDiscardedOnResolve,
            for_derivation: derivation,
            carries_forward: &carries,
        };
        let matched = match_members(&base.properties, &delta.properties, &spec, path, ctx.sink)?;

        for (key, candidate) in matched.entries {
            let base_member = base.properties.get(&key).ok_or(Error::IllegalState {
                context: "matched property key missing from base table",
            })?;
            let derived = match candidate {
                Some(delta_member) => {
                    if delta_member.flags.is_specified(Specified::EXISTS)
                        && delta_member.flags.exists == Exists::Delete
                    {
                        continue;
                    }
                    Property::resolve(base_member, delta_member, signature_level, path, ctx)?
                }
                None => {
                    let null = base_member.null_delta(delta.data.mode)?;
                    Property::resolve(base_member, &null, signature_level, path, ctx)?
                }
            };
            self.properties.insert(derived.name.clone(), derived);
        }
        Ok(matched.additions.into_iter().cloned().collect())
    }

    /// Pull deferred behaviors that satisfy the integrated model's mapped
    /// members, marking the integration as a contributing origin.
    fn pull_integrated(
        &mut self,
        integration: &Integration,
        deferred: &mut Vec<Behavior>,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let descriptor = integration.descriptor();
        for local_signature in integration.method_map.values() {
            if let Some(i) = deferred
                .iter()
                .position(|b| b.signature() == local_signature)
            {
                let behavior = deferred.remove(i);
                let mut promoted = behavior.promote_insert(ctx.options.assign_uids)?;
                promoted.data.origin.add_trait(descriptor.clone());
                trace!("integration pulls {} at {path}", promoted.signature());
                self.behaviors
                    .insert(promoted.signature().to_string(), promoted);
            }
        }
        Ok(())
    }

    /// Validate and expand one newly added interface entry.
    fn expand_interface(
        &mut self,
        mut entry: Interface,
        kind: InterfaceKind,
        derivation: bool,
        deferred: &mut Vec<Behavior>,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        entry.kind = kind;
        let descriptor = entry.descriptor();

        // on a derivation the external shape is loaded and validated; on a
        // modification the recorded shape is trusted verbatim
        let mut demanded: Vec<Behavior> = Vec::new();
        if derivation {
            let signature_name = match entry.name.parse::<QualifiedName>() {
                Ok(name) => name,
                Err(_) => {
                    ctx.sink.warn(
                        Code::InterfaceMissing,
                        path,
                        format!("interface name {:?} is malformed", entry.name),
                    )?;
                    return Ok(());
                }
            };
            let Some(shape) = ctx.loader.load_signature(&signature_name) else {
                ctx.sink.warn(
                    Code::InterfaceMissing,
                    path,
                    format!("signature {} is not available", entry.name),
                )?;
                return Ok(());
            };
            entry.behaviors = shape
                .behaviors
                .keys()
                .map(str::to_string)
                .collect();
            entry.properties = shape.properties.keys().map(str::to_string).collect();
            demanded = shape.behaviors.values().cloned().collect();
        } else {
            for signature in &entry.behaviors {
                demanded.push(behavior_from_signature(signature)?);
            }
        }

        for demand in demanded {
            let signature = demand.signature().to_string();
            let declared_exceptions: Vec<DataType> = demand
                .exceptions
                .values()
                .map(|t| t.type_name.clone())
                .collect();

            if let Some(existing) = self.behaviors.get_mut(&signature) {
                let return_type = demand
                    .return_value
                    .data_type()
                    .cloned()
                    .unwrap_or_else(DataType::void);
                let parameter_types: Vec<DataType> = demand
                    .parameters
                    .iter()
                    .filter_map(|p| p.data_type().cloned())
                    .collect();
                if derivation
                    && !existing.satisfies_interface_member(&return_type, &parameter_types)
                {
                    ctx.sink.warn(
                        Code::InterfaceMismatch,
                        format!("{path}.{signature}"),
                        format!(
                            "behavior does not satisfy {descriptor}: \
                             must be public, instance-scoped, returning {return_type}"
                        ),
                    )?;
                    continue;
                }
                existing.data.origin.add_trait(descriptor.clone());
                existing.intersect_exceptions(&declared_exceptions, path, ctx)?;
                continue;
            }

            // a deferred addition can satisfy the demand instead of a
            // manufactured behavior
            if let Some(i) = deferred.iter().position(|b| b.signature() == signature) {
                let behavior = deferred.remove(i);
                let mut promoted = behavior.promote_insert(ctx.options.assign_uids)?;
                promoted.data.origin.add_trait(descriptor.clone());
                self.behaviors
                    .insert(promoted.signature().to_string(), promoted);
                continue;
            }

            let manufactured =
                manufacture_for_interface(&demand, &descriptor, ctx.options.assign_uids)?;
            trace!("{descriptor} manufactures {} at {path}", signature);
            self.behaviors.insert(signature, manufactured);
        }

        // interface properties only bind, they never manufacture
        for property_name in &entry.properties {
            if let Some(existing) = self.properties.get_mut(property_name) {
                existing.data.origin.add_trait(descriptor.clone());
            }
        }

        let table = match kind {
            InterfaceKind::Implements => &mut self.implements,
            InterfaceKind::Dispatches => &mut self.dispatches,
        };
        entry.exists = Exists::Insert;
        table.insert(entry.name.clone(), entry);
        Ok(())
    }

    fn promote_behavior(
        &mut self,
        behavior: Behavior,
        derivation: bool,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        if derivation && behavior.flags.exists != Exists::Insert {
            ctx.sink.warn(
                Code::BehaviorDiscardedOnResolve,
                format!("{path}.{}", behavior.signature()),
                "behavior has no base counterpart and is not an insert",
            )?;
            return Ok(());
        }
        let promoted = behavior.promote_insert(ctx.options.assign_uids)?;
        self.behaviors
            .insert(promoted.signature().to_string(), promoted);
        Ok(())
    }

    fn promote_property(
        &mut self,
        property: Property,
        derivation: bool,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        if derivation && property.flags.exists != Exists::Insert {
            ctx.sink.warn(
                Code::PropertyDiscardedOnResolve,
                format!("{path}.{}", property.name),
                "property has no base counterpart and is not an insert",
            )?;
            return Ok(());
        }
        let promoted = property.promote_insert(ctx.options.assign_uids)?;
        self.properties.insert(promoted.name.clone(), promoted);
        Ok(())
    }

    fn resolve_children(
        &mut self,
        base: &Component,
        delta: &Component,
        derivation: bool,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let spec = MatchSpec {
            kind: "child",
            discard_code: Code::ChildDiscardedOnResolve,
            for_derivation: derivation,
            carries_forward: &|_: &Component| true,
        };
        let matched = match_members(&base.children, &delta.children, &spec, path, ctx.sink)?;

        for (key, candidate) in matched.entries {
            let base_child = base.children.get(&key).ok_or(Error::IllegalState {
                context: "matched child key missing from base table",
            })?;
            let derived = match candidate {
                Some(delta_child) => {
                    if delta_child.flags.is_specified(Specified::EXISTS)
                        && delta_child.flags.exists == Exists::Delete
                    {
                        continue;
                    }
                    Self::resolve_in(base_child, delta_child, false, ctx)?
                }
                None => {
                    let null = base_child.null_delta(delta.data.mode)?;
                    Self::resolve_in(base_child, &null, false, ctx)?
                }
            };
            self.children.insert(derived.name.clone(), derived);
        }

        'additions: for added in matched.additions {
            let child_path = format!("{path}.{}", added.name);

            // an already-resolved payload (from an extract with no loader
            // support) is adopted directly, subject to the same guards
            let (super_name, resolved_payload) = match added.data.mode {
                Mode::Resolved => (added.super_name.clone(), true),
                Mode::Derivation => (added.super_name.clone(), false),
                _ => {
                    ctx.sink.warn(
                        Code::ChildDiscardedOnResolve,
                        &child_path,
                        "child has no base counterpart and is not an insert",
                    )?;
                    continue 'additions;
                }
            };
            let Some(super_name) = super_name else {
                ctx.sink.warn(
                    Code::SuperMissing,
                    &child_path,
                    "new child names no super definition",
                )?;
                continue 'additions;
            };

            if !self.categories.contains_key(&super_name) {
                ctx.sink.warn(
                    Code::CategoryViolation,
                    &child_path,
                    format!("no declared aggregation category admits {super_name}"),
                )?;
                continue 'additions;
            }

            if resolved_payload {
                let mut child = added.clone();
                child.flags.exists = Exists::Insert;
                self.children.insert(child.name.clone(), child);
                continue 'additions;
            }

            let super_qname = match super_name.parse::<QualifiedName>() {
                Ok(name) => name,
                Err(_) => {
                    ctx.sink.warn(
                        Code::SuperMissing,
                        &child_path,
                        format!("super name {super_name:?} is malformed"),
                    )?;
                    continue 'additions;
                }
            };
            let Some(super_component) = ctx.loader.load_definition(&super_qname) else {
                ctx.sink.warn(
                    Code::SuperMissing,
                    &child_path,
                    format!("super definition {super_name} is not available"),
                )?;
                continue 'additions;
            };
            if super_component.is_final() {
                ctx.sink.warn(
                    Code::SuperFinal,
                    &child_path,
                    format!("super definition {super_name} is final"),
                )?;
                continue 'additions;
            }

            let mut child = Self::resolve_in(&super_component, added, false, ctx)?;
            child.name = added.name.clone();
            child.super_name = Some(super_name);
            child.flags.exists = Exists::Insert;
            child.flags.specify(Specified::EXISTS);
            self.children.insert(child.name.clone(), child);
        }

        Ok(())
    }

    /// Finalize a freshly resolved tree, bottom-up.
    pub fn finalize_resolve(&mut self, ctx: &mut MergeCtx<'_>) -> Result<()> {
        let path = self.name.clone();
        self.data.finalize_resolve(&path, ctx)?;
        if let Some(integration) = &mut self.integration {
            integration.data.finalize_resolve(&path, ctx)?;
        }
        for behavior in self.behaviors.values_mut() {
            behavior.finalize_resolve(&path, ctx)?;
        }
        for property in self.properties.values_mut() {
            property.finalize_resolve(&path, ctx)?;
        }
        for child in self.children.values_mut() {
            child.finalize_resolve(ctx)?;
        }
        // reserved names never materialize
        self.behaviors.retain(|_, b| b.flags.exists != Exists::Not);
        self.properties.retain(|_, p| p.flags.exists != Exists::Not);
        self.children.retain(|_, c| c.flags.exists != Exists::Not);
        Ok(())
    }

    fn extract_in(
        derived: &Component,
        base: &Component,
        mode: Mode,
        global: bool,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Component> {
        let path = derived.name.clone();

        let data = TraitData::extract(&derived.data, &base.data, mode, &path, ctx)?;

        let mut flags = extract_flags(
            &derived.flags,
            &base.flags,
            base.data.mode == Mode::Resolved,
        );
        flags.exists = Exists::Update;
        flags.specify(Specified::EXISTS);

        let mut delta = Component {
            data,
            kind: base.kind,
            name: derived.name.clone(),
            super_name: (mode == Mode::Derivation).then(|| base.name.clone()),
            base_level: mode == Mode::Derivation,
            flags,
            prev_flags: Flags::unspecified(),
            integration: None,
            implements: TraitTable::new(CaseMode::Sensitive),
            dispatches: TraitTable::new(CaseMode::Sensitive),
            properties: TraitTable::new(base.kind.member_case()),
            behaviors: TraitTable::new(base.kind.member_case()),
            children: TraitTable::new(base.kind.member_case()),
            categories: TraitTable::new(CaseMode::Sensitive),
        };

        if base.kind == ComponentKind::ComplexValue {
            delta.extract_properties(derived, base, mode, &path, ctx)?;
            return Ok(delta);
        }

        if global {
            delta.integration = Integration::extract(
                derived.integration.as_ref(),
                base.integration.as_ref(),
                mode,
                &path,
            )?;
        }

        // added interfaces are the key-set difference, no re-validation
        for (kind, derived_table, base_table) in [
            (
                InterfaceKind::Implements,
                &derived.implements,
                &base.implements,
            ),
            (
                InterfaceKind::Dispatches,
                &derived.dispatches,
                &base.dispatches,
            ),
        ] {
            for entry in derived_table.values() {
                if base_table.contains_key(&entry.name) {
                    continue;
                }
                let mut added = entry.clone();
                added.kind = kind;
                added.data = TraitData::blank_from(&entry.data, mode)?;
                added.exists = Exists::Insert;
                match kind {
                    InterfaceKind::Implements => delta.implements.insert(added.name.clone(), added),
                    InterfaceKind::Dispatches => {
                        delta.dispatches.insert(added.name.clone(), added)
                    }
                };
            }
        }

        delta.extract_behaviors(derived, base, mode, &path, ctx)?;
        delta.extract_properties(derived, base, mode, &path, ctx)?;

        for (key, origin) in derived.categories.iter() {
            if *origin == CategoryOrigin::DeclaredHere && !base.categories.contains_key(key) {
                delta.categories.insert(key, CategoryOrigin::DeclaredHere);
            }
        }

        delta.extract_children(derived, base, mode, &path, ctx)?;

        Ok(delta)
    }

    fn extract_behaviors(
        &mut self,
        derived: &Component,
        base: &Component,
        mode: Mode,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let spec = MatchSpec {
            kind: "behavior",
            discard_code: Code::BehaviorDiscardedOnExtract,
            for_derivation: false,
            carries_forward: &|_: &Behavior| true,
        };
        let matched = match_members(&base.behaviors, &derived.behaviors, &spec, path, ctx.sink)?;

        for (key, candidate) in matched.entries {
            let base_member = base.behaviors.get(&key).ok_or(Error::IllegalState {
                context: "matched behavior key missing from base table",
            })?;
            match candidate {
                Some(derived_member) => {
                    let mut member_delta =
                        Behavior::extract(derived_member, base_member, mode, path, ctx)?;
                    member_delta.finalize_extract();
                    // a rename is a delta even when nothing else changed
                    let renamed = member_delta.signature() != key;
                    if renamed || !member_delta.is_discardable() {
                        self.behaviors
                            .insert(member_delta.signature().to_string(), member_delta);
                    }
                }
                None => {
                    // a member the base never materialized leaves no delta
                    if matches!(base_member.flags.exists, Exists::Not | Exists::Delete) {
                        continue;
                    }
                    let mut member_delta = base_member.null_delta(mode)?;
                    member_delta.flags.exists = Exists::Delete;
                    member_delta.flags.specify(Specified::EXISTS);
                    self.behaviors
                        .insert(member_delta.signature().to_string(), member_delta);
                }
            }
        }

        for added in matched.additions {
            if added.flags.exists != Exists::Insert {
                ctx.sink.warn(
                    Code::BehaviorDiscardedOnExtract,
                    format!("{path}.{}", added.signature()),
                    "behavior has no base counterpart and is not an insert",
                )?;
                continue;
            }
            let insert = added.as_insert_delta(mode)?;
            self.behaviors.insert(insert.signature().to_string(), insert);
        }
        Ok(())
    }

    fn extract_properties(
        &mut self,
        derived: &Component,
        base: &Component,
        mode: Mode,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let spec = MatchSpec {
            kind: "property",
            discard_code: Code::PropertyDiscardedOnExtract,
            for_derivation: false,
            carries_forward: &|_: &Property| true,
        };
        let matched = match_members(&base.properties, &derived.properties, &spec, path, ctx.sink)?;

        for (key, candidate) in matched.entries {
            let base_member = base.properties.get(&key).ok_or(Error::IllegalState {
                context: "matched property key missing from base table",
            })?;
            match candidate {
                Some(derived_member) => {
                    let mut member_delta =
                        Property::extract(derived_member, base_member, mode, path, ctx)?;
                    member_delta.finalize_extract();
                    let renamed = member_delta.name != key;
                    if renamed || !member_delta.is_discardable() {
                        self.properties.insert(member_delta.name.clone(), member_delta);
                    }
                }
                None => {
                    if matches!(base_member.flags.exists, Exists::Not | Exists::Delete) {
                        continue;
                    }
                    let mut member_delta = base_member.null_delta(mode)?;
                    member_delta.flags.exists = Exists::Delete;
                    member_delta.flags.specify(Specified::EXISTS);
                    self.properties.insert(member_delta.name.clone(), member_delta);
                }
            }
        }

        for added in matched.additions {
            if added.flags.exists != Exists::Insert {
                ctx.sink.warn(
                    Code::PropertyDiscardedOnExtract,
                    format!("{path}.{}", added.name),
                    "property has no base counterpart and is not an insert",
                )?;
                continue;
            }
            let insert = added.as_insert_delta(mode)?;
            self.properties.insert(insert.name.clone(), insert);
        }
        Ok(())
    }

    fn extract_children(
        &mut self,
        derived: &Component,
        base: &Component,
        mode: Mode,
        path: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let spec = MatchSpec {
            kind: "child",
            discard_code: Code::ChildDiscardedOnExtract,
            for_derivation: false,
            carries_forward: &|_: &Component| true,
        };
        let matched = match_members(&base.children, &derived.children, &spec, path, ctx.sink)?;

        for (key, candidate) in matched.entries {
            let base_child = base.children.get(&key).ok_or(Error::IllegalState {
                context: "matched child key missing from base table",
            })?;
            match candidate {
                Some(derived_child) => {
                    // a derivation targeting a deleted or reserved base
                    // child cannot survive
                    if matches!(base_child.flags.exists, Exists::Delete | Exists::Not) {
                        ctx.sink.warn(
                            Code::ChildDiscardedOnExtract,
                            format!("{path}.{key}"),
                            "base child is deleted or reserved",
                        )?;
                        continue;
                    }
                    let mut child_delta =
                        Self::extract_in(derived_child, base_child, mode, false, ctx)?;
                    child_delta.finalize_extract();
                    let renamed = child_delta.name != key;
                    if renamed || !child_delta.is_discardable() {
                        self.children.insert(child_delta.name.clone(), child_delta);
                    }
                }
                None => {
                    // a child the base deleted or reserved leaves no delta
                    if matches!(base_child.flags.exists, Exists::Not | Exists::Delete) {
                        continue;
                    }
                    let mut child_delta = base_child.null_delta(mode)?;
                    child_delta.flags.exists = Exists::Delete;
                    child_delta.flags.specify(Specified::EXISTS);
                    self.children.insert(child_delta.name.clone(), child_delta);
                }
            }
        }

        for added in matched.additions {
            if added.flags.exists != Exists::Insert {
                ctx.sink.warn(
                    Code::ChildDiscardedOnExtract,
                    format!("{path}.{}", added.name),
                    "child has no base counterpart and is not an insert",
                )?;
                continue;
            }
            let child_delta = match added
                .super_name
                .as_deref()
                .and_then(|s| s.parse::<QualifiedName>().ok())
                .and_then(|qname| ctx.loader.load_definition(&qname))
            {
                Some(super_component) => {
                    let mut child_delta =
                        Self::extract_in(added, &super_component, Mode::Derivation, false, ctx)?;
                    child_delta.finalize_extract();
                    child_delta
                }
                // without the super a full resolved payload travels instead
                // of a derivation delta
                None => added.clone(),
            };
            self.children.insert(child_delta.name.clone(), child_delta);
        }
        Ok(())
    }

    /// Finalize a freshly extracted delta, bottom-up.
    pub fn finalize_extract(&mut self) {
        self.data.finalize_extract();
        for behavior in self.behaviors.values_mut() {
            behavior.finalize_extract();
        }
        for property in self.properties.values_mut() {
            property.finalize_extract();
        }
        for child in self.children.values_mut() {
            child.finalize_extract();
        }
    }

    pub fn is_discardable(&self) -> bool {
        match self.data.mode {
            Mode::Resolved => false,
            Mode::Invalid => true,
            _ => {
                !self.data.has_local_delta()
                    && (self.flags.specified - Specified::EXISTS).is_empty()
                    && self.flags.exists == Exists::Update
                    && self.integration.is_none()
                    && self.implements.is_empty()
                    && self.dispatches.is_empty()
                    && self.categories.is_empty()
                    && self.properties.values().all(Property::is_discardable)
                    && self.behaviors.values().all(Behavior::is_discardable)
                    && self.children.values().all(Component::is_discardable)
            }
        }
    }

    /// Discard the whole subtree.
    pub fn invalidate(&mut self) {
        self.data.invalidate();
        if let Some(integration) = &mut self.integration {
            integration.invalidate();
        }
        self.integration = None;
        for entry in self.implements.values_mut() {
            entry.invalidate();
        }
        for entry in self.dispatches.values_mut() {
            entry.invalidate();
        }
        for behavior in self.behaviors.values_mut() {
            behavior.invalidate();
        }
        for property in self.properties.values_mut() {
            property.invalidate();
        }
        for child in self.children.values_mut() {
            child.invalidate();
        }
    }

    fn require_editable(&self, attribute: &'static str) -> Result<()> {
        if self.data.mode != Mode::Resolved {
            return Err(Error::rejected(
                attribute,
                self.data.mode,
                "edit",
                "only a resolved component accepts attribute edits",
            ));
        }
        Ok(())
    }

    fn reject_if_final(&self, attribute: &'static str, next: impl ToString) -> Result<()> {
        if self.prev_flags.locks_final(true) {
            return Err(Error::rejected(
                attribute,
                "final",
                next,
                "the base level is final",
            ));
        }
        Ok(())
    }

    /// Escalate access. Setting the current value is a no-op; degrading is
    /// rejected.
    pub fn set_access(&mut self, access: Access) -> Result<()> {
        self.require_editable("Access")?;
        if access == self.flags.access {
            return Ok(());
        }
        self.reject_if_final("Access", access)?;
        if access < self.flags.access {
            return Err(Error::rejected(
                "Access",
                self.flags.access,
                access,
                "access only escalates",
            ));
        }
        self.flags.access = access;
        self.flags.specify(Specified::ACCESS);
        Ok(())
    }

    /// Pin the component final. Un-pinning is rejected.
    pub fn set_derivability(&mut self, derivability: Derivability) -> Result<()> {
        self.require_editable("Derivability")?;
        if derivability == self.flags.derivability {
            return Ok(());
        }
        if derivability == Derivability::Derivable {
            return Err(Error::rejected(
                "Derivability",
                format!("{:?}", self.flags.derivability),
                format!("{derivability:?}"),
                "finality is one-way",
            ));
        }
        self.flags.derivability = Derivability::Final;
        self.flags.specify(Specified::DERIVE);
        Ok(())
    }

    /// Escalate instance scope to static. The reverse is rejected.
    pub fn set_scope(&mut self, scope: Scope) -> Result<()> {
        self.require_editable("Scope")?;
        if scope == self.flags.scope {
            return Ok(());
        }
        self.reject_if_final("Scope", format!("{scope:?}"))?;
        if scope == Scope::Instance {
            return Err(Error::rejected(
                "Scope",
                format!("{:?}", self.flags.scope),
                format!("{scope:?}"),
                "scope only escalates to static",
            ));
        }
        self.flags.scope = Scope::Static;
        self.flags.specify(Specified::SCOPE);
        Ok(())
    }

    pub fn set_implementation(&mut self, implementation: Implementation) -> Result<()> {
        self.require_editable("Implementation")?;
        if implementation == self.flags.implementation {
            return Ok(());
        }
        self.reject_if_final("Implementation", format!("{implementation:?}"))?;
        self.flags.implementation = implementation;
        self.flags.specify(Specified::IMPL);
        Ok(())
    }

    pub fn set_tip(&mut self, tip: impl Into<String>) -> Result<()> {
        self.require_editable("Tip")?;
        self.data.tip = tip.into();
        Ok(())
    }

    /// Remove an implements/dispatches entry from a resolved component.
    ///
    /// Members that exist solely because this interface contributed them
    /// are removed along with it; a member kept alive by any other origin
    /// (manual, base, another trait) merely loses the contribution.
    pub fn remove_interface(&mut self, name: &str) -> Result<()> {
        self.require_editable("Interfaces")?;
        let entry = match self.implements.remove(name).or_else(|| self.dispatches.remove(name)) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        let descriptor = entry.descriptor();
        let mut orphaned = Vec::new();
        for behavior in self.behaviors.values_mut() {
            if !behavior.data.origin.has_trait(&descriptor) {
                continue;
            }
            behavior.data.origin.remove_trait(&descriptor);
            if behavior.data.origin.is_from_nothing() {
                orphaned.push(behavior.signature().to_string());
            }
        }
        for signature in orphaned {
            self.behaviors.remove(&signature);
        }
        for property in self.properties.values_mut() {
            property.data.origin.remove_trait(&descriptor);
        }
        Ok(())
    }

    /// Declare an aggregation category at this level.
    pub fn add_category(&mut self, super_name: impl Into<String>) -> Result<()> {
        self.require_editable("Categories")?;
        let key = super_name.into();
        if !self.categories.contains_key(&key) {
            self.categories.insert(key, CategoryOrigin::DeclaredHere);
        }
        Ok(())
    }
}

impl MatchKey for Component {
    fn match_key(&self) -> &str {
        &self.name
    }

    fn match_uid(&self) -> Option<Uid> {
        self.data.uid
    }
}

impl Behavior {
    /// A delta declaring this behavior as a brand-new insert.
    pub(crate) fn as_insert_delta(&self, mode: Mode) -> Result<Behavior> {
        let mut insert = self.clone();
        insert.data = TraitData::blank_from(&self.data, mode)?;
        insert.data.tip = self.data.tip.clone();
        insert.data.text = self.data.text.clone();
        insert.data.replace_text = self.data.replace_text;
        insert.flags.exists = Exists::Insert;
        insert.flags.specify(Specified::EXISTS);
        insert.base_unit_count = 0;
        Ok(insert)
    }

    /// The resolved behavior a brand-new insert delta declares.
    pub(crate) fn promote_insert(&self, assign_uid: bool) -> Result<Behavior> {
        let mut promoted = self.clone();
        promoted.data = TraitData::new(Mode::Resolved)?;
        promoted.data.uid = self
            .data
            .uid
            .or_else(|| assign_uid.then(Uid::generate));
        promoted.data.tip = self.data.tip.clone();
        promoted.data.text = self.data.text.clone();
        promoted.data.replace_text = self.data.replace_text;
        promoted.data.origin = Origin::manual();
        promoted.data.process_state = ProcessState::Resolved;
        promoted.flags = self.flags.promote();
        promoted.prev_flags = promoted.flags;
        promoted.base_unit_count = 0;
        Ok(promoted)
    }
}

impl Property {
    /// A delta declaring this property as a brand-new insert.
    pub(crate) fn as_insert_delta(&self, mode: Mode) -> Result<Property> {
        let mut insert = self.clone();
        insert.data = TraitData::blank_from(&self.data, mode)?;
        insert.data.tip = self.data.tip.clone();
        insert.data.text = self.data.text.clone();
        insert.data.replace_text = self.data.replace_text;
        insert.flags.exists = Exists::Insert;
        insert.flags.specify(Specified::EXISTS);
        Ok(insert)
    }

    /// The resolved property a brand-new insert delta declares.
    pub(crate) fn promote_insert(&self, assign_uid: bool) -> Result<Property> {
        let mut promoted = self.clone();
        promoted.data = TraitData::new(Mode::Resolved)?;
        promoted.data.uid = self
            .data
            .uid
            .or_else(|| assign_uid.then(Uid::generate));
        promoted.data.tip = self.data.tip.clone();
        promoted.data.text = self.data.text.clone();
        promoted.data.replace_text = self.data.replace_text;
        promoted.data.origin = Origin::manual();
        promoted.data.process_state = ProcessState::Resolved;
        promoted.flags = self.flags.promote();
        promoted.prev_flags = promoted.flags;
        Ok(promoted)
    }
}

/// A minimal behavior reconstructed from a `name(type,...)` signature,
/// used when a modification carries an interface shape without the loader.
fn behavior_from_signature(signature: &str) -> Result<Behavior> {
    let (name, rest) = signature
        .split_once('(')
        .ok_or_else(|| Error::malformed_name(signature, "missing parameter list"))?;
    let types = rest
        .strip_suffix(')')
        .ok_or_else(|| Error::malformed_name(signature, "unterminated parameter list"))?;
    let parameters = types
        .split(',')
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, t)| Parameter::resolved(format!("param{i}"), DataType::new(t), Default::default()))
        .collect::<Result<Vec<_>>>()?;
    Behavior::declared(name, ReturnValue::resolved(DataType::void())?, parameters)
}

fn manufacture_for_interface(
    demand: &Behavior,
    descriptor: &str,
    assign_uid: bool,
) -> Result<Behavior> {
    let mut manufactured = demand.clone();
    manufactured.data = TraitData::new(Mode::Resolved)?;
    manufactured.data.uid = assign_uid.then(Uid::generate);
    manufactured.data.origin = Origin::nothing();
    manufactured.data.origin.add_trait(descriptor.to_string());
    manufactured.data.process_state = ProcessState::Resolved;
    manufactured.flags = Flags::resolved();
    manufactured.flags.exists = Exists::Insert;
    manufactured.flags.access = Access::Public;
    manufactured.flags.scope = Scope::Instance;
    manufactured.flags.implementation = Implementation::Abstract;
    manufactured.prev_flags = manufactured.flags;
    manufactured.base_unit_count = manufactured.implementations.len();
    Ok(manufactured)
}
