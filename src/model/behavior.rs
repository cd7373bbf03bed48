//! Behavior members: signature, parameters, exceptions, implementations.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::types::{Access, Exists, Mode, Scope, Severity};
use crate::diagnostics::Code;
use crate::identity::{CaseMode, TraitTable, Uid};
use crate::model::base::TraitData;
use crate::model::flags::{extract_flags, resolve_flags, FlagPolicy, Flags, Specified};
use crate::model::matching::MatchKey;
use crate::model::parameter::{DataType, Parameter, ReturnValue};
use crate::model::MergeCtx;

/// Name of the instance initializer behavior; it never carries across a
/// derivation boundary.
pub const CONSTRUCTOR_NAME: &str = "_init";

/// One declared exception on a behavior, keyed by exception type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throwee {
    pub data: TraitData,
    pub type_name: DataType,
    pub exists: Exists,
}

impl Throwee {
    pub fn declared(type_name: DataType) -> Result<Self> {
        Ok(Throwee {
            data: TraitData::new(Mode::Resolved)?,
            type_name,
            exists: Exists::Insert,
        })
    }

    fn null_delta(&self, mode: Mode) -> Result<Throwee> {
        Ok(Throwee {
            data: TraitData::blank_from(&self.data, mode)?,
            type_name: self.type_name.clone(),
            exists: Exists::Update,
        })
    }

    fn resolve(
        base: &Throwee,
        delta: &Throwee,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Throwee> {
        let exists = match (base.exists, delta.exists) {
            (Exists::Not, _) => Exists::Not,
            (_, Exists::Delete) => Exists::Delete,
            (Exists::Delete, Exists::Update) => Exists::Update,
            (Exists::Insert, _) if delta.data.mode == Mode::Modification => Exists::Insert,
            _ => Exists::Update,
        };
        Ok(Throwee {
            data: TraitData::resolve(&base.data, &delta.data, location, ctx)?,
            type_name: base.type_name.clone(),
            exists,
        })
    }

    fn extract(
        derived: &Throwee,
        base: &Throwee,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Throwee> {
        Ok(Throwee {
            data: TraitData::extract(&derived.data, &base.data, mode, location, ctx)?,
            type_name: base.type_name.clone(),
            exists: match derived.exists {
                Exists::Delete => Exists::Delete,
                _ => Exists::Update,
            },
        })
    }

    fn is_discardable(&self) -> bool {
        match self.data.mode {
            Mode::Resolved => false,
            _ => self.exists == Exists::Update && !self.data.has_local_delta(),
        }
    }
}

impl MatchKey for Throwee {
    fn match_key(&self) -> &str {
        self.type_name.as_str()
    }

    fn match_uid(&self) -> Option<Uid> {
        self.data.uid
    }
}

/// One implementation unit (an opaque script body) attached at some level.
///
/// Implementations stack: each level's own units precede the inherited
/// ones. Only the count of inherited units is tracked; bodies are opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationUnit {
    pub uid: Option<Uid>,
    pub body: String,
}

impl ImplementationUnit {
    pub fn new(body: impl Into<String>) -> Self {
        ImplementationUnit {
            uid: None,
            body: body.into(),
        }
    }
}

/// A behavior member of a component.
///
/// Equality ignores the transient `prev_flags` shadow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub data: TraitData,
    pub name: String,
    /// `name(type,type,...)`; recomputed whenever parameters change.
    signature: String,
    pub flags: Flags,
    #[serde(skip)]
    pub prev_flags: Flags,
    pub return_value: ReturnValue,
    pub parameters: Vec<Parameter>,
    pub exceptions: TraitTable<Throwee>,
    /// This level's own units first, then the inherited ones.
    pub implementations: Vec<ImplementationUnit>,
    /// How many trailing implementation units were inherited from the base.
    #[serde(default)]
    pub base_unit_count: usize,
}

impl PartialEq for Behavior {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.name == other.name
            && self.signature == other.signature
            && self.flags == other.flags
            && self.return_value == other.return_value
            && self.parameters == other.parameters
            && self.exceptions == other.exceptions
            && self.implementations == other.implementations
            && self.base_unit_count == other.base_unit_count
    }
}

impl Behavior {
    /// A resolved behavior declared at this level.
    pub fn declared(
        name: impl Into<String>,
        return_value: ReturnValue,
        parameters: Vec<Parameter>,
    ) -> Result<Self> {
        let mut flags = Flags::resolved();
        flags.exists = Exists::Insert;
        let mut behavior = Behavior {
            data: TraitData::new(Mode::Resolved)?,
            name: name.into(),
            signature: String::new(),
            flags,
            prev_flags: flags,
            return_value,
            parameters,
            exceptions: TraitTable::new(CaseMode::Sensitive),
            implementations: Vec::new(),
            base_unit_count: 0,
        };
        behavior.update_signature();
        Ok(behavior)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Recompute the signature from the name and the parameter types.
    pub fn update_signature(&mut self) {
        let types: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.data_type().map(DataType::as_str).unwrap_or(""))
            .collect();
        self.signature = format!("{}({})", self.name, types.join(","));
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    /// Whether this behavior is visible to a deriving component.
    pub fn carries_to_derivation(&self) -> bool {
        self.flags.access != Access::Private && !self.is_constructor()
    }

    /// The implementation units added at this level.
    pub fn local_units(&self) -> &[ImplementationUnit] {
        let local = self.implementations.len().saturating_sub(self.base_unit_count);
        &self.implementations[..local]
    }

    /// A delta carrying no information against this behavior.
    pub fn null_delta(&self, mode: Mode) -> Result<Behavior> {
        let mut delta = Behavior {
            data: TraitData::blank_from(&self.data, mode)?,
            name: self.name.clone(),
            signature: self.signature.clone(),
            flags: Flags::unspecified(),
            prev_flags: Flags::unspecified(),
            return_value: self.return_value.null_delta(mode)?,
            parameters: self
                .parameters
                .iter()
                .map(|p| p.null_delta(mode))
                .collect::<Result<_>>()?,
            exceptions: TraitTable::new(self.exceptions.case()),
            implementations: Vec::new(),
            base_unit_count: 0,
        };
        delta.flags.exists = Exists::Update;
        Ok(delta)
    }

    pub fn resolve(
        base: &Behavior,
        delta: &Behavior,
        signature_level: bool,
        remote_allowed: bool,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Behavior> {
        trace!("resolving behavior {} at {location}", base.signature);
        let location = format!("{location}.{}", base.signature);

        let data = TraitData::resolve(&base.data, &delta.data, &location, ctx)?;

        let policy = FlagPolicy::behavior(signature_level, remote_allowed);
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

        // a rename travels on the delta; UID matching already paired the two
        let name = if delta.name.is_empty() {
            base.name.clone()
        } else {
            delta.name.clone()
        };

        let return_value = ReturnValue::resolve(
            &base.return_value,
            &delta.return_value,
            &location,
            ctx,
        )?;

        if delta.parameters.len() > base.parameters.len() {
            ctx.sink.warn(
                Code::AttributeMismatch,
                &location,
                format!(
                    "delta declares {} parameters, base declares {}; extras ignored",
                    delta.parameters.len(),
                    base.parameters.len()
                ),
            )?;
        }
        let mut parameters = Vec::with_capacity(base.parameters.len());
        for (i, base_param) in base.parameters.iter().enumerate() {
            let param_loc = format!("{location}[{i}]");
            let derived = match delta.parameters.get(i) {
                Some(delta_param) => {
                    Parameter::resolve(base_param, delta_param, &param_loc, ctx)?
                }
                None => {
                    let null = base_param.null_delta(delta.data.mode)?;
                    Parameter::resolve(base_param, &null, &param_loc, ctx)?
                }
            };
            parameters.push(derived);
        }

        let mut exceptions = TraitTable::new(base.exceptions.case());
        {
            use crate::model::matching::{match_members, MatchSpec};
            let spec = MatchSpec {
                kind: "exception",
                discard_code: Code::ExceptionDiscarded,
                for_derivation: delta.data.mode == Mode::Derivation,
                carries_forward: &|_: &Throwee| true,
            };
            let matched = match_members(
                &base.exceptions,
                &delta.exceptions,
                &spec,
                &location,
                ctx.sink,
            )?;
            for (key, candidate) in matched.entries {
                let base_throwee = base
                    .exceptions
                    .get(&key)
                    .ok_or(crate::core::errors::Error::IllegalState {
                        context: "matched exception key missing from base table",
                    })?;
                let derived = match candidate {
                    Some(delta_throwee) => {
                        Throwee::resolve(base_throwee, delta_throwee, &location, ctx)?
                    }
                    None => {
                        let null = base_throwee.null_delta(delta.data.mode)?;
                        Throwee::resolve(base_throwee, &null, &location, ctx)?
                    }
                };
                exceptions.insert(key, derived);
            }
            for added in matched.additions {
                // an exception first declared at this level
                let mut derived = added.clone();
                derived.exists = Exists::Insert;
                exceptions.insert(added.type_name.as_str().to_string(), derived);
            }
        }

        // this level's units stack in front of the inherited ones
        let mut implementations = delta.implementations.clone();
        implementations.extend(base.implementations.iter().cloned());
        let base_unit_count = base.implementations.len();

        let mut derived = Behavior {
            data,
            name,
            signature: String::new(),
            flags,
            prev_flags: base.flags,
            return_value,
            parameters,
            exceptions,
            implementations,
            base_unit_count,
        };
        derived.update_signature();
        Ok(derived)
    }

    pub fn finalize_resolve(&mut self, location: &str, ctx: &mut MergeCtx<'_>) -> Result<()> {
        let location = format!("{location}.{}", self.signature);
        self.data.finalize_resolve(&location, ctx)?;
        self.return_value.finalize_resolve(&location, ctx)?;
        for param in &mut self.parameters {
            param.finalize_resolve(&location, ctx)?;
        }
        for throwee in self.exceptions.values_mut() {
            throwee.data.finalize_resolve(&location, ctx)?;
        }
        self.exceptions
            .retain(|_, throwee| throwee.exists != Exists::Not);
        Ok(())
    }

    pub fn extract(
        derived: &Behavior,
        base: &Behavior,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Behavior> {
        trace!("extracting behavior {} at {location}", derived.signature);
        let location = format!("{location}.{}", derived.signature);

        let data = TraitData::extract(&derived.data, &base.data, mode, &location, ctx)?;

        let mut flags = extract_flags(
            &derived.flags,
            &base.flags,
            base.data.mode == Mode::Resolved,
        );
        flags.exists = Exists::Update;
        flags.specify(Specified::EXISTS);

        let name = derived.name.clone();

        let return_value = ReturnValue::extract(
            &derived.return_value,
            &base.return_value,
            mode,
            &location,
            ctx,
        )?;

        let mut parameters = Vec::with_capacity(base.parameters.len());
        for (i, base_param) in base.parameters.iter().enumerate() {
            let param_loc = format!("{location}[{i}]");
            let delta = match derived.parameters.get(i) {
                Some(derived_param) => {
                    Parameter::extract(derived_param, base_param, mode, &param_loc, ctx)?
                }
                None => base_param.null_delta(mode)?,
            };
            parameters.push(delta);
        }

        let mut exceptions = TraitTable::new(base.exceptions.case());
        {
            use crate::model::matching::{match_members, MatchSpec};
            let spec = MatchSpec {
                kind: "exception",
                discard_code: Code::ExceptionDiscarded,
                for_derivation: false,
                carries_forward: &|_: &Throwee| true,
            };
            let matched = match_members(
                &base.exceptions,
                &derived.exceptions,
                &spec,
                &location,
                ctx.sink,
            )?;
            for (key, candidate) in matched.entries {
                let base_throwee = base
                    .exceptions
                    .get(&key)
                    .ok_or(crate::core::errors::Error::IllegalState {
                        context: "matched exception key missing from base table",
                    })?;
                match candidate {
                    Some(derived_throwee) => {
                        let delta =
                            Throwee::extract(derived_throwee, base_throwee, mode, &location, ctx)?;
                        if !delta.is_discardable() {
                            exceptions.insert(key, delta);
                        }
                    }
                    None => {
                        // present on the base, gone on the derived level
                        let mut delta = base_throwee.null_delta(mode)?;
                        delta.exists = Exists::Delete;
                        exceptions.insert(key, delta);
                    }
                }
            }
            for added in matched.additions {
                let mut delta = added.clone();
                delta.data = TraitData::blank_from(&added.data, mode)?;
                delta.data.uid = added.data.uid;
                delta.exists = Exists::Insert;
                exceptions.insert(added.type_name.as_str().to_string(), delta);
            }
        }

        let implementations = derived.local_units().to_vec();

        // parameter deltas carry no types, so the signature cannot be
        // recomputed here; the derived level's is authoritative
        let signature = derived.signature.clone();
        Ok(Behavior {
            data,
            name,
            signature,
            flags,
            prev_flags: Flags::unspecified(),
            return_value,
            parameters,
            exceptions,
            implementations,
            base_unit_count: 0,
        })
    }

    pub fn finalize_extract(&mut self) {
        self.data.finalize_extract();
        self.return_value.finalize_extract();
        for param in &mut self.parameters {
            param.finalize_extract();
        }
        for throwee in self.exceptions.values_mut() {
            throwee.data.finalize_extract();
        }
    }

    pub fn is_discardable(&self) -> bool {
        match self.data.mode {
            Mode::Resolved => {
                self.data.origin.is_from_nothing() && self.flags.exists == Exists::Not
            }
            Mode::Invalid => true,
            _ => {
                !self.data.has_local_delta()
                    && (self.flags.specified - Specified::EXISTS).is_empty()
                    && self.flags.exists == Exists::Update
                    && self.return_value.is_discardable()
                    && self.parameters.iter().all(Parameter::is_discardable)
                    && self.exceptions.values().all(Throwee::is_discardable)
                    && self.implementations.is_empty()
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.return_value.invalidate();
        for param in &mut self.parameters {
            param.invalidate();
        }
        for throwee in self.exceptions.values_mut() {
            throwee.data.invalidate();
        }
        self.implementations.clear();
        self.base_unit_count = 0;
    }

    /// Whether the behavior satisfies an interface member declaration:
    /// same return type, public, not static.
    pub fn satisfies_interface_member(
        &self,
        return_type: &DataType,
        parameter_types: &[DataType],
    ) -> bool {
        self.flags.access == Access::Public
            && self.flags.scope == Scope::Instance
            && self.return_value.data_type() == Some(return_type)
            && self.parameters.len() == parameter_types.len()
            && self
                .parameters
                .iter()
                .zip(parameter_types)
                .all(|(p, t)| p.data_type() == Some(t))
    }

    /// Keep only exceptions also declared by an interface contributing this
    /// behavior, logging each one dropped.
    pub fn intersect_exceptions(
        &mut self,
        declared: &[DataType],
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<()> {
        let mut dropped = Vec::new();
        self.exceptions.retain(|key, _| {
            let keep = declared.iter().any(|t| t.as_str() == key);
            if !keep {
                dropped.push(key.to_string());
            }
            keep
        });
        for key in dropped {
            ctx.sink.log(
                Code::ExceptionDiscarded,
                Severity::Info,
                format!("{location}.{}", self.signature),
                format!("exception {key} is not declared by every contributing interface"),
            )?;
        }
        Ok(())
    }
}

impl MatchKey for Behavior {
    fn match_key(&self) -> &str {
        &self.signature
    }

    fn match_uid(&self) -> Option<Uid> {
        self.data.uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::core::types::Direction;
    use crate::diagnostics::DiagnosticSink;
    use crate::loader::NullLoader;

    fn with_ctx<R>(f: impl FnOnce(&mut MergeCtx<'_>) -> R) -> (R, DiagnosticSink) {
        let loader = NullLoader;
        let options = EngineOptions::default();
        let mut sink = DiagnosticSink::new();
        let out = {
            let mut ctx = MergeCtx {
                loader: &loader,
                sink: &mut sink,
                options: &options,
            };
            f(&mut ctx)
        };
        (out, sink)
    }

    fn get_size() -> Behavior {
        Behavior::declared(
            "getSize",
            ReturnValue::resolved(DataType::new("int")).unwrap(),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn signature_tracks_parameter_types() {
        let put = Behavior::declared(
            "put",
            ReturnValue::resolved(DataType::void()).unwrap(),
            vec![
                Parameter::resolved("key", DataType::new("String"), Direction::In).unwrap(),
                Parameter::resolved("value", DataType::new("Object"), Direction::In).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(put.signature(), "put(String,Object)");
        assert_eq!(get_size().signature(), "getSize()");
    }

    #[test]
    fn null_delta_round_trips_to_the_base() {
        let base = get_size();
        let delta = base.null_delta(Mode::Modification).unwrap();
        assert!(delta.is_discardable());

        let (derived, sink) = with_ctx(|ctx| {
            let mut derived =
                Behavior::resolve(&base, &delta, false, false, "Cache", ctx).unwrap();
            derived.finalize_resolve("Cache", ctx).unwrap();
            derived
        });
        assert!(sink.is_empty());
        assert_eq!(derived.signature(), base.signature());
        assert_eq!(derived.return_value.data_type(), base.return_value.data_type());
        assert_eq!(derived.flags.exists, Exists::Insert);
    }

    #[test]
    fn derivation_turns_insert_into_update() {
        let base = get_size();
        let delta = base.null_delta(Mode::Derivation).unwrap();
        let (derived, _) = with_ctx(|ctx| {
            Behavior::resolve(&base, &delta, false, false, "Cache", ctx).unwrap()
        });
        assert_eq!(derived.flags.exists, Exists::Update);
    }

    #[test]
    fn extract_of_unchanged_behavior_is_discardable() {
        let base = get_size();
        let (delta, sink) = with_ctx(|ctx| {
            let mut delta =
                Behavior::extract(&base, &base, Mode::Modification, "Cache", ctx).unwrap();
            delta.finalize_extract();
            delta
        });
        assert!(sink.is_empty());
        assert!(delta.is_discardable());
    }

    #[test]
    fn added_exception_extracts_as_an_insert() {
        let base = get_size();
        let mut derived = base.clone();
        derived
            .exceptions
            .insert("io.IOException", Throwee::declared(DataType::new("io.IOException")).unwrap());

        let (delta, _) = with_ctx(|ctx| {
            Behavior::extract(&derived, &base, Mode::Modification, "Cache", ctx).unwrap()
        });
        let throwee = delta.exceptions.get("io.IOException").unwrap();
        assert_eq!(throwee.exists, Exists::Insert);
        assert!(!delta.is_discardable());
    }

    #[test]
    fn removed_exception_extracts_as_a_delete() {
        let mut base = get_size();
        base.exceptions
            .insert("io.IOException", Throwee::declared(DataType::new("io.IOException")).unwrap());
        let derived = get_size();

        let (delta, _) = with_ctx(|ctx| {
            Behavior::extract(&derived, &base, Mode::Modification, "Cache", ctx).unwrap()
        });
        assert_eq!(
            delta.exceptions.get("io.IOException").unwrap().exists,
            Exists::Delete
        );
    }

    #[test]
    fn implementation_units_stack_in_front_of_inherited_ones() {
        let mut base = get_size();
        base.implementations
            .push(ImplementationUnit::new("return size;"));

        let mut delta = base.null_delta(Mode::Derivation).unwrap();
        delta
            .implementations
            .push(ImplementationUnit::new("audit(); return super.getSize();"));

        let (derived, _) = with_ctx(|ctx| {
            Behavior::resolve(&base, &delta, false, false, "Cache", ctx).unwrap()
        });
        assert_eq!(derived.implementations.len(), 2);
        assert_eq!(derived.base_unit_count, 1);
        assert_eq!(derived.local_units().len(), 1);
        assert_eq!(
            derived.local_units()[0].body,
            "audit(); return super.getSize();"
        );

        let (extracted, _) = with_ctx(|ctx| {
            Behavior::extract(&derived, &base, Mode::Derivation, "Cache", ctx).unwrap()
        });
        assert_eq!(extracted.implementations.len(), 1);
        assert_eq!(
            extracted.implementations[0].body,
            "audit(); return super.getSize();"
        );
    }

    #[test]
    fn interface_satisfaction_requires_public_instance_and_matching_types() {
        let mut b = get_size();
        assert!(b.satisfies_interface_member(&DataType::new("int"), &[]));
        assert!(!b.satisfies_interface_member(&DataType::new("long"), &[]));
        b.flags.access = Access::Protected;
        assert!(!b.satisfies_interface_member(&DataType::new("int"), &[]));
        b.flags.access = Access::Public;
        b.flags.scope = Scope::Static;
        assert!(!b.satisfies_interface_member(&DataType::new("int"), &[]));
    }
}
