//! Property members: typed state with an optional structured value.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::types::{Access, Exists, Mode};
use crate::diagnostics::Code;
use crate::identity::{TraitTable, Uid};
use crate::model::base::TraitData;
use crate::model::behavior::Behavior;
use crate::model::component::Component;
use crate::model::flags::{extract_flags, resolve_flags, FlagPolicy, Flags, Specified};
use crate::model::matching::MatchKey;
use crate::model::parameter::DataType;
use crate::model::MergeCtx;

/// The value attached to a property at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum PropertyValue {
    /// No value contributed at this level.
    #[default]
    Absent,
    /// A literal value in source form.
    Simple(String),
    /// A structured value carried as a complex-value component.
    Complex(Box<Component>),
}

impl PropertyValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, PropertyValue::Absent)
    }
}

/// A property member of a component.
///
/// Equality ignores the transient `prev_flags` shadow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub data: TraitData,
    pub name: String,
    /// `None` on a delta that leaves the type alone.
    pub data_type: Option<DataType>,
    /// Number of index dimensions; zero for a scalar property.
    pub indexed: u8,
    pub flags: Flags,
    #[serde(skip)]
    pub prev_flags: Flags,
    pub value: PropertyValue,
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
            && self.name == other.name
            && self.data_type == other.data_type
            && self.indexed == other.indexed
            && self.flags == other.flags
            && self.value == other.value
    }
}

impl Property {
    /// A resolved property declared at this level.
    pub fn declared(name: impl Into<String>, data_type: DataType) -> Result<Self> {
        let mut flags = Flags::resolved();
        flags.exists = Exists::Insert;
        Ok(Property {
            data: TraitData::new(Mode::Resolved)?,
            name: name.into(),
            data_type: Some(data_type),
            indexed: 0,
            flags,
            prev_flags: flags,
            value: PropertyValue::Absent,
        })
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    /// Conventional accessor behavior names for this property.
    pub fn accessor_names(&self) -> (String, String) {
        let mut capitalized = self.name.clone();
        if let Some(first) = capitalized.get_mut(..1) {
            first.make_ascii_uppercase();
        }
        (format!("get{capitalized}"), format!("set{capitalized}"))
    }

    /// Whether a deriving component can see this property. A private
    /// property stays visible when one of its accessors is not private.
    pub fn carries_to_derivation(&self, behaviors: &TraitTable<Behavior>) -> bool {
        if self.flags.access != Access::Private {
            return true;
        }
        let (getter, setter) = self.accessor_names();
        behaviors
            .values()
            .any(|b| (b.name == getter || b.name == setter) && b.flags.access != Access::Private)
    }

    /// Whether the property can be assigned: a setter accessor exists.
    pub fn is_settable(&self, behaviors: &TraitTable<Behavior>) -> bool {
        let (_, setter) = self.accessor_names();
        behaviors.values().any(|b| b.name == setter)
    }

    /// A delta carrying no information against this property.
    pub fn null_delta(&self, mode: Mode) -> Result<Property> {
        let mut flags = Flags::unspecified();
        flags.exists = Exists::Update;
        Ok(Property {
            data: TraitData::blank_from(&self.data, mode)?,
            name: self.name.clone(),
            data_type: None,
            indexed: self.indexed,
            flags,
            prev_flags: Flags::unspecified(),
            value: PropertyValue::Absent,
        })
    }

    pub fn resolve(
        base: &Property,
        delta: &Property,
        signature_level: bool,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Property> {
        trace!("resolving property {} at {location}", base.name);
        let location = format!("{location}.{}", base.name);

        let data = TraitData::resolve(&base.data, &delta.data, &location, ctx)?;

        let policy = FlagPolicy::property(signature_level);
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

        let name = if delta.name.is_empty() {
            base.name.clone()
        } else {
            delta.name.clone()
        };

        let value = match (&base.value, &delta.value) {
            (_, PropertyValue::Absent) => base.value.clone(),
            (PropertyValue::Complex(base_value), PropertyValue::Complex(delta_value)) => {
                PropertyValue::Complex(Box::new(Component::resolve(
                    base_value,
                    delta_value,
                    ctx,
                )?))
            }
            (_, overriding) => overriding.clone(),
        };

        Ok(Property {
            data,
            name,
            data_type: delta.data_type.clone().or_else(|| base.data_type.clone()),
            indexed: base.indexed,
            flags,
            prev_flags: base.flags,
            value,
        })
    }

    pub fn finalize_resolve(&mut self, location: &str, ctx: &mut MergeCtx<'_>) -> Result<()> {
        let location = format!("{location}.{}", self.name);
        self.data.finalize_resolve(&location, ctx)
    }

    pub fn extract(
        derived: &Property,
        base: &Property,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Property> {
        trace!("extracting property {} at {location}", derived.name);
        let location = format!("{location}.{}", derived.name);

        if derived.indexed != base.indexed {
            ctx.sink.warn(
                Code::AttributeMismatch,
                &location,
                format!(
                    "index dimensions changed from {} to {}; base kept",
                    base.indexed, derived.indexed
                ),
            )?;
        }

        let data = TraitData::extract(&derived.data, &base.data, mode, &location, ctx)?;

        let mut flags = extract_flags(
            &derived.flags,
            &base.flags,
            base.data.mode == Mode::Resolved,
        );
        flags.exists = Exists::Update;
        flags.specify(Specified::EXISTS);

        let value = match (&derived.value, &base.value) {
            (PropertyValue::Complex(derived_value), PropertyValue::Complex(base_value)) => {
                let delta = Component::extract(derived_value, base_value, ctx)?;
                if delta.is_discardable() {
                    PropertyValue::Absent
                } else {
                    PropertyValue::Complex(Box::new(delta))
                }
            }
            (value, base_value) if value == base_value => PropertyValue::Absent,
            (value, _) => value.clone(),
        };

        Ok(Property {
            data,
            name: derived.name.clone(),
            data_type: (derived.data_type != base.data_type)
                .then(|| derived.data_type.clone())
                .flatten(),
            indexed: base.indexed,
            flags,
            prev_flags: Flags::unspecified(),
            value,
        })
    }

    pub fn finalize_extract(&mut self) {
        self.data.finalize_extract();
        if let PropertyValue::Complex(value) = &mut self.value {
            value.finalize_extract();
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
                    && self.data_type.is_none()
                    && self.value.is_absent()
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.data_type = None;
        if let PropertyValue::Complex(value) = &mut self.value {
            value.invalidate();
        }
        self.value = PropertyValue::Absent;
    }
}

impl MatchKey for Property {
    fn match_key(&self) -> &str {
        &self.name
    }

    fn match_uid(&self) -> Option<Uid> {
        self.data.uid
    }
}
