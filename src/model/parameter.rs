//! Behavior parameters and return values.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::Result;
use crate::core::types::{Direction, Mode};
use crate::model::base::TraitData;
use crate::model::MergeCtx;

/// A named data type, e.g. `int`, `String[]`, `util.Cache`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataType(String);

impl DataType {
    pub fn new(name: impl Into<String>) -> Self {
        DataType(name.into())
    }

    pub fn void() -> Self {
        DataType("void".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_void(&self) -> bool {
        self.0 == "void"
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One positional behavior parameter.
///
/// Parameters match positionally; the UID carried by the trait data repairs
/// renames and type changes across levels. On a delta, `name` and
/// `data_type` are `None` unless this level changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub data: TraitData,
    pub name: Option<String>,
    pub data_type: Option<DataType>,
    pub direction: Direction,
}

impl Parameter {
    /// A resolved parameter with every detail present.
    pub fn resolved(name: impl Into<String>, data_type: DataType, direction: Direction) -> Result<Self> {
        Ok(Parameter {
            data: TraitData::new(Mode::Resolved)?,
            name: Some(name.into()),
            data_type: Some(data_type),
            direction,
        })
    }

    /// The effective name, empty when unresolved and unnamed.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// The effective data type; a resolved parameter always has one.
    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    /// A delta carrying no information against this parameter.
    pub fn null_delta(&self, mode: Mode) -> Result<Parameter> {
        Ok(Parameter {
            data: TraitData::blank_from(&self.data, mode)?,
            name: None,
            data_type: None,
            direction: self.direction,
        })
    }

    pub fn resolve(
        base: &Parameter,
        delta: &Parameter,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Parameter> {
        Ok(Parameter {
            data: TraitData::resolve(&base.data, &delta.data, location, ctx)?,
            name: delta.name.clone().or_else(|| base.name.clone()),
            data_type: delta.data_type.clone().or_else(|| base.data_type.clone()),
            direction: base.direction,
        })
    }

    pub fn extract(
        derived: &Parameter,
        base: &Parameter,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Parameter> {
        Ok(Parameter {
            data: TraitData::extract(&derived.data, &base.data, mode, location, ctx)?,
            name: (derived.name != base.name)
                .then(|| derived.name.clone())
                .flatten(),
            data_type: (derived.data_type != base.data_type)
                .then(|| derived.data_type.clone())
                .flatten(),
            direction: base.direction,
        })
    }

    pub fn finalize_resolve(&mut self, location: &str, ctx: &mut MergeCtx<'_>) -> Result<()> {
        self.data.finalize_resolve(location, ctx)
    }

    pub fn finalize_extract(&mut self) {
        self.data.finalize_extract();
    }

    pub fn is_discardable(&self) -> bool {
        match self.data.mode {
            Mode::Resolved => false,
            _ => !self.data.has_local_delta() && self.name.is_none() && self.data_type.is_none(),
        }
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.name = None;
        self.data_type = None;
    }
}

/// The return value of a behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValue {
    pub data: TraitData,
    /// `None` on a delta that leaves the type alone.
    pub data_type: Option<DataType>,
}

impl ReturnValue {
    pub fn resolved(data_type: DataType) -> Result<Self> {
        Ok(ReturnValue {
            data: TraitData::new(Mode::Resolved)?,
            data_type: Some(data_type),
        })
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    pub fn null_delta(&self, mode: Mode) -> Result<ReturnValue> {
        Ok(ReturnValue {
            data: TraitData::blank_from(&self.data, mode)?,
            data_type: None,
        })
    }

    pub fn resolve(
        base: &ReturnValue,
        delta: &ReturnValue,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<ReturnValue> {
        Ok(ReturnValue {
            data: TraitData::resolve(&base.data, &delta.data, location, ctx)?,
            data_type: delta.data_type.clone().or_else(|| base.data_type.clone()),
        })
    }

    pub fn extract(
        derived: &ReturnValue,
        base: &ReturnValue,
        mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<ReturnValue> {
        Ok(ReturnValue {
            data: TraitData::extract(&derived.data, &base.data, mode, location, ctx)?,
            data_type: (derived.data_type != base.data_type)
                .then(|| derived.data_type.clone())
                .flatten(),
        })
    }

    pub fn finalize_resolve(&mut self, location: &str, ctx: &mut MergeCtx<'_>) -> Result<()> {
        self.data.finalize_resolve(location, ctx)
    }

    pub fn finalize_extract(&mut self) {
        self.data.finalize_extract();
    }

    pub fn is_discardable(&self) -> bool {
        match self.data.mode {
            Mode::Resolved => false,
            _ => !self.data.has_local_delta() && self.data_type.is_none(),
        }
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.data_type = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use crate::diagnostics::DiagnosticSink;
    use crate::loader::NullLoader;

    fn with_ctx<R>(f: impl FnOnce(&mut MergeCtx<'_>) -> R) -> R {
        let loader = NullLoader;
        let options = EngineOptions::default();
        let mut sink = DiagnosticSink::new();
        let mut ctx = MergeCtx {
            loader: &loader,
            sink: &mut sink,
            options: &options,
        };
        f(&mut ctx)
    }

    #[test]
    fn null_delta_resolves_to_the_base() {
        let base = Parameter::resolved("count", DataType::new("int"), Direction::In).unwrap();
        let delta = base.null_delta(Mode::Modification).unwrap();
        let derived =
            with_ctx(|ctx| Parameter::resolve(&base, &delta, "b.count", ctx).unwrap());
        assert_eq!(derived.name(), "count");
        assert_eq!(derived.data_type(), Some(&DataType::new("int")));
        assert_eq!(derived.direction, Direction::In);
    }

    #[test]
    fn rename_extracts_to_a_name_delta_only() {
        let base = Parameter::resolved("count", DataType::new("int"), Direction::In).unwrap();
        let mut derived = base.clone();
        derived.name = Some("total".to_string());

        let delta = with_ctx(|ctx| {
            Parameter::extract(&derived, &base, Mode::Modification, "b.count", ctx).unwrap()
        });
        assert_eq!(delta.name.as_deref(), Some("total"));
        assert!(delta.data_type.is_none());
        assert!(!delta.is_discardable());

        let unchanged = with_ctx(|ctx| {
            Parameter::extract(&base, &base, Mode::Modification, "b.count", ctx).unwrap()
        });
        assert!(unchanged.is_discardable());
    }

    #[test]
    fn return_type_delta_wins_on_resolve() {
        let base = ReturnValue::resolved(DataType::void()).unwrap();
        let mut delta = base.null_delta(Mode::Modification).unwrap();
        delta.data_type = Some(DataType::new("String"));
        let derived = with_ctx(|ctx| ReturnValue::resolve(&base, &delta, "b", ctx).unwrap());
        assert_eq!(derived.data_type(), Some(&DataType::new("String")));
    }
}
