//! The single foreign-model integration mapping of a component.
//!
//! An integration names one external signature and maps its method
//! signatures and field names onto local behavior and property names.
//! The mapping resolves at the global level only; below that a
//! modification either carries the whole mapping verbatim or nothing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::errors::Result;
use crate::core::types::Mode;
use crate::model::base::TraitData;
use crate::model::MergeCtx;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub data: TraitData,
    /// Global name of the integrated external signature.
    pub signature_name: String,
    /// Foreign method signature to local behavior signature.
    pub method_map: BTreeMap<String, String>,
    /// Foreign field name to local property name.
    pub field_map: BTreeMap<String, String>,
}

impl Integration {
    pub fn new(signature_name: impl Into<String>) -> Result<Self> {
        Ok(Integration {
            data: TraitData::new(Mode::Resolved)?,
            signature_name: signature_name.into(),
            method_map: BTreeMap::new(),
            field_map: BTreeMap::new(),
        })
    }

    /// The local behavior signature a foreign method maps to, defaulting to
    /// the foreign signature itself.
    pub fn behavior_for<'a>(&'a self, method: &'a str) -> &'a str {
        self.method_map.get(method).map(String::as_str).unwrap_or(method)
    }

    /// The local property name a foreign field maps to, defaulting to the
    /// foreign name itself.
    pub fn property_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.field_map.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Origin description contributed to members the integration pulls in.
    pub fn descriptor(&self) -> String {
        format!("integrates {}", self.signature_name)
    }

    pub(crate) fn resolve(
        base: Option<&Integration>,
        delta: Option<&Integration>,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Option<Integration>> {
        match (base, delta) {
            (None, None) => Ok(None),
            (Some(base), None) => Ok(Some(base.clone())),
            (base, Some(delta)) => {
                let mut derived = delta.clone();
                if let Some(base) = base {
                    derived.data = TraitData::resolve(&base.data, &delta.data, location, ctx)?;
                } else {
                    derived.data = TraitData::new(Mode::Resolved)?;
                    derived.data.uid = delta.data.uid;
                }
                derived.data.finalize_resolve(location, ctx)?;
                Ok(Some(derived))
            }
        }
    }

    pub(crate) fn extract(
        derived: Option<&Integration>,
        base: Option<&Integration>,
        mode: Mode,
        _location: &str,
    ) -> Result<Option<Integration>> {
        match (derived, base) {
            (None, _) => Ok(None),
            (Some(derived), Some(base))
                if derived.signature_name == base.signature_name
                    && derived.method_map == base.method_map
                    && derived.field_map == base.field_map =>
            {
                Ok(None)
            }
            (Some(derived), _) => {
                let mut delta = derived.clone();
                delta.data = TraitData::blank_from(&derived.data, mode)?;
                Ok(Some(delta))
            }
        }
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.method_map.clear();
        self.field_map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_default_to_the_foreign_name() {
        let mut integration = Integration::new("lib.Timer").unwrap();
        integration
            .method_map
            .insert("tick()".to_string(), "onTick()".to_string());
        assert_eq!(integration.behavior_for("tick()"), "onTick()");
        assert_eq!(integration.behavior_for("reset()"), "reset()");
        assert_eq!(integration.property_for("interval"), "interval");
    }

    #[test]
    fn unchanged_mapping_extracts_to_nothing() {
        let integration = Integration::new("lib.Timer").unwrap();
        let delta = Integration::extract(
            Some(&integration),
            Some(&integration),
            Mode::Modification,
            "t",
        )
        .unwrap();
        assert!(delta.is_none());

        let mut changed = integration.clone();
        changed
            .field_map
            .insert("interval".to_string(), "Interval".to_string());
        let delta =
            Integration::extract(Some(&changed), Some(&integration), Mode::Modification, "t")
                .unwrap();
        assert!(delta.is_some());
    }
}
