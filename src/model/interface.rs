//! Implements/dispatches interface entries.
//!
//! An interface entry records the fact that a component honors a named
//! external signature: the signature's global name, whether it is
//! implemented or dispatched, and the member names the signature declared
//! when the entry was added. Expansion (binding or manufacturing the
//! behaviors an interface demands) happens in the component resolve step,
//! which loads the signature shape through the loader.

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::types::{Exists, Mode};
use crate::identity::Uid;
use crate::model::base::TraitData;
use crate::model::matching::MatchKey;
use crate::model::MergeCtx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceKind {
    /// The component provides the interface's behaviors.
    Implements,
    /// The component emits the interface's behaviors to registered targets.
    Dispatches,
}

impl InterfaceKind {
    pub fn label(&self) -> &'static str {
        match self {
            InterfaceKind::Implements => "implements",
            InterfaceKind::Dispatches => "dispatches",
        }
    }
}

/// One implements/dispatches entry on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub data: TraitData,
    /// Global name of the external signature.
    pub name: String,
    pub kind: InterfaceKind,
    pub exists: Exists,
    /// Behavior signatures the external shape declared when this entry was
    /// added; recorded so the entry stays meaningful without the loader.
    pub behaviors: Vec<String>,
    /// Property names the external shape declared.
    pub properties: Vec<String>,
}

impl Interface {
    pub fn declared(name: impl Into<String>, kind: InterfaceKind) -> Result<Self> {
        Ok(Interface {
            data: TraitData::new(Mode::Resolved)?,
            name: name.into(),
            kind,
            exists: Exists::Insert,
            behaviors: Vec::new(),
            properties: Vec::new(),
        })
    }

    /// Origin description contributed to members this interface expands
    /// into, e.g. `implements pkg.Runnable`.
    pub fn descriptor(&self) -> String {
        format!("{} {}", self.kind.label(), self.name)
    }

    /// Carry a base entry forward across one resolve level.
    pub(crate) fn carry_forward(
        base: &Interface,
        delta_mode: Mode,
        location: &str,
        ctx: &mut MergeCtx<'_>,
    ) -> Result<Interface> {
        let null = Interface {
            data: TraitData::blank_from(&base.data, delta_mode)?,
            name: base.name.clone(),
            kind: base.kind,
            exists: Exists::Update,
            behaviors: Vec::new(),
            properties: Vec::new(),
        };
        let mut derived = Interface {
            data: TraitData::resolve(&base.data, &null.data, location, ctx)?,
            name: base.name.clone(),
            kind: base.kind,
            exists: Exists::Update,
            behaviors: base.behaviors.clone(),
            properties: base.properties.clone(),
        };
        derived.data.finalize_resolve(location, ctx)?;
        Ok(derived)
    }

    pub fn invalidate(&mut self) {
        self.data.invalidate();
        self.behaviors.clear();
        self.properties.clear();
    }
}

impl MatchKey for Interface {
    fn match_key(&self) -> &str {
        &self.name
    }

    fn match_uid(&self) -> Option<Uid> {
        self.data.uid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_names_the_kind_and_signature() {
        let implements = Interface::declared("pkg.Runnable", InterfaceKind::Implements).unwrap();
        assert_eq!(implements.descriptor(), "implements pkg.Runnable");
        let dispatches = Interface::declared("ui.MouseEvents", InterfaceKind::Dispatches).unwrap();
        assert_eq!(dispatches.descriptor(), "dispatches ui.MouseEvents");
    }
}
