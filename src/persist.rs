//! Versioned save/restore of a component tree.
//!
//! The binary form is a postcard envelope: a format version followed by
//! the serialized component. Transient resolve/extract bookkeeping is
//! skipped by the serde derives, so a round-tripped tree compares equal to
//! its finalized source. A JSON mirror exists for debugging.

use std::path::Path;

use anyhow::Context;
use log::debug;

use crate::core::errors::{Error, Result};
use crate::model::Component;

/// Current binary format version.
pub const FORMAT_VERSION: u16 = 1;

/// Serialize a tree into the versioned binary envelope.
pub fn save_bytes(component: &Component) -> Result<Vec<u8>> {
    let bytes = postcard::to_allocvec(&(FORMAT_VERSION, component))?;
    debug!("serialized {} into {} bytes", component.name, bytes.len());
    Ok(bytes)
}

/// Restore a tree from the versioned binary envelope.
pub fn load_bytes(bytes: &[u8]) -> Result<Component> {
    let (version, rest) = postcard::take_from_bytes::<u16>(bytes)?;
    if version > FORMAT_VERSION {
        return Err(Error::UnknownVersion {
            found: version,
            supported: FORMAT_VERSION,
        });
    }
    let component: Component = postcard::from_bytes(rest)?;
    Ok(component)
}

/// Pretty JSON rendering of a tree, for debugging and fixtures.
pub fn to_json(component: &Component) -> Result<String> {
    Ok(serde_json::to_string_pretty(component)?)
}

pub fn from_json(json: &str) -> Result<Component> {
    Ok(serde_json::from_str(json)?)
}

/// Write the binary envelope to a file.
pub fn save_file(component: &Component, path: &Path) -> anyhow::Result<()> {
    let bytes = save_bytes(component)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Read the binary envelope from a file.
pub fn load_file(path: &Path) -> anyhow::Result<Component> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(load_bytes(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::QualifiedName;
    use crate::model::{Behavior, DataType, ReturnValue};
    use pretty_assertions::assert_eq;

    fn sample() -> Component {
        let name: QualifiedName = "util.Cache".parse().unwrap();
        let mut component = Component::root_definition(&name).unwrap();
        component.behaviors.insert(
            "getSize()",
            Behavior::declared(
                "getSize",
                ReturnValue::resolved(DataType::new("int")).unwrap(),
                vec![],
            )
            .unwrap(),
        );
        component
    }

    #[test]
    fn binary_round_trip_preserves_the_tree() {
        let component = sample();
        let bytes = save_bytes(&component).unwrap();
        let restored = load_bytes(&bytes).unwrap();
        assert_eq!(restored, component);
    }

    #[test]
    fn json_round_trip_preserves_the_tree() {
        let component = sample();
        let restored = from_json(&to_json(&component).unwrap()).unwrap();
        assert_eq!(restored, component);
    }

    #[test]
    fn future_version_is_rejected() {
        let component = sample();
        let bytes = postcard::to_allocvec(&(FORMAT_VERSION + 1, &component)).unwrap();
        let err = load_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::UnknownVersion { found, .. } if found == FORMAT_VERSION + 1));
    }
}
