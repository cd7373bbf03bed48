//! Trait derivation/modification resolution for hierarchical component
//! definitions.
//!
//! A *component* describes typed members (properties, behaviors, nested
//! child components, implemented/dispatched interfaces) across
//! inheritance-like levels. Two operations form the algebra:
//!
//! - [`resolve`] merges a base with a derivation or modification delta,
//!   producing a resolved tree;
//! - [`extract`] diffs a derived tree against its base, producing the
//!   minimal delta that rebuilds it.
//!
//! The two are structural inverses: `resolve(B, extract(D, B)) == D` for
//! any derived `D` of base `B`. Structural conflicts are reported through a
//! bounded diagnostic sink and repaired by discarding the offending
//! fragment; only sink overflow aborts a merge.

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod identity;
pub mod loader;
pub mod model;
pub mod persist;
pub mod query;
pub mod reflect;

pub use crate::config::EngineOptions;
pub use crate::core::errors::{Error, Result};
pub use crate::core::types::Mode;
pub use crate::diagnostics::{Diagnostic, DiagnosticSink};
pub use crate::identity::{QualifiedName, Uid};
pub use crate::loader::{Loader, MemoryLoader, NullLoader};
pub use crate::model::{Component, MergeCtx};

/// A finished merge: the produced tree plus everything the merge had to
/// say about it.
#[derive(Debug)]
pub struct MergeOutcome {
    pub component: Component,
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge `base` with `delta` under the given loader and options.
pub fn resolve(
    base: &Component,
    delta: &Component,
    loader: &dyn Loader,
    options: &EngineOptions,
) -> Result<MergeOutcome> {
    let mut sink = DiagnosticSink::with_capacity(options.diagnostic_capacity);
    let component = {
        let mut ctx = MergeCtx {
            loader,
            sink: &mut sink,
            options,
        };
        Component::resolve(base, delta, &mut ctx)?
    };
    Ok(MergeOutcome {
        component,
        diagnostics: sink.into_vec(),
    })
}

/// Diff `derived` against `base` under the given loader and options.
pub fn extract(
    derived: &Component,
    base: &Component,
    loader: &dyn Loader,
    options: &EngineOptions,
) -> Result<MergeOutcome> {
    let mut sink = DiagnosticSink::with_capacity(options.diagnostic_capacity);
    let component = {
        let mut ctx = MergeCtx {
            loader,
            sink: &mut sink,
            options,
        };
        Component::extract(derived, base, &mut ctx)?
    };
    Ok(MergeOutcome {
        component,
        diagnostics: sink.into_vec(),
    })
}
