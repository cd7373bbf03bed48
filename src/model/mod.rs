//! The component data model and the resolve/extract algebra.

pub mod base;
pub mod behavior;
pub mod component;
pub mod flags;
pub mod integration;
pub mod interface;
pub mod matching;
pub mod origin;
pub mod parameter;
pub mod property;

use crate::config::EngineOptions;
use crate::diagnostics::DiagnosticSink;
use crate::loader::Loader;

/// Read-only collaborators and the diagnostic sink threaded through one
/// resolve or extract call.
pub struct MergeCtx<'a> {
    pub loader: &'a dyn Loader,
    pub sink: &'a mut DiagnosticSink,
    pub options: &'a EngineOptions,
}

pub use base::TraitData;
pub use behavior::{Behavior, ImplementationUnit, Throwee};
pub use component::{CategoryOrigin, Component, ComponentKind};
pub use flags::{FlagPolicy, Flags, Specified};
pub use integration::Integration;
pub use interface::{Interface, InterfaceKind};
pub use origin::{Origin, OriginLevel};
pub use parameter::{DataType, Parameter, ReturnValue};
pub use property::{Property, PropertyValue};
