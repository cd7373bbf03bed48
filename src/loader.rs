//! Read-only access to stored definitions and reflected signatures.
//!
//! Resolution pulls in super definitions, interface signatures, and
//! aggregation categories through this capability. Absence of a name is
//! recoverable; the caller decides whether to log and discard or fault.

use std::collections::HashMap;

use crate::identity::QualifiedName;
use crate::model::Component;

/// Source of resolved definitions and signatures, keyed by global name.
pub trait Loader {
    /// A resolved component definition, or `None` if the name is unknown.
    fn load_definition(&self, name: &QualifiedName) -> Option<Component>;

    /// A resolved reflected signature, or `None` if the name is unknown.
    fn load_signature(&self, name: &QualifiedName) -> Option<Component>;
}

/// Loader that knows nothing. Useful for self-contained merges and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLoader;

impl Loader for NullLoader {
    fn load_definition(&self, _name: &QualifiedName) -> Option<Component> {
        None
    }

    fn load_signature(&self, _name: &QualifiedName) -> Option<Component> {
        None
    }
}

/// In-memory loader backed by name-keyed maps.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    definitions: HashMap<String, Component>,
    signatures: HashMap<String, Component>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolved definition under its own global name.
    pub fn insert_definition(&mut self, component: Component) {
        self.definitions.insert(component.name.clone(), component);
    }

    /// Registers a resolved signature under its own global name.
    pub fn insert_signature(&mut self, component: Component) {
        self.signatures.insert(component.name.clone(), component);
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }
}

impl Loader for MemoryLoader {
    fn load_definition(&self, name: &QualifiedName) -> Option<Component> {
        self.definitions.get(name.as_str()).cloned()
    }

    fn load_signature(&self, name: &QualifiedName) -> Option<Component> {
        self.signatures.get(name.as_str()).cloned()
    }
}
