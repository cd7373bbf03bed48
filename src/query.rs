//! Read surface over a resolved component tree.

use serde::{Deserialize, Serialize};

use crate::core::types::{Derivability, Exists, Mode};
use crate::model::{Behavior, Component, Property};

/// Behaviors visible on the component, reserved names excluded.
pub fn behaviors(component: &Component) -> impl Iterator<Item = &Behavior> {
    component
        .behaviors
        .values()
        .filter(|b| b.flags.exists != Exists::Not)
}

/// Properties visible on the component, reserved names excluded.
pub fn properties(component: &Component) -> impl Iterator<Item = &Property> {
    component
        .properties
        .values()
        .filter(|p| p.flags.exists != Exists::Not)
}

/// Children visible on the component, reserved names excluded.
pub fn children(component: &Component) -> impl Iterator<Item = &Component> {
    component
        .children
        .values()
        .filter(|c| c.flags.exists != Exists::Not)
}

/// Whether further levels may derive from this component.
pub fn is_derivable(component: &Component) -> bool {
    component.data.mode == Mode::Resolved
        && component.flags.derivability == Derivability::Derivable
}

/// Whether this level contributes anything class generation would emit:
/// a locally added or overridden member, an implementation unit, or a new
/// interface.
pub fn has_generation_delta(component: &Component) -> bool {
    let local_behavior = component.behaviors.values().any(|b| {
        b.flags.exists == Exists::Insert
            || !b.local_units().is_empty()
            || b.data.origin.is_declared_at_this_level() && b.data.origin.manual
    });
    let local_property = component
        .properties
        .values()
        .any(|p| p.flags.exists == Exists::Insert);
    local_behavior
        || local_property
        || component.implements.values().any(|i| i.exists == Exists::Insert)
        || component.dispatches.values().any(|i| i.exists == Exists::Insert)
}

/// One entry of the compile plan: a component or child, its effective
/// super, and whether it needs a generated class of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilePlanEntry {
    /// Dotted path from the root, e.g. `util.Cache.Entry`.
    pub path: String,
    pub super_name: Option<String>,
    pub needs_class: bool,
}

/// Walk the resolved tree and plan class generation for every component.
pub fn compile_plan(root: &Component) -> Vec<CompilePlanEntry> {
    let mut plan = Vec::new();
    walk_plan(root, root.name.clone(), &mut plan);
    plan
}

fn walk_plan(component: &Component, path: String, plan: &mut Vec<CompilePlanEntry>) {
    plan.push(CompilePlanEntry {
        path: path.clone(),
        super_name: component.super_name.clone(),
        needs_class: has_generation_delta(component),
    });
    for child in children(component) {
        walk_plan(child, format!("{path}.{}", child.name), plan);
    }
}
