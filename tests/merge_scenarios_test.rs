//! End-to-end merge scenarios over the public crate surface.

use compdef::core::types::{Access, Derivability, Exists, Mode};
use compdef::model::{
    Behavior, CategoryOrigin, Component, DataType, Interface, InterfaceKind, Property, ReturnValue,
    Specified,
};
use compdef::{extract, resolve, EngineOptions, MemoryLoader, NullLoader, QualifiedName, Uid};
use pretty_assertions::assert_eq;

fn qn(name: &str) -> QualifiedName {
    name.parse().unwrap()
}

fn options() -> EngineOptions {
    let _ = env_logger::builder().is_test(true).try_init();
    EngineOptions {
        assign_uids: false,
        ..EngineOptions::default()
    }
}

fn int_behavior(name: &str) -> Behavior {
    Behavior::declared(
        name,
        ReturnValue::resolved(DataType::new("int")).unwrap(),
        vec![],
    )
    .unwrap()
}

fn void_behavior(name: &str) -> Behavior {
    Behavior::declared(
        name,
        ReturnValue::resolved(DataType::void()).unwrap(),
        vec![],
    )
    .unwrap()
}

/// A derivation adding a brand-new child produces one `Insert` child at
/// the base level.
#[test]
fn derivation_adding_a_child_inserts_it() {
    let mut alarm_base = Component::root_definition(&qn("app.AlarmBase")).unwrap();
    alarm_base
        .behaviors
        .insert("ring()", void_behavior("ring"));

    let mut loader = MemoryLoader::new();
    loader.insert_definition(alarm_base);

    let mut root = Component::root_definition(&qn("app.Root")).unwrap();
    root.categories
        .insert("app.AlarmBase", CategoryOrigin::DeclaredHere);

    let mut delta = Component::derivation(&qn("app.MyRoot"), &qn("app.Root")).unwrap();
    let alarm = Component::derivation(&qn("Alarm"), &qn("app.AlarmBase")).unwrap();
    delta.children.insert("Alarm", alarm);

    let outcome = resolve(&root, &delta, &loader, &options()).unwrap();
    assert!(outcome.diagnostics.is_empty());

    let alarm = outcome.component.children.get("Alarm").unwrap();
    assert_eq!(alarm.flags.exists, Exists::Insert);
    assert!(alarm.base_level);
    assert_eq!(alarm.super_name.as_deref(), Some("app.AlarmBase"));
    assert!(alarm.behaviors.contains_key("ring()"));
}

/// Once a behavior is final, later levels cannot alter its flags.
#[test]
fn finality_is_monotonic_across_levels() {
    let mut base = Component::root_definition(&qn("app.Button")).unwrap();
    base.behaviors.insert("fire()", void_behavior("fire"));

    // first modification pins fire() final
    let mut pin_final = Component::modification(&qn("app.Button")).unwrap();
    let mut fire_delta = base
        .behaviors
        .get("fire()")
        .unwrap()
        .null_delta(Mode::Modification)
        .unwrap();
    fire_delta.flags.derivability = Derivability::Final;
    fire_delta.flags.specify(Specified::DERIVE);
    pin_final.behaviors.insert("fire()", fire_delta);

    let level_one = resolve(&base, &pin_final, &NullLoader, &options())
        .unwrap()
        .component;
    assert_eq!(
        level_one.behaviors.get("fire()").unwrap().flags.derivability,
        Derivability::Final
    );

    // second modification tries to degrade access; the final base wins
    let mut degrade = Component::modification(&qn("app.Button")).unwrap();
    let mut fire_delta = level_one
        .behaviors
        .get("fire()")
        .unwrap()
        .null_delta(Mode::Modification)
        .unwrap();
    fire_delta.flags.access = Access::Private;
    fire_delta.flags.specify(Specified::ACCESS);
    degrade.behaviors.insert("fire()", fire_delta);

    let level_two = resolve(&level_one, &degrade, &NullLoader, &options())
        .unwrap()
        .component;
    let fire = level_two.behaviors.get("fire()").unwrap();
    assert_eq!(fire.flags.access, Access::Public);
    assert_eq!(fire.flags.derivability, Derivability::Final);
}

/// Expanding `implements` manufactures the interface's behaviors;
/// removing the interface afterwards removes them unless another origin
/// keeps them alive.
#[test]
fn interface_expansion_and_removal() {
    let mut shape = Component::signature(&qn("pkg.Runnable")).unwrap();
    shape.behaviors.insert("run()", void_behavior("run"));
    let mut loader = MemoryLoader::new();
    loader.insert_signature(shape);

    let base = Component::root_definition(&qn("app.Task")).unwrap();
    let mut delta = Component::derivation(&qn("app.TimerTask"), &qn("app.Task")).unwrap();
    delta.implements.insert(
        "pkg.Runnable",
        Interface::declared("pkg.Runnable", InterfaceKind::Implements).unwrap(),
    );

    let mut derived = resolve(&base, &delta, &loader, &options()).unwrap().component;
    let run = derived.behaviors.get("run()").unwrap();
    assert_eq!(run.flags.exists, Exists::Insert);
    assert!(run.data.origin.has_trait("implements pkg.Runnable"));

    // sole origin: removing the interface removes the behavior
    let mut sole = derived.clone();
    sole.remove_interface("pkg.Runnable").unwrap();
    assert!(!sole.behaviors.contains_key("run()"));

    // a manual origin keeps the behavior alive
    derived
        .behaviors
        .get_mut("run()")
        .unwrap()
        .data
        .origin
        .manual = true;
    derived.remove_interface("pkg.Runnable").unwrap();
    let run = derived.behaviors.get("run()").unwrap();
    assert!(!run.data.origin.has_trait("implements pkg.Runnable"));
}

/// Composing two modification deltas and resolving the result matches
/// resolving them level by level. An access degrade specified at the
/// second level must not be judged against the first delta's default
/// values.
#[test]
fn composed_deltas_match_sequential_resolution() {
    let mut base = Component::root_definition(&qn("app.Device")).unwrap();
    let mut set_mode = void_behavior("setMode");
    set_mode.flags.access = Access::Protected;
    base.behaviors.insert("setMode()", set_mode);

    let behavior_delta = |access: Option<Access>| {
        let mut delta = base
            .behaviors
            .get("setMode()")
            .unwrap()
            .null_delta(Mode::Modification)
            .unwrap();
        if let Some(access) = access {
            delta.flags.access = access;
            delta.flags.specify(Specified::ACCESS);
        }
        delta
    };

    let mut first = Component::modification(&qn("app.Device")).unwrap();
    first.behaviors.insert("setMode()", behavior_delta(None));
    let mut second = Component::modification(&qn("app.Device")).unwrap();
    second
        .behaviors
        .insert("setMode()", behavior_delta(Some(Access::Private)));

    let step_one = resolve(&base, &first, &NullLoader, &options())
        .unwrap()
        .component;
    let sequential = resolve(&step_one, &second, &NullLoader, &options())
        .unwrap()
        .component;

    let combined = resolve(&first, &second, &NullLoader, &options())
        .unwrap()
        .component;
    let merged = resolve(&base, &combined, &NullLoader, &options())
        .unwrap()
        .component;

    let sequential = sequential.behaviors.get("setMode()").unwrap();
    let merged = merged.behaviors.get("setMode()").unwrap();
    assert_eq!(merged.flags.access, sequential.flags.access);
    // the degrade is rejected against the protected base on either path
    assert_eq!(merged.flags.access, Access::Protected);
}

/// A child deleted or reserved at the base level leaves no delta entry at
/// all, not a spurious delete.
#[test]
fn reserved_base_child_extracts_to_nothing() {
    let mut base = Component::root_definition(&qn("app.Panel")).unwrap();
    let mut ghost = Component::root_definition(&qn("Ghost")).unwrap();
    ghost.flags.exists = Exists::Not;
    base.children.insert("Ghost", ghost);

    let derived = Component::root_definition(&qn("app.Panel")).unwrap();

    let outcome = extract(&derived, &base, &NullLoader, &options()).unwrap();
    assert!(outcome.component.children.is_empty());
    assert!(outcome.component.is_discardable());
}

/// Renaming a member at a derived level extracts to a single delta entry
/// matched by UID, not a delete plus an insert.
#[test]
fn uid_keeps_a_renamed_member_matched() {
    let uid = Uid::generate();
    let mut base = Component::root_definition(&qn("util.Cache")).unwrap();
    let mut get_size = int_behavior("getSize");
    get_size.data.uid = Some(uid);
    base.behaviors.insert("getSize()", get_size);

    let mut derived = Component::root_definition(&qn("util.Cache")).unwrap();
    let mut renamed = int_behavior("getEntryCount");
    renamed.data.uid = Some(uid);
    derived.behaviors.insert("getEntryCount()", renamed);

    let delta = extract(&derived, &base, &NullLoader, &options())
        .unwrap()
        .component;
    assert_eq!(delta.behaviors.len(), 1);
    let entry = delta.behaviors.get("getEntryCount()").unwrap();
    assert_eq!(entry.data.uid, Some(uid));
    assert_ne!(entry.flags.exists, Exists::Delete);

    // resolving the delta back reproduces the rename
    let resolved = resolve(&base, &delta, &NullLoader, &options())
        .unwrap()
        .component;
    assert!(resolved.behaviors.contains_key("getEntryCount()"));
    assert!(!resolved.behaviors.contains_key("getSize()"));
}

/// Definition member tables fold case; signature member tables do not.
#[test]
fn case_rules_differ_between_definitions_and_signatures() {
    let mut definition = Component::root_definition(&qn("app.Widget")).unwrap();
    definition
        .properties
        .insert("color", Property::declared("color", DataType::new("String")).unwrap());
    assert!(definition.properties.contains_key("Color"));
    definition
        .properties
        .insert("Color", Property::declared("Color", DataType::new("String")).unwrap());
    assert_eq!(definition.properties.len(), 1);

    let mut signature = Component::signature(&qn("pkg.Widget")).unwrap();
    signature
        .properties
        .insert("color", Property::declared("color", DataType::new("String")).unwrap());
    signature
        .properties
        .insert("Color", Property::declared("Color", DataType::new("String")).unwrap());
    assert_eq!(signature.properties.len(), 2);
}

/// Documentation merges across levels with replace-or-append semantics.
#[test]
fn descriptions_append_and_replace_across_levels() {
    let mut base = Component::root_definition(&qn("app.Widget")).unwrap();
    base.data.text = "A basic widget.".to_string();

    let mut append = Component::modification(&qn("app.Widget")).unwrap();
    append.data.text = "Now with bells.".to_string();
    let appended = resolve(&base, &append, &NullLoader, &options())
        .unwrap()
        .component;
    assert_eq!(appended.data.description(), "A basic widget.\nNow with bells.");

    let mut replace = Component::modification(&qn("app.Widget")).unwrap();
    replace.data.text = "Rewritten.".to_string();
    replace.data.replace_text = true;
    let replaced = resolve(&base, &replace, &NullLoader, &options())
        .unwrap()
        .component;
    assert_eq!(replaced.data.description(), "Rewritten.");
}
