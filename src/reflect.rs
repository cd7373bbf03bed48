//! Reflection contract for foreign class/interface shapes.
//!
//! A [`ClassSource`] supplies the member list of one externally named type.
//! It is consumed only when constructing a `Signature` component; resolve
//! and extract never touch it.

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::types::{Access, Antiquity, Derivability, Direction, Exists, Scope};
use crate::identity::QualifiedName;
use crate::model::{Behavior, Component, DataType, Parameter, Property, ReturnValue, Throwee};

/// One reflected method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
    pub exception_types: Vec<String>,
    pub access: Access,
    pub is_static: bool,
    pub is_final: bool,
    pub is_deprecated: bool,
}

/// One reflected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub data_type: String,
    pub access: Access,
    pub is_static: bool,
    pub is_final: bool,
    pub is_deprecated: bool,
}

/// The reflected shape of one foreign type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub super_name: Option<String>,
    pub is_interface: bool,
    pub is_throwable: bool,
    pub is_final: bool,
    pub is_deprecated: bool,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
}

/// Supplies reflected shapes by global name.
pub trait ClassSource {
    fn class_info(&self, name: &QualifiedName) -> Option<ClassInfo>;
}

/// Build a resolved `Signature` component from a reflected shape.
///
/// Member tables of the result are case-sensitive, matching the foreign
/// type system's own rules.
pub fn signature_from_class(info: &ClassInfo) -> Result<Component> {
    let name: QualifiedName = info.name.parse().map_err(|_| {
        crate::core::errors::Error::malformed_name(&info.name, "invalid reflected class name")
    })?;

    let mut signature = Component::signature(&name)?;
    signature.super_name = info.super_name.clone();
    if info.is_final {
        signature.flags.derivability = Derivability::Final;
    }
    if info.is_deprecated {
        signature.flags.antiquity = Antiquity::Deprecated;
    }

    for method in &info.methods {
        let parameters = method
            .parameter_types
            .iter()
            .enumerate()
            .map(|(i, t)| Parameter::resolved(format!("param{i}"), DataType::new(t), Direction::In))
            .collect::<Result<Vec<_>>>()?;
        let mut behavior = Behavior::declared(
            method.name.clone(),
            ReturnValue::resolved(DataType::new(&method.return_type))?,
            parameters,
        )?;
        behavior.flags.access = method.access;
        behavior.flags.scope = if method.is_static {
            Scope::Static
        } else {
            Scope::Instance
        };
        if method.is_final {
            behavior.flags.derivability = Derivability::Final;
        }
        if method.is_deprecated {
            behavior.flags.antiquity = Antiquity::Deprecated;
        }
        for exception in &method.exception_types {
            behavior
                .exceptions
                .insert(exception.clone(), Throwee::declared(DataType::new(exception))?);
        }
        signature
            .behaviors
            .insert(behavior.signature().to_string(), behavior);
    }

    for field in &info.fields {
        let mut property = Property::declared(field.name.clone(), DataType::new(&field.data_type))?;
        property.flags.access = field.access;
        property.flags.scope = if field.is_static {
            Scope::Static
        } else {
            Scope::Instance
        };
        if field.is_final {
            property.flags.derivability = Derivability::Final;
        }
        property.flags.exists = Exists::Insert;
        signature.properties.insert(property.name.clone(), property);
    }

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentKind;

    fn runnable() -> ClassInfo {
        ClassInfo {
            name: "pkg.Runnable".to_string(),
            super_name: None,
            is_interface: true,
            is_throwable: false,
            is_final: false,
            is_deprecated: false,
            methods: vec![MethodInfo {
                name: "run".to_string(),
                return_type: "void".to_string(),
                parameter_types: vec![],
                exception_types: vec!["lang.InterruptedException".to_string()],
                access: Access::Public,
                is_static: false,
                is_final: false,
                is_deprecated: false,
            }],
            fields: vec![],
        }
    }

    #[test]
    fn reflected_methods_become_signature_behaviors() {
        let signature = signature_from_class(&runnable()).unwrap();
        assert_eq!(signature.kind, ComponentKind::Signature);
        let run = signature.behaviors.get("run()").unwrap();
        assert_eq!(run.return_value.data_type(), Some(&DataType::void()));
        assert!(run.exceptions.contains_key("lang.InterruptedException"));
    }

    #[test]
    fn signature_member_tables_are_case_sensitive() {
        let mut info = runnable();
        info.methods.push(MethodInfo {
            name: "Run".to_string(),
            return_type: "void".to_string(),
            parameter_types: vec![],
            exception_types: vec![],
            access: Access::Public,
            is_static: false,
            is_final: false,
            is_deprecated: false,
        });
        let signature = signature_from_class(&info).unwrap();
        assert_eq!(signature.behaviors.len(), 2);
        assert!(signature.behaviors.contains_key("run()"));
        assert!(signature.behaviors.contains_key("Run()"));
    }
}
