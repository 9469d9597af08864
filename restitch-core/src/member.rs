//! Member vocabulary for generated type augmentation.
//!
//! These are the language-neutral shapes a generator can contribute to a
//! target type. Each spec reduces to a [`MemberSignature`], the unit of
//! collision detection: two members collide exactly when their signatures
//! are equal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// MEMBER SPECS
// ============================================================================

/// A generated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    /// Target-language modifiers, already rendered (e.g. `private`).
    pub modifiers: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Vec<String>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature::Field {
            name: self.name.clone(),
        }
    }
}

/// A generated method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub param_types: Vec<String>,
    pub return_type: String,
    pub modifiers: Vec<String>,
    /// Rendered body, opaque to the engine.
    pub body: String,
}

impl MethodSpec {
    pub fn new(
        name: impl Into<String>,
        param_types: Vec<String>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_types,
            return_type: return_type.into(),
            modifiers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature::Method {
            name: self.name.clone(),
            param_types: self.param_types.clone(),
        }
    }
}

/// A generated constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorSpec {
    pub param_types: Vec<String>,
    pub body: String,
}

impl ConstructorSpec {
    pub fn new(param_types: Vec<String>) -> Self {
        Self {
            param_types,
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature::Constructor {
            param_types: self.param_types.clone(),
        }
    }
}

/// A generated type-level annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSpec {
    pub name: String,
    /// Rendered argument list, empty for marker annotations.
    pub arguments: Vec<String>,
}

impl AnnotationSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<String>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature::Annotation {
            name: self.name.clone(),
        }
    }
}

/// A generated supertype reference (extends/implements).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupertypeRef {
    pub type_name: String,
}

impl SupertypeRef {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }

    pub fn signature(&self) -> MemberSignature {
        MemberSignature::Supertype {
            type_name: self.type_name.clone(),
        }
    }
}

// ============================================================================
// SIGNATURES
// ============================================================================

/// The collision key of one member.
///
/// Fields and annotations collide by name, methods by name plus parameter
/// types, constructors by parameter types, supertypes by type name. Return
/// types and bodies never participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemberSignature {
    Field { name: String },
    Method { name: String, param_types: Vec<String> },
    Constructor { param_types: Vec<String> },
    Annotation { name: String },
    Supertype { type_name: String },
}

impl fmt::Display for MemberSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberSignature::Field { name } => write!(f, "field {}", name),
            MemberSignature::Method { name, param_types } => {
                write!(f, "method {}({})", name, param_types.join(", "))
            }
            MemberSignature::Constructor { param_types } => {
                write!(f, "constructor ({})", param_types.join(", "))
            }
            MemberSignature::Annotation { name } => write!(f, "annotation {}", name),
            MemberSignature::Supertype { type_name } => write!(f, "supertype {}", type_name),
        }
    }
}

// ============================================================================
// TARGET TYPE
// ============================================================================

/// The augmentation target: a user-authored type plus the signatures it
/// declares directly in source. A hand-authored member always wins over a
/// generated one, so the builder consults this set before accepting a
/// contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetType {
    qualified_name: String,
    declared: BTreeSet<MemberSignature>,
}

impl TargetType {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            declared: BTreeSet::new(),
        }
    }

    /// Record a signature declared directly on the type in user source.
    pub fn with_declared(mut self, signature: MemberSignature) -> Self {
        self.declared.insert(signature);
        self
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Whether the type itself declares this signature.
    pub fn declares(&self, signature: &MemberSignature) -> bool {
        self.declared.contains(signature)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_signature_ignores_return_type_and_body() {
        let a = MethodSpec::new("save", vec!["Order".to_string()], "void").with_body("this.x=1;");
        let b = MethodSpec::new("save", vec!["Order".to_string()], "Order").with_body("return o;");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_method_signature_distinguishes_param_types() {
        let a = MethodSpec::new("save", vec!["Order".to_string()], "void");
        let b = MethodSpec::new("save", vec!["Customer".to_string()], "void");
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn test_field_signature_ignores_type() {
        let a = FieldSpec::new("id", "long");
        let b = FieldSpec::new("id", "String");
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn test_target_type_declares() {
        let target = TargetType::new("com.acme.Order")
            .with_declared(MemberSignature::Field { name: "id".to_string() });
        assert!(target.declares(&FieldSpec::new("id", "long").signature()));
        assert!(!target.declares(&FieldSpec::new("version", "int").signature()));
    }

    #[test]
    fn test_signature_display() {
        let sig = MethodSpec::new("save", vec!["Order".to_string(), "boolean".to_string()], "void")
            .signature();
        assert_eq!(sig.to_string(), "method save(Order, boolean)");
    }
}
