//! Contribution units: collision-checked bundles of generated members.
//!
//! Many independent generators may contribute to one target type's
//! augmentation in non-deterministic relative order. The builder makes a
//! silent collision impossible rather than merely unlikely: every add is
//! checked against the target's own declared signatures (hand-authored
//! members always win) and against everything already added to the unit.

use crate::error::ContributionError;
use crate::member::{
    AnnotationSpec, ConstructorSpec, FieldSpec, MemberSignature, MethodSpec, SupertypeRef,
    TargetType,
};
use crate::{compute_content_hash, ContentHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Immutable bundle of generated members for one target type.
///
/// Value-comparable: the same inputs build a structurally equal unit, which
/// lets the materializer skip a write when regenerated content is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionUnit {
    target_type: String,
    producer_id: String,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    constructors: Vec<ConstructorSpec>,
    annotations: Vec<AnnotationSpec>,
    supertypes: Vec<SupertypeRef>,
}

impl ContributionUnit {
    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn constructors(&self) -> &[ConstructorSpec] {
        &self.constructors
    }

    pub fn annotations(&self) -> &[AnnotationSpec] {
        &self.annotations
    }

    pub fn supertypes(&self) -> &[SupertypeRef] {
        &self.supertypes
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.methods.is_empty()
            && self.constructors.is_empty()
            && self.annotations.is_empty()
            && self.supertypes.is_empty()
    }

    /// Hex SHA-256 over the canonical JSON serialization.
    ///
    /// Serialization of this struct is deterministic (fixed field order,
    /// insertion-ordered vectors), so equal units hash equally.
    pub fn content_hash(&self) -> ContentHash {
        let canonical =
            serde_json::to_vec(self).expect("contribution unit serialization cannot fail");
        compute_content_hash(&canonical)
    }
}

/// Builder for one `(target, producer)` generation pass.
#[derive(Debug)]
pub struct ContributionUnitBuilder {
    target: TargetType,
    producer_id: String,
    seen: BTreeSet<MemberSignature>,
    fields: Vec<FieldSpec>,
    methods: Vec<MethodSpec>,
    constructors: Vec<ConstructorSpec>,
    annotations: Vec<AnnotationSpec>,
    supertypes: Vec<SupertypeRef>,
}

impl ContributionUnitBuilder {
    pub fn new(target: TargetType, producer_id: impl Into<String>) -> Self {
        Self {
            target,
            producer_id: producer_id.into(),
            seen: BTreeSet::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            annotations: Vec::new(),
            supertypes: Vec::new(),
        }
    }

    fn check(&mut self, signature: MemberSignature) -> Result<(), ContributionError> {
        if self.target.declares(&signature) {
            return Err(ContributionError::DuplicateMember {
                target: self.target.qualified_name().to_string(),
                signature,
            });
        }
        if !self.seen.insert(signature.clone()) {
            // Two generators contributed the same member in one pass.
            if let MemberSignature::Supertype { type_name } = signature {
                return Err(ContributionError::DuplicateSupertype {
                    target: self.target.qualified_name().to_string(),
                    supertype: type_name,
                });
            }
            return Err(ContributionError::DuplicateMember {
                target: self.target.qualified_name().to_string(),
                signature,
            });
        }
        Ok(())
    }

    pub fn add_field(&mut self, field: FieldSpec) -> Result<&mut Self, ContributionError> {
        self.check(field.signature())?;
        self.fields.push(field);
        Ok(self)
    }

    pub fn add_method(&mut self, method: MethodSpec) -> Result<&mut Self, ContributionError> {
        self.check(method.signature())?;
        self.methods.push(method);
        Ok(self)
    }

    pub fn add_constructor(
        &mut self,
        constructor: ConstructorSpec,
    ) -> Result<&mut Self, ContributionError> {
        self.check(constructor.signature())?;
        self.constructors.push(constructor);
        Ok(self)
    }

    pub fn add_annotation(
        &mut self,
        annotation: AnnotationSpec,
    ) -> Result<&mut Self, ContributionError> {
        self.check(annotation.signature())?;
        self.annotations.push(annotation);
        Ok(self)
    }

    pub fn add_supertype(
        &mut self,
        supertype: SupertypeRef,
    ) -> Result<&mut Self, ContributionError> {
        self.check(supertype.signature())?;
        self.supertypes.push(supertype);
        Ok(self)
    }

    /// Finish the pass and freeze the unit.
    pub fn build(self) -> ContributionUnit {
        ContributionUnit {
            target_type: self.target.qualified_name().to_string(),
            producer_id: self.producer_id,
            fields: self.fields,
            methods: self.methods,
            constructors: self.constructors,
            annotations: self.annotations,
            supertypes: self.supertypes,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
