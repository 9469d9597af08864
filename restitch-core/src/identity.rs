//! Identifier scheme for computed artifacts.
//!
//! Every computed artifact is named by an [`Identifier`]: a producer kind
//! plus an instance key, or the class-level wildcard form. The wildcard lets
//! a provider subscribe to "notify me the first time any instance of
//! producer P appears" - needed because some target instances are discovered
//! only at resolution time, not at registration time.

use crate::error::IdentifierError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between kind and key in the canonical text form.
const SEPARATOR: char = ':';

/// Key text reserved for the class-level wildcard.
const WILDCARD_KEY: &str = "*";

fn validate_token(token: &str) -> Result<(), String> {
    if token.contains(SEPARATOR) {
        return Err(format!("must not contain '{}'", SEPARATOR));
    }
    if token.chars().any(char::is_whitespace) {
        return Err("must not contain whitespace".to_string());
    }
    if !token.is_ascii() {
        return Err("must be ASCII".to_string());
    }
    Ok(())
}

// ============================================================================
// PRODUCER KIND
// ============================================================================

/// The kind of producer that computes an artifact, e.g. `entity` or `svc`.
///
/// A validated token: non-empty, ASCII, no whitespace, no `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProducerKind(String);

impl ProducerKind {
    /// Create a validated producer kind.
    pub fn new(kind: impl Into<String>) -> Result<Self, IdentifierError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(IdentifierError::EmptyKind);
        }
        if kind == WILDCARD_KEY {
            return Err(IdentifierError::InvalidKind {
                kind,
                reason: "reserved for the wildcard key".to_string(),
            });
        }
        validate_token(&kind).map_err(|reason| IdentifierError::InvalidKind {
            kind: kind.clone(),
            reason,
        })?;
        Ok(ProducerKind(kind))
    }

    /// The raw kind token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProducerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// IDENTIFIER
// ============================================================================

/// Opaque, parseable name of one computed artifact.
///
/// `Instance` names a concrete artifact; `AnyInstance` is the class-level
/// wildcard matching every instance of one producer kind. Equality is
/// structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identifier {
    /// A concrete artifact: `kind:key`.
    Instance { kind: ProducerKind, key: String },
    /// The class-level wildcard: `kind:*`.
    AnyInstance { kind: ProducerKind },
}

impl Identifier {
    /// Create an instance-level identifier.
    pub fn instance(
        kind: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<Self, IdentifierError> {
        let kind = ProducerKind::new(kind)?;
        let key = key.into();
        if key.is_empty() {
            return Err(IdentifierError::EmptyKey);
        }
        if key == WILDCARD_KEY {
            return Err(IdentifierError::InvalidKey {
                key,
                reason: "reserved for the wildcard form".to_string(),
            });
        }
        validate_token(&key).map_err(|reason| IdentifierError::InvalidKey {
            key: key.clone(),
            reason,
        })?;
        Ok(Identifier::Instance { kind, key })
    }

    /// Create a class-level wildcard identifier.
    pub fn any_instance(kind: impl Into<String>) -> Result<Self, IdentifierError> {
        Ok(Identifier::AnyInstance {
            kind: ProducerKind::new(kind)?,
        })
    }

    /// Parse the canonical text form `kind:key` or `kind:*`.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let (kind, key) = input
            .split_once(SEPARATOR)
            .ok_or_else(|| IdentifierError::Malformed {
                input: input.to_string(),
            })?;
        if key == WILDCARD_KEY {
            Identifier::any_instance(kind)
        } else {
            Identifier::instance(kind, key)
        }
    }

    /// The producer kind this identifier belongs to.
    pub fn producer_kind(&self) -> &ProducerKind {
        match self {
            Identifier::Instance { kind, .. } => kind,
            Identifier::AnyInstance { kind } => kind,
        }
    }

    /// The instance key, absent for the wildcard form.
    pub fn instance_key(&self) -> Option<&str> {
        match self {
            Identifier::Instance { key, .. } => Some(key),
            Identifier::AnyInstance { .. } => None,
        }
    }

    /// Whether this is an instance-level identifier.
    pub fn is_instance(&self) -> bool {
        matches!(self, Identifier::Instance { .. })
    }

    /// Whether this is the class-level wildcard form.
    pub fn is_class_level(&self) -> bool {
        matches!(self, Identifier::AnyInstance { .. })
    }

    /// The wildcard identifier covering this identifier's kind.
    pub fn class_level(&self) -> Identifier {
        Identifier::AnyInstance {
            kind: self.producer_kind().clone(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Instance { kind, key } => write!(f, "{}{}{}", kind, SEPARATOR, key),
            Identifier::AnyInstance { kind } => write!(f, "{}{}{}", kind, SEPARATOR, WILDCARD_KEY),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_instance_round_trip() {
        let id = Identifier::instance("entity", "Order").unwrap();
        assert_eq!(id.to_string(), "entity:Order");
        assert_eq!(Identifier::parse("entity:Order").unwrap(), id);
        assert!(id.is_instance());
        assert!(!id.is_class_level());
        assert_eq!(id.instance_key(), Some("Order"));
        assert_eq!(id.producer_kind().as_str(), "entity");
    }

    #[test]
    fn test_wildcard_round_trip() {
        let id = Identifier::any_instance("svc").unwrap();
        assert_eq!(id.to_string(), "svc:*");
        assert_eq!(Identifier::parse("svc:*").unwrap(), id);
        assert!(id.is_class_level());
        assert_eq!(id.instance_key(), None);
    }

    #[test]
    fn test_class_level_of_instance() {
        let id = Identifier::instance("svc", "Order").unwrap();
        assert_eq!(id.class_level(), Identifier::any_instance("svc").unwrap());
    }

    #[test]
    fn test_empty_kind_rejected() {
        assert_eq!(
            Identifier::instance("", "Order").unwrap_err(),
            IdentifierError::EmptyKind
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(
            Identifier::instance("entity", "").unwrap_err(),
            IdentifierError::EmptyKey
        );
    }

    #[test]
    fn test_whitespace_kind_rejected() {
        assert!(matches!(
            Identifier::instance("en tity", "Order"),
            Err(IdentifierError::InvalidKind { .. })
        ));
    }

    #[test]
    fn test_separator_in_key_rejected() {
        // The raw constructor sees the colon as an invalid key character.
        assert!(matches!(
            Identifier::instance("entity", "Order:x"),
            Err(IdentifierError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_parse_without_separator_rejected() {
        assert!(matches!(
            Identifier::parse("entityOrder"),
            Err(IdentifierError::Malformed { .. })
        ));
    }

    #[test]
    fn test_structural_equality() {
        let a = Identifier::instance("entity", "Order").unwrap();
        let b = Identifier::instance("entity", "Order").unwrap();
        let c = Identifier::instance("entity", "Customer").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    proptest! {
        #[test]
        fn prop_parse_display_round_trip(
            kind in "[a-z][a-z0-9_-]{0,15}",
            key in "[A-Za-z][A-Za-z0-9_.]{0,23}",
        ) {
            let id = Identifier::instance(kind, key).unwrap();
            prop_assert_eq!(Identifier::parse(&id.to_string()).unwrap(), id);
        }
    }
}
