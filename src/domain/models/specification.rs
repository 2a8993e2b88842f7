//! Error-specification request and response payloads.
//!
//! These are the concrete documents exchanged with the analysis service and
//! persisted by the result store. The scheduler itself never looks inside
//! them; typed access happens at the archive and reporting layers.

use serde::{Deserialize, Serialize};

use crate::domain::models::lattice::{ConfidenceVector, SignLatticeElement};

/// Content hash identifying a registered artifact.
///
/// Stable across runs for the same input, and used both as the in-flight
/// tracking key and as the dedup key in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last eight characters, for compact display.
    pub fn short(&self) -> &str {
        let split = self.0.len().saturating_sub(8);
        &self.0[split..]
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An artifact id together with where it was registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub id: ArtifactId,
    /// Source URI the artifact was registered from.
    pub uri: String,
    /// Address of the service that issued the id, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

/// A function as the analysis sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub llvm_name: String,
    pub source_name: String,
}

impl FunctionRef {
    /// For hand-written domain knowledge the two names coincide.
    pub fn from_source_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            llvm_name: name.clone(),
            source_name: name,
        }
    }
}

/// One inferred (or injected) error specification.
///
/// `lattice_element` is advisory: the element the analysis resolved at full
/// confidence. Reporting always re-resolves from `confidence` at the
/// caller's threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub function: FunctionRef,
    pub lattice_element: SignLatticeElement,
    #[serde(default)]
    pub confidence: ConfidenceVector,
}

/// Request sent to the analysis service for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationsRequest {
    pub artifact: ArtifactHandle,
    /// Domain-knowledge specifications applicable to this artifact.
    #[serde(default)]
    pub initial_specifications: Vec<Specification>,
    /// Functions known to only ever return error values.
    #[serde(default)]
    pub error_only: Vec<String>,
    #[serde(default)]
    pub error_codes: Vec<i64>,
    #[serde(default)]
    pub success_codes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    #[serde(default)]
    pub smart_success_code_zero: bool,
}

impl SpecificationsRequest {
    pub fn new(artifact: ArtifactHandle) -> Self {
        Self {
            artifact,
            initial_specifications: Vec::new(),
            error_only: Vec::new(),
            error_codes: Vec::new(),
            success_codes: Vec::new(),
            llm_name: None,
            smart_success_code_zero: false,
        }
    }
}

/// Terminal payload of a specifications operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationsResponse {
    #[serde(default)]
    pub specifications: Vec<Specification>,
}

impl SpecificationsResponse {
    /// Logical collection name records of this type are stored under.
    pub const COLLECTION: &'static str = "specifications";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_id_short_takes_tail() {
        let id = ArtifactId::new("0123456789abcdef");
        assert_eq!(id.short(), "89abcdef");

        let tiny = ArtifactId::new("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn response_deserializes_from_sparse_document() {
        let response: SpecificationsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.specifications.is_empty());
    }

    #[test]
    fn specification_round_trips_through_json() {
        let specification = Specification {
            function: FunctionRef::from_source_name("mbedtls_md_setup"),
            lattice_element: SignLatticeElement::LessThanZero,
            confidence: SignLatticeElement::LessThanZero.canonical_confidence(),
        };
        let encoded = serde_json::to_string(&specification).unwrap();
        let decoded: Specification = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, specification);
    }
}
