//! FHIR wire/boundary support for measure evaluation.
//!
//! This crate provides the **wire models** exchanged with a FHIR measure-evaluation server:
//! - `Library` resources carrying base64-encoded CQL (the logic container)
//! - `Measure` resources pointing at a library by its canonical `urn:uuid:` URL
//! - `MeasureReport`, `Parameters` and `List` documents used by `$evaluate-measure`
//!
//! This crate focuses on:
//! - building request documents in the exact shape the server expects
//! - typed parsing of responses, with explicit `Option`s where fields may be absent
//!
//! No transport lives here; HTTP is the concern of `qc-core`.

pub mod data_types;
pub mod library;
pub mod measure;
pub mod report;
pub mod urn;

// Re-export facades
pub use library::Library;
pub use measure::{Measure, INITIAL_POPULATION_EXPRESSION};
pub use report::{
    ListResource, MeasureReport, Parameters, EVALUATION_PERIOD_END, EVALUATION_PERIOD_START,
};
pub use urn::UrnUuid;

use serde::de::DeserializeOwned;
use std::fmt;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Resource types this tool creates on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Logic container holding the CQL source.
    Library,
    /// Measure definition referencing a library.
    Measure,
}

impl ResourceKind {
    /// Resource type name as used in `resourceType` and in REST paths.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Library => "Library",
            ResourceKind::Measure => "Measure",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserializes a JSON document into a wire model, reporting the failing field path.
///
/// The path (e.g. `group.0.population.0.count`) is included in the
/// [`FhirError::Translation`] message so a malformed server response can be located.
pub(crate) fn from_json_value<T: DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> FhirResult<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let path = if path.is_empty() || path == "." {
            "<root>"
        } else {
            path.as_str()
        };
        FhirError::Translation(format!("{what} schema mismatch at {path}: {source}"))
    })
}
