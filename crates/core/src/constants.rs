//! Constants used throughout the qc core crate.
//!
//! Defaults for the command line live here too, so the binary and the tests agree on them.

/// File extension of logic files picked up from the input directory.
pub const LOGIC_FILE_EXTENSION: &str = "cql";

/// Subject type evaluated over when none is given.
pub const DEFAULT_SUBJECT_TYPE: &str = "Patient";

/// Per-file epsilon when none is given.
pub const DEFAULT_EPSILON: f64 = 1.0;

/// Denominator for the percentages in the HTML report.
pub const DEFAULT_TOTAL_SUBJECTS: u64 = 1000;

/// Content type for FHIR JSON request bodies.
pub const FHIR_JSON_CONTENT_TYPE: &str = "application/fhir+json";

/// Longest error response body kept in a [`crate::QcError::Status`].
pub const MAX_ERROR_BODY_CHARS: usize = 512;
