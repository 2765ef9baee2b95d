//! # QC Core
//!
//! Batch evaluation of CQL quality checks against a FHIR measure-evaluation server.
//!
//! For each `.cql` file in a directory this crate:
//! - wraps the file in a `Library` and a `Measure` and posts both to the server
//! - calls `$evaluate-measure` (population count or subject list)
//! - adds Laplace noise to the returned count
//! - collects the result in a map keyed by file name
//!
//! Measure evaluation itself happens on the server. **No CLI concerns**: argument parsing and
//! logging setup belong in the `qc-run` binary.

pub mod client;
pub mod config;
pub mod constants;
mod error;
pub mod html;
pub mod logic_file;
pub mod runner;

pub use client::{FhirClient, MeasureService};
pub use config::{ReportType, RunConfig};
pub use error::{ErrorKind, QcError, QcResult};
pub use runner::{BatchOutcome, BatchRunner, FileFailure, ResultRecord, ResultsMap};
