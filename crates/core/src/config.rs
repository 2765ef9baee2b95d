//! Run configuration.
//!
//! Everything a batch run needs is resolved and validated once, before the first request is
//! sent. Invalid parameters therefore abort the whole run without touching the server.

use crate::{QcError, QcResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Which `$evaluate-measure` variant to request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportType {
    /// Aggregate count only.
    #[default]
    Population,
    /// Count plus a reference to a list of the matched subjects.
    SubjectList,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Population => "population",
            ReportType::SubjectList => "subject-list",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = QcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "population" => Ok(ReportType::Population),
            "subject-list" => Ok(ReportType::SubjectList),
            other => Err(QcError::InvalidParameter(format!(
                "report type must be 'population' or 'subject-list', got '{other}'"
            ))),
        }
    }
}

/// Configuration for one batch run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    directory: PathBuf,
    base_url: String,
    subject_type: String,
    report_type: ReportType,
    epsilon: f64,
    total_epsilon: Option<f64>,
    seed: Option<u64>,
    timeout: Option<Duration>,
}

impl RunConfig {
    /// Create a new `RunConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`QcError::InvalidParameter`] if:
    /// - `directory` does not exist or is not a directory,
    /// - `base_url` is not an absolute `http`/`https` URL,
    /// - `epsilon` or `total_epsilon` is not a finite value greater than 0.
    pub fn new(
        directory: PathBuf,
        base_url: &str,
        subject_type: String,
        report_type: ReportType,
        epsilon: f64,
        total_epsilon: Option<f64>,
    ) -> QcResult<Self> {
        if !directory.is_dir() {
            return Err(QcError::InvalidParameter(format!(
                "directory not found: {}",
                directory.display()
            )));
        }

        qc_dp::validate_epsilon(epsilon)
            .map_err(|e| QcError::InvalidParameter(e.to_string()))?;

        if let Some(total) = total_epsilon {
            if !(total.is_finite() && total > 0.0) {
                return Err(QcError::InvalidParameter(format!(
                    "total epsilon must be a finite value greater than 0, got {total}"
                )));
            }
        }

        Ok(Self {
            directory,
            base_url: normalise_base_url(base_url)?,
            subject_type,
            report_type,
            epsilon,
            total_epsilon,
            seed: None,
            timeout: None,
        })
    }

    /// Fix the RNG seed so the noisy counts of a run can be reproduced.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Bound every HTTP call by `timeout`. Without one, the HTTP client's default applies.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Base URL of the FHIR server, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn total_epsilon(&self) -> Option<f64> {
        self.total_epsilon
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Validates the server base URL and strips trailing slashes so paths can be appended.
fn normalise_base_url(input: &str) -> QcResult<String> {
    let trimmed = input.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|e| QcError::InvalidParameter(format!("invalid base URL '{input}': {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(QcError::InvalidParameter(format!(
            "base URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }

    Ok(trimmed.to_owned())
}
