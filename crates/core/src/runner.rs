//! Batch evaluation of a directory of logic files.
//!
//! Each file is carried through `Start → ContainerCreated → MeasureCreated → Evaluated →
//! Recorded` before the next one starts. A failure in any step abandons that file only: it is
//! logged, collected in [`BatchOutcome::failures`], and the run moves on. Errors that concern the
//! run as a whole (missing directory, no logic files, bad epsilon) abort before the first request.

use crate::client::MeasureService;
use crate::config::{ReportType, RunConfig};
use crate::logic_file::{self, LogicFile};
use crate::{ErrorKind, QcError, QcResult};
use fhir::{Library, ListResource, Measure, MeasureReport, ResourceKind, UrnUuid};
use qc_dp::{LaplaceSampler, PrivacyBudget};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

/// Published result for one logic file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    /// True population count; 0 when the report has none.
    pub count: u64,
    /// Count with Laplace noise added.
    #[serde(rename = "countWithDP")]
    pub count_with_dp: u64,
    /// Only present in subject-list mode, where it may be `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_reference: Option<Option<String>>,
    /// References of the matched subjects, read from the list in subject-list mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_ids: Option<Vec<String>>,
    /// Leading `//` comment of the logic file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub epsilon_used: f64,
}

/// Results keyed by logic file name.
pub type ResultsMap = BTreeMap<String, ResultRecord>;

/// A logic file that produced no result.
#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: QcError,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: ResultsMap,
    pub failures: Vec<FileFailure>,
    /// Sum of the epsilons of all published counts.
    pub epsilon_spent: f64,
    /// Budget left after the run; `None` without `total_epsilon`.
    pub epsilon_remaining: Option<f64>,
}

/// Drives logic files through the measure service and the noise sampler.
pub struct BatchRunner<S, R = StdRng> {
    service: S,
    config: RunConfig,
    sampler: LaplaceSampler<R>,
    budget: PrivacyBudget,
}

impl<S: MeasureService> BatchRunner<S, StdRng> {
    /// Runner whose noise comes from the configured seed, or from OS entropy without one.
    pub fn new(service: S, config: RunConfig) -> QcResult<Self> {
        let sampler = match config.seed() {
            Some(seed) => LaplaceSampler::seeded(seed),
            None => LaplaceSampler::from_entropy(),
        };
        Self::with_sampler(service, config, sampler)
    }
}

impl<S: MeasureService, R: Rng> BatchRunner<S, R> {
    pub fn with_sampler(
        service: S,
        config: RunConfig,
        sampler: LaplaceSampler<R>,
    ) -> QcResult<Self> {
        let budget = match config.total_epsilon() {
            Some(total) => PrivacyBudget::capped(total)?,
            None => PrivacyBudget::unlimited(),
        };
        Ok(Self {
            service,
            config,
            sampler,
            budget,
        })
    }

    /// Processes every logic file in the configured directory.
    ///
    /// # Errors
    ///
    /// Only run-level problems are returned as errors; per-file failures end up in
    /// [`BatchOutcome::failures`].
    pub fn run(&mut self) -> QcResult<BatchOutcome> {
        let files = logic_file::discover(self.config.directory())?;
        tracing::info!(
            "Evaluating {} logic file(s) against {}",
            files.len(),
            self.config.base_url()
        );

        let mut results = ResultsMap::new();
        let mut failures = Vec::new();

        for file in &files {
            match self.process(file) {
                Ok(record) => {
                    results.insert(file.name().to_owned(), record);
                }
                Err(error) => {
                    if error.kind() == ErrorKind::BudgetExhausted {
                        tracing::warn!("Skipping {}: {}", file.name(), error);
                    } else {
                        tracing::error!("Error processing {}: {}", file.name(), error);
                    }
                    failures.push(FileFailure {
                        file: file.name().to_owned(),
                        error,
                    });
                }
            }
        }

        Ok(BatchOutcome {
            results,
            failures,
            epsilon_spent: self.budget.spent(),
            epsilon_remaining: self.budget.remaining(),
        })
    }

    fn process(&mut self, file: &LogicFile) -> QcResult<ResultRecord> {
        let epsilon = self.config.epsilon();
        // Nothing is sent for a file the budget cannot pay for.
        self.budget.check(epsilon)?;

        tracing::info!("Processing {}...", file.name());
        tracing::debug!("{}: reading {}", file.name(), file.path().display());
        let content = file.read()?;
        let description = logic_file::description(&content);

        // Start -> ContainerCreated
        let container_url = UrnUuid::new();
        let library = Library::logic_container(&container_url, &content);
        let library_id = self
            .service
            .create(ResourceKind::Library, &library.to_document()?)?;
        tracing::debug!("{}: created Library/{library_id} ({})", file.name(), library.url);

        // ContainerCreated -> MeasureCreated
        let measure_url = UrnUuid::new();
        let measure = Measure::cohort(&measure_url, &container_url, self.config.subject_type());
        let measure_id = self
            .service
            .create(ResourceKind::Measure, &measure.to_document()?)?;
        tracing::debug!("{}: created Measure/{measure_id} ({})", file.name(), measure.url);

        // MeasureCreated -> Evaluated
        let report = self.evaluate(file, &measure_id)?;

        // Evaluated -> Recorded
        let count = report.population_count().unwrap_or(0);
        self.budget.try_spend(epsilon)?;
        let count_with_dp = self.sampler.add_noise(count, epsilon)?;

        let (list_reference, subject_ids) = match self.config.report_type() {
            ReportType::Population => (None, None),
            ReportType::SubjectList => {
                let reference = report.subject_list_reference().map(str::to_owned);
                let subject_ids = reference.as_deref().and_then(|r| self.subject_ids(file, r));
                (Some(reference), subject_ids)
            }
        };

        Ok(ResultRecord {
            count,
            count_with_dp,
            list_reference,
            subject_ids,
            description,
            epsilon_used: epsilon,
        })
    }

    fn evaluate(&self, file: &LogicFile, measure_id: &str) -> QcResult<MeasureReport> {
        match self.config.report_type() {
            ReportType::Population => {
                tracing::info!("Generating a population count report for {}...", file.name());
                self.service.evaluate_population(measure_id)
            }
            ReportType::SubjectList => {
                tracing::info!(
                    "Generating a report including the list of matching {}s for {}...",
                    self.config.subject_type().to_lowercase(),
                    file.name()
                );
                self.service.evaluate_subject_list(measure_id)
            }
        }
    }

    /// Reads the subject list. The count is already known, so a failure here is only a warning.
    fn subject_ids(&self, file: &LogicFile, reference: &str) -> Option<Vec<String>> {
        let list = self
            .service
            .read(reference)
            .and_then(|value| ListResource::from_value(value).map_err(QcError::from));
        match list {
            Ok(list) => Some(list.item_references()),
            Err(error) => {
                tracing::warn!(
                    "{}: could not read subject list {reference}: {error}",
                    file.name()
                );
                None
            }
        }
    }
}
