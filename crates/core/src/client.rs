//! Blocking HTTP client for the FHIR measure-evaluation server.
//!
//! [`MeasureService`] is the seam between the batch runner and the network. [`FhirClient`] is the
//! production implementation; tests substitute in-memory services.

use crate::constants::{FHIR_JSON_CONTENT_TYPE, MAX_ERROR_BODY_CHARS};
use crate::{QcError, QcResult, RunConfig};
use fhir::{
    MeasureReport, Parameters, ResourceKind, EVALUATION_PERIOD_END, EVALUATION_PERIOD_START,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;

/// Operations the batch runner needs from a measure-evaluation server.
///
/// All calls block until the server answers or the transport gives up. None of them is retried.
pub trait MeasureService {
    /// Creates a resource and returns the id the server assigned to it.
    fn create(&self, kind: ResourceKind, document: &Value) -> QcResult<String>;

    /// Evaluates a measure as an aggregate count.
    fn evaluate_population(&self, measure_id: &str) -> QcResult<MeasureReport>;

    /// Evaluates a measure and asks for a list of the matched subjects.
    fn evaluate_subject_list(&self, measure_id: &str) -> QcResult<MeasureReport>;

    /// Reads a resource by relative reference, e.g. `List/42`.
    fn read(&self, reference: &str) -> QcResult<Value>;
}

impl<T: MeasureService + ?Sized> MeasureService for &T {
    fn create(&self, kind: ResourceKind, document: &Value) -> QcResult<String> {
        (**self).create(kind, document)
    }

    fn evaluate_population(&self, measure_id: &str) -> QcResult<MeasureReport> {
        (**self).evaluate_population(measure_id)
    }

    fn evaluate_subject_list(&self, measure_id: &str) -> QcResult<MeasureReport> {
        (**self).evaluate_subject_list(measure_id)
    }

    fn read(&self, reference: &str) -> QcResult<Value> {
        (**self).read(reference)
    }
}

/// [`MeasureService`] over HTTP.
#[derive(Clone, Debug)]
pub struct FhirClient {
    base_url: String,
    http: Client,
}

impl FhirClient {
    /// Creates a client for `base_url` (no trailing slash).
    ///
    /// `timeout` bounds each request; `None` keeps the HTTP client's default.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> QcResult<Self> {
        let base_url = base_url.into();
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|source| QcError::Transport {
            url: base_url.clone(),
            source,
        })?;
        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &RunConfig) -> QcResult<Self> {
        Self::new(config.base_url(), config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn evaluate_url(&self, measure_id: &str) -> String {
        self.url(&format!("Measure/{measure_id}/$evaluate-measure"))
    }

    /// Sends a request and parses a successful response body as JSON.
    fn send_json(&self, request: RequestBuilder, url: &str) -> QcResult<Value> {
        tracing::debug!("-> {url}");
        let response = request.send().map_err(|source| QcError::Transport {
            url: url.to_owned(),
            source,
        })?;

        let status = response.status();
        let body = response.text().map_err(|source| QcError::Transport {
            url: url.to_owned(),
            source,
        })?;
        tracing::debug!("<- {url} {status}");

        if !status.is_success() {
            return Err(QcError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| QcError::MalformedResponse {
            url: url.to_owned(),
            message: e.to_string(),
        })
    }

    fn parse_report(value: Value, url: &str) -> QcResult<MeasureReport> {
        MeasureReport::from_value(value).map_err(|e| QcError::MalformedResponse {
            url: url.to_owned(),
            message: e.to_string(),
        })
    }
}

impl MeasureService for FhirClient {
    fn create(&self, kind: ResourceKind, document: &Value) -> QcResult<String> {
        let url = self.url(kind.as_str());
        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)
            .json(document);
        let created = self.send_json(request, &url)?;

        created
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
            .ok_or(QcError::MissingField { url, field: "id" })
    }

    fn evaluate_population(&self, measure_id: &str) -> QcResult<MeasureReport> {
        let url = self.evaluate_url(measure_id);
        let request = self.http.get(&url).query(&[
            ("periodStart", EVALUATION_PERIOD_START),
            ("periodEnd", EVALUATION_PERIOD_END),
        ]);
        let value = self.send_json(request, &url)?;
        Self::parse_report(value, &url)
    }

    fn evaluate_subject_list(&self, measure_id: &str) -> QcResult<MeasureReport> {
        let url = self.evaluate_url(measure_id);
        // reqwest keeps an explicit content type when serializing the body
        let request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, FHIR_JSON_CONTENT_TYPE)
            .json(&Parameters::subject_list_evaluation());
        let value = self.send_json(request, &url)?;
        Self::parse_report(value, &url)
    }

    fn read(&self, reference: &str) -> QcResult<Value> {
        let url = self.url(reference);
        let request = self.http.get(&url);
        self.send_json(request, &url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let client = FhirClient::new("http://localhost:8080/fhir", None).unwrap();
        assert_eq!(client.url("Library"), "http://localhost:8080/fhir/Library");
        assert_eq!(client.url("/List/42"), "http://localhost:8080/fhir/List/42");
        assert_eq!(
            client.evaluate_url("M1"),
            "http://localhost:8080/fhir/Measure/M1/$evaluate-measure"
        );
    }

    #[test]
    fn unreachable_server_is_a_remote_error() {
        // Port 9 (discard) on localhost is normally closed.
        let client =
            FhirClient::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        let err = client
            .evaluate_population("M1")
            .expect_err("nothing listens there");
        assert_eq!(err.kind(), crate::ErrorKind::Remote);
    }
}
