//! Documents exchanged with the `$evaluate-measure` operation.
//!
//! Responses are parsed leniently: servers add many fields this tool ignores, and the fields it
//! does read (`count`, `subjectResults.reference`) are optional in FHIR. Absence is surfaced as
//! `None`; only a present field with the wrong type is an error.

use crate::data_types::Reference;
use crate::{from_json_value, FhirResult};
use serde::{Deserialize, Serialize};

/// Start of the evaluation period used for every measure.
pub const EVALUATION_PERIOD_START: &str = "2000";
/// End of the evaluation period used for every measure.
pub const EVALUATION_PERIOD_END: &str = "2030";

const SUBJECT_LIST_REPORT_TYPE: &str = "subject-list";

// ============================================================================
// MeasureReport
// ============================================================================

/// The parts of a FHIR `MeasureReport` this tool reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureReport {
    #[serde(default)]
    pub group: Vec<ReportGroup>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroup {
    #[serde(default)]
    pub population: Vec<ReportPopulation>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPopulation {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub subject_results: Option<Reference>,
}

impl MeasureReport {
    /// Parses a report returned by the server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FhirError::Translation`] when a field is present with an unexpected type,
    /// for example a negative or textual `count`.
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_json_value(value, "MeasureReport")
    }

    fn first_population(&self) -> Option<&ReportPopulation> {
        self.group.first().and_then(|g| g.population.first())
    }

    /// `group[0].population[0].count`, if present.
    pub fn population_count(&self) -> Option<u64> {
        self.first_population().and_then(|p| p.count)
    }

    /// `group[0].population[0].subjectResults.reference`, if present and non-empty.
    pub fn subject_list_reference(&self) -> Option<&str> {
        self.first_population()
            .and_then(|p| p.subject_results.as_ref())
            .and_then(Reference::non_empty)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// FHIR `Parameters` body for a POSTed `$evaluate-measure`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub resource_type: String,
    pub parameter: Vec<Parameter>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,
}

impl Parameter {
    fn date(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value_date: Some(value.to_owned()),
            value_code: None,
        }
    }

    fn code(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value_date: None,
            value_code: Some(value.to_owned()),
        }
    }
}

impl Parameters {
    /// Parameters requesting a subject-list report over the fixed evaluation period.
    pub fn subject_list_evaluation() -> Self {
        Self {
            resource_type: "Parameters".to_owned(),
            parameter: vec![
                Parameter::date("periodStart", EVALUATION_PERIOD_START),
                Parameter::date("periodEnd", EVALUATION_PERIOD_END),
                Parameter::code("reportType", SUBJECT_LIST_REPORT_TYPE),
            ],
        }
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameter.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// List
// ============================================================================

/// The parts of a FHIR `List` of matched subjects this tool reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResource {
    #[serde(default)]
    pub entry: Vec<ListEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    #[serde(default)]
    pub item: Option<Reference>,
}

impl ListResource {
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_json_value(value, "List")
    }

    /// References of all entries, skipping entries without one.
    pub fn item_references(&self) -> Vec<String> {
        self.entry
            .iter()
            .filter_map(|e| e.item.as_ref())
            .filter_map(Reference::non_empty)
            .map(str::to_owned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FhirError;
    use serde_json::json;

    #[test]
    fn reads_population_count() {
        let report =
            MeasureReport::from_value(json!({"group":[{"population":[{"count":7}]}]})).unwrap();
        assert_eq!(report.population_count(), Some(7));
        assert_eq!(report.subject_list_reference(), None);
    }

    #[test]
    fn absent_fields_are_none() {
        for value in [
            json!({}),
            json!({"group": []}),
            json!({"group": [{}]}),
            json!({"group": [{"population": [{}]}]}),
        ] {
            let report = MeasureReport::from_value(value).unwrap();
            assert_eq!(report.population_count(), None);
            assert_eq!(report.subject_list_reference(), None);
        }
    }

    #[test]
    fn reads_subject_list_reference() {
        let report = MeasureReport::from_value(json!({
            "resourceType": "MeasureReport",
            "status": "complete",
            "group": [{
                "population": [{
                    "code": {"coding": [{"code": "initial-population"}]},
                    "count": 3,
                    "subjectResults": {"reference": "List/42"}
                }]
            }]
        }))
        .unwrap();
        assert_eq!(report.population_count(), Some(3));
        assert_eq!(report.subject_list_reference(), Some("List/42"));
    }

    #[test]
    fn empty_subject_reference_is_none() {
        let report = MeasureReport::from_value(json!({
            "group": [{"population": [{"count": 1, "subjectResults": {"reference": ""}}]}]
        }))
        .unwrap();
        assert_eq!(report.subject_list_reference(), None);
    }

    #[test]
    fn mistyped_count_is_a_translation_error() {
        let err = MeasureReport::from_value(json!({
            "group": [{"population": [{"count": "seven"}]}]
        }))
        .expect_err("string count");
        match err {
            FhirError::Translation(message) => {
                assert!(message.contains("group[0].population[0].count"), "{message}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn subject_list_parameters_shape() {
        let body = serde_json::to_value(Parameters::subject_list_evaluation()).unwrap();
        assert_eq!(
            body,
            json!({
                "resourceType": "Parameters",
                "parameter": [
                    {"name": "periodStart", "valueDate": "2000"},
                    {"name": "periodEnd", "valueDate": "2030"},
                    {"name": "reportType", "valueCode": "subject-list"}
                ]
            })
        );
    }

    #[test]
    fn list_item_references_skip_missing_items() {
        let list = ListResource::from_value(json!({
            "resourceType": "List",
            "entry": [
                {"item": {"reference": "Patient/1"}},
                {},
                {"item": {}},
                {"item": {"reference": "Patient/2"}}
            ]
        }))
        .unwrap();
        assert_eq!(list.item_references(), vec!["Patient/1", "Patient/2"]);
    }
}
