//! FHIR `Measure` resources for cohort counts.
//!
//! A measure built here has one group with one `initial-population` population. Its criteria
//! name the CQL expression [`INITIAL_POPULATION_EXPRESSION`], so every logic file must define an
//! expression with exactly that name.

use crate::data_types::CodeableConcept;
use crate::{from_json_value, FhirResult, ResourceKind, UrnUuid};
use serde::{Deserialize, Serialize};

/// CQL expression every logic file must define.
pub const INITIAL_POPULATION_EXPRESSION: &str = "InInitialPopulation";

const RESOURCE_TYPES_SYSTEM: &str = "http://hl7.org/fhir/resource-types";
const MEASURE_SCORING_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/measure-scoring";
const COHORT_SCORING: &str = "cohort";
const MEASURE_POPULATION_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/measure-population";
const INITIAL_POPULATION_CODE: &str = "initial-population";
const CQL_IDENTIFIER_LANGUAGE: &str = "text/cql-identifier";
const ACTIVE_STATUS: &str = "active";

/// Wire model of a FHIR `Measure` resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub resource_type: String,
    pub status: String,
    pub subject_codeable_concept: CodeableConcept,
    pub scoring: CodeableConcept,
    pub library: Vec<String>,
    pub group: Vec<MeasureGroup>,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureGroup {
    pub population: Vec<MeasurePopulation>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurePopulation {
    pub code: CodeableConcept,
    pub criteria: Expression,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub language: String,
    pub expression: String,
}

impl Measure {
    /// Builds a cohort measure over the library published as `urn:uuid:<container>`.
    ///
    /// `subject_type` is copied verbatim into `subjectCodeableConcept.coding[0].code`; the server
    /// decides whether it is a resource type it can evaluate over.
    pub fn cohort(id: &UrnUuid, container: &UrnUuid, subject_type: &str) -> Self {
        Self {
            resource_type: ResourceKind::Measure.as_str().to_owned(),
            status: ACTIVE_STATUS.to_owned(),
            subject_codeable_concept: CodeableConcept::single(RESOURCE_TYPES_SYSTEM, subject_type),
            scoring: CodeableConcept::single(MEASURE_SCORING_SYSTEM, COHORT_SCORING),
            library: vec![container.urn()],
            group: vec![MeasureGroup {
                population: vec![MeasurePopulation {
                    code: CodeableConcept::single(
                        MEASURE_POPULATION_SYSTEM,
                        INITIAL_POPULATION_CODE,
                    ),
                    criteria: Expression {
                        language: CQL_IDENTIFIER_LANGUAGE.to_owned(),
                        expression: INITIAL_POPULATION_EXPRESSION.to_owned(),
                    },
                }],
            }],
            url: id.urn(),
        }
    }

    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_json_value(value, "Measure")
    }

    /// Canonical URL of the referenced library.
    pub fn library_reference(&self) -> Option<&str> {
        self.library.first().map(String::as_str)
    }

    /// Subject type the measure evaluates over.
    pub fn subject_type(&self) -> Option<&str> {
        self.subject_codeable_concept.first_code()
    }

    /// Serializes the measure as a JSON request body.
    pub fn to_document(&self) -> FhirResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
