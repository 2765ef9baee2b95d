//! FHIR datatypes shared by the resources in this crate.

use serde::{Deserialize, Serialize};

/// A code defined by a terminology system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: &str) -> Self {
        Self {
            system: Some(system.to_owned()),
            code: Some(code.to_owned()),
        }
    }
}

/// A concept expressed as one or more codings.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
}

impl CodeableConcept {
    /// Concept with a single coding.
    pub fn single(system: &str, code: &str) -> Self {
        Self {
            coding: vec![Coding::new(system, code)],
        }
    }

    /// Code of the first coding, if any.
    pub fn first_code(&self) -> Option<&str> {
        self.coding.first().and_then(|c| c.code.as_deref())
    }
}

/// A literal reference such as `List/42`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Reference {
    /// The reference string, treating an empty string as absent.
    pub fn non_empty(&self) -> Option<&str> {
        self.reference.as_deref().filter(|r| !r.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reference_is_treated_as_absent() {
        let reference = Reference {
            reference: Some(String::new()),
        };
        assert_eq!(reference.non_empty(), None);

        let reference = Reference {
            reference: Some("List/42".into()),
        };
        assert_eq!(reference.non_empty(), Some("List/42"));
    }

    #[test]
    fn first_code_reads_first_coding() {
        let concept = CodeableConcept::single("http://example.org", "cohort");
        assert_eq!(concept.first_code(), Some("cohort"));
        assert_eq!(CodeableConcept::default().first_code(), None);
    }
}
