//! FHIR `Library` used as the logic container for a CQL file.
//!
//! The library is an opaque carrier: the CQL text is base64-encoded into `content[0].data` and
//! is never parsed here. The server compiles it when the referencing measure is evaluated.

use crate::data_types::CodeableConcept;
use crate::{from_json_value, FhirError, FhirResult, ResourceKind, UrnUuid};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

const LIBRARY_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/library-type";
const LOGIC_LIBRARY_CODE: &str = "logic-library";
const CQL_CONTENT_TYPE: &str = "text/cql";
const ACTIVE_STATUS: &str = "active";

/// Wire model of a FHIR `Library` resource.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    pub resource_type: String,
    pub status: String,
    #[serde(rename = "type")]
    pub library_type: CodeableConcept,
    pub content: Vec<Attachment>,
    pub url: String,
}

/// Inline content of a library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Library {
    /// Builds the logic container for one CQL file.
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier stamped into `url` as `urn:uuid:<id>`.
    /// * `content` - Raw bytes of the CQL file; stored base64-encoded and unvalidated.
    pub fn logic_container(id: &UrnUuid, content: &[u8]) -> Self {
        Self {
            resource_type: ResourceKind::Library.as_str().to_owned(),
            status: ACTIVE_STATUS.to_owned(),
            library_type: CodeableConcept::single(LIBRARY_TYPE_SYSTEM, LOGIC_LIBRARY_CODE),
            content: vec![Attachment {
                content_type: CQL_CONTENT_TYPE.to_owned(),
                data: Some(STANDARD.encode(content)),
            }],
            url: id.urn(),
        }
    }

    /// Parses a library document, e.g. one echoed back by a server.
    pub fn from_value(value: serde_json::Value) -> FhirResult<Self> {
        from_json_value(value, "Library")
    }

    /// Decodes the embedded CQL back into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidInput`] if there is no inline content and
    /// [`FhirError::Base64`] if the content is not valid base64.
    pub fn decoded_content(&self) -> FhirResult<Vec<u8>> {
        let data = self
            .content
            .first()
            .and_then(|attachment| attachment.data.as_deref())
            .ok_or_else(|| FhirError::InvalidInput("library has no inline content".into()))?;
        Ok(STANDARD.decode(data)?)
    }

    /// Serializes the library as a JSON request body.
    pub fn to_document(&self) -> FhirResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
