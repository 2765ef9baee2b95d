use std::path::PathBuf;

/// Coarse classification of a [`QcError`], used to decide how far a failure propagates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input to the run as a whole. Aborts before any network call.
    InvalidParameter,
    /// The FHIR server failed or answered with something unusable. Aborts one file.
    Remote,
    /// A local file could not be read or written. Aborts one file.
    LocalIo,
    /// The privacy budget does not cover another release. Skips one file.
    BudgetExhausted,
}

#[derive(Debug, thiserror::Error)]
pub enum QcError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("unparseable response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
    #[error("response from {url} is missing `{field}`")]
    MissingField { url: String, field: &'static str },

    #[error("failed to list directory {path}: {source}", path = path.display())]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read logic file {path}: {source}", path = path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write report {path}: {source}", path = path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("privacy error: {0}")]
    Privacy(#[from] qc_dp::DpError),
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
}

impl QcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QcError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            QcError::Transport { .. }
            | QcError::Status { .. }
            | QcError::MalformedResponse { .. }
            | QcError::MissingField { .. } => ErrorKind::Remote,
            QcError::DirRead { .. } | QcError::FileRead { .. } | QcError::ReportWrite { .. } => {
                ErrorKind::LocalIo
            }
            QcError::Privacy(qc_dp::DpError::BudgetExhausted { .. }) => ErrorKind::BudgetExhausted,
            QcError::Privacy(_) => ErrorKind::InvalidParameter,
            // Only raised while translating documents exchanged with the server.
            QcError::Fhir(_) => ErrorKind::Remote,
        }
    }
}

pub type QcResult<T> = std::result::Result<T, QcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privacy_errors_are_classified() {
        let invalid = QcError::from(qc_dp::DpError::InvalidEpsilon(0.0));
        assert_eq!(invalid.kind(), ErrorKind::InvalidParameter);

        let exhausted = QcError::from(qc_dp::DpError::BudgetExhausted {
            requested: 1.0,
            remaining: 0.0,
        });
        assert_eq!(exhausted.kind(), ErrorKind::BudgetExhausted);
    }

    #[test]
    fn remote_errors_are_classified() {
        let err = QcError::Status {
            url: "http://localhost/Library".into(),
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(
            err.to_string(),
            "http://localhost/Library responded with HTTP 500: boom"
        );

        let err = QcError::MissingField {
            url: "http://localhost/Measure".into(),
            field: "id",
        };
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn file_errors_are_local() {
        let err = QcError::FileRead {
            path: PathBuf::from("/tmp/a.cql"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.kind(), ErrorKind::LocalIo);
        assert!(err.to_string().contains("/tmp/a.cql"));
    }
}
