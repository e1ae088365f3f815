use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, PredictorErr>;

/// Why a submitted field was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReason {
    /// The field is absent from the submitted values.
    Missing,
    /// The value could not be read as a number.
    NotNumeric { got: String },
    /// The value lies outside the field's closed interval.
    OutOfRange { value: f64, min: f64, max: f64 },
    /// The value is not one of the field's choices.
    InvalidChoice { got: String },
    /// The field is not part of the schema.
    Unknown,
}

impl Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "value is missing"),
            Self::NotNumeric { got } => write!(f, "'{got}' is not a number"),
            Self::OutOfRange { value, min, max } => {
                write!(f, "{value} is outside of [{min}, {max}]")
            }
            Self::InvalidChoice { got } => write!(f, "'{got}' is not a valid choice"),
            Self::Unknown => write!(f, "not a known field"),
        }
    }
}

/// The crate's error type.
#[derive(Debug)]
pub enum PredictorErr {
    /// The model artifact file does not exist.
    ArtifactNotFound { path: PathBuf },
    /// The model artifact exists but could not be deserialized or is structurally invalid.
    ArtifactCorrupt { path: PathBuf, reason: String },
    /// A submitted value was rejected before reaching the model.
    Validation {
        field: String,
        reason: ValidationReason,
    },
    /// The model failed or returned a malformed result.
    Inference(String),
    /// The delimited text could not be produced or parsed.
    Export(String),
    /// Invalid configuration.
    Config(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl PredictorErr {
    pub(crate) fn validation(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self::Validation {
            field: field.into(),
            reason,
        }
    }

    /// Returns the name of the offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether this error prevents serving any prediction until the deployment is fixed.
    ///
    /// Artifact errors are fatal; validation and inference errors are scoped to one request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. } | Self::ArtifactCorrupt { .. }
        )
    }
}

impl Display for PredictorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArtifactNotFound { path } => {
                write!(f, "model artifact not found: {}", path.display())
            }
            Self::ArtifactCorrupt { path, reason } => {
                write!(f, "model artifact {} is corrupt: {reason}", path.display())
            }
            Self::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::Inference(msg) => write!(f, "inference failed: {msg}"),
            Self::Export(msg) => write!(f, "export error: {msg}"),
            Self::Config(msg) => write!(f, "invalid config: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for PredictorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PredictorErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_errors_are_fatal() {
        let err = PredictorErr::ArtifactNotFound {
            path: "HGB.json".into(),
        };
        assert!(err.is_fatal());

        let err = PredictorErr::validation("pH", ValidationReason::Missing);
        assert!(!err.is_fatal());
        assert_eq!(err.field(), Some("pH"));
    }

    #[test]
    fn validation_message_names_field() {
        let err = PredictorErr::validation(
            "pH",
            ValidationReason::OutOfRange {
                value: 15.,
                min: 1.,
                max: 14.,
            },
        );
        assert_eq!(err.to_string(), "invalid pH: 15 is outside of [1, 14]");
    }
}
