use thiserror::Error;

/// Failures surfaced by the data layer.
///
/// Degenerate render input (empty filter result, all-zero domain) is not an
/// error: widgets render a placeholder for it. Errors here mean the payload
/// itself could not be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    /// The loader closure failed (network, I/O, malformed document).
    #[error("failed to load data: {reason}")]
    Load { reason: String },

    /// The payload parsed but an expected column or key set is absent.
    #[error("unexpected payload shape: {what}")]
    Shape { what: String },
}

impl DataError {
    pub fn load(reason: impl Into<String>) -> Self {
        DataError::Load {
            reason: reason.into(),
        }
    }

    pub fn shape(what: impl Into<String>) -> Self {
        DataError::Shape { what: what.into() }
    }
}
