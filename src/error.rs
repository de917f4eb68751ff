use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(
        "Record source not found: {} ({source}). Please check your entry and try again.",
        .path.display()
    )]
    RecordSourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid borrower {}: {field}: {reason}", record_label(.record))]
    Validation {
        /// 1-based row number in the record source, header included. `None`
        /// when the borrower was built directly rather than from a record.
        record: Option<usize>,
        field: &'static str,
        reason: String,
    },

    #[error("Trial state has {state} slots but the portfolio has {borrowers} borrowers")]
    TrialStateMismatch { borrowers: usize, state: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn record_label(record: &Option<usize>) -> String {
    match record {
        Some(n) => format!("record {n}"),
        None => "input".to_string(),
    }
}

impl SimError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::Validation { record: None, field, reason: reason.into() }
    }

    /// Attach the source row number to a validation error.
    pub(crate) fn at_record(self, row: usize) -> Self {
        match self {
            SimError::Validation { field, reason, .. } => {
                SimError::Validation { record: Some(row), field, reason }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
