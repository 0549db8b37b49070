use thiserror::Error;

/// Main error type for cpcd-eval
#[derive(Error, Debug)]
pub enum EvalError {
    /// A prediction list repeats an item
    #[error("Predictions should be unique. Duplicates detected.")]
    DuplicatePredictions,

    /// A gold list repeats an item
    #[error("Gold item list should be unique. Duplicates detected.")]
    DuplicateGold,

    /// Gold is empty, recall/MAP are undefined
    #[error("Gold item list is empty")]
    EmptyGold,

    /// Metric name with no registered implementation
    #[error("Couldn't find implementation for metric: {0}")]
    UnknownMetric(String),

    /// Largest cutoff is deeper than the prediction list
    #[error("k is larger than the number of retrieved preds, {k} > {available}.")]
    CutoffExceedsPredictions { k: usize, available: usize },

    /// Cutoff list is empty or contains zero
    #[error("Invalid cutoff: {0}")]
    InvalidCutoff(String),

    /// Predictions reference a dialog that has no gold data
    #[error("No gold data for dialog: {0}")]
    MissingDialog(String),

    /// Track id missing from the track catalog
    #[error("Unknown track id: {0}")]
    UnknownTrack(String),

    /// Malformed input record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decode/encode errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Convenient Result type using EvalError
pub type Result<T> = std::result::Result<T, EvalError>;
