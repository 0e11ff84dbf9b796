use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbrewError {
    #[error("Download failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Formula not found: {name}{}", suggestion_hint(.suggestion))]
    FormulaNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Invalid formula {formula}: {reason}")]
    InvalidFormula { formula: String, reason: String },

    #[error("Checksum mismatch for {formula}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        formula: String,
        expected: String,
        actual: String,
    },

    #[error(
        "Formula {formula} has no verified checksum (declared '{placeholder}'); archive sha256 is {actual}"
    )]
    UnresolvedChecksum {
        formula: String,
        placeholder: String,
        actual: String,
    },

    #[error("Source archive is missing {path}")]
    MissingSourcePath { path: String },

    #[error("inreplace failed: pattern /{pattern}/ not found in {file}")]
    InreplaceFailed { file: String, pattern: String },

    #[error("Missing required dependency: {0}")]
    MissingDependency(String),

    #[error("Smoke test failed: {0}")]
    SmokeTestFailed(String),

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OrbrewError>;

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}
