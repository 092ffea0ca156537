//! Error types for tasky.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad input, unknown task, malformed import file)
//! - 4: Operation failed (storage could not be written, I/O)

use thiserror::Error;

/// Exit codes for the tasky CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tasky operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Import failed: {0}")]
    Format(#[from] FormatError),

    #[error("No tasks to export")]
    NothingToExport,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Failures of the persistence boundary.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("write failed for key '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// A malformed import or restore payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("file is empty")]
    EmptyInput,

    #[error("file is too large: {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("expected a JSON array of tasks")]
    NotAnArray,

    #[error("file contains no tasks")]
    NoRecords,

    #[error("no task passed validation ({rejected} rejected)")]
    NoValidRecords { rejected: usize },

    #[error("'{0}' files can only be exported")]
    ExportOnly(String),

    #[error("backup has no task list")]
    MissingTaskList,

    #[error("file is not UTF-8 text")]
    NotUtf8,
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::NotFound { .. }
            | Error::Format(_)
            | Error::NothingToExport
            | Error::InvalidConfig(_) => exit_codes::USER_ERROR,

            Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    pub(crate) fn not_found(id: &str) -> Self {
        Error::NotFound { id: id.to_string() }
    }
}

/// Result type alias for tasky operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_split_user_and_operation_failures() {
        assert_eq!(Error::not_found("x").exit_code(), exit_codes::USER_ERROR);
        assert_eq!(
            Error::from(FormatError::NotAnArray).exit_code(),
            exit_codes::USER_ERROR
        );
        let quota = StorageError::QuotaExceeded { needed: 10, quota: 5 };
        assert_eq!(Error::from(quota).exit_code(), exit_codes::OPERATION_FAILED);
    }

    #[test]
    fn format_errors_read_as_causes() {
        let err = Error::from(FormatError::NoValidRecords { rejected: 3 });
        assert_eq!(
            err.to_string(),
            "Import failed: no task passed validation (3 rejected)"
        );
    }
}
