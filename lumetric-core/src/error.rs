//! Error types for the lumetric-core library.
//!
//! Decode and read failures are local: callers record a gap and continue.
//! Configuration and region-bound violations are rejected synchronously
//! before a run starts.

use thiserror::Error;

/// Custom error types for lumetric
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame source read failed: {msg}")]
    SourceRead {
        frame_index: Option<u64>,
        msg: String,
    },

    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("Command '{0}' failed: {1}")]
    CommandFailed(String, String),

    #[error("ffprobe output parse failed: {0}")]
    FfprobeParse(String),

    #[error("Region {region_index} is invalid: {msg}")]
    InvalidRegion { region_index: usize, msg: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No analyzable video files found")]
    NoFilesFound,

    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Operation cancelled")]
    OperationCancelled,
}

/// Result type for lumetric operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Creates a `CoreError::SourceRead` for a specific frame index.
pub fn source_read_error(frame_index: u64, msg: impl Into<String>) -> CoreError {
    CoreError::SourceRead {
        frame_index: Some(frame_index),
        msg: msg.into(),
    }
}

/// Creates a `CoreError::CommandStart` from a spawn failure.
pub fn command_start_error(cmd_name: &str, err: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd_name.to_string(), err)
}

/// Creates a `CoreError::CommandFailed` from a non-zero exit or broken output.
pub fn command_failed_error(cmd_name: &str, detail: impl Into<String>) -> CoreError {
    CoreError::CommandFailed(cmd_name.to_string(), detail.into())
}
