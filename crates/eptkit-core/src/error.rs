//! EPT error types

use thiserror::Error;

/// The main error type for EPT parsing and reporting
#[derive(Error, Debug)]
pub enum Error {
    /// A `name:offset:size:masks` group could not be parsed
    #[error("Malformed partition entry '{group}': {reason}")]
    MalformedEntry { group: String, reason: String },

    /// The snapshot line as a whole is unusable
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Value is beyond the largest human-readable suffix
    #[error("Size {0} is too large to convert to human-readable form")]
    UnrepresentableSize(u128),

    /// A human-readable size literal could not be parsed
    #[error("Invalid size literal: {0}")]
    InvalidSizeLiteral(String),

    /// The external partitioning tool exited unsuccessfully
    #[error("{tool} failed ({status}), could not read the EPT")]
    ExternalToolFailure { tool: String, status: String },

    /// I/O error while rendering or reading tool output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for EPT operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a malformed entry error for the given field group
    pub fn malformed_entry(group: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedEntry {
            group: group.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed snapshot error
    pub fn malformed_snapshot(msg: impl Into<String>) -> Self {
        Error::MalformedSnapshot(msg.into())
    }

    /// Create an invalid size literal error
    pub fn invalid_size_literal(msg: impl Into<String>) -> Self {
        Error::InvalidSizeLiteral(msg.into())
    }

    /// Create an external tool failure error
    pub fn external_tool(tool: impl Into<String>, status: impl Into<String>) -> Self {
        Error::ExternalToolFailure {
            tool: tool.into(),
            status: status.into(),
        }
    }
}
