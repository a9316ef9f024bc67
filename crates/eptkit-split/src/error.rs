//! Error types for dump splitting

use std::path::PathBuf;
use thiserror::Error;

/// Result type for split operations
pub type Result<T> = std::result::Result<T, SplitError>;

/// Errors that can occur while splitting a dump
#[derive(Error, Debug)]
pub enum SplitError {
    /// Source ended before the partition's declared size was copied
    #[error(
        "Short read in partition '{partition}': source ended at byte {offset}, \
         {actual} of {expected} bytes copied"
    )]
    ShortRead {
        partition: String,
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// Destination directory is already there
    #[error("Output directory already exists: {}", .0.display())]
    OutputExists(PathBuf),

    /// Partition name cannot be used as part of a file name
    #[error("Partition name {0:?} cannot be used as a file name")]
    InvalidPartitionName(String),

    /// Chunk size of zero
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// Unknown digest algorithm name
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigest(String),

    /// I/O error on the source, an output file, or the directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the snapshot model
    #[error(transparent)]
    Core(#[from] eptkit_core::Error),
}
