//! Raw eMMC dump splitting
//!
//! Provides functionality for:
//! - Copying every partition of a snapshot out of a full-device dump
//! - Bounded-memory chunked copies through a per-partition read window
//! - Optional MD5/SHA1/SHA256 digests of each written image
//! - Progress callbacks during long copies
//!
//! ```rust,no_run
//! use eptkit_core::TableSnapshot;
//! use eptkit_split::Splitter;
//! use std::fs::File;
//! use std::path::Path;
//!
//! let snapshot: TableSnapshot = "boot:0:1024:0 system:1024:2048:0".parse().unwrap();
//! let mut dump = File::open("emmc.img").unwrap();
//! let report = Splitter::new()
//!     .split_to_new_dir(&snapshot, &mut dump, Path::new("emmc.img_split"))
//!     .unwrap();
//! println!("{} bytes written", report.total_bytes());
//! ```

pub mod error;
pub mod hash;
pub mod progress;
pub mod splitter;
pub mod window;

pub use error::{Result, SplitError};
pub use hash::{DigestAlgorithm, PartitionDigest, PartitionHasher};
pub use progress::{ProgressCallback, SplitProgress};
pub use splitter::{
    output_file_name, SplitOptions, SplitRecord, SplitReport, Splitter, DEFAULT_CHUNK_SIZE,
    DEFAULT_PROGRESS_INTERVAL,
};
pub use window::PartitionWindow;
