//! # eptkit core
//!
//! Model of an eMMC partition table (EPT) as dumped by `ampart` in
//! `esnapshot` mode, plus the human-readable report of it.
//!
//! - **PartitionEntry**: one `name:offset:size:masks` group
//! - **TableSnapshot**: the ordered entries of one snapshot line
//! - **size**: 1024-based `B K M G T P E Z Y` formatting and parsing
//! - **TableReporter**: fixed-column table with gap/overlap markers
//!
//! ## Example
//!
//! ```rust
//! use eptkit_core::{render, TableSnapshot};
//!
//! let snapshot: TableSnapshot = "bootloader:0:4194304:0 env:8388608:8388608:0".parse()?;
//! assert_eq!(snapshot.count(), 2);
//! print!("{}", render(&snapshot)?);
//! # Ok::<(), eptkit_core::Error>(())
//! ```

pub mod entry;
pub mod error;
pub mod report;
pub mod size;
pub mod snapshot;

pub use entry::{FieldStyle, PartitionEntry};
pub use error::{Error, Result};
pub use report::{render, TableReporter};
pub use size::{from_human_readable, size_human_readable};
pub use snapshot::{LayoutRow, SnapshotSet, TableSnapshot};
