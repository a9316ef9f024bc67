//! Progress reporting while splitting

use eptkit_core::size_human_readable;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Progress of the partition currently being copied
#[derive(Debug, Clone)]
pub struct SplitProgress<'a> {
    /// Sequential output id of the partition
    pub id: usize,
    /// Partition name
    pub name: &'a str,
    /// Bytes of this partition written so far
    pub bytes_copied: u64,
    /// Declared partition size
    pub partition_size: u64,
    /// Time since this partition was started
    pub elapsed: Duration,
}

impl<'a> SplitProgress<'a> {
    pub fn new(id: usize, name: &'a str, bytes_copied: u64, partition_size: u64, started: Instant) -> Self {
        Self {
            id,
            name,
            bytes_copied,
            partition_size,
            elapsed: started.elapsed(),
        }
    }

    /// Percentage complete (0.0 - 100.0); empty partitions count as done
    pub fn percent_complete(&self) -> f64 {
        if self.partition_size == 0 {
            100.0
        } else {
            (self.bytes_copied as f64 / self.partition_size as f64) * 100.0
        }
    }

    /// Transfer rate in bytes/second
    pub fn bytes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.bytes_copied as f64 / secs
        } else {
            0.0
        }
    }

    /// One-line summary, e.g. `03_env: 50.0% (   4.00M of    8.00M)`
    pub fn format(&self) -> String {
        let human = |bytes: u64| size_human_readable(bytes).unwrap_or_else(|_| bytes.to_string());
        format!(
            "{:02}_{}: {:.1}% ({} of {})",
            self.id,
            self.name,
            self.percent_complete(),
            human(self.bytes_copied),
            human(self.partition_size)
        )
    }
}

/// Callback type for progress updates
pub type ProgressCallback = Arc<dyn Fn(&SplitProgress<'_>) + Send + Sync>;
