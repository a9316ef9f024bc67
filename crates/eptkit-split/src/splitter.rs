//! Split a full eMMC dump into one image per partition
//!
//! Each entry of the snapshot, in order, becomes `{id:02}_{name}.img` in the
//! output directory, holding exactly the entry's byte range of the dump.

use crate::error::{Result, SplitError};
use crate::hash::{DigestAlgorithm, PartitionDigest, PartitionHasher};
use crate::progress::{ProgressCallback, SplitProgress};
use crate::window::PartitionWindow;
use eptkit_core::{PartitionEntry, TableSnapshot};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default copy chunk, bounds memory use regardless of partition size
pub const DEFAULT_CHUNK_SIZE: usize = 0x10000;

/// Default spacing of progress reports within one partition
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 16 * 1024 * 1024;

/// Options for splitting
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Copy chunk size in bytes (default: 64KB)
    pub chunk_size: usize,
    /// Digests to compute for every output file
    pub hash_algorithms: Vec<DigestAlgorithm>,
    /// fsync each output file before moving to the next
    pub sync_writes: bool,
    /// Bytes between progress reports (default: 16MB); the last chunk of
    /// every partition is always reported
    pub progress_interval: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            hash_algorithms: Vec::new(),
            sync_writes: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// One written partition image
#[derive(Debug, Clone)]
pub struct SplitRecord {
    pub id: usize,
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub digests: Vec<PartitionDigest>,
}

/// Result of a complete split
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub records: Vec<SplitRecord>,
    pub elapsed: Duration,
}

impl SplitReport {
    /// Sum of all written bytes
    pub fn total_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.bytes).sum()
    }
}

/// Output file name for the `id`th partition
pub fn output_file_name(id: usize, name: &str) -> String {
    format!("{:02}_{}.img", id, name)
}

/// Reject names that would escape or confuse the output directory
fn validate_partition_name(name: &str) -> Result<()> {
    if name == "." || name == ".." || name.contains(&['/', '\\', '\0'][..]) {
        return Err(SplitError::InvalidPartitionName(name.to_string()));
    }
    Ok(())
}

/// Sequential dump splitter
///
/// The source's seek position belongs to the splitter for the duration of a
/// split; entries are copied one after another through it.
#[derive(Default)]
pub struct Splitter {
    options: SplitOptions,
    progress: Option<ProgressCallback>,
}

impl Splitter {
    /// Create a splitter with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom options
    pub fn with_options(options: SplitOptions) -> Self {
        Self {
            options,
            progress: None,
        }
    }

    /// Report progress every `progress_interval` bytes and at partition end
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Create `dest_dir` and split into it
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::OutputExists`] if `dest_dir` is already present;
    /// nothing is written in that case.
    pub fn split_to_new_dir<R: Read + Seek>(
        &self,
        snapshot: &TableSnapshot,
        source: &mut R,
        dest_dir: &Path,
    ) -> Result<SplitReport> {
        create_output_dir(dest_dir)?;
        self.split_into(snapshot, source, dest_dir)
    }

    /// Split into an existing directory
    ///
    /// Stops at the first failing entry. Images written for earlier entries are
    /// left in place; the failing entry's partial image is removed.
    pub fn split_into<R: Read + Seek>(
        &self,
        snapshot: &TableSnapshot,
        source: &mut R,
        dest_dir: &Path,
    ) -> Result<SplitReport> {
        if self.options.chunk_size == 0 {
            return Err(SplitError::InvalidChunkSize(0));
        }

        let start_time = Instant::now();
        let mut records = Vec::with_capacity(snapshot.count());

        for (id, entry) in snapshot.partitions().iter().enumerate() {
            records.push(self.split_partition(id, entry, &mut *source, dest_dir)?);
        }

        let report = SplitReport {
            records,
            elapsed: start_time.elapsed(),
        };
        tracing::info!(
            "Split {} partitions ({} bytes) into {}",
            report.records.len(),
            report.total_bytes(),
            dest_dir.display()
        );
        Ok(report)
    }

    fn split_partition<R: Read + Seek>(
        &self,
        id: usize,
        entry: &PartitionEntry,
        source: &mut R,
        dest_dir: &Path,
    ) -> Result<SplitRecord> {
        validate_partition_name(entry.name())?;
        let path = dest_dir.join(output_file_name(id, entry.name()));
        tracing::debug!(
            "Copying {} [0x{:x}, 0x{:x}) to {}",
            entry.name(),
            entry.offset(),
            entry.end(),
            path.display()
        );

        let mut output = OpenOptions::new().write(true).create_new(true).open(&path)?;

        match self.copy_partition(id, entry, source, &mut output) {
            Ok(digests) => {
                tracing::info!("Wrote {} ({} bytes)", path.display(), entry.size());
                Ok(SplitRecord {
                    id,
                    name: entry.name().to_string(),
                    path,
                    bytes: entry.size(),
                    digests,
                })
            }
            Err(e) => {
                drop(output);
                if let Err(remove_err) = fs::remove_file(&path) {
                    tracing::warn!("Failed to remove partial {}: {}", path.display(), remove_err);
                } else {
                    tracing::warn!("Removed partial {}", path.display());
                }
                Err(e)
            }
        }
    }

    /// Copy `entry.size()` bytes as full chunks plus one remainder chunk
    fn copy_partition<R: Read + Seek>(
        &self,
        id: usize,
        entry: &PartitionEntry,
        source: &mut R,
        output: &mut File,
    ) -> Result<Vec<PartitionDigest>> {
        let chunk_size = self.options.chunk_size;
        let interval = self.options.progress_interval.max(1);
        let full_chunks = entry.size() / chunk_size as u64;
        let remainder = (entry.size() % chunk_size as u64) as usize;

        let started = Instant::now();
        let mut window = PartitionWindow::new(source, entry.offset(), entry.size())?;
        let mut hasher = PartitionHasher::new(&self.options.hash_algorithms);
        let mut buffer = vec![0u8; chunk_size];

        let chunk_lengths = (0..full_chunks)
            .map(|_| chunk_size)
            .chain((remainder > 0).then_some(remainder));

        for length in chunk_lengths {
            let chunk = &mut buffer[..length];
            let read = window.fill(chunk)?;
            if read < length {
                return Err(SplitError::ShortRead {
                    partition: entry.name().to_string(),
                    offset: window.absolute_position(),
                    expected: entry.size(),
                    actual: window.position(),
                });
            }

            let copied_before = window.position() - length as u64;
            hasher.update(chunk);
            output.write_all(chunk)?;

            let copied = window.position();
            if copied / interval > copied_before / interval || copied == entry.size() {
                let progress = SplitProgress::new(id, entry.name(), copied, entry.size(), started);
                tracing::debug!("{}", progress.format());
                if let Some(ref callback) = self.progress {
                    callback(&progress);
                }
            }
        }

        output.flush()?;
        if self.options.sync_writes {
            output.sync_all()?;
        }

        Ok(hasher.finalize())
    }
}

#[cfg(unix)]
fn create_output_dir(path: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .mode(0o744)
        .create(path)
        .map_err(|e| output_dir_error(path, e))
}

#[cfg(not(unix))]
fn create_output_dir(path: &Path) -> Result<()> {
    fs::DirBuilder::new()
        .create(path)
        .map_err(|e| output_dir_error(path, e))
}

fn output_dir_error(path: &Path, e: std::io::Error) -> SplitError {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        SplitError::OutputExists(path.to_path_buf())
    } else {
        SplitError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn test_split_boot_and_system() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("split");
        let source_data = pattern(3072);
        let mut source = Cursor::new(source_data.clone());
        let snapshot = TableSnapshot::parse("boot:0:1024:0 system:1024:2048:0").unwrap();

        let report = Splitter::new()
            .split_to_new_dir(&snapshot, &mut source, &out)
            .unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.total_bytes(), 3072);

        let mut names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["00_boot.img", "01_system.img"]);

        assert_eq!(fs::read(out.join("00_boot.img")).unwrap(), &source_data[..1024]);
        assert_eq!(fs::read(out.join("01_system.img")).unwrap(), &source_data[1024..3072]);
    }

    #[test]
    fn test_split_with_gaps_and_remainders() {
        let dir = tempdir().unwrap();
        let source_data = pattern(10_000);
        let mut source = Cursor::new(source_data.clone());
        let snapshot =
            TableSnapshot::parse("a:100:2500:0 b:5000:0:0 c:3000:4097:1").unwrap();

        let splitter = Splitter::with_options(SplitOptions {
            chunk_size: 1000,
            ..Default::default()
        });
        splitter.split_into(&snapshot, &mut source, dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("00_a.img")).unwrap(), &source_data[100..2600]);
        assert!(fs::read(dir.path().join("01_b.img")).unwrap().is_empty());
        assert_eq!(fs::read(dir.path().join("02_c.img")).unwrap(), &source_data[3000..7097]);
    }

    #[test]
    fn test_truncated_source_is_short_read() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(2000));
        let snapshot =
            TableSnapshot::parse("boot:0:1024:0 system:1024:2048:0 data:3072:16:0").unwrap();

        let result = Splitter::new().split_into(&snapshot, &mut source, dir.path());
        match result {
            Err(SplitError::ShortRead {
                partition,
                offset,
                expected,
                actual,
            }) => {
                assert_eq!(partition, "system");
                assert_eq!(offset, 2000);
                assert_eq!(expected, 2048);
                assert_eq!(actual, 976);
            }
            other => panic!("expected ShortRead, got {:?}", other),
        }

        assert_eq!(fs::read(dir.path().join("00_boot.img")).unwrap().len(), 1024);
        assert!(!dir.path().join("01_system.img").exists());
        assert!(!dir.path().join("02_data.img").exists());
    }

    #[test]
    fn test_partition_beyond_source_end() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(512));
        let snapshot = TableSnapshot::parse("far:4096:16:0").unwrap();

        let result = Splitter::new().split_into(&snapshot, &mut source, dir.path());
        assert!(matches!(result, Err(SplitError::ShortRead { actual: 0, .. })));
        assert!(!dir.path().join("00_far.img").exists());
    }

    #[test]
    fn test_existing_output_dir_rejected() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(16));
        let snapshot = TableSnapshot::parse("a:0:16:0").unwrap();

        let result = Splitter::new().split_to_new_dir(&snapshot, &mut source, dir.path());
        assert!(matches!(result, Err(SplitError::OutputExists(_))));
    }

    #[test]
    fn test_existing_output_file_not_clobbered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("00_a.img"), b"keep").unwrap();
        let mut source = Cursor::new(pattern(16));
        let snapshot = TableSnapshot::parse("a:0:16:0").unwrap();

        let result = Splitter::new().split_into(&snapshot, &mut source, dir.path());
        assert!(matches!(result, Err(SplitError::Io(_))));
        assert_eq!(fs::read(dir.path().join("00_a.img")).unwrap(), b"keep");
    }

    #[test]
    fn test_path_like_names_rejected() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(16));

        for line in ["../evil:0:16:0", "a/b:0:16:0", "..:0:16:0"] {
            let snapshot = TableSnapshot::parse(line).unwrap();
            let result = Splitter::new().split_into(&snapshot, &mut source, dir.path());
            assert!(
                matches!(result, Err(SplitError::InvalidPartitionName(_))),
                "{} should be rejected",
                line
            );
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(16));
        let snapshot = TableSnapshot::parse("a:0:16:0").unwrap();
        let splitter = Splitter::with_options(SplitOptions {
            chunk_size: 0,
            ..Default::default()
        });

        assert!(matches!(
            splitter.split_into(&snapshot, &mut source, dir.path()),
            Err(SplitError::InvalidChunkSize(0))
        ));
    }

    #[test]
    fn test_digests_and_progress() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(b"Hello, World!".to_vec());
        let snapshot = TableSnapshot::parse("greeting:0:13:0").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let splitter = Splitter::with_options(SplitOptions {
            chunk_size: 4,
            hash_algorithms: vec![DigestAlgorithm::Md5],
            sync_writes: true,
            progress_interval: 4,
        })
        .with_progress(Arc::new(move |progress: &SplitProgress<'_>| {
            assert_eq!(progress.name, "greeting");
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        let report = splitter.split_into(&snapshot, &mut source, dir.path()).unwrap();

        // 3 full chunks of 4 bytes and 1 remainder byte
        assert_eq!(calls.load(Ordering::Relaxed), 4);
        assert_eq!(report.records[0].digests.len(), 1);
        assert_eq!(
            report.records[0].digests[0].hex,
            "65a8e27d8879283831b664bd8b7f0ad4"
        );
    }

    #[test]
    fn test_progress_is_throttled_to_milestones() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(13));
        let snapshot = TableSnapshot::parse("greeting:0:13:0").unwrap();

        let reported = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        let splitter = Splitter::with_options(SplitOptions {
            chunk_size: 4,
            progress_interval: 8,
            ..Default::default()
        })
        .with_progress(Arc::new(move |progress: &SplitProgress<'_>| {
            sink.lock().unwrap().push(progress.bytes_copied);
        }));

        splitter.split_into(&snapshot, &mut source, dir.path()).unwrap();

        // chunks end at 4, 8, 12, 13: the 8 byte mark and the final chunk
        assert_eq!(*reported.lock().unwrap(), [8, 13]);
    }

    #[test]
    fn test_default_options_report_each_partition_once() {
        let dir = tempdir().unwrap();
        let mut source = Cursor::new(pattern(300_000));
        let snapshot = TableSnapshot::parse("a:0:200000:0 b:200000:100000:0").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let splitter = Splitter::new().with_progress(Arc::new(move |_: &SplitProgress<'_>| {
            seen.fetch_add(1, Ordering::Relaxed);
        }));

        splitter.split_into(&snapshot, &mut source, dir.path()).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_split_from_file_source() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("emmc.img");
        let source_data = pattern(200_000);
        fs::write(&image, &source_data).unwrap();

        let snapshot = TableSnapshot::parse("bootloader:0:70000:0 env:131072:68928:0").unwrap();
        let out = dir.path().join("emmc.img_split");
        let mut source = File::open(&image).unwrap();
        Splitter::new()
            .split_to_new_dir(&snapshot, &mut source, &out)
            .unwrap();

        assert_eq!(fs::read(out.join("00_bootloader.img")).unwrap(), &source_data[..70000]);
        assert_eq!(fs::read(out.join("01_env.img")).unwrap(), &source_data[131072..200_000]);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name(0, "boot"), "00_boot.img");
        assert_eq!(output_file_name(7, "env"), "07_env.img");
        assert_eq!(output_file_name(123, "data"), "123_data.img");
    }
}
