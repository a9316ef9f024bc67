//! Table snapshots: the whole EPT in one line

use crate::entry::{FieldStyle, PartitionEntry};
use crate::error::{Error, Result};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::str::FromStr;

/// An ordered partition table, as dumped by `ampart --mode esnapshot`
///
/// Entries keep their declaration order, which is the physical layout order
/// of the device. They are never re-sorted by offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    partitions: Vec<PartitionEntry>,
}

/// One row of the layout walk over a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRow<'a> {
    /// Unallocated bytes before the next partition
    Gap { size: u64 },
    /// Bytes of the next partition that start before the previous one ended
    Overlap { size: u64 },
    /// A declared partition
    Partition {
        index: usize,
        entry: &'a PartitionEntry,
    },
}

impl TableSnapshot {
    /// Build a snapshot from already parsed entries
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSnapshot`] if `partitions` is empty.
    pub fn new(partitions: Vec<PartitionEntry>) -> Result<Self> {
        if partitions.is_empty() {
            return Err(Error::malformed_snapshot("snapshot contains no partitions"));
        }
        Ok(Self { partitions })
    }

    /// Parse a line of decimal `name:offset:size:masks` groups
    pub fn parse(line: &str) -> Result<Self> {
        Self::parse_with(line, FieldStyle::Decimal)
    }

    /// Parse a line of groups whose offsets and sizes are written in `style`
    ///
    /// Groups are separated by spaces; repeated and trailing separators are
    /// ignored since `ampart` ends the line with one. Any bad group fails the
    /// whole line.
    pub fn parse_with(line: &str, style: FieldStyle) -> Result<Self> {
        let partitions = line
            .split_ascii_whitespace()
            .map(|group| PartitionEntry::parse_with(group, style))
            .collect::<Result<Vec<_>>>()?;

        if partitions.is_empty() {
            return Err(Error::malformed_snapshot("snapshot line is empty"));
        }

        Ok(Self { partitions })
    }

    /// Parse the first line of the partitioning tool's standard output
    pub fn from_tool_output(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .next()
            .ok_or_else(|| Error::malformed_snapshot("tool produced no output"))?;
        Self::parse(line)
    }

    /// Entries in declaration order
    pub fn partitions(&self) -> &[PartitionEntry] {
        &self.partitions
    }

    /// Number of partitions
    pub fn count(&self) -> usize {
        self.partitions.len()
    }

    /// Look up a partition by name, first match wins
    pub fn get(&self, name: &str) -> Option<&PartitionEntry> {
        self.partitions.iter().find(|entry| entry.name() == name)
    }

    /// Furthest end of any partition
    pub fn end(&self) -> u64 {
        self.partitions.iter().map(PartitionEntry::end).max().unwrap_or(0)
    }

    /// Walk the table in order, interleaving gap and overlap rows
    ///
    /// The running end always comes from the last entry's own extent, so an
    /// entry nested inside a larger predecessor yields an overlap and then the
    /// following entry is compared against the nested entry's end.
    pub fn layout(&self) -> Vec<LayoutRow<'_>> {
        let mut rows = Vec::with_capacity(self.partitions.len() * 2);
        let mut previous_end = 0u64;

        for (index, entry) in self.partitions.iter().enumerate() {
            if entry.offset() > previous_end {
                rows.push(LayoutRow::Gap {
                    size: entry.offset() - previous_end,
                });
            } else if entry.offset() < previous_end {
                rows.push(LayoutRow::Overlap {
                    size: previous_end - entry.offset(),
                });
            }
            rows.push(LayoutRow::Partition { index, entry });
            previous_end = entry.end();
        }

        rows
    }
}

impl fmt::Display for TableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.partitions.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}

impl FromStr for TableSnapshot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TableSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TableSnapshot", 2)?;
        state.serialize_field("count", &self.count())?;
        state.serialize_field("partitions", &self.partitions)?;
        state.end()
    }
}

/// The decimal, hex and human-readable dumps `ampart` prints together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSet {
    /// Canonical decimal snapshot
    pub decimal: TableSnapshot,
    /// Hexadecimal snapshot
    pub hex: TableSnapshot,
    /// Human-readable snapshot
    pub human: TableSnapshot,
}

impl SnapshotSet {
    /// Parse all three snapshot lines from the tool's standard output
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSnapshot`] unless there are exactly three
    /// non-empty lines, or if the hex line disagrees with the decimal one.
    pub fn from_tool_output(output: &str) -> Result<Self> {
        let lines: Vec<&str> = output.lines().filter(|line| !line.trim().is_empty()).collect();
        if lines.len() != 3 {
            return Err(Error::malformed_snapshot(format!(
                "expected 3 snapshot lines, got {}",
                lines.len()
            )));
        }

        let decimal = TableSnapshot::parse_with(lines[0], FieldStyle::Decimal)?;
        let hex = TableSnapshot::parse_with(lines[1], FieldStyle::Hex)?;
        let human = TableSnapshot::parse_with(lines[2], FieldStyle::Human)?;

        if decimal != hex {
            return Err(Error::malformed_snapshot(
                "decimal and hex snapshots describe different tables",
            ));
        }

        Ok(Self {
            decimal,
            hex,
            human,
        })
    }

    /// The snapshot used for reporting and splitting
    pub fn canonical(&self) -> &TableSnapshot {
        &self.decimal
    }
}
