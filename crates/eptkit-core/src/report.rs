//! Fixed-column text report of a snapshot

use crate::error::Result;
use crate::size::size_human_readable;
use crate::snapshot::{LayoutRow, TableSnapshot};
use std::io::Write;

/// Width of the separator rule
pub const RULE_WIDTH: usize = 102;

const HEADER: &str = "id|name           |            start| (human)|            size| (human)|            end| (human)|masks";

/// Renders snapshots as a table with gap and overlap markers
///
/// ```text
/// 2 partitions in the EPT
/// ======================================================================================================
/// id|name           |            start| (human)|            size| (human)|            end| (human)|masks
/// ======================================================================================================
///    (gap)                                                   1000    4.00K
///  0 boot                         1000    4.00K              400    1.00K             1400    5.00K  0
/// ...
/// ```
pub struct TableReporter<W: Write> {
    sink: W,
}

impl<W: Write> TableReporter<W> {
    /// Create a reporter writing to `sink`
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Write the full report for `snapshot`
    pub fn report(&mut self, snapshot: &TableSnapshot) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.sink, "{} partitions in the EPT", snapshot.count())?;
        writeln!(self.sink, "{}", rule)?;
        writeln!(self.sink, "{}", HEADER)?;
        writeln!(self.sink, "{}", rule)?;

        for row in snapshot.layout() {
            match row {
                LayoutRow::Gap { size } => self.synthetic_row("(gap)", size)?,
                LayoutRow::Overlap { size } => self.synthetic_row("(overlap)", size)?,
                LayoutRow::Partition { index, entry } => {
                    writeln!(
                        self.sink,
                        "{:2} {:16} {:16x} {} {:16x} {} {:16x} {} {:2}",
                        index,
                        entry.name(),
                        entry.offset(),
                        size_human_readable(entry.offset())?,
                        entry.size(),
                        size_human_readable(entry.size())?,
                        entry.end(),
                        size_human_readable(entry.end())?,
                        entry.masks()
                    )?;
                }
            }
        }

        writeln!(self.sink, "{}", rule)?;
        self.sink.flush()?;
        Ok(())
    }

    fn synthetic_row(&mut self, label: &str, size: u64) -> Result<()> {
        writeln!(
            self.sink,
            "   {:<43}{:16x} {}",
            label,
            size,
            size_human_readable(size)?
        )?;
        Ok(())
    }

    /// Consume the reporter and return the sink
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Render a snapshot report into a string
pub fn render(snapshot: &TableSnapshot) -> Result<String> {
    let mut reporter = TableReporter::new(Vec::new());
    reporter.report(snapshot)?;
    Ok(String::from_utf8_lossy(&reporter.into_inner()).into_owned())
}
