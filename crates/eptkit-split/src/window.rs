//! Bounded read window over one partition of a dump

use std::io::{self, Read, Seek, SeekFrom};

/// A reader that exposes exactly one partition's byte range of a dump.
///
/// The underlying stream is positioned once on creation and then read
/// sequentially; reads past the partition end return EOF even when the dump
/// continues, so a caller can never copy bytes belonging to the next entry.
///
/// ```rust
/// use eptkit_split::PartitionWindow;
/// use std::io::{Cursor, Read};
///
/// let dump: Vec<u8> = (0..=255).collect();
/// let mut window = PartitionWindow::new(Cursor::new(dump), 16, 4).unwrap();
/// let mut bytes = Vec::new();
/// window.read_to_end(&mut bytes).unwrap();
/// assert_eq!(bytes, [16, 17, 18, 19]);
/// ```
pub struct PartitionWindow<R: Read> {
    inner: R,
    start: u64,
    length: u64,
    position: u64,
}

impl<R: Read + Seek> PartitionWindow<R> {
    /// Seek `inner` to `start` and bound reads to `length` bytes
    pub fn new(mut inner: R, start: u64, length: u64) -> io::Result<Self> {
        inner.seek(SeekFrom::Start(start))?;

        Ok(Self {
            inner,
            start,
            length,
            position: 0,
        })
    }
}

impl<R: Read> PartitionWindow<R> {
    /// Absolute offset of the window in the dump
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Bytes read through the window so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left before the window end
    pub fn remaining(&self) -> u64 {
        self.length.saturating_sub(self.position)
    }

    /// Absolute offset of the next byte to be read
    pub fn absolute_position(&self) -> u64 {
        self.start + self.position
    }

    /// Fill `buf` completely, stopping early only at EOF of the dump
    ///
    /// Returns the number of bytes read. Anything less than `buf.len()`
    /// means the dump ended (or the window did).
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Read for PartitionWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(0);
        }

        let to_read = (buf.len() as u64).min(remaining) as usize;
        let bytes_read = self.inner.read(&mut buf[..to_read])?;
        self.position += bytes_read as u64;

        Ok(bytes_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_window_bounds_reads() {
        let data: Vec<u8> = (0..100).collect();
        let mut window = PartitionWindow::new(Cursor::new(data), 20, 10).unwrap();
        let mut buf = [0u8; 32];

        let n = window.read(&mut buf).unwrap();
        assert_eq!(n, 10);
        assert_eq!(&buf[..n], &[20, 21, 22, 23, 24, 25, 26, 27, 28, 29]);
        assert_eq!(window.remaining(), 0);
        assert_eq!(window.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_fill_stops_at_dump_end() {
        let data: Vec<u8> = (0..100).collect();
        let mut window = PartitionWindow::new(Cursor::new(data), 90, 20).unwrap();
        let mut buf = [0u8; 20];

        let n = window.fill(&mut buf).unwrap();
        assert_eq!(n, 10);
        assert_eq!(window.position(), 10);
        assert_eq!(window.absolute_position(), 100);
        assert_eq!(window.start(), 90);
    }

    #[test]
    fn test_window_past_dump_end_is_empty() {
        let data = vec![0u8; 16];
        let mut window = PartitionWindow::new(Cursor::new(data), 64, 8).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(window.fill(&mut buf).unwrap(), 0);
    }

    /// Reader that hands out one byte per call
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    impl Seek for Trickle {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    #[test]
    fn test_fill_handles_partial_reads() {
        let data: Vec<u8> = (0..50).collect();
        let mut window = PartitionWindow::new(Trickle(Cursor::new(data)), 5, 10).unwrap();
        let mut buf = [0u8; 10];

        assert_eq!(window.fill(&mut buf).unwrap(), 10);
        assert_eq!(buf, [5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
    }
}
