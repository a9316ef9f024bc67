//! Partition entries and their `name:offset:size:masks` encoding

use crate::error::{Error, Result};
use crate::size::from_human_readable;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Separator between the fields of one entry
pub const FIELD_SEPARATOR: char = ':';

/// Number of fields in an encoded entry
pub const FIELD_COUNT: usize = 4;

/// Notation used for the offset and size fields of an encoded entry
///
/// `ampart` can dump the same table three ways. Masks are always decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStyle {
    /// Base-10 byte counts, the canonical form
    #[default]
    Decimal,
    /// Base-16 byte counts, `0x` prefix optional
    Hex,
    /// Byte counts with an optional `K/M/G/...` suffix
    Human,
}

impl FieldStyle {
    /// Parse one offset or size field in this notation
    fn parse_bytes(self, field: &str) -> Option<u64> {
        match self {
            FieldStyle::Decimal => parse_decimal(field),
            FieldStyle::Hex => {
                let digits = field
                    .strip_prefix("0x")
                    .or_else(|| field.strip_prefix("0X"))
                    .unwrap_or(field);
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    return None;
                }
                u64::from_str_radix(digits, 16).ok()
            }
            FieldStyle::Human => from_human_readable(field).ok(),
        }
    }
}

/// `str::parse` also accepts a leading `+`, which the encoding does not
fn parse_decimal<T: FromStr>(field: &str) -> Option<T> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// A single partition as reported in the EPT
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PartitionEntry {
    name: String,
    offset: u64,
    size: u64,
    masks: u32,
}

impl PartitionEntry {
    /// Create a new entry
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEntry`] if the name contains the field
    /// separator or whitespace, or if `offset + size` does not fit in a 64-bit
    /// byte offset.
    pub fn new(name: impl Into<String>, offset: u64, size: u64, masks: u32) -> Result<Self> {
        let name = name.into();
        if name.contains(FIELD_SEPARATOR) || name.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(Error::malformed_entry(
                format!("{}:{}:{}:{}", name, offset, size, masks),
                format!("name {:?} contains '{}' or whitespace", name, FIELD_SEPARATOR),
            ));
        }
        if offset.checked_add(size).is_none() {
            return Err(Error::malformed_entry(
                format!("{}:{}:{}:{}", name, offset, size, masks),
                "offset + size overflows a 64-bit byte offset",
            ));
        }

        Ok(Self {
            name,
            offset,
            size,
            masks,
        })
    }

    /// Parse a decimal `name:offset:size:masks` group
    pub fn parse(group: &str) -> Result<Self> {
        Self::parse_with(group, FieldStyle::Decimal)
    }

    /// Parse a `name:offset:size:masks` group with offsets and sizes in `style`
    pub fn parse_with(group: &str, style: FieldStyle) -> Result<Self> {
        let fields: Vec<&str> = group.split(FIELD_SEPARATOR).collect();
        if fields.len() != FIELD_COUNT {
            return Err(Error::malformed_entry(
                group,
                format!("expected {} fields, got {}", FIELD_COUNT, fields.len()),
            ));
        }

        let offset = style.parse_bytes(fields[1]).ok_or_else(|| {
            Error::malformed_entry(group, format!("offset '{}' is not a valid integer", fields[1]))
        })?;
        let size = style.parse_bytes(fields[2]).ok_or_else(|| {
            Error::malformed_entry(group, format!("size '{}' is not a valid integer", fields[2]))
        })?;
        let masks = parse_decimal::<u32>(fields[3]).ok_or_else(|| {
            Error::malformed_entry(group, format!("masks '{}' is not a valid integer", fields[3]))
        })?;

        Self::new(fields[0], offset, size, masks)
    }

    /// Partition name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset from the start of the device in bytes
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Opaque mask flags, passed through from the partitioning tool
    pub fn masks(&self) -> u32 {
        self.masks
    }

    /// First byte past the partition
    pub fn end(&self) -> u64 {
        // Checked at construction
        self.offset + self.size
    }
}

impl fmt::Display for PartitionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.offset,
            self.size,
            self.masks,
            sep = FIELD_SEPARATOR
        )
    }
}

impl FromStr for PartitionEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_entry() {
        let entry = PartitionEntry::parse("bootloader:0:4194304:0").unwrap();
        assert_eq!(entry.name(), "bootloader");
        assert_eq!(entry.offset(), 0);
        assert_eq!(entry.size(), 4_194_304);
        assert_eq!(entry.masks(), 0);
        assert_eq!(entry.end(), 4_194_304);
    }

    #[test]
    fn test_wrong_field_count() {
        for group in ["bad", "a:0:100", "a:0:100:0:1", ""] {
            assert!(
                matches!(PartitionEntry::parse(group), Err(Error::MalformedEntry { .. })),
                "{:?} should be rejected",
                group
            );
        }
    }

    #[test]
    fn test_non_integer_fields() {
        for group in ["a:x:100:0", "a:0:1.5:0", "a:0:100:-1", "a:+1:100:0", "a::100:0"] {
            assert!(
                matches!(PartitionEntry::parse(group), Err(Error::MalformedEntry { .. })),
                "{:?} should be rejected",
                group
            );
        }
    }

    #[test]
    fn test_unencodable_names_rejected() {
        for name in ["a:b", "a b", "a\tb", "boot "] {
            assert!(
                matches!(PartitionEntry::new(name, 0, 16, 0), Err(Error::MalformedEntry { .. })),
                "{:?} should be rejected",
                name
            );
        }
        assert!(matches!(
            PartitionEntry::parse_with("a b:0:16:0", FieldStyle::Decimal),
            Err(Error::MalformedEntry { .. })
        ));
    }

    #[test]
    fn test_new_entries_survive_snapshot_encoding() {
        let entry = PartitionEntry::new("boot-a_1.x", 0, 16, 0).unwrap();
        let snapshot = crate::TableSnapshot::new(vec![entry.clone(), entry]).unwrap();
        let reparsed: crate::TableSnapshot = snapshot.to_string().parse().unwrap();
        assert_eq!(reparsed, snapshot);
    }

    #[test]
    fn test_end_overflow_rejected() {
        let group = format!("data:{}:1:0", u64::MAX);
        assert!(matches!(
            PartitionEntry::parse(&group),
            Err(Error::MalformedEntry { .. })
        ));
        assert!(PartitionEntry::new("data", u64::MAX - 1, 1, 0).is_ok());
    }

    #[test]
    fn test_display_round_trip() {
        let entries = [
            PartitionEntry::new("env", 0x2_4000_00, 0x80_0000, 0).unwrap(),
            PartitionEntry::new("data", 0x6_2400_000, u64::MAX - 0x6_2400_000, 4).unwrap(),
            PartitionEntry::new("", 0, 0, u32::MAX).unwrap(),
        ];

        for entry in entries {
            let reparsed: PartitionEntry = entry.to_string().parse().unwrap();
            assert_eq!(reparsed, entry);
        }
    }

    #[test]
    fn test_hex_style() {
        let entry = PartitionEntry::parse_with("logo:0x2c00000:0x800000:1", FieldStyle::Hex).unwrap();
        assert_eq!(entry.offset(), 0x2c0_0000);
        assert_eq!(entry.size(), 0x80_0000);
        assert_eq!(entry.masks(), 1);

        let bare = PartitionEntry::parse_with("logo:2c00000:800000:1", FieldStyle::Hex).unwrap();
        assert_eq!(bare, entry);

        assert!(PartitionEntry::parse_with("logo:0x:800000:1", FieldStyle::Hex).is_err());
    }

    #[test]
    fn test_human_style() {
        let entry = PartitionEntry::parse_with("cache:76M:512M:2", FieldStyle::Human).unwrap();
        assert_eq!(entry.offset(), 76 * 1024 * 1024);
        assert_eq!(entry.size(), 512 * 1024 * 1024);
        assert_eq!(entry.masks(), 2);

        assert!(PartitionEntry::parse_with("cache:76Q:512M:2", FieldStyle::Human).is_err());
    }
}
