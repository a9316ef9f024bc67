//! Human-readable byte sizes
//!
//! Sizes are scaled by 1024 through the suffixes `B K M G T P E Z Y` and
//! rendered as a 7 character wide, two decimal number followed by the suffix,
//! e.g. `1024` becomes `"   1.00K"`.

use crate::error::{Error, Result};

/// Suffixes in ascending order of magnitude
pub const SUFFIXES: [char; 9] = ['B', 'K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

/// Width of the numeric part, excluding the suffix
pub const HUMAN_WIDTH: usize = 7;

/// Format a byte count as a fixed-width human-readable string
///
/// Accepts anything that widens to `u128` so that sums of 64-bit offsets
/// can be formatted without wrapping.
///
/// # Errors
///
/// Returns [`Error::UnrepresentableSize`] if the value is still 1024 or more
/// after scaling through every suffix.
pub fn size_human_readable(size: impl Into<u128>) -> Result<String> {
    let raw = size.into();
    let mut value = raw as f64;

    for suffix in SUFFIXES {
        if value < 1024.0 {
            return Ok(format!("{:width$.2}{}", value, suffix, width = HUMAN_WIDTH));
        }
        value /= 1024.0;
    }

    Err(Error::UnrepresentableSize(raw))
}

/// Parse a human-readable size back into bytes
///
/// Accepts plain integers (`"4096"`), integers or decimals with a
/// case-insensitive suffix (`"4M"`, `"1.50k"`), and the padded output of
/// [`size_human_readable`]. Decimal inputs are rounded to the nearest byte.
pub fn from_human_readable(literal: &str) -> Result<u64> {
    let trimmed = literal.trim();
    let last = trimmed
        .chars()
        .last()
        .ok_or_else(|| Error::invalid_size_literal("empty size literal"))?;

    let (number, exponent) = if last.is_ascii_digit() {
        (trimmed, 0u32)
    } else {
        let position = SUFFIXES
            .iter()
            .position(|suffix| suffix.eq_ignore_ascii_case(&last))
            .ok_or_else(|| {
                Error::invalid_size_literal(format!("unknown suffix '{}' in '{}'", last, trimmed))
            })?;
        (&trimmed[..trimmed.len() - last.len_utf8()], position as u32)
    };

    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(Error::invalid_size_literal(format!(
            "'{}' is not a non-negative number",
            trimmed
        )));
    }

    if let Ok(whole) = number.parse::<u64>() {
        return 1024u64
            .checked_pow(exponent)
            .and_then(|multiplier| whole.checked_mul(multiplier))
            .ok_or_else(|| {
                Error::invalid_size_literal(format!("'{}' overflows a 64-bit byte count", trimmed))
            });
    }

    let fractional: f64 = number
        .parse()
        .map_err(|_| Error::invalid_size_literal(format!("'{}' is not a number", trimmed)))?;
    let bytes = (fractional * 1024f64.powi(exponent as i32)).round();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(Error::invalid_size_literal(format!(
            "'{}' overflows a 64-bit byte count",
            trimmed
        )));
    }

    Ok(bytes as u64)
}
