//! Size formatting and parsing
//!
//! Sizes print in one of the base-2 units `B K M G T P`, or `H` to pick the
//! largest unit that keeps the value below one step. Quota mode uses the
//! base-10 multiples of a 1024-byte kilobyte that HPC quota tools report, and
//! marks values with a trailing `q`.

use crate::error::ReportError;
use std::fmt;
use std::str::FromStr;

const SYMBOLS: [char; 6] = ['B', 'K', 'M', 'G', 'T', 'P'];

/// Output unit for sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeUnit {
    Bytes,
    #[default]
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
    /// Choose per value
    Human,
}

impl SizeUnit {
    fn index(self) -> Option<usize> {
        match self {
            SizeUnit::Bytes => Some(0),
            SizeUnit::Kilo => Some(1),
            SizeUnit::Mega => Some(2),
            SizeUnit::Giga => Some(3),
            SizeUnit::Tera => Some(4),
            SizeUnit::Peta => Some(5),
            SizeUnit::Human => None,
        }
    }
}

impl FromStr for SizeUnit {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B" => Ok(SizeUnit::Bytes),
            "K" => Ok(SizeUnit::Kilo),
            "M" => Ok(SizeUnit::Mega),
            "G" => Ok(SizeUnit::Giga),
            "T" => Ok(SizeUnit::Tera),
            "P" => Ok(SizeUnit::Peta),
            "H" => Ok(SizeUnit::Human),
            _ => Err(ReportError::UnsupportedUnit(s.to_string())),
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{}", SYMBOLS[i]),
            None => write!(f, "H"),
        }
    }
}

/// Bytes per unit step `index`
fn factor(index: usize, quota: bool) -> f64 {
    if quota {
        // 1024 * 1000^(i-1)
        match index {
            0 => 1.024,
            _ => 1024.0 * 1000f64.powi(index as i32 - 1),
        }
    } else {
        1024f64.powi(index as i32)
    }
}

/// Format `size` bytes in `unit`
pub fn format_size(size: u64, unit: SizeUnit, quota: bool) -> String {
    let (limit, suffix) = if quota { (1000.0, "q") } else { (1024.0, "") };
    let bytes = size as f64;

    let index = unit.index().unwrap_or_else(|| {
        (0..SYMBOLS.len())
            .find(|&i| bytes / factor(i, quota) < limit)
            .unwrap_or(SYMBOLS.len() - 1)
    });

    let value = bytes / factor(index, quota);
    let precision = if value < 10.0 { 1 } else { 0 };
    format!("{:.*}{}{}", precision, value, SYMBOLS[index], suffix)
}

/// Parse a size such as `17K` or `2T` into bytes. Units are base-2; a bare
/// integer is bytes.
pub fn parse_size(text: &str) -> Result<u64, ReportError> {
    let invalid = || ReportError::InvalidSize(text.to_string());
    let trimmed = text.trim();

    let (digits, multiplier) = match trimmed.chars().last() {
        Some(last) if last.is_ascii_alphabetic() => {
            let upper = last.to_ascii_uppercase();
            let index = SYMBOLS.iter().position(|&s| s == upper).ok_or_else(invalid)?;
            (&trimmed[..trimmed.len() - 1], 1u64 << (10 * index))
        }
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let count: u64 = digits.parse().map_err(|_| invalid())?;
    count.checked_mul(multiplier).ok_or_else(invalid)
}
