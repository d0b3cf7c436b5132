//! Interrupt vector table construction.
//!
//! The table maps interrupt numbers to handler entry addresses. It is
//! populated from an external description before execution starts and is
//! immutable for the duration of a run; `INT` with an unconfigured vector
//! faults.

use std::collections::BTreeMap;

/// Immutable interrupt-number to handler-address mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterruptTable {
    vectors: BTreeMap<u32, u32>,
}

impl InterruptTable {
    /// Creates an empty table (every `INT` will fault).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(vector, handler)` pairs. Later duplicates
    /// win, mirroring a description file read top to bottom.
    #[must_use]
    pub fn from_pairs<I: IntoIterator<Item = (u32, u32)>>(pairs: I) -> Self {
        Self {
            vectors: pairs.into_iter().collect(),
        }
    }

    /// Handler entry address for `vector`, if configured.
    #[must_use]
    pub fn handler(&self, vector: u32) -> Option<u32> {
        self.vectors.get(&vector).copied()
    }

    /// Number of configured vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns `true` when no vector is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Error while parsing an interrupt-vector description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorParseError {
    /// 1-indexed line number in the description.
    pub line: usize,
    /// Kind of parse error.
    pub kind: VectorParseErrorKind,
}

/// Classification of vector description errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorParseErrorKind {
    /// Line is not a `VECTOR ADDRESS` pair.
    MalformedLine(String),
    /// Vector field is not a valid 32-bit number.
    InvalidVector(String),
    /// Address field is not a valid 32-bit value.
    InvalidAddress(String),
}

impl std::fmt::Display for VectorParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            VectorParseErrorKind::MalformedLine(text) => {
                write!(f, "expected 'VECTOR ADDRESS', found '{text}'")
            }
            VectorParseErrorKind::InvalidVector(text) => {
                write!(f, "invalid interrupt vector '{text}'")
            }
            VectorParseErrorKind::InvalidAddress(text) => {
                write!(f, "invalid handler address '{text}'")
            }
        }
    }
}

impl std::error::Error for VectorParseError {}

fn parse_number(text: &str) -> Option<u32> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u32::from_str_radix(hex, 16).ok())
}

/// Parses an interrupt-vector description: one `VECTOR ADDRESS` pair per
/// line (decimal or `0x` hex), `;` comments and blank lines tolerated.
///
/// # Errors
///
/// Returns [`VectorParseError`] with the offending line for malformed
/// entries.
pub fn parse_table(text: &str) -> Result<InterruptTable, VectorParseError> {
    let mut pairs = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.split(';').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(vector_text), Some(addr_text), None) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(VectorParseError {
                line: line_number,
                kind: VectorParseErrorKind::MalformedLine(line.to_string()),
            });
        };

        let vector = parse_number(vector_text).ok_or_else(|| VectorParseError {
            line: line_number,
            kind: VectorParseErrorKind::InvalidVector(vector_text.to_string()),
        })?;
        let addr = parse_number(addr_text).ok_or_else(|| VectorParseError {
            line: line_number,
            kind: VectorParseErrorKind::InvalidAddress(addr_text.to_string()),
        })?;

        pairs.push((vector, addr));
    }

    Ok(InterruptTable::from_pairs(pairs))
}
