//! Sparse memory-image artifact shared by assembler and emulator.
//!
//! The assembled output is an ordered set of `(address, byte)` pairs, not
//! necessarily contiguous. It is persisted as hex text, one
//! `AAAAAAAA BB` pair per line, and must round-trip exactly.

use std::collections::BTreeMap;

/// Sparse `address -> byte` mapping covering every emitted byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: BTreeMap<u32, u8>,
}

impl MemoryImage {
    /// Creates an empty image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the byte at `addr`, returning the previous value if the
    /// address was already populated. Callers that forbid overwrites
    /// (pass 2) treat `Some` as an error.
    pub fn set(&mut self, addr: u32, value: u8) -> Option<u8> {
        self.bytes.insert(addr, value)
    }

    /// Reads the byte at `addr`, if present.
    #[must_use]
    pub fn get(&self, addr: u32) -> Option<u8> {
        self.bytes.get(&addr).copied()
    }

    /// Number of populated bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when no byte has been emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Highest populated address, if any.
    #[must_use]
    pub fn max_address(&self) -> Option<u32> {
        self.bytes.keys().next_back().copied()
    }

    /// Iterates populated `(address, byte)` pairs in ascending address
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(addr, byte)| (*addr, *byte))
    }

    /// Serializes to the hex-text persistence format.
    #[must_use]
    pub fn to_hex_text(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::with_capacity(self.bytes.len() * 12);
        for (addr, byte) in self.iter() {
            let _ = writeln!(out, "{addr:08X} {byte:02X}");
        }
        out
    }

    /// Parses the hex-text persistence format.
    ///
    /// Blank lines and `;` comments are tolerated; anything else must be
    /// an `ADDRESS BYTE` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ImageFormatError`] with the offending 1-indexed line for
    /// malformed pairs or duplicate addresses.
    pub fn from_hex_text(text: &str) -> Result<Self, ImageFormatError> {
        let mut image = Self::new();

        for (index, raw_line) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw_line
                .split(';')
                .next()
                .unwrap_or_default()
                .trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let (Some(addr_text), Some(byte_text), None) =
                (fields.next(), fields.next(), fields.next())
            else {
                return Err(ImageFormatError {
                    line: line_number,
                    kind: ImageFormatErrorKind::MalformedLine(line.to_string()),
                });
            };

            let addr = u32::from_str_radix(addr_text, 16).map_err(|_| ImageFormatError {
                line: line_number,
                kind: ImageFormatErrorKind::InvalidAddress(addr_text.to_string()),
            })?;
            let byte = u8::from_str_radix(byte_text, 16).map_err(|_| ImageFormatError {
                line: line_number,
                kind: ImageFormatErrorKind::InvalidByte(byte_text.to_string()),
            })?;

            if image.set(addr, byte).is_some() {
                return Err(ImageFormatError {
                    line: line_number,
                    kind: ImageFormatErrorKind::DuplicateAddress(addr),
                });
            }
        }

        Ok(image)
    }
}

/// Error while parsing a persisted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFormatError {
    /// 1-indexed line number in the persisted text.
    pub line: usize,
    /// Kind of format error.
    pub kind: ImageFormatErrorKind,
}

/// Classification of image format errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageFormatErrorKind {
    /// Line is not an `ADDRESS BYTE` pair.
    MalformedLine(String),
    /// Address field is not 32-bit hex.
    InvalidAddress(String),
    /// Byte field is not 8-bit hex.
    InvalidByte(String),
    /// The same address appears twice.
    DuplicateAddress(u32),
}

impl std::fmt::Display for ImageFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            ImageFormatErrorKind::MalformedLine(text) => {
                write!(f, "expected 'ADDRESS BYTE', found '{text}'")
            }
            ImageFormatErrorKind::InvalidAddress(text) => {
                write!(f, "invalid address '{text}'")
            }
            ImageFormatErrorKind::InvalidByte(text) => write!(f, "invalid byte '{text}'"),
            ImageFormatErrorKind::DuplicateAddress(addr) => {
                write!(f, "duplicate address 0x{addr:08X}")
            }
        }
    }
}

impl std::error::Error for ImageFormatError {}

#[cfg(test)]
mod tests {
    use super::{ImageFormatErrorKind, MemoryImage};

    #[test]
    fn empty_image_serializes_to_nothing() {
        let image = MemoryImage::new();
        assert!(image.is_empty());
        assert_eq!(image.to_hex_text(), "");
        assert_eq!(image.max_address(), None);
    }

    #[test]
    fn set_reports_previous_occupant() {
        let mut image = MemoryImage::new();
        assert_eq!(image.set(0x100, 0xAA), None);
        assert_eq!(image.set(0x100, 0xBB), Some(0xAA));
        assert_eq!(image.get(0x100), Some(0xBB));
    }

    #[test]
    fn iteration_is_address_ordered() {
        let mut image = MemoryImage::new();
        image.set(0x30, 3);
        image.set(0x10, 1);
        image.set(0x20, 2);
        let pairs: Vec<_> = image.iter().collect();
        assert_eq!(pairs, vec![(0x10, 1), (0x20, 2), (0x30, 3)]);
        assert_eq!(image.max_address(), Some(0x30));
    }

    #[test]
    fn hex_text_roundtrips_exactly() {
        let mut image = MemoryImage::new();
        image.set(0x0000_0000, 0x15);
        image.set(0x0000_4000, 0x48);
        image.set(0xFFFF_FFFF, 0x01);

        let text = image.to_hex_text();
        assert_eq!(text, "00000000 15\n00004000 48\nFFFFFFFF 01\n");

        let reparsed = MemoryImage::from_hex_text(&text).unwrap();
        assert_eq!(reparsed, image);
    }

    #[test]
    fn parse_tolerates_blank_lines_and_comments() {
        let text = "; boot sector\n\n00000000 15 ; HALT\n\n00000001 00\n";
        let image = MemoryImage::from_hex_text(text).unwrap();
        assert_eq!(image.len(), 2);
        assert_eq!(image.get(0), Some(0x15));
        assert_eq!(image.get(1), Some(0x00));
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        let err = MemoryImage::from_hex_text("00000000\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.kind, ImageFormatErrorKind::MalformedLine(_)));

        let err = MemoryImage::from_hex_text("00000000 AA BB\n").unwrap_err();
        assert!(matches!(err.kind, ImageFormatErrorKind::MalformedLine(_)));
    }

    #[test]
    fn parse_rejects_bad_fields() {
        let err = MemoryImage::from_hex_text("GARBAGE 00\n").unwrap_err();
        assert!(matches!(err.kind, ImageFormatErrorKind::InvalidAddress(_)));

        let err = MemoryImage::from_hex_text("00000000 100\n").unwrap_err();
        assert!(matches!(err.kind, ImageFormatErrorKind::InvalidByte(_)));
    }

    #[test]
    fn parse_rejects_duplicate_addresses() {
        let err = MemoryImage::from_hex_text("00000010 01\n00000010 02\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(matches!(
            err.kind,
            ImageFormatErrorKind::DuplicateAddress(0x10)
        ));
    }
}
