//! Top-level assembly pipeline and session handling.
//!
//! A session wires the phases together: preprocessing (macro/conditional
//! expansion with includes spliced in), pass 1 (symbol collection), and
//! pass 2 (encoding into the sparse image). Sessions are order-sensitive:
//! later inputs see macros and labels defined by earlier ones, and all
//! session state is local to the `Assembler` value.

use std::path::Path;

use ferrite_core::MemoryImage;

use crate::encoder::{encode_pass2, EncodeError};
use crate::parser::{parse_line, ParseError};
use crate::preprocess::{PreprocessError, Preprocessor, SourceLine};
use crate::symbols::{assign_addresses, ParsedStatement, SourceRef, SymbolError};

/// Assembly error with the offending source location.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleError {
    /// Kind of error.
    pub kind: AssembleErrorKind,
    /// Source location, when one is known.
    pub location: Option<SourceRef>,
}

/// Classification of assembly errors by failing phase.
#[derive(Debug, Clone, PartialEq)]
pub enum AssembleErrorKind {
    /// Preprocessing failed.
    Preprocess(PreprocessError),
    /// A line failed to parse.
    Parse(ParseError),
    /// Pass 1 failed.
    Symbol(SymbolError),
    /// Pass 2 failed.
    Encode(EncodeError),
}

impl std::fmt::Display for AssembleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            AssembleErrorKind::Preprocess(e) => write!(f, "{e}"),
            AssembleErrorKind::Parse(e) => write!(f, "{e}"),
            AssembleErrorKind::Symbol(e) => write!(f, "{e}"),
            AssembleErrorKind::Encode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<PreprocessError> for AssembleError {
    fn from(e: PreprocessError) -> Self {
        let location = Some(SourceRef {
            file: e.file.clone(),
            line: e.line,
        });
        Self {
            kind: AssembleErrorKind::Preprocess(e),
            location,
        }
    }
}

impl From<SymbolError> for AssembleError {
    fn from(e: SymbolError) -> Self {
        let location = Some(e.source.clone());
        Self {
            kind: AssembleErrorKind::Symbol(e),
            location,
        }
    }
}

impl From<EncodeError> for AssembleError {
    fn from(e: EncodeError) -> Self {
        let location = Some(e.source.clone());
        Self {
            kind: AssembleErrorKind::Encode(e),
            location,
        }
    }
}

/// An assembly session accumulating inputs in order.
#[derive(Debug, Default)]
pub struct Assembler {
    preprocessor: Preprocessor,
    lines: Vec<SourceLine>,
}

impl Assembler {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefines a macro visible to every subsequent input.
    pub fn define(&mut self, name: &str, value: &str) {
        self.preprocessor.define(name, value);
    }

    /// Preprocesses a source file and appends its lines to the session.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] when preprocessing fails (unreadable or
    /// cyclic includes, bad conditionals).
    pub fn add_file(&mut self, path: &Path) -> Result<(), AssembleError> {
        let lines = self.preprocessor.expand_file(path)?;
        self.lines.extend(lines);
        Ok(())
    }

    /// Preprocesses in-memory source text and appends it to the session.
    /// `name` labels diagnostics; relative includes resolve against the
    /// current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] when preprocessing fails.
    pub fn add_source(&mut self, name: &str, text: &str) -> Result<(), AssembleError> {
        let lines = self
            .preprocessor
            .expand_text(Path::new(name), text, None)?;
        self.lines.extend(lines);
        Ok(())
    }

    /// Runs both passes over everything added so far and returns the
    /// final sparse byte image. On any error the session aborts and no
    /// partial image is produced.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError`] carrying the failing phase's error and
    /// the offending source location.
    pub fn assemble(&self) -> Result<MemoryImage, AssembleError> {
        let mut statements = Vec::with_capacity(self.lines.len());
        for source_line in &self.lines {
            let line = parse_line(&source_line.text, source_line.line).map_err(|e| {
                AssembleError {
                    kind: AssembleErrorKind::Parse(e),
                    location: Some(SourceRef {
                        file: source_line.file.clone(),
                        line: source_line.line,
                    }),
                }
            })?;
            statements.push(ParsedStatement {
                line,
                source: SourceRef {
                    file: source_line.file.clone(),
                    line: source_line.line,
                },
            });
        }

        let pass1 = assign_addresses(statements)?;
        let image = encode_pass2(&pass1)?;
        Ok(image)
    }
}

/// Assembles one source file in a fresh session.
///
/// # Errors
///
/// Returns [`AssembleError`] when any phase fails.
pub fn assemble_file(path: &Path) -> Result<MemoryImage, AssembleError> {
    let mut session = Assembler::new();
    session.add_file(path)?;
    session.assemble()
}

/// Assembles in-memory source text in a fresh session (tests and
/// embedding hosts).
///
/// # Errors
///
/// Returns [`AssembleError`] when any phase fails.
pub fn assemble_str(text: &str) -> Result<MemoryImage, AssembleError> {
    let mut session = Assembler::new();
    session.add_source("<input>", text)?;
    session.assemble()
}

/// Formats an error location as `file:line` for reports.
#[must_use]
pub fn format_location(location: &SourceRef) -> String {
    format!("{}:{}", location.file.display(), location.line)
}

#[cfg(test)]
mod tests {
    use super::{assemble_str, AssembleErrorKind, Assembler};

    #[test]
    fn assemble_simple_program() {
        let image = assemble_str("MOV %R0, 1\nHALT\n").unwrap();
        assert_eq!(image.len(), 12);
        assert_eq!(image.get(0), Some(0x25));
        assert_eq!(image.get(11), Some(0x15));
    }

    #[test]
    fn empty_source_yields_empty_image() {
        let image = assemble_str("").unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn macros_reach_the_parser() {
        let image = assemble_str("#define VALUE 0x42\nMOV %R0, VALUE\nHALT\n").unwrap();
        assert_eq!(image.get(7), Some(0x42));
    }

    #[test]
    fn parse_errors_carry_their_location() {
        let err = assemble_str("HALT\nFROB %R0\n").unwrap_err();
        let location = err.location.expect("location attached");
        assert_eq!(location.line, 2);
        assert!(matches!(err.kind, AssembleErrorKind::Parse(_)));
    }

    #[test]
    fn undefined_symbol_produces_no_image() {
        let err = assemble_str("JUMP missing\n").unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::Encode(_)));
    }

    #[test]
    fn duplicate_label_is_a_symbol_error() {
        let err = assemble_str("a:\na:\n").unwrap_err();
        assert!(matches!(err.kind, AssembleErrorKind::Symbol(_)));
    }

    #[test]
    fn later_sources_see_earlier_definitions() {
        let mut session = Assembler::new();
        session
            .add_source("defs.fasm", "#define GREETING 72\nmessage: db GREETING\n")
            .unwrap();
        session
            .add_source("main.fasm", ".text\nLOAD %R0, message\nHALT\n")
            .unwrap();
        let image = session.assemble().unwrap();
        // `message` lands at the text origin because the first source
        // never switched segments.
        assert_eq!(image.get(0), Some(72));
    }

    #[test]
    fn host_defines_are_visible_to_all_inputs() {
        let mut session = Assembler::new();
        session.define("FEATURE", "");
        session
            .add_source("main.fasm", "#ifdef FEATURE\nHALT\n#endif\n")
            .unwrap();
        let image = session.assemble().unwrap();
        assert_eq!(image.len(), 1);
    }

    #[test]
    fn assembling_twice_yields_identical_images() {
        let text = "start: MOV %R0, 5\nJUMP start\n.static\nvalue: dd 9\n";
        let first = assemble_str(text).unwrap();
        let second = assemble_str(text).unwrap();
        assert_eq!(first, second);
    }
}
