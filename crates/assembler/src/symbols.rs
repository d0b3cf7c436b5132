//! Pass 1: per-segment address assignment and symbol collection.
//!
//! Walks the parsed stream keeping one location counter per segment,
//! computes every statement's encoded size from the shared ISA table (or
//! element count x width for data), records label definitions, and
//! detects overlapping emission ranges. No bytes are produced.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::parser::{Line, LineContent, SegmentKind};

/// Source position attached to statements, symbols, and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Originating file.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
}

/// A parsed statement with its source position (pass-1 input).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    /// The parsed line.
    pub line: Line,
    /// Where it came from.
    pub source: SourceRef,
}

/// A statement with its assigned emission address (pass-1 output).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedStatement {
    /// Address where this statement's bytes begin.
    pub address: u32,
    /// Encoded size in bytes (0 for non-emitting statements).
    pub size: u32,
    /// The parsed line.
    pub line: Line,
    /// Where it came from.
    pub source: SourceRef,
}

/// A label with its resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Absolute address the label resolves to.
    pub address: u32,
    /// Segment the label was defined in.
    pub segment: SegmentKind,
    /// Defining source position.
    pub source: SourceRef,
}

/// Completed symbol table: immutable after pass 1.
pub type SymbolTable = HashMap<String, Symbol>;

/// Pass-1 result consumed by the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass1 {
    /// Statements with assigned addresses, in source order.
    pub placed: Vec<PlacedStatement>,
    /// All label definitions.
    pub symbols: SymbolTable,
}

/// Pass-1 error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolError {
    /// Offending source position.
    pub source: SourceRef,
    /// Kind of error.
    pub kind: SymbolErrorKind,
}

/// Classification of pass-1 errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolErrorKind {
    /// Label defined twice.
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_line: usize,
    },
    /// A location counter ran past the 32-bit address space.
    AddressOverflow {
        /// Counter value before the overflowing statement.
        address: u32,
    },
    /// Two emission ranges cover the same address.
    OverlappingEmission {
        /// First address covered twice.
        address: u32,
    },
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            SymbolErrorKind::DuplicateLabel { name, first_line } => {
                write!(
                    f,
                    "duplicate label '{name}' (first defined at line {first_line})"
                )
            }
            SymbolErrorKind::AddressOverflow { address } => {
                write!(f, "location counter overflow past 0x{address:08X}")
            }
            SymbolErrorKind::OverlappingEmission { address } => {
                write!(f, "overlapping emission at 0x{address:08X}")
            }
        }
    }
}

impl std::error::Error for SymbolError {}

fn statement_size(content: &LineContent) -> u32 {
    match content {
        LineContent::Instruction(instr) => instr.descriptor.encoded_size(),
        LineContent::Data { width, values } => {
            width.size().saturating_mul(u32::try_from(values.len()).unwrap_or(u32::MAX))
        }
        LineContent::Poke { bytes, .. } => u32::try_from(bytes.len()).unwrap_or(u32::MAX),
        LineContent::Empty | LineContent::Segment(_) | LineContent::Org(_) => 0,
    }
}

/// Runs pass 1 over the parsed stream.
///
/// The initial segment is `.text`; each segment's counter starts at its
/// fixed origin and `.org` repositions the active one.
///
/// # Errors
///
/// Returns [`SymbolError`] for duplicate labels, counter overflow, and
/// overlapping emission ranges (including cross-segment collisions).
pub fn assign_addresses(statements: Vec<ParsedStatement>) -> Result<Pass1, SymbolError> {
    let mut counters: HashMap<SegmentKind, u32> = HashMap::new();
    let mut active = SegmentKind::Text;
    let mut symbols = SymbolTable::new();
    let mut placed = Vec::with_capacity(statements.len());
    // (start, size, index into `placed`) for every emitting statement.
    let mut emissions: Vec<(u32, u32, usize)> = Vec::new();

    for statement in statements {
        let ParsedStatement { line, source } = statement;
        let counter = *counters.entry(active).or_insert_with(|| active.origin());

        if let Some(name) = &line.label {
            if let Some(existing) = symbols.get(name) {
                return Err(SymbolError {
                    source,
                    kind: SymbolErrorKind::DuplicateLabel {
                        name: name.clone(),
                        first_line: existing.source.line,
                    },
                });
            }
            symbols.insert(
                name.clone(),
                Symbol {
                    address: counter,
                    segment: active,
                    source: source.clone(),
                },
            );
        }

        let size = statement_size(&line.content);
        let address = match &line.content {
            LineContent::Segment(kind) => {
                active = *kind;
                *counters.entry(active).or_insert_with(|| active.origin())
            }
            LineContent::Org(target) => {
                counters.insert(active, *target);
                *target
            }
            LineContent::Poke { addr, .. } => *addr,
            LineContent::Empty | LineContent::Data { .. } | LineContent::Instruction(_) => counter,
        };

        if matches!(
            line.content,
            LineContent::Data { .. } | LineContent::Instruction(_)
        ) {
            let Some(next) = counter.checked_add(size) else {
                return Err(SymbolError {
                    source,
                    kind: SymbolErrorKind::AddressOverflow { address: counter },
                });
            };
            counters.insert(active, next);
        }

        if size > 0 {
            emissions.push((address, size, placed.len()));
        }

        placed.push(PlacedStatement {
            address,
            size,
            line,
            source,
        });
    }

    check_overlaps(&emissions, &placed)?;

    Ok(Pass1 { placed, symbols })
}

fn check_overlaps(
    emissions: &[(u32, u32, usize)],
    placed: &[PlacedStatement],
) -> Result<(), SymbolError> {
    let mut sorted: Vec<&(u32, u32, usize)> = emissions.iter().collect();
    sorted.sort_by_key(|(start, _, index)| (*start, *index));

    for window in sorted.windows(2) {
        let (first_start, first_size, _) = *window[0];
        let (second_start, _, second_index) = *window[1];
        if first_start.saturating_add(first_size) > second_start {
            return Err(SymbolError {
                source: placed[second_index].source.clone(),
                kind: SymbolErrorKind::OverlappingEmission {
                    address: second_start,
                },
            });
        }
    }

    Ok(())
}
