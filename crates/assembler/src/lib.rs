//! Two-pass assembler for the Ferrite-32 CPU.
//!
//! The pipeline: preprocessing (`#define`/`#include`/`#ifdef` expansion),
//! pass 1 (per-segment address assignment and symbol collection), and
//! pass 2 (encoding through the shared ISA table into a sparse byte
//! image). Instruction encoding comes from `ferrite-core`, so assembler
//! and emulator can never disagree.

/// Macro and conditional expansion.
pub mod preprocess;
pub use preprocess::{PreprocessError, PreprocessErrorKind, Preprocessor, SourceLine};

/// Line parser for the assembly grammar.
pub mod parser;
pub use parser::{
    parse_line, DataValue, DataWidth, Line, LineContent, ParseError, ParseErrorKind,
    ParsedInstruction, ParsedOperand, SegmentKind,
};

/// Pass 1: address assignment and the symbol table.
pub mod symbols;
pub use symbols::{
    assign_addresses, ParsedStatement, Pass1, PlacedStatement, SourceRef, Symbol, SymbolError,
    SymbolErrorKind, SymbolTable,
};

/// Pass 2: operand resolution and byte emission.
pub mod encoder;
pub use encoder::{encode_pass2, EncodeError, EncodeErrorKind};

/// Session pipeline tying the phases together.
pub mod assembler;
pub use assembler::{
    assemble_file, assemble_str, format_location, AssembleError, AssembleErrorKind, Assembler,
};

#[cfg(test)]
use tempfile as _;
