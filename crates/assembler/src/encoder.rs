//! Pass 2: operand resolution and byte emission.
//!
//! Re-walks the placed statements with the completed symbol table,
//! resolves every operand (register index, label address, literal), and
//! encodes instructions through the shared ISA table and data elements at
//! their declared width, little-endian, into the sparse image. Any second
//! emission at an already-written address is an error, never a silent
//! overwrite.

use ferrite_core::{encode_instruction, MemoryImage, Operand};

use crate::parser::{DataValue, DataWidth, LineContent, ParsedOperand};
use crate::symbols::{Pass1, SourceRef, SymbolTable};

/// Pass-2 error with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    /// Offending source position.
    pub source: SourceRef,
    /// Kind of error.
    pub kind: EncodeErrorKind,
}

/// Classification of pass-2 errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// Reference to a label pass 1 never recorded.
    UndefinedSymbol(String),
    /// A byte was already emitted at this address.
    OverlappingEmission {
        /// The address covered twice.
        address: u32,
    },
    /// Operand shape did not match the descriptor (defensive; the parser
    /// validates this first).
    BadOperands(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            EncodeErrorKind::UndefinedSymbol(name) => {
                write!(f, "undefined symbol: {name}")
            }
            EncodeErrorKind::OverlappingEmission { address } => {
                write!(f, "overlapping emission at 0x{address:08X}")
            }
            EncodeErrorKind::BadOperands(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Runs pass 2, producing the final sparse byte image.
///
/// # Errors
///
/// Returns [`EncodeError`] for undefined symbols or duplicate emission
/// addresses; on error no image is returned.
pub fn encode_pass2(pass1: &Pass1) -> Result<MemoryImage, EncodeError> {
    let mut image = MemoryImage::new();

    for placed in &pass1.placed {
        let bytes = match &placed.line.content {
            LineContent::Instruction(instr) => {
                let mut resolved = Vec::with_capacity(instr.operands.len());
                for operand in &instr.operands {
                    resolved.push(resolve_operand(operand, &pass1.symbols, &placed.source)?);
                }
                encode_instruction(instr.descriptor, &resolved).map_err(|e| EncodeError {
                    source: placed.source.clone(),
                    kind: EncodeErrorKind::BadOperands(e.to_string()),
                })?
            }
            LineContent::Data { width, values } => {
                encode_data(*width, values, &pass1.symbols, &placed.source)?
            }
            LineContent::Poke { bytes, .. } => bytes.clone(),
            LineContent::Empty | LineContent::Segment(_) | LineContent::Org(_) => Vec::new(),
        };

        let mut addr = placed.address;
        for byte in bytes {
            if image.set(addr, byte).is_some() {
                return Err(EncodeError {
                    source: placed.source.clone(),
                    kind: EncodeErrorKind::OverlappingEmission { address: addr },
                });
            }
            addr = addr.wrapping_add(1);
        }
    }

    Ok(image)
}

fn resolve_operand(
    operand: &ParsedOperand,
    symbols: &SymbolTable,
    source: &SourceRef,
) -> Result<Operand, EncodeError> {
    match operand {
        ParsedOperand::Register(index) => Ok(Operand::reg(*index)),
        ParsedOperand::Immediate(value) => Ok(Operand::imm(*value)),
        ParsedOperand::Indirect(index) => Ok(Operand::ind(*index)),
        ParsedOperand::Label(name) => symbols
            .get(name)
            .map(|symbol| Operand::addr(symbol.address))
            .ok_or_else(|| EncodeError {
                source: source.clone(),
                kind: EncodeErrorKind::UndefinedSymbol(name.clone()),
            }),
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn encode_data(
    width: DataWidth,
    values: &[DataValue],
    symbols: &SymbolTable,
    source: &SourceRef,
) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::with_capacity(values.len() * width.size() as usize);

    for value in values {
        let raw: u32 = match value {
            DataValue::Literal(literal) => *literal as u32,
            DataValue::Float(float) => float.to_bits(),
            DataValue::Label(name) => {
                symbols
                    .get(name)
                    .map(|symbol| symbol.address)
                    .ok_or_else(|| EncodeError {
                        source: source.clone(),
                        kind: EncodeErrorKind::UndefinedSymbol(name.clone()),
                    })?
            }
        };

        // Little-endian at the declared element width; wider literals are
        // masked to the width, matching the directive's contract.
        match width {
            DataWidth::Byte => bytes.push((raw & 0xFF) as u8),
            DataWidth::Word => bytes.extend_from_slice(&((raw & 0xFFFF) as u16).to_le_bytes()),
            DataWidth::Dword | DataWidth::Float => bytes.extend_from_slice(&raw.to_le_bytes()),
        }
    }

    Ok(bytes)
}
