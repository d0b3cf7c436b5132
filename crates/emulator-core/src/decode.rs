//! Table-driven instruction fetch/decode.
//!
//! Fetch reads the opcode byte at `pc`, sizes the instruction from its ISA
//! descriptor, then reads one `kind`/`value` pair per operand. Every byte
//! consumed is bounds-checked and every operand kind is validated against
//! the descriptor before execution sees the instruction.

use crate::fault::FaultCause;
use crate::isa::{lookup_opcode, InstructionDescriptor, Operand, OperandKind, MAX_OPERANDS};
use crate::memory::Memory;

/// A fully decoded instruction ready for execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// The ISA descriptor this instruction was decoded against.
    pub descriptor: &'static InstructionDescriptor,
    /// Decoded operands; slots beyond the descriptor arity are `None`.
    pub operands: [Option<Operand>; MAX_OPERANDS],
}

impl DecodedInstruction {
    /// Returns operand `index`, which must be within the descriptor arity.
    #[must_use]
    pub const fn operand(&self, index: usize) -> Option<Operand> {
        if index < MAX_OPERANDS {
            self.operands[index]
        } else {
            None
        }
    }

    /// Encoded size in bytes (the descriptor's size class).
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.descriptor.encoded_size()
    }

    /// Re-encodes this instruction to its wire bytes.
    ///
    /// Decoding is lossless, so `decode(encode(i)) == i` for every legal
    /// instruction; the round-trip property tests rely on this.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size() as usize);
        bytes.push(self.descriptor.opcode);
        for slot in self.operands.iter().take(self.descriptor.arity()) {
            if let Some(operand) = slot {
                bytes.push(operand.kind.as_u8());
                bytes.extend_from_slice(&operand.value.to_le_bytes());
            }
        }
        bytes
    }
}

/// Decodes the instruction at `pc`.
///
/// # Errors
///
/// - [`FaultCause::OutOfBounds`] when the opcode or an operand extends
///   past memory capacity.
/// - [`FaultCause::UnknownOpcode`] when the opcode byte is unassigned.
/// - [`FaultCause::IllegalOperand`] when an operand kind byte is invalid
///   or not allowed by the descriptor's operand class.
pub fn decode(memory: &Memory, pc: u32) -> Result<DecodedInstruction, FaultCause> {
    let opcode = memory.read_byte(pc)?;
    let descriptor = lookup_opcode(opcode).ok_or(FaultCause::UnknownOpcode(opcode))?;

    let mut operands = [None; MAX_OPERANDS];
    let mut cursor = pc.wrapping_add(1);

    for (index, class) in descriptor.operands.iter().enumerate() {
        let kind_byte = memory.read_byte(cursor)?;
        let kind = OperandKind::from_u8(kind_byte).ok_or(FaultCause::IllegalOperand {
            opcode,
            kind: kind_byte,
        })?;
        if !class.allows(kind) {
            return Err(FaultCause::IllegalOperand {
                opcode,
                kind: kind_byte,
            });
        }
        let value = memory.read_dword(cursor.wrapping_add(1))?;
        operands[index] = Some(Operand { kind, value });
        cursor = cursor.wrapping_add(5);
    }

    Ok(DecodedInstruction {
        descriptor,
        operands,
    })
}
