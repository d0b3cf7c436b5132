//! Shared Ferrite-32 instruction-set table.
//!
//! Single source of truth for mnemonics, opcodes, operand shapes, and
//! encoded sizes. Both the assembler and the emulator consume this table,
//! so encode and decode can never disagree.

/// Maximum operand count across all instruction descriptors.
pub const MAX_OPERANDS: usize = 2;

/// Encoded byte width of one operand (`kind` byte plus 32-bit value).
pub const OPERAND_BYTES: u32 = 5;

/// Operand kinds as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum OperandKind {
    /// General-purpose register index (`%Rn`).
    Reg = 1,
    /// Immediate value (integer bits, or IEEE-754 binary32 bits in float
    /// contexts).
    Imm = 2,
    /// Direct absolute address (label references resolve to this).
    Addr = 3,
    /// Indirect address held in a register (`[%Rn]`, value is the register
    /// index).
    Ind = 4,
}

impl OperandKind {
    /// Decodes a wire kind byte.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Reg),
            2 => Some(Self::Imm),
            3 => Some(Self::Addr),
            4 => Some(Self::Ind),
            _ => None,
        }
    }

    /// Returns the wire byte for this kind.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Operand classes accepted by a descriptor slot.
///
/// A class is the assemble-time contract: supplying an operand whose kind
/// is outside the slot's class is an operand-type error, and an encoded
/// instruction carrying such a kind is an illegal encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandClass {
    /// Exactly a register.
    Reg,
    /// A register or an immediate.
    Value,
    /// A memory operand: direct address, register-indirect, or a literal
    /// address immediate.
    Mem,
    /// A control-flow target: label address or literal address.
    Target,
    /// An I/O port number: immediate or register.
    Port,
    /// An immediate only (interrupt numbers).
    Imm,
}

impl OperandClass {
    /// Returns `true` when `kind` is acceptable for this slot.
    #[must_use]
    pub const fn allows(self, kind: OperandKind) -> bool {
        match self {
            Self::Reg => matches!(kind, OperandKind::Reg),
            Self::Value | Self::Port => matches!(kind, OperandKind::Reg | OperandKind::Imm),
            Self::Mem => matches!(kind, OperandKind::Addr | OperandKind::Ind | OperandKind::Imm),
            Self::Target => matches!(kind, OperandKind::Addr | OperandKind::Imm),
            Self::Imm => matches!(kind, OperandKind::Imm),
        }
    }
}

/// Semantic identity of an instruction, independent of its wire opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Opcode {
    Add,
    Sub,
    Fadd,
    Fsub,
    Mul,
    Div,
    Fmul,
    Fdiv,
    Load,
    Store,
    Cmp,
    Fcmp,
    Jump,
    Jz,
    Jnz,
    Fmov,
    Halt,
    PimAdd,
    PimSub,
    PimMul,
    PimDiv,
    PimFadd,
    PimFsub,
    PimFmul,
    PimFdiv,
    Int,
    Iret,
    In,
    Out,
    Call,
    Ret,
    Mov,
}

/// One instruction descriptor: mnemonic, wire opcode, and operand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDescriptor {
    /// Canonical upper-case mnemonic.
    pub mnemonic: &'static str,
    /// Wire opcode byte.
    pub opcode: u8,
    /// Semantic identity used by the execution engine.
    pub op: Opcode,
    /// Ordered operand classes; length is the fixed arity.
    pub operands: &'static [OperandClass],
}

impl InstructionDescriptor {
    /// Fixed operand count for this instruction.
    #[must_use]
    pub const fn arity(&self) -> usize {
        self.operands.len()
    }

    /// Encoded size class in bytes: opcode byte plus one kind/value pair
    /// per operand.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn encoded_size(&self) -> u32 {
        1 + OPERAND_BYTES * self.operands.len() as u32
    }
}

use OperandClass as C;

/// The complete Ferrite-32 instruction table.
///
/// Opcode values retain the historical numbering; unassigned values decode
/// as unknown opcodes.
pub const INSTRUCTION_TABLE: &[InstructionDescriptor] = &[
    InstructionDescriptor {
        mnemonic: "ADD",
        opcode: 0x01,
        op: Opcode::Add,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "SUB",
        opcode: 0x02,
        op: Opcode::Sub,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "FADD",
        opcode: 0x03,
        op: Opcode::Fadd,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "FSUB",
        opcode: 0x04,
        op: Opcode::Fsub,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "MUL",
        opcode: 0x07,
        op: Opcode::Mul,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "DIV",
        opcode: 0x08,
        op: Opcode::Div,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "FMUL",
        opcode: 0x09,
        op: Opcode::Fmul,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "FDIV",
        opcode: 0x0A,
        op: Opcode::Fdiv,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "LOAD",
        opcode: 0x0D,
        op: Opcode::Load,
        operands: &[C::Reg, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "STORE",
        opcode: 0x0E,
        op: Opcode::Store,
        operands: &[C::Reg, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "CMP",
        opcode: 0x0F,
        op: Opcode::Cmp,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "FCMP",
        opcode: 0x10,
        op: Opcode::Fcmp,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "JUMP",
        opcode: 0x11,
        op: Opcode::Jump,
        operands: &[C::Target],
    },
    InstructionDescriptor {
        mnemonic: "JZ",
        opcode: 0x12,
        op: Opcode::Jz,
        operands: &[C::Target],
    },
    InstructionDescriptor {
        mnemonic: "JNZ",
        opcode: 0x13,
        op: Opcode::Jnz,
        operands: &[C::Target],
    },
    InstructionDescriptor {
        mnemonic: "FMOV",
        opcode: 0x14,
        op: Opcode::Fmov,
        operands: &[C::Reg, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "HALT",
        opcode: 0x15,
        op: Opcode::Halt,
        operands: &[],
    },
    InstructionDescriptor {
        mnemonic: "PIM_ADD",
        opcode: 0x16,
        op: Opcode::PimAdd,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_SUB",
        opcode: 0x17,
        op: Opcode::PimSub,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_MUL",
        opcode: 0x18,
        op: Opcode::PimMul,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_DIV",
        opcode: 0x19,
        op: Opcode::PimDiv,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_FADD",
        opcode: 0x1A,
        op: Opcode::PimFadd,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_FSUB",
        opcode: 0x1B,
        op: Opcode::PimFsub,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_FMUL",
        opcode: 0x1C,
        op: Opcode::PimFmul,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "PIM_FDIV",
        opcode: 0x1D,
        op: Opcode::PimFdiv,
        operands: &[C::Mem, C::Mem],
    },
    InstructionDescriptor {
        mnemonic: "INT",
        opcode: 0x1E,
        op: Opcode::Int,
        operands: &[C::Imm],
    },
    InstructionDescriptor {
        mnemonic: "IRET",
        opcode: 0x1F,
        op: Opcode::Iret,
        operands: &[],
    },
    InstructionDescriptor {
        mnemonic: "IN",
        opcode: 0x20,
        op: Opcode::In,
        operands: &[C::Reg, C::Port],
    },
    InstructionDescriptor {
        mnemonic: "OUT",
        opcode: 0x21,
        op: Opcode::Out,
        operands: &[C::Port, C::Value],
    },
    InstructionDescriptor {
        mnemonic: "CALL",
        opcode: 0x23,
        op: Opcode::Call,
        operands: &[C::Target],
    },
    InstructionDescriptor {
        mnemonic: "RET",
        opcode: 0x24,
        op: Opcode::Ret,
        operands: &[],
    },
    InstructionDescriptor {
        mnemonic: "MOV",
        opcode: 0x25,
        op: Opcode::Mov,
        operands: &[C::Reg, C::Value],
    },
];

/// Resolves a mnemonic to its descriptor. Matching is ASCII
/// case-insensitive.
#[must_use]
pub fn lookup_mnemonic(name: &str) -> Option<&'static InstructionDescriptor> {
    INSTRUCTION_TABLE
        .iter()
        .find(|entry| entry.mnemonic.eq_ignore_ascii_case(name))
}

/// Resolves a wire opcode byte to its descriptor.
///
/// `None` means unassigned/illegal by definition.
#[must_use]
pub fn lookup_opcode(opcode: u8) -> Option<&'static InstructionDescriptor> {
    INSTRUCTION_TABLE
        .iter()
        .find(|entry| entry.opcode == opcode)
}

/// A concrete operand: wire kind plus 32-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operand {
    /// Wire kind tag.
    pub kind: OperandKind,
    /// Raw 32-bit value (register index, immediate bits, or address).
    pub value: u32,
}

impl Operand {
    /// Register operand.
    #[must_use]
    pub const fn reg(index: u32) -> Self {
        Self {
            kind: OperandKind::Reg,
            value: index,
        }
    }

    /// Immediate operand.
    #[must_use]
    pub const fn imm(value: u32) -> Self {
        Self {
            kind: OperandKind::Imm,
            value,
        }
    }

    /// Direct-address operand.
    #[must_use]
    pub const fn addr(address: u32) -> Self {
        Self {
            kind: OperandKind::Addr,
            value: address,
        }
    }

    /// Register-indirect operand.
    #[must_use]
    pub const fn ind(index: u32) -> Self {
        Self {
            kind: OperandKind::Ind,
            value: index,
        }
    }
}

/// Error from [`encode_instruction`] when operands do not fit the
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsaEncodeError {
    /// Operand count differs from the descriptor arity.
    ArityMismatch {
        /// Arity the descriptor requires.
        expected: usize,
        /// Operand count supplied.
        found: usize,
    },
    /// An operand kind falls outside its slot's class.
    KindNotAllowed {
        /// Zero-based operand index.
        index: usize,
        /// The offending kind.
        kind: OperandKind,
    },
}

impl std::fmt::Display for IsaEncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArityMismatch { expected, found } => {
                write!(f, "expected {expected} operand(s), found {found}")
            }
            Self::KindNotAllowed { index, kind } => {
                write!(f, "operand {} may not be {kind:?}", index + 1)
            }
        }
    }
}

impl std::error::Error for IsaEncodeError {}

/// Encodes an instruction to its wire bytes: the opcode byte followed by a
/// `kind` byte and little-endian 32-bit value per operand.
///
/// # Errors
///
/// Returns [`IsaEncodeError`] when the operand count or an operand kind
/// does not match the descriptor.
pub fn encode_instruction(
    descriptor: &InstructionDescriptor,
    operands: &[Operand],
) -> Result<Vec<u8>, IsaEncodeError> {
    if operands.len() != descriptor.arity() {
        return Err(IsaEncodeError::ArityMismatch {
            expected: descriptor.arity(),
            found: operands.len(),
        });
    }

    let mut bytes = Vec::with_capacity(descriptor.encoded_size() as usize);
    bytes.push(descriptor.opcode);

    for (index, (operand, class)) in operands.iter().zip(descriptor.operands).enumerate() {
        if !class.allows(operand.kind) {
            return Err(IsaEncodeError::KindNotAllowed {
                index,
                kind: operand.kind,
            });
        }
        bytes.push(operand.kind.as_u8());
        bytes.extend_from_slice(&operand.value.to_le_bytes());
    }

    Ok(bytes)
}
