use thiserror::Error;

/// Conditions that transition a run into the terminal `Faulted` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultCause {
    /// Fetched opcode byte has no descriptor in the ISA table.
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    /// Encoded operand carries a kind byte that is invalid or disallowed
    /// by the instruction's descriptor.
    #[error("illegal operand kind 0x{kind:02X} for opcode 0x{opcode:02X}")]
    IllegalOperand {
        /// Opcode of the instruction being decoded.
        opcode: u8,
        /// Offending wire kind byte.
        kind: u8,
    },
    /// Memory access (fetch, load, or store) outside configured capacity.
    #[error("memory access out of bounds at 0x{addr:08X}")]
    OutOfBounds {
        /// First out-of-range byte address.
        addr: u32,
    },
    /// Register index outside `0..=15`.
    #[error("invalid register index {0}")]
    InvalidRegister(u32),
    /// Integer or float division with a zero divisor.
    #[error("division by zero")]
    DivideByZero,
    /// `INT` referenced a vector with no configured handler.
    #[error("unhandled interrupt vector {0}")]
    UnhandledInterrupt(u32),
    /// `IN`/`OUT` addressed a port no device claims.
    #[error("unmapped I/O port 0x{0:02X}")]
    UnmappedPort(u32),
}

/// A latched fault: the failing program counter plus its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Fault {
    /// Address of the instruction that faulted.
    pub pc: u32,
    /// Why the instruction faulted.
    pub cause: FaultCause,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fault at 0x{:08X}: {}", self.pc, self.cause)
    }
}
