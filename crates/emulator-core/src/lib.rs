//! Core library for the Ferrite-32 CPU: the shared instruction-set table,
//! the sparse memory-image artifact, and the emulator.
//!
//! The assembler crate depends on this one for [`isa`] and [`image`], so
//! the two sides of the toolchain can never disagree on encoding.

/// Shared instruction-set table consumed by assembler and emulator.
pub mod isa;
pub use isa::{
    encode_instruction, lookup_mnemonic, lookup_opcode, InstructionDescriptor, IsaEncodeError,
    Opcode, Operand, OperandClass, OperandKind, INSTRUCTION_TABLE, MAX_OPERANDS, OPERAND_BYTES,
};

/// Sparse address-to-byte image with exact hex-text round-trip.
pub mod image;
pub use image::{ImageFormatError, ImageFormatErrorKind, MemoryImage};

/// Fault taxonomy for emulator-time failures.
pub mod fault;
pub use fault::{Fault, FaultCause};

/// Register file, condition flags, and run-state machine.
pub mod state;
pub use state::{Flags, RegisterFile, RunState, REGISTER_COUNT, STACK_REGISTER};

/// Flat byte-addressable memory with typed little-endian accessors.
pub mod memory;
pub use memory::{Memory, DEFAULT_MEMORY_BYTES, WORD_BYTES};

/// Table-driven instruction fetch/decode.
pub mod decode;
pub use decode::{decode, DecodedInstruction};

/// Interrupt vector table and its external description format.
pub mod interrupt;
pub use interrupt::{parse_table, InterruptTable, VectorParseError, VectorParseErrorKind};

/// Memory-mapped and port-mapped device model.
pub mod devices;
pub use devices::{
    AddressRange, BlockStorage, CharDisplay, Device, Keyboard, PortDevice, RandomSource,
    BLOCK_BYTES, BOOT_LOAD_BASE, DISPLAY_BASE, DISPLAY_WINDOW_BYTES, KEYBOARD_PORT, RNG_PORT,
    STORAGE_DATA_PORT, STORAGE_SELECT_PORT,
};

/// The execution engine.
pub mod machine;
pub use machine::Machine;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
