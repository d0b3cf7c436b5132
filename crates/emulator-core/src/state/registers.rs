use crate::fault::FaultCause;

/// Number of architecturally visible general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Register conventionally reserved as the stack pointer (`%R15`).
pub const STACK_REGISTER: u32 = 15;

/// The 16 x 32-bit general-purpose register file.
///
/// Float instructions reinterpret register bits as IEEE-754 binary32;
/// there is no separate float register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    regs: [u32; REGISTER_COUNT],
}

impl RegisterFile {
    /// Reads register `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::InvalidRegister`] outside `0..=15`.
    pub fn get(&self, index: u32) -> Result<u32, FaultCause> {
        self.regs
            .get(index as usize)
            .copied()
            .ok_or(FaultCause::InvalidRegister(index))
    }

    /// Writes register `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::InvalidRegister`] outside `0..=15`.
    pub fn set(&mut self, index: u32, value: u32) -> Result<(), FaultCause> {
        match self.regs.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FaultCause::InvalidRegister(index)),
        }
    }

    /// Reads the conventional stack pointer (`%R15`).
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.regs[STACK_REGISTER as usize]
    }

    /// Writes the conventional stack pointer (`%R15`).
    pub const fn set_sp(&mut self, value: u32) {
        self.regs[STACK_REGISTER as usize] = value;
    }

    /// Snapshot of all registers in index order.
    #[must_use]
    pub const fn snapshot(&self) -> [u32; REGISTER_COUNT] {
        self.regs
    }
}

/// Condition flags: zero, negative, carry, overflow.
///
/// Updated only by arithmetic/compare instructions, never by data moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Flags {
    /// Result was zero.
    pub zero: bool,
    /// Result bit 31 was set.
    pub negative: bool,
    /// Unsigned carry/borrow out.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

impl Flags {
    const ZERO_BIT: u32 = 1;
    const NEGATIVE_BIT: u32 = 1 << 1;
    const CARRY_BIT: u32 = 1 << 2;
    const OVERFLOW_BIT: u32 = 1 << 3;

    /// Applies the standard update for an integer arithmetic result.
    pub const fn update_arith(&mut self, result: u32, carry: bool, overflow: bool) {
        self.zero = result == 0;
        self.negative = (result >> 31) != 0;
        self.carry = carry;
        self.overflow = overflow;
    }

    /// Applies the float-compare update: Z from equality, N from ordering;
    /// carry and overflow are cleared.
    pub const fn update_float_cmp(&mut self, equal: bool, less: bool) {
        self.zero = equal;
        self.negative = less;
        self.carry = false;
        self.overflow = false;
    }

    /// Packs flags into a machine word for interrupt frames.
    #[must_use]
    pub const fn pack(self) -> u32 {
        let mut word = 0;
        if self.zero {
            word |= Self::ZERO_BIT;
        }
        if self.negative {
            word |= Self::NEGATIVE_BIT;
        }
        if self.carry {
            word |= Self::CARRY_BIT;
        }
        if self.overflow {
            word |= Self::OVERFLOW_BIT;
        }
        word
    }

    /// Restores flags from a packed machine word; undefined bits are
    /// ignored.
    #[must_use]
    pub const fn unpack(word: u32) -> Self {
        Self {
            zero: word & Self::ZERO_BIT != 0,
            negative: word & Self::NEGATIVE_BIT != 0,
            carry: word & Self::CARRY_BIT != 0,
            overflow: word & Self::OVERFLOW_BIT != 0,
        }
    }
}
