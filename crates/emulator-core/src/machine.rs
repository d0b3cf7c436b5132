//! The Ferrite-32 execution engine.
//!
//! One `Machine` owns its memory, registers, interrupt table, and devices
//! exclusively; hosts wanting concurrent runs instantiate separate
//! machines. `step`/`run` are plain synchronous calls, and the caller
//! distinguishes `Halted` (success) from `Faulted` (failure) from
//! `Running` (budget exhausted) by inspecting the returned state.

use crate::decode::{decode, DecodedInstruction};
use crate::devices::{BlockStorage, Device, PortDevice, BOOT_LOAD_BASE};
use crate::fault::{Fault, FaultCause};
use crate::image::MemoryImage;
use crate::interrupt::InterruptTable;
use crate::isa::{Opcode, Operand, OperandKind};
use crate::memory::{Memory, WORD_BYTES};
use crate::state::{Flags, RegisterFile, RunState};

/// Binary integer ALU operations sharing one flags contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IntOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary float operations; only division can fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// A complete Ferrite-32 machine instance.
pub struct Machine {
    memory: Memory,
    registers: RegisterFile,
    flags: Flags,
    pc: u32,
    run_state: RunState,
    interrupts: InterruptTable,
    devices: Vec<Box<dyn Device>>,
    ports: Vec<Box<dyn PortDevice>>,
    steps: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// Creates a machine with default memory capacity and no devices.
    #[must_use]
    pub fn new() -> Self {
        Self::with_memory(Memory::default())
    }

    /// Creates a machine with `capacity` bytes of memory.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_memory(Memory::new(capacity))
    }

    fn with_memory(memory: Memory) -> Self {
        Self {
            memory,
            registers: RegisterFile::default(),
            flags: Flags::default(),
            pc: 0,
            run_state: RunState::Ready,
            interrupts: InterruptTable::new(),
            devices: Vec::new(),
            ports: Vec::new(),
            steps: 0,
        }
    }

    /// Copies an assembled image into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::OutOfBounds`] when the image exceeds memory
    /// capacity; nothing is loaded in that case.
    pub fn load_image(&mut self, image: &MemoryImage) -> Result<(), FaultCause> {
        self.memory.load_image(image)
    }

    /// Installs the interrupt vector table. The table is read-only for
    /// the remainder of the run.
    pub fn set_interrupt_table(&mut self, table: InterruptTable) {
        self.interrupts = table;
    }

    /// Registers a memory-mapped device.
    pub fn attach_device(&mut self, device: Box<dyn Device>) {
        self.devices.push(device);
    }

    /// Registers a port-mapped device.
    pub fn attach_port_device(&mut self, device: Box<dyn PortDevice>) {
        self.ports.push(device);
    }

    /// Boot path: copies the designated boot block into memory at the
    /// fixed base, then keeps the storage reachable through its ports.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::OutOfBounds`] when the boot block does not
    /// fit in memory.
    pub fn boot_from(&mut self, storage: BlockStorage) -> Result<(), FaultCause> {
        self.memory.load_block(BOOT_LOAD_BASE, storage.boot_block())?;
        self.ports.push(Box::new(storage));
        Ok(())
    }

    /// Points the program counter at the execution start address.
    pub const fn set_start_address(&mut self, addr: u32) {
        self.pc = addr;
    }

    /// Current program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Current condition flags.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Current execution state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Instructions executed so far.
    #[must_use]
    pub const fn steps_executed(&self) -> u64 {
        self.steps
    }

    /// The register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Reads a register by index.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::InvalidRegister`] outside `0..=15`.
    pub fn register(&self, index: u32) -> Result<u32, FaultCause> {
        self.registers.get(index)
    }

    /// Writes a register by index (host-side setup).
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::InvalidRegister`] outside `0..=15`.
    pub fn set_register(&mut self, index: u32, value: u32) -> Result<(), FaultCause> {
        self.registers.set(index, value)
    }

    /// The memory backing store.
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Accumulated transcript of the first attached device that produces
    /// textual output (the display).
    #[must_use]
    pub fn display_transcript(&self) -> Option<&str> {
        self.devices.iter().find_map(|device| device.output_text())
    }

    /// Dispatches interrupt `vector` as if raised between instructions:
    /// pushes the current pc and flags, then enters the handler.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCause::UnhandledInterrupt`] for an unconfigured
    /// vector, or a stack fault from the context pushes.
    pub fn interrupt(&mut self, vector: u32) -> Result<(), FaultCause> {
        let handler = self.dispatch_interrupt(vector, self.pc)?;
        self.pc = handler;
        Ok(())
    }

    /// Executes a single instruction and returns the resulting state.
    pub fn step(&mut self) -> RunState {
        if !self.run_state.can_step() {
            return self.run_state;
        }
        self.run_state = RunState::Running;

        let pc = self.pc;
        match self.execute_one() {
            Ok(()) => self.steps += 1,
            Err(cause) => self.run_state = RunState::Faulted(Fault { pc, cause }),
        }
        self.run_state
    }

    /// Runs until halt, fault, or budget exhaustion. With no budget the
    /// loop only ends at a terminal state.
    pub fn run(&mut self, budget: Option<u64>) -> RunState {
        let mut remaining = budget;
        while self.run_state.can_step() {
            if let Some(left) = remaining.as_mut() {
                if *left == 0 {
                    break;
                }
                *left -= 1;
            }
            self.step();
        }
        self.run_state
    }

    #[allow(clippy::too_many_lines)]
    fn execute_one(&mut self) -> Result<(), FaultCause> {
        let instr = decode(&self.memory, self.pc)?;
        let next_pc = self.pc.wrapping_add(instr.size());
        let mut new_pc = next_pc;

        match instr.descriptor.op {
            Opcode::Mov | Opcode::Fmov => {
                let value = self.value_operand(&instr, 1)?;
                self.write_reg_operand(&instr, 0, value)?;
            }
            Opcode::Add => self.int_alu(&instr, IntOp::Add)?,
            Opcode::Sub => self.int_alu(&instr, IntOp::Sub)?,
            Opcode::Mul => self.int_alu(&instr, IntOp::Mul)?,
            Opcode::Div => self.int_alu(&instr, IntOp::Div)?,
            Opcode::Fadd => self.float_alu(&instr, FloatOp::Add)?,
            Opcode::Fsub => self.float_alu(&instr, FloatOp::Sub)?,
            Opcode::Fmul => self.float_alu(&instr, FloatOp::Mul)?,
            Opcode::Fdiv => self.float_alu(&instr, FloatOp::Div)?,
            Opcode::Cmp => {
                let a = self.reg_operand_value(&instr, 0)?;
                let b = self.value_operand(&instr, 1)?;
                let (result, carry, overflow) = int_arith(IntOp::Sub, a, b)?;
                self.flags.update_arith(result, carry, overflow);
            }
            Opcode::Fcmp => {
                let a = f32::from_bits(self.reg_operand_value(&instr, 0)?);
                let b = f32::from_bits(self.value_operand(&instr, 1)?);
                self.flags.update_float_cmp(a == b, a < b);
            }
            Opcode::Load => {
                let addr = self.effective_address(&instr, 1)?;
                let value = self.bus_read_dword(addr)?;
                self.write_reg_operand(&instr, 0, value)?;
            }
            Opcode::Store => {
                let value = self.reg_operand_value(&instr, 0)?;
                let addr = self.effective_address(&instr, 1)?;
                self.bus_write_dword(addr, value)?;
            }
            Opcode::PimAdd => self.pim_int(&instr, IntOp::Add)?,
            Opcode::PimSub => self.pim_int(&instr, IntOp::Sub)?,
            Opcode::PimMul => self.pim_int(&instr, IntOp::Mul)?,
            Opcode::PimDiv => self.pim_int(&instr, IntOp::Div)?,
            Opcode::PimFadd => self.pim_float(&instr, FloatOp::Add)?,
            Opcode::PimFsub => self.pim_float(&instr, FloatOp::Sub)?,
            Opcode::PimFmul => self.pim_float(&instr, FloatOp::Mul)?,
            Opcode::PimFdiv => self.pim_float(&instr, FloatOp::Div)?,
            Opcode::Jump => new_pc = self.target_operand(&instr)?,
            Opcode::Jz => {
                if self.flags.zero {
                    new_pc = self.target_operand(&instr)?;
                }
            }
            Opcode::Jnz => {
                if !self.flags.zero {
                    new_pc = self.target_operand(&instr)?;
                }
            }
            Opcode::Call => {
                let target = self.target_operand(&instr)?;
                self.push_word(next_pc)?;
                new_pc = target;
            }
            Opcode::Ret => new_pc = self.pop_word()?,
            Opcode::Int => {
                let vector = self.operand(&instr, 0)?.value;
                new_pc = self.dispatch_interrupt(vector, next_pc)?;
            }
            Opcode::Iret => {
                let flags_word = self.pop_word()?;
                new_pc = self.pop_word()?;
                self.flags = Flags::unpack(flags_word);
            }
            Opcode::In => {
                let port = self.value_operand(&instr, 1)?;
                let value = self.port_input(port)?;
                self.write_reg_operand(&instr, 0, value)?;
            }
            Opcode::Out => {
                let port = self.value_operand(&instr, 0)?;
                let value = self.value_operand(&instr, 1)?;
                self.port_output(port, value)?;
            }
            Opcode::Halt => self.run_state = RunState::Halted,
        }

        self.pc = new_pc;
        Ok(())
    }

    fn operand(&self, instr: &DecodedInstruction, index: usize) -> Result<Operand, FaultCause> {
        instr.operand(index).ok_or(FaultCause::IllegalOperand {
            opcode: instr.descriptor.opcode,
            kind: 0,
        })
    }

    /// Value of a `Value`/`Port`-class operand: register contents or the
    /// immediate itself.
    fn value_operand(&self, instr: &DecodedInstruction, index: usize) -> Result<u32, FaultCause> {
        let operand = self.operand(instr, index)?;
        match operand.kind {
            OperandKind::Reg => self.registers.get(operand.value),
            OperandKind::Imm => Ok(operand.value),
            OperandKind::Addr | OperandKind::Ind => Err(FaultCause::IllegalOperand {
                opcode: instr.descriptor.opcode,
                kind: operand.kind.as_u8(),
            }),
        }
    }

    fn reg_operand_value(
        &self,
        instr: &DecodedInstruction,
        index: usize,
    ) -> Result<u32, FaultCause> {
        let operand = self.operand(instr, index)?;
        match operand.kind {
            OperandKind::Reg => self.registers.get(operand.value),
            _ => Err(FaultCause::IllegalOperand {
                opcode: instr.descriptor.opcode,
                kind: operand.kind.as_u8(),
            }),
        }
    }

    fn write_reg_operand(
        &mut self,
        instr: &DecodedInstruction,
        index: usize,
        value: u32,
    ) -> Result<(), FaultCause> {
        let operand = self.operand(instr, index)?;
        match operand.kind {
            OperandKind::Reg => self.registers.set(operand.value, value),
            _ => Err(FaultCause::IllegalOperand {
                opcode: instr.descriptor.opcode,
                kind: operand.kind.as_u8(),
            }),
        }
    }

    /// Effective address of a `Mem`-class operand.
    fn effective_address(
        &self,
        instr: &DecodedInstruction,
        index: usize,
    ) -> Result<u32, FaultCause> {
        let operand = self.operand(instr, index)?;
        match operand.kind {
            OperandKind::Addr | OperandKind::Imm => Ok(operand.value),
            OperandKind::Ind => self.registers.get(operand.value),
            OperandKind::Reg => Err(FaultCause::IllegalOperand {
                opcode: instr.descriptor.opcode,
                kind: operand.kind.as_u8(),
            }),
        }
    }

    fn target_operand(&self, instr: &DecodedInstruction) -> Result<u32, FaultCause> {
        let operand = self.operand(instr, 0)?;
        match operand.kind {
            OperandKind::Addr | OperandKind::Imm => Ok(operand.value),
            OperandKind::Reg | OperandKind::Ind => Err(FaultCause::IllegalOperand {
                opcode: instr.descriptor.opcode,
                kind: operand.kind.as_u8(),
            }),
        }
    }

    fn int_alu(&mut self, instr: &DecodedInstruction, op: IntOp) -> Result<(), FaultCause> {
        let a = self.reg_operand_value(instr, 0)?;
        let b = self.value_operand(instr, 1)?;
        let (result, carry, overflow) = int_arith(op, a, b)?;
        self.write_reg_operand(instr, 0, result)?;
        self.flags.update_arith(result, carry, overflow);
        Ok(())
    }

    fn float_alu(&mut self, instr: &DecodedInstruction, op: FloatOp) -> Result<(), FaultCause> {
        let a = f32::from_bits(self.reg_operand_value(instr, 0)?);
        let b = f32::from_bits(self.value_operand(instr, 1)?);
        let result = float_arith(op, a, b)?;
        self.write_reg_operand(instr, 0, result.to_bits())
    }

    /// Processing-in-memory integer op: identical arithmetic to the
    /// register form, but both operands live in memory and the first is
    /// also the destination.
    fn pim_int(&mut self, instr: &DecodedInstruction, op: IntOp) -> Result<(), FaultCause> {
        let dst = self.effective_address(instr, 0)?;
        let src = self.effective_address(instr, 1)?;
        let a = self.bus_read_dword(dst)?;
        let b = self.bus_read_dword(src)?;
        let (result, carry, overflow) = int_arith(op, a, b)?;
        self.bus_write_dword(dst, result)?;
        self.flags.update_arith(result, carry, overflow);
        Ok(())
    }

    fn pim_float(&mut self, instr: &DecodedInstruction, op: FloatOp) -> Result<(), FaultCause> {
        let dst = self.effective_address(instr, 0)?;
        let src = self.effective_address(instr, 1)?;
        let a = f32::from_bits(self.bus_read_dword(dst)?);
        let b = f32::from_bits(self.bus_read_dword(src)?);
        let result = float_arith(op, a, b)?;
        self.bus_write_dword(dst, result.to_bits())
    }

    fn dispatch_interrupt(&mut self, vector: u32, return_pc: u32) -> Result<u32, FaultCause> {
        let handler = self
            .interrupts
            .handler(vector)
            .ok_or(FaultCause::UnhandledInterrupt(vector))?;
        self.push_word(return_pc)?;
        self.push_word(self.flags.pack())?;
        Ok(handler)
    }

    /// Shared saved-context discipline for CALL/RET and INT/IRET:
    /// pre-decrement push, post-increment pop, machine-word units.
    fn push_word(&mut self, value: u32) -> Result<(), FaultCause> {
        let sp = self.registers.sp().wrapping_sub(WORD_BYTES);
        self.memory.write_dword(sp, value)?;
        self.registers.set_sp(sp);
        Ok(())
    }

    fn pop_word(&mut self) -> Result<u32, FaultCause> {
        let sp = self.registers.sp();
        let value = self.memory.read_dword(sp)?;
        self.registers.set_sp(sp.wrapping_add(WORD_BYTES));
        Ok(value)
    }

    fn bus_read_byte(&mut self, addr: u32) -> Result<u8, FaultCause> {
        // Bounds apply to device windows as well; capacity covers them.
        let raw = self.memory.read_byte(addr)?;
        for device in &mut self.devices {
            let region = device.region();
            if region.contains(addr) {
                if let Some(value) = device.load(region.offset(addr)) {
                    return Ok(value);
                }
                break;
            }
        }
        Ok(raw)
    }

    fn bus_write_byte(&mut self, addr: u32, value: u8) -> Result<(), FaultCause> {
        // Validate before the device sees the store so an out-of-bounds
        // write produces no side effects.
        self.memory.read_byte(addr)?;

        let mut write_through = true;
        for device in &mut self.devices {
            let region = device.region();
            if region.contains(addr) {
                device.store(region.offset(addr), value);
                write_through = device.writes_through();
                break;
            }
        }

        if write_through {
            self.memory.write_byte(addr, value)?;
        }
        Ok(())
    }

    fn bus_read_dword(&mut self, addr: u32) -> Result<u32, FaultCause> {
        let mut raw = [0u8; 4];
        for (offset, slot) in (0u32..).zip(raw.iter_mut()) {
            *slot = self.bus_read_byte(addr.wrapping_add(offset))?;
        }
        Ok(u32::from_le_bytes(raw))
    }

    fn bus_write_dword(&mut self, addr: u32, value: u32) -> Result<(), FaultCause> {
        for (offset, byte) in (0u32..).zip(value.to_le_bytes()) {
            self.bus_write_byte(addr.wrapping_add(offset), byte)?;
        }
        Ok(())
    }

    fn port_input(&mut self, port: u32) -> Result<u32, FaultCause> {
        let Ok(port16) = u16::try_from(port) else {
            return Err(FaultCause::UnmappedPort(port));
        };
        self.ports
            .iter_mut()
            .find(|device| device.ports().contains(&port16))
            .map_or(Err(FaultCause::UnmappedPort(port)), |device| {
                Ok(device.input(port16))
            })
    }

    fn port_output(&mut self, port: u32, value: u32) -> Result<(), FaultCause> {
        let Ok(port16) = u16::try_from(port) else {
            return Err(FaultCause::UnmappedPort(port));
        };
        self.ports
            .iter_mut()
            .find(|device| device.ports().contains(&port16))
            .map_or(Err(FaultCause::UnmappedPort(port)), |device| {
                device.output(port16, value);
                Ok(())
            })
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn int_arith(op: IntOp, a: u32, b: u32) -> Result<(u32, bool, bool), FaultCause> {
    match op {
        IntOp::Add => {
            let (result, carry) = a.overflowing_add(b);
            let overflow = ((a ^ result) & (b ^ result)) >> 31 != 0;
            Ok((result, carry, overflow))
        }
        IntOp::Sub => {
            let (result, borrow) = a.overflowing_sub(b);
            let overflow = ((a ^ b) & (a ^ result)) >> 31 != 0;
            Ok((result, borrow, overflow))
        }
        IntOp::Mul => {
            let (result, wrapped) = a.overflowing_mul(b);
            Ok((result, wrapped, wrapped))
        }
        IntOp::Div => {
            if b == 0 {
                return Err(FaultCause::DivideByZero);
            }
            let lhs = a as i32;
            let rhs = b as i32;
            let overflow = lhs == i32::MIN && rhs == -1;
            Ok((lhs.wrapping_div(rhs) as u32, false, overflow))
        }
    }
}

fn float_arith(op: FloatOp, a: f32, b: f32) -> Result<f32, FaultCause> {
    match op {
        FloatOp::Add => Ok(a + b),
        FloatOp::Sub => Ok(a - b),
        FloatOp::Mul => Ok(a * b),
        FloatOp::Div => {
            if b == 0.0 {
                return Err(FaultCause::DivideByZero);
            }
            Ok(a / b)
        }
    }
}
