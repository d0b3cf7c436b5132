//! Boot-path and device integration: block images, storage ports, and the
//! display transcript observed through whole-program runs.

use ferrite_core as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use ferrite_core::{
    encode_instruction, lookup_mnemonic, BlockStorage, CharDisplay, Keyboard, Machine, Operand,
    RunState, BLOCK_BYTES, DISPLAY_BASE, KEYBOARD_PORT, STORAGE_DATA_PORT, STORAGE_SELECT_PORT,
};

fn assemble_by_hand(instructions: &[(&str, &[Operand])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for (mnemonic, operands) in instructions {
        let descriptor = lookup_mnemonic(mnemonic).expect("known mnemonic");
        bytes.extend(encode_instruction(descriptor, operands).expect("legal operands"));
    }
    bytes
}

#[test]
fn boot_block_is_copied_and_executed() {
    let program = assemble_by_hand(&[
        ("MOV", &[Operand::reg(0), Operand::imm(7)]),
        ("HALT", &[]),
    ]);
    let mut block = vec![0u8; BLOCK_BYTES];
    block[..program.len()].copy_from_slice(&program);
    // A second block that must NOT be copied.
    block.extend(vec![0xEE; BLOCK_BYTES]);

    let mut machine = Machine::with_capacity(0x1_0000);
    machine.set_register(15, 0xF000).unwrap();
    machine.boot_from(BlockStorage::from_bytes(block)).unwrap();
    machine.set_start_address(0);

    assert_eq!(machine.run(None), RunState::Halted);
    assert_eq!(machine.register(0), Ok(7));
    assert_eq!(
        machine.memory().read_byte(u32::try_from(BLOCK_BYTES).unwrap()),
        Ok(0),
        "only the designated boot block is loaded"
    );
}

#[test]
fn absent_block_image_skips_boot_stage() {
    let mut machine = Machine::with_capacity(0x1000);
    // No boot_from call: memory stays zeroed and execution starts from
    // the provided image alone.
    assert_eq!(machine.memory().read_byte(0), Ok(0));
    assert_eq!(machine.run_state(), RunState::Ready);
}

#[test]
fn storage_remains_readable_through_ports_after_boot() {
    let mut block = vec![0u8; BLOCK_BYTES * 2];
    // Boot block: select block 1, read its first byte into R3, halt.
    let program = assemble_by_hand(&[
        (
            "OUT",
            &[
                Operand::imm(u32::from(STORAGE_SELECT_PORT)),
                Operand::imm(1),
            ],
        ),
        (
            "IN",
            &[Operand::reg(3), Operand::imm(u32::from(STORAGE_DATA_PORT))],
        ),
        ("HALT", &[]),
    ]);
    block[..program.len()].copy_from_slice(&program);
    block[BLOCK_BYTES] = 0x5A;

    let mut machine = Machine::with_capacity(0x1_0000);
    machine.set_register(15, 0xF000).unwrap();
    machine.boot_from(BlockStorage::from_bytes(block)).unwrap();

    assert_eq!(machine.run(None), RunState::Halted);
    assert_eq!(machine.register(3), Ok(0x5A));
}

#[test]
fn display_and_keyboard_cooperate_in_one_run() {
    // Echo one keyboard byte to the display window.
    let program = assemble_by_hand(&[
        (
            "IN",
            &[Operand::reg(0), Operand::imm(u32::from(KEYBOARD_PORT))],
        ),
        ("STORE", &[Operand::reg(0), Operand::addr(DISPLAY_BASE)]),
        ("HALT", &[]),
    ]);

    let mut machine = Machine::with_capacity(0x1_0000);
    machine.set_register(15, 0xF000).unwrap();
    let mut image = ferrite_core::MemoryImage::new();
    for (addr, byte) in (0u32..).zip(&program) {
        image.set(addr, *byte);
    }
    machine.load_image(&image).unwrap();

    let mut keyboard = Keyboard::new();
    keyboard.type_text("Q");
    machine.attach_port_device(Box::new(keyboard));
    machine.attach_device(Box::new(CharDisplay::new()));

    assert_eq!(machine.run(None), RunState::Halted);
    assert_eq!(machine.display_transcript(), Some("Q"));
}

#[test]
fn identical_inputs_produce_identical_final_state() {
    let program = assemble_by_hand(&[
        ("MOV", &[Operand::reg(1), Operand::imm(5)]),
        ("MUL", &[Operand::reg(1), Operand::imm(9)]),
        ("HALT", &[]),
    ]);
    let mut image = ferrite_core::MemoryImage::new();
    for (addr, byte) in (0u32..).zip(&program) {
        image.set(addr, *byte);
    }

    let run = || {
        let mut machine = Machine::with_capacity(0x1000);
        machine.set_register(15, 0x800).unwrap();
        machine.load_image(&image).unwrap();
        machine.run(None);
        (machine.registers().snapshot(), machine.flags(), machine.pc())
    };

    assert_eq!(run(), run());
}
