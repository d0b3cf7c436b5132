//! End-to-end tests for the `ferrite-asm` binary.

use ferrite_asm as _;
use ferrite_core as _;

use std::fs;
use std::path::Path;
use std::process::Command;

use ferrite_core::MemoryImage;

fn assembler_binary() -> &'static str {
    env!("CARGO_BIN_EXE_ferrite-asm")
}

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn assembles_to_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "program.fasm", "MOV %R0, 1\nHALT\n");

    let output = Command::new(assembler_binary())
        .arg(&input)
        .output()
        .expect("failed to run ferrite-asm");

    assert!(output.status.success(), "{output:?}");
    let image_path = dir.path().join("program.img");
    let text = fs::read_to_string(image_path).unwrap();
    let image = MemoryImage::from_hex_text(&text).unwrap();
    assert_eq!(image.len(), 12);
    assert_eq!(image.get(0), Some(0x25));
}

#[test]
fn explicit_output_and_multiple_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let defs = write_file(dir.path(), "defs.fasm", "#define START 0\n");
    let main = write_file(
        dir.path(),
        "main.fasm",
        ".org START\nentry: HALT\n",
    );
    let out = dir.path().join("system.img");

    let output = Command::new(assembler_binary())
        .args([defs.as_os_str(), main.as_os_str()])
        .arg("-o")
        .arg(&out)
        .output()
        .expect("failed to run ferrite-asm");

    assert!(output.status.success(), "{output:?}");
    let image = MemoryImage::from_hex_text(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(image.get(0), Some(0x15));
}

#[test]
fn assembly_errors_report_file_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "bad.fasm", "HALT\nFROB %R0\n");

    let output = Command::new(assembler_binary())
        .arg(&input)
        .output()
        .expect("failed to run ferrite-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.fasm:2"), "{stderr}");
    assert!(stderr.contains("unknown mnemonic"), "{stderr}");
    assert!(
        !dir.path().join("bad.img").exists(),
        "no image on failed assembly"
    );
}

#[test]
fn help_flag_prints_usage() {
    let output = Command::new(assembler_binary())
        .arg("--help")
        .output()
        .expect("failed to run ferrite-asm");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: ferrite-asm"));
}

#[test]
fn missing_input_is_a_usage_error() {
    let output = Command::new(assembler_binary())
        .output()
        .expect("failed to run ferrite-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing input"));
}
