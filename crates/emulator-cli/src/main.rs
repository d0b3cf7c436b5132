//! CLI entry point for the Ferrite-32 emulator binary.
//!
//! Loads a hex memory image (plus optional interrupt-vector description
//! and block-device image), seeds the program counter and stack pointer,
//! runs to halt/fault/budget, and reports the final machine state.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use ferrite_core::{
    interrupt, BlockStorage, CharDisplay, Keyboard, Machine, MemoryImage, RandomSource, RunState,
    DEFAULT_MEMORY_BYTES,
};
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: ferrite-run <image> [options]

Runs a Ferrite-32 memory image to halt, fault, or budget exhaustion and
prints the final machine state.

Options:
  --start <addr>     Program counter start address (default: 0)
  --sp <addr>        Initial stack pointer (default: top of memory)
  --ivt <file>       Interrupt-vector description (lines: VECTOR ADDRESS)
  --disk <file>      Block-device image; its boot block is copied to the
                     boot base before execution
  --input <text>     Bytes queued on the keyboard port
  --max-steps <n>    Instruction budget (default: unbounded)
  --memory <bytes>   Memory capacity (default: 1 MiB)
  -h, --help         Show this help message

Exit status: 0 after HALT (or an exhausted budget), 1 after a fault,
2 for usage errors.
";

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    image: PathBuf,
    start: u32,
    sp: Option<u32>,
    ivt: Option<PathBuf>,
    disk: Option<PathBuf>,
    input: Option<String>,
    max_steps: Option<u64>,
    memory_bytes: usize,
}

#[derive(Debug)]
enum ParseResult {
    Run(RunArgs),
    Help,
}

fn parse_number(text: &str) -> Option<u64> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .map_or_else(|| text.parse().ok(), |hex| u64::from_str_radix(hex, 16).ok())
}

#[allow(clippy::too_many_lines)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut image: Option<PathBuf> = None;
    let mut start = 0u32;
    let mut sp = None;
    let mut ivt = None;
    let mut disk = None;
    let mut input = None;
    let mut max_steps = None;
    let mut memory_bytes = DEFAULT_MEMORY_BYTES;

    let next_value = |args: &mut dyn Iterator<Item = OsString>,
                          flag: &str|
     -> Result<String, String> {
        args.next()
            .map(|v| v.to_string_lossy().to_string())
            .ok_or_else(|| format!("missing value for {flag}"))
    };

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "--start" {
            let value = next_value(&mut args, "--start")?;
            start = parse_number(&value)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| format!("invalid start address: {value}"))?;
            continue;
        }

        if arg == "--sp" {
            let value = next_value(&mut args, "--sp")?;
            sp = Some(
                parse_number(&value)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| format!("invalid stack pointer: {value}"))?,
            );
            continue;
        }

        if arg == "--ivt" {
            ivt = Some(PathBuf::from(next_value(&mut args, "--ivt")?));
            continue;
        }

        if arg == "--disk" {
            disk = Some(PathBuf::from(next_value(&mut args, "--disk")?));
            continue;
        }

        if arg == "--input" {
            input = Some(next_value(&mut args, "--input")?);
            continue;
        }

        if arg == "--max-steps" {
            let value = next_value(&mut args, "--max-steps")?;
            max_steps =
                Some(parse_number(&value).ok_or_else(|| format!("invalid step budget: {value}"))?);
            continue;
        }

        if arg == "--memory" {
            let value = next_value(&mut args, "--memory")?;
            memory_bytes = parse_number(&value)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| format!("invalid memory size: {value}"))?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if image.is_some() {
            return Err("multiple image paths provided".to_string());
        }
        image = Some(PathBuf::from(arg));
    }

    let image = image.ok_or_else(|| "missing image path".to_string())?;
    Ok(ParseResult::Run(RunArgs {
        image,
        start,
        sp,
        ivt,
        disk,
        input,
        max_steps,
        memory_bytes,
    }))
}

fn build_machine(args: &RunArgs) -> Result<Machine, String> {
    let image_text = fs::read_to_string(&args.image)
        .map_err(|e| format!("cannot read {}: {e}", args.image.display()))?;
    let image = MemoryImage::from_hex_text(&image_text)
        .map_err(|e| format!("{}: {e}", args.image.display()))?;

    let mut machine = Machine::with_capacity(args.memory_bytes);
    machine
        .load_image(&image)
        .map_err(|e| format!("{}: {e}", args.image.display()))?;

    if let Some(ivt_path) = &args.ivt {
        let ivt_text = fs::read_to_string(ivt_path)
            .map_err(|e| format!("cannot read {}: {e}", ivt_path.display()))?;
        let table = interrupt::parse_table(&ivt_text)
            .map_err(|e| format!("{}: {e}", ivt_path.display()))?;
        machine.set_interrupt_table(table);
    }

    if let Some(disk_path) = &args.disk {
        let bytes = fs::read(disk_path)
            .map_err(|e| format!("cannot read {}: {e}", disk_path.display()))?;
        machine
            .boot_from(BlockStorage::from_bytes(bytes))
            .map_err(|e| format!("{}: {e}", disk_path.display()))?;
    }

    machine.attach_device(Box::new(CharDisplay::new()));
    machine.attach_port_device(Box::new(RandomSource::new()));
    let mut keyboard = Keyboard::new();
    if let Some(text) = &args.input {
        keyboard.type_text(text);
    }
    machine.attach_port_device(Box::new(keyboard));

    let sp = args
        .sp
        .unwrap_or_else(|| u32::try_from(args.memory_bytes).unwrap_or(u32::MAX));
    machine
        .set_register(ferrite_core::STACK_REGISTER, sp)
        .map_err(|e| e.to_string())?;
    machine.set_start_address(args.start);

    Ok(machine)
}

fn state_line(state: RunState) -> String {
    match state {
        RunState::Ready => "READY".to_string(),
        RunState::Running => "RUNNING (budget exhausted)".to_string(),
        RunState::Halted => "HALTED".to_string(),
        RunState::Faulted(fault) => format!("FAULTED ({fault})"),
    }
}

fn print_report(machine: &Machine) {
    println!("state: {}", state_line(machine.run_state()));
    println!("steps: {}", machine.steps_executed());
    println!("pc:    0x{:08X}", machine.pc());

    let flags = machine.flags();
    println!(
        "flags: Z={} N={} C={} V={}",
        u8::from(flags.zero),
        u8::from(flags.negative),
        u8::from(flags.carry),
        u8::from(flags.overflow)
    );

    for (index, value) in machine.registers().snapshot().iter().enumerate() {
        if index % 4 == 0 {
            if index > 0 {
                println!();
            }
            print!("regs: ");
        }
        print!("R{index:<2}=0x{value:08X}  ");
    }
    println!();

    if let Some(transcript) = machine.display_transcript() {
        if !transcript.is_empty() {
            println!("display:");
            for line in transcript.lines() {
                println!("  {line}");
            }
        }
    }
}

fn run(args: &RunArgs) -> Result<i32, String> {
    let mut machine = build_machine(args)?;
    let state = machine.run(args.max_steps);
    print_report(&machine);

    Ok(match state {
        RunState::Faulted(_) => 1,
        RunState::Ready | RunState::Running | RunState::Halted => 0,
    })
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run(&args) {
            Ok(code) => code,
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            2
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::{parse_args, state_line, ParseResult, RunArgs};
    use ferrite_core::{Fault, FaultCause, RunState, DEFAULT_MEMORY_BYTES};

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_minimal_invocation() {
        let result = parse_args(os(&["program.img"]).into_iter()).unwrap();
        match result {
            ParseResult::Run(args) => assert_eq!(
                args,
                RunArgs {
                    image: PathBuf::from("program.img"),
                    start: 0,
                    sp: None,
                    ivt: None,
                    disk: None,
                    input: None,
                    max_steps: None,
                    memory_bytes: DEFAULT_MEMORY_BYTES,
                }
            ),
            ParseResult::Help => panic!("expected run args"),
        }
    }

    #[test]
    fn parses_all_options() {
        let result = parse_args(
            os(&[
                "system.img",
                "--start",
                "0x100",
                "--sp",
                "0xF000",
                "--ivt",
                "vectors.txt",
                "--disk",
                "boot.img",
                "--input",
                "hello",
                "--max-steps",
                "5000",
                "--memory",
                "0x20000",
            ])
            .into_iter(),
        )
        .unwrap();

        match result {
            ParseResult::Run(args) => {
                assert_eq!(args.start, 0x100);
                assert_eq!(args.sp, Some(0xF000));
                assert_eq!(args.ivt, Some(PathBuf::from("vectors.txt")));
                assert_eq!(args.disk, Some(PathBuf::from("boot.img")));
                assert_eq!(args.input.as_deref(), Some("hello"));
                assert_eq!(args.max_steps, Some(5000));
                assert_eq!(args.memory_bytes, 0x2_0000);
            }
            ParseResult::Help => panic!("expected run args"),
        }
    }

    #[test]
    fn rejects_missing_image() {
        let error = parse_args(std::iter::empty()).unwrap_err();
        assert!(error.contains("missing image"));
    }

    #[test]
    fn rejects_bad_start_address() {
        let error = parse_args(os(&["a.img", "--start", "wat"]).into_iter()).unwrap_err();
        assert!(error.contains("invalid start address"));
    }

    #[test]
    fn rejects_duplicate_image() {
        let error = parse_args(os(&["a.img", "b.img"]).into_iter()).unwrap_err();
        assert!(error.contains("multiple image paths"));
    }

    #[test]
    fn state_lines_name_the_outcome() {
        assert_eq!(state_line(RunState::Halted), "HALTED");
        assert_eq!(state_line(RunState::Running), "RUNNING (budget exhausted)");
        let fault = Fault {
            pc: 4,
            cause: FaultCause::DivideByZero,
        };
        assert!(state_line(RunState::Faulted(fault)).starts_with("FAULTED"));
    }
}
