//! CLI entry point for the Ferrite-32 assembler binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use ferrite_asm as _;
use ferrite_asm::{format_location, AssembleError, Assembler};
use ferrite_core as _;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: ferrite-asm <input>... [-o <output>]

Assembles one or more Ferrite-32 source files into a hex memory image.
Inputs are processed in order; later files see macros and labels defined
by earlier ones.

Options:
  -o, --output <file>  Output image path (default: first input stem + .img)
  -h, --help           Show this help message

Examples:
  ferrite-asm program.fasm
  ferrite-asm boot.fasm kernel.fasm -o system.img
";

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug)]
enum ParseResult {
    Build(BuildArgs),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut inputs = Vec::new();
    let mut output: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        inputs.push(PathBuf::from(arg));
    }

    if inputs.is_empty() {
        return Err("missing input path".to_string());
    }

    Ok(ParseResult::Build(BuildArgs { inputs, output }))
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.img"))
}

fn report_assemble_error(error: &AssembleError) {
    match &error.location {
        Some(location) => eprintln!("{}: error: {error}", format_location(location)),
        None => eprintln!("error: {error}"),
    }
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let mut session = Assembler::new();
    for input in &args.inputs {
        if let Err(e) = session.add_file(input) {
            report_assemble_error(&e);
            return Err(1);
        }
    }

    let image = match session.assemble() {
        Ok(image) => image,
        Err(e) => {
            report_assemble_error(&e);
            return Err(1);
        }
    };

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.inputs[0]));

    if let Err(e) = fs::write(&output_path, image.to_hex_text()) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    println!(
        "Assembled {} input(s) ({} bytes) -> {}",
        args.inputs.len(),
        image.len(),
        output_path.display()
    );

    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Build(args)) => match run_build(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
