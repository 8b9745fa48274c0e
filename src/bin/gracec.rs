use std::{io::Read, path::PathBuf, process::exit};

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use grace_lang::driver::{compile_source, Options, OutputMode};

#[derive(Parser, Debug)]
#[command(name = "gracec", about = "Compiler for the Grace programming language.")]
struct Cli {
    /// Enable the optimization pipeline.
    #[arg(short = 'O')]
    optimize: bool,

    /// Read source from standard input and write assembly to standard
    /// output; skips the link step.
    #[arg(short = 'f')]
    asm_to_stdout: bool,

    /// Read source from standard input and write the intermediate listing
    /// to standard output; skips the link step.
    #[arg(short = 'i')]
    imm_to_stdout: bool,

    /// The Grace source file to compile.
    filename: Option<PathBuf>,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(parse_error) => {
            let code = match parse_error.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = parse_error.print();
            exit(code);
        }
    };

    match run(cli) {
        Ok(code) => exit(code),
        Err(run_error) => {
            error!("{run_error:#}");
            exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let (source, label, mode) = if cli.asm_to_stdout || cli.imm_to_stdout {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("could not read standard input")?;
        // -f takes precedence when both stdout modes are requested
        let mode = if cli.asm_to_stdout {
            OutputMode::AsmToStdout
        } else {
            OutputMode::IrToStdout
        };
        (source, "<stdin>".to_string(), mode)
    } else {
        let Some(filename) = &cli.filename else {
            eprintln!("Usage: gracec [options] filename");
            eprintln!("Try 'gracec --help' for more information.");
            return Ok(1);
        };
        let source = std::fs::read_to_string(filename)
            .with_context(|| format!("could not read file '{}'", filename.display()))?;
        (
            source,
            filename.display().to_string(),
            OutputMode::File {
                stem: filename.with_extension(""),
            },
        )
    };

    let options = Options {
        optimize: cli.optimize,
        mode,
    };
    match compile_source(&source, &label, &options) {
        Ok(code) => Ok(code),
        Err(compile_error) => {
            eprintln!("{}", compile_error.render(&label));
            Ok(1)
        }
    }
}
