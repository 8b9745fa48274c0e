//! Backend driver: runs the pipeline from source text to the requested
//! output sinks and, in file mode, through the external linker.
//!
//! Each compilation allocates a fresh LLVM context and module and disposes
//! of them when it returns, so one process can compile many inputs.

use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

use inkwell::{
    context::Context,
    module::Module,
    passes::PassBuilderOptions,
    targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine},
    OptimizationLevel,
};
use log::info;

use crate::{
    codegen,
    error::{CompilerError, InternalError},
    lexer::Lexer,
    parser::parse_program,
    semantic::Analyzer,
};

/// The fixed `-O` pipeline: inter-procedural, scalar and vectorization
/// passes as bundled by the backend's default O2 schedule.
const OPT_PIPELINE: &str = "default<O2>";

const LINKER: &str = "cc";
const RUNTIME_LIB: &str = "grace";

/// Where the precompiled runtime archive lives; overridable so installed
/// compilers can point somewhere else.
fn runtime_search_path() -> String {
    std::env::var("GRACE_RUNTIME").unwrap_or_else(|_| "./lib".to_string())
}

pub enum OutputMode {
    /// Write `<stem>.imm`, `<stem>.asm`, `<stem>.o` and link `<stem>.exe`.
    File { stem: PathBuf },
    /// Write assembly to standard output; no link step.
    AsmToStdout,
    /// Write the intermediate listing to standard output; no link step.
    IrToStdout,
}

pub struct Options {
    pub optimize: bool,
    pub mode: OutputMode,
}

/// Front half of the pipeline: source text to a lowered, unoptimized
/// module inside the caller's LLVM context.
pub fn lower_to_module<'ctx>(
    context: &'ctx Context,
    source: &str,
    module_name: &str,
) -> Result<Module<'ctx>, CompilerError> {
    let tokens = Lexer::new(source).lex()?;
    let program = parse_program(tokens)?;
    let program = Analyzer::analyze(program)?;
    codegen::emit(context, &program, module_name)
}

/// Compile one source. Returns the process exit code: 0 for the stdout
/// modes, the linker's exit code in file mode.
pub fn compile_source(source: &str, label: &str, options: &Options) -> Result<i32, CompilerError> {
    let context = Context::create();
    let module = lower_to_module(&context, source, label)?;

    let machine = host_machine()?;
    module.set_triple(&machine.get_triple());
    module.set_data_layout(&machine.get_target_data().get_data_layout());

    if options.optimize {
        module
            .run_passes(OPT_PIPELINE, &machine, PassBuilderOptions::create())
            .map_err(|error| internal(format!("optimization pipeline failed: {error}")))?;
    }

    // the module must verify whether or not it was optimized
    module
        .verify()
        .map_err(|error| internal(format!("module verification failed: {error}")))?;

    match &options.mode {
        OutputMode::IrToStdout => {
            print!("{}", module.print_to_string().to_string());
            Ok(0)
        }
        OutputMode::AsmToStdout => {
            let buffer = machine
                .write_to_memory_buffer(&module, FileType::Assembly)
                .map_err(|error| internal(format!("assembly emission failed: {error}")))?;
            std::io::stdout()
                .write_all(buffer.as_slice())
                .map_err(|error| internal(format!("could not write assembly: {error}")))?;
            Ok(0)
        }
        OutputMode::File { stem } => {
            module
                .print_to_file(stem.with_extension("imm"))
                .map_err(|error| internal(format!("could not write listing: {error}")))?;
            machine
                .write_to_file(&module, FileType::Assembly, &stem.with_extension("asm"))
                .map_err(|error| internal(format!("could not write assembly: {error}")))?;
            machine
                .write_to_file(&module, FileType::Object, &stem.with_extension("o"))
                .map_err(|error| internal(format!("could not write object: {error}")))?;
            link(stem)
        }
    }
}

fn host_machine() -> Result<TargetMachine, CompilerError> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|error| internal(format!("target initialization failed: {error}")))?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple)
        .map_err(|error| internal(format!("no target for triple: {error}")))?;
    target
        .create_target_machine(
            &triple,
            "generic",
            "",
            OptimizationLevel::Default,
            RelocMode::Default,
            CodeModel::Default,
        )
        .ok_or_else(|| internal("could not create a target machine"))
}

/// Final step in file mode: hand the object to the system linker together
/// with the runtime archive. The linker's exit code is the compiler's.
fn link(stem: &Path) -> Result<i32, CompilerError> {
    let executable = stem.with_extension("exe");
    let object = stem.with_extension("o");

    info!("linking {}", executable.display());
    let status = Command::new(LINKER)
        .arg("-no-pie")
        .arg("-o")
        .arg(&executable)
        .arg(&object)
        .arg("-L")
        .arg(runtime_search_path())
        .arg("-l")
        .arg(RUNTIME_LIB)
        .status()
        .map_err(|error| internal(format!("could not run linker '{LINKER}': {error}")))?;

    Ok(status.code().unwrap_or(1))
}

fn internal(message: impl ToString) -> CompilerError {
    CompilerError::Internal(InternalError::new(message))
}
