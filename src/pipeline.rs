//! Shader lowering pipeline
//!
//! End-to-end driver from a resolved shader program to block IR.
//!
//! # Pipeline Stages
//!
//! ```text
//! Typed AST (TProgram)
//!     │
//!     ▼ lower
//! IR (Module)
//!     │
//!     ▼ validate (optional)
//! Checked IR
//!     │
//!     ▼ disassemble (optional)
//! Output (String)
//! ```

use crate::backend::ir::{Module, ValidationError, disassemble, validate};
use crate::backend::lower::{Diagnostics, lower_program, report_diagnostic};
use crate::common::tast::TProgram;
use thiserror::Error;
use tracing::{debug, info};

/// Which optional stages run after lowering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowerConfig {
    /// Run the structural validator over the lowered module
    pub validate: bool,
    /// Render the module as text
    pub disassemble: bool,
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self::all()
    }
}

impl LowerConfig {
    /// Every stage enabled
    pub fn all() -> Self {
        Self {
            validate: true,
            disassemble: true,
        }
    }

    /// Lowering only
    pub fn none() -> Self {
        Self {
            validate: false,
            disassemble: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("lowering failed with {n} error(s):\n{0}", n = .0.len())]
    Lower(Diagnostics),

    #[error("lowered module is malformed:\n{errors}", errors = format_validation(.0))]
    Validation(Vec<ValidationError>),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub module: Module,
    /// Present when disassembly was requested
    pub disassembly: Option<String>,
}

/// Lower a program and run the stages selected by `config`
///
/// # Example
///
/// ```
/// use shader_lower::common::tast::TProgram;
/// use shader_lower::pipeline::{LowerConfig, compile};
///
/// let output = compile(&TProgram::default(), &LowerConfig::all()).unwrap();
/// assert_eq!(output.disassembly.as_deref(), Some(""));
/// ```
pub fn compile(program: &TProgram, config: &LowerConfig) -> Result<CompileOutput, PipelineError> {
    // Stage 1: Lowering
    let module = lower_program(program).map_err(PipelineError::Lower)?;
    info!(functions = module.functions.len(), "lowered program");

    // Stage 2: Validation
    if config.validate {
        validate(&module).map_err(PipelineError::Validation)?;
        debug!("module validated");
    }

    // Stage 3: Disassembly
    let disassembly = config.disassemble.then(|| disassemble(&module));

    Ok(CompileOutput {
        module,
        disassembly,
    })
}

/// Compile a program and print errors to stderr
///
/// Lowering diagnostics are rendered against `source` when the shader text
/// is available and printed plainly otherwise.
///
/// # Returns
///
/// * `Ok(CompileOutput)` - The lowered module
/// * `Err(())` - Compilation failed (errors printed to stderr)
#[allow(clippy::result_unit_err)]
pub fn compile_and_report(
    filename: &str,
    source: Option<&str>,
    program: &TProgram,
    config: &LowerConfig,
) -> Result<CompileOutput, ()> {
    match compile(program, config) {
        Ok(output) => Ok(output),
        Err(PipelineError::Lower(diagnostics)) => {
            for diagnostic in &diagnostics {
                match source {
                    Some(source) => report_diagnostic(filename, source, diagnostic),
                    None => eprintln!("error[{}]: {}", diagnostic.error.code(), diagnostic),
                }
            }
            Err(())
        }
        Err(PipelineError::Validation(errors)) => {
            eprintln!("Validation errors in {}:", filename);
            for error in &errors {
                eprintln!("  {error}");
            }
            Err(())
        }
    }
}
