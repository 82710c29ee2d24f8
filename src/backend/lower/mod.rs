//! Typed AST to IR lowering
//!
//! This module implements the pass that turns a resolved, typed shader
//! program into the block-structured IR of [`crate::backend::ir`].
//!
//! # Modules
//!
//! - `context`: Lowering context for tracking state
//! - `control`: Stack of enclosing control instructions
//! - `scope`: Name to value bindings
//! - `expr`: Expression lowering
//! - `stmt`: Statement lowering
//! - `function`: Function lowering
//! - `error` / `report`: Diagnostics and their rendering
//!
//! # Usage
//!
//! ```no_run
//! use shader_lower::backend::lower::lower_program;
//! use shader_lower::common::tast::TProgram;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let json = "{}";
//! let program = TProgram::from_json(json)?;
//! let module = lower_program(&program)?;
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod control;
pub mod error;
pub mod expr;
pub mod function;
pub mod report;
pub mod scope;
pub mod stmt;

#[cfg(test)]
mod tests;

// Re-exports
pub use context::LoweringContext;
pub use error::{Diagnostic, Diagnostics, ErrorCategory, LowerError};
pub use function::lower_function;
pub use report::{build_report, report_diagnostic};

use crate::backend::ir::Module;
use crate::common::tast::{TDecl, TProgram};

/// Lower a whole program. Every declaration is attempted even after a
/// failure, and all diagnostics are returned together.
pub fn lower_program(program: &TProgram) -> Result<Module, Diagnostics> {
    let mut ctx = LoweringContext::new(program);

    for (decl, span) in &program.decls {
        match decl {
            TDecl::Variable(var) => {
                tracing::debug!(name = %var.name, %span, "lower module-scope variable");
                let root = ctx.builder.root_block();
                if let Err(error) = ctx.with_block(Some(root), |ctx| stmt::lower_variable(ctx, var, true)) {
                    ctx.report(None, error);
                }
            }
            TDecl::Function(func) => {
                tracing::debug!(name = %func.name, %span, "lower function");
                if let Err(error) = lower_function(&mut ctx, func) {
                    ctx.report(Some(func.name.clone()), error);
                }
            }
            TDecl::Struct(name) | TDecl::Alias(name) | TDecl::Enable(name) => {
                tracing::debug!(%name, "nothing to lower");
            }
            TDecl::ConstAssert | TDecl::Diagnostic => {
                tracing::debug!(%span, "nothing to lower");
            }
        }
    }

    ctx.finish()
}
