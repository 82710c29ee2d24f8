//! Block-structured IR
//!
//! Functions own a tree of blocks. Structured control flow is kept as
//! `if`/`loop`/`switch` instructions whose nested blocks end in terminators
//! naming the construct they leave, instead of a flat CFG with jumps.

pub mod builder;
pub mod disasm;
pub mod instr;
pub mod program;
pub mod types;
pub mod validate;

#[cfg(test)]
mod tests;

pub use builder::IrBuilder;
pub use disasm::disassemble;
pub use instr::{CaseSelector, ControlInstr, Instruction, SwitchCase, Terminator};
pub use program::{
    Block, BlockRole, Function, FunctionParam, Module, ReturnAttributes, Value, ValueKind,
};
pub use types::{
    BinaryOp, BlockId, FuncId, InstId, Location, ParamBuiltin, ReturnBuiltin, UnaryOp, ValueId,
};
pub use validate::{validate, ValidationError};
