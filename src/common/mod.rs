//! Data model shared by the lowering pass: spans, types, operators and the
//! resolved shader AST handed over by semantic analysis.

pub mod ast;
pub mod span;
pub mod tast;
pub mod types;
