//! Shader lowering backend
//!
//! This module turns the resolved shader AST into block-structured IR.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Typed AST     │────▶│    Lowering     │────▶│    Block IR     │
//! │   (TProgram)    │     │ (scopes, flow)  │     │    (Module)     │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - `ir`: IR definitions, builder, validator and disassembler
//! - `lower`: typed AST to IR lowering

pub mod ir;
pub mod lower;

pub use ir::{Module, disassemble, validate};
pub use lower::{Diagnostics, LowerError, lower_program};
