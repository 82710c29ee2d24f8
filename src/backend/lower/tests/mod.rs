//! Tests for typed AST to IR lowering

mod common;
mod module;
