//! Lowering of resolved shader programs into block-structured IR.

pub mod backend;
pub mod common;
pub mod pipeline;
