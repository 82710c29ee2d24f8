//! Core identifiers and operator enums for the IR

use crate::common::ast::{BinOp, BuiltinValue, Interpolation};
use std::fmt;

/// Unique identifier for a block
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// Unique identifier for an instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "inst{}", self.0)
    }
}

/// Unique identifier for a value: constant, instruction result, parameter or function
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

/// Binary operations in the IR. The short-circuiting logical operators have
/// no counterpart: they lower to control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    ShiftLeft,
    ShiftRight,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    pub fn from_ast(op: BinOp) -> Option<Self> {
        Some(match op {
            BinOp::And => BinaryOp::And,
            BinOp::Or => BinaryOp::Or,
            BinOp::Xor => BinaryOp::Xor,
            BinOp::Equal => BinaryOp::Equal,
            BinOp::NotEqual => BinaryOp::NotEqual,
            BinOp::LessThan => BinaryOp::LessThan,
            BinOp::GreaterThan => BinaryOp::GreaterThan,
            BinOp::LessThanEqual => BinaryOp::LessThanEqual,
            BinOp::GreaterThanEqual => BinaryOp::GreaterThanEqual,
            BinOp::ShiftLeft => BinaryOp::ShiftLeft,
            BinOp::ShiftRight => BinaryOp::ShiftRight,
            BinOp::Add => BinaryOp::Add,
            BinOp::Subtract => BinaryOp::Subtract,
            BinOp::Multiply => BinaryOp::Multiply,
            BinOp::Divide => BinaryOp::Divide,
            BinOp::Modulo => BinaryOp::Modulo,
            BinOp::LogicalAnd | BinOp::LogicalOr => return None,
        })
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "neq",
            BinaryOp::LessThan => "lt",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::LessThanEqual => "lte",
            BinaryOp::GreaterThanEqual => "gte",
            BinaryOp::ShiftLeft => "shl",
            BinaryOp::ShiftRight => "shr",
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "sub",
            BinaryOp::Multiply => "mul",
            BinaryOp::Divide => "div",
            BinaryOp::Modulo => "mod",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Complement,
    Negation,
    Not,
}

impl UnaryOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            UnaryOp::Complement => "complement",
            UnaryOp::Negation => "negation",
            UnaryOp::Not => "not",
        }
    }
}

/// Builtins an entry point may return
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnBuiltin {
    Position,
    FragDepth,
    SampleMask,
}

impl ReturnBuiltin {
    pub fn from_ast(value: BuiltinValue) -> Option<Self> {
        match value {
            BuiltinValue::Position => Some(ReturnBuiltin::Position),
            BuiltinValue::FragDepth => Some(ReturnBuiltin::FragDepth),
            BuiltinValue::SampleMask => Some(ReturnBuiltin::SampleMask),
            _ => None,
        }
    }
}

impl fmt::Display for ReturnBuiltin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReturnBuiltin::Position => write!(f, "@position"),
            ReturnBuiltin::FragDepth => write!(f, "@frag_depth"),
            ReturnBuiltin::SampleMask => write!(f, "@sample_mask"),
        }
    }
}

/// Builtins an entry point parameter may receive
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamBuiltin {
    VertexIndex,
    InstanceIndex,
    Position,
    FrontFacing,
    LocalInvocationId,
    LocalInvocationIndex,
    GlobalInvocationId,
    WorkgroupId,
    NumWorkgroups,
    SampleIndex,
    SampleMask,
    SubgroupInvocationId,
    SubgroupSize,
}

impl ParamBuiltin {
    pub fn from_ast(value: BuiltinValue) -> Option<Self> {
        Some(match value {
            BuiltinValue::VertexIndex => ParamBuiltin::VertexIndex,
            BuiltinValue::InstanceIndex => ParamBuiltin::InstanceIndex,
            BuiltinValue::Position => ParamBuiltin::Position,
            BuiltinValue::FrontFacing => ParamBuiltin::FrontFacing,
            BuiltinValue::LocalInvocationId => ParamBuiltin::LocalInvocationId,
            BuiltinValue::LocalInvocationIndex => ParamBuiltin::LocalInvocationIndex,
            BuiltinValue::GlobalInvocationId => ParamBuiltin::GlobalInvocationId,
            BuiltinValue::WorkgroupId => ParamBuiltin::WorkgroupId,
            BuiltinValue::NumWorkgroups => ParamBuiltin::NumWorkgroups,
            BuiltinValue::SampleIndex => ParamBuiltin::SampleIndex,
            BuiltinValue::SampleMask => ParamBuiltin::SampleMask,
            BuiltinValue::SubgroupInvocationId => ParamBuiltin::SubgroupInvocationId,
            BuiltinValue::SubgroupSize => ParamBuiltin::SubgroupSize,
            BuiltinValue::FragDepth => return None,
        })
    }
}

impl fmt::Display for ParamBuiltin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ParamBuiltin::VertexIndex => "vertex_index",
            ParamBuiltin::InstanceIndex => "instance_index",
            ParamBuiltin::Position => "position",
            ParamBuiltin::FrontFacing => "front_facing",
            ParamBuiltin::LocalInvocationId => "local_invocation_id",
            ParamBuiltin::LocalInvocationIndex => "local_invocation_index",
            ParamBuiltin::GlobalInvocationId => "global_invocation_id",
            ParamBuiltin::WorkgroupId => "workgroup_id",
            ParamBuiltin::NumWorkgroups => "num_workgroups",
            ParamBuiltin::SampleIndex => "sample_index",
            ParamBuiltin::SampleMask => "sample_mask",
            ParamBuiltin::SubgroupInvocationId => "subgroup_invocation_id",
            ParamBuiltin::SubgroupSize => "subgroup_size",
        };
        write!(f, "@{name}")
    }
}

/// `@location` with the interpolation it was declared with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub value: u32,
    pub interpolation: Option<Interpolation>,
}
