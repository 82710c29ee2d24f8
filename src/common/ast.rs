//! Surface-level vocabulary shared by the resolved AST and the IR:
//! operators, literals and the attribute enums a shader can carry.

use crate::common::types::{ConstValue, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    And,
    Or,
    Xor,
    LogicalAnd,
    LogicalOr,
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

impl BinOp {
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinOp::LogicalAnd | BinOp::LogicalOr)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self {
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessThanEqual => "<=",
            BinOp::GreaterThanEqual => ">=",
            BinOp::ShiftLeft => "<<",
            BinOp::ShiftRight => ">>",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
        };
        write!(f, "{op}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `&x`
    AddressOf,
    /// `*p`
    Indirection,
    Complement,
    Negation,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    /// Materialize the literal at its resolved type. `None` when the type
    /// cannot hold the literal.
    pub fn to_const(&self, ty: &Type) -> Option<ConstValue> {
        match (self, ty) {
            (Literal::Bool(b), Type::Bool) => Some(ConstValue::Bool(*b)),
            (Literal::Int(n), Type::I32) => i32::try_from(*n).ok().map(ConstValue::I32),
            (Literal::Int(n), Type::U32) => u32::try_from(*n).ok().map(ConstValue::U32),
            (Literal::Int(n), Type::AbstractInt) => Some(ConstValue::AbstractInt(*n)),
            (Literal::Int(n), Type::F32) => Some(ConstValue::F32(*n as f32)),
            (Literal::Int(n), Type::F16) => Some(ConstValue::F16(*n as f32)),
            (Literal::Int(n), Type::AbstractFloat) => Some(ConstValue::AbstractFloat(*n as f64)),
            (Literal::Float(x), Type::F32) => Some(ConstValue::F32(*x as f32)),
            (Literal::Float(x), Type::F16) => Some(ConstValue::F16(*x as f32)),
            (Literal::Float(x), Type::AbstractFloat) => Some(ConstValue::AbstractFloat(*x)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Vertex,
    Fragment,
    Compute,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PipelineStage::Vertex => "vertex",
            PipelineStage::Fragment => "fragment",
            PipelineStage::Compute => "compute",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinValue {
    VertexIndex,
    InstanceIndex,
    Position,
    FrontFacing,
    FragDepth,
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

impl fmt::Display for BuiltinValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BuiltinValue::VertexIndex => "vertex_index",
            BuiltinValue::InstanceIndex => "instance_index",
            BuiltinValue::Position => "position",
            BuiltinValue::FrontFacing => "front_facing",
            BuiltinValue::FragDepth => "frag_depth",
            BuiltinValue::LocalInvocationId => "local_invocation_id",
            BuiltinValue::LocalInvocationIndex => "local_invocation_index",
            BuiltinValue::GlobalInvocationId => "global_invocation_id",
            BuiltinValue::WorkgroupId => "workgroup_id",
            BuiltinValue::NumWorkgroups => "num_workgroups",
            BuiltinValue::SampleIndex => "sample_index",
            BuiltinValue::SampleMask => "sample_mask",
            BuiltinValue::SubgroupInvocationId => "subgroup_invocation_id",
            BuiltinValue::SubgroupSize => "subgroup_size",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationType {
    Perspective,
    Linear,
    Flat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationSampling {
    Center,
    Centroid,
    Sample,
    First,
    Either,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interpolation {
    pub ty: InterpolationType,
    #[serde(default)]
    pub sampling: Option<InterpolationSampling>,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ty = match self.ty {
            InterpolationType::Perspective => "perspective",
            InterpolationType::Linear => "linear",
            InterpolationType::Flat => "flat",
        };
        write!(f, "@interpolate({ty}")?;
        if let Some(sampling) = self.sampling {
            let sampling = match sampling {
                InterpolationSampling::Center => "center",
                InterpolationSampling::Centroid => "centroid",
                InterpolationSampling::Sample => "sample",
                InterpolationSampling::First => "first",
                InterpolationSampling::Either => "either",
            };
            write!(f, ", {sampling}")?;
        }
        write!(f, ")")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingPoint {
    pub group: u32,
    pub binding: u32,
}

impl fmt::Display for BindingPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@binding_point({}, {})", self.group, self.binding)
    }
}

/// Attributes written on parameters and return types. Locations and binding
/// points arrive already resolved on the owning node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Builtin(BuiltinValue),
    Interpolate(Interpolation),
    Invariant,
}
