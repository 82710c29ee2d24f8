//! IR module structure: arenas of blocks, instructions, values and functions

use crate::backend::ir::instr::{Instruction, Terminator};
use crate::backend::ir::types::{
    BlockId, FuncId, InstId, Location, ParamBuiltin, ReturnBuiltin, ValueId,
};
use crate::common::ast::{BindingPoint, PipelineStage};
use crate::common::types::{ConstValue, Type};
use std::collections::HashMap;

/// A lowered shader module
#[derive(Clone, Debug)]
pub struct Module {
    /// Holds module-scope variables; never terminated
    pub root_block: BlockId,
    /// Functions in declaration order
    pub functions: Vec<FuncId>,
    pub(crate) funcs: Vec<Function>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) values: Vec<Value>,
    pub(crate) names: HashMap<ValueId, String>,
}

impl Module {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        &self.instructions[id.0 as usize]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.funcs[id.0 as usize]
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions.iter().map(|&id| (id, self.function(id)))
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.iter_functions()
            .map(|(_, f)| f)
            .find(|f| f.name == name)
    }

    pub fn name_of(&self, value: ValueId) -> Option<&str> {
        self.names.get(&value).map(String::as_str)
    }

    /// Instructions of a block, in order
    pub fn instructions_of(&self, block: BlockId) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.block(block)
            .instructions
            .iter()
            .map(|&id| (id, self.inst(id)))
    }

    /// The terminator ending `block`, if it has one
    pub fn terminator_of(&self, block: BlockId) -> Option<&Terminator> {
        self.block(block)
            .instructions
            .last()
            .and_then(|&id| self.inst(id).as_terminator())
    }

    /// Every block nested under `block` (inclusive), depth first
    pub fn walk_blocks(&self, block: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![block];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut nested = Vec::new();
            for (_, inst) in self.instructions_of(id) {
                if let Some(control) = inst.as_control() {
                    nested.extend(control.blocks());
                }
            }
            stack.extend(nested.into_iter().rev());
        }
        out
    }
}

/// Where a block hangs in the structured tree
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockRole {
    Root,
    FunctionEntry,
    True,
    False,
    Initializer,
    Body,
    Continuing,
    Case,
}

impl BlockRole {
    /// Comment printed after the block header
    pub fn comment(&self) -> Option<&'static str> {
        match self {
            BlockRole::Root => Some("root"),
            BlockRole::FunctionEntry => None,
            BlockRole::True => Some("true"),
            BlockRole::False => Some("false"),
            BlockRole::Initializer => Some("initializer"),
            BlockRole::Body => Some("body"),
            BlockRole::Continuing => Some("continuing"),
            BlockRole::Case => Some("case"),
        }
    }
}

/// An ordered list of instructions
#[derive(Clone, Debug)]
pub struct Block {
    pub instructions: Vec<InstId>,
    /// Control instruction owning this block
    pub parent: Option<InstId>,
    pub role: BlockRole,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    Constant(ConstValue),
    InstructionResult(InstId),
    FunctionParam { func: FuncId, index: usize },
    Function(FuncId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub ty: Type,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnAttributes {
    pub builtin: Option<ReturnBuiltin>,
    pub location: Option<Location>,
    pub invariant: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParam {
    pub value: ValueId,
    pub name: String,
    pub ty: Type,
    pub builtin: Option<ParamBuiltin>,
    pub location: Option<Location>,
    pub invariant: bool,
    pub binding_point: Option<BindingPoint>,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    /// The value used as a call target
    pub value: ValueId,
    pub return_type: Type,
    pub params: Vec<FunctionParam>,
    pub block: BlockId,
    pub stage: Option<PipelineStage>,
    pub workgroup_size: Option<[u32; 3]>,
    pub return_attributes: ReturnAttributes,
}
