//! IR builder
//!
//! Owns the module under construction and hands out ids for blocks,
//! instructions and values. It performs no control-flow bookkeeping: the
//! lowering context decides where instructions go.

use crate::backend::ir::instr::{CaseSelector, ControlInstr, Instruction, SwitchCase, Terminator};
use crate::backend::ir::program::{
    Block, BlockRole, Function, FunctionParam, Module, ReturnAttributes, Value, ValueKind,
};
use crate::backend::ir::types::{BlockId, FuncId, InstId, ValueId};
use crate::common::types::{ConstValue, Type};
use std::collections::HashMap;

/// Builder for constructing an IR module
pub struct IrBuilder {
    module: Module,
}

impl IrBuilder {
    pub fn new() -> Self {
        let mut module = Module {
            root_block: BlockId(0),
            functions: Vec::new(),
            funcs: Vec::new(),
            blocks: Vec::new(),
            instructions: Vec::new(),
            values: Vec::new(),
            names: HashMap::new(),
        };
        module.blocks.push(Block {
            instructions: Vec::new(),
            parent: None,
            role: BlockRole::Root,
        });
        Self { module }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    pub fn root_block(&self) -> BlockId {
        self.module.root_block
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Create a new, empty block
    pub fn new_block(&mut self, role: BlockRole, parent: Option<InstId>) -> BlockId {
        let id = BlockId(self.module.blocks.len() as u32);
        self.module.blocks.push(Block {
            instructions: Vec::new(),
            parent,
            role,
        });
        id
    }

    /// Last instruction of a block
    pub fn last_instruction(&self, block: BlockId) -> Option<InstId> {
        self.module.block(block).instructions.last().copied()
    }

    pub fn is_terminated(&self, block: BlockId) -> bool {
        self.last_instruction(block)
            .is_some_and(|id| self.module.inst(id).is_terminator())
    }

    /// Move an instruction already in `block` to its end
    pub fn move_to_end(&mut self, block: BlockId, inst: InstId) -> bool {
        let list = &mut self.module.blocks[block.0 as usize].instructions;
        match list.iter().position(|&id| id == inst) {
            Some(pos) => {
                list.remove(pos);
                list.push(inst);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn new_value(&mut self, kind: ValueKind, ty: Type) -> ValueId {
        let id = ValueId(self.module.values.len() as u32);
        self.module.values.push(Value { kind, ty });
        id
    }

    pub fn constant(&mut self, value: ConstValue) -> ValueId {
        let ty = value.ty();
        self.new_value(ValueKind::Constant(value), ty)
    }

    pub fn value_type(&self, value: ValueId) -> &Type {
        &self.module.value(value).ty
    }

    pub fn set_value_type(&mut self, value: ValueId, ty: Type) {
        self.module.values[value.0 as usize].ty = ty;
    }

    pub fn value_kind(&self, value: ValueId) -> &ValueKind {
        &self.module.value(value).kind
    }

    pub fn set_name(&mut self, value: ValueId, name: &str) {
        self.module.names.insert(value, name.to_string());
    }

    pub fn name_of(&self, value: ValueId) -> Option<&str> {
        self.module.name_of(value)
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    pub fn inst(&self, id: InstId) -> &Instruction {
        self.module.inst(id)
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        &mut self.module.instructions[id.0 as usize]
    }

    fn next_inst(&self) -> InstId {
        InstId(self.module.instructions.len() as u32)
    }

    /// Append an instruction that defines no value
    pub fn append(&mut self, block: BlockId, inst: Instruction) -> InstId {
        let id = self.next_inst();
        self.module.instructions.push(inst);
        self.module.blocks[block.0 as usize].instructions.push(id);
        id
    }

    /// Append an instruction defining one value of type `ty`. `make`
    /// receives the result id and builds the instruction around it.
    pub fn append_with_result(
        &mut self,
        block: BlockId,
        ty: Type,
        make: impl FnOnce(ValueId) -> Instruction,
    ) -> (InstId, ValueId) {
        let id = self.next_inst();
        let result = self.new_value(ValueKind::InstructionResult(id), ty);
        let inst = self.append(block, make(result));
        (inst, result)
    }

    pub fn terminate(&mut self, block: BlockId, terminator: Terminator) -> InstId {
        self.append(block, Instruction::Terminator(terminator))
    }

    /// Append an `if` with fresh true and false blocks
    pub fn if_(&mut self, block: BlockId, condition: ValueId) -> InstId {
        let id = self.next_inst();
        let true_block = self.new_block(BlockRole::True, Some(id));
        let false_block = self.new_block(BlockRole::False, Some(id));
        self.append(
            block,
            Instruction::Control(ControlInstr::If {
                condition,
                true_block,
                false_block,
                results: Vec::new(),
            }),
        )
    }

    /// Add a result value to an `if`
    pub fn add_if_result(&mut self, if_inst: InstId, ty: Type) -> ValueId {
        let result = self.new_value(ValueKind::InstructionResult(if_inst), ty);
        if let Instruction::Control(ControlInstr::If { results, .. }) = self.inst_mut(if_inst) {
            results.push(result);
        }
        result
    }

    /// Append a `loop` with fresh body and continuing blocks
    pub fn loop_(&mut self, block: BlockId, with_initializer: bool) -> InstId {
        let id = self.next_inst();
        let initializer =
            with_initializer.then(|| self.new_block(BlockRole::Initializer, Some(id)));
        let body = self.new_block(BlockRole::Body, Some(id));
        let continuing = self.new_block(BlockRole::Continuing, Some(id));
        self.append(
            block,
            Instruction::Control(ControlInstr::Loop {
                initializer,
                body,
                continuing,
            }),
        )
    }

    pub fn switch(&mut self, block: BlockId, condition: ValueId) -> InstId {
        self.append(
            block,
            Instruction::Control(ControlInstr::Switch {
                condition,
                cases: Vec::new(),
            }),
        )
    }

    /// Add a case to a `switch`, returning the case block
    pub fn add_case(&mut self, switch: InstId, selectors: Vec<CaseSelector>) -> BlockId {
        let block = self.new_block(BlockRole::Case, Some(switch));
        if let Instruction::Control(ControlInstr::Switch { cases, .. }) = self.inst_mut(switch) {
            cases.push(SwitchCase { selectors, block });
        }
        block
    }

    /// The nested blocks of a control instruction
    pub fn control_blocks(&self, inst: InstId) -> Vec<BlockId> {
        self.inst(inst)
            .as_control()
            .map(ControlInstr::blocks)
            .unwrap_or_default()
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Create a function with an empty entry block
    pub fn function(&mut self, name: &str, return_type: Type) -> FuncId {
        let id = FuncId(self.module.funcs.len() as u32);
        let block = self.new_block(BlockRole::FunctionEntry, None);
        let value = self.new_value(ValueKind::Function(id), return_type.clone());
        self.set_name(value, name);
        self.module.funcs.push(Function {
            name: name.to_string(),
            value,
            return_type,
            params: Vec::new(),
            block,
            stage: None,
            workgroup_size: None,
            return_attributes: ReturnAttributes::default(),
        });
        self.module.functions.push(id);
        id
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.module.funcs[id.0 as usize]
    }

    pub fn function_block(&self, id: FuncId) -> BlockId {
        self.module.function(id).block
    }

    /// Create a named parameter value, not yet attached to the function
    pub fn param_value(&mut self, func: FuncId, index: usize, name: &str, ty: Type) -> ValueId {
        let value = self.new_value(ValueKind::FunctionParam { func, index }, ty);
        self.set_name(value, name);
        value
    }

    pub fn set_params(&mut self, func: FuncId, params: Vec<FunctionParam>) {
        self.function_mut(func).params = params;
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}
