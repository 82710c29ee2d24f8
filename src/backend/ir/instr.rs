//! IR instructions, control instructions and terminators
//!
//! Control instructions (`if`, `loop`, `switch`) own nested blocks and do
//! not end the block they sit in: once every path through them exits,
//! execution resumes at the next instruction of the parent block.
//! Terminators are always the last instruction of a block.

use crate::backend::ir::types::{BinaryOp, BlockId, FuncId, InstId, UnaryOp, ValueId};
use crate::common::ast::BindingPoint;

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// result = pointer to fresh storage
    Var {
        result: ValueId,
        initializer: Option<ValueId>,
        binding_point: Option<BindingPoint>,
    },

    /// result = value (gives an immutable value a name)
    Let { result: ValueId, value: ValueId },

    /// result = *from
    Load { result: ValueId, from: ValueId },

    /// *to = value
    Store { to: ValueId, value: ValueId },

    /// result = (*from)[index]
    LoadVectorElement {
        result: ValueId,
        from: ValueId,
        index: ValueId,
    },

    /// (*to)[index] = value
    StoreVectorElement {
        to: ValueId,
        index: ValueId,
        value: ValueId,
    },

    /// result = object[indices...]
    Access {
        result: ValueId,
        object: ValueId,
        indices: Vec<ValueId>,
    },

    /// result = object.xyzw
    Swizzle {
        result: ValueId,
        object: ValueId,
        indices: Vec<u32>,
    },

    /// result = lhs op rhs
    Binary {
        result: ValueId,
        op: BinaryOp,
        lhs: ValueId,
        rhs: ValueId,
    },

    /// result = op operand
    Unary {
        result: ValueId,
        op: UnaryOp,
        operand: ValueId,
    },

    Bitcast { result: ValueId, value: ValueId },

    /// result = call func(args...)
    Call {
        result: ValueId,
        callee: FuncId,
        args: Vec<ValueId>,
    },

    BuiltinCall {
        result: ValueId,
        builtin: String,
        args: Vec<ValueId>,
    },

    Construct { result: ValueId, args: Vec<ValueId> },

    Convert { result: ValueId, value: ValueId },

    /// Demote the invocation to a helper; execution continues
    Discard,

    Control(ControlInstr),

    Terminator(Terminator),
}

impl Instruction {
    /// The value this instruction defines, if any. `if` results are listed
    /// on the control instruction itself.
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Instruction::Var { result, .. }
            | Instruction::Let { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::LoadVectorElement { result, .. }
            | Instruction::Access { result, .. }
            | Instruction::Swizzle { result, .. }
            | Instruction::Binary { result, .. }
            | Instruction::Unary { result, .. }
            | Instruction::Bitcast { result, .. }
            | Instruction::Call { result, .. }
            | Instruction::BuiltinCall { result, .. }
            | Instruction::Construct { result, .. }
            | Instruction::Convert { result, .. } => Some(*result),
            Instruction::Control(ControlInstr::If { results, .. }) => results.first().copied(),
            _ => None,
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, Instruction::Terminator(_))
    }

    pub fn as_terminator(&self) -> Option<&Terminator> {
        match self {
            Instruction::Terminator(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlInstr> {
        match self {
            Instruction::Control(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControlInstr {
    If {
        condition: ValueId,
        true_block: BlockId,
        false_block: BlockId,
        /// Values produced by the `exit_if`s of both branches
        results: Vec<ValueId>,
    },

    Loop {
        initializer: Option<BlockId>,
        body: BlockId,
        continuing: BlockId,
    },

    Switch {
        condition: ValueId,
        cases: Vec<SwitchCase>,
    },
}

impl ControlInstr {
    /// Nested blocks in the order they are printed
    pub fn blocks(&self) -> Vec<BlockId> {
        match self {
            ControlInstr::If {
                true_block,
                false_block,
                ..
            } => vec![*true_block, *false_block],
            ControlInstr::Loop {
                initializer,
                body,
                continuing,
            } => initializer
                .iter()
                .copied()
                .chain([*body, *continuing])
                .collect(),
            ControlInstr::Switch { cases, .. } => cases.iter().map(|c| c.block).collect(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ControlInstr::If { .. } => "if",
            ControlInstr::Loop { .. } => "loop",
            ControlInstr::Switch { .. } => "switch",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub selectors: Vec<CaseSelector>,
    pub block: BlockId,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaseSelector {
    Default,
    /// Constant value
    Value(ValueId),
}

/// Block terminator
#[derive(Clone, Debug, PartialEq)]
pub enum Terminator {
    /// Return from the enclosing function
    Return {
        func: FuncId,
        value: Option<ValueId>,
    },

    /// Leave an `if`, optionally producing its results
    ExitIf { target: InstId, args: Vec<ValueId> },

    ExitLoop { target: InstId },

    ExitSwitch { target: InstId },

    /// Jump from a loop body to its continuing block
    Continue { target: InstId },

    /// Jump from an initializer or continuing block back to the loop body
    NextIteration { target: InstId },

    /// Leave the loop when `condition` holds, otherwise start the next iteration
    BreakIf { target: InstId, condition: ValueId },

    Unreachable,
}

impl Terminator {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Terminator::Return { .. } => "ret",
            Terminator::ExitIf { .. } => "exit_if",
            Terminator::ExitLoop { .. } => "exit_loop",
            Terminator::ExitSwitch { .. } => "exit_switch",
            Terminator::Continue { .. } => "continue",
            Terminator::NextIteration { .. } => "next_iteration",
            Terminator::BreakIf { .. } => "break_if",
            Terminator::Unreachable => "unreachable",
        }
    }

    /// The control instruction this terminator transfers to, if any
    pub fn target(&self) -> Option<InstId> {
        match self {
            Terminator::ExitIf { target, .. }
            | Terminator::ExitLoop { target }
            | Terminator::ExitSwitch { target }
            | Terminator::Continue { target }
            | Terminator::NextIteration { target }
            | Terminator::BreakIf { target, .. } => Some(*target),
            Terminator::Return { .. } | Terminator::Unreachable => None,
        }
    }
}
