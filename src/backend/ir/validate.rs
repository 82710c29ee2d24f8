//! Structural checks over a lowered module
//!
//! Every function block ends in exactly one terminator, nothing follows a
//! terminator, and every exit names a control instruction it is allowed to
//! leave from where it sits. The root block holds no terminator at all.

use crate::backend::ir::instr::{ControlInstr, Instruction, Terminator};
use crate::backend::ir::program::{BlockRole, Module};
use crate::backend::ir::types::{BlockId, InstId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block {block} in function `{function}` does not end in a terminator")]
    MissingTerminator { function: String, block: BlockId },

    #[error("block {block} in function `{function}` has instructions after its terminator")]
    TerminatorNotLast { function: String, block: BlockId },

    #[error("root block contains a terminator")]
    TerminatedRoot,

    #[error(
        "`{terminator}` in block {block} of function `{function}` does not target an enclosing {expected}"
    )]
    BadTarget {
        function: String,
        block: BlockId,
        terminator: &'static str,
        expected: &'static str,
    },

    #[error(
        "`exit_if` in block {block} of function `{function}` passes {found} value(s) but the if has {expected} result(s)"
    )]
    ExitIfArity {
        function: String,
        block: BlockId,
        expected: usize,
        found: usize,
    },
}

/// Validate a module, collecting every violation
pub fn validate(module: &Module) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if module
        .instructions_of(module.root_block)
        .any(|(_, inst)| inst.is_terminator())
    {
        errors.push(ValidationError::TerminatedRoot);
    }

    for (_, func) in module.iter_functions() {
        let mut checker = Checker {
            module,
            function: &func.name,
            ancestors: Vec::new(),
            errors: &mut errors,
        };
        checker.check_block(func.block);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

struct Checker<'a> {
    module: &'a Module,
    function: &'a str,
    /// Enclosing control instructions with the role of the block entered
    ancestors: Vec<(InstId, BlockRole)>,
    errors: &'a mut Vec<ValidationError>,
}

impl<'a> Checker<'a> {
    fn check_block(&mut self, block: BlockId) {
        let module = self.module;
        let instructions = &module.block(block).instructions;

        match instructions.last().map(|&id| module.inst(id)) {
            Some(inst) if inst.is_terminator() => {}
            _ => self.errors.push(ValidationError::MissingTerminator {
                function: self.function.to_string(),
                block,
            }),
        }

        let count = instructions.len();
        for (pos, &id) in instructions.iter().enumerate() {
            match module.inst(id) {
                Instruction::Terminator(term) => {
                    if pos + 1 != count {
                        self.errors.push(ValidationError::TerminatorNotLast {
                            function: self.function.to_string(),
                            block,
                        });
                    }
                    self.check_terminator(block, term);
                }
                Instruction::Control(control) => {
                    for nested in control.blocks() {
                        let role = module.block(nested).role;
                        self.ancestors.push((id, role));
                        self.check_block(nested);
                        self.ancestors.pop();
                    }
                }
                _ => {}
            }
        }
    }

    /// Role of the block through which `target` was entered, if it encloses us
    fn entered_through(&self, target: InstId) -> Option<BlockRole> {
        self.ancestors
            .iter()
            .rev()
            .find(|(inst, _)| *inst == target)
            .map(|(_, role)| *role)
    }

    fn innermost(&self) -> Option<(InstId, BlockRole)> {
        self.ancestors.last().copied()
    }

    fn check_terminator(&mut self, block: BlockId, term: &Terminator) {
        let module = self.module;
        let target_kind = |target: InstId| module.inst(target).as_control();

        let (ok, expected) = match term {
            Terminator::Return { .. } | Terminator::Unreachable => (true, ""),
            Terminator::ExitIf { target, args } => {
                let ok = self.innermost().map(|(inst, _)| inst) == Some(*target)
                    && matches!(target_kind(*target), Some(ControlInstr::If { .. }));
                if let Some(ControlInstr::If { results, .. }) = target_kind(*target) {
                    if results.len() != args.len() {
                        self.errors.push(ValidationError::ExitIfArity {
                            function: self.function.to_string(),
                            block,
                            expected: results.len(),
                            found: args.len(),
                        });
                    }
                }
                (ok, "if")
            }
            Terminator::ExitLoop { target } => {
                let ok = matches!(target_kind(*target), Some(ControlInstr::Loop { .. }))
                    && self.entered_through(*target) == Some(BlockRole::Body);
                (ok, "loop body")
            }
            Terminator::Continue { target } => {
                let ok = matches!(target_kind(*target), Some(ControlInstr::Loop { .. }))
                    && self.entered_through(*target) == Some(BlockRole::Body);
                (ok, "loop body")
            }
            Terminator::ExitSwitch { target } => {
                let ok = matches!(target_kind(*target), Some(ControlInstr::Switch { .. }))
                    && self.entered_through(*target).is_some();
                (ok, "switch")
            }
            Terminator::NextIteration { target } => {
                let ok = matches!(
                    self.innermost(),
                    Some((inst, BlockRole::Initializer | BlockRole::Continuing)) if inst == *target
                );
                (ok, "loop initializer or continuing block")
            }
            Terminator::BreakIf { target, .. } => {
                let ok = matches!(
                    self.innermost(),
                    Some((inst, BlockRole::Continuing)) if inst == *target
                );
                (ok, "loop continuing block")
            }
        };

        if !ok {
            self.errors.push(ValidationError::BadTarget {
                function: self.function.to_string(),
                block,
                terminator: term.mnemonic(),
                expected,
            });
        }
    }
}
