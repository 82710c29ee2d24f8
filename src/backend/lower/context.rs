//! Lowering context for typed AST to IR translation
//!
//! This module provides the context that tracks state during lowering:
//! the insertion cursor, the lexical scopes, the stack of enclosing loops
//! and switches, and the diagnostics recorded so far.
//!
//! Nested state is only ever changed through the `with_*` guards, which
//! restore it on every exit path including early `Err` returns.

use crate::backend::ir::{BlockId, FuncId, Instruction, InstId, IrBuilder, Module, Terminator, ValueId};
use crate::backend::lower::control::{ControlEntry, ControlFlags, ControlStack};
use crate::backend::lower::error::{Diagnostics, LowerError};
use crate::backend::lower::scope::ScopeStack;
use crate::common::span::{Span, Spanned};
use crate::common::tast::{ExprId, TExpr, TProgram};
use crate::common::types::Type;

/// Context for lowering one program
pub struct LoweringContext<'p> {
    /// The IR builder owning the module under construction
    pub builder: IrBuilder,

    program: &'p TProgram,

    /// Block receiving new instructions. `None` once the block has been
    /// terminated and until a new one is selected.
    current_block: Option<BlockId>,

    current_function: Option<FuncId>,

    scopes: ScopeStack,

    control_stack: ControlStack,

    diagnostics: Diagnostics,
}

impl<'p> LoweringContext<'p> {
    pub fn new(program: &'p TProgram) -> Self {
        Self {
            builder: IrBuilder::new(),
            program,
            current_block: None,
            current_function: None,
            scopes: ScopeStack::new(),
            control_stack: ControlStack::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn expr(&self, id: ExprId) -> Result<&'p Spanned<TExpr>, LowerError> {
        self.program
            .exprs
            .get(id)
            .ok_or_else(|| LowerError::internal(format!("expression {:?} out of range", id), Span::default()))
    }

    // ========================================================================
    // Cursor and terminators
    // ========================================================================

    pub fn cursor(&self) -> Option<BlockId> {
        self.current_block
    }

    pub(crate) fn set_cursor(&mut self, block: Option<BlockId>) {
        self.current_block = block;
    }

    /// The current block, or an internal error if control already left it
    pub fn current_block(&self, span: Span) -> Result<BlockId, LowerError> {
        self.current_block
            .ok_or_else(|| LowerError::internal("no current block to emit into", span))
    }

    /// Whether the current block exists and still lacks a terminator
    pub fn need_terminator(&self) -> bool {
        self.current_block
            .is_some_and(|block| !self.builder.is_terminated(block))
    }

    /// Terminate the current block and clear the cursor
    pub fn set_terminator(&mut self, terminator: Terminator, span: Span) -> Result<InstId, LowerError> {
        let block = self.current_block(span)?;
        if self.builder.is_terminated(block) {
            return Err(LowerError::internal(
                format!("block {} already has a terminator", block),
                span,
            ));
        }
        tracing::trace!(%block, terminator = terminator.mnemonic(), "terminate block");
        let inst = self.builder.terminate(block, terminator);
        self.current_block = None;
        Ok(inst)
    }

    /// Append an instruction without a result to the current block
    pub fn append(&mut self, inst: Instruction, span: Span) -> Result<InstId, LowerError> {
        let block = self.current_block(span)?;
        Ok(self.builder.append(block, inst))
    }

    /// Append an instruction defining a value of type `ty`
    pub fn append_value(
        &mut self,
        ty: Type,
        span: Span,
        make: impl FnOnce(ValueId) -> Instruction,
    ) -> Result<ValueId, LowerError> {
        let block = self.current_block(span)?;
        Ok(self.builder.append_with_result(block, ty, make).1)
    }

    // ========================================================================
    // Scoped guards
    // ========================================================================

    /// Run `f` with `block` as the insertion point, restoring the previous
    /// cursor afterwards
    pub fn with_block<T>(
        &mut self,
        block: Option<BlockId>,
        f: impl FnOnce(&mut Self) -> Result<T, LowerError>,
    ) -> Result<T, LowerError> {
        let saved = std::mem::replace(&mut self.current_block, block);
        let result = f(self);
        self.current_block = saved;
        result
    }

    /// Run `f` inside a fresh lexical scope
    pub fn with_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, LowerError>,
    ) -> Result<T, LowerError> {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` with `entry` on the control stack. Also opens a lexical
    /// scope, shared by a loop's body and continuing blocks.
    pub fn with_control<T>(
        &mut self,
        entry: ControlEntry,
        f: impl FnOnce(&mut Self) -> Result<T, LowerError>,
    ) -> Result<T, LowerError> {
        self.control_stack.push(entry);
        let result = self.with_scope(f);
        self.control_stack.pop();
        result
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    pub fn declare(&mut self, name: &str, value: ValueId) {
        self.scopes.set(name, value);
    }

    pub fn lookup(&self, name: &str) -> Option<ValueId> {
        self.scopes.get(name)
    }

    pub fn find_enclosing(&self, flags: ControlFlags) -> Option<ControlEntry> {
        self.control_stack.find_enclosing(flags)
    }

    pub fn control_depth(&self) -> usize {
        self.control_stack.depth()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    // ========================================================================
    // Functions and diagnostics
    // ========================================================================

    pub(crate) fn enter_function(&mut self, id: FuncId) {
        self.current_function = Some(id);
    }

    pub(crate) fn leave_function(&mut self) {
        self.current_function = None;
        self.current_block = None;
    }

    pub fn current_function(&self, span: Span) -> Result<FuncId, LowerError> {
        self.current_function
            .ok_or_else(|| LowerError::internal("return outside of a function", span))
    }

    /// Record a diagnostic, tagged with the function it came from
    pub fn report(&mut self, function: Option<String>, error: LowerError) {
        tracing::error!(function = ?function, code = error.code(), "{}", error);
        self.diagnostics.push(function, error);
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The finished module, or every diagnostic if any was recorded
    pub fn finish(self) -> Result<Module, Diagnostics> {
        if self.diagnostics.is_empty() {
            Ok(self.builder.into_module())
        } else {
            Err(self.diagnostics)
        }
    }
}
