//! Expression lowering
//!
//! Expressions are lowered without recursion. A stack of tasks drives the
//! traversal: `Process` for a node pushes the task that emits the node and
//! then `Process` tasks for its children, so children are emitted first
//! and left to right. Results are recorded per expression id.
//!
//! `&&` and `||` open an `if` after their left operand and evaluate the
//! right operand inside one branch only. Indexing into a reference to a
//! vector yields a [`VectorElementRef`] rather than an address, because
//! vector components are not addressable in the IR.

use crate::backend::ir::{
    BinaryOp, BlockId, Instruction, InstId, Terminator, UnaryOp, ValueId, ValueKind,
};
use crate::backend::lower::context::LoweringContext;
use crate::backend::lower::error::LowerError;
use crate::common::ast::{BinOp, UnaryOp as AstUnaryOp};
use crate::common::span::Span;
use crate::common::tast::{CallTarget, ExprId, MemberAccess, TExpr, TExprKind};
use crate::common::types::{ConstValue, Type};
use std::collections::{HashMap, HashSet};

/// A vector component named through a reference to the vector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorElementRef {
    /// Pointer to the vector
    pub vector: ValueId,
    pub index: ValueId,
}

/// What an expression lowers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lowered {
    Value(ValueId),
    VectorElement(VectorElementRef),
}

/// Lower an expression, restoring the insertion cursor even on failure
pub fn lower_expr(ctx: &mut LoweringContext, expr: ExprId) -> Result<Lowered, LowerError> {
    let cursor = ctx.cursor();
    ctx.with_block(cursor, |ctx| Emitter::new(ctx).emit(expr))
}

/// Lower an expression that must produce a plain value
pub fn lower_value_expr(ctx: &mut LoweringContext, expr: ExprId) -> Result<ValueId, LowerError> {
    match lower_expr(ctx, expr)? {
        Lowered::Value(value) => Ok(value),
        Lowered::VectorElement(_) => {
            let span = ctx.expr(expr)?.1;
            Err(LowerError::internal(
                "expression resolved to a vector element, not a value",
                span,
            ))
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Task {
    Process(ExprId),
    EmitBinary(ExprId),
    EmitUnary(ExprId),
    EmitBitcast(ExprId),
    EmitCall(ExprId),
    EmitAccess(ExprId),
    BeginShortCircuit(ExprId),
    EndShortCircuit(ExprId),
}

struct Emitter<'c, 'p> {
    ctx: &'c mut LoweringContext<'p>,
    tasks: Vec<Task>,
    /// Cursors saved while emitting inside a short-circuit branch
    blocks: Vec<Option<BlockId>>,
    /// Expressions already handed to `process`; trees are never shared
    visited: HashSet<ExprId>,
    bindings: HashMap<ExprId, Lowered>,
    short_circuits: HashMap<ExprId, InstId>,
}

impl<'c, 'p> Emitter<'c, 'p> {
    fn new(ctx: &'c mut LoweringContext<'p>) -> Self {
        Self {
            ctx,
            tasks: Vec::new(),
            blocks: Vec::new(),
            visited: HashSet::new(),
            bindings: HashMap::new(),
            short_circuits: HashMap::new(),
        }
    }

    fn emit(mut self, root: ExprId) -> Result<Lowered, LowerError> {
        self.tasks.push(Task::Process(root));
        while let Some(task) = self.tasks.pop() {
            tracing::trace!(?task, "expression task");
            match task {
                Task::Process(id) => self.process(id)?,
                Task::EmitBinary(id) => self.emit_binary(id)?,
                Task::EmitUnary(id) => self.emit_unary(id)?,
                Task::EmitBitcast(id) => self.emit_bitcast(id)?,
                Task::EmitCall(id) => self.emit_call(id)?,
                Task::EmitAccess(id) => self.emit_access(id)?,
                Task::BeginShortCircuit(id) => self.begin_short_circuit(id)?,
                Task::EndShortCircuit(id) => self.end_short_circuit(id)?,
            }
        }
        if !self.blocks.is_empty() {
            let span = self.ctx.expr(root)?.1;
            return Err(LowerError::internal("unbalanced short-circuit blocks", span));
        }
        self.lowered(root)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    fn lowered(&self, id: ExprId) -> Result<Lowered, LowerError> {
        match self.bindings.get(&id) {
            Some(lowered) => Ok(*lowered),
            None => {
                let span = self.ctx.expr(id)?.1;
                Err(LowerError::internal("expression produced no value", span))
            }
        }
    }

    fn value_of(&self, id: ExprId) -> Result<ValueId, LowerError> {
        match self.lowered(id)? {
            Lowered::Value(value) => Ok(value),
            Lowered::VectorElement(_) => {
                let span = self.ctx.expr(id)?.1;
                Err(LowerError::internal(
                    "vector element used where a value is required",
                    span,
                ))
            }
        }
    }

    /// Record the value of `id`, loading through it if the expression is
    /// flagged as loaded
    fn bind(&mut self, id: ExprId, value: ValueId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let value = if expr.load {
            let ty = expr.ty.unwrap_ref().clone();
            self.ctx
                .append_value(ty, *span, |result| Instruction::Load { result, from: value })?
        } else {
            value
        };
        self.bindings.insert(id, Lowered::Value(value));
        Ok(())
    }

    fn bind_vector_element(&mut self, id: ExprId, access: VectorElementRef) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let lowered = if expr.load {
            let ty = expr.ty.unwrap_ref().clone();
            let value = self.ctx.append_value(ty, *span, |result| Instruction::LoadVectorElement {
                result,
                from: access.vector,
                index: access.index,
            })?;
            Lowered::Value(value)
        } else {
            Lowered::VectorElement(access)
        };
        self.bindings.insert(id, lowered);
        Ok(())
    }

    fn push_block(&mut self, block: BlockId) {
        self.blocks.push(self.ctx.cursor());
        self.ctx.set_cursor(Some(block));
    }

    fn pop_block(&mut self, span: Span) -> Result<(), LowerError> {
        let saved = self
            .blocks
            .pop()
            .ok_or_else(|| LowerError::internal("short-circuit block stack underflow", span))?;
        self.ctx.set_cursor(saved);
        Ok(())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    fn process(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        if !self.visited.insert(id) {
            return Err(LowerError::internal("expression visited twice", *span));
        }

        if let Some(constant) = &expr.constant {
            let value = self.ctx.builder.constant(constant.clone());
            self.bindings.insert(id, Lowered::Value(value));
            return Ok(());
        }

        match &expr.kind {
            TExprKind::Binary { op, lhs, rhs } if op.is_short_circuit() => {
                self.tasks.push(Task::EndShortCircuit(id));
                self.tasks.push(Task::Process(*rhs));
                self.tasks.push(Task::BeginShortCircuit(id));
                self.tasks.push(Task::Process(*lhs));
            }
            TExprKind::Binary { lhs, rhs, .. } => {
                self.tasks.push(Task::EmitBinary(id));
                self.tasks.push(Task::Process(*rhs));
                self.tasks.push(Task::Process(*lhs));
            }
            TExprKind::Index { object, index } => {
                self.tasks.push(Task::EmitAccess(id));
                self.tasks.push(Task::Process(*index));
                self.tasks.push(Task::Process(*object));
            }
            TExprKind::Member { object, .. } => {
                self.tasks.push(Task::EmitAccess(id));
                self.tasks.push(Task::Process(*object));
            }
            TExprKind::Unary { operand, .. } => {
                self.tasks.push(Task::EmitUnary(id));
                self.tasks.push(Task::Process(*operand));
            }
            TExprKind::Bitcast { operand } => {
                self.tasks.push(Task::EmitBitcast(id));
                self.tasks.push(Task::Process(*operand));
            }
            TExprKind::Call { args, .. } => {
                self.tasks.push(Task::EmitCall(id));
                for arg in args.iter().rev() {
                    self.tasks.push(Task::Process(*arg));
                }
            }
            TExprKind::Literal(literal) => {
                let constant = literal.to_const(&expr.ty).ok_or_else(|| {
                    LowerError::MissingLiteralValue {
                        ty: expr.ty.to_string(),
                        span: *span,
                    }
                })?;
                let value = self.ctx.builder.constant(constant);
                self.bind(id, value)?;
            }
            TExprKind::Identifier(name) => {
                let value = self.ctx.lookup(name).ok_or_else(|| LowerError::UnresolvedIdentifier {
                    name: name.clone(),
                    span: *span,
                })?;
                self.bind(id, value)?;
            }
            TExprKind::Phony => {
                return Err(LowerError::internal("phony expression has no value", *span));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn emit_binary(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Binary { op, lhs, rhs } = &expr.kind else {
            return Err(LowerError::internal("expected a binary expression", *span));
        };
        let op = BinaryOp::from_ast(*op).ok_or_else(|| {
            LowerError::internal(format!("`{}` has no binary instruction", op), *span)
        })?;
        let lhs = self.value_of(*lhs)?;
        let rhs = self.value_of(*rhs)?;
        let value = self.ctx.append_value(expr.ty.clone(), *span, |result| Instruction::Binary {
            result,
            op,
            lhs,
            rhs,
        })?;
        self.bind(id, value)
    }

    fn emit_unary(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Unary { op, operand } = &expr.kind else {
            return Err(LowerError::internal("expected a unary expression", *span));
        };
        let operand = self.value_of(*operand)?;
        let op = match op {
            // References and pointers share one representation in the IR
            AstUnaryOp::AddressOf | AstUnaryOp::Indirection => return self.bind(id, operand),
            AstUnaryOp::Complement => UnaryOp::Complement,
            AstUnaryOp::Negation => UnaryOp::Negation,
            AstUnaryOp::Not => UnaryOp::Not,
        };
        let value = self.ctx.append_value(expr.ty.clone(), *span, |result| Instruction::Unary {
            result,
            op,
            operand,
        })?;
        self.bind(id, value)
    }

    fn emit_bitcast(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Bitcast { operand } = &expr.kind else {
            return Err(LowerError::internal("expected a bitcast expression", *span));
        };
        let operand = self.value_of(*operand)?;
        let value = self
            .ctx
            .append_value(expr.ty.clone(), *span, |result| Instruction::Bitcast {
                result,
                value: operand,
            })?;
        self.bind(id, value)
    }

    fn emit_call(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Call { target, args } = &expr.kind else {
            return Err(LowerError::internal("expected a call expression", *span));
        };
        let args = args
            .iter()
            .map(|arg| self.value_of(*arg))
            .collect::<Result<Vec<_>, _>>()?;
        let ty = expr.ty.clone();

        let value = match target {
            CallTarget::Function(name) => {
                let callee_value = self.ctx.lookup(name).ok_or_else(|| {
                    LowerError::UnresolvedIdentifier {
                        name: name.clone(),
                        span: *span,
                    }
                })?;
                let ValueKind::Function(callee) = *self.ctx.builder.value_kind(callee_value) else {
                    return Err(LowerError::NotAFunction {
                        name: name.clone(),
                        span: *span,
                    });
                };
                self.ctx.append_value(ty, *span, |result| Instruction::Call {
                    result,
                    callee,
                    args,
                })?
            }
            CallTarget::Builtin(builtin) => {
                self.ctx.append_value(ty, *span, |result| Instruction::BuiltinCall {
                    result,
                    builtin: builtin.clone(),
                    args,
                })?
            }
            CallTarget::Constructor => self
                .ctx
                .append_value(ty, *span, |result| Instruction::Construct { result, args })?,
            CallTarget::Conversion => {
                let value = *args.first().ok_or_else(|| {
                    LowerError::internal("conversion without an argument", *span)
                })?;
                self.ctx
                    .append_value(ty, *span, |result| Instruction::Convert { result, value })?
            }
        };
        self.bind(id, value)
    }

    /// A component of a vector held in memory, if `id` names one
    fn as_vector_element(&mut self, expr: &TExpr) -> Result<Option<VectorElementRef>, LowerError> {
        let (object, index) = match &expr.kind {
            TExprKind::Index { object, index } => (*object, Some(*index)),
            TExprKind::Member {
                object,
                member: MemberAccess::Swizzle { .. },
            } => (*object, None),
            _ => return Ok(None),
        };

        let (object_expr, _) = self.ctx.expr(object)?;
        let is_vector_ref = object_expr.ty.is_reference()
            && !object_expr.load
            && object_expr.ty.unwrap_ref().is_vector();
        if !is_vector_ref {
            return Ok(None);
        }

        let vector = self.value_of(object)?;
        let index = match (index, &expr.kind) {
            (Some(index), _) => self.value_of(index)?,
            (
                None,
                TExprKind::Member {
                    member: MemberAccess::Swizzle { indices },
                    ..
                },
            ) => match indices.as_slice() {
                [single] => self.ctx.builder.constant(ConstValue::U32(*single)),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(VectorElementRef { vector, index }))
    }

    fn emit_access(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;

        if let Some(access) = self.as_vector_element(expr)? {
            return self.bind_vector_element(id, access);
        }

        let (object_id, index) = match &expr.kind {
            TExprKind::Index { object, index } => (*object, Some(self.value_of(*index)?)),
            TExprKind::Member { object, member } => match member {
                MemberAccess::Field { index, .. } => {
                    (*object, Some(self.ctx.builder.constant(ConstValue::U32(*index))))
                }
                MemberAccess::Swizzle { indices } if indices.len() == 1 => {
                    (*object, Some(self.ctx.builder.constant(ConstValue::U32(indices[0]))))
                }
                MemberAccess::Swizzle { .. } => (*object, None),
            },
            _ => return Err(LowerError::internal("expected an access expression", *span)),
        };
        let object = self.value_of(object_id)?;

        // Accessing through a pointer yields a pointer
        let mut ty = expr.ty.unwrap_ref().clone();
        if let Some((space, _, access)) = self.ctx.builder.value_type(object).memory_view() {
            if !ty.is_pointer() {
                ty = Type::ptr(space, ty, access);
            }
        }

        let Some(index) = index else {
            let TExprKind::Member {
                member: MemberAccess::Swizzle { indices },
                ..
            } = &expr.kind
            else {
                return Err(LowerError::internal("expected a swizzle", *span));
            };
            let indices = indices.clone();
            let value = self.ctx.append_value(ty, *span, |result| Instruction::Swizzle {
                result,
                object,
                indices,
            })?;
            return self.bind(id, value);
        };

        if let Some(value) = self.fold_into_access(object, index, &ty, *span)? {
            return self.bind(id, value);
        }

        let value = self.ctx.append_value(ty, *span, |result| Instruction::Access {
            result,
            object,
            indices: vec![index],
        })?;
        self.bind(id, value)
    }

    /// Extend an unnamed access in the current block with one more index
    fn fold_into_access(
        &mut self,
        object: ValueId,
        index: ValueId,
        ty: &Type,
        span: Span,
    ) -> Result<Option<ValueId>, LowerError> {
        if self.ctx.builder.name_of(object).is_some() {
            return Ok(None);
        }
        let ValueKind::InstructionResult(inst) = *self.ctx.builder.value_kind(object) else {
            return Ok(None);
        };
        if !matches!(self.ctx.builder.inst(inst), Instruction::Access { .. }) {
            return Ok(None);
        }
        let block = self.ctx.current_block(span)?;
        if !self.ctx.builder.move_to_end(block, inst) {
            return Ok(None);
        }
        if let Instruction::Access { indices, .. } = self.ctx.builder.inst_mut(inst) {
            indices.push(index);
        }
        self.ctx.builder.set_value_type(object, ty.clone());
        Ok(Some(object))
    }

    fn begin_short_circuit(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Binary { op, lhs, .. } = &expr.kind else {
            return Err(LowerError::internal("expected a logical expression", *span));
        };
        let lhs = self.value_of(*lhs)?;
        let block = self.ctx.current_block(*span)?;
        let if_inst = self.ctx.builder.if_(block, lhs);
        let result = self.ctx.builder.add_if_result(if_inst, Type::Bool);
        let blocks = self.ctx.builder.control_blocks(if_inst);
        let [true_block, false_block] = blocks[..] else {
            return Err(LowerError::internal("if without two branches", *span));
        };

        // The short-circuit branch yields the operator's identity at once,
        // the other one evaluates the right operand
        let (exit_block, identity, rhs_block) = match op {
            BinOp::LogicalAnd => (false_block, false, true_block),
            BinOp::LogicalOr => (true_block, true, false_block),
            _ => return Err(LowerError::internal("expected `&&` or `||`", *span)),
        };
        let identity = self.ctx.builder.constant(ConstValue::Bool(identity));
        self.ctx.builder.terminate(
            exit_block,
            Terminator::ExitIf {
                target: if_inst,
                args: vec![identity],
            },
        );

        self.short_circuits.insert(id, if_inst);
        self.bindings.insert(id, Lowered::Value(result));
        self.push_block(rhs_block);
        Ok(())
    }

    fn end_short_circuit(&mut self, id: ExprId) -> Result<(), LowerError> {
        let (expr, span) = self.ctx.expr(id)?;
        let TExprKind::Binary { rhs, .. } = &expr.kind else {
            return Err(LowerError::internal("expected a logical expression", *span));
        };
        let if_inst = *self
            .short_circuits
            .get(&id)
            .ok_or_else(|| LowerError::internal("short-circuit was never opened", *span))?;
        let rhs = self.value_of(*rhs)?;
        self.ctx.set_terminator(
            Terminator::ExitIf {
                target: if_inst,
                args: vec![rhs],
            },
            *span,
        )?;
        self.pop_block(*span)
    }
}
