//! Statement lowering
//!
//! Each statement appends to the current block. Control statements append
//! a control instruction, lower their parts into its nested blocks and then
//! leave the cursor on the parent block, where execution resumes once the
//! construct exits. A block that falls off its end receives the terminator
//! its position calls for (`exit_if`, `continue`, `next_iteration`,
//! `exit_switch`).

use crate::backend::ir::{
    BinaryOp, BlockId, CaseSelector, ControlInstr, InstId, Instruction, Terminator, ValueId,
};
use crate::backend::lower::context::LoweringContext;
use crate::backend::lower::control::{ControlEntry, ControlFlags, ControlKind};
use crate::backend::lower::error::LowerError;
use crate::backend::lower::expr::{lower_expr, lower_value_expr, Lowered};
use crate::common::ast::BinOp;
use crate::common::span::{Span, Spanned};
use crate::common::tast::{
    Behaviors, CaseSelector as AstCaseSelector, ExprId, TBlock, TExprKind, TStmt, TStmtKind,
    TSwitchCase, TVariable, VariableKind,
};
use crate::common::types::ConstValue;

/// Lower a block statement in its own scope
pub fn lower_block(ctx: &mut LoweringContext, block: &TBlock) -> Result<(), LowerError> {
    ctx.with_scope(|ctx| lower_stmts(ctx, &block.statements))
}

/// Lower statements in order, stopping after the first one that cannot
/// fall through
pub fn lower_stmts(ctx: &mut LoweringContext, stmts: &[Spanned<TStmt>]) -> Result<(), LowerError> {
    for (i, stmt) in stmts.iter().enumerate() {
        let behaviors = stmt
            .0
            .behaviors
            .ok_or(LowerError::MissingBehaviors { span: stmt.1 })?;

        lower_stmt(ctx, stmt)?;

        if !behaviors.contains(Behaviors::NEXT) {
            let dropped = stmts.len() - i - 1;
            if dropped > 0 {
                tracing::trace!(dropped, "dropping unreachable statements");
            }
            break;
        }
    }
    Ok(())
}

pub fn lower_stmt(ctx: &mut LoweringContext, stmt: &Spanned<TStmt>) -> Result<(), LowerError> {
    let (stmt, span) = stmt;
    let span = *span;
    tracing::trace!(kind = kind_name(&stmt.kind), %span, "lower statement");

    match &stmt.kind {
        TStmtKind::Assignment { lhs, rhs } => lower_assignment(ctx, *lhs, *rhs, span),
        TStmtKind::CompoundAssignment { lhs, op, rhs } => {
            let target = lower_expr(ctx, *lhs)?;
            let rhs = lower_value_expr(ctx, *rhs)?;
            lower_compound_assignment(ctx, target, rhs, *op, span)
        }
        TStmtKind::IncrementDecrement { lhs, increment } => {
            let target = lower_expr(ctx, *lhs)?;
            let one = if ctx.expr(*lhs)?.0.ty.unwrap_ref().is_signed_integer_scalar() {
                ConstValue::I32(1)
            } else {
                ConstValue::U32(1)
            };
            let one = ctx.builder.constant(one);
            let op = if *increment {
                BinOp::Add
            } else {
                BinOp::Subtract
            };
            lower_compound_assignment(ctx, target, one, op, span)
        }
        TStmtKind::Block(block) => lower_block(ctx, block),
        TStmtKind::Break => lower_break(ctx, span),
        TStmtKind::BreakIf { condition } => lower_break_if(ctx, *condition, span),
        TStmtKind::Call { expr } => lower_expr(ctx, *expr).map(|_| ()),
        TStmtKind::Continue => lower_continue(ctx, span),
        TStmtKind::Discard => ctx.append(Instruction::Discard, span).map(|_| ()),
        TStmtKind::If {
            condition,
            body,
            else_stmt,
        } => lower_if(ctx, *condition, body, else_stmt.as_deref(), span),
        TStmtKind::Loop { body, continuing } => lower_loop(ctx, body, continuing.as_ref(), span),
        TStmtKind::ForLoop {
            initializer,
            condition,
            continuing,
            body,
        } => lower_for_loop(
            ctx,
            initializer.as_deref(),
            *condition,
            continuing.as_deref(),
            body,
            span,
        ),
        TStmtKind::While { condition, body } => lower_while(ctx, *condition, body, span),
        TStmtKind::Return { value } => lower_return(ctx, *value, span),
        TStmtKind::Switch { condition, cases } => lower_switch(ctx, *condition, cases, span),
        TStmtKind::VariableDecl(var) => lower_variable(ctx, var, false),
        TStmtKind::ConstAssert => Ok(()),
    }
}

fn kind_name(kind: &TStmtKind) -> &'static str {
    match kind {
        TStmtKind::Assignment { .. } => "assignment",
        TStmtKind::CompoundAssignment { .. } => "compound assignment",
        TStmtKind::IncrementDecrement { .. } => "increment/decrement",
        TStmtKind::Block(_) => "block",
        TStmtKind::Break => "break",
        TStmtKind::BreakIf { .. } => "break if",
        TStmtKind::Call { .. } => "call",
        TStmtKind::Continue => "continue",
        TStmtKind::Discard => "discard",
        TStmtKind::If { .. } => "if",
        TStmtKind::Loop { .. } => "loop",
        TStmtKind::ForLoop { .. } => "for",
        TStmtKind::While { .. } => "while",
        TStmtKind::Return { .. } => "return",
        TStmtKind::Switch { .. } => "switch",
        TStmtKind::VariableDecl(_) => "variable declaration",
        TStmtKind::ConstAssert => "const_assert",
    }
}

// ============================================================================
// Assignments
// ============================================================================

fn lower_assignment(
    ctx: &mut LoweringContext,
    lhs: ExprId,
    rhs: ExprId,
    span: Span,
) -> Result<(), LowerError> {
    // `_ = e` only evaluates `e`
    if matches!(ctx.expr(lhs)?.0.kind, TExprKind::Phony) {
        lower_value_expr(ctx, rhs)?;
        return Ok(());
    }

    let target = lower_expr(ctx, lhs)?;
    let value = lower_value_expr(ctx, rhs)?;
    let store = match target {
        Lowered::Value(to) => Instruction::Store { to, value },
        Lowered::VectorElement(element) => Instruction::StoreVectorElement {
            to: element.vector,
            index: element.index,
            value,
        },
    };
    ctx.append(store, span)?;
    Ok(())
}

/// `target op= rhs` as load, binary, store
fn lower_compound_assignment(
    ctx: &mut LoweringContext,
    target: Lowered,
    rhs: ValueId,
    op: BinOp,
    span: Span,
) -> Result<(), LowerError> {
    let op = BinaryOp::from_ast(op).ok_or_else(|| {
        LowerError::internal(format!("`{}` is not a compound assignment operator", op), span)
    })?;

    match target {
        Lowered::Value(pointer) => {
            let ty = ctx
                .builder
                .value_type(pointer)
                .memory_view()
                .map(|(_, store, _)| store.clone())
                .ok_or_else(|| LowerError::internal("assignment target is not a pointer", span))?;
            let loaded = ctx.append_value(ty.clone(), span, |result| Instruction::Load {
                result,
                from: pointer,
            })?;
            let combined = ctx.append_value(ty, span, |result| Instruction::Binary {
                result,
                op,
                lhs: loaded,
                rhs,
            })?;
            ctx.append(
                Instruction::Store {
                    to: pointer,
                    value: combined,
                },
                span,
            )?;
        }
        Lowered::VectorElement(element) => {
            let ty = ctx
                .builder
                .value_type(element.vector)
                .memory_view()
                .and_then(|(_, store, _)| store.element().cloned())
                .ok_or_else(|| {
                    LowerError::internal("vector element target is not a vector pointer", span)
                })?;
            let loaded = ctx.append_value(ty.clone(), span, |result| {
                Instruction::LoadVectorElement {
                    result,
                    from: element.vector,
                    index: element.index,
                }
            })?;
            let combined = ctx.append_value(ty, span, |result| Instruction::Binary {
                result,
                op,
                lhs: loaded,
                rhs,
            })?;
            ctx.append(
                Instruction::StoreVectorElement {
                    to: element.vector,
                    index: element.index,
                    value: combined,
                },
                span,
            )?;
        }
    }
    Ok(())
}

// ============================================================================
// Variables
// ============================================================================

/// Lower a declaration. `is_global` is set for module-scope variables,
/// which are the only ones that keep their binding point.
pub fn lower_variable(
    ctx: &mut LoweringContext,
    var: &TVariable,
    is_global: bool,
) -> Result<(), LowerError> {
    let span = var.span;
    match var.kind {
        VariableKind::Var => {
            let pointer_ty = var.ty.reference_to_pointer().ok_or_else(|| {
                LowerError::internal(format!("var `{}` does not have a reference type", var.name), span)
            })?;
            let initializer = var
                .initializer
                .map(|init| lower_value_expr(ctx, init))
                .transpose()?;
            let binding_point = if is_global { var.binding_point } else { None };
            let value = ctx.append_value(pointer_ty, span, |result| Instruction::Var {
                result,
                initializer,
                binding_point,
            })?;
            ctx.declare(&var.name, value);
            ctx.builder.set_name(value, &var.name);
        }
        VariableKind::Let => {
            let init = var.initializer.ok_or_else(|| {
                LowerError::internal(format!("let `{}` has no initializer", var.name), span)
            })?;
            let block = ctx.current_block(span)?;
            let last = ctx.builder.last_instruction(block);
            let value = lower_value_expr(ctx, init)?;

            let value = if ctx.builder.last_instruction(block) == last {
                // The initializer emitted nothing; give the let its own instruction
                let ty = ctx.builder.value_type(value).clone();
                let named = ctx.append_value(ty, span, |result| Instruction::Let { result, value })?;
                ctx.builder.set_name(named, &var.name);
                named
            } else {
                ctx.builder.set_name(value, &var.name);
                value
            };
            ctx.declare(&var.name, value);
        }
        VariableKind::Const => {
            tracing::trace!(name = %var.name, "const folded upstream");
        }
        VariableKind::Override => {
            return Err(LowerError::UnsubstitutedOverride {
                name: var.name.clone(),
                span,
            });
        }
    }
    Ok(())
}

// ============================================================================
// Control flow
// ============================================================================

fn if_blocks(ctx: &LoweringContext, inst: InstId, span: Span) -> Result<(BlockId, BlockId), LowerError> {
    match ctx.builder.inst(inst) {
        Instruction::Control(ControlInstr::If {
            true_block,
            false_block,
            ..
        }) => Ok((*true_block, *false_block)),
        _ => Err(LowerError::internal("expected an if instruction", span)),
    }
}

fn loop_blocks(
    ctx: &LoweringContext,
    inst: InstId,
    span: Span,
) -> Result<(Option<BlockId>, BlockId, BlockId), LowerError> {
    match ctx.builder.inst(inst) {
        Instruction::Control(ControlInstr::Loop {
            initializer,
            body,
            continuing,
        }) => Ok((*initializer, *body, *continuing)),
        _ => Err(LowerError::internal("expected a loop instruction", span)),
    }
}

/// Terminate the current block with `terminator` unless it already left
fn terminate_if_needed(
    ctx: &mut LoweringContext,
    terminator: Terminator,
    span: Span,
) -> Result<(), LowerError> {
    if ctx.need_terminator() {
        ctx.set_terminator(terminator, span)?;
    }
    Ok(())
}

fn lower_if(
    ctx: &mut LoweringContext,
    condition: ExprId,
    body: &TBlock,
    else_stmt: Option<&Spanned<TStmt>>,
    span: Span,
) -> Result<(), LowerError> {
    let condition = lower_value_expr(ctx, condition)?;
    let block = ctx.current_block(span)?;
    let if_inst = ctx.builder.if_(block, condition);
    let (true_block, false_block) = if_blocks(ctx, if_inst, span)?;
    let exit = || Terminator::ExitIf {
        target: if_inst,
        args: Vec::new(),
    };

    let entry = ControlEntry {
        inst: if_inst,
        kind: ControlKind::If,
    };
    ctx.with_control(entry, |ctx| {
        ctx.with_block(Some(true_block), |ctx| {
            lower_block(ctx, body)?;
            terminate_if_needed(ctx, exit(), span)
        })?;
        ctx.with_block(Some(false_block), |ctx| {
            if let Some(else_stmt) = else_stmt {
                lower_stmt(ctx, else_stmt)?;
            }
            terminate_if_needed(ctx, exit(), span)
        })
    })
}

fn lower_loop(
    ctx: &mut LoweringContext,
    body: &TBlock,
    continuing: Option<&TBlock>,
    span: Span,
) -> Result<(), LowerError> {
    let block = ctx.current_block(span)?;
    let loop_inst = ctx.builder.loop_(block, false);
    let (_, body_block, continuing_block) = loop_blocks(ctx, loop_inst, span)?;

    let entry = ControlEntry {
        inst: loop_inst,
        kind: ControlKind::Loop,
    };
    // The body is lowered without a scope of its own so that its
    // declarations stay visible in the continuing block
    ctx.with_control(entry, |ctx| {
        ctx.with_block(Some(body_block), |ctx| {
            lower_stmts(ctx, &body.statements)?;
            terminate_if_needed(ctx, Terminator::Continue { target: loop_inst }, span)
        })?;
        ctx.with_block(Some(continuing_block), |ctx| {
            if let Some(continuing) = continuing {
                lower_block(ctx, continuing)?;
            }
            terminate_if_needed(ctx, Terminator::NextIteration { target: loop_inst }, span)
        })
    })
}

/// `if cond {} else { break; }` at the top of a loop body
fn lower_loop_guard(
    ctx: &mut LoweringContext,
    loop_inst: InstId,
    condition: ExprId,
    span: Span,
) -> Result<(), LowerError> {
    let condition = lower_value_expr(ctx, condition)?;
    let block = ctx.current_block(span)?;
    let if_inst = ctx.builder.if_(block, condition);
    let (true_block, false_block) = if_blocks(ctx, if_inst, span)?;
    ctx.builder.terminate(
        true_block,
        Terminator::ExitIf {
            target: if_inst,
            args: Vec::new(),
        },
    );
    ctx.builder
        .terminate(false_block, Terminator::ExitLoop { target: loop_inst });
    Ok(())
}

fn lower_while(
    ctx: &mut LoweringContext,
    condition: ExprId,
    body: &TBlock,
    span: Span,
) -> Result<(), LowerError> {
    let block = ctx.current_block(span)?;
    let loop_inst = ctx.builder.loop_(block, false);
    let (_, body_block, continuing_block) = loop_blocks(ctx, loop_inst, span)?;

    let entry = ControlEntry {
        inst: loop_inst,
        kind: ControlKind::Loop,
    };
    ctx.with_control(entry, |ctx| {
        ctx.with_block(Some(continuing_block), |ctx| {
            ctx.set_terminator(Terminator::NextIteration { target: loop_inst }, span)
                .map(|_| ())
        })?;
        ctx.with_block(Some(body_block), |ctx| {
            lower_loop_guard(ctx, loop_inst, condition, span)?;
            lower_stmts(ctx, &body.statements)?;
            terminate_if_needed(ctx, Terminator::Continue { target: loop_inst }, span)
        })
    })
}

fn lower_for_loop(
    ctx: &mut LoweringContext,
    initializer: Option<&Spanned<TStmt>>,
    condition: Option<ExprId>,
    continuing: Option<&Spanned<TStmt>>,
    body: &TBlock,
    span: Span,
) -> Result<(), LowerError> {
    let block = ctx.current_block(span)?;
    let loop_inst = ctx.builder.loop_(block, initializer.is_some());
    let (initializer_block, body_block, continuing_block) = loop_blocks(ctx, loop_inst, span)?;
    let next_iteration = || Terminator::NextIteration { target: loop_inst };

    let entry = ControlEntry {
        inst: loop_inst,
        kind: ControlKind::Loop,
    };
    ctx.with_control(entry, |ctx| {
        if let (Some(init), Some(init_block)) = (initializer, initializer_block) {
            ctx.with_block(Some(init_block), |ctx| {
                lower_stmt(ctx, init)?;
                terminate_if_needed(ctx, next_iteration(), span)
            })?;
        }

        ctx.with_block(Some(body_block), |ctx| {
            if let Some(condition) = condition {
                lower_loop_guard(ctx, loop_inst, condition, span)?;
            }
            lower_block(ctx, body)?;
            terminate_if_needed(ctx, Terminator::Continue { target: loop_inst }, span)
        })?;

        ctx.with_block(Some(continuing_block), |ctx| {
            if let Some(continuing) = continuing {
                lower_stmt(ctx, continuing)?;
            }
            terminate_if_needed(ctx, next_iteration(), span)
        })
    })
}

fn lower_switch(
    ctx: &mut LoweringContext,
    condition: ExprId,
    cases: &[TSwitchCase],
    span: Span,
) -> Result<(), LowerError> {
    let condition = lower_value_expr(ctx, condition)?;
    let block = ctx.current_block(span)?;
    let switch_inst = ctx.builder.switch(block, condition);

    let entry = ControlEntry {
        inst: switch_inst,
        kind: ControlKind::Switch,
    };
    ctx.with_control(entry, |ctx| {
        for case in cases {
            let selectors = case
                .selectors
                .iter()
                .map(|selector| match selector {
                    AstCaseSelector::Default => CaseSelector::Default,
                    AstCaseSelector::Value(value) => {
                        CaseSelector::Value(ctx.builder.constant(value.clone()))
                    }
                })
                .collect();
            let case_block = ctx.builder.add_case(switch_inst, selectors);

            ctx.with_block(Some(case_block), |ctx| {
                lower_block(ctx, &case.body)?;
                terminate_if_needed(ctx, Terminator::ExitSwitch { target: switch_inst }, span)
            })?;
        }
        Ok(())
    })
}

// ============================================================================
// Jumps
// ============================================================================

fn lower_break(ctx: &mut LoweringContext, span: Span) -> Result<(), LowerError> {
    let entry = ctx
        .find_enclosing(ControlFlags::None)
        .ok_or(LowerError::UnresolvedControl {
            statement: "break",
            expected: "loop or switch",
            span,
        })?;
    let terminator = match entry.kind {
        ControlKind::Loop => Terminator::ExitLoop { target: entry.inst },
        ControlKind::Switch => Terminator::ExitSwitch { target: entry.inst },
        ControlKind::If => return Err(LowerError::internal("break resolved to an if", span)),
    };
    ctx.set_terminator(terminator, span)?;
    Ok(())
}

fn enclosing_loop(
    ctx: &LoweringContext,
    statement: &'static str,
    span: Span,
) -> Result<InstId, LowerError> {
    ctx.find_enclosing(ControlFlags::ExcludeSwitch)
        .map(|entry| entry.inst)
        .ok_or(LowerError::UnresolvedControl {
            statement,
            expected: "loop",
            span,
        })
}

fn lower_continue(ctx: &mut LoweringContext, span: Span) -> Result<(), LowerError> {
    let target = enclosing_loop(ctx, "continue", span)?;
    ctx.set_terminator(Terminator::Continue { target }, span)?;
    Ok(())
}

fn lower_break_if(ctx: &mut LoweringContext, condition: ExprId, span: Span) -> Result<(), LowerError> {
    let target = enclosing_loop(ctx, "break if", span)?;
    let condition = lower_value_expr(ctx, condition)?;
    ctx.set_terminator(Terminator::BreakIf { target, condition }, span)?;
    Ok(())
}

fn lower_return(ctx: &mut LoweringContext, value: Option<ExprId>, span: Span) -> Result<(), LowerError> {
    let value = value.map(|v| lower_value_expr(ctx, v)).transpose()?;
    let func = ctx.current_function(span)?;
    ctx.set_terminator(Terminator::Return { func, value }, span)?;
    Ok(())
}
