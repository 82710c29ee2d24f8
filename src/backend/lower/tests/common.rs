// Common test utilities for lowering tests

use crate::backend::ir::{disassemble, validate, Module};
use crate::backend::lower::{lower_program, Diagnostics};
use crate::common::ast::{Attribute, BinOp, Literal};
use crate::common::span::{Span, Spanned};
use crate::common::tast::{
    Behaviors, CallTarget, ExprId, TBlock, TDecl, TExpr, TExprKind, TFunction, TParameter,
    TProgram, TStmt, TStmtKind, TVariable, VariableKind,
};
use crate::common::types::{Access, AddressSpace, ConstValue, Type};

/// Helper to create a spanned value with a dummy span
pub fn spanned<T>(value: T) -> Spanned<T> {
    (value, Span::new(0, 0))
}

pub fn func_ref(store: Type) -> Type {
    Type::reference(AddressSpace::Function, store, Access::ReadWrite)
}

/// Builds a resolved program the way semantic analysis would hand it over,
/// including statement behaviors
#[derive(Default)]
pub struct ProgramBuilder {
    program: TProgram,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(self) -> TProgram {
        self.program
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn expr(&mut self, kind: TExprKind, ty: Type) -> ExprId {
        self.program.exprs.alloc(
            TExpr {
                kind,
                ty,
                constant: None,
                load: false,
            },
            Span::new(0, 0),
        )
    }

    pub fn expr_at(&mut self, kind: TExprKind, ty: Type, span: Span) -> ExprId {
        self.program.exprs.alloc(
            TExpr {
                kind,
                ty,
                constant: None,
                load: false,
            },
            span,
        )
    }

    /// An expression whose reference result is read
    pub fn loaded(&mut self, kind: TExprKind, ty: Type) -> ExprId {
        self.program.exprs.alloc(
            TExpr {
                kind,
                ty,
                constant: None,
                load: true,
            },
            Span::new(0, 0),
        )
    }

    /// An expression semantic analysis already folded to `constant`
    pub fn folded(&mut self, kind: TExprKind, ty: Type, constant: ConstValue) -> ExprId {
        self.program.exprs.alloc(
            TExpr {
                kind,
                ty,
                constant: Some(constant),
                load: false,
            },
            Span::new(0, 0),
        )
    }

    pub fn i32(&mut self, n: i64) -> ExprId {
        self.expr(TExprKind::Literal(Literal::Int(n)), Type::I32)
    }

    pub fn f32(&mut self, x: f64) -> ExprId {
        self.expr(TExprKind::Literal(Literal::Float(x)), Type::F32)
    }

    /// A parameter or `let` used by value
    pub fn value(&mut self, name: &str, ty: Type) -> ExprId {
        self.expr(TExprKind::Identifier(name.to_string()), ty)
    }

    /// A function-scope `var` used as a reference
    pub fn var_ref(&mut self, name: &str, store: Type) -> ExprId {
        self.expr(TExprKind::Identifier(name.to_string()), func_ref(store))
    }

    /// A function-scope `var` read by value
    pub fn var_load(&mut self, name: &str, store: Type) -> ExprId {
        self.loaded(TExprKind::Identifier(name.to_string()), func_ref(store))
    }

    pub fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId, ty: Type) -> ExprId {
        self.expr(TExprKind::Binary { op, lhs, rhs }, ty)
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>, ty: Type) -> ExprId {
        self.expr(
            TExprKind::Call {
                target: CallTarget::Function(name.to_string()),
                args,
            },
            ty,
        )
    }

    pub fn phony(&mut self) -> ExprId {
        self.expr(TExprKind::Phony, Type::Void)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn decl(&mut self, decl: TDecl) {
        self.program.decls.push(spanned(decl));
    }

    pub fn function(&mut self, func: TFunction) {
        self.decl(TDecl::Function(func));
    }

    pub fn global(&mut self, var: TVariable) {
        self.decl(TDecl::Variable(var));
    }
}

// ----------------------------------------------------------------------
// Statements, with behaviors computed like semantic analysis does
// ----------------------------------------------------------------------

pub fn stmt(kind: TStmtKind) -> Spanned<TStmt> {
    let behaviors = behaviors_of(&kind);
    spanned(TStmt {
        kind,
        behaviors: Some(behaviors),
    })
}

pub fn block(statements: Vec<Spanned<TStmt>>) -> TBlock {
    let mut behaviors = Behaviors::NEXT;
    for (s, _) in &statements {
        if behaviors.contains(Behaviors::NEXT) {
            let s = s.behaviors.unwrap_or(Behaviors::NEXT);
            behaviors = (behaviors - Behaviors::NEXT) | s;
        }
    }
    TBlock {
        statements,
        behaviors: Some(behaviors),
        span: Span::new(0, 0),
    }
}

fn block_behaviors(block: &TBlock) -> Behaviors {
    block.behaviors.unwrap_or(Behaviors::NEXT)
}

fn stmt_behaviors(s: &Spanned<TStmt>) -> Behaviors {
    s.0.behaviors.unwrap_or(Behaviors::NEXT)
}

fn loop_behaviors(body: Behaviors) -> Behaviors {
    if body.contains(Behaviors::BREAK) {
        (body - Behaviors::BREAK - Behaviors::CONTINUE) | Behaviors::NEXT
    } else {
        body - Behaviors::NEXT - Behaviors::CONTINUE
    }
}

fn behaviors_of(kind: &TStmtKind) -> Behaviors {
    match kind {
        TStmtKind::Break => Behaviors::BREAK,
        TStmtKind::Continue => Behaviors::CONTINUE,
        TStmtKind::Return { .. } => Behaviors::RETURN,
        TStmtKind::BreakIf { .. } => Behaviors::BREAK | Behaviors::NEXT,
        TStmtKind::Block(b) => block_behaviors(b),
        TStmtKind::If {
            body, else_stmt, ..
        } => {
            block_behaviors(body)
                | else_stmt
                    .as_deref()
                    .map(stmt_behaviors)
                    .unwrap_or(Behaviors::NEXT)
        }
        TStmtKind::Loop { body, continuing } => {
            let continuing = continuing
                .as_ref()
                .map(block_behaviors)
                .unwrap_or(Behaviors::NEXT);
            loop_behaviors(block_behaviors(body) | continuing)
        }
        TStmtKind::ForLoop {
            condition, body, ..
        } => {
            let body = block_behaviors(body);
            if condition.is_some() {
                (body - Behaviors::BREAK - Behaviors::CONTINUE) | Behaviors::NEXT
            } else {
                loop_behaviors(body)
            }
        }
        TStmtKind::While { body, .. } => {
            (block_behaviors(body) - Behaviors::BREAK - Behaviors::CONTINUE) | Behaviors::NEXT
        }
        TStmtKind::Switch { cases, .. } => {
            let all = cases
                .iter()
                .fold(Behaviors::empty(), |acc, c| acc | block_behaviors(&c.body));
            if all.contains(Behaviors::BREAK) {
                (all - Behaviors::BREAK) | Behaviors::NEXT
            } else {
                all
            }
        }
        _ => Behaviors::NEXT,
    }
}

pub fn var(name: &str, store: Type, initializer: Option<ExprId>) -> TVariable {
    TVariable {
        kind: VariableKind::Var,
        name: name.to_string(),
        ty: func_ref(store),
        initializer,
        binding_point: None,
        span: Span::new(0, 0),
    }
}

pub fn let_(name: &str, ty: Type, initializer: ExprId) -> TVariable {
    TVariable {
        kind: VariableKind::Let,
        name: name.to_string(),
        ty,
        initializer: Some(initializer),
        binding_point: None,
        span: Span::new(0, 0),
    }
}

pub fn param(name: &str, ty: Type) -> TParameter {
    TParameter {
        name: name.to_string(),
        ty,
        attributes: Vec::new(),
        location: None,
        binding_point: None,
    }
}

pub fn param_with(name: &str, ty: Type, attributes: Vec<Attribute>, location: Option<u32>) -> TParameter {
    TParameter {
        attributes: attributes.into_iter().map(spanned).collect(),
        location,
        ..param(name, ty)
    }
}

pub fn function(name: &str, parameters: Vec<TParameter>, return_type: Type, body: TBlock) -> TFunction {
    TFunction {
        name: name.to_string(),
        parameters,
        return_type,
        stage: None,
        workgroup_size: None,
        return_attributes: Vec::new(),
        return_location: None,
        body,
        span: Span::new(0, 0),
    }
}

// ----------------------------------------------------------------------
// Running the pass
// ----------------------------------------------------------------------

/// Lower a program that is expected to be valid and check the result
#[track_caller]
pub fn lower_ok(program: &TProgram) -> Module {
    let module = match lower_program(program) {
        Ok(module) => module,
        Err(diagnostics) => panic!("Expected lowering to succeed, got:\n{}", diagnostics),
    };
    if let Err(errors) = validate(&module) {
        panic!("Lowered module failed validation: {:?}\n{}", errors, disassemble(&module));
    }
    module
}

#[track_caller]
pub fn lower_err(program: &TProgram) -> Diagnostics {
    match lower_program(program) {
        Ok(module) => panic!("Expected lowering to fail, got:\n{}", disassemble(&module)),
        Err(diagnostics) => diagnostics,
    }
}

#[track_caller]
pub fn disasm(program: &TProgram) -> String {
    disassemble(&lower_ok(program))
}
