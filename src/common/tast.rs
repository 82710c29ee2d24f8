//! Typed shader AST
//!
//! This is the input contract of the lowering pass: every node has already
//! been resolved by semantic analysis. Expressions carry their type, an
//! optional constant value and a flag telling whether the reference they
//! produce is loaded. Statements carry their control-flow behaviors.
//! Expressions live in an arena and are referred to by [`ExprId`].

use crate::common::ast::{Attribute, BinOp, BindingPoint, Literal, PipelineStage, UnaryOp};
use crate::common::span::{Span, Spanned};
use crate::common::types::{ConstValue, Type};
use serde::{Deserialize, Serialize};
use std::ops::Index;

bitflags::bitflags! {
    /// Ways in which control can leave a statement
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Behaviors: u8 {
        const NEXT     = 1 << 0;
        const BREAK    = 1 << 1;
        const CONTINUE = 1 << 2;
        const RETURN   = 1 << 3;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TExpr {
    pub kind: TExprKind,
    pub ty: Type,
    /// Set when semantic analysis folded the expression to a constant
    #[serde(default)]
    pub constant: Option<ConstValue>,
    /// The reference this expression produces is read
    #[serde(default)]
    pub load: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TExprKind {
    Literal(Literal),
    Identifier(String),
    Binary {
        op: BinOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Bitcast {
        operand: ExprId,
    },
    Call {
        target: CallTarget,
        args: Vec<ExprId>,
    },
    Index {
        object: ExprId,
        index: ExprId,
    },
    Member {
        object: ExprId,
        member: MemberAccess,
    },
    /// The `_` on the left of a phony assignment
    Phony,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallTarget {
    Function(String),
    Builtin(String),
    Constructor,
    Conversion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberAccess {
    /// Structure member with its resolved declaration index
    Field { name: String, index: u32 },
    Swizzle { indices: Vec<u32> },
}

/// Arena holding every expression of a program
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprArena {
    exprs: Vec<Spanned<TExpr>>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expr: TExpr, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push((expr, span));
        id
    }

    pub fn get(&self, id: ExprId) -> Option<&Spanned<TExpr>> {
        self.exprs.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl Index<ExprId> for ExprArena {
    type Output = Spanned<TExpr>;

    fn index(&self, id: ExprId) -> &Self::Output {
        &self.exprs[id.0 as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TStmt {
    pub kind: TStmtKind,
    #[serde(default)]
    pub behaviors: Option<Behaviors>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TBlock {
    pub statements: Vec<Spanned<TStmt>>,
    #[serde(default)]
    pub behaviors: Option<Behaviors>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TStmtKind {
    Assignment {
        lhs: ExprId,
        rhs: ExprId,
    },
    CompoundAssignment {
        lhs: ExprId,
        op: BinOp,
        rhs: ExprId,
    },
    IncrementDecrement {
        lhs: ExprId,
        increment: bool,
    },
    Block(TBlock),
    Break,
    BreakIf {
        condition: ExprId,
    },
    Call {
        expr: ExprId,
    },
    Continue,
    Discard,
    If {
        condition: ExprId,
        body: TBlock,
        #[serde(default)]
        else_stmt: Option<Box<Spanned<TStmt>>>,
    },
    Loop {
        body: TBlock,
        #[serde(default)]
        continuing: Option<TBlock>,
    },
    ForLoop {
        #[serde(default)]
        initializer: Option<Box<Spanned<TStmt>>>,
        #[serde(default)]
        condition: Option<ExprId>,
        #[serde(default)]
        continuing: Option<Box<Spanned<TStmt>>>,
        body: TBlock,
    },
    While {
        condition: ExprId,
        body: TBlock,
    },
    Return {
        #[serde(default)]
        value: Option<ExprId>,
    },
    Switch {
        condition: ExprId,
        cases: Vec<TSwitchCase>,
    },
    VariableDecl(TVariable),
    ConstAssert,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TSwitchCase {
    pub selectors: Vec<CaseSelector>,
    pub body: TBlock,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSelector {
    Default,
    Value(ConstValue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Var,
    Let,
    Const,
    Override,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TVariable {
    pub kind: VariableKind,
    pub name: String,
    /// Reference type for `var`, value type for the other kinds
    pub ty: Type,
    #[serde(default)]
    pub initializer: Option<ExprId>,
    #[serde(default)]
    pub binding_point: Option<BindingPoint>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TParameter {
    pub name: String,
    pub ty: Type,
    #[serde(default)]
    pub attributes: Vec<Spanned<Attribute>>,
    #[serde(default)]
    pub location: Option<u32>,
    #[serde(default)]
    pub binding_point: Option<BindingPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TFunction {
    pub name: String,
    pub parameters: Vec<TParameter>,
    pub return_type: Type,
    #[serde(default)]
    pub stage: Option<PipelineStage>,
    /// Resolved `@workgroup_size` components, unset y/z default to 1
    #[serde(default)]
    pub workgroup_size: Option<[Option<u32>; 3]>,
    #[serde(default)]
    pub return_attributes: Vec<Spanned<Attribute>>,
    #[serde(default)]
    pub return_location: Option<u32>,
    pub body: TBlock,
    #[serde(default)]
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TDecl {
    Struct(String),
    Alias(String),
    Enable(String),
    ConstAssert,
    Diagnostic,
    Variable(TVariable),
    Function(TFunction),
}

/// A resolved program: expression arena plus declarations in dependency order
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TProgram {
    pub exprs: ExprArena,
    pub decls: Vec<Spanned<TDecl>>,
}

impl TProgram {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn functions(&self) -> impl Iterator<Item = &TFunction> {
        self.decls.iter().filter_map(|(decl, _)| match decl {
            TDecl::Function(f) => Some(f),
            _ => None,
        })
    }
}
