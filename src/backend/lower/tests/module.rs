// Module-level lowering and diagnostics tests

use super::common::*;
use crate::backend::lower::{build_report, ErrorCategory, LowerError};
use crate::common::ast::{BindingPoint, Literal};
use crate::common::span::Span;
use crate::common::tast::{
    CallTarget, TDecl, TExprKind, TStmt, TStmtKind, TVariable, VariableKind,
};
use crate::common::types::{Access, AddressSpace, Type};
use pretty_assertions::assert_eq;

fn global(name: &str, space: AddressSpace, store: Type, access: Access) -> TVariable {
    TVariable {
        kind: VariableKind::Var,
        name: name.to_string(),
        ty: Type::reference(space, store, access),
        initializer: None,
        binding_point: None,
        span: Span::new(0, 0),
    }
}

#[test]
fn test_module_scope_variables_live_in_root_block() {
    // @group(0) @binding(1) var<uniform> u: vec4<f32>;
    // fn f() -> vec4<f32> { return u; }
    let mut p = ProgramBuilder::new();
    let vec4 = Type::vec(Type::F32, 4);
    let mut u = global("u", AddressSpace::Uniform, vec4.clone(), Access::Read);
    u.binding_point = Some(BindingPoint {
        group: 0,
        binding: 1,
    });
    p.global(u);
    let load = p.loaded(
        TExprKind::Identifier("u".to_string()),
        Type::reference(AddressSpace::Uniform, vec4.clone(), Access::Read),
    );
    p.function(function(
        "f",
        vec![],
        vec4,
        block(vec![stmt(TStmtKind::Return { value: Some(load) })]),
    ));

    assert_eq!(
        disasm(&p.build()),
        "\
%b1 = block {  # root
  %u:ptr<uniform, vec4<f32>, read> = var @binding_point(0, 1)
}

%f = func():vec4<f32> -> %b2 {
  %b2 = block {
    %1:vec4<f32> = load %u
    ret %1
  }
}
"
    );
}

#[test]
fn test_private_global_with_initializer() {
    let mut p = ProgramBuilder::new();
    let three = p.i32(3);
    let mut g = global("g", AddressSpace::Private, Type::I32, Access::ReadWrite);
    g.initializer = Some(three);
    p.global(g);

    assert_eq!(
        disasm(&p.build()),
        "\
%b1 = block {  # root
  %g:ptr<private, i32, read_write> = var 3i
}

"
    );
}

#[test]
fn test_binding_point_ignored_on_function_scope_var() {
    let mut p = ProgramBuilder::new();
    let mut local = var("v", Type::I32, None);
    local.binding_point = Some(BindingPoint {
        group: 1,
        binding: 1,
    });
    p.function(function(
        "f",
        vec![],
        Type::Void,
        block(vec![stmt(TStmtKind::VariableDecl(local))]),
    ));

    let out = disasm(&p.build());
    assert!(out.contains("    %v:ptr<function, i32, read_write> = var\n"), "{out}");
}

#[test]
fn test_non_lowered_declarations_are_ignored() {
    let mut p = ProgramBuilder::new();
    p.decl(TDecl::Enable("f16".to_string()));
    p.decl(TDecl::Struct("S".to_string()));
    p.decl(TDecl::Alias("A".to_string()));
    p.decl(TDecl::ConstAssert);
    p.decl(TDecl::Diagnostic);
    p.function(function("f", vec![], Type::Void, block(vec![])));

    let module = lower_ok(&p.build());
    assert_eq!(module.functions.len(), 1);
    assert!(module.block(module.root_block).instructions.is_empty());
}

#[test]
fn test_const_declarations_emit_nothing() {
    let mut p = ProgramBuilder::new();
    let one = p.i32(1);
    let c = TVariable {
        kind: VariableKind::Const,
        name: "C".to_string(),
        ty: Type::I32,
        initializer: Some(one),
        binding_point: None,
        span: Span::new(0, 0),
    };
    p.global(c.clone());
    p.function(function(
        "f",
        vec![],
        Type::Void,
        block(vec![stmt(TStmtKind::VariableDecl(c))]),
    ));

    let module = lower_ok(&p.build());
    assert!(module.block(module.root_block).instructions.is_empty());
    let func = module.function_by_name("f").unwrap();
    assert_eq!(module.block(func.block).instructions.len(), 1);
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_unsubstituted_override_is_reported_at_module_scope() {
    let mut p = ProgramBuilder::new();
    p.global(TVariable {
        kind: VariableKind::Override,
        name: "scale".to_string(),
        ty: Type::F32,
        initializer: None,
        binding_point: None,
        span: Span::new(10, 15),
    });

    let diagnostics = lower_err(&p.build());
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.function, None);
    assert_eq!(
        diagnostic.error,
        LowerError::UnsubstitutedOverride {
            name: "scale".to_string(),
            span: Span::new(10, 15),
        }
    );
    assert_eq!(
        diagnostic.to_string(),
        "at module scope: override `scale` was not substituted before lowering"
    );
}

#[test]
fn test_unresolved_identifier() {
    let mut p = ProgramBuilder::new();
    let nope = p.expr_at(
        TExprKind::Identifier("nope".to_string()),
        Type::I32,
        Span::new(4, 8),
    );
    p.function(function(
        "f",
        vec![],
        Type::I32,
        block(vec![stmt(TStmtKind::Return { value: Some(nope) })]),
    ));

    let diagnostics = lower_err(&p.build());
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.function.as_deref(), Some("f"));
    assert_eq!(diagnostic.error.code(), "L001");
    assert_eq!(diagnostic.error.span(), Span::new(4, 8));
    assert_eq!(
        diagnostic.to_string(),
        "in function `f`: unresolved identifier `nope`"
    );
}

#[test]
fn test_missing_behaviors() {
    let mut p = ProgramBuilder::new();
    let mut body = block(vec![]);
    body.statements.push((
        TStmt {
            kind: TStmtKind::Discard,
            behaviors: None,
        },
        Span::new(1, 9),
    ));
    p.function(function("f", vec![], Type::Void, body));

    let diagnostics = lower_err(&p.build());
    let errors: Vec<_> = diagnostics.errors().collect();
    assert_eq!(
        errors,
        vec![&LowerError::MissingBehaviors {
            span: Span::new(1, 9)
        }]
    );
}

#[test]
fn test_lowering_continues_after_a_failing_function() {
    let mut p = ProgramBuilder::new();
    let a = p.value("a", Type::I32);
    p.function(function(
        "first",
        vec![],
        Type::I32,
        block(vec![stmt(TStmtKind::Return { value: Some(a) })]),
    ));
    p.function(function("ok", vec![], Type::Void, block(vec![])));
    let b = p.value("b", Type::I32);
    p.function(function(
        "second",
        vec![],
        Type::I32,
        block(vec![stmt(TStmtKind::Return { value: Some(b) })]),
    ));

    let diagnostics = lower_err(&p.build());
    let functions: Vec<_> = diagnostics
        .iter()
        .map(|d| d.function.clone().unwrap_or_default())
        .collect();
    assert_eq!(functions, vec!["first".to_string(), "second".to_string()]);
}

#[test]
fn test_break_outside_loop_is_internal() {
    let mut p = ProgramBuilder::new();
    p.function(function(
        "f",
        vec![],
        Type::Void,
        block(vec![stmt(TStmtKind::Break)]),
    ));

    let diagnostics = lower_err(&p.build());
    let error = diagnostics.errors().next().unwrap();
    assert!(matches!(
        error,
        LowerError::UnresolvedControl {
            statement: "break",
            ..
        }
    ));
    assert_eq!(error.category(), ErrorCategory::Internal);
}

#[test]
fn test_calling_a_non_function() {
    let mut p = ProgramBuilder::new();
    let call = p.expr(
        TExprKind::Call {
            target: CallTarget::Function("x".to_string()),
            args: vec![],
        },
        Type::I32,
    );
    p.function(function(
        "f",
        vec![param("x", Type::I32)],
        Type::I32,
        block(vec![stmt(TStmtKind::Return { value: Some(call) })]),
    ));

    let diagnostics = lower_err(&p.build());
    assert!(matches!(
        diagnostics.errors().next(),
        Some(LowerError::NotAFunction { name, .. }) if name == "x"
    ));
}

#[test]
fn test_literal_out_of_range() {
    let mut p = ProgramBuilder::new();
    let lit = p.expr(TExprKind::Literal(Literal::Int(-1)), Type::U32);
    p.function(function(
        "f",
        vec![],
        Type::U32,
        block(vec![stmt(TStmtKind::Return { value: Some(lit) })]),
    ));

    let diagnostics = lower_err(&p.build());
    assert!(matches!(
        diagnostics.errors().next(),
        Some(LowerError::MissingLiteralValue { ty, .. }) if ty == "u32"
    ));
}

#[test]
fn test_report_carries_code_and_message() {
    let mut p = ProgramBuilder::new();
    let nope = p.expr_at(
        TExprKind::Identifier("nope".to_string()),
        Type::I32,
        Span::new(22, 26),
    );
    p.function(function(
        "f",
        vec![],
        Type::I32,
        block(vec![stmt(TStmtKind::Return { value: Some(nope) })]),
    ));
    let diagnostics = lower_err(&p.build());
    let diagnostic = diagnostics.iter().next().unwrap();

    let source = "fn f() -> i32 { return nope; }";
    let mut out = Vec::new();
    build_report(diagnostic)
        .write(ariadne::Source::from(source), &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("L001"), "{text}");
    assert!(text.contains("nope"), "{text}");
}
