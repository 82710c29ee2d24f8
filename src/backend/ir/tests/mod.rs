//! Tests for the IR builder, validator and disassembler

use crate::backend::ir::{
    disassemble, validate, BlockRole, CaseSelector, Instruction, IrBuilder, Terminator,
    ValidationError,
};
use crate::common::types::{ConstValue, Type};
use pretty_assertions::assert_eq;

/// A void function `f` with its entry block
fn builder_with_function() -> (IrBuilder, crate::backend::ir::FuncId, crate::backend::ir::BlockId) {
    let mut b = IrBuilder::new();
    let f = b.function("f", Type::Void);
    let entry = b.function_block(f);
    (b, f, entry)
}

#[test]
fn test_builder_creates_root_block() {
    let b = IrBuilder::new();
    let module = b.into_module();
    assert_eq!(module.block(module.root_block).role, BlockRole::Root);
    assert!(module.functions.is_empty());
}

#[test]
fn test_well_formed_function_validates() {
    let (mut b, f, entry) = builder_with_function();
    let cond = b.constant(ConstValue::Bool(true));
    let if_inst = b.if_(entry, cond);
    let blocks = b.control_blocks(if_inst);
    for block in blocks {
        b.terminate(
            block,
            Terminator::ExitIf {
                target: if_inst,
                args: vec![],
            },
        );
    }
    b.terminate(entry, Terminator::Return { func: f, value: None });

    assert_eq!(validate(b.module()), Ok(()));
}

#[test]
fn test_missing_terminator_is_reported() {
    let (b, _, entry) = builder_with_function();

    assert_eq!(
        validate(b.module()),
        Err(vec![ValidationError::MissingTerminator {
            function: "f".to_string(),
            block: entry,
        }])
    );
}

#[test]
fn test_instruction_after_terminator_is_reported() {
    let (mut b, f, entry) = builder_with_function();
    b.terminate(entry, Terminator::Return { func: f, value: None });
    b.append(entry, Instruction::Discard);

    let errors = validate(b.module()).unwrap_err();
    assert!(errors.contains(&ValidationError::TerminatorNotLast {
        function: "f".to_string(),
        block: entry,
    }));
}

#[test]
fn test_terminated_root_is_reported() {
    let mut b = IrBuilder::new();
    let root = b.root_block();
    b.terminate(root, Terminator::Unreachable);

    assert_eq!(validate(b.module()), Err(vec![ValidationError::TerminatedRoot]));
}

#[test]
fn test_exit_if_must_target_innermost_if() {
    let (mut b, f, entry) = builder_with_function();
    let cond = b.constant(ConstValue::Bool(true));
    let outer = b.if_(entry, cond);
    let [outer_t, outer_f] = b.control_blocks(outer)[..] else {
        panic!("if without two blocks");
    };
    let inner = b.if_(outer_t, cond);
    let [inner_t, inner_f] = b.control_blocks(inner)[..] else {
        panic!("if without two blocks");
    };
    // Skips the inner if
    b.terminate(inner_t, Terminator::ExitIf { target: outer, args: vec![] });
    b.terminate(inner_f, Terminator::ExitIf { target: inner, args: vec![] });
    b.terminate(outer_t, Terminator::ExitIf { target: outer, args: vec![] });
    b.terminate(outer_f, Terminator::ExitIf { target: outer, args: vec![] });
    b.terminate(entry, Terminator::Return { func: f, value: None });

    assert_eq!(
        validate(b.module()),
        Err(vec![ValidationError::BadTarget {
            function: "f".to_string(),
            block: inner_t,
            terminator: "exit_if",
            expected: "if",
        }])
    );
}

#[test]
fn test_exit_if_arity_must_match_results() {
    let (mut b, f, entry) = builder_with_function();
    let cond = b.constant(ConstValue::Bool(true));
    let if_inst = b.if_(entry, cond);
    b.add_if_result(if_inst, Type::Bool);
    let [t, fb] = b.control_blocks(if_inst)[..] else {
        panic!("if without two blocks");
    };
    b.terminate(t, Terminator::ExitIf { target: if_inst, args: vec![cond] });
    b.terminate(fb, Terminator::ExitIf { target: if_inst, args: vec![] });
    b.terminate(entry, Terminator::Return { func: f, value: None });

    assert_eq!(
        validate(b.module()),
        Err(vec![ValidationError::ExitIfArity {
            function: "f".to_string(),
            block: fb,
            expected: 1,
            found: 0,
        }])
    );
}

#[test]
fn test_loop_terminators_are_checked_by_block_role() {
    let (mut b, f, entry) = builder_with_function();
    let cond = b.constant(ConstValue::Bool(true));
    let loop_inst = b.loop_(entry, false);
    let [body, continuing] = b.control_blocks(loop_inst)[..] else {
        panic!("loop without body and continuing");
    };
    // Swapped: break_if belongs in continuing, continue in the body
    b.terminate(body, Terminator::BreakIf { target: loop_inst, condition: cond });
    b.terminate(continuing, Terminator::Continue { target: loop_inst });
    b.terminate(entry, Terminator::Return { func: f, value: None });

    let errors = validate(b.module()).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ValidationError::BadTarget {
                function: "f".to_string(),
                block: body,
                terminator: "break_if",
                expected: "loop continuing block",
            },
            ValidationError::BadTarget {
                function: "f".to_string(),
                block: continuing,
                terminator: "continue",
                expected: "loop body",
            },
        ]
    );
}

#[test]
fn test_exit_switch_from_nested_if() {
    let (mut b, f, entry) = builder_with_function();
    let sel = b.constant(ConstValue::I32(0));
    let switch = b.switch(entry, sel);
    let case = b.add_case(switch, vec![CaseSelector::Default]);
    let cond = b.constant(ConstValue::Bool(false));
    let if_inst = b.if_(case, cond);
    let [t, fb] = b.control_blocks(if_inst)[..] else {
        panic!("if without two blocks");
    };
    b.terminate(t, Terminator::ExitSwitch { target: switch });
    b.terminate(fb, Terminator::ExitIf { target: if_inst, args: vec![] });
    b.terminate(case, Terminator::ExitSwitch { target: switch });
    b.terminate(entry, Terminator::Return { func: f, value: None });

    assert_eq!(validate(b.module()), Ok(()));
}

#[test]
fn test_disassemble_names_values_in_order_of_mention() {
    let mut b = IrBuilder::new();
    let f = b.function("sum", Type::I32);
    let x = b.param_value(f, 0, "x", Type::I32);
    b.set_params(
        f,
        vec![crate::backend::ir::FunctionParam {
            value: x,
            name: "x".to_string(),
            ty: Type::I32,
            builtin: None,
            location: None,
            invariant: false,
            binding_point: None,
        }],
    );
    let entry = b.function_block(f);
    let two = b.constant(ConstValue::I32(2));
    let (_, doubled) = b.append_with_result(entry, Type::I32, |result| Instruction::Binary {
        result,
        op: crate::backend::ir::BinaryOp::Multiply,
        lhs: x,
        rhs: two,
    });
    let (_, again) = b.append_with_result(entry, Type::I32, |result| Instruction::Binary {
        result,
        op: crate::backend::ir::BinaryOp::Add,
        lhs: doubled,
        rhs: x,
    });
    b.set_name(again, "x");
    b.terminate(entry, Terminator::Return { func: f, value: Some(again) });

    assert_eq!(
        disassemble(b.module()),
        "\
%sum = func(%x:i32):i32 -> %b1 {
  %b1 = block {
    %1:i32 = mul %x, 2i
    %x_1:i32 = add %1, %x
    ret %x_1
  }
}
"
    );
}

#[test]
fn test_walk_blocks_is_depth_first() {
    let (mut b, f, entry) = builder_with_function();
    let loop_inst = b.loop_(entry, true);
    let blocks = b.control_blocks(loop_inst);
    assert_eq!(blocks.len(), 3);
    b.terminate(entry, Terminator::Return { func: f, value: None });

    let module = b.into_module();
    let mut expected = vec![entry];
    expected.extend(blocks);
    assert_eq!(module.walk_blocks(entry), expected);
}
