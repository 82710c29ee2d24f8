//! Function lowering
//!
//! Creates the IR function, copies entry point metadata and IO attributes
//! onto it and its parameters, then lowers the body into the entry block.
//! A body that can fall off its end gets an implicit `ret`; one that
//! cannot gets `unreachable`.

use crate::backend::ir::{
    FuncId, FunctionParam, Location, ParamBuiltin, ReturnAttributes, ReturnBuiltin, Terminator,
};
use crate::backend::lower::context::LoweringContext;
use crate::backend::lower::error::LowerError;
use crate::backend::lower::stmt::lower_block;
use crate::common::ast::{Attribute, Interpolation, PipelineStage};
use crate::common::tast::{Behaviors, TFunction, TParameter};

pub fn lower_function(ctx: &mut LoweringContext, func: &TFunction) -> Result<FuncId, LowerError> {
    if ctx.control_depth() != 0 || ctx.scope_depth() != 0 {
        return Err(LowerError::internal(
            "function lowering started inside an open scope or control instruction",
            func.span,
        ));
    }

    let id = ctx.builder.function(&func.name, func.return_type.clone());
    let value = ctx.builder.module().function(id).value;
    // Registered before the body so that recursion and later calls resolve
    ctx.declare(&func.name, value);

    ctx.enter_function(id);
    let result = lower_function_inner(ctx, id, func);
    ctx.leave_function();
    result.map(|_| id)
}

fn lower_function_inner(
    ctx: &mut LoweringContext,
    id: FuncId,
    func: &TFunction,
) -> Result<(), LowerError> {
    if let Some(stage) = func.stage {
        lower_entry_point(ctx, id, stage, func)?;
    }

    ctx.with_scope(|ctx| {
        let params = func
            .parameters
            .iter()
            .enumerate()
            .map(|(index, param)| lower_param(ctx, id, index, param))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.builder.set_params(id, params);

        let entry = ctx.builder.function_block(id);
        ctx.with_block(Some(entry), |ctx| {
            lower_block(ctx, &func.body)?;

            if ctx.need_terminator() {
                let behaviors = func
                    .body
                    .behaviors
                    .ok_or(LowerError::MissingBehaviors {
                        span: func.body.span,
                    })?;
                let terminator = if behaviors.contains(Behaviors::NEXT) {
                    Terminator::Return {
                        func: id,
                        value: None,
                    }
                } else {
                    Terminator::Unreachable
                };
                ctx.set_terminator(terminator, func.body.span)?;
            }
            Ok(())
        })
    })
}

fn lower_entry_point(
    ctx: &mut LoweringContext,
    id: FuncId,
    stage: PipelineStage,
    func: &TFunction,
) -> Result<(), LowerError> {
    let workgroup_size = match stage {
        PipelineStage::Compute => {
            let [x, y, z] = func.workgroup_size.unwrap_or([None; 3]);
            let x = x.ok_or_else(|| LowerError::MissingWorkgroupSize {
                function: func.name.clone(),
                span: func.span,
            })?;
            Some([x, y.unwrap_or(1), z.unwrap_or(1)])
        }
        _ => None,
    };

    let mut attributes = ReturnAttributes::default();
    let mut interpolation = None;
    for (attr, span) in &func.return_attributes {
        match attr {
            Attribute::Interpolate(interp) => interpolation = Some(*interp),
            Attribute::Invariant => attributes.invariant = true,
            Attribute::Builtin(builtin) => {
                let builtin = ReturnBuiltin::from_ast(*builtin).ok_or(LowerError::InvalidBuiltin {
                    builtin: *builtin,
                    position: "return value",
                    span: *span,
                })?;
                attributes.builtin = Some(builtin);
            }
        }
    }
    attributes.location = location(func.return_location, interpolation, &func.name);

    tracing::debug!(function = %func.name, %stage, "entry point");
    let function = ctx.builder.function_mut(id);
    function.stage = Some(stage);
    function.workgroup_size = workgroup_size;
    function.return_attributes = attributes;
    Ok(())
}

fn lower_param(
    ctx: &mut LoweringContext,
    func: FuncId,
    index: usize,
    param: &TParameter,
) -> Result<FunctionParam, LowerError> {
    let value = ctx
        .builder
        .param_value(func, index, &param.name, param.ty.clone());

    let mut builtin = None;
    let mut invariant = false;
    let mut interpolation = None;
    for (attr, span) in &param.attributes {
        match attr {
            Attribute::Interpolate(interp) => interpolation = Some(*interp),
            Attribute::Invariant => invariant = true,
            Attribute::Builtin(requested) => {
                builtin = Some(ParamBuiltin::from_ast(*requested).ok_or(LowerError::InvalidBuiltin {
                    builtin: *requested,
                    position: "parameter",
                    span: *span,
                })?);
            }
        }
    }

    ctx.declare(&param.name, value);
    Ok(FunctionParam {
        value,
        name: param.name.clone(),
        ty: param.ty.clone(),
        builtin,
        location: location(param.location, interpolation, &param.name),
        invariant,
        binding_point: param.binding_point,
    })
}

fn location(value: Option<u32>, interpolation: Option<Interpolation>, owner: &str) -> Option<Location> {
    match (value, interpolation) {
        (Some(value), interpolation) => Some(Location {
            value,
            interpolation,
        }),
        (None, Some(interpolation)) => {
            tracing::warn!(%owner, %interpolation, "interpolation without a location is ignored");
            None
        }
        (None, None) => None,
    }
}
