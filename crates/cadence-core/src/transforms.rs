// SPDX-License-Identifier: Apache-2.0
//! Standard adapters and lenses.
//!
//! Adapters change domain or world; lenses keep the type and apply a
//! parameterized tweak. Both lower onto ordinary map/zip nodes, so an edge's
//! transform chain costs nothing beyond the expressions it emits.

use std::collections::BTreeMap;

use crate::builder::{ExprRef, IrBuilder, IrTypeError, ValueRef};
use crate::ir::{BinaryOp, UnaryOp};
use crate::registry::{TransformDef, TransformKind, TransformRegistry};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

/// Applies a unary op to a ref in whichever world it inhabits.
fn map_any(builder: &mut IrBuilder, r: ValueRef, op: UnaryOp) -> Result<ValueRef, IrTypeError> {
    match r.expr {
        ExprRef::Sig(id) => {
            let out = builder.sig_map(id, op)?;
            let ty = builder.sig_type(out).unwrap_or(r.ty);
            Ok(ValueRef::sig(out, ty))
        }
        ExprRef::Field(id) => {
            let out = builder.field_map(id, op)?;
            let ty = builder.field_type(out).unwrap_or(r.ty);
            Ok(ValueRef::field(out, ty))
        }
    }
}

/// Zips a ref against a float constant in whichever world it inhabits.
fn zip_const(
    builder: &mut IrBuilder,
    r: ValueRef,
    constant: f32,
    op: BinaryOp,
) -> Result<ValueRef, IrTypeError> {
    let c = builder.sig_const(Value::Float(constant), TypeDesc::signal(Domain::Float));
    match r.expr {
        ExprRef::Sig(id) => {
            let out = builder.sig_zip(id, c, op)?;
            let ty = builder.sig_type(out).unwrap_or(r.ty);
            Ok(ValueRef::sig(out, ty))
        }
        ExprRef::Field(id) => {
            let out = builder.field_zip_sig(id, c, op)?;
            let ty = builder.field_type(out).unwrap_or(r.ty);
            Ok(ValueRef::field(out, ty))
        }
    }
}

fn param_f32(params: &BTreeMap<String, Value>, key: &str, default: f32) -> f32 {
    match params.get(key) {
        Some(Value::Float(v)) => *v,
        #[allow(clippy::cast_precision_loss)]
        Some(Value::Int(v)) => *v as f32,
        _ => default,
    }
}

fn lower_float_to_vec2(
    builder: &mut IrBuilder,
    r: ValueRef,
    _params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    map_any(builder, r, UnaryOp::SplatVec2)
}

fn lower_float_to_color(
    builder: &mut IrBuilder,
    r: ValueRef,
    _params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    map_any(builder, r, UnaryOp::GrayToColor)
}

fn lower_int_to_float(
    builder: &mut IrBuilder,
    r: ValueRef,
    _params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    map_any(builder, r, UnaryOp::IntToFloat)
}

fn lower_scale(
    builder: &mut IrBuilder,
    r: ValueRef,
    params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    zip_const(builder, r, param_f32(params, "factor", 1.0), BinaryOp::Mul)
}

fn lower_offset(
    builder: &mut IrBuilder,
    r: ValueRef,
    params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    zip_const(builder, r, param_f32(params, "amount", 0.0), BinaryOp::Add)
}

fn lower_clamp01(
    builder: &mut IrBuilder,
    r: ValueRef,
    _params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    map_any(builder, r, UnaryOp::Clamp01)
}

fn lower_color_alpha(
    builder: &mut IrBuilder,
    r: ValueRef,
    params: &BTreeMap<String, Value>,
) -> Result<ValueRef, IrTypeError> {
    zip_const(
        builder,
        r,
        param_f32(params, "alpha", 1.0),
        BinaryOp::WithAlpha,
    )
}

/// The standard transform registry.
///
/// `legacy_smooth` registers without an IR lowering on purpose: it is the
/// closure-only degradation path (the value flows through unadapted with a
/// warning), kept so the path stays exercised.
#[must_use]
pub fn standard_registry() -> TransformRegistry {
    let mut reg = TransformRegistry::new();
    let defs = [
        TransformDef {
            id: "float_to_vec2",
            kind: TransformKind::Adapter,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Vec2),
            compile: Some(lower_float_to_vec2),
        },
        TransformDef {
            id: "float_to_color",
            kind: TransformKind::Adapter,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Color),
            compile: Some(lower_float_to_color),
        },
        TransformDef {
            id: "int_to_float",
            kind: TransformKind::Adapter,
            input: TypeDesc::signal(Domain::Int),
            output: TypeDesc::signal(Domain::Float),
            compile: Some(lower_int_to_float),
        },
        TransformDef {
            id: "scale",
            kind: TransformKind::Lens,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Float),
            compile: Some(lower_scale),
        },
        TransformDef {
            id: "offset",
            kind: TransformKind::Lens,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Float),
            compile: Some(lower_offset),
        },
        TransformDef {
            id: "clamp01",
            kind: TransformKind::Lens,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Float),
            compile: Some(lower_clamp01),
        },
        TransformDef {
            id: "color_alpha",
            kind: TransformKind::Lens,
            input: TypeDesc::signal(Domain::Color),
            output: TypeDesc::signal(Domain::Color),
            compile: Some(lower_color_alpha),
        },
        TransformDef {
            id: "legacy_smooth",
            kind: TransformKind::Lens,
            input: TypeDesc::signal(Domain::Float),
            output: TypeDesc::signal(Domain::Float),
            compile: None,
        },
    ];
    for def in defs {
        // Ids are distinct literals; duplicate registration cannot occur.
        let _ = reg.register(def);
    }
    reg
}
