// SPDX-License-Identifier: Apache-2.0
//! Field-world blocks: per-element position generators and modifiers.
//!
//! Fields stay lazy: a block builds field expressions, but nothing
//! materializes until a render sink schedules a buffer at its element count.

use crate::builder::ValueRef;
use crate::ir::{BinaryOp, IndexedOp};
use crate::registry::{BlockDef, LowerCtx, LowerError, PortDef};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

/// Spread layout tag: a line along the x axis.
pub const SPREAD_LAYOUT_LINE: u32 = 0;
/// Spread layout tag: a ring.
pub const SPREAD_LAYOUT_RING: u32 = 1;

fn sig_input(ctx: &LowerCtx<'_>, id: &str) -> Result<crate::ident::SigExprId, LowerError> {
    ctx.input(id)?
        .as_sig()
        .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
}

fn field_input(ctx: &LowerCtx<'_>, id: &str) -> Result<crate::ident::FieldExprId, LowerError> {
    ctx.input(id)?
        .as_field()
        .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
}

// ─── FieldSpread ────────────────────────────────────────────────────

const SPREAD_INPUTS: &[PortDef] = &[
    PortDef::new("extent", TypeDesc::signal(Domain::Float)).with_default(Value::Float(200.0)),
    PortDef::new("offset", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0)),
];

const VEC2_FIELD_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::field(Domain::Vec2))];

fn lower_spread(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let extent = sig_input(ctx, "extent")?;
    let offset = sig_input(ctx, "offset")?;
    let layout = ctx.param_enum("layout", SPREAD_LAYOUT_LINE)?;
    let op = if layout == SPREAD_LAYOUT_RING {
        IndexedOp::Ring
    } else {
        IndexedOp::Line
    };
    let b = ctx.builder();
    let ty = TypeDesc::field(Domain::Vec2);
    let out = b.field_map_indexed(op, extent, offset, ty)?;
    ctx.set_output("out", ValueRef::field(out, ty));
    Ok(())
}

/// `FieldSpread` block definition: positions along a line or ring.
pub const FIELD_SPREAD: BlockDef = BlockDef {
    type_name: "FieldSpread",
    inputs: SPREAD_INPUTS,
    outputs: VEC2_FIELD_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_spread,
};

// ─── FieldBroadcast ─────────────────────────────────────────────────

const BROADCAST_INPUTS: &[PortDef] =
    &[PortDef::new("in", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0))];

const FLOAT_FIELD_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::field(Domain::Float))];

fn lower_broadcast(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = sig_input(ctx, "in")?;
    let b = ctx.builder();
    let out = b.field_broadcast(input)?;
    let ty = TypeDesc::field(Domain::Float);
    ctx.set_output("out", ValueRef::field(out, ty));
    Ok(())
}

/// `FieldBroadcast` block definition: one signal fanned to every element.
pub const FIELD_BROADCAST: BlockDef = BlockDef {
    type_name: "FieldBroadcast",
    inputs: BROADCAST_INPUTS,
    outputs: FLOAT_FIELD_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_broadcast,
};

// ─── FieldJitter ────────────────────────────────────────────────────

const JITTER_INPUTS: &[PortDef] = &[
    PortDef::new("src", TypeDesc::field(Domain::Vec2)).with_default(Value::Vec2([0.0, 0.0])),
    PortDef::new("amount", TypeDesc::signal(Domain::Float)).with_default(Value::Float(10.0)),
];

/// Displaces each element by a deterministic per-element hash offset.
///
/// The hash is seeded from the program seed plus the block's `salt` param,
/// so recompiles and replays see identical jitter.
fn lower_jitter(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let src = field_input(ctx, "src")?;
    let amount = sig_input(ctx, "amount")?;
    let salt = ctx.param_f32("salt", 0.0)?;
    let b = ctx.builder();
    let ty = TypeDesc::field(Domain::Vec2);
    let float_ty = TypeDesc::signal(Domain::Float);
    let salt_sig = b.sig_const(Value::Float(salt), float_ty);
    let zero = b.sig_const(Value::Float(0.0), float_ty);
    let hash = b.field_map_indexed(IndexedOp::Hash01, salt_sig, zero, ty)?;
    let half = b.sig_const(Value::Float(0.5), float_ty);
    let centered = b.field_zip_sig(hash, half, BinaryOp::Sub)?;
    let scaled = b.field_zip_sig(centered, amount, BinaryOp::Mul)?;
    let out = b.field_zip(src, scaled, BinaryOp::Add)?;
    ctx.set_output("out", ValueRef::field(out, ty));
    Ok(())
}

/// `FieldJitter` block definition.
pub const FIELD_JITTER: BlockDef = BlockDef {
    type_name: "FieldJitter",
    inputs: JITTER_INPUTS,
    outputs: VEC2_FIELD_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_jitter,
};

/// All field block definitions, for registration.
pub const ALL: &[BlockDef] = &[FIELD_SPREAD, FIELD_BROADCAST, FIELD_JITTER];
