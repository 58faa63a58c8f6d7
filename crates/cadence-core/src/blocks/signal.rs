// SPDX-License-Identifier: Apache-2.0
//! Signal-world blocks: oscillator, arithmetic, color, and the stateful
//! operators.

use crate::builder::ValueRef;
use crate::ir::{BinaryOp, StateOp, UnaryOp};
use crate::patch::{CombineMode, CombinePolicy, CombineWhen};
use crate::registry::{BlockDef, LowerCtx, LowerError, PortDef};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

/// Oscillator shape tag: sine.
pub const OSC_SHAPE_SINE: u32 = 0;
/// Oscillator shape tag: triangle.
pub const OSC_SHAPE_TRIANGLE: u32 = 1;
/// Oscillator shape tag: sawtooth.
pub const OSC_SHAPE_SAW: u32 = 2;
/// Oscillator shape tag: square.
pub const OSC_SHAPE_SQUARE: u32 = 3;

fn sig_input(ctx: &LowerCtx<'_>, id: &str) -> Result<crate::ident::SigExprId, LowerError> {
    ctx.input(id)?
        .as_sig()
        .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
}

// ─── Oscillator ─────────────────────────────────────────────────────

const OSC_INPUTS: &[PortDef] = &[PortDef::new(
    "frequency",
    TypeDesc::signal(Domain::Float),
)
.with_default(Value::Float(440.0))];

const FLOAT_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::signal(Domain::Float))];

/// The oscillator runs off the time model's phase: its wave phase is
/// `fract(phase01 · frequency)`, so one model cycle spans `frequency`
/// oscillations.
fn lower_oscillator(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let freq = sig_input(ctx, "frequency")?;
    let shape = ctx.param_enum("shape", OSC_SHAPE_SINE)?;
    let amplitude = ctx.param_f32("amplitude", 1.0)?;
    let b = ctx.builder();
    let phase = b.sig_phase01();
    let scaled = b.sig_zip(phase, freq, BinaryOp::Mul)?;
    let wave_phase = b.sig_map(scaled, UnaryOp::Fract)?;
    let op = match shape {
        OSC_SHAPE_TRIANGLE => UnaryOp::Tri01,
        OSC_SHAPE_SAW => UnaryOp::Saw01,
        OSC_SHAPE_SQUARE => UnaryOp::Square01,
        _ => UnaryOp::Sin01,
    };
    let mut out = b.sig_map(wave_phase, op)?;
    if amplitude != 1.0 {
        let amp = b.sig_const(Value::Float(amplitude), TypeDesc::signal(Domain::Float));
        out = b.sig_zip(out, amp, BinaryOp::Mul)?;
    }
    ctx.set_output("out", ValueRef::sig(out, TypeDesc::signal(Domain::Float)));
    Ok(())
}

/// `Oscillator` block definition.
pub const OSCILLATOR: BlockDef = BlockDef {
    type_name: "Oscillator",
    inputs: OSC_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_oscillator,
};

// ─── Arithmetic ─────────────────────────────────────────────────────

const ADD_INPUTS: &[PortDef] = &[
    PortDef::new("a", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0)),
    PortDef::new("b", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0)),
];

const MUL_INPUTS: &[PortDef] = &[
    PortDef::new("a", TypeDesc::signal(Domain::Float)).with_default(Value::Float(1.0)),
    PortDef::new("b", TypeDesc::signal(Domain::Float)).with_default(Value::Float(1.0)),
];

fn lower_binary(ctx: &mut LowerCtx<'_>, op: BinaryOp) -> Result<(), LowerError> {
    let a = sig_input(ctx, "a")?;
    let bb = sig_input(ctx, "b")?;
    let b = ctx.builder();
    let out = b.sig_zip(a, bb, op)?;
    let ty = b
        .sig_type(out)
        .unwrap_or(TypeDesc::signal(Domain::Float));
    ctx.set_output("out", ValueRef::sig(out, ty));
    Ok(())
}

/// `Add` block definition.
pub const ADD: BlockDef = BlockDef {
    type_name: "Add",
    inputs: ADD_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: |ctx| lower_binary(ctx, BinaryOp::Add),
};

/// `Multiply` block definition.
pub const MULTIPLY: BlockDef = BlockDef {
    type_name: "Multiply",
    inputs: MUL_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: |ctx| lower_binary(ctx, BinaryOp::Mul),
};

// ─── Mixer (multi-writer sum slot) ──────────────────────────────────

const MIXER_INPUTS: &[PortDef] = &[PortDef::new("in", TypeDesc::signal(Domain::Float))
    .with_default(Value::Float(0.0))
    .with_combine(CombinePolicy {
        when: CombineWhen::Multi,
        mode: CombineMode::Sum,
    })];

fn lower_mixer(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = ctx.input("in")?;
    ctx.set_output("out", input);
    Ok(())
}

/// `Mixer` block definition: its sole input sums all writers.
pub const MIXER: BlockDef = BlockDef {
    type_name: "Mixer",
    inputs: MIXER_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_mixer,
};

// ─── Scale / Clamp ──────────────────────────────────────────────────

const IN_FLOAT: &[PortDef] =
    &[PortDef::new("in", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0))];

fn lower_scale(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = sig_input(ctx, "in")?;
    let factor = ctx.param_f32("factor", 1.0)?;
    let offset = ctx.param_f32("offset", 0.0)?;
    let b = ctx.builder();
    let ty = TypeDesc::signal(Domain::Float);
    let f = b.sig_const(Value::Float(factor), ty);
    let scaled = b.sig_zip(input, f, BinaryOp::Mul)?;
    let o = b.sig_const(Value::Float(offset), ty);
    let out = b.sig_zip(scaled, o, BinaryOp::Add)?;
    ctx.set_output("out", ValueRef::sig(out, ty));
    Ok(())
}

/// `Scale` block definition (`out = in · factor + offset`).
pub const SCALE: BlockDef = BlockDef {
    type_name: "Scale",
    inputs: IN_FLOAT,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_scale,
};

fn lower_clamp01(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = sig_input(ctx, "in")?;
    let b = ctx.builder();
    let out = b.sig_map(input, UnaryOp::Clamp01)?;
    ctx.set_output("out", ValueRef::sig(out, TypeDesc::signal(Domain::Float)));
    Ok(())
}

/// `Clamp01` block definition.
pub const CLAMP01: BlockDef = BlockDef {
    type_name: "Clamp01",
    inputs: IN_FLOAT,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_clamp01,
};

// ─── Color ──────────────────────────────────────────────────────────

const HSL_INPUTS: &[PortDef] = &[PortDef::new("in", TypeDesc::signal(Domain::Color))
    .with_default(Value::Color([0.0, 0.0, 0.0, 1.0]))];

const COLOR_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::signal(Domain::Color))];

fn lower_hsl_to_rgb(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = sig_input(ctx, "in")?;
    let b = ctx.builder();
    let out = b.sig_map(input, UnaryOp::HslToRgb)?;
    ctx.set_output("out", ValueRef::sig(out, TypeDesc::signal(Domain::Color)));
    Ok(())
}

/// `HslToRgb` block definition.
pub const HSL_TO_RGB: BlockDef = BlockDef {
    type_name: "HslToRgb",
    inputs: HSL_INPUTS,
    outputs: COLOR_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_hsl_to_rgb,
};

// ─── Stateful operators ─────────────────────────────────────────────

const INTEGRATOR_INPUTS: &[PortDef] =
    &[PortDef::new("rate", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0))];

fn lower_integrator(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let rate = sig_input(ctx, "rate")?;
    let scale = ctx.param_f32("scale", 1.0)?;
    let initial = ctx.param_f32("initial", 0.0)?;
    let key = ctx.state_key("acc");
    let b = ctx.builder();
    let ty = TypeDesc::signal(Domain::Float);
    let out = b.sig_state(
        key,
        StateOp::Integrate,
        rate,
        Value::Float(scale),
        Value::Float(initial),
        ty,
    )?;
    ctx.set_output("out", ValueRef::sig(out, ty));
    Ok(())
}

/// `Integrator` block definition (stateful).
pub const INTEGRATOR: BlockDef = BlockDef {
    type_name: "Integrator",
    inputs: INTEGRATOR_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: true,
    hidden: false,
    lower: lower_integrator,
};

const SLEW_INPUTS: &[PortDef] =
    &[PortDef::new("target", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0))];

fn lower_slew(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let target = sig_input(ctx, "target")?;
    let rate = ctx.param_f32("rate", 1.0)?;
    let key = ctx.state_key("slew");
    let b = ctx.builder();
    let ty = TypeDesc::signal(Domain::Float);
    let out = b.sig_state(
        key,
        StateOp::Slew,
        target,
        Value::Float(rate),
        Value::Float(0.0),
        ty,
    )?;
    ctx.set_output("out", ValueRef::sig(out, ty));
    Ok(())
}

/// `SlewLimiter` block definition (stateful).
pub const SLEW_LIMITER: BlockDef = BlockDef {
    type_name: "SlewLimiter",
    inputs: SLEW_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: true,
    hidden: false,
    lower: lower_slew,
};

const DELAY_INPUTS: &[PortDef] =
    &[PortDef::new("in", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.0))];

fn lower_delay(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let input = sig_input(ctx, "in")?;
    let delay_ms = ctx.param_f32("delay_ms", 0.0)?;
    let initial = ctx.param_f32("initial", 0.0)?;
    let key = ctx.state_key("line");
    let b = ctx.builder();
    let ty = TypeDesc::signal(Domain::Float);
    let out = b.sig_state(
        key,
        StateOp::DelayMs,
        input,
        Value::Float(delay_ms),
        Value::Float(initial),
        ty,
    )?;
    ctx.set_output("out", ValueRef::sig(out, ty));
    Ok(())
}

/// `Delay` block definition (stateful, one sample deep).
pub const DELAY: BlockDef = BlockDef {
    type_name: "Delay",
    inputs: DELAY_INPUTS,
    outputs: FLOAT_OUT,
    time_root: false,
    stateful: true,
    hidden: false,
    lower: lower_delay,
};

const PULSE_INPUTS: &[PortDef] = &[PortDef::new("trigger", TypeDesc::signal(Domain::Bool))
    .with_default(Value::Bool(false))];

const BOOL_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::signal(Domain::Bool))];

/// Divides the wrap-event pulse train (or an explicit trigger input when one
/// is wired) by the `divide` parameter.
fn lower_pulse_divider(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let trigger = sig_input(ctx, "trigger")?;
    let divide = ctx.param_u32("divide", 2)?.max(1);
    let key = ctx.state_key("pulses");
    let wrap = ctx.wrap_event();
    let b = ctx.builder();
    let wrap_expr = b.sig_event(wrap);
    let either = b.sig_zip(trigger, wrap_expr, BinaryOp::Max)?;
    #[allow(clippy::cast_precision_loss)]
    let out = b.sig_state(
        key,
        StateOp::PulseDivide,
        either,
        Value::Float(divide as f32),
        Value::Float(0.0),
        TypeDesc::signal(Domain::Bool),
    )?;
    ctx.set_output("out", ValueRef::sig(out, TypeDesc::signal(Domain::Bool)));
    Ok(())
}

/// `PulseDivider` block definition (stateful, consumes wrap events).
pub const PULSE_DIVIDER: BlockDef = BlockDef {
    type_name: "PulseDivider",
    inputs: PULSE_INPUTS,
    outputs: BOOL_OUT,
    time_root: false,
    stateful: true,
    hidden: false,
    lower: lower_pulse_divider,
};

/// All signal block definitions, for registration.
pub const ALL: &[BlockDef] = &[
    OSCILLATOR,
    ADD,
    MULTIPLY,
    MIXER,
    SCALE,
    CLAMP01,
    HSL_TO_RGB,
    INTEGRATOR,
    SLEW_LIMITER,
    DELAY,
    PULSE_DIVIDER,
];
