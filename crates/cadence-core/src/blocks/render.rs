// SPDX-License-Identifier: Apache-2.0
//! Render sink blocks.
//!
//! Render blocks register pass descriptors with the builder; the link pass
//! schedules attribute materialization and one render-assemble step. A render
//! block's output carries its pass index as a render-typed value so passes
//! can flow onto render buses and into clip groups.

use crate::builder::{IrBuilder, ValueRef};
use crate::ident::SigExprId;
use crate::ir::{ClipSpecIR, MaterialIR, PathVerbIR, PostFxKindIR, RenderPassIR, SigExprIR};
use crate::patch::{CombineMode, CombinePolicy, CombineWhen};
use crate::registry::{BlockDef, LowerCtx, LowerError, PortDef};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

/// Material tag: filled circle.
pub const MATERIAL_CIRCLE: u32 = 0;
/// Material tag: filled quad.
pub const MATERIAL_QUAD: u32 = 1;
/// Material tag: soft-edged circle.
pub const MATERIAL_SOFT_CIRCLE: u32 = 2;

/// Path shape tag: rectangle.
pub const PATH_SHAPE_RECT: u32 = 0;
/// Path shape tag: regular polygon.
pub const PATH_SHAPE_NGON: u32 = 1;

/// PostFx kind tag: blur.
pub const POSTFX_BLUR: u32 = 0;
/// PostFx kind tag: bloom.
pub const POSTFX_BLOOM: u32 = 1;
/// PostFx kind tag: vignette.
pub const POSTFX_VIGNETTE: u32 = 2;
/// PostFx kind tag: color grade.
pub const POSTFX_COLOR_GRADE: u32 = 3;

/// Clip shape tag: rectangle.
pub const CLIP_SHAPE_RECT: u32 = 0;
/// Clip shape tag: circle.
pub const CLIP_SHAPE_CIRCLE: u32 = 1;

const RENDER_TY: TypeDesc = TypeDesc::signal(Domain::Render);

fn sig_input(ctx: &LowerCtx<'_>, id: &str) -> Result<SigExprId, LowerError> {
    ctx.input(id)?
        .as_sig()
        .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
}

fn field_input(ctx: &LowerCtx<'_>, id: &str) -> Result<crate::ident::FieldExprId, LowerError> {
    ctx.input(id)?
        .as_field()
        .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
}

/// Emits the render-typed output value carrying a pass index.
fn pass_ref(b: &mut IrBuilder, idx: u32) -> ValueRef {
    let id = b.sig_const(Value::Int(i64::from(idx)), RENDER_TY);
    ValueRef::sig(id, RENDER_TY)
}

// ─── RenderInstances2D ──────────────────────────────────────────────

const INSTANCES_INPUTS: &[PortDef] = &[
    PortDef::new("pos", TypeDesc::field(Domain::Vec2)).with_default(Value::Vec2([0.0, 0.0])),
    PortDef::new("radius", TypeDesc::field(Domain::Float)).with_default(Value::Float(8.0)),
    PortDef::new("color", TypeDesc::field(Domain::Color))
        .with_default(Value::Color([1.0, 1.0, 1.0, 1.0])),
    PortDef::new("rot", TypeDesc::field(Domain::Float)).with_default(Value::Float(0.0)),
    PortDef::new("scale", TypeDesc::field(Domain::Vec2)).with_default(Value::Vec2([1.0, 1.0])),
];

const RENDER_OUT: &[PortDef] = &[PortDef::new("out", RENDER_TY)];

fn lower_instances(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let pos = field_input(ctx, "pos")?;
    let radius = field_input(ctx, "radius")?;
    let color = field_input(ctx, "color")?;
    let rot = field_input(ctx, "rot")?;
    let scale_xy = field_input(ctx, "scale")?;
    let count = ctx.param_u32("count", 16)?.max(1);
    let material = match ctx.param_enum("material", MATERIAL_CIRCLE)? {
        MATERIAL_QUAD => MaterialIR::Quad,
        MATERIAL_SOFT_CIRCLE => MaterialIR::SoftCircle,
        _ => MaterialIR::Circle,
    };
    let z = ctx.param_f32("z", 0.0)?;
    let b = ctx.builder();
    let z_sig = b.sig_const(Value::Float(z), TypeDesc::signal(Domain::Float));
    let idx = b.push_render_pass(RenderPassIR::Instances2D {
        material,
        count,
        pos,
        radius,
        color,
        rot: Some(rot),
        scale_xy: Some(scale_xy),
        z: z_sig,
    });
    let out = pass_ref(b, idx);
    ctx.set_output("out", out);
    Ok(())
}

/// `RenderInstances2D` block definition.
pub const RENDER_INSTANCES_2D: BlockDef = BlockDef {
    type_name: "RenderInstances2D",
    inputs: INSTANCES_INPUTS,
    outputs: RENDER_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_instances,
};

// ─── RenderPaths2D ──────────────────────────────────────────────────

const PATHS_INPUTS: &[PortDef] = &[
    PortDef::new("width", TypeDesc::signal(Domain::Float)).with_default(Value::Float(1.5)),
    PortDef::new("color", TypeDesc::signal(Domain::Color))
        .with_default(Value::Color([1.0, 1.0, 1.0, 1.0])),
];

fn rect_path(size: [f32; 2]) -> (Vec<PathVerbIR>, Vec<f32>) {
    let (hw, hh) = (size[0] * 0.5, size[1] * 0.5);
    let verbs = vec![
        PathVerbIR::MoveTo,
        PathVerbIR::LineTo,
        PathVerbIR::LineTo,
        PathVerbIR::LineTo,
        PathVerbIR::Close,
    ];
    let params = vec![-hw, -hh, hw, -hh, hw, hh, -hw, hh];
    (verbs, params)
}

#[allow(clippy::cast_precision_loss)]
fn ngon_path(size: [f32; 2], sides: u32) -> (Vec<PathVerbIR>, Vec<f32>) {
    let n = sides.max(3);
    let (rx, ry) = (size[0] * 0.5, size[1] * 0.5);
    let mut verbs = Vec::with_capacity(n as usize + 1);
    let mut params = Vec::with_capacity(n as usize * 2);
    for i in 0..n {
        let angle = core::f64::consts::TAU * f64::from(i) / f64::from(n);
        verbs.push(if i == 0 {
            PathVerbIR::MoveTo
        } else {
            PathVerbIR::LineTo
        });
        #[allow(clippy::cast_possible_truncation)]
        {
            params.push((libm::cos(angle) as f32) * rx);
            params.push((libm::sin(angle) as f32) * ry);
        }
    }
    verbs.push(PathVerbIR::Close);
    (verbs, params)
}

fn lower_paths(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let width = sig_input(ctx, "width")?;
    let color = sig_input(ctx, "color")?;
    let shape = ctx.param_enum("shape", PATH_SHAPE_RECT)?;
    let size = ctx.param_vec2("size", [100.0, 100.0])?;
    let sides = ctx.param_u32("sides", 5)?;
    let z = ctx.param_f32("z", 0.0)?;
    let (verbs, params) = if shape == PATH_SHAPE_NGON {
        ngon_path(size, sides)
    } else {
        rect_path(size)
    };
    let b = ctx.builder();
    let z_sig = b.sig_const(Value::Float(z), TypeDesc::signal(Domain::Float));
    let idx = b.push_render_pass(RenderPassIR::Paths2D {
        verbs,
        params,
        width,
        color,
        z: z_sig,
    });
    let out = pass_ref(b, idx);
    ctx.set_output("out", out);
    Ok(())
}

/// `RenderPaths2D` block definition.
pub const RENDER_PATHS_2D: BlockDef = BlockDef {
    type_name: "RenderPaths2D",
    inputs: PATHS_INPUTS,
    outputs: RENDER_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_paths,
};

// ─── PostFx ─────────────────────────────────────────────────────────

const POSTFX_INPUTS: &[PortDef] =
    &[PortDef::new("strength", TypeDesc::signal(Domain::Float)).with_default(Value::Float(0.5))];

fn lower_postfx(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let strength = sig_input(ctx, "strength")?;
    let kind = match ctx.param_enum("kind", POSTFX_BLUR)? {
        POSTFX_BLOOM => PostFxKindIR::Bloom,
        POSTFX_VIGNETTE => PostFxKindIR::Vignette,
        POSTFX_COLOR_GRADE => PostFxKindIR::ColorGrade,
        _ => PostFxKindIR::Blur,
    };
    let b = ctx.builder();
    let idx = b.push_render_pass(RenderPassIR::PostFx {
        kind,
        params: vec![("strength".to_owned(), strength)],
    });
    let out = pass_ref(b, idx);
    ctx.set_output("out", out);
    Ok(())
}

/// `PostFx` block definition.
pub const POST_FX: BlockDef = BlockDef {
    type_name: "PostFx",
    inputs: POSTFX_INPUTS,
    outputs: RENDER_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_postfx,
};

// ─── ClipGroup ──────────────────────────────────────────────────────

const CLIP_INPUTS: &[PortDef] = &[PortDef::new("child", RENDER_TY).with_combine(CombinePolicy {
    when: CombineWhen::Multi,
    mode: CombineMode::Layer,
})];

/// Collects pass indices from a render-typed expression tree.
///
/// Render refs are pass indices encoded as integer constants; layered
/// children arrive as a combine node whose terms are walked in canonical
/// order.
fn collect_pass_indices(b: &IrBuilder, id: SigExprId, out: &mut Vec<u32>) {
    match b.sig_expr(id) {
        Some(SigExprIR::Const(c)) => {
            if let Some(Value::Int(i)) = b.const_value(*c) {
                if let Ok(idx) = u32::try_from(*i) {
                    out.push(idx);
                }
            }
        }
        Some(SigExprIR::BusCombine { terms, .. }) => {
            for t in terms.clone() {
                collect_pass_indices(b, t, out);
            }
        }
        Some(SigExprIR::Alias(src)) => {
            let src = *src;
            collect_pass_indices(b, src, out);
        }
        _ => {}
    }
}

fn lower_clip_group(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let child = sig_input(ctx, "child")?;
    let shape = ctx.param_enum("shape", CLIP_SHAPE_RECT)?;
    let origin = ctx.param_vec2("origin", [0.0, 0.0])?;
    let size = ctx.param_vec2("size", [100.0, 100.0])?;
    let radius = ctx.param_f32("radius", 50.0)?;
    let z = ctx.param_f32("z", 0.0)?;
    let clip = if shape == CLIP_SHAPE_CIRCLE {
        ClipSpecIR::Circle {
            cx: origin[0],
            cy: origin[1],
            r: radius,
        }
    } else {
        ClipSpecIR::Rect {
            x: origin[0],
            y: origin[1],
            w: size[0],
            h: size[1],
        }
    };
    let b = ctx.builder();
    let mut children = Vec::new();
    collect_pass_indices(b, child, &mut children);
    let z_sig = b.sig_const(Value::Float(z), TypeDesc::signal(Domain::Float));
    let idx = b.push_render_pass(RenderPassIR::ClipGroup {
        clip,
        children,
        z: z_sig,
    });
    let out = pass_ref(b, idx);
    ctx.set_output("out", out);
    Ok(())
}

/// `ClipGroup` block definition (rendering optional in v1).
pub const CLIP_GROUP: BlockDef = BlockDef {
    type_name: "ClipGroup",
    inputs: CLIP_INPUTS,
    outputs: RENDER_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: lower_clip_group,
};

/// All render block definitions, for registration.
pub const ALL: &[BlockDef] = &[
    RENDER_INSTANCES_2D,
    RENDER_PATHS_2D,
    POST_FX,
    CLIP_GROUP,
];
