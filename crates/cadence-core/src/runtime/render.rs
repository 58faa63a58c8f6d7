// SPDX-License-Identifier: Apache-2.0
//! Render-assemble: IR pass descriptors → one `RenderFrameIR`.
//!
//! Reads previously materialized field buffers and evaluates the per-pass
//! signals (z, stroke style, effect params), packs attribute buffers with
//! deterministic NaN flushing, nests clip-group children, and sorts the
//! top-level passes back-to-front by z (PostFx always last). Passes whose
//! buffers are malformed fall back to defaults; the frame never aborts.

use std::collections::BTreeSet;

use cadence_scene_port::{
    AttributeBuffer, ClipGroup, ClipSpec, Instances2D, MaterialKind, Paths2D, PathVerb, PostFx,
    PostFxKind, RenderFrameIR, RenderPass, StrokeStyle,
};

use crate::ir::{
    ClipSpecIR, CompiledProgramIR, MaterialIR, PathVerbIR, PostFxKindIR, RenderPassIR,
};
use crate::value::Value;

use super::executor::EvalCtx;
use super::FieldBuffer;

fn flush(x: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Packs a field buffer into an instance-major attribute buffer of exactly
/// `lanes` lanes per element, padding or truncating per element as needed.
fn pack_attribute(buf: &FieldBuffer, lanes: u8, count: u32) -> AttributeBuffer {
    let lanes_n = usize::from(lanes);
    let mut data = Vec::with_capacity(lanes_n * count as usize);
    let mut scratch = Vec::with_capacity(8);
    for i in 0..count as usize {
        scratch.clear();
        buf.values
            .get(i)
            .copied()
            .unwrap_or(Value::Float(0.0))
            .write_lanes(&mut scratch);
        scratch.resize(lanes_n, 0.0);
        data.extend(scratch.iter().take(lanes_n).copied().map(flush));
    }
    AttributeBuffer { lanes, data }
}

fn material(m: MaterialIR) -> MaterialKind {
    match m {
        MaterialIR::Circle => MaterialKind::Circle,
        MaterialIR::Quad => MaterialKind::Quad,
        MaterialIR::SoftCircle => MaterialKind::SoftCircle,
    }
}

fn verb(v: PathVerbIR) -> PathVerb {
    match v {
        PathVerbIR::MoveTo => PathVerb::MoveTo,
        PathVerbIR::LineTo => PathVerb::LineTo,
        PathVerbIR::QuadTo => PathVerb::QuadTo,
        PathVerbIR::Close => PathVerb::Close,
    }
}

fn clip(c: ClipSpecIR) -> ClipSpec {
    match c {
        ClipSpecIR::Rect { x, y, w, h } => ClipSpec::Rect { x, y, w, h },
        ClipSpecIR::Circle { cx, cy, r } => ClipSpec::Circle { cx, cy, r },
    }
}

fn fx_kind(k: PostFxKindIR) -> PostFxKind {
    match k {
        PostFxKindIR::Blur => PostFxKind::Blur,
        PostFxKindIR::Bloom => PostFxKind::Bloom,
        PostFxKindIR::Vignette => PostFxKind::Vignette,
        PostFxKindIR::ColorGrade => PostFxKind::ColorGrade,
    }
}

fn color_of(v: &Value) -> [f32; 4] {
    match v.canonicalized() {
        Value::Color(c) => c,
        other => {
            let x = other.as_f32();
            [x, x, x, 1.0]
        }
    }
}

fn build_pass(
    program: &CompiledProgramIR,
    idx: u32,
    ctx: &mut EvalCtx<'_>,
) -> Option<RenderPass> {
    let pass = program.render_passes.get(idx as usize)?;
    match pass {
        RenderPassIR::Instances2D {
            material: m,
            count,
            pos,
            radius,
            color,
            rot,
            scale_xy,
            z,
        } => {
            let pos_buf = ctx.eval_field(*pos, *count);
            let radius_buf = ctx.eval_field(*radius, *count);
            let color_buf = ctx.eval_field(*color, *count);
            let rot_buf = rot.map(|f| ctx.eval_field(f, *count));
            let scale_buf = scale_xy.map(|f| ctx.eval_field(f, *count));
            let z = flush(ctx.eval_sig(*z).as_f32());
            Some(RenderPass::Instances2D(Instances2D {
                material: material(*m),
                instance_count: *count,
                pos: pack_attribute(&pos_buf, 2, *count),
                radius: pack_attribute(&radius_buf, 1, *count),
                color: pack_attribute(&color_buf, 4, *count),
                rot: rot_buf.map(|b| pack_attribute(&b, 1, *count)),
                scale_xy: scale_buf.map(|b| pack_attribute(&b, 2, *count)),
                z,
            }))
        }
        RenderPassIR::Paths2D {
            verbs,
            params,
            width,
            color,
            z,
        } => {
            let width = flush(ctx.eval_sig(*width).as_f32()).max(0.0);
            let color = color_of(&ctx.eval_sig(*color));
            let z = flush(ctx.eval_sig(*z).as_f32());
            Some(RenderPass::Paths2D(Paths2D {
                commands: verbs.iter().copied().map(verb).collect(),
                params: params.iter().copied().map(flush).collect(),
                style: StrokeStyle { width, color },
                z,
            }))
        }
        RenderPassIR::ClipGroup { clip: c, children, z } => {
            let mut kids = Vec::with_capacity(children.len());
            for child in children {
                // Children always lower before their group; the guard keeps
                // a malformed descriptor from recursing.
                if *child < idx {
                    if let Some(p) = build_pass(program, *child, ctx) {
                        kids.push(p);
                    }
                }
            }
            kids.sort_by(|a, b| a.z().total_cmp(&b.z()));
            let z = flush(ctx.eval_sig(*z).as_f32());
            Some(RenderPass::ClipGroup(Box::new(ClipGroup {
                clip: clip(*c),
                children: kids,
                z,
            })))
        }
        RenderPassIR::PostFx { kind, params } => {
            let params = params
                .iter()
                .map(|(name, sig)| (name.clone(), flush(ctx.eval_sig(*sig).as_f32())))
                .collect();
            Some(RenderPass::PostFx(PostFx {
                kind: fx_kind(*kind),
                params,
            }))
        }
    }
}

/// Assembles the frame from the program's pass descriptors.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn assemble(
    program: &CompiledProgramIR,
    frame_index: u64,
    t_abs_ms: f64,
    ctx: &mut EvalCtx<'_>,
) -> RenderFrameIR {
    // Passes claimed by a clip group render inside it, not at top level.
    let mut grouped: BTreeSet<u32> = BTreeSet::new();
    for pass in &program.render_passes {
        if let RenderPassIR::ClipGroup { children, .. } = pass {
            grouped.extend(children.iter().copied());
        }
    }

    let mut passes = Vec::with_capacity(program.render_passes.len());
    for idx in 0..program.render_passes.len() as u32 {
        if grouped.contains(&idx) {
            continue;
        }
        if let Some(pass) = build_pass(program, idx, ctx) {
            passes.push(pass);
        }
    }
    // Back-to-front by z; stable, so descriptor order breaks ties. PostFx
    // reports +inf and lands last.
    passes.sort_by(|a, b| a.z().total_cmp(&b.z()));

    RenderFrameIR {
        frame_index,
        t_abs_ms,
        passes,
    }
}
