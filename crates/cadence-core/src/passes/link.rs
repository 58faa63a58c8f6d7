// SPDX-License-Identifier: Apache-2.0
//! Pass 8 — link resolution, schedule emission, freeze.
//!
//! Listener references were resolved structurally during the walk (a
//! listener input reads its bus's combine node), so linking here means:
//! verify no placeholder survived, lay out the frame schedule, attach
//! probes, and freeze the builder into the immutable program.
//!
//! Schedule shape: time-derive first, then node/bus evals in walk order,
//! then field materialization for every render attribute, one
//! render-assemble, and finally the debug probes.

use crate::builder::IrBuilder;
use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{make_probe_id, FieldExprId};
use crate::ir::{DebugProbeIR, ProbeMode, ProbeTarget, RenderPassIR, Step};
use crate::types::Domain;

use super::lower::Lowered;
use super::CompileOptions;

fn probe_mode(domain: Domain) -> ProbeMode {
    match domain.canonical() {
        Domain::Vec2 => ProbeMode::Vec2,
        Domain::Color => ProbeMode::Color,
        _ => ProbeMode::Scalar,
    }
}

/// Attribute fields a render pass materializes, with its element count.
fn pass_fields(pass: &RenderPassIR) -> Vec<(FieldExprId, u32)> {
    match pass {
        RenderPassIR::Instances2D {
            count,
            pos,
            radius,
            color,
            rot,
            scale_xy,
            ..
        } => {
            let mut fields = vec![(*pos, *count), (*radius, *count), (*color, *count)];
            if let Some(rot) = rot {
                fields.push((*rot, *count));
            }
            if let Some(scale) = scale_xy {
                fields.push((*scale, *count));
            }
            fields
        }
        RenderPassIR::Paths2D { .. }
        | RenderPassIR::ClipGroup { .. }
        | RenderPassIR::PostFx { .. } => Vec::new(),
    }
}

/// Links, schedules, and freezes the program.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn link(
    mut builder: IrBuilder,
    lowered: Lowered,
    options: &CompileOptions,
    diags: &mut DiagSink,
) -> Option<crate::ir::CompiledProgramIR> {
    if builder.has_placeholders() {
        diags.emit(
            DiagCode::IrValidationFailed,
            "unresolved placeholder expressions after linking",
            Where::default(),
        );
        return None;
    }

    let mut schedule = Vec::with_capacity(lowered.steps.len() + 8);
    schedule.push(Step::TimeDerive);
    schedule.extend(lowered.steps);

    // Materialize every distinct (field, count) pair the render passes read.
    let mut seen = std::collections::BTreeSet::new();
    let mut materialize = Vec::new();
    for pass in builder.render_passes() {
        for (field, count) in pass_fields(pass) {
            if seen.insert((field, count)) {
                materialize.push(Step::Materialize { field, count });
            }
        }
    }
    let has_passes = builder.render_pass_count() > 0;
    schedule.extend(materialize);
    if has_passes {
        schedule.push(Step::RenderAssemble);
    }

    if options.enable_trace {
        for (name, slot) in &lowered.outputs {
            let domain = builder
                .slot_ty(*slot)
                .map_or(Domain::Float, |ty| ty.domain);
            let probe = builder.push_probe(DebugProbeIR {
                id: make_probe_id(name),
                target: ProbeTarget::Slot(*slot),
                mode: probe_mode(domain),
            });
            schedule.push(Step::DebugProbe { probe });
        }
    }

    let version = options
        .ir_version_tag
        .clone()
        .unwrap_or_else(|| crate::ir::IR_VERSION.to_owned());
    let program = builder.finish(version, options.compiled_at_ms, schedule, lowered.outputs);

    if let Err(e) = program.validate() {
        diags.emit(DiagCode::IrValidationFailed, e.to_string(), Where::default());
        return None;
    }
    Some(program)
}
