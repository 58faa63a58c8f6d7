// SPDX-License-Identifier: Apache-2.0
//! The compiler pipeline.
//!
//! [`compile`] runs the fixed pass sequence over one consistent patch
//! snapshot. Each pass is a pure function of the previous pass's output plus
//! the registries; diagnostics accumulate in one sink. Passes stop early
//! only when a fatal diagnostic would violate the next pass's structural
//! preconditions, so one compile surfaces as many problems as it can.
//!
//! Determinism: the same patch, registries, and seed produce byte-identical
//! programs modulo `compiled_at_ms`.

pub mod defaults;
pub mod link;
pub mod lower;
pub mod normalize;
pub mod order;
pub mod time_root;
pub mod typecheck;
pub mod writers;

use crate::builder::IrBuilder;
use crate::diag::{DiagSink, Diagnostic};
use crate::ir::CompiledProgramIR;
use crate::patch::Patch;
use crate::registry::Registries;

/// Caller-supplied compile configuration.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Seed baked into seeded kernels (jitter).
    pub seed: u64,
    /// Attach debug probes for every visible output slot.
    pub enable_trace: bool,
    /// Overrides the stamped IR version (hot-swap testing).
    pub ir_version_tag: Option<String>,
    /// Compile timestamp recorded on the program; the core never reads the
    /// wall clock itself.
    pub compiled_at_ms: u64,
}

/// What a compile hands back: a program unless a fatal diagnostic fired,
/// plus every diagnostic gathered along the way.
#[derive(Debug)]
pub struct CompileOutput {
    /// The frozen program; `None` exactly when a fatal diagnostic exists.
    pub program: Option<CompiledProgramIR>,
    /// All diagnostics, in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compiles a patch snapshot into a frozen program.
#[must_use]
pub fn compile(patch: &Patch, regs: &Registries, options: &CompileOptions) -> CompileOutput {
    let mut diags = DiagSink::new();

    // Pass 0 — default-source materialization.
    let patch = defaults::materialize_defaults(patch, &regs.blocks, &mut diags);
    if diags.has_fatal() {
        return CompileOutput {
            program: None,
            diagnostics: diags.into_diagnostics(),
        };
    }

    // Pass 1 — normalization and edge partition.
    let mut norm = normalize::normalize(&patch, &regs.blocks, &mut diags);
    if diags.has_fatal() {
        return CompileOutput {
            program: None,
            diagnostics: diags.into_diagnostics(),
        };
    }

    // Pass 2 — type graph (recoverable failures exclude edges).
    let failed = typecheck::typecheck(&norm, &regs.blocks, &regs.transforms, &mut diags);

    // Pass 3 — time root extraction and auto-publication.
    let Some(time_model) = time_root::extract_time_root(&mut norm, &regs.blocks, &mut diags)
    else {
        return CompileOutput {
            program: None,
            diagnostics: diags.into_diagnostics(),
        };
    };

    // Pass 4 — dependency ordering (state cycles allowed).
    let order = order::order(&norm, &regs.blocks, &failed, &mut diags);
    if diags.has_fatal() {
        return CompileOutput {
            program: None,
            diagnostics: diags.into_diagnostics(),
        };
    }

    // Pass 5 — per-input writer resolution.
    let specs = writers::resolve_writers(&norm, &regs.blocks, &failed, &mut diags);

    // Passes 6 & 7 — block and bus lowering over the ordered walk.
    let mut builder = IrBuilder::new(options.seed);
    builder.set_time_model(time_model);
    let lowered = lower::lower_all(
        &norm,
        &order,
        &specs,
        regs,
        &failed,
        &mut builder,
        &mut diags,
    );
    if diags.has_fatal() {
        return CompileOutput {
            program: None,
            diagnostics: diags.into_diagnostics(),
        };
    }

    // Pass 8 — link, schedule, freeze.
    let program = link::link(builder, lowered, options, &mut diags);
    let diagnostics = diags.into_diagnostics();
    crate::telemetry::compile_done(
        program.as_ref().map_or(0, |p| p.sig_exprs.len()),
        program.as_ref().map_or(0, |p| p.field_exprs.len()),
        program.as_ref().map_or(0, |p| p.schedule.len()),
        diagnostics.len(),
    );
    CompileOutput {
        program,
        diagnostics,
    }
}
