// SPDX-License-Identifier: Apache-2.0
//! End-to-end compiler pipeline tests: determinism, default
//! materialization, empty buses, adapters, and custom-registry policies.

#![allow(clippy::unwrap_used)]

mod common;

use cadence_core::passes::defaults::materialize_defaults;
use cadence_core::{
    compile, Block, BlockDef, BusCombineMode, CombineMode, CombinePolicy, CombineWhen,
    CompileOptions, DiagCode, DiagSink, Domain, Edge, EdgeId, Endpoint, Patch, PortDef,
    Registries, Severity, TransformStep, TypeDesc,
};
use common::{compile_ok, const_float, cycle_root, error_free, float_bus, wrap_scene_patch};

// ─── DETERMINISM (property 1) ───────────────────────────────────────

#[test]
fn identical_compiles_are_byte_identical_modulo_timestamp() {
    let patch = wrap_scene_patch();
    let regs = Registries::standard();
    let opts_a = CompileOptions {
        seed: 42,
        compiled_at_ms: 111,
        ..CompileOptions::default()
    };
    let opts_b = CompileOptions {
        seed: 42,
        compiled_at_ms: 999,
        ..CompileOptions::default()
    };
    let a = compile(&patch, &regs, &opts_a).program.unwrap();
    let mut b = compile(&patch, &regs, &opts_b).program.unwrap();
    assert_ne!(a.compiled_at_ms, b.compiled_at_ms);
    b.compiled_at_ms = a.compiled_at_ms;
    assert_eq!(a, b);
}

#[test]
fn edge_insertion_order_does_not_change_the_program() {
    let forward = common::sum_inputs_patch();
    let mut reversed = common::sum_inputs_patch();
    reversed.edges.reverse();
    let regs = Registries::standard();
    let opts = CompileOptions::default();
    let a = compile(&forward, &regs, &opts).program.unwrap();
    let b = compile(&reversed, &regs, &opts).program.unwrap();
    assert_eq!(a, b);
}

// ─── DEFAULT MATERIALIZATION (scenario B, property 2) ───────────────

#[test]
fn unconnected_oscillator_input_materializes_one_provider() {
    let patch = Patch::new().with_block(Block::new("osc", "Oscillator"));
    let regs = Registries::standard();
    let mut diags = DiagSink::new();
    let out = materialize_defaults(&patch, &regs.blocks, &mut diags);
    assert_eq!(out.blocks.len(), 2);
    assert_eq!(out.edges.len(), 1);

    let again = materialize_defaults(&out, &regs.blocks, &mut diags);
    assert_eq!(again, out);
}

#[test]
fn defaulted_patch_compiles_without_errors() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("osc", "Oscillator"));
    let (program, diags) = compile_ok(&patch);
    assert!(error_free(&diags), "unexpected errors: {diags:?}");
    assert!(program.outputs.contains_key("osc.out"));
}

// ─── EMPTY BUS (scenario D) ─────────────────────────────────────────

#[test]
fn empty_bus_reads_the_default_without_unconnected_errors() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("mix", "Mixer"))
        .with_bus(float_bus("energy", BusCombineMode::Sum))
        .with_edge(Edge::new(
            "listen",
            Endpoint::bus("energy"),
            Endpoint::port("mix", "in"),
        ));
    let (program, diags) = compile_ok(&patch);
    assert!(!diags
        .iter()
        .any(|d| d.code == DiagCode::UnconnectedInput
            && d.where_.block.as_ref().is_some_and(|b| b.as_str() == "mix")));
    assert!(diags.iter().any(|d| d.code == DiagCode::EmptyBus));
    assert!(program.outputs.contains_key("mix.out"));
}

// ─── ADAPTERS (scenario F) ──────────────────────────────────────────

#[test]
fn adapter_bridges_float_to_vec2() {
    let base = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c", 3.0))
        .with_block(Block::new("jitter", "FieldJitter"));
    let adapted = base.clone().with_edge(
        Edge::new("wire", Endpoint::port("c", "out"), Endpoint::port("jitter", "src"))
            .with_transform(TransformStep::new("float_to_vec2")),
    );
    let (_, diags) = compile_ok(&adapted);
    assert!(error_free(&diags), "unexpected errors: {diags:?}");

    let unadapted = base.with_edge(Edge::new(
        "wire",
        Endpoint::port("c", "out"),
        Endpoint::port("jitter", "src"),
    ));
    let regs = Registries::standard();
    let out = compile(&unadapted, &regs, &CompileOptions::default());
    assert!(out.program.is_some(), "type mismatch is recoverable");
    assert!(out.diagnostics.iter().any(|d| {
        d.code == DiagCode::TypeMismatch
            && d.where_.edge.as_ref() == Some(&EdgeId::new("wire"))
    }));
}

#[test]
fn closure_only_transform_warns_and_passes_through() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c", 1.0))
        .with_block(Block::new("mix", "Mixer"))
        .with_edge(
            Edge::new("wire", Endpoint::port("c", "out"), Endpoint::port("mix", "in"))
                .with_transform(TransformStep::new("legacy_smooth")),
        );
    let (_, diags) = compile_ok(&patch);
    assert!(diags.iter().any(|d| d.code == DiagCode::TransformMissingIr
        && d.severity == Severity::Warning));
}

// ─── STRUCTURAL FAILURES ────────────────────────────────────────────

#[test]
fn bus_to_bus_is_fatal_and_yields_no_program() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_bus(float_bus("a", BusCombineMode::Last))
        .with_bus(float_bus("b", BusCombineMode::Last))
        .with_edge(Edge::new("e", Endpoint::bus("a"), Endpoint::bus("b")));
    let regs = Registries::standard();
    let out = compile(&patch, &regs, &CompileOptions::default());
    assert!(out.program.is_none());
    assert!(out.diagnostics.iter().any(|d| d.code == DiagCode::BusToBusEdge));
}

#[test]
fn missing_time_root_is_fatal() {
    let patch = Patch::new().with_block(const_float("c", 1.0));
    let regs = Registries::standard();
    let out = compile(&patch, &regs, &CompileOptions::default());
    assert!(out.program.is_none());
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.code == DiagCode::MissingTimeRoot));
}

#[test]
fn pure_cycle_is_fatal_state_cycle_is_not() {
    let cyclic = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("x", "Add"))
        .with_block(Block::new("y", "Add"))
        .with_edge(Edge::new("e1", Endpoint::port("x", "out"), Endpoint::port("y", "a")))
        .with_edge(Edge::new("e2", Endpoint::port("y", "out"), Endpoint::port("x", "a")));
    let regs = Registries::standard();
    let out = compile(&cyclic, &regs, &CompileOptions::default());
    assert!(out.program.is_none());
    assert!(out.diagnostics.iter().any(|d| d.code == DiagCode::CycleDetected));

    let stateful = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("gain", "Scale"))
        .with_block(Block::new("integ", "Integrator"))
        .with_edge(Edge::new(
            "fwd",
            Endpoint::port("gain", "out"),
            Endpoint::port("integ", "rate"),
        ))
        .with_edge(Edge::new(
            "back",
            Endpoint::port("integ", "out"),
            Endpoint::port("gain", "in"),
        ));
    let (program, _) = compile_ok(&stateful);
    assert!(program.validate().is_ok());
}

// ─── CUSTOM REGISTRY POLICIES ───────────────────────────────────────

fn strict_lower(
    ctx: &mut cadence_core::LowerCtx<'_>,
) -> Result<(), cadence_core::LowerError> {
    let input = ctx.input("in")?;
    ctx.set_output("out", input);
    Ok(())
}

const STRICT_IN: &[PortDef] = &[PortDef::new("in", TypeDesc::signal(Domain::Float))
    .with_default(cadence_core::Value::Float(0.0))
    .with_combine(CombinePolicy {
        when: CombineWhen::Multi,
        mode: CombineMode::Error,
    })];

const STRICT_OUT: &[PortDef] = &[PortDef::new("out", TypeDesc::signal(Domain::Float))];

const STRICT_SINGLE: BlockDef = BlockDef {
    type_name: "StrictSingle",
    inputs: STRICT_IN,
    outputs: STRICT_OUT,
    time_root: false,
    stateful: false,
    hidden: false,
    lower: strict_lower,
};

#[test]
fn error_policy_rejects_multiple_writers_but_still_runs() {
    let mut regs = Registries::standard();
    regs.blocks.register(STRICT_SINGLE).unwrap();
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c1", 1.0))
        .with_block(const_float("c2", 2.0))
        .with_block(Block::new("s", "StrictSingle"))
        .with_edge(Edge::new("w1", Endpoint::port("c1", "out"), Endpoint::port("s", "in")))
        .with_edge(Edge::new("w2", Endpoint::port("c2", "out"), Endpoint::port("s", "in")));
    let out = compile(&patch, &regs, &CompileOptions::default());
    let program = out.program.unwrap();
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.code == DiagCode::MultiInputForbidden));
    assert!(program.outputs.contains_key("s.out"));
}

#[test]
fn unknown_custom_combine_is_a_lowering_error() {
    const CUSTOM_IN: &[PortDef] = &[PortDef::new("in", TypeDesc::signal(Domain::Float))
        .with_default(cadence_core::Value::Float(0.0))
        .with_combine(CombinePolicy {
            when: CombineWhen::Always,
            mode: CombineMode::Custom("median"),
        })];
    const CUSTOM_BLOCK: BlockDef = BlockDef {
        type_name: "CustomCombine",
        inputs: CUSTOM_IN,
        outputs: STRICT_OUT,
        time_root: false,
        stateful: false,
        hidden: false,
        lower: strict_lower,
    };
    let mut regs = Registries::standard();
    regs.blocks.register(CUSTOM_BLOCK).unwrap();
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c", 5.0))
        .with_block(Block::new("s", "CustomCombine"))
        .with_edge(Edge::new("w", Endpoint::port("c", "out"), Endpoint::port("s", "in")));
    let out = compile(&patch, &regs, &CompileOptions::default());
    assert!(out
        .diagnostics
        .iter()
        .any(|d| d.code == DiagCode::LoweringFailed));
}

// ─── SCHEDULE SHAPE (property 6) ────────────────────────────────────

#[test]
fn schedule_starts_with_time_derive_and_validates() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    assert!(matches!(
        program.schedule.first(),
        Some(cadence_core::Step::TimeDerive)
    ));
    assert!(program.validate().is_ok());
    assert!(program
        .schedule
        .iter()
        .any(|s| matches!(s, cadence_core::Step::Materialize { .. })));
    assert!(program
        .schedule
        .iter()
        .any(|s| matches!(s, cadence_core::Step::RenderAssemble)));
}

#[test]
fn auto_publications_are_reported_and_buses_exist() {
    let (program, diags) = compile_ok(&wrap_scene_patch());
    assert!(diags
        .iter()
        .any(|d| d.code == DiagCode::AutoPublication && d.severity == Severity::Info));
    assert!(program
        .schedule
        .iter()
        .any(|s| matches!(s, cadence_core::Step::BusEval { bus, .. } if bus == "phaseA")));
    assert!(program
        .schedule
        .iter()
        .any(|s| matches!(s, cadence_core::Step::BusEval { bus, .. } if bus == "pulse")));
}

#[test]
fn trace_option_attaches_probes() {
    let regs = Registries::standard();
    let opts = CompileOptions {
        enable_trace: true,
        ..CompileOptions::default()
    };
    let program = compile(&wrap_scene_patch(), &regs, &opts).program.unwrap();
    assert!(!program.probes.is_empty());
    assert!(program
        .schedule
        .iter()
        .any(|s| matches!(s, cadence_core::Step::DebugProbe { .. })));

    // Same patch, same ValueRef shape; no probes without the option.
    let bare = compile(&wrap_scene_patch(), &regs, &CompileOptions::default())
        .program
        .unwrap();
    assert!(bare.probes.is_empty());
}
