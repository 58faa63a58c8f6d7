// SPDX-License-Identifier: Apache-2.0
//! Scheduled-runtime behavior: cyclic wraps, scrub suppression, multi-writer
//! combine, stateful operators, and the per-frame cache contract.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use cadence_core::{
    Block, Edge, Endpoint, FrameInput, Patch, PlayMode, ScheduleExecutor, Step, Value, ValueSlot,
};
use cadence_scene_port::RenderPass;
use common::{compile_ok, const_float, cycle_root, sum_inputs_patch, wrap_scene_patch};

fn frame(t: f64, mode: PlayMode) -> FrameInput {
    FrameInput { t_abs_ms: t, mode }
}

fn bus_slot(program: &cadence_core::CompiledProgramIR, name: &str) -> ValueSlot {
    program
        .schedule
        .iter()
        .find_map(|s| match s {
            Step::BusEval { slot, bus, .. } if bus == name => Some(*slot),
            _ => None,
        })
        .unwrap()
}

// ─── SCENARIO A: cyclic wrap ────────────────────────────────────────

#[test]
fn cyclic_wrap_fires_exactly_once_at_the_boundary() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    let f1 = exec.run_frame(&program, frame(900.0, PlayMode::Playback));
    assert!((f1.time.phase01 - 0.9).abs() < 1.0e-6);
    assert!(f1.time.wrap.is_none());

    let f2 = exec.run_frame(&program, frame(1100.0, PlayMode::Playback));
    assert!((f2.time.phase01 - 0.1).abs() < 1.0e-6);
    let wrap = f2.time.wrap.unwrap();
    assert!((wrap.phase - 0.1).abs() < 1.0e-6);
    assert_eq!(wrap.count, 1);
    assert!((wrap.delta_ms - 200.0).abs() < 1.0e-9);

    let f3 = exec.run_frame(&program, frame(1200.0, PlayMode::Playback));
    assert!((f3.time.phase01 - 0.2).abs() < 1.0e-6);
    assert!(f3.time.wrap.is_none());
}

#[test]
fn wrap_event_reaches_the_pulse_bus_for_one_frame_only() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    let pulse = bus_slot(&program, "pulse");
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    exec.run_frame(&program, frame(900.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(pulse), Value::Bool(false));

    exec.run_frame(&program, frame(1100.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(pulse), Value::Bool(true));

    exec.run_frame(&program, frame(1200.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(pulse), Value::Bool(false));
}

#[test]
fn render_frame_carries_the_oscillator_radius() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    let out = exec.run_frame(&program, frame(900.0, PlayMode::Playback));
    assert_eq!(out.render.passes.len(), 1);
    let RenderPass::Instances2D(pass) = &out.render.passes[0] else {
        panic!("expected an instanced pass");
    };
    assert_eq!(pass.instance_count, 1);
    assert_eq!(pass.pos.data.len(), 2);
    assert_eq!(pass.radius.data.len(), 1);
    assert_eq!(pass.color.data.len(), 4);

    let osc = exec.slot_value(program.outputs["osc.out"]).as_f32();
    assert!((pass.radius.data[0] - osc).abs() < 1.0e-6);
}

// ─── SCENARIO C: multi-input combine ────────────────────────────────

#[test]
fn three_writers_sum_into_one_input() {
    let (program, _) = compile_ok(&sum_inputs_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);
    for t in [0.0, 16.0, 32.0] {
        exec.run_frame(&program, frame(t, PlayMode::Playback));
        assert_eq!(
            exec.slot_value(program.outputs["mix.out"]),
            Value::Float(6.0)
        );
    }
}

// ─── SCENARIO D: empty bus ──────────────────────────────────────────

#[test]
fn listener_on_an_empty_bus_reads_zero() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("mix", "Mixer"))
        .with_bus(common::float_bus(
            "energy",
            cadence_core::BusCombineMode::Sum,
        ))
        .with_edge(Edge::new(
            "listen",
            Endpoint::bus("energy"),
            Endpoint::port("mix", "in"),
        ));
    let (program, _) = compile_ok(&patch);
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);
    exec.run_frame(&program, frame(100.0, PlayMode::Playback));
    assert_eq!(
        exec.slot_value(program.outputs["mix.out"]),
        Value::Float(0.0)
    );
}

// ─── SCENARIO E: scrub suppression ──────────────────────────────────

#[test]
fn scrubbing_across_the_boundary_fires_no_wrap() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    let f1 = exec.run_frame(&program, frame(1200.0, PlayMode::Scrub));
    assert!((f1.time.phase01 - 0.2).abs() < 1.0e-6);
    assert!(f1.time.wrap.is_none());

    let f2 = exec.run_frame(&program, frame(100.0, PlayMode::Scrub));
    assert!((f2.time.phase01 - 0.1).abs() < 1.0e-6);
    assert!(f2.time.wrap.is_none());
    assert!(f2.time.is_scrub);
}

// ─── STATEFUL OPERATORS & FRAME CACHE (properties 7, 8) ─────────────

fn integrator_patch() -> Patch {
    Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("rate", 10.0))
        .with_block(Block::new("integ", "Integrator"))
        .with_block(Block::new("a", "Scale"))
        .with_block(Block::new("b", "Scale"))
        .with_edge(Edge::new(
            "r",
            Endpoint::port("rate", "out"),
            Endpoint::port("integ", "rate"),
        ))
        .with_edge(Edge::new(
            "fa",
            Endpoint::port("integ", "out"),
            Endpoint::port("a", "in"),
        ))
        .with_edge(Edge::new(
            "fb",
            Endpoint::port("integ", "out"),
            Endpoint::port("b", "in"),
        ))
}

#[test]
fn shared_state_expression_updates_exactly_once_per_frame() {
    let (program, _) = compile_ok(&integrator_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    exec.run_frame(&program, frame(0.0, PlayMode::Playback));
    exec.run_frame(&program, frame(100.0, PlayMode::Playback));

    // rate 10 · 0.1 s = 1.0; a double update would read 2.0.
    assert_eq!(
        exec.slot_value(program.outputs["integ.out"]),
        Value::Float(1.0)
    );
    assert_eq!(exec.slot_value(program.outputs["a.out"]), Value::Float(1.0));
    assert_eq!(exec.slot_value(program.outputs["b.out"]), Value::Float(1.0));
}

#[test]
fn scrubbed_frames_never_integrate_phantom_time() {
    let (program, _) = compile_ok(&integrator_patch());
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    exec.run_frame(&program, frame(0.0, PlayMode::Playback));
    exec.run_frame(&program, frame(5000.0, PlayMode::Scrub));
    assert_eq!(
        exec.slot_value(program.outputs["integ.out"]),
        Value::Float(0.0)
    );

    // Resuming playback integrates only the new deltas.
    exec.run_frame(&program, frame(5100.0, PlayMode::Playback));
    assert_eq!(
        exec.slot_value(program.outputs["integ.out"]),
        Value::Float(1.0)
    );
}

#[test]
fn pulse_divider_fires_every_second_wrap() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("div", "PulseDivider").with_param("divide", Value::Int(2)));
    let (program, _) = compile_ok(&patch);
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);
    let out_slot = program.outputs["div.out"];

    exec.run_frame(&program, frame(900.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(out_slot), Value::Bool(false));

    // First wrap: counted, not fired.
    exec.run_frame(&program, frame(1100.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(out_slot), Value::Bool(false));

    // Level drops between wraps.
    exec.run_frame(&program, frame(1200.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(out_slot), Value::Bool(false));

    // Second wrap: fires.
    exec.run_frame(&program, frame(2100.0, PlayMode::Playback));
    assert_eq!(exec.slot_value(out_slot), Value::Bool(true));
}

#[test]
fn slew_limiter_approaches_its_target_at_the_configured_rate() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("target", 10.0))
        .with_block(Block::new("slew", "SlewLimiter").with_param("rate", Value::Float(2.0)))
        .with_edge(Edge::new(
            "t",
            Endpoint::port("target", "out"),
            Endpoint::port("slew", "target"),
        ));
    let (program, _) = compile_ok(&patch);
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    exec.run_frame(&program, frame(0.0, PlayMode::Playback));
    // 500 ms at rate 2/s moves at most 1.0 toward the target.
    exec.run_frame(&program, frame(500.0, PlayMode::Playback));
    assert_eq!(
        exec.slot_value(program.outputs["slew.out"]),
        Value::Float(1.0)
    );
}

// ─── STATE-BROKEN CYCLE ─────────────────────────────────────────────

#[test]
fn feedback_through_an_integrator_reads_the_previous_frame() {
    // gain.in ← integ.out (previous frame), integ.rate ← gain.out.
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(
            Block::new("gain", "Scale")
                .with_param("factor", Value::Float(1.0))
                .with_param("offset", Value::Float(10.0)),
        )
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
    let (program, _) = compile_ok(&patch);
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    // Frame 0 (dt 0): integ = 0, gain = 10.
    exec.run_frame(&program, frame(0.0, PlayMode::Playback));
    assert_eq!(
        exec.slot_value(program.outputs["gain.out"]),
        Value::Float(10.0)
    );

    // Frame 1 (dt 100 ms): integ += gain(prev-cycle value) · 0.1 = 1.0.
    exec.run_frame(&program, frame(100.0, PlayMode::Playback));
    assert_eq!(
        exec.slot_value(program.outputs["integ.out"]),
        Value::Float(1.0)
    );
    assert_eq!(
        exec.slot_value(program.outputs["gain.out"]),
        Value::Float(11.0)
    );
}
