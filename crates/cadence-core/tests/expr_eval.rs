// SPDX-License-Identifier: Apache-2.0
//! Evaluator semantics over hand-built programs: select branches, affine
//! field transforms, and the one-sample delay line.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::collections::BTreeMap;

use cadence_core::{
    Block, CycleMode, Domain, Edge, Endpoint, FrameInput, IndexedOp, IrBuilder, MaterialIR,
    Patch, PlayMode, RenderPassIR, ScheduleExecutor, SlotOwner, Step, TimeModelIR, TypeDesc,
    Value, IR_VERSION,
};
use cadence_scene_port::RenderPass;
use common::{compile_ok, const_float, cycle_root};

fn frame(t: f64) -> FrameInput {
    FrameInput {
        t_abs_ms: t,
        mode: PlayMode::Playback,
    }
}

#[test]
fn select_follows_the_condition() {
    let float = TypeDesc::signal(Domain::Float);
    let mut b = IrBuilder::new(0);
    b.set_time_model(TimeModelIR::Cyclic {
        period_ms: 1000.0,
        mode: CycleMode::Loop,
    });
    let cond = b.sig_const(Value::Bool(true), TypeDesc::signal(Domain::Bool));
    let x = b.sig_const(Value::Float(1.0), float);
    let y = b.sig_const(Value::Float(2.0), float);
    let sel = b.sig_select(cond, x, y).unwrap();
    let slot = b.alloc_slot(float, SlotOwner::Sig(sel));
    let schedule = vec![Step::TimeDerive, Step::NodeEval { expr: sel, slot }];
    let program = b.finish(IR_VERSION.to_owned(), 0, schedule, BTreeMap::new());
    assert!(program.validate().is_ok());

    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);
    exec.run_frame(&program, frame(0.0));
    assert_eq!(exec.slot_value(slot), Value::Float(1.0));
}

#[test]
fn field_transform_scales_then_offsets_each_element() {
    let float = TypeDesc::signal(Domain::Float);
    let mut b = IrBuilder::new(0);
    b.set_time_model(TimeModelIR::Infinite { window_ms: 1000.0 });
    let extent = b.sig_const(Value::Float(100.0), float);
    let zero = b.sig_const(Value::Float(0.0), float);
    let line = b
        .field_map_indexed(IndexedOp::Line, extent, zero, TypeDesc::field(Domain::Vec2))
        .unwrap();
    let scale = b.sig_const(Value::Float(2.0), float);
    let offset = b.sig_const(Value::Vec2([10.0, 20.0]), TypeDesc::signal(Domain::Vec2));
    let pos = b.field_transform(line, scale, offset).unwrap();
    let radius = b.field_const(Value::Float(4.0), TypeDesc::field(Domain::Float));
    let color = b.field_const(
        Value::Color([1.0, 1.0, 1.0, 1.0]),
        TypeDesc::field(Domain::Color),
    );
    let z = b.sig_const(Value::Float(0.0), float);
    b.push_render_pass(RenderPassIR::Instances2D {
        material: MaterialIR::Circle,
        count: 3,
        pos,
        radius,
        color,
        rot: None,
        scale_xy: None,
        z,
    });
    let schedule = vec![
        Step::TimeDerive,
        Step::Materialize {
            field: pos,
            count: 3,
        },
        Step::RenderAssemble,
    ];
    let program = b.finish(IR_VERSION.to_owned(), 0, schedule, BTreeMap::new());

    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);
    let out = exec.run_frame(&program, frame(0.0));
    let RenderPass::Instances2D(pass) = &out.render.passes[0] else {
        panic!("expected an instanced pass");
    };
    assert_eq!(pass.pos.data, vec![-90.0, 20.0, 10.0, 20.0, 110.0, 20.0]);
    assert_eq!(pass.rot, None);
    assert_eq!(pass.scale_xy, None);
}

#[test]
fn delay_block_lags_its_input_by_one_sample() {
    let patch = Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c", 5.0))
        .with_block(Block::new("delay", "Delay"))
        .with_edge(Edge::new(
            "w",
            Endpoint::port("c", "out"),
            Endpoint::port("delay", "in"),
        ));
    let (program, _) = compile_ok(&patch);
    let mut exec = ScheduleExecutor::new();
    exec.install_program(&program);

    exec.run_frame(&program, frame(0.0));
    assert_eq!(
        exec.slot_value(program.outputs["delay.out"]),
        Value::Float(0.0)
    );
    exec.run_frame(&program, frame(16.0));
    assert_eq!(
        exec.slot_value(program.outputs["delay.out"]),
        Value::Float(5.0)
    );
}
