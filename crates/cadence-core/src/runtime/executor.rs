// SPDX-License-Identifier: Apache-2.0
//! The schedule executor.
//!
//! Runs one frame: resolve time, dispatch every [`Step`] in order, assemble
//! the render frame. The executor owns the three buffers (§ runtime stores)
//! and the per-frame signal cache; the program is borrowed immutably and
//! may be swapped between frames via [`ScheduleExecutor::install_program`].
//!
//! Failure policy: a step never aborts the frame. Out-of-range ids, missing
//! constants, and malformed values all collapse to the type's default.

use rustc_hash::FxHashMap;

use cadence_scene_port::RenderFrameIR;

use crate::combine::reduce_values;
use crate::ident::{FieldExprId, SigExprId, StateKey, ValueSlot};
use crate::ir::{CompiledProgramIR, ProbeMode, ProbeTarget, SigExprIR, StateOp, Step};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

use super::kernels::{apply_binary, apply_indexed, apply_unary};
use super::probe::TraceController;
use super::stores::{EventPayload, EventStore, StateStore, ValueStore};
use super::time::{resolve_time, PlayMode, TimeResolution, TimeState};
use super::FieldBuffer;

/// Per-frame input from the host's frame driver.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Absolute frame time in ms.
    pub t_abs_ms: f64,
    /// Playback or scrub.
    pub mode: PlayMode,
}

/// What one frame produced.
#[derive(Debug)]
pub struct FrameOutput {
    /// The assembled render frame (empty when the program draws nothing).
    pub render: RenderFrameIR,
    /// The frame's resolved time.
    pub time: TimeResolution,
}

/// Frame-scoped evaluation context over the program tables.
pub(crate) struct EvalCtx<'a> {
    pub(crate) program: &'a CompiledProgramIR,
    pub(crate) cache: &'a mut Vec<Option<Value>>,
    pub(crate) events: &'a EventStore,
    pub(crate) state: &'a mut StateStore,
    pub(crate) time: &'a TimeResolution,
    pub(crate) dt_ms: f64,
    pub(crate) fields: &'a mut FxHashMap<(u32, u32), FieldBuffer>,
}

impl EvalCtx<'_> {
    fn const_value(&self, id: crate::ident::ConstId) -> Value {
        self.program
            .const_value(id)
            .copied()
            .unwrap_or(Value::Float(0.0))
    }

    /// Evaluates a signal expression with per-frame memoization.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn eval_sig(&mut self, id: SigExprId) -> Value {
        if let Some(Some(v)) = self.cache.get(id.index()) {
            return *v;
        }
        let program = self.program;
        let Some(expr) = program.sig_exprs.get(id.index()) else {
            return Value::Float(0.0);
        };
        let v = match expr {
            SigExprIR::Const(c) => self.const_value(*c),
            SigExprIR::TimeAbsMs => Value::Float(self.time.abs_ms as f32),
            SigExprIR::TimeModelMs => Value::Float(self.time.model_ms as f32),
            SigExprIR::Phase01 => Value::Float(self.time.phase01),
            SigExprIR::Event(slot) => Value::Bool(self.events.check(*slot)),
            SigExprIR::Map { src, op } => {
                let v = self.eval_sig(*src);
                apply_unary(*op, &v)
            }
            SigExprIR::Zip { a, b, op } => {
                let av = self.eval_sig(*a);
                let bv = self.eval_sig(*b);
                apply_binary(*op, &av, &bv)
            }
            SigExprIR::Select { cond, a, b } => {
                if self.eval_sig(*cond).as_bool() {
                    self.eval_sig(*a)
                } else {
                    self.eval_sig(*b)
                }
            }
            SigExprIR::BusCombine { terms, op } => {
                let vals: Vec<Value> = terms.iter().map(|t| self.eval_sig(*t)).collect();
                reduce_values(*op, &vals).unwrap_or(Value::Float(0.0))
            }
            SigExprIR::State {
                key,
                op,
                input,
                param,
                init,
            } => self.eval_state(id, *key, *op, *input, *param, *init),
            SigExprIR::Alias(src) => self.eval_sig(*src),
            SigExprIR::Placeholder => Value::Float(0.0),
        };
        if let Some(slot) = self.cache.get_mut(id.index()) {
            *slot = Some(v);
        }
        v
    }

    /// Stateful node evaluation.
    ///
    /// The cell's previous value is cached *before* the input evaluates, so
    /// a state-broken cycle re-entering this node reads last frame's value
    /// instead of recursing.
    fn eval_state(
        &mut self,
        id: SigExprId,
        key: StateKey,
        op: StateOp,
        input: SigExprId,
        param: crate::ident::ConstId,
        init: crate::ident::ConstId,
    ) -> Value {
        let init_v = self.const_value(init);
        let cell = self.state.get(key).unwrap_or(match op {
            StateOp::PulseDivide => Value::Vec2([0.0, 0.0]),
            _ => init_v,
        });
        let reentrant = match op {
            StateOp::PulseDivide => Value::Bool(false),
            _ => cell,
        };
        if let Some(slot) = self.cache.get_mut(id.index()) {
            *slot = Some(reentrant);
        }
        let input_v = self.eval_sig(input);
        let param_v = self.const_value(param).as_f32();
        let dt_s = (self.dt_ms / 1000.0) as f32;

        let (store, out) = match op {
            StateOp::Integrate => {
                let next = cell.as_f32() + input_v.as_f32() * dt_s * param_v;
                (Value::Float(next), Value::Float(next))
            }
            StateOp::DelayMs => (input_v, cell),
            StateOp::Slew => {
                let limit = (param_v * dt_s).abs();
                let delta = (input_v.as_f32() - cell.as_f32()).clamp(-limit, limit);
                let next = cell.as_f32() + delta;
                (Value::Float(next), Value::Float(next))
            }
            StateOp::PulseDivide => {
                let (count, prev_level) = match cell {
                    Value::Vec2([c, l]) => (c, l),
                    _ => (0.0, 0.0),
                };
                let level = input_v.as_f32();
                let rising = level > 0.5 && prev_level <= 0.5;
                let count = if rising { count + 1.0 } else { count };
                let divide = param_v.max(1.0);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let fire = rising && (count as u64) % (divide as u64) == 0;
                (Value::Vec2([count, level]), Value::Bool(fire))
            }
        };
        self.state.set(key, store);
        out
    }

    fn field_ty(&self, id: FieldExprId) -> TypeDesc {
        self.program
            .field_types
            .get(id.index())
            .copied()
            .unwrap_or(TypeDesc::field(Domain::Float))
    }

    /// Materializes a field buffer at a fixed element count, with per-frame
    /// memoization keyed by `(field, count)`.
    pub(crate) fn eval_field(&mut self, id: FieldExprId, count: u32) -> FieldBuffer {
        if let Some(buf) = self.fields.get(&(id.0, count)) {
            return buf.clone();
        }
        let ty = self.field_ty(id);
        let program = self.program;
        let n = count as usize;
        let values: Vec<Value> = match program.field_exprs.get(id.index()) {
            None => vec![Value::default_for(&ty); n],
            Some(expr) => match expr {
                crate::ir::FieldExprIR::Const(c) => vec![self.const_value(*c); n],
                crate::ir::FieldExprIR::BroadcastSig(s) => {
                    let v = self.eval_sig(*s);
                    vec![v; n]
                }
                crate::ir::FieldExprIR::Map { src, op } => {
                    let src = self.eval_field(*src, count);
                    src.values.iter().map(|v| apply_unary(*op, v)).collect()
                }
                crate::ir::FieldExprIR::Zip { a, b, op } => {
                    let a = self.eval_field(*a, count);
                    let b = self.eval_field(*b, count);
                    a.values
                        .iter()
                        .zip(&b.values)
                        .map(|(x, y)| apply_binary(*op, x, y))
                        .collect()
                }
                crate::ir::FieldExprIR::ZipSig { field, sig, op } => {
                    let f = self.eval_field(*field, count);
                    let s = self.eval_sig(*sig);
                    f.values
                        .iter()
                        .map(|v| apply_binary(*op, v, &s))
                        .collect()
                }
                crate::ir::FieldExprIR::MapIndexed { op, a, b } => {
                    let av = self.eval_sig(*a).as_f32();
                    let bv = self.eval_sig(*b).as_f32();
                    (0..count)
                        .map(|i| apply_indexed(*op, ty.domain, program.seed, av, bv, i, count))
                        .collect()
                }
                crate::ir::FieldExprIR::Select { cond, a, b } => {
                    let pick = self.eval_sig(*cond).as_bool();
                    let chosen = if pick { *a } else { *b };
                    self.eval_field(chosen, count).values
                }
                crate::ir::FieldExprIR::Transform { src, scale, offset } => {
                    let buf = self.eval_field(*src, count);
                    let s = self.eval_sig(*scale);
                    let o = self.eval_sig(*offset);
                    buf.values
                        .iter()
                        .map(|v| {
                            let scaled = apply_binary(crate::ir::BinaryOp::Mul, v, &s);
                            apply_binary(crate::ir::BinaryOp::Add, &scaled, &o)
                        })
                        .collect()
                }
                crate::ir::FieldExprIR::BusCombine { terms, op } => {
                    let bufs: Vec<FieldBuffer> =
                        terms.iter().map(|t| self.eval_field(*t, count)).collect();
                    (0..n)
                        .map(|i| {
                            let column: Vec<Value> = bufs
                                .iter()
                                .filter_map(|b| b.values.get(i).copied())
                                .collect();
                            reduce_values(*op, &column).unwrap_or(Value::default_for(&ty))
                        })
                        .collect()
                }
            },
        };
        let buf = FieldBuffer { ty, values };
        self.fields.insert((id.0, count), buf.clone());
        buf
    }
}

/// The scheduled per-frame evaluator.
///
/// State persists across frames and program swaps; the value store, event
/// store, signal cache, and field results are frame-scoped.
#[derive(Debug, Default)]
pub struct ScheduleExecutor {
    state: StateStore,
    time: TimeState,
    trace: TraceController,
    values: ValueStore,
    events: EventStore,
    sig_cache: Vec<Option<Value>>,
    frame_index: u64,
}

impl ScheduleExecutor {
    /// Creates an executor with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares for a (possibly new) program: prunes state cells the
    /// program no longer addresses and sizes the trace rings. Call between
    /// frames; mid-frame swaps are undefined.
    pub fn install_program(&mut self, program: &CompiledProgramIR) {
        let keys = program.state_keys().collect();
        self.state.retain_keys(&keys);
        self.trace.ensure_rings(program.probes.len());
        crate::telemetry::program_installed(program.seed, self.state.len());
    }

    /// The persistent state buffer (for hosts that checkpoint it).
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// The trace controller.
    pub fn trace_mut(&mut self) -> &mut TraceController {
        &mut self.trace
    }

    /// Reads a slot's value as of the last executed frame.
    #[must_use]
    pub fn slot_value(&self, slot: ValueSlot) -> Value {
        self.values.get(slot)
    }

    /// Executes one frame of the program's schedule.
    #[allow(clippy::cast_precision_loss)]
    pub fn run_frame(&mut self, program: &CompiledProgramIR, input: FrameInput) -> FrameOutput {
        self.values.reset(program);
        self.events.reset(program.event_slot_count);
        self.trace.ensure_rings(program.probes.len());
        self.sig_cache.clear();
        self.sig_cache.resize(program.sig_exprs.len(), None);
        let mut fields: FxHashMap<(u32, u32), FieldBuffer> = FxHashMap::default();

        let resolution = resolve_time(&program.time_model, input.t_abs_ms, input.mode, &self.time);
        let dt_ms = if resolution.is_scrub {
            0.0
        } else {
            resolution.delta_ms.max(0.0)
        };

        let mut render = RenderFrameIR {
            frame_index: self.frame_index,
            t_abs_ms: resolution.abs_ms,
            passes: Vec::new(),
        };

        for step in &program.schedule {
            match step {
                Step::TimeDerive => {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        self.values.set(
                            program.time_slots.abs_ms,
                            Value::Float(resolution.abs_ms as f32),
                        );
                        self.values.set(
                            program.time_slots.model_ms,
                            Value::Float(resolution.model_ms as f32),
                        );
                        self.values
                            .set(program.time_slots.phase01, Value::Float(resolution.phase01));
                    }
                    if let Some(wrap) = resolution.wrap {
                        let mut payload = EventPayload::new();
                        payload.insert("phase".to_owned(), Value::Float(wrap.phase));
                        payload.insert(
                            "count".to_owned(),
                            Value::Int(i64::try_from(wrap.count).unwrap_or(i64::MAX)),
                        );
                        #[allow(clippy::cast_possible_truncation)]
                        payload.insert(
                            "deltaMs".to_owned(),
                            Value::Float(wrap.delta_ms as f32),
                        );
                        self.events.trigger(program.time_slots.wrap, payload);
                    }
                }
                Step::NodeEval { expr, slot } | Step::BusEval { expr, slot, .. } => {
                    let mut ctx = EvalCtx {
                        program,
                        cache: &mut self.sig_cache,
                        events: &self.events,
                        state: &mut self.state,
                        time: &resolution,
                        dt_ms,
                        fields: &mut fields,
                    };
                    let v = ctx.eval_sig(*expr);
                    self.values.set(*slot, v);
                }
                Step::Materialize { field, count } => {
                    let mut ctx = EvalCtx {
                        program,
                        cache: &mut self.sig_cache,
                        events: &self.events,
                        state: &mut self.state,
                        time: &resolution,
                        dt_ms,
                        fields: &mut fields,
                    };
                    let _ = ctx.eval_field(*field, *count);
                }
                Step::RenderAssemble => {
                    let mut ctx = EvalCtx {
                        program,
                        cache: &mut self.sig_cache,
                        events: &self.events,
                        state: &mut self.state,
                        time: &resolution,
                        dt_ms,
                        fields: &mut fields,
                    };
                    render = super::render::assemble(
                        program,
                        self.frame_index,
                        resolution.abs_ms,
                        &mut ctx,
                    );
                }
                Step::DebugProbe { probe } => {
                    self.run_probe(program, *probe as usize, &fields);
                }
            }
        }

        self.time.advance(&resolution);
        crate::telemetry::frame_done(self.frame_index, render.passes.len(), resolution.is_scrub);
        self.frame_index += 1;
        FrameOutput {
            render,
            time: resolution,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn run_probe(
        &mut self,
        program: &CompiledProgramIR,
        probe_idx: usize,
        fields: &FxHashMap<(u32, u32), FieldBuffer>,
    ) {
        if !self.trace.capturing() {
            return;
        }
        let Some(probe) = program.probes.get(probe_idx) else {
            return;
        };
        let mut lanes = Vec::with_capacity(4);
        match probe.target {
            ProbeTarget::Slot(slot) => {
                self.values.get(slot).write_lanes(&mut lanes);
                let keep = match probe.mode {
                    ProbeMode::Scalar => 1,
                    ProbeMode::Vec2 => 2,
                    ProbeMode::Color | ProbeMode::FieldStats => 4,
                };
                lanes.resize(keep, 0.0);
            }
            ProbeTarget::Field(field) => {
                // min / mean / max over the first lane of any materialized
                // count of this field.
                let Some(buf) = fields
                    .iter()
                    .find(|((id, _), _)| *id == field.0)
                    .map(|(_, b)| b)
                else {
                    return;
                };
                let mut min = f32::INFINITY;
                let mut max = f32::NEG_INFINITY;
                let mut sum = 0.0f32;
                for v in &buf.values {
                    let x = v.as_f32();
                    min = min.min(x);
                    max = max.max(x);
                    sum += x;
                }
                let n = buf.values.len().max(1) as f32;
                lanes.extend_from_slice(&[min, sum / n, max]);
            }
        }
        self.trace
            .record(probe_idx, probe.mode, self.frame_index, &lanes);
    }
}
