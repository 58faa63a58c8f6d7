// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code, clippy::panic, clippy::unwrap_used)]

use cadence_core::{
    Block, Bus, BusCombineMode, CompileOptions, CompiledProgramIR, Diagnostic, Domain, Edge,
    Endpoint, Patch, Registries, Severity, TypeDesc, Value,
};

/// Tiny deterministic RNG (xorshift64*) so tests don't need `rand`.
#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new PRNG with the given seed (0 promotes to 1).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Next pseudo-random u64.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Next value in `0..bound`.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound.max(1)
    }
}

/// A const-float block with the given output value.
pub fn const_float(id: &str, value: f32) -> Block {
    Block::new(id, "ConstFloat").with_param("value", Value::Float(value))
}

/// A cyclic time root with the given period.
#[allow(clippy::cast_possible_truncation)]
pub fn cycle_root(id: &str, period_ms: f64) -> Block {
    Block::new(id, "CycleTimeRoot").with_param("period_ms", Value::Float(period_ms as f32))
}

/// A float bus with the given combine mode.
pub fn float_bus(id: &str, combine: BusCombineMode) -> Bus {
    Bus::new(id, TypeDesc::signal(Domain::Float), combine)
}

/// Scenario A patch: cyclic root, oscillator, one rendered circle whose
/// radius follows the oscillator.
pub fn wrap_scene_patch() -> Patch {
    Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(Block::new("osc", "Oscillator"))
        .with_block(
            Block::new("draw", "RenderInstances2D").with_param("count", Value::Int(1)),
        )
        .with_edge(Edge::new(
            "radius_wire",
            Endpoint::port("osc", "out"),
            Endpoint::port("draw", "radius"),
        ))
}

/// Scenario C patch: three constants summed into one multi-writer input.
pub fn sum_inputs_patch() -> Patch {
    Patch::new()
        .with_block(cycle_root("root", 1000.0))
        .with_block(const_float("c1", 1.0))
        .with_block(const_float("c2", 2.0))
        .with_block(const_float("c3", 3.0))
        .with_block(Block::new("mix", "Mixer"))
        .with_edge(Edge::new(
            "w1",
            Endpoint::port("c1", "out"),
            Endpoint::port("mix", "in"),
        ))
        .with_edge(Edge::new(
            "w2",
            Endpoint::port("c2", "out"),
            Endpoint::port("mix", "in"),
        ))
        .with_edge(Edge::new(
            "w3",
            Endpoint::port("c3", "out"),
            Endpoint::port("mix", "in"),
        ))
}

/// Compiles with the standard registries and default options, asserting no
/// fatal diagnostics.
pub fn compile_ok(patch: &Patch) -> (CompiledProgramIR, Vec<Diagnostic>) {
    let regs = Registries::standard();
    let out = cadence_core::compile(patch, &regs, &CompileOptions::default());
    let program = out
        .program
        .unwrap_or_else(|| panic!("compile failed: {:?}", out.diagnostics));
    (program, out.diagnostics)
}

/// True when no diagnostic reaches `Error` severity.
pub fn error_free(diags: &[Diagnostic]) -> bool {
    diags.iter().all(|d| d.severity < Severity::Error)
}
