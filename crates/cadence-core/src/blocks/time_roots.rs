// SPDX-License-Identifier: Apache-2.0
//! Time root blocks.
//!
//! Exactly one time root is required per patch; it declares the program's
//! time model and (for cyclic and finite roots) auto-publishes its derived
//! signals onto the standard buses. Infinite roots publish nothing.

use crate::builder::ValueRef;
use crate::ir::{CycleMode, TimeModelIR};
use crate::patch::Block;
use crate::registry::{BlockDef, LowerCtx, LowerError, PortDef};
use crate::types::{Domain, Semantics, TypeDesc};
use crate::value::Value;

/// Cycle mode tag: phase restarts each period.
pub const CYCLE_MODE_LOOP: u32 = 0;
/// Cycle mode tag: phase reflects every other period.
pub const CYCLE_MODE_PINGPONG: u32 = 1;

const CYCLE_OUTPUTS: &[PortDef] = &[
    PortDef::new("phase", TypeDesc::signal(Domain::Phase01)),
    PortDef::new("wrap", TypeDesc::event(Domain::Trigger)),
];

const FINITE_OUTPUTS: &[PortDef] = &[PortDef::new(
    "progress",
    TypeDesc::signal(Domain::Phase01).with_semantics(Semantics::Progress),
)];

const INFINITE_OUTPUTS: &[PortDef] = &[PortDef::new("time", TypeDesc::signal(Domain::Float))];

fn lower_cycle(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let wrap = ctx.wrap_event();
    let b = ctx.builder();
    let phase = b.sig_phase01();
    let wrap_expr = b.sig_event(wrap);
    ctx.set_output(
        "phase",
        ValueRef::sig(phase, TypeDesc::signal(Domain::Phase01)),
    );
    ctx.set_output(
        "wrap",
        ValueRef::sig(wrap_expr, TypeDesc::event(Domain::Trigger)),
    );
    Ok(())
}

fn lower_finite(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let b = ctx.builder();
    let progress = b.sig_phase01();
    ctx.set_output(
        "progress",
        ValueRef::sig(
            progress,
            TypeDesc::signal(Domain::Phase01).with_semantics(Semantics::Progress),
        ),
    );
    Ok(())
}

fn lower_infinite(ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
    let b = ctx.builder();
    let t = b.sig_time_model();
    ctx.set_output("time", ValueRef::sig(t, TypeDesc::signal(Domain::Float)));
    Ok(())
}

/// `CycleTimeRoot` block definition.
pub const CYCLE_TIME_ROOT: BlockDef = BlockDef {
    type_name: "CycleTimeRoot",
    inputs: &[],
    outputs: CYCLE_OUTPUTS,
    time_root: true,
    stateful: false,
    hidden: false,
    lower: lower_cycle,
};

/// `FiniteTimeRoot` block definition.
pub const FINITE_TIME_ROOT: BlockDef = BlockDef {
    type_name: "FiniteTimeRoot",
    inputs: &[],
    outputs: FINITE_OUTPUTS,
    time_root: true,
    stateful: false,
    hidden: false,
    lower: lower_finite,
};

/// `InfiniteTimeRoot` block definition.
pub const INFINITE_TIME_ROOT: BlockDef = BlockDef {
    type_name: "InfiniteTimeRoot",
    inputs: &[],
    outputs: INFINITE_OUTPUTS,
    time_root: true,
    stateful: false,
    hidden: false,
    lower: lower_infinite,
};

/// Derives the time model from a time-root block's parameters.
///
/// Returns `None` when the block is not a time root.
#[must_use]
pub fn derive_time_model(block: &Block) -> Option<TimeModelIR> {
    fn num(block: &Block, key: &str, default: f64) -> f64 {
        match block.params.get(key) {
            Some(Value::Float(v)) => f64::from(*v),
            #[allow(clippy::cast_precision_loss)]
            Some(Value::Int(v)) => *v as f64,
            _ => default,
        }
    }
    match block.block_type.as_str() {
        "CycleTimeRoot" => {
            let period_ms = num(block, "period_ms", 1000.0).max(1.0);
            let mode = match block.params.get("mode") {
                Some(Value::Enum(m)) if *m == CYCLE_MODE_PINGPONG => CycleMode::PingPong,
                Some(Value::Int(m)) if *m == i64::from(CYCLE_MODE_PINGPONG) => CycleMode::PingPong,
                _ => CycleMode::Loop,
            };
            Some(TimeModelIR::Cyclic { period_ms, mode })
        }
        "FiniteTimeRoot" => Some(TimeModelIR::Finite {
            duration_ms: num(block, "duration_ms", 5000.0).max(1.0),
        }),
        "InfiniteTimeRoot" => Some(TimeModelIR::Infinite {
            window_ms: num(block, "window_ms", 10_000.0).max(1.0),
        }),
        _ => None,
    }
}

/// Auto-publication table: `(block type, output port, bus name)`.
///
/// Cyclic roots publish `phase` → `phaseA` and `wrap` → `pulse`; finite
/// roots publish `progress` → `progress`. Infinite roots publish nothing.
#[must_use]
pub fn auto_publications(block_type: &str) -> &'static [(&'static str, &'static str)] {
    match block_type {
        "CycleTimeRoot" => &[("phase", "phaseA"), ("wrap", "pulse")],
        "FiniteTimeRoot" => &[("progress", "progress")],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_params_derive_a_cyclic_model() {
        let block = Block::new("root", "CycleTimeRoot")
            .with_param("period_ms", Value::Float(250.0))
            .with_param("mode", Value::Enum(CYCLE_MODE_PINGPONG));
        assert_eq!(
            derive_time_model(&block),
            Some(TimeModelIR::Cyclic {
                period_ms: 250.0,
                mode: CycleMode::PingPong
            })
        );
    }

    #[test]
    fn defaults_fill_missing_params() {
        let block = Block::new("root", "CycleTimeRoot");
        assert_eq!(
            derive_time_model(&block),
            Some(TimeModelIR::Cyclic {
                period_ms: 1000.0,
                mode: CycleMode::Loop
            })
        );
    }

    #[test]
    fn non_root_blocks_derive_nothing() {
        let block = Block::new("b", "ConstFloat");
        assert_eq!(derive_time_model(&block), None);
    }

    #[test]
    fn infinite_roots_do_not_auto_publish() {
        assert!(auto_publications("InfiniteTimeRoot").is_empty());
        assert_eq!(auto_publications("CycleTimeRoot").len(), 2);
        assert_eq!(auto_publications("FiniteTimeRoot").len(), 1);
    }
}
