// SPDX-License-Identifier: Apache-2.0
//! The combine kernel shared by buses and input slots.
//!
//! Buses and multi-writer input slots differ only in where their
//! configuration lives (the `Bus` record vs the slot's `CombinePolicy`);
//! both funnel through [`combine_refs`] at compile time and
//! [`reduce_values`] at eval time.
//!
//! # Algebraic Categories
//!
//! **Commutative** (permutation-invariant): `Sum`, `Average`, `Max`, `Min` —
//! the result is identical regardless of writer order.
//!
//! **Order-dependent** (deterministic via canonical `(kind, sort_key, id)`
//! writer order): `First`, `Last`, `Layer` — NOT commutative; the caller
//! sorts terms canonically before the node is built.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::builder::{ExprRef, IrBuilder, IrTypeError, ValueRef};
use crate::ir::CombineOp;
use crate::patch::{CombineMode, CombineWhen};
use crate::types::{Domain, TypeDesc, World};
use crate::value::Value;

/// Builder signature for registered custom reducers.
///
/// Receives the canonically ordered term refs and returns one composite
/// expression; custom modes never get a dedicated IR node.
pub type CombineBuildFn =
    fn(&mut IrBuilder, &[ValueRef], TypeDesc) -> Result<ValueRef, IrTypeError>;

/// Process-wide immutable registry of custom combine reducers.
#[derive(Debug, Default)]
pub struct CombineRegistry {
    entries: BTreeMap<&'static str, CombineBuildFn>,
}

impl CombineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard registry: no built-in custom modes.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
    }

    /// Registers a reducer builder under `id`. Last registration wins;
    /// registration happens before the first compile.
    pub fn register(&mut self, id: &'static str, build: CombineBuildFn) {
        self.entries.insert(id, build);
    }

    /// Looks up a reducer builder.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&CombineBuildFn> {
        self.entries.get(id)
    }
}

/// Errors raised while lowering a combine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombineError {
    /// `error`-policy slot saw two or more writers.
    #[error("multiple writers forbidden by slot policy")]
    Forbidden,
    /// A custom reducer id is not registered.
    #[error("unknown custom combine mode: {0}")]
    UnknownCustom(String),
    /// The IR builder rejected an emitted node.
    #[error(transparent)]
    Type(#[from] IrTypeError),
}

fn mode_op(mode: &CombineMode) -> Option<CombineOp> {
    match mode {
        CombineMode::Sum => Some(CombineOp::Sum),
        CombineMode::Average => Some(CombineOp::Average),
        CombineMode::Max => Some(CombineOp::Max),
        CombineMode::Min => Some(CombineOp::Min),
        CombineMode::First => Some(CombineOp::First),
        CombineMode::Last => Some(CombineOp::Last),
        CombineMode::Layer => Some(CombineOp::Layer),
        CombineMode::Error | CombineMode::Custom(_) => None,
    }
}

/// Materializes the default constant for an unwritten bus or slot.
fn default_ref(builder: &mut IrBuilder, out_ty: TypeDesc) -> ValueRef {
    let v = Value::default_for(&out_ty);
    match out_ty.world {
        World::Field => {
            let id = builder.field_const(v, out_ty);
            ValueRef::field(id, out_ty)
        }
        _ => {
            let id = builder.sig_const(v, out_ty);
            ValueRef::sig(id, out_ty)
        }
    }
}

/// Coerces one term into the combine's world (signal → field broadcast).
fn coerce_term(
    builder: &mut IrBuilder,
    term: &ValueRef,
    out_ty: TypeDesc,
) -> Result<ValueRef, IrTypeError> {
    match (out_ty.world, term.expr) {
        (World::Field, ExprRef::Sig(sig)) => {
            let id = builder.field_broadcast(sig)?;
            Ok(ValueRef::field(id, TypeDesc::field(term.ty.domain)))
        }
        _ => Ok(*term),
    }
}

/// Lowers N canonically ordered writer refs into a single ref.
///
/// - `N = 0`: materializes the out-type's default constant.
/// - `N = 1` with an order-picking mode (or a `when: multi` slot policy):
///   identity — the single ref flows through unchanged.
/// - otherwise: emits a `busCombine` node in the appropriate world.
///
/// `Error`-mode slots with N ≥ 2 and unknown custom ids surface as
/// [`CombineError`]s; the caller converts them into diagnostics.
pub fn combine_refs(
    builder: &mut IrBuilder,
    refs: &[ValueRef],
    mode: &CombineMode,
    when: CombineWhen,
    out_ty: TypeDesc,
    registry: &CombineRegistry,
) -> Result<ValueRef, CombineError> {
    if refs.is_empty() {
        return Ok(default_ref(builder, out_ty));
    }
    if *mode == CombineMode::Error {
        if refs.len() >= 2 {
            return Err(CombineError::Forbidden);
        }
        return Ok(coerce_term(builder, &refs[0], out_ty)?);
    }
    if let CombineMode::Custom(id) = mode {
        let build = registry
            .lookup(id)
            .ok_or_else(|| CombineError::UnknownCustom((*id).to_owned()))?;
        return Ok(build(builder, refs, out_ty)?);
    }
    let order_picking = matches!(
        mode,
        CombineMode::First | CombineMode::Last | CombineMode::Layer
    );
    if refs.len() == 1 && (when == CombineWhen::Multi || order_picking) {
        return Ok(coerce_term(builder, &refs[0], out_ty)?);
    }
    let op = mode_op(mode).unwrap_or(CombineOp::Last);
    match out_ty.world {
        World::Field => {
            let mut terms = Vec::with_capacity(refs.len());
            for r in refs {
                let coerced = coerce_term(builder, r, out_ty)?;
                match coerced.expr {
                    ExprRef::Field(id) => terms.push(id),
                    ExprRef::Sig(_) => return Err(IrTypeError::WorldMismatch {
                        expected: World::Field,
                        actual: World::Signal,
                    }
                    .into()),
                }
            }
            let id = builder.field_bus_combine(terms, op, out_ty)?;
            Ok(ValueRef::field(id, out_ty))
        }
        _ => {
            let mut terms = Vec::with_capacity(refs.len());
            for r in refs {
                match r.expr {
                    ExprRef::Sig(id) => terms.push(id),
                    ExprRef::Field(_) => return Err(IrTypeError::WorldMismatch {
                        expected: World::Signal,
                        actual: World::Field,
                    }
                    .into()),
                }
            }
            let id = builder.sig_bus_combine(terms, op, out_ty)?;
            Ok(ValueRef::sig(id, out_ty))
        }
    }
}

/// Alpha-over compositing of `top` over `bottom` (premultiplied-free,
/// straight alpha).
fn color_over(bottom: [f32; 4], top: [f32; 4]) -> [f32; 4] {
    let ta = top[3].clamp(0.0, 1.0);
    let ba = bottom[3].clamp(0.0, 1.0);
    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        return [0.0; 4];
    }
    let mut out = [0.0f32; 4];
    for i in 0..3 {
        out[i] = (top[i] * ta + bottom[i] * ba * (1.0 - ta)) / out_a;
    }
    out[3] = out_a;
    out
}

/// Eval-time reduction over canonically ordered values.
///
/// Returns `None` for empty input; the compile-time kernel guarantees the
/// executor never sees that case.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reduce_values(op: CombineOp, values: &[Value]) -> Option<Value> {
    let (first, rest) = values.split_first()?;
    match op {
        CombineOp::First => Some(*first),
        CombineOp::Last => values.last().copied(),
        CombineOp::Sum => Some(
            rest.iter()
                .fold(*first, |acc, v| acc.zip_lanes(v, |a, b| a + b)),
        ),
        CombineOp::Average => {
            let sum = rest
                .iter()
                .fold(*first, |acc, v| acc.zip_lanes(v, |a, b| a + b));
            let n = values.len() as f32;
            Some(sum.map_lanes(|lane| lane / n))
        }
        CombineOp::Max => Some(
            rest.iter()
                .fold(*first, |acc, v| acc.zip_lanes(v, f32::max)),
        ),
        CombineOp::Min => Some(
            rest.iter()
                .fold(*first, |acc, v| acc.zip_lanes(v, f32::min)),
        ),
        CombineOp::Layer => {
            if let Value::Color(_) = first {
                let mut acc = *first;
                for v in rest {
                    if let (Value::Color(b), Value::Color(t)) = (acc, v) {
                        acc = Value::Color(color_over(b, *t));
                    }
                }
                Some(acc)
            } else {
                values.last().copied()
            }
        }
    }
}

/// Whether a domain gets alpha-over stacking under `Layer`.
#[must_use]
pub fn layer_is_compositing(domain: Domain) -> bool {
    domain.canonical() == Domain::Color
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::patch::CombinePolicy;
    use crate::types::Domain;

    fn sig_refs(builder: &mut IrBuilder, values: &[f32]) -> Vec<ValueRef> {
        let ty = TypeDesc::signal(Domain::Float);
        values
            .iter()
            .map(|v| ValueRef::sig(builder.sig_const(Value::Float(*v), ty), ty))
            .collect()
    }

    #[test]
    fn zero_writers_materialize_the_default() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let reg = CombineRegistry::standard();
        let r = combine_refs(&mut b, &[], &CombineMode::Sum, CombineWhen::Multi, ty, &reg)
            .unwrap();
        let sig = r.as_sig().unwrap();
        assert!(matches!(
            b.sig_type(sig).map(|t| t.domain),
            Some(Domain::Float)
        ));
    }

    #[test]
    fn single_writer_multi_policy_is_identity() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let reg = CombineRegistry::standard();
        let refs = sig_refs(&mut b, &[4.0]);
        let r = combine_refs(&mut b, &refs, &CombineMode::Sum, CombineWhen::Multi, ty, &reg)
            .unwrap();
        assert_eq!(r, refs[0]);
    }

    #[test]
    fn error_mode_rejects_two_writers() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let reg = CombineRegistry::standard();
        let refs = sig_refs(&mut b, &[1.0, 2.0]);
        let err = combine_refs(
            &mut b,
            &refs,
            &CombineMode::Error,
            CombineWhen::Multi,
            ty,
            &reg,
        )
        .unwrap_err();
        assert_eq!(err, CombineError::Forbidden);
    }

    #[test]
    fn unknown_custom_is_an_error() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let reg = CombineRegistry::standard();
        let refs = sig_refs(&mut b, &[1.0]);
        let err = combine_refs(
            &mut b,
            &refs,
            &CombineMode::Custom("median"),
            CombineWhen::Multi,
            ty,
            &reg,
        )
        .unwrap_err();
        assert_eq!(err, CombineError::UnknownCustom("median".to_owned()));
    }

    #[test]
    fn default_slot_policy_picks_the_last_writer() {
        let p = CombinePolicy::default();
        assert_eq!(p.mode, CombineMode::Last);
    }

    #[test]
    fn reduce_sum_and_average() {
        let vals = [Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)];
        assert_eq!(reduce_values(CombineOp::Sum, &vals), Some(Value::Float(6.0)));
        assert_eq!(
            reduce_values(CombineOp::Average, &vals),
            Some(Value::Float(2.0))
        );
    }

    #[test]
    fn reduce_sum_is_permutation_invariant() {
        let a = [Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)];
        let b = [Value::Float(3.0), Value::Float(1.0), Value::Float(2.0)];
        assert_eq!(
            reduce_values(CombineOp::Sum, &a),
            reduce_values(CombineOp::Sum, &b)
        );
    }

    #[test]
    fn reduce_first_and_last_depend_on_order() {
        let vals = [Value::Float(1.0), Value::Float(2.0)];
        assert_eq!(
            reduce_values(CombineOp::First, &vals),
            Some(Value::Float(1.0))
        );
        assert_eq!(
            reduce_values(CombineOp::Last, &vals),
            Some(Value::Float(2.0))
        );
    }

    #[test]
    fn layer_composites_colors_over() {
        let bottom = Value::Color([1.0, 0.0, 0.0, 1.0]);
        let top = Value::Color([0.0, 0.0, 1.0, 0.5]);
        let out = reduce_values(CombineOp::Layer, &[bottom, top]).unwrap();
        if let Value::Color(c) = out {
            assert!((c[0] - 0.5).abs() < 1.0e-6);
            assert!((c[2] - 0.5).abs() < 1.0e-6);
            assert!((c[3] - 1.0).abs() < 1.0e-6);
        } else {
            unreachable!("layer over colors yields a color");
        }
    }

    #[test]
    fn layer_falls_back_to_last_for_non_colors() {
        let vals = [Value::Float(1.0), Value::Float(2.0)];
        assert_eq!(
            reduce_values(CombineOp::Layer, &vals),
            Some(Value::Float(2.0))
        );
        assert!(!layer_is_compositing(Domain::Float));
        assert!(layer_is_compositing(Domain::Color));
    }

    #[test]
    fn reduce_max_per_lane() {
        let vals = [
            Value::Vec2([1.0, 5.0]),
            Value::Vec2([3.0, 2.0]),
        ];
        assert_eq!(
            reduce_values(CombineOp::Max, &vals),
            Some(Value::Vec2([3.0, 5.0]))
        );
    }
}
