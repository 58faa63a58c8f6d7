// SPDX-License-Identifier: Apache-2.0
//! Mutable IR build scope.
//!
//! The [`IrBuilder`] owns every table that becomes part of the frozen
//! program: expression tables (hash-consed so recompiles of identical
//! patches produce identical ids), the constant pool, the slot allocator,
//! the time-model binding, and the render-pass and probe collections.
//! [`IrBuilder::finish`] freezes everything into a [`CompiledProgramIR`].
//!
//! Emitting a node whose input types violate the op's constraints yields an
//! [`IrTypeError`] with the specific mismatch; the pipeline converts those
//! into `LoweringFailed` diagnostics.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::const_pool::{ConstPool, SlotAllocator};
use crate::ident::{ConstId, EventSlot, FieldExprId, SigExprId, StateKey, ValueSlot};
use crate::ir::{
    BinaryOp, CombineOp, CompiledProgramIR, DebugProbeIR, FieldExprIR, IndexedOp, RenderPassIR,
    SigExprIR, SlotOwner, StateOp, Step, TimeField, TimeModelIR, TimeSlots, UnaryOp,
};
use crate::types::{Domain, TypeCategory, TypeDesc, Unit, World};
use crate::value::Value;

/// Type errors raised while emitting IR nodes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IrTypeError {
    /// A unary opcode rejected its input domain.
    #[error("op {op:?} rejects input domain {input:?}")]
    UnaryMismatch {
        /// Opcode.
        op: UnaryOp,
        /// Offending input domain.
        input: Domain,
    },
    /// A binary opcode rejected its operand domains.
    #[error("op {op:?} rejects operand domains {a:?}, {b:?}")]
    BinaryMismatch {
        /// Opcode.
        op: BinaryOp,
        /// Left operand domain.
        a: Domain,
        /// Right operand domain.
        b: Domain,
    },
    /// Select arms disagree on domain.
    #[error("select arms disagree: {a:?} vs {b:?}")]
    SelectMismatch {
        /// Domain of the true arm.
        a: Domain,
        /// Domain of the false arm.
        b: Domain,
    },
    /// A combine node was emitted with zero terms.
    #[error("combine node requires at least one term")]
    EmptyCombine,
    /// A referenced expression id does not exist in this builder.
    #[error("unknown expression id {0}")]
    UnknownExpr(u32),
    /// A value was used in a world the op does not accept.
    #[error("expected {expected:?}-world value, got {actual:?}")]
    WorldMismatch {
        /// World the op requires.
        expected: World,
        /// World the value inhabits.
        actual: World,
    },
}

/// Reference to a built expression, signal- or field-world.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExprRef {
    /// Signal expression.
    Sig(SigExprId),
    /// Field expression.
    Field(FieldExprId),
}

/// A typed reference to a built expression; the currency of lowering.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ValueRef {
    /// Result type of the expression.
    pub ty: TypeDesc,
    /// The expression.
    pub expr: ExprRef,
}

impl ValueRef {
    /// Wraps a signal expression.
    #[must_use]
    pub fn sig(id: SigExprId, ty: TypeDesc) -> Self {
        Self {
            ty,
            expr: ExprRef::Sig(id),
        }
    }

    /// Wraps a field expression.
    #[must_use]
    pub fn field(id: FieldExprId, ty: TypeDesc) -> Self {
        Self {
            ty,
            expr: ExprRef::Field(id),
        }
    }

    /// The signal id, if this is a signal ref.
    #[must_use]
    pub fn as_sig(&self) -> Option<SigExprId> {
        match self.expr {
            ExprRef::Sig(id) => Some(id),
            ExprRef::Field(_) => None,
        }
    }

    /// The field id, if this is a field ref.
    #[must_use]
    pub fn as_field(&self) -> Option<FieldExprId> {
        match self.expr {
            ExprRef::Field(id) => Some(id),
            ExprRef::Sig(_) => None,
        }
    }
}

/// Mutable builder for one compile.
#[derive(Debug)]
pub struct IrBuilder {
    sig_exprs: Vec<SigExprIR>,
    sig_types: Vec<TypeDesc>,
    sig_cons: FxHashMap<SigExprIR, SigExprId>,
    field_exprs: Vec<FieldExprIR>,
    field_types: Vec<TypeDesc>,
    field_cons: FxHashMap<FieldExprIR, FieldExprId>,
    consts: ConstPool,
    slots: SlotAllocator,
    event_slots: u32,
    time_model: Option<TimeModelIR>,
    time_slots: TimeSlots,
    render_passes: Vec<RenderPassIR>,
    probes: Vec<DebugProbeIR>,
    seed: u64,
}

impl IrBuilder {
    /// Creates a builder and allocates the designated time slots.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let mut slots = SlotAllocator::new();
        let abs_ty = TypeDesc::signal(Domain::Float).with_unit(Unit::Ms);
        let abs_ms = slots.alloc(abs_ty, SlotOwner::Time(TimeField::AbsMs));
        let model_ms = slots.alloc(abs_ty, SlotOwner::Time(TimeField::ModelMs));
        let phase01 = slots.alloc(
            TypeDesc::signal(Domain::Phase01),
            SlotOwner::Time(TimeField::Phase01),
        );
        Self {
            sig_exprs: Vec::new(),
            sig_types: Vec::new(),
            sig_cons: FxHashMap::default(),
            field_exprs: Vec::new(),
            field_types: Vec::new(),
            field_cons: FxHashMap::default(),
            consts: ConstPool::new(),
            slots,
            event_slots: 1,
            time_model: None,
            time_slots: TimeSlots {
                abs_ms,
                model_ms,
                phase01,
                wrap: EventSlot(0),
            },
            render_passes: Vec::new(),
            probes: Vec::new(),
            seed,
        }
    }

    /// The seed baked into seeded kernels.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The designated time slots.
    #[must_use]
    pub fn time_slots(&self) -> TimeSlots {
        self.time_slots
    }

    /// Binds the program's time model. Last write wins; the pipeline enforces
    /// single-root before calling.
    pub fn set_time_model(&mut self, tm: TimeModelIR) {
        self.time_model = Some(tm);
    }

    /// The bound time model, if any.
    #[must_use]
    pub fn time_model(&self) -> Option<TimeModelIR> {
        self.time_model
    }

    // ─── constants & slots ──────────────────────────────────────────

    /// Interns a constant.
    pub fn intern_const(&mut self, value: Value) -> ConstId {
        self.consts.intern(value)
    }

    /// Looks up a pooled constant.
    #[must_use]
    pub fn const_value(&self, id: ConstId) -> Option<&Value> {
        self.consts.get(id)
    }

    /// Allocates a slot range for one value of `ty`.
    pub fn alloc_slot(&mut self, ty: TypeDesc, owner: SlotOwner) -> ValueSlot {
        self.slots.alloc(ty, owner)
    }

    /// The declared type of an allocated slot (base slots only).
    #[must_use]
    pub fn slot_ty(&self, slot: ValueSlot) -> Option<TypeDesc> {
        self.slots
            .meta()
            .iter()
            .find(|m| m.slot == slot)
            .map(|m| m.ty)
    }

    /// Allocates a fresh event slot.
    pub fn alloc_event_slot(&mut self) -> EventSlot {
        let slot = EventSlot(self.event_slots);
        self.event_slots += 1;
        slot
    }

    // ─── signal expressions ─────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation)]
    fn push_sig(&mut self, expr: SigExprIR, ty: TypeDesc) -> SigExprId {
        // Placeholders are identity-unique and must never be shared.
        let consable = !matches!(expr, SigExprIR::Placeholder | SigExprIR::Alias(_));
        if consable {
            if let Some(id) = self.sig_cons.get(&expr) {
                return *id;
            }
        }
        let id = SigExprId(self.sig_exprs.len() as u32);
        if consable {
            self.sig_cons.insert(expr.clone(), id);
        }
        self.sig_exprs.push(expr);
        self.sig_types.push(ty);
        id
    }

    /// Result type of a signal expression.
    #[must_use]
    pub fn sig_type(&self, id: SigExprId) -> Option<TypeDesc> {
        self.sig_types.get(id.index()).copied()
    }

    /// Read access to an emitted signal node (lowerings that need structural
    /// inspection, e.g. clip-group child collection).
    #[must_use]
    pub fn sig_expr(&self, id: SigExprId) -> Option<&SigExprIR> {
        self.sig_exprs.get(id.index())
    }

    /// Emits a pooled-constant node.
    pub fn sig_const(&mut self, value: Value, ty: TypeDesc) -> SigExprId {
        let c = self.intern_const(value);
        self.push_sig(SigExprIR::Const(c), ty)
    }

    /// Emits the absolute-time leaf.
    pub fn sig_time_abs(&mut self) -> SigExprId {
        let ty = TypeDesc::signal(Domain::Float).with_unit(Unit::Ms);
        self.push_sig(SigExprIR::TimeAbsMs, ty)
    }

    /// Emits the model-time leaf.
    pub fn sig_time_model(&mut self) -> SigExprId {
        let ty = TypeDesc::signal(Domain::Float).with_unit(Unit::Ms);
        self.push_sig(SigExprIR::TimeModelMs, ty)
    }

    /// Emits the phase leaf.
    pub fn sig_phase01(&mut self) -> SigExprId {
        self.push_sig(SigExprIR::Phase01, TypeDesc::signal(Domain::Phase01))
    }

    /// Emits an event-check leaf (true while the slot is triggered).
    pub fn sig_event(&mut self, slot: EventSlot) -> SigExprId {
        let ty = TypeDesc {
            category: TypeCategory::Internal,
            bus_eligible: false,
            ..TypeDesc::signal(Domain::Bool)
        };
        self.push_sig(SigExprIR::Event(slot), ty)
    }

    /// Emits a unary map node.
    pub fn sig_map(&mut self, src: SigExprId, op: UnaryOp) -> Result<SigExprId, IrTypeError> {
        let src_ty = self
            .sig_type(src)
            .ok_or(IrTypeError::UnknownExpr(src.0))?;
        let out = op
            .result_domain(src_ty.domain)
            .ok_or(IrTypeError::UnaryMismatch {
                op,
                input: src_ty.domain,
            })?;
        Ok(self.push_sig(SigExprIR::Map { src, op }, TypeDesc::signal(out)))
    }

    /// Emits a binary zip node.
    pub fn sig_zip(
        &mut self,
        a: SigExprId,
        b: SigExprId,
        op: BinaryOp,
    ) -> Result<SigExprId, IrTypeError> {
        let a_ty = self.sig_type(a).ok_or(IrTypeError::UnknownExpr(a.0))?;
        let b_ty = self.sig_type(b).ok_or(IrTypeError::UnknownExpr(b.0))?;
        let out = op
            .result_domain(a_ty.domain, b_ty.domain)
            .ok_or(IrTypeError::BinaryMismatch {
                op,
                a: a_ty.domain,
                b: b_ty.domain,
            })?;
        Ok(self.push_sig(SigExprIR::Zip { a, b, op }, TypeDesc::signal(out)))
    }

    /// Emits a select node.
    pub fn sig_select(
        &mut self,
        cond: SigExprId,
        a: SigExprId,
        b: SigExprId,
    ) -> Result<SigExprId, IrTypeError> {
        let a_ty = self.sig_type(a).ok_or(IrTypeError::UnknownExpr(a.0))?;
        let b_ty = self.sig_type(b).ok_or(IrTypeError::UnknownExpr(b.0))?;
        if a_ty.domain.canonical() != b_ty.domain.canonical() {
            return Err(IrTypeError::SelectMismatch {
                a: a_ty.domain,
                b: b_ty.domain,
            });
        }
        Ok(self.push_sig(SigExprIR::Select { cond, a, b }, a_ty))
    }

    /// Emits a multi-writer combine node over canonically ordered terms.
    pub fn sig_bus_combine(
        &mut self,
        terms: Vec<SigExprId>,
        op: CombineOp,
        out_ty: TypeDesc,
    ) -> Result<SigExprId, IrTypeError> {
        if terms.is_empty() {
            return Err(IrTypeError::EmptyCombine);
        }
        Ok(self.push_sig(SigExprIR::BusCombine { terms, op }, out_ty))
    }

    /// Emits a stateful operator node.
    pub fn sig_state(
        &mut self,
        key: StateKey,
        op: StateOp,
        input: SigExprId,
        param: Value,
        init: Value,
        out_ty: TypeDesc,
    ) -> Result<SigExprId, IrTypeError> {
        self.sig_type(input).ok_or(IrTypeError::UnknownExpr(input.0))?;
        let param = self.intern_const(param);
        let init = self.intern_const(init);
        Ok(self.push_sig(
            SigExprIR::State {
                key,
                op,
                input,
                param,
                init,
            },
            out_ty,
        ))
    }

    /// Emits an unresolved placeholder (deferred state input).
    pub fn sig_placeholder(&mut self, ty: TypeDesc) -> SigExprId {
        self.push_sig(SigExprIR::Placeholder, ty)
    }

    /// Resolves a placeholder to forward to `target`.
    pub fn resolve_placeholder(
        &mut self,
        placeholder: SigExprId,
        target: SigExprId,
    ) -> Result<(), IrTypeError> {
        self.sig_type(target)
            .ok_or(IrTypeError::UnknownExpr(target.0))?;
        match self.sig_exprs.get_mut(placeholder.index()) {
            Some(slot @ SigExprIR::Placeholder) => {
                *slot = SigExprIR::Alias(target);
                Ok(())
            }
            Some(_) | None => Err(IrTypeError::UnknownExpr(placeholder.0)),
        }
    }

    /// True while any placeholder remains unresolved.
    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.sig_exprs
            .iter()
            .any(|e| matches!(e, SigExprIR::Placeholder))
    }

    // ─── field expressions ──────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation)]
    fn push_field(&mut self, expr: FieldExprIR, ty: TypeDesc) -> FieldExprId {
        if let Some(id) = self.field_cons.get(&expr) {
            return *id;
        }
        let id = FieldExprId(self.field_exprs.len() as u32);
        self.field_cons.insert(expr.clone(), id);
        self.field_exprs.push(expr);
        self.field_types.push(ty);
        id
    }

    /// Result type of a field expression.
    #[must_use]
    pub fn field_type(&self, id: FieldExprId) -> Option<TypeDesc> {
        self.field_types.get(id.index()).copied()
    }

    /// Emits a constant field node.
    pub fn field_const(&mut self, value: Value, ty: TypeDesc) -> FieldExprId {
        let c = self.intern_const(value);
        self.push_field(FieldExprIR::Const(c), ty)
    }

    /// Emits a signal-broadcast field node.
    pub fn field_broadcast(&mut self, sig: SigExprId) -> Result<FieldExprId, IrTypeError> {
        let sig_ty = self.sig_type(sig).ok_or(IrTypeError::UnknownExpr(sig.0))?;
        let ty = TypeDesc::field(sig_ty.domain);
        Ok(self.push_field(FieldExprIR::BroadcastSig(sig), ty))
    }

    /// Emits a per-element unary map node.
    pub fn field_map(&mut self, src: FieldExprId, op: UnaryOp) -> Result<FieldExprId, IrTypeError> {
        let src_ty = self
            .field_type(src)
            .ok_or(IrTypeError::UnknownExpr(src.0))?;
        let out = op
            .result_domain(src_ty.domain)
            .ok_or(IrTypeError::UnaryMismatch {
                op,
                input: src_ty.domain,
            })?;
        Ok(self.push_field(FieldExprIR::Map { src, op }, TypeDesc::field(out)))
    }

    /// Emits a per-element binary zip node.
    pub fn field_zip(
        &mut self,
        a: FieldExprId,
        b: FieldExprId,
        op: BinaryOp,
    ) -> Result<FieldExprId, IrTypeError> {
        let a_ty = self.field_type(a).ok_or(IrTypeError::UnknownExpr(a.0))?;
        let b_ty = self.field_type(b).ok_or(IrTypeError::UnknownExpr(b.0))?;
        let out = op
            .result_domain(a_ty.domain, b_ty.domain)
            .ok_or(IrTypeError::BinaryMismatch {
                op,
                a: a_ty.domain,
                b: b_ty.domain,
            })?;
        Ok(self.push_field(FieldExprIR::Zip { a, b, op }, TypeDesc::field(out)))
    }

    /// Emits a field-vs-signal zip node (signal broadcast per element).
    pub fn field_zip_sig(
        &mut self,
        field: FieldExprId,
        sig: SigExprId,
        op: BinaryOp,
    ) -> Result<FieldExprId, IrTypeError> {
        let f_ty = self
            .field_type(field)
            .ok_or(IrTypeError::UnknownExpr(field.0))?;
        let s_ty = self.sig_type(sig).ok_or(IrTypeError::UnknownExpr(sig.0))?;
        let out = op
            .result_domain(f_ty.domain, s_ty.domain)
            .ok_or(IrTypeError::BinaryMismatch {
                op,
                a: f_ty.domain,
                b: s_ty.domain,
            })?;
        Ok(self.push_field(
            FieldExprIR::ZipSig { field, sig, op },
            TypeDesc::field(out),
        ))
    }

    /// Emits an indexed-generator field node.
    pub fn field_map_indexed(
        &mut self,
        op: IndexedOp,
        a: SigExprId,
        b: SigExprId,
        out_ty: TypeDesc,
    ) -> Result<FieldExprId, IrTypeError> {
        self.sig_type(a).ok_or(IrTypeError::UnknownExpr(a.0))?;
        self.sig_type(b).ok_or(IrTypeError::UnknownExpr(b.0))?;
        Ok(self.push_field(FieldExprIR::MapIndexed { op, a, b }, out_ty))
    }

    /// Emits a whole-field select node.
    pub fn field_select(
        &mut self,
        cond: SigExprId,
        a: FieldExprId,
        b: FieldExprId,
    ) -> Result<FieldExprId, IrTypeError> {
        let a_ty = self.field_type(a).ok_or(IrTypeError::UnknownExpr(a.0))?;
        let b_ty = self.field_type(b).ok_or(IrTypeError::UnknownExpr(b.0))?;
        if a_ty.domain.canonical() != b_ty.domain.canonical() {
            return Err(IrTypeError::SelectMismatch {
                a: a_ty.domain,
                b: b_ty.domain,
            });
        }
        Ok(self.push_field(FieldExprIR::Select { cond, a, b }, a_ty))
    }

    /// Emits a per-element affine transform over a vec2 field.
    pub fn field_transform(
        &mut self,
        src: FieldExprId,
        scale: SigExprId,
        offset: SigExprId,
    ) -> Result<FieldExprId, IrTypeError> {
        let src_ty = self
            .field_type(src)
            .ok_or(IrTypeError::UnknownExpr(src.0))?;
        if src_ty.domain.canonical() != Domain::Vec2 {
            return Err(IrTypeError::UnaryMismatch {
                op: UnaryOp::SplatVec2,
                input: src_ty.domain,
            });
        }
        self.sig_type(scale)
            .ok_or(IrTypeError::UnknownExpr(scale.0))?;
        self.sig_type(offset)
            .ok_or(IrTypeError::UnknownExpr(offset.0))?;
        Ok(self.push_field(FieldExprIR::Transform { src, scale, offset }, src_ty))
    }

    /// Emits a multi-writer field combine node.
    pub fn field_bus_combine(
        &mut self,
        terms: Vec<FieldExprId>,
        op: CombineOp,
        out_ty: TypeDesc,
    ) -> Result<FieldExprId, IrTypeError> {
        if terms.is_empty() {
            return Err(IrTypeError::EmptyCombine);
        }
        Ok(self.push_field(FieldExprIR::BusCombine { terms, op }, out_ty))
    }

    // ─── render passes & probes ─────────────────────────────────────

    /// Records a render pass descriptor; returns its table index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_render_pass(&mut self, pass: RenderPassIR) -> u32 {
        let idx = self.render_passes.len() as u32;
        self.render_passes.push(pass);
        idx
    }

    /// Number of recorded render passes.
    #[must_use]
    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    /// The recorded render pass descriptors, in registration order.
    #[must_use]
    pub fn render_passes(&self) -> &[RenderPassIR] {
        &self.render_passes
    }

    /// Records a debug probe; returns its table index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push_probe(&mut self, probe: DebugProbeIR) -> u32 {
        let idx = self.probes.len() as u32;
        self.probes.push(probe);
        idx
    }

    // ─── freeze ─────────────────────────────────────────────────────

    /// Freezes all tables into an immutable program.
    #[must_use]
    pub fn finish(
        self,
        ir_version: String,
        compiled_at_ms: u64,
        schedule: Vec<Step>,
        outputs: BTreeMap<String, ValueSlot>,
    ) -> CompiledProgramIR {
        let time_model = self
            .time_model
            .unwrap_or(TimeModelIR::Infinite { window_ms: 10_000.0 });
        let slot_count = self.slots.slot_count();
        CompiledProgramIR {
            ir_version,
            compiled_at_ms,
            seed: self.seed,
            time_model,
            time_slots: self.time_slots,
            sig_exprs: self.sig_exprs,
            sig_types: self.sig_types,
            field_exprs: self.field_exprs,
            field_types: self.field_types,
            consts: self.consts.into_values(),
            slot_meta: self.slots.into_meta(),
            slot_count,
            event_slot_count: self.event_slots,
            schedule,
            render_passes: self.render_passes,
            probes: self.probes,
            outputs,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identical_nodes_cons_to_one_id() {
        let mut b = IrBuilder::new(0);
        let t = b.sig_phase01();
        let ty = TypeDesc::signal(Domain::Float);
        let c1 = b.sig_const(Value::Float(2.0), ty);
        let c2 = b.sig_const(Value::Float(2.0), ty);
        assert_eq!(c1, c2);
        let m1 = b.sig_zip(t, c1, BinaryOp::Mul).unwrap();
        let m2 = b.sig_zip(t, c2, BinaryOp::Mul).unwrap();
        assert_eq!(m1, m2);
    }

    #[test]
    fn placeholders_never_cons() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let p1 = b.sig_placeholder(ty);
        let p2 = b.sig_placeholder(ty);
        assert_ne!(p1, p2);
        assert!(b.has_placeholders());
        let c = b.sig_const(Value::Float(1.0), ty);
        b.resolve_placeholder(p1, c).unwrap();
        b.resolve_placeholder(p2, c).unwrap();
        assert!(!b.has_placeholders());
    }

    #[test]
    fn map_rejects_wrong_domain() {
        let mut b = IrBuilder::new(0);
        let color = b.sig_const(
            Value::Color([0.0; 4]),
            TypeDesc::signal(Domain::Color),
        );
        let err = b.sig_map(color, UnaryOp::Sin01).unwrap_err();
        assert_eq!(
            err,
            IrTypeError::UnaryMismatch {
                op: UnaryOp::Sin01,
                input: Domain::Color
            }
        );
    }

    #[test]
    fn zip_infers_broadcast_result_type() {
        let mut b = IrBuilder::new(0);
        let v = b.sig_const(Value::Vec2([1.0, 2.0]), TypeDesc::signal(Domain::Vec2));
        let s = b.sig_const(Value::Float(3.0), TypeDesc::signal(Domain::Float));
        let z = b.sig_zip(v, s, BinaryOp::Mul).unwrap();
        assert_eq!(b.sig_type(z).unwrap().domain, Domain::Vec2);
    }

    #[test]
    fn resolve_placeholder_rejects_non_placeholder() {
        let mut b = IrBuilder::new(0);
        let ty = TypeDesc::signal(Domain::Float);
        let c = b.sig_const(Value::Float(1.0), ty);
        assert!(b.resolve_placeholder(c, c).is_err());
    }

    #[test]
    fn finish_defaults_to_infinite_time_model() {
        let b = IrBuilder::new(7);
        let program = b.finish(
            crate::ir::IR_VERSION.to_owned(),
            0,
            vec![Step::TimeDerive],
            BTreeMap::new(),
        );
        assert!(matches!(
            program.time_model,
            TimeModelIR::Infinite { .. }
        ));
        assert_eq!(program.seed, 7);
        assert_eq!(program.slot_count, 3);
    }
}
