// SPDX-License-Identifier: Apache-2.0
//! Passes 6 & 7 — block and bus lowering.
//!
//! One walk over the pass-4 order drives both: ordinary blocks lower through
//! their registered functions (pass 6); when the walk reaches a bus, the
//! combine kernel lowers it from its publishers (pass 7). Edge transforms
//! are applied before a value reaches a block or bus, so lowerings always
//! observe declared types.
//!
//! Inputs whose source lowers later (state-broken cycles) resolve through
//! placeholder expressions, patched to forwarding aliases once the producer
//! exists.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::{IrBuilder, ValueRef};
use crate::combine::{combine_refs, CombineError};
use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{BlockId, BusId, EdgeId, PortId, SigExprId, ValueSlot};
use crate::ir::{SlotOwner, Step};
use crate::patch::{CombineMode, CombineWhen, Edge, Endpoint};
use crate::registry::{LowerCtx, Registries};
use crate::types::{TypeDesc, World};
use crate::value::Value;

use super::normalize::Normalized;
use super::order::OrderNode;
use super::writers::{ResolvedInputs, WriterSource};

/// Everything the lowering walk produced.
#[derive(Debug, Default)]
pub struct Lowered {
    /// Output refs per `(block, port)`.
    pub block_outputs: BTreeMap<(BlockId, String), ValueRef>,
    /// Combine result per bus.
    pub bus_outputs: BTreeMap<BusId, ValueRef>,
    /// Node/bus eval steps, in walk order.
    pub steps: Vec<Step>,
    /// Visible block outputs, keyed `"block.port"`.
    pub outputs: BTreeMap<String, ValueSlot>,
}

/// A placeholder awaiting its producer.
struct Pending {
    placeholder: SigExprId,
    block: BlockId,
    port: PortId,
}

fn default_input_ref(builder: &mut IrBuilder, ty: TypeDesc) -> ValueRef {
    let v = Value::default_for(&ty);
    match ty.world {
        World::Field => {
            let id = builder.field_const(v, ty);
            ValueRef::field(id, ty)
        }
        _ => {
            let id = builder.sig_const(v, ty);
            ValueRef::sig(id, ty)
        }
    }
}

fn apply_transforms(
    builder: &mut IrBuilder,
    mut r: ValueRef,
    edge: &Edge,
    regs: &Registries,
    diags: &mut DiagSink,
) -> ValueRef {
    for step in &edge.transforms {
        let Some(def) = regs.transforms.lookup(&step.transform) else {
            // Unregistered transforms already excluded the edge in pass 2.
            continue;
        };
        match def.compile {
            None => {
                diags.emit(
                    DiagCode::TransformMissingIr,
                    format!("transform {} has no IR lowering", step.transform),
                    Where::edge(&edge.id),
                );
            }
            Some(compile) => match compile(builder, r, &step.params) {
                Ok(next) => r = next,
                Err(e) => {
                    diags.emit(
                        DiagCode::TransformIncompatible,
                        e.to_string(),
                        Where::edge(&edge.id),
                    );
                }
            },
        }
    }
    r
}

struct Walk<'a> {
    norm: &'a Normalized,
    specs: &'a ResolvedInputs,
    regs: &'a Registries,
    edges: BTreeMap<&'a EdgeId, &'a Edge>,
    failed: &'a BTreeSet<EdgeId>,
    lowered_blocks: BTreeSet<BlockId>,
    pending: Vec<Pending>,
    out: Lowered,
}

impl<'a> Walk<'a> {
    fn source_output_ty(&self, block: &BlockId, port: &PortId) -> Option<TypeDesc> {
        let b = self.norm.blocks.get(block)?;
        let def = self.regs.blocks.lookup(&b.block_type)?;
        def.output(port.as_str()).map(|p| p.ty)
    }

    /// Resolves one writer to a (transformed) value ref.
    fn writer_ref(
        &mut self,
        builder: &mut IrBuilder,
        source: &WriterSource,
        edge_id: &EdgeId,
        diags: &mut DiagSink,
    ) -> Option<ValueRef> {
        let base = match source {
            WriterSource::Port { block, port } => {
                let key = (block.clone(), port.as_str().to_owned());
                if let Some(r) = self.out.block_outputs.get(&key) {
                    Some(*r)
                } else if self.lowered_blocks.contains(block) {
                    // Producer lowered but the port is missing: PortMissing
                    // was already diagnosed; this writer contributes nothing.
                    None
                } else {
                    // Producer lowers later: a state-broken cycle. Forward
                    // through a placeholder patched after the walk.
                    let ty = self.source_output_ty(block, port)?;
                    if ty.world == World::Field {
                        diags.emit(
                            DiagCode::IrValidationFailed,
                            "field-world cycle cannot be deferred",
                            Where::block(block),
                        );
                        return None;
                    }
                    let placeholder = builder.sig_placeholder(ty);
                    self.pending.push(Pending {
                        placeholder,
                        block: block.clone(),
                        port: port.clone(),
                    });
                    Some(ValueRef::sig(placeholder, ty))
                }
            }
            WriterSource::Bus(bus) => self.out.bus_outputs.get(bus).copied(),
        };
        let base = base?;
        let edge = *self.edges.get(edge_id)?;
        Some(apply_transforms(builder, base, edge, self.regs, diags))
    }

    /// Resolves a block input to a single combined ref.
    fn resolve_input(
        &mut self,
        builder: &mut IrBuilder,
        block: &BlockId,
        input_id: &str,
        out_ty: TypeDesc,
        diags: &mut DiagSink,
    ) -> ValueRef {
        let key = (block.clone(), input_id.to_owned());
        let (writers, policy) = match self.specs.get(&key) {
            Some(spec) => (spec.writers.clone(), spec.policy),
            None => (Vec::new(), crate::patch::CombinePolicy::default()),
        };
        let mut refs = Vec::with_capacity(writers.len());
        for w in &writers {
            if let Some(r) = self.writer_ref(builder, &w.source, &w.edge, diags) {
                refs.push(r);
            }
        }
        match combine_refs(
            builder,
            &refs,
            &policy.mode,
            policy.when,
            out_ty,
            &self.regs.combines,
        ) {
            Ok(r) => r,
            Err(CombineError::Forbidden) => default_input_ref(builder, out_ty),
            Err(e @ (CombineError::UnknownCustom(_) | CombineError::Type(_))) => {
                diags.emit(
                    DiagCode::LoweringFailed,
                    e.to_string(),
                    Where {
                        block: Some(block.clone()),
                        port: Some(PortId::new(input_id)),
                        ..Where::default()
                    },
                );
                default_input_ref(builder, out_ty)
            }
        }
    }

    fn lower_block(&mut self, builder: &mut IrBuilder, id: &BlockId, diags: &mut DiagSink) {
        let Some(block) = self.norm.blocks.get(id) else {
            return;
        };
        let Some(def) = self.regs.blocks.lookup(&block.block_type) else {
            return;
        };

        let mut inputs: BTreeMap<String, ValueRef> = BTreeMap::new();
        for input in def.inputs {
            let r = self.resolve_input(builder, id, input.id, input.ty, diags);
            inputs.insert(input.id.to_owned(), r);
        }

        let time_model = builder.time_model();
        let wrap = builder.time_slots().wrap;
        let mut ctx = LowerCtx::new(builder, block, &inputs, time_model, wrap);
        let lower_ok = match (def.lower)(&mut ctx) {
            Ok(()) => true,
            Err(e) => {
                diags.emit(DiagCode::LoweringFailed, e.to_string(), Where::block(id));
                false
            }
        };
        let mut outs = ctx.into_outputs();

        for out_def in def.outputs {
            let r = match outs.remove(out_def.id) {
                Some(r) => r,
                None => {
                    if lower_ok {
                        diags.emit(
                            DiagCode::PortMissing,
                            format!("{}.{} not produced", id.as_str(), out_def.id),
                            Where::port(id, &PortId::new(out_def.id)),
                        );
                    }
                    default_input_ref(builder, out_def.ty)
                }
            };
            self.out
                .block_outputs
                .insert((id.clone(), out_def.id.to_owned()), r);

            if !block.hidden && out_def.ty.world == World::Signal {
                if let Some(sig) = r.as_sig() {
                    let slot = builder.alloc_slot(out_def.ty, SlotOwner::Sig(sig));
                    self.out.steps.push(Step::NodeEval { expr: sig, slot });
                    self.out
                        .outputs
                        .insert(format!("{}.{}", id.as_str(), out_def.id), slot);
                }
            }
        }
        self.lowered_blocks.insert(id.clone());
    }

    fn lower_bus(&mut self, builder: &mut IrBuilder, id: &BusId, diags: &mut DiagSink) {
        let Some(bus) = self.norm.buses.get(id).cloned() else {
            return;
        };
        let mut pubs: Vec<&Edge> = self
            .norm
            .publishers
            .iter()
            .filter(|e| {
                !self.failed.contains(&e.id)
                    && matches!(&e.to, Endpoint::Bus(b) if b == id)
            })
            .collect();
        pubs.sort_by(|a, b| (a.sort_key, &a.id).cmp(&(b.sort_key, &b.id)));

        let mut refs = Vec::with_capacity(pubs.len());
        for e in pubs {
            if let Endpoint::Port { block, port } = &e.from {
                let source = WriterSource::Port {
                    block: block.clone(),
                    port: port.clone(),
                };
                if let Some(r) = self.writer_ref(builder, &source, &e.id, diags) {
                    refs.push(r);
                }
            }
        }
        if refs.is_empty() {
            diags.emit(
                DiagCode::EmptyBus,
                format!("bus {} has no publishers", id.as_str()),
                Where::bus(id),
            );
        }
        let mode = CombineMode::from(bus.combine);
        let r = match combine_refs(
            builder,
            &refs,
            &mode,
            CombineWhen::Always,
            bus.ty,
            &self.regs.combines,
        ) {
            Ok(r) => r,
            Err(e) => {
                diags.emit(DiagCode::LoweringFailed, e.to_string(), Where::bus(id));
                default_input_ref(builder, bus.ty)
            }
        };
        self.out.bus_outputs.insert(id.clone(), r);

        if bus.ty.world != World::Field {
            if let Some(sig) = r.as_sig() {
                let slot = builder.alloc_slot(bus.ty, SlotOwner::Sig(sig));
                self.out.steps.push(Step::BusEval {
                    expr: sig,
                    slot,
                    bus: id.as_str().to_owned(),
                });
            }
        }
    }

    fn patch_pending(&mut self, builder: &mut IrBuilder, diags: &mut DiagSink) {
        let pending = std::mem::take(&mut self.pending);
        for p in pending {
            let key = (p.block.clone(), p.port.as_str().to_owned());
            let target = self
                .out
                .block_outputs
                .get(&key)
                .and_then(ValueRef::as_sig);
            match target {
                Some(target) if builder.resolve_placeholder(p.placeholder, target).is_ok() => {}
                _ => {
                    diags.emit(
                        DiagCode::IrValidationFailed,
                        format!(
                            "unresolvable deferred input from {}.{}",
                            p.block.as_str(),
                            p.port.as_str()
                        ),
                        Where::block(&p.block),
                    );
                }
            }
        }
    }
}

/// Runs the lowering walk over the pass-4 order.
#[must_use]
pub fn lower_all(
    norm: &Normalized,
    order: &[OrderNode],
    specs: &ResolvedInputs,
    regs: &Registries,
    failed: &BTreeSet<EdgeId>,
    builder: &mut IrBuilder,
    diags: &mut DiagSink,
) -> Lowered {
    let mut edges: BTreeMap<&EdgeId, &Edge> = BTreeMap::new();
    for e in norm
        .wires
        .iter()
        .chain(&norm.publishers)
        .chain(&norm.listeners)
    {
        edges.insert(&e.id, e);
    }

    let mut walk = Walk {
        norm,
        specs,
        regs,
        edges,
        failed,
        lowered_blocks: BTreeSet::new(),
        pending: Vec::new(),
        out: Lowered::default(),
    };

    for node in order {
        match node {
            OrderNode::Block(id) => walk.lower_block(builder, id, diags),
            OrderNode::Bus(id) => walk.lower_bus(builder, id, diags),
        }
    }
    walk.patch_pending(builder, diags);
    walk.out
}
