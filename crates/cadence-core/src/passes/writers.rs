// SPDX-License-Identifier: Apache-2.0
//! Pass 5 — writer resolution.
//!
//! For every block input, enumerates its writers — wires, enabled bus
//! listeners, and the materialized default provider — in the canonical
//! `(kind, sort_key, id)` order: wires first, then listeners, then the
//! default, ties broken by sort key then edge id. The order is a pure
//! function of those keys; insertion order never leaks through.

use std::collections::{BTreeMap, BTreeSet};

use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{BlockId, BusId, EdgeId, PortId};
use crate::patch::{BlockRole, CombineMode, CombinePolicy, Edge, Endpoint};
use crate::registry::BlockRegistry;

use super::normalize::Normalized;

/// Writer kind, primary ordering key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum WriterKind {
    /// Direct wire from a block output.
    Wire = 0,
    /// Enabled bus listener.
    Bus = 1,
    /// Materialized default provider.
    Default = 2,
}

/// Where a writer's value comes from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WriterSource {
    /// A block output port.
    Port {
        /// Producing block.
        block: BlockId,
        /// Output port on that block.
        port: PortId,
    },
    /// A bus combine result.
    Bus(BusId),
}

/// One resolved writer.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Writer {
    /// Ordering kind.
    pub kind: WriterKind,
    /// The edge that carries the value (its transforms apply).
    pub edge: EdgeId,
    /// Edge sort key.
    pub sort_key: i32,
    /// Value source.
    pub source: WriterSource,
}

/// Writers plus the slot's combine policy.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolvedInputSpec {
    /// Writers in canonical order.
    pub writers: Vec<Writer>,
    /// The slot's combine policy.
    pub policy: CombinePolicy,
}

/// Keyed by `(block, input port)`.
pub type ResolvedInputs = BTreeMap<(BlockId, String), ResolvedInputSpec>;

fn writer_for(norm: &Normalized, edge: &Edge) -> Writer {
    match &edge.from {
        Endpoint::Port { block, port } => {
            let kind = if norm
                .blocks
                .get(block)
                .is_some_and(|b| b.role == Some(BlockRole::DefaultSourceProvider))
            {
                WriterKind::Default
            } else {
                WriterKind::Wire
            };
            Writer {
                kind,
                edge: edge.id.clone(),
                sort_key: edge.sort_key,
                source: WriterSource::Port {
                    block: block.clone(),
                    port: port.clone(),
                },
            }
        }
        Endpoint::Bus(bus) => Writer {
            kind: WriterKind::Bus,
            edge: edge.id.clone(),
            sort_key: edge.sort_key,
            source: WriterSource::Bus(bus.clone()),
        },
    }
}

/// Resolves every block input's writer list and combine policy.
#[must_use]
pub fn resolve_writers(
    norm: &Normalized,
    blocks: &BlockRegistry,
    failed: &BTreeSet<EdgeId>,
    diags: &mut DiagSink,
) -> ResolvedInputs {
    // Pre-bucket edges by target input.
    let mut by_input: BTreeMap<(&BlockId, &str), Vec<&Edge>> = BTreeMap::new();
    for edge in norm.wires.iter().chain(&norm.listeners) {
        if failed.contains(&edge.id) {
            continue;
        }
        if let Endpoint::Port { block, port } = &edge.to {
            by_input
                .entry((block, port.as_str()))
                .or_default()
                .push(edge);
        }
    }

    let mut resolved = ResolvedInputs::new();
    for (block_id, block) in &norm.blocks {
        let Some(def) = blocks.lookup(&block.block_type) else {
            continue;
        };
        for input in def.inputs {
            let mut writers: Vec<Writer> = by_input
                .get(&(block_id, input.id))
                .into_iter()
                .flatten()
                .map(|e| writer_for(norm, *e))
                .collect();
            writers.sort_by(|a, b| {
                (a.kind, a.sort_key, &a.edge).cmp(&(b.kind, b.sort_key, &b.edge))
            });

            let policy = input.combine.unwrap_or_default();
            let port = PortId::new(input.id);

            if writers.is_empty() {
                diags.emit(
                    DiagCode::UnconnectedInput,
                    format!("{}.{} has no writers", block_id.as_str(), input.id),
                    Where::port(block_id, &port),
                );
            } else if policy.mode == CombineMode::Error && writers.len() >= 2 {
                diags.emit(
                    DiagCode::MultiInputForbidden,
                    format!(
                        "{}.{} forbids multiple writers ({} present)",
                        block_id.as_str(),
                        input.id,
                        writers.len()
                    ),
                    Where::port(block_id, &port),
                );
                // The input falls back to its default; the program still runs.
                writers.clear();
            }

            resolved.insert(
                (block_id.clone(), input.id.to_owned()),
                ResolvedInputSpec { writers, policy },
            );
        }
    }
    resolved
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::passes::defaults::materialize_defaults;
    use crate::passes::normalize::normalize;
    use crate::patch::{Block, Bus, BusCombineMode, Patch};
    use crate::registry::Registries;
    use crate::types::{Domain, TypeDesc};

    fn resolve(patch: &Patch) -> (ResolvedInputs, DiagSink) {
        let regs = Registries::standard();
        let mut diags = DiagSink::new();
        let patch = materialize_defaults(patch, &regs.blocks, &mut diags);
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let resolved = resolve_writers(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        (resolved, diags)
    }

    #[test]
    fn kind_orders_wire_bus_default() {
        let patch = Patch::new()
            .with_block(Block::new("src", "ConstFloat"))
            .with_block(Block::new("m", "Mixer"))
            .with_bus(Bus::new(
                "energy",
                TypeDesc::signal(Domain::Float),
                BusCombineMode::Sum,
            ))
            .with_edge(Edge::new(
                "listener",
                Endpoint::bus("energy"),
                Endpoint::port("m", "in"),
            ))
            .with_edge(Edge::new(
                "wire",
                Endpoint::port("src", "out"),
                Endpoint::port("m", "in"),
            ));
        let (resolved, _) = resolve(&patch);
        let spec = resolved
            .get(&(BlockId::new("m"), "in".to_owned()))
            .unwrap();
        let kinds: Vec<WriterKind> = spec.writers.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WriterKind::Wire, WriterKind::Bus]);
    }

    #[test]
    fn sort_key_then_id_breaks_ties() {
        let patch = Patch::new()
            .with_block(Block::new("s1", "ConstFloat"))
            .with_block(Block::new("s2", "ConstFloat"))
            .with_block(Block::new("s3", "ConstFloat"))
            .with_block(Block::new("m", "Mixer"))
            .with_edge(
                Edge::new("b_mid", Endpoint::port("s2", "out"), Endpoint::port("m", "in"))
                    .with_sort_key(1),
            )
            .with_edge(
                Edge::new("a_last", Endpoint::port("s1", "out"), Endpoint::port("m", "in"))
                    .with_sort_key(2),
            )
            .with_edge(
                Edge::new("z_first", Endpoint::port("s3", "out"), Endpoint::port("m", "in"))
                    .with_sort_key(1),
            );
        let (resolved, _) = resolve(&patch);
        let spec = resolved
            .get(&(BlockId::new("m"), "in".to_owned()))
            .unwrap();
        let ids: Vec<&str> = spec.writers.iter().map(|w| w.edge.as_str()).collect();
        assert_eq!(ids, vec!["b_mid", "z_first", "a_last"]);
    }

    #[test]
    fn defaulted_input_resolves_to_one_default_writer() {
        let patch = Patch::new().with_block(Block::new("osc", "Oscillator"));
        let (resolved, diags) = resolve(&patch);
        let spec = resolved
            .get(&(BlockId::new("osc"), "frequency".to_owned()))
            .unwrap();
        assert_eq!(spec.writers.len(), 1);
        assert_eq!(spec.writers[0].kind, WriterKind::Default);
        assert!(!diags.has_fatal());
    }

    #[test]
    fn unconnected_input_without_default_is_reported() {
        let patch = Patch::new().with_block(Block::new("clip", "ClipGroup"));
        let (resolved, diags) = resolve(&patch);
        let spec = resolved
            .get(&(BlockId::new("clip"), "child".to_owned()))
            .unwrap();
        assert!(spec.writers.is_empty());
        assert!(diags
            .diagnostics()
            .iter()
            .any(|d| d.code == DiagCode::UnconnectedInput));
    }
}
