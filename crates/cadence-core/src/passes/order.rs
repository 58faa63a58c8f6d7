// SPDX-License-Identifier: Apache-2.0
//! Pass 4 — dependency ordering.
//!
//! Kahn's topological sort over blocks *and* buses (a bus depends on its
//! publishers; listeners depend on the bus). The ready frontier is drained
//! smallest-first, so the order is canonical for a given patch, not merely
//! some valid order.
//!
//! Cycles are fatal unless they pass through a stateful block: stateful
//! operators read their previous frame's value, so an edge leaving a
//! stateful block may be relaxed to break the cycle. Blocks ordered under a
//! relaxed edge get their late inputs patched through placeholder
//! expressions after the walk.

use std::collections::{BTreeMap, BTreeSet};

use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{BlockId, BusId, EdgeId};
use crate::patch::Endpoint;
use crate::registry::BlockRegistry;

use super::normalize::Normalized;

/// One schedulable node: a block or a bus.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum OrderNode {
    /// An ordinary (or hidden) block.
    Block(BlockId),
    /// A bus, lowered via the combine kernel.
    Bus(BusId),
}

type DepGraph = BTreeMap<OrderNode, BTreeSet<OrderNode>>;

fn kahn(nodes: &BTreeSet<OrderNode>, deps: &DepGraph) -> (Vec<OrderNode>, BTreeSet<OrderNode>) {
    let mut incoming: BTreeMap<&OrderNode, usize> = nodes.iter().map(|n| (n, 0)).collect();
    let mut dependents: BTreeMap<&OrderNode, Vec<&OrderNode>> = BTreeMap::new();
    for (to, froms) in deps {
        for from in froms {
            if nodes.contains(from) && nodes.contains(to) {
                *incoming.entry(to).or_insert(0) += 1;
                dependents.entry(from).or_default().push(to);
            }
        }
    }
    let mut ready: BTreeSet<&OrderNode> = incoming
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(node) = ready.iter().next().copied() {
        ready.remove(node);
        order.push(node.clone());
        if let Some(dep) = dependents.get(node) {
            for to in dep {
                if let Some(n) = incoming.get_mut(*to) {
                    *n -= 1;
                    if *n == 0 {
                        ready.insert(*to);
                    }
                }
            }
        }
    }
    let leftover: BTreeSet<OrderNode> = nodes
        .iter()
        .filter(|n| !order.contains(*n))
        .cloned()
        .collect();
    (order, leftover)
}

fn is_stateful(norm: &Normalized, blocks: &BlockRegistry, id: &BlockId) -> bool {
    norm.blocks
        .get(id)
        .and_then(|b| blocks.lookup(&b.block_type))
        .is_some_and(|def| def.stateful)
}

/// Orders blocks and buses; `failed` edges contribute no dependencies.
#[must_use]
pub fn order(
    norm: &Normalized,
    blocks: &BlockRegistry,
    failed: &BTreeSet<EdgeId>,
    diags: &mut DiagSink,
) -> Vec<OrderNode> {
    let mut nodes: BTreeSet<OrderNode> = norm
        .blocks
        .keys()
        .map(|b| OrderNode::Block(b.clone()))
        .collect();
    nodes.extend(norm.buses.keys().map(|b| OrderNode::Bus(b.clone())));

    // deps[to] = set of nodes that must come first.
    let mut deps: DepGraph = BTreeMap::new();
    // Relaxed deps leave stateful blocks; dropped only for cycle recovery.
    let mut relaxed: DepGraph = BTreeMap::new();

    let mut add = |deps: &mut DepGraph, from: OrderNode, to: OrderNode| {
        deps.entry(to).or_default().insert(from);
    };

    for edge in norm
        .wires
        .iter()
        .chain(&norm.publishers)
        .chain(&norm.listeners)
    {
        if failed.contains(&edge.id) {
            continue;
        }
        let (from, soft) = match &edge.from {
            Endpoint::Port { block, .. } => (
                OrderNode::Block(block.clone()),
                is_stateful(norm, blocks, block),
            ),
            Endpoint::Bus(bus) => (OrderNode::Bus(bus.clone()), false),
        };
        let to = match &edge.to {
            Endpoint::Port { block, .. } => OrderNode::Block(block.clone()),
            Endpoint::Bus(bus) => OrderNode::Bus(bus.clone()),
        };
        if from == to {
            continue;
        }
        if soft {
            add(&mut relaxed, from, to);
        } else {
            add(&mut deps, from, to);
        }
    }

    // First run honors every dependency, relaxed included.
    let mut all_deps = deps.clone();
    for (to, froms) in &relaxed {
        all_deps.entry(to.clone()).or_default().extend(froms.iter().cloned());
    }
    let (mut order, leftover) = kahn(&nodes, &all_deps);
    if leftover.is_empty() {
        return order;
    }

    // Retry the leftover subgraph without the stateful-sourced edges.
    let (tail, still_cyclic) = kahn(&leftover, &deps);
    if still_cyclic.is_empty() {
        order.extend(tail);
        return order;
    }

    let names: Vec<String> = still_cyclic
        .iter()
        .map(|n| match n {
            OrderNode::Block(b) => b.as_str().to_owned(),
            OrderNode::Bus(b) => format!("bus {}", b.as_str()),
        })
        .collect();
    let where_ = still_cyclic
        .iter()
        .find_map(|n| match n {
            OrderNode::Block(b) => Some(Where::block(b)),
            OrderNode::Bus(_) => None,
        })
        .unwrap_or_default();
    diags.emit(
        DiagCode::CycleDetected,
        format!("dependency cycle: {}", names.join(" -> ")),
        where_,
    );
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::normalize::normalize;
    use crate::patch::{Block, Bus, BusCombineMode, Edge, Patch};
    use crate::registry::Registries;
    use crate::types::{Domain, TypeDesc};

    fn position(order: &[OrderNode], node: &OrderNode) -> usize {
        order
            .iter()
            .position(|n| n == node)
            .unwrap_or(usize::MAX)
    }

    #[test]
    fn wires_order_producers_first() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("z_src", "ConstFloat"))
            .with_block(Block::new("a_sink", "Mixer"))
            .with_edge(Edge::new(
                "e",
                Endpoint::port("z_src", "out"),
                Endpoint::port("a_sink", "in"),
            ));
        let mut diags = DiagSink::new();
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let order = order(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        assert!(
            position(&order, &OrderNode::Block(BlockId::new("z_src")))
                < position(&order, &OrderNode::Block(BlockId::new("a_sink")))
        );
    }

    #[test]
    fn buses_order_between_publishers_and_listeners() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("src", "ConstFloat"))
            .with_block(Block::new("sink", "Mixer"))
            .with_bus(Bus::new(
                "energy",
                TypeDesc::signal(Domain::Float),
                BusCombineMode::Sum,
            ))
            .with_edge(Edge::new(
                "p",
                Endpoint::port("src", "out"),
                Endpoint::bus("energy"),
            ))
            .with_edge(Edge::new(
                "l",
                Endpoint::bus("energy"),
                Endpoint::port("sink", "in"),
            ));
        let mut diags = DiagSink::new();
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let order = order(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        let src = position(&order, &OrderNode::Block(BlockId::new("src")));
        let bus = position(&order, &OrderNode::Bus(BusId::new("energy")));
        let sink = position(&order, &OrderNode::Block(BlockId::new("sink")));
        assert!(src < bus && bus < sink);
    }

    #[test]
    fn pure_cycle_is_fatal() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("x", "Add"))
            .with_block(Block::new("y", "Add"))
            .with_edge(Edge::new(
                "e1",
                Endpoint::port("x", "out"),
                Endpoint::port("y", "a"),
            ))
            .with_edge(Edge::new(
                "e2",
                Endpoint::port("y", "out"),
                Endpoint::port("x", "a"),
            ));
        let mut diags = DiagSink::new();
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let _ = order(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        assert!(diags.has_fatal());
        assert!(diags
            .diagnostics()
            .iter()
            .any(|d| d.code == DiagCode::CycleDetected));
    }

    #[test]
    fn state_cycle_is_allowed() {
        let regs = Registries::standard();
        let patch = Patch::new()
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
        let mut diags = DiagSink::new();
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let order = order(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        assert!(!diags.has_fatal());
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn order_is_canonical_for_independent_nodes() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("b", "ConstFloat"))
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("c", "ConstFloat"));
        let mut diags = DiagSink::new();
        let norm = normalize(&patch, &regs.blocks, &mut diags);
        let order = order(&norm, &regs.blocks, &BTreeSet::new(), &mut diags);
        let names: Vec<_> = order
            .iter()
            .map(|n| match n {
                OrderNode::Block(b) => b.as_str().to_owned(),
                OrderNode::Bus(b) => b.as_str().to_owned(),
            })
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
