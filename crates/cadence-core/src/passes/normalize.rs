// SPDX-License-Identifier: Apache-2.0
//! Pass 1 — normalization.
//!
//! Assigns stable iteration order (by id), partitions edges by endpoint kind
//! (wires, publishers, listeners), validates endpoint existence, and rejects
//! bus-to-bus edges. Disabled edges are dropped here; nothing downstream
//! sees them.

use std::collections::BTreeMap;

use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{BlockId, BusId};
use crate::patch::{Block, Bus, Edge, Endpoint, Patch};
use crate::registry::BlockRegistry;

/// The partitioned patch every later pass consumes.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Blocks in id order.
    pub blocks: BTreeMap<BlockId, Block>,
    /// Buses in id order.
    pub buses: BTreeMap<BusId, Bus>,
    /// Port → port edges, in id order.
    pub wires: Vec<Edge>,
    /// Port → bus edges, in id order.
    pub publishers: Vec<Edge>,
    /// Bus → port edges, in id order.
    pub listeners: Vec<Edge>,
}

fn validate_port(
    norm: &Normalized,
    blocks: &BlockRegistry,
    edge: &Edge,
    endpoint: &Endpoint,
    is_output: bool,
    diags: &mut DiagSink,
) -> bool {
    let Endpoint::Port { block, port } = endpoint else {
        return true;
    };
    let Some(b) = norm.blocks.get(block) else {
        diags.emit(
            DiagCode::InvalidEndpoint,
            format!("edge references missing block {}", block.as_str()),
            Where::edge(&edge.id),
        );
        return false;
    };
    let Some(def) = blocks.lookup(&b.block_type) else {
        // Already fatal in pass 0; avoid a duplicate diagnostic here.
        return false;
    };
    let found = if is_output {
        def.output(port.as_str()).is_some()
    } else {
        def.input(port.as_str()).is_some()
    };
    if !found {
        let direction = if is_output { "output" } else { "input" };
        diags.emit(
            DiagCode::InvalidEndpoint,
            format!(
                "block {} has no {direction} port {}",
                block.as_str(),
                port.as_str()
            ),
            Where::edge(&edge.id),
        );
    }
    found
}

fn validate_bus(norm: &Normalized, edge: &Edge, endpoint: &Endpoint, diags: &mut DiagSink) -> bool {
    let Endpoint::Bus(bus) = endpoint else {
        return true;
    };
    if norm.buses.contains_key(bus) {
        return true;
    }
    diags.emit(
        DiagCode::InvalidEndpoint,
        format!("edge references missing bus {}", bus.as_str()),
        Where::edge(&edge.id),
    );
    false
}

/// Normalizes a patch: stable order, edge partition, endpoint validation.
#[must_use]
pub fn normalize(patch: &Patch, blocks: &BlockRegistry, diags: &mut DiagSink) -> Normalized {
    let mut norm = Normalized::default();

    for block in &patch.blocks {
        if norm
            .blocks
            .insert(block.id.clone(), block.clone())
            .is_some()
        {
            diags.emit(
                DiagCode::InvalidEndpoint,
                format!("duplicate block id {}", block.id.as_str()),
                Where::block(&block.id),
            );
        }
    }
    for bus in &patch.buses {
        if norm.buses.insert(bus.id.clone(), bus.clone()).is_some() {
            diags.emit(
                DiagCode::InvalidEndpoint,
                format!("duplicate bus id {}", bus.id.as_str()),
                Where::bus(&bus.id),
            );
        }
    }

    let mut edges: Vec<&Edge> = patch.edges.iter().filter(|e| e.enabled).collect();
    edges.sort_by(|a, b| a.id.cmp(&b.id));

    for edge in edges {
        match (&edge.from, &edge.to) {
            (Endpoint::Bus(_), Endpoint::Bus(_)) => {
                diags.emit(
                    DiagCode::BusToBusEdge,
                    "bus-to-bus edges are illegal",
                    Where::edge(&edge.id),
                );
            }
            (Endpoint::Port { .. }, Endpoint::Port { .. }) => {
                let from_ok = validate_port(&norm, blocks, edge, &edge.from, true, diags);
                let to_ok = validate_port(&norm, blocks, edge, &edge.to, false, diags);
                if from_ok && to_ok {
                    norm.wires.push(edge.clone());
                }
            }
            (Endpoint::Port { .. }, Endpoint::Bus(_)) => {
                let from_ok = validate_port(&norm, blocks, edge, &edge.from, true, diags);
                let to_ok = validate_bus(&norm, edge, &edge.to, diags);
                if from_ok && to_ok {
                    norm.publishers.push(edge.clone());
                }
            }
            (Endpoint::Bus(_), Endpoint::Port { .. }) => {
                let from_ok = validate_bus(&norm, edge, &edge.from, diags);
                let to_ok = validate_port(&norm, blocks, edge, &edge.to, false, diags);
                if from_ok && to_ok {
                    norm.listeners.push(edge.clone());
                }
            }
        }
    }

    norm
}
