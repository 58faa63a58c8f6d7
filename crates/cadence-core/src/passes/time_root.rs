// SPDX-License-Identifier: Apache-2.0
//! Pass 3 — time-root extraction.
//!
//! Enforces the one-time-root rule, derives the program's time model from
//! the root's parameters, and registers the root's auto-publications:
//! cyclic roots publish `phase` → `phaseA` and `wrap` → `pulse`, finite
//! roots publish `progress` → `progress`. Auto-created buses default to
//! last-writer combine; auto-published edges get `sort_key` 0.

use crate::blocks::{auto_publications, derive_time_model};
use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::BusId;
use crate::ir::TimeModelIR;
use crate::patch::{Bus, BusCombineMode, Edge, Endpoint};
use crate::registry::BlockRegistry;

use super::normalize::Normalized;

/// Extracts the time model and registers auto-publications.
///
/// Returns `None` (with a fatal diagnostic) when the patch has no time root
/// or more than one.
pub fn extract_time_root(
    norm: &mut Normalized,
    blocks: &BlockRegistry,
    diags: &mut DiagSink,
) -> Option<TimeModelIR> {
    let roots: Vec<_> = norm
        .blocks
        .values()
        .filter(|b| {
            blocks
                .lookup(&b.block_type)
                .is_some_and(|def| def.time_root)
        })
        .cloned()
        .collect();

    let root = match roots.as_slice() {
        [] => {
            diags.emit(
                DiagCode::MissingTimeRoot,
                "patch has no time root",
                Where::default(),
            );
            return None;
        }
        [root] => root.clone(),
        [_, extra, ..] => {
            diags.emit(
                DiagCode::MultipleTimeRoots,
                format!("{} time roots in one patch", roots.len()),
                Where::block(&extra.id),
            );
            return None;
        }
    };

    let model = derive_time_model(&root)?;

    let root_def = blocks.lookup(&root.block_type)?;
    for (port, bus_name) in auto_publications(&root.block_type) {
        let bus_id = BusId::new(*bus_name);
        if !norm.buses.contains_key(&bus_id) {
            let ty = root_def.output(port).map(|p| p.ty)?;
            norm.buses
                .insert(bus_id.clone(), Bus::new(*bus_name, ty, BusCombineMode::Last));
        }
        let edge_id = format!("{}_auto_{}", root.id.as_str(), port);
        norm.publishers.push(
            Edge::new(
                edge_id,
                Endpoint::Port {
                    block: root.id.clone(),
                    port: crate::ident::PortId::new(*port),
                },
                Endpoint::Bus(bus_id.clone()),
            )
            .with_sort_key(0),
        );
        diags.emit(
            DiagCode::AutoPublication,
            format!("{} auto-publishes {port} to {bus_name}", root.id.as_str()),
            Where::bus(&bus_id),
        );
    }

    Some(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;
    use crate::ir::CycleMode;
    use crate::passes::normalize::normalize;
    use crate::patch::{Block, Patch};
    use crate::registry::Registries;
    use crate::value::Value;

    #[test]
    fn single_cycle_root_derives_and_publishes() {
        let regs = Registries::standard();
        let patch = Patch::new().with_block(
            Block::new("root", "CycleTimeRoot").with_param("period_ms", Value::Float(1000.0)),
        );
        let mut diags = DiagSink::new();
        let mut norm = normalize(&patch, &regs.blocks, &mut diags);
        let model = extract_time_root(&mut norm, &regs.blocks, &mut diags);
        assert_eq!(
            model,
            Some(TimeModelIR::Cyclic {
                period_ms: 1000.0,
                mode: CycleMode::Loop
            })
        );
        assert!(norm.buses.contains_key(&BusId::new("phaseA")));
        assert!(norm.buses.contains_key(&BusId::new("pulse")));
        assert_eq!(norm.publishers.len(), 2);
        assert!(diags
            .diagnostics()
            .iter()
            .any(|d| d.code == DiagCode::AutoPublication && d.severity == Severity::Info));
    }

    #[test]
    fn missing_root_is_fatal() {
        let regs = Registries::standard();
        let patch = Patch::new().with_block(Block::new("c", "ConstFloat"));
        let mut diags = DiagSink::new();
        let mut norm = normalize(&patch, &regs.blocks, &mut diags);
        assert!(extract_time_root(&mut norm, &regs.blocks, &mut diags).is_none());
        assert!(diags
            .diagnostics()
            .iter()
            .any(|d| d.code == DiagCode::MissingTimeRoot));
    }

    #[test]
    fn two_roots_are_fatal() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("a", "CycleTimeRoot"))
            .with_block(Block::new("b", "FiniteTimeRoot"));
        let mut diags = DiagSink::new();
        let mut norm = normalize(&patch, &regs.blocks, &mut diags);
        assert!(extract_time_root(&mut norm, &regs.blocks, &mut diags).is_none());
        assert!(diags
            .diagnostics()
            .iter()
            .any(|d| d.code == DiagCode::MultipleTimeRoots));
    }

    #[test]
    fn infinite_root_publishes_nothing() {
        let regs = Registries::standard();
        let patch = Patch::new().with_block(Block::new("root", "InfiniteTimeRoot"));
        let mut diags = DiagSink::new();
        let mut norm = normalize(&patch, &regs.blocks, &mut diags);
        let model = extract_time_root(&mut norm, &regs.blocks, &mut diags);
        assert!(matches!(model, Some(TimeModelIR::Infinite { .. })));
        assert!(norm.publishers.is_empty());
        assert!(norm.buses.is_empty());
    }

    #[test]
    fn declared_bus_is_not_replaced() {
        let regs = Registries::standard();
        let patch = Patch::new()
            .with_block(Block::new("root", "CycleTimeRoot"))
            .with_bus(Bus::new(
                "phaseA",
                crate::types::TypeDesc::signal(crate::types::Domain::Phase01),
                BusCombineMode::Last,
            ));
        let mut diags = DiagSink::new();
        let mut norm = normalize(&patch, &regs.blocks, &mut diags);
        let _ = extract_time_root(&mut norm, &regs.blocks, &mut diags);
        assert_eq!(norm.buses.len(), 2);
    }
}
