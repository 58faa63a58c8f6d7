// SPDX-License-Identifier: Apache-2.0
//! Pass 2 — type graph.
//!
//! Builds each edge's endpoint types from port declarations and bus types,
//! composes the transform chain type-wise, and checks compatibility at both
//! seams. Failed edges are reported and excluded from writer resolution;
//! compilation continues so every mismatch in the patch is surfaced at once.

use std::collections::BTreeSet;

use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::EdgeId;
use crate::patch::{Edge, Endpoint};
use crate::registry::{BlockRegistry, TransformKind, TransformRegistry};
use crate::types::{is_compatible, TypeDesc};

use super::normalize::Normalized;

fn endpoint_type(
    norm: &Normalized,
    blocks: &BlockRegistry,
    endpoint: &Endpoint,
    is_output: bool,
) -> Option<TypeDesc> {
    match endpoint {
        Endpoint::Port { block, port } => {
            let b = norm.blocks.get(block)?;
            let def = blocks.lookup(&b.block_type)?;
            if is_output {
                def.output(port.as_str()).map(|p| p.ty)
            } else {
                def.input(port.as_str()).map(|p| p.ty)
            }
        }
        Endpoint::Bus(bus) => norm.buses.get(bus).map(|b| b.ty),
    }
}

fn check_edge(
    norm: &Normalized,
    blocks: &BlockRegistry,
    transforms: &TransformRegistry,
    edge: &Edge,
    diags: &mut DiagSink,
) -> bool {
    let (Some(from_ty), Some(to_ty)) = (
        endpoint_type(norm, blocks, &edge.from, true),
        endpoint_type(norm, blocks, &edge.to, false),
    ) else {
        // Endpoint failures were already diagnosed in pass 1.
        return false;
    };

    let mut cur = from_ty;
    for step in &edge.transforms {
        let Some(def) = transforms.lookup(&step.transform) else {
            diags.emit(
                DiagCode::AdapterNotFound,
                format!("transform {} is not registered", step.transform),
                Where::edge(&edge.id),
            );
            return false;
        };
        if !is_compatible(&cur, &def.input) {
            let code = match def.kind {
                TransformKind::Adapter => DiagCode::AdapterChainIncompatible,
                TransformKind::Lens => DiagCode::TransformIncompatible,
            };
            diags.emit(
                code,
                format!(
                    "transform {} expects {:?}/{:?}, chain carries {:?}/{:?}",
                    step.transform, def.input.world, def.input.domain, cur.world, cur.domain
                ),
                Where::edge(&edge.id),
            );
            return false;
        }
        cur = def.output;
    }

    if !is_compatible(&cur, &to_ty) {
        diags.emit(
            DiagCode::TypeMismatch,
            format!(
                "expected {:?}/{:?}, got {:?}/{:?}",
                to_ty.world, to_ty.domain, cur.world, cur.domain
            ),
            Where::edge(&edge.id),
        );
        return false;
    }
    true
}

/// Type-checks every edge; returns the set of edges that failed.
#[must_use]
pub fn typecheck(
    norm: &Normalized,
    blocks: &BlockRegistry,
    transforms: &TransformRegistry,
    diags: &mut DiagSink,
) -> BTreeSet<EdgeId> {
    let mut failed = BTreeSet::new();
    for edge in norm
        .wires
        .iter()
        .chain(&norm.publishers)
        .chain(&norm.listeners)
    {
        if !check_edge(norm, blocks, transforms, edge, diags) {
            failed.insert(edge.id.clone());
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;
    use crate::passes::normalize::normalize;
    use crate::patch::{Block, Patch, TransformStep};
    use crate::registry::Registries;

    fn check(patch: &Patch) -> (BTreeSet<EdgeId>, Vec<crate::diag::Diagnostic>) {
        let regs = Registries::standard();
        let mut diags = DiagSink::new();
        let norm = normalize(patch, &regs.blocks, &mut diags);
        let failed = typecheck(&norm, &regs.blocks, &regs.transforms, &mut diags);
        (failed, diags.into_diagnostics())
    }

    #[test]
    fn matching_edge_passes() {
        let patch = Patch::new()
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("m", "Mixer"))
            .with_edge(Edge::new(
                "e",
                Endpoint::port("a", "out"),
                Endpoint::port("m", "in"),
            ));
        let (failed, diags) = check(&patch);
        assert!(failed.is_empty());
        assert!(diags.iter().all(|d| d.severity < Severity::Error));
    }

    #[test]
    fn mismatched_edge_without_adapter_fails() {
        let patch = Patch::new()
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("s", "FieldSpread"))
            // Float output into a vec2-field "src"-less input: use jitter's src.
            .with_block(Block::new("j", "FieldJitter"))
            .with_edge(Edge::new(
                "bad",
                Endpoint::port("a", "out"),
                Endpoint::port("j", "src"),
            ));
        let (failed, diags) = check(&patch);
        assert!(failed.contains(&EdgeId::new("bad")));
        assert!(diags
            .iter()
            .any(|d| d.code == DiagCode::TypeMismatch && d.where_.edge.is_some()));
    }

    #[test]
    fn adapter_bridges_the_mismatch() {
        // Scenario F shape: float → vec2 via registered adapter.
        let patch = Patch::new()
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("j", "FieldJitter"))
            .with_edge(
                Edge::new("e", Endpoint::port("a", "out"), Endpoint::port("j", "src"))
                    .with_transform(TransformStep::new("float_to_vec2")),
            );
        let (failed, _) = check(&patch);
        assert!(failed.is_empty());
    }

    #[test]
    fn unknown_transform_is_reported() {
        let patch = Patch::new()
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("m", "Mixer"))
            .with_edge(
                Edge::new("e", Endpoint::port("a", "out"), Endpoint::port("m", "in"))
                    .with_transform(TransformStep::new("no_such_transform")),
            );
        let (failed, diags) = check(&patch);
        assert!(failed.contains(&EdgeId::new("e")));
        assert!(diags.iter().any(|d| d.code == DiagCode::AdapterNotFound));
    }

    #[test]
    fn incompatible_chain_step_is_reported() {
        // color_alpha expects a color; the chain carries a float.
        let patch = Patch::new()
            .with_block(Block::new("a", "ConstFloat"))
            .with_block(Block::new("m", "Mixer"))
            .with_edge(
                Edge::new("e", Endpoint::port("a", "out"), Endpoint::port("m", "in"))
                    .with_transform(TransformStep::new("color_alpha")),
            );
        let (failed, diags) = check(&patch);
        assert!(failed.contains(&EdgeId::new("e")));
        assert!(diags
            .iter()
            .any(|d| d.code == DiagCode::TransformIncompatible));
    }
}
