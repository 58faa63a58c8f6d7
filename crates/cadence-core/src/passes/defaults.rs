// SPDX-License-Identifier: Apache-2.0
//! Pass 0 — default-source materialization.
//!
//! Every block input with no driving edge and a declared default source gets
//! a hidden constant-provider block plus a wire from it. Provider ids are
//! derived from the owning block and port, so recompiles of the same patch
//! materialize byte-identical providers and the pass is idempotent: a second
//! run sees every defaulted input already driven.

use std::collections::BTreeSet;

use crate::blocks::provider_type_for;
use crate::diag::{DiagCode, DiagSink, Where};
use crate::ident::{BlockId, PortId};
use crate::patch::{Block, BlockRole, Edge, Endpoint, Patch};
use crate::registry::BlockRegistry;

/// Deterministic provider block id for an input.
#[must_use]
pub fn provider_block_id(block: &BlockId, port: &PortId) -> String {
    format!("{}_default_{}", block.as_str(), port.as_str())
}

/// Materializes default-source providers for unconnected inputs.
#[must_use]
pub fn materialize_defaults(
    patch: &Patch,
    blocks: &BlockRegistry,
    diags: &mut DiagSink,
) -> Patch {
    let mut out = patch.clone();

    // An input counts as driven only by an enabled edge.
    let mut driven: BTreeSet<(&BlockId, &PortId)> = BTreeSet::new();
    for edge in &patch.edges {
        if !edge.enabled {
            continue;
        }
        if let Endpoint::Port { block, port } = &edge.to {
            driven.insert((block, port));
        }
    }

    let mut new_blocks = Vec::new();
    let mut new_edges = Vec::new();

    for block in &patch.blocks {
        let Some(def) = blocks.lookup(&block.block_type) else {
            diags.emit(
                DiagCode::UnknownBlockType,
                format!("unknown block type {}", block.block_type),
                Where::block(&block.id),
            );
            continue;
        };
        for input in def.inputs {
            let port = PortId::new(input.id);
            if driven.contains(&(&block.id, &port)) {
                continue;
            }
            let Some(default) = input.default_source else {
                // No default and no edge: pass 5 reports UnconnectedInput.
                continue;
            };
            let Some(provider_type) = provider_type_for(input.ty.world, input.ty.domain) else {
                diags.emit(
                    DiagCode::MaterializationFailed,
                    format!(
                        "no constant provider for {:?}/{:?}",
                        input.ty.world, input.ty.domain
                    ),
                    Where::port(&block.id, &port),
                );
                continue;
            };
            let provider_id = provider_block_id(&block.id, &port);
            let mut provider = Block::new(provider_id.clone(), provider_type);
            provider.hidden = true;
            provider.role = Some(BlockRole::DefaultSourceProvider);
            provider.params.insert("value".to_owned(), default);
            new_blocks.push(provider);
            new_edges.push(Edge::new(
                format!("{provider_id}_edge"),
                Endpoint::Port {
                    block: BlockId::new(provider_id),
                    port: PortId::new("out"),
                },
                Endpoint::Port {
                    block: block.id.clone(),
                    port,
                },
            ));
        }
    }

    out.blocks.extend(new_blocks);
    out.edges.extend(new_edges);
    out
}
