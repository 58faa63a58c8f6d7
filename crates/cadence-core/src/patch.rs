// SPDX-License-Identifier: Apache-2.0
//! The patch data model: what the editor hands the compiler.
//!
//! A patch is an unordered set of blocks and edges plus bus declarations.
//! Nothing here is interpreted — interpretation is the pipeline's job — but
//! the shapes enforce the one structural invariant edges carry from birth:
//! an endpoint is a port or a bus, and the type system downstream rejects
//! bus-to-bus.

use std::collections::BTreeMap;

use crate::ident::{BlockId, BusId, EdgeId, PortId};
use crate::types::TypeDesc;
use crate::value::Value;

/// Role marker for hidden compiler-managed blocks.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockRole {
    /// Materialized constant provider for an unconnected input.
    DefaultSourceProvider,
}

/// A node in the patch.
#[derive(Clone, PartialEq, Debug)]
pub struct Block {
    /// Editor-assigned id, unique within the patch.
    pub id: BlockId,
    /// Registered block type name.
    pub block_type: String,
    /// Compile-time configuration, parsed by the block's lowering.
    pub params: BTreeMap<String, Value>,
    /// Hidden blocks are compiler-managed and not editor-visible.
    pub hidden: bool,
    /// Role marker for hidden blocks.
    pub role: Option<BlockRole>,
}

impl Block {
    /// Creates a visible block with the given type and empty params.
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(id),
            block_type: block_type.into(),
            params: BTreeMap::new(),
            hidden: false,
            role: None,
        }
    }

    /// Adds a parameter (builder-style).
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// One end of an edge.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Endpoint {
    /// A port on a block.
    Port {
        /// Owning block.
        block: BlockId,
        /// Port on that block.
        port: PortId,
    },
    /// A named bus.
    Bus(BusId),
}

impl Endpoint {
    /// Convenience constructor for a port endpoint.
    pub fn port(block: impl Into<String>, port: impl Into<String>) -> Self {
        Self::Port {
            block: BlockId::new(block),
            port: PortId::new(port),
        }
    }

    /// Convenience constructor for a bus endpoint.
    pub fn bus(bus: impl Into<String>) -> Self {
        Self::Bus(BusId::new(bus))
    }
}

/// One step in an edge's transform chain (adapter or lens reference).
#[derive(Clone, PartialEq, Debug)]
pub struct TransformStep {
    /// Registered transform id.
    pub transform: String,
    /// Per-step parameters.
    pub params: BTreeMap<String, Value>,
}

impl TransformStep {
    /// Creates a parameterless step referencing a registered transform.
    pub fn new(transform: impl Into<String>) -> Self {
        Self {
            transform: transform.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a parameter (builder-style).
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// A directed connection between two endpoints.
#[derive(Clone, PartialEq, Debug)]
pub struct Edge {
    /// Editor-assigned id, unique within the patch.
    pub id: EdgeId,
    /// Source endpoint.
    pub from: Endpoint,
    /// Target endpoint.
    pub to: Endpoint,
    /// Adapter/lens chain applied source-to-target.
    pub transforms: Vec<TransformStep>,
    /// Disabled edges do not drive their target.
    pub enabled: bool,
    /// Optional blend weight (reserved for weighted combine modes).
    pub weight: Option<f32>,
    /// Primary ordering key among sibling writers; ties break by id.
    pub sort_key: i32,
}

impl Edge {
    /// Creates an enabled, untransformed edge with `sort_key` 0.
    pub fn new(id: impl Into<String>, from: Endpoint, to: Endpoint) -> Self {
        Self {
            id: EdgeId::new(id),
            from,
            to,
            transforms: Vec::new(),
            enabled: true,
            weight: None,
            sort_key: 0,
        }
    }

    /// Sets the sort key (builder-style).
    #[must_use]
    pub fn with_sort_key(mut self, sort_key: i32) -> Self {
        self.sort_key = sort_key;
        self
    }

    /// Appends a transform step (builder-style).
    #[must_use]
    pub fn with_transform(mut self, step: TransformStep) -> Self {
        self.transforms.push(step);
        self
    }

    /// Disables the edge (builder-style).
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Reduction applied when N ≥ 1 publishers target a bus.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BusCombineMode {
    /// Per-lane arithmetic sum.
    Sum,
    /// Sum divided by publisher count.
    Average,
    /// Per-lane maximum.
    Max,
    /// Per-lane minimum.
    Min,
    /// Highest `(sort_key, id)` publisher wins.
    #[default]
    Last,
    /// Domain-specific stacking (alpha-over for colors).
    Layer,
}

/// Reduction applied when N ≥ 2 writers target an input slot.
///
/// Superset of [`BusCombineMode`]: slots may additionally pick the first
/// writer, reject multi-input outright, or defer to a registered custom
/// reducer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CombineMode {
    /// Per-lane arithmetic sum.
    Sum,
    /// Sum divided by writer count.
    Average,
    /// Per-lane maximum.
    Max,
    /// Per-lane minimum.
    Min,
    /// Lowest `(kind, sort_key, id)` writer wins.
    First,
    /// Highest `(kind, sort_key, id)` writer wins.
    Last,
    /// Domain-specific stacking (alpha-over for colors).
    Layer,
    /// Compile error when more than one writer is present.
    Error,
    /// Registered custom reducer.
    Custom(&'static str),
}

impl From<BusCombineMode> for CombineMode {
    fn from(mode: BusCombineMode) -> Self {
        match mode {
            BusCombineMode::Sum => Self::Sum,
            BusCombineMode::Average => Self::Average,
            BusCombineMode::Max => Self::Max,
            BusCombineMode::Min => Self::Min,
            BusCombineMode::Last => Self::Last,
            BusCombineMode::Layer => Self::Layer,
        }
    }
}

/// When a slot's combine policy engages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CombineWhen {
    /// Identity for a single writer; reduce for N ≥ 2.
    Multi,
    /// Reduce for any writer count (including N = 1).
    Always,
}

/// Combine policy attached to an input slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CombinePolicy {
    /// When the reduction engages.
    pub when: CombineWhen,
    /// Reduction mode.
    pub mode: CombineMode,
}

impl Default for CombinePolicy {
    fn default() -> Self {
        Self {
            when: CombineWhen::Multi,
            mode: CombineMode::Last,
        }
    }
}

/// A named multi-writer rendezvous point.
#[derive(Clone, PartialEq, Debug)]
pub struct Bus {
    /// Bus name, unique within the patch.
    pub id: BusId,
    /// Declared value type; only core, bus-eligible types are legal.
    pub ty: TypeDesc,
    /// Reduction applied over publishers.
    pub combine: BusCombineMode,
}

impl Bus {
    /// Declares a bus.
    pub fn new(id: impl Into<String>, ty: TypeDesc, combine: BusCombineMode) -> Self {
        Self {
            id: BusId::new(id),
            ty,
            combine,
        }
    }
}

/// The user-authored graph: blocks, edges, buses.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Patch {
    /// Blocks, unordered.
    pub blocks: Vec<Block>,
    /// Edges, unordered.
    pub edges: Vec<Edge>,
    /// Bus declarations, unordered.
    pub buses: Vec<Bus>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a block (builder-style).
    #[must_use]
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Adds an edge (builder-style).
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Declares a bus (builder-style).
    #[must_use]
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.buses.push(bus);
        self
    }
}
