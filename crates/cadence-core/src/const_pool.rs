// SPDX-License-Identifier: Apache-2.0
//! Constant pool and dense slot allocation.

use rustc_hash::FxHashMap;

use crate::ident::{ConstId, ValueSlot};
use crate::ir::{SlotMeta, SlotOwner};
use crate::types::TypeDesc;
use crate::value::{Value, ValueBits};

/// Interning pool of program constants.
///
/// Interns structurally by bit pattern: two constants with identical bits
/// share a [`ConstId`], which keeps recompiled IR byte-identical and the
/// pool small. Distinct NaN payloads and signed zeros stay distinct.
#[derive(Debug, Default)]
pub struct ConstPool {
    values: Vec<Value>,
    interned: FxHashMap<ValueBits, ConstId>,
}

impl ConstPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a value, returning the existing id on a bit-exact match.
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&mut self, value: Value) -> ConstId {
        let bits = ValueBits::from(&value);
        if let Some(id) = self.interned.get(&bits) {
            return *id;
        }
        let id = ConstId(self.values.len() as u32);
        self.values.push(value);
        self.interned.insert(bits, id);
        id
    }

    /// Looks up a pooled value.
    #[must_use]
    pub fn get(&self, id: ConstId) -> Option<&Value> {
        self.values.get(id.index())
    }

    /// Consumes the pool, yielding the dense value table.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Issues contiguous [`ValueSlot`] ranges and records their metadata.
///
/// A bundle of arity `k` consumes `k` consecutive slots; the cursor never
/// rewinds, so allocated ranges are disjoint by construction.
#[derive(Debug, Default)]
pub struct SlotAllocator {
    cursor: u32,
    meta: Vec<SlotMeta>,
}

impl SlotAllocator {
    /// Creates an allocator with the cursor at slot 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a slot range for one value of `ty`, owned by `owner`.
    pub fn alloc(&mut self, ty: TypeDesc, owner: SlotOwner) -> ValueSlot {
        let arity = ty.arity();
        let slot = ValueSlot(self.cursor);
        self.cursor += arity;
        self.meta.push(SlotMeta {
            slot,
            ty,
            arity,
            owner,
        });
        slot
    }

    /// Total slots allocated so far (bundles included).
    #[must_use]
    pub fn slot_count(&self) -> u32 {
        self.cursor
    }

    /// Metadata in allocation order.
    #[must_use]
    pub fn meta(&self) -> &[SlotMeta] {
        &self.meta
    }

    /// Consumes the allocator, yielding the metadata table.
    #[must_use]
    pub fn into_meta(self) -> Vec<SlotMeta> {
        self.meta
    }
}
