// SPDX-License-Identifier: Apache-2.0
//! The runtime's three buffers.
//!
//! - [`ValueStore`]: dense per-frame slot values, reset every frame.
//! - [`EventStore`]: one-shot triggers with payloads, reset every frame.
//! - [`StateStore`]: persistent cells keyed by [`StateKey`], surviving
//!   frames *and* recompiles; a program swap prunes cells the new program
//!   no longer addresses.
//!
//! Only the executor thread touches any of these during a frame.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::ident::{EventSlot, StateKey, ValueSlot};
use crate::ir::CompiledProgramIR;
use crate::value::Value;

/// Dense per-frame value store.
#[derive(Debug, Default)]
pub struct ValueStore {
    slots: Vec<Value>,
}

impl ValueStore {
    /// Creates an empty store; [`ValueStore::reset`] sizes it to a program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes the store to the program and fills every slot with its type's
    /// default.
    pub fn reset(&mut self, program: &CompiledProgramIR) {
        self.slots.clear();
        self.slots
            .resize(program.slot_count as usize, Value::Float(0.0));
        for meta in &program.slot_meta {
            if let Some(slot) = self.slots.get_mut(meta.slot.index()) {
                *slot = Value::default_for(&meta.ty);
            }
        }
    }

    /// Reads a slot (type default for out-of-range reads).
    #[must_use]
    pub fn get(&self, slot: ValueSlot) -> Value {
        self.slots
            .get(slot.index())
            .copied()
            .unwrap_or(Value::Float(0.0))
    }

    /// Writes a slot; out-of-range writes are dropped.
    pub fn set(&mut self, slot: ValueSlot, value: Value) {
        if let Some(v) = self.slots.get_mut(slot.index()) {
            *v = value;
        }
    }
}

/// One-shot event payload: a small named-value map.
pub type EventPayload = BTreeMap<String, Value>;

/// One-shot event store, reset at the start of every frame.
///
/// Events are discrete edges; storing them as 0/1 in the value store would
/// conflate "fired this frame" with "has value zero".
#[derive(Debug, Default)]
pub struct EventStore {
    slots: Vec<Option<EventPayload>>,
}

impl EventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes the store and clears every slot.
    pub fn reset(&mut self, event_slot_count: u32) {
        self.slots.clear();
        self.slots.resize(event_slot_count as usize, None);
    }

    /// Marks a slot triggered; last trigger within a frame wins the payload.
    pub fn trigger(&mut self, slot: EventSlot, payload: EventPayload) {
        if let Some(s) = self.slots.get_mut(slot.index()) {
            *s = Some(payload);
        }
    }

    /// True when the slot fired this frame.
    #[must_use]
    pub fn check(&self, slot: EventSlot) -> bool {
        self.slots
            .get(slot.index())
            .is_some_and(Option::is_some)
    }

    /// The payload, when the slot fired this frame.
    #[must_use]
    pub fn payload(&self, slot: EventSlot) -> Option<&EventPayload> {
        self.slots.get(slot.index()).and_then(Option::as_ref)
    }
}

/// Persistent per-operator state, keyed by recompile-stable [`StateKey`]s.
#[derive(Debug, Default)]
pub struct StateStore {
    cells: FxHashMap<StateKey, Value>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a cell.
    #[must_use]
    pub fn get(&self, key: StateKey) -> Option<Value> {
        self.cells.get(&key).copied()
    }

    /// Writes a cell.
    pub fn set(&mut self, key: StateKey, value: Value) {
        self.cells.insert(key, value);
    }

    /// Drops every cell the new program does not address; kept cells retain
    /// their exact values.
    pub fn retain_keys(&mut self, keys: &BTreeSet<StateKey>) {
        self.cells.retain(|k, _| keys.contains(k));
    }

    /// Number of live cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when no cells are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
