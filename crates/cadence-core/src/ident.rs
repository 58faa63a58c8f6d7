// SPDX-License-Identifier: Apache-2.0
//! Identifier types and stable-key hashing.
//!
//! Two id families coexist:
//!
//! - **Patch-level ids** (`BlockId`, `EdgeId`, `BusId`, `PortId`) wrap the
//!   editor-supplied strings. Their `Ord` is plain string order, which is the
//!   tie-break the writer/publisher ordering contract depends on.
//! - **Dense runtime ids** (`SigExprId`, `FieldExprId`, `ValueSlot`,
//!   `ConstId`, `EventSlot`) are contiguous `u32` indexes into the frozen
//!   program tables. They are never meaningful across programs.
//!
//! [`StateKey`] bridges the two worlds: a 32-byte blake3 hash of the owning
//! block and port, stable across recompiles, keying the persistent state
//! buffer.

use blake3::Hasher;

/// Canonical 256-bit hash used for recompile-stable keys.
pub type Hash = [u8; 32];

/// Editor-supplied identifier for a block in the patch.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockId(pub String);

impl BlockId {
    /// Wraps an editor-supplied id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Editor-supplied identifier for an edge in the patch.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Wraps an editor-supplied id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier for a named bus.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusId(pub String);

impl BusId {
    /// Wraps an editor-supplied bus name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier for an input or output port on a block.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortId(pub String);

impl PortId {
    /// Wraps a port id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Dense index into the signal expression table.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SigExprId(pub u32);

impl SigExprId {
    /// Returns the table index for this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index into the field expression table.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldExprId(pub u32);

impl FieldExprId {
    /// Returns the table index for this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index into the per-frame value store.
///
/// A bundle of arity `k` allocated at slot `s` occupies `[s, s + k)`; the
/// base slot holds the bundle value, the remainder of the range is reserved.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValueSlot(pub u32);

impl ValueSlot {
    /// Returns the store index for this slot.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index into the constant pool.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstId(pub u32);

impl ConstId {
    /// Returns the pool index for this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense index into the per-frame event store.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventSlot(pub u32);

impl EventSlot {
    /// Returns the store index for this slot.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Recompile-stable key for one persistent state cell.
///
/// Derived from the owning block id and port via [`make_state_key`], so a
/// recompile of an unchanged patch addresses the same cells and a renamed
/// block deliberately gets fresh state.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateKey(pub Hash);

impl StateKey {
    /// Returns the canonical byte representation of this key.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Produces a stable, domain-separated state key (prefix `b"state:"`) using BLAKE3.
pub fn make_state_key(block: &BlockId, port: &str) -> StateKey {
    let mut hasher = Hasher::new();
    hasher.update(b"state:");
    hasher.update(block.as_str().as_bytes());
    hasher.update(b":");
    hasher.update(port.as_bytes());
    StateKey(hasher.finalize().into())
}

/// Produces a stable, domain-separated probe id (prefix `b"probe:"`) using BLAKE3.
pub fn make_probe_id(label: &str) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"probe:");
    hasher.update(label.as_bytes());
    hasher.finalize().into()
}
