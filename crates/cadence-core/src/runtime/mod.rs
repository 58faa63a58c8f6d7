// SPDX-License-Identifier: Apache-2.0
//! The scheduled runtime evaluator.
//!
//! One [`ScheduleExecutor`] drives a frozen program frame by frame:
//! time resolution with scrub detection, cached signal evaluation, lazy
//! field materialization, stateful operators over the persistent state
//! buffer, one-shot events, render assembly, and debug probes.

mod executor;
mod kernels;
mod probe;
mod render;
mod stores;
mod time;

pub use executor::{FrameInput, FrameOutput, ScheduleExecutor};
pub use kernels::{apply_binary, apply_indexed, apply_unary, hash01, hsl_to_rgb};
pub use probe::{encode_record, TraceController, TraceMode, TraceRing, DEFAULT_RING_CAPACITY};
pub use stores::{EventPayload, EventStore, StateStore, ValueStore};
pub use time::{
    resolve_time, PlayMode, TimeResolution, TimeState, WrapEvent, SCRUB_DELTA_MS,
};

use crate::types::TypeDesc;
use crate::value::Value;

/// A materialized field: one value per element.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBuffer {
    /// Element type.
    pub ty: TypeDesc,
    /// Element values, index-major.
    pub values: Vec<Value>,
}

impl FieldBuffer {
    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the buffer has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
