// SPDX-License-Identifier: Apache-2.0
//! Debug probe trace rings.
//!
//! Probe records are compact little-endian binary frames appended to
//! per-probe ring buffers, but only while the controller is capturing.
//! Record layout:
//!
//! - byte 0: mode tag (0 scalar, 1 vec2, 2 color, 3 field-stats)
//! - bytes 1..9: frame index (u64 LE)
//! - remainder: payload lanes (f32 LE each); field-stats carries
//!   min, mean, max.

use std::collections::VecDeque;

use bytes::{BufMut, Bytes, BytesMut};

use crate::ir::ProbeMode;

/// Capture state of the trace controller.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TraceMode {
    /// Probes are skipped entirely.
    #[default]
    Off,
    /// Probe steps append records.
    Capturing,
}

/// Default per-probe ring capacity (records).
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// One probe's ring buffer of encoded records.
#[derive(Debug)]
pub struct TraceRing {
    capacity: usize,
    records: VecDeque<Bytes>,
}

impl TraceRing {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(64)),
        }
    }

    fn push(&mut self, record: Bytes) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.records.iter()
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn mode_tag(mode: ProbeMode) -> u8 {
    match mode {
        ProbeMode::Scalar => 0,
        ProbeMode::Vec2 => 1,
        ProbeMode::Color => 2,
        ProbeMode::FieldStats => 3,
    }
}

/// Encodes one probe record.
#[must_use]
pub fn encode_record(mode: ProbeMode, frame_index: u64, lanes: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(9 + lanes.len() * 4);
    buf.put_u8(mode_tag(mode));
    buf.put_u64_le(frame_index);
    for lane in lanes {
        buf.put_f32_le(*lane);
    }
    buf.freeze()
}

/// Owns the capture mode and the per-probe rings.
#[derive(Debug, Default)]
pub struct TraceController {
    mode: TraceMode,
    rings: Vec<TraceRing>,
}

impl TraceController {
    /// Creates a controller in [`TraceMode::Off`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current capture mode.
    #[must_use]
    pub fn mode(&self) -> TraceMode {
        self.mode
    }

    /// Switches capture on or off. Rings persist across switches.
    pub fn set_mode(&mut self, mode: TraceMode) {
        self.mode = mode;
    }

    /// True when probe steps should record.
    #[must_use]
    pub fn capturing(&self) -> bool {
        self.mode == TraceMode::Capturing
    }

    /// Sizes the ring set to the program's probe table.
    pub fn ensure_rings(&mut self, probe_count: usize) {
        while self.rings.len() < probe_count {
            self.rings.push(TraceRing::new(DEFAULT_RING_CAPACITY));
        }
        self.rings.truncate(probe_count);
    }

    /// Appends a record to a probe's ring (capturing mode only).
    pub fn record(&mut self, probe: usize, mode: ProbeMode, frame_index: u64, lanes: &[f32]) {
        if self.mode != TraceMode::Capturing {
            return;
        }
        if let Some(ring) = self.rings.get_mut(probe) {
            ring.push(encode_record(mode, frame_index, lanes));
        }
    }

    /// Read access to a probe's ring.
    #[must_use]
    pub fn ring(&self, probe: usize) -> Option<&TraceRing> {
        self.rings.get(probe)
    }
}
