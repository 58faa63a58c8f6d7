// SPDX-License-Identifier: Apache-2.0
//! Time resolution and scrub detection.
//!
//! Every frame starts by resolving the caller's absolute time against the
//! program's time model: model time, normalized phase, and — for cyclic
//! models crossing a period boundary in forward playback — a one-shot wrap
//! event. Scrubbed frames advance time normally but never fire wraps and
//! never integrate phantom state time.

use crate::ir::{CycleMode, TimeModelIR};

/// Frames whose |delta| exceeds this are treated as scrubs even in
/// playback mode.
pub const SCRUB_DELTA_MS: f64 = 1000.0;

/// How the caller is driving time this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PlayMode {
    /// Normal forward playback.
    #[default]
    Playback,
    /// Interactive scrubbing; events are suppressed.
    Scrub,
}

/// Carry-over between frames: what the previous frame saw.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeState {
    prev_abs_ms: Option<f64>,
    prev_cycle: i64,
}

/// Payload of a wrap event.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct WrapEvent {
    /// Phase just after the wrap.
    pub phase: f32,
    /// Completed cycle count at the wrap.
    pub count: u64,
    /// Frame delta that carried across the boundary.
    pub delta_ms: f64,
}

/// The time-derive step's full result.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TimeResolution {
    /// Absolute time, as supplied.
    pub abs_ms: f64,
    /// Model time in ms.
    pub model_ms: f64,
    /// Normalized phase in `[0, 1)` (progress for finite models; 0 for
    /// infinite).
    pub phase01: f32,
    /// Wrap event, when a cyclic boundary was crossed in playback.
    pub wrap: Option<WrapEvent>,
    /// Whether this frame is a scrub.
    pub is_scrub: bool,
    /// Delta against the previous frame (0 on the first).
    pub delta_ms: f64,
    pub(crate) cycle: i64,
}

#[allow(clippy::cast_possible_truncation)]
fn cycle_of(t: f64, period: f64) -> i64 {
    libm::floor(t / period) as i64
}

/// Resolves one frame's time against the model.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn resolve_time(
    tm: &TimeModelIR,
    t_abs_ms: f64,
    mode: PlayMode,
    prev: &TimeState,
) -> TimeResolution {
    let delta_ms = prev.prev_abs_ms.map_or(0.0, |p| t_abs_ms - p);
    let is_scrub =
        mode == PlayMode::Scrub || delta_ms < 0.0 || delta_ms.abs() > SCRUB_DELTA_MS;

    match tm {
        TimeModelIR::Finite { duration_ms } => {
            let model_ms = t_abs_ms.clamp(0.0, *duration_ms);
            TimeResolution {
                abs_ms: t_abs_ms,
                model_ms,
                phase01: (model_ms / duration_ms) as f32,
                wrap: None,
                is_scrub,
                delta_ms,
                cycle: 0,
            }
        }
        TimeModelIR::Infinite { .. } => TimeResolution {
            abs_ms: t_abs_ms,
            model_ms: t_abs_ms,
            phase01: 0.0,
            wrap: None,
            is_scrub,
            delta_ms,
            cycle: 0,
        },
        TimeModelIR::Cyclic { period_ms, mode: cycle_mode } => {
            let cycle = cycle_of(t_abs_ms, *period_ms);
            let model_ms = t_abs_ms - (cycle as f64) * period_ms;
            let frac = (model_ms / period_ms) as f32;
            let phase01 = match cycle_mode {
                CycleMode::Loop => frac,
                CycleMode::PingPong => {
                    if cycle.rem_euclid(2) == 0 {
                        frac
                    } else {
                        1.0 - frac
                    }
                }
            };
            // One wrap per boundary-crossing frame, playback only, never on
            // the first frame.
            let crossed =
                prev.prev_abs_ms.is_some() && cycle > prev.prev_cycle && delta_ms > 0.0;
            let wrap = (crossed && !is_scrub).then(|| WrapEvent {
                phase: phase01,
                count: u64::try_from(cycle).unwrap_or(0),
                delta_ms,
            });
            TimeResolution {
                abs_ms: t_abs_ms,
                model_ms,
                phase01,
                wrap,
                is_scrub,
                delta_ms,
                cycle,
            }
        }
    }
}

impl TimeState {
    /// Records this frame's resolution as the next frame's carry-over.
    pub fn advance(&mut self, resolution: &TimeResolution) {
        self.prev_abs_ms = Some(resolution.abs_ms);
        self.prev_cycle = resolution.cycle;
    }
}
