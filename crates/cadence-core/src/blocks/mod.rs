// SPDX-License-Identifier: Apache-2.0
//! The standard block palette.
//!
//! Block definitions are plain consts; [`standard_registry`] assembles them
//! into the immutable registry the compiler consumes. Hosts embedding a
//! custom palette build their own [`BlockRegistry`] and register whichever
//! subsets they want.

mod field;
mod render;
mod signal;
mod sources;
mod time_roots;

pub use field::{FIELD_BROADCAST, FIELD_JITTER, FIELD_SPREAD, SPREAD_LAYOUT_LINE, SPREAD_LAYOUT_RING};
pub use render::{
    CLIP_GROUP, CLIP_SHAPE_CIRCLE, CLIP_SHAPE_RECT, MATERIAL_CIRCLE, MATERIAL_QUAD,
    MATERIAL_SOFT_CIRCLE, PATH_SHAPE_NGON, PATH_SHAPE_RECT, POSTFX_BLOOM, POSTFX_BLUR,
    POSTFX_COLOR_GRADE, POSTFX_VIGNETTE, POST_FX, RENDER_INSTANCES_2D, RENDER_PATHS_2D,
};
pub use signal::{
    ADD, CLAMP01, DELAY, HSL_TO_RGB, INTEGRATOR, MIXER, MULTIPLY, OSCILLATOR, OSC_SHAPE_SAW,
    OSC_SHAPE_SINE, OSC_SHAPE_SQUARE, OSC_SHAPE_TRIANGLE, PULSE_DIVIDER, SCALE, SLEW_LIMITER,
};
pub use sources::{provider_type_for, CONST_COLOR, CONST_FLOAT};
pub use time_roots::{
    auto_publications, derive_time_model, CYCLE_MODE_LOOP, CYCLE_MODE_PINGPONG, CYCLE_TIME_ROOT,
    FINITE_TIME_ROOT, INFINITE_TIME_ROOT,
};

use crate::registry::BlockRegistry;

/// Builds the registry holding the standard palette.
#[must_use]
pub fn standard_registry() -> BlockRegistry {
    let mut reg = BlockRegistry::new();
    let groups = [
        &[
            time_roots::CYCLE_TIME_ROOT,
            time_roots::FINITE_TIME_ROOT,
            time_roots::INFINITE_TIME_ROOT,
        ][..],
        sources::ALL,
        signal::ALL,
        field::ALL,
        render::ALL,
    ];
    for group in groups {
        for def in group {
            // Type names are distinct literals; duplicates cannot occur.
            let _ = reg.register(*def);
        }
    }
    reg
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn standard_palette_registers_every_family() {
        let reg = standard_registry();
        for name in [
            "CycleTimeRoot",
            "FiniteTimeRoot",
            "InfiniteTimeRoot",
            "DSConstSignalFloat",
            "DSConstFieldColor",
            "ConstFloat",
            "Oscillator",
            "Add",
            "Mixer",
            "Integrator",
            "SlewLimiter",
            "Delay",
            "PulseDivider",
            "FieldSpread",
            "FieldJitter",
            "RenderInstances2D",
            "RenderPaths2D",
            "PostFx",
            "ClipGroup",
        ] {
            assert!(reg.lookup(name).is_some(), "missing block type {name}");
        }
    }

    #[test]
    fn exactly_three_time_roots_exist() {
        let reg = standard_registry();
        let roots = reg.iter().filter(|d| d.time_root).count();
        assert_eq!(roots, 3);
    }

    #[test]
    fn stateful_blocks_are_flagged() {
        let reg = standard_registry();
        for name in ["Integrator", "SlewLimiter", "Delay", "PulseDivider"] {
            assert!(reg.lookup(name).unwrap().stateful);
        }
        assert!(!reg.lookup("Oscillator").unwrap().stateful);
    }

    #[test]
    fn oscillator_declares_a_default_frequency() {
        let reg = standard_registry();
        let osc = reg.lookup("Oscillator").unwrap();
        let freq = osc.input("frequency").unwrap();
        assert!(freq.default_source.is_some());
    }
}
