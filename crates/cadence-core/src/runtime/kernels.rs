// SPDX-License-Identifier: Apache-2.0
//! Deterministic evaluation kernels for the opcode set.
//!
//! Transcendentals go through `libm`, never platform intrinsics, so a frame
//! evaluates bit-identically across targets. Division by zero and other
//! singular inputs map to 0 rather than NaN wherever a downstream consumer
//! would otherwise see garbage.

use crate::ir::{BinaryOp, IndexedOp, UnaryOp};
use crate::types::Domain;
use crate::value::Value;

fn fract01(x: f32) -> f32 {
    let f = x - libm::floorf(x);
    if f < 0.0 {
        f + 1.0
    } else {
        f
    }
}

fn sin01(x: f32) -> f32 {
    libm::sinf(core::f32::consts::TAU * fract01(x))
}

fn tri01(x: f32) -> f32 {
    1.0 - 4.0 * (fract01(x) - 0.5).abs()
}

fn saw01(x: f32) -> f32 {
    2.0 * fract01(x) - 1.0
}

fn square01(x: f32) -> f32 {
    if fract01(x) < 0.5 {
        1.0
    } else {
        -1.0
    }
}

fn hue_channel(p: f32, q: f32, mut t: f32) -> f32 {
    t = fract01(t);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// HSLA → linear RGBA. Hue is in turns (`[0, 1)`), saturation and lightness
/// in `[0, 1]`; alpha passes through.
#[must_use]
pub fn hsl_to_rgb(hsla: [f32; 4]) -> [f32; 4] {
    let [h, s, l, a] = hsla;
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return [l, l, l, a];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_channel(p, q, h + 1.0 / 3.0),
        hue_channel(p, q, h),
        hue_channel(p, q, h - 1.0 / 3.0),
        a,
    ]
}

/// Applies a unary opcode.
#[must_use]
pub fn apply_unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Neg => v.map_lanes(|x| -x),
        UnaryOp::Abs => v.map_lanes(f32::abs),
        UnaryOp::Fract => v.map_lanes(fract01),
        UnaryOp::Clamp01 => v.map_lanes(|x| x.clamp(0.0, 1.0)),
        UnaryOp::Sin01 => Value::Float(sin01(v.as_f32())),
        UnaryOp::Tri01 => Value::Float(tri01(v.as_f32())),
        UnaryOp::Saw01 => Value::Float(saw01(v.as_f32())),
        UnaryOp::Square01 => Value::Float(square01(v.as_f32())),
        UnaryOp::HslToRgb => match v {
            Value::Color(c) => Value::Color(hsl_to_rgb(*c)),
            other => *other,
        },
        UnaryOp::SplatVec2 => {
            let x = v.as_f32();
            Value::Vec2([x, x])
        }
        UnaryOp::GrayToColor => {
            let x = v.as_f32();
            Value::Color([x, x, x, 1.0])
        }
        UnaryOp::IntToFloat => Value::Float(v.as_f32()),
    }
}

/// Applies a binary opcode.
#[must_use]
pub fn apply_binary(op: BinaryOp, a: &Value, b: &Value) -> Value {
    match op {
        BinaryOp::Add => a.zip_lanes(b, |x, y| x + y),
        BinaryOp::Sub => a.zip_lanes(b, |x, y| x - y),
        BinaryOp::Mul => a.zip_lanes(b, |x, y| x * y),
        BinaryOp::Div => a.zip_lanes(b, |x, y| if y == 0.0 { 0.0 } else { x / y }),
        BinaryOp::Min => a.zip_lanes(b, f32::min),
        BinaryOp::Max => a.zip_lanes(b, f32::max),
        BinaryOp::WithAlpha => match a {
            Value::Color(c) => {
                let mut c = *c;
                c[3] = b.as_f32();
                Value::Color(c)
            }
            other => *other,
        },
    }
}

/// splitmix64 finalizer; the per-element hash backbone.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Deterministic hash in `[0, 1)` for `(seed, salt, index, stream)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hash01(seed: u64, salt: f32, index: u32, stream: u32) -> f32 {
    let mixed = seed
        ^ (u64::from(salt.to_bits()) << 16)
        ^ (u64::from(index) << 1)
        ^ (u64::from(stream) << 40);
    let h = splitmix64(mixed);
    // Top 24 bits into [0, 1) keeps full f32 precision.
    ((h >> 40) as f32) / 16_777_216.0
}

/// Evaluates an indexed generator at one element.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn apply_indexed(
    op: IndexedOp,
    out_domain: Domain,
    seed: u64,
    a: f32,
    b: f32,
    index: u32,
    count: u32,
) -> Value {
    match op {
        IndexedOp::Line => {
            let t = if count > 1 {
                index as f32 / (count - 1) as f32
            } else {
                0.5
            };
            Value::Vec2([(t - 0.5) * a, b])
        }
        IndexedOp::Ring => {
            let turns = index as f32 / count.max(1) as f32 + b;
            let angle = f64::from(core::f32::consts::TAU * turns);
            Value::Vec2([
                (libm::cos(angle) as f32) * a,
                (libm::sin(angle) as f32) * a,
            ])
        }
        IndexedOp::Hash01 => match out_domain.canonical() {
            Domain::Vec2 => Value::Vec2([
                hash01(seed, a, index, 0),
                hash01(seed, a, index, 1),
            ]),
            _ => Value::Float(hash01(seed, a, index, 0)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fract_is_euclidean() {
        assert!((fract01(1.25) - 0.25).abs() < 1.0e-6);
        assert!((fract01(-0.25) - 0.75).abs() < 1.0e-6);
    }

    #[test]
    fn waves_hit_their_landmarks() {
        assert!(sin01(0.0).abs() < 1.0e-6);
        assert!((sin01(0.25) - 1.0).abs() < 1.0e-5);
        assert!((tri01(0.5) - 1.0).abs() < 1.0e-6);
        assert!((tri01(0.0) + 1.0).abs() < 1.0e-6);
        assert!((saw01(0.75) - 0.5).abs() < 1.0e-6);
        assert!((square01(0.25) - 1.0).abs() < 1.0e-6);
        assert!((square01(0.75) + 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn hsl_gray_when_unsaturated() {
        let rgba = hsl_to_rgb([0.33, 0.0, 0.5, 1.0]);
        assert_eq!(rgba, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn hsl_primary_red() {
        let rgba = hsl_to_rgb([0.0, 1.0, 0.5, 1.0]);
        assert!((rgba[0] - 1.0).abs() < 1.0e-5);
        assert!(rgba[1].abs() < 1.0e-5);
        assert!(rgba[2].abs() < 1.0e-5);
    }

    #[test]
    fn div_by_zero_is_zero() {
        let v = apply_binary(BinaryOp::Div, &Value::Float(3.0), &Value::Float(0.0));
        assert_eq!(v, Value::Float(0.0));
    }

    #[test]
    fn hash_is_deterministic_and_stream_separated() {
        let a = hash01(7, 0.0, 42, 0);
        let b = hash01(7, 0.0, 42, 0);
        let c = hash01(7, 0.0, 42, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!((0.0..1.0).contains(&a));
    }

    #[test]
    fn line_spreads_symmetrically() {
        let first = apply_indexed(IndexedOp::Line, Domain::Vec2, 0, 100.0, 0.0, 0, 3);
        let mid = apply_indexed(IndexedOp::Line, Domain::Vec2, 0, 100.0, 0.0, 1, 3);
        let last = apply_indexed(IndexedOp::Line, Domain::Vec2, 0, 100.0, 0.0, 2, 3);
        assert_eq!(first, Value::Vec2([-50.0, 0.0]));
        assert_eq!(mid, Value::Vec2([0.0, 0.0]));
        assert_eq!(last, Value::Vec2([50.0, 0.0]));
    }
}
