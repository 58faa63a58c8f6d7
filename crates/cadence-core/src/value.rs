// SPDX-License-Identifier: Apache-2.0
//! Runtime values and the per-domain defaults.
//!
//! `Value` is the single currency of the evaluator: slots hold one, the
//! constant pool interns them, field buffers are vectors of them. The
//! variants map 1:1 onto canonical [`Domain`](crate::types::Domain)s; alias
//! domains share the canonical representation.

use crate::types::{Domain, TypeDesc};

/// A runtime value.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Float / phase01.
    Float(f32),
    /// Integer.
    Int(i64),
    /// Boolean / trigger level.
    Bool(bool),
    /// Two-lane vector / point.
    Vec2([f32; 2]),
    /// Three-lane vector.
    Vec3([f32; 3]),
    /// Linear RGBA color.
    Color([f32; 4]),
    /// Block-type-scoped enum tag.
    Enum(u32),
}

impl Value {
    /// The default value for a type: numeric zero, `false`, zero vectors,
    /// transparent black.
    #[must_use]
    pub fn default_for(ty: &TypeDesc) -> Self {
        match ty.domain.canonical() {
            Domain::Int => Self::Int(0),
            Domain::Bool | Domain::Trigger => Self::Bool(false),
            Domain::Vec2 => Self::Vec2([0.0; 2]),
            Domain::Vec3 => Self::Vec3([0.0; 3]),
            Domain::Color => Self::Color([0.0; 4]),
            Domain::EnumTag => Self::Enum(0),
            _ => Self::Float(0.0),
        }
    }

    /// The canonical domain this value inhabits.
    #[must_use]
    pub fn domain(&self) -> Domain {
        match self {
            Self::Float(_) => Domain::Float,
            Self::Int(_) => Domain::Int,
            Self::Bool(_) => Domain::Bool,
            Self::Vec2(_) => Domain::Vec2,
            Self::Vec3(_) => Domain::Vec3,
            Self::Color(_) => Domain::Color,
            Self::Enum(_) => Domain::EnumTag,
        }
    }

    /// Scalar lanes occupied by this value.
    #[must_use]
    pub fn arity(&self) -> u32 {
        self.domain().arity()
    }

    /// Reads the value as f32, coercing ints and booleans.
    ///
    /// Bundles return their first lane; callers that care about bundles use
    /// [`Value::write_lanes`].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f32,
            Self::Bool(v) => f32::from(u8::from(*v)),
            Self::Vec2(v) => v[0],
            Self::Vec3(v) => v[0],
            Self::Color(v) => v[0],
            Self::Enum(v) => *v as f32,
        }
    }

    /// Truthiness used by `select` conditions: non-zero / `true`.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Enum(v) => *v != 0,
            Self::Vec2(_) | Self::Vec3(_) | Self::Color(_) => false,
        }
    }

    /// Appends the value's scalar lanes to `out` (instance-major packing).
    #[allow(clippy::cast_precision_loss)]
    pub fn write_lanes(&self, out: &mut Vec<f32>) {
        match self {
            Self::Float(v) => out.push(*v),
            Self::Int(v) => out.push(*v as f32),
            Self::Bool(v) => out.push(f32::from(u8::from(*v))),
            Self::Vec2(v) => out.extend_from_slice(v),
            Self::Vec3(v) => out.extend_from_slice(v),
            Self::Color(v) => out.extend_from_slice(v),
            Self::Enum(v) => out.push(*v as f32),
        }
    }

    /// Applies `f` to every lane, preserving shape. Int/bool/enum values are
    /// coerced through f32 and come back as floats.
    #[must_use]
    pub fn map_lanes(&self, f: impl Fn(f32) -> f32) -> Self {
        match self {
            Self::Vec2(v) => Self::Vec2([f(v[0]), f(v[1])]),
            Self::Vec3(v) => Self::Vec3([f(v[0]), f(v[1]), f(v[2])]),
            Self::Color(v) => Self::Color([f(v[0]), f(v[1]), f(v[2]), f(v[3])]),
            other => Self::Float(f(other.as_f32())),
        }
    }

    /// Zips two values lane-wise. Shapes are reconciled by broadcasting the
    /// scalar side when exactly one side is a bundle.
    #[must_use]
    pub fn zip_lanes(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        match (self, other) {
            (Self::Vec2(a), Self::Vec2(b)) => Self::Vec2([f(a[0], b[0]), f(a[1], b[1])]),
            (Self::Vec3(a), Self::Vec3(b)) => {
                Self::Vec3([f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2])])
            }
            (Self::Color(a), Self::Color(b)) => Self::Color([
                f(a[0], b[0]),
                f(a[1], b[1]),
                f(a[2], b[2]),
                f(a[3], b[3]),
            ]),
            (bundle @ (Self::Vec2(_) | Self::Vec3(_) | Self::Color(_)), scalar) => {
                let s = scalar.as_f32();
                bundle.map_lanes(|lane| f(lane, s))
            }
            (scalar, bundle @ (Self::Vec2(_) | Self::Vec3(_) | Self::Color(_))) => {
                let s = scalar.as_f32();
                bundle.map_lanes(|lane| f(s, lane))
            }
            (a, b) => Self::Float(f(a.as_f32(), b.as_f32())),
        }
    }

    /// Canonicalizes non-finite lanes to the deterministic policy value 0.
    /// Signed zero collapses to `+0.0`.
    #[must_use]
    pub fn canonicalized(&self) -> Self {
        self.map_lanes(|lane| {
            if !lane.is_finite() || lane == 0.0 {
                0.0
            } else {
                lane
            }
        })
    }
}

/// Bit-exact interning key for a [`Value`].
///
/// Floats are compared by bit pattern so `-0.0` and `0.0` intern separately
/// and NaN payloads stay distinct; structural dedup must never alter the
/// bits a constant round-trips with.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum ValueBits {
    Float(u32),
    Int(i64),
    Bool(bool),
    Vec2([u32; 2]),
    Vec3([u32; 3]),
    Color([u32; 4]),
    Enum(u32),
}

impl From<&Value> for ValueBits {
    fn from(v: &Value) -> Self {
        match v {
            Value::Float(x) => Self::Float(x.to_bits()),
            Value::Int(x) => Self::Int(*x),
            Value::Bool(x) => Self::Bool(*x),
            Value::Vec2(x) => Self::Vec2([x[0].to_bits(), x[1].to_bits()]),
            Value::Vec3(x) => Self::Vec3([x[0].to_bits(), x[1].to_bits(), x[2].to_bits()]),
            Value::Color(x) => Self::Color([
                x[0].to_bits(),
                x[1].to_bits(),
                x[2].to_bits(),
                x[3].to_bits(),
            ]),
            Value::Enum(x) => Self::Enum(*x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDesc;

    #[test]
    fn defaults_are_zeroes() {
        assert_eq!(
            Value::default_for(&TypeDesc::signal(Domain::Float)),
            Value::Float(0.0)
        );
        assert_eq!(
            Value::default_for(&TypeDesc::signal(Domain::Color)),
            Value::Color([0.0; 4])
        );
        assert_eq!(
            Value::default_for(&TypeDesc::event(Domain::Trigger)),
            Value::Bool(false)
        );
    }

    #[test]
    fn zip_broadcasts_scalar_over_bundle() {
        let v = Value::Vec2([1.0, 2.0]);
        let s = Value::Float(10.0);
        assert_eq!(v.zip_lanes(&s, |a, b| a * b), Value::Vec2([10.0, 20.0]));
        assert_eq!(s.zip_lanes(&v, |a, b| a + b), Value::Vec2([11.0, 12.0]));
    }

    #[test]
    fn canonicalized_flushes_non_finite_lanes() {
        let v = Value::Vec2([f32::NAN, f32::INFINITY]);
        assert_eq!(v.canonicalized(), Value::Vec2([0.0, 0.0]));
        let z = Value::Float(-0.0).canonicalized();
        assert_eq!(z, Value::Float(0.0));
        assert!(matches!(z, Value::Float(f) if f.is_sign_positive()));
    }

    #[test]
    fn lanes_pack_instance_major() {
        let mut out = Vec::new();
        Value::Vec2([1.0, 2.0]).write_lanes(&mut out);
        Value::Float(3.0).write_lanes(&mut out);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn value_bits_distinguishes_signed_zero() {
        let a = ValueBits::from(&Value::Float(0.0));
        let b = ValueBits::from(&Value::Float(-0.0));
        assert_ne!(a, b);
    }
}
