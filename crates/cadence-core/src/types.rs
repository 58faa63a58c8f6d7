// SPDX-License-Identifier: Apache-2.0
//! Value type descriptors and the compatibility relation.
//!
//! Every value flowing through a patch is described by a [`TypeDesc`]:
//! which world it lives in (continuous signal, one-shot event, per-element
//! field, compile-time scalar, config), its domain, and its bus eligibility.
//! [`is_compatible`] is the single truth consulted by edge type-checking and
//! adapter search.

/// Evaluation world of a value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum World {
    /// Continuous per-frame value.
    Signal,
    /// One-shot discrete edge (fired-this-frame semantics).
    Event,
    /// Per-element value over an instance domain.
    Field,
    /// Compile-time constant (promotes into signal or field).
    Scalar,
    /// Block configuration; never flows on edges.
    Config,
}

/// Closed domain enumeration.
///
/// `Phase`/`Phase01`, `Vec2`/`Point` and the `Render*` family are aliases:
/// distinct names the editor surfaces, one runtime representation each.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    /// 32-bit float.
    Float,
    /// 64-bit signed integer.
    Int,
    /// Boolean.
    Bool,
    /// Two-lane vector.
    Vec2,
    /// Alias of [`Vec2`](Self::Vec2).
    Point,
    /// Three-lane vector.
    Vec3,
    /// Four-lane linear RGBA color.
    Color,
    /// Normalized cyclic phase in `[0, 1)`.
    Phase01,
    /// Alias of [`Phase01`](Self::Phase01).
    Phase,
    /// Discrete trigger (event world).
    Trigger,
    /// Renderable pass payload.
    Render,
    /// Alias of [`Render`](Self::Render).
    RenderNode,
    /// Alias of [`Render`](Self::Render).
    RenderTree,
    /// Block-type-scoped enum tag (internal).
    EnumTag,
}

impl Domain {
    /// Collapses alias names onto their canonical domain.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Phase => Self::Phase01,
            Self::Point => Self::Vec2,
            Self::RenderNode | Self::RenderTree => Self::Render,
            other => other,
        }
    }

    /// Lane layout for bundle domains; `None` means scalar (one lane).
    #[must_use]
    pub fn lanes(self) -> Option<u32> {
        match self.canonical() {
            Self::Vec2 => Some(2),
            Self::Vec3 => Some(3),
            Self::Color => Some(4),
            _ => None,
        }
    }

    /// Total scalar lanes occupied by a value of this domain.
    #[must_use]
    pub fn arity(self) -> u32 {
        self.lanes().unwrap_or(1)
    }
}

/// Category gate for bus eligibility.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeCategory {
    /// Editor-visible; eligible for buses.
    Core,
    /// Compiler-internal; never bus-eligible.
    Internal,
}

/// Optional semantic tag carried for editor presentation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Semantics {
    /// Accumulated intensity (e.g. the `energy` bus).
    Energy,
    /// Primary driving value of a block.
    Primary,
    /// Normalized completion of a finite time model.
    Progress,
}

/// Optional unit tag carried for editor presentation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    /// Milliseconds.
    Ms,
    /// Hertz.
    Hz,
    /// Scene units (pixels at identity camera).
    Px,
}

/// Canonical value descriptor.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDesc {
    /// Evaluation world.
    pub world: World,
    /// Value domain.
    pub domain: Domain,
    /// Category gate; only `Core` is bus-eligible.
    pub category: TypeCategory,
    /// Whether values of this type may be published to buses.
    pub bus_eligible: bool,
    /// Optional semantic tag.
    pub semantics: Option<Semantics>,
    /// Optional unit tag.
    pub unit: Option<Unit>,
}

impl TypeDesc {
    /// Core signal type of the given domain.
    #[must_use]
    pub const fn signal(domain: Domain) -> Self {
        Self {
            world: World::Signal,
            domain,
            category: TypeCategory::Core,
            bus_eligible: true,
            semantics: None,
            unit: None,
        }
    }

    /// Core event type of the given domain.
    #[must_use]
    pub const fn event(domain: Domain) -> Self {
        Self {
            world: World::Event,
            domain,
            category: TypeCategory::Core,
            bus_eligible: true,
            semantics: None,
            unit: None,
        }
    }

    /// Core field type of the given domain.
    #[must_use]
    pub const fn field(domain: Domain) -> Self {
        Self {
            world: World::Field,
            domain,
            category: TypeCategory::Core,
            bus_eligible: true,
            semantics: None,
            unit: None,
        }
    }

    /// Compile-time scalar of the given domain.
    #[must_use]
    pub const fn scalar(domain: Domain) -> Self {
        Self {
            world: World::Scalar,
            domain,
            category: TypeCategory::Core,
            bus_eligible: false,
            semantics: None,
            unit: None,
        }
    }

    /// Marks this descriptor compiler-internal (never bus-eligible).
    #[must_use]
    pub const fn internal(mut self) -> Self {
        self.category = TypeCategory::Internal;
        self.bus_eligible = false;
        self
    }

    /// Attaches a semantic tag.
    #[must_use]
    pub const fn with_semantics(mut self, semantics: Semantics) -> Self {
        self.semantics = Some(semantics);
        self
    }

    /// Attaches a unit tag.
    #[must_use]
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Total scalar lanes occupied by one value of this type.
    #[must_use]
    pub fn arity(&self) -> u32 {
        self.domain.arity()
    }
}

/// Domain equality modulo aliases.
fn domain_matches(from: Domain, to: Domain) -> bool {
    from.canonical() == to.canonical()
}

/// The compatibility relation consulted by edge type-checking.
///
/// Accepts, in order:
/// - exact `(world, domain)` match (domains compared modulo aliases);
/// - scalar → signal promotion (same domain);
/// - signal → field broadcast (same domain);
/// - scalar → field via the promotion chain.
#[must_use]
pub fn is_compatible(from: &TypeDesc, to: &TypeDesc) -> bool {
    if !domain_matches(from.domain, to.domain) {
        return false;
    }
    match (from.world, to.world) {
        (a, b) if a == b => true,
        (World::Scalar, World::Signal | World::Field) => true,
        (World::Signal, World::Field) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_compatible() {
        let t = TypeDesc::signal(Domain::Float);
        assert!(is_compatible(&t, &t));
    }

    #[test]
    fn scalar_promotes_to_signal_and_field() {
        let s = TypeDesc::scalar(Domain::Float);
        assert!(is_compatible(&s, &TypeDesc::signal(Domain::Float)));
        assert!(is_compatible(&s, &TypeDesc::field(Domain::Float)));
    }

    #[test]
    fn signal_broadcasts_to_field() {
        assert!(is_compatible(
            &TypeDesc::signal(Domain::Color),
            &TypeDesc::field(Domain::Color)
        ));
    }

    #[test]
    fn field_never_narrows_to_signal() {
        assert!(!is_compatible(
            &TypeDesc::field(Domain::Float),
            &TypeDesc::signal(Domain::Float)
        ));
    }

    #[test]
    fn phase_aliases_phase01() {
        assert!(is_compatible(
            &TypeDesc::signal(Domain::Phase),
            &TypeDesc::signal(Domain::Phase01)
        ));
        assert!(is_compatible(
            &TypeDesc::signal(Domain::Phase01),
            &TypeDesc::signal(Domain::Phase)
        ));
    }

    #[test]
    fn vec2_aliases_point_and_render_family_collapses() {
        assert!(is_compatible(
            &TypeDesc::signal(Domain::Point),
            &TypeDesc::signal(Domain::Vec2)
        ));
        assert!(is_compatible(
            &TypeDesc::signal(Domain::RenderTree),
            &TypeDesc::signal(Domain::RenderNode)
        ));
    }

    #[test]
    fn cross_domain_is_incompatible() {
        assert!(!is_compatible(
            &TypeDesc::signal(Domain::Float),
            &TypeDesc::signal(Domain::Vec2)
        ));
    }

    #[test]
    fn bundle_arity_follows_lanes() {
        assert_eq!(TypeDesc::signal(Domain::Float).arity(), 1);
        assert_eq!(TypeDesc::signal(Domain::Vec2).arity(), 2);
        assert_eq!(TypeDesc::signal(Domain::Vec3).arity(), 3);
        assert_eq!(TypeDesc::signal(Domain::Color).arity(), 4);
        assert_eq!(TypeDesc::signal(Domain::Point).arity(), 2);
    }
}
