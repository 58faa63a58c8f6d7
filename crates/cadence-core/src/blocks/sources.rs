// SPDX-License-Identifier: Apache-2.0
//! Constant sources: visible const blocks and hidden default-source
//! providers.
//!
//! Providers are materialized by the default-source pass for unconnected
//! inputs; one provider type exists per `(world, domain)` pair the palette
//! declares defaults for. [`provider_type_for`] is the single lookup the
//! pass consults.

use crate::builder::ValueRef;
use crate::registry::{BlockDef, LowerCtx, LowerError, PortDef};
use crate::types::{Domain, TypeDesc, World};
use crate::value::Value;

fn const_value(ctx: &LowerCtx<'_>, domain: Domain) -> Value {
    ctx.param("value")
        .copied()
        .unwrap_or_else(|| Value::default_for(&TypeDesc::signal(domain)))
}

fn lower_sig_const(ctx: &mut LowerCtx<'_>, domain: Domain) -> Result<(), LowerError> {
    let v = const_value(ctx, domain);
    let ty = TypeDesc::signal(domain);
    let b = ctx.builder();
    let id = b.sig_const(v, ty);
    ctx.set_output("out", ValueRef::sig(id, ty));
    Ok(())
}

fn lower_field_const(ctx: &mut LowerCtx<'_>, domain: Domain) -> Result<(), LowerError> {
    let v = const_value(ctx, domain);
    let ty = TypeDesc::field(domain);
    let b = ctx.builder();
    let id = b.field_const(v, ty);
    ctx.set_output("out", ValueRef::field(id, ty));
    Ok(())
}

macro_rules! provider {
    ($const_name:ident, $type_name:literal, $world:ident, $domain:ident, $hidden:literal) => {
        #[doc = concat!("`", $type_name, "` block definition.")]
        pub const $const_name: BlockDef = BlockDef {
            type_name: $type_name,
            inputs: &[],
            outputs: &[PortDef::new(
                "out",
                TypeDesc::$world(Domain::$domain),
            )],
            time_root: false,
            stateful: false,
            hidden: $hidden,
            lower: |ctx| {
                match TypeDesc::$world(Domain::$domain).world {
                    World::Field => lower_field_const(ctx, Domain::$domain),
                    _ => lower_sig_const(ctx, Domain::$domain),
                }
            },
        };
    };
}

provider!(DS_CONST_SIGNAL_FLOAT, "DSConstSignalFloat", signal, Float, true);
provider!(DS_CONST_SIGNAL_VEC2, "DSConstSignalVec2", signal, Vec2, true);
provider!(DS_CONST_SIGNAL_COLOR, "DSConstSignalColor", signal, Color, true);
provider!(DS_CONST_SIGNAL_BOOL, "DSConstSignalBool", signal, Bool, true);
provider!(DS_CONST_FIELD_FLOAT, "DSConstFieldFloat", field, Float, true);
provider!(DS_CONST_FIELD_VEC2, "DSConstFieldVec2", field, Vec2, true);
provider!(DS_CONST_FIELD_COLOR, "DSConstFieldColor", field, Color, true);
provider!(CONST_FLOAT, "ConstFloat", signal, Float, false);
provider!(CONST_COLOR, "ConstColor", signal, Color, false);

/// All provider and const definitions, for registration.
pub const ALL: &[BlockDef] = &[
    DS_CONST_SIGNAL_FLOAT,
    DS_CONST_SIGNAL_VEC2,
    DS_CONST_SIGNAL_COLOR,
    DS_CONST_SIGNAL_BOOL,
    DS_CONST_FIELD_FLOAT,
    DS_CONST_FIELD_VEC2,
    DS_CONST_FIELD_COLOR,
    CONST_FLOAT,
    CONST_COLOR,
];

/// The hidden provider type materialized for an unconnected input of the
/// given type, if one exists.
#[must_use]
pub fn provider_type_for(world: World, domain: Domain) -> Option<&'static str> {
    match (world, domain.canonical()) {
        (World::Signal | World::Scalar, Domain::Float | Domain::Phase01) => {
            Some("DSConstSignalFloat")
        }
        (World::Signal | World::Scalar, Domain::Vec2) => Some("DSConstSignalVec2"),
        (World::Signal | World::Scalar, Domain::Color) => Some("DSConstSignalColor"),
        (World::Signal | World::Scalar, Domain::Bool) => Some("DSConstSignalBool"),
        (World::Field, Domain::Float) => Some("DSConstFieldFloat"),
        (World::Field, Domain::Vec2) => Some("DSConstFieldVec2"),
        (World::Field, Domain::Color) => Some("DSConstFieldColor"),
        _ => None,
    }
}
