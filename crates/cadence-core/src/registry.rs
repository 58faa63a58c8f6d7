// SPDX-License-Identifier: Apache-2.0
//! Block and transform registries, and the lowering context.
//!
//! Registries are process-wide immutable maps built before the first compile;
//! passes receive references and never mutate. Each block type registers its
//! port declarations and a `lower` function; each transform (adapter or lens)
//! registers its type signature and an optional IR lowering.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::builder::{IrBuilder, IrTypeError, ValueRef};
use crate::combine::CombineRegistry;
use crate::ident::{BlockId, EventSlot, StateKey};
use crate::ident::make_state_key;
use crate::ir::TimeModelIR;
use crate::patch::{Block, CombinePolicy};
use crate::types::TypeDesc;
use crate::value::Value;

/// Declaration of one input or output port on a block type.
#[derive(Clone, Copy, Debug)]
pub struct PortDef {
    /// Port id, unique per direction within the block type.
    pub id: &'static str,
    /// Declared port type.
    pub ty: TypeDesc,
    /// Constant materialized for this input when nothing drives it.
    pub default_source: Option<Value>,
    /// Combine policy; `None` means the default `{multi, last}`.
    pub combine: Option<CombinePolicy>,
}

impl PortDef {
    /// A port with no default source and default combine policy.
    #[must_use]
    pub const fn new(id: &'static str, ty: TypeDesc) -> Self {
        Self {
            id,
            ty,
            default_source: None,
            combine: None,
        }
    }

    /// Attaches a default source constant.
    #[must_use]
    pub const fn with_default(mut self, value: Value) -> Self {
        self.default_source = Some(value);
        self
    }

    /// Attaches a combine policy.
    #[must_use]
    pub const fn with_combine(mut self, policy: CombinePolicy) -> Self {
        self.combine = Some(policy);
        self
    }
}

/// Errors a block lowering may raise.
#[derive(Debug, Error)]
pub enum LowerError {
    /// The lowering asked for an input the driver did not resolve.
    #[error("missing input: {0}")]
    MissingInput(String),
    /// A parameter was present but of the wrong shape.
    #[error("bad param {key}: expected {expected}")]
    BadParam {
        /// Parameter key.
        key: String,
        /// Human-readable expected shape.
        expected: &'static str,
    },
    /// The IR builder rejected an emitted node.
    #[error(transparent)]
    Type(#[from] IrTypeError),
}

/// Lowering function registered per block type.
pub type LowerFn = fn(&mut LowerCtx<'_>) -> Result<(), LowerError>;

/// Declaration of one block type.
#[derive(Clone, Copy, Debug)]
pub struct BlockDef {
    /// Registered type name.
    pub type_name: &'static str,
    /// Input port declarations, in IR input order.
    pub inputs: &'static [PortDef],
    /// Output port declarations.
    pub outputs: &'static [PortDef],
    /// Exactly one time-root block is required per patch.
    pub time_root: bool,
    /// Stateful blocks read their previous frame's value and may close
    /// dependency cycles.
    pub stateful: bool,
    /// Hidden block types never appear in the palette.
    pub hidden: bool,
    /// The lowering function.
    pub lower: LowerFn,
}

impl BlockDef {
    /// Looks up an input port declaration by id.
    #[must_use]
    pub fn input(&self, id: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Looks up an output port declaration by id.
    #[must_use]
    pub fn output(&self, id: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.id == id)
    }
}

/// Registry construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A block type name was registered twice.
    #[error("duplicate block type: {0}")]
    DuplicateBlockType(&'static str),
    /// A transform id was registered twice.
    #[error("duplicate transform: {0}")]
    DuplicateTransform(&'static str),
}

/// Process-wide immutable map of block types.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    entries: BTreeMap<&'static str, BlockDef>,
}

impl BlockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block type.
    pub fn register(&mut self, def: BlockDef) -> Result<(), RegistryError> {
        if self.entries.contains_key(def.type_name) {
            return Err(RegistryError::DuplicateBlockType(def.type_name));
        }
        self.entries.insert(def.type_name, def);
        Ok(())
    }

    /// Looks up a block type by name.
    #[must_use]
    pub fn lookup(&self, type_name: &str) -> Option<&BlockDef> {
        self.entries.get(type_name)
    }

    /// Iterates registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockDef> {
        self.entries.values()
    }
}

/// Adapter (world/domain-changing) vs lens (same-type, parametric).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TransformKind {
    /// Changes domain or world.
    Adapter,
    /// Same type in and out, parameterized.
    Lens,
}

/// IR lowering for a transform step.
pub type TransformLowerFn =
    fn(&mut IrBuilder, ValueRef, &BTreeMap<String, Value>) -> Result<ValueRef, IrTypeError>;

/// Declaration of one transform (adapter or lens).
#[derive(Clone, Copy, Debug)]
pub struct TransformDef {
    /// Registered id.
    pub id: &'static str,
    /// Adapter or lens.
    pub kind: TransformKind,
    /// Accepted input type.
    pub input: TypeDesc,
    /// Produced output type.
    pub output: TypeDesc,
    /// IR lowering; transforms without one are closure-only and degrade to
    /// a warning at lowering time.
    pub compile: Option<TransformLowerFn>,
}

/// Process-wide immutable map of transforms.
#[derive(Debug, Default)]
pub struct TransformRegistry {
    entries: BTreeMap<&'static str, TransformDef>,
}

impl TransformRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transform.
    pub fn register(&mut self, def: TransformDef) -> Result<(), RegistryError> {
        if self.entries.contains_key(def.id) {
            return Err(RegistryError::DuplicateTransform(def.id));
        }
        self.entries.insert(def.id, def);
        Ok(())
    }

    /// Looks up a transform by id.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&TransformDef> {
        self.entries.get(id)
    }
}

/// The registries a compile consumes, bundled.
#[derive(Debug, Default)]
pub struct Registries {
    /// Block palette.
    pub blocks: BlockRegistry,
    /// Adapter/lens registry.
    pub transforms: TransformRegistry,
    /// Custom combine reducers.
    pub combines: CombineRegistry,
}

impl Registries {
    /// The standard palette, transforms, and combine modes shipped with the
    /// core.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            blocks: crate::blocks::standard_registry(),
            transforms: crate::transforms::standard_registry(),
            combines: CombineRegistry::standard(),
        }
    }
}

/// Scope handed to a block's lowering function.
///
/// Inputs arrive already adapted and combined: the driver applies edge
/// transforms and the combine kernel before the block sees its values, so a
/// lowering always observes its declared input types.
pub struct LowerCtx<'a> {
    builder: &'a mut IrBuilder,
    block: &'a Block,
    inputs: &'a BTreeMap<String, ValueRef>,
    time_model: Option<TimeModelIR>,
    wrap_event: EventSlot,
    outputs: BTreeMap<String, ValueRef>,
}

impl<'a> LowerCtx<'a> {
    /// Creates a lowering scope for one block.
    pub(crate) fn new(
        builder: &'a mut IrBuilder,
        block: &'a Block,
        inputs: &'a BTreeMap<String, ValueRef>,
        time_model: Option<TimeModelIR>,
        wrap_event: EventSlot,
    ) -> Self {
        Self {
            builder,
            block,
            inputs,
            time_model,
            wrap_event,
            outputs: BTreeMap::new(),
        }
    }

    /// The IR builder.
    pub fn builder(&mut self) -> &mut IrBuilder {
        &mut *self.builder
    }

    /// The block being lowered.
    #[must_use]
    pub fn block_id(&self) -> &BlockId {
        &self.block.id
    }

    /// The program's time model (infinite when no root bound yet).
    #[must_use]
    pub fn time_model(&self) -> TimeModelIR {
        self.time_model
            .unwrap_or(TimeModelIR::Infinite { window_ms: 10_000.0 })
    }

    /// The designated wrap event slot.
    #[must_use]
    pub fn wrap_event(&self) -> EventSlot {
        self.wrap_event
    }

    /// A recompile-stable state key for a cell owned by this block.
    #[must_use]
    pub fn state_key(&self, cell: &str) -> StateKey {
        make_state_key(&self.block.id, cell)
    }

    /// The resolved value for an input port.
    pub fn input(&self, id: &str) -> Result<ValueRef, LowerError> {
        self.inputs
            .get(id)
            .copied()
            .ok_or_else(|| LowerError::MissingInput(id.to_owned()))
    }

    /// Records an output port's value.
    pub fn set_output(&mut self, id: &str, value: ValueRef) {
        self.outputs.insert(id.to_owned(), value);
    }

    /// Consumes the scope, yielding the recorded outputs.
    pub(crate) fn into_outputs(self) -> BTreeMap<String, ValueRef> {
        self.outputs
    }

    // ─── parameter access ───────────────────────────────────────────

    /// Raw parameter value, if present.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.block.params.get(key)
    }

    /// Float parameter with a default; ints and bools coerce.
    pub fn param_f32(&self, key: &str, default: f32) -> Result<f32, LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Float(v)) => Ok(*v),
            #[allow(clippy::cast_precision_loss)]
            Some(Value::Int(v)) => Ok(*v as f32),
            Some(Value::Bool(v)) => Ok(f32::from(u8::from(*v))),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "float",
            }),
        }
    }

    /// Double-width float parameter (time quantities).
    pub fn param_f64(&self, key: &str, default: f64) -> Result<f64, LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Float(v)) => Ok(f64::from(*v)),
            #[allow(clippy::cast_precision_loss)]
            Some(Value::Int(v)) => Ok(*v as f64),
            Some(Value::Bool(v)) => Ok(f64::from(u8::from(*v))),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "float",
            }),
        }
    }

    /// Non-negative integer parameter with a default.
    pub fn param_u32(&self, key: &str, default: u32) -> Result<u32, LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Int(v)) if *v >= 0 => u32::try_from(*v).map_err(|_| LowerError::BadParam {
                key: key.to_owned(),
                expected: "u32",
            }),
            Some(Value::Enum(v)) => Ok(*v),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(Value::Float(v)) if *v >= 0.0 && v.fract() == 0.0 => Ok(*v as u32),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "u32",
            }),
        }
    }

    /// Enum-tag parameter with a default.
    pub fn param_enum(&self, key: &str, default: u32) -> Result<u32, LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Enum(v)) => Ok(*v),
            Some(Value::Int(v)) if *v >= 0 => u32::try_from(*v).map_err(|_| LowerError::BadParam {
                key: key.to_owned(),
                expected: "enum tag",
            }),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "enum tag",
            }),
        }
    }

    /// Color parameter with a default.
    pub fn param_color(&self, key: &str, default: [f32; 4]) -> Result<[f32; 4], LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Color(c)) => Ok(*c),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "color",
            }),
        }
    }

    /// Vec2 parameter with a default.
    pub fn param_vec2(&self, key: &str, default: [f32; 2]) -> Result<[f32; 2], LowerError> {
        match self.param(key) {
            None => Ok(default),
            Some(Value::Vec2(v)) => Ok(*v),
            Some(_) => Err(LowerError::BadParam {
                key: key.to_owned(),
                expected: "vec2",
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Domain;

    fn noop_lower(_ctx: &mut LowerCtx<'_>) -> Result<(), LowerError> {
        Ok(())
    }

    const TEST_DEF: BlockDef = BlockDef {
        type_name: "Test",
        inputs: &[PortDef::new("in", TypeDesc::signal(Domain::Float))],
        outputs: &[PortDef::new("out", TypeDesc::signal(Domain::Float))],
        time_root: false,
        stateful: false,
        hidden: false,
        lower: noop_lower,
    };

    #[test]
    fn duplicate_block_type_is_rejected() {
        let mut reg = BlockRegistry::new();
        reg.register(TEST_DEF).unwrap();
        assert_eq!(
            reg.register(TEST_DEF),
            Err(RegistryError::DuplicateBlockType("Test"))
        );
    }

    #[test]
    fn port_lookup_by_direction() {
        assert!(TEST_DEF.input("in").is_some());
        assert!(TEST_DEF.input("out").is_none());
        assert!(TEST_DEF.output("out").is_some());
    }

    #[test]
    fn param_coercion() {
        let block = Block::new("b", "Test")
            .with_param("f", Value::Int(3))
            .with_param("n", Value::Float(2.0))
            .with_param("bad", Value::Color([0.0; 4]));
        let inputs = BTreeMap::new();
        let mut builder = IrBuilder::new(0);
        let wrap = builder.time_slots().wrap;
        let ctx = LowerCtx::new(&mut builder, &block, &inputs, None, wrap);
        assert_eq!(ctx.param_f32("f", 0.0).unwrap(), 3.0);
        assert_eq!(ctx.param_u32("n", 0).unwrap(), 2);
        assert_eq!(ctx.param_f32("missing", 7.5).unwrap(), 7.5);
        assert!(ctx.param_f32("bad", 0.0).is_err());
    }
}
