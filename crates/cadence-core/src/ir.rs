// SPDX-License-Identifier: Apache-2.0
//! The frozen intermediate representation.
//!
//! A [`CompiledProgramIR`] is the immutable product of one compile: dense
//! signal and field expression tables, a constant pool, slot metadata, a time
//! model, render pass descriptors, debug probes, and the linear per-frame
//! [`Step`] schedule. The runtime borrows it for the duration of a frame and
//! never mutates it; swapping programs happens between frames.
//!
//! Expression nodes reference each other and the pool exclusively through
//! dense ids, so the whole IR is `PartialEq`-comparable and (with the `serde`
//! feature) serializable with the deterministic CBOR codec.

use std::collections::BTreeMap;

use crate::ident::{ConstId, EventSlot, FieldExprId, Hash, SigExprId, StateKey, ValueSlot};
use crate::types::{Domain, TypeDesc};
use crate::value::Value;

/// Version stamped into every program; checked on hot-swap decode.
pub const IR_VERSION: &str = "1.0.0";

// ─── OPERATORS ──────────────────────────────────────────────────────

/// Unary lane-wise / shape-changing opcodes for `map` nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnaryOp {
    /// Lane-wise negation.
    Neg,
    /// Lane-wise absolute value.
    Abs,
    /// Lane-wise fractional part (euclidean, result in `[0, 1)`).
    Fract,
    /// Lane-wise clamp to `[0, 1]`.
    Clamp01,
    /// `sin(2π · x)` of a phase in `[0, 1)`, result in `[-1, 1]`.
    Sin01,
    /// Triangle wave over a phase in `[0, 1)`, result in `[-1, 1]`.
    Tri01,
    /// Sawtooth wave over a phase in `[0, 1)`, result in `[-1, 1]`.
    Saw01,
    /// Square wave over a phase in `[0, 1)`, result in `{-1, 1}`.
    Square01,
    /// HSLA → linear RGBA.
    HslToRgb,
    /// Duplicate a float into both vec2 lanes.
    SplatVec2,
    /// Grayscale float → opaque RGBA.
    GrayToColor,
    /// Integer → float.
    IntToFloat,
}

impl UnaryOp {
    /// Result domain for an input domain; `None` when the op rejects it.
    #[must_use]
    pub fn result_domain(self, input: Domain) -> Option<Domain> {
        let input = input.canonical();
        match self {
            Self::Neg | Self::Abs => match input {
                Domain::Float | Domain::Int | Domain::Vec2 | Domain::Vec3 | Domain::Phase01 => {
                    Some(input)
                }
                _ => None,
            },
            Self::Fract | Self::Clamp01 => match input {
                Domain::Float | Domain::Phase01 => Some(input),
                _ => None,
            },
            Self::Sin01 | Self::Tri01 | Self::Saw01 | Self::Square01 => match input {
                Domain::Float | Domain::Phase01 => Some(Domain::Float),
                _ => None,
            },
            Self::HslToRgb => (input == Domain::Color).then_some(Domain::Color),
            Self::SplatVec2 => matches!(input, Domain::Float | Domain::Phase01)
                .then_some(Domain::Vec2),
            Self::GrayToColor => matches!(input, Domain::Float | Domain::Phase01)
                .then_some(Domain::Color),
            Self::IntToFloat => (input == Domain::Int).then_some(Domain::Float),
        }
    }
}

/// Binary lane-wise opcodes for `zip` nodes.
///
/// Bundles zip lane-wise; a scalar operand broadcasts across the bundle's
/// lanes. Integer operands are coerced through f32 and produce floats.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    /// Lane-wise addition.
    Add,
    /// Lane-wise subtraction.
    Sub,
    /// Lane-wise multiplication.
    Mul,
    /// Lane-wise division (division by zero yields 0, deterministically).
    Div,
    /// Lane-wise minimum.
    Min,
    /// Lane-wise maximum.
    Max,
    /// Replace a color's alpha lane with a float.
    WithAlpha,
}

impl BinaryOp {
    fn numeric(domain: Domain) -> bool {
        matches!(
            domain,
            Domain::Float | Domain::Int | Domain::Bool | Domain::Phase01
        )
    }

    fn bundle(domain: Domain) -> bool {
        matches!(domain, Domain::Vec2 | Domain::Vec3 | Domain::Color)
    }

    /// Result domain for an operand pair; `None` when the op rejects it.
    #[must_use]
    pub fn result_domain(self, a: Domain, b: Domain) -> Option<Domain> {
        let (a, b) = (a.canonical(), b.canonical());
        if self == Self::WithAlpha {
            return (a == Domain::Color && Self::numeric(b)).then_some(Domain::Color);
        }
        if Self::bundle(a) && a == b {
            return Some(a);
        }
        if Self::bundle(a) && Self::numeric(b) {
            return Some(a);
        }
        if Self::numeric(a) && Self::bundle(b) {
            return Some(b);
        }
        (Self::numeric(a) && Self::numeric(b)).then_some(Domain::Float)
    }
}

/// Update rules for `state` nodes.
///
/// Every rule reads the cell's previous value and the current input, writes
/// the new value, and yields it as the node's result. On backward or scrubbed
/// time the executor passes `dt = 0`, so rules never integrate phantom time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateOp {
    /// `next = prev + input · dt_seconds · param` (param = rate scale).
    Integrate,
    /// Sampled delay: yields the value the input had `param` ms ago,
    /// one sample deep (`next = input`, yield `prev` while younger).
    DelayMs,
    /// Rate-limited follow: move `prev` toward `input` by at most
    /// `param · dt_seconds` per frame.
    Slew,
    /// Count rising edges of a boolean input; yield `true` every
    /// `param`-th edge.
    PulseDivide,
}

/// Per-element generators for `mapIndexed` field nodes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndexedOp {
    /// Positions spread along the x axis: `x = (i/(n-1) - 0.5) · a`, `y = b`.
    Line,
    /// Positions on a ring of radius `a`, phase offset `b` (in turns).
    Ring,
    /// Deterministic per-element hash in `[0, 1)`, salted by `a`.
    Hash01,
}

/// Reduction opcode carried by `busCombine` nodes.
///
/// Order-dependent modes (`First`, `Last`, `Layer`) rely on the canonical
/// `(kind, sort_key, id)` writer order established at compile time; the term
/// list is already sorted when the node is built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombineOp {
    /// Per-lane arithmetic sum.
    Sum,
    /// Sum divided by term count.
    Average,
    /// Per-lane maximum.
    Max,
    /// Per-lane minimum.
    Min,
    /// First term in canonical order.
    First,
    /// Last term in canonical order.
    Last,
    /// Alpha-over stacking for colors; `Last` otherwise.
    Layer,
}

// ─── EXPRESSION TABLES ──────────────────────────────────────────────

/// One node in the signal expression table.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SigExprIR {
    /// Pooled constant.
    Const(ConstId),
    /// Absolute frame time in ms (time-derive output).
    TimeAbsMs,
    /// Model time in ms (time-derive output).
    TimeModelMs,
    /// Normalized phase in `[0, 1)` (time-derive output).
    Phase01,
    /// `true` while the event slot is triggered this frame.
    Event(EventSlot),
    /// Unary op over one input.
    Map {
        /// Input expression.
        src: SigExprId,
        /// Opcode.
        op: UnaryOp,
    },
    /// Binary op over two inputs.
    Zip {
        /// Left input.
        a: SigExprId,
        /// Right input.
        b: SigExprId,
        /// Opcode.
        op: BinaryOp,
    },
    /// Branch on a condition's truthiness.
    Select {
        /// Condition expression.
        cond: SigExprId,
        /// Result when the condition holds.
        a: SigExprId,
        /// Result otherwise.
        b: SigExprId,
    },
    /// Multi-writer reduction over canonically ordered terms.
    BusCombine {
        /// Terms in canonical `(kind, sort_key, id)` order.
        terms: Vec<SigExprId>,
        /// Reduction opcode.
        op: CombineOp,
    },
    /// Stateful operator over a persistent cell.
    State {
        /// Recompile-stable cell key.
        key: StateKey,
        /// Update rule.
        op: StateOp,
        /// Current-frame input expression.
        input: SigExprId,
        /// Rule parameter constant.
        param: ConstId,
        /// First-frame initial value constant.
        init: ConstId,
    },
    /// Forwarding node produced when patching deferred state inputs.
    Alias(SigExprId),
    /// Unresolved placeholder; must not survive link resolution.
    Placeholder,
}

/// One node in the field expression table.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldExprIR {
    /// Pooled constant, broadcast to every element.
    Const(ConstId),
    /// Signal broadcast to every element.
    BroadcastSig(SigExprId),
    /// Unary op per element.
    Map {
        /// Input field.
        src: FieldExprId,
        /// Opcode.
        op: UnaryOp,
    },
    /// Binary op per element pair.
    Zip {
        /// Left field.
        a: FieldExprId,
        /// Right field.
        b: FieldExprId,
        /// Opcode.
        op: BinaryOp,
    },
    /// Binary op between each element and one signal.
    ZipSig {
        /// Field input.
        field: FieldExprId,
        /// Signal input (broadcast).
        sig: SigExprId,
        /// Opcode.
        op: BinaryOp,
    },
    /// Per-element generator over the element index.
    MapIndexed {
        /// Generator.
        op: IndexedOp,
        /// First signal parameter.
        a: SigExprId,
        /// Second signal parameter.
        b: SigExprId,
    },
    /// Branch on a signal condition, whole-field.
    Select {
        /// Condition signal.
        cond: SigExprId,
        /// Field when the condition holds.
        a: FieldExprId,
        /// Field otherwise.
        b: FieldExprId,
    },
    /// Per-element affine transform of a vec2 field.
    Transform {
        /// Input field.
        src: FieldExprId,
        /// Uniform scale signal.
        scale: SigExprId,
        /// Offset signal (vec2).
        offset: SigExprId,
    },
    /// Multi-writer reduction over canonically ordered terms.
    BusCombine {
        /// Terms in canonical order.
        terms: Vec<FieldExprId>,
        /// Reduction opcode.
        op: CombineOp,
    },
}

// ─── TIME MODEL ─────────────────────────────────────────────────────

/// Wrap behavior of a cyclic time model.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CycleMode {
    /// Phase restarts at 0 every period.
    Loop,
    /// Phase reflects every other period.
    PingPong,
}

/// The program's single time model.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeModelIR {
    /// Plays once over a fixed duration; `phase01` is progress, clamped.
    Finite {
        /// Total duration in ms.
        duration_ms: f64,
    },
    /// Wraps every period, firing a wrap event per boundary crossing.
    Cyclic {
        /// Period in ms.
        period_ms: f64,
        /// Loop or ping-pong.
        mode: CycleMode,
    },
    /// Unbounded; `window_ms` frames the editor timeline only.
    Infinite {
        /// UI framing window in ms.
        window_ms: f64,
    },
}

// ─── SLOTS & SCHEDULE ───────────────────────────────────────────────

/// Which step family writes a slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeField {
    /// Absolute time in ms.
    AbsMs,
    /// Model time in ms.
    ModelMs,
    /// Normalized phase.
    Phase01,
}

/// Owning writer of an allocated slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotOwner {
    /// Written by the frame's time-derive step.
    Time(TimeField),
    /// Written by a node/bus eval of a signal expression.
    Sig(SigExprId),
    /// Reserved for a materialized field result.
    Field(FieldExprId),
}

/// Metadata for one allocated slot range.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotMeta {
    /// Base slot of the range.
    pub slot: ValueSlot,
    /// Value type stored at the base slot.
    pub ty: TypeDesc,
    /// Width of the range (bundle arity).
    pub arity: u32,
    /// Writing step family.
    pub owner: SlotOwner,
}

/// The designated time slots every program carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSlots {
    /// Absolute time in ms.
    pub abs_ms: ValueSlot,
    /// Model time in ms.
    pub model_ms: ValueSlot,
    /// Normalized phase.
    pub phase01: ValueSlot,
    /// Wrap event slot.
    pub wrap: EventSlot,
}

/// One step of the per-frame schedule.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Step {
    /// Resolve frame time against the time model; write the time slots;
    /// trigger the wrap event when a boundary was crossed in playback.
    TimeDerive,
    /// Evaluate one signal expression and write its slot.
    NodeEval {
        /// Expression to evaluate.
        expr: SigExprId,
        /// Destination slot.
        slot: ValueSlot,
    },
    /// Evaluate a bus combine node and write its slot.
    BusEval {
        /// Combine expression.
        expr: SigExprId,
        /// Destination slot.
        slot: ValueSlot,
        /// Bus name, for probes and telemetry.
        bus: String,
    },
    /// Materialize a field buffer at a fixed element count.
    Materialize {
        /// Field expression.
        field: FieldExprId,
        /// Element count.
        count: u32,
    },
    /// Assemble the frame's render passes from previously written slots and
    /// materialized buffers.
    RenderAssemble,
    /// Append probe records to the trace rings (capturing mode only).
    DebugProbe {
        /// Index into the program's probe table.
        probe: u32,
    },
}

// ─── RENDER PASS DESCRIPTORS ────────────────────────────────────────

/// IR-side mirror of the port crate's material selector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialIR {
    /// Filled circle.
    Circle,
    /// Filled quad.
    Quad,
    /// Soft-edged circle.
    SoftCircle,
}

/// IR-side mirror of the port crate's path verb.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathVerbIR {
    /// Begin subpath (x, y).
    MoveTo,
    /// Line segment (x, y).
    LineTo,
    /// Quadratic segment (cx, cy, x, y).
    QuadTo,
    /// Close subpath.
    Close,
}

/// IR-side clip region.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClipSpecIR {
    /// Axis-aligned rectangle.
    Rect {
        /// Left edge.
        x: f32,
        /// Top edge.
        y: f32,
        /// Width.
        w: f32,
        /// Height.
        h: f32,
    },
    /// Circle.
    Circle {
        /// Center x.
        cx: f32,
        /// Center y.
        cy: f32,
        /// Radius.
        r: f32,
    },
}

/// IR-side post-effect kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PostFxKindIR {
    /// Gaussian blur.
    Blur,
    /// Threshold bloom.
    Bloom,
    /// Edge-darkening vignette.
    Vignette,
    /// Color grading curve.
    ColorGrade,
}

/// One render pass descriptor; the render-assemble step evaluates the
/// referenced expressions and packs the port-crate payload.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderPassIR {
    /// Instanced 2D draw.
    Instances2D {
        /// Material for every instance.
        material: MaterialIR,
        /// Instance count (also the materialization count for attributes).
        count: u32,
        /// Position field (vec2).
        pos: FieldExprId,
        /// Radius field (float).
        radius: FieldExprId,
        /// Color field (rgba).
        color: FieldExprId,
        /// Optional rotation field (float, radians).
        rot: Option<FieldExprId>,
        /// Optional non-uniform scale field (vec2).
        scale_xy: Option<FieldExprId>,
        /// Depth sort key signal.
        z: SigExprId,
    },
    /// Stroked 2D path draw.
    Paths2D {
        /// Path verbs.
        verbs: Vec<PathVerbIR>,
        /// Path parameter buffer.
        params: Vec<f32>,
        /// Stroke width signal.
        width: SigExprId,
        /// Stroke color signal.
        color: SigExprId,
        /// Depth sort key signal.
        z: SigExprId,
    },
    /// Clipped subgroup over child pass indices.
    ClipGroup {
        /// Clip region.
        clip: ClipSpecIR,
        /// Indices of child passes in the program's pass table.
        children: Vec<u32>,
        /// Depth sort key signal.
        z: SigExprId,
    },
    /// Full-frame post effect.
    PostFx {
        /// Effect kind.
        kind: PostFxKindIR,
        /// Named scalar parameter signals, sorted by name.
        params: Vec<(String, SigExprId)>,
    },
}

// ─── DEBUG PROBES ───────────────────────────────────────────────────

/// What a probe reads.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeTarget {
    /// A value-store slot.
    Slot(ValueSlot),
    /// A materialized field buffer.
    Field(FieldExprId),
}

/// Record encoding selected for a probe.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProbeMode {
    /// One f32.
    Scalar,
    /// Two f32 lanes.
    Vec2,
    /// Four f32 lanes.
    Color,
    /// min/mean/max over a field buffer.
    FieldStats,
}

/// One debug probe declaration.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugProbeIR {
    /// Recompile-stable probe id.
    pub id: Hash,
    /// Read target.
    pub target: ProbeTarget,
    /// Record encoding.
    pub mode: ProbeMode,
}

// ─── PROGRAM ────────────────────────────────────────────────────────

/// Errors raised by [`CompiledProgramIR::validate`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IrError {
    /// A referenced expression id is out of table bounds.
    #[error("expression id out of bounds: {0}")]
    ExprOutOfBounds(u32),
    /// A referenced constant id is out of pool bounds.
    #[error("constant id out of bounds: {0}")]
    ConstOutOfBounds(u32),
    /// An unresolved placeholder survived linking.
    #[error("unresolved placeholder expression: {0}")]
    UnresolvedPlaceholder(u32),
    /// Two slot ranges overlap.
    #[error("slot ranges overlap at slot {0}")]
    SlotOverlap(u32),
    /// A step reads a slot no earlier step writes.
    #[error("schedule reads slot {0} before any write")]
    ScheduleOrder(u32),
}

/// The immutable product of one compile.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompiledProgramIR {
    /// Semver IR version, checked on hot-swap.
    pub ir_version: String,
    /// Caller-supplied compile timestamp; excluded from determinism.
    pub compiled_at_ms: u64,
    /// Seed baked into seeded kernels (jitter).
    pub seed: u64,
    /// The program's time model.
    pub time_model: TimeModelIR,
    /// Designated time slots.
    pub time_slots: TimeSlots,
    /// Dense signal expression table.
    pub sig_exprs: Vec<SigExprIR>,
    /// Result type per signal expression (parallel table).
    pub sig_types: Vec<TypeDesc>,
    /// Dense field expression table.
    pub field_exprs: Vec<FieldExprIR>,
    /// Result type per field expression (parallel table).
    pub field_types: Vec<TypeDesc>,
    /// Constant pool.
    pub consts: Vec<Value>,
    /// Slot metadata in allocation order.
    pub slot_meta: Vec<SlotMeta>,
    /// Total allocated slots (bundles included).
    pub slot_count: u32,
    /// Total allocated event slots.
    pub event_slot_count: u32,
    /// Linear per-frame schedule.
    pub schedule: Vec<Step>,
    /// Render pass descriptors, in lowering order.
    pub render_passes: Vec<RenderPassIR>,
    /// Debug probe table.
    pub probes: Vec<DebugProbeIR>,
    /// Visible block outputs, keyed `"block.port"`.
    pub outputs: BTreeMap<String, ValueSlot>,
}

impl CompiledProgramIR {
    /// Looks up a pooled constant.
    #[must_use]
    pub fn const_value(&self, id: ConstId) -> Option<&Value> {
        self.consts.get(id.index())
    }

    /// Iterates the persistent state keys this program addresses.
    pub fn state_keys(&self) -> impl Iterator<Item = StateKey> + '_ {
        self.sig_exprs.iter().filter_map(|expr| match expr {
            SigExprIR::State { key, .. } => Some(*key),
            _ => None,
        })
    }

    /// Checks the structural IR invariants: ids in range, no surviving
    /// placeholders, slot ranges disjoint, schedule writes-before-reads.
    pub fn validate(&self) -> Result<(), IrError> {
        self.validate_sig_refs()?;
        self.validate_field_refs()?;
        self.validate_slots()?;
        self.validate_schedule()
    }

    fn check_sig(&self, id: SigExprId) -> Result<(), IrError> {
        if id.index() >= self.sig_exprs.len() {
            return Err(IrError::ExprOutOfBounds(id.0));
        }
        Ok(())
    }

    fn check_field(&self, id: FieldExprId) -> Result<(), IrError> {
        if id.index() >= self.field_exprs.len() {
            return Err(IrError::ExprOutOfBounds(id.0));
        }
        Ok(())
    }

    fn check_const(&self, id: ConstId) -> Result<(), IrError> {
        if id.index() >= self.consts.len() {
            return Err(IrError::ConstOutOfBounds(id.0));
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn validate_sig_refs(&self) -> Result<(), IrError> {
        for (i, expr) in self.sig_exprs.iter().enumerate() {
            match expr {
                SigExprIR::Const(c) => self.check_const(*c)?,
                SigExprIR::Map { src, .. } => self.check_sig(*src)?,
                SigExprIR::Zip { a, b, .. } => {
                    self.check_sig(*a)?;
                    self.check_sig(*b)?;
                }
                SigExprIR::Select { cond, a, b } => {
                    self.check_sig(*cond)?;
                    self.check_sig(*a)?;
                    self.check_sig(*b)?;
                }
                SigExprIR::BusCombine { terms, .. } => {
                    for t in terms {
                        self.check_sig(*t)?;
                    }
                }
                SigExprIR::State {
                    input, param, init, ..
                } => {
                    self.check_sig(*input)?;
                    self.check_const(*param)?;
                    self.check_const(*init)?;
                }
                SigExprIR::Alias(src) => self.check_sig(*src)?,
                SigExprIR::Placeholder => {
                    return Err(IrError::UnresolvedPlaceholder(i as u32));
                }
                SigExprIR::TimeAbsMs
                | SigExprIR::TimeModelMs
                | SigExprIR::Phase01
                | SigExprIR::Event(_) => {}
            }
        }
        Ok(())
    }

    fn validate_field_refs(&self) -> Result<(), IrError> {
        for expr in &self.field_exprs {
            match expr {
                FieldExprIR::Const(c) => self.check_const(*c)?,
                FieldExprIR::BroadcastSig(s) => self.check_sig(*s)?,
                FieldExprIR::Map { src, .. } => self.check_field(*src)?,
                FieldExprIR::Zip { a, b, .. } => {
                    self.check_field(*a)?;
                    self.check_field(*b)?;
                }
                FieldExprIR::ZipSig { field, sig, .. } => {
                    self.check_field(*field)?;
                    self.check_sig(*sig)?;
                }
                FieldExprIR::MapIndexed { a, b, .. } => {
                    self.check_sig(*a)?;
                    self.check_sig(*b)?;
                }
                FieldExprIR::Select { cond, a, b } => {
                    self.check_sig(*cond)?;
                    self.check_field(*a)?;
                    self.check_field(*b)?;
                }
                FieldExprIR::Transform { src, scale, offset } => {
                    self.check_field(*src)?;
                    self.check_sig(*scale)?;
                    self.check_sig(*offset)?;
                }
                FieldExprIR::BusCombine { terms, .. } => {
                    for t in terms {
                        self.check_field(*t)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_slots(&self) -> Result<(), IrError> {
        let mut cursor = 0u32;
        for meta in &self.slot_meta {
            // Allocation order is ascending; any range that starts below the
            // cursor overlaps its predecessor.
            if meta.slot.0 < cursor {
                return Err(IrError::SlotOverlap(meta.slot.0));
            }
            cursor = meta.slot.0 + meta.arity;
        }
        if cursor > self.slot_count {
            return Err(IrError::SlotOverlap(cursor));
        }
        Ok(())
    }

    fn validate_schedule(&self) -> Result<(), IrError> {
        let mut written = vec![false; self.slot_count as usize];
        let mut time_derived = false;
        for step in &self.schedule {
            match step {
                Step::TimeDerive => {
                    time_derived = true;
                    for slot in [
                        self.time_slots.abs_ms,
                        self.time_slots.model_ms,
                        self.time_slots.phase01,
                    ] {
                        if let Some(w) = written.get_mut(slot.index()) {
                            *w = true;
                        }
                    }
                }
                Step::NodeEval { expr, slot } | Step::BusEval { expr, slot, .. } => {
                    self.check_expr_reads(*expr, &written, time_derived)?;
                    if let Some(w) = written.get_mut(slot.index()) {
                        *w = true;
                    }
                }
                Step::Materialize { .. } | Step::RenderAssemble | Step::DebugProbe { .. } => {}
            }
        }
        Ok(())
    }

    fn check_expr_reads(
        &self,
        expr: SigExprId,
        written: &[bool],
        time_derived: bool,
    ) -> Result<(), IrError> {
        // Time leaves are the only slot reads expressions perform; everything
        // else flows through the frame cache. The schedule invariant is that
        // a time-derive step precedes any expression referencing time.
        let Some(node) = self.sig_exprs.get(expr.index()) else {
            return Err(IrError::ExprOutOfBounds(expr.0));
        };
        match node {
            SigExprIR::TimeAbsMs | SigExprIR::TimeModelMs | SigExprIR::Phase01 => {
                if !time_derived {
                    return Err(IrError::ScheduleOrder(self.time_slots.abs_ms.0));
                }
            }
            SigExprIR::Map { src, .. } | SigExprIR::Alias(src) => {
                self.check_expr_reads(*src, written, time_derived)?;
            }
            SigExprIR::Zip { a, b, .. } => {
                self.check_expr_reads(*a, written, time_derived)?;
                self.check_expr_reads(*b, written, time_derived)?;
            }
            SigExprIR::Select { cond, a, b } => {
                self.check_expr_reads(*cond, written, time_derived)?;
                self.check_expr_reads(*a, written, time_derived)?;
                self.check_expr_reads(*b, written, time_derived)?;
            }
            SigExprIR::BusCombine { terms, .. } => {
                for t in terms {
                    self.check_expr_reads(*t, written, time_derived)?;
                }
            }
            SigExprIR::State { input, .. } => {
                self.check_expr_reads(*input, written, time_derived)?;
            }
            _ => {}
        }
        Ok(())
    }
}
