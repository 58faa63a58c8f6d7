// SPDX-License-Identifier: Apache-2.0
//! cadence-core: patch compiler, typed expression IR, and scheduled frame
//! runtime for a node-based animation editor.
//!
//! The editor hands [`compile`] a patch snapshot (blocks, edges, buses) and
//! gets back a frozen [`CompiledProgramIR`] plus structured diagnostics; a
//! [`ScheduleExecutor`] then executes the program's step schedule every
//! frame and emits one `RenderFrameIR` across the `cadence-scene-port`
//! boundary. Same patch, same registries, same seed: byte-identical IR
//! modulo the compile timestamp.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self
)]

/// Standard block palette (time roots, sources, signal/field/render blocks).
pub mod blocks;
/// The compiler pipeline, pass by pass.
pub mod passes;
/// The scheduled runtime evaluator.
pub mod runtime;
/// Standard adapters and lenses.
pub mod transforms;

mod builder;
mod combine;
mod const_pool;
mod diag;
mod ident;
mod ir;
mod patch;
mod registry;
mod telemetry;
mod types;
mod value;

#[cfg(feature = "serde")]
/// CBOR persistence for the frozen program (`serde` feature).
pub mod codec;

// Re-exports for stable public API
/// IR build scope and typed expression refs.
pub use builder::{ExprRef, IrBuilder, IrTypeError, ValueRef};
/// The combine kernel shared by buses and input slots.
pub use combine::{combine_refs, reduce_values, CombineBuildFn, CombineError, CombineRegistry};
/// Constant pool and slot allocation.
pub use const_pool::{ConstPool, SlotAllocator};
/// Structured compile diagnostics.
pub use diag::{DiagCode, DiagSink, Diagnostic, Severity, Where};
/// Identifier types and stable-key hashing.
pub use ident::{
    make_probe_id, make_state_key, BlockId, BusId, ConstId, EdgeId, EventSlot, FieldExprId, Hash,
    PortId, SigExprId, StateKey, ValueSlot,
};
/// The frozen IR: expression tables, schedule, slots, time model.
pub use ir::{
    BinaryOp, ClipSpecIR, CombineOp, CompiledProgramIR, CycleMode, DebugProbeIR, FieldExprIR,
    IndexedOp, IrError, MaterialIR, PathVerbIR, PostFxKindIR, ProbeMode, ProbeTarget,
    RenderPassIR, SigExprIR, SlotMeta, SlotOwner, StateOp, Step, TimeField, TimeModelIR,
    TimeSlots, UnaryOp, IR_VERSION,
};
/// The compiler pipeline.
pub use passes::{compile, CompileOptions, CompileOutput};
/// The patch data model the editor hands over.
pub use patch::{
    Block, BlockRole, Bus, BusCombineMode, CombineMode, CombinePolicy, CombineWhen, Edge,
    Endpoint, Patch, TransformStep,
};
/// Block and transform registries plus the lowering context.
pub use registry::{
    BlockDef, BlockRegistry, LowerCtx, LowerError, LowerFn, PortDef, Registries, RegistryError,
    TransformDef, TransformKind, TransformLowerFn, TransformRegistry,
};
/// The scheduled runtime evaluator.
pub use runtime::{
    FieldBuffer, FrameInput, FrameOutput, PlayMode, ScheduleExecutor, TraceController, TraceMode,
    SCRUB_DELTA_MS,
};
/// Value descriptors and the compatibility relation.
pub use types::{is_compatible, Domain, Semantics, TypeCategory, TypeDesc, Unit, World};
/// Runtime values.
pub use value::Value;
