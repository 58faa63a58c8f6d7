// SPDX-License-Identifier: Apache-2.0
//! Render frame port contract for Cadence renderers.
//!
//! This crate defines the boundary between the Cadence schedule executor and
//! concrete renderers (Canvas2D, WebGL, native). It contains NO evaluation
//! logic and NO serialization logic — the executor assembles one
//! [`RenderFrameIR`] per frame and hands it across this boundary.
//!
//! # Design Principles
//!
//! - **Renderers are dumb** — they receive assembled frames and draw. No
//!   patch semantics, no expression evaluation, no combine modes.
//! - **No time ownership** — frame timing comes from the host's frame driver,
//!   never from the renderer.
//! - **Sorted on arrival** — `RenderFrameIR.passes` is already back-to-front
//!   by `z`; renderers draw in order.
//!
//! # Crate Features
//!
//! - `std` (default): Enables std library. Disable for no_std contexts.

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod frame;
mod port;

pub use frame::*;
pub use port::*;
