// SPDX-License-Identifier: Apache-2.0
//! Deterministic CBOR persistence for the frozen program.
//!
//! CBOR via `ciborium` is the only serialization format: JSON is
//! non-deterministic (map ordering, float formatting) and is banned for IR
//! bytes. Decoding checks the stamped `ir_version`'s major component;
//! hot-swap callers fall back to recompiling from source on a mismatch.

use thiserror::Error;

use crate::ir::{CompiledProgramIR, IR_VERSION};

/// Codec failures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// CBOR encoding failed.
    #[error("encode failed: {0}")]
    Encode(String),
    /// CBOR decoding failed (corrupt or foreign bytes).
    #[error("decode failed: {0}")]
    Decode(String),
    /// The stamped version's major component is incompatible.
    #[error("ir version {found} incompatible with {expected}")]
    VersionMismatch {
        /// Version found in the decoded program.
        found: String,
        /// Version this build speaks.
        expected: String,
    },
}

fn major(version: &str) -> Option<&str> {
    version.split('.').next()
}

/// Encodes a program to CBOR bytes.
pub fn encode_program(program: &CompiledProgramIR) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(program, &mut buf).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Decodes a program from CBOR bytes, rejecting incompatible majors.
pub fn decode_program(bytes: &[u8]) -> Result<CompiledProgramIR, CodecError> {
    let program: CompiledProgramIR =
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decode(e.to_string()))?;
    if major(&program.ir_version) != major(IR_VERSION) {
        return Err(CodecError::VersionMismatch {
            found: program.ir_version,
            expected: IR_VERSION.to_owned(),
        });
    }
    Ok(program)
}
