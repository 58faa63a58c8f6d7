// SPDX-License-Identifier: Apache-2.0
//! CBOR program persistence: round-trip fidelity and the hot-swap version
//! gate. Requires the `serde` feature.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use cadence_core::codec::{decode_program, encode_program, CodecError};
use cadence_core::{compile, CompileOptions, Registries};
use common::{compile_ok, wrap_scene_patch};

#[test]
fn encode_decode_round_trips_bit_exact() {
    let (program, _) = compile_ok(&wrap_scene_patch());
    let bytes = encode_program(&program).unwrap();
    let decoded = decode_program(&bytes).unwrap();
    assert_eq!(program, decoded);
}

#[test]
fn identical_programs_encode_to_identical_bytes() {
    let (a, _) = compile_ok(&wrap_scene_patch());
    let (b, _) = compile_ok(&wrap_scene_patch());
    assert_eq!(encode_program(&a).unwrap(), encode_program(&b).unwrap());
}

#[test]
fn incompatible_major_version_is_rejected() {
    let regs = Registries::standard();
    let opts = CompileOptions {
        ir_version_tag: Some("2.0.0".to_owned()),
        ..CompileOptions::default()
    };
    let program = compile(&wrap_scene_patch(), &regs, &opts).program.unwrap();
    let bytes = encode_program(&program).unwrap();
    match decode_program(&bytes) {
        Err(CodecError::VersionMismatch { found, .. }) => assert_eq!(found, "2.0.0"),
        other => panic!("expected a version mismatch, got {other:?}"),
    }
}

#[test]
fn corrupt_bytes_are_a_decode_error() {
    let err = decode_program(&[0xff, 0x00, 0x13, 0x37]).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}
