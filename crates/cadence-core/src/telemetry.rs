// SPDX-License-Identifier: Apache-2.0

// Telemetry helpers for JSONL logging when the `telemetry` feature is
// enabled. Manually formats JSON to avoid a non-deterministic serde_json
// dependency; the core bans JSON serialization everywhere else.

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

#[cfg(feature = "telemetry")]
fn emit(kind: &str, fields: &str) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"timestamp_micros":{},"event":"{}",{}}}"#,
        ts_micros(),
        kind,
        fields
    );
    let _ = out.write_all(b"\n");
}

/// Emits a compile-finished telemetry event.
///
/// Logs expression/step counts and the diagnostic tally as a JSON line to
/// stdout when the `telemetry` feature is enabled. Best-effort: I/O errors
/// are ignored.
#[allow(unused_variables)]
pub fn compile_done(sig_exprs: usize, field_exprs: usize, steps: usize, diagnostics: usize) {
    #[cfg(feature = "telemetry")]
    emit(
        "compile_done",
        &format!(
            r#""sig_exprs":{sig_exprs},"field_exprs":{field_exprs},"steps":{steps},"diagnostics":{diagnostics}"#
        ),
    );
}

/// Emits a frame-finished telemetry event.
#[allow(unused_variables)]
pub fn frame_done(frame_index: u64, passes: usize, scrub: bool) {
    #[cfg(feature = "telemetry")]
    emit(
        "frame_done",
        &format!(r#""frame":{frame_index},"passes":{passes},"scrub":{scrub}"#),
    );
}

/// Emits a seed-context line (hex-shortened) when a program is installed.
#[allow(unused_variables)]
pub fn program_installed(seed: u64, state_cells: usize) {
    #[cfg(feature = "telemetry")]
    emit(
        "program_installed",
        &format!(
            r#""seed":"{}","state_cells":{state_cells}"#,
            hex::encode(seed.to_le_bytes())
        ),
    );
}
