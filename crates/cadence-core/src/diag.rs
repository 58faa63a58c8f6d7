// SPDX-License-Identifier: Apache-2.0
//! Structured compile diagnostics.
//!
//! Passes never format for display and never bail on recoverable problems:
//! they push [`Diagnostic`] records into a [`DiagSink`] and keep going. Only
//! fatal codes stop the pass sequence, and only because the next pass's
//! structural preconditions would not hold.

use crate::ident::{BlockId, BusId, EdgeId, PortId};

/// Diagnostic severity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    /// Informational (e.g. auto-publication notices).
    Info,
    /// Compilation succeeded; behavior may surprise.
    Warning,
    /// Recoverable: the program still runs, affected outputs read defaults.
    Error,
    /// Unrecoverable: no program is produced.
    Fatal,
}

/// Stable diagnostic codes.
///
/// These names are the cross-collaborator contract; the editor keys its
/// highlighting and help text off them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DiagCode {
    /// A referenced block type is not registered.
    UnknownBlockType,
    /// No constant-provider block type exists for a default source's type.
    MaterializationFailed,
    /// An edge endpoint references a missing block, port, or bus.
    InvalidEndpoint,
    /// Both endpoints of an edge are buses.
    BusToBusEdge,
    /// Edge types are incompatible (after applying its transforms).
    TypeMismatch,
    /// A transform chain's steps do not compose type-wise.
    AdapterChainIncompatible,
    /// A referenced adapter is not registered.
    AdapterNotFound,
    /// A referenced lens is not registered.
    LensNotFound,
    /// A transform's declared types reject the incoming value.
    TransformIncompatible,
    /// The patch has no time root block.
    MissingTimeRoot,
    /// The patch has more than one time root block.
    MultipleTimeRoots,
    /// A dependency cycle not broken by stateful operators.
    CycleDetected,
    /// An input has no writers and no default source.
    UnconnectedInput,
    /// An `error`-policy input has two or more writers.
    MultiInputForbidden,
    /// A block's lowering did not produce a declared output.
    PortMissing,
    /// A block's lowering failed (bad params, malformed outputs).
    LoweringFailed,
    /// An IR post-condition was violated.
    IrValidationFailed,
    /// A time root auto-published onto a bus.
    AutoPublication,
    /// A transform without IR lowering was skipped.
    TransformMissingIr,
    /// A listener reads a bus with zero publishers.
    EmptyBus,
}

impl DiagCode {
    /// The severity this code carries.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::AutoPublication => Severity::Info,
            Self::TransformMissingIr | Self::EmptyBus => Severity::Warning,
            Self::MaterializationFailed
            | Self::TypeMismatch
            | Self::AdapterChainIncompatible
            | Self::AdapterNotFound
            | Self::LensNotFound
            | Self::TransformIncompatible
            | Self::UnconnectedInput
            | Self::MultiInputForbidden
            | Self::PortMissing
            | Self::LoweringFailed => Severity::Error,
            Self::UnknownBlockType
            | Self::InvalidEndpoint
            | Self::BusToBusEdge
            | Self::MissingTimeRoot
            | Self::MultipleTimeRoots
            | Self::CycleDetected
            | Self::IrValidationFailed => Severity::Fatal,
        }
    }
}

/// Pointers the editor uses to highlight the offending patch element.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Where {
    /// Offending block, when known.
    pub block: Option<BlockId>,
    /// Offending port, when known.
    pub port: Option<PortId>,
    /// Offending edge, when known.
    pub edge: Option<EdgeId>,
    /// Offending bus, when known.
    pub bus: Option<BusId>,
}

impl Where {
    /// Location pointing at a block.
    #[must_use]
    pub fn block(id: &BlockId) -> Self {
        Self {
            block: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Location pointing at a port on a block.
    #[must_use]
    pub fn port(block: &BlockId, port: &PortId) -> Self {
        Self {
            block: Some(block.clone()),
            port: Some(port.clone()),
            ..Self::default()
        }
    }

    /// Location pointing at an edge.
    #[must_use]
    pub fn edge(id: &EdgeId) -> Self {
        Self {
            edge: Some(id.clone()),
            ..Self::default()
        }
    }

    /// Location pointing at a bus.
    #[must_use]
    pub fn bus(id: &BusId) -> Self {
        Self {
            bus: Some(id.clone()),
            ..Self::default()
        }
    }
}

/// One structured diagnostic.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    /// Stable code.
    pub code: DiagCode,
    /// Severity (derived from the code).
    pub severity: Severity,
    /// Terse description; never formatted for end-user display.
    pub message: String,
    /// Patch location pointers.
    pub where_: Where,
}

/// Accumulator shared by the pass pipeline.
#[derive(Debug, Default)]
pub struct DiagSink {
    diags: Vec<Diagnostic>,
    fatal: bool,
}

impl DiagSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic with its code-derived severity.
    pub fn emit(&mut self, code: DiagCode, message: impl Into<String>, where_: Where) {
        let severity = code.severity();
        if severity == Severity::Fatal {
            self.fatal = true;
        }
        self.diags.push(Diagnostic {
            code,
            severity,
            message: message.into(),
            where_,
        });
    }

    /// True once any fatal diagnostic has been recorded.
    #[must_use]
    pub fn has_fatal(&self) -> bool {
        self.fatal
    }

    /// Read access for passes that need to inspect prior findings.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Consumes the sink, yielding the accumulated diagnostics.
    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diags
    }
}
