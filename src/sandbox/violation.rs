// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observability hooks for sandbox policy violations (§4.5).
//!
//! These are reported in addition to, not instead of, the [`crate::proto::Errno`] the
//! guest sees: the guest gets `EACCES`, while an operator-facing observer gets to know
//! *why*, for auditing a guest that is actively probing the sandbox boundary.

use std::path::PathBuf;

/// The kind of sandbox policy a request tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// The normalized path resolved outside the sandbox root.
    PathTraversal { requested: PathBuf },
    /// An absolute path didn't match the root or any additional path rule.
    PathBlocked { requested: PathBuf },
    /// The request named a path component that isn't valid UTF-8.
    InvalidEncoding,
    /// `OPEN` was called while the handle table had no free slots.
    HandleTableExhausted,
    /// An operation referenced a handle that was never allocated, or was already closed.
    UnknownHandle { handle: i32 },
    /// `OPEN` in a writing mode, `REMOVE`, or `RENAME` was attempted under `READ_ONLY`.
    WriteBlocked { requested: PathBuf },
    /// `REMOVE` was attempted under `READ_ONLY`.
    RemoveBlocked { requested: PathBuf },
    /// `RENAME` was attempted under `READ_ONLY`.
    RenameBlocked { requested: PathBuf },
    /// `SYSTEM` was attempted while `ALLOW_SYSTEM` is off.
    SystemBlocked,
    /// `EXIT` was attempted while `ALLOW_EXIT` is off.
    ExitBlocked,
}

/// Receives a callback for every sandbox violation, in addition to the `Errno` returned to
/// the guest.
pub trait ViolationObserver {
    fn on_violation(&mut self, kind: ViolationKind);
}

/// A [`ViolationObserver`] that records every violation it sees, for tests and demos.
#[derive(Debug, Default)]
pub struct ViolationLog {
    entries: Vec<ViolationKind>,
}

impl ViolationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[ViolationKind] {
        &self.entries
    }
}

impl ViolationObserver for ViolationLog {
    fn on_violation(&mut self, kind: ViolationKind) {
        tracing::warn!(?kind, "sandbox violation");
        self.entries.push(kind);
    }
}
