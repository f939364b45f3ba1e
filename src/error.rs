// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tier-1 "library" errors (§7): returned from internal functions, never written to the wire.

/// Errors produced by the wire codec, operation table, and request parser.
///
/// These never cross the wire. A host processor that receives one of these from the
/// parser turns it into a [`crate::proto::ProtocolError`] `ERRO` response instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LibraryError {
    /// A write would exceed the caller-supplied buffer capacity.
    #[error("buffer full")]
    BufferFull,
    /// An argument was out of range or otherwise unusable (e.g. an `int_size` not in
    /// `{1, 2, 4, 8}`).
    #[error("invalid argument")]
    InvalidArg,
    /// A `CALL` opcode was dispatched before any `CNFG` chunk had been observed.
    #[error("session not initialized: missing CNFG")]
    NotInitialized,
    /// Generic container/chunk structure error with no more specific classification.
    #[error("parse error")]
    ParseError,
    /// A chunk's declared size would read or write past the end of the container.
    #[error("chunk payload overflows its container")]
    DataOverflow,
    /// The container's declared RIFF size exceeds the buffer that holds it.
    #[error("RIFF header declares a size larger than the available buffer")]
    HeaderOverflow,
    /// The first four bytes of the container were not `RIFF`.
    #[error("bad RIFF magic")]
    BadRiffMagic,
    /// The RIFF form type was not `SEMI`.
    #[error("bad RIFF form type, expected SEMI")]
    BadFormType,
    /// A lookup (handle, opcode, path rule) found nothing.
    #[error("not found")]
    NotFound,
    /// A `CALL.opcode` has no row in the operation table.
    #[error("unknown opcode")]
    UnknownOpcode,
}

impl LibraryError {
    /// Maps a parse-time library error onto the protocol error that the host reports to
    /// the guest (§7: "the host turns unrecoverable [library errors] into a protocol
    /// `ERRO`").
    #[must_use]
    pub fn to_protocol_error(self) -> crate::proto::ProtocolError {
        use crate::proto::ProtocolError;
        match self {
            Self::NotInitialized => ProtocolError::MissingCnfg,
            Self::UnknownOpcode => ProtocolError::UnsupportedOp,
            Self::InvalidArg => ProtocolError::InvalidParams,
            Self::BufferFull
            | Self::ParseError
            | Self::DataOverflow
            | Self::HeaderOverflow
            | Self::BadRiffMagic
            | Self::BadFormType
            | Self::NotFound => ProtocolError::MalformedRiff,
        }
    }
}

/// A specialized [`Result`](core::result::Result) for wire-codec and parser operations.
pub type Result<T> = core::result::Result<T, LibraryError>;
