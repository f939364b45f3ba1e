// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pass, allocation-free request parsing (§4.3).
//!
//! [`parse`] walks a `RIFF`/`SEMI` container exactly once, recording the byte offsets of
//! every chunk the operation table says it should contain rather than copying payloads
//! out. The caller (the [`crate::processor::Processor`]) reads chunk contents directly out
//! of the same buffer afterwards.

use crate::config::HostConfig;
use crate::error::{LibraryError, Result};
use crate::proto::{ChunkKind, Opcode, row_for};
use crate::wire::{ChunkHeader, FourCc, RiffHeader, read_u16_le};

/// The largest number of request chunks any operation table row declares (`RENAME`: two
/// `DATA` chunks interleaved with two `PARM` length chunks). Sized from the table, not
/// guessed.
pub const MAX_REQUEST_CHUNKS: usize = 4;

/// A chunk's payload location inside the buffer that was parsed, recorded but not copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef {
    pub kind: ChunkKind,
    pub offset: usize,
    pub len: usize,
}

/// The result of successfully parsing one request container.
#[derive(Debug, Clone, Copy)]
pub struct DecodedView {
    /// Configuration in effect for this request: either freshly declared by a `CNFG`
    /// chunk in this message, or carried over from the session (§4.4 step 1).
    pub config: HostConfig,
    /// Whether this message itself carried a `CNFG` chunk.
    pub config_declared_here: bool,
    pub opcode: Opcode,
    pub chunk_count: usize,
    chunks: [ChunkRef; MAX_REQUEST_CHUNKS],
}

impl DecodedView {
    /// The request chunks for this opcode's `CALL`, in table order.
    #[must_use]
    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks[..self.chunk_count]
    }
}

/// Parses a `RIFF`/`SEMI` request container out of `buf`.
///
/// `session_config` is the configuration already established for the session, if any; a
/// `CNFG` chunk in this message takes precedence and, when present, becomes the session's
/// configuration going forward. If neither this message nor the session has a
/// configuration yet, parsing fails with [`LibraryError::NotInitialized`] as soon as a
/// `CALL` chunk is reached, since `PARM` values cannot be decoded without a declared
/// int size and byte order.
pub fn parse(buf: &[u8], session_config: Option<HostConfig>) -> Result<DecodedView> {
    let riff = RiffHeader::parse(buf)?;
    // `size` counts everything after the tag+size prefix (form type plus all chunks),
    // matching the classic RIFF convention.
    let total_len = 8usize
        .checked_add(riff.size as usize)
        .ok_or(LibraryError::HeaderOverflow)?;
    if total_len > buf.len() {
        return Err(LibraryError::HeaderOverflow);
    }

    let mut offset = RiffHeader::LEN;
    let mut config = session_config;
    let mut config_declared_here = false;
    let mut call: Option<(usize, usize)> = None;

    while offset + ChunkHeader::LEN <= total_len {
        let header = ChunkHeader::parse(buf, offset)?;
        let payload_offset = ChunkHeader::payload_offset(offset);
        let payload_end = payload_offset
            .checked_add(header.size as usize)
            .ok_or(LibraryError::DataOverflow)?;
        if payload_end > total_len {
            return Err(LibraryError::DataOverflow);
        }

        if header.tag == FourCc::CNFG {
            config = Some(HostConfig::parse(&buf[payload_offset..payload_end])?);
            config_declared_here = true;
        } else if header.tag == FourCc::CALL {
            call = Some((payload_offset, payload_end));
        }
        // Any other top-level chunk (forward-compatible extensions) is skipped.

        offset = header.next_offset(offset);
    }

    let (call_start, call_end) = call.ok_or(LibraryError::ParseError)?;
    let config = config.ok_or(LibraryError::NotInitialized)?;

    let opcode_raw = read_u16_le(buf, call_start)?;
    let opcode = Opcode::from_u16(opcode_raw)?;
    let row = row_for(opcode);
    if row.request.len() > MAX_REQUEST_CHUNKS {
        return Err(LibraryError::ParseError);
    }

    let mut chunks = [ChunkRef { kind: ChunkKind::Int, offset: 0, len: 0 }; MAX_REQUEST_CHUNKS];
    let mut cursor = call_start + 2;
    for (i, kind) in row.request.iter().enumerate() {
        if cursor + ChunkHeader::LEN > call_end {
            return Err(LibraryError::ParseError);
        }
        let header = ChunkHeader::parse(buf, cursor)?;
        let expected_tag = if *kind == ChunkKind::Data { FourCc::DATA } else { FourCc::PARM };
        if header.tag != expected_tag {
            return Err(LibraryError::ParseError);
        }
        let payload_offset = ChunkHeader::payload_offset(cursor);
        let payload_end = payload_offset
            .checked_add(header.size as usize)
            .ok_or(LibraryError::DataOverflow)?;
        if payload_end > call_end {
            return Err(LibraryError::DataOverflow);
        }
        chunks[i] = ChunkRef { kind: *kind, offset: payload_offset, len: header.size as usize };
        cursor = header.next_offset(cursor);
    }

    Ok(DecodedView {
        config,
        config_declared_here,
        opcode,
        chunk_count: row.request.len(),
        chunks,
    })
}
