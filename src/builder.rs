// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The guest-side request builder (C3).
//!
//! Mirrors [`crate::parser`] on the way in: both consult [`crate::proto::table`] as the
//! single source of truth for an opcode's wire shape, so there is exactly one place that
//! would need to change if a new opcode or parameter were added.

use crate::config::HostConfig;
use crate::error::{LibraryError, Result};
use crate::proto::{ChunkKind, Opcode, row_for};
use crate::wire::int::{encode_sint, encode_uint};
use crate::wire::{ChunkCursor, FourCc, RiffHeader, pad_to_even};

/// One argument to a [`RequestBuilder::call`], tagged with the same [`ChunkKind`] the
/// operation table declares for that position.
#[derive(Debug, Clone, Copy)]
pub enum Param<'a> {
    Int(i64),
    Ptr(u64),
    Data(&'a [u8]),
}

/// Builds a single `RIFF`/`SEMI` request container into a caller-supplied buffer.
///
/// `config` is written as a leading `CNFG` chunk only when [`RequestBuilder::new`] is
/// given `Some`; pass `None` for every request after the first one on a session, since the
/// host retains the configuration once declared.
pub struct RequestBuilder<'a> {
    buf: &'a mut [u8],
    cursor: usize,
    config: HostConfig,
}

impl<'a> RequestBuilder<'a> {
    /// Starts a request into `buf`, reserving space for the outer `RIFF` header.
    ///
    /// `declare_config` writes a `CNFG` chunk up front when `Some`; the chosen
    /// [`HostConfig`] is also used to encode this request's own `PARM` values, so it must
    /// be supplied even when `None` (inherited from a prior call).
    pub fn new(buf: &'a mut [u8], config: HostConfig, declare_config: bool) -> Result<Self> {
        let mut cursor = RiffHeader::LEN;
        if declare_config {
            let cnfg = ChunkCursor::open(buf, cursor, FourCc::CNFG)?;
            let payload = cnfg.payload_offset();
            let end = payload + HostConfig::PAYLOAD_LEN;
            config.write(&mut buf[payload..end])?;
            cursor = cnfg.finish(buf, end)?;
        }
        Ok(Self { buf, cursor, config })
    }

    /// Encodes `opcode`'s `CALL` chunk with `args` in table order, validates the argument
    /// count and kinds against the operation table, and finishes the container.
    ///
    /// Per §9's "in-place response writing", the host writes its reply back into this same
    /// buffer at this same address, so the guest must hand over a buffer with room for it:
    /// after `CALL`, this also lays down empty placeholder `RETN` and `ERRO` chunks sized
    /// from the operation table (a fixed-width `result`/`errno` pair, plus any nested
    /// `PARM`/`DATA` children the response row declares — `DATA` children are sized from
    /// whichever already-supplied argument carries the expected reply length, e.g. `READ`'s
    /// `count` or `TMPNAM`'s `maxlen`). Returns the total number of bytes written, which is
    /// also the minimum buffer size the caller must keep valid until the response arrives.
    pub fn call(mut self, opcode: Opcode, args: &[Param<'_>]) -> Result<usize> {
        let row = row_for(opcode);
        if row.request.len() != args.len() {
            return Err(LibraryError::InvalidArg);
        }
        for (kind, arg) in row.request.iter().zip(args) {
            let matches = matches!(
                (kind, arg),
                (ChunkKind::Int, Param::Int(_))
                    | (ChunkKind::Ptr, Param::Ptr(_))
                    | (ChunkKind::Data, Param::Data(_))
            );
            if !matches {
                return Err(LibraryError::InvalidArg);
            }
        }

        let call = ChunkCursor::open(self.buf, self.cursor, FourCc::CALL)?;
        let call_payload = call.payload_offset();
        crate::wire::write_u16_le(self.buf, call_payload, opcode.as_u16())?;

        let mut chunk_cursor = call_payload + 2;
        for arg in args {
            chunk_cursor = self.write_arg(chunk_cursor, *arg)?;
        }
        let call_end = call.finish(self.buf, chunk_cursor)?;

        let retn = ChunkCursor::open(self.buf, call_end, FourCc::RETN)?;
        let retn_payload = retn.payload_offset();
        let retn_len = response_payload_len(opcode, args, self.config);
        let retn_payload_end = retn_payload.checked_add(retn_len).ok_or(LibraryError::BufferFull)?;
        self.buf.get_mut(retn_payload..retn_payload_end).ok_or(LibraryError::BufferFull)?.fill(0);
        let retn_end = retn.finish(self.buf, retn_payload_end)?;

        let erro = ChunkCursor::open(self.buf, retn_end, FourCc::ERRO)?;
        let erro_payload = erro.payload_offset();
        let erro_payload_end = erro_payload + 4;
        self.buf.get_mut(erro_payload..erro_payload_end).ok_or(LibraryError::BufferFull)?.fill(0);
        let erro_end = erro.finish(self.buf, erro_payload_end)?;

        let size = u32::try_from(erro_end - 8).map_err(|_| LibraryError::DataOverflow)?;
        RiffHeader { size, form_type: FourCc::SEMI }.write(self.buf)?;
        Ok(erro_end)
    }

    fn write_arg(&mut self, offset: usize, arg: Param<'_>) -> Result<usize> {
        match arg {
            Param::Int(value) => {
                let cursor = ChunkCursor::open(self.buf, offset, FourCc::PARM)?;
                let payload = cursor.payload_offset();
                let end = payload + self.config.int_size.bytes();
                encode_sint(&mut self.buf[payload..end], value, self.config.int_size, self.config.endianness)?;
                cursor.finish(self.buf, end)
            }
            Param::Ptr(value) => {
                let cursor = ChunkCursor::open(self.buf, offset, FourCc::PARM)?;
                let payload = cursor.payload_offset();
                let end = payload + self.config.ptr_size.bytes();
                encode_uint(&mut self.buf[payload..end], value, self.config.ptr_size, self.config.endianness)?;
                cursor.finish(self.buf, end)
            }
            Param::Data(bytes) => {
                let cursor = ChunkCursor::open(self.buf, offset, FourCc::DATA)?;
                let payload = cursor.payload_offset();
                let end = payload.checked_add(bytes.len()).ok_or(LibraryError::BufferFull)?;
                self.buf.get_mut(payload..end).ok_or(LibraryError::BufferFull)?.copy_from_slice(bytes);
                cursor.finish(self.buf, end)
            }
        }
    }
}

/// Computes the size of the `RETN` placeholder `call` must pre-allocate: the flat
/// `result`/`errno` prefix plus every nested chunk the response row declares.
fn response_payload_len(opcode: Opcode, args: &[Param<'_>], config: HostConfig) -> usize {
    let row = row_for(opcode);
    let mut len = config.int_size.bytes() + 4;
    for kind in row.response {
        let payload = match kind {
            ChunkKind::Int => config.int_size.bytes(),
            ChunkKind::Ptr => config.ptr_size.bytes(),
            ChunkKind::Data => data_response_hint(opcode, args),
        };
        len += 8 + pad_to_even(payload);
    }
    len
}

/// The expected length of a response `DATA` chunk, drawn from whichever request argument
/// already carries a buffer-size hint for this opcode.
fn data_response_hint(opcode: Opcode, args: &[Param<'_>]) -> usize {
    match opcode {
        Opcode::Read => arg_as_len(args, 1),
        Opcode::TmpNam => arg_as_len(args, 1),
        Opcode::GetCmdline => arg_as_len(args, 0),
        Opcode::Elapsed => 8,
        _ => 0,
    }
}

fn arg_as_len(args: &[Param<'_>], index: usize) -> usize {
    match args.get(index) {
        Some(Param::Int(value)) => usize::try_from(*value).unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Endian, IntSize};

    #[test]
    fn builds_close_request_matching_table_shape() {
        let mut buf = [0u8; 128];
        let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
        let builder = RequestBuilder::new(&mut buf, cfg, true).unwrap();
        let len = builder.call(Opcode::Close, &[Param::Int(5)]).unwrap();

        let view = crate::parser::parse(&buf[..len], None).unwrap();
        assert_eq!(view.opcode, Opcode::Close);
        assert_eq!(view.chunks().len(), 1);
    }

    #[test]
    fn rejects_wrong_argument_count() {
        let mut buf = [0u8; 128];
        let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
        let builder = RequestBuilder::new(&mut buf, cfg, true).unwrap();
        let err = builder.call(Opcode::Close, &[]).unwrap_err();
        assert_eq!(err, LibraryError::InvalidArg);
    }

    #[test]
    fn rejects_wrong_argument_kind() {
        let mut buf = [0u8; 128];
        let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
        let builder = RequestBuilder::new(&mut buf, cfg, true).unwrap();
        let err = builder.call(Opcode::Close, &[Param::Data(b"x")]).unwrap_err();
        assert_eq!(err, LibraryError::InvalidArg);
    }

    #[test]
    fn omitting_cnfg_produces_a_request_with_no_cnfg_chunk() {
        let mut buf = [0u8; 128];
        let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
        let builder = RequestBuilder::new(&mut buf, cfg, false).unwrap();
        let len = builder.call(Opcode::ReadC, &[]).unwrap();
        let view = crate::parser::parse(&buf[..len], Some(cfg)).unwrap();
        assert!(!view.config_declared_here);
    }

    #[test]
    fn preallocates_a_retn_and_erro_placeholder_after_the_call_chunk() {
        let mut buf = [0u8; 128];
        let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
        let builder = RequestBuilder::new(&mut buf, cfg, true).unwrap();
        let len = builder.call(Opcode::Close, &[Param::Int(5)]).unwrap();

        let riff = crate::wire::RiffHeader::parse(&buf).unwrap();
        assert_eq!(8 + riff.size as usize, len, "RIFF size must cover RETN and ERRO too");
    }
}
