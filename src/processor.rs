// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-side request processor (C4, §4.4).
//!
//! [`Processor`] is generic over a [`MemoryAccess`] and a [`Backend`] and is monomorphized
//! per pair rather than using trait objects, so dispatch never goes through a vtable.
//! Processing one request never allocates: the request and response containers are staged
//! in fixed-size on-stack buffers.

use crate::backend::{Backend, ExitReason, OpenMode};
use crate::config::HostConfig;
use crate::error::LibraryError;
use crate::memaccess::MemoryAccess;
use crate::parser::{self, ChunkRef, DecodedView};
use crate::proto::{ChunkKind, Errno, Opcode, ProtocolError};
use crate::session::Session;
use crate::wire::int::{decode_sint, encode_sint, encode_uint};
use crate::wire::{ChunkCursor, FourCc, RiffHeader, write_u32_le};

/// Largest request or response container this processor will stage on the stack.
///
/// Chosen generously above any realistic single semihosting call (the largest request
/// body, `RENAME` with two long paths, and the largest response, a `READ` echoing a full
/// buffer, both fit well inside this with room to spare for typical path and buffer
/// lengths).
pub const MAX_MESSAGE_LEN: usize = 4096;

/// The host side of the bridge: reads a request out of guest memory, dispatches it to a
/// [`Backend`], and writes the response back in place.
#[derive(Debug)]
pub struct Processor<M, B> {
    session: Session,
    _memory: core::marker::PhantomData<M>,
    _backend: core::marker::PhantomData<B>,
}

impl<M: MemoryAccess, B: Backend> Default for Processor<M, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MemoryAccess, B: Backend> Processor<M, B> {
    #[must_use]
    pub fn new() -> Self {
        Self { session: Session::new(), _memory: core::marker::PhantomData, _backend: core::marker::PhantomData }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Reads `len` bytes at `addr`, dispatches the request to `backend`, and writes the
    /// response back to that same address (§4.4 step 9 / §9 "in-place response writing").
    /// Returns the number of bytes written.
    ///
    /// This never returns `Err`: any failure in the request itself becomes an `ERRO`
    /// response written to `addr`, per §4.4 step 9 ("the device never leaves the guest
    /// waiting on a request it cannot make sense of"). The `Err` case is reserved for
    /// failures to even access guest memory, which is a transport fault rather than a
    /// protocol error.
    pub fn process(&mut self, memory: &mut M, backend: &mut B, addr: u64, len: usize) -> Result<usize, LibraryError> {
        if len > MAX_MESSAGE_LEN {
            return self.respond_erro(memory, addr, ProtocolError::MalformedRiff);
        }
        let mut request = [0u8; MAX_MESSAGE_LEN];
        memory.read(addr, &mut request[..len])?;

        match parser::parse(&request[..len], self.session.config()) {
            Ok(view) => self.dispatch(memory, backend, &request[..len], &view, addr),
            Err(err) => self.respond_erro(memory, addr, err.to_protocol_error()),
        }
    }

    fn dispatch(
        &mut self,
        memory: &mut M,
        backend: &mut B,
        request: &[u8],
        view: &DecodedView,
        addr: u64,
    ) -> Result<usize, LibraryError> {
        if view.config_declared_here {
            self.session.set_config(view.config);
        }
        let cfg = view.config;
        let chunks = view.chunks();

        let mut response = [0u8; MAX_MESSAGE_LEN];
        let retn_cursor = ChunkCursor::open(&mut response, RiffHeader::LEN, FourCc::RETN)?;
        let flat_start = retn_cursor.payload_offset();
        let flat_len = cfg.int_size.bytes() + 4;
        let nested_start = flat_start.checked_add(flat_len).ok_or(LibraryError::BufferFull)?;

        let outcome =
            match self.run_opcode(backend, request, view.opcode, chunks, cfg, &mut response, nested_start) {
                Ok(outcome) => outcome,
                Err(err) => return self.respond_erro(memory, addr, err.to_protocol_error()),
            };

        encode_sint(
            &mut response[flat_start..flat_start + cfg.int_size.bytes()],
            outcome.result,
            cfg.int_size,
            cfg.endianness,
        )?;
        let errno_code = outcome.errno.map_or(0u32, |errno| errno.code() as u32);
        write_u32_le(&mut response, flat_start + cfg.int_size.bytes(), errno_code)?;
        if let Some(errno) = outcome.errno {
            self.session.set_last_errno(errno);
        }

        let retn_end = retn_cursor.finish(&mut response, outcome.nested_end)?;
        let total = finish_riff(&mut response, retn_end)?;
        memory.write(addr, &response[..total])?;
        Ok(total)
    }

    fn run_opcode(
        &mut self,
        backend: &mut B,
        request: &[u8],
        opcode: Opcode,
        chunks: &[ChunkRef],
        cfg: HostConfig,
        buf: &mut [u8],
        nested_start: usize,
    ) -> Result<Outcome, LibraryError> {
        let mut w = ResponseWriter { buf, cursor: nested_start, cfg };

        let (result, errno) = match opcode {
            Opcode::Open => {
                let path = read_data(request, &chunks[0])?;
                let mode_raw = read_int(request, &chunks[1], cfg)? as u32;
                // chunks[2] is the declared path length, redundant with the DATA chunk's
                // own size; parsed for wire-format symmetry with ARM semihosting, not used.
                let mode = OpenMode::from_u32(mode_raw).map_err(|_| LibraryError::InvalidArg)?;
                result_and_errno(backend.open(path, mode).map(i64::from))
            }
            Opcode::Close => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                result_and_errno(backend.close(handle).map(|()| 0))
            }
            Opcode::Write => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                let data = read_data(request, &chunks[1])?;
                result_and_errno(backend.write(handle, data).map(i64::from))
            }
            Opcode::Read => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                let len = read_int(request, &chunks[1], cfg)?.max(0) as usize;
                let mut data_buf = [0u8; MAX_MESSAGE_LEN];
                let len = len.min(data_buf.len());
                match backend.read(handle, &mut data_buf[..len]) {
                    Ok(not_read) => {
                        let read_len = len.saturating_sub(not_read as usize);
                        w.data(&data_buf[..read_len])?;
                        (i64::from(not_read), None)
                    }
                    Err(errno) => {
                        w.data(&[])?;
                        (-1, Some(errno))
                    }
                }
            }
            Opcode::WriteC => {
                let data = read_data(request, &chunks[0])?;
                if let [ch] = *data {
                    backend.write_char(ch);
                }
                (0, None)
            }
            Opcode::Write0 => {
                let data = read_data(request, &chunks[0])?;
                backend.write0(data);
                (0, None)
            }
            Opcode::ReadC => (i64::from(backend.read_char()), None),
            Opcode::IsError => {
                let code = read_int(request, &chunks[0], cfg)?;
                (i64::from(backend.is_error(code)), None)
            }
            Opcode::IsTty => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                result_and_errno(backend.is_tty(handle).map(i64::from))
            }
            Opcode::Seek => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                let pos = read_int(request, &chunks[1], cfg)?;
                result_and_errno(backend.seek(handle, pos).map(|()| 0))
            }
            Opcode::FLen => {
                let handle = read_int(request, &chunks[0], cfg)? as i32;
                result_and_errno(backend.flen(handle).map(|len| len as i64))
            }
            Opcode::TmpNam => {
                let target = read_int(request, &chunks[0], cfg)? as i32;
                let mut name_buf = [0u8; 256];
                match backend.tmpnam(target, &mut name_buf) {
                    Ok(len) => {
                        w.data(&name_buf[..len])?;
                        (0, None)
                    }
                    Err(errno) => {
                        w.data(&[])?;
                        (-1, Some(errno))
                    }
                }
            }
            Opcode::Remove => {
                let path = read_data(request, &chunks[0])?;
                result_and_errno(backend.remove(path).map(|()| 0))
            }
            Opcode::Rename => {
                let from = read_data(request, &chunks[0])?;
                let to = read_data(request, &chunks[2])?;
                result_and_errno(backend.rename(from, to).map(|()| 0))
            }
            Opcode::Clock => (backend.clock() as i64, None),
            Opcode::Time => (backend.time() as i64, None),
            Opcode::System => {
                let cmd = read_data(request, &chunks[0])?;
                result_and_errno(backend.system(cmd).map(i64::from))
            }
            Opcode::GetErrno => (i64::from(self.session.last_errno().map_or(0, Errno::code)), None),
            Opcode::GetCmdline => {
                let mut cmdline_buf = [0u8; MAX_MESSAGE_LEN / 2];
                match backend.get_cmdline(&mut cmdline_buf) {
                    Ok(len) => {
                        w.data(&cmdline_buf[..len])?;
                        (0, None)
                    }
                    Err(errno) => {
                        w.data(&[])?;
                        (-1, Some(errno))
                    }
                }
            }
            Opcode::HeapInfo => {
                let info = backend.heapinfo();
                w.ptr(info.heap_base)?;
                w.ptr(info.heap_limit)?;
                w.ptr(info.stack_base)?;
                w.ptr(info.stack_limit)?;
                (0, None)
            }
            Opcode::Exit => {
                let reason = read_int(request, &chunks[0], cfg)? as u32;
                let subcode = read_int(request, &chunks[1], cfg)? as u32;
                backend.exit(ExitReason { reason, subcode: Some(subcode) });
                (0, None)
            }
            Opcode::ExitExtended => {
                let reason = read_int(request, &chunks[0], cfg)? as u32;
                let subcode = read_int(request, &chunks[1], cfg)? as u32;
                backend.exit(ExitReason { reason, subcode: Some(subcode) });
                (0, None)
            }
            Opcode::Elapsed => {
                let ticks = backend.elapsed();
                let mut bytes = [0u8; 8];
                bytes[0..4].copy_from_slice(&(ticks as u32).to_le_bytes());
                bytes[4..8].copy_from_slice(&((ticks >> 32) as u32).to_le_bytes());
                w.data(&bytes)?;
                (0, None)
            }
            Opcode::TickFreq => (backend.tickfreq() as i64, None),
        };

        Ok(Outcome { result, errno, nested_end: w.cursor })
    }

    fn respond_erro(&mut self, memory: &mut M, addr: u64, err: ProtocolError) -> Result<usize, LibraryError> {
        let mut response = [0u8; 32];
        let cursor = ChunkCursor::open(&mut response, RiffHeader::LEN, FourCc::ERRO)?;
        let payload = cursor.payload_offset();
        *response.get_mut(payload).ok_or(LibraryError::BufferFull)? = err.code();
        let end = cursor.finish(&mut response, payload + 1)?;
        let total = finish_riff(&mut response, end)?;
        memory.write(addr, &response[..total])?;
        Ok(total)
    }
}

/// The result of dispatching one opcode: the flat `RETN` result/errno pair plus how far
/// any nested `PARM`/`DATA` children were written past the flat prefix.
struct Outcome {
    result: i64,
    errno: Option<Errno>,
    nested_end: usize,
}

/// Maps a `Backend` result onto a `RETN` result/errno pair: `-1` with the errno on
/// failure, the value with no errno on success.
fn result_and_errno(result: Result<i64, Errno>) -> (i64, Option<Errno>) {
    match result {
        Ok(value) => (value, None),
        Err(errno) => (-1, Some(errno)),
    }
}

/// A cursor into the still-open `RETN` payload, past its flat result/errno prefix,
/// writing nested `PARM`/`DATA` children one after another, the same sequential-chunk
/// pattern the request parser reads back.
struct ResponseWriter<'a> {
    buf: &'a mut [u8],
    cursor: usize,
    cfg: HostConfig,
}

impl ResponseWriter<'_> {
    fn ptr(&mut self, value: u64) -> Result<(), LibraryError> {
        let cursor = ChunkCursor::open(self.buf, self.cursor, FourCc::PARM)?;
        let payload = cursor.payload_offset();
        let end = payload + self.cfg.ptr_size.bytes();
        encode_uint(&mut self.buf[payload..end], value, self.cfg.ptr_size, self.cfg.endianness)?;
        self.cursor = cursor.finish(self.buf, end)?;
        Ok(())
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), LibraryError> {
        let cursor = ChunkCursor::open(self.buf, self.cursor, FourCc::DATA)?;
        let payload = cursor.payload_offset();
        let end = payload.checked_add(bytes.len()).ok_or(LibraryError::BufferFull)?;
        self.buf.get_mut(payload..end).ok_or(LibraryError::BufferFull)?.copy_from_slice(bytes);
        self.cursor = cursor.finish(self.buf, end)?;
        Ok(())
    }
}

fn read_int(request: &[u8], chunk: &ChunkRef, cfg: HostConfig) -> Result<i64, LibraryError> {
    let size = match chunk.kind {
        ChunkKind::Int => cfg.int_size,
        ChunkKind::Ptr => cfg.ptr_size,
        ChunkKind::Data => return Err(LibraryError::InvalidArg),
    };
    let bytes = request.get(chunk.offset..chunk.offset + chunk.len).ok_or(LibraryError::DataOverflow)?;
    if bytes.len() != size.bytes() {
        return Err(LibraryError::InvalidArg);
    }
    decode_sint(bytes, size, cfg.endianness)
}

fn read_data<'a>(request: &'a [u8], chunk: &ChunkRef) -> Result<&'a [u8], LibraryError> {
    request.get(chunk.offset..chunk.offset + chunk.len).ok_or(LibraryError::DataOverflow)
}

fn finish_riff(buf: &mut [u8], end: usize) -> Result<usize, LibraryError> {
    let size = u32::try_from(end - 8).map_err(|_| LibraryError::DataOverflow)?;
    RiffHeader { size, form_type: FourCc::SEMI }.write(buf)?;
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, ExitReason, HeapInfo, OpenMode};
    use crate::memaccess::SliceMemory;
    use crate::proto::Errno;
    use crate::wire::{Endian, IntSize};

    #[derive(Default)]
    struct MockBackend {
        files: std::collections::HashMap<i32, Vec<u8>>,
        next_handle: i32,
    }

    impl Backend for MockBackend {
        fn open(&mut self, _path: &[u8], _mode: OpenMode) -> Result<i32, Errno> {
            let h = self.next_handle;
            self.next_handle += 1;
            self.files.insert(h, Vec::new());
            Ok(h)
        }
        fn close(&mut self, handle: i32) -> Result<(), Errno> {
            self.files.remove(&handle).map(drop).ok_or(Errno::BadF)
        }
        fn write(&mut self, handle: i32, data: &[u8]) -> Result<u32, Errno> {
            self.files.get_mut(&handle).ok_or(Errno::BadF)?.extend_from_slice(data);
            Ok(0)
        }
        fn read(&mut self, handle: i32, buf: &mut [u8]) -> Result<u32, Errno> {
            let content = self.files.get(&handle).ok_or(Errno::BadF)?;
            let n = content.len().min(buf.len());
            buf[..n].copy_from_slice(&content[..n]);
            Ok((buf.len() - n) as u32)
        }
        fn write_char(&mut self, _ch: u8) {}
        fn write0(&mut self, _bytes: &[u8]) {}
        fn read_char(&mut self) -> u8 {
            0
        }
        fn is_error(&self, status_code: i64) -> bool {
            status_code < 0
        }
        fn is_tty(&self, _handle: i32) -> Result<bool, Errno> {
            Ok(false)
        }
        fn seek(&mut self, _handle: i32, _position: i64) -> Result<(), Errno> {
            Ok(())
        }
        fn flen(&mut self, handle: i32) -> Result<u64, Errno> {
            Ok(self.files.get(&handle).ok_or(Errno::BadF)?.len() as u64)
        }
        fn tmpnam(&mut self, _target_id: i32, _out: &mut [u8]) -> Result<usize, Errno> {
            Err(Errno::NoSys)
        }
        fn remove(&mut self, _path: &[u8]) -> Result<(), Errno> {
            Ok(())
        }
        fn rename(&mut self, _from: &[u8], _to: &[u8]) -> Result<(), Errno> {
            Ok(())
        }
        fn clock(&self) -> u64 {
            0
        }
        fn time(&self) -> u64 {
            0
        }
        fn system(&mut self, _command: &[u8]) -> Result<i32, Errno> {
            Ok(0)
        }
        fn get_cmdline(&self, _out: &mut [u8]) -> Result<usize, Errno> {
            Ok(0)
        }
        fn heapinfo(&self) -> HeapInfo {
            HeapInfo::default()
        }
        fn exit(&mut self, _reason: ExitReason) {}
        fn elapsed(&self) -> u64 {
            0
        }
        fn tickfreq(&self) -> u64 {
            1000
        }
    }

    fn build_request(build: impl FnOnce(&mut [u8]) -> usize) -> ([u8; 256], usize) {
        let mut buf = [0u8; 256];
        let end = build(&mut buf);
        (buf, end)
    }

    fn encode_write_request(handle: i32, payload: &[u8]) -> ([u8; 256], usize) {
        build_request(|buf| {
            let mut off = 12;
            let cnfg = ChunkCursor::open(buf, off, FourCc::CNFG).unwrap();
            let cfg = HostConfig { int_size: IntSize::Four, ptr_size: IntSize::Four, endianness: Endian::Little };
            cfg.write(&mut buf[cnfg.payload_offset()..cnfg.payload_offset() + HostConfig::PAYLOAD_LEN]).unwrap();
            off = cnfg.finish(buf, cnfg.payload_offset() + HostConfig::PAYLOAD_LEN).unwrap();

            let call = ChunkCursor::open(buf, off, FourCc::CALL).unwrap();
            let call_payload = call.payload_offset();
            crate::wire::write_u16_le(buf, call_payload, Opcode::Write.as_u16()).unwrap();

            let parm = ChunkCursor::open(buf, call_payload + 2, FourCc::PARM).unwrap();
            encode_sint(
                &mut buf[parm.payload_offset()..parm.payload_offset() + 4],
                i64::from(handle),
                IntSize::Four,
                Endian::Little,
            )
            .unwrap();
            let parm_end = parm.finish(buf, parm.payload_offset() + 4).unwrap();

            let data = ChunkCursor::open(buf, parm_end, FourCc::DATA).unwrap();
            let data_payload = data.payload_offset();
            buf[data_payload..data_payload + payload.len()].copy_from_slice(payload);
            let data_end = data.finish(buf, data_payload + payload.len()).unwrap();

            let count = ChunkCursor::open(buf, data_end, FourCc::PARM).unwrap();
            encode_sint(
                &mut buf[count.payload_offset()..count.payload_offset() + 4],
                payload.len() as i64,
                IntSize::Four,
                Endian::Little,
            )
            .unwrap();
            let count_end = count.finish(buf, count.payload_offset() + 4).unwrap();

            let call_end = call.finish(buf, count_end).unwrap();
            RiffHeader { size: (call_end - 8) as u32, form_type: FourCc::SEMI }.write(buf).unwrap();
            call_end
        })
    }

    #[test]
    fn write_dispatches_to_backend_and_returns_zero_unwritten() {
        let mut backend = MockBackend::default();
        let handle = backend.open(b"f", OpenMode::Write).unwrap();
        let (request, len) = encode_write_request(handle, b"hi");

        let mut guest = [0u8; 512];
        guest[0..len].copy_from_slice(&request[..len]);
        let mut mem = SliceMemory::new(0, &mut guest);

        let mut processor: Processor<SliceMemory<'_>, MockBackend> = Processor::new();
        let written = processor.process(&mut mem, &mut backend, 0, len).unwrap();
        assert!(written > 0);
        assert_eq!(backend.files.get(&handle).unwrap(), b"hi");

        let mut header = [0u8; 12];
        mem.read(0, &mut header).unwrap();
        assert_eq!(&header[0..4], b"RIFF");
    }

    #[test]
    fn oversized_request_yields_erro_response() {
        let mut backend = MockBackend::default();
        let mut guest = [0u8; MAX_MESSAGE_LEN + 64];
        let mut mem = SliceMemory::new(0, &mut guest);
        let mut processor: Processor<SliceMemory<'_>, MockBackend> = Processor::new();
        let written = processor.process(&mut mem, &mut backend, 0, MAX_MESSAGE_LEN + 1).unwrap();

        let mut resp = vec![0u8; written];
        mem.read(0, &mut resp).unwrap();
        let erro_header = crate::wire::ChunkHeader::parse(&resp, 12).unwrap();
        assert_eq!(erro_header.tag, FourCc::ERRO);
    }
}
