// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Session configuration negotiated by the `CNFG` chunk.

use crate::error::{LibraryError, Result};
use crate::wire::{IntSize, read_bytes};

/// Wire byte order, as declared by a session's `CNFG` chunk.
pub type Endianness = crate::wire::Endian;

/// The per-session parameters a `CNFG` chunk establishes before any `CALL` may be
/// dispatched (§4.1, §4.4 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Width of every `PARM(INT)`/`PARM(PTR)` value for the rest of the session.
    pub int_size: IntSize,
    /// Width of every `PARM(PTR)` value. Kept distinct from `int_size` because a guest
    /// may run ints and pointers at different widths (e.g. 32-bit pointers, 64-bit longs).
    pub ptr_size: IntSize,
    pub endianness: Endianness,
}

impl HostConfig {
    /// `CNFG` payload layout: `int_size: u8`, `ptr_size: u8`, `endianness: u8`, one pad
    /// byte to keep the struct four-byte aligned.
    pub const PAYLOAD_LEN: usize = 4;

    /// Parses a `CNFG` chunk payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let bytes = read_bytes(payload, 0, Self::PAYLOAD_LEN)?;
        let int_size = IntSize::from_byte_count(bytes[0])?;
        let ptr_size = IntSize::from_byte_count(bytes[1])?;
        let endianness = match bytes[2] {
            0 => Endianness::Little,
            1 => Endianness::Big,
            2 => Endianness::Pdp,
            _ => return Err(LibraryError::InvalidArg),
        };
        Ok(Self { int_size, ptr_size, endianness })
    }

    /// Writes this configuration as a `CNFG` chunk payload.
    pub fn write(self, buf: &mut [u8]) -> Result<()> {
        let dst = buf.get_mut(0..Self::PAYLOAD_LEN).ok_or(LibraryError::BufferFull)?;
        dst[0] = self.int_size.bytes() as u8;
        dst[1] = self.ptr_size.bytes() as u8;
        dst[2] = match self.endianness {
            Endianness::Little => 0,
            Endianness::Big => 1,
            Endianness::Pdp => 2,
        };
        dst[3] = 0;
        Ok(())
    }
}
