// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host's view of guest memory (C4).
//!
//! The RIFF container that carries a request lives inside the guest's address space; the
//! host only ever touches it through this capability. Keeping it as a trait (rather than a
//! concrete `&[u8]`) lets the same [`crate::processor::Processor`] run against an in-process
//! byte slice in tests, or against a debug-probe/emulator memory interface in production,
//! with no change to the dispatch logic.

use crate::error::{LibraryError, Result};

/// Read/write access to a single contiguous guest address space.
///
/// Implementations are expected to be cheap to call repeatedly; the processor reads a
/// request header, then its chunks, in several small calls rather than one bulk transfer.
pub trait MemoryAccess {
    /// Copies `dst.len()` bytes starting at guest address `addr` into `dst`.
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<()>;

    /// Copies `src` into guest memory starting at address `addr`.
    fn write(&mut self, addr: u64, src: &[u8]) -> Result<()>;
}

/// A [`MemoryAccess`] backed by a plain in-process byte slice, standing in for guest
/// memory in tests and in the bundled demo binary.
#[derive(Debug)]
pub struct SliceMemory<'a> {
    base: u64,
    bytes: &'a mut [u8],
}

impl<'a> SliceMemory<'a> {
    /// Wraps `bytes` as guest memory starting at guest address `base`.
    #[must_use]
    pub fn new(base: u64, bytes: &'a mut [u8]) -> Self {
        Self { base, bytes }
    }

    fn local_range(&self, addr: u64, len: usize) -> Result<core::ops::Range<usize>> {
        let offset = addr.checked_sub(self.base).ok_or(LibraryError::InvalidArg)?;
        let start = usize::try_from(offset).map_err(|_| LibraryError::InvalidArg)?;
        let end = start.checked_add(len).ok_or(LibraryError::DataOverflow)?;
        if end > self.bytes.len() {
            return Err(LibraryError::DataOverflow);
        }
        Ok(start..end)
    }
}

impl MemoryAccess for SliceMemory<'_> {
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<()> {
        let range = self.local_range(addr, dst.len())?;
        dst.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, addr: u64, src: &[u8]) -> Result<()> {
        let range = self.local_range(addr, src.len())?;
        self.bytes[range].copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_write_roundtrip_at_offset() {
        let mut backing = [0u8; 16];
        let mut mem = SliceMemory::new(0x1000, &mut backing);
        mem.write(0x1004, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 4];
        mem.read(0x1004, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_access_rejected() {
        let mut backing = [0u8; 4];
        let mem = SliceMemory::new(0x1000, &mut backing);
        let mut out = [0u8; 4];
        assert!(mem.read(0x2000, &mut out).is_err());
    }

    #[test]
    fn access_past_end_rejected() {
        let mut backing = [0u8; 4];
        let mem = SliceMemory::new(0x1000, &mut backing);
        let mut out = [0u8; 8];
        assert_eq!(mem.read(0x1000, &mut out).unwrap_err(), LibraryError::DataOverflow);
    }
}
