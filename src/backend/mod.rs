// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-side service capability (§4.4, §4.5).
//!
//! [`Backend`] is the seam between protocol dispatch and the actual service
//! implementation. [`crate::processor::Processor`] is generic over it, so a test can swap
//! in a mock backend and the sandboxed filesystem in `production can swap in
//! [`crate::sandbox::SandboxFs`] with no change to dispatch logic.
//!
//! Every fallible method returns [`crate::proto::Errno`] rather than
//! [`crate::error::LibraryError`]: a backend failure is always an operation-tier (§7 tier
//! 3) failure, reported through `RETN.errno`, never a protocol-tier `ERRO`.

use crate::proto::Errno;

/// `OPEN`'s mode argument, one of the twelve combinations the Arm semihosting
/// specification defines (mirroring `fopen` mode strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadBinary,
    ReadWrite,
    ReadWriteBinary,
    Write,
    WriteBinary,
    WriteRead,
    WriteReadBinary,
    Append,
    AppendBinary,
    AppendRead,
    AppendReadBinary,
}

impl OpenMode {
    pub fn from_u32(raw: u32) -> Result<Self, Errno> {
        Ok(match raw {
            0 => Self::Read,
            1 => Self::ReadBinary,
            2 => Self::ReadWrite,
            3 => Self::ReadWriteBinary,
            4 => Self::Write,
            5 => Self::WriteBinary,
            6 => Self::WriteRead,
            7 => Self::WriteReadBinary,
            8 => Self::Append,
            9 => Self::AppendBinary,
            10 => Self::AppendRead,
            11 => Self::AppendReadBinary,
            _ => return Err(Errno::Inval),
        })
    }

    /// Whether this mode permits writing.
    #[must_use]
    pub const fn writable(self) -> bool {
        !matches!(self, Self::Read | Self::ReadBinary)
    }

    /// Whether this mode truncates an existing file on open.
    #[must_use]
    pub const fn truncates(self) -> bool {
        matches!(self, Self::Write | Self::WriteBinary | Self::WriteRead | Self::WriteReadBinary)
    }

    /// Whether this mode appends rather than seeking to the start.
    #[must_use]
    pub const fn appends(self) -> bool {
        matches!(
            self,
            Self::Append | Self::AppendBinary | Self::AppendRead | Self::AppendReadBinary
        )
    }

    /// Whether the host-side file must already exist (no create-on-open).
    #[must_use]
    pub const fn requires_existing(self) -> bool {
        matches!(self, Self::Read | Self::ReadBinary | Self::ReadWrite | Self::ReadWriteBinary)
    }
}

/// Heap and stack bounds reported by `HEAPINFO`. A host with no real guest heap to report
/// (the common case for this bridge) returns all-zero bounds, which Arm semihosting
/// guests treat as "not supported" rather than a protocol failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapInfo {
    pub heap_base: u64,
    pub heap_limit: u64,
    pub stack_base: u64,
    pub stack_limit: u64,
}

/// The reason code(s) from `EXIT` / `EXIT_EXTENDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReason {
    pub reason: u32,
    pub subcode: Option<u32>,
}

/// The full semihosting service set a host backend implements.
///
/// Method names follow the opcode they serve rather than POSIX naming, since several
/// (`write0`, `tmpnam`, `heapinfo`) have no direct POSIX counterpart.
pub trait Backend {
    fn open(&mut self, path: &[u8], mode: OpenMode) -> Result<i32, Errno>;
    fn close(&mut self, handle: i32) -> Result<(), Errno>;

    /// Writes `data` to `handle`. Returns the number of bytes *not* written (`0` on full
    /// success), matching `SYS_WRITE`'s convention.
    fn write(&mut self, handle: i32, data: &[u8]) -> Result<u32, Errno>;

    /// Reads into `buf` from `handle`. Returns the number of bytes *not* read (`0` if
    /// `buf` was filled completely), matching `SYS_READ`'s convention.
    fn read(&mut self, handle: i32, buf: &mut [u8]) -> Result<u32, Errno>;

    fn write_char(&mut self, ch: u8);
    fn write0(&mut self, bytes: &[u8]);
    fn read_char(&mut self) -> u8;

    fn is_error(&self, status_code: i64) -> bool;
    fn is_tty(&self, handle: i32) -> Result<bool, Errno>;

    fn seek(&mut self, handle: i32, position: i64) -> Result<(), Errno>;
    fn flen(&mut self, handle: i32) -> Result<u64, Errno>;

    /// Writes a host-generated temporary file name for `target_id` into `out`. Returns the
    /// number of bytes written.
    fn tmpnam(&mut self, target_id: i32, out: &mut [u8]) -> Result<usize, Errno>;

    fn remove(&mut self, path: &[u8]) -> Result<(), Errno>;
    fn rename(&mut self, from: &[u8], to: &[u8]) -> Result<(), Errno>;

    /// Centiseconds since an arbitrary host-chosen epoch (`SYS_CLOCK`).
    fn clock(&self) -> u64;
    /// Seconds since the Unix epoch (`SYS_TIME`).
    fn time(&self) -> u64;

    fn system(&mut self, command: &[u8]) -> Result<i32, Errno>;

    /// Writes the host-configured guest command line into `out`. Returns the number of
    /// bytes written.
    fn get_cmdline(&self, out: &mut [u8]) -> Result<usize, Errno>;

    fn heapinfo(&self) -> HeapInfo;

    fn exit(&mut self, reason: ExitReason);

    /// Host tick count since session start (`SYS_ELAPSED`).
    fn elapsed(&self) -> u64;
    /// Ticks per second for [`Self::elapsed`] (`SYS_TICKFREQ`).
    fn tickfreq(&self) -> u64;
}
