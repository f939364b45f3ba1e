// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A sandboxed filesystem [`crate::backend::Backend`] (C5).
//!
//! Every path a guest supplies is resolved under a fixed root directory (§4.5); nothing a
//! guest can send ever reaches a path outside of it. This is the backend the bundled demo
//! wires up, but any type implementing [`crate::backend::Backend`] works with
//! [`crate::processor::Processor`] just as well.

pub mod handle;
pub mod path;
pub mod violation;

pub use handle::HandleTable;
pub use path::PathRule;
pub use violation::{ViolationKind, ViolationLog, ViolationObserver};

use std::fs::File;
use std::io::{Read as _, Seek as _, SeekFrom, Write as _};
use std::path::PathBuf;
use std::time::Instant;

use crate::backend::{Backend, ExitReason, HeapInfo, OpenMode};
use crate::proto::Errno;

/// Fixed capacity of the handle table. `OPEN` past this many simultaneously open files
/// fails with [`Errno::MFile`], matching a real process's file descriptor limit.
pub const MAX_HANDLES: usize = 32;

/// A sandboxed, root-confined filesystem backend.
pub struct SandboxFs<O: ViolationObserver = ViolationLog> {
    root: PathBuf,
    handles: HandleTable<File, MAX_HANDLES>,
    observer: O,
    start: Instant,
    cmdline: Vec<u8>,
    read_only: bool,
    allow_system: bool,
    allow_exit: bool,
    path_rules: Vec<PathRule>,
}

impl SandboxFs<ViolationLog> {
    #[must_use]
    pub fn builder() -> SandboxFsBuilder<ViolationLog> {
        SandboxFsBuilder::new()
    }
}

impl<O: ViolationObserver> SandboxFs<O> {
    fn resolve(&mut self, requested: &[u8], is_write: bool) -> Result<PathBuf, Errno> {
        path::resolve(&self.root, requested, is_write, &self.path_rules).map_err(|(errno, violation)| {
            self.observer.on_violation(violation);
            errno
        })
    }

    fn handle(&self, handle: i32) -> Result<&File, Errno> {
        self.handles.get(handle).ok_or(Errno::BadF)
    }

    fn handle_mut(&mut self, handle: i32) -> Result<&mut File, Errno> {
        match self.handles.get_mut(handle) {
            Some(file) => Ok(file),
            None => {
                self.observer.on_violation(ViolationKind::UnknownHandle { handle });
                Err(Errno::BadF)
            }
        }
    }
}

/// Builds a [`SandboxFs`], mirroring the way [`std::fs::OpenOptions`] accumulates
/// settings before a single fallible `build`/`open` call.
///
/// By default `SYSTEM` and `EXIT` are both refused until explicitly opted into (writes
/// within the sandbox root are permitted unless [`Self::read_only`] is set), since a guest
/// able to run shell commands or halt the host process is a much larger trust boundary
/// than one confined to its sandbox directory.
pub struct SandboxFsBuilder<O: ViolationObserver = ViolationLog> {
    root: Option<PathBuf>,
    observer: O,
    cmdline: Vec<u8>,
    read_only: bool,
    allow_system: bool,
    allow_exit: bool,
    path_rules: Vec<PathRule>,
}

impl SandboxFsBuilder<ViolationLog> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            observer: ViolationLog::new(),
            cmdline: Vec::new(),
            read_only: false,
            allow_system: false,
            allow_exit: false,
            path_rules: Vec::new(),
        }
    }
}

impl Default for SandboxFsBuilder<ViolationLog> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ViolationObserver> SandboxFsBuilder<O> {
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn cmdline(mut self, cmdline: impl Into<Vec<u8>>) -> Self {
        self.cmdline = cmdline.into();
        self
    }

    /// Rejects `OPEN` in a writing mode, `REMOVE`, and `RENAME` with `WRITE_BLOCKED` /
    /// `REMOVE_BLOCKED` / `RENAME_BLOCKED` respectively.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Allows `SYSTEM` to actually run a shell command. Refused (`SYSTEM_BLOCKED`) by
    /// default.
    #[must_use]
    pub fn allow_system(mut self, allow_system: bool) -> Self {
        self.allow_system = allow_system;
        self
    }

    /// Allows `EXIT` to actually terminate the host process. Refused (`EXIT_BLOCKED`) by
    /// default; a disallowed exit is logged and the bridge keeps running.
    #[must_use]
    pub fn allow_exit(mut self, allow_exit: bool) -> Self {
        self.allow_exit = allow_exit;
        self
    }

    /// Adds an absolute-path prefix this sandbox may resolve outside its root, alongside
    /// whether writes are permitted under it.
    #[must_use]
    pub fn path_rule(mut self, prefix: impl Into<PathBuf>, allow_write: bool) -> Self {
        self.path_rules.push(PathRule::new(prefix, allow_write));
        self
    }

    /// Replaces the violation observer, changing the builder's (and resulting
    /// [`SandboxFs`]'s) observer type.
    #[must_use]
    pub fn observer<O2: ViolationObserver>(self, observer: O2) -> SandboxFsBuilder<O2> {
        SandboxFsBuilder {
            root: self.root,
            observer,
            cmdline: self.cmdline,
            read_only: self.read_only,
            allow_system: self.allow_system,
            allow_exit: self.allow_exit,
            path_rules: self.path_rules,
        }
    }

    /// Creates the sandbox root if it doesn't exist and builds the backend.
    pub fn build(self) -> std::io::Result<SandboxFs<O>> {
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&root)?;
        let root = root.canonicalize()?;
        Ok(SandboxFs {
            root,
            handles: HandleTable::new(),
            observer: self.observer,
            start: Instant::now(),
            cmdline: self.cmdline,
            read_only: self.read_only,
            allow_system: self.allow_system,
            allow_exit: self.allow_exit,
            path_rules: self.path_rules,
        })
    }
}

fn open_options_for(mode: OpenMode) -> std::fs::OpenOptions {
    use OpenMode::{
        AppendRead, AppendReadBinary, Read, ReadBinary, ReadWrite, ReadWriteBinary, WriteRead,
        WriteReadBinary,
    };
    let read = matches!(
        mode,
        Read | ReadBinary
            | ReadWrite
            | ReadWriteBinary
            | WriteRead
            | WriteReadBinary
            | AppendRead
            | AppendReadBinary
    );
    let mut opts = std::fs::OpenOptions::new();
    opts.read(read);
    opts.write(mode.writable());
    opts.append(mode.appends());
    opts.truncate(mode.truncates());
    opts.create(mode.writable() && !mode.requires_existing());
    opts
}

impl<O: ViolationObserver> Backend for SandboxFs<O> {
    fn open(&mut self, path: &[u8], mode: OpenMode) -> Result<i32, Errno> {
        let is_write = mode.writable();
        let resolved = self.resolve(path, is_write)?;
        if is_write && self.read_only {
            self.observer.on_violation(ViolationKind::WriteBlocked { requested: resolved });
            return Err(Errno::Access);
        }
        let file = open_options_for(mode).open(&resolved).map_err(io_errno)?;
        self.handles.alloc(file).map_err(|errno| {
            self.observer.on_violation(ViolationKind::HandleTableExhausted);
            errno
        })
    }

    fn close(&mut self, handle: i32) -> Result<(), Errno> {
        self.handles.free(handle).map(drop).or_else(|_| {
            self.observer.on_violation(ViolationKind::UnknownHandle { handle });
            Err(Errno::BadF)
        })
    }

    fn write(&mut self, handle: i32, data: &[u8]) -> Result<u32, Errno> {
        let file = self.handle_mut(handle)?;
        let written = file.write(data).map_err(io_errno)?;
        Ok(u32::try_from(data.len() - written).unwrap_or(u32::MAX))
    }

    fn read(&mut self, handle: i32, buf: &mut [u8]) -> Result<u32, Errno> {
        let file = self.handle_mut(handle)?;
        let read = file.read(buf).map_err(io_errno)?;
        Ok(u32::try_from(buf.len() - read).unwrap_or(u32::MAX))
    }

    fn write_char(&mut self, ch: u8) {
        let _ = std::io::stdout().write_all(&[ch]);
    }

    fn write0(&mut self, bytes: &[u8]) {
        let _ = std::io::stdout().write_all(bytes);
    }

    fn read_char(&mut self) -> u8 {
        let mut byte = [0u8; 1];
        match std::io::stdin().read_exact(&mut byte) {
            Ok(()) => byte[0],
            Err(_) => 0xFF, // EOF sentinel used by several semihosting guest libraries
        }
    }

    fn is_error(&self, status_code: i64) -> bool {
        status_code < 0
    }

    fn is_tty(&self, handle: i32) -> Result<bool, Errno> {
        self.handle(handle)?;
        Ok(false)
    }

    fn seek(&mut self, handle: i32, position: i64) -> Result<(), Errno> {
        let file = self.handle_mut(handle)?;
        file.seek(SeekFrom::Start(position.max(0) as u64)).map_err(io_errno)?;
        Ok(())
    }

    fn flen(&mut self, handle: i32) -> Result<u64, Errno> {
        let file = self.handle_mut(handle)?;
        file.metadata().map(|m| m.len()).map_err(io_errno)
    }

    fn tmpnam(&mut self, target_id: i32, out: &mut [u8]) -> Result<usize, Errno> {
        let name = format!("tmp{:08x}", target_id as u32);
        if out.len() < name.len() {
            return Err(Errno::Inval);
        }
        out[..name.len()].copy_from_slice(name.as_bytes());
        Ok(name.len())
    }

    fn remove(&mut self, path: &[u8]) -> Result<(), Errno> {
        let resolved = self.resolve(path, true)?;
        if self.read_only {
            self.observer.on_violation(ViolationKind::RemoveBlocked { requested: resolved });
            return Err(Errno::Access);
        }
        std::fs::remove_file(resolved).map_err(io_errno)
    }

    fn rename(&mut self, from: &[u8], to: &[u8]) -> Result<(), Errno> {
        let from = self.resolve(from, true)?;
        let to = self.resolve(to, true)?;
        if self.read_only {
            self.observer.on_violation(ViolationKind::RenameBlocked { requested: to });
            return Err(Errno::Access);
        }
        std::fs::rename(from, to).map_err(io_errno)
    }

    fn clock(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis() / 10).unwrap_or(u64::MAX)
    }

    fn time(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn system(&mut self, command: &[u8]) -> Result<i32, Errno> {
        if !self.allow_system {
            self.observer.on_violation(ViolationKind::SystemBlocked);
            return Err(Errno::Access);
        }
        let command = core::str::from_utf8(command).map_err(|_| Errno::Inval)?;
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .status()
            .map_err(io_errno)?;
        Ok(status.code().unwrap_or(-1))
    }

    fn get_cmdline(&self, out: &mut [u8]) -> Result<usize, Errno> {
        if out.len() < self.cmdline.len() {
            return Err(Errno::Inval);
        }
        out[..self.cmdline.len()].copy_from_slice(&self.cmdline);
        Ok(self.cmdline.len())
    }

    fn heapinfo(&self) -> HeapInfo {
        // No guest heap or stack is visible from the host side of this bridge; reporting
        // all-zero bounds is the documented "not supported" response guests already
        // handle (§9 open question: HEAPINFO shape).
        HeapInfo::default()
    }

    fn exit(&mut self, reason: ExitReason) {
        if !self.allow_exit {
            self.observer.on_violation(ViolationKind::ExitBlocked);
            tracing::info!(reason = reason.reason, subcode = ?reason.subcode, "guest exit blocked by policy");
            return;
        }
        tracing::info!(reason = reason.reason, subcode = ?reason.subcode, "guest exited");
        for file in self.handles.drain() {
            drop(file);
        }
        std::process::exit((reason.reason & 0xFF) as i32);
    }

    fn elapsed(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn tickfreq(&self) -> u64 {
        1000
    }
}

fn io_errno(err: std::io::Error) -> Errno {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => Errno::NoEnt,
        ErrorKind::PermissionDenied => Errno::Access,
        ErrorKind::AlreadyExists => Errno::Exist,
        ErrorKind::InvalidInput | ErrorKind::InvalidData => Errno::Inval,
        _ => Errno::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> (tempfile::TempDir, SandboxFs<ViolationLog>) {
        let dir = tempfile::tempdir().unwrap();
        let fs = SandboxFs::builder().root(dir.path()).build().unwrap();
        (dir, fs)
    }

    #[test]
    fn write_then_read_back_roundtrip() {
        let (_dir, mut fs) = sandbox();
        let handle = fs.open(b"a.txt", OpenMode::WriteRead).unwrap();
        assert_eq!(fs.write(handle, b"hello").unwrap(), 0);
        fs.seek(handle, 0).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(fs.read(handle, &mut buf).unwrap(), 0);
        assert_eq!(&buf, b"hello");
        fs.close(handle).unwrap();
    }

    #[test]
    fn traversal_outside_root_is_rejected_with_access_errno() {
        let (_dir, mut fs) = sandbox();
        let err = fs.open(b"../../etc/passwd", OpenMode::Read).unwrap_err();
        assert_eq!(err, Errno::Access);
        assert_eq!(fs.observer.entries().len(), 1);
    }

    #[test]
    fn reading_through_a_closed_handle_is_bad_file_descriptor() {
        let (_dir, mut fs) = sandbox();
        let handle = fs.open(b"b.txt", OpenMode::Write).unwrap();
        fs.close(handle).unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(fs.read(handle, &mut buf).unwrap_err(), Errno::BadF);
    }

    #[test]
    fn heapinfo_reports_unsupported_as_zero_bounds() {
        let (_dir, fs) = sandbox();
        assert_eq!(fs.heapinfo(), HeapInfo::default());
    }

    #[test]
    fn read_only_rejects_writing_open_with_write_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = SandboxFs::builder().root(dir.path()).read_only(true).build().unwrap();
        let err = fs.open(b"a.txt", OpenMode::Write).unwrap_err();
        assert_eq!(err, Errno::Access);
        assert!(matches!(fs.observer.entries()[0], ViolationKind::WriteBlocked { .. }));
    }

    #[test]
    fn read_only_still_permits_reading_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        let mut fs = SandboxFs::builder().root(dir.path()).read_only(true).build().unwrap();
        assert!(fs.open(b"a.txt", OpenMode::Read).is_ok());
    }

    #[test]
    fn read_only_rejects_remove_with_remove_blocked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hi").unwrap();
        let mut fs = SandboxFs::builder().root(dir.path()).read_only(true).build().unwrap();
        let err = fs.remove(b"a.txt").unwrap_err();
        assert_eq!(err, Errno::Access);
        assert!(matches!(fs.observer.entries()[0], ViolationKind::RemoveBlocked { .. }));
    }

    #[test]
    fn system_is_refused_by_default_with_system_blocked() {
        let (_dir, mut fs) = sandbox();
        let err = fs.system(b"true").unwrap_err();
        assert_eq!(err, Errno::Access);
        assert!(matches!(fs.observer.entries()[0], ViolationKind::SystemBlocked));
    }

    #[test]
    fn system_runs_the_command_once_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut fs = SandboxFs::builder().root(dir.path()).allow_system(true).build().unwrap();
        assert_eq!(fs.system(b"true").unwrap(), 0);
    }

    #[test]
    fn exit_is_refused_by_default_and_the_process_keeps_running() {
        let (_dir, mut fs) = sandbox();
        fs.exit(ExitReason { reason: 0, subcode: None });
        assert!(matches!(fs.observer.entries()[0], ViolationKind::ExitBlocked));
    }
}
