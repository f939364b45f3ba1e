// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tier-3 operation errors (§7): the `errno` field of a successful `RETN` whose result
//! indicates failure (e.g. `OPEN` returning a negative handle).
//!
//! Values follow the standard POSIX errno numbering that the Arm semihosting
//! specification itself reuses, so guest C libraries can map them onto their own `errno.h`
//! without a translation table.

/// An operation-level failure reason, reported back through `RETN.errno` rather than
/// through an `ERRO` chunk. The request was well-formed and dispatched; the underlying
/// service call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    /// Operation not permitted.
    Perm = 1,
    /// No such file or directory.
    NoEnt = 2,
    /// I/O error.
    Io = 5,
    /// Bad file descriptor / handle.
    BadF = 9,
    /// Permission denied (includes sandbox path-policy rejections).
    Access = 13,
    /// File exists.
    Exist = 17,
    /// Invalid argument.
    Inval = 22,
    /// Too many open files (handle table exhausted).
    MFile = 24,
    /// Illegal seek.
    SPipe = 29,
    /// No space left on device.
    NoSpc = 28,
    /// Function not implemented.
    NoSys = 38,
}

impl Errno {
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_posix_numbering() {
        assert_eq!(Errno::Perm.code(), 1);
        assert_eq!(Errno::NoEnt.code(), 2);
        assert_eq!(Errno::BadF.code(), 9);
        assert_eq!(Errno::Inval.code(), 22);
    }
}
