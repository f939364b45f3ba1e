// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-opcode operation table (C2): the single source of truth for how many `PARM`
//! and `DATA` chunks each opcode's request and response carry.
//!
//! Both the guest-side [`crate::builder`] and the host-side [`crate::parser`] /
//! [`crate::processor`] consult this table instead of hand-rolling per-opcode encoding, so
//! the wire shape of an opcode is defined exactly once.
//!
//! `response` lists only the chunks nested *inside* `RETN`, after its flat
//! `result`/`errno` prefix (every opcode gets that prefix regardless of this table, so an
//! opcode with no extra data to return, e.g. `CLOSE`, has an empty `response` slice).

use crate::proto::opcode::Opcode;

/// The kind of chunk expected at a given position in a request or response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// A `PARM` chunk carrying a plain integer (signed or unsigned per the field).
    Int,
    /// A `PARM` chunk carrying an address-sized value with no arithmetic meaning of its
    /// own (a guest pointer, as in `HEAPINFO`'s four fields).
    Ptr,
    /// A `DATA` chunk carrying a variable-length byte string (a path, a write buffer, a
    /// command line).
    Data,
}

/// The request and response shape for one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpRow {
    pub opcode: Opcode,
    pub request: &'static [ChunkKind],
    pub response: &'static [ChunkKind],
}

use ChunkKind::{Data, Int, Ptr};

const OPEN: OpRow = OpRow { opcode: Opcode::Open, request: &[Data, Int, Int], response: &[] };
const CLOSE: OpRow = OpRow { opcode: Opcode::Close, request: &[Int], response: &[] };
const WRITEC: OpRow = OpRow { opcode: Opcode::WriteC, request: &[Data], response: &[] };
const WRITE0: OpRow = OpRow { opcode: Opcode::Write0, request: &[Data], response: &[] };
const WRITE: OpRow = OpRow { opcode: Opcode::Write, request: &[Int, Data, Int], response: &[] };
const READ: OpRow = OpRow { opcode: Opcode::Read, request: &[Int, Int], response: &[Data] };
const READC: OpRow = OpRow { opcode: Opcode::ReadC, request: &[], response: &[] };
const ISERROR: OpRow = OpRow { opcode: Opcode::IsError, request: &[Int], response: &[] };
const ISTTY: OpRow = OpRow { opcode: Opcode::IsTty, request: &[Int], response: &[] };
const SEEK: OpRow = OpRow { opcode: Opcode::Seek, request: &[Int, Int], response: &[] };
const FLEN: OpRow = OpRow { opcode: Opcode::FLen, request: &[Int], response: &[] };
const TMPNAM: OpRow = OpRow { opcode: Opcode::TmpNam, request: &[Int, Int], response: &[Data] };
const REMOVE: OpRow = OpRow { opcode: Opcode::Remove, request: &[Data, Int], response: &[] };
const RENAME: OpRow =
    OpRow { opcode: Opcode::Rename, request: &[Data, Int, Data, Int], response: &[] };
const CLOCK: OpRow = OpRow { opcode: Opcode::Clock, request: &[], response: &[] };
const TIME: OpRow = OpRow { opcode: Opcode::Time, request: &[], response: &[] };
const SYSTEM: OpRow = OpRow { opcode: Opcode::System, request: &[Data, Int], response: &[] };
const GET_ERRNO: OpRow = OpRow { opcode: Opcode::GetErrno, request: &[], response: &[] };
const GET_CMDLINE: OpRow = OpRow { opcode: Opcode::GetCmdline, request: &[Int], response: &[Data] };
const HEAPINFO: OpRow =
    OpRow { opcode: Opcode::HeapInfo, request: &[], response: &[Ptr, Ptr, Ptr, Ptr] };
const EXIT: OpRow = OpRow { opcode: Opcode::Exit, request: &[Int, Int], response: &[] };
const EXIT_EXTENDED: OpRow =
    OpRow { opcode: Opcode::ExitExtended, request: &[Int, Int], response: &[] };
const ELAPSED: OpRow = OpRow { opcode: Opcode::Elapsed, request: &[], response: &[Data] };
const TICKFREQ: OpRow = OpRow { opcode: Opcode::TickFreq, request: &[], response: &[] };

/// Looks up the request/response shape for `opcode`. Every variant of [`Opcode`] has a
/// row; this never fails.
#[must_use]
pub const fn row_for(opcode: Opcode) -> OpRow {
    match opcode {
        Opcode::Open => OPEN,
        Opcode::Close => CLOSE,
        Opcode::WriteC => WRITEC,
        Opcode::Write0 => WRITE0,
        Opcode::Write => WRITE,
        Opcode::Read => READ,
        Opcode::ReadC => READC,
        Opcode::IsError => ISERROR,
        Opcode::IsTty => ISTTY,
        Opcode::Seek => SEEK,
        Opcode::FLen => FLEN,
        Opcode::TmpNam => TMPNAM,
        Opcode::Remove => REMOVE,
        Opcode::Rename => RENAME,
        Opcode::Clock => CLOCK,
        Opcode::Time => TIME,
        Opcode::System => SYSTEM,
        Opcode::GetErrno => GET_ERRNO,
        Opcode::GetCmdline => GET_CMDLINE,
        Opcode::HeapInfo => HEAPINFO,
        Opcode::Exit => EXIT,
        Opcode::ExitExtended => EXIT_EXTENDED,
        Opcode::Elapsed => ELAPSED,
        Opcode::TickFreq => TICKFREQ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_count_and_data() {
        let row = row_for(Opcode::Read);
        assert_eq!(row.request, &[Int, Int]);
        assert_eq!(row.response, &[Data]);
    }

    #[test]
    fn elapsed_response_is_a_nested_data_chunk() {
        assert_eq!(row_for(Opcode::Elapsed).response, &[Data]);
    }

    #[test]
    fn open_write_tmpnam_remove_rename_system_carry_their_length_parms() {
        assert_eq!(row_for(Opcode::Open).request, &[Data, Int, Int]);
        assert_eq!(row_for(Opcode::Write).request, &[Int, Data, Int]);
        assert_eq!(row_for(Opcode::TmpNam).request, &[Int, Int]);
        assert_eq!(row_for(Opcode::Remove).request, &[Data, Int]);
        assert_eq!(row_for(Opcode::Rename).request, &[Data, Int, Data, Int]);
        assert_eq!(row_for(Opcode::System).request, &[Data, Int]);
        assert_eq!(row_for(Opcode::Exit).request, &[Int, Int]);
    }

    #[test]
    fn heapinfo_reports_four_pointer_fields() {
        let row = row_for(Opcode::HeapInfo);
        assert!(row.request.is_empty());
        assert_eq!(row.response, &[Ptr, Ptr, Ptr, Ptr]);
    }

    #[test]
    fn exit_has_no_response_body() {
        assert!(row_for(Opcode::Exit).response.is_empty());
        assert!(row_for(Opcode::ExitExtended).response.is_empty());
    }

    #[test]
    fn every_opcode_has_a_row() {
        for raw in 0u16..=0xFFFF {
            if let Ok(op) = Opcode::from_u16(raw) {
                // must not panic
                let _ = row_for(op);
            }
        }
    }
}
