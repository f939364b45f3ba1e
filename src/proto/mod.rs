// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The semihosting operation set: opcodes, the per-opcode wire shape table, and the two
//! tiers of error that can appear on the wire (§7).

pub mod errno;
pub mod opcode;
pub mod protocol_error;
pub mod table;

pub use errno::Errno;
pub use opcode::Opcode;
pub use protocol_error::ProtocolError;
pub use table::{ChunkKind, OpRow, row_for};
