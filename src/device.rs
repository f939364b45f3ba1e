// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Register map of the memory-mapped semihosting device (§6).
//!
//! These are byte offsets from the device's base address. All registers are 32-bit and
//! little-endian regardless of the session's negotiated payload endianness; only `PARM`
//! values inside the `RIFF` buffer itself follow the `CNFG`-declared byte order.

/// Read-only. Identifies the device to a guest probing its memory-mapped I/O region.
pub const SIGNATURE: u32 = 0x00;

/// Device-magic value expected in [`SIGNATURE`].
pub const SIGNATURE_MAGIC: u32 = 0x5249_4653; // "RIFS"

/// Read/write. Guest address of the `RIFF` container buffer the device will read the next
/// request from, and write the response into.
pub const RIFF_PTR: u32 = 0x04;

/// Write-only. Any write notifies the host that a request is staged at [`RIFF_PTR`] and
/// ready to be processed.
pub const DOORBELL: u32 = 0x0C;

/// Read-only. Bit 0 set once a response is staged at [`RIFF_PTR`].
pub const IRQ_STATUS: u32 = 0x10;

/// Read/write. Bit 0 enables a completion interrupt when [`IRQ_STATUS`] bit 0 is set.
pub const IRQ_ENABLE: u32 = 0x14;

/// Write-only. Writing 1 clears bit 0 of [`IRQ_STATUS`].
pub const IRQ_ACK: u32 = 0x18;

/// Read-only. `0` = idle, `1` = processing, `2` = the last request could not be parsed at
/// all (not even far enough to stage an `ERRO` response).
pub const STATUS: u32 = 0x1C;

/// Total size of the register block.
pub const REGISTER_BLOCK_LEN: u32 = 0x20;

/// [`STATUS`] register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceStatus {
    Idle = 0,
    Processing = 1,
    Fault = 2,
}
