// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sized, declared-endianness integers.
//!
//! The session's `CNFG` chunk declares an `int_size` (1, 2, 4, or 8 bytes) and an
//! [`Endian`] that applies to every `PARM` value for the rest of the session. Sign
//! extension is defined by the *declared* size, never by the host machine's word width:
//! a `PARM(INT, size=2)` carrying `0xFFFF` sign-extends to `-1i64` even when the host is
//! 64-bit.

use crate::error::{LibraryError, Result};

/// Byte order for multi-byte wire integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
    /// 16-bit little-endian halves, themselves ordered big-endian (the classic PDP-11
    /// "middle-endian" layout). Only meaningful for 4- and 8-byte integers; for 1- and
    /// 2-byte integers it behaves like [`Endian::Little`].
    Pdp,
}

/// A declared wire integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntSize {
    One,
    Two,
    Four,
    Eight,
}

impl IntSize {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
        }
    }

    /// Maps a raw byte count from a `CNFG` chunk onto a declared size.
    pub fn from_byte_count(n: u8) -> Result<Self> {
        match n {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            _ => Err(LibraryError::InvalidArg),
        }
    }
}

/// Reorders `bytes` (already little-endian) into PDP order in place, for 4- and 8-byte
/// widths. A no-op for other widths.
fn pdp_shuffle(bytes: &mut [u8]) {
    match bytes.len() {
        4 => {
            bytes.swap(0, 2);
            bytes.swap(1, 3);
        }
        8 => {
            bytes.swap(0, 6);
            bytes.swap(1, 7);
            bytes.swap(2, 4);
            bytes.swap(3, 5);
        }
        _ => {}
    }
}

/// Encodes `value` (sign-extended or zero-extended at `size` already) into `dst` using
/// `endian`. `dst.len()` must equal `size.bytes()`.
pub fn encode_uint(dst: &mut [u8], value: u64, size: IntSize, endian: Endian) -> Result<()> {
    if dst.len() != size.bytes() {
        return Err(LibraryError::InvalidArg);
    }
    let le = value.to_le_bytes();
    let src = &le[..size.bytes()];
    match endian {
        Endian::Little => dst.copy_from_slice(src),
        Endian::Big => {
            for (d, s) in dst.iter_mut().zip(src.iter().rev()) {
                *d = *s;
            }
        }
        Endian::Pdp => {
            dst.copy_from_slice(src);
            pdp_shuffle(dst);
        }
    }
    Ok(())
}

/// Decodes `size.bytes()` bytes from `src` as an unsigned integer per `endian`, returned
/// zero-extended to `u64`.
pub fn decode_uint(src: &[u8], size: IntSize, endian: Endian) -> Result<u64> {
    if src.len() != size.bytes() {
        return Err(LibraryError::InvalidArg);
    }
    let mut le = [0u8; 8];
    match endian {
        Endian::Little => le[..size.bytes()].copy_from_slice(src),
        Endian::Big => {
            for (d, s) in le[..size.bytes()].iter_mut().zip(src.iter().rev()) {
                *d = *s;
            }
        }
        Endian::Pdp => {
            le[..size.bytes()].copy_from_slice(src);
            pdp_shuffle(&mut le[..size.bytes()]);
        }
    }
    Ok(u64::from_le_bytes(le))
}

/// Decodes `size.bytes()` bytes from `src` as a two's-complement signed integer per
/// `endian`, sign-extended to `i64` according to the *declared* `size`.
pub fn decode_sint(src: &[u8], size: IntSize, endian: Endian) -> Result<i64> {
    let raw = decode_uint(src, size, endian)?;
    let bits = size.bytes() * 8;
    if bits == 64 {
        return Ok(raw as i64);
    }
    let sign_bit = 1u64 << (bits - 1);
    if raw & sign_bit != 0 {
        Ok((raw | (!0u64 << bits)) as i64)
    } else {
        Ok(raw as i64)
    }
}

/// Encodes a signed `value` into `dst`, truncated to `size` bytes before encoding.
pub fn encode_sint(dst: &mut [u8], value: i64, size: IntSize, endian: Endian) -> Result<()> {
    encode_uint(dst, value as u64, size, endian)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_roundtrip_four_bytes() {
        let mut buf = [0u8; 4];
        encode_uint(&mut buf, 0x1122_3344, IntSize::Four, Endian::Little).unwrap();
        assert_eq!(buf, [0x44, 0x33, 0x22, 0x11]);
        assert_eq!(decode_uint(&buf, IntSize::Four, Endian::Little).unwrap(), 0x1122_3344);
    }

    #[test]
    fn big_endian_roundtrip_two_bytes() {
        let mut buf = [0u8; 2];
        encode_uint(&mut buf, 0xABCD, IntSize::Two, Endian::Big).unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(decode_uint(&buf, IntSize::Two, Endian::Big).unwrap(), 0xABCD);
    }

    #[test]
    fn pdp_endian_swaps_16_bit_halves() {
        let mut buf = [0u8; 4];
        encode_uint(&mut buf, 0x1122_3344, IntSize::Four, Endian::Pdp).unwrap();
        // little-endian bytes [44 33 22 11], halves [44 33] [22 11] swapped -> [22 11 44 33]
        assert_eq!(buf, [0x22, 0x11, 0x44, 0x33]);
        assert_eq!(decode_uint(&buf, IntSize::Four, Endian::Pdp).unwrap(), 0x1122_3344);
    }

    #[test]
    fn sign_extension_is_declared_size_not_host_width() {
        let mut buf = [0u8; 2];
        encode_sint(&mut buf, -1, IntSize::Two, Endian::Little).unwrap();
        assert_eq!(buf, [0xFF, 0xFF]);
        assert_eq!(decode_sint(&buf, IntSize::Two, Endian::Little).unwrap(), -1);

        // 0x7FFF as a 2-byte int is positive, not sign-extended.
        let buf2 = [0xFF, 0x7F];
        assert_eq!(decode_sint(&buf2, IntSize::Two, Endian::Little).unwrap(), 0x7FFF);
    }

    #[test]
    fn eight_byte_size_mismatch_rejected() {
        let mut buf = [0u8; 4];
        let err = encode_uint(&mut buf, 0, IntSize::Eight, Endian::Little).unwrap_err();
        assert_eq!(err, LibraryError::InvalidArg);
    }
}
