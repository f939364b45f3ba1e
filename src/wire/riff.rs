// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RIFF container and chunk headers.

use crate::error::{LibraryError, Result};
use crate::wire::{fourcc::FourCc, read_bytes, read_u32_le, write_bytes, write_u32_le};

/// The 12-byte outer container header: `RIFF` + little-endian size + form type.
///
/// `size` counts every byte that follows the size field itself, i.e. `form_type` plus all
/// contained chunks, matching the classic RIFF convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffHeader {
    pub size: u32,
    pub form_type: FourCc,
}

impl RiffHeader {
    pub const LEN: usize = 12;

    /// Parses the 12-byte container header at the start of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let tag = read_tag(buf, 0)?;
        if tag != FourCc::RIFF {
            return Err(LibraryError::BadRiffMagic);
        }
        let size = read_u32_le(buf, 4)?;
        let form_type = read_tag(buf, 8)?;
        if form_type != FourCc::SEMI {
            return Err(LibraryError::BadFormType);
        }
        Ok(Self { size, form_type })
    }

    /// Writes the 12-byte container header into `buf[0..12]`.
    pub fn write(self, buf: &mut [u8]) -> Result<()> {
        write_tag(buf, 0, FourCc::RIFF)?;
        write_u32_le(buf, 4, self.size)?;
        write_tag(buf, 8, self.form_type)?;
        Ok(())
    }
}

/// An 8-byte chunk header: a four-byte tag plus a little-endian payload length.
///
/// The payload length never includes the pad byte inserted to keep chunks on even
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub tag: FourCc,
    pub size: u32,
}

impl ChunkHeader {
    pub const LEN: usize = 8;

    pub fn parse(buf: &[u8], offset: usize) -> Result<Self> {
        let tag = read_tag(buf, offset)?;
        let size = read_u32_le(buf, offset + 4)?;
        Ok(Self { tag, size })
    }

    pub fn write(self, buf: &mut [u8], offset: usize) -> Result<()> {
        write_tag(buf, offset, self.tag)?;
        write_u32_le(buf, offset + 4, self.size)?;
        Ok(())
    }

    /// The offset of this chunk's payload, immediately after its header.
    #[must_use]
    pub const fn payload_offset(offset: usize) -> usize {
        offset + Self::LEN
    }

    /// The offset of the next chunk header, after this chunk's (possibly padded) payload.
    #[must_use]
    pub fn next_offset(self, offset: usize) -> usize {
        Self::payload_offset(offset) + crate::wire::pad_to_even(self.size as usize)
    }
}

/// A cursor for emitting a chunk whose payload size isn't known until after the payload
/// has been written, e.g. the outer `RIFF` header or a `RETN` whose body depends on the
/// operation result.
///
/// Reserves space for the header with a placeholder size, lets the caller fill in the
/// payload at [`Self::payload_offset`], then [`Self::finish`] backpatches the real size.
#[derive(Debug, Clone, Copy)]
pub struct ChunkCursor {
    header_offset: usize,
    payload_offset: usize,
}

impl ChunkCursor {
    /// Reserves an 8-byte chunk header for `tag` at `offset`, leaving the size field as
    /// zero until [`Self::finish`] is called.
    pub fn open(buf: &mut [u8], offset: usize, tag: FourCc) -> Result<Self> {
        ChunkHeader { tag, size: 0 }.write(buf, offset)?;
        Ok(Self {
            header_offset: offset,
            payload_offset: ChunkHeader::payload_offset(offset),
        })
    }

    #[must_use]
    pub const fn payload_offset(&self) -> usize {
        self.payload_offset
    }

    /// Backpatches the chunk's size field now that `payload_end` is known, and returns the
    /// offset one past the (possibly padded) payload.
    pub fn finish(self, buf: &mut [u8], payload_end: usize) -> Result<usize> {
        let size = payload_end
            .checked_sub(self.payload_offset)
            .ok_or(LibraryError::ParseError)?;
        let size_u32 = u32::try_from(size).map_err(|_| LibraryError::DataOverflow)?;
        write_u32_le(buf, self.header_offset + 4, size_u32)?;
        let padded_end = self.payload_offset + crate::wire::pad_to_even(size);
        if padded_end > payload_end {
            // pad byte
            *buf.get_mut(payload_end).ok_or(LibraryError::BufferFull)? = 0;
        }
        Ok(padded_end)
    }
}

fn read_tag(buf: &[u8], offset: usize) -> Result<FourCc> {
    let bytes = read_bytes(buf, offset, 4)?;
    Ok(FourCc::new([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn write_tag(buf: &mut [u8], offset: usize, tag: FourCc) -> Result<()> {
    write_bytes(buf, offset, &tag.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn riff_header_roundtrip() {
        let mut buf = [0u8; 12];
        let header = RiffHeader { size: 40, form_type: FourCc::SEMI };
        header.write(&mut buf).unwrap();
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(RiffHeader::parse(&buf).unwrap(), header);
    }

    #[test]
    fn riff_header_rejects_bad_magic() {
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(b"XXXX");
        let err = RiffHeader::parse(&buf).unwrap_err();
        assert_eq!(err, LibraryError::BadRiffMagic);
    }

    #[test]
    fn riff_header_rejects_bad_form_type() {
        let mut buf = [0u8; 12];
        RiffHeader { size: 4, form_type: FourCc::new(*b"WAVE") }.write(&mut buf).unwrap();
        let err = RiffHeader::parse(&buf).unwrap_err();
        assert_eq!(err, LibraryError::BadFormType);
    }

    #[test]
    fn chunk_cursor_backpatches_odd_sized_payload() {
        let mut buf = [0u8; 32];
        let cursor = ChunkCursor::open(&mut buf, 0, FourCc::DATA).unwrap();
        let payload_start = cursor.payload_offset();
        buf[payload_start..payload_start + 3].copy_from_slice(&[1, 2, 3]);
        let end = cursor.finish(&mut buf, payload_start + 3).unwrap();

        let header = ChunkHeader::parse(&buf, 0).unwrap();
        assert_eq!(header.size, 3);
        assert_eq!(end, payload_start + 4);
        assert_eq!(buf[payload_start + 3], 0);
    }

    #[test]
    fn chunk_header_next_offset_skips_pad() {
        let header = ChunkHeader { tag: FourCc::DATA, size: 3 };
        assert_eq!(header.next_offset(0), 8 + 4);
    }
}
