// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Four-character chunk tags.

/// A four-byte chunk identifier such as `RIFF`, `SEMI`, `CNFG`, `CALL`, `PARM`, `DATA`,
/// `RETN`, or `ERRO`.
///
/// Tags are compared byte-for-byte; there is no case folding, matching how RIFF-family
/// formats treat FourCCs in practice.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const SEMI: Self = Self(*b"SEMI");
    pub const CNFG: Self = Self(*b"CNFG");
    pub const CALL: Self = Self(*b"CALL");
    pub const PARM: Self = Self(*b"PARM");
    pub const DATA: Self = Self(*b"DATA");
    pub const RETN: Self = Self(*b"RETN");
    pub const ERRO: Self = Self(*b"ERRO");

    #[must_use]
    pub const fn new(tag: [u8; 4]) -> Self {
        Self(tag)
    }

    #[must_use]
    pub const fn as_bytes(self) -> [u8; 4] {
        self.0
    }
}

impl core::fmt::Debug for FourCc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match core::str::from_utf8(&self.0) {
            Ok(s) if s.bytes().all(|b| b.is_ascii_graphic()) => write!(f, "FourCc({s:?})"),
            _ => write!(f, "FourCc({:?})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_match_ascii() {
        assert_eq!(FourCc::RIFF.as_bytes(), *b"RIFF");
        assert_eq!(FourCc::ERRO.as_bytes(), *b"ERRO");
    }

    #[test]
    fn equality_is_byte_exact() {
        assert_eq!(FourCc::new(*b"CALL"), FourCc::CALL);
        assert_ne!(FourCc::new(*b"call"), FourCc::CALL);
    }
}
