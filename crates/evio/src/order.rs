//! Byte order handling and in-place swapping of 16, 32 and 64-bit words.

use std::fmt;

/// Order of the bytes inside every multi-byte field of an EVIO buffer
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first, the order EVIO files are usually written in
    #[default]
    Big,

    /// Least significant byte first
    Little,
}

impl ByteOrder {
    /// Byte order of the machine this code runs on
    pub const fn local() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// The other byte order
    pub const fn opposite(self) -> Self {
        match self {
            ByteOrder::Big => ByteOrder::Little,
            ByteOrder::Little => ByteOrder::Big,
        }
    }

    /// Whether this is the byte order of the running machine
    pub fn is_local(self) -> bool {
        self == Self::local()
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Big => f.write_str("big endian"),
            ByteOrder::Little => f.write_str("little endian"),
        }
    }
}

impl From<ByteOrder> for binrw::Endian {
    fn from(value: ByteOrder) -> Self {
        match value {
            ByteOrder::Big => binrw::Endian::Big,
            ByteOrder::Little => binrw::Endian::Little,
        }
    }
}

impl From<binrw::Endian> for ByteOrder {
    fn from(value: binrw::Endian) -> Self {
        match value {
            binrw::Endian::Big => ByteOrder::Big,
            binrw::Endian::Little => ByteOrder::Little,
        }
    }
}

/// Reverse the bytes of every 16-bit word in `bytes`.
///
/// A trailing partial word is left untouched.
pub fn swap16(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(2) {
        word.reverse();
    }
}

/// Reverse the bytes of every 32-bit word in `bytes`.
///
/// A trailing partial word is left untouched.
pub fn swap32(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// Reverse the bytes of every 64-bit word in `bytes`.
///
/// A trailing partial word is left untouched.
pub fn swap64(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(8) {
        word.reverse();
    }
}

/// Reverse every `width` byte element of `bytes`; widths of 0 and 1 are no-ops
pub fn swap_elements(bytes: &mut [u8], width: usize) {
    match width {
        2 => swap16(bytes),
        4 => swap32(bytes),
        8 => swap64(bytes),
        _ => {}
    }
}
