//! Content type codes carried in every structure header.

use std::fmt;

/// Identifies what the payload of a structure contains
///
/// The codes form a closed set from `0x0` to `0x24`. Any other code read from
/// a buffer decodes as [`DataType::Unknown32`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// Opaque 32-bit words
    #[default]
    Unknown32 = 0x0,
    /// Unsigned 32-bit integers
    UInt32 = 0x1,
    /// 32-bit floats
    Float32 = 0x2,
    /// Array of NUL terminated strings
    CharStar8 = 0x3,
    /// Signed 16-bit integers
    Short16 = 0x4,
    /// Unsigned 16-bit integers
    UShort16 = 0x5,
    /// Signed 8-bit integers
    Char8 = 0x6,
    /// Unsigned 8-bit integers
    UChar8 = 0x7,
    /// 64-bit floats
    Double64 = 0x8,
    /// Signed 64-bit integers
    Long64 = 0x9,
    /// Unsigned 64-bit integers
    ULong64 = 0xa,
    /// Signed 32-bit integers
    Int32 = 0xb,
    /// Tag segments
    TagSegment = 0xc,
    /// Segments, in a header too narrow for [`DataType::Segment`]
    AlsoSegment = 0xd,
    /// Banks, in a header too narrow for [`DataType::Bank`]
    AlsoBank = 0xe,
    /// Self describing composite data
    Composite = 0xf,
    /// Banks
    Bank = 0x10,
    /// Segments
    Segment = 0x20,
    /// 32-bit Hollerith, only inside composite data
    Hollerit = 0x21,
    /// 32-bit multiplier, only inside composite data
    NValue = 0x22,
    /// 16-bit multiplier, only inside composite data
    ShortNValue = 0x23,
    /// 8-bit multiplier, only inside composite data
    ByteNValue = 0x24,
}

impl DataType {
    /// Every defined type, in code order
    pub const ALL: [DataType; 22] = [
        DataType::Unknown32,
        DataType::UInt32,
        DataType::Float32,
        DataType::CharStar8,
        DataType::Short16,
        DataType::UShort16,
        DataType::Char8,
        DataType::UChar8,
        DataType::Double64,
        DataType::Long64,
        DataType::ULong64,
        DataType::Int32,
        DataType::TagSegment,
        DataType::AlsoSegment,
        DataType::AlsoBank,
        DataType::Composite,
        DataType::Bank,
        DataType::Segment,
        DataType::Hollerit,
        DataType::NValue,
        DataType::ShortNValue,
        DataType::ByteNValue,
    ];

    /// Look a type up by its code, falling back to [`DataType::Unknown32`]
    pub fn from_code(code: u32) -> DataType {
        match code {
            0x0..=0x10 | 0x20..=0x24 => DataType::ALL
                .iter()
                .copied()
                .find(|t| t.code() as u32 == code)
                .unwrap_or(DataType::Unknown32),
            _ => DataType::Unknown32,
        }
    }

    /// The numeric code written into headers
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Canonical upper case name, keeping the `ALSO` prefix
    pub const fn name(self) -> &'static str {
        match self {
            DataType::Unknown32 => "UNKNOWN32",
            DataType::UInt32 => "UINT32",
            DataType::Float32 => "FLOAT32",
            DataType::CharStar8 => "CHARSTAR8",
            DataType::Short16 => "SHORT16",
            DataType::UShort16 => "USHORT16",
            DataType::Char8 => "CHAR8",
            DataType::UChar8 => "UCHAR8",
            DataType::Double64 => "DOUBLE64",
            DataType::Long64 => "LONG64",
            DataType::ULong64 => "ULONG64",
            DataType::Int32 => "INT32",
            DataType::TagSegment => "TAGSEGMENT",
            DataType::AlsoSegment => "ALSOSEGMENT",
            DataType::AlsoBank => "ALSOBANK",
            DataType::Composite => "COMPOSITE",
            DataType::Bank => "BANK",
            DataType::Segment => "SEGMENT",
            DataType::Hollerit => "HOLLERIT",
            DataType::NValue => "NVALUE",
            DataType::ShortNValue => "nVALUE",
            DataType::ByteNValue => "mVALUE",
        }
    }

    /// Width in bytes of one item of this type
    ///
    /// Containers report the width of a word, strings and composite data the
    /// width of a byte.
    pub const fn bytes(self) -> usize {
        match self {
            DataType::CharStar8
            | DataType::Char8
            | DataType::UChar8
            | DataType::Composite
            | DataType::ByteNValue => 1,
            DataType::Short16 | DataType::UShort16 | DataType::ShortNValue => 2,
            DataType::Double64 | DataType::Long64 | DataType::ULong64 => 8,
            _ => 4,
        }
    }

    /// Whether the payload is a list of child banks
    pub const fn is_bank(self) -> bool {
        matches!(self, DataType::Bank | DataType::AlsoBank)
    }

    /// Whether the payload is a list of child segments
    pub const fn is_segment(self) -> bool {
        matches!(self, DataType::Segment | DataType::AlsoSegment)
    }

    /// Whether the payload is a list of child tag segments
    pub const fn is_tag_segment(self) -> bool {
        matches!(self, DataType::TagSegment)
    }

    /// Whether the payload is a list of child structures
    pub const fn is_structure(self) -> bool {
        self.is_bank() || self.is_segment() || self.is_tag_segment()
    }

    /// Whether items are integers of any width or signedness
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::UChar8
                | DataType::Char8
                | DataType::UShort16
                | DataType::Short16
                | DataType::UInt32
                | DataType::Int32
                | DataType::ULong64
                | DataType::Long64
        )
    }

    /// The same width integer type of the other signedness
    pub const fn counterpart(self) -> Option<DataType> {
        match self {
            DataType::Int32 => Some(DataType::UInt32),
            DataType::UInt32 => Some(DataType::Int32),
            DataType::Short16 => Some(DataType::UShort16),
            DataType::UShort16 => Some(DataType::Short16),
            DataType::Long64 => Some(DataType::ULong64),
            DataType::ULong64 => Some(DataType::Long64),
            DataType::Char8 => Some(DataType::UChar8),
            DataType::UChar8 => Some(DataType::Char8),
            _ => None,
        }
    }

    /// Whether `self` is `other` or its signed/unsigned counterpart
    pub fn is_compatible(self, other: DataType) -> bool {
        self == other || self.counterpart() == Some(other)
    }
}

impl From<u32> for DataType {
    fn from(value: u32) -> Self {
        DataType::from_code(value)
    }
}

impl From<DataType> for u32 {
    fn from(value: DataType) -> Self {
        value.code() as u32
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::AlsoBank => f.write_str(DataType::Bank.name()),
            DataType::AlsoSegment => f.write_str(DataType::Segment.name()),
            other => f.write_str(other.name()),
        }
    }
}
