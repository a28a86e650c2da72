//! Headers of the three structure kinds and their wire layouts.

use std::fmt;
use std::io::{Cursor, Read, Seek, Write};

use binrw::{BinRead, BinResult, BinWrite, Endian};

use crate::data_type::DataType;
use crate::error::{Error, OverflowError, Result};
use crate::order::ByteOrder;

/// The three kinds of EVIO structure
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StructureType {
    /// Two word header with a 16-bit tag and an 8-bit number
    Bank,
    /// One word header with an 8-bit tag
    Segment,
    /// One word header with a 12-bit tag and a 4-bit type
    TagSegment,
}

impl StructureType {
    /// Number of 32-bit words in the header, including the length
    pub const fn header_length(self) -> u32 {
        match self {
            StructureType::Bank => 2,
            StructureType::Segment | StructureType::TagSegment => 1,
        }
    }

    /// Size of the header in bytes
    pub const fn header_bytes(self) -> usize {
        4 * self.header_length() as usize
    }

    /// Largest tag the header can hold
    pub const fn max_tag(self) -> u32 {
        match self {
            StructureType::Bank => 0xffff,
            StructureType::Segment => 0xff,
            StructureType::TagSegment => 0xfff,
        }
    }

    /// Largest value the length field can hold
    pub const fn max_length(self) -> u64 {
        match self {
            StructureType::Bank => u32::MAX as u64,
            StructureType::Segment | StructureType::TagSegment => 0xffff,
        }
    }

    /// Largest number of payload words a structure of this kind can describe
    pub const fn max_data_words(self) -> u64 {
        self.max_length() - (self.header_length() as u64 - 1)
    }

    /// The container type a parent must declare to hold children of this kind
    pub const fn container_type(self) -> DataType {
        match self {
            StructureType::Bank => DataType::Bank,
            StructureType::Segment => DataType::Segment,
            StructureType::TagSegment => DataType::TagSegment,
        }
    }

    /// Kind of the children a container of `data_type` holds
    pub const fn of_children(data_type: DataType) -> Option<StructureType> {
        if data_type.is_bank() {
            Some(StructureType::Bank)
        } else if data_type.is_segment() {
            Some(StructureType::Segment)
        } else if data_type.is_tag_segment() {
            Some(StructureType::TagSegment)
        } else {
            None
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureType::Bank => f.write_str("bank"),
            StructureType::Segment => f.write_str("segment"),
            StructureType::TagSegment => f.write_str("tag segment"),
        }
    }
}

/// Header of a bank, segment or tag segment
///
/// | Kind        | Word | Big endian bytes                          | Little endian bytes                       |
/// |-------------|------|-------------------------------------------|-------------------------------------------|
/// | Bank        | 0    | length:32                                 | length:32                                 |
/// | Bank        | 1    | tag:16, pad:2+type:6, num:8               | num:8, pad:2+type:6, tag:16               |
/// | Segment     | 0    | tag:8, pad:2+type:6, length:16            | length:16, pad:2+type:6, tag:8            |
/// | Tag segment | 0    | tag:12+type:4 (16 bits), length:16        | length:16, tag:12+type:4 (16 bits)        |
///
/// The length counts the 32-bit words following the length word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StructureHeader {
    kind: StructureType,
    length: u32,
    tag: u16,
    data_type: DataType,
    padding: u8,
    number: u8,
}

impl StructureHeader {
    /// Create a header of any kind, checking the tag and type fit
    pub fn new(kind: StructureType, tag: u16, data_type: DataType, number: u8) -> Result<Self> {
        let mut header = StructureHeader {
            kind,
            length: kind.header_length() - 1,
            tag: 0,
            data_type: DataType::Unknown32,
            padding: 0,
            number: if kind == StructureType::Bank { number } else { 0 },
        };
        header.set_tag(tag)?;
        header.set_data_type(data_type)?;
        Ok(header)
    }

    /// Create a bank header
    pub fn bank(tag: u16, data_type: DataType, number: u8) -> Self {
        StructureHeader {
            kind: StructureType::Bank,
            length: 1,
            tag,
            data_type,
            padding: 0,
            number,
        }
    }

    /// Create a segment header
    pub fn segment(tag: u8, data_type: DataType) -> Self {
        StructureHeader {
            kind: StructureType::Segment,
            length: 0,
            tag: tag as u16,
            data_type,
            padding: 0,
            number: 0,
        }
    }

    /// Create a tag segment header
    ///
    /// Banks and segments are stored as [`DataType::AlsoBank`] and
    /// [`DataType::AlsoSegment`] since their codes do not fit in four bits.
    pub fn tag_segment(tag: u16, data_type: DataType) -> Result<Self> {
        Self::new(StructureType::TagSegment, tag, data_type, 0)
    }

    /// Kind of structure this header belongs to
    pub const fn kind(&self) -> StructureType {
        self.kind
    }

    /// Number of words following the length word
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Tag identifying the structure
    pub const fn tag(&self) -> u16 {
        self.tag
    }

    /// Type of the payload
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of unused bytes at the end of the payload
    pub const fn padding(&self) -> u8 {
        self.padding
    }

    /// Number identifying the structure, always zero outside banks
    pub const fn number(&self) -> u8 {
        self.number
    }

    /// Number of 32-bit words in the header, including the length
    pub const fn header_length(&self) -> u32 {
        self.kind.header_length()
    }

    /// Number of payload words described by the length
    pub const fn data_length(&self) -> u32 {
        self.length.saturating_sub(self.kind.header_length() - 1)
    }

    /// Size of the whole structure in bytes
    pub const fn total_bytes(&self) -> usize {
        4 * (self.length as usize + 1)
    }

    /// Change the tag, rejecting values wider than the header's tag field
    pub fn set_tag(&mut self, tag: u16) -> Result<()> {
        if tag as u32 > self.kind.max_tag() {
            return Err(OverflowError::Tag {
                tag: tag as u32,
                kind: self.kind,
                max: self.kind.max_tag(),
            }
            .into());
        }
        self.tag = tag;
        Ok(())
    }

    /// Change the number; headers other than banks have no number field
    pub fn set_number(&mut self, number: u8) {
        if self.kind == StructureType::Bank {
            self.number = number;
        }
    }

    pub(crate) fn set_length(&mut self, length: u32) {
        self.length = length;
    }

    pub(crate) fn set_padding(&mut self, padding: u8) -> Result<()> {
        if self.kind == StructureType::TagSegment && padding != 0 {
            return Err(Error::PaddingNotRepresentable {
                padding,
                kind: self.kind,
            });
        }
        self.padding = padding & 0x3;
        Ok(())
    }

    pub(crate) fn set_data_type(&mut self, data_type: DataType) -> Result<()> {
        self.data_type = match self.kind {
            StructureType::TagSegment => match data_type {
                DataType::Bank => DataType::AlsoBank,
                DataType::Segment => DataType::AlsoSegment,
                t if t.code() > 0xf => {
                    return Err(Error::TypeNotRepresentable {
                        data_type: t,
                        kind: self.kind,
                    })
                }
                t => t,
            },
            _ => data_type,
        };
        Ok(())
    }

    fn type_byte(&self) -> u8 {
        (self.data_type.code() & 0x3f) | (self.padding << 6)
    }

    /// Decode a header of `kind` from the start of `bytes`
    pub fn read_from(bytes: &[u8], kind: StructureType, order: ByteOrder) -> Result<Self> {
        if bytes.len() < kind.header_bytes() {
            return Err(Error::Truncated {
                needed: kind.header_bytes(),
                available: bytes.len(),
            });
        }
        Ok(Self::read_options(
            &mut Cursor::new(bytes),
            order.into(),
            kind,
        )?)
    }

    /// Encode the header at the start of `dest`, returning the bytes written
    pub fn write_into(&self, dest: &mut [u8], order: ByteOrder) -> Result<usize> {
        let required = self.kind.header_bytes();
        if dest.len() < required {
            return Err(Error::DestinationTooSmall {
                required,
                available: dest.len(),
            });
        }
        self.write_options(&mut Cursor::new(&mut dest[..required]), order.into(), ())?;
        Ok(required)
    }

    /// Encode the header onto the end of `out`, returning the bytes written
    pub fn write_to(&self, out: &mut Vec<u8>, order: ByteOrder) -> Result<usize> {
        let start = out.len();
        out.resize(start + self.kind.header_bytes(), 0);
        self.write_into(&mut out[start..], order)
    }
}

impl BinRead for StructureHeader {
    type Args<'a> = StructureType;

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        kind: Self::Args<'_>,
    ) -> BinResult<Self> {
        let (length, tag, type_byte, number) = match (kind, endian) {
            (StructureType::Bank, Endian::Big) => {
                let length = u32::read_options(reader, endian, ())?;
                let tag = u16::read_options(reader, endian, ())?;
                let type_byte = u8::read_options(reader, endian, ())?;
                let number = u8::read_options(reader, endian, ())?;
                (length, tag, type_byte, number)
            }
            (StructureType::Bank, Endian::Little) => {
                let length = u32::read_options(reader, endian, ())?;
                let number = u8::read_options(reader, endian, ())?;
                let type_byte = u8::read_options(reader, endian, ())?;
                let tag = u16::read_options(reader, endian, ())?;
                (length, tag, type_byte, number)
            }
            (StructureType::Segment, Endian::Big) => {
                let tag = u8::read_options(reader, endian, ())?;
                let type_byte = u8::read_options(reader, endian, ())?;
                let length = u16::read_options(reader, endian, ())?;
                (length as u32, tag as u16, type_byte, 0)
            }
            (StructureType::Segment, Endian::Little) => {
                let length = u16::read_options(reader, endian, ())?;
                let type_byte = u8::read_options(reader, endian, ())?;
                let tag = u8::read_options(reader, endian, ())?;
                (length as u32, tag as u16, type_byte, 0)
            }
            (StructureType::TagSegment, _) => {
                let word = u32::read_options(reader, endian, ())?;
                // no padding bits, the 4-bit type takes the low nibble
                let type_byte = ((word >> 16) & 0xf) as u8;
                ((word & 0xffff), (word >> 20) as u16, type_byte, 0)
            }
        };

        Ok(StructureHeader {
            kind,
            length,
            tag,
            data_type: DataType::from_code((type_byte & 0x3f) as u32),
            padding: type_byte >> 6,
            number,
        })
    }
}

impl BinWrite for StructureHeader {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        match (self.kind, endian) {
            (StructureType::Bank, Endian::Big) => {
                self.length.write_options(writer, endian, ())?;
                self.tag.write_options(writer, endian, ())?;
                self.type_byte().write_options(writer, endian, ())?;
                self.number.write_options(writer, endian, ())
            }
            (StructureType::Bank, Endian::Little) => {
                self.length.write_options(writer, endian, ())?;
                self.number.write_options(writer, endian, ())?;
                self.type_byte().write_options(writer, endian, ())?;
                self.tag.write_options(writer, endian, ())
            }
            (StructureType::Segment, Endian::Big) => {
                (self.tag as u8).write_options(writer, endian, ())?;
                self.type_byte().write_options(writer, endian, ())?;
                (self.length as u16).write_options(writer, endian, ())
            }
            (StructureType::Segment, Endian::Little) => {
                (self.length as u16).write_options(writer, endian, ())?;
                self.type_byte().write_options(writer, endian, ())?;
                (self.tag as u8).write_options(writer, endian, ())
            }
            (StructureType::TagSegment, _) => {
                let word = ((self.tag as u32 & 0xfff) << 20)
                    | ((self.data_type.code() as u32 & 0xf) << 16)
                    | (self.length & 0xffff);
                word.write_options(writer, endian, ())
            }
        }
    }
}

impl fmt::Display for StructureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} header: tag={} type={} length={}",
            self.kind, self.tag, self.data_type, self.length
        )?;
        if self.kind == StructureType::Bank {
            write!(f, " num={}", self.number)?;
        }
        if self.kind != StructureType::TagSegment {
            write!(f, " padding={}", self.padding)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::data_type::DataType;
    use crate::error::{Error, OverflowError, Result};
    use crate::header::{StructureHeader, StructureType};
    use crate::order::ByteOrder;

    fn encode(header: &StructureHeader, order: ByteOrder) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        header.write_to(&mut out, order)?;
        Ok(out)
    }

    fn bank_fixture() -> StructureHeader {
        let mut header = StructureHeader::bank(0x1234, DataType::Int32, 0x56);
        header.set_length(3);
        header
    }

    #[test]
    fn write_bank_big_endian() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x03, // Length
            0x12, 0x34,             // Tag
            0x0B,                   // Padding + Type
            0x56,                   // Num
        ];

        assert_eq!(encode(&bank_fixture(), ByteOrder::Big)?, expected);
        Ok(())
    }

    #[test]
    fn write_bank_little_endian() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x03, 0x00, 0x00, 0x00, // Length
            0x56,                   // Num
            0x0B,                   // Padding + Type
            0x34, 0x12,             // Tag
        ];

        assert_eq!(encode(&bank_fixture(), ByteOrder::Little)?, expected);
        Ok(())
    }

    #[test]
    fn bank_padding_bits() -> Result<()> {
        let mut header = StructureHeader::bank(1, DataType::Short16, 2);
        header.set_padding(2)?;
        header.set_length(2);

        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x01,
            0x84,
            0x02,
        ];
        let bytes = encode(&header, ByteOrder::Big)?;
        assert_eq!(bytes, expected);

        let decoded = StructureHeader::read_from(&bytes, StructureType::Bank, ByteOrder::Big)?;
        assert_eq!(decoded.padding(), 2);
        assert_eq!(decoded.data_type(), DataType::Short16);
        Ok(())
    }

    #[test]
    fn write_segment() -> Result<()> {
        let mut header = StructureHeader::segment(0x12, DataType::UInt32);
        header.set_length(5);

        #[rustfmt::skip]
        let big = vec![
            0x12,       // Tag
            0x01,       // Padding + Type
            0x00, 0x05, // Length
        ];
        #[rustfmt::skip]
        let little = vec![
            0x05, 0x00, // Length
            0x01,       // Padding + Type
            0x12,       // Tag
        ];

        assert_eq!(encode(&header, ByteOrder::Big)?, big);
        assert_eq!(encode(&header, ByteOrder::Little)?, little);
        Ok(())
    }

    #[test]
    fn write_tag_segment() -> Result<()> {
        let mut header = StructureHeader::tag_segment(0xabc, DataType::CharStar8)?;
        header.set_length(2);

        #[rustfmt::skip]
        let big = vec![
            0xAB, 0xC3, // Tag + Type
            0x00, 0x02, // Length
        ];
        #[rustfmt::skip]
        let little = vec![
            0x02, 0x00, // Length
            0xC3, 0xAB, // Tag + Type
        ];

        assert_eq!(encode(&header, ByteOrder::Big)?, big);
        assert_eq!(encode(&header, ByteOrder::Little)?, little);
        Ok(())
    }

    #[test]
    fn read_fixtures() -> Result<()> {
        #[rustfmt::skip]
        let bank = [0x03, 0x00, 0x00, 0x00, 0x56, 0x0B, 0x34, 0x12];
        assert_eq!(
            StructureHeader::read_from(&bank, StructureType::Bank, ByteOrder::Little)?,
            bank_fixture()
        );

        let segment = [0x05, 0x00, 0x01, 0x12];
        let header = StructureHeader::read_from(&segment, StructureType::Segment, ByteOrder::Little)?;
        assert_eq!(header.tag(), 0x12);
        assert_eq!(header.length(), 5);
        assert_eq!(header.data_type(), DataType::UInt32);

        let tag_segment = [0xAB, 0xC3, 0x00, 0x02];
        let header =
            StructureHeader::read_from(&tag_segment, StructureType::TagSegment, ByteOrder::Big)?;
        assert_eq!(header.tag(), 0xabc);
        assert_eq!(header.length(), 2);
        assert_eq!(header.data_type(), DataType::CharStar8);
        Ok(())
    }

    #[test]
    fn tag_segment_narrows_container_types() -> Result<()> {
        let header = StructureHeader::tag_segment(1, DataType::Bank)?;
        assert_eq!(header.data_type(), DataType::AlsoBank);

        let header = StructureHeader::tag_segment(1, DataType::Segment)?;
        assert_eq!(header.data_type(), DataType::AlsoSegment);

        assert!(matches!(
            StructureHeader::tag_segment(1, DataType::Hollerit),
            Err(Error::TypeNotRepresentable { .. })
        ));
        Ok(())
    }

    #[test]
    fn tag_too_wide() {
        let result = StructureHeader::tag_segment(0x1000, DataType::Int32);
        assert!(matches!(
            result,
            Err(Error::Overflow(OverflowError::Tag { tag: 0x1000, .. }))
        ));

        let mut header = StructureHeader::segment(1, DataType::Int32);
        assert!(header.set_tag(0x100).is_err());
        assert_eq!(header.tag(), 1);
    }

    #[test]
    fn destination_too_small() {
        let mut dest = [0u8; 4];
        let result = bank_fixture().write_into(&mut dest, ByteOrder::Big);
        assert!(matches!(
            result,
            Err(Error::DestinationTooSmall {
                required: 8,
                available: 4
            })
        ));
    }

    #[test]
    fn header_lengths() {
        assert_eq!(StructureType::Bank.header_length(), 2);
        assert_eq!(StructureType::Segment.header_length(), 1);
        assert_eq!(StructureType::TagSegment.header_length(), 1);
        assert_eq!(bank_fixture().total_bytes(), 16);
        assert_eq!(bank_fixture().data_length(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(
            bank_fixture().to_string(),
            "bank header: tag=4660 type=INT32 length=3 num=86 padding=0"
        );
    }
}
