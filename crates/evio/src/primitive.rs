//! Fixed width element types a structure payload can hold.

use std::fmt::Debug;
use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::order::ByteOrder;
use crate::structure::Payload;

/// A numeric element type with a matching EVIO data type
pub trait Primitive: Copy + Debug + PartialEq + 'static {
    /// The data type a header declares for a payload of this element
    const DATA_TYPE: DataType;

    /// Width of one element in bytes
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Read one element in `order`
    fn read_from<R: Read>(reader: &mut R, order: ByteOrder) -> std::io::Result<Self>;

    /// Write one element in `order`
    fn write_to<W: Write>(self, writer: &mut W, order: ByteOrder) -> std::io::Result<()>;

    /// Wrap decoded elements into a payload
    fn into_payload(values: Vec<Self>) -> Payload;

    /// The elements held by `payload`, when it holds this element type
    fn payload_ref(payload: &Payload) -> Option<&Vec<Self>>;

    /// Mutable access to the elements held by `payload`
    fn payload_mut(payload: &mut Payload) -> Option<&mut Vec<Self>>;
}

macro_rules! primitive {
    (@payload $ty:ty, $variant:ident) => {
        fn into_payload(values: Vec<Self>) -> Payload {
            Payload::$variant(values)
        }

        fn payload_ref(payload: &Payload) -> Option<&Vec<Self>> {
            match payload {
                Payload::$variant(values) => Some(values),
                _ => None,
            }
        }

        fn payload_mut(payload: &mut Payload) -> Option<&mut Vec<Self>> {
            match payload {
                Payload::$variant(values) => Some(values),
                _ => None,
            }
        }
    };
    (@byte $ty:ty, $data_type:ident, $variant:ident, $read:ident, $write:ident) => {
        impl Primitive for $ty {
            const DATA_TYPE: DataType = DataType::$data_type;

            fn read_from<R: Read>(reader: &mut R, _order: ByteOrder) -> std::io::Result<Self> {
                reader.$read()
            }

            fn write_to<W: Write>(self, writer: &mut W, _order: ByteOrder) -> std::io::Result<()> {
                writer.$write(self)
            }

            primitive!(@payload $ty, $variant);
        }
    };
    ($ty:ty, $data_type:ident, $variant:ident, $read:ident, $write:ident) => {
        impl Primitive for $ty {
            const DATA_TYPE: DataType = DataType::$data_type;

            fn read_from<R: Read>(reader: &mut R, order: ByteOrder) -> std::io::Result<Self> {
                match order {
                    ByteOrder::Big => reader.$read::<BigEndian>(),
                    ByteOrder::Little => reader.$read::<LittleEndian>(),
                }
            }

            fn write_to<W: Write>(self, writer: &mut W, order: ByteOrder) -> std::io::Result<()> {
                match order {
                    ByteOrder::Big => writer.$write::<BigEndian>(self),
                    ByteOrder::Little => writer.$write::<LittleEndian>(self),
                }
            }

            primitive!(@payload $ty, $variant);
        }
    };
}

primitive!(i32, Int32, Int, read_i32, write_i32);
primitive!(u32, UInt32, UInt, read_u32, write_u32);
primitive!(i16, Short16, Short, read_i16, write_i16);
primitive!(u16, UShort16, UShort, read_u16, write_u16);
primitive!(i64, Long64, Long, read_i64, write_i64);
primitive!(u64, ULong64, ULong, read_u64, write_u64);
primitive!(f32, Float32, Float, read_f32, write_f32);
primitive!(f64, Double64, Double, read_f64, write_f64);
primitive!(@byte i8, Char8, Char, read_i8, write_i8);
primitive!(@byte u8, UChar8, UChar, read_u8, write_u8);

/// Bytes of padding needed after `count` elements of `width` bytes
pub const fn padding_for(count: usize, width: usize) -> u8 {
    match width {
        1 => ((4 - count % 4) % 4) as u8,
        2 => 2 * (count % 2) as u8,
        _ => 0,
    }
}

/// Decode every element of `raw`, ignoring `padding` trailing bytes
pub fn decode_all<T: Primitive>(raw: &[u8], padding: u8, order: ByteOrder) -> Result<Vec<T>> {
    let used = raw.len().saturating_sub(padding as usize);
    if used % T::SIZE != 0 {
        return Err(Error::Truncated {
            needed: used.next_multiple_of(T::SIZE),
            available: used,
        });
    }

    let mut reader = Cursor::new(&raw[..used]);
    let mut values = Vec::with_capacity(used / T::SIZE);
    for _ in 0..used / T::SIZE {
        values.push(T::read_from(&mut reader, order)?);
    }
    Ok(values)
}

/// Encode `values` in `order`, followed by the zero padding that completes the last word
pub fn encode_all<T: Primitive>(values: &[T], order: ByteOrder) -> Result<Vec<u8>> {
    let padding = padding_for(values.len(), T::SIZE) as usize;
    let mut raw = Vec::with_capacity(values.len() * T::SIZE + padding);
    for &value in values {
        value.write_to(&mut raw, order)?;
    }
    raw.resize(raw.len() + padding, 0);
    Ok(raw)
}
