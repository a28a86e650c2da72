//! Self describing COMPOSITE payloads.
//!
//! A composite payload is a list of items. Each item carries a format string
//! describing its values and the values themselves:
//!
//! | Part        | Layout                                                        |
//! |-------------|---------------------------------------------------------------|
//! | Format head | Tag segment header, tag = format tag, type = CHARSTAR8        |
//! | Format      | The format as a one element string array                      |
//! | Data head   | Bank header, tag = data tag, num = data num, type = COMPOSITE |
//! | Data        | The values, padded to a whole word                            |
//!
//! # Format language
//!
//! A format is a list of items separated by optional commas. An item is an
//! optional repeat count followed by a type letter or a parenthesized group.
//!
//! | Count | Meaning                                    |
//! |-------|--------------------------------------------|
//! | `12`  | repeat twelve times                        |
//! | `N`   | read a 32-bit repeat count from the data   |
//! | `n`   | read a 16-bit repeat count from the data   |
//! | `m`   | read an 8-bit repeat count from the data   |
//!
//! | Letter | Value              | Letter | Value              |
//! |--------|--------------------|--------|--------------------|
//! | `I`    | 32-bit signed      | `i`    | 32-bit unsigned    |
//! | `S`    | 16-bit signed      | `s`    | 16-bit unsigned    |
//! | `C`    | 8-bit signed       | `c`    | 8-bit unsigned     |
//! | `L`    | 64-bit signed      | `l`    | 64-bit unsigned    |
//! | `F`    | 32-bit float       | `D`    | 64-bit float       |
//! | `a`    | 8-bit ASCII        | `A`    | 32-bit Hollerith   |
//!
//! The whole format is applied again and again until the data runs out.

use std::io::Cursor;

use tracing::{debug, instrument, trace};
use winnow::ascii::dec_uint;
use winnow::combinator::{alt, delimited, opt, repeat, terminated};
use winnow::prelude::*;
use winnow::token::{any, one_of};
use winnow::PResult;

use crate::data_type::DataType;
use crate::error::{Error, OverflowError, Result};
use crate::header::{StructureHeader, StructureType};
use crate::order::ByteOrder;
use crate::primitive::{padding_for, Primitive};
use crate::strings::{raw_bytes_to_strings, strings_to_raw_bytes};

/// Where a repeat count comes from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Count {
    /// Written in the format
    Fixed(u32),
    /// Read from the data, with the width of the given multiplier type
    FromData(DataType),
}

/// One element of a compiled format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatItem {
    /// How many times to apply `term`
    pub count: Count,
    /// A single value or a nested group
    pub term: Term,
}

/// What a format item repeats
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// A value of the given type
    Value(DataType),
    /// A parenthesized list of items
    Group(Vec<FormatItem>),
}

fn value_type(letter: char) -> Option<DataType> {
    Some(match letter {
        'I' => DataType::Int32,
        'i' => DataType::UInt32,
        'F' => DataType::Float32,
        'D' => DataType::Double64,
        'S' => DataType::Short16,
        's' => DataType::UShort16,
        'C' => DataType::Char8,
        'c' => DataType::UChar8,
        'L' => DataType::Long64,
        'l' => DataType::ULong64,
        'a' => DataType::CharStar8,
        'A' => DataType::Hollerit,
        _ => return None,
    })
}

fn repeat_count(input: &mut &str) -> PResult<Count> {
    alt((
        dec_uint::<_, u32, _>
            .verify(|n: &u32| *n > 0)
            .map(Count::Fixed),
        one_of(['N', 'n', 'm']).map(|c| {
            Count::FromData(match c {
                'N' => DataType::NValue,
                'n' => DataType::ShortNValue,
                _ => DataType::ByteNValue,
            })
        }),
    ))
    .parse_next(input)
}

fn term(input: &mut &str) -> PResult<Term> {
    alt((
        delimited('(', format_items, ')').map(Term::Group),
        any.verify_map(value_type).map(Term::Value),
    ))
    .parse_next(input)
}

fn format_item(input: &mut &str) -> PResult<FormatItem> {
    let count = opt(repeat_count).parse_next(input)?;
    let term = term.parse_next(input)?;
    Ok(FormatItem {
        count: count.unwrap_or(Count::Fixed(1)),
        term,
    })
}

fn format_items(input: &mut &str) -> PResult<Vec<FormatItem>> {
    repeat(1.., terminated(format_item, opt(','))).parse_next(input)
}

/// A compiled composite format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeFormat {
    source: String,
    items: Vec<FormatItem>,
}

impl CompositeFormat {
    /// Compile `format`, ignoring whitespace
    pub fn compile(format: &str) -> Result<Self> {
        let stripped: String = format.chars().filter(|c| !c.is_whitespace()).collect();
        let items = format_items
            .parse(stripped.as_str())
            .map_err(|e| Error::InvalidCompositeFormat {
                format: format.to_owned(),
                reason: format!("unexpected input at offset {}", e.offset()),
            })?;

        Ok(CompositeFormat {
            source: format.to_owned(),
            items,
        })
    }

    /// The format as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled items
    pub fn items(&self) -> &[FormatItem] {
        &self.items
    }
}

/// A single value of composite data
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CompositeValue {
    Int(i32),
    UInt(u32),
    Float(f32),
    Double(f64),
    Short(i16),
    UShort(u16),
    Char(i8),
    UChar(u8),
    Long(i64),
    ULong(u64),
    /// `a`
    Ascii(u8),
    /// `A`
    Hollerit(i32),
    /// `N` repeat count
    NValue(i32),
    /// `n` repeat count
    ShortNValue(i16),
    /// `m` repeat count
    ByteNValue(i8),
}

impl CompositeValue {
    /// The type letter or multiplier this value stands for
    pub fn data_type(&self) -> DataType {
        match self {
            CompositeValue::Int(_) => DataType::Int32,
            CompositeValue::UInt(_) => DataType::UInt32,
            CompositeValue::Float(_) => DataType::Float32,
            CompositeValue::Double(_) => DataType::Double64,
            CompositeValue::Short(_) => DataType::Short16,
            CompositeValue::UShort(_) => DataType::UShort16,
            CompositeValue::Char(_) => DataType::Char8,
            CompositeValue::UChar(_) => DataType::UChar8,
            CompositeValue::Long(_) => DataType::Long64,
            CompositeValue::ULong(_) => DataType::ULong64,
            CompositeValue::Ascii(_) => DataType::CharStar8,
            CompositeValue::Hollerit(_) => DataType::Hollerit,
            CompositeValue::NValue(_) => DataType::NValue,
            CompositeValue::ShortNValue(_) => DataType::ShortNValue,
            CompositeValue::ByteNValue(_) => DataType::ByteNValue,
        }
    }

    fn read_from(data_type: DataType, reader: &mut Cursor<&[u8]>, order: ByteOrder) -> Result<Self> {
        Ok(match data_type {
            DataType::Int32 => CompositeValue::Int(i32::read_from(reader, order)?),
            DataType::UInt32 => CompositeValue::UInt(u32::read_from(reader, order)?),
            DataType::Float32 => CompositeValue::Float(f32::read_from(reader, order)?),
            DataType::Double64 => CompositeValue::Double(f64::read_from(reader, order)?),
            DataType::Short16 => CompositeValue::Short(i16::read_from(reader, order)?),
            DataType::UShort16 => CompositeValue::UShort(u16::read_from(reader, order)?),
            DataType::Char8 => CompositeValue::Char(i8::read_from(reader, order)?),
            DataType::UChar8 => CompositeValue::UChar(u8::read_from(reader, order)?),
            DataType::Long64 => CompositeValue::Long(i64::read_from(reader, order)?),
            DataType::ULong64 => CompositeValue::ULong(u64::read_from(reader, order)?),
            DataType::CharStar8 => CompositeValue::Ascii(u8::read_from(reader, order)?),
            DataType::Hollerit => CompositeValue::Hollerit(i32::read_from(reader, order)?),
            DataType::NValue => CompositeValue::NValue(i32::read_from(reader, order)?),
            DataType::ShortNValue => CompositeValue::ShortNValue(i16::read_from(reader, order)?),
            DataType::ByteNValue => CompositeValue::ByteNValue(i8::read_from(reader, order)?),
            other => {
                return Err(Error::MalformedComposite(format!(
                    "{other} is not a composite value type"
                )))
            }
        })
    }

    fn write_to(self, out: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        match self {
            CompositeValue::Int(v) | CompositeValue::Hollerit(v) | CompositeValue::NValue(v) => {
                v.write_to(out, order)?
            }
            CompositeValue::UInt(v) => v.write_to(out, order)?,
            CompositeValue::Float(v) => v.write_to(out, order)?,
            CompositeValue::Double(v) => v.write_to(out, order)?,
            CompositeValue::Short(v) | CompositeValue::ShortNValue(v) => v.write_to(out, order)?,
            CompositeValue::UShort(v) => v.write_to(out, order)?,
            CompositeValue::Char(v) | CompositeValue::ByteNValue(v) => v.write_to(out, order)?,
            CompositeValue::UChar(v) | CompositeValue::Ascii(v) => v.write_to(out, order)?,
            CompositeValue::Long(v) => v.write_to(out, order)?,
            CompositeValue::ULong(v) => v.write_to(out, order)?,
        }
        Ok(())
    }

    fn repeat_count(self) -> Result<u32> {
        let count = match self {
            CompositeValue::NValue(v) => v as i64,
            CompositeValue::ShortNValue(v) => v as i64,
            CompositeValue::ByteNValue(v) => v as i64,
            other => {
                return Err(Error::MalformedComposite(format!(
                    "{other:?} is not a repeat count"
                )))
            }
        };
        u32::try_from(count)
            .map_err(|_| Error::MalformedComposite(format!("negative repeat count {count}")))
    }
}

/// Callbacks for a walk over a format
trait Visitor {
    /// Handle a repeat count of the given multiplier type, `None` once the values run out
    fn count(&mut self, multiplier: DataType) -> Result<Option<u32>>;

    /// Handle one value, `false` once the values run out
    fn value(&mut self, data_type: DataType) -> Result<bool>;

    /// How far the walk has advanced
    fn position(&self) -> usize;
}

fn walk<V: Visitor>(items: &[FormatItem], visitor: &mut V) -> Result<bool> {
    for item in items {
        let count = match item.count {
            Count::Fixed(n) => n,
            Count::FromData(multiplier) => match visitor.count(multiplier)? {
                Some(n) => n,
                None => return Ok(false),
            },
        };

        for _ in 0..count {
            let more = match &item.term {
                Term::Value(data_type) => visitor.value(*data_type)?,
                Term::Group(group) => walk(group, visitor)?,
            };
            if !more {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn drive<V: Visitor>(format: &CompositeFormat, visitor: &mut V) -> Result<()> {
    loop {
        let before = visitor.position();
        if !walk(&format.items, visitor)? {
            return Ok(());
        }
        if visitor.position() == before {
            return Err(Error::MalformedComposite(format!(
                "format {:?} does not consume any data",
                format.source
            )));
        }
    }
}

struct Decoder<'a> {
    reader: Cursor<&'a [u8]>,
    order: ByteOrder,
    values: Vec<CompositeValue>,
}

impl Decoder<'_> {
    /// Whether a value of `width` bytes is left; a partial value is an error
    fn has(&self, width: usize) -> Result<bool> {
        let remaining = self.reader.get_ref().len() - self.reader.position() as usize;
        match remaining {
            0 => Ok(false),
            r if r < width => Err(Error::MalformedComposite(format!(
                "{r} bytes left where a {width} byte value was expected"
            ))),
            _ => Ok(true),
        }
    }

    fn read(&mut self, data_type: DataType) -> Result<CompositeValue> {
        let value = CompositeValue::read_from(data_type, &mut self.reader, self.order)?;
        self.values.push(value);
        Ok(value)
    }
}

impl Visitor for Decoder<'_> {
    fn count(&mut self, multiplier: DataType) -> Result<Option<u32>> {
        if !self.has(multiplier.bytes())? {
            return Ok(None);
        }
        self.read(multiplier)?.repeat_count().map(Some)
    }

    fn value(&mut self, data_type: DataType) -> Result<bool> {
        if !self.has(data_type.bytes())? {
            return Ok(false);
        }
        self.read(data_type)?;
        Ok(true)
    }

    fn position(&self) -> usize {
        self.reader.position() as usize
    }
}

struct Encoder<'a> {
    values: &'a [CompositeValue],
    next: usize,
    order: ByteOrder,
    out: Vec<u8>,
}

impl Encoder<'_> {
    fn take(&mut self, data_type: DataType) -> Result<Option<CompositeValue>> {
        let Some(&value) = self.values.get(self.next) else {
            return Ok(None);
        };
        if value.data_type() != data_type {
            return Err(Error::MalformedComposite(format!(
                "value {} is {:?} where the format expects {}",
                self.next,
                value,
                data_type.name()
            )));
        }
        self.next += 1;
        value.write_to(&mut self.out, self.order)?;
        Ok(Some(value))
    }
}

impl Visitor for Encoder<'_> {
    fn count(&mut self, multiplier: DataType) -> Result<Option<u32>> {
        self.take(multiplier)?
            .map(CompositeValue::repeat_count)
            .transpose()
    }

    fn value(&mut self, data_type: DataType) -> Result<bool> {
        Ok(self.take(data_type)?.is_some())
    }

    fn position(&self) -> usize {
        self.next
    }
}

/// One item of a COMPOSITE payload
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeData {
    format_tag: u16,
    format: CompositeFormat,
    data_tag: u16,
    data_num: u8,
    values: Vec<CompositeValue>,
}

impl CompositeData {
    /// Build an item, checking that `values` follow `format`
    ///
    /// Repeat counts taken from the data (`N`, `n`, `m`) must appear among the
    /// values as [`CompositeValue::NValue`], [`CompositeValue::ShortNValue`]
    /// or [`CompositeValue::ByteNValue`] at the point the format reads them.
    pub fn new(
        format: &str,
        format_tag: u16,
        data_tag: u16,
        data_num: u8,
        values: Vec<CompositeValue>,
    ) -> Result<Self> {
        if format_tag as u32 > StructureType::TagSegment.max_tag() {
            return Err(OverflowError::Tag {
                tag: format_tag as u32,
                kind: StructureType::TagSegment,
                max: StructureType::TagSegment.max_tag(),
            }
            .into());
        }

        let item = CompositeData {
            format_tag,
            format: CompositeFormat::compile(format)?,
            data_tag,
            data_num,
            values,
        };
        item.encode_values(ByteOrder::Big)?;
        Ok(item)
    }

    /// Tag of the format tag segment
    pub fn format_tag(&self) -> u16 {
        self.format_tag
    }

    /// The compiled format
    pub fn format(&self) -> &CompositeFormat {
        &self.format
    }

    /// Tag of the data bank
    pub fn data_tag(&self) -> u16 {
        self.data_tag
    }

    /// Number of the data bank
    pub fn data_num(&self) -> u8 {
        self.data_num
    }

    /// The values, including repeat counts read from the data
    pub fn values(&self) -> &[CompositeValue] {
        &self.values
    }

    fn encode_values(&self, order: ByteOrder) -> Result<Vec<u8>> {
        let mut encoder = Encoder {
            values: &self.values,
            next: 0,
            order,
            out: Vec::new(),
        };
        drive(&self.format, &mut encoder)?;
        if encoder.next != self.values.len() {
            return Err(Error::MalformedComposite(format!(
                "only {} of {} values follow the format {:?}",
                encoder.next,
                self.values.len(),
                self.format.source
            )));
        }
        Ok(encoder.out)
    }

    fn decode_values(format: &CompositeFormat, data: &[u8], order: ByteOrder) -> Result<Vec<CompositeValue>> {
        let mut decoder = Decoder {
            reader: Cursor::new(data),
            order,
            values: Vec::new(),
        };
        drive(format, &mut decoder)?;
        Ok(decoder.values)
    }

    /// Append the encoded item to `out`
    pub fn write_to(&self, out: &mut Vec<u8>, order: ByteOrder) -> Result<()> {
        let format_raw = strings_to_raw_bytes(&[self.format.as_str()]);
        let mut format_header = StructureHeader::tag_segment(self.format_tag, DataType::CharStar8)?;
        format_header.set_length(fitted_length(format_raw.len() / 4, StructureType::TagSegment)?);
        format_header.write_to(out, order)?;
        out.extend_from_slice(&format_raw);

        let mut data = self.encode_values(order)?;
        let padding = padding_for(data.len(), 1);
        data.resize(data.len() + padding as usize, 0);

        let mut data_header = StructureHeader::bank(self.data_tag, DataType::Composite, self.data_num);
        data_header.set_padding(padding)?;
        data_header.set_length(fitted_length(1 + data.len() / 4, StructureType::Bank)?);
        data_header.write_to(out, order)?;
        out.extend_from_slice(&data);
        Ok(())
    }
}

fn fitted_length(words: usize, kind: StructureType) -> Result<u32> {
    let length = words as u64;
    if length > kind.max_length() {
        return Err(OverflowError::Length {
            length,
            kind,
            max: kind.max_length(),
        }
        .into());
    }
    Ok(length as u32)
}

/// Byte ranges of one item inside a payload
struct ItemLayout {
    format_header: StructureHeader,
    format: std::ops::Range<usize>,
    data_header: StructureHeader,
    data: std::ops::Range<usize>,
    end: usize,
}

fn checked_range(raw: &[u8], start: usize, words: u32) -> Result<std::ops::Range<usize>> {
    let end = start + 4 * words as usize;
    if end > raw.len() {
        return Err(Error::Truncated {
            needed: end - start,
            available: raw.len() - start,
        });
    }
    Ok(start..end)
}

fn item_layout(raw: &[u8], start: usize, order: ByteOrder) -> Result<ItemLayout> {
    let format_header =
        StructureHeader::read_from(&raw[start..], StructureType::TagSegment, order)?;
    let format = checked_range(raw, start + 4, format_header.length())?;

    let data_header = StructureHeader::read_from(&raw[format.end..], StructureType::Bank, order)?;
    let words = checked_range(raw, format.end + 8, data_header.data_length())?;
    let data = words.start..words.end.saturating_sub(data_header.padding() as usize).max(words.start);

    Ok(ItemLayout {
        format_header,
        format,
        data_header,
        end: words.end,
        data,
    })
}

fn item_format(raw: &[u8], layout: &ItemLayout) -> Result<CompositeFormat> {
    let decoded = raw_bytes_to_strings(&raw[layout.format.clone()], false);
    match decoded.strings.first() {
        Some(format) if !decoded.bad_format => CompositeFormat::compile(format),
        _ => Err(Error::MalformedComposite("unreadable format string".into())),
    }
}

/// Decode every item of a COMPOSITE payload written in `order`
#[instrument(skip(raw), fields(len = raw.len()))]
pub fn parse_composite(raw: &[u8], order: ByteOrder) -> Result<Vec<CompositeData>> {
    let mut items = Vec::new();
    let mut start = 0;
    while start < raw.len() {
        let layout = item_layout(raw, start, order)?;
        let format = item_format(raw, &layout)?;
        let values = CompositeData::decode_values(&format, &raw[layout.data.clone()], order)?;
        trace!(format = format.as_str(), values = values.len(), "composite item");

        items.push(CompositeData {
            format_tag: layout.format_header.tag(),
            format,
            data_tag: layout.data_header.tag(),
            data_num: layout.data_header.number(),
            values,
        });
        start = layout.end;
    }
    Ok(items)
}

/// Encode `items` into a COMPOSITE payload in `order`
pub fn encode_composite(items: &[CompositeData], order: ByteOrder) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for item in items {
        item.write_to(&mut out, order)?;
    }
    Ok(out)
}

/// Count the items of a COMPOSITE payload without decoding their values
pub fn composite_item_count(raw: &[u8], order: ByteOrder) -> Result<usize> {
    let mut count = 0;
    let mut start = 0;
    while start < raw.len() {
        start = item_layout(raw, start, order)?.end;
        count += 1;
    }
    Ok(count)
}

/// Rewrite a COMPOSITE payload written in `from` into the opposite byte order
///
/// Format strings and padding are copied as they are; headers and values are
/// decoded in `from` and encoded again.
#[instrument(skip(raw), fields(len = raw.len()))]
pub fn swap_composite(raw: &[u8], from: ByteOrder) -> Result<Vec<u8>> {
    let to = from.opposite();
    let mut out = Vec::with_capacity(raw.len());
    let mut start = 0;
    while start < raw.len() {
        let layout = item_layout(raw, start, from)?;
        let format = item_format(raw, &layout)?;

        layout.format_header.write_to(&mut out, to)?;
        out.extend_from_slice(&raw[layout.format.clone()]);
        layout.data_header.write_to(&mut out, to)?;

        let values = CompositeData::decode_values(&format, &raw[layout.data.clone()], from)?;
        let mut encoder = Encoder {
            values: &values,
            next: 0,
            order: to,
            out,
        };
        drive(&format, &mut encoder)?;
        out = encoder.out;
        out.extend_from_slice(&raw[layout.data.end..layout.end]);

        start = layout.end;
    }
    debug!(len = out.len(), "swapped composite payload");
    Ok(out)
}
