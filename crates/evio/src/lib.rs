//! This library builds, reads and writes **EVIO** event structures used in nuclear physics data acquisition.
//!
//! # EVIO Structure Format Documentation
//!
//! An EVIO event is a tree of self describing structures. Every structure starts with a header
//! giving its length, a tag, a content type and, for banks, a number. A structure either holds
//! primitive data of a single type or a list of child structures of a single kind.
//!
//! There are three kinds of structure, which differ only in their headers:
//!
//! | Kind        | Header words | Tag bits | Number | Padding | Type bits | Length bits |
//! |-------------|--------------|----------|--------|---------|-----------|-------------|
//! | Bank        | 2            | 16       | 8      | 2       | 6         | 32          |
//! | Segment     | 1            | 8        | none   | 2       | 6         | 16          |
//! | Tag segment | 1            | 12       | none   | none    | 4         | 16          |
//!
//! ## Headers
//!
//! Words are shown as they sit in memory for each byte order.
//!
//! | Kind        | Word | Big endian                         | Little endian                      |
//! |-------------|------|------------------------------------|------------------------------------|
//! | Bank        | 0    | length:32                          | length:32                          |
//! | Bank        | 1    | tag:16, pad:2+type:6, num:8        | num:8, pad:2+type:6, tag:16        |
//! | Segment     | 0    | tag:8, pad:2+type:6, length:16     | length:16, pad:2+type:6, tag:8     |
//! | Tag segment | 0    | tag:12+type:4, length:16           | length:16, tag:12+type:4           |
//!
//! - **Length**: the number of 32-bit words following the length word. For a bank this includes
//!   its second header word, for segments and tag segments it is just the payload.
//! - **Padding**: the number of unused bytes (0 to 3) at the end of a payload of 8 or 16-bit
//!   values, so that every payload fills a whole number of words.
//! - **Type**: one of the codes of [`DataType`]. Tag segments only have room for codes below
//!   `0x10`, so banks and segments of banks or segments are written with the codes `0xe` and `0xd`.
//!
//! ## Content types
//!
//! | Code | Content       | Code | Content       | Code | Content             |
//! |------|---------------|------|---------------|------|---------------------|
//! | 0x0  | unknown words | 0x8  | f64           | 0x10 | banks               |
//! | 0x1  | u32           | 0x9  | i64           | 0x20 | segments            |
//! | 0x2  | f32           | 0xa  | u64           | 0x21 | A (composite)       |
//! | 0x3  | strings       | 0xb  | i32           | 0x22 | N (composite)       |
//! | 0x4  | i16           | 0xc  | tag segments  | 0x23 | n (composite)       |
//! | 0x5  | u16           | 0xd  | segments      | 0x24 | m (composite)       |
//! | 0x6  | i8            | 0xe  | banks         |      |                     |
//! | 0x7  | u8            | 0xf  | composite     |      |                     |
//!
//! ## Strings
//!
//! A string payload holds NUL terminated strings followed by one to four `0x04` bytes, see
//! [`strings`] for details.
//!
//! ## Composite data
//!
//! A composite payload holds items that pair a format string with values laid out by that
//! format, see [`composite`] for the format language.
//!
//! ## Additional Information
//!
//! - **Word size**: 4 bytes, every structure is a whole number of words long
//! - **Endianness**: either, chosen by the writer, with each value swapped according to its width
//! - **Lengths**: only recomputed by [`StructureTree::set_all_header_lengths`], and writing a
//!   structure whose lengths are stale fails
//!

pub mod builder;
pub mod composite;
pub mod data_type;
pub mod error;
pub mod header;
pub mod order;
pub mod primitive;
pub mod read;
pub mod strings;
pub mod structure;
pub mod transform;
pub mod tree;
pub mod write;

pub use builder::EventBuilder;
pub use composite::{CompositeData, CompositeFormat, CompositeValue};
pub use data_type::DataType;
pub use error::{Error, Result};
pub use header::{StructureHeader, StructureType};
pub use order::ByteOrder;
pub use read::{parse, parse_event, ParseOptions};
pub use structure::{Payload, Structure, StructureTree};
pub use transform::{to_bank, to_segment, to_tag_segment};
pub use tree::NodeId;
