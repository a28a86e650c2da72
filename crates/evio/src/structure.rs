//! Structures, their payloads and the tree that owns them.
//!
//! A [`Structure`] is either a leaf holding a payload of a single data type
//! or a container whose payload is a list of child structures. Children live
//! in a [`StructureTree`] and are addressed by [`NodeId`].
//!
//! The encoded bytes of a leaf are a cache of its typed values. Typed values
//! are decoded from the bytes on first access and the bytes are re-encoded
//! whenever the values change, so the two never disagree by the time a
//! structure is written.
//!
//! Header lengths are only recomputed by [`StructureTree::set_all_header_lengths`].
//! Every change to a structure marks it and all of its ancestors as stale, and
//! writing a stale subtree fails with [`Error::StaleLengths`].

use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::{debug, instrument, trace};

use crate::composite::{composite_item_count, encode_composite, parse_composite, CompositeData};
use crate::data_type::DataType;
use crate::error::{Error, OverflowError, Result};
use crate::header::{StructureHeader, StructureType};
use crate::order::ByteOrder;
use crate::primitive::{decode_all, encode_all, padding_for, Primitive};
use crate::strings::{byte_payload_words, raw_bytes_to_strings, strings_to_raw_bytes};
use crate::tree::{Ancestors, Descendants, NodeId, Tree};
use crate::write::swap_payload;

/// Decoded form of a leaf's payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Nothing decoded yet, the raw bytes are the only form
    #[default]
    Raw,
    Int(Vec<i32>),
    UInt(Vec<u32>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Long(Vec<i64>),
    ULong(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Char(Vec<i8>),
    UChar(Vec<u8>),
    Strings(Vec<String>),
    Composite(Vec<CompositeData>),
}

impl Payload {
    /// Number of decoded items, `None` when nothing is decoded
    pub fn len(&self) -> Option<usize> {
        Some(match self {
            Payload::Raw => return None,
            Payload::Int(v) => v.len(),
            Payload::UInt(v) => v.len(),
            Payload::Short(v) => v.len(),
            Payload::UShort(v) => v.len(),
            Payload::Long(v) => v.len(),
            Payload::ULong(v) => v.len(),
            Payload::Float(v) => v.len(),
            Payload::Double(v) => v.len(),
            Payload::Char(v) => v.len(),
            Payload::UChar(v) => v.len(),
            Payload::Strings(v) => v.len(),
            Payload::Composite(v) => v.len(),
        })
    }

    /// Width in bytes of one numeric item
    fn item_width(&self) -> Option<usize> {
        match self {
            Payload::Char(_) | Payload::UChar(_) => Some(1),
            Payload::Short(_) | Payload::UShort(_) => Some(2),
            Payload::Int(_) | Payload::UInt(_) | Payload::Float(_) => Some(4),
            Payload::Long(_) | Payload::ULong(_) | Payload::Double(_) => Some(8),
            Payload::Raw | Payload::Strings(_) | Payload::Composite(_) => None,
        }
    }

    fn encode(&self, order: ByteOrder) -> Result<Option<(Vec<u8>, u8)>> {
        fn numeric<T: Primitive>(values: &[T], order: ByteOrder) -> Result<Option<(Vec<u8>, u8)>> {
            Ok(Some((encode_all(values, order)?, padding_for(values.len(), T::SIZE))))
        }

        match self {
            Payload::Raw => Ok(None),
            Payload::Int(v) => numeric(v, order),
            Payload::UInt(v) => numeric(v, order),
            Payload::Short(v) => numeric(v, order),
            Payload::UShort(v) => numeric(v, order),
            Payload::Long(v) => numeric(v, order),
            Payload::ULong(v) => numeric(v, order),
            Payload::Float(v) => numeric(v, order),
            Payload::Double(v) => numeric(v, order),
            Payload::Char(v) => numeric(v, order),
            Payload::UChar(v) => numeric(v, order),
            Payload::Strings(v) => Ok(Some((strings_to_raw_bytes(v), 0))),
            Payload::Composite(v) => Ok(Some((encode_composite(v, order)?, 0))),
        }
    }
}

/// Number of words `items` values of `width` bytes occupy
const fn words_for(items: usize, width: usize) -> u64 {
    ((items as u64) * (width as u64)).div_ceil(4)
}

/// A bank, segment or tag segment
#[derive(Debug, Clone)]
pub struct Structure {
    pub(crate) header: StructureHeader,
    pub(crate) order: ByteOrder,
    pub(crate) raw: Vec<u8>,
    pub(crate) payload: Payload,
    raw_dirty: bool,
    pub(crate) lengths_up_to_date: bool,
    bad_string_format: bool,
    string_end: usize,
}

impl Default for Structure {
    fn default() -> Self {
        Structure::new(StructureHeader::bank(0, DataType::Unknown32, 0))
    }
}

impl Structure {
    /// Create an empty structure, big endian
    pub fn new(header: StructureHeader) -> Self {
        Structure {
            header,
            order: ByteOrder::Big,
            raw: Vec::new(),
            payload: Payload::Raw,
            raw_dirty: false,
            lengths_up_to_date: false,
            bad_string_format: false,
            string_end: 0,
        }
    }

    /// Create an empty bank
    pub fn bank(tag: u16, data_type: DataType, number: u8) -> Self {
        Structure::new(StructureHeader::bank(tag, data_type, number))
    }

    /// Create an empty segment
    pub fn segment(tag: u8, data_type: DataType) -> Self {
        Structure::new(StructureHeader::segment(tag, data_type))
    }

    /// Create an empty tag segment
    pub fn tag_segment(tag: u16, data_type: DataType) -> Result<Self> {
        Ok(Structure::new(StructureHeader::tag_segment(tag, data_type)?))
    }

    /// Structure read from a buffer, with its payload bytes in `order`
    pub(crate) fn from_raw(header: StructureHeader, order: ByteOrder, raw: Vec<u8>) -> Self {
        Structure {
            order,
            raw,
            lengths_up_to_date: true,
            ..Structure::new(header)
        }
    }

    /// Use `order` for the payload bytes of a structure that has none yet
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        if self.raw.is_empty() {
            self.order = order;
        }
        self
    }

    pub fn header(&self) -> &StructureHeader {
        &self.header
    }

    pub fn structure_type(&self) -> StructureType {
        self.header.kind()
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type()
    }

    pub fn tag(&self) -> u16 {
        self.header.tag()
    }

    pub fn number(&self) -> u8 {
        self.header.number()
    }

    pub fn padding(&self) -> u8 {
        self.header.padding()
    }

    /// Byte order of the payload bytes
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// The encoded payload, as of the last re-encoding
    ///
    /// Values changed through [`Structure::data_mut`] are only reflected after
    /// [`Structure::update_data`] or a length recomputation.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The decoded payload, [`Payload::Raw`] until some typed access happened
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Whether the header length matches the content
    pub fn lengths_up_to_date(&self) -> bool {
        self.lengths_up_to_date
    }

    /// Whether the string payload was unreadable and is kept as one string
    pub fn bad_string_format(&self) -> bool {
        self.bad_string_format
    }

    /// Offset of the last NUL in the string payload
    pub fn string_end(&self) -> usize {
        self.string_end
    }

    pub fn is_container(&self) -> bool {
        self.data_type().is_structure()
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_container()
    }

    pub fn set_tag(&mut self, tag: u16) -> Result<()> {
        self.header.set_tag(tag)
    }

    pub fn set_number(&mut self, number: u8) {
        self.header.set_number(number)
    }

    fn invalidate(&mut self) {
        self.raw_dirty = true;
        self.lengths_up_to_date = false;
    }

    fn check_leaf(&self) -> Result<()> {
        if self.is_container() {
            return Err(Error::NotALeaf(self.data_type()));
        }
        Ok(())
    }

    fn expect_type(&self, requested: DataType) -> Result<()> {
        if !self.data_type().is_compatible(requested) {
            return Err(Error::WrongDataType {
                requested,
                actual: self.data_type(),
            });
        }
        Ok(())
    }

    fn holds_no_data(&self) -> bool {
        match self.payload.len() {
            Some(len) => len == 0,
            None => self.raw.is_empty(),
        }
    }

    /// Fail unless `items` values of `width` bytes fit in this kind of structure
    fn check_capacity(&self, items: usize, width: usize) -> Result<()> {
        let words = words_for(items, width);
        let max = self.structure_type().max_data_words();
        if words > max || items > i32::MAX as usize {
            return Err(OverflowError::DataItems { items, words, max }.into());
        }
        Ok(())
    }

    /// Replace the payload, updating the header only once everything checked out
    fn commit(&mut self, data_type: DataType, padding: u8, raw: Vec<u8>, payload: Payload) -> Result<()> {
        let mut header = self.header;
        header.set_data_type(data_type)?;
        header.set_padding(padding)?;

        self.header = header;
        self.raw = raw;
        self.payload = payload;
        self.raw_dirty = false;
        self.lengths_up_to_date = false;
        Ok(())
    }

    /// Re-encode the payload bytes from the typed values if they changed
    pub fn update_data(&mut self) -> Result<()> {
        if !self.raw_dirty {
            return Ok(());
        }
        if let Some((raw, padding)) = self.payload.encode(self.order)? {
            self.check_capacity(raw.len(), 1)?;
            let mut header = self.header;
            header.set_padding(padding)?;
            self.header = header;
            self.raw = raw;
        }
        self.raw_dirty = false;
        Ok(())
    }

    fn materialize<T: Primitive>(&mut self) -> Result<()> {
        if T::payload_ref(&self.payload).is_some() {
            return Ok(());
        }
        self.update_data()?;
        let values = decode_all::<T>(&self.raw, self.padding(), self.order)?;
        trace!(data_type = %T::DATA_TYPE, count = values.len(), "decoded payload");
        self.payload = T::into_payload(values);
        Ok(())
    }

    /// The payload as `T` values
    ///
    /// `T` must be the declared data type or its signed/unsigned counterpart.
    pub fn data<T: Primitive>(&mut self) -> Result<&[T]> {
        self.expect_type(T::DATA_TYPE)?;
        self.materialize::<T>()?;
        Ok(T::payload_ref(&self.payload)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Mutable access to the payload as `T` values
    ///
    /// The structure is marked stale and its bytes are re-encoded before the
    /// next length recomputation.
    pub fn data_mut<T: Primitive>(&mut self) -> Result<&mut Vec<T>> {
        self.expect_type(T::DATA_TYPE)?;
        self.materialize::<T>()?;
        self.invalidate();
        let actual = self.data_type();
        T::payload_mut(&mut self.payload).ok_or(Error::WrongDataType {
            requested: T::DATA_TYPE,
            actual,
        })
    }

    /// Replace the payload with `values`
    ///
    /// The data type becomes `T` unless it already is `T` or its
    /// signed/unsigned counterpart.
    pub fn set_data<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        self.check_leaf()?;
        self.check_capacity(values.len(), T::SIZE)?;

        let data_type = if self.data_type().is_compatible(T::DATA_TYPE) {
            self.data_type()
        } else {
            T::DATA_TYPE
        };
        let raw = encode_all(values, self.order)?;
        self.commit(
            data_type,
            padding_for(values.len(), T::SIZE),
            raw,
            T::into_payload(values.to_vec()),
        )
    }

    /// Add `values` after the existing payload
    pub fn append_data<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        self.check_leaf()?;
        self.expect_type(T::DATA_TYPE)?;
        if self.holds_no_data() {
            return self.set_data(values);
        }

        self.materialize::<T>()?;
        let existing = T::payload_ref(&self.payload).map_or(0, Vec::len);
        self.check_capacity(existing + values.len(), T::SIZE)?;

        let mut combined = T::payload_ref(&self.payload).cloned().unwrap_or_default();
        combined.extend_from_slice(values);
        let raw = encode_all(&combined, self.order)?;
        let padding = padding_for(combined.len(), T::SIZE);
        self.commit(self.data_type(), padding, raw, T::into_payload(combined))
    }

    /// The payload as strings
    pub fn string_data(&mut self) -> Result<&[String]> {
        self.expect_type(DataType::CharStar8)?;
        if !matches!(self.payload, Payload::Strings(_)) {
            let decoded = raw_bytes_to_strings(&self.raw, false);
            self.bad_string_format = decoded.bad_format;
            self.string_end = decoded.string_end;
            self.payload = Payload::Strings(decoded.strings);
        }
        match &self.payload {
            Payload::Strings(strings) => Ok(strings.as_slice()),
            _ => Ok(&[]),
        }
    }

    /// Replace the payload with `strings`, making the structure CHARSTAR8
    pub fn set_string_data<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        self.check_leaf()?;
        let strings: Vec<String> = strings.iter().map(|s| s.as_ref().to_owned()).collect();
        self.commit_strings(strings)
    }

    /// Add `strings` after the existing strings
    ///
    /// Fails with [`Error::BadStringFormat`] when the existing payload could
    /// not be read as strings.
    pub fn append_string_data<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        self.check_leaf()?;
        self.expect_type(DataType::CharStar8)?;
        if self.holds_no_data() {
            return self.set_string_data(strings);
        }

        let mut combined = self.string_data()?.to_vec();
        if self.bad_string_format {
            return Err(Error::BadStringFormat);
        }
        combined.extend(strings.iter().map(|s| s.as_ref().to_owned()));
        self.commit_strings(combined)
    }

    fn commit_strings(&mut self, strings: Vec<String>) -> Result<()> {
        let raw = strings_to_raw_bytes(&strings);
        self.check_capacity(raw.len(), 1)?;
        let string_end = strings.iter().map(|s| s.len() + 1).sum::<usize>().saturating_sub(1);
        self.commit(DataType::CharStar8, 0, raw, Payload::Strings(strings))?;
        self.bad_string_format = false;
        self.string_end = string_end;
        Ok(())
    }

    /// The payload as composite items
    pub fn composite_data(&mut self) -> Result<&[CompositeData]> {
        self.expect_type(DataType::Composite)?;
        if !matches!(self.payload, Payload::Composite(_)) {
            let items = parse_composite(&self.raw, self.order)?;
            self.payload = Payload::Composite(items);
        }
        match &self.payload {
            Payload::Composite(items) => Ok(items.as_slice()),
            _ => Ok(&[]),
        }
    }

    /// Replace the payload with composite `items`, making the structure COMPOSITE
    pub fn set_composite_data(&mut self, items: Vec<CompositeData>) -> Result<()> {
        self.check_leaf()?;
        let raw = encode_composite(&items, self.order)?;
        self.check_capacity(raw.len(), 1)?;
        self.commit(DataType::Composite, 0, raw, Payload::Composite(items))
    }

    /// Add composite `items` after the existing ones
    pub fn append_composite_data(&mut self, items: Vec<CompositeData>) -> Result<()> {
        self.check_leaf()?;
        if self.holds_no_data() {
            return self.set_composite_data(items);
        }
        let mut combined = self.composite_data()?.to_vec();
        combined.extend(items);
        self.set_composite_data(combined)
    }

    /// Number of items in a leaf's payload
    ///
    /// Strings and composite items count one each. For a container this is
    /// the number of payload words.
    pub fn number_data_items(&self) -> usize {
        if self.is_container() {
            return self.header.data_length() as usize;
        }
        if let Some(len) = self.payload.len() {
            return len;
        }
        match self.data_type() {
            DataType::CharStar8 => raw_bytes_to_strings(&self.raw, false).strings.len(),
            DataType::Composite => composite_item_count(&self.raw, self.order).unwrap_or(0),
            other => self.raw.len().saturating_sub(self.padding() as usize) / other.bytes(),
        }
    }

    /// Number of payload words of a leaf
    pub fn data_length(&self) -> u64 {
        match (self.payload.len(), self.payload.item_width()) {
            (Some(items), Some(width)) => words_for(items, width),
            _ => byte_payload_words(self.raw.len()) as u64,
        }
    }

    /// Re-encode the payload bytes in `to`
    pub(crate) fn convert_byte_order(&mut self, to: ByteOrder) -> Result<()> {
        if self.order == to {
            return Ok(());
        }
        self.update_data()?;
        if !self.raw.is_empty() {
            self.raw = swap_payload(&self.raw, self.data_type(), self.order)?;
        }
        self.order = to;
        Ok(())
    }
}

macro_rules! typed_accessors {
    ($($ty:ty => $get:ident, $set:ident, $append:ident;)*) => {
        impl Structure {
            $(
                #[doc = concat!("The payload as `", stringify!($ty), "` values")]
                pub fn $get(&mut self) -> Result<&[$ty]> {
                    self.data::<$ty>()
                }

                #[doc = concat!("Replace the payload with `", stringify!($ty), "` values")]
                pub fn $set(&mut self, values: &[$ty]) -> Result<()> {
                    self.set_data(values)
                }

                #[doc = concat!("Add `", stringify!($ty), "` values after the existing payload")]
                pub fn $append(&mut self, values: &[$ty]) -> Result<()> {
                    self.append_data(values)
                }
            )*
        }
    };
}

typed_accessors! {
    i32 => int_data, set_int_data, append_int_data;
    u32 => uint_data, set_uint_data, append_uint_data;
    i16 => short_data, set_short_data, append_short_data;
    u16 => ushort_data, set_ushort_data, append_ushort_data;
    i64 => long_data, set_long_data, append_long_data;
    u64 => ulong_data, set_ulong_data, append_ulong_data;
    f32 => float_data, set_float_data, append_float_data;
    f64 => double_data, set_double_data, append_double_data;
    i8 => char_data, set_char_data, append_char_data;
    u8 => uchar_data, set_uchar_data, append_uchar_data;
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.header, self.order)?;
        if self.is_leaf() {
            write!(f, ", {} items", self.number_data_items())?;
        }
        Ok(())
    }
}

/// Mutable access to one structure of a [`StructureTree`]
///
/// When dropped after a change that made the structure stale, every
/// ancestor is marked stale too.
pub struct StructureMut<'a> {
    tree: &'a mut Tree<Structure>,
    id: NodeId,
    structure: Structure,
}

impl Deref for StructureMut<'_> {
    type Target = Structure;

    fn deref(&self) -> &Structure {
        &self.structure
    }
}

impl DerefMut for StructureMut<'_> {
    fn deref_mut(&mut self) -> &mut Structure {
        &mut self.structure
    }
}

impl Drop for StructureMut<'_> {
    fn drop(&mut self) {
        let structure = std::mem::take(&mut self.structure);
        let stale = !structure.lengths_up_to_date;
        if let Ok(slot) = self.tree.get_mut(self.id) {
            *slot = structure;
        }
        if stale {
            invalidate_ancestors(self.tree, self.id);
        }
    }
}

fn invalidate_ancestors(tree: &mut Tree<Structure>, id: NodeId) {
    let ancestors: Vec<NodeId> = tree.ancestors(id).collect();
    for ancestor in ancestors {
        if let Ok(structure) = tree.get_mut(ancestor) {
            structure.lengths_up_to_date = false;
        }
    }
}

fn checked_length(length: u64, kind: StructureType) -> Result<u32> {
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

/// Owner of a forest of structures
#[derive(Debug, Clone, Default)]
pub struct StructureTree {
    tree: Tree<Structure>,
}

impl StructureTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a structure with no parent
    pub fn insert(&mut self, structure: Structure) -> NodeId {
        self.tree.insert(structure)
    }

    /// Number of structures held
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn structure(&self, id: NodeId) -> Result<&Structure> {
        self.tree.get(id)
    }

    /// Mutable access to a structure, see [`StructureMut`]
    pub fn structure_mut(&mut self, id: NodeId) -> Result<StructureMut<'_>> {
        let structure = std::mem::take(self.tree.get_mut(id)?);
        Ok(StructureMut {
            tree: &mut self.tree,
            id,
            structure,
        })
    }

    /// The underlying tree, for navigation
    pub fn tree(&self) -> &Tree<Structure> {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree<Structure> {
        &mut self.tree
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        self.tree.parent(id)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        self.tree.children(id)
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, Structure> {
        self.tree.ancestors(id)
    }

    pub fn descendants(&self, id: NodeId) -> Descendants<'_, Structure> {
        self.tree.descendants(id)
    }

    pub fn siblings(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.tree.siblings(id)
    }

    /// Fail unless `parent` is a container for children of `kind`
    pub(crate) fn check_child(&self, parent: NodeId, kind: StructureType) -> Result<()> {
        let parent_type = self.tree.get(parent)?.data_type();
        if StructureType::of_children(parent_type) != Some(kind) {
            return Err(Error::StructuralMismatch {
                parent: parent_type,
                child: kind,
            });
        }
        Ok(())
    }

    /// Mark `id` and all of its ancestors stale
    pub(crate) fn invalidate(&mut self, id: NodeId) -> Result<()> {
        self.tree.get_mut(id)?.lengths_up_to_date = false;
        invalidate_ancestors(&mut self.tree, id);
        Ok(())
    }

    /// Append `structure` to the children of `parent`
    pub fn add_child(&mut self, parent: NodeId, mut structure: Structure) -> Result<NodeId> {
        self.check_child(parent, structure.structure_type())?;
        structure.lengths_up_to_date = false;

        let child = self.tree.append(parent, structure)?;
        self.invalidate(child)?;
        debug!(%parent, %child, "added child");
        Ok(child)
    }

    /// Insert `structure` among the children of `parent` at `index`
    pub fn insert_child(&mut self, parent: NodeId, index: usize, mut structure: Structure) -> Result<NodeId> {
        self.check_child(parent, structure.structure_type())?;
        structure.lengths_up_to_date = false;

        let child = self.tree.insert(structure);
        self.tree.attach(parent, index, child)?;
        self.invalidate(child)?;
        debug!(%parent, %child, "added child");
        Ok(child)
    }

    /// Remove `id` and everything below it, returning the structure at `id`
    pub fn remove(&mut self, id: NodeId) -> Result<Structure> {
        if let Some(parent) = self.tree.parent(id)? {
            self.invalidate(parent)?;
        }
        debug!(%id, "removing subtree");
        self.tree.remove(id)
    }

    /// Recompute the length of `id` and everything below it, returning the length of `id`
    ///
    /// Subtrees whose lengths are up to date are not walked again.
    #[instrument(skip(self), err)]
    pub fn set_all_header_lengths(&mut self, id: NodeId) -> Result<u32> {
        self.compute_length(id)
    }

    fn compute_length(&mut self, id: NodeId) -> Result<u32> {
        let structure = self.tree.get(id)?;
        if structure.lengths_up_to_date {
            return Ok(structure.header.length());
        }

        let kind = structure.structure_type();
        let extra = kind.header_length() as u64 - 1;
        let length = if structure.is_container() {
            let children = self.tree.children(id)?.to_vec();
            let mut total = extra;
            for child in children {
                total += self.compute_length(child)? as u64 + 1;
                checked_length(total, kind)?;
            }
            checked_length(total, kind)?
        } else {
            let structure = self.tree.get_mut(id)?;
            structure.update_data()?;
            checked_length(structure.data_length() + extra, kind)?
        };

        let structure = self.tree.get_mut(id)?;
        structure.header.set_length(length);
        structure.lengths_up_to_date = true;
        trace!(%id, length, "set header length");
        Ok(length)
    }

    /// Size in bytes of `id` as its header describes it
    pub fn total_bytes(&self, id: NodeId) -> Result<usize> {
        Ok(self.tree.get(id)?.header.total_bytes())
    }

    pub fn number_data_items(&self, id: NodeId) -> Result<usize> {
        Ok(self.tree.get(id)?.number_data_items())
    }

    /// Structures at or below `id` for which `predicate` holds, in pre-order
    pub fn matching_structures<F>(&self, id: NodeId, mut predicate: F) -> Vec<NodeId>
    where
        F: FnMut(&Structure) -> bool,
    {
        self.tree
            .descendants(id)
            .filter(|&node| self.tree.get(node).is_ok_and(&mut predicate))
            .collect()
    }

    /// Convert the payload bytes of `id` and everything below it to `order`
    #[instrument(skip(self), err)]
    pub fn swap_byte_order(&mut self, id: NodeId, order: ByteOrder) -> Result<()> {
        let nodes: Vec<NodeId> = self.tree.descendants(id).collect();
        for node in nodes {
            self.tree.get_mut(node)?.convert_byte_order(order)?;
        }
        Ok(())
    }
}
