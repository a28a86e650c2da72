//! Top down construction of events.
//!
//! ```
//! use evio::{ByteOrder, DataType, EventBuilder};
//!
//! let mut builder = EventBuilder::new(1, DataType::Bank, 1);
//! builder.open_bank(2, DataType::Int32, 2)?;
//! builder.set_data(&[1i32, 2, 3])?;
//! builder.close()?;
//!
//! let (tree, event) = builder.finish()?;
//! assert_eq!(tree.write(event, ByteOrder::Big)?.len(), 28);
//! # Ok::<(), evio::Error>(())
//! ```

use tracing::{debug, instrument};

use crate::composite::CompositeData;
use crate::data_type::DataType;
use crate::error::Result;
use crate::order::ByteOrder;
use crate::primitive::Primitive;
use crate::structure::{Structure, StructureMut, StructureTree};
use crate::tree::NodeId;

/// Builds an event bank one structure at a time
///
/// Opening a structure adds it below the current one and makes it current.
/// Data is always set on the current structure.
#[derive(Debug)]
pub struct EventBuilder {
    tree: StructureTree,
    root: NodeId,
    current: NodeId,
    order: ByteOrder,
}

impl EventBuilder {
    /// Start an event with a bank of `data_type`
    pub fn new(tag: u16, data_type: DataType, number: u8) -> Self {
        let mut tree = StructureTree::new();
        let root = tree.insert(Structure::bank(tag, data_type, number));
        EventBuilder {
            tree,
            root,
            current: root,
            order: ByteOrder::Big,
        }
    }

    /// Encode payloads of structures added from now on in `order`
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        if let Ok(mut root) = self.tree.structure_mut(self.root) {
            if root.raw_bytes().is_empty() {
                root.order = order;
            }
        }
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    /// The tree built so far
    pub fn tree(&self) -> &StructureTree {
        &self.tree
    }

    /// Add `structure` below the current structure and make it current
    pub fn add(&mut self, structure: Structure) -> Result<NodeId> {
        let child = self
            .tree
            .add_child(self.current, structure.with_byte_order(self.order))?;
        self.current = child;
        Ok(child)
    }

    pub fn open_bank(&mut self, tag: u16, data_type: DataType, number: u8) -> Result<NodeId> {
        self.add(Structure::bank(tag, data_type, number))
    }

    pub fn open_segment(&mut self, tag: u8, data_type: DataType) -> Result<NodeId> {
        self.add(Structure::segment(tag, data_type))
    }

    pub fn open_tag_segment(&mut self, tag: u16, data_type: DataType) -> Result<NodeId> {
        self.add(Structure::tag_segment(tag, data_type)?)
    }

    /// Make the parent of the current structure current, staying put at the event bank
    pub fn close(&mut self) -> Result<NodeId> {
        if let Some(parent) = self.tree.parent(self.current)? {
            self.current = parent;
        }
        Ok(self.current)
    }

    pub fn current_mut(&mut self) -> Result<StructureMut<'_>> {
        self.tree.structure_mut(self.current)
    }

    pub fn set_data<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        self.current_mut()?.set_data(values)
    }

    pub fn append_data<T: Primitive>(&mut self, values: &[T]) -> Result<()> {
        self.current_mut()?.append_data(values)
    }

    pub fn set_string_data<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        self.current_mut()?.set_string_data(strings)
    }

    pub fn append_string_data<S: AsRef<str>>(&mut self, strings: &[S]) -> Result<()> {
        self.current_mut()?.append_string_data(strings)
    }

    pub fn set_composite_data(&mut self, items: Vec<CompositeData>) -> Result<()> {
        self.current_mut()?.set_composite_data(items)
    }

    /// Recompute every length and hand over the tree and the event bank
    #[instrument(skip(self), fields(structures = self.tree.len()), err)]
    pub fn finish(mut self) -> Result<(StructureTree, NodeId)> {
        let length = self.tree.set_all_header_lengths(self.root)?;
        debug!(length, "finished event");
        Ok((self.tree, self.root))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::{assert_eq, assert_str_eq};
    use tracing_test::traced_test;

    use super::*;
    use crate::error::Error;
    use crate::header::StructureType;

    #[traced_test]
    #[test]
    fn single_child_event() -> Result<()> {
        let mut builder = EventBuilder::new(1, DataType::Bank, 1);
        let child = builder.open_bank(2, DataType::Int32, 2)?;
        builder.set_data(&[1i32, 2, 3])?;
        assert_eq!(builder.current(), child);
        assert_eq!(builder.close()?, builder.root());

        let (tree, event) = builder.finish()?;
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0x00, 0x00, 0x06,
            0x00, 0x01, 0x10, 0x01,
            0x00, 0x00, 0x00, 0x04,
            0x00, 0x02, 0x0B, 0x02,
            0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x00, 0x03,
        ];
        let result = tree.write(event, ByteOrder::Big)?;
        assert_str_eq!(format!("{:02X?}", result), format!("{:02X?}", expected));
        Ok(())
    }

    #[test]
    fn mismatched_children_are_refused() -> Result<()> {
        let mut builder = EventBuilder::new(1, DataType::Bank, 1);
        assert!(matches!(
            builder.open_segment(1, DataType::Int32),
            Err(Error::StructuralMismatch {
                parent: DataType::Bank,
                child: StructureType::Segment
            })
        ));
        assert_eq!(builder.current(), builder.root());
        assert_eq!(builder.tree().len(), 1);

        builder.open_bank(2, DataType::Float32, 0)?;
        assert!(matches!(
            builder.open_bank(3, DataType::Int32, 0),
            Err(Error::StructuralMismatch {
                parent: DataType::Float32,
                ..
            })
        ));
        assert_eq!(builder.tree().len(), 2);
        Ok(())
    }

    #[test]
    fn close_stops_at_the_event() -> Result<()> {
        let mut builder = EventBuilder::new(1, DataType::Segment, 0);
        builder.open_segment(2, DataType::TagSegment)?;
        builder.open_tag_segment(3, DataType::CharStar8)?;
        builder.set_string_data(&["run", "7"])?;

        builder.close()?;
        builder.close()?;
        assert_eq!(builder.close()?, builder.root());

        builder.open_segment(4, DataType::Char8)?;
        builder.append_data(&[-1i8, 2])?;
        let (tree, event) = builder.finish()?;

        assert_eq!(tree.children(event)?.len(), 2);
        // 1 + (1 + 1 + 2) + (1 + 1)
        assert_eq!(tree.structure(event)?.header().length(), 7);
        Ok(())
    }

    #[test]
    fn little_endian_event() -> Result<()> {
        let mut builder = EventBuilder::new(5, DataType::Bank, 0).byte_order(ByteOrder::Little);
        builder.open_bank(6, DataType::UShort16, 1)?;
        builder.set_data(&[0x0102u16])?;
        let leaf = builder.current();
        let (tree, event) = builder.finish()?;

        assert_eq!(tree.structure(leaf)?.byte_order(), ByteOrder::Little);
        assert_eq!(tree.structure(leaf)?.raw_bytes(), &[0x02, 0x01, 0x00, 0x00]);

        let big = tree.write(event, ByteOrder::Big)?;
        assert_eq!(big[16..], [0x01, 0x02, 0x00, 0x00]);
        Ok(())
    }
}
