//! Conversion of a structure into another kind.
//!
//! Converting keeps the tag, the data type, the payload and the children,
//! which move over to the new structure. A bank's number is lost when it
//! becomes a segment or tag segment, and must be supplied when a segment or
//! tag segment becomes a bank.
//!
//! Narrower headers are checked before anything changes: a tag or length
//! that does not fit, a type a tag segment cannot hold, or padding a tag
//! segment cannot record all fail and leave the tree as it was.

use tracing::{debug, instrument};

use crate::error::{OverflowError, Result};
use crate::header::{StructureHeader, StructureType};
use crate::structure::StructureTree;
use crate::tree::NodeId;

/// Turn `id` into a bank numbered `number`, returning the new structure's id
pub fn to_bank(tree: &mut StructureTree, id: NodeId, number: u8) -> Result<NodeId> {
    transform(tree, id, StructureType::Bank, number)
}

/// Turn `id` into a segment, returning the new structure's id
pub fn to_segment(tree: &mut StructureTree, id: NodeId) -> Result<NodeId> {
    transform(tree, id, StructureType::Segment, 0)
}

/// Turn `id` into a tag segment, returning the new structure's id
pub fn to_tag_segment(tree: &mut StructureTree, id: NodeId) -> Result<NodeId> {
    transform(tree, id, StructureType::TagSegment, 0)
}

#[instrument(skip(tree), err)]
fn transform(tree: &mut StructureTree, id: NodeId, kind: StructureType, number: u8) -> Result<NodeId> {
    tree.set_all_header_lengths(id)?;
    let parent = tree.parent(id)?;
    if let Some(parent) = parent {
        tree.check_child(parent, kind)?;
    }

    let source = *tree.structure(id)?.header();
    let mut header = StructureHeader::new(kind, source.tag(), source.data_type(), number)?;
    header.set_padding(source.padding())?;

    // the source's own length word must also fit the narrower field
    let length = source.data_length() as u64 + kind.header_length() as u64 - 1;
    let checked = length.max(source.length() as u64);
    if checked > kind.max_length() {
        return Err(OverflowError::Length {
            length: checked,
            kind,
            max: kind.max_length(),
        }
        .into());
    }
    header.set_length(length as u32);

    let inner = tree.tree_mut();
    let mut structure = std::mem::take(inner.get_mut(id)?);
    structure.header = header;
    structure.lengths_up_to_date = true;
    let converted = inner.insert(structure);
    inner.move_children(id, converted)?;
    inner.replace(id, converted)?;
    inner.remove(id)?;

    if let Some(parent) = parent {
        tree.invalidate(parent)?;
    }
    debug!(from = %source.kind(), to = %kind, %converted, "converted structure");
    Ok(converted)
}
