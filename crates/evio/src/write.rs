//! Serialization of structure trees
//!

use tracing::{debug, instrument};

use crate::composite::swap_composite;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::order::{swap_elements, ByteOrder};
use crate::structure::{Structure, StructureTree};
use crate::tree::NodeId;

/// Payload bytes of `data_type` written in `from`, rewritten in the other order
///
/// Strings and single byte values come back unchanged. Composite payloads are
/// decoded and encoded again since they mix element widths.
pub(crate) fn swap_payload(raw: &[u8], data_type: DataType, from: ByteOrder) -> Result<Vec<u8>> {
    match data_type {
        DataType::Composite => swap_composite(raw, from),
        DataType::CharStar8
        | DataType::Char8
        | DataType::UChar8
        | DataType::ByteNValue
        | DataType::Unknown32 => Ok(raw.to_vec()),
        other => {
            let mut swapped = raw.to_vec();
            swap_elements(&mut swapped, other.bytes());
            Ok(swapped)
        }
    }
}

fn write_payload(structure: &Structure, dest: &mut [u8], order: ByteOrder) -> Result<usize> {
    let required = 4 * structure.header.data_length() as usize;
    if dest.len() < required {
        return Err(Error::DestinationTooSmall {
            required,
            available: dest.len(),
        });
    }

    let dest = &mut dest[..required];
    let raw = &structure.raw;
    let copied = raw.len().min(required);
    if structure.order == order {
        dest[..copied].copy_from_slice(&raw[..copied]);
    } else {
        let swapped = swap_payload(raw, structure.data_type(), structure.order)?;
        dest[..copied].copy_from_slice(&swapped[..copied]);
    }
    dest[copied..].fill(0);
    Ok(required)
}

impl StructureTree {
    /// Encode `id` and everything below it in `order`
    ///
    /// Lengths must have been recomputed with
    /// [`StructureTree::set_all_header_lengths`] since the last change.
    #[instrument(skip(self), err)]
    pub fn write(&self, id: NodeId, order: ByteOrder) -> Result<Vec<u8>> {
        let mut out = vec![0; self.total_bytes(id)?];
        let written = self.write_into(id, &mut out, order)?;
        out.truncate(written);
        Ok(out)
    }

    /// Encode `id` and everything below it at the start of `dest`, returning the bytes written
    #[instrument(skip(self, dest), fields(available = dest.len()), err)]
    pub fn write_into(&self, id: NodeId, dest: &mut [u8], order: ByteOrder) -> Result<usize> {
        let structure = self.structure(id)?;
        if !structure.lengths_up_to_date() {
            return Err(Error::StaleLengths);
        }

        let required = structure.header().total_bytes();
        if dest.len() < required {
            return Err(Error::DestinationTooSmall {
                required,
                available: dest.len(),
            });
        }

        let written = self.write_node(id, &mut dest[..required], order)?;
        debug!(%id, written, %order, "wrote structure");
        Ok(written)
    }

    fn write_node(&self, id: NodeId, dest: &mut [u8], order: ByteOrder) -> Result<usize> {
        let structure = self.structure(id)?;
        let mut offset = structure.header().write_into(dest, order)?;

        if structure.is_container() {
            for &child in self.children(id)? {
                offset += self.write_node(child, &mut dest[offset..], order)?;
            }
        } else {
            offset += write_payload(structure, &mut dest[offset..], order)?;
        }
        Ok(offset)
    }
}
