//! Parsing of encoded structures into a [`StructureTree`]
//!

use bon::Builder;
use tracing::{debug, instrument, trace};

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::header::{StructureHeader, StructureType};
use crate::order::ByteOrder;
use crate::structure::{Structure, StructureTree};
use crate::tree::NodeId;

/// Options for how a buffer should be parsed
#[derive(Debug, Clone, Copy, Builder)]
pub struct ParseOptions {
    /// Byte order the buffer was written in
    #[builder(default)]
    pub byte_order: ByteOrder,

    /// Decode every leaf's typed values while parsing instead of on first access
    #[builder(default)]
    pub eager: bool,

    /// Deepest nesting accepted, the outermost structure being at depth 0
    #[builder(default = 64)]
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions::builder().build()
    }
}

/// Parse an event, a bank with everything below it, from the start of `bytes`
pub fn parse_event(bytes: &[u8], options: ParseOptions) -> Result<(StructureTree, NodeId)> {
    parse(bytes, StructureType::Bank, options)
}

/// Parse a structure of `kind` with everything below it from the start of `bytes`
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn parse(bytes: &[u8], kind: StructureType, options: ParseOptions) -> Result<(StructureTree, NodeId)> {
    let mut tree = StructureTree::new();
    let root = parse_into(&mut tree, bytes, kind, options)?;
    debug!(structures = tree.len(), "parsed structure tree");
    Ok((tree, root))
}

/// Parse a structure of `kind` from the start of `bytes` into `tree`, returning its id
pub fn parse_into(
    tree: &mut StructureTree,
    bytes: &[u8],
    kind: StructureType,
    options: ParseOptions,
) -> Result<NodeId> {
    let mut parser = Parser { tree, options };
    let (root, _) = parser.structure(bytes, kind, None, 0)?;
    Ok(root)
}

struct Parser<'a> {
    tree: &'a mut StructureTree,
    options: ParseOptions,
}

impl Parser<'_> {
    /// Parse one structure at the start of `bytes`, returning it and the bytes it used
    fn structure(
        &mut self,
        bytes: &[u8],
        kind: StructureType,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<(NodeId, usize)> {
        if depth > self.options.max_depth {
            return Err(Error::TooDeep(self.options.max_depth));
        }

        let order = self.options.byte_order;
        let header = StructureHeader::read_from(bytes, kind, order)?;
        let total = header.total_bytes();
        if total < kind.header_bytes() {
            return Err(Error::LengthTooShort {
                length: header.length(),
                kind,
            });
        }
        if total > bytes.len() {
            return Err(Error::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        trace!(%header, depth, "read header");

        let payload = &bytes[kind.header_bytes()..total];
        let data_type = header.data_type();
        let id = if data_type.is_structure() {
            let id = self.insert(Structure::from_raw(header, order, Vec::new()), parent)?;
            self.children(payload, data_type, id, depth)?;
            id
        } else {
            let mut structure = Structure::from_raw(header, order, payload.to_vec());
            if self.options.eager {
                unpack(&mut structure)?;
            }
            self.insert(structure, parent)?
        };
        Ok((id, total))
    }

    fn insert(&mut self, structure: Structure, parent: Option<NodeId>) -> Result<NodeId> {
        match parent {
            Some(parent) => self.tree.tree_mut().append(parent, structure),
            None => Ok(self.tree.insert(structure)),
        }
    }

    fn children(&mut self, payload: &[u8], data_type: DataType, parent: NodeId, depth: usize) -> Result<()> {
        let Some(kind) = StructureType::of_children(data_type) else {
            return Ok(());
        };

        let mut offset = 0;
        while offset < payload.len() {
            let (_, used) = self.structure(&payload[offset..], kind, Some(parent), depth + 1)?;
            offset += used;
        }
        Ok(())
    }
}

/// Decode the typed values of a leaf
fn unpack(structure: &mut Structure) -> Result<()> {
    match structure.data_type() {
        DataType::Int32 => structure.int_data().map(drop),
        DataType::UInt32 => structure.uint_data().map(drop),
        DataType::Short16 => structure.short_data().map(drop),
        DataType::UShort16 => structure.ushort_data().map(drop),
        DataType::Long64 => structure.long_data().map(drop),
        DataType::ULong64 => structure.ulong_data().map(drop),
        DataType::Float32 => structure.float_data().map(drop),
        DataType::Double64 => structure.double_data().map(drop),
        DataType::Char8 => structure.char_data().map(drop),
        DataType::UChar8 => structure.uchar_data().map(drop),
        DataType::CharStar8 => structure.string_data().map(drop),
        DataType::Composite => structure.composite_data().map(drop),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::structure::Payload;

    #[rustfmt::skip]
    const NESTED: [u8; 28] = [
        0x00, 0x00, 0x00, 0x06,
        0x00, 0x01, 0x10, 0x01,
        0x00, 0x00, 0x00, 0x04,
        0x00, 0x02, 0x0B, 0x02,
        0x00, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x02,
        0x00, 0x00, 0x00, 0x03,
    ];

    #[traced_test]
    #[test]
    fn parse_nested_bank() -> Result<()> {
        let (mut tree, root) = parse_event(&NESTED, ParseOptions::default())?;

        let bank = tree.structure(root)?;
        assert_eq!(bank.tag(), 1);
        assert_eq!(bank.number(), 1);
        assert_eq!(bank.data_type(), DataType::Bank);
        assert!(bank.lengths_up_to_date());

        let children = tree.children(root)?.to_vec();
        assert_eq!(children.len(), 1);
        let mut child = tree.structure_mut(children[0])?;
        assert_eq!(child.tag(), 2);
        assert_eq!(child.number(), 2);
        assert_eq!(child.payload(), &Payload::Raw);
        assert_eq!(child.int_data()?, &[1, 2, 3]);
        drop(child);

        assert!(tree.structure(root)?.lengths_up_to_date());
        assert_eq!(tree.write(root, ByteOrder::Big)?, NESTED.to_vec());
        Ok(())
    }

    #[test]
    fn eager_unpacking() -> Result<()> {
        let options = ParseOptions::builder().eager(true).build();
        let (tree, root) = parse_event(&NESTED, options)?;
        let child = tree.children(root)?[0];
        assert_eq!(tree.structure(child)?.payload(), &Payload::Int(vec![1, 2, 3]));
        Ok(())
    }

    #[test]
    fn truncated_child() {
        let mut bytes = NESTED;
        // child claims one more word than its parent holds
        bytes[11] = 0x05;
        let result = parse_event(&bytes, ParseOptions::default());
        assert!(matches!(
            result,
            Err(Error::Truncated {
                needed: 24,
                available: 20
            })
        ));

        let result = parse_event(&NESTED[..20], ParseOptions::default());
        assert!(matches!(result, Err(Error::Truncated { needed: 28, .. })));
    }

    #[test]
    fn length_shorter_than_the_header() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x00, 0x00, 0x00, // Length
            0x00, 0x01, 0x0B, 0x00, // Tag, INT32, Num
        ];
        let result = parse_event(&bytes, ParseOptions::default());
        assert!(matches!(
            result,
            Err(Error::LengthTooShort {
                length: 0,
                kind: StructureType::Bank
            })
        ));

        let mut nested = NESTED;
        nested[11] = 0x00;
        let result = parse_event(&nested, ParseOptions::default());
        assert!(matches!(result, Err(Error::LengthTooShort { length: 0, .. })));
    }

    #[test]
    fn depth_limit() {
        let options = ParseOptions::builder().max_depth(0).build();
        let result = parse_event(&NESTED, options);
        assert!(matches!(result, Err(Error::TooDeep(0))));
    }

    #[test]
    fn little_endian_segments() -> Result<()> {
        #[rustfmt::skip]
        let bytes = [
            0x03, 0x00, 0x20, 0x05, // Segment of segments, tag 5
            0x02, 0x00, 0x07, 0x06, // Segment of UCHAR8, tag 6
            0x61, 0x62, 0x63, 0x64,
            0x65, 0x66, 0x67, 0x68,
        ];
        let options = ParseOptions::builder().byte_order(ByteOrder::Little).build();
        let (mut tree, root) = parse(&bytes, StructureType::Segment, options)?;

        let child = tree.children(root)?[0];
        assert_eq!(tree.structure_mut(child)?.uchar_data()?, b"abcdefgh");
        assert_eq!(tree.write(root, ByteOrder::Little)?, bytes.to_vec());
        Ok(())
    }
}
