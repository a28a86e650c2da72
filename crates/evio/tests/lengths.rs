mod common;

use evio::error::OverflowError;
use evio::{
    parse, parse_event, to_bank, to_segment, ByteOrder, DataType, Error, ParseOptions, Structure,
    StructureTree, StructureType,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

use common::sample_event;

#[traced_test]
#[test]
fn every_header_matches_its_bytes() -> Result<(), Error> {
    let (tree, event) = sample_event(ByteOrder::Big)?;

    for id in tree.descendants(event).collect::<Vec<_>>() {
        let structure = tree.structure(id)?;
        let bytes = tree.write(id, ByteOrder::Big)?;
        assert_eq!(bytes.len(), 4 * (structure.header().length() as usize + 1));

        if structure.is_container() {
            let mut expected = structure.structure_type().header_bytes();
            for &child in tree.children(id)? {
                expected += tree.total_bytes(child)?;
            }
            assert_eq!(bytes.len(), expected, "{structure}");
        }
    }
    Ok(())
}

#[test]
fn recomputing_twice_changes_nothing() -> Result<(), Error> {
    let (mut tree, event) = sample_event(ByteOrder::Big)?;
    let first = tree.write(event, ByteOrder::Big)?;
    let length = tree.structure(event)?.header().length();

    assert_eq!(tree.set_all_header_lengths(event)?, length);
    assert_eq!(tree.set_all_header_lengths(event)?, length);
    assert_eq!(tree.write(event, ByteOrder::Big)?, first);
    Ok(())
}

#[traced_test]
#[test]
fn changes_reach_the_event_bank() -> Result<(), Error> {
    let (mut tree, event) = sample_event(ByteOrder::Big)?;
    let before = tree.structure(event)?.header().length();

    let segments = tree.children(event)?[11];
    let tag_segments = tree.children(segments)?[1];
    let leaf = tree.children(tag_segments)?[0];
    let sibling = tree.children(segments)?[0];

    tree.structure_mut(leaf)?.append_float_data(&[3.0, 4.0])?;
    for id in [leaf, tag_segments, segments, event] {
        assert!(!tree.structure(id)?.lengths_up_to_date());
    }
    assert!(tree.structure(sibling)?.lengths_up_to_date());
    assert!(matches!(tree.write(event, ByteOrder::Big), Err(Error::StaleLengths)));

    assert_eq!(tree.set_all_header_lengths(event)?, before + 2);
    let bytes = tree.write(event, ByteOrder::Big)?;
    let (mut parsed, root) = parse_event(&bytes, ParseOptions::default())?;
    let leaf = parsed.matching_structures(root, |s| s.tag() == 33)[0];
    assert_eq!(parsed.structure_mut(leaf)?.float_data()?, &[2.0, 3.0, 4.0]);
    Ok(())
}

#[test]
fn removing_and_inserting_children() -> Result<(), Error> {
    let (mut tree, event) = sample_event(ByteOrder::Big)?;
    let before = tree.structure(event)?.header().length();

    let doubles = tree.children(event)?[7];
    let removed = tree.remove(doubles)?;
    assert_eq!(removed.tag(), 17);
    // header of 2 words plus one double
    assert_eq!(tree.set_all_header_lengths(event)?, before - 4);

    let mut bank = Structure::bank(17, DataType::Double64, 7);
    bank.set_double_data(&[3.125])?;
    tree.insert_child(event, 7, bank)?;
    assert_eq!(tree.set_all_header_lengths(event)?, before);

    let (mut original, root) = sample_event(ByteOrder::Big)?;
    original.set_all_header_lengths(root)?;
    assert_eq!(
        tree.write(event, ByteOrder::Big)?,
        original.write(root, ByteOrder::Big)?
    );
    Ok(())
}

#[test]
fn padding_is_written_in_the_type_byte() -> Result<(), Error> {
    let mut tree = StructureTree::new();
    for n in 1..=8usize {
        let id = tree.insert(Structure::bank(1, DataType::UChar8, 0));
        tree.structure_mut(id)?.set_uchar_data(&vec![0xAB; n])?;
        tree.set_all_header_lengths(id)?;

        let bytes = tree.write(id, ByteOrder::Big)?;
        let padding = (4 - n % 4) % 4;
        assert_eq!(bytes[6], ((padding as u8) << 6) | 0x07, "{n} bytes");
        assert_eq!(bytes.len(), 8 + n + padding);
        assert!(bytes[8 + n..].iter().all(|&b| b == 0));
    }

    for n in 1..=4usize {
        let id = tree.insert(Structure::bank(1, DataType::Short16, 0));
        tree.structure_mut(id)?.set_short_data(&vec![-1; n])?;
        tree.set_all_header_lengths(id)?;

        let bytes = tree.write(id, ByteOrder::Little)?;
        let padding = if n % 2 == 1 { 2 } else { 0 };
        assert_eq!(bytes[5], ((padding as u8) << 6) | 0x04, "{n} shorts");
        assert_eq!(bytes.len(), 8 + 2 * n + padding);
    }
    Ok(())
}

#[test]
fn data_limits_per_kind() -> Result<(), Error> {
    let mut segment = Structure::segment(1, DataType::UChar8);
    segment.set_uchar_data(&vec![0; 4 * 0xffff])?;
    assert!(matches!(
        segment.append_uchar_data(&[1]),
        Err(Error::Overflow(OverflowError::DataItems { .. }))
    ));
    assert_eq!(segment.number_data_items(), 4 * 0xffff);

    let mut tag_segment = Structure::tag_segment(1, DataType::Long64)?;
    assert!(matches!(
        tag_segment.set_long_data(&vec![0; 0x8000]),
        Err(Error::Overflow(OverflowError::DataItems { .. }))
    ));
    tag_segment.set_long_data(&vec![0; 0x7fff])?;

    assert!(matches!(
        Structure::tag_segment(0x1000, DataType::Int32),
        Err(Error::Overflow(OverflowError::Tag { tag: 0x1000, .. }))
    ));
    Ok(())
}

#[test]
fn narrowing_an_event_into_a_segment() -> Result<(), Error> {
    let (mut tree, event) = sample_event(ByteOrder::Big)?;
    let children = tree.children(event)?.to_vec();

    // children of a bank of banks must stay banks
    assert!(matches!(
        to_segment(&mut tree, children[0]),
        Err(Error::StructuralMismatch { .. })
    ));

    let segment = to_segment(&mut tree, event)?;
    assert_eq!(tree.children(segment)?, children.as_slice());
    assert_eq!(tree.structure(segment)?.data_type(), DataType::Bank);

    let bytes = tree.write(segment, ByteOrder::Little)?;
    let options = ParseOptions::builder().byte_order(ByteOrder::Little).build();
    let (mut parsed, root) = parse(&bytes, StructureType::Segment, options)?;
    assert_eq!(parsed.children(root)?.len(), 13);

    let bank = to_bank(&mut parsed, root, 1)?;
    common::check_event(&mut parsed, bank)?;
    Ok(())
}
