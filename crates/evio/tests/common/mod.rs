#![allow(dead_code)]

use evio::{
    ByteOrder, CompositeData, CompositeValue, DataType, Error, EventBuilder, NodeId,
    StructureTree,
};
use pretty_assertions::assert_eq;

pub fn composite_values() -> Vec<CompositeValue> {
    vec![
        CompositeValue::NValue(2),
        CompositeValue::Int(1),
        CompositeValue::Ascii(b'x'),
        CompositeValue::Int(2),
        CompositeValue::Ascii(b'y'),
    ]
}

/// An event holding one bank of every primitive type, strings, nested
/// segments and composite data
pub fn sample_event(order: ByteOrder) -> Result<(StructureTree, NodeId), Error> {
    let mut builder = EventBuilder::new(1, DataType::Bank, 1).byte_order(order);

    builder.open_bank(10, DataType::Int32, 0)?;
    builder.set_data(&[i32::MIN, -1, 0, 1, i32::MAX])?;
    builder.close()?;
    builder.open_bank(11, DataType::UInt32, 1)?;
    builder.set_data(&[0u32, u32::MAX])?;
    builder.close()?;
    builder.open_bank(12, DataType::Short16, 2)?;
    builder.set_data(&[-3i16, 4, 5])?;
    builder.close()?;
    builder.open_bank(13, DataType::UShort16, 3)?;
    builder.set_data(&[1u16, 2, 3, 4, 5])?;
    builder.close()?;
    builder.open_bank(14, DataType::Long64, 4)?;
    builder.set_data(&[i64::MIN, 7])?;
    builder.close()?;
    builder.open_bank(15, DataType::ULong64, 5)?;
    builder.set_data(&[u64::MAX])?;
    builder.close()?;
    builder.open_bank(16, DataType::Float32, 6)?;
    builder.set_data(&[1.5f32, -0.25])?;
    builder.close()?;
    builder.open_bank(17, DataType::Double64, 7)?;
    builder.set_data(&[3.125f64])?;
    builder.close()?;
    builder.open_bank(18, DataType::Char8, 8)?;
    builder.set_data(&[-128i8, 0, 127])?;
    builder.close()?;
    builder.open_bank(19, DataType::UChar8, 9)?;
    builder.set_data(&[1u8, 2, 3, 4, 5])?;
    builder.close()?;

    builder.open_bank(20, DataType::CharStar8, 10)?;
    builder.set_string_data(&["alpha", "", "beta"])?;
    builder.close()?;

    builder.open_bank(30, DataType::Segment, 11)?;
    builder.open_segment(31, DataType::Short16)?;
    builder.set_data(&[1i16, 2, 3])?;
    builder.close()?;
    builder.open_segment(32, DataType::TagSegment)?;
    builder.open_tag_segment(33, DataType::Float32)?;
    builder.set_data(&[2.0f32])?;
    builder.close()?;
    builder.close()?;
    builder.close()?;

    builder.open_bank(40, DataType::Composite, 12)?;
    builder.set_composite_data(vec![CompositeData::new("N(I,a)", 3, 4, 5, composite_values())?])?;
    builder.close()?;

    builder.finish()
}

/// Check every value of an event made by [`sample_event`]
pub fn check_event(tree: &mut StructureTree, event: NodeId) -> Result<(), Error> {
    let children = tree.children(event)?.to_vec();
    assert_eq!(children.len(), 13);

    assert_eq!(tree.structure_mut(children[0])?.int_data()?, &[i32::MIN, -1, 0, 1, i32::MAX]);
    assert_eq!(tree.structure_mut(children[1])?.uint_data()?, &[0, u32::MAX]);
    assert_eq!(tree.structure_mut(children[2])?.short_data()?, &[-3, 4, 5]);
    assert_eq!(tree.structure_mut(children[3])?.ushort_data()?, &[1, 2, 3, 4, 5]);
    assert_eq!(tree.structure_mut(children[4])?.long_data()?, &[i64::MIN, 7]);
    assert_eq!(tree.structure_mut(children[5])?.ulong_data()?, &[u64::MAX]);
    assert_eq!(tree.structure_mut(children[6])?.float_data()?, &[1.5, -0.25]);
    assert_eq!(tree.structure_mut(children[7])?.double_data()?, &[3.125]);
    assert_eq!(tree.structure_mut(children[8])?.char_data()?, &[-128, 0, 127]);
    assert_eq!(tree.structure_mut(children[9])?.uchar_data()?, &[1, 2, 3, 4, 5]);
    assert_eq!(tree.structure_mut(children[10])?.string_data()?, &["alpha", "", "beta"]);

    let segments = tree.children(children[11])?.to_vec();
    assert_eq!(segments.len(), 2);
    assert_eq!(tree.structure_mut(segments[0])?.short_data()?, &[1, 2, 3]);
    let tag_segments = tree.children(segments[1])?.to_vec();
    assert_eq!(tree.structure(tag_segments[0])?.tag(), 33);
    assert_eq!(tree.structure_mut(tag_segments[0])?.float_data()?, &[2.0]);

    let mut composite = tree.structure_mut(children[12])?;
    let items = composite.composite_data()?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].format().as_str(), "N(I,a)");
    assert_eq!(items[0].values(), composite_values().as_slice());
    drop(composite);

    for (i, &child) in children.iter().enumerate() {
        assert_eq!(tree.structure(child)?.number() as usize, i);
    }
    Ok(())
}
