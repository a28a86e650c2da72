//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::data_type::DataType;
use crate::header::StructureType;
use crate::tree::NodeId;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// requested data of one type from a structure holding another
    #[error("wrong data type: requested {requested}, structure holds {actual}")]
    WrongDataType {
        /// The type the caller asked for
        requested: DataType,
        /// The type declared in the structure's header
        actual: DataType,
    },

    /// a count, length or tag does not fit the format
    #[error("overflow: {0}")]
    Overflow(#[from] OverflowError),

    /// destination buffer is too small
    #[error("destination too small: {required} bytes required, {available} available")]
    DestinationTooSmall {
        /// Bytes the write needs
        required: usize,
        /// Bytes the destination has
        available: usize,
    },

    /// source buffer ends before the structure does
    #[error("buffer truncated: {needed} bytes needed, {available} available")]
    Truncated {
        /// Bytes the structure claims
        needed: usize,
        /// Bytes left in the source
        available: usize,
    },

    /// length word too small to cover the rest of the header
    #[error("{kind} length of {length} words cannot hold its own header")]
    LengthTooShort {
        /// Length read from the header
        length: u32,
        /// Header kind holding the length
        kind: StructureType,
    },

    /// child kind is incompatible with its parent
    #[error("{child} cannot be placed in a structure holding {parent}")]
    StructuralMismatch {
        /// Content type of the parent
        parent: DataType,
        /// Kind of the rejected child
        child: StructureType,
    },

    /// typed data cannot be attached to a container
    #[error("structure holding {0} cannot carry primitive data")]
    NotALeaf(DataType),

    /// data type cannot be encoded in this header kind
    #[error("{data_type} cannot be encoded in a {kind} header")]
    TypeNotRepresentable {
        /// The rejected type
        data_type: DataType,
        /// The header kind
        kind: StructureType,
    },

    /// padding cannot be encoded in this header kind
    #[error("{kind} headers cannot carry {padding} bytes of padding")]
    PaddingNotRepresentable {
        /// The padding byte count
        padding: u8,
        /// The header kind
        kind: StructureType,
    },

    /// string data was unreadable and may not be appended to
    #[error("cannot append to badly formatted string data")]
    BadStringFormat,

    /// composite format string failed to compile
    #[error("invalid composite format {format:?}: {reason}")]
    InvalidCompositeFormat {
        /// The format as given
        format: String,
        /// What the compiler rejected
        reason: String,
    },

    /// composite data does not follow its format
    #[error("malformed composite data: {0}")]
    MalformedComposite(String),

    /// lengths must be recomputed before writing
    #[error("header lengths are out of date, call set_all_header_lengths first")]
    StaleLengths,

    /// nesting deeper than allowed
    #[error("structures nested deeper than {0} levels")]
    TooDeep(usize),

    /// no such node in the tree
    #[error("no structure with id {0}")]
    NodeNotFound(NodeId),

    /// a node would become its own ancestor
    #[error("structure {0} cannot be placed below itself")]
    CyclicAttachment(NodeId),
}

/// Error type to provide further information when a value overflowed its field
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum OverflowError {
    /// data items exceed what the length field can describe
    #[error("added data overflowed containing structure: {items} items need {words} words, at most {max} fit")]
    DataItems {
        /// Item count after the append
        items: usize,
        /// Words the items would occupy
        words: u64,
        /// Largest number of data words representable
        max: u64,
    },

    /// a length sum exceeded the length field
    #[error("length of {length} words exceeds the {kind} maximum of {max}")]
    Length {
        /// Computed length
        length: u64,
        /// Header kind holding the length
        kind: StructureType,
        /// Maximum length for that kind
        max: u64,
    },

    /// a tag exceeded its field
    #[error("tag {tag} exceeds the {kind} maximum of {max}")]
    Tag {
        /// The rejected tag
        tag: u32,
        /// Header kind holding the tag
        kind: StructureType,
        /// Maximum tag for that kind
        max: u32,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
