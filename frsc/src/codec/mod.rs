//! Physical layout of FRSC containers and the traits that read and write it.
//!
//! ```text
//! [Header (12)] [Block descriptors (6 x blocks)] [String pointers (4 x entries)] [String records]
//! ```
//!
//! All multi-byte integers are little-endian. Header fields, block
//! descriptor fields and string pointers are signed; the string length
//! prefix is unsigned.

use crate::config::Settings;
use crate::encoding::EncodingError;
use crate::error::Error;

mod decoder;
mod encoder;

pub(crate) use encoder::Layout;

/// Magic value at offset 0 of every container, the bytes `FRSC` read as a
/// little-endian `u32`.
pub const MAGIC: u32 = 0x4353_5246;

/// Size in bytes of the fixed header: magic, block count and string table
/// offset.
pub const HEADER_SIZE: usize = 12;

/// Size in bytes of a block descriptor: first id, count and sequence offset.
pub const DESCRIPTOR_SIZE: usize = 6;

/// Size in bytes of one entry of the string pointer table.
pub const POINTER_SIZE: usize = 4;

/// Size in bytes of the length prefix of a string record.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest encoded string length the length prefix can hold.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Trait for types that can be written as an FRSC container.
pub trait Encodable {
    /// Encodes the implementing type into a freshly allocated buffer.
    fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::new();
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Appends the encoded form to `buffer`. Nothing is appended when an
    /// error is returned.
    fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), Error>;
}

/// Trait for types that can be read from an FRSC container.
pub trait Decodable: Sized {
    /// Decodes an instance from untrusted bytes. Decoding either succeeds
    /// completely or fails without producing a partial result.
    fn decode(bytes: &[u8], settings: &Settings) -> Result<Self, Error>;
}

/// The fixed-size header at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of block descriptors following the header.
    pub block_count: i32,
    /// Absolute offset of the string pointer table.
    pub string_start: i32,
}

impl Header {
    /// Serializes the header, magic included.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.string_start.to_le_bytes());
        buf
    }

    /// Parses and validates the header at the start of `bytes`.
    ///
    /// ## Errors
    /// - `TooShort` if fewer than [`HEADER_SIZE`] bytes are available
    /// - `BadMagic` if the first four bytes are not [`MAGIC`]
    /// - `NegativeBlockCount` if the block count is negative
    /// - `InvalidStringOffset` if the string table would overlap the header
    pub fn parse(bytes: &[u8]) -> Result<Self, MalformedError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(MalformedError::TooShort(bytes.len()));
        };

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != MAGIC {
            return Err(MalformedError::BadMagic(magic));
        }

        let block_count = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if block_count < 0 {
            return Err(MalformedError::NegativeBlockCount(block_count));
        }

        let string_start = i32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        if string_start < HEADER_SIZE as i32 {
            return Err(MalformedError::InvalidStringOffset(string_start));
        }

        Ok(Self { block_count, string_start })
    }
}

/// Reasons a buffer is rejected as a container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedError {
    /// The buffer cannot hold the fixed header.
    #[error("buffer of {0} bytes is shorter than the {} byte header", HEADER_SIZE)]
    TooShort(usize),

    /// The buffer does not start with the container magic.
    #[error("bad magic {0:#010x}, expected {:#010x}", MAGIC)]
    BadMagic(u32),

    /// The header declares a negative number of blocks.
    #[error("negative block count {0}")]
    NegativeBlockCount(i32),

    /// The string table offset points into the header.
    #[error("string table offset {0} is below the header size")]
    InvalidStringOffset(i32),

    /// A block descriptor field that must be non-negative is negative.
    #[error("block {block}: negative {field} {value}")]
    NegativeField {
        /// Index of the block descriptor
        block: i32,
        /// Name of the field
        field: &'static str,
        /// The value read from the buffer
        value: i16,
    },

    /// A read would start before or end after the buffer.
    #[error("read of {len} bytes at offset {offset} exceeds buffer of {buffer_len} bytes")]
    OutOfBounds {
        /// Absolute offset of the attempted read
        offset: i64,
        /// Number of bytes requested
        len: usize,
        /// Length of the buffer
        buffer_len: usize,
    },

    /// A string record does not hold valid data for the configured encoding.
    #[error("string for id {id} is invalid: {source}")]
    InvalidString {
        /// Id the string belongs to
        id: u32,
        /// Why the bytes were rejected
        source: EncodingError,
    },

    /// Strict decoding: a block starts at or before the end of its
    /// predecessor.
    #[error("block {block} starting at id {first_id} is out of order")]
    UnorderedBlock {
        /// Index of the block descriptor
        block: i32,
        /// First id of the offending block
        first_id: u32,
    },

    /// The blocks declare more entries than the pointer table region can
    /// hold.
    #[error("blocks declare {declared} entries but the pointer table holds at most {capacity}")]
    TooManyEntries {
        /// Entries declared by the blocks read so far
        declared: i64,
        /// Pointers that fit between the string table offset and the end of
        /// the buffer
        capacity: i64,
    },

    /// Strict decoding: a block starts right after its predecessor and
    /// should have been merged into it.
    #[error("block {block} starting at id {first_id} continues the previous block")]
    UnmergedBlock {
        /// Index of the block descriptor
        block: i32,
        /// First id of the offending block
        first_id: u32,
    },

    /// Strict decoding: a block holds no entries.
    #[error("block {0} is empty")]
    EmptyBlock(i32),

    /// Strict decoding: a block's sequence offset differs from the number of
    /// entries in the preceding blocks.
    #[error("block {block} has sequence offset {actual}, expected {expected}")]
    SequenceMismatch {
        /// Index of the block descriptor
        block: i32,
        /// Entries counted in the preceding blocks
        expected: u32,
        /// Sequence offset read from the buffer
        actual: u32,
    },

    /// Strict decoding: the block descriptors run into the string pointer
    /// table.
    #[error("{block_count} block descriptors overlap the string table at offset {string_start}")]
    DescriptorsOverlapStrings {
        /// Block count from the header
        block_count: i32,
        /// String table offset from the header
        string_start: i32,
    },
}

/// Values that do not fit the wire field that has to store them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverflowError {
    /// An encoded string exceeds the 16-bit length prefix.
    #[error("string for id {id} encodes to {len} bytes, more than {}", MAX_STRING_LEN)]
    StringTooLong {
        /// Id the string belongs to
        id: u32,
        /// Encoded length in bytes
        len: usize,
    },

    /// A block starts at an id beyond the signed 16-bit descriptor field.
    #[error("id {0} does not fit a signed 16-bit block descriptor field")]
    IdOutOfRange(u32),

    /// A block count or sequence offset exceeds the signed 16-bit
    /// descriptor field.
    #[error("block {field} {value} does not fit a signed 16-bit descriptor field")]
    FieldOutOfRange {
        /// Name of the field
        field: &'static str,
        /// The value that does not fit
        value: usize,
    },

    /// The container would be too large for signed 32-bit offsets.
    #[error("container of {0} bytes exceeds the signed 32-bit offset range")]
    BufferTooLarge(usize),

    /// A string contains characters the configured encoding cannot express.
    #[error("string for id {id} cannot be encoded: {source}")]
    Unrepresentable {
        /// Id the string belongs to
        id: u32,
        /// The underlying encoding failure
        source: EncodingError,
    },
}
