//! Container decoding from untrusted bytes.
//!
//! Every offset is computed in `i64` from the signed wire fields, which
//! cannot overflow, and is bounds-checked against the buffer before any
//! bytes are read. A malformed buffer fails the whole decode; no partial
//! container is ever returned.
//!
//! Non-strict decoding accepts anything the reference layout can express,
//! including out-of-order or overlapping blocks (later entries overwrite
//! earlier ones), as long as the blocks together declare no more entries
//! than the pointer table region can hold. Strict decoding additionally
//! requires the canonical shape the encoder produces.

use std::collections::HashMap;

use crate::config::Settings;
use crate::container::Container;
use crate::encoding::StringEncoding;
use crate::error::Error;

use super::{
    Decodable, Header, MalformedError, DESCRIPTOR_SIZE, HEADER_SIZE, LENGTH_PREFIX_SIZE,
    POINTER_SIZE,
};

/// Bounds-checked little-endian reads at absolute offsets.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn slice(&self, offset: i64, len: usize) -> Result<&'a [u8], MalformedError> {
        let out_of_bounds = || MalformedError::OutOfBounds {
            offset,
            len,
            buffer_len: self.bytes.len(),
        };

        let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
        self.bytes.get(start..end).ok_or_else(out_of_bounds)
    }

    fn array<const N: usize>(&self, offset: i64) -> Result<[u8; N], MalformedError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.slice(offset, N)?);
        Ok(buf)
    }

    fn i16(&self, offset: i64) -> Result<i16, MalformedError> {
        self.array(offset).map(i16::from_le_bytes)
    }

    fn u16(&self, offset: i64) -> Result<u16, MalformedError> {
        self.array(offset).map(u16::from_le_bytes)
    }

    fn i32(&self, offset: i64) -> Result<i32, MalformedError> {
        self.array(offset).map(i32::from_le_bytes)
    }
}

/// A block descriptor as read from the buffer, with its fields checked to
/// be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Descriptor {
    first_id: u32,
    count: u32,
    sequence_offset: u32,
}

impl Decodable for Container {
    /// Decodes a container, applying the strictness and string encoding of
    /// `settings`.
    ///
    /// ## Errors
    /// Every failure is an [`Error::MalformedContainer`].
    #[tracing::instrument(skip_all, fields(len = bytes.len(), strict = settings.strict))]
    fn decode(bytes: &[u8], settings: &Settings) -> Result<Self, Error> {
        let header = Header::parse(bytes)?;

        if settings.strict {
            check_descriptor_region(&header)?;
        }

        let reader = Reader::new(bytes);
        let mut entries = HashMap::new();

        // Every entry needs a pointer, so overlapping blocks cannot make the
        // total work exceed what the buffer holds.
        let capacity = pointer_capacity(bytes, &header);
        let mut declared: i64 = 0;

        // Tracks the canonical shape for strict decoding.
        let mut next_free_id: u32 = 0;
        let mut expected_sequence: u32 = 0;

        for block in 0..header.block_count {
            let descriptor = read_descriptor(&reader, block)?;
            tracing::trace!(
                block,
                first_id = descriptor.first_id,
                count = descriptor.count,
                sequence_offset = descriptor.sequence_offset,
                "read block descriptor"
            );

            declared += i64::from(descriptor.count);
            if declared > capacity {
                return Err(MalformedError::TooManyEntries { declared, capacity }.into());
            }

            if settings.strict {
                check_canonical(block, &descriptor, next_free_id, expected_sequence)?;
                // Both stay far below u32::MAX: ids and counts come from i16.
                next_free_id = descriptor.first_id + descriptor.count;
                expected_sequence += descriptor.count;
            }

            for index in 0..descriptor.count {
                let id = descriptor.first_id + index;
                let sequence = i64::from(descriptor.sequence_offset) + i64::from(index);
                let value = read_string(&reader, &header, sequence, id, settings.encoding)?;

                if entries.insert(id, value).is_some() {
                    tracing::warn!(id, block, "duplicate id in container; keeping the later entry");
                }
            }
        }

        tracing::debug!(
            blocks = header.block_count,
            entries = entries.len(),
            "decoded container"
        );

        Ok(Container::from_map(entries, settings.encoding))
    }
}

/// Reads the descriptor of block `block`, rejecting negative fields.
fn read_descriptor(reader: &Reader, block: i32) -> Result<Descriptor, MalformedError> {
    let position = HEADER_SIZE as i64 + i64::from(block) * DESCRIPTOR_SIZE as i64;

    let non_negative = |field: &'static str, value: i16| {
        u32::try_from(value).map_err(|_| MalformedError::NegativeField { block, field, value })
    };

    Ok(Descriptor {
        first_id: non_negative("first id", reader.i16(position)?)?,
        count: non_negative("count", reader.i16(position + 2)?)?,
        sequence_offset: non_negative("sequence offset", reader.i16(position + 4)?)?,
    })
}

/// Follows the pointer at index `sequence` of the pointer table and decodes
/// the length-prefixed string record it points to.
fn read_string(
    reader: &Reader,
    header: &Header,
    sequence: i64,
    id: u32,
    encoding: StringEncoding,
) -> Result<String, MalformedError> {
    let pointer_position = i64::from(header.string_start) + sequence * POINTER_SIZE as i64;
    let pointer = i64::from(reader.i32(pointer_position)?);

    let len = usize::from(reader.u16(pointer)?);
    let bytes = reader.slice(pointer + LENGTH_PREFIX_SIZE as i64, len)?;

    encoding
        .decode(bytes)
        .map_err(|source| MalformedError::InvalidString { id, source })
}

/// Returns how many pointers fit between the string table offset and the
/// end of the buffer.
fn pointer_capacity(bytes: &[u8], header: &Header) -> i64 {
    let region = bytes.len() as i64 - i64::from(header.string_start);
    region.max(0) / POINTER_SIZE as i64
}

/// Strict decoding: the descriptors must end at or before the string
/// pointer table.
fn check_descriptor_region(header: &Header) -> Result<(), MalformedError> {
    let descriptors_end =
        HEADER_SIZE as i64 + i64::from(header.block_count) * DESCRIPTOR_SIZE as i64;

    if descriptors_end > i64::from(header.string_start) {
        return Err(MalformedError::DescriptorsOverlapStrings {
            block_count: header.block_count,
            string_start: header.string_start,
        });
    }
    Ok(())
}

/// Strict decoding: blocks must be non-empty, ascending, separated by at
/// least one missing id and laid out back to back in the pointer table.
fn check_canonical(
    block: i32,
    descriptor: &Descriptor,
    next_free_id: u32,
    expected_sequence: u32,
) -> Result<(), MalformedError> {
    if descriptor.count == 0 {
        return Err(MalformedError::EmptyBlock(block));
    }

    if descriptor.first_id < next_free_id {
        return Err(MalformedError::UnorderedBlock {
            block,
            first_id: descriptor.first_id,
        });
    }

    if block > 0 && descriptor.first_id == next_free_id {
        return Err(MalformedError::UnmergedBlock {
            block,
            first_id: descriptor.first_id,
        });
    }

    if descriptor.sequence_offset != expected_sequence {
        return Err(MalformedError::SequenceMismatch {
            block,
            expected: expected_sequence,
            actual: descriptor.sequence_offset,
        });
    }
    Ok(())
}
