//! Container encoding.
//!
//! Encoding runs in two phases. Planning sorts the entries, encodes every
//! string, coalesces the ids into blocks and checks every value against the
//! width of its wire field, computing the exact output size on the way.
//! Writing then emits the planned layout, so nothing is written for a
//! container that does not fit the format.

use std::borrow::Cow;

use crate::blocks::Blocks;
use crate::container::Container;
use crate::error::Error;

use super::{
    Encodable, Header, OverflowError, DESCRIPTOR_SIZE, HEADER_SIZE, LENGTH_PREFIX_SIZE,
    POINTER_SIZE,
};

/// A string record ready to be written.
struct Record<'a> {
    len: u16,
    bytes: Cow<'a, [u8]>,
}

/// The complete, validated layout of an encoded container.
pub(crate) struct Layout<'a> {
    header: Header,
    descriptors: Vec<[i16; 3]>,
    records: Vec<Record<'a>>,
    total_len: usize,
}

impl<'a> Layout<'a> {
    /// Plans the layout of `container` without writing anything.
    ///
    /// ## Errors
    /// - `EncodingOverflow` if a string, id, block field or the total size
    ///   does not fit its wire field, or a string is not representable in
    ///   the container's encoding
    pub(crate) fn plan(container: &'a Container) -> Result<Self, Error> {
        let encoding = container.encoding();
        let sorted = container.iter_sorted().collect::<Vec<_>>();

        let mut records = Vec::with_capacity(sorted.len());
        let mut ids = Vec::with_capacity(sorted.len());
        let mut strings_len: usize = 0;

        for &(id, value) in &sorted {
            let bytes = encoding
                .encode(value)
                .map_err(|source| OverflowError::Unrepresentable { id, source })?;
            let len = u16::try_from(bytes.len())
                .map_err(|_| OverflowError::StringTooLong { id, len: bytes.len() })?;

            strings_len += LENGTH_PREFIX_SIZE + bytes.len();
            ids.push(id);
            records.push(Record { len, bytes });
        }

        let blocks = Blocks::coalesce(&ids)?;
        let descriptors = blocks
            .iter()
            .map(|block| {
                let first_id = i16::try_from(block.first_id())
                    .map_err(|_| OverflowError::IdOutOfRange(block.first_id()))?;
                Ok([
                    first_id,
                    descriptor_field("count", block.count())?,
                    descriptor_field("sequence offset", block.sequence_offset())?,
                ])
            })
            .collect::<Result<Vec<_>, OverflowError>>()?;

        let string_start = HEADER_SIZE + descriptors.len() * DESCRIPTOR_SIZE;
        let total_len = string_start + records.len() * POINTER_SIZE + strings_len;

        // Every pointer is below the total length, so this bounds them all.
        if i32::try_from(total_len).is_err() {
            return Err(OverflowError::BufferTooLarge(total_len).into());
        }

        let header = Header {
            block_count: to_i32(descriptors.len())?,
            string_start: to_i32(string_start)?,
        };

        Ok(Self { header, descriptors, records, total_len })
    }

    /// Returns the exact number of bytes [`Layout::write`] appends.
    pub(crate) fn total_len(&self) -> usize {
        self.total_len
    }

    /// Returns the number of blocks in the layout.
    pub(crate) fn block_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Appends the planned container to `buffer`.
    ///
    /// ## Errors
    /// - `BufferSizeMismatch` if the bytes written differ from the planned
    ///   size; the partial output is removed again
    pub(crate) fn write(&self, buffer: &mut Vec<u8>) -> Result<(), Error> {
        let start = buffer.len();
        buffer.reserve(self.total_len);

        buffer.extend_from_slice(&self.header.to_bytes());

        for descriptor in &self.descriptors {
            for field in descriptor {
                buffer.extend_from_slice(&field.to_le_bytes());
            }
        }

        let mut pointer = HEADER_SIZE
            + self.descriptors.len() * DESCRIPTOR_SIZE
            + self.records.len() * POINTER_SIZE;
        for record in &self.records {
            buffer.extend_from_slice(&to_i32(pointer)?.to_le_bytes());
            pointer += LENGTH_PREFIX_SIZE + record.bytes.len();
        }

        for record in &self.records {
            buffer.extend_from_slice(&record.len.to_le_bytes());
            buffer.extend_from_slice(&record.bytes);
        }

        let written = buffer.len() - start;
        if written != self.total_len {
            buffer.truncate(start);
            return Err(Error::BufferSizeMismatch {
                expected: self.total_len,
                actual: written,
            });
        }
        Ok(())
    }
}

fn descriptor_field(field: &'static str, value: usize) -> Result<i16, OverflowError> {
    i16::try_from(value).map_err(|_| OverflowError::FieldOutOfRange { field, value })
}

fn to_i32(value: usize) -> Result<i32, OverflowError> {
    i32::try_from(value).map_err(|_| OverflowError::BufferTooLarge(value))
}

impl Encodable for Container {
    #[tracing::instrument(skip_all, fields(entries = self.len()))]
    fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), Error> {
        let layout = Layout::plan(self)?;
        layout.write(buffer)?;

        tracing::debug!(
            blocks = layout.block_count(),
            bytes = layout.total_len(),
            "encoded container"
        );
        Ok(())
    }
}
