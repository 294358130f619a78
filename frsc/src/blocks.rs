//! Coalescing of sorted ids into blocks of contiguous runs.
//!
//! # Invariants
//!
//! A `Block` maintains the following at all times:
//! - **Never empty**: it covers at least one id (`first_id <= last_id`)
//! - **Contiguous**: it covers every id in `first_id..=last_id`
//!
//! `Blocks::coalesce` produces blocks that are additionally maximal,
//! non-overlapping and ordered by `first_id`, with each block's sequence
//! offset equal to the number of ids covered by the blocks before it.

use std::ops::Index;
use std::ops::RangeInclusive;

/// Errors which can occur while coalescing ids into blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    /// The input is not sorted in ascending order.
    #[error("id {current} follows {previous} (ids must be in ascending order)")]
    UnsortedInput {
        /// The id preceding the violation
        previous: u32,
        /// The id that is smaller than its predecessor
        current: u32,
    },

    /// The input contains the same id twice.
    #[error("the input contains duplicate id {0}")]
    DuplicateId(u32),
}

/// A maximal run of consecutive ids, stored on the wire as a single
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    first_id: u32,
    last_id: u32,
    sequence_offset: usize,
}

impl Block {
    /// Creates a block covering the single id `first_id`, whose string
    /// pointer sits at `sequence_offset` in the pointer table.
    pub fn new(first_id: u32, sequence_offset: usize) -> Self {
        Self { first_id, last_id: first_id, sequence_offset }
    }

    /// Returns the first id covered by the block.
    pub fn first_id(&self) -> u32 {
        self.first_id
    }

    /// Returns the last id covered by the block.
    pub fn last_id(&self) -> u32 {
        self.last_id
    }

    /// Returns the number of ids in the block.
    pub fn count(&self) -> usize {
        (self.last_id - self.first_id) as usize + 1
    }

    /// Returns the index of the block's first entry in the pointer table,
    /// i.e. the number of entries in all preceding blocks.
    pub fn sequence_offset(&self) -> usize {
        self.sequence_offset
    }

    /// Returns the ids covered by the block.
    pub fn ids(&self) -> RangeInclusive<u32> {
        self.first_id..=self.last_id
    }

    /// Extends the block by `id` if it directly follows the last id.
    /// Returns `false`, leaving the block untouched, otherwise.
    fn try_extend(&mut self, id: u32) -> bool {
        if self.last_id.checked_add(1) != Some(id) {
            return false;
        }
        self.last_id = id;
        true
    }
}

/// String representation for blocks: `Block(first..=last @ offset)`.
impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Block({}..={} @ {})",
            self.first_id, self.last_id, self.sequence_offset
        )
    }
}

/// The blocks of a container, ordered by first id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    /// Groups strictly ascending ids into maximal runs of consecutive ids.
    ///
    /// A new block starts at the first id and at every id that is not
    /// exactly one greater than the previous id; otherwise the current block
    /// grows by one.
    ///
    /// ## Errors
    /// - `UnsortedInput` if an id is smaller than its predecessor
    /// - `DuplicateId` if an id equals its predecessor
    pub fn coalesce(sorted_ids: &[u32]) -> Result<Self, BlockError> {
        let mut blocks: Vec<Block> = Vec::new();

        for (sequence_offset, &id) in sorted_ids.iter().enumerate() {
            if let Some(block) = blocks.last_mut() {
                let previous = block.last_id;
                if id < previous {
                    return Err(BlockError::UnsortedInput { previous, current: id });
                }
                if id == previous {
                    return Err(BlockError::DuplicateId(id));
                }
                if block.try_extend(id) {
                    continue;
                }
            }
            blocks.push(Block::new(id, sequence_offset));
        }

        Ok(Self(blocks))
    }

    /// Returns the number of blocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of ids covered by all blocks together.
    pub fn total_entries(&self) -> usize {
        self.0.iter().map(Block::count).sum()
    }

    /// Returns an iterator over the blocks in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.0.iter()
    }
}

impl IntoIterator for Blocks {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Index<usize> for Blocks {
    type Output = Block;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use test_case::test_case;

    /// (first_id, last_id, sequence_offset) triples
    #[test_case(&[], &[]; "empty input")]
    #[test_case(&[7], &[(7, 7, 0)]; "single id")]
    #[test_case(&[0, 1, 5], &[(0, 1, 0), (5, 5, 2)]; "run followed by singleton")]
    #[test_case(&[1, 2, 3, 4], &[(1, 4, 0)]; "one contiguous run")]
    #[test_case(&[0, 2, 4], &[(0, 0, 0), (2, 2, 1), (4, 4, 2)]; "no neighbours")]
    #[test_case(&[3, 4, 10, 11, 12, 40], &[(3, 4, 0), (10, 12, 2), (40, 40, 5)]; "mixed runs")]
    #[test_case(&[u32::MAX - 1, u32::MAX], &[(u32::MAX - 1, u32::MAX, 0)]; "run at the top of the range")]
    fn test_coalesce(ids: &[u32], expected: &[(u32, u32, usize)]) -> Result<(), BlockError> {
        let blocks = Blocks::coalesce(ids)?;

        let actual = blocks
            .iter()
            .map(|block| (block.first_id(), block.last_id(), block.sequence_offset()))
            .collect::<Vec<_>>();
        assert_eq!(actual, expected);
        assert_eq!(blocks.total_entries(), ids.len());

        Ok(())
    }

    #[test]
    fn test_block_accessors() {
        let mut block = Block::new(10, 4);
        assert!(block.try_extend(11));
        assert!(block.try_extend(12));
        assert!(!block.try_extend(14));

        assert_eq!(block.count(), 3);
        assert_eq!(block.ids().collect::<Vec<_>>(), vec![10, 11, 12]);
        assert_eq!(block.to_string(), "Block(10..=12 @ 4)");
    }

    #[test]
    fn test_extend_does_not_wrap() {
        let mut block = Block::new(u32::MAX, 0);
        assert!(!block.try_extend(0));
        assert_eq!(block.count(), 1);
    }

    #[test_case(&[5, 3]; "descending pair")]
    #[test_case(&[1, 2, 3, 2]; "drop after run")]
    fn test_unsorted_input(ids: &[u32]) {
        assert_matches!(Blocks::coalesce(ids), Err(BlockError::UnsortedInput { .. }));
    }

    #[test_case(&[4, 4], 4; "duplicate singleton")]
    #[test_case(&[1, 2, 2, 3], 2; "duplicate inside run")]
    fn test_duplicate_input(ids: &[u32], duplicate: u32) {
        assert_matches!(
            Blocks::coalesce(ids),
            Err(BlockError::DuplicateId(id)) if id == duplicate
        );
    }

    proptest! {
        #[test]
        fn prop_blocks_partition_the_input(
            ids in prop::collection::btree_set(0..5_000u32, 0..400)
        ) {
            let ids = ids.into_iter().collect::<Vec<_>>();
            let blocks = Blocks::coalesce(&ids)?;

            // Expanding the blocks gives back the input exactly.
            let expanded = blocks.iter().flat_map(Block::ids).collect::<Vec<_>>();
            prop_assert_eq!(&expanded, &ids);

            let mut expected_offset = 0;
            for pair in blocks.iter().collect::<Vec<_>>().windows(2) {
                // Maximal: a gap of at least one id separates blocks.
                prop_assert!(pair[1].first_id() > pair[0].last_id() + 1);
            }
            for block in blocks.iter() {
                prop_assert_eq!(block.sequence_offset(), expected_offset);
                expected_offset += block.count();
            }
        }
    }
}
