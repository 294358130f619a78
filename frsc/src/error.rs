//! Top-level error type for the frsc library
//!

use crate::blocks::BlockError;
use crate::codec::{MalformedError, OverflowError};

/// Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bytes are not a valid container. Decoding stops at the first
    /// problem and returns nothing else.
    #[error("malformed container: {0}")]
    MalformedContainer(#[from] MalformedError),

    /// A value in the container does not fit the wire field that stores
    /// it. Reported before anything is written.
    #[error("encoding overflow: {0}")]
    EncodingOverflow(#[from] OverflowError),

    /// The encoder wrote a different number of bytes than it planned. This
    /// is a defect in the encoder, not a problem with the input.
    #[error("buffer size mismatch: planned {expected} bytes but wrote {actual}")]
    BufferSizeMismatch {
        /// Planned size in bytes
        expected: usize,
        /// Bytes actually written
        actual: usize,
    },

    /// The ids handed to the block coalescer were not strictly ascending.
    #[error(transparent)]
    Blocks(#[from] BlockError),
}
