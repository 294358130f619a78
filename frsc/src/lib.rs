#![deny(missing_docs)]

//! # FRSC string containers
//!
//! Reads and writes FRSC containers: compact binary tables that map small
//! non-negative integer ids to strings. Ids are grouped into blocks of
//! consecutive values, so a dense table costs one 6-byte descriptor per
//! run plus a 4-byte pointer and a 2-byte length per string.
//!
//! ```
//! use frsc::{Container, StringEncoding};
//!
//! let mut container = Container::new();
//! container.set(0, "test");
//! container.set(1, "test2");
//! container.set(5, "test3");
//!
//! let bytes = container.to_bytes()?;
//! let decoded = Container::from_bytes(&bytes, StringEncoding::Utf8)?;
//! assert_eq!(decoded.get(5), Some("test3"));
//! assert_eq!(decoded.blocks()?.len(), 2);
//! # Ok::<(), frsc::Error>(())
//! ```

pub mod blocks;
pub mod codec;
pub mod config;
pub mod container;
pub mod encoding;
pub mod error;

#[cfg(test)]
mod tests;

pub use blocks::{Block, BlockError, Blocks};
pub use codec::{Decodable, Encodable, MalformedError, OverflowError};
pub use config::Settings;
pub use container::Container;
pub use encoding::{EncodingError, StringEncoding};
pub use error::Error;
