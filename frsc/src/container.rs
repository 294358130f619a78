//! The in-memory id to string table.
//!
//! A [`Container`] owns its entries outright. Mapping operations never
//! validate values; whether an id or a string fits the wire format is only
//! decided when the container is encoded.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::blocks::Blocks;
use crate::codec::{Decodable, Encodable, Layout};
use crate::config::Settings;
use crate::encoding::StringEncoding;
use crate::error::Error;

/// A table of strings keyed by small non-negative integer ids, stored with a
/// single string encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    entries: HashMap<u32, String>,
    encoding: StringEncoding,
}

impl Container {
    /// Creates an empty container using UTF-8.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty container using `encoding`.
    pub fn with_encoding(encoding: StringEncoding) -> Self {
        Self { entries: HashMap::new(), encoding }
    }

    /// Creates a container that takes ownership of `entries`.
    pub fn from_map(entries: HashMap<u32, String>, encoding: StringEncoding) -> Self {
        Self { entries, encoding }
    }

    /// Decodes a container from `bytes` with the given string encoding.
    ///
    /// ## Errors
    /// - `MalformedContainer` if the bytes are not a valid container
    pub fn from_bytes(bytes: &[u8], encoding: StringEncoding) -> Result<Self, Error> {
        let settings = Settings { encoding, ..Settings::default() };
        Self::decode(bytes, &settings)
    }

    /// Decodes a container from `bytes` with the encoding and strictness of
    /// `settings`.
    pub fn from_bytes_with(bytes: &[u8], settings: &Settings) -> Result<Self, Error> {
        Self::decode(bytes, settings)
    }

    /// Encodes the container.
    ///
    /// ## Errors
    /// - `EncodingOverflow` if an id, string or block does not fit the format
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.encode()
    }

    /// Returns the exact size in bytes of [`Container::to_bytes`], without
    /// writing anything.
    pub fn encoded_len(&self) -> Result<usize, Error> {
        Layout::plan(self).map(|layout| layout.total_len())
    }

    /// Returns the blocks the container is written with.
    pub fn blocks(&self) -> Result<Blocks, Error> {
        Ok(Blocks::coalesce(&self.ids_sorted())?)
    }

    /// Returns the string encoding of the container.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Returns the string stored for `id`.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Stores `value` for `id`, returning the value it replaces.
    pub fn set(&mut self, id: u32, value: impl Into<String>) -> Option<String> {
        self.entries.insert(id, value.into())
    }

    /// Removes the entry for `id`, returning its value.
    pub fn remove(&mut self, id: u32) -> Option<String> {
        self.entries.remove(&id)
    }

    /// Returns `true` if the container holds an entry for `id`.
    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, keeping the encoding.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns an iterator over the entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.entries.iter().map(|(&id, value)| (id, value.as_str()))
    }

    /// Returns the ids in ascending order.
    pub fn ids_sorted(&self) -> Vec<u32> {
        let mut ids = self.entries.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// Returns an iterator over the entries in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_unstable_by_key(|&(id, _)| id);
        entries.into_iter()
    }
}

impl From<HashMap<u32, String>> for Container {
    fn from(entries: HashMap<u32, String>) -> Self {
        Self::from_map(entries, StringEncoding::default())
    }
}

impl From<BTreeMap<u32, String>> for Container {
    fn from(entries: BTreeMap<u32, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<(u32, S)> for Container {
    fn from_iter<I: IntoIterator<Item = (u32, S)>>(iter: I) -> Self {
        let mut container = Self::new();
        container.extend(iter);
        container
    }
}

impl<S: Into<String>> Extend<(u32, S)> for Container {
    fn extend<I: IntoIterator<Item = (u32, S)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(id, value)| (id, value.into())));
    }
}
