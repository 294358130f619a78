//! Byte encodings for the string records of a container.
//!
//! Every string in a container is stored with the same encoding, chosen when
//! the container is constructed. The length prefix of a string record always
//! counts encoded bytes, never characters.

use std::borrow::Cow;
use std::fmt;

/// Errors that can occur while converting between strings and their encoded
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The bytes are not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// UTF-16 data must consist of whole 2-byte code units.
    #[error("UTF-16 data has an odd byte length of {0}")]
    OddLength(usize),

    /// The UTF-16 code units contain an unpaired surrogate.
    #[error("invalid UTF-16: unpaired surrogate")]
    InvalidUtf16,

    /// The character has no representation in the target encoding.
    #[error("character {character:?} cannot be represented in {encoding}")]
    Unrepresentable {
        /// The offending character
        character: char,
        /// The encoding that was asked to represent it
        encoding: StringEncoding,
    },
}

/// The byte encoding applied uniformly to every string of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    /// UTF-8, the default.
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// UTF-16, little-endian code units.
    #[serde(alias = "utf-16le")]
    Utf16Le,
    /// UTF-16, big-endian code units.
    #[serde(alias = "utf-16be")]
    Utf16Be,
    /// ISO-8859-1. Only characters up to U+00FF are representable.
    #[serde(alias = "iso-8859-1")]
    Latin1,
}

impl StringEncoding {
    /// Encodes `value` into bytes. UTF-8 borrows the input.
    pub fn encode<'a>(&self, value: &'a str) -> Result<Cow<'a, [u8]>, EncodingError> {
        match self {
            Self::Utf8 => Ok(Cow::Borrowed(value.as_bytes())),
            Self::Utf16Le => Ok(Cow::Owned(
                value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            )),
            Self::Utf16Be => Ok(Cow::Owned(
                value.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            )),
            Self::Latin1 => value
                .chars()
                .map(|character| {
                    u8::try_from(character).map_err(|_| EncodingError::Unrepresentable {
                        character,
                        encoding: *self,
                    })
                })
                .collect::<Result<Vec<u8>, _>>()
                .map(Cow::Owned),
        }
    }

    /// Decodes `bytes` into an owned string.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        match self {
            Self::Utf8 => Ok(std::str::from_utf8(bytes)?.to_owned()),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, EncodingError> {
    if bytes.len() % 2 != 0 {
        return Err(EncodingError::OddLength(bytes.len()));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect::<Vec<u16>>();

    String::from_utf16(&units).map_err(|_| EncodingError::InvalidUtf16)
}

impl fmt::Display for StringEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Latin1 => "ISO-8859-1",
        };
        f.write_str(name)
    }
}
