//! Round-trip testing for verifying that the whole pipeline (container ->
//! encode -> decode) reproduces the input for a wide variety of tables.

use std::collections::HashMap;

use assert_matches::assert_matches;
use more_asserts::assert_ge;
use proptest::prelude::*;
use test_case::test_case;

use crate::codec::{Decodable, Encodable, Header, MalformedError, POINTER_SIZE};
use crate::{Container, Error, Settings, StringEncoding};

/// Largest id that can start a block.
const MAX_BLOCK_START: u32 = i16::MAX as u32;

fn roundtrip(container: &Container) -> Result<Container, Error> {
    let bytes = container.to_bytes()?;
    assert_eq!(bytes.len(), container.encoded_len()?);

    let strict = Settings { encoding: container.encoding(), strict: true };
    Container::decode(&bytes, &strict)
}

fn entries(pairs: &[(u32, &str)]) -> Container {
    pairs.iter().copied().collect()
}

proptest! {
    #[test]
    fn test_roundtrip_dense_tables(
        entries in prop::collection::hash_map(0..2_000u32, ".{0,24}", 0..300)
    ) {
        let container = Container::from(entries);
        let decoded = roundtrip(&container)?;
        prop_assert_eq!(decoded, container);
    }

    #[test]
    fn test_roundtrip_sparse_tables(
        entries in prop::collection::hash_map(0..=MAX_BLOCK_START, "[a-z0-9 ]{0,12}", 0..100)
    ) {
        let container = Container::from(entries);
        let decoded = roundtrip(&container)?;
        prop_assert_eq!(decoded, container);
    }

    #[test]
    fn test_roundtrip_utf16(
        entries in prop::collection::hash_map(0..500u32, "\\PC{0,16}", 0..50),
        big_endian in any::<bool>(),
    ) {
        let encoding = if big_endian { StringEncoding::Utf16Be } else { StringEncoding::Utf16Le };
        let container = Container::from_map(entries, encoding);
        let decoded = roundtrip(&container)?;
        prop_assert_eq!(decoded, container);
    }

    #[test]
    fn test_decode_corrupted_containers(
        entries in prop::collection::hash_map(0..200u32, "[a-z]{0,8}", 0..40),
        overwrites in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..16),
        truncate in prop::option::of(any::<prop::sample::Index>()),
        strict in any::<bool>(),
    ) {
        let mut bytes = Container::from(entries).to_bytes()?;
        for (position, value) in overwrites {
            // Keep the magic so the corruption reaches the descriptors.
            let position = MAGIC_LEN + position.index(bytes.len() - MAGIC_LEN);
            bytes[position] = value;
        }
        if let Some(len) = truncate {
            bytes.truncate(len.index(bytes.len() + 1));
        }

        check_decode_is_bounded(&bytes, strict)?;
    }

    #[test]
    fn test_decode_hostile_layouts(
        block_count in 0..64i32,
        string_start in 12..512i32,
        body in prop::collection::vec(any::<u8>(), 0..1024),
        strict in any::<bool>(),
    ) {
        let mut bytes = Header { block_count, string_start }.to_bytes().to_vec();
        bytes.extend_from_slice(&body);

        check_decode_is_bounded(&bytes, strict)?;
    }
}

const MAGIC_LEN: usize = 4;

/// Decodes untrusted bytes, which must either fail or produce no more
/// entries than the buffer has room for pointers.
fn check_decode_is_bounded(bytes: &[u8], strict: bool) -> Result<(), TestCaseError> {
    let settings = Settings { strict, ..Settings::default() };
    if let Ok(container) = Container::decode(bytes, &settings) {
        prop_assert!(container.len() <= bytes.len() / POINTER_SIZE);
    }
    Ok(())
}

#[test]
fn test_sample_table_roundtrip() -> Result<(), Error> {
    let container = entries(&[(0, "test"), (1, "test2"), (5, "test3")]);

    let bytes = container.to_bytes()?;
    assert_eq!(&bytes[..4], b"FRSC");
    assert_eq!(i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 2);

    let decoded = Container::from_bytes(&bytes, StringEncoding::Utf8)?;
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded.get(0), Some("test"));
    assert_eq!(decoded.get(1), Some("test2"));
    assert_eq!(decoded.get(5), Some("test3"));
    assert_eq!(decoded, container);

    Ok(())
}

#[test]
fn test_map_then_set_roundtrip() -> Result<(), Error> {
    let map = HashMap::from([
        (0, "test".to_string()),
        (1, "test2".to_string()),
        (5, "test3".to_string()),
    ]);
    let mut container = Container::from(map);
    container.set(2, "test4");
    assert_eq!(container.len(), 4);

    // 2 now joins the first run: [0, 2] and [5].
    assert_eq!(container.blocks()?.len(), 2);
    assert_eq!(roundtrip(&container)?, container);

    Ok(())
}

#[test]
fn test_empty_roundtrip() -> Result<(), Error> {
    let container = Container::new();
    let bytes = container.to_bytes()?;

    assert_eq!(bytes.len(), 12);
    assert!(Container::from_bytes(&bytes, StringEncoding::Utf8)?.is_empty());
    Ok(())
}

#[test_case(&[]; "empty buffer")]
#[test_case(b"FRSC\x00\x00\x00\x00\x0c\x00\x00"; "eleven bytes")]
fn test_short_buffer_is_malformed(bytes: &[u8]) {
    assert_matches!(
        Container::from_bytes(bytes, StringEncoding::Utf8),
        Err(Error::MalformedContainer(MalformedError::TooShort(_)))
    );
}

#[test]
fn test_wrong_magic_is_malformed() -> Result<(), Error> {
    let mut bytes = entries(&[(3, "three")]).to_bytes()?;
    bytes[0] = b'X';

    assert_matches!(
        Container::from_bytes(&bytes, StringEncoding::Utf8),
        Err(Error::MalformedContainer(MalformedError::BadMagic(_)))
    );
    Ok(())
}

#[test]
fn test_length_prefix_counts_bytes() -> Result<(), Error> {
    // Four characters, eleven bytes of UTF-8.
    let value = "é日本🎉";
    assert_eq!(value.len(), 11);

    let bytes = entries(&[(0, value)]).to_bytes()?;
    let record = &bytes[12 + 6 + 4..];
    assert_eq!(u16::from_le_bytes([record[0], record[1]]), 11);
    assert_eq!(&record[2..], value.as_bytes());

    assert_eq!(Container::from_bytes(&bytes, StringEncoding::Utf8)?.get(0), Some(value));
    Ok(())
}

#[test_case(StringEncoding::Utf8; "utf-8")]
#[test_case(StringEncoding::Utf16Le; "utf-16le")]
#[test_case(StringEncoding::Utf16Be; "utf-16be")]
#[test_case(StringEncoding::Latin1; "latin-1")]
fn test_roundtrip_each_encoding(encoding: StringEncoding) -> Result<(), Error> {
    let mut container = Container::with_encoding(encoding);
    container.extend([(0, "plain"), (1, "café"), (2, ""), (40, "naïve")]);

    assert_eq!(roundtrip(&container)?, container);
    Ok(())
}

#[test]
fn test_latin1_bytes_are_not_utf8() -> Result<(), Error> {
    let mut container = Container::with_encoding(StringEncoding::Latin1);
    container.set(1, "café");
    let bytes = container.to_bytes()?;

    // The lone 0xE9 byte is not valid UTF-8.
    assert_matches!(
        Container::from_bytes(&bytes, StringEncoding::Utf8),
        Err(Error::MalformedContainer(MalformedError::InvalidString { id: 1, .. }))
    );
    Ok(())
}

#[test]
fn test_encode_into_buffer_then_decode_tail() -> Result<(), Error> {
    let container = entries(&[(10, "ten"), (11, "eleven"), (20, "twenty")]);
    let mut buffer = b"prefix".to_vec();
    container.encode_into(&mut buffer)?;

    assert_ge!(buffer.len(), 6 + 12);
    let decoded = Container::decode(&buffer[6..], &Settings::default())?;
    assert_eq!(decoded, container);
    Ok(())
}
