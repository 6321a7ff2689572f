// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn ascii_passes_through() {
    let mut decoder = LossyDecoder::new();
    assert_eq!(decoder.feed(b"hello world"), "hello world");
    assert_eq!(decoder.finish(), "");
}

#[test]
fn multibyte_split_across_chunks() {
    let mut decoder = LossyDecoder::new();
    let bytes = "héllo→".as_bytes();
    // Split mid-way through the 3-byte arrow.
    let split = bytes.len() - 2;
    let mut out = decoder.feed(&bytes[..split]);
    out.push_str(&decoder.feed(&bytes[split..]));
    assert_eq!(out, "héllo→");
    assert_eq!(decoder.finish(), "");
}

#[test]
fn invalid_byte_becomes_replacement() {
    let mut decoder = LossyDecoder::new();
    let out = decoder.feed(b"a\xffb");
    assert_eq!(out, "a\u{FFFD}b");
}

#[test]
fn truncated_sequence_flushes_as_replacement() {
    let mut decoder = LossyDecoder::new();
    // First two bytes of a 3-byte sequence, then EOF.
    let out = decoder.feed(&"→".as_bytes()[..2]);
    assert_eq!(out, "");
    assert_eq!(decoder.finish(), "\u{FFFD}");
    // finish() is idempotent once drained.
    assert_eq!(decoder.finish(), "");
}

#[test]
fn carry_does_not_leak_between_streams() {
    let mut decoder = LossyDecoder::new();
    decoder.feed(&"é".as_bytes()[..1]);
    decoder.finish();
    assert_eq!(decoder.feed(b"ok"), "ok");
}

proptest! {
    /// Feeding a valid UTF-8 string in arbitrary chunkings reproduces it.
    #[test]
    fn arbitrary_chunking_of_valid_utf8(s in "\\PC*", split in 0usize..64) {
        let bytes = s.as_bytes();
        let mut decoder = LossyDecoder::new();
        let mut out = String::new();
        for chunk in bytes.chunks(split.max(1)) {
            out.push_str(&decoder.feed(chunk));
        }
        out.push_str(&decoder.finish());
        prop_assert_eq!(out, s);
    }

    /// The decoder never panics and never loses track of stream position on
    /// arbitrary bytes.
    #[test]
    fn arbitrary_bytes_decode_without_panic(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut decoder = LossyDecoder::new();
        let mut out = decoder.feed(&data);
        out.push_str(&decoder.finish());
        // Every output char is either from the input or a replacement char.
        prop_assert!(out.chars().count() <= data.len() + 1);
    }
}
