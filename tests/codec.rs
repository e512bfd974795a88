//! Envelope codec properties.

use keyward::core::codec::{decode, encode, LINE_WIDTH};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        prop_assert_eq!(decode(encode(&data)), data);
    }

    #[test]
    fn prop_lines_fit_width(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let encoded = encode(&data);
        for line in encoded.lines() {
            prop_assert!(line.len() <= LINE_WIDTH);
        }
    }

    #[test]
    fn prop_double_encode_decodes_once(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let once = encode(&data);
        let twice = encode(&once);
        prop_assert_eq!(decode(&twice), once.into_bytes());
    }

    #[test]
    fn prop_non_base64_passes_through(text in "[a-z]{1,16}[!@#$%^&*]{1,4}") {
        prop_assert_eq!(decode(&text), text.into_bytes());
    }
}

#[test]
fn test_invalid_input_returned_unchanged() {
    assert_eq!(decode("not-valid-base64!!"), b"not-valid-base64!!".to_vec());
}

#[test]
fn test_known_vector() {
    assert_eq!(encode("hello"), "aGVsbG8=\n");
    assert_eq!(decode("aGVsbG8=\n"), b"hello".to_vec());
}

#[test]
fn test_wrapped_input_decodes() {
    let data = vec![0xA5u8; 300];
    let encoded = encode(&data);
    assert!(encoded.lines().count() > 1);
    assert_eq!(decode(encoded.replace('\n', "\r\n")), data);
}
