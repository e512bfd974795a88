//! Envelope codec.
//!
//! Turns raw ciphertext into transport-safe base64 text and back. Encoding
//! wraps lines at 76 characters (MIME style) with a trailing newline; the
//! wrapping carries no meaning and `decode` ignores it.
//!
//! Decoding is lenient on purpose: input that is not valid base64 comes back
//! unchanged, so the codec can be applied to data that may already be raw.
//! Corrupted base64 therefore looks like raw bytes here and only fails later,
//! in the cipher.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::trace;

/// Maximum encoded characters per line.
pub const LINE_WIDTH: usize = 76;

/// Base64-encode `data`, wrapped at [`LINE_WIDTH`] with a newline after every
/// line. Empty input gives an empty string.
pub fn encode(data: impl AsRef<[u8]>) -> String {
    let encoded = STANDARD.encode(data.as_ref());

    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 1);
    // base64 output is ASCII, so byte chunks are valid str boundaries
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        wrapped.push_str(std::str::from_utf8(line).unwrap_or_default());
        wrapped.push('\n');
    }
    wrapped
}

/// Base64-decode `data`, ignoring ASCII whitespace.
///
/// Returns the input bytes unchanged when they are not valid base64.
pub fn decode(data: impl AsRef<[u8]>) -> Vec<u8> {
    let data = data.as_ref();
    let compact: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    match STANDARD.decode(&compact) {
        Ok(decoded) => decoded,
        Err(e) => {
            trace!(error = %e, len = data.len(), "input is not base64, passing through");
            data.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_and_bytes_agree() {
        assert_eq!(encode("hello"), encode(b"hello"));
        assert_eq!(encode("hello"), "aGVsbG8=\n");
    }

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(""), "");
        assert!(decode("").is_empty());
    }

    #[test]
    fn test_encode_wraps_long_output() {
        let encoded = encode(vec![0u8; 120]);
        let lines: Vec<&str> = encoded.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), LINE_WIDTH);
        assert_eq!(lines[1].len(), LINE_WIDTH);
        assert!(encoded.ends_with('\n'));
        assert_eq!(decode(&encoded), vec![0u8; 120]);
    }

    #[test]
    fn test_decode_unwrapped_input() {
        assert_eq!(decode("aGVsbG8="), b"hello");
    }

    #[test]
    fn test_decode_invalid_passes_through() {
        let input = "not-valid-base64!!";
        assert_eq!(decode(input), input.as_bytes());
    }

    #[test]
    fn test_decode_bad_padding_passes_through() {
        assert_eq!(decode("aGVsbG8"), b"aGVsbG8");
    }

    #[test]
    fn test_decode_raw_binary_passes_through() {
        let raw = vec![0xff, 0x00, 0x85, 0x01];
        assert_eq!(decode(&raw), raw);
    }

    #[test]
    fn test_double_encode_single_decode() {
        let once = encode(b"secret");
        let twice = encode(&once);

        // still encoded once, not an error
        assert_eq!(decode(&twice), once.as_bytes());
    }
}
