//! Identifier codec
//!
//! Document identifiers are caller-supplied (usually relative file paths) and
//! may contain spaces, quotes or slashes that the search backends cannot carry.
//! Before they leave the process they are turned into URL-safe base64 tokens
//! without padding, and every token coming back is decoded immediately.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// URL-safe alphabet, never emits `=`, accepts input with or without it.
const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A token that is not valid codec output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid identifier token {token:?}: {reason}")]
    InvalidToken { token: String, reason: String },

    #[error("identifier token {token:?} does not decode to UTF-8")]
    NotUtf8 { token: String },
}

/// Encode an identifier into a protocol-safe token
pub fn encode(id: &str) -> String {
    TOKEN_ENGINE.encode(id.as_bytes())
}

/// Decode a token produced by [`encode`]
///
/// Padded and unpadded tokens are both accepted, as are tokens written with
/// the standard `+`/`/` alphabet.
pub fn decode(token: &str) -> Result<String, DecodeError> {
    let normalized: String = token
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = TOKEN_ENGINE
        .decode(normalized.as_bytes())
        .map_err(|e| DecodeError::InvalidToken {
            token: token.to_string(),
            reason: e.to_string(),
        })?;

    String::from_utf8(bytes).map_err(|_| DecodeError::NotUtf8 {
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_round_trip(id in any::<String>()) {
            prop_assert_eq!(decode(&encode(&id)).unwrap(), id);
        }

        #[test]
        fn prop_tokens_are_command_safe(id in any::<String>()) {
            let token = encode(&id);
            prop_assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            "",
            "a",
            "ab",
            "abc",
            "test/file1.docx",
            "dir with spaces/quote\"d name.pdf",
            "plus+slash/and?query=1",
            "ünïcödé/日本語.txt",
            "emoji 📄.md",
        ];
        for s in samples {
            assert_eq!(decode(&encode(s)).unwrap(), s, "round trip of {:?}", s);
        }
    }

    #[test]
    fn test_encoding_has_no_padding_or_unsafe_chars() {
        for s in ["a", "ab", "abcd", "a/b.txt", "?>?>?>"] {
            let token = encode(s);
            assert!(!token.contains('='), "{} padded", token);
            assert!(
                token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
                "{} has unsafe characters",
                token
            );
        }
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(encode("a/b.txt"), "YS9iLnR4dA");
        assert_eq!(encode("?>"), "Pz4");
    }

    #[test]
    fn test_decode_accepts_padding() {
        assert_eq!(decode("YS9iLnR4dA==").unwrap(), "a/b.txt");
        assert_eq!(decode("YS9iLnR4dA").unwrap(), "a/b.txt");
    }

    #[test]
    fn test_decode_accepts_standard_alphabet() {
        // "?>" is "Pz4" in both alphabets; "~~~" differs
        assert_eq!(encode("~~~"), "fn5-");
        assert_eq!(decode("fn5+").unwrap(), "~~~");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not a token!"),
            Err(DecodeError::InvalidToken { .. })
        ));
        // a single trailing symbol can never be produced by the encoder
        assert!(matches!(decode("YWJjZ"), Err(DecodeError::InvalidToken { .. })));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let token = TOKEN_ENGINE.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&token), Err(DecodeError::NotUtf8 { token }));
    }
}
