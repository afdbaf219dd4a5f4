//! Content-Transfer-Encoding kinds and one-shot encode/decode.
//!
//! Encoding of buffered content goes through the same [`Filter`] the
//! streamed path uses. The decoders are the standard inverses and are
//! lenient about whitespace and line terminators.

use crate::constants::{
    ENCODING_7BIT, ENCODING_8BIT, ENCODING_BASE64, ENCODING_BINARY, ENCODING_QUOTEDPRINTABLE,
};
use crate::error::{Error, Result};
use crate::filter::{Filter, FilterConfig};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII (identity).
    SevenBit,
    /// 8-bit data (identity).
    #[default]
    EightBit,
    /// Binary data (identity).
    Binary,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Base64 encoding.
    Base64,
}

impl TransferEncoding {
    /// Parses a transfer encoding label.
    ///
    /// Unrecognized labels degrade to 7bit identity passthrough.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            ENCODING_7BIT => Self::SevenBit,
            ENCODING_8BIT => Self::EightBit,
            ENCODING_BINARY => Self::Binary,
            ENCODING_QUOTEDPRINTABLE => Self::QuotedPrintable,
            ENCODING_BASE64 => Self::Base64,
            other => {
                tracing::warn!(label = other, "Unrecognized transfer encoding, using 7bit");
                Self::SevenBit
            }
        }
    }

    /// Returns the header label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => ENCODING_7BIT,
            Self::EightBit => ENCODING_8BIT,
            Self::Binary => ENCODING_BINARY,
            Self::QuotedPrintable => ENCODING_QUOTEDPRINTABLE,
            Self::Base64 => ENCODING_BASE64,
        }
    }

    /// Returns true if content passes through unchanged.
    #[must_use]
    pub const fn is_identity(self) -> bool {
        matches!(self, Self::SevenBit | Self::EightBit | Self::Binary)
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TransferEncoding {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Encodes `data` in one pass.
///
/// Identity encodings return the input unchanged, without line wrapping.
///
/// # Errors
///
/// Returns [`Error::FilterAttachFailed`] if `config` is invalid for a
/// wrapping encoding.
pub fn encode(data: &[u8], encoding: TransferEncoding, config: &FilterConfig) -> Result<Vec<u8>> {
    let Some(mut filter) = Filter::for_encoding(encoding, config)? else {
        return Ok(data.to_vec());
    };
    let mut out = Vec::with_capacity(data.len() * 4 / 3 + 4);
    filter.push(data, &mut out);
    filter.finish(&mut out);
    Ok(out)
}

/// Decodes `data` encoded with `encoding`.
///
/// # Errors
///
/// Returns an error if the input is malformed for the encoding.
pub fn decode(data: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(data),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(data),
        _ => Ok(data.to_vec()),
    }
}

/// Encodes data as unwrapped Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Decodes Quoted-Printable data (RFC 2045).
///
/// Soft line breaks may end in CRLF, LF or CR.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut bytes = data.iter().copied().peekable();

    while let Some(byte) = bytes.next() {
        if byte != b'=' {
            result.push(byte);
            continue;
        }

        match bytes.peek() {
            Some(b'\r') => {
                bytes.next();
                if bytes.peek() == Some(&b'\n') {
                    bytes.next();
                }
            }
            Some(b'\n') => {
                bytes.next();
            }
            _ => {
                let high = bytes.next().and_then(hex_value);
                let low = bytes.next().and_then(hex_value);
                match (high, low) {
                    (Some(high), Some(low)) => result.push((high << 4) | low),
                    _ => {
                        return Err(Error::InvalidEncoding(
                            "Incomplete escape sequence".to_string(),
                        ));
                    }
                }
            }
        }
    }

    Ok(result)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("8BIT"), TransferEncoding::EightBit);
        assert_eq!(TransferEncoding::parse(" binary "), TransferEncoding::Binary);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_unknown_encoding_degrades_to_identity() {
        let encoding = TransferEncoding::parse("x-uuencode");
        assert_eq!(encoding, TransferEncoding::SevenBit);
        assert!(encoding.is_identity());
    }

    #[test]
    fn test_transfer_encoding_display() {
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
        assert_eq!(TransferEncoding::default().to_string(), "8bit");
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_decode_wrapped() {
        let decoded = decode_base64(b"SGVsbG8s\r\nIFdvcmxk\nIQ==").unwrap();
        assert_eq!(decoded, b"Hello, World!");
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable(b"H=C3=A9llo").unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());

        let decoded = decode_quoted_printable(b"h=c3=a9").unwrap();
        assert_eq!(decoded, "hé".as_bytes());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        assert_eq!(decode_quoted_printable(b"Hello=\r\nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\nWorld").unwrap(), b"HelloWorld");
        assert_eq!(decode_quoted_printable(b"Hello=\rWorld").unwrap(), b"HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable(b"abc=4").is_err());
        assert!(decode_quoted_printable(b"abc=ZZ").is_err());
    }

    #[test]
    fn test_encode_identity_is_verbatim() {
        let data = vec![b'a'; 300];
        let out = encode(&data, TransferEncoding::EightBit, &FilterConfig::default()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_encode_scenarios() {
        let config = FilterConfig::default();
        assert_eq!(
            encode(b"Hello=World", TransferEncoding::QuotedPrintable, &config).unwrap(),
            b"Hello=3DWorld"
        );
        assert_eq!(
            encode(&[0, 1, 2, 3], TransferEncoding::Base64, &config).unwrap(),
            b"AAECAw=="
        );
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            data in proptest::collection::vec(any::<u8>(), 0..600),
            encoding in prop_oneof![
                Just(TransferEncoding::SevenBit),
                Just(TransferEncoding::EightBit),
                Just(TransferEncoding::Binary),
                Just(TransferEncoding::QuotedPrintable),
                Just(TransferEncoding::Base64),
            ],
            line_break in prop_oneof![Just("\r\n"), Just("\n"), Just("\r")],
        ) {
            let config = FilterConfig::new(line_break);
            let encoded = encode(&data, encoding, &config).unwrap();
            prop_assert_eq!(decode(&encoded, encoding).unwrap(), data);
        }

        #[test]
        fn prop_wrapped_lines_fit(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let config = FilterConfig::default();
            for encoding in [TransferEncoding::QuotedPrintable, TransferEncoding::Base64] {
                let encoded = encode(&data, encoding, &config).unwrap();
                let text = String::from_utf8(encoded).unwrap();
                for line in text.split("\r\n") {
                    prop_assert!(line.len() <= 76);
                }
            }
        }
    }
}
