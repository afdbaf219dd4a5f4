//! Incremental transfer-encoding filters.
//!
//! A [`Filter`] consumes input in arbitrary chunks and appends encoded
//! output to a caller-supplied buffer, so the same transform serves both
//! the streamed path (fed one read at a time) and the buffered path (fed
//! the whole payload at once). Both paths therefore produce identical bytes.

use crate::constants::{LINE_END, LINE_LENGTH};
use crate::encoding::TransferEncoding;
use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Longest line permitted by RFC 5322, excluding the terminator.
const MAX_LINE_LENGTH: usize = 998;

/// Shortest line that still fits one escaped octet plus a soft break.
const MIN_LINE_LENGTH: usize = 4;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Line wrapping configuration for encoding filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Maximum encoded line length, excluding the terminator.
    pub line_length: usize,
    /// Line terminator inserted between encoded lines.
    pub line_break: String,
}

impl FilterConfig {
    /// Creates a configuration with the default line length.
    #[must_use]
    pub fn new(line_break: impl Into<String>) -> Self {
        Self {
            line_length: LINE_LENGTH,
            line_break: line_break.into(),
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::new()
    }

    /// Checks that a filter can be built from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterAttachFailed`] if the line length is outside
    /// `4..=998` or the line break is empty or contains anything other
    /// than CR and LF.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LINE_LENGTH..=MAX_LINE_LENGTH).contains(&self.line_length) {
            return Err(Error::FilterAttachFailed(format!(
                "line length {} outside {MIN_LINE_LENGTH}..={MAX_LINE_LENGTH}",
                self.line_length
            )));
        }
        if self.line_break.is_empty() || !self.line_break.bytes().all(|b| b == b'\r' || b == b'\n')
        {
            return Err(Error::FilterAttachFailed(format!(
                "unsupported line break {:?}",
                self.line_break
            )));
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(LINE_END)
    }
}

/// Builder for filter configuration.
#[derive(Debug, Clone)]
pub struct FilterConfigBuilder {
    line_length: usize,
    line_break: String,
}

impl FilterConfigBuilder {
    /// Creates a builder with the default line length and terminator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line_length: LINE_LENGTH,
            line_break: LINE_END.to_string(),
        }
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn line_length(mut self, line_length: usize) -> Self {
        self.line_length = line_length;
        self
    }

    /// Sets the line terminator.
    #[must_use]
    pub fn line_break(mut self, line_break: impl Into<String>) -> Self {
        self.line_break = line_break.into();
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterAttachFailed`] if the configuration is invalid.
    pub fn build(self) -> Result<FilterConfig> {
        let config = FilterConfig {
            line_length: self.line_length,
            line_break: self.line_break,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for FilterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An encoding transform attached to a content store.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Base64 with line wrapping.
    Base64(Base64Filter),
    /// Quoted-Printable with soft line breaks.
    QuotedPrintable(QuotedPrintableFilter),
}

impl Filter {
    /// Builds the filter for `encoding`.
    ///
    /// Identity encodings need no transform and yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterAttachFailed`] if the configuration is invalid.
    pub fn for_encoding(encoding: TransferEncoding, config: &FilterConfig) -> Result<Option<Self>> {
        if encoding.is_identity() {
            return Ok(None);
        }
        config.validate()?;
        let filter = match encoding {
            TransferEncoding::Base64 => Self::Base64(Base64Filter::new(config)),
            _ => Self::QuotedPrintable(QuotedPrintableFilter::new(config)),
        };
        Ok(Some(filter))
    }

    /// Returns the encoding this filter produces.
    #[must_use]
    pub const fn encoding(&self) -> TransferEncoding {
        match self {
            Self::Base64(_) => TransferEncoding::Base64,
            Self::QuotedPrintable(_) => TransferEncoding::QuotedPrintable,
        }
    }

    /// Encodes `input`, appending to `out`.
    pub fn push(&mut self, input: &[u8], out: &mut Vec<u8>) {
        match self {
            Self::Base64(f) => f.push(input, out),
            Self::QuotedPrintable(f) => f.push(input, out),
        }
    }

    /// Flushes buffered state at end of input.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        match self {
            Self::Base64(f) => f.finish(out),
            Self::QuotedPrintable(f) => f.finish(out),
        }
    }
}

/// Tracks the output column and inserts line breaks.
#[derive(Debug, Clone)]
struct LineWriter {
    column: usize,
    line_length: usize,
    line_break: Vec<u8>,
}

impl LineWriter {
    fn new(config: &FilterConfig) -> Self {
        Self {
            column: 0,
            line_length: config.line_length,
            line_break: config.line_break.as_bytes().to_vec(),
        }
    }

    fn break_line(&mut self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.line_break);
        self.column = 0;
    }
}

/// Base64 encoder wrapping output at a fixed column.
#[derive(Debug, Clone)]
pub struct Base64Filter {
    pending: Vec<u8>,
    lines: LineWriter,
}

impl Base64Filter {
    fn new(config: &FilterConfig) -> Self {
        Self {
            pending: Vec::with_capacity(3),
            lines: LineWriter::new(config),
        }
    }

    fn push(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(input);
        let whole = self.pending.len() - self.pending.len() % 3;
        if whole == 0 {
            return;
        }
        let encoded = STANDARD.encode(&self.pending[..whole]);
        self.pending.drain(..whole);
        self.emit(encoded.as_bytes(), out);
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending.is_empty() {
            return;
        }
        let encoded = STANDARD.encode(&self.pending);
        self.pending.clear();
        self.emit(encoded.as_bytes(), out);
    }

    fn emit(&mut self, encoded: &[u8], out: &mut Vec<u8>) {
        let mut rest = encoded;
        while !rest.is_empty() {
            if self.lines.column == self.lines.line_length {
                self.lines.break_line(out);
            }
            let room = self.lines.line_length - self.lines.column;
            let (line, tail) = rest.split_at(room.min(rest.len()));
            out.extend_from_slice(line);
            self.lines.column += line.len();
            rest = tail;
        }
    }
}

/// Quoted-Printable encoder (RFC 2045 section 6.7).
///
/// Every octet outside printable ASCII is escaped, including CR and LF, so
/// arbitrary binary input survives a round trip. Lines end in a soft break
/// (`=` + terminator) before they exceed the configured length.
#[derive(Debug, Clone)]
pub struct QuotedPrintableFilter {
    held_space: bool,
    lines: LineWriter,
}

impl QuotedPrintableFilter {
    fn new(config: &FilterConfig) -> Self {
        Self {
            held_space: false,
            lines: LineWriter::new(config),
        }
    }

    fn push(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            // A space is literal unless it ends the data.
            if self.held_space {
                self.held_space = false;
                self.emit(&[b' '], out);
            }
            match byte {
                b' ' => self.held_space = true,
                b'!'..=b'<' | b'>'..=b'~' => self.emit(&[byte], out),
                _ => self.emit(&escape(byte), out),
            }
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        if self.held_space {
            self.held_space = false;
            self.emit(&escape(b' '), out);
        }
    }

    fn emit(&mut self, token: &[u8], out: &mut Vec<u8>) {
        // One column stays free for the soft break marker.
        if self.lines.column + token.len() > self.lines.line_length - 1 {
            out.push(b'=');
            self.lines.break_line(out);
        }
        out.extend_from_slice(token);
        self.lines.column += token.len();
    }
}

const fn escape(byte: u8) -> [u8; 3] {
    [
        b'=',
        HEX_UPPER[(byte >> 4) as usize],
        HEX_UPPER[(byte & 0x0F) as usize],
    ]
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

    fn run(encoding: TransferEncoding, config: &FilterConfig, chunks: &[&[u8]]) -> Vec<u8> {
        let mut filter = Filter::for_encoding(encoding, config).unwrap().unwrap();
        let mut out = Vec::new();
        for chunk in chunks {
            filter.push(chunk, &mut out);
        }
        filter.finish(&mut out);
        out
    }

    #[test]
    fn test_config_default() {
        let config = FilterConfig::default();
        assert_eq!(config.line_length, 76);
        assert_eq!(config.line_break, "\r\n");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = FilterConfig::builder()
            .line_length(64)
            .line_break("\n")
            .build()
            .unwrap();
        assert_eq!(config.line_length, 64);
        assert_eq!(config.line_break, "\n");
    }

    #[test]
    fn test_config_rejects_bad_line_break() {
        for line_break in ["", " ", "\r\nX", "<br>"] {
            let err = FilterConfig::new(line_break).validate().unwrap_err();
            assert!(matches!(err, Error::FilterAttachFailed(_)));
        }
    }

    #[test]
    fn test_config_rejects_bad_line_length() {
        assert!(FilterConfig::builder().line_length(3).build().is_err());
        assert!(FilterConfig::builder().line_length(999).build().is_err());
        assert!(FilterConfig::builder().line_length(998).build().is_ok());
    }

    #[test]
    fn test_identity_has_no_filter() {
        let config = FilterConfig::default();
        for encoding in [
            TransferEncoding::SevenBit,
            TransferEncoding::EightBit,
            TransferEncoding::Binary,
        ] {
            assert!(Filter::for_encoding(encoding, &config).unwrap().is_none());
        }
    }

    #[test]
    fn test_identity_skips_validation() {
        let config = FilterConfig::new("");
        assert!(
            Filter::for_encoding(TransferEncoding::EightBit, &config)
                .unwrap()
                .is_none()
        );
        assert!(Filter::for_encoding(TransferEncoding::Base64, &config).is_err());
    }

    #[test]
    fn test_base64_short() {
        let out = run(TransferEncoding::Base64, &FilterConfig::default(), &[&[0, 1, 2, 3]]);
        assert_eq!(out, b"AAECAw==");
    }

    #[test]
    fn test_base64_chunk_boundaries() {
        let config = FilterConfig::default();
        let whole = run(TransferEncoding::Base64, &config, &[b"Hello, World!"]);
        let split = run(
            TransferEncoding::Base64,
            &config,
            &[b"H", b"el", b"lo, W", b"", b"orld!"],
        );
        assert_eq!(whole, b"SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(whole, split);
    }

    #[test]
    fn test_base64_wraps_at_line_length() {
        let data = vec![0xAB; 200];
        let out = run(TransferEncoding::Base64, &FilterConfig::default(), &[&data]);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[..3].iter().all(|l| l.len() == 76));
        assert!(!text.ends_with("\r\n"));
    }

    #[test]
    fn test_base64_exact_line_has_no_trailing_break() {
        // 57 bytes encode to exactly 76 characters.
        let out = run(TransferEncoding::Base64, &FilterConfig::default(), &[&[7u8; 57]]);
        assert_eq!(out.len(), 76);
    }

    #[test]
    fn test_qp_escapes_equals() {
        let out = run(
            TransferEncoding::QuotedPrintable,
            &FilterConfig::default(),
            &[b"Hello=World"],
        );
        assert_eq!(out, b"Hello=3DWorld");
    }

    #[test]
    fn test_qp_escapes_controls_and_high_bytes() {
        let out = run(
            TransferEncoding::QuotedPrintable,
            &FilterConfig::default(),
            &["a\tb\r\nH\u{e9}".as_bytes()],
        );
        assert_eq!(out, b"a=09b=0D=0AH=C3=A9");
    }

    #[test]
    fn test_qp_trailing_space() {
        let config = FilterConfig::default();
        let out = run(TransferEncoding::QuotedPrintable, &config, &[b"a b "]);
        assert_eq!(out, b"a b=20");
        let split = run(TransferEncoding::QuotedPrintable, &config, &[b"a ", b"b ", b""]);
        assert_eq!(split, b"a b=20");
    }

    #[test]
    fn test_qp_soft_breaks() {
        let data = vec![b'x'; 200];
        let out = run(TransferEncoding::QuotedPrintable, &FilterConfig::new("\n"), &[&data]);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));
        assert!(lines[1].ends_with('='));
        assert_eq!(lines[2].len(), 200 - 75 * 2);
    }

    #[test]
    fn test_qp_never_splits_escape() {
        let data = vec![0xFF; 60];
        let out = run(TransferEncoding::QuotedPrintable, &FilterConfig::default(), &[&data]);
        let text = String::from_utf8(out).unwrap();
        for line in text.split("\r\n") {
            assert!(line.len() <= 76);
            let body = line.strip_suffix('=').unwrap_or(line);
            assert_eq!(body.len() % 3, 0);
        }
    }
}
