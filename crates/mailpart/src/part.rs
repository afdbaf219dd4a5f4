//! A single MIME part and its nested sub-parts.

use crate::constants::TYPE_OCTETSTREAM;
use crate::encoding::TransferEncoding;
use crate::error::Result;
use crate::filter::FilterConfig;
use crate::header::HeaderFields;
use crate::store::{Content, ContentStore, EncodedStream};
use std::any::Any;
use std::fmt::Write as _;
use std::io::Read;

/// One MIME content unit: metadata, payload and child parts.
///
/// The payload lives in a [`ContentStore`]. A part built from a stream
/// handle borrows that handle for `'a` and never closes it.
///
/// Children are owned. Because [`add_sub_part`](Self::add_sub_part) takes
/// the child by value, a part can never be its own descendant.
#[derive(Debug)]
pub struct Part<'a> {
    content_type: String,
    encoding: TransferEncoding,
    id: Option<String>,
    disposition: Option<String>,
    filename: Option<String>,
    description: Option<String>,
    charset: Option<String>,
    boundary: Option<String>,
    location: Option<String>,
    language: Option<String>,
    sub_parts: Vec<Part<'a>>,
    store: ContentStore<'a>,
}

impl<'a> Part<'a> {
    /// Creates an `application/octet-stream`, 8bit part holding `content`.
    pub fn new(content: impl Into<Content<'a>>) -> Self {
        Self {
            content_type: TYPE_OCTETSTREAM.to_string(),
            encoding: TransferEncoding::default(),
            id: None,
            disposition: None,
            filename: None,
            description: None,
            charset: None,
            boundary: None,
            location: None,
            language: None,
            sub_parts: Vec::new(),
            store: ContentStore::new(content),
        }
    }

    /// Creates a part builder.
    pub fn builder(content: impl Into<Content<'a>>) -> PartBuilder<'a> {
        PartBuilder::new(content)
    }

    /// Replaces the payload.
    pub fn set_content(&mut self, content: impl Into<Content<'a>>) -> &mut Self {
        self.store.set_content(content);
        self
    }

    /// Replaces the payload from a type-erased value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentKind`](crate::Error::InvalidContentKind)
    /// if the value is neither bytes nor a stream handle. The current
    /// payload is kept. See [`Content::from_any`] for the accepted types.
    pub fn try_set_content(&mut self, value: Box<dyn Any>) -> Result<&mut Self> {
        self.store.try_set_content(value)?;
        Ok(self)
    }

    /// Returns true if the payload is a stream handle.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        self.store.is_stream()
    }

    /// Returns the encoded payload.
    ///
    /// Streamed content is read through the encoding filter to the end and
    /// the source is rewound if it is seekable. A non-seekable source is
    /// left drained, so a second call returns only the encoder's empty
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterAttachFailed`](crate::Error::FilterAttachFailed)
    /// if `line_break` is rejected, or an I/O error from the stream.
    pub fn content(&mut self, line_break: &str) -> Result<Vec<u8>> {
        let config = FilterConfig::new(line_break);
        if !self.store.is_stream() {
            return self.store.encoded_bytes(self.encoding, &config);
        }

        let mut encoded = Vec::new();
        let drained = self
            .store
            .encoded_stream(self.encoding, &config)?
            .read_to_end(&mut encoded);
        // Rewind even after a failed read so the next call starts over.
        let rewound = self.store.rewind_if_seekable();
        drained?;
        rewound?;
        tracing::trace!(len = encoded.len(), encoding = %self.encoding, "Drained encoded stream");
        Ok(encoded)
    }

    /// Returns the unencoded payload.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or rewinding the stream fails.
    pub fn raw_content(&mut self) -> Result<Vec<u8>> {
        self.store.raw_bytes()
    }

    /// Returns a reader over the encoded stream without draining it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAStream`](crate::Error::NotAStream) for buffered
    /// content, or
    /// [`Error::FilterAttachFailed`](crate::Error::FilterAttachFailed) if
    /// `line_break` is rejected.
    pub fn encoded_stream(&mut self, line_break: &str) -> Result<EncodedStream<'_, 'a>> {
        let encoding = self.encoding;
        self.store
            .encoded_stream(encoding, &FilterConfig::new(line_break))
    }

    /// Returns buffered content encoded in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAStream`](crate::Error::NotAStream) for streamed
    /// content.
    pub fn encoded_bytes(&self, line_break: &str) -> Result<Vec<u8>> {
        self.store
            .encoded_bytes(self.encoding, &FilterConfig::new(line_break))
    }

    /// Appends a child part.
    ///
    /// The child is moved in, so a part cannot be added to itself:
    ///
    /// ```compile_fail
    /// use mailpart::Part;
    ///
    /// let mut part = Part::new("body");
    /// part.add_sub_part(part);
    /// ```
    pub fn add_sub_part(&mut self, part: Self) -> &mut Self {
        self.sub_parts.push(part);
        self
    }

    /// Replaces all child parts.
    pub fn set_sub_parts(&mut self, parts: Vec<Self>) -> &mut Self {
        self.sub_parts = parts;
        self
    }

    /// Returns the child parts in insertion order.
    #[must_use]
    pub fn sub_parts(&self) -> &[Self] {
        &self.sub_parts
    }

    /// Returns the child parts for reading their content.
    pub fn sub_parts_mut(&mut self) -> &mut [Self] {
        &mut self.sub_parts
    }

    /// Builds the header fields from the current metadata.
    #[must_use]
    pub fn header_fields(&self, line_break: &str) -> HeaderFields {
        let mut fields = HeaderFields::new();

        let mut content_type = self.content_type.clone();
        if let Some(charset) = &self.charset {
            let _ = write!(content_type, "; charset={charset}");
        }
        if let Some(boundary) = &self.boundary {
            let _ = write!(content_type, ";{line_break} boundary=\"{boundary}\"");
        }
        fields.push("Content-Type", content_type);
        fields.push("Content-Transfer-Encoding", self.encoding.as_str());

        if let Some(id) = &self.id {
            fields.push("Content-ID", format!("<{id}>"));
        }
        if let Some(disposition) = &self.disposition {
            let value = match &self.filename {
                Some(filename) => format!("{disposition}; filename=\"{filename}\""),
                None => disposition.clone(),
            };
            fields.push("Content-Disposition", value);
        }
        if let Some(description) = &self.description {
            fields.push("Content-Description", description.as_str());
        }
        if let Some(location) = &self.location {
            fields.push("Content-Location", location.as_str());
        }
        if let Some(language) = &self.language {
            fields.push("Content-Language", language.as_str());
        }

        fields
    }

    /// Renders the header fields, each terminated by `line_break`.
    #[must_use]
    pub fn header_block(&self, line_break: &str) -> String {
        self.header_fields(line_break).to_block(line_break)
    }

    /// Returns true if the content type is `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type
            .get(..10)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
    }

    /// Sets the media type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = content_type.into();
        self
    }

    /// Sets the transfer encoding. Unrecognized labels become 7bit.
    pub fn set_encoding(&mut self, encoding: impl Into<TransferEncoding>) -> &mut Self {
        self.encoding = encoding.into();
        self
    }

    /// Sets the Content-ID, without angle brackets.
    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the disposition, e.g. `attachment` or `inline`.
    pub fn set_disposition(&mut self, disposition: impl Into<String>) -> &mut Self {
        self.disposition = Some(disposition.into());
        self
    }

    /// Sets the filename reported with the disposition.
    pub fn set_filename(&mut self, filename: impl Into<String>) -> &mut Self {
        self.filename = Some(filename.into());
        self
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the charset label.
    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the multipart boundary.
    pub fn set_boundary(&mut self, boundary: impl Into<String>) -> &mut Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Sets the content location.
    pub fn set_location(&mut self, location: impl Into<String>) -> &mut Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the content language.
    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.language = Some(language.into());
        self
    }

    /// Returns the media type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the transfer encoding.
    #[must_use]
    pub const fn encoding(&self) -> TransferEncoding {
        self.encoding
    }

    /// Returns the Content-ID.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the disposition.
    #[must_use]
    pub fn disposition(&self) -> Option<&str> {
        self.disposition.as_deref()
    }

    /// Returns the filename.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the charset label.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Returns the multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    /// Returns the content location.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Returns the content language.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl Default for Part<'_> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Builder for a [`Part`].
#[derive(Debug)]
pub struct PartBuilder<'a> {
    part: Part<'a>,
}

impl<'a> PartBuilder<'a> {
    /// Creates a builder for a part holding `content`.
    pub fn new(content: impl Into<Content<'a>>) -> Self {
        Self {
            part: Part::new(content),
        }
    }

    /// Sets the media type.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.part.set_content_type(content_type);
        self
    }

    /// Sets the transfer encoding.
    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<TransferEncoding>) -> Self {
        self.part.set_encoding(encoding);
        self
    }

    /// Sets the Content-ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.part.set_id(id);
        self
    }

    /// Sets the disposition.
    #[must_use]
    pub fn disposition(mut self, disposition: impl Into<String>) -> Self {
        self.part.set_disposition(disposition);
        self
    }

    /// Sets the filename.
    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.part.set_filename(filename);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.part.set_description(description);
        self
    }

    /// Sets the charset label.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.part.set_charset(charset);
        self
    }

    /// Sets the multipart boundary.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.part.set_boundary(boundary);
        self
    }

    /// Sets the content location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.part.set_location(location);
        self
    }

    /// Sets the content language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.part.set_language(language);
        self
    }

    /// Appends a child part.
    #[must_use]
    pub fn sub_part(mut self, part: Part<'a>) -> Self {
        self.part.add_sub_part(part);
        self
    }

    /// Builds the part.
    #[must_use]
    pub fn build(self) -> Part<'a> {
        self.part
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
    use crate::Error;
    use crate::stream::{ContentStream, Seekable, Sequential};
    use std::io::{self, Cursor};

    /// Seekable source whose first read past byte four fails.
    struct Flaky {
        inner: Cursor<Vec<u8>>,
        failed: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= 4 && !self.failed {
                self.failed = true;
                return Err(io::Error::other("connection reset"));
            }
            let limit = buf.len().min(4);
            self.inner.read(&mut buf[..limit])
        }
    }

    impl ContentStream for Flaky {
        fn seekable(&self) -> bool {
            true
        }

        fn rewind_to_start(&mut self) -> io::Result<()> {
            self.inner.set_position(0);
            Ok(())
        }
    }

    #[test]
    fn test_part_defaults() {
        let part = Part::new("body");
        assert_eq!(part.content_type(), "application/octet-stream");
        assert_eq!(part.encoding(), TransferEncoding::EightBit);
        assert!(part.id().is_none());
        assert!(part.sub_parts().is_empty());
        assert!(!part.is_stream());
    }

    #[test]
    fn test_minimal_headers() {
        let part = Part::new("body");
        let fields = part.header_fields("\r\n").into_vec();
        assert_eq!(
            fields,
            vec![
                ("Content-Type".to_string(), "application/octet-stream".to_string()),
                ("Content-Transfer-Encoding".to_string(), "8bit".to_string()),
            ]
        );
    }

    #[test]
    fn test_full_header_order() {
        let part = Part::builder("x")
            .content_type("text/plain")
            .charset("utf-8")
            .encoding(TransferEncoding::QuotedPrintable)
            .id("part1@example.com")
            .disposition("inline")
            .description("greeting")
            .location("http://example.com/x")
            .language("en")
            .build();

        let names: Vec<String> = part
            .header_fields("\r\n")
            .names()
            .map(str::to_string)
            .collect();
        assert_eq!(
            names,
            [
                "Content-Type",
                "Content-Transfer-Encoding",
                "Content-ID",
                "Content-Disposition",
                "Content-Description",
                "Content-Location",
                "Content-Language",
            ]
        );

        let fields = part.header_fields("\r\n");
        assert_eq!(fields.get("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(fields.get("Content-ID"), Some("<part1@example.com>"));
        assert_eq!(fields.get("Content-Disposition"), Some("inline"));
    }

    #[test]
    fn test_disposition_with_filename() {
        let mut part = Part::new(b"%PDF");
        part.set_disposition("attachment").set_filename("report.pdf");
        assert_eq!(
            part.header_fields("\r\n").get("Content-Disposition"),
            Some("attachment; filename=\"report.pdf\"")
        );
    }

    #[test]
    fn test_filename_without_disposition_is_ignored() {
        let mut part = Part::new("x");
        part.set_filename("lonely.txt");
        assert!(part.header_fields("\n").get("Content-Disposition").is_none());
    }

    #[test]
    fn test_multipart_boundary_continuation() {
        let part = Part::builder("")
            .content_type("multipart/alternative")
            .charset("utf-8")
            .boundary("=_b1")
            .build();

        let fields = part.header_fields("\r\n");
        assert_eq!(
            fields.get("Content-Type"),
            Some("multipart/alternative; charset=utf-8;\r\n boundary=\"=_b1\"")
        );
        assert!(part.is_multipart());
    }

    #[test]
    fn test_header_block() {
        let part = Part::builder("x")
            .content_type("text/html")
            .encoding("base64")
            .language("fr")
            .build();

        assert_eq!(
            part.header_block("\n"),
            "Content-Type: text/html\nContent-Transfer-Encoding: base64\nContent-Language: fr\n"
        );
    }

    #[test]
    fn test_header_fields_are_pure() {
        let part = Part::builder("x").id("a@b").boundary("q").build();
        assert_eq!(part.header_fields("\r\n"), part.header_fields("\r\n"));
    }

    #[test]
    fn test_headers_follow_mutation() {
        let mut part = Part::new("x");
        assert!(part.header_fields("\n").get("Content-ID").is_none());
        part.set_id("late@example.com");
        assert_eq!(
            part.header_fields("\n").get("Content-ID"),
            Some("<late@example.com>")
        );
    }

    #[test]
    fn test_unknown_encoding_label() {
        let mut part = Part::new("raw bytes");
        part.set_encoding("x-custom");
        assert_eq!(part.encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.content("\r\n").unwrap(), b"raw bytes");
    }

    #[test]
    fn test_buffered_content() {
        let mut part = Part::new("Hello=World");
        part.set_encoding(TransferEncoding::QuotedPrintable);
        assert_eq!(part.content("\r\n").unwrap(), b"Hello=3DWorld");

        let mut part = Part::new(vec![0u8, 1, 2, 3]);
        part.set_encoding(TransferEncoding::Base64);
        assert_eq!(part.content("\r\n").unwrap(), b"AAECAw==");
    }

    #[test]
    fn test_buffered_identity_is_not_wrapped() {
        let data = "a".repeat(200);
        let mut part = Part::new(data.as_str());
        assert_eq!(part.content("\r\n").unwrap(), data.as_bytes());
    }

    #[test]
    fn test_streamed_content_rewinds_seekable() {
        let mut source = Seekable::new(Cursor::new(vec![0u8, 1, 2, 3]));
        let mut part = Part::new(Content::stream(&mut source));
        part.set_encoding(TransferEncoding::Base64);

        assert_eq!(part.content("\r\n").unwrap(), b"AAECAw==");
        assert_eq!(part.content("\r\n").unwrap(), b"AAECAw==");
        assert_eq!(part.raw_content().unwrap(), vec![0u8, 1, 2, 3]);
    }

    #[test]
    fn test_failed_read_rewinds_seekable() {
        let mut part = Part::new(Content::stream(Flaky {
            inner: Cursor::new(b"0123456789".to_vec()),
            failed: false,
        }));
        part.set_encoding(TransferEncoding::Base64);

        assert!(matches!(part.content("\r\n").unwrap_err(), Error::Io(_)));
        assert_eq!(part.content("\r\n").unwrap(), b"MDEyMzQ1Njc4OQ==");
        assert_eq!(part.raw_content().unwrap(), b"0123456789");
    }

    #[test]
    fn test_streamed_content_drains_sequential() {
        let mut part = Part::new(Content::stream(Sequential::new(&b"Hello=World"[..])));
        part.set_encoding(TransferEncoding::QuotedPrintable);

        assert_eq!(part.content("\n").unwrap(), b"Hello=3DWorld");
        assert!(part.content("\n").unwrap().is_empty());
    }

    #[test]
    fn test_switch_to_stream_invalidates_buffered_path() {
        let mut part = Part::new("buffered");
        assert!(part.encoded_bytes("\r\n").is_ok());
        assert!(matches!(
            part.encoded_stream("\r\n").unwrap_err(),
            Error::NotAStream { .. }
        ));

        part.set_content(Content::stream(Cursor::new(b"streamed".to_vec())));
        assert!(matches!(
            part.encoded_bytes("\r\n").unwrap_err(),
            Error::NotAStream { .. }
        ));
        assert!(part.encoded_stream("\r\n").is_ok());
    }

    #[test]
    fn test_encoded_stream_is_not_drained() {
        let mut source = Cursor::new(b"abc".to_vec());
        {
            let mut part = Part::new(Content::stream(&mut source));
            part.set_encoding(TransferEncoding::Base64);
            let stream = part.encoded_stream("\r\n").unwrap();
            assert_eq!(stream.filter_encoding(), Some(TransferEncoding::Base64));
        }
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_invalid_line_break() {
        let mut part = Part::new(Content::stream(Cursor::new(b"abc".to_vec())));
        part.set_encoding(TransferEncoding::Base64);
        assert!(matches!(
            part.content("|").unwrap_err(),
            Error::FilterAttachFailed(_)
        ));
    }

    #[test]
    fn test_try_set_content_rejects_other_kinds() {
        let mut part = Part::new("original");
        let err = part.try_set_content(Box::new(3.5_f64)).unwrap_err();
        assert!(matches!(err, Error::InvalidContentKind(_)));
        assert_eq!(part.raw_content().unwrap(), b"original");

        part.try_set_content(Box::new(String::from("replaced"))).unwrap();
        assert_eq!(part.raw_content().unwrap(), b"replaced");
    }

    #[test]
    fn test_sub_parts_keep_order() {
        let mut root = Part::new("");
        root.set_content_type("multipart/mixed").set_boundary("outer");
        root.add_sub_part(Part::builder("first").content_type("text/plain").build())
            .add_sub_part(Part::builder("second").content_type("text/html").build());

        let types: Vec<&str> = root.sub_parts().iter().map(Part::content_type).collect();
        assert_eq!(types, ["text/plain", "text/html"]);
    }

    #[test]
    fn test_set_sub_parts_replaces() {
        let mut root = Part::builder("").sub_part(Part::new("old")).build();
        root.set_sub_parts(vec![Part::new("a"), Part::new("b")]);
        assert_eq!(root.sub_parts().len(), 2);
        assert_eq!(root.sub_parts_mut()[1].raw_content().unwrap(), b"b");
    }
}
