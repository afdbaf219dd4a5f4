//! Payload storage for a MIME part.
//!
//! A [`ContentStore`] holds either buffered bytes or a stream handle, never
//! both. Streamed content is encoded through a single active [`Filter`]
//! slot: asking for an encoded stream again replaces the filter instead of
//! layering a second one on top.

use crate::encoding::{self, TransferEncoding};
use crate::error::{Error, Result};
use crate::filter::{Filter, FilterConfig};
use crate::stream::{ContentStream, Seekable, Sequential};
use std::any::Any;
use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read};

/// Bytes pulled from the source per encoding step.
const CHUNK_SIZE: usize = 8 * 1024;

/// Content accepted by a part: in-memory bytes or a stream handle.
pub enum Content<'a> {
    /// Bytes held in memory.
    Bytes(Vec<u8>),
    /// A stream read on demand.
    Stream(Box<dyn ContentStream + 'a>),
}

impl<'a> Content<'a> {
    /// Wraps a stream handle.
    pub fn stream<S: ContentStream + 'a>(stream: S) -> Self {
        Self::Stream(Box::new(stream))
    }

    /// Returns true if this is a stream handle.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl Content<'static> {
    /// Converts a type-erased value into content.
    ///
    /// Accepts `Vec<u8>`, `String`, `&'static str` and `&'static [u8]` as
    /// bytes. Streams are accepted as `Box<dyn ContentStream>`, or boxed as
    /// one of the common concrete sources: `Cursor<Vec<u8>>`,
    /// `Seekable<File>` and `Sequential<File>`. Other stream types must be
    /// erased to `Box<dyn ContentStream>` before boxing as `Any`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentKind`] for any other type.
    pub fn from_any(value: Box<dyn Any>) -> Result<Self> {
        let value = match value.downcast::<Vec<u8>>() {
            Ok(bytes) => return Ok(Self::Bytes(*bytes)),
            Err(value) => value,
        };
        let value = match value.downcast::<String>() {
            Ok(text) => return Ok(Self::Bytes(text.into_bytes())),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static str>() {
            Ok(text) => return Ok(Self::Bytes(text.as_bytes().to_vec())),
            Err(value) => value,
        };
        let value = match value.downcast::<&'static [u8]>() {
            Ok(bytes) => return Ok(Self::Bytes(bytes.to_vec())),
            Err(value) => value,
        };
        let value = match value.downcast::<Box<dyn ContentStream>>() {
            Ok(stream) => return Ok(Self::Stream(*stream)),
            Err(value) => value,
        };
        let value = match value.downcast::<Cursor<Vec<u8>>>() {
            Ok(cursor) => return Ok(Self::Stream(cursor)),
            Err(value) => value,
        };
        let value = match value.downcast::<Seekable<File>>() {
            Ok(file) => return Ok(Self::Stream(file)),
            Err(value) => value,
        };
        match value.downcast::<Sequential<File>>() {
            Ok(file) => Ok(Self::Stream(file)),
            Err(_) => Err(Error::InvalidContentKind(
                "expected a byte sequence or a stream handle".to_string(),
            )),
        }
    }
}

impl fmt::Debug for Content<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(stream) => f
                .debug_struct("Stream")
                .field("seekable", &stream.seekable())
                .finish(),
        }
    }
}

impl From<Vec<u8>> for Content<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Content<'_> {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Content<'_> {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for Content<'_> {
    fn from(text: String) -> Self {
        Self::Bytes(text.into_bytes())
    }
}

impl From<&str> for Content<'_> {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

impl<'a> From<Box<dyn ContentStream + 'a>> for Content<'a> {
    fn from(stream: Box<dyn ContentStream + 'a>) -> Self {
        Self::Stream(stream)
    }
}

enum Payload<'a> {
    Buffered(Vec<u8>),
    Streamed(Box<dyn ContentStream + 'a>),
}

impl<'a> From<Content<'a>> for Payload<'a> {
    fn from(content: Content<'a>) -> Self {
        match content {
            Content::Bytes(bytes) => Self::Buffered(bytes),
            Content::Stream(stream) => Self::Streamed(stream),
        }
    }
}

/// Owns a part's payload and its active encoding filter.
pub struct ContentStore<'a> {
    payload: Payload<'a>,
    filter: Option<Filter>,
}

impl<'a> ContentStore<'a> {
    /// Creates a store holding `content`.
    pub fn new(content: impl Into<Content<'a>>) -> Self {
        Self {
            payload: content.into().into(),
            filter: None,
        }
    }

    /// Replaces the content, detaching any filter.
    pub fn set_content(&mut self, content: impl Into<Content<'a>>) {
        let content = content.into();
        tracing::debug!(
            from_stream = self.is_stream(),
            to_stream = content.is_stream(),
            "Replacing content"
        );
        self.payload = content.into();
        self.filter = None;
    }

    /// Replaces the content from a type-erased value.
    ///
    /// The conversion happens first, so a rejected value leaves the
    /// current content and filter untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentKind`] if the value is neither bytes
    /// nor a stream handle.
    pub fn try_set_content(&mut self, value: Box<dyn Any>) -> Result<()> {
        let content: Content<'a> = Content::from_any(value)?;
        self.set_content(content);
        Ok(())
    }

    /// Returns true if the content is a stream handle.
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self.payload, Payload::Streamed(_))
    }

    /// Returns the encoding of the attached filter, if any.
    #[must_use]
    pub fn active_filter(&self) -> Option<TransferEncoding> {
        self.filter.as_ref().map(Filter::encoding)
    }

    /// Returns the unencoded payload.
    ///
    /// Streamed content is drained to the end. A seekable stream is then
    /// rewound so it can be read again; a non-seekable one stays drained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if reading or rewinding fails.
    pub fn raw_bytes(&mut self) -> Result<Vec<u8>> {
        match &mut self.payload {
            Payload::Buffered(bytes) => Ok(bytes.clone()),
            Payload::Streamed(stream) => {
                let mut bytes = Vec::new();
                let drained = stream.read_to_end(&mut bytes);
                let rewound = self.rewind_if_seekable();
                drained?;
                rewound?;
                tracing::trace!(len = bytes.len(), "Drained raw stream");
                Ok(bytes)
            }
        }
    }

    /// Returns a reader producing the stream encoded with `encoding`.
    ///
    /// The previous filter, if any, is replaced by a fresh one. Identity
    /// encodings attach no filter and pass bytes through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAStream`] for buffered content, or
    /// [`Error::FilterAttachFailed`] if `config` is rejected. On failure
    /// the previous filter stays attached.
    pub fn encoded_stream(
        &mut self,
        encoding: TransferEncoding,
        config: &FilterConfig,
    ) -> Result<EncodedStream<'_, 'a>> {
        let Payload::Streamed(source) = &mut self.payload else {
            return Err(Error::not_a_stream());
        };

        let filter = Filter::for_encoding(encoding, config)?;
        if let Some(previous) = self.filter.take() {
            tracing::debug!(encoding = %previous.encoding(), "Detaching filter");
        }
        if filter.is_some() {
            tracing::debug!(%encoding, line_length = config.line_length, "Attaching filter");
        }
        self.filter = filter;

        Ok(EncodedStream {
            source: &mut **source,
            filter: self.filter.as_mut(),
            buffer: Vec::new(),
            position: 0,
            finished: false,
        })
    }

    /// Encodes buffered content in one pass.
    ///
    /// Identity encodings return the bytes unchanged, with no wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAStream`] for streamed content, or
    /// [`Error::FilterAttachFailed`] if `config` is rejected.
    pub fn encoded_bytes(&self, encoding: TransferEncoding, config: &FilterConfig) -> Result<Vec<u8>> {
        match &self.payload {
            Payload::Buffered(bytes) => encoding::encode(bytes, encoding, config),
            Payload::Streamed(_) => Err(Error::not_buffered()),
        }
    }

    /// Rewinds streamed content if the stream is seekable.
    ///
    /// Returns true if a rewind happened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the seek fails.
    pub fn rewind_if_seekable(&mut self) -> Result<bool> {
        match &mut self.payload {
            Payload::Streamed(stream) if stream.seekable() => {
                stream.rewind_to_start()?;
                tracing::trace!("Rewound stream");
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl Default for ContentStore<'_> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for ContentStore<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ContentStore");
        match &self.payload {
            Payload::Buffered(bytes) => s.field("buffered", &bytes.len()),
            Payload::Streamed(stream) => s.field("streamed_seekable", &stream.seekable()),
        };
        s.field("filter", &self.active_filter()).finish()
    }
}

/// Reader over a stream passed through the active encoding filter.
pub struct EncodedStream<'s, 'a> {
    source: &'s mut (dyn ContentStream + 'a),
    filter: Option<&'s mut Filter>,
    buffer: Vec<u8>,
    position: usize,
    finished: bool,
}

impl EncodedStream<'_, '_> {
    /// Returns the encoding applied by the attached filter, if any.
    #[must_use]
    pub fn filter_encoding(&self) -> Option<TransferEncoding> {
        self.filter.as_deref().map(Filter::encoding)
    }
}

impl Read for EncodedStream<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let Some(filter) = self.filter.as_deref_mut() else {
            return self.source.read(buf);
        };

        while self.position == self.buffer.len() {
            if self.finished {
                return Ok(0);
            }
            self.buffer.clear();
            self.position = 0;

            let mut chunk = [0u8; CHUNK_SIZE];
            let n = self.source.read(&mut chunk)?;
            if n == 0 {
                filter.finish(&mut self.buffer);
                self.finished = true;
            } else {
                filter.push(&chunk[..n], &mut self.buffer);
            }
        }

        let available = &self.buffer[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

impl fmt::Debug for EncodedStream<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedStream")
            .field("filter", &self.filter_encoding())
            .field("buffered", &(self.buffer.len() - self.position))
            .field("finished", &self.finished)
            .finish()
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
    use std::collections::HashMap;

    /// Seekable reader that fails once after the first four bytes.
    struct FailOnce {
        inner: Cursor<Vec<u8>>,
        failed: bool,
    }

    impl FailOnce {
        fn new(data: &[u8]) -> Self {
            Self {
                inner: Cursor::new(data.to_vec()),
                failed: false,
            }
        }
    }

    impl Read for FailOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= 4 && !self.failed {
                self.failed = true;
                return Err(io::Error::other("connection reset"));
            }
            let limit = buf.len().min(4);
            self.inner.read(&mut buf[..limit])
        }
    }

    impl ContentStream for FailOnce {
        fn seekable(&self) -> bool {
            true
        }

        fn rewind_to_start(&mut self) -> io::Result<()> {
            self.inner.rewind_to_start()
        }
    }

    fn drain(store: &mut ContentStore<'_>, encoding: TransferEncoding) -> Vec<u8> {
        let mut out = Vec::new();
        store
            .encoded_stream(encoding, &FilterConfig::default())
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_mode_follows_content() {
        let mut store = ContentStore::new("text");
        assert!(!store.is_stream());

        store.set_content(Content::stream(Cursor::new(b"abc".to_vec())));
        assert!(store.is_stream());

        store.set_content(b"back");
        assert!(!store.is_stream());
    }

    #[test]
    fn test_from_any_accepts_bytes_and_streams() {
        assert!(!Content::from_any(Box::new(b"x".to_vec())).unwrap().is_stream());
        assert!(!Content::from_any(Box::new("x")).unwrap().is_stream());
        assert!(!Content::from_any(Box::new(String::from("x"))).unwrap().is_stream());

        let stream: Box<dyn ContentStream> = Box::new(Cursor::new(vec![1u8]));
        assert!(Content::from_any(Box::new(stream)).unwrap().is_stream());
    }

    #[test]
    fn test_from_any_accepts_concrete_streams() {
        let cursor = Content::from_any(Box::new(Cursor::new(b"abc".to_vec()))).unwrap();
        assert!(cursor.is_stream());

        let mut store = ContentStore::new("buffered");
        store
            .try_set_content(Box::new(Cursor::new(b"abc".to_vec())))
            .unwrap();
        assert!(store.is_stream());
        assert_eq!(store.raw_bytes().unwrap(), b"abc");
    }

    #[test]
    fn test_invalid_content_kind_keeps_state() {
        let mut store = ContentStore::new("keep me");
        let err = store
            .try_set_content(Box::new(HashMap::<String, String>::new()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidContentKind(_)));
        assert!(!store.is_stream());
        assert_eq!(store.raw_bytes().unwrap(), b"keep me");
    }

    #[test]
    fn test_raw_bytes_buffered_is_repeatable() {
        let mut store = ContentStore::new(vec![0u8, 255, 10]);
        assert_eq!(store.raw_bytes().unwrap(), vec![0u8, 255, 10]);
        assert_eq!(store.raw_bytes().unwrap(), vec![0u8, 255, 10]);
    }

    #[test]
    fn test_raw_bytes_seekable_stream_rewinds() {
        let mut store = ContentStore::new(Content::stream(Seekable::new(Cursor::new(
            b"payload".to_vec(),
        ))));
        assert_eq!(store.raw_bytes().unwrap(), b"payload");
        assert_eq!(store.raw_bytes().unwrap(), b"payload");
    }

    #[test]
    fn test_raw_bytes_sequential_stream_drains() {
        let mut store = ContentStore::new(Content::stream(Sequential::new(&b"once"[..])));
        assert_eq!(store.raw_bytes().unwrap(), b"once");
        assert!(store.raw_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_raw_bytes_rewinds_after_read_error() {
        let mut store = ContentStore::new(Content::stream(FailOnce::new(b"0123456789")));
        assert!(matches!(store.raw_bytes().unwrap_err(), Error::Io(_)));
        assert_eq!(store.raw_bytes().unwrap(), b"0123456789");
    }

    #[test]
    fn test_encoded_stream_requires_stream() {
        let mut store = ContentStore::new("buffered");
        let err = store
            .encoded_stream(TransferEncoding::Base64, &FilterConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotAStream { stream_required: true }));
    }

    #[test]
    fn test_encoded_bytes_requires_buffer() {
        let store = ContentStore::new(Content::stream(Cursor::new(Vec::<u8>::new())));
        let err = store
            .encoded_bytes(TransferEncoding::Base64, &FilterConfig::default())
            .unwrap_err();
        assert!(err.is_mode_mismatch());
    }

    #[test]
    fn test_identity_stream_passes_through() {
        let data = vec![b'z'; 500];
        let mut store = ContentStore::new(Content::stream(Cursor::new(data.clone())));
        assert_eq!(drain(&mut store, TransferEncoding::EightBit), data);
        assert_eq!(store.active_filter(), None);
    }

    #[test]
    fn test_streamed_matches_buffered() {
        let data: Vec<u8> = (0..=255u8).cycle().take(CHUNK_SIZE * 2 + 17).collect();
        let config = FilterConfig::default();
        for encoding in [TransferEncoding::QuotedPrintable, TransferEncoding::Base64] {
            let buffered = ContentStore::new(data.clone())
                .encoded_bytes(encoding, &config)
                .unwrap();
            let mut streamed = ContentStore::new(Content::stream(Cursor::new(data.clone())));
            assert_eq!(drain(&mut streamed, encoding), buffered);
        }
    }

    #[test]
    fn test_filter_is_replaced_not_stacked() {
        let mut store = ContentStore::new(Content::stream(Cursor::new(vec![0u8, 1, 2, 3])));
        let first = drain(&mut store, TransferEncoding::Base64);
        assert_eq!(store.active_filter(), Some(TransferEncoding::Base64));
        store.rewind_if_seekable().unwrap();
        let second = drain(&mut store, TransferEncoding::Base64);
        assert_eq!(first, b"AAECAw==");
        assert_eq!(second, first);
    }

    #[test]
    fn test_failed_attach_keeps_previous_filter() {
        let mut store = ContentStore::new(Content::stream(Cursor::new(vec![1u8])));
        drain(&mut store, TransferEncoding::QuotedPrintable);
        let err = store
            .encoded_stream(TransferEncoding::Base64, &FilterConfig::new("--"))
            .unwrap_err();
        assert!(matches!(err, Error::FilterAttachFailed(_)));
        assert_eq!(store.active_filter(), Some(TransferEncoding::QuotedPrintable));
    }

    #[test]
    fn test_set_content_detaches_filter() {
        let mut store = ContentStore::new(Content::stream(Cursor::new(vec![1u8])));
        drain(&mut store, TransferEncoding::Base64);
        store.set_content(Content::stream(Cursor::new(vec![2u8])));
        assert_eq!(store.active_filter(), None);
    }

    #[test]
    fn test_small_reads() {
        let mut store = ContentStore::new(Content::stream(Cursor::new(b"Hello=World".to_vec())));
        let mut stream = store
            .encoded_stream(TransferEncoding::QuotedPrintable, &FilterConfig::default())
            .unwrap();
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        while stream.read(&mut byte).unwrap() == 1 {
            out.push(byte[0]);
        }
        assert_eq!(out, b"Hello=3DWorld");
    }
}
