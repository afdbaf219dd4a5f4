//! Stream handles for payloads read from an external source.
//!
//! A [`ContentStream`] is a sequential byte source that reports at runtime
//! whether it can return to its start. Sockets and pipes cannot; files and
//! in-memory cursors can. Wrap a source in [`Seekable`] or [`Sequential`]
//! to state which applies.
//!
//! Passing `&mut source` to a part borrows the handle for the part's
//! lifetime. The part never closes it; the caller drops the handle after
//! the part is gone.

use std::io::{self, Cursor, Read, Seek};

/// A readable payload source.
pub trait ContentStream: Read {
    /// Returns true if [`rewind_to_start`](Self::rewind_to_start) is supported.
    fn seekable(&self) -> bool;

    /// Moves the read position back to the start of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::Unsupported`] for non-seekable streams, or
    /// the underlying seek error.
    fn rewind_to_start(&mut self) -> io::Result<()>;
}

/// A source that supports returning to its start.
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
}

impl<R: Read + Seek> Seekable<R> {
    /// Wraps a seekable reader.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns a reference to the wrapped reader.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Seekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> ContentStream for Seekable<R> {
    fn seekable(&self) -> bool {
        true
    }

    fn rewind_to_start(&mut self) -> io::Result<()> {
        self.inner.rewind()
    }
}

/// A forward-only source, such as a socket or pipe. Reading it drains it.
#[derive(Debug)]
pub struct Sequential<R> {
    inner: R,
}

impl<R: Read> Sequential<R> {
    /// Wraps a forward-only reader.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns a reference to the wrapped reader.
    pub const fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Sequential<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> ContentStream for Sequential<R> {
    fn seekable(&self) -> bool {
        false
    }

    fn rewind_to_start(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stream is not seekable",
        ))
    }
}

impl<T: AsRef<[u8]>> ContentStream for Cursor<T> {
    fn seekable(&self) -> bool {
        true
    }

    fn rewind_to_start(&mut self) -> io::Result<()> {
        self.set_position(0);
        Ok(())
    }
}

impl<S: ContentStream + ?Sized> ContentStream for &mut S {
    fn seekable(&self) -> bool {
        (**self).seekable()
    }

    fn rewind_to_start(&mut self) -> io::Result<()> {
        (**self).rewind_to_start()
    }
}

impl<S: ContentStream + ?Sized> ContentStream for Box<S> {
    fn seekable(&self) -> bool {
        (**self).seekable()
    }

    fn rewind_to_start(&mut self) -> io::Result<()> {
        (**self).rewind_to_start()
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

    #[test]
    fn test_cursor_rewinds() {
        let mut cursor = Cursor::new(b"abc".to_vec());
        let mut out = Vec::new();
        cursor.read_to_end(&mut out).unwrap();
        assert!(cursor.seekable());
        cursor.rewind_to_start().unwrap();
        out.clear();
        cursor.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_seekable_wrapper() {
        let mut stream = Seekable::new(Cursor::new(vec![1u8, 2, 3]));
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        stream.rewind_to_start().unwrap();
        assert_eq!(stream.get_ref().position(), 0);
    }

    #[test]
    fn test_sequential_cannot_rewind() {
        let mut stream = Sequential::new(&b"abc"[..]);
        assert!(!stream.seekable());
        let err = stream.rewind_to_start().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_borrowed_handle_delegates() {
        let mut cursor = Cursor::new(b"xyz".to_vec());
        {
            let mut borrowed: Box<dyn ContentStream + '_> = Box::new(&mut cursor);
            assert!(borrowed.seekable());
            let mut out = Vec::new();
            borrowed.read_to_end(&mut out).unwrap();
            assert_eq!(out, b"xyz");
        }
        assert_eq!(cursor.position(), 3);
    }
}
