//! # mailpart
//!
//! A single MIME part: metadata, payload and transfer encoding.
//!
//! ## Features
//!
//! - **Buffered or streamed payloads**: hold bytes in memory or read them
//!   from a borrowed stream handle
//! - **Transfer encoding**: identity (7bit, 8bit, binary), Quoted-Printable
//!   and Base64, wrapped at 76 columns with a caller-chosen line break
//! - **Streaming filters**: encode large payloads incrementally through a
//!   `Read` adapter
//! - **Header generation**: deterministic `Content-*` field order
//! - **Nesting**: parts own ordered sub-parts for multipart containers
//!
//! Boundary generation, message assembly and parsing are left to the
//! caller.
//!
//! ## Quick Start
//!
//! ### Buffered Content
//!
//! ```ignore
//! use mailpart::{Part, TransferEncoding};
//!
//! let mut part = Part::new(vec![0u8, 1, 2, 3]);
//! part.set_encoding(TransferEncoding::Base64)
//!     .set_disposition("attachment")
//!     .set_filename("data.bin");
//!
//! print!("{}", part.header_block("\r\n"));
//! assert_eq!(part.content("\r\n")?, b"AAECAw==");
//! ```
//!
//! ### Streamed Content
//!
//! ```ignore
//! use std::fs::File;
//! use std::io;
//! use mailpart::{Content, Part, Seekable, TransferEncoding};
//!
//! let mut file = Seekable::new(File::open("report.pdf")?);
//! let mut part = Part::builder(Content::stream(&mut file))
//!     .content_type("application/pdf")
//!     .encoding(TransferEncoding::Base64)
//!     .build();
//!
//! // Pipe the encoded body without loading the file into memory.
//! io::copy(&mut part.encoded_stream("\r\n")?, &mut socket)?;
//! ```
//!
//! ### Multipart Containers
//!
//! ```ignore
//! use mailpart::{Part, constants};
//!
//! let alternative = Part::builder("")
//!     .content_type(constants::MULTIPART_ALTERNATIVE)
//!     .boundary("=_alt")
//!     .sub_part(Part::builder("Hello").content_type(constants::TYPE_TEXT).build())
//!     .sub_part(Part::builder("<p>Hello</p>").content_type(constants::TYPE_HTML).build())
//!     .build();
//!
//! assert_eq!(alternative.sub_parts().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod header;
mod part;
mod store;

pub mod constants;
pub mod encoding;
pub mod filter;
pub mod stream;

pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use filter::{FilterConfig, FilterConfigBuilder};
pub use header::HeaderFields;
pub use part::{Part, PartBuilder};
pub use store::{Content, ContentStore, EncodedStream};
pub use stream::{ContentStream, Seekable, Sequential};
