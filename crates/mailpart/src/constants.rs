//! MIME format constants shared with message assemblers.

/// Generic binary payload.
pub const TYPE_OCTETSTREAM: &str = "application/octet-stream";
/// Plain text.
pub const TYPE_TEXT: &str = "text/plain";
/// HTML text.
pub const TYPE_HTML: &str = "text/html";

/// Alternative representations of the same content.
pub const MULTIPART_ALTERNATIVE: &str = "multipart/alternative";
/// Independent parts in a fixed order.
pub const MULTIPART_MIXED: &str = "multipart/mixed";
/// Compound object with inter-related parts.
pub const MULTIPART_RELATED: &str = "multipart/related";

/// 7-bit identity encoding label.
pub const ENCODING_7BIT: &str = "7bit";
/// 8-bit identity encoding label.
pub const ENCODING_8BIT: &str = "8bit";
/// Binary identity encoding label.
pub const ENCODING_BINARY: &str = "binary";
/// Quoted-Printable encoding label.
pub const ENCODING_QUOTEDPRINTABLE: &str = "quoted-printable";
/// Base64 encoding label.
pub const ENCODING_BASE64: &str = "base64";

/// Content shown as a separate attachment.
pub const DISPOSITION_ATTACHMENT: &str = "attachment";
/// Content shown inline.
pub const DISPOSITION_INLINE: &str = "inline";

/// Maximum encoded line length, excluding the line terminator (RFC 2045).
pub const LINE_LENGTH: usize = 76;

/// Default line terminator.
pub const LINE_END: &str = "\r\n";
