//! Integration tests rendering part trees the way a message assembler does.
//!
//! The assembler here is deliberately small: headers, a blank line, the
//! encoded body, and for multipart containers each child between
//! `--boundary` delimiters.

#![allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::unreadable_literal
)]

use std::io::{Cursor, Read};

use mailpart::encoding::decode;
use mailpart::{Content, Error, Part, Seekable, Sequential, TransferEncoding, constants};
use proptest::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CRLF: &str = "\r\n";

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpart=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn render(part: &mut Part<'_>, out: &mut Vec<u8>) -> mailpart::Result<()> {
    out.extend_from_slice(part.header_block(CRLF).as_bytes());
    out.extend_from_slice(CRLF.as_bytes());

    if let Some(boundary) = part.boundary().map(str::to_string) {
        for child in part.sub_parts_mut() {
            out.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
            render(child, out)?;
            out.extend_from_slice(CRLF.as_bytes());
        }
        out.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());
    } else {
        out.extend_from_slice(&part.content(CRLF)?);
    }
    Ok(())
}

#[test]
fn test_render_nested_message() {
    init_tracing();

    let mut attachment_source = Seekable::new(Cursor::new(vec![0u8, 1, 2, 3]));

    let alternative = Part::builder("")
        .content_type(constants::MULTIPART_ALTERNATIVE)
        .boundary("=_alt")
        .sub_part(
            Part::builder("Hello=World")
                .content_type(constants::TYPE_TEXT)
                .charset("utf-8")
                .encoding(constants::ENCODING_QUOTEDPRINTABLE)
                .build(),
        )
        .sub_part(
            Part::builder("<p>Hello</p>")
                .content_type(constants::TYPE_HTML)
                .charset("utf-8")
                .encoding(constants::ENCODING_7BIT)
                .build(),
        )
        .build();

    let mut root = Part::builder("")
        .content_type(constants::MULTIPART_MIXED)
        .boundary("=_mixed")
        .sub_part(alternative)
        .sub_part(
            Part::builder(Content::stream(&mut attachment_source))
                .encoding(TransferEncoding::Base64)
                .disposition(constants::DISPOSITION_ATTACHMENT)
                .filename("report.pdf")
                .build(),
        )
        .build();

    let mut out = Vec::new();
    render(&mut root, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let expected = concat!(
        "Content-Type: multipart/mixed;\r\n boundary=\"=_mixed\"\r\n",
        "Content-Transfer-Encoding: 8bit\r\n",
        "\r\n",
        "--=_mixed\r\n",
        "Content-Type: multipart/alternative;\r\n boundary=\"=_alt\"\r\n",
        "Content-Transfer-Encoding: 8bit\r\n",
        "\r\n",
        "--=_alt\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "Content-Transfer-Encoding: quoted-printable\r\n",
        "\r\n",
        "Hello=3DWorld\r\n",
        "--=_alt\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "Content-Transfer-Encoding: 7bit\r\n",
        "\r\n",
        "<p>Hello</p>\r\n",
        "--=_alt--\r\n",
        "\r\n",
        "--=_mixed\r\n",
        "Content-Type: application/octet-stream\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
        "\r\n",
        "AAECAw==\r\n",
        "--=_mixed--\r\n",
    );
    assert_eq!(text, expected);

    // Rendering again reads the seekable attachment from the start.
    let mut again = Vec::new();
    render(&mut root, &mut again).unwrap();
    assert_eq!(String::from_utf8(again).unwrap(), expected);
}

#[test]
fn test_large_stream_piped_through_filter() {
    init_tracing();

    let data: Vec<u8> = (0..100_000u32)
        .map(|i| u8::try_from(i * 31 % 251).unwrap())
        .collect();
    let mut part = Part::new(Content::stream(Sequential::new(Cursor::new(data.clone()))));
    part.set_encoding(TransferEncoding::Base64);

    let mut encoded = Vec::new();
    let mut stream = part.encoded_stream(CRLF).unwrap();
    let mut chunk = [0u8; 1000];
    loop {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        encoded.extend_from_slice(&chunk[..n]);
    }

    for line in encoded.split(|&b| b == b'\n') {
        assert!(line.len() <= 77, "line too long: {}", line.len());
    }
    assert_eq!(decode(&encoded, TransferEncoding::Base64).unwrap(), data);
}

#[test]
fn test_stream_handle_outlives_part() {
    let mut source = Cursor::new(b"borrowed".to_vec());
    {
        let mut part = Part::new(Content::stream(&mut source));
        assert_eq!(part.raw_content().unwrap(), b"borrowed");
    }
    // The part rewound the cursor and left it usable.
    let mut rest = Vec::new();
    source.read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"borrowed");
}

#[test]
fn test_mode_switch_back_and_forth() {
    let mut part = Part::new("first");
    part.set_encoding(TransferEncoding::Base64);
    assert_eq!(part.content(CRLF).unwrap(), b"Zmlyc3Q=");

    part.set_content(Content::stream(Cursor::new(b"second".to_vec())));
    assert!(part.is_stream());
    assert!(matches!(
        part.encoded_bytes(CRLF),
        Err(Error::NotAStream { .. })
    ));
    assert_eq!(part.content(CRLF).unwrap(), b"c2Vjb25k");

    part.set_content(b"third".to_vec());
    assert!(!part.is_stream());
    assert_eq!(part.content(CRLF).unwrap(), b"dGhpcmQ=");
}

proptest! {
    #[test]
    fn prop_part_content_round_trip(
        data in proptest::collection::vec(any::<u8>(), 0..2000),
        streamed in any::<bool>(),
        encoding in prop_oneof![
            Just(TransferEncoding::EightBit),
            Just(TransferEncoding::QuotedPrintable),
            Just(TransferEncoding::Base64),
        ],
    ) {
        let content = if streamed {
            Content::stream(Cursor::new(data.clone()))
        } else {
            Content::from(data.clone())
        };
        let mut part = Part::new(content);
        part.set_encoding(encoding);

        let encoded = part.content("\n").unwrap();
        prop_assert_eq!(decode(&encoded, encoding).unwrap(), data);
    }
}
