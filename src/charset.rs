//! Picking the character encoding of a fetched page.
//!
//! Precedence: byte order mark, then the `Content-Type` charset, then a
//! `<meta>` declaration near the top of the document, then UTF-8.

use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SNIFF_LIMIT: usize = 1024;

fn meta_charset() -> &'static Regex {
    static META: OnceLock<Regex> = OnceLock::new();
    META.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#)
            .expect("meta charset pattern is valid")
    })
}

/// The `charset` parameter of a `Content-Type` header value, if it names a
/// known encoding.
pub fn from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

/// Encoding declared by `<meta charset>` or `<meta http-equiv content="...charset=...">`.
pub fn from_meta(html: &[u8]) -> Option<&'static Encoding> {
    let head = &html[..html.len().min(META_SNIFF_LIMIT)];
    let label = meta_charset().captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

/// Best guess for the page encoding, before any byte order mark is honoured.
pub fn detect(html: &[u8], content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(from_content_type)
        .or_else(|| from_meta(html))
        .unwrap_or(UTF_8)
}

/// Decodes `html`, returning the text and the encoding actually used.
pub fn decode(html: &[u8], content_type: Option<&str>) -> (String, &'static Encoding) {
    let (text, used, had_errors) = detect(html, content_type).decode(html);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page contained malformed byte sequences");
    }
    (text.into_owned(), used)
}

/// Encodes `text` back into `encoding`, or UTF-8 where the encoding cannot
/// be written (UTF-16, replacement).
pub fn encode(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.output_encoding().encode(text);
    bytes.into_owned()
}
