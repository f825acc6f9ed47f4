//! HTML title extraction.

use encoding_rs::{Encoding, UTF_8};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap();
    static ref ENTITY: Regex = Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap();
    static ref META_CHARSET: Regex =
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([\w-]+)"#).unwrap();
    static ref HEADER_CHARSET: Regex = Regex::new(r#"(?i)charset\s*=\s*"?([\w-]+)"#).unwrap();
}

/// Text of the first `<title>` element, entity-decoded.
pub fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|caps| decode_entities(caps[1].trim()))
}

/// Decode numeric character references and the common named entities.
///
/// Unknown names are left as they are.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "laquo" => '«',
        "raquo" => '»',
        "bdquo" => '„',
        "ldquo" => '“',
        "rdquo" => '”',
        "lsquo" => '‘',
        "rsquo" => '’',
        "middot" => '·',
        "copy" => '©',
        "auml" => 'ä',
        "ouml" => 'ö',
        "uuml" => 'ü',
        "Auml" => 'Ä',
        "Ouml" => 'Ö',
        "Uuml" => 'Ü',
        "szlig" => 'ß',
        "euro" => '€',
        _ => return None,
    })
}

/// Character encoding of a document.
///
/// The `Content-Type` header wins, then a `<meta charset>` in the first bytes,
/// then UTF-8.
pub fn sniff_encoding(content_type: Option<&str>, head: &[u8]) -> &'static Encoding {
    let from_header = content_type
        .and_then(|ct| HEADER_CHARSET.captures(ct))
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()));
    if let Some(encoding) = from_header {
        return encoding;
    }

    let head = &head[..head.len().min(1024)];
    let prefix = String::from_utf8_lossy(head);
    META_CHARSET
        .captures(&prefix)
        .and_then(|caps| Encoding::for_label(caps[1].as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode a (possibly truncated) body to text.
pub fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = sniff_encoding(content_type, body);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}
