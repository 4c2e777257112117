//! Byte-level repair of feed content before structural parsing
//!
//! Remote EPG feeds arrive with BOMs, stray control characters, duplicated
//! XML declarations and unescaped ampersands. This stage rewrites the text so
//! the parser has a fighting chance; it never fails, and it does not promise
//! well-formedness (unclosed tags are the loader's problem).

use regex::Regex;
use std::sync::LazyLock;

static XML_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\?xml[^?]*\?>").expect("static regex"));

/// The single declaration every output document starts with
pub const CANONICAL_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Repair one document's raw text: strip the BOM, drop control characters
/// (keeping tab/CR/LF), collapse XML declarations down to one canonical
/// UTF-8 declaration, and escape ampersands that are not entity references.
pub fn sanitize(raw: &str) -> String {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let text: String = text
        .chars()
        .filter(|&c| !is_forbidden_control(c))
        .collect();

    let text = XML_DECLARATION.replace_all(&text, "");
    let text = escape_bare_ampersands(text.trim_start());

    let mut out = String::with_capacity(text.len() + CANONICAL_DECLARATION.len() + 1);
    out.push_str(CANONICAL_DECLARATION);
    out.push('\n');
    out.push_str(&text);
    out
}

fn is_forbidden_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}')
}

/// Rewrite every `&` that does not open a recognized entity reference
/// (`&#123;`, `&#x1f;`, `&name;`) to `&amp;`.
fn escape_bare_ampersands(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'&' && !is_entity_reference(&bytes[i..]) {
            out.push_str("&amp;");
            i += 1;
        } else {
            let c = text[i..].chars().next().expect("in-bounds char");
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

/// Does this `&`-led byte slice open `&#digits;`, `&#xhex;` or `&name;`?
fn is_entity_reference(bytes: &[u8]) -> bool {
    debug_assert_eq!(bytes.first(), Some(&b'&'));
    let rest = &bytes[1..];

    if let Some(after_hash) = rest.strip_prefix(b"#") {
        if let Some(hex) = after_hash
            .strip_prefix(b"x")
            .or_else(|| after_hash.strip_prefix(b"X"))
        {
            return terminated_run(hex, |b| b.is_ascii_hexdigit());
        }
        return terminated_run(after_hash, |b| b.is_ascii_digit());
    }
    terminated_run(rest, |b| b.is_ascii_alphanumeric())
}

/// At least one byte matching `valid`, immediately followed by `;`
fn terminated_run(bytes: &[u8], valid: impl Fn(u8) -> bool) -> bool {
    let len = bytes.iter().take_while(|&&b| valid(b)).count();
    len > 0 && bytes.get(len) == Some(&b';')
}
