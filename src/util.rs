//! Shared helpers: text decoding, XML escaping and file naming.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{Error, Result};

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode an XML source, honouring the encoding named in its declaration.
pub fn decode_xml(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` in the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    if after_enc.is_empty() {
        return None;
    }

    let quote = after_enc[0];
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = after_enc[1..].iter().position(|&b| b == quote)? + 1;
    std::str::from_utf8(&after_enc[1..value_end]).ok()
}

// ============================================================================
// XML helpers
// ============================================================================

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve an entity reference (without `&` and `;`).
///
/// Covers the XML built-ins, numeric references and the handful of HTML
/// named entities that commonly leak into XHTML content.
pub fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => Some("'"),
        "quot" => Some("\""),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "nbsp" => Some("\u{a0}"),
        "shy" => Some("\u{ad}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    };
    if let Some(s) = named {
        return Some(s.to_string());
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

/// Expand the body of a general reference event, failing on unknown names.
pub fn expand_reference(name: &[u8], format: &'static str) -> Result<String> {
    let name = String::from_utf8_lossy(name);
    resolve_entity(&name).ok_or_else(|| Error::parse(format, format!("unknown entity '&{name};'")))
}

/// Unescape a raw attribute value.
pub fn attribute_value(raw: &[u8]) -> Result<String> {
    let raw = String::from_utf8_lossy(raw);
    quick_xml::escape::unescape(&raw)
        .map(|value| value.into_owned())
        .map_err(|e| Error::parse("xml", e.to_string()))
}

/// Collapse runs of XML whitespace into a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

// ============================================================================
// File naming
// ============================================================================

/// Replace every character outside letters, digits, space, `.`, `-`, `_`,
/// `'` and `,` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_' | '\'' | ',') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the file stem for the `index`-th (0-based) of `total` sections.
///
/// The 1-based position is zero-padded to the digit count of `total`.
///
/// ```
/// use bindery::util::generate_section_file_name;
///
/// assert_eq!(generate_section_file_name("My section title", 1, 5), "2 - My section title");
/// assert_eq!(generate_section_file_name("My section title", 1, 10), "02 - My section title");
/// ```
pub fn generate_section_file_name(title: &str, index: usize, total: usize) -> String {
    let width = total.max(1).to_string().len();
    format!(
        "{:0width$} - {}",
        index + 1,
        sanitize_file_name(title),
        width = width
    )
}

/// Remove a leading `"<digits> - "` position prefix, if present.
pub fn strip_numeric_prefix(stem: &str) -> &str {
    let digits = stem.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return stem;
    }
    stem[digits..].strip_prefix(" - ").unwrap_or(stem)
}

/// Turn a package file name into a valid XML identifier.
pub fn href_to_id(href: &str) -> String {
    let id: String = href
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        id
    } else {
        format!("id_{id}")
    }
}

/// Guess media type from file extension.
pub fn guess_media_type(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xhtml" | "html" | "htm" => "application/xhtml+xml",
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ncx" => "application/x-dtbncx+xml",
        "opf" => "application/oebps-package+xml",
        _ => "application/octet-stream",
    }
}
