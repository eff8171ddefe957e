//! The `---` header block at the top of a Markdown document.

use serde::Serialize;

use crate::error::{Error, Result};

const FORMAT: &str = "markdown";
const MIN_SENTINEL: usize = 3;

fn is_sentinel(line: &str) -> bool {
    line.len() >= MIN_SENTINEL && line.bytes().all(|b| b == b'-')
}

/// Split the optional header block off a document.
///
/// The block opens with a first line of three or more `-` and closes at the
/// next line identical to the opening one. Returns the block content and the
/// remaining text; an unclosed block is a parse error.
///
/// ```
/// use bindery::markdown::split_front_matter;
///
/// let (header, body) = split_front_matter("---\ntitle: Book\n---\n# One\n").unwrap();
/// assert_eq!(header, Some("title: Book\n"));
/// assert_eq!(body, "# One\n");
/// ```
pub fn split_front_matter(text: &str) -> Result<(Option<&str>, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok((None, text));
    };
    let sentinel = first.trim_end_matches(['\n', '\r']);
    if !is_sentinel(sentinel) {
        return Ok((None, text));
    }

    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if line.trim_end_matches(['\n', '\r']) == sentinel {
            return Ok((Some(&text[header_start..offset]), &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::parse(FORMAT, "unterminated front matter block"))
}

/// Serialize `value` as a YAML header block, delimiters included.
pub fn render_front_matter<T: Serialize>(value: &T) -> Result<String> {
    let yaml = serde_saphyr::to_string(value)
        .map_err(|e| Error::parse(FORMAT, format!("front matter: {e}")))?;
    let yaml = yaml.trim_end_matches('\n');
    Ok(format!("---\n{yaml}\n---\n"))
}
