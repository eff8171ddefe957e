//! ATX heading detection.

/// An ATX heading line and its byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingLine<'a> {
    pub level: usize,
    /// Heading text without the `#` markers and the optional closing sequence.
    pub text: &'a str,
    /// Offset of the first byte of the line.
    pub start: usize,
    /// Offset just past the line, newline included.
    pub end: usize,
}

/// A fence opening or closing a fenced code block.
struct Fence {
    marker: u8,
    len: usize,
}

/// Strip up to three spaces of indentation; `None` for an indented code line.
fn block_indent(line: &str) -> Option<&str> {
    let indent = line.bytes().take_while(|&b| b == b' ').count();
    (indent <= 3).then(|| &line[indent..])
}

fn fence(line: &str) -> Option<Fence> {
    let line = block_indent(line)?;
    let marker = *line.as_bytes().first()?;
    if marker != b'`' && marker != b'~' {
        return None;
    }
    let len = line.bytes().take_while(|&b| b == marker).count();
    (len >= 3).then_some(Fence { marker, len })
}

fn atx(line: &str) -> Option<(usize, &str)> {
    let line = block_indent(line)?.trim_end_matches(['\n', '\r']);
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let mut text = rest.trim();
    // Optional closing sequence, which must be preceded by a space.
    let closing = text.trim_end_matches('#');
    if closing.is_empty() {
        text = closing;
    } else if closing.len() < text.len() && closing.ends_with([' ', '\t']) {
        text = closing.trim_end();
    }
    Some((level, text))
}

/// ATX headings of `text`, in order, ignoring fenced code blocks.
///
/// ```
/// use bindery::markdown::atx_headings;
///
/// let text = "# One\n```\n# not a heading\n```\n## Two ##\n";
/// let levels: Vec<(usize, &str)> = atx_headings(text).iter().map(|h| (h.level, h.text)).collect();
/// assert_eq!(levels, vec![(1, "One"), (2, "Two")]);
/// ```
pub fn atx_headings(text: &str) -> Vec<HeadingLine<'_>> {
    let mut headings = Vec::new();
    let mut open_fence: Option<Fence> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        if let Some(open) = &open_fence {
            if let Some(close) = fence(line)
                && close.marker == open.marker
                && close.len >= open.len
                && block_indent(line).is_some_and(|l| {
                    l.trim_end().bytes().all(|b| b == open.marker)
                })
            {
                open_fence = None;
            }
            continue;
        }
        if let Some(open) = fence(line) {
            open_fence = Some(open);
            continue;
        }
        if let Some((level, heading)) = atx(line) {
            headings.push(HeadingLine {
                level,
                text: heading,
                start,
                end: offset,
            });
        }
    }

    headings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(text: &str) -> Vec<(usize, &str)> {
        atx_headings(text).iter().map(|h| (h.level, h.text)).collect()
    }

    #[test]
    fn test_basic_levels() {
        assert_eq!(
            levels("# A\ntext\n## B\n###### F\n####### seven\n"),
            vec![(1, "A"), (2, "B"), (6, "F")]
        );
    }

    #[test]
    fn test_requires_space_after_markers() {
        assert_eq!(levels("#hashtag\n#\n"), vec![(1, "")]);
    }

    #[test]
    fn test_closing_sequence() {
        assert_eq!(levels("## Title ##\n# C#\n# ###\n"), vec![(2, "Title"), (1, "C#"), (1, "")]);
    }

    #[test]
    fn test_indentation() {
        assert_eq!(levels("   # ok\n    # code\n"), vec![(1, "ok")]);
    }

    #[test]
    fn test_fenced_code_is_skipped() {
        let text = "~~~~\n# no\n~~~\n# still no\n~~~~\n# yes\n";
        assert_eq!(levels(text), vec![(1, "yes")]);
    }

    #[test]
    fn test_ranges_cover_whole_line() {
        let text = "intro\n## Two\nbody";
        let heading = atx_headings(text)[0];
        assert_eq!(&text[heading.start..heading.end], "## Two\n");
    }
}
