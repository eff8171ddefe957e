//! Markdown importer.
//!
//! The text is split into nested sections by its ATX headings, each scope
//! being divided by the shallowest heading level it contains. Every piece is
//! rendered to XHTML with `pulldown-cmark` and the assembled fragment is read
//! by the XHTML importer, so emphasis becomes `bold`/`italic` style tags.

use pulldown_cmark::{Options, Parser, html};

use super::Importer;
use crate::error::{Error, Result};
use crate::markdown::{HeadingLine, atx_headings, split_front_matter};
use crate::metadata::DocumentInfo;
use crate::tree::{DocumentComment, Element};
use crate::util::decode_text;

const FORMAT: &str = "markdown";

/// Importer for Markdown documents with optional YAML front matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownImporter;

impl MarkdownImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for MarkdownImporter {
    fn read_metadata(&self, bytes: &[u8]) -> Result<DocumentInfo> {
        let text = decode_text(bytes, None);
        match split_front_matter(&text)?.0 {
            Some(header) if !header.trim().is_empty() => serde_saphyr::from_str(header)
                .map_err(|e| Error::parse(FORMAT, format!("front matter: {e}"))),
            _ => Ok(DocumentInfo::default()),
        }
    }

    fn read_content(&self, bytes: &[u8]) -> Result<Element> {
        let text = decode_text(bytes, None);
        let (_, body) = split_front_matter(&text)?;
        let xhtml = to_sectioned_xhtml(body);
        let (root, _) = super::html::parse_body(&xhtml)?;
        tracing::debug!(sections = root.section_count(), "read markdown content");
        Ok(root)
    }

    /// Markdown has no comment syntax.
    fn read_comments(&self, _bytes: &[u8]) -> Result<Vec<DocumentComment>> {
        Ok(Vec::new())
    }
}

/// Render Markdown to an XHTML fragment with one `<section>` per heading.
fn to_sectioned_xhtml(text: &str) -> String {
    let headings = atx_headings(text);
    let mut out = String::with_capacity(text.len() * 2);
    out.push_str("<body>\n");
    render_scope(text, 0, text.len(), &headings, &mut out);
    out.push_str("</body>\n");
    out
}

/// Render `text[start..end]`, whose headings are `headings`.
fn render_scope(text: &str, start: usize, end: usize, headings: &[HeadingLine<'_>], out: &mut String) {
    let Some(level) = headings.iter().map(|h| h.level).min() else {
        render_markdown(&text[start..end], out);
        return;
    };
    let splits: Vec<usize> = headings
        .iter()
        .enumerate()
        .filter(|(_, h)| h.level == level)
        .map(|(i, _)| i)
        .collect();

    let first = splits[0];
    render_scope(text, start, headings[first].start, &headings[..first], out);

    for (n, &index) in splits.iter().enumerate() {
        let heading = &headings[index];
        let next = splits.get(n + 1).copied();
        let scope_end = next.map_or(end, |i| headings[i].start);
        let inner = &headings[index + 1..next.unwrap_or(headings.len())];

        out.push_str("<section>\n");
        render_markdown(&text[heading.start..heading.end], out);
        render_scope(text, heading.end, scope_end, inner, out);
        out.push_str("</section>\n");
    }
}

fn render_markdown(markdown: &str, out: &mut String) {
    if markdown.trim().is_empty() {
        return;
    }
    let parser = Parser::new_ext(markdown, Options::empty());
    html::push_html(out, parser);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn titles(root: &Element) -> Vec<(usize, String)> {
        fn walk(section: &Element, depth: usize, out: &mut Vec<(usize, String)>) {
            out.push((depth, section.section_title().unwrap_or_default()));
            for sub in section.subsections() {
                walk(sub, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        for section in root.sections() {
            walk(section, 1, &mut out);
        }
        out
    }

    #[test]
    fn test_sections_nest_by_level() {
        let md = "# Book\n\nIntro.\n\n## One\n\nFirst.\n\n### One A\n\n## Two\n\nSecond.\n";
        let root = MarkdownImporter::new().read_content(md.as_bytes()).unwrap();
        assert_eq!(
            titles(&root),
            vec![
                (1, "Book".to_string()),
                (2, "One".to_string()),
                (3, "One A".to_string()),
                (2, "Two".to_string()),
            ]
        );
        let book = root.sections().next().unwrap();
        assert_eq!(book.paragraphs().next().unwrap().plain_text(), "Intro.");
    }

    #[test]
    fn test_shallowest_level_splits_scope() {
        // No level-1 heading: the level-2 headings are the top sections.
        let md = "Preamble\n\n## A\n\n#### deep\n\n## B\n";
        let root = MarkdownImporter::new().read_content(md.as_bytes()).unwrap();
        assert_eq!(root.section_count(), 3);
        let titles = titles(&root);
        assert_eq!(titles[0], (1, String::new()));
        assert_eq!(titles[1], (1, "A".to_string()));
        assert_eq!(titles[2], (2, "deep".to_string()));
        assert_eq!(titles[3], (1, "B".to_string()));
    }

    #[test]
    fn test_emphasis_becomes_style_tags() {
        let md = "# T\n\nSome **bold** and *italic* text  \nafter break.\n";
        let root = MarkdownImporter::new().read_content(md.as_bytes()).unwrap();
        let para = root.sections().next().unwrap().paragraphs().next().unwrap();
        let bold = para.children.iter().find(|c| c.as_text() == Some("bold")).unwrap();
        assert_eq!(bold.styles, vec!["bold"]);
        let italic = para.children.iter().find(|c| c.as_text() == Some("italic")).unwrap();
        assert_eq!(italic.styles, vec!["italic"]);
        assert!(para.children.iter().any(Element::line_break));
        assert_eq!(para.plain_text(), "Some bold and italic textafter break.");
    }

    #[test]
    fn test_heading_in_code_block_is_text() {
        let md = "# Real\n\n```\n# fake\n```\n";
        let root = MarkdownImporter::new().read_content(md.as_bytes()).unwrap();
        assert_eq!(root.section_count(), 1);
        assert_eq!(root.sections().next().unwrap().subsections().count(), 0);
    }

    #[test]
    fn test_front_matter_metadata() {
        let md = "---\ntitle: My Book\nauthor: Jane Doe\nlanguage: en\n---\n# One\n";
        let importer = MarkdownImporter::new();
        let info = importer.read_metadata(md.as_bytes()).unwrap();
        assert_eq!(info.title.as_deref(), Some("My Book"));
        assert_eq!(info.author.as_deref(), Some("Jane Doe"));
        assert_eq!(info.language.as_deref(), Some("en"));

        let root = importer.read_content(md.as_bytes()).unwrap();
        assert_eq!(titles(&root), vec![(1, "One".to_string())]);
    }

    #[test]
    fn test_missing_front_matter_gives_empty_info() {
        let info = MarkdownImporter::new().read_metadata(b"# One\n").unwrap();
        assert!(info.is_empty());
    }

    #[test]
    fn test_unterminated_front_matter_is_parse_error() {
        let err = MarkdownImporter::new()
            .read_content(b"---\ntitle: x\n# One\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
