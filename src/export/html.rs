//! XHTML exporter.
//!
//! Writes one complete XHTML document per tree. Sections nest as
//! `<section>` elements, blocks go on their own lines and inline content
//! stays on the line of its block so no whitespace leaks into the text.

use super::{Exporter, misplaced, region_id};
use crate::error::Result;
use crate::import::{
    COMMENT_ATTR, COMMENT_CLASS, COMMENT_END_CLASS, COMMENT_START_CLASS, COMMENTS_CLASS,
};
use crate::metadata::DocumentInfo;
use crate::style::{BOLD, ITALIC};
use crate::tree::{CommentIndex, Document, DocumentComment, Element, ElementKind};
use crate::util::escape_xml;

const MAX_HEADING_LEVEL: usize = 6;

/// Configuration for XHTML export.
#[derive(Debug, Clone, Default)]
pub struct HtmlConfig {
    /// Stylesheet hrefs linked from the head, in order.
    pub stylesheets: Vec<String>,
    /// Document language; falls back to the information record's.
    pub language: Option<String>,
}

/// XHTML exporter.
#[derive(Debug, Clone, Default)]
pub struct HtmlExporter {
    config: HtmlConfig,
}

impl HtmlExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HtmlConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for HtmlExporter {
    fn extension(&self) -> &'static str {
        "xhtml"
    }

    fn to_bytes(&self, document: &Document) -> Result<Vec<u8>> {
        let index = CommentIndex::new(&document.root, &document.comments)?;
        let mut ctx = HtmlContext {
            out: String::new(),
            index: &index,
            indent_level: 0,
        };

        let language = self
            .config
            .language
            .as_deref()
            .or(document.info.language.as_deref());
        ctx.head(
            &document.title().unwrap_or_default(),
            language,
            &document.info,
            &self.config.stylesheets,
        );

        ctx.line("<body>");
        ctx.indent_level += 1;
        for child in &document.root.children {
            match child.kind {
                ElementKind::Section => ctx.section(child, 1)?,
                _ => return Err(misplaced(child, "document root")),
            }
        }
        ctx.comments(&index.anchored());
        ctx.indent_level -= 1;
        ctx.line("</body>");
        ctx.line("</html>");

        tracing::debug!(
            sections = document.root.section_count(),
            bytes = ctx.out.len(),
            "wrote xhtml"
        );
        Ok(ctx.out.into_bytes())
    }
}

/// Context for the serialization walk.
struct HtmlContext<'a, 'c> {
    out: String,
    index: &'a CommentIndex<'c>,
    indent_level: usize,
}

impl HtmlContext<'_, '_> {
    fn indent(&mut self) {
        for _ in 0..self.indent_level {
            self.out.push_str("  ");
        }
    }

    fn line(&mut self, text: &str) {
        self.indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn head(
        &mut self,
        title: &str,
        language: Option<&str>,
        info: &DocumentInfo,
        stylesheets: &[String],
    ) {
        self.out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.out.push_str("<!DOCTYPE html>\n");
        match language {
            Some(lang) => {
                let lang = escape_xml(lang);
                self.line(&format!(
                    "<html xmlns=\"http://www.w3.org/1999/xhtml\" lang=\"{lang}\" xml:lang=\"{lang}\">"
                ));
            }
            None => self.line("<html xmlns=\"http://www.w3.org/1999/xhtml\">"),
        }
        self.line("<head>");
        self.indent_level += 1;
        self.line("<meta charset=\"utf-8\"/>");
        self.line(&format!("<title>{}</title>", escape_xml(title)));

        let fields = [
            ("author", &info.author),
            ("publisher", &info.publisher),
            ("date", &info.date),
            ("identifier", &info.identifier),
            ("copyright", &info.copyright),
            ("version", &info.version),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                self.line(&format!(
                    "<meta name=\"{name}\" content=\"{}\"/>",
                    escape_xml(value)
                ));
            }
        }
        for href in stylesheets {
            self.line(&format!(
                "<link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>",
                escape_xml(href)
            ));
        }
        self.indent_level -= 1;
        self.line("</head>");
    }

    fn section(&mut self, section: &Element, depth: usize) -> Result<()> {
        self.line(&format!("<section{}>", attributes(section)));
        self.indent_level += 1;
        for child in &section.children {
            match &child.kind {
                ElementKind::Heading => {
                    let tag = format!("h{}", depth.min(MAX_HEADING_LEVEL));
                    self.block(&tag, child)?;
                }
                ElementKind::Paragraph => self.block("p", child)?,
                ElementKind::Section => self.section(child, depth + 1)?,
                ElementKind::Root
                | ElementKind::Text { .. }
                | ElementKind::RegionStart
                | ElementKind::RegionEnd => return Err(misplaced(child, "section")),
            }
        }
        self.indent_level -= 1;
        self.line("</section>");
        Ok(())
    }

    fn block(&mut self, tag: &str, block: &Element) -> Result<()> {
        self.indent();
        self.out.push_str(&format!("<{tag}{}>", attributes(block)));
        for child in &block.children {
            match &child.kind {
                ElementKind::Text { text, line_break } => {
                    self.styled_text(text, &child.styles);
                    if *line_break {
                        self.out.push_str("<br/>");
                    }
                }
                ElementKind::RegionStart => {
                    let id = region_id(child)?;
                    self.index.start(id)?;
                    self.out.push_str(&marker(COMMENT_START_CLASS, id));
                }
                ElementKind::RegionEnd => {
                    let id = region_id(child)?;
                    if self.index.end(id).is_some() {
                        self.out.push_str(&marker(COMMENT_END_CLASS, id));
                    }
                }
                ElementKind::Root
                | ElementKind::Section
                | ElementKind::Heading
                | ElementKind::Paragraph => return Err(misplaced(child, "paragraph")),
            }
        }
        self.out.push_str(&format!("</{tag}>\n"));
        Ok(())
    }

    /// Emphasis tags become elements; runs of other tags share one span.
    fn styled_text(&mut self, text: &str, styles: &[String]) {
        let mut closing: Vec<&str> = Vec::new();
        let mut classes: Vec<&str> = Vec::new();

        for style in styles.iter().map(String::as_str) {
            let tag = match style {
                BOLD => Some("strong"),
                ITALIC => Some("em"),
                _ => None,
            };
            match tag {
                Some(tag) => {
                    self.open_classes(&mut classes, &mut closing);
                    self.out.push_str(&format!("<{tag}>"));
                    closing.push(tag);
                }
                None => classes.push(style),
            }
        }
        self.open_classes(&mut classes, &mut closing);

        self.out.push_str(&escape_xml(text));
        for tag in closing.iter().rev() {
            self.out.push_str(&format!("</{tag}>"));
        }
    }

    fn open_classes(&mut self, classes: &mut Vec<&str>, closing: &mut Vec<&str>) {
        if classes.is_empty() {
            return;
        }
        self.out
            .push_str(&format!("<span class=\"{}\">", escape_xml(&classes.join(" "))));
        classes.clear();
        closing.push("span");
    }

    fn comments(&mut self, comments: &[&DocumentComment]) {
        if comments.is_empty() {
            return;
        }
        self.line(&format!("<aside class=\"{COMMENTS_CLASS}\">"));
        self.indent_level += 1;
        for comment in comments {
            let mut attrs = format!(
                " class=\"{COMMENT_CLASS}\" {COMMENT_ATTR}=\"{}\"",
                escape_xml(&comment.id)
            );
            if let Some(author) = &comment.author {
                attrs.push_str(&format!(" data-author=\"{}\"", escape_xml(author)));
            }
            if let Some(date) = &comment.date {
                attrs.push_str(&format!(" data-date=\"{}\"", escape_xml(date)));
            }
            self.line(&format!("<div{attrs}>"));
            self.indent_level += 1;
            for paragraph in &comment.paragraphs {
                self.line(&format!("<p>{}</p>", escape_xml(paragraph)));
            }
            self.indent_level -= 1;
            self.line("</div>");
        }
        self.indent_level -= 1;
        self.line("</aside>");
    }
}

/// ` id="…" class="…"` for an element, empty when it has neither.
fn attributes(element: &Element) -> String {
    let mut attrs = String::new();
    if let Some(id) = &element.id {
        attrs.push_str(&format!(" id=\"{}\"", escape_xml(id)));
    }
    if !element.styles.is_empty() {
        attrs.push_str(&format!(" class=\"{}\"", escape_xml(&element.styles.join(" "))));
    }
    attrs
}

fn marker(class: &str, id: &str) -> String {
    format!(
        "<span class=\"{class}\" {COMMENT_ATTR}=\"{}\"></span>",
        escape_xml(id)
    )
}
