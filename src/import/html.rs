//! XHTML importer.
//!
//! Accepts complete documents and bare fragments, as long as they are
//! well-formed XML. Structure comes from `<section>` and `<h1>`..`<h6>`;
//! headings outside an explicit section open implicit ones nested by level.
//! Text outside any `<p>` (list items, table cells, bare `<div>` text)
//! becomes a paragraph of its own.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::Importer;
use super::run::RunBuilder;
use crate::error::{Error, Result};
use crate::metadata::DocumentInfo;
use crate::style::{BOLD, ITALIC};
use crate::tree::{Document, DocumentComment, Element};
use crate::util::{attribute_value, collapse_whitespace, decode_xml, expand_reference, local_name};

const FORMAT: &str = "html";

/// Class of the empty span opening a commented region.
pub(crate) const COMMENT_START_CLASS: &str = "comment-start";
/// Class of the empty span closing a commented region.
pub(crate) const COMMENT_END_CLASS: &str = "comment-end";
/// Class of the `<aside>` holding the comment bodies.
pub(crate) const COMMENTS_CLASS: &str = "comments";
/// Class of one comment body inside the aside.
pub(crate) const COMMENT_CLASS: &str = "comment";
/// Attribute naming the region a marker or comment body belongs to.
pub(crate) const COMMENT_ATTR: &str = "data-comment";

/// Importer for XHTML documents and fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlImporter;

impl HtmlImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for HtmlImporter {
    fn read_metadata(&self, bytes: &[u8]) -> Result<DocumentInfo> {
        parse_head(&decode_xml(bytes))
    }

    fn read_content(&self, bytes: &[u8]) -> Result<Element> {
        Ok(parse_body(&decode_xml(bytes))?.0)
    }

    fn read_comments(&self, bytes: &[u8]) -> Result<Vec<DocumentComment>> {
        Ok(parse_body(&decode_xml(bytes))?.1)
    }

    fn read_document(&self, bytes: &[u8]) -> Result<Document> {
        let xml = decode_xml(bytes);
        let (root, comments) = parse_body(&xml)?;
        Ok(Document::new(root)
            .with_info(parse_head(&xml)?)
            .with_comments(comments))
    }
}

// ============================================================================
// Element classes
// ============================================================================

fn heading_level(local: &[u8]) -> Option<u32> {
    match local {
        b"h1" => Some(1),
        b"h2" => Some(2),
        b"h3" => Some(3),
        b"h4" => Some(4),
        b"h5" => Some(5),
        b"h6" => Some(6),
        _ => None,
    }
}

fn is_inline(local: &[u8]) -> bool {
    matches!(
        local,
        b"span"
            | b"a"
            | b"strong"
            | b"b"
            | b"em"
            | b"i"
            | b"u"
            | b"s"
            | b"code"
            | b"small"
            | b"sub"
            | b"sup"
            | b"mark"
            | b"abbr"
            | b"cite"
            | b"q"
            | b"kbd"
            | b"var"
            | b"del"
            | b"ins"
            | b"br"
            | b"img"
            | b"wbr"
    )
}

/// Elements whose whole subtree carries no document text.
fn is_skipped(local: &[u8]) -> bool {
    matches!(local, b"head" | b"script" | b"style" | b"template")
}

/// Style tags of an inline element: the implied emphasis first, then classes.
fn inline_styles(local: &[u8], classes: Vec<String>) -> Vec<String> {
    let implied = match local {
        b"strong" | b"b" => Some(BOLD),
        b"em" | b"i" => Some(ITALIC),
        _ => None,
    };
    implied.map(String::from).into_iter().chain(classes).collect()
}

fn attr(start: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return attribute_value(&attr.value).map(Some);
        }
    }
    Ok(None)
}

fn classes(start: &BytesStart<'_>) -> Result<Vec<String>> {
    Ok(attr(start, b"class")?
        .map(|c| c.split_whitespace().map(String::from).collect())
        .unwrap_or_default())
}

fn has_class(start: &BytesStart<'_>, class: &str) -> Result<bool> {
    Ok(classes(start)?.iter().any(|c| c == class))
}

/// A comment marker span, if `start` is one.
fn region_marker(start: &BytesStart<'_>) -> Result<Option<Element>> {
    if local_name(start.name().as_ref()) != b"span" {
        return Ok(None);
    }
    let classes = classes(start)?;
    let is_start = classes.iter().any(|c| c == COMMENT_START_CLASS);
    if !is_start && !classes.iter().any(|c| c == COMMENT_END_CLASS) {
        return Ok(None);
    }
    let id = attr(start, COMMENT_ATTR.as_bytes())?
        .ok_or_else(|| Error::parse(FORMAT, format!("comment marker without {COMMENT_ATTR}")))?;
    Ok(Some(if is_start {
        Element::region_start(id)
    } else {
        Element::region_end(id)
    }))
}

// ============================================================================
// Parser plumbing
// ============================================================================

struct HtmlParser<'x> {
    reader: Reader<&'x [u8]>,
}

impl<'x> HtmlParser<'x> {
    fn new(xml: &'x str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        Self { reader }
    }

    fn next(&mut self) -> Result<Event<'x>> {
        Ok(self.reader.read_event()?)
    }

    fn skip(&mut self, start: &BytesStart<'_>) -> Result<()> {
        self.reader.read_to_end(start.name())?;
        Ok(())
    }

    /// Plain text of an opened element up to its end tag.
    fn text_content(&mut self) -> Result<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
                Event::CData(t) => text.push_str(&String::from_utf8_lossy(t.as_ref())),
                Event::GeneralRef(r) => text.push_str(&expand_reference(&r, FORMAT)?),
                Event::Empty(e) if local_name(e.name().as_ref()) == b"br" => text.push(' '),
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(collapse_whitespace(&text).trim().to_string());
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(Error::parse(FORMAT, "unexpected end of document")),
                _ => {}
            }
        }
    }

    /// Handle the start tag of an inline element.
    ///
    /// Returns whether the element is still open, i.e. its content and end
    /// tag have to be read by the caller, who then closes the span.
    fn inline_start(&mut self, start: &BytesStart<'_>, run: &mut RunBuilder) -> Result<bool> {
        if let Some(marker) = region_marker(start)? {
            run.marker(marker);
            self.skip(start)?;
            return Ok(false);
        }
        let name = start.name();
        let local = local_name(name.as_ref());
        if is_skipped(local) {
            self.skip(start)?;
            return Ok(false);
        }
        if local == b"br" {
            run.line_break();
        }
        run.open_span(inline_styles(local, classes(start)?));
        Ok(true)
    }

    fn inline_empty(&self, start: &BytesStart<'_>, run: &mut RunBuilder) -> Result<()> {
        if let Some(marker) = region_marker(start)? {
            run.marker(marker);
        } else if local_name(start.name().as_ref()) == b"br" {
            run.line_break();
        }
        Ok(())
    }

    /// Feed inline content into `run` up to the end tag of the open element.
    fn inline_content(&mut self, run: &mut RunBuilder) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next()? {
                Event::Text(t) => run.push_raw(&String::from_utf8_lossy(t.as_ref())),
                Event::CData(t) => run.push_literal(&String::from_utf8_lossy(t.as_ref())),
                Event::GeneralRef(r) => run.push_literal(&expand_reference(&r, FORMAT)?),
                Event::Start(e) => {
                    if self.inline_start(&e, run)? {
                        depth += 1;
                    }
                }
                Event::Empty(e) => self.inline_empty(&e, run)?,
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                    run.close_span();
                }
                Event::Eof => return Err(Error::parse(FORMAT, "unterminated inline content")),
                _ => {}
            }
        }
    }

    /// Inline children of an opened `<p>` or `<hN>`.
    fn inline(&mut self) -> Result<Vec<Element>> {
        let mut run = RunBuilder::default();
        self.inline_content(&mut run)?;
        Ok(run.finish())
    }

    /// Read an opened `<aside class="comments">`.
    fn comments_aside(&mut self) -> Result<Vec<DocumentComment>> {
        let mut comments = Vec::new();
        let mut current: Option<(usize, DocumentComment)> = None;
        let mut depth = 0usize;

        loop {
            match self.next()? {
                Event::Start(e) => {
                    let name = e.name();
                    let local = local_name(name.as_ref());
                    if let Some((_, comment)) = current.as_mut()
                        && local == b"p"
                    {
                        comment.paragraphs.push(self.text_content()?);
                        continue;
                    }
                    depth += 1;
                    if current.is_none() && local == b"div" && has_class(&e, COMMENT_CLASS)? {
                        current = Some((depth, comment_header(&e)?));
                    }
                }
                Event::Empty(e) => {
                    if current.is_none() && has_class(&e, COMMENT_CLASS)? {
                        comments.push(comment_header(&e)?);
                    }
                }
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(comments);
                    }
                    if current.as_ref().is_some_and(|(d, _)| *d == depth)
                        && let Some((_, comment)) = current.take()
                    {
                        comments.push(comment);
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(Error::parse(FORMAT, "unterminated comments aside")),
                _ => {}
            }
        }
    }
}

fn comment_header(start: &BytesStart<'_>) -> Result<DocumentComment> {
    let id = attr(start, COMMENT_ATTR.as_bytes())?
        .ok_or_else(|| Error::parse(FORMAT, format!("comment without {COMMENT_ATTR}")))?;
    let mut comment = DocumentComment::new(id);
    comment.author = attr(start, b"data-author")?;
    comment.date = attr(start, b"data-date")?;
    Ok(comment)
}

// ============================================================================
// Body
// ============================================================================

pub(super) fn parse_body(xml: &str) -> Result<(Element, Vec<DocumentComment>)> {
    let mut parser = HtmlParser::new(xml);
    let mut body = BodyBuilder::new();
    let mut loose = RunBuilder::default();
    // One entry per open block element: whether it is a <section>.
    let mut open: Vec<bool> = Vec::new();

    loop {
        match parser.next()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if is_inline(local) {
                    if parser.inline_start(&e, &mut loose)? {
                        parser.inline_content(&mut loose)?;
                        loose.close_span();
                    }
                    continue;
                }
                body.flush(&mut loose);
                if let Some(level) = heading_level(local) {
                    let (id, styles) = (attr(&e, b"id")?, classes(&e)?);
                    let children = parser.inline()?;
                    body.heading(level, id, styles, children);
                } else if local == b"p" {
                    let (id, styles) = (attr(&e, b"id")?, classes(&e)?);
                    let children = parser.inline()?;
                    body.paragraph(id, styles, children);
                } else if local == b"section" {
                    body.open_section(attr(&e, b"id")?, classes(&e)?);
                    open.push(true);
                } else if local == b"aside" && has_class(&e, COMMENTS_CLASS)? {
                    let comments = parser.comments_aside()?;
                    body.comments.extend(comments);
                } else if is_skipped(local) {
                    parser.skip(&e)?;
                } else {
                    open.push(false);
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if is_inline(local) {
                    parser.inline_empty(&e, &mut loose)?;
                    continue;
                }
                body.flush(&mut loose);
                if let Some(level) = heading_level(local) {
                    body.heading(level, attr(&e, b"id")?, classes(&e)?, Vec::new());
                } else if local == b"p" {
                    body.paragraph(attr(&e, b"id")?, classes(&e)?, Vec::new());
                } else if local == b"section" {
                    body.open_section(attr(&e, b"id")?, classes(&e)?);
                    body.close_section();
                }
            }
            Event::Text(t) => loose.push_raw(&String::from_utf8_lossy(t.as_ref())),
            Event::CData(t) => loose.push_literal(&String::from_utf8_lossy(t.as_ref())),
            Event::GeneralRef(r) => loose.push_literal(&expand_reference(&r, FORMAT)?),
            Event::End(_) => {
                body.flush(&mut loose);
                if open.pop() == Some(true) {
                    body.close_section();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(Error::parse(FORMAT, "unexpected end of document"));
    }
    body.flush(&mut loose);
    let (root, comments) = body.finish();
    tracing::debug!(
        sections = root.section_count(),
        comments = comments.len(),
        "read html content"
    );
    Ok((root, comments))
}

/// Level given to the implicit section holding content before any heading.
const PRELUDE_LEVEL: u32 = 0;

struct Frame {
    level: u32,
    /// Opened by a `<section>` tag rather than by a heading.
    explicit: bool,
    section: Element,
}

struct BodyBuilder {
    root: Element,
    open: Vec<Frame>,
    comments: Vec<DocumentComment>,
}

impl BodyBuilder {
    fn new() -> Self {
        Self {
            root: Element::root(),
            open: Vec::new(),
            comments: Vec::new(),
        }
    }

    fn open_section(&mut self, id: Option<String>, styles: Vec<String>) {
        while self
            .open
            .last()
            .is_some_and(|f| !f.explicit && f.level == PRELUDE_LEVEL)
        {
            self.close();
        }
        let mut section = Element::section();
        section.id = id;
        section.styles = styles;
        self.open.push(Frame {
            level: PRELUDE_LEVEL,
            explicit: true,
            section,
        });
    }

    /// Close the innermost explicit section and the implicit ones inside it.
    fn close_section(&mut self) {
        while let Some(frame) = self.open.last() {
            let explicit = frame.explicit;
            self.close();
            if explicit {
                break;
            }
        }
    }

    fn heading(&mut self, level: u32, id: Option<String>, styles: Vec<String>, children: Vec<Element>) {
        while let Some(frame) = self.open.last() {
            if frame.explicit || (frame.level < level && frame.level != PRELUDE_LEVEL) {
                break;
            }
            self.close();
        }
        let mut heading = Element::empty_heading();
        heading.id = id;
        heading.styles = styles;
        heading.children = children;

        if let Some(frame) = self.open.last_mut()
            && frame.explicit
            && frame.section.children.is_empty()
        {
            frame.level = level;
            frame.section.push(heading);
            return;
        }
        let mut section = Element::section();
        section.push(heading);
        self.open.push(Frame {
            level,
            explicit: false,
            section,
        });
    }

    fn paragraph(&mut self, id: Option<String>, styles: Vec<String>, children: Vec<Element>) {
        if self.open.is_empty() {
            self.open.push(Frame {
                level: PRELUDE_LEVEL,
                explicit: false,
                section: Element::section(),
            });
        }
        let mut paragraph = Element::paragraph();
        paragraph.id = id;
        paragraph.styles = styles;
        paragraph.children = children;
        if let Some(frame) = self.open.last_mut() {
            frame.section.push(paragraph);
        }
    }

    /// Turn pending loose inline content into a paragraph.
    fn flush(&mut self, run: &mut RunBuilder) {
        if run.is_empty() {
            return;
        }
        let children = std::mem::take(run).finish();
        if !children.is_empty() {
            self.paragraph(None, Vec::new(), children);
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.open.pop() {
            match self.open.last_mut() {
                Some(parent) => parent.section.push(frame.section),
                None => self.root.push(frame.section),
            }
        }
    }

    fn finish(mut self) -> (Element, Vec<DocumentComment>) {
        while !self.open.is_empty() {
            self.close();
        }
        (self.root, self.comments)
    }
}

// ============================================================================
// Metadata
// ============================================================================

fn parse_head(xml: &str) -> Result<DocumentInfo> {
    let mut parser = HtmlParser::new(xml);
    let mut info = DocumentInfo::default();

    loop {
        match parser.next()? {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"html" => info.language = document_language(&e)?,
                b"title" if info.title.is_none() => {
                    info.title = Some(parser.text_content()?).filter(|t| !t.is_empty());
                }
                b"meta" => meta_entry(&e, &mut info)?,
                b"body" => break,
                _ => {}
            },
            Event::Empty(e) => {
                if local_name(e.name().as_ref()) == b"meta" {
                    meta_entry(&e, &mut info)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(info)
}

fn document_language(start: &BytesStart<'_>) -> Result<Option<String>> {
    match attr(start, b"xml:lang")? {
        Some(lang) => Ok(Some(lang)),
        None => attr(start, b"lang"),
    }
}

fn meta_entry(start: &BytesStart<'_>, info: &mut DocumentInfo) -> Result<()> {
    let (Some(name), Some(content)) = (attr(start, b"name")?, attr(start, b"content")?) else {
        return Ok(());
    };
    let slot = match name.to_ascii_lowercase().as_str() {
        "author" => &mut info.author,
        "publisher" => &mut info.publisher,
        "date" => &mut info.date,
        "identifier" => &mut info.identifier,
        "copyright" => &mut info.copyright,
        "version" => &mut info.version,
        _ => return Ok(()),
    };
    *slot = Some(content);
    Ok(())
}
