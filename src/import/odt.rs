//! OpenDocument Text importer.
//!
//! Accepts both the flat single-file form (`.fodt`, root `office:document`)
//! and the zip package (`.odt`, `content.xml` plus `meta.xml`).
//!
//! Content is taken from `office:body/office:text`. Each `text:h` opens a
//! section at its outline level; `text:p` becomes a paragraph of the
//! innermost open section. Inline content follows ODF white-space rules:
//! raw whitespace collapses, `text:s` and `text:tab` are literal.

use std::io::{Cursor, Read, Seek};

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use super::Importer;
use super::run::RunBuilder;
use crate::error::{Error, Result};
use crate::metadata::DocumentInfo;
use crate::odf::{Ns, OdfNamespaces, ResolvedName};
use crate::tree::{Document, DocumentComment, Element};
use crate::util::{attribute_value, collapse_whitespace, decode_xml, expand_reference};

const FORMAT: &str = "odt";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Importer for OpenDocument Text documents.
#[derive(Debug, Clone, Default)]
pub struct OdtImporter {
    namespaces: OdfNamespaces,
}

impl OdtImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom namespace table, e.g. one with legacy aliases.
    pub fn with_namespaces(namespaces: OdfNamespaces) -> Self {
        Self { namespaces }
    }
}

impl Importer for OdtImporter {
    fn read_metadata(&self, bytes: &[u8]) -> Result<DocumentInfo> {
        let parts = OdtParts::load(bytes)?;
        parse_meta(parts.meta(), &self.namespaces)
    }

    fn read_content(&self, bytes: &[u8]) -> Result<Element> {
        let parts = OdtParts::load(bytes)?;
        Ok(parse_body(&parts.content, &self.namespaces)?.0)
    }

    fn read_comments(&self, bytes: &[u8]) -> Result<Vec<DocumentComment>> {
        let parts = OdtParts::load(bytes)?;
        Ok(parse_body(&parts.content, &self.namespaces)?.1)
    }

    fn read_document(&self, bytes: &[u8]) -> Result<Document> {
        let parts = OdtParts::load(bytes)?;
        let (root, comments) = parse_body(&parts.content, &self.namespaces)?;
        let info = parse_meta(parts.meta(), &self.namespaces)?;
        Ok(Document::new(root).with_info(info).with_comments(comments))
    }
}

// ============================================================================
// Container
// ============================================================================

/// The XML parts of a document. A flat document holds both in one part.
struct OdtParts {
    content: String,
    meta: Option<String>,
}

impl OdtParts {
    fn load(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(ZIP_MAGIC) {
            return Ok(Self {
                content: decode_xml(bytes).into_owned(),
                meta: None,
            });
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let content = read_entry(&mut archive, "content.xml")?
            .ok_or_else(|| Error::parse(FORMAT, "package has no content.xml"))?;
        let meta = read_entry(&mut archive, "meta.xml")?;
        Ok(Self { content, meta })
    }

    fn meta(&self) -> &str {
        self.meta.as_deref().unwrap_or(&self.content)
    }
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            Ok(Some(decode_xml(&bytes).into_owned()))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Parser plumbing
// ============================================================================

struct OdtParser<'x, 'n> {
    reader: NsReader<&'x [u8]>,
    namespaces: &'n OdfNamespaces,
    /// Elements opened and not yet closed.
    depth: usize,
}

impl<'x, 'n> OdtParser<'x, 'n> {
    fn new(xml: &'x str, namespaces: &'n OdfNamespaces) -> Self {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(false);
        Self {
            reader,
            namespaces,
            depth: 0,
        }
    }

    fn next(&mut self) -> Result<Event<'x>> {
        let event = self.reader.read_event()?;
        match event {
            Event::Start(_) => self.depth += 1,
            Event::End(_) => self.depth = self.depth.saturating_sub(1),
            Event::Eof if self.depth > 0 => {
                return Err(Error::parse(FORMAT, "unexpected end of document"));
            }
            _ => {}
        }
        Ok(event)
    }

    /// The resolved name of the element just read.
    fn name(&self, start: &BytesStart<'_>) -> ResolvedName {
        let resolved = self.reader.resolver().resolve_element(start.name());
        ResolvedName::from_resolved(self.namespaces, resolved)
    }

    /// Skip the rest of an opened element.
    fn skip(&mut self, start: &BytesStart<'_>) -> Result<()> {
        self.reader.read_to_end(start.name())?;
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }

    /// The unescaped value of the attribute `(ns, local)` on `start`.
    fn attr(&self, start: &BytesStart<'_>, ns: Ns, local: &str) -> Result<Option<String>> {
        for attr in start.attributes() {
            let attr = attr?;
            let resolved = self.reader.resolver().resolve_attribute(attr.key);
            if ResolvedName::from_resolved(self.namespaces, resolved).is(ns, local) {
                return attribute_value(&attr.value).map(Some);
            }
        }
        Ok(None)
    }

    fn space_count(&self, start: &BytesStart<'_>) -> Result<usize> {
        match self.attr(start, Ns::Text, "c")? {
            Some(c) => c
                .trim()
                .parse()
                .map_err(|_| Error::parse(FORMAT, format!("invalid text:c count '{c}'"))),
            None => Ok(1),
        }
    }

    fn outline_level(&self, start: &BytesStart<'_>) -> Result<u32> {
        match self.attr(start, Ns::Text, "outline-level")? {
            Some(level) => level
                .trim()
                .parse::<u32>()
                .map(|l| l.max(1))
                .map_err(|_| Error::parse(FORMAT, format!("invalid outline level '{level}'"))),
            None => Ok(1),
        }
    }
}

// ============================================================================
// Body
// ============================================================================

fn parse_body(xml: &str, namespaces: &OdfNamespaces) -> Result<(Element, Vec<DocumentComment>)> {
    let mut parser = OdtParser::new(xml, namespaces);
    let mut path: Vec<ResolvedName> = Vec::new();
    let mut body = BodyBuilder::new();
    let mut found = false;

    loop {
        match parser.next()? {
            Event::Start(e) => {
                let name = parser.name(&e);
                if !found && name.is(Ns::Office, "text") && is_body_path(&path) {
                    parser.text_body(&mut body)?;
                    found = true;
                } else {
                    path.push(name);
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !found {
        return Err(Error::parse(FORMAT, "no office:body/office:text element"));
    }
    let (root, comments) = body.finish();
    tracing::debug!(
        sections = root.section_count(),
        comments = comments.len(),
        "read odt content"
    );
    Ok((root, comments))
}

fn is_body_path(path: &[ResolvedName]) -> bool {
    matches!(path, [document, body]
        if (document.is(Ns::Office, "document") || document.is(Ns::Office, "document-content"))
            && body.is(Ns::Office, "body"))
}

fn is_block_container(name: &ResolvedName) -> bool {
    name.ns == Some(Ns::Text)
        && matches!(
            name.local.as_str(),
            "section" | "list" | "list-item" | "list-header"
        )
}

impl OdtParser<'_, '_> {
    /// Read the children of `office:text` up to and including its end tag.
    fn text_body(&mut self, body: &mut BodyBuilder) -> Result<()> {
        let mut containers = 0usize;
        loop {
            match self.next()? {
                Event::Start(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Text, "h") {
                        let level = self.outline_level(&e)?;
                        let style = self.attr(&e, Ns::Text, "style-name")?;
                        let children = self.inline(body)?;
                        body.heading(level, style, children);
                    } else if name.is(Ns::Text, "p") {
                        let style = self.attr(&e, Ns::Text, "style-name")?;
                        let children = self.inline(body)?;
                        body.paragraph(style, children);
                    } else if is_block_container(&name) {
                        containers += 1;
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::Empty(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Text, "h") {
                        let level = self.outline_level(&e)?;
                        let style = self.attr(&e, Ns::Text, "style-name")?;
                        body.heading(level, style, Vec::new());
                    } else if name.is(Ns::Text, "p") {
                        let style = self.attr(&e, Ns::Text, "style-name")?;
                        body.paragraph(style, Vec::new());
                    }
                }
                Event::End(_) => {
                    if containers == 0 {
                        return Ok(());
                    }
                    containers -= 1;
                }
                Event::Eof => return Err(Error::parse(FORMAT, "unterminated office:text")),
                _ => {}
            }
        }
    }

    /// Read the inline content of a `text:p`/`text:h` up to its end tag.
    fn inline(&mut self, body: &mut BodyBuilder) -> Result<Vec<Element>> {
        let mut run = RunBuilder::default();
        // One entry per open inline element: whether it pushed a span style.
        let mut frames: Vec<bool> = Vec::new();

        loop {
            match self.next()? {
                Event::Text(t) => run.push_raw(&String::from_utf8_lossy(t.as_ref())),
                Event::CData(t) => run.push_literal(&String::from_utf8_lossy(t.as_ref())),
                Event::GeneralRef(r) => run.push_literal(&expand_reference(&r, FORMAT)?),
                Event::Start(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Text, "span") {
                        run.open_span(self.attr(&e, Ns::Text, "style-name")?.into_iter().collect());
                        frames.push(true);
                    } else if name.is(Ns::Office, "annotation") {
                        let id = self.attr(&e, Ns::Office, "name")?;
                        let comment = self.annotation_body()?;
                        body.annotate(&mut run, id, comment);
                    } else if self.inline_marker(&name, &e, &mut run)? || is_transparent(&name) {
                        frames.push(false);
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::Empty(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Office, "annotation") {
                        let id = self.attr(&e, Ns::Office, "name")?;
                        body.annotate(&mut run, id, DocumentComment::default());
                    } else {
                        self.inline_marker(&name, &e, &mut run)?;
                    }
                }
                Event::End(_) => match frames.pop() {
                    None => return Ok(run.finish()),
                    Some(true) => run.close_span(),
                    Some(false) => {}
                },
                Event::Eof => return Err(Error::parse(FORMAT, "unterminated paragraph")),
                _ => {}
            }
        }
    }

    /// Handle the empty inline elements; returns whether `name` was one.
    fn inline_marker(
        &self,
        name: &ResolvedName,
        start: &BytesStart<'_>,
        run: &mut RunBuilder,
    ) -> Result<bool> {
        if name.is(Ns::Text, "s") {
            run.push_literal(&" ".repeat(self.space_count(start)?));
        } else if name.is(Ns::Text, "tab") {
            run.push_literal("\t");
        } else if name.is(Ns::Text, "line-break") {
            run.line_break();
        } else if name.is(Ns::Text, "soft-page-break") {
            run.soft_break();
        } else if name.is(Ns::Office, "annotation-end") {
            match self.attr(start, Ns::Office, "name")? {
                Some(id) => run.marker(Element::region_end(id)),
                None => return Err(Error::parse(FORMAT, "office:annotation-end without office:name")),
            }
        } else {
            return Ok(false);
        }
        Ok(true)
    }

    /// Read an `office:annotation` after its start tag.
    fn annotation_body(&mut self) -> Result<DocumentComment> {
        let mut comment = DocumentComment::default();
        let mut open: Vec<ResolvedName> = Vec::new();
        let mut buffer = String::new();

        loop {
            match self.next()? {
                Event::Start(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Dc, "creator") || name.is(Ns::Dc, "date") || name.is(Ns::Text, "p") {
                        buffer.clear();
                    }
                    open.push(name);
                }
                Event::Empty(e) => {
                    let name = self.name(&e);
                    if name.is(Ns::Text, "s") || name.is(Ns::Text, "line-break") {
                        buffer.push(' ');
                    } else if name.is(Ns::Text, "tab") {
                        buffer.push('\t');
                    } else if name.is(Ns::Text, "p") {
                        comment.paragraphs.push(String::new());
                    }
                }
                Event::Text(t) => buffer.push_str(&String::from_utf8_lossy(t.as_ref())),
                Event::GeneralRef(r) => buffer.push_str(&expand_reference(&r, FORMAT)?),
                Event::End(_) => {
                    let Some(name) = open.pop() else {
                        return Ok(comment);
                    };
                    let value = collapse_whitespace(&buffer).trim().to_string();
                    if name.is(Ns::Dc, "creator") {
                        comment.author = Some(value).filter(|v| !v.is_empty());
                    } else if name.is(Ns::Dc, "date") {
                        comment.date = Some(value).filter(|v| !v.is_empty());
                    } else if name.is(Ns::Text, "p") {
                        comment.paragraphs.push(value);
                    } else {
                        continue;
                    }
                    buffer.clear();
                }
                Event::Eof => return Err(Error::parse(FORMAT, "unterminated office:annotation")),
                _ => {}
            }
        }
    }
}

/// Inline elements whose text is kept while the element itself is ignored.
fn is_transparent(name: &ResolvedName) -> bool {
    name.ns == Some(Ns::Text) && name.local != "note"
}

// ============================================================================
// Tree building
// ============================================================================

/// Level given to the section holding content that precedes any heading.
const PRELUDE_LEVEL: u32 = 0;

struct BodyBuilder {
    root: Element,
    open: Vec<(u32, Element)>,
    comments: Vec<DocumentComment>,
    unnamed: usize,
}

impl BodyBuilder {
    fn new() -> Self {
        Self {
            root: Element::root(),
            open: Vec::new(),
            comments: Vec::new(),
            unnamed: 0,
        }
    }

    fn heading(&mut self, level: u32, style: Option<String>, children: Vec<Element>) {
        while let Some((open_level, _)) = self.open.last() {
            if *open_level < level && *open_level != PRELUDE_LEVEL {
                break;
            }
            self.close();
        }
        let mut heading = Element::empty_heading();
        heading.styles.extend(style);
        heading.children = children;

        let mut section = Element::section();
        section.push(heading);
        self.open.push((level, section));
    }

    fn paragraph(&mut self, style: Option<String>, children: Vec<Element>) {
        if self.open.is_empty() {
            self.open.push((PRELUDE_LEVEL, Element::section()));
        }
        let mut paragraph = Element::paragraph();
        paragraph.styles.extend(style);
        paragraph.children = children;
        if let Some((_, section)) = self.open.last_mut() {
            section.push(paragraph);
        }
    }

    /// Register a comment and place its start marker in the run.
    ///
    /// Unnamed annotations mark a point: they get a generated identifier
    /// and an end marker right after the start.
    fn annotate(&mut self, run: &mut RunBuilder, id: Option<String>, mut comment: DocumentComment) {
        let point = id.is_none();
        comment.id = id.unwrap_or_else(|| {
            self.unnamed += 1;
            format!("annotation-{}", self.unnamed)
        });
        run.marker(Element::region_start(comment.id.as_str()));
        if point {
            run.marker(Element::region_end(comment.id.as_str()));
        }
        self.comments.push(comment);
    }

    fn close(&mut self) {
        if let Some((_, section)) = self.open.pop() {
            match self.open.last_mut() {
                Some((_, parent)) => parent.push(section),
                None => self.root.push(section),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Title,
    Language,
    Creator,
    InitialCreator,
    Date,
    Identifier,
    Publisher,
    Copyright,
    Version,
    Ignored,
}

impl MetaField {
    fn from_name(name: &ResolvedName, user_name: Option<&str>) -> Self {
        match (name.ns, name.local.as_str()) {
            (Some(Ns::Dc), "title") => MetaField::Title,
            (Some(Ns::Dc), "language") => MetaField::Language,
            (Some(Ns::Dc), "creator") => MetaField::Creator,
            (Some(Ns::Dc), "date") => MetaField::Date,
            (Some(Ns::Meta), "initial-creator") => MetaField::InitialCreator,
            (Some(Ns::Meta), "user-defined") => match user_name {
                Some("Identifier") => MetaField::Identifier,
                Some("Publisher") => MetaField::Publisher,
                Some("Copyright") => MetaField::Copyright,
                Some("Version") => MetaField::Version,
                _ => MetaField::Ignored,
            },
            _ => MetaField::Ignored,
        }
    }
}

fn parse_meta(xml: &str, namespaces: &OdfNamespaces) -> Result<DocumentInfo> {
    let mut parser = OdtParser::new(xml, namespaces);
    let mut info = DocumentInfo::default();
    let mut initial_creator = None;
    let mut in_meta = false;
    let mut field: Option<MetaField> = None;
    let mut nested = 0usize;
    let mut buffer = String::new();

    loop {
        match parser.next()? {
            Event::Start(e) => {
                let name = parser.name(&e);
                if name.is(Ns::Office, "meta") {
                    in_meta = true;
                } else if field.is_some() {
                    nested += 1;
                } else if in_meta {
                    let user_name = parser.attr(&e, Ns::Meta, "name")?;
                    field = Some(MetaField::from_name(&name, user_name.as_deref()));
                    buffer.clear();
                }
            }
            Event::Text(t) if field.is_some() => {
                buffer.push_str(&String::from_utf8_lossy(t.as_ref()));
            }
            Event::GeneralRef(r) if field.is_some() => {
                buffer.push_str(&expand_reference(&r, FORMAT)?);
            }
            Event::End(_) => {
                if nested > 0 {
                    nested -= 1;
                } else if let Some(done) = field.take() {
                    let value = collapse_whitespace(&buffer).trim().to_string();
                    if !value.is_empty() {
                        let slot = match done {
                            MetaField::Title => &mut info.title,
                            MetaField::Language => &mut info.language,
                            MetaField::Creator => &mut info.author,
                            MetaField::InitialCreator => &mut initial_creator,
                            MetaField::Date => &mut info.date,
                            MetaField::Identifier => &mut info.identifier,
                            MetaField::Publisher => &mut info.publisher,
                            MetaField::Copyright => &mut info.copyright,
                            MetaField::Version => &mut info.version,
                            MetaField::Ignored => continue,
                        };
                        *slot = Some(value);
                    }
                } else if in_meta {
                    in_meta = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if info.author.is_none() {
        info.author = initial_creator;
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::odf::{DC_NS, META_NS, OFFICE_NS, TEXT_NS};
    use crate::tree::ElementKind;

    fn flat(meta: &str, body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document xmlns:office="{OFFICE_NS}" xmlns:text="{TEXT_NS}" xmlns:dc="{DC_NS}" xmlns:meta="{META_NS}">
  <office:meta>{meta}</office:meta>
  <office:body>
    <office:text>{body}</office:text>
  </office:body>
</office:document>"#
        )
    }

    fn content(body: &str) -> Element {
        OdtImporter::new()
            .read_content(flat("", body).as_bytes())
            .unwrap()
    }

    fn texts(element: &Element) -> Vec<String> {
        element
            .children
            .iter()
            .filter_map(|c| c.as_text().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_headings_nest_by_outline_level() {
        let root = content(
            r#"<text:h text:outline-level="1">Book</text:h>
               <text:h text:outline-level="2">One</text:h>
               <text:p>First</text:p>
               <text:h text:outline-level="2">Two</text:h>
               <text:p>Second</text:p>
               <text:h text:outline-level="1">Appendix</text:h>"#,
        );
        assert_eq!(root.section_count(), 2);
        let book = root.sections().next().unwrap();
        assert_eq!(book.section_title().unwrap(), "Book");
        let titles: Vec<String> = book
            .subsections()
            .map(|s| s.section_title().unwrap())
            .collect();
        assert_eq!(titles, vec!["One", "Two"]);
        let two = book.subsections().nth(1).unwrap();
        assert_eq!(two.paragraphs().next().unwrap().plain_text(), "Second");
    }

    #[test]
    fn test_content_before_heading_gets_headingless_section() {
        let root = content(r#"<text:p>Preface</text:p><text:h>Start</text:h>"#);
        let sections: Vec<&Element> = root.sections().collect();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].heading().is_err());
        assert_eq!(sections[1].section_title().unwrap(), "Start");
    }

    #[test]
    fn test_prefixes_are_resolved_not_matched() {
        let xml = format!(
            r#"<o:document xmlns:o="{OFFICE_NS}" xmlns:t="{TEXT_NS}"><o:body><o:text>
                 <t:h t:outline-level="1">Title</t:h><t:p>Body</t:p>
               </o:text></o:body></o:document>"#
        );
        let root = OdtImporter::new().read_content(xml.as_bytes()).unwrap();
        assert_eq!(root.sections().next().unwrap().section_title().unwrap(), "Title");
    }

    #[test]
    fn test_whitespace_processing() {
        let root = content(
            "<text:h>T</text:h><text:p>\n   Hello \n  world<text:s text:c=\"3\"/>end<text:tab/>x  </text:p>",
        );
        let section = root.sections().next().unwrap();
        let paragraph = section.paragraphs().next().unwrap();
        assert_eq!(texts(paragraph), vec!["Hello world   end\tx"]);
    }

    #[test]
    fn test_spans_and_breaks() {
        let root = content(
            r#"<text:h>T</text:h><text:p text:style-name="Body">Plain <text:span text:style-name="Strong">bold <text:span text:style-name="Em">both</text:span></text:span><text:line-break/>next<text:soft-page-break/>page</text:p>"#,
        );
        let paragraph = root.sections().next().unwrap().paragraphs().next().unwrap();
        assert_eq!(paragraph.styles, vec!["Body"]);
        let spans = &paragraph.children;
        assert_eq!(spans[0].as_text(), Some("Plain "));
        assert_eq!(spans[1].as_text(), Some("bold "));
        assert_eq!(spans[1].styles, vec!["Strong"]);
        assert_eq!(spans[2].as_text(), Some("both"));
        assert_eq!(spans[2].styles, vec!["Strong", "Em"]);
        assert!(spans[2].line_break());
        assert_eq!(spans[3].as_text(), Some("next"));
        assert_eq!(spans[4].as_text(), Some("page"));
    }

    #[test]
    fn test_adjacent_same_style_text_merges() {
        let root = content("<text:h>T</text:h><text:p>A &amp; B<text:span>C</text:span></text:p>");
        let paragraph = root.sections().next().unwrap().paragraphs().next().unwrap();
        assert_eq!(texts(paragraph), vec!["A & BC"]);
    }

    #[test]
    fn test_annotations_become_regions_and_comments() {
        let xml = flat(
            "",
            r#"<text:h>T</text:h><text:p>Before <office:annotation office:name="c1"><dc:creator>Ann</dc:creator><dc:date>2024-05-01</dc:date><text:p>Check this</text:p><text:p>Second line</text:p></office:annotation>marked<office:annotation-end office:name="c1"/> after<office:annotation><text:p>Point</text:p></office:annotation></text:p>"#,
        );
        let doc = OdtImporter::new().read_document(xml.as_bytes()).unwrap();
        let paragraph = doc.root.sections().next().unwrap().paragraphs().next().unwrap();
        let kinds: Vec<&ElementKind> = paragraph.children.iter().map(|c| &c.kind).collect();
        assert!(matches!(kinds[1], ElementKind::RegionStart));
        assert_eq!(paragraph.children[1].region_id(), Some("c1"));
        assert_eq!(paragraph.children[2].as_text(), Some("marked"));
        assert!(matches!(kinds[3], ElementKind::RegionEnd));
        assert_eq!(paragraph.children[5].region_id(), Some("annotation-1"));
        assert_eq!(paragraph.children[6].region_id(), Some("annotation-1"));

        assert_eq!(doc.comments.len(), 2);
        assert_eq!(doc.comments[0].id, "c1");
        assert_eq!(doc.comments[0].author.as_deref(), Some("Ann"));
        assert_eq!(doc.comments[0].date.as_deref(), Some("2024-05-01"));
        assert_eq!(doc.comments[0].paragraphs, vec!["Check this", "Second line"]);
        assert_eq!(doc.comments[1].paragraphs, vec!["Point"]);
    }

    #[test]
    fn test_metadata() {
        let xml = flat(
            r#"<dc:title>The Book</dc:title><dc:language>en-GB</dc:language>
               <meta:initial-creator>Jane Doe</meta:initial-creator><dc:date>2020-01-01</dc:date>
               <meta:user-defined meta:name="Identifier">ISBN 81-7525-766-0</meta:user-defined>
               <meta:user-defined meta:name="Publisher">Press &amp; Co</meta:user-defined>
               <meta:user-defined meta:name="Unrelated">x</meta:user-defined>"#,
            "<text:p/>",
        );
        let info = OdtImporter::new().read_metadata(xml.as_bytes()).unwrap();
        assert_eq!(info.title.as_deref(), Some("The Book"));
        assert_eq!(info.language.as_deref(), Some("en-GB"));
        assert_eq!(info.author.as_deref(), Some("Jane Doe"));
        assert_eq!(info.identifier.as_deref(), Some("ISBN 81-7525-766-0"));
        assert_eq!(info.publisher.as_deref(), Some("Press & Co"));
        assert_eq!(info.copyright, None);
    }

    #[test]
    fn test_malformed_markup_is_a_parse_error() {
        let truncated = format!(
            r#"<office:document xmlns:office="{OFFICE_NS}" xmlns:text="{TEXT_NS}"><office:body><office:text><text:p>unclosed"#
        );
        let err = OdtImporter::new().read_content(truncated.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let mismatched = flat("", "<text:p><text:span>x</text:p></text:span>");
        let err = OdtImporter::new().read_content(mismatched.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_namespace_aliases() {
        let legacy = "http://openoffice.org/2000/text";
        let xml = format!(
            r#"<office:document xmlns:office="{OFFICE_NS}" xmlns:text="{legacy}"><office:body><office:text>
                 <text:h>Old</text:h></office:text></office:body></office:document>"#
        );
        let root = OdtImporter::new().read_content(xml.as_bytes()).unwrap();
        assert_eq!(root.section_count(), 0);

        let importer =
            OdtImporter::with_namespaces(OdfNamespaces::default().with_alias(Ns::Text, legacy));
        let root = importer.read_content(xml.as_bytes()).unwrap();
        assert_eq!(root.sections().next().unwrap().section_title().unwrap(), "Old");
    }

    #[test]
    fn test_missing_body_is_a_parse_error() {
        let xml = format!(r#"<office:document xmlns:office="{OFFICE_NS}"/>"#);
        let err = OdtImporter::new().read_content(xml.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
