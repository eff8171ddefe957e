//! OpenDocument Text exporter.
//!
//! Produces either a flat `.fodt` document or an `.odt` zip package. The XML
//! is written indented and then collapsed inside every `text:p`/`text:h`,
//! because word processors treat whitespace between inline elements as
//! content.

use std::io::{Cursor, Write};

use memchr::memmem;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Exporter, misplaced, region_id};
use crate::error::{Error, Result};
use crate::metadata::DocumentInfo;
use crate::odf::{DC_NS, MANIFEST_NS, META_NS, ODT_MIMETYPE, OFFICE_NS, STYLE_NS, TEXT_NS};
use crate::tree::{CommentIndex, Document, Element, ElementKind};

const ODF_VERSION: &str = "1.3";
const GENERATOR: &str = concat!("bindery/", env!("CARGO_PKG_VERSION"));

/// Configuration for ODT export.
#[derive(Debug, Clone, Default)]
pub struct OdtConfig {
    /// Write a zip package instead of a flat document.
    pub package: bool,
    /// Flat template whose `office:text` and `office:meta` contents are
    /// replaced by the generated ones. Only valid for flat output.
    pub template: Option<String>,
}

/// OpenDocument Text exporter.
#[derive(Debug, Clone, Default)]
pub struct OdtExporter {
    config: OdtConfig,
}

impl OdtExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: OdtConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for OdtExporter {
    fn extension(&self) -> &'static str {
        if self.config.package { "odt" } else { "fodt" }
    }

    fn to_bytes(&self, document: &Document) -> Result<Vec<u8>> {
        let index = CommentIndex::new(&document.root, &document.comments)?;

        if self.config.package {
            if self.config.template.is_some() {
                return Err(Error::Configuration(
                    "templates apply to flat documents only".into(),
                ));
            }
            return write_package(document, &index);
        }

        let xml = match &self.config.template {
            Some(template) => {
                let body = render(|w| write_body_content(w, &document.root, &index))?;
                let meta = render(|w| write_meta_content(w, &document.info))?;
                splice_template(template, &body, &meta)?
            }
            None => render(|w| write_flat(w, document, &index))?,
        };
        Ok(xml.into_bytes())
    }
}

type XmlWriter = Writer<Vec<u8>>;

/// Run `f` against an indenting writer and collapse the result.
fn render<F>(f: F) -> Result<String>
where
    F: FnOnce(&mut XmlWriter) -> Result<()>,
{
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);
    f(&mut writer)?;
    let xml = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::parse("odt", e.to_string()))?;
    Ok(collapse_inline_indentation(&xml))
}

fn root_start(name: &str) -> BytesStart<'_> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("xmlns:office", OFFICE_NS));
    start.push_attribute(("xmlns:text", TEXT_NS));
    start.push_attribute(("xmlns:style", STYLE_NS));
    start.push_attribute(("xmlns:meta", META_NS));
    start.push_attribute(("xmlns:dc", DC_NS));
    start.push_attribute(("office:version", ODF_VERSION));
    start
}

fn write_flat(w: &mut XmlWriter, document: &Document, index: &CommentIndex<'_>) -> Result<()> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = root_start("office:document");
    root.push_attribute(("office:mimetype", ODT_MIMETYPE));
    w.write_event(Event::Start(root))?;
    write_meta(w, &document.info)?;
    write_body(w, &document.root, index)?;
    w.write_event(Event::End(BytesEnd::new("office:document")))?;
    Ok(())
}

fn write_package(document: &Document, index: &CommentIndex<'_>) -> Result<Vec<u8>> {
    let content = render(|w| {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        w.write_event(Event::Start(root_start("office:document-content")))?;
        write_body(w, &document.root, index)?;
        w.write_event(Event::End(BytesEnd::new("office:document-content")))?;
        Ok(())
    })?;
    let meta = render(|w| {
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        w.write_event(Event::Start(root_start("office:document-meta")))?;
        write_meta(w, &document.info)?;
        w.write_event(Event::End(BytesEnd::new("office:document-meta")))?;
        Ok(())
    })?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be first and uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(ODT_MIMETYPE.as_bytes())?;

    zip.start_file("META-INF/manifest.xml", deflated)?;
    zip.write_all(manifest_xml().as_bytes())?;

    zip.start_file("content.xml", deflated)?;
    zip.write_all(content.as_bytes())?;

    zip.start_file("meta.xml", deflated)?;
    zip.write_all(meta.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn manifest_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="{MANIFEST_NS}" manifest:version="{ODF_VERSION}">
 <manifest:file-entry manifest:full-path="/" manifest:version="{ODF_VERSION}" manifest:media-type="{ODT_MIMETYPE}"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="meta.xml" manifest:media-type="text/xml"/>
</manifest:manifest>
"#
    )
}

// ============================================================================
// Metadata
// ============================================================================

fn write_meta(w: &mut XmlWriter, info: &DocumentInfo) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("office:meta")))?;
    write_meta_content(w, info)?;
    w.write_event(Event::End(BytesEnd::new("office:meta")))?;
    Ok(())
}

fn write_meta_content(w: &mut XmlWriter, info: &DocumentInfo) -> Result<()> {
    write_text_element(w, "meta:generator", GENERATOR)?;
    let dc = [
        ("dc:title", &info.title),
        ("dc:language", &info.language),
        ("dc:creator", &info.author),
        ("dc:date", &info.date),
    ];
    for (name, value) in dc {
        if let Some(value) = value {
            write_text_element(w, name, value)?;
        }
    }

    let user_defined = [
        ("Identifier", &info.identifier),
        ("Publisher", &info.publisher),
        ("Copyright", &info.copyright),
        ("Version", &info.version),
    ];
    for (name, value) in user_defined {
        if let Some(value) = value {
            let mut start = BytesStart::new("meta:user-defined");
            start.push_attribute(("meta:name", name));
            start.push_attribute(("meta:value-type", "string"));
            w.write_event(Event::Start(start))?;
            w.write_event(Event::Text(BytesText::new(value)))?;
            w.write_event(Event::End(BytesEnd::new("meta:user-defined")))?;
        }
    }
    Ok(())
}

fn write_text_element(w: &mut XmlWriter, name: &str, value: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

// ============================================================================
// Body
// ============================================================================

fn write_body(w: &mut XmlWriter, root: &Element, index: &CommentIndex<'_>) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("office:body")))?;
    w.write_event(Event::Start(BytesStart::new("office:text")))?;
    write_body_content(w, root, index)?;
    w.write_event(Event::End(BytesEnd::new("office:text")))?;
    w.write_event(Event::End(BytesEnd::new("office:body")))?;
    Ok(())
}

fn write_body_content(w: &mut XmlWriter, root: &Element, index: &CommentIndex<'_>) -> Result<()> {
    for child in &root.children {
        match child.kind {
            ElementKind::Section => write_section(w, child, 1, index)?,
            _ => return Err(misplaced(child, "document root")),
        }
    }
    tracing::debug!(sections = root.section_count(), "wrote odt body");
    Ok(())
}

fn write_section(
    w: &mut XmlWriter,
    section: &Element,
    depth: u32,
    index: &CommentIndex<'_>,
) -> Result<()> {
    for child in &section.children {
        match &child.kind {
            ElementKind::Heading => write_block(w, "text:h", child, Some(depth), index)?,
            ElementKind::Paragraph => write_block(w, "text:p", child, None, index)?,
            ElementKind::Section => write_section(w, child, depth + 1, index)?,
            ElementKind::Root
            | ElementKind::Text { .. }
            | ElementKind::RegionStart
            | ElementKind::RegionEnd => return Err(misplaced(child, "section")),
        }
    }
    Ok(())
}

fn write_block(
    w: &mut XmlWriter,
    tag: &str,
    block: &Element,
    level: Option<u32>,
    index: &CommentIndex<'_>,
) -> Result<()> {
    let mut start = BytesStart::new(tag);
    match block.styles.as_slice() {
        [] => {}
        [style] => start.push_attribute(("text:style-name", style.as_str())),
        // A paragraph or heading carries exactly one paragraph style.
        styles => return Err(Error::mapping("odt paragraph style", styles.join(" "))),
    }
    if let Some(level) = level {
        start.push_attribute(("text:outline-level", level.to_string().as_str()));
    }

    if block.children.is_empty() {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }

    w.write_event(Event::Start(start))?;
    for child in &block.children {
        match &child.kind {
            ElementKind::Text { text, line_break } => {
                for style in &child.styles {
                    let mut span = BytesStart::new("text:span");
                    span.push_attribute(("text:style-name", style.as_str()));
                    w.write_event(Event::Start(span))?;
                }
                write_encoded_text(w, text)?;
                for _ in &child.styles {
                    w.write_event(Event::End(BytesEnd::new("text:span")))?;
                }
                if *line_break {
                    w.write_event(Event::Empty(BytesStart::new("text:line-break")))?;
                }
            }
            ElementKind::RegionStart => {
                let id = region_id(child)?;
                let comment = index.start(id)?;
                let mut start = BytesStart::new("office:annotation");
                start.push_attribute(("office:name", id));
                w.write_event(Event::Start(start))?;
                if let Some(author) = &comment.author {
                    write_text_element(w, "dc:creator", author)?;
                }
                if let Some(date) = &comment.date {
                    write_text_element(w, "dc:date", date)?;
                }
                for paragraph in &comment.paragraphs {
                    if paragraph.is_empty() {
                        w.write_event(Event::Empty(BytesStart::new("text:p")))?;
                    } else {
                        write_text_element(w, "text:p", paragraph)?;
                    }
                }
                w.write_event(Event::End(BytesEnd::new("office:annotation")))?;
            }
            ElementKind::RegionEnd => {
                let id = region_id(child)?;
                if index.end(id).is_some() {
                    let mut end = BytesStart::new("office:annotation-end");
                    end.push_attribute(("office:name", id));
                    w.write_event(Event::Empty(end))?;
                }
            }
            ElementKind::Root | ElementKind::Section | ElementKind::Heading | ElementKind::Paragraph => {
                return Err(misplaced(child, "paragraph"));
            }
        }
    }
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Write text so that reading it back yields the same characters.
///
/// Spaces at either end of the span and every space after the first in a
/// run become `text:s`; tabs become `text:tab`; newlines become spaces.
fn write_encoded_text(w: &mut XmlWriter, text: &str) -> Result<()> {
    let chars: Vec<char> = text
        .chars()
        .map(|c| if matches!(c, '\n' | '\r') { ' ' } else { c })
        .collect();
    let mut raw = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' => {
                let run = chars[i..].iter().take_while(|c| **c == ' ').count();
                let interior = i > 0 && i + run < chars.len();
                let mut encoded = run;
                if interior {
                    raw.push(' ');
                    encoded -= 1;
                }
                if encoded > 0 {
                    flush_raw(w, &mut raw)?;
                    let mut space = BytesStart::new("text:s");
                    if encoded > 1 {
                        space.push_attribute(("text:c", encoded.to_string().as_str()));
                    }
                    w.write_event(Event::Empty(space))?;
                }
                i += run;
            }
            '\t' => {
                flush_raw(w, &mut raw)?;
                w.write_event(Event::Empty(BytesStart::new("text:tab")))?;
                i += 1;
            }
            c => {
                raw.push(c);
                i += 1;
            }
        }
    }
    flush_raw(w, &mut raw)
}

fn flush_raw(w: &mut XmlWriter, raw: &mut String) -> Result<()> {
    if !raw.is_empty() {
        w.write_event(Event::Text(BytesText::new(raw.as_str())))?;
        raw.clear();
    }
    Ok(())
}

// ============================================================================
// Post-processing
// ============================================================================

/// Remove indentation between tags inside `text:p` and `text:h`.
pub(crate) fn collapse_inline_indentation(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut depth = 0usize;
    let mut rest = xml;

    while let Some(lt) = rest.find('<') {
        let (text, tail) = rest.split_at(lt);
        let indentation = text.starts_with('\n') && text.trim().is_empty();
        if !(depth > 0 && indentation) {
            out.push_str(text);
        }

        let end = tail.find('>').map_or(tail.len(), |i| i + 1);
        let tag = &tail[..end];
        if is_inline_container(tag) {
            if tag.starts_with("</") {
                depth = depth.saturating_sub(1);
            } else if !tag.ends_with("/>") {
                depth += 1;
            }
        }
        out.push_str(tag);
        rest = &tail[end..];
    }
    out.push_str(rest);
    out
}

fn is_inline_container(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('<')
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .next()
        .unwrap_or_default();
    name == "text:p" || name == "text:h"
}

/// Replace the contents of `office:text` and `office:meta` in a flat template.
fn splice_template(template: &str, body: &str, meta: &str) -> Result<String> {
    let with_body = replace_element_content(template, "office:text", body).ok_or_else(|| {
        Error::Configuration("template has no office:text element".into())
    })?;
    Ok(replace_element_content(&with_body, "office:meta", meta).unwrap_or(with_body))
}

fn replace_element_content(xml: &str, name: &str, content: &str) -> Option<String> {
    let bytes = xml.as_bytes();
    let open = format!("<{name}");
    let start = memmem::find_iter(bytes, open.as_bytes()).find(|&i| {
        matches!(bytes.get(i + open.len()), Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
    })?;
    let tag_end = start + memchr::memchr(b'>', &bytes[start..])?;

    let mut out = String::with_capacity(xml.len() + content.len());
    if bytes[tag_end - 1] == b'/' {
        out.push_str(&xml[..tag_end - 1]);
        out.push('>');
        out.push_str(content);
        out.push_str(&format!("</{name}>"));
        out.push_str(&xml[tag_end + 1..]);
        return Some(out);
    }

    let close = format!("</{name}>");
    let close_at = tag_end + memmem::find(&bytes[tag_end..], close.as_bytes())?;
    out.push_str(&xml[..=tag_end]);
    out.push_str(content);
    out.push_str(&xml[close_at..]);
    Some(out)
}
