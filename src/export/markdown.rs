//! Markdown exporter.
//!
//! Sections become ATX headings at their nesting depth and blocks are
//! separated by one blank line. Only the `bold` and `italic` style tags have
//! a Markdown form; other tags are dropped with a warning and comment
//! markers are dropped silently.

use super::{Exporter, misplaced};
use crate::error::Result;
use crate::markdown::{escape_markdown, render_front_matter};
use crate::style::{BOLD, ITALIC};
use crate::tree::{Document, Element, ElementKind};

const MAX_HEADING_LEVEL: usize = 6;
const HARD_BREAK: &str = "\\\n";

/// Configuration for Markdown export.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConfig {
    /// Emit the document information record as YAML front matter.
    pub front_matter: bool,
}

/// Markdown exporter.
#[derive(Debug, Clone, Default)]
pub struct MarkdownExporter {
    config: MarkdownConfig,
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MarkdownConfig) -> Self {
        self.config = config;
        self
    }
}

impl Exporter for MarkdownExporter {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn to_bytes(&self, document: &Document) -> Result<Vec<u8>> {
        let mut blocks = Vec::new();
        for child in &document.root.children {
            match child.kind {
                ElementKind::Section => section(child, 1, &mut blocks)?,
                _ => return Err(misplaced(child, "document root")),
            }
        }

        let mut out = String::new();
        if self.config.front_matter && !document.info.is_empty() {
            out.push_str(&render_front_matter(&document.info)?);
            if !blocks.is_empty() {
                out.push('\n');
            }
        }
        if !blocks.is_empty() {
            out.push_str(&blocks.join("\n\n"));
            out.push('\n');
        }
        tracing::debug!(blocks = blocks.len(), bytes = out.len(), "wrote markdown");
        Ok(out.into_bytes())
    }
}

fn section(section: &Element, depth: usize, blocks: &mut Vec<String>) -> Result<()> {
    for child in &section.children {
        match &child.kind {
            ElementKind::Heading => {
                let marker = "#".repeat(depth.min(MAX_HEADING_LEVEL));
                let text = inline(&child.children, false)?;
                blocks.push(if text.is_empty() {
                    marker
                } else {
                    format!("{marker} {text}")
                });
            }
            ElementKind::Paragraph => {
                let text = inline(&child.children, true)?;
                if !text.is_empty() {
                    blocks.push(text);
                }
            }
            ElementKind::Section => self::section(child, depth + 1, blocks)?,
            ElementKind::Root
            | ElementKind::Text { .. }
            | ElementKind::RegionStart
            | ElementKind::RegionEnd => return Err(misplaced(child, "section")),
        }
    }
    Ok(())
}

/// A stretch of text sharing one emphasis.
struct Piece {
    text: String,
    bold: bool,
    italic: bool,
    /// Bold was applied before italic and nests outside it.
    bold_outer: bool,
    line_break: bool,
}

fn pieces(children: &[Element]) -> Result<Vec<Piece>> {
    let mut pieces: Vec<Piece> = Vec::new();
    for child in children {
        let (text, line_break) = match &child.kind {
            ElementKind::Text { text, line_break } => (text.replace('\n', " "), *line_break),
            ElementKind::RegionStart | ElementKind::RegionEnd => continue,
            ElementKind::Root | ElementKind::Section | ElementKind::Heading | ElementKind::Paragraph => {
                return Err(misplaced(child, "paragraph"));
            }
        };
        for tag in dropped_styles(&child.styles) {
            tracing::warn!(tag, "style tag has no markdown form, dropping it");
        }
        let position = |tag: &str| child.styles.iter().position(|s| s == tag);
        let (bold, italic) = (position(BOLD), position(ITALIC));
        let bold_outer = matches!((bold, italic), (Some(b), Some(i)) if b < i);
        let (bold, italic) = (bold.is_some(), italic.is_some());

        if let Some(last) = pieces.last_mut()
            && !last.line_break
            && last.bold == bold
            && last.italic == italic
        {
            last.text.push_str(&text);
            last.line_break = line_break;
            continue;
        }
        pieces.push(Piece {
            text,
            bold,
            italic,
            bold_outer,
            line_break,
        });
    }
    Ok(pieces)
}

/// Style tags of a text span that Markdown cannot express.
fn dropped_styles(styles: &[String]) -> impl Iterator<Item = &str> {
    styles
        .iter()
        .map(String::as_str)
        .filter(|tag| *tag != BOLD && *tag != ITALIC)
}

/// Render inline content; `breaks` selects hard breaks over spaces.
fn inline(children: &[Element], breaks: bool) -> Result<String> {
    let mut out = String::new();
    for piece in pieces(children)? {
        emphasize(&mut out, &piece);
        if piece.line_break {
            if breaks {
                out.push_str(HARD_BREAK);
            } else {
                out.push(' ');
            }
        }
    }
    let trimmed = out.trim_start().trim_end_matches([' ', '\t']);
    Ok(trimmed.strip_suffix(HARD_BREAK).unwrap_or(trimmed).to_string())
}

/// Append one piece with its emphasis delimiters outside its edge whitespace.
///
/// `*` delimiters are swapped for `_` next to another `*` so that adjacent
/// runs never merge into an ambiguous `***`.
fn emphasize(out: &mut String, piece: &Piece) {
    let core = piece.text.trim_matches([' ', '\t']);
    if core.is_empty() || (!piece.bold && !piece.italic) {
        out.push_str(&escape_markdown(&piece.text));
        return;
    }
    let lead = &piece.text[..piece.text.len() - piece.text.trim_start_matches([' ', '\t']).len()];
    let trail = &piece.text[piece.text.trim_end_matches([' ', '\t']).len()..];

    let star = !lead.is_empty() || !out.ends_with('*');
    let (strong, emph) = match (star, piece.bold) {
        (true, true) => ("**", "_"),
        (true, false) => ("**", "*"),
        (false, true) => ("__", "*"),
        (false, false) => ("__", "_"),
    };
    let mut open = Vec::new();
    if piece.bold {
        open.push(strong);
    }
    if piece.italic {
        if piece.bold_outer {
            open.push(emph);
        } else {
            open.insert(0, emph);
        }
    }

    out.push_str(lead);
    for delimiter in &open {
        out.push_str(delimiter);
    }
    out.push_str(&escape_markdown(core));
    for delimiter in open.iter().rev() {
        out.push_str(delimiter);
    }
    out.push_str(trail);
}
