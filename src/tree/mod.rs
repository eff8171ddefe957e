//! Format-agnostic document tree.
//!
//! Every reader produces a tree of [`Element`]s rooted at an
//! [`ElementKind::Root`]; every writer consumes one. The tree is a plain
//! owned structure: no invariant is checked on construction. Accessors that
//! rely on an invariant (a section's heading, a heading's text) check it when
//! called and fail with [`Error::Structural`].
//!
//! ```
//! use bindery::tree::Element;
//!
//! let mut chapter = Element::section();
//! chapter.push(Element::heading_with_text("Chapter 1"));
//! chapter.push(Element::paragraph_with_text("It was a dark and stormy night."));
//!
//! let mut root = Element::root();
//! root.push(chapter);
//!
//! let section = root.sections().next().unwrap();
//! assert_eq!(section.heading().unwrap().title().unwrap(), "Chapter 1");
//! ```

mod comments;
mod iter;

pub use comments::{CommentIndex, CommentRegions, DocumentComment, RegionRange};
pub use iter::Descendants;

use crate::error::{Error, Result};
use crate::metadata::DocumentInfo;

/// Separator used when a heading holds more than one text span.
pub const TITLE_SEPARATOR: &str = " ";

/// The variant of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Document root; children are sections.
    Root,
    /// A heading followed by paragraphs and nested sections.
    Section,
    /// Section title; children are text spans.
    Heading,
    /// Body paragraph; children are text spans and region markers.
    Paragraph,
    /// Literal text. `line_break` renders a break right after the span.
    Text { text: String, line_break: bool },
    /// Opens a commented region; the element `id` names the region.
    RegionStart,
    /// Closes a commented region; the element `id` names the region.
    RegionEnd,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    pub styles: Vec<String>,
    pub kind: ElementKind,
    pub children: Vec<Element>,
}

impl Element {
    fn new(kind: ElementKind) -> Self {
        Self {
            id: None,
            styles: Vec::new(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ElementKind::Root)
    }

    pub fn section() -> Self {
        Self::new(ElementKind::Section)
    }

    /// A heading with no content yet.
    pub fn empty_heading() -> Self {
        Self::new(ElementKind::Heading)
    }

    pub fn paragraph() -> Self {
        Self::new(ElementKind::Paragraph)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Text {
            text: text.into(),
            line_break: false,
        })
    }

    /// A heading holding a single unstyled text span.
    pub fn heading_with_text(text: impl Into<String>) -> Self {
        let mut heading = Self::empty_heading();
        heading.push(Self::text(text));
        heading
    }

    /// A paragraph holding a single unstyled text span.
    pub fn paragraph_with_text(text: impl Into<String>) -> Self {
        let mut paragraph = Self::paragraph();
        paragraph.push(Self::text(text));
        paragraph
    }

    pub fn region_start(id: impl Into<String>) -> Self {
        Self::new(ElementKind::RegionStart).with_id(id)
    }

    pub fn region_end(id: impl Into<String>) -> Self {
        Self::new(ElementKind::RegionEnd).with_id(id)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.styles.push(style.into());
        self
    }

    pub fn with_line_break(mut self) -> Self {
        self.set_line_break(true);
        self
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn is_section(&self) -> bool {
        self.kind == ElementKind::Section
    }

    pub fn is_heading(&self) -> bool {
        self.kind == ElementKind::Heading
    }

    pub fn is_paragraph(&self) -> bool {
        self.kind == ElementKind::Paragraph
    }

    /// The literal text of a text span.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Whether a text span is followed by a line break.
    pub fn line_break(&self) -> bool {
        matches!(self.kind, ElementKind::Text { line_break: true, .. })
    }

    /// Set the line-break flag; no effect on non-text elements.
    pub fn set_line_break(&mut self, value: bool) {
        if let ElementKind::Text { line_break, .. } = &mut self.kind {
            *line_break = value;
        }
    }

    /// The region identifier of a start/end marker.
    pub fn region_id(&self) -> Option<&str> {
        match self.kind {
            ElementKind::RegionStart | ElementKind::RegionEnd => self.id.as_deref(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// Depth-first, pre-order walk over this element and all descendants.
    ///
    /// Each call starts a fresh walk.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants::new(self)
    }

    /// Visit this element and all descendants mutably, in pre-order.
    pub fn walk_mut<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Element) -> Result<()>,
    {
        f(self)?;
        for child in &mut self.children {
            child.walk_mut(f)?;
        }
        Ok(())
    }

    /// Section children of a root or section, ignoring other siblings.
    pub fn sections(&self) -> impl Iterator<Item = &Element> + Clone {
        self.children.iter().filter(|c| c.is_section())
    }

    /// Number of section children.
    pub fn section_count(&self) -> usize {
        self.sections().count()
    }

    /// Alias of [`Element::sections`] reading better on a section.
    pub fn subsections(&self) -> impl Iterator<Item = &Element> + Clone {
        self.sections()
    }

    /// Paragraph children of a section, ignoring other siblings.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Element> + Clone {
        self.children.iter().filter(|c| c.is_paragraph())
    }

    /// The heading of a section, which must be its first child.
    pub fn heading(&self) -> Result<&Element> {
        if !self.is_section() {
            return Err(Error::Structural(format!(
                "heading requested from {:?} element",
                self.kind
            )));
        }
        match self.children.first() {
            Some(first) if first.is_heading() => Ok(first),
            Some(first) => Err(Error::Structural(format!(
                "section{} starts with {:?} instead of a heading",
                self.describe_id(),
                first.kind
            ))),
            None => Err(Error::Structural(format!(
                "section{} has no heading",
                self.describe_id()
            ))),
        }
    }

    /// The title of a heading: its text spans joined with [`TITLE_SEPARATOR`].
    pub fn title(&self) -> Result<String> {
        if !self.is_heading() {
            return Err(Error::Structural(format!(
                "title requested from {:?} element",
                self.kind
            )));
        }
        let parts: Vec<&str> = self
            .children
            .iter()
            .filter_map(Element::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(Error::Structural(format!(
                "heading{} has no text",
                self.describe_id()
            )));
        }
        Ok(parts.join(TITLE_SEPARATOR))
    }

    /// Shortcut for `self.heading()?.title()`.
    pub fn section_title(&self) -> Result<String> {
        self.heading()?.title()
    }

    /// Concatenated text of all text spans below this element.
    pub fn plain_text(&self) -> String {
        self.descendants().filter_map(Element::as_text).collect()
    }

    fn describe_id(&self) -> String {
        match &self.id {
            Some(id) => format!(" '{id}'"),
            None => String::new(),
        }
    }
}

/// A document as produced by one reader invocation.
#[derive(Debug, Clone)]
pub struct Document {
    pub info: DocumentInfo,
    pub root: Element,
    pub comments: Vec<DocumentComment>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            info: DocumentInfo::default(),
            root,
            comments: Vec::new(),
        }
    }

    pub fn with_info(mut self, info: DocumentInfo) -> Self {
        self.info = info;
        self
    }

    pub fn with_comments(mut self, comments: Vec<DocumentComment>) -> Self {
        self.comments = comments;
        self
    }

    /// Title for the whole document: the information record, else the
    /// first section heading.
    pub fn title(&self) -> Option<String> {
        if let Some(title) = self.info.title.as_ref().filter(|t| !t.is_empty()) {
            return Some(title.clone());
        }
        self.root
            .sections()
            .next()
            .and_then(|s| s.section_title().ok())
    }
}
