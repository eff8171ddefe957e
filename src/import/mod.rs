//! Format importers.
//!
//! Every importer turns the bytes of one representation into the shared
//! [`Document`] tree. The three tracks can be read separately:
//! - **metadata**: the flat [`DocumentInfo`] record
//! - **content**: the [`Element`] tree rooted at [`ElementKind::Root`]
//! - **comments**: inline comments keyed by region identifier
//!
//! Importers never recover from malformed markup; they fail with a parse
//! error and leave retrying to the caller.
//!
//! [`ElementKind::Root`]: crate::tree::ElementKind::Root

mod html;
mod markdown;
mod odt;
mod run;

pub use html::HtmlImporter;
pub(crate) use html::{
    COMMENT_ATTR, COMMENT_CLASS, COMMENT_END_CLASS, COMMENT_START_CLASS, COMMENTS_CLASS,
};
pub use markdown::MarkdownImporter;
pub use odt::OdtImporter;

use std::path::Path;

use crate::error::Result;
use crate::metadata::DocumentInfo;
use crate::tree::{Document, DocumentComment, Element};

/// Reads one external representation into a document tree.
pub trait Importer {
    /// Document information record.
    fn read_metadata(&self, bytes: &[u8]) -> Result<DocumentInfo>;

    /// Content tree.
    fn read_content(&self, bytes: &[u8]) -> Result<Element>;

    /// Inline comments, keyed by the identifiers of their region markers.
    fn read_comments(&self, bytes: &[u8]) -> Result<Vec<DocumentComment>>;

    /// All three tracks at once.
    fn read_document(&self, bytes: &[u8]) -> Result<Document> {
        let root = self.read_content(bytes)?;
        Ok(Document::new(root)
            .with_info(self.read_metadata(bytes)?)
            .with_comments(self.read_comments(bytes)?))
    }

    fn read_metadata_file(&self, path: &Path) -> Result<DocumentInfo> {
        self.read_metadata(&read_source(path)?)
    }

    fn read_content_file(&self, path: &Path) -> Result<Element> {
        self.read_content(&read_source(path)?)
    }

    fn read_comments_file(&self, path: &Path) -> Result<Vec<DocumentComment>> {
        self.read_comments(&read_source(path)?)
    }

    fn read_document_file(&self, path: &Path) -> Result<Document> {
        self.read_document(&read_source(path)?)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "read source");
    Ok(bytes)
}
