//! Format exporters.
//!
//! An [`Exporter`] serializes a [`Document`] to bytes. Writing to disk always
//! goes through [`crate::io::write_atomic`]: the destination is either left
//! untouched or replaced by the complete output, and simulate mode runs the
//! whole serialization without writing.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use bindery::WriteOptions;
//! use bindery::export::{Exporter, MarkdownExporter};
//! use bindery::import::{Importer, OdtImporter};
//!
//! let document = OdtImporter::new().read_document_file(Path::new("book.fodt"))?;
//! MarkdownExporter::new().write(&document, Path::new("book.md"), &WriteOptions::default())?;
//! # Ok::<(), bindery::Error>(())
//! ```

mod html;
mod markdown;
mod odt;

pub use html::{HtmlConfig, HtmlExporter};
pub use markdown::{MarkdownConfig, MarkdownExporter};
pub use odt::{OdtConfig, OdtExporter};

use std::path::{Path, PathBuf};

use crate::config::WriteOptions;
use crate::error::{Error, Result};
use crate::tree::{Document, Element};
use crate::util::generate_section_file_name;

/// Serializes a document tree into one external representation.
pub trait Exporter {
    /// File extension of the produced files, without the dot.
    fn extension(&self) -> &'static str;

    /// Serialize the whole document.
    fn to_bytes(&self, document: &Document) -> Result<Vec<u8>>;

    /// Write the document to `path` atomically.
    ///
    /// Returns `false` when simulate mode skipped the write.
    fn write(&self, document: &Document, path: &Path, options: &WriteOptions) -> Result<bool> {
        let bytes = self.to_bytes(document)?;
        crate::io::write_atomic(path, &bytes, options)
    }

    /// Write one file per top-level section into `dir`.
    ///
    /// Files are named `<padded index> - <sanitized title>.<extension>` and
    /// each carries its section title as its document title. Every
    /// section is serialized before the first file is written, so a heading
    /// error leaves the directory untouched.
    fn write_sections(
        &self,
        document: &Document,
        dir: &Path,
        options: &WriteOptions,
    ) -> Result<Vec<PathBuf>> {
        let total = document.root.section_count();
        let mut outputs = Vec::with_capacity(total);

        for (index, section) in document.root.sections().enumerate() {
            let title = section.section_title()?;
            let name = format!(
                "{}.{}",
                generate_section_file_name(&title, index, total),
                self.extension()
            );
            let mut root = Element::root();
            root.push(section.clone());
            let mut info = document.info.clone();
            info.title = Some(title);
            let part = Document {
                info,
                root,
                comments: document.comments.clone(),
            };
            outputs.push((dir.join(name), self.to_bytes(&part)?));
        }

        for (path, _) in &outputs {
            crate::io::check_destination(path, options)?;
        }
        let mut written = Vec::with_capacity(outputs.len());
        for (path, bytes) in outputs {
            crate::io::write_atomic(&path, &bytes, options)?;
            written.push(path);
        }
        tracing::info!(dir = %dir.display(), files = written.len(), "wrote sections");
        Ok(written)
    }
}

/// Error for an element whose kind cannot appear under `parent`.
fn misplaced(element: &Element, parent: &str) -> Error {
    Error::Structural(format!("{:?} element cannot appear in a {parent}", element.kind))
}

fn region_id(marker: &Element) -> Result<&str> {
    marker
        .region_id()
        .ok_or_else(|| Error::Structural("comment region marker without identifier".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn two_sections() -> Document {
        let mut root = Element::root();
        for title in ["Opening", "What/Next?"] {
            let mut section = Element::section();
            section.push(Element::heading_with_text(title));
            section.push(Element::paragraph_with_text("Body."));
            root.push(section);
        }
        Document::new(root)
    }

    #[test]
    fn test_write_sections_names_files_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let written = HtmlExporter::new()
            .write_sections(&two_sections(), dir.path(), &WriteOptions::default())
            .unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("1 - Opening.xhtml"),
                dir.path().join("2 - What_Next_.xhtml"),
            ]
        );
        let second = std::fs::read_to_string(&written[1]).unwrap();
        assert!(second.contains("<title>What/Next?</title>"));
        assert!(!second.contains("Opening"));
    }

    #[test]
    fn test_missing_heading_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut document = two_sections();
        document.root.children[1].children.remove(0);
        let err = MarkdownExporter::new()
            .write_sections(&document, dir.path(), &WriteOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_simulated_sections_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let written = MarkdownExporter::new()
            .write_sections(&two_sections(), dir.path(), &WriteOptions::simulate())
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(!written[0].exists());
    }
}
