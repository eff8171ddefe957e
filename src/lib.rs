//! # bindery
//!
//! Converts documents between OpenDocument Text, Markdown and XHTML through a
//! shared document tree, and packages XHTML content as EPUB 3.
//!
//! ## Features
//!
//! - Read and write flat (`.fodt`) and zipped (`.odt`) OpenDocument Text
//! - Read and write Markdown with YAML front matter
//! - Read and write XHTML, including inline comments
//! - Map style tags between vocabularies with a JSON style map
//! - Split a document into one file per top-level section
//! - Build EPUB 3 packages with rewritten links, navigation and landmarks
//!
//! Every output is written atomically, and a simulate mode runs the whole
//! conversion without touching the filesystem.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use bindery::{ConversionConfig, WriteOptions, convert_file};
//!
//! convert_file(
//!     Path::new("book.fodt"),
//!     Path::new("book.md"),
//!     &ConversionConfig::default(),
//!     &WriteOptions::default(),
//! )?;
//! # Ok::<(), bindery::Error>(())
//! ```
//!
//! ## Working with Trees
//!
//! The [`Element`] tree is the format-neutral middle of every conversion:
//!
//! ```
//! use bindery::{Document, Element};
//! use bindery::export::{Exporter, MarkdownExporter};
//!
//! let mut chapter = Element::section();
//! chapter.push(Element::heading_with_text("Chapter 1"));
//! chapter.push(Element::paragraph_with_text("It begins."));
//! let mut root = Element::root();
//! root.push(chapter);
//!
//! let markdown = MarkdownExporter::new().to_bytes(&Document::new(root))?;
//! assert_eq!(markdown, b"# Chapter 1\n\nIt begins.\n");
//! # Ok::<(), bindery::Error>(())
//! ```

pub mod config;
pub mod convert;
pub mod epub;
pub mod error;
pub mod export;
pub mod import;
pub mod io;
pub mod markdown;
pub mod metadata;
pub mod odf;
pub mod style;
pub mod tree;
pub mod util;

pub use config::{ConversionConfig, DocumentDefinition, WriteOptions};
pub use convert::{Format, convert_file, convert_to_sections, load_document};
pub use epub::{EpubBuild, PackageInput, build_epub};
pub use error::{Error, ErrorKind, Result};
pub use metadata::{Bibliography, DocumentInfo, metadata_from_bibliography, metadata_from_info};
pub use style::{StyleMap, convert_styles};
pub use tree::{Document, DocumentComment, Element, ElementKind};
