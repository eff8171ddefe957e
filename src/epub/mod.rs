//! EPUB 3 packaging.
//!
//! A package is built in two steps. The [`PackageAssembler`] turns content
//! files, resources and a cover into descriptors (manifest, spine,
//! navigation, landmarks) plus a [`LinkTable`] of relocated references; the
//! packager then stages every file under its destination, rewrites relative
//! links in relocated content, writes the generated package documents and
//! zips the staging directory.
//!
//! Staged layout:
//!
//! ```text
//! mimetype
//! META-INF/container.xml
//! EPUB/content.opf
//! EPUB/toc.xhtml
//! EPUB/Content/<padded index> - <title>.xhtml
//! EPUB/Resources/<file name>
//! ```

mod assembler;
mod documents;
mod links;
mod packager;

pub use assembler::{
    LandmarkSpec, PackageAssembler, PackageInput, PackagePlan, StagedFile, StagedKind,
    assemble, assemble_with, read_title,
};
pub use documents::{container_xml, navigation_document, package_document, validate_metadata};
pub use links::{LinkTable, encode_href, normalize_path, relative_path, rewrite_links};
pub use packager::{EpubBuild, build_epub, stage, write_archive};

/// Content of the `mimetype` entry.
pub const EPUB_MIMETYPE: &str = "application/epub+zip";
/// Directory holding the package document and every publication file.
pub const PACKAGE_ROOT: &str = "EPUB";
/// Content documents, relative to the package root.
pub const CONTENT_DIR: &str = "Content";
/// Stylesheets, images and fonts, relative to the package root.
pub const RESOURCES_DIR: &str = "Resources";
pub const PACKAGE_DOCUMENT: &str = "content.opf";
pub const NAV_DOCUMENT: &str = "toc.xhtml";
pub const CONTAINER_PATH: &str = "META-INF/container.xml";
pub const MIMETYPE_PATH: &str = "mimetype";

/// Manifest identifier of the navigation document.
pub const NAV_ID: &str = "toc";
/// Manifest identifier of the cover image.
pub const COVER_ID: &str = "cover-image";

/// One `<item>` of the manifest. `href` is relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn new(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }
}

/// One `<itemref>` of the spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,
    pub linear: bool,
    pub properties: Vec<String>,
}

impl SpineItem {
    /// A linear reference to the manifest item `idref`.
    pub fn new(idref: impl Into<String>) -> Self {
        Self {
            idref: idref.into(),
            linear: true,
            properties: Vec::new(),
        }
    }
}

/// A table-of-contents entry. `href` is relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub title: String,
    pub href: String,
}

impl NavItem {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// A resolved landmark, e.g. `bodymatter` pointing at the first chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    /// `epub:type` value.
    pub kind: String,
    pub title: String,
    pub href: String,
}
