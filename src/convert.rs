//! File-to-file conversion.
//!
//! The pipeline is always read, map styles, write. Formats are chosen from
//! file extensions; the [`ConversionConfig`] supplies the style map, the
//! word-processor template and the hypertext settings.

use std::path::{Path, PathBuf};

use crate::config::{ConversionConfig, DocumentDefinition, DocumentSource, WriteOptions};
use crate::error::{Error, Result};
use crate::export::{
    Exporter, HtmlConfig, HtmlExporter, MarkdownConfig, MarkdownExporter, OdtConfig, OdtExporter,
};
use crate::import::{HtmlImporter, Importer, MarkdownImporter, OdtImporter};
use crate::metadata::{Bibliography, DocumentInfo};
use crate::style::{StyleMap, convert_styles};
use crate::tree::{Document, Element};
use crate::util::decode_text;

/// A document format, as named by a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Zipped OpenDocument Text (`.odt`).
    Odt,
    /// Flat OpenDocument Text (`.fodt`).
    FlatOdt,
    /// `.md`, `.markdown`
    Markdown,
    /// `.xhtml`, `.html`, `.htm`
    Html,
}

impl Format {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "odt" => Some(Format::Odt),
            "fodt" => Some(Format::FlatOdt),
            "md" | "markdown" => Some(Format::Markdown),
            "xhtml" | "html" | "htm" => Some(Format::Html),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "cannot tell the format of '{}' from its extension",
                    path.display()
                ))
            })
    }

    pub fn importer(self) -> Box<dyn Importer> {
        match self {
            Format::Odt | Format::FlatOdt => Box::new(OdtImporter::new()),
            Format::Markdown => Box::new(MarkdownImporter::new()),
            Format::Html => Box::new(HtmlImporter::new()),
        }
    }

    /// The exporter for this format, configured from `config`.
    pub fn exporter(self, config: &ConversionConfig) -> Result<Box<dyn Exporter>> {
        let template = match (&config.template, self) {
            (Some(path), Format::FlatOdt) => Some(decode_text(&std::fs::read(path)?, None).into_owned()),
            (Some(_), Format::Odt) => {
                return Err(Error::Configuration(
                    "a template can only be used with flat OpenDocument output".into(),
                ));
            }
            _ => None,
        };
        Ok(match self {
            Format::Odt | Format::FlatOdt => Box::new(OdtExporter::new().with_config(OdtConfig {
                package: self == Format::Odt,
                template,
            })),
            Format::Markdown => Box::new(MarkdownExporter::new().with_config(MarkdownConfig {
                front_matter: config.front_matter,
            })),
            Format::Html => Box::new(HtmlExporter::new().with_config(HtmlConfig {
                stylesheets: config.stylesheets.clone(),
                language: config.language.clone(),
            })),
        })
    }
}

/// Read `path` in the format its extension names.
pub fn read_document(path: &Path) -> Result<Document> {
    Format::from_path(path)?.importer().read_document_file(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Load the document a definition describes.
///
/// Section files are read in order and their top-level sections appended
/// to one root; information comes from the first file unless the
/// definition names a JSON information file, which then wins.
pub fn load_document(definition: &DocumentDefinition) -> Result<Document> {
    let mut document = match definition.source()? {
        DocumentSource::Content(path) => read_document(path)?,
        DocumentSource::Sections(paths) => {
            let mut root = Element::root();
            let mut info = None;
            let mut comments = Vec::new();
            for path in paths {
                let part = read_document(path)?;
                root.children.extend(part.root.children);
                comments.extend(part.comments);
                info.get_or_insert(part.info);
            }
            Document::new(root)
                .with_info(info.unwrap_or_default())
                .with_comments(comments)
        }
    };
    if let Some(path) = &definition.info {
        document.info = read_json::<DocumentInfo>(path)?;
    }
    tracing::debug!(
        sections = document.root.section_count(),
        comments = document.comments.len(),
        "loaded document"
    );
    Ok(document)
}

/// The bibliographic record a definition names, if any.
pub fn load_bibliography(definition: &DocumentDefinition) -> Result<Option<Bibliography>> {
    definition.metadata.as_deref().map(read_json).transpose()
}

/// Apply the configured style map and default language.
pub fn prepare(document: &mut Document, config: &ConversionConfig) -> Result<()> {
    if let Some(path) = &config.style_map {
        convert_styles(&mut document.root, &StyleMap::load(path)?)?;
    }
    if document.info.language.is_none() {
        document.info.language = config.language.clone();
    }
    Ok(())
}

/// Convert one file into another, formats chosen by extension.
///
/// Returns `false` when simulate mode skipped the write.
pub fn convert_file(
    source: &Path,
    destination: &Path,
    config: &ConversionConfig,
    options: &WriteOptions,
) -> Result<bool> {
    let exporter = Format::from_path(destination)?.exporter(config)?;
    let mut document = read_document(source)?;
    prepare(&mut document, config)?;
    let written = exporter.write(&document, destination, options)?;
    tracing::info!(
        source = %source.display(),
        destination = %destination.display(),
        written,
        "converted document"
    );
    Ok(written)
}

/// Convert one file into one `format` file per top-level section in `dir`.
pub fn convert_to_sections(
    source: &Path,
    dir: &Path,
    format: Format,
    config: &ConversionConfig,
    options: &WriteOptions,
) -> Result<Vec<PathBuf>> {
    let exporter = format.exporter(config)?;
    let mut document = read_document(source)?;
    prepare(&mut document, config)?;
    exporter.write_sections(&document, dir, options)
}
