//! Conversion configuration and document definitions.
//!
//! Both records are plain serde structs loaded from JSON. Front ends fill
//! them from their own argument parsing; the library only validates them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings that shape one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Flat template the word-processor writer splices its output into.
    pub template: Option<PathBuf>,
    /// JSON style map applied between reading and writing.
    pub style_map: Option<PathBuf>,
    /// Stylesheets linked from generated hypertext, relative to the output.
    pub stylesheets: Vec<String>,
    /// Language written when the document carries none.
    pub language: Option<String>,
    /// Extra package metadata, emitted as generic properties in order.
    pub extra_metadata: Vec<(String, String)>,
    /// Emit document information as front matter in Markdown output.
    pub front_matter: bool,
}

impl ConversionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Where a document's parts come from.
///
/// Either a single content file (with optional information and
/// bibliographic metadata files) or an ordered list of section files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentDefinition {
    pub content: Option<PathBuf>,
    pub info: Option<PathBuf>,
    pub metadata: Option<PathBuf>,
    pub sections: Vec<PathBuf>,
}

/// The validated source of a [`DocumentDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource<'a> {
    Content(&'a Path),
    Sections(&'a [PathBuf]),
}

impl DocumentDefinition {
    pub fn from_content(path: impl Into<PathBuf>) -> Self {
        Self {
            content: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_sections(paths: Vec<PathBuf>) -> Self {
        Self {
            sections: paths,
            ..Default::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let definition: Self = serde_json::from_str(&json)?;
        definition.source()?;
        Ok(definition)
    }

    /// Resolve which of the two exclusive inputs was supplied.
    pub fn source(&self) -> Result<DocumentSource<'_>> {
        match (&self.content, self.sections.is_empty()) {
            (Some(_), false) => Err(Error::Configuration(
                "document definition names both a content file and section files".into(),
            )),
            (None, true) => Err(Error::Configuration(
                "document definition names neither a content file nor section files".into(),
            )),
            (Some(content), true) => Ok(DocumentSource::Content(content)),
            (None, false) => Ok(DocumentSource::Sections(&self.sections)),
        }
    }
}

/// Standard output flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace an existing destination.
    pub overwrite: bool,
    /// Compute everything but skip the final write.
    pub simulate: bool,
}

impl WriteOptions {
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            simulate: false,
        }
    }

    pub fn simulate() -> Self {
        Self {
            overwrite: false,
            simulate: true,
        }
    }
}
