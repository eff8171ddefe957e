//! Error types for bindery operations.

use thiserror::Error;

/// Broad classification of an [`Error`].
///
/// Every error is fatal to the conversion in progress; the kind tells the caller
/// whether the defect lies in the configuration, the input data or the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Mutually exclusive inputs, or a destination that exists without overwrite.
    Configuration,
    /// A tree accessor found its invariant unmet.
    Structural,
    /// A style tag or role term missing from its lookup table.
    Mapping,
    /// A link, manifest identifier or refine target that cannot be resolved.
    Reference,
    /// Malformed source bytes for a given format.
    Parse,
    /// Filesystem or archive failure.
    Io,
}

/// Errors that can occur while reading, converting or packaging documents.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("structural error: {0}")]
    Structural(String),

    #[error("unmapped {kind}: '{key}'")]
    Mapping { kind: &'static str, key: String },

    #[error("unresolved reference: {0}")]
    Reference(String),

    #[error("{format} parse error: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::Structural(_) => ErrorKind::Structural,
            Error::Mapping { .. } => ErrorKind::Mapping,
            Error::Reference(_) => ErrorKind::Reference,
            Error::Parse { .. } | Error::Xml(_) | Error::Json(_) => ErrorKind::Parse,
            Error::Io(_) | Error::Zip(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Error::Parse {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn mapping(kind: &'static str, key: impl Into<String>) -> Self {
        Error::Mapping {
            kind,
            key: key.into(),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(quick_xml::Error::InvalidAttr(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
