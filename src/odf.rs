//! OpenDocument namespaces and prefix resolution.
//!
//! Elements are matched by `(namespace, local name)`, never by prefix: a
//! document may bind `urn:...:text:1.0` to any prefix it likes. Readers walk
//! documents with [`quick_xml::NsReader`], which tracks the `xmlns`
//! bindings; the [`OdfNamespaces`] value names the URIs we understand and is
//! passed explicitly to every parser that needs it.

use quick_xml::name::{LocalName, ResolveResult};

pub const OFFICE_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";
pub const TEXT_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
pub const STYLE_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";
pub const META_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const MANIFEST_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";

/// Media type of an OpenDocument text package.
pub const ODT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

/// A namespace the readers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ns {
    Office,
    Text,
    Style,
    Meta,
    Dc,
}

/// The set of namespace URIs recognized while reading.
#[derive(Debug, Clone)]
pub struct OdfNamespaces {
    uris: Vec<(Ns, String)>,
}

impl Default for OdfNamespaces {
    fn default() -> Self {
        Self {
            uris: vec![
                (Ns::Office, OFFICE_NS.to_string()),
                (Ns::Text, TEXT_NS.to_string()),
                (Ns::Style, STYLE_NS.to_string()),
                (Ns::Meta, META_NS.to_string()),
                (Ns::Dc, DC_NS.to_string()),
            ],
        }
    }
}

impl OdfNamespaces {
    /// Recognize an additional URI as `ns`, e.g. an older OpenOffice binding.
    pub fn with_alias(mut self, ns: Ns, uri: impl Into<String>) -> Self {
        self.uris.push((ns, uri.into()));
        self
    }

    /// The namespace a URI denotes, if known.
    pub fn lookup(&self, uri: &[u8]) -> Option<Ns> {
        self.uris
            .iter()
            .find(|(_, known)| known.as_bytes() == uri)
            .map(|(ns, _)| *ns)
    }
}

/// An element or attribute name after prefix resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub ns: Option<Ns>,
    pub local: String,
}

impl ResolvedName {
    /// Map a quick-xml resolution onto the namespaces in `known`. Unbound
    /// and unknown prefixes resolve to no namespace.
    pub fn from_resolved(known: &OdfNamespaces, (ns, local): (ResolveResult<'_>, LocalName<'_>)) -> Self {
        let ns = match ns {
            ResolveResult::Bound(uri) => known.lookup(uri.as_ref()),
            ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
        };
        Self {
            ns,
            local: String::from_utf8_lossy(local.as_ref()).into_owned(),
        }
    }

    pub fn is(&self, ns: Ns, local: &str) -> bool {
        self.ns == Some(ns) && self.local == local
    }
}
