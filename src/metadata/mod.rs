//! Document information records and package metadata items.
//!
//! Two inputs produce the same ordered list of [`MetadataItem`]s:
//!
//! - [`DocumentInfo`]: the flat record every reader can extract
//!   (identifier, title, language, author, publisher, date, copyright, version)
//! - [`Bibliography`]: a richer record with repeatable fields and
//!   creators/contributors carrying a role and a sort ("file-as") form
//!
//! The first ISBN-shaped identifier becomes `urn:isbn:<digits>` and carries
//! [`UNIQUE_IDENTIFIER_ID`] so the package document can point at it. Roles
//! are translated to MARC relator codes and attached as refinements. A
//! `dcterms:modified` property always comes last.

mod isbn;
mod relators;

pub use isbn::{isbn_digits, isbn_to_urn};
pub use relators::{RELATORS, relator_code, relator_term};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier given to the package's unique identifier item.
pub const UNIQUE_IDENTIFIER_ID: &str = "BookId";

/// Flat document information record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DocumentInfo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A creator or contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    pub name: String,
    /// Role term or relator code, e.g. "Translator" or "trl".
    pub role: Option<String>,
    /// Sort form of the name, e.g. "Austen, Jane".
    pub file_as: Option<String>,
    /// Explicit identifier; generated when a refinement needs one.
    pub id: Option<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_file_as(mut self, file_as: impl Into<String>) -> Self {
        self.file_as = Some(file_as.into());
        self
    }
}

/// Bibliographic record with repeatable Dublin Core fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bibliography {
    pub identifiers: Vec<String>,
    pub titles: Vec<String>,
    pub languages: Vec<String>,
    pub creators: Vec<Agent>,
    pub contributors: Vec<Agent>,
    pub publishers: Vec<String>,
    pub dates: Vec<String>,
    pub subjects: Vec<String>,
    pub descriptions: Vec<String>,
    pub rights: Vec<String>,
    pub sources: Vec<String>,
}

/// A refinement of another metadata item, e.g. its role or sort form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRefine {
    pub property: String,
    pub value: String,
    pub scheme: Option<String>,
}

impl MetadataRefine {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            scheme: None,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

/// One entry of the package metadata.
///
/// Dublin Core elements render as `<dc:key>`; generic properties render as
/// `<meta property="key">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
    pub is_property: bool,
    pub id: Option<String>,
    pub refines: Vec<MetadataRefine>,
}

impl MetadataItem {
    /// A Dublin Core element.
    pub fn dc(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_property: false,
            id: None,
            refines: Vec::new(),
        }
    }

    /// A generic `meta property` entry.
    pub fn property(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            is_property: true,
            ..Self::dc(key, value)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach a refinement. The item must have an identifier.
    pub fn add_refine(&mut self, refine: MetadataRefine) -> Result<()> {
        if self.id.is_none() {
            return Err(Error::Reference(format!(
                "refine '{}' targets metadata item '{}' which has no identifier",
                refine.property, self.key
            )));
        }
        self.refines.push(refine);
        Ok(())
    }
}

/// Knobs for metadata construction.
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    /// Fail when an identifier is not ISBN-shaped instead of passing it through.
    pub require_isbn: bool,
    /// Extra generic properties, appended before the modification stamp.
    pub extra: Vec<(String, String)>,
    /// `dcterms:modified` value; the current time when unset.
    pub modified: Option<String>,
}

/// Format a timestamp the way `dcterms:modified` requires.
pub fn modified_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Build metadata items from a flat information record.
pub fn metadata_from_info(
    info: &DocumentInfo,
    options: &MetadataOptions,
) -> Result<Vec<MetadataItem>> {
    let mut builder = ItemBuilder::new(options);
    builder.identifiers(info.identifier.iter())?;
    builder.simple("title", info.title.iter());
    builder.simple("language", info.language.iter());
    if let Some(author) = &info.author {
        builder.agent("creator", &Agent::new(author.as_str()))?;
    }
    builder.simple("publisher", info.publisher.iter());
    builder.simple("date", info.date.iter());
    builder.simple("rights", info.copyright.iter());
    if let Some(version) = &info.version {
        builder
            .items
            .push(MetadataItem::property("schema:version", version.as_str()));
    }
    builder.finish()
}

/// Build metadata items from a bibliographic record.
pub fn metadata_from_bibliography(
    bibliography: &Bibliography,
    options: &MetadataOptions,
) -> Result<Vec<MetadataItem>> {
    let mut builder = ItemBuilder::new(options);
    builder.identifiers(bibliography.identifiers.iter())?;
    builder.simple("title", bibliography.titles.iter());
    builder.simple("language", bibliography.languages.iter());
    for creator in &bibliography.creators {
        builder.agent("creator", creator)?;
    }
    for contributor in &bibliography.contributors {
        builder.agent("contributor", contributor)?;
    }
    builder.simple("publisher", bibliography.publishers.iter());
    builder.simple("date", bibliography.dates.iter());
    builder.simple("subject", bibliography.subjects.iter());
    builder.simple("description", bibliography.descriptions.iter());
    builder.simple("rights", bibliography.rights.iter());
    builder.simple("source", bibliography.sources.iter());
    builder.finish()
}

struct ItemBuilder<'a> {
    options: &'a MetadataOptions,
    items: Vec<MetadataItem>,
    next_id: usize,
}

impl<'a> ItemBuilder<'a> {
    fn new(options: &'a MetadataOptions) -> Self {
        Self {
            options,
            items: Vec::new(),
            next_id: 1,
        }
    }

    fn identifiers<'s>(&mut self, values: impl Iterator<Item = &'s String>) -> Result<()> {
        let mut unique_assigned = false;
        let first = self.items.len();

        for value in values {
            match isbn_to_urn(value) {
                Some(urn) if !unique_assigned => {
                    unique_assigned = true;
                    self.items
                        .push(MetadataItem::dc("identifier", urn).with_id(UNIQUE_IDENTIFIER_ID));
                }
                Some(_) => self.items.push(MetadataItem::dc("identifier", value.as_str())),
                None if self.options.require_isbn => {
                    return Err(Error::mapping("ISBN identifier", value.as_str()));
                }
                None => self.items.push(MetadataItem::dc("identifier", value.as_str())),
            }
        }

        if !unique_assigned {
            match self.items.get_mut(first) {
                Some(item) => item.id = Some(UNIQUE_IDENTIFIER_ID.to_string()),
                None => {
                    return Err(Error::Configuration(
                        "document information has no identifier".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn simple<'s>(&mut self, key: &str, values: impl Iterator<Item = &'s String>) {
        for value in values.filter(|v| !v.trim().is_empty()) {
            self.items.push(MetadataItem::dc(key, value.as_str()));
        }
    }

    fn agent(&mut self, key: &str, agent: &Agent) -> Result<()> {
        let mut item = MetadataItem::dc(key, agent.name.as_str());
        let needs_id = agent.role.is_some() || agent.file_as.is_some();
        if let Some(id) = &agent.id {
            item.id = Some(id.clone());
        } else if needs_id {
            item.id = Some(format!("{key}{}", self.next_id));
            self.next_id += 1;
        }

        if let Some(role) = &agent.role {
            let code = relator_code(role)?;
            item.add_refine(MetadataRefine::new("role", code).with_scheme("marc:relators"))?;
        }
        if let Some(file_as) = &agent.file_as {
            item.add_refine(MetadataRefine::new("file-as", file_as.as_str()))?;
        }
        self.items.push(item);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<MetadataItem>> {
        for (key, value) in &self.options.extra {
            self.items
                .push(MetadataItem::property(key.as_str(), value.as_str()));
        }
        let modified = self
            .options
            .modified
            .clone()
            .unwrap_or_else(|| modified_timestamp(Utc::now()));
        self.items
            .push(MetadataItem::property("dcterms:modified", modified));
        tracing::debug!(count = self.items.len(), "built metadata items");
        Ok(self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn fixed() -> MetadataOptions {
        MetadataOptions {
            modified: Some("2024-01-01T00:00:00Z".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_info_items_in_order() {
        let info = DocumentInfo {
            identifier: Some("ISBN 81-7525-766-0".into()),
            title: Some("A Book".into()),
            language: Some("en".into()),
            author: Some("Jane Doe".into()),
            publisher: Some("Press".into()),
            date: Some("2020".into()),
            copyright: Some("(c) 2020".into()),
            version: Some("1.0".into()),
        };
        let items = metadata_from_info(&info, &fixed()).unwrap();
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "identifier",
                "title",
                "language",
                "creator",
                "publisher",
                "date",
                "rights",
                "schema:version",
                "dcterms:modified"
            ]
        );
        assert_eq!(items[0].value, "urn:isbn:8175257660");
        assert_eq!(items[0].id.as_deref(), Some(UNIQUE_IDENTIFIER_ID));
        assert!(items.last().unwrap().is_property);
    }

    #[test]
    fn test_non_isbn_identifier_passes_through() {
        let info = DocumentInfo::new("T").with_identifier("urn:uuid:1234");
        let items = metadata_from_info(&info, &fixed()).unwrap();
        assert_eq!(items[0].value, "urn:uuid:1234");
        assert_eq!(items[0].id.as_deref(), Some(UNIQUE_IDENTIFIER_ID));
    }

    #[test]
    fn test_required_isbn_rejects_other_identifiers() {
        let info = DocumentInfo::new("T").with_identifier("urn:uuid:1234");
        let options = MetadataOptions {
            require_isbn: true,
            ..fixed()
        };
        let err = metadata_from_info(&info, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
    }

    #[test]
    fn test_missing_identifier_is_configuration_error() {
        let err = metadata_from_info(&DocumentInfo::new("T"), &fixed()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_only_first_isbn_is_unique() {
        let bib = Bibliography {
            identifiers: vec![
                "urn:uuid:1".into(),
                "ISBN 81 7525 766 0".into(),
                "ISBN 978-3-16-148410-0".into(),
            ],
            ..Default::default()
        };
        let items = metadata_from_bibliography(&bib, &fixed()).unwrap();
        assert_eq!(items[0].id, None);
        assert_eq!(items[1].value, "urn:isbn:8175257660");
        assert_eq!(items[1].id.as_deref(), Some(UNIQUE_IDENTIFIER_ID));
        assert_eq!(items[2].value, "ISBN 978-3-16-148410-0");
        assert_eq!(items[2].id, None);
    }

    #[test]
    fn test_contributor_refines() {
        let bib = Bibliography {
            identifiers: vec!["ISBN 81-7525-766-0".into()],
            creators: vec![Agent::new("Jane Austen").with_file_as("Austen, Jane")],
            contributors: vec![
                Agent::new("Ann Smith").with_role("Translator"),
                Agent::new("Plain Helper"),
            ],
            ..Default::default()
        };
        let items = metadata_from_bibliography(&bib, &fixed()).unwrap();

        let creator = items.iter().find(|i| i.key == "creator").unwrap();
        assert_eq!(creator.id.as_deref(), Some("creator1"));
        assert_eq!(creator.refines, vec![MetadataRefine::new("file-as", "Austen, Jane")]);

        let translator = items.iter().find(|i| i.value == "Ann Smith").unwrap();
        assert_eq!(translator.id.as_deref(), Some("contributor2"));
        assert_eq!(
            translator.refines,
            vec![MetadataRefine::new("role", "trl").with_scheme("marc:relators")]
        );

        let helper = items.iter().find(|i| i.value == "Plain Helper").unwrap();
        assert_eq!(helper.id, None);
        assert!(helper.refines.is_empty());
    }

    #[test]
    fn test_unknown_role_is_fatal() {
        let bib = Bibliography {
            identifiers: vec!["x".into()],
            contributors: vec![Agent::new("X").with_role("Vibe curator")],
            ..Default::default()
        };
        let err = metadata_from_bibliography(&bib, &fixed()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
    }

    #[test]
    fn test_refine_requires_identifier() {
        let mut item = MetadataItem::dc("creator", "Anon");
        let err = item.add_refine(MetadataRefine::new("role", "aut")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_extra_properties_precede_modified() {
        let options = MetadataOptions {
            extra: vec![("ibooks:version".into(), "2".into())],
            ..fixed()
        };
        let info = DocumentInfo::new("T").with_identifier("x");
        let items = metadata_from_info(&info, &options).unwrap();
        let n = items.len();
        assert_eq!(items[n - 2].key, "ibooks:version");
        assert_eq!(items[n - 1].key, "dcterms:modified");
        assert_eq!(items[n - 1].value, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_info_deserializes_from_partial_json() {
        let info: DocumentInfo = serde_json::from_str(r#"{"title": "T"}"#).unwrap();
        assert_eq!(info.title.as_deref(), Some("T"));
        assert!(info.identifier.is_none());
        assert!(!info.is_empty());
        assert!(DocumentInfo::default().is_empty());
    }
}
