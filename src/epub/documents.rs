//! The generated package documents: OPF, navigation and container.

use super::links::encode_href;
use super::{Landmark, ManifestItem, NavItem, SpineItem};
use super::{PACKAGE_DOCUMENT, PACKAGE_ROOT};
use crate::error::{Error, Result};
use crate::metadata::{MetadataItem, UNIQUE_IDENTIFIER_ID};
use crate::util::escape_xml;

/// `META-INF/container.xml`, pointing at the package document.
pub fn container_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{PACKAGE_ROOT}/{PACKAGE_DOCUMENT}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#
    )
}

fn properties_attr(properties: &[String]) -> String {
    if properties.is_empty() {
        String::new()
    } else {
        format!(" properties=\"{}\"", escape_xml(&properties.join(" ")))
    }
}

/// Whether `name` can stand as the local part of a `dc:` element name.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Check metadata before it is written into a package document.
///
/// Every Dublin Core key must be a plain element name, and one
/// `dc:identifier` must carry the id the package's `unique-identifier`
/// points at.
pub fn validate_metadata(metadata: &[MetadataItem]) -> Result<()> {
    if let Some(item) = metadata
        .iter()
        .find(|m| !m.is_property && !is_element_name(&m.key))
    {
        return Err(Error::Configuration(format!(
            "metadata key '{}' is not a valid element name",
            item.key
        )));
    }
    let identified = metadata.iter().any(|m| {
        !m.is_property && m.key == "identifier" && m.id.as_deref() == Some(UNIQUE_IDENTIFIER_ID)
    });
    if !identified {
        return Err(Error::Reference(format!(
            "unique identifier '{UNIQUE_IDENTIFIER_ID}' has no dc:identifier"
        )));
    }
    Ok(())
}

fn metadata_item(opf: &mut String, item: &MetadataItem) {
    let id = item
        .id
        .as_deref()
        .map(|id| format!(" id=\"{}\"", escape_xml(id)))
        .unwrap_or_default();
    if item.is_property {
        opf.push_str(&format!(
            "    <meta property=\"{}\"{id}>{}</meta>\n",
            escape_xml(&item.key),
            escape_xml(&item.value)
        ));
    } else {
        opf.push_str(&format!(
            "    <dc:{key}{id}>{}</dc:{key}>\n",
            escape_xml(&item.value),
            key = item.key
        ));
    }

    if let Some(target) = &item.id {
        for refine in &item.refines {
            let scheme = refine
                .scheme
                .as_deref()
                .map(|s| format!(" scheme=\"{}\"", escape_xml(s)))
                .unwrap_or_default();
            opf.push_str(&format!(
                "    <meta refines=\"#{}\" property=\"{}\"{scheme}>{}</meta>\n",
                escape_xml(target),
                escape_xml(&refine.property),
                escape_xml(&refine.value)
            ));
        }
    }
}

/// EPUB 3 package document (`content.opf`).
///
/// Hrefs are relative to the package root and percent-encoded. Fails when
/// [`validate_metadata`] rejects `metadata`.
pub fn package_document(
    metadata: &[MetadataItem],
    manifest: &[ManifestItem],
    spine: &[SpineItem],
) -> Result<String> {
    validate_metadata(metadata)?;
    let mut opf = String::new();
    opf.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="{UNIQUE_IDENTIFIER_ID}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#
    ));
    for item in metadata {
        metadata_item(&mut opf, item);
    }
    opf.push_str("  </metadata>\n  <manifest>\n");

    for item in manifest {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&encode_href(&item.href)),
            escape_xml(&item.media_type),
            properties_attr(&item.properties)
        ));
    }
    opf.push_str("  </manifest>\n  <spine>\n");

    for item in spine {
        opf.push_str(&format!(
            "    <itemref idref=\"{}\" linear=\"{}\"{}/>\n",
            escape_xml(&item.idref),
            if item.linear { "yes" } else { "no" },
            properties_attr(&item.properties)
        ));
    }
    opf.push_str("  </spine>\n</package>\n");
    Ok(opf)
}

/// EPUB 3 navigation document (`toc.xhtml`) with a table of contents and,
/// when any are given, landmarks.
pub fn navigation_document(
    title: &str,
    language: Option<&str>,
    nav: &[NavItem],
    landmarks: &[Landmark],
) -> String {
    let lang = language
        .map(|l| {
            let l = escape_xml(l);
            format!(" lang=\"{l}\" xml:lang=\"{l}\"")
        })
        .unwrap_or_default();

    let mut out = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"{lang}>
  <head>
    <meta charset="utf-8"/>
    <title>{}</title>
  </head>
  <body>
    <nav epub:type="toc" id="toc">
      <h1>{}</h1>
      <ol>
"#,
        escape_xml(title),
        escape_xml(title)
    );
    for item in nav {
        out.push_str(&format!(
            "        <li><a href=\"{}\">{}</a></li>\n",
            escape_xml(&encode_href(&item.href)),
            escape_xml(&item.title)
        ));
    }
    out.push_str("      </ol>\n    </nav>\n");

    if !landmarks.is_empty() {
        out.push_str("    <nav epub:type=\"landmarks\" id=\"landmarks\" hidden=\"\">\n      <ol>\n");
        for landmark in landmarks {
            out.push_str(&format!(
                "        <li><a epub:type=\"{}\" href=\"{}\">{}</a></li>\n",
                escape_xml(&landmark.kind),
                escape_xml(&encode_href(&landmark.href)),
                escape_xml(&landmark.title)
            ));
        }
        out.push_str("      </ol>\n    </nav>\n");
    }
    out.push_str("  </body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::metadata::MetadataRefine;

    #[test]
    fn test_container_points_at_package_document() {
        assert!(container_xml().contains("full-path=\"EPUB/content.opf\""));
    }

    #[test]
    fn test_package_document() {
        let mut creator = MetadataItem::dc("creator", "Jane Doe").with_id("creator1");
        creator
            .add_refine(MetadataRefine::new("role", "aut").with_scheme("marc:relators"))
            .unwrap();
        let metadata = vec![
            MetadataItem::dc("identifier", "urn:isbn:8175257660").with_id("BookId"),
            MetadataItem::dc("title", "Tom & Jerry"),
            creator,
            MetadataItem::property("dcterms:modified", "2024-01-01T00:00:00Z"),
        ];
        let manifest = vec![
            ManifestItem::new("toc", "toc.xhtml", "application/xhtml+xml").with_property("nav"),
            ManifestItem::new("c1", "Content/1 - One.xhtml", "application/xhtml+xml"),
        ];
        let spine = vec![SpineItem::new("c1")];

        let opf = package_document(&metadata, &manifest, &spine).unwrap();
        assert!(opf.contains("unique-identifier=\"BookId\""));
        assert!(opf.contains("<dc:identifier id=\"BookId\">urn:isbn:8175257660</dc:identifier>"));
        assert!(opf.contains("<dc:title>Tom &amp; Jerry</dc:title>"));
        assert!(opf.contains(
            "<meta refines=\"#creator1\" property=\"role\" scheme=\"marc:relators\">aut</meta>"
        ));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-01-01T00:00:00Z</meta>"));
        assert!(opf.contains(
            "<item id=\"toc\" href=\"toc.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>"
        ));
        assert!(opf.contains("href=\"Content/1%20-%20One.xhtml\""));
        assert!(opf.contains("<itemref idref=\"c1\" linear=\"yes\"/>"));
    }

    #[test]
    fn test_package_needs_its_unique_identifier() {
        let untagged = vec![
            MetadataItem::dc("identifier", "urn:uuid:1"),
            MetadataItem::dc("title", "Book"),
        ];
        let err = package_document(&untagged, &[], &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);

        let as_property = vec![MetadataItem::property("identifier", "x").with_id("BookId")];
        assert_eq!(validate_metadata(&as_property).unwrap_err().kind(), ErrorKind::Reference);
    }

    #[test]
    fn test_metadata_keys_must_be_element_names() {
        for key in ["ti tle", "a<b", "x\"y", "", "1st"] {
            let metadata = vec![
                MetadataItem::dc("identifier", "urn:uuid:1").with_id("BookId"),
                MetadataItem::dc(key, "v"),
            ];
            let err = validate_metadata(&metadata).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{key}");
        }
        let metadata = vec![
            MetadataItem::dc("identifier", "urn:uuid:1").with_id("BookId"),
            MetadataItem::dc("x-custom.field_2", "v"),
            MetadataItem::property("dcterms:modified", "2024-01-01T00:00:00Z"),
        ];
        assert!(validate_metadata(&metadata).is_ok());
    }

    #[test]
    fn test_navigation_document() {
        let nav = vec![NavItem::new("One & Two", "Content/1 - One.xhtml")];
        let landmarks = vec![Landmark {
            kind: "bodymatter".into(),
            title: "Start".into(),
            href: "Content/1 - One.xhtml".into(),
        }];
        let doc = navigation_document("Book", Some("en"), &nav, &landmarks);
        assert!(doc.contains("lang=\"en\""));
        assert!(doc.contains("<a href=\"Content/1%20-%20One.xhtml\">One &amp; Two</a>"));
        assert!(doc.contains("epub:type=\"bodymatter\""));

        let bare = navigation_document("Book", None, &nav, &[]);
        assert!(!bare.contains("landmarks"));
    }
}
