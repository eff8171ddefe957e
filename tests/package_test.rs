use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use bindery::epub::{
    EPUB_MIMETYPE, EpubBuild, LandmarkSpec, PackageInput, build_epub, relative_path,
};
use bindery::metadata::{Agent, Bibliography, MetadataItem, MetadataOptions};
use bindery::{
    ConversionConfig, ErrorKind, Format, WriteOptions, convert_to_sections,
    metadata_from_bibliography, metadata_from_info,
};
use zip::{CompressionMethod, ZipArchive};

fn fixed_time() -> MetadataOptions {
    MetadataOptions {
        modified: Some("2024-05-01T12:00:00Z".into()),
        ..Default::default()
    }
}

fn identified() -> Vec<MetadataItem> {
    vec![
        MetadataItem::dc("identifier", "urn:uuid:0f3a9c2e").with_id("BookId"),
        MetadataItem::dc("title", "Body"),
    ]
}

fn entry(archive: &mut ZipArchive<fs::File>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("missing entry {name}"))
        .read_to_string(&mut text)
        .unwrap();
    text
}

/// Write `Sources/Xhtml/<name>` with a title and a stylesheet link.
fn content_file(root: &Path, name: &str, title: &str, extra: &str) -> PathBuf {
    let path = root.join("Sources").join("Xhtml").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>{title}</title>\
             <link rel=\"stylesheet\" type=\"text/css\" href=\"../Styles.css\"/></head>\
             <body><section><h1>{title}</h1><p>Text.{extra}</p></section></body></html>\n"
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_relocated_stylesheet_link() {
    assert_eq!(
        relative_path(
            Path::new("EPUB/Resources/Styles.css"),
            Path::new("EPUB/Content")
        ),
        "../Resources/Styles.css"
    );
}

#[test]
fn test_package_layout_and_documents() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let sources = root.join("Sources");
    let foreword = content_file(root, "Foreword.xhtml", "Foreword", "");
    let body = content_file(
        root,
        "Body.xhtml",
        "Body",
        " <a href=\"./Afterword.xhtml#end\">after</a><img src=\"../cover.png\" alt=\"\"/>",
    );
    let afterword = content_file(root, "Afterword.xhtml", "Afterword", "");
    fs::write(sources.join("Styles.css"), "body { margin: 0 }").unwrap();
    fs::write(sources.join("cover.png"), b"\x89PNG\r\n\x1a\n").unwrap();

    let bibliography = Bibliography {
        identifiers: vec!["ISBN 81 7525 766 0".into()],
        titles: vec!["Three Parts".into()],
        languages: vec!["en".into()],
        creators: vec![Agent::new("Ada Marsh").with_role("Author").with_file_as("Marsh, Ada")],
        ..Default::default()
    };
    let build = EpubBuild {
        input: PackageInput {
            content: vec![foreword, body, afterword],
            resources: vec![sources.join("Styles.css")],
            cover: Some(sources.join("cover.png")),
            landmarks: vec![LandmarkSpec::new("bodymatter", "Start of Content", "Body.xhtml")],
            ..Default::default()
        },
        metadata: metadata_from_bibliography(&bibliography, &fixed_time()).unwrap(),
        staging_dir: root.join("staging"),
    };
    let output = root.join("book.epub");
    build_epub(&build, &output, &WriteOptions::default()).unwrap();

    let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
    {
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }
    assert_eq!(entry(&mut archive, "mimetype"), EPUB_MIMETYPE);
    for i in 1..archive.len() {
        assert_eq!(
            archive.by_index(i).unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    let container = entry(&mut archive, "META-INF/container.xml");
    assert!(container.contains("full-path=\"EPUB/content.opf\""));

    let opf = entry(&mut archive, "EPUB/content.opf");
    assert!(opf.contains("<dc:identifier id=\"BookId\">urn:isbn:8175257660</dc:identifier>"));
    assert!(opf.contains("property=\"role\" scheme=\"marc:relators\">aut</meta>"));
    assert!(opf.contains("property=\"file-as\">Marsh, Ada</meta>"));
    assert!(opf.contains("<meta property=\"dcterms:modified\">2024-05-01T12:00:00Z</meta>"));
    assert!(opf.contains("properties=\"cover-image\""));
    assert!(opf.contains("href=\"Content/2%20-%20Body.xhtml\""));
    let cover_at = opf.find("cover-image").unwrap();
    let content_at = opf.find("Content/1%20-%20Foreword.xhtml").unwrap();
    assert!(cover_at < content_at);
    assert_eq!(opf.matches("<itemref ").count(), 3);

    let nav = entry(&mut archive, "EPUB/toc.xhtml");
    assert!(nav.contains("<a href=\"Content/1%20-%20Foreword.xhtml\">Foreword</a>"));
    assert!(nav.contains(
        "<a epub:type=\"bodymatter\" href=\"Content/2%20-%20Body.xhtml\">Start of Content</a>"
    ));

    let body = entry(&mut archive, "EPUB/Content/2 - Body.xhtml");
    assert!(body.contains("href=\"../Resources/Styles.css\""));
    assert!(body.contains("href=\"3%20-%20Afterword.xhtml#end\""));
    assert!(body.contains("src=\"../Resources/cover.png\""));
}

#[test]
fn test_unknown_landmark_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let body = content_file(root, "Body.xhtml", "Body", "");
    fs::write(root.join("Sources").join("Styles.css"), "").unwrap();

    let build = EpubBuild {
        input: PackageInput {
            content: vec![body],
            resources: vec![root.join("Sources").join("Styles.css")],
            landmarks: vec![LandmarkSpec::new("backmatter", "Index", "Index.xhtml")],
            ..Default::default()
        },
        metadata: identified(),
        staging_dir: root.join("staging"),
    };
    let output = root.join("book.epub");
    let err = build_epub(&build, &output, &WriteOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(!output.exists());
    assert!(!root.join("staging").exists());
}

#[test]
fn test_metadata_without_unique_identifier_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let body = content_file(root, "Body.xhtml", "Body", "");

    let build = EpubBuild {
        input: PackageInput {
            content: vec![body],
            ..Default::default()
        },
        metadata: vec![
            MetadataItem::dc("identifier", "urn:uuid:0f3a9c2e"),
            MetadataItem::dc("title", "Body"),
        ],
        staging_dir: root.join("staging"),
    };
    let output = root.join("book.epub");
    let err = build_epub(&build, &output, &WriteOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(err.to_string().contains("BookId"));
    assert!(!output.exists());
    assert!(!root.join("staging").exists());
}

#[test]
fn test_markdown_sections_to_epub() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let book = root.join("book.md");
    fs::write(
        &book,
        "---\ntitle: Collected\nidentifier: ISBN 81-7525-766-0\nlanguage: en\n---\n\
         # First Part\n\nOne.\n\n# Second Part\n\nTwo.\n",
    )
    .unwrap();

    let sections = convert_to_sections(
        &book,
        &root.join("xhtml"),
        Format::Html,
        &ConversionConfig::default(),
        &WriteOptions::default(),
    )
    .unwrap();
    let info = Format::Markdown
        .importer()
        .read_metadata_file(&book)
        .unwrap();

    let build = EpubBuild {
        input: PackageInput {
            content: sections,
            ..Default::default()
        },
        metadata: metadata_from_info(&info, &fixed_time()).unwrap(),
        staging_dir: root.join("staging"),
    };
    let output = root.join("book.epub");
    let plan = build_epub(&build, &output, &WriteOptions::default()).unwrap();

    let titles: Vec<&str> = plan.nav.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["First Part", "Second Part"]);
    assert_eq!(plan.nav[1].href, "Content/2 - Second Part.xhtml");

    let mut archive = ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
    let opf = entry(&mut archive, "EPUB/content.opf");
    assert!(opf.contains("<dc:title>Collected</dc:title>"));
    assert!(opf.contains("<dc:language>en</dc:language>"));
}

#[test]
fn test_archives_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let body = content_file(root, "Body.xhtml", "Body", "");
    fs::write(root.join("Sources").join("Styles.css"), "p {}").unwrap();

    let mut outputs = Vec::new();
    for run in 0..2 {
        let build = EpubBuild {
            input: PackageInput {
                content: vec![body.clone()],
                resources: vec![root.join("Sources").join("Styles.css")],
                ..Default::default()
            },
            metadata: identified(),
            staging_dir: root.join(format!("staging-{run}")),
        };
        let output = root.join(format!("book-{run}.epub"));
        build_epub(&build, &output, &WriteOptions::default()).unwrap();
        outputs.push(fs::read(output).unwrap());
    }
    assert_eq!(outputs[0], outputs[1]);
}
