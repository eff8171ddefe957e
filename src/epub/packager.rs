//! Staging and zipping of an assembled package.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::assembler::{PackageInput, PackagePlan, StagedKind, assemble};
use super::documents::{container_xml, navigation_document, package_document, validate_metadata};
use super::links::rewrite_links;
use super::{CONTAINER_PATH, EPUB_MIMETYPE, MIMETYPE_PATH, NAV_DOCUMENT, PACKAGE_DOCUMENT, PACKAGE_ROOT};
use crate::config::WriteOptions;
use crate::error::{Error, Result};
use crate::metadata::MetadataItem;

/// One package build: what goes in, how it is described and where it is
/// staged before zipping.
#[derive(Debug, Clone)]
pub struct EpubBuild {
    pub input: PackageInput,
    pub metadata: Vec<MetadataItem>,
    /// Scratch directory mirroring the archive layout. It must be empty or
    /// absent; with `overwrite` an existing one is cleared.
    pub staging_dir: PathBuf,
}

fn dc_value<'a>(metadata: &'a [MetadataItem], key: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|m| !m.is_property && m.key == key)
        .map(|m| m.value.as_str())
}

/// Text of a generated file, by its staging path.
fn generated(destination: &Path, plan: &PackagePlan, metadata: &[MetadataItem]) -> Result<String> {
    let root = Path::new(PACKAGE_ROOT);
    if destination == root.join(PACKAGE_DOCUMENT) {
        package_document(metadata, &plan.manifest, &plan.spine)
    } else if destination == root.join(NAV_DOCUMENT) {
        Ok(navigation_document(
            dc_value(metadata, "title").unwrap_or("Contents"),
            dc_value(metadata, "language"),
            &plan.nav,
            &plan.landmarks,
        ))
    } else if destination == Path::new(CONTAINER_PATH) {
        Ok(container_xml())
    } else {
        Err(Error::Structural(format!(
            "no generator for package file '{}'",
            destination.display()
        )))
    }
}

fn prepare_staging(dir: &Path, options: &WriteOptions) -> Result<()> {
    let occupied = dir.exists() && fs::read_dir(dir)?.next().is_some();
    if !occupied {
        return Ok(());
    }
    if !options.overwrite {
        return Err(Error::Configuration(format!(
            "staging directory '{}' is not empty; pass overwrite to clear it",
            dir.display()
        )));
    }
    if !options.simulate {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

fn put(staging_dir: &Path, relative: &Path, bytes: &[u8], options: &WriteOptions) -> Result<()> {
    if options.simulate {
        return Ok(());
    }
    let path = staging_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, bytes)?;
    Ok(())
}

/// Lay every file of `plan` out under `staging_dir`.
///
/// Content files have their relative links rewritten for their new
/// location; resources are copied as they are. In simulate mode every file
/// is still read and rewritten, only the writes are skipped.
pub fn stage(
    plan: &PackagePlan,
    metadata: &[MetadataItem],
    staging_dir: &Path,
    options: &WriteOptions,
) -> Result<()> {
    prepare_staging(staging_dir, options)?;
    put(staging_dir, Path::new(MIMETYPE_PATH), EPUB_MIMETYPE.as_bytes(), options)?;

    for file in &plan.files {
        let bytes = match (&file.source, file.kind) {
            (None, _) | (Some(_), StagedKind::Generated) => {
                generated(&file.destination, plan, metadata)?.into_bytes()
            }
            (Some(source), StagedKind::Content) => {
                let text = fs::read_to_string(source)?;
                let old_dir = source.parent().unwrap_or(Path::new(""));
                let new_dir = file.destination.parent().unwrap_or(Path::new(""));
                rewrite_links(&text, old_dir, new_dir, &plan.links)?.into_bytes()
            }
            (Some(source), StagedKind::Resource) => fs::read(source)?,
        };
        put(staging_dir, &file.destination, &bytes, options)?;
        tracing::debug!(
            destination = %file.destination.display(),
            bytes = bytes.len(),
            "staged package file"
        );
    }
    tracing::info!(dir = %staging_dir.display(), files = plan.files.len(), "staged package");
    Ok(())
}

/// Archive entry name for a path under the staging root.
fn entry_name(staging_dir: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(staging_dir).map_err(|_| {
        Error::Structural(format!(
            "'{}' is outside the staging directory",
            path.display()
        ))
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Zip `staging_dir` into `output`, atomically.
///
/// `mimetype` is written first and stored; everything else follows in
/// lexicographic entry-name order, deflated, with fixed timestamps.
/// Returns `false` when simulate mode skipped the write.
pub fn write_archive(staging_dir: &Path, output: &Path, options: &WriteOptions) -> Result<bool> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(staging_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(staging_dir, entry.path())?;
        if name != MIMETYPE_PATH {
            entries.push((name, entry.into_path()));
        }
    }
    entries.sort();

    crate::io::write_atomic_with(output, options, |file| {
        let mut zip = ZipWriter::new(file);
        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        zip.start_file(MIMETYPE_PATH, stored)?;
        zip.write_all(EPUB_MIMETYPE.as_bytes())?;
        for (name, path) in &entries {
            zip.start_file(name.as_str(), deflated)?;
            zip.write_all(&fs::read(path)?)?;
            tracing::debug!(entry = %name, "added archive entry");
        }
        zip.finish()?;
        Ok(())
    })
}

/// Assemble, stage and zip one package.
///
/// The destination and the metadata are checked before any work so a
/// refused build leaves no staging behind.
pub fn build_epub(build: &EpubBuild, output: &Path, options: &WriteOptions) -> Result<PackagePlan> {
    crate::io::check_destination(output, options)?;
    validate_metadata(&build.metadata)?;
    let plan = assemble(&build.input)?;
    stage(&plan, &build.metadata, &build.staging_dir, options)?;
    if options.simulate {
        tracing::info!(path = %output.display(), "simulate: skipped package");
    } else {
        write_archive(&build.staging_dir, output, options)?;
        tracing::info!(path = %output.display(), "wrote package");
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Read;

    fn sources(dir: &Path) -> PackageInput {
        let src = dir.join("Sources");
        fs::create_dir_all(src.join("Xhtml")).unwrap();
        fs::write(src.join("Styles.css"), "p { margin: 0 }").unwrap();
        fs::write(
            src.join("Xhtml").join("File.xhtml"),
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>First</title>",
                "<link rel=\"stylesheet\" href=\"../Styles.css\"/></head>",
                "<body><p>Hi</p></body></html>\n"
            ),
        )
        .unwrap();
        PackageInput {
            content: vec![src.join("Xhtml").join("File.xhtml")],
            resources: vec![src.join("Styles.css")],
            ..Default::default()
        }
    }

    fn build(dir: &Path) -> EpubBuild {
        EpubBuild {
            input: sources(dir),
            metadata: vec![
                MetadataItem::dc("identifier", "urn:uuid:1").with_id("BookId"),
                MetadataItem::dc("title", "Book"),
            ],
            staging_dir: dir.join("staging"),
        }
    }

    #[test]
    fn test_build_writes_ordered_archive() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        let plan = build_epub(&build(dir.path()), &output, &WriteOptions::default()).unwrap();
        assert_eq!(plan.nav[0].title, "First");

        let mut archive = zip::ZipArchive::new(fs::File::open(&output).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "mimetype",
                "EPUB/Content/1 - File.xhtml",
                "EPUB/Resources/Styles.css",
                "EPUB/content.opf",
                "EPUB/toc.xhtml",
                "META-INF/container.xml",
            ]
        );
        assert_eq!(
            archive.by_index(0).unwrap().compression(),
            CompressionMethod::Stored
        );

        let mut xhtml = String::new();
        archive
            .by_name("EPUB/Content/1 - File.xhtml")
            .unwrap()
            .read_to_string(&mut xhtml)
            .unwrap();
        assert!(xhtml.contains("href=\"../Resources/Styles.css\""));
    }

    #[test]
    fn test_simulate_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        let job = build(dir.path());
        build_epub(&job, &output, &WriteOptions::simulate()).unwrap();
        assert!(!output.exists());
        assert!(!job.staging_dir.exists());
    }

    #[test]
    fn test_existing_output_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        fs::write(&output, b"old").unwrap();
        let err = build_epub(&build(dir.path()), &output, &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        build_epub(&build(dir.path()), &output, &WriteOptions::overwrite()).unwrap();
        assert_ne!(fs::read(&output).unwrap(), b"old");
    }

    #[test]
    fn test_broken_link_fails_before_archive() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("book.epub");
        let mut job = build(dir.path());
        job.input.resources.clear();
        let err = build_epub(&job, &output, &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Reference);
        assert!(!output.exists());
    }
}
