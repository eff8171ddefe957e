//! Manifest, spine, navigation and link-table assembly.

use std::path::{Path, PathBuf};

use super::links::LinkTable;
use super::{
    CONTAINER_PATH, CONTENT_DIR, COVER_ID, Landmark, ManifestItem, NAV_DOCUMENT, NAV_ID, NavItem,
    PACKAGE_DOCUMENT, PACKAGE_ROOT, RESOURCES_DIR, SpineItem,
};
use crate::error::{Error, Result};
use crate::import::{HtmlImporter, Importer};
use crate::util::{
    generate_section_file_name, guess_media_type, href_to_id, sanitize_file_name,
    strip_numeric_prefix,
};

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// What a staged file is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    /// Written by the packager (package document, navigation, container).
    Generated,
    /// An XHTML content file; its relative links are rewritten on staging.
    Content,
    /// Copied verbatim.
    Resource,
}

/// One file of the staged package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Original location; `None` for generated files.
    pub source: Option<PathBuf>,
    /// Location relative to the staging root.
    pub destination: PathBuf,
    pub kind: StagedKind,
}

/// A landmark request naming one of the content files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandmarkSpec {
    pub kind: String,
    pub title: String,
    /// File name of the content file, with or without a position prefix.
    pub file: String,
}

impl LandmarkSpec {
    pub fn new(kind: impl Into<String>, title: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            file: file.into(),
        }
    }
}

/// Everything that goes into one package.
#[derive(Debug, Clone, Default)]
pub struct PackageInput {
    /// XHTML content files in reading order.
    pub content: Vec<PathBuf>,
    /// Stylesheets, images and fonts.
    pub resources: Vec<PathBuf>,
    pub cover: Option<PathBuf>,
    /// Extra link-table pairs: original reference and destination relative
    /// to the package root. Earlier pairs win.
    pub link_overrides: Vec<(PathBuf, String)>,
    pub landmarks: Vec<LandmarkSpec>,
}

/// The assembled descriptors of one package.
#[derive(Debug, Clone, Default)]
pub struct PackagePlan {
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub nav: Vec<NavItem>,
    pub landmarks: Vec<Landmark>,
    pub links: LinkTable,
    pub files: Vec<StagedFile>,
}

/// Incremental builder for a [`PackagePlan`].
///
/// Identifiers are checked as items are added: a duplicate manifest id or a
/// spine reference to an unknown id is a reference error.
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    plan: PackagePlan,
    /// Sanitized, prefix-free stem of each navigation item's source file.
    nav_keys: Vec<String>,
}

impl Default for PackageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

fn package_path(href: &str) -> PathBuf {
    Path::new(PACKAGE_ROOT).join(href)
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Configuration(format!("'{}' has no file name", path.display())))
}

/// Sanitized stem with any `"<digits> - "` prefix removed.
fn stem_key(file: &str) -> String {
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    sanitize_file_name(strip_numeric_prefix(&stem))
}

impl PackageAssembler {
    /// A builder already holding the infrastructure files.
    pub fn new() -> Self {
        let mut plan = PackagePlan::default();
        for destination in [
            package_path(PACKAGE_DOCUMENT),
            package_path(NAV_DOCUMENT),
            PathBuf::from(CONTAINER_PATH),
        ] {
            plan.files.push(StagedFile {
                source: None,
                destination,
                kind: StagedKind::Generated,
            });
        }
        plan.manifest
            .push(ManifestItem::new(NAV_ID, NAV_DOCUMENT, XHTML_MEDIA_TYPE).with_property("nav"));
        Self {
            plan,
            nav_keys: Vec::new(),
        }
    }

    pub fn manifest(&self) -> &[ManifestItem] {
        &self.plan.manifest
    }

    pub fn nav(&self) -> &[NavItem] {
        &self.plan.nav
    }

    pub fn add_manifest_item(&mut self, item: ManifestItem) -> Result<()> {
        if self.plan.manifest.iter().any(|m| m.id == item.id) {
            return Err(Error::Reference(format!(
                "manifest already has an item with id '{}'",
                item.id
            )));
        }
        tracing::debug!(id = %item.id, href = %item.href, "added manifest item");
        self.plan.manifest.push(item);
        Ok(())
    }

    pub fn add_spine_item(&mut self, item: SpineItem) -> Result<()> {
        if !self.plan.manifest.iter().any(|m| m.id == item.idref) {
            return Err(Error::Reference(format!(
                "spine item references unknown manifest id '{}'",
                item.idref
            )));
        }
        tracing::debug!(idref = %item.idref, "added spine item");
        self.plan.spine.push(item);
        Ok(())
    }

    fn stage(&mut self, source: &Path, href: &str, kind: StagedKind) {
        let destination = package_path(href);
        self.plan.links.push(source, &destination);
        self.plan.files.push(StagedFile {
            source: Some(source.to_path_buf()),
            destination,
            kind,
        });
    }

    /// Add the cover image, flagged as such.
    pub fn add_cover(&mut self, path: &Path) -> Result<()> {
        let name = file_name(path)?;
        let href = format!("{RESOURCES_DIR}/{name}");
        self.add_manifest_item(
            ManifestItem::new(COVER_ID, href.as_str(), guess_media_type(&name))
                .with_property("cover-image"),
        )?;
        self.stage(path, &href, StagedKind::Resource);
        Ok(())
    }

    /// Add the content files in reading order.
    ///
    /// Each file is renamed to `<padded index> - <sanitized stem>.xhtml`, any
    /// existing position prefix being dropped first. `title_of` supplies the
    /// navigation title.
    pub fn add_content<F>(&mut self, files: &[PathBuf], mut title_of: F) -> Result<()>
    where
        F: FnMut(&Path) -> Result<String>,
    {
        let total = files.len();
        for (index, path) in files.iter().enumerate() {
            let original = file_name(path)?;
            let stem = Path::new(&original)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = format!(
                "{}.xhtml",
                generate_section_file_name(strip_numeric_prefix(&stem), index, total)
            );
            let href = format!("{CONTENT_DIR}/{name}");
            let id = href_to_id(&name);

            self.add_manifest_item(ManifestItem::new(id.as_str(), href.as_str(), XHTML_MEDIA_TYPE))?;
            self.add_spine_item(SpineItem::new(id))?;
            let title = title_of(path)?;
            self.plan.nav.push(NavItem::new(title, href.as_str()));
            self.nav_keys.push(stem_key(&original));
            self.stage(path, &href, StagedKind::Content);
        }
        Ok(())
    }

    /// Add a file that is listed in the manifest but not read in order.
    pub fn add_resource(&mut self, path: &Path) -> Result<()> {
        let name = file_name(path)?;
        let href = format!("{RESOURCES_DIR}/{name}");
        self.add_manifest_item(ManifestItem::new(
            href_to_id(&name),
            href.as_str(),
            guess_media_type(&name),
        ))?;
        self.stage(path, &href, StagedKind::Resource);
        Ok(())
    }

    /// Put explicit link pairs ahead of the derived ones; the first pair
    /// given takes precedence.
    pub fn add_link_overrides(&mut self, overrides: &[(PathBuf, String)]) {
        for (source, href) in overrides.iter().rev() {
            self.plan.links.prepend(source, package_path(href));
        }
    }

    /// Point a landmark at the content file matching `spec.file`.
    pub fn add_landmark(&mut self, spec: &LandmarkSpec) -> Result<()> {
        let key = stem_key(&spec.file);
        let index = self
            .nav_keys
            .iter()
            .position(|k| *k == key)
            .ok_or_else(|| {
                Error::Reference(format!(
                    "landmark '{}' names '{}', which is not a content file",
                    spec.kind, spec.file
                ))
            })?;
        let href = self.plan.nav[index].href.clone();
        tracing::debug!(kind = %spec.kind, href = %href, "added landmark");
        self.plan.landmarks.push(Landmark {
            kind: spec.kind.clone(),
            title: spec.title.clone(),
            href,
        });
        Ok(())
    }

    pub fn finish(self) -> PackagePlan {
        self.plan
    }
}

/// The `<title>` of an XHTML file, or its prefix-free stem when it has none.
pub fn read_title(path: &Path) -> Result<String> {
    let info = HtmlImporter::new().read_metadata_file(path)?;
    match info.title.filter(|t| !t.trim().is_empty()) {
        Some(title) => Ok(title),
        None => {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::warn!(path = %path.display(), "content file has no title; using its name");
            Ok(strip_numeric_prefix(&stem).to_string())
        }
    }
}

/// Assemble a package, reading navigation titles from the content files.
pub fn assemble(input: &PackageInput) -> Result<PackagePlan> {
    assemble_with(input, read_title)
}

/// Assemble a package with caller-supplied navigation titles.
///
/// Steps run in a fixed order: cover, content, resources, link overrides,
/// landmarks.
pub fn assemble_with<F>(input: &PackageInput, title_of: F) -> Result<PackagePlan>
where
    F: FnMut(&Path) -> Result<String>,
{
    let mut assembler = PackageAssembler::new();
    if let Some(cover) = &input.cover {
        assembler.add_cover(cover)?;
    }
    assembler.add_content(&input.content, title_of)?;
    for resource in &input.resources {
        assembler.add_resource(resource)?;
    }
    assembler.add_link_overrides(&input.link_overrides);
    for landmark in &input.landmarks {
        assembler.add_landmark(landmark)?;
    }

    let plan = assembler.finish();
    tracing::info!(
        manifest = plan.manifest.len(),
        spine = plan.spine.len(),
        landmarks = plan.landmarks.len(),
        "assembled package"
    );
    Ok(plan)
}
