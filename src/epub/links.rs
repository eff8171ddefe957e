//! Relative link bookkeeping for relocated package files.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::util::{attribute_value, local_name};

/// Characters escaped in package hrefs. `/` stays literal.
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode a `/`-separated package path for use in an href.
pub fn encode_href(path: &str) -> String {
    utf8_percent_encode(path, HREF).to_string()
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
///
/// A `..` with nothing left to fold stays in place.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Path of `target` relative to the directory `base`, `/`-separated.
///
/// Both paths are normalized first and must share the same anchor.
///
/// ```
/// use std::path::Path;
/// use bindery::epub::relative_path;
///
/// let href = relative_path(Path::new("EPUB/Resources/Styles.css"), Path::new("EPUB/Content"));
/// assert_eq!(href, "../Resources/Styles.css");
/// ```
pub fn relative_path(target: &Path, base: &Path) -> String {
    let target = normalize_path(target);
    let base = normalize_path(base);
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    parts.join("/")
}

/// Ordered lookup from original file references to relocated paths.
///
/// Both sides are kept normalized. Lookups return the first match, so
/// entries placed in front take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTable {
    entries: Vec<(PathBuf, PathBuf)>,
}

impl LinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: impl AsRef<Path>, destination: impl AsRef<Path>) {
        self.entries.push((
            normalize_path(source.as_ref()),
            normalize_path(destination.as_ref()),
        ));
    }

    /// Insert ahead of every existing entry.
    pub fn prepend(&mut self, source: impl AsRef<Path>, destination: impl AsRef<Path>) {
        self.entries.insert(
            0,
            (
                normalize_path(source.as_ref()),
                normalize_path(destination.as_ref()),
            ),
        );
    }

    pub fn lookup(&self, source: &Path) -> Option<&Path> {
        let source = normalize_path(source);
        self.entries
            .iter()
            .find(|(from, _)| *from == source)
            .map(|(_, to)| to.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries.iter().map(|(a, b)| (a.as_path(), b.as_path()))
    }

    /// Rewrite one relative reference found in a file under `old_dir` so it
    /// resolves from `new_dir`. Fragments and queries are carried over.
    pub fn rewrite(&self, href: &str, old_dir: &Path, new_dir: &Path) -> Result<String> {
        let split = href.find(['#', '?']).unwrap_or(href.len());
        let (path, suffix) = href.split_at(split);
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let resolved = normalize_path(&old_dir.join(decoded.as_ref()));

        let destination = self.lookup(&resolved).ok_or_else(|| {
            Error::Reference(format!(
                "link '{href}' resolves to '{}', which is not part of the package",
                resolved.display()
            ))
        })?;
        Ok(format!(
            "{}{suffix}",
            encode_href(&relative_path(destination, new_dir))
        ))
    }
}

fn is_link_attribute(key: &[u8]) -> bool {
    matches!(local_name(key), b"href" | b"src")
}

/// Rewrite every relative `href`/`src` starting with `.` in an XHTML file
/// that moves from `old_dir` to `new_dir`.
///
/// Everything else passes through event by event.
pub fn rewrite_links(
    xhtml: &str,
    old_dir: &Path,
    new_dir: &Path,
    table: &LinkTable,
) -> Result<String> {
    let mut reader = Reader::from_str(xhtml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xhtml.len()));
    let mut rewritten = 0usize;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                let e = relink(&e, old_dir, new_dir, table, &mut rewritten)?;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) => {
                let e = relink(&e, old_dir, new_dir, table, &mut rewritten)?;
                writer.write_event(Event::Empty(e))?;
            }
            other => writer.write_event(other)?,
        }
    }

    tracing::debug!(
        from = %old_dir.display(),
        to = %new_dir.display(),
        rewritten,
        "rewrote links"
    );
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::parse("xhtml", format!("rewritten output is not UTF-8: {e}")))
}

fn relink(
    element: &BytesStart<'_>,
    old_dir: &Path,
    new_dir: &Path,
    table: &LinkTable,
    rewritten: &mut usize,
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);

    for attr in element.attributes() {
        let attr = attr?;
        if !is_link_attribute(attr.key.as_ref()) {
            out.push_attribute(attr);
            continue;
        }
        let value = attribute_value(&attr.value)?;
        if !value.starts_with('.') {
            out.push_attribute(attr);
            continue;
        }
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let href = table.rewrite(&value, old_dir, new_dir)?;
        out.push_attribute((key.as_str(), href.as_str()));
        *rewritten += 1;
    }
    Ok(out)
}
