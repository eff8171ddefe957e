//! Style tag mapping between format vocabularies.
//!
//! A [`StyleMap`] sends each source tag to a target tag, or to `None` to
//! drop it. Readers tag elements with their own vocabulary (ODT style names,
//! HTML classes); mapping before writing lets another format express them.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tree::Element;

/// Tag for strong emphasis, shared by the HTML and Markdown vocabularies.
pub const BOLD: &str = "bold";
/// Tag for emphasis, shared by the HTML and Markdown vocabularies.
pub const ITALIC: &str = "italic";

/// Mapping from source style tags to target style tags.
///
/// JSON form: `{"Heading_20_1": "title", "Standard": null}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap {
    entries: HashMap<String, Option<String>>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map sending every tag used in `root` to itself.
    pub fn identity_for(root: &Element) -> Self {
        let entries = root
            .descendants()
            .flat_map(|e| e.styles.iter())
            .map(|s| (s.clone(), Some(s.clone())))
            .collect();
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let map = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), entries = map.len(), "loaded style map");
        Ok(map)
    }

    /// Map `from` to `to`.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.entries.insert(from.into(), Some(to.into()));
    }

    /// Map `from` to nothing, dropping it.
    pub fn drop_tag(&mut self, from: impl Into<String>) {
        self.entries.insert(from.into(), None);
    }

    /// The mapped value; `None` when `tag` is unmapped, `Some(None)` when dropped.
    pub fn get(&self, tag: &str) -> Option<Option<&str>> {
        self.entries.get(tag).map(Option::as_deref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace every style tag in the tree by its mapped value.
///
/// Fails with a mapping error naming the first unmapped tag; the tree is
/// checked before it is touched, so a failed call leaves it unchanged.
pub fn convert_styles(root: &mut Element, map: &StyleMap) -> Result<()> {
    let used: BTreeSet<&str> = root
        .descendants()
        .flat_map(|e| e.styles.iter().map(String::as_str))
        .collect();
    if let Some(missing) = used.into_iter().find(|tag| map.get(tag).is_none()) {
        return Err(Error::mapping("style", missing));
    }

    let mut rewritten = 0usize;
    root.walk_mut(&mut |element: &mut Element| {
        if element.styles.is_empty() {
            return Ok(());
        }
        let mut styles = Vec::with_capacity(element.styles.len());
        for tag in &element.styles {
            match map.get(tag) {
                Some(Some(target)) => styles.push(target.to_string()),
                Some(None) => {}
                None => return Err(Error::mapping("style", tag.as_str())),
            }
        }
        element.styles = styles;
        rewritten += 1;
        Ok(())
    })?;

    tracing::debug!(elements = rewritten, "converted styles");
    Ok(())
}
