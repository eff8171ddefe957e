//! Inline comments and the regions they annotate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Element, ElementKind};
use crate::error::{Error, Result};

/// A comment anchored to a region of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentComment {
    /// Identifier shared with the region's start/end markers.
    pub id: String,
    pub author: Option<String>,
    pub date: Option<String>,
    /// Comment body, one entry per paragraph.
    pub paragraphs: Vec<String>,
}

impl DocumentComment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }
}

/// Pre-order positions of a region's markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRange {
    pub start: usize,
    pub end: usize,
}

/// Validated map from region identifier to its marker positions.
///
/// Positions index the pre-order walk of the tree the regions were built
/// from. An end marker without a start is tolerated and ignored.
#[derive(Debug, Clone, Default)]
pub struct CommentRegions {
    ranges: HashMap<String, RegionRange>,
}

impl CommentRegions {
    /// Pair every start marker with the next end marker of the same id.
    pub fn build(root: &Element) -> Result<Self> {
        let mut open: HashMap<&str, usize> = HashMap::new();
        let mut ranges = HashMap::new();

        for (position, element) in root.descendants().enumerate() {
            match element.kind {
                ElementKind::RegionStart => {
                    let id = marker_id(element)?;
                    if open.contains_key(id) || ranges.contains_key(id) {
                        return Err(Error::Structural(format!(
                            "comment region '{id}' is opened twice"
                        )));
                    }
                    open.insert(id, position);
                }
                ElementKind::RegionEnd => {
                    let id = marker_id(element)?;
                    if let Some(start) = open.remove(id) {
                        ranges.insert(
                            id.to_string(),
                            RegionRange {
                                start,
                                end: position,
                            },
                        );
                    }
                }
                _ => {}
            }
        }

        if let Some(id) = open.keys().min() {
            return Err(Error::Structural(format!(
                "comment region '{id}' has no matching end marker"
            )));
        }

        Ok(Self { ranges })
    }

    pub fn get(&self, id: &str) -> Option<RegionRange> {
        self.ranges.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

fn marker_id(element: &Element) -> Result<&str> {
    element
        .region_id()
        .ok_or_else(|| Error::Structural("comment region marker without identifier".into()))
}

/// Comments keyed by id, checked against the tree's regions.
///
/// Writers consult this while serializing markers.
#[derive(Debug)]
pub struct CommentIndex<'a> {
    comments: HashMap<&'a str, &'a DocumentComment>,
    regions: CommentRegions,
}

impl<'a> CommentIndex<'a> {
    pub fn new(root: &Element, comments: &'a [DocumentComment]) -> Result<Self> {
        let regions = CommentRegions::build(root)?;
        let comments = comments.iter().map(|c| (c.id.as_str(), c)).collect();
        Ok(Self { comments, regions })
    }

    /// The comment a start marker opens. Unregistered ids are an error.
    pub fn start(&self, id: &str) -> Result<&'a DocumentComment> {
        self.comments
            .get(id)
            .copied()
            .ok_or_else(|| Error::Reference(format!("comment '{id}' is not registered")))
    }

    /// The comment an end marker closes, if it is registered and paired.
    pub fn end(&self, id: &str) -> Option<&'a DocumentComment> {
        self.regions.get(id)?;
        self.comments.get(id).copied()
    }

    pub fn regions(&self) -> &CommentRegions {
        &self.regions
    }

    /// Registered comments that actually anchor a region, in id order.
    pub fn anchored(&self) -> Vec<&'a DocumentComment> {
        let mut anchored: Vec<_> = self
            .comments
            .values()
            .copied()
            .filter(|c| self.regions.get(&c.id).is_some())
            .collect();
        anchored.sort_by_key(|c| self.regions.get(&c.id).map(|r| r.start));
        anchored
    }
}
