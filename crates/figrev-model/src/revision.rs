//! Revisions and their data items.
//!
//! A revision is one immutable captured-and-annotated snapshot within a
//! figure's history. Drafts accumulate data items as they move through the
//! pipeline; once submitted, a revision is never mutated, and later
//! renderings supersede it with a higher sequence number.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::entity::NodeRef;

/// Rendered output formats a backend may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Svg,
    /// Interactive variant; the payload is UTF-8 markup rather than pixels.
    Html,
    /// Serialized live-artifact snapshot riding along with the image data.
    Snapshot,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Html => "html",
            Self::Snapshot => "snapshot",
        }
    }

    /// Whether the format carries raster pixels the watermark can composite.
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Png)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source language of a captured code item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodeLanguage {
    #[default]
    Python,
    R,
    Other,
}

/// One unit of captured data attached to a revision.
///
/// Multiple `Image` items may coexist: one per format × watermark flag
/// combination, plus one per distinct render-options call.
#[derive(Debug, Clone)]
pub enum DataItem {
    Image {
        name: String,
        format: ImageFormat,
        data: Vec<u8>,
        is_watermarked: bool,
        /// Declared pixel dimensions, when known. Watermarking preserves
        /// these even though the bytes change.
        width: Option<u32>,
        height: Option<u32>,
    },
    Code {
        name: String,
        language: CodeLanguage,
        contents: String,
        metadata: BTreeMap<String, serde_json::Value>,
    },
    Text {
        name: String,
        contents: String,
    },
    Table {
        name: String,
        frame: DataFrame,
    },
}

impl DataItem {
    pub fn name(&self) -> &str {
        match self {
            Self::Image { name, .. }
            | Self::Code { name, .. }
            | Self::Text { name, .. }
            | Self::Table { name, .. } => name,
        }
    }

    pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub fn code(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self::Code {
            name: name.into(),
            language: CodeLanguage::default(),
            contents: contents.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Identifier assigned by the store when a revision is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable draft accumulated by the pipeline before submission.
#[derive(Debug, Clone)]
pub struct RevisionDraft {
    pub figure: NodeRef,
    pub items: Vec<DataItem>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl RevisionDraft {
    pub fn new(figure: NodeRef) -> Self {
        Self {
            figure,
            items: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn push_item(&mut self, item: DataItem) {
        self.items.push(item);
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Image items matching a format and watermark flag.
    pub fn images(&self, format: ImageFormat, watermarked: bool) -> Vec<&DataItem> {
        filter_images(&self.items, format, watermarked)
    }

    /// Seal the draft with its in-figure sequence number.
    pub fn into_revision(self, sequence: u64) -> Revision {
        Revision {
            id: None,
            figure: self.figure,
            sequence,
            items: self.items,
            metadata: self.metadata,
            created_on: Utc::now(),
        }
    }
}

/// One immutable revision within a figure's history.
#[derive(Debug, Clone)]
pub struct Revision {
    /// Assigned by the store on submission; `None` while in flight.
    pub id: Option<RevisionId>,
    pub figure: NodeRef,
    /// Monotonically increasing within the figure; never reused.
    pub sequence: u64,
    pub items: Vec<DataItem>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_on: DateTime<Utc>,
}

impl Revision {
    /// Image items matching a format and watermark flag.
    pub fn images(&self, format: ImageFormat, watermarked: bool) -> Vec<&DataItem> {
        filter_images(&self.items, format, watermarked)
    }
}

fn filter_images(items: &[DataItem], format: ImageFormat, watermarked: bool) -> Vec<&DataItem> {
    items
        .iter()
        .filter(|item| {
            matches!(
                item,
                DataItem::Image {
                    format: f,
                    is_watermarked,
                    ..
                } if *f == format && *is_watermarked == watermarked
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NodeId, NodeKind};

    fn figure_ref() -> NodeRef {
        NodeRef::new(NodeKind::Figure, NodeId::new("fig-1"), "Cell abc, Figure 1")
    }

    #[test]
    fn draft_seals_with_sequence() {
        let mut draft = RevisionDraft::new(figure_ref());
        draft.push_item(DataItem::text("note", "hello"));
        draft.set_metadata("kernel", serde_json::json!("rust"));

        let rev = draft.into_revision(3);
        assert_eq!(rev.sequence, 3);
        assert!(rev.id.is_none());
        assert_eq!(rev.items.len(), 1);
        assert_eq!(rev.metadata["kernel"], serde_json::json!("rust"));
    }

    #[test]
    fn images_filter_by_format_and_flag() {
        let mut draft = RevisionDraft::new(figure_ref());
        for watermarked in [false, true] {
            draft.push_item(DataItem::Image {
                name: "figure".to_string(),
                format: ImageFormat::Png,
                data: vec![watermarked as u8],
                is_watermarked: watermarked,
                width: Some(64),
                height: Some(48),
            });
        }
        let rev = draft.into_revision(1);
        assert_eq!(rev.images(ImageFormat::Png, true).len(), 1);
        assert_eq!(rev.images(ImageFormat::Svg, false).len(), 0);
    }
}
