//! Size specs and the accumulating picture map.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Label for one derived size variant. `Zoom` is the untouched original and is
/// never requested from the transform provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SizeLabel {
    Big,
    Normal,
    Small,
    Zoom,
}

impl SizeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeLabel::Big => "big",
            SizeLabel::Normal => "normal",
            SizeLabel::Small => "small",
            SizeLabel::Zoom => "zoom",
        }
    }
}

impl std::fmt::Display for SizeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configured output variant request. The ordered spec list is fixed from
/// configuration before the pipeline starts and never changes mid-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSpec {
    pub label: SizeLabel,
    /// Max pixel dimension; `None` only for the implicit zoom.
    pub max_dimension: Option<u32>,
    /// Request the next-gen encoding (AVIF) instead of WebP.
    pub next_gen: bool,
}

impl SizeSpec {
    /// Build the ordered spec list from configured pixel sizes (largest first):
    /// the first size is "big", the second "normal", any further "small", and
    /// each size is requested both as WebP and as its next-gen variant.
    pub fn list_from_sizes(sizes: &[u32]) -> Vec<SizeSpec> {
        let mut specs = Vec::with_capacity(sizes.len() * 2);
        for (i, &size) in sizes.iter().enumerate() {
            let label = match i {
                0 => SizeLabel::Big,
                1 => SizeLabel::Normal,
                _ => SizeLabel::Small,
            };
            specs.push(SizeSpec {
                label,
                max_dimension: Some(size),
                next_gen: false,
            });
            specs.push(SizeSpec {
                label,
                max_dimension: Some(size),
                next_gen: true,
            });
        }
        specs
    }

    /// Content type of this spec's encoded output.
    pub fn content_type(&self) -> &'static str {
        if self.next_gen {
            "image/avif"
        } else {
            "image/webp"
        }
    }
}

/// One entry of the picture map: a public URL plus the variant's pixel size.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PictureEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    /// Byte size of the stored payload, used only for the same-label tie-break.
    #[serde(skip)]
    pub byte_len: u64,
}

impl PictureEntry {
    pub fn new(url: impl Into<String>, size: Option<u32>, byte_len: u64) -> Self {
        Self {
            url: url.into(),
            size,
            byte_len,
        }
    }
}

/// The accumulating per-request result set, serialized into the final response.
/// Entries are only ever added; a later entry for an existing label wins only
/// when its stored payload is strictly larger (naive quality proxy).
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct PictureMap(BTreeMap<String, PictureEntry>);

impl PictureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the zoom entry for the stored original.
    pub fn insert_zoom(&mut self, url: impl Into<String>, byte_len: u64) {
        self.0.insert(
            SizeLabel::Zoom.as_str().to_string(),
            PictureEntry::new(url, None, byte_len),
        );
    }

    /// Insert a variant entry, applying the larger-byte-size tie-break.
    /// Returns `true` when the entry was accepted.
    pub fn insert(&mut self, label: SizeLabel, entry: PictureEntry) -> bool {
        match self.0.get(label.as_str()) {
            Some(existing) if existing.byte_len >= entry.byte_len => false,
            _ => {
                self.0.insert(label.as_str().to_string(), entry);
                true
            }
        }
    }

    pub fn get(&self, label: SizeLabel) -> Option<&PictureEntry> {
        self.0.get(label.as_str())
    }

    pub fn contains(&self, label: SizeLabel) -> bool {
        self.0.contains_key(label.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The source asset for one upload request. Created once, immutable, referenced
/// by every subsequent transform call.
#[derive(Debug, Clone)]
pub struct UploadedOriginal {
    pub data: Bytes,
    pub content_type: String,
    /// Generated object key, without the tenant prefix (e.g. `@v4/...`).
    pub key: String,
    pub store_id: u64,
    /// Primary bucket the original and its variants are written to.
    pub bucket: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_list_doubles_sizes_with_next_gen() {
        let specs = SizeSpec::list_from_sizes(&[700, 350]);
        assert_eq!(specs.len(), 4);
        assert_eq!(specs[0].label, SizeLabel::Big);
        assert!(!specs[0].next_gen);
        assert_eq!(specs[1].label, SizeLabel::Big);
        assert!(specs[1].next_gen);
        assert_eq!(specs[2].label, SizeLabel::Normal);
        assert_eq!(specs[2].max_dimension, Some(350));
        assert_eq!(specs[0].content_type(), "image/webp");
        assert_eq!(specs[1].content_type(), "image/avif");
    }

    #[test]
    fn third_and_later_sizes_are_small() {
        let specs = SizeSpec::list_from_sizes(&[700, 350, 160]);
        assert_eq!(specs[4].label, SizeLabel::Small);
        assert_eq!(specs[5].label, SizeLabel::Small);
    }

    #[test]
    fn picture_map_first_write_wins_unless_larger() {
        let mut picture = PictureMap::new();
        assert!(picture.insert(
            SizeLabel::Big,
            PictureEntry::new("https://cdn/a.webp", Some(700), 1000)
        ));
        // same size loses
        assert!(!picture.insert(
            SizeLabel::Big,
            PictureEntry::new("https://cdn/b.webp", Some(700), 1000)
        ));
        // smaller loses
        assert!(!picture.insert(
            SizeLabel::Big,
            PictureEntry::new("https://cdn/c.webp", Some(700), 400)
        ));
        // strictly larger replaces
        assert!(picture.insert(
            SizeLabel::Big,
            PictureEntry::new("https://cdn/d.webp", Some(700), 2000)
        ));
        assert_eq!(picture.get(SizeLabel::Big).unwrap().url, "https://cdn/d.webp");
        assert_eq!(picture.len(), 1);
    }

    #[test]
    fn zoom_entry_serializes_without_size() {
        let mut picture = PictureMap::new();
        picture.insert_zoom("https://cdn/123/@v4/a.png", 1234);
        let json = serde_json::to_value(&picture).unwrap();
        assert_eq!(json["zoom"]["url"], "https://cdn/123/@v4/a.png");
        assert!(json["zoom"].get("size").is_none());
        assert!(json["zoom"].get("byte_len").is_none());
    }
}
