//! JSON manifest chapter source.
//!
//! A manifest lists the chapters of one series and the image URLs of each
//! chapter, typically exported from a site's reader API:
//!
//! ```json
//! {
//!   "title": "Muse on Fame",
//!   "url": "https://example.com/title/181053-muse-on-fame",
//!   "chapters": [
//!     { "number": 1, "url": "https://example.com/ch_1/", "images": ["001.webp", "002.webp"] },
//!     { "number": 2, "label": "Chapter 2", "images": ["https://cdn.example.com/2/001.jpg"] }
//!   ]
//! }
//! ```
//!
//! Relative image URLs are resolved against the chapter URL, then the series URL.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SourceError;

use super::{sort_chapters, ChapterRef, ChapterSource};

/// One chapter entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterEntry {
    pub number: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,
}

/// A series manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default)]
    pub chapters: Vec<ChapterEntry>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        serde_json::from_str(json).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

/// Chapter source backed by a [`Manifest`].
#[derive(Debug, Clone)]
pub struct ManifestSource {
    manifest: Manifest,
}

impl ManifestSource {
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    /// Load a manifest file.
    pub async fn from_path(path: &Path) -> Result<Self, SourceError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(Manifest::from_json(&json)?))
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Whether `series` names this manifest's series (title or URL).
    fn matches(&self, series: &str) -> bool {
        series == self.manifest.title || self.manifest.url.as_deref() == Some(series)
    }

    fn find(&self, chapter: &ChapterRef) -> Option<&ChapterEntry> {
        self.manifest
            .chapters
            .iter()
            .find(|c| c.number == chapter.number && c.url == chapter.url && c.label == chapter.label)
    }

    fn resolve(&self, entry: &ChapterEntry, image: &str) -> Result<String, SourceError> {
        if let Ok(absolute) = Url::parse(image) {
            return Ok(absolute.to_string());
        }

        let base = entry
            .url
            .as_deref()
            .or(self.manifest.url.as_deref())
            .ok_or_else(|| SourceError::InvalidUrl {
                url: image.to_string(),
                message: "relative URL without chapter or series URL".to_string(),
            })?;

        Url::parse(base)
            .and_then(|base| base.join(image))
            .map(|u| u.to_string())
            .map_err(|e| SourceError::InvalidUrl {
                url: image.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ChapterSource for ManifestSource {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn series_title(&self, _series: &str) -> Result<String, SourceError> {
        Ok(self.manifest.title.clone())
    }

    async fn list_chapters(&self, series: &str) -> Result<Vec<ChapterRef>, SourceError> {
        if !self.matches(series) {
            return Err(SourceError::NotFound(format!(
                "series '{}' is not in this manifest",
                series
            )));
        }

        let mut chapters: Vec<ChapterRef> = self
            .manifest
            .chapters
            .iter()
            .map(|c| ChapterRef {
                number: c.number,
                label: c.label.clone(),
                url: c.url.clone(),
            })
            .collect();
        sort_chapters(&mut chapters);
        Ok(chapters)
    }

    async fn chapter_images(&self, chapter: &ChapterRef) -> Result<Vec<String>, SourceError> {
        let entry = self
            .find(chapter)
            .ok_or_else(|| SourceError::NotFound(format!("chapter {}", chapter.number)))?;

        entry
            .images
            .iter()
            .map(|image| self.resolve(entry, image))
            .collect()
    }
}
