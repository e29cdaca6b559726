//! Batch re-tiling of already downloaded chapters.
//!
//! The input tree is expected to look like
//!
//! ```text
//! <input root>/
//!   <series title>/
//!     <chapter>/
//!       001.jpg
//!       002.png
//! ```
//!
//! Every directory at depth ≥ 2 is a chapter: its first relative path segment
//! is the series title, its second the chapter identifier. Image files in a
//! chapter are tiled in natural order with one running page counter; nested
//! directories below a chapter continue that chapter's counter. No network
//! access happens here.

mod natural;

pub use natural::natural_cmp;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{RunError, TileError};
use crate::tile::{NamingContext, OutputLayout, SourceImage, Tiler, DEFAULT_TITLE_SEPARATOR};

/// File extensions picked up by the batch processor.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Whether `path` has one of [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// List image files directly inside `dir`, in natural order.
///
/// Each call re-reads the directory.
pub fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));
    Ok(images)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// =============================================================================
// Discovery
// =============================================================================

/// A chapter directory found in the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDir {
    pub series: String,
    pub chapter: String,
    pub path: PathBuf,
}

/// Directories found under an input root.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Chapter directories in walk order
    pub chapters: Vec<ChapterDir>,

    /// Shallow directories holding images (or unreadable) that will not be processed
    pub skipped: Vec<PathBuf>,
}

impl Discovery {
    /// Record a directory above chapter depth. Folders holding images, or
    /// whose contents cannot be read, are reported as skipped.
    fn skip_shallow(&mut self, path: &Path, listing: std::io::Result<Vec<PathBuf>>) {
        match listing {
            Ok(images) if images.is_empty() => {
                debug!("Skipping folder: {}", path.display());
            }
            Ok(_) => {
                warn!(
                    "Skipping folder: {} (not a valid series/chapter structure)",
                    path.display()
                );
                self.skipped.push(path.to_path_buf());
            }
            Err(e) => {
                warn!("Skipping folder: {} (cannot list contents: {})", path.display(), e);
                self.skipped.push(path.to_path_buf());
            }
        }
    }
}

/// Walk `root` and classify its directories.
///
/// Siblings are visited in natural order, so `chapter 2` comes before
/// `chapter 10`. Unreadable entries are logged and ignored.
pub fn discover_chapters(root: &Path) -> Discovery {
    let mut discovery = Discovery::default();

    let walker = WalkDir::new(root)
        .sort_by(|a, b| {
            natural_cmp(
                &a.file_name().to_string_lossy(),
                &b.file_name().to_string_lossy(),
            )
        })
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let mut segments = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned());

        match (segments.next(), segments.next()) {
            (Some(series), Some(chapter)) => discovery.chapters.push(ChapterDir {
                series,
                chapter,
                path: entry.path().to_path_buf(),
            }),
            _ => discovery.skip_shallow(entry.path(), list_images(entry.path())),
        }
    }

    discovery
}

// =============================================================================
// Report
// =============================================================================

/// A chapter that stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterFailure {
    pub series: String,
    pub chapter: String,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub chapters_processed: usize,
    pub chapters_failed: Vec<ChapterFailure>,
    pub images_tiled: usize,
    pub images_skipped: usize,
    pub tiles_written: usize,
    pub skipped_dirs: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.chapters_failed.is_empty() && self.images_skipped == 0
    }
}

// =============================================================================
// Batch Processor
// =============================================================================

/// Re-tiles a tree of downloaded chapters.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    tiler: Tiler,
    layout: OutputLayout,
    separator: String,
}

impl BatchProcessor {
    pub fn new(tiler: Tiler) -> Self {
        Self {
            tiler,
            layout: OutputLayout::default(),
            separator: DEFAULT_TITLE_SEPARATOR.to_string(),
        }
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.tiler = self.tiler.with_file_name(layout.file_name.clone());
        self.layout = layout;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn tiler(&self) -> &Tiler {
        &self.tiler
    }

    /// Tile every chapter found under `input_root` into `output_root`.
    ///
    /// Failures are isolated: an unreadable image is skipped, a write failure
    /// stops only its chapter. The only hard error is a missing input root.
    pub fn process_tree(
        &self,
        input_root: &Path,
        output_root: &Path,
    ) -> Result<BatchReport, RunError> {
        if !input_root.is_dir() {
            return Err(RunError::MissingInput(input_root.to_path_buf()));
        }

        let discovery = discover_chapters(input_root);
        let mut report = BatchReport {
            skipped_dirs: discovery.skipped,
            ..Default::default()
        };

        let mut counters: HashMap<(String, String), u32> = HashMap::new();
        let mut failed: HashSet<(String, String)> = HashSet::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for dir in discovery.chapters {
            let key = (dir.series.clone(), dir.chapter.clone());
            if failed.contains(&key) {
                debug!("Skipping {} (chapter already failed)", dir.path.display());
                continue;
            }

            let images = match list_images(&dir.path) {
                Ok(images) => images,
                Err(e) => {
                    warn!("Cannot list {}: {}", dir.path.display(), e);
                    report.chapters_failed.push(ChapterFailure {
                        series: dir.series.clone(),
                        chapter: dir.chapter.clone(),
                        error: e.to_string(),
                    });
                    failed.insert(key);
                    continue;
                }
            };
            if images.is_empty() {
                continue;
            }

            info!(
                "Processing: series '{}', chapter '{}' ({} image(s))",
                dir.series,
                dir.chapter,
                images.len()
            );

            let context =
                NamingContext::new(&dir.series, &dir.chapter).with_separator(&self.separator);
            let output_dir = self.layout.chapter_path(output_root, &context);
            let page = counters.entry(key.clone()).or_insert(1);

            match self.process_chapter(&images, &output_dir, &context, page, &mut report) {
                Ok(()) => {
                    if seen.insert(key) {
                        report.chapters_processed += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        "Chapter '{}' of '{}' stopped: {}",
                        dir.chapter, dir.series, e
                    );
                    report.chapters_failed.push(ChapterFailure {
                        series: dir.series,
                        chapter: dir.chapter,
                        error: e.to_string(),
                    });
                    if seen.remove(&key) {
                        report.chapters_processed -= 1;
                    }
                    failed.insert(key);
                }
            }
        }

        info!(
            "Processing complete: {} chapter(s), {} image(s), {} tile(s)",
            report.chapters_processed, report.images_tiled, report.tiles_written
        );

        Ok(report)
    }

    fn process_chapter(
        &self,
        images: &[PathBuf],
        output_dir: &Path,
        context: &NamingContext,
        page: &mut u32,
        report: &mut BatchReport,
    ) -> Result<(), TileError> {
        for path in images {
            debug!("Splitting: {}", path.display());

            let source = match SourceImage::open(path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.images_skipped += 1;
                    continue;
                }
            };

            match self.tiler.tile(&source, output_dir, context, *page) {
                Ok(outcome) => {
                    *page = outcome.next_index;
                    report.images_tiled += 1;
                    report.tiles_written += outcome.tiles.len();
                }
                Err(e) if e.is_per_image() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.images_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}
