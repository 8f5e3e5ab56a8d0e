//! # Entry Filtering (`common::archive::filter`)
//!
//! File: cli/src/common/archive/filter.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Decides which walked entries go into an archive. `FilterMode::All` keeps
//! everything (optionally narrowed to an allow-list of extensions); `Photos`
//! and `Videos` keep only files whose extension belongs to that media family.
//!
//! Directories always pass, so the archive keeps the shape of the tree even when
//! a filter drops every file inside a directory.
//!
use super::entry::{Entry, EntryKind};
use serde::Deserialize;
use std::{collections::BTreeMap, fmt};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic", "heif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "avi", "mkv", "mov", "flv"];

/// Which files to include when creating an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Every file (optionally restricted by `file_types`).
    #[default]
    All,
    /// Image files only.
    Photos,
    /// Video files only.
    Videos,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::All => f.write_str("all"),
            FilterMode::Photos => f.write_str("photos"),
            FilterMode::Videos => f.write_str("videos"),
        }
    }
}

/// Media family of a file, decided by its extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFamily {
    Photo,
    Video,
    Other,
}

impl MediaFamily {
    /// `ext` is expected lowercase, without the leading dot.
    pub fn of_extension(ext: Option<&str>) -> Self {
        match ext {
            Some(e) if PHOTO_EXTENSIONS.contains(&e) => MediaFamily::Photo,
            Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaFamily::Video,
            _ => MediaFamily::Other,
        }
    }

    pub fn of(entry: &Entry) -> Self {
        Self::of_extension(entry.extension().as_deref())
    }
}

/// Archived files per extension, grouped by media family.
///
/// Files without an extension are counted under the empty key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCounts {
    pub photos: BTreeMap<String, u64>,
    pub videos: BTreeMap<String, u64>,
    pub others: BTreeMap<String, u64>,
}

impl TypeCounts {
    /// Counts `entry` if it is a regular file; other kinds are ignored.
    pub fn record(&mut self, entry: &Entry) {
        if entry.kind != EntryKind::File {
            return;
        }
        let ext = entry.extension();
        let bucket = match MediaFamily::of_extension(ext.as_deref()) {
            MediaFamily::Photo => &mut self.photos,
            MediaFamily::Video => &mut self.videos,
            MediaFamily::Other => &mut self.others,
        };
        *bucket.entry(ext.unwrap_or_default()).or_default() += 1;
    }

    pub fn total(family: &BTreeMap<String, u64>) -> u64 {
        family.values().sum()
    }
}

/// A filter mode plus its extension allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    mode: FilterMode,
    file_types: Vec<String>,
}

impl EntryFilter {
    pub fn new(mode: FilterMode, file_types: Vec<String>) -> Self {
        let file_types = file_types
            .into_iter()
            .map(|t| t.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self { mode, file_types }
    }

    /// A filter that accepts everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn accepts(&self, entry: &Entry) -> bool {
        if entry.kind == EntryKind::Directory {
            return true;
        }
        let ext = entry.extension();
        let ext = ext.as_deref();
        match self.mode {
            FilterMode::All => {
                self.file_types.is_empty()
                    || ext.is_some_and(|e| self.file_types.iter().any(|t| t == e))
            }
            FilterMode::Photos => MediaFamily::of_extension(ext) == MediaFamily::Photo,
            FilterMode::Videos => MediaFamily::of_extension(ext) == MediaFamily::Video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> Entry {
        Entry::file(path, 1, 0o644, 0)
    }

    #[test]
    fn test_all_accepts_everything() {
        let filter = EntryFilter::all();
        assert!(filter.accepts(&file("src/main.rs")));
        assert!(filter.accepts(&file("README")));
        assert!(filter.accepts(&Entry::symlink("latest", "v2", 0)));
    }

    #[test]
    fn test_all_with_file_types() {
        let filter = EntryFilter::new(FilterMode::All, vec![".JPG".into(), "png".into()]);
        assert!(filter.accepts(&file("a/b.jpg")));
        assert!(filter.accepts(&file("a/c.PNG")));
        assert!(!filter.accepts(&file("a/d.gif")));
        assert!(!filter.accepts(&file("a/noext")));
        assert!(filter.accepts(&Entry::directory("a", 0o755, 0)));
    }

    #[test]
    fn test_photos_and_videos() {
        let photos = EntryFilter::new(FilterMode::Photos, Vec::new());
        assert!(photos.accepts(&file("trip/IMG_001.HEIC")));
        assert!(!photos.accepts(&file("trip/clip.mp4")));

        let videos = EntryFilter::new(FilterMode::Videos, Vec::new());
        assert!(videos.accepts(&file("trip/clip.mov")));
        assert!(!videos.accepts(&file("trip/IMG_001.jpg")));
        assert!(videos.accepts(&Entry::directory("trip", 0o755, 0)));
    }

    #[test]
    fn test_file_types_ignored_outside_all_mode() {
        let filter = EntryFilter::new(FilterMode::Photos, vec!["txt".into()]);
        assert!(!filter.accepts(&file("notes.txt")));
        assert!(filter.accepts(&file("cat.png")));
    }

    #[test]
    fn test_media_family() {
        assert_eq!(MediaFamily::of(&file("a/B.JPEG")), MediaFamily::Photo);
        assert_eq!(MediaFamily::of(&file("a/clip.mkv")), MediaFamily::Video);
        assert_eq!(MediaFamily::of(&file("a/notes.txt")), MediaFamily::Other);
        assert_eq!(MediaFamily::of(&file("a/Makefile")), MediaFamily::Other);
    }

    #[test]
    fn test_type_counts_group_by_extension() {
        let mut counts = TypeCounts::default();
        counts.record(&file("trip/one.jpg"));
        counts.record(&file("trip/two.JPG"));
        counts.record(&file("trip/three.png"));
        counts.record(&file("trip/clip.mov"));
        counts.record(&file("trip/README"));
        counts.record(&file("trip/notes.txt"));
        counts.record(&Entry::directory("trip", 0o755, 0));
        counts.record(&Entry::symlink("trip/latest.jpg", "one.jpg", 0));

        assert_eq!(counts.photos.get("jpg"), Some(&2));
        assert_eq!(counts.photos.get("png"), Some(&1));
        assert_eq!(TypeCounts::total(&counts.photos), 3);
        assert_eq!(counts.videos.get("mov"), Some(&1));
        assert_eq!(counts.others.get(""), Some(&1));
        assert_eq!(counts.others.get("txt"), Some(&1));
        assert_eq!(TypeCounts::total(&counts.others), 2);
    }

    #[test]
    fn test_deserialize_filter_mode() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: FilterMode,
        }
        let parsed: Wrapper = toml::from_str("mode = \"videos\"").unwrap();
        assert_eq!(parsed.mode, FilterMode::Videos);
    }
}
