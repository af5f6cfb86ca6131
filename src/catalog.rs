//! In-memory catalog of scanned files.
//!
//! The [`Catalog`] groups [`FileRecord`]s by [`Category`] in discovery order and keeps
//! the running [`Stats`] and the set of directories that contained cataloged files.
//! The [`OperationLog`] collects every error and warning produced along the way.

use crate::file_category::Category;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One observed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the file.
    #[serde(serialize_with = "serialize_lossy")]
    pub path: PathBuf,
    /// Base name of the file.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Local>,
    /// Creation time, or the modification time where the platform does not record one.
    pub created: DateTime<Local>,
    /// Lowercase extension including the leading dot, empty if none.
    pub extension: String,
    /// Directory containing the file.
    #[serde(serialize_with = "serialize_lossy")]
    pub parent_dir: PathBuf,
    /// Category the file was classified into.
    pub category: Category,
    /// Hex content hash, present only when hashing was requested and succeeded.
    pub hash: Option<String>,
}

impl FileRecord {
    /// Returns true if the path cannot be exported as-is because it is not valid UTF-8.
    pub fn has_lossy_path(&self) -> bool {
        self.path.to_str().is_none()
    }
}

/// Writes a path as a string, replacing invalid UTF-8 with U+FFFD.
fn serialize_lossy<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

/// Per-category counters plus the overall totals.
///
/// Serializes flat, e.g. `{"photos": 3, "total_files": 3, "total_size": 1024}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of files per category; categories without files are absent.
    #[serde(flatten)]
    pub by_category: BTreeMap<Category, u64>,
    /// Number of cataloged files.
    pub total_files: u64,
    /// Sum of all cataloged file sizes in bytes.
    pub total_size: u64,
}

impl Stats {
    /// Returns the file count for a category.
    pub fn count(&self, category: Category) -> u64 {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    fn add(&mut self, record: &FileRecord) {
        *self.by_category.entry(record.category).or_insert(0) += 1;
        self.total_files += 1;
        self.total_size += record.size;
    }
}

/// Files grouped by category, in discovery order within each category.
///
/// Every record lives in exactly one category's list. The catalog is filled by the
/// scanner and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    files: BTreeMap<Category, Vec<FileRecord>>,
    stats: Stats,
    folders: BTreeSet<PathBuf>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record under its category and updates the stats and folder set.
    pub fn insert(&mut self, record: FileRecord) {
        self.stats.add(&record);
        self.folders.insert(record.parent_dir.clone());
        self.files.entry(record.category).or_default().push(record);
    }

    /// Returns the records of one category (empty if none were found).
    pub fn files(&self, category: Category) -> &[FileRecord] {
        self.files.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over the non-empty categories in export order.
    pub fn categories(&self) -> impl Iterator<Item = (Category, &[FileRecord])> {
        self.files
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(category, records)| (*category, records.as_slice()))
    }

    /// Iterates over every record, category by category.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values().flatten()
    }

    /// Returns the raw category map, as written to the structured export.
    pub fn as_map(&self) -> &BTreeMap<Category, Vec<FileRecord>> {
        &self.files
    }

    /// Returns the running counters.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Returns every directory that contained at least one cataloged file, sorted.
    pub fn folders(&self) -> &BTreeSet<PathBuf> {
        &self.folders
    }

    /// Total size in bytes of one category's files.
    pub fn category_size(&self, category: Category) -> u64 {
        self.files(category).iter().map(|record| record.size).sum()
    }

    /// Returns true if no file was cataloged.
    pub fn is_empty(&self) -> bool {
        self.stats.total_files == 0
    }
}

/// Append-only list of error and warning messages gathered during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog {
    entries: Vec<String>,
}

impl OperationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and emits it as a warning event.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.entries.push(message);
    }

    /// All recorded messages, oldest first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The last `n` messages, oldest first.
    pub fn last(&self, n: usize) -> &[String] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
