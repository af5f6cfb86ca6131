//! Directory scanning.
//!
//! Walks one or more roots, prunes excluded subtrees, collects metadata for each file,
//! classifies it and appends it to a [`Catalog`]. Every per-file failure is recorded in
//! the [`OperationLog`] and the walk carries on.

use crate::catalog::{Catalog, FileRecord, OperationLog};
use crate::config::CompiledIgnoreRules;
use crate::exclusion::ExclusionSet;
use crate::file_category::{Category, classify, extension_of};
use crate::output::OutputFormatter;
use chrono::{DateTime, Local};
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

/// Read size used when hashing file contents.
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Options for a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Compute a content hash for each file.
    pub include_hash: bool,
    /// Deepest directory level to enter below each root; `Some(0)` reads only the root itself.
    pub max_depth: Option<usize>,
    /// Only catalog files belonging to this category.
    pub type_filter: Option<Category>,
}

/// Walks directory trees and fills a catalog.
pub struct Scanner<'a> {
    exclusions: &'a ExclusionSet,
    ignore: CompiledIgnoreRules,
    verbose: bool,
    progress_interval: u64,
    show_progress: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner that prunes everything in `exclusions`.
    pub fn new(exclusions: &'a ExclusionSet) -> Self {
        Self {
            exclusions,
            ignore: CompiledIgnoreRules::default(),
            verbose: false,
            progress_interval: 1000,
            show_progress: false,
        }
    }

    /// Also skips files matched by these name-based rules.
    pub fn with_ignore_rules(mut self, ignore: CompiledIgnoreRules) -> Self {
        self.ignore = ignore;
        self
    }

    /// Logs every cataloged file.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of files between progress log lines.
    pub fn progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Shows a terminal spinner while scanning.
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Scans every root in order, accumulating into one catalog.
    pub fn scan_all<P: AsRef<Path>>(
        &self,
        roots: &[P],
        options: &ScanOptions,
        catalog: &mut Catalog,
        log: &mut OperationLog,
    ) {
        for root in roots {
            let root = root.as_ref();
            OutputFormatter::header(&format!("Volume: {}", root.display()));
            self.scan(root, options, catalog, log);
        }
    }

    /// Scans one root.
    ///
    /// A missing root is recorded in `log` and nothing else happens.
    pub fn scan(
        &self,
        root: &Path,
        options: &ScanOptions,
        catalog: &mut Catalog,
        log: &mut OperationLog,
    ) {
        if !root.exists() {
            log.record(format!("Directory not found: {}", root.display()));
            return;
        }
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let root = root.as_path();

        info!("Scanning {}", root.display());
        if let Some(category) = options.type_filter {
            info!(
                "Only cataloging {} files ({} extensions)",
                category,
                category.extensions().len()
            );
        }

        let progress = if self.show_progress {
            OutputFormatter::create_spinner(&format!("Scanning {}", root.display()))
        } else {
            ProgressBar::hidden()
        };

        let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
        if let Some(depth) = options.max_depth {
            // Files directly in the root sit at walk depth 1.
            walker = walker.max_depth(depth + 1);
        }

        let exclusions = self.exclusions;
        let entries = walker.into_iter().filter_entry(|entry| {
            let excluded = exclusions.is_excluded(entry.path());
            if excluded {
                debug!("Excluded: {}", entry.path().display());
            }
            !excluded
        });

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    log.record(format!("Error scanning {}: {}", path, e));
                    continue;
                }
            };

            if !is_regular_file(&entry) {
                continue;
            }

            let path = entry.path();
            if self.ignore.is_ignored(path) {
                debug!("Ignored by rule: {}", path.display());
                continue;
            }

            if let Some(category) = options.type_filter
                && !category.accepts(&extension_of(path))
            {
                continue;
            }

            let Some(record) = self.build_record(path, options.include_hash, log) else {
                continue;
            };

            if self.verbose {
                debug!(
                    "Processing: {} ({} files)",
                    record.name,
                    catalog.stats().total_files + 1
                );
            }

            catalog.insert(record);
            progress.inc(1);

            let total = catalog.stats().total_files;
            if total % self.progress_interval == 0 {
                info!("Processed {} files", total);
            }
        }

        progress.finish_and_clear();
    }

    /// Collects metadata and the optional hash for one file.
    ///
    /// Returns `None` (after recording the error) when the metadata cannot be read.
    fn build_record(
        &self,
        path: &Path,
        include_hash: bool,
        log: &mut OperationLog,
    ) -> Option<FileRecord> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log.record(format!("Failed to access {}: {}", path.display(), e));
                return None;
            }
        };

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = metadata.created().unwrap_or(modified);
        let extension = extension_of(path);

        let hash = if include_hash {
            match hash_file(path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    log.record(format!("Failed to hash {}: {}", path.display(), e));
                    None
                }
            }
        } else {
            None
        };

        if path.to_str().is_none() {
            log.record(format!(
                "File name is not valid UTF-8, exported as {}",
                path.to_string_lossy()
            ));
        }

        Some(FileRecord {
            path: path.to_path_buf(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
            created: DateTime::<Local>::from(created),
            category: classify(&extension),
            extension,
            parent_dir: path.parent().map(PathBuf::from).unwrap_or_default(),
            hash,
        })
    }
}

/// Regular files, plus symlinks whose target is a regular file.
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// Computes the blake3 hash of a file's contents, streamed in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0_u8; HASH_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn scan(root: &Path, exclusions: &ExclusionSet, options: &ScanOptions) -> (Catalog, OperationLog) {
        let mut catalog = Catalog::new();
        let mut log = OperationLog::new();
        Scanner::new(exclusions).scan(root, options, &mut catalog, &mut log);
        (catalog, log)
    }

    #[test]
    fn test_scan_classifies_files() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.jpg"), "img");
        touch(&temp.path().join("b.flac"), "audio");
        touch(&temp.path().join("c.bin"), "data");

        let (catalog, log) = scan(temp.path(), &ExclusionSet::default(), &ScanOptions::default());

        assert!(log.is_empty());
        assert_eq!(catalog.files(Category::Photos).len(), 1);
        assert_eq!(catalog.files(Category::Music).len(), 1);
        assert_eq!(catalog.files(Category::Other).len(), 1);
        assert_eq!(catalog.stats().total_files, 3);
        assert_eq!(catalog.stats().total_size, 3 + 5 + 4);
    }

    #[test]
    fn test_record_metadata() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("sub").join("Cover.PNG");
        touch(&file, "12345");

        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &ScanOptions::default());
        let record = &catalog.files(Category::Photos)[0];

        assert_eq!(record.name, "Cover.PNG");
        assert_eq!(record.extension, ".png");
        assert_eq!(record.size, 5);
        assert_eq!(record.parent_dir, temp.path().join("sub"));
        assert_eq!(record.path, file);
        assert_eq!(record.category, Category::Photos);
        assert!(record.hash.is_none());
    }

    #[test]
    fn test_missing_root_is_recorded() {
        let temp = TempDir::new().unwrap();
        let (catalog, log) = scan(
            &temp.path().join("missing"),
            &ExclusionSet::default(),
            &ScanOptions::default(),
        );
        assert!(catalog.is_empty());
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].contains("not found"));
    }

    #[test]
    fn test_max_depth_zero_reads_only_root() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("top.txt"), "x");
        touch(&temp.path().join("sub/nested.txt"), "x");

        let options = ScanOptions {
            max_depth: Some(0),
            ..Default::default()
        };
        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &options);

        let names: Vec<_> = catalog.records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["top.txt"]);
    }

    #[test]
    fn test_max_depth_one_reads_one_level_down() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("top.txt"), "x");
        touch(&temp.path().join("a/one.txt"), "x");
        touch(&temp.path().join("a/b/two.txt"), "x");

        let options = ScanOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &options);
        assert_eq!(catalog.stats().total_files, 2);
    }

    #[test]
    fn test_type_filter_restricts_catalog() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.jpg"), "x");
        touch(&temp.path().join("b.mp3"), "x");
        touch(&temp.path().join("c.zip"), "x");

        let options = ScanOptions {
            type_filter: Some(Category::Music),
            ..Default::default()
        };
        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &options);
        assert_eq!(catalog.stats().total_files, 1);
        assert_eq!(catalog.files(Category::Music).len(), 1);

        let options = ScanOptions {
            type_filter: Some(Category::Other),
            ..Default::default()
        };
        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &options);
        assert_eq!(catalog.stats().total_files, 1);
        assert_eq!(catalog.files(Category::Other)[0].name, "c.zip");
    }

    #[test]
    fn test_excluded_subtree_is_pruned() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("keep/a.jpg"), "x");
        touch(&temp.path().join("skip/b.jpg"), "x");
        touch(&temp.path().join("skip/deep/c.jpg"), "x");

        let mut log = OperationLog::new();
        let exclusions = ExclusionSet::new([temp.path().join("skip")], &mut log);
        let (catalog, _) = scan(temp.path(), &exclusions, &ScanOptions::default());

        assert_eq!(catalog.stats().total_files, 1);
        assert!(
            catalog
                .records()
                .all(|r| !r.path.starts_with(temp.path().join("skip")))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_excluded_subtree_is_never_entered() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("keep/a.jpg"), "x");
        let locked = temp.path().join("skip/locked");
        touch(&locked.join("hidden.jpg"), "x");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let (_, unfiltered_log) =
            scan(temp.path(), &ExclusionSet::default(), &ScanOptions::default());
        let mut log = OperationLog::new();
        let exclusions = ExclusionSet::new([temp.path().join("skip")], &mut log);
        let (catalog, log) = scan(temp.path(), &exclusions, &ScanOptions::default());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(log.is_empty(), "unexpected entries: {:?}", log.entries());
        assert_eq!(catalog.stats().total_files, 1);
        // Root can read a 0o000 directory, so the unfiltered walk only fails for other users.
        if !unfiltered_log.is_empty() {
            assert!(unfiltered_log.entries()[0].starts_with("Error scanning"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_cataloged_and_logged() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("good.jpg"), "x");
        touch(&temp.path().join(OsStr::from_bytes(b"bad\xff.jpg")), "x");

        let (catalog, log) = scan(temp.path(), &ExclusionSet::default(), &ScanOptions::default());

        assert_eq!(catalog.files(Category::Photos).len(), 2);
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].starts_with("File name is not valid UTF-8"));
        assert!(log.entries()[0].contains("bad\u{fffd}.jpg"));
    }

    #[test]
    fn test_excluded_file() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.jpg"), "x");
        touch(&temp.path().join("b.jpg"), "x");

        let mut log = OperationLog::new();
        let exclusions = ExclusionSet::new([temp.path().join("b.jpg")], &mut log);
        let (catalog, _) = scan(temp.path(), &exclusions, &ScanOptions::default());

        let names: Vec<_> = catalog.records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg"]);
    }

    #[test]
    fn test_ignore_rules_skip_files() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.jpg"), "x");
        touch(&temp.path().join("Thumbs.db"), "x");

        let config = crate::config::CatalogConfig::from_toml(
            "[ignore]\nfilenames = [\"Thumbs.db\"]\n",
        )
        .unwrap();
        let exclusions = ExclusionSet::default();
        let scanner =
            Scanner::new(&exclusions).with_ignore_rules(config.compile_ignore_rules().unwrap());

        let mut catalog = Catalog::new();
        let mut log = OperationLog::new();
        scanner.scan(temp.path(), &ScanOptions::default(), &mut catalog, &mut log);
        assert_eq!(catalog.stats().total_files, 1);
    }

    #[test]
    fn test_include_hash() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.txt"), "same");
        touch(&temp.path().join("b.txt"), "same");
        touch(&temp.path().join("c.txt"), "different");

        let options = ScanOptions {
            include_hash: true,
            ..Default::default()
        };
        let (catalog, _) = scan(temp.path(), &ExclusionSet::default(), &options);
        let hashes: Vec<_> = catalog
            .files(Category::Documents)
            .iter()
            .map(|r| r.hash.clone().unwrap())
            .collect();

        assert_eq!(hashes.len(), 3);
        assert_eq!(hashes[0], hashes[1]);
        assert_ne!(hashes[0], hashes[2]);
        assert_eq!(hashes[0], blake3::hash(b"same").to_hex().to_string());
    }

    #[test]
    fn test_hash_large_file_spans_chunks() {
        let temp = TempDir::new().unwrap();
        let data = vec![7_u8; HASH_CHUNK_SIZE * 3 + 17];
        let path = temp.path().join("big.bin");
        fs::write(&path, &data).unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            blake3::hash(&data).to_hex().to_string()
        );
    }

    #[test]
    fn test_hash_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        assert!(hash_file(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_multiple_roots_accumulate() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        touch(&a.path().join("x.jpg"), "x");
        touch(&b.path().join("y.jpg"), "y");

        let exclusions = ExclusionSet::default();
        let mut catalog = Catalog::new();
        let mut log = OperationLog::new();
        Scanner::new(&exclusions).scan_all(
            &[a.path().to_path_buf(), b.path().join("missing"), b.path().to_path_buf()],
            &ScanOptions::default(),
            &mut catalog,
            &mut log,
        );

        let names: Vec<_> = catalog.records().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x.jpg", "y.jpg"]);
        assert_eq!(log.len(), 1);
    }
}
