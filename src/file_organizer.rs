//! Relocation of cataloged files into category directories.
//!
//! The organizer walks a [`Catalog`] and copies or moves every record into
//! `destination_root/<category>/`, or into a single flatten directory. A dry run only
//! reports what would happen. Per-file failures are recorded in the [`OperationLog`]
//! and counted; only an unknown category filter aborts the call.

use crate::catalog::{Catalog, FileRecord, OperationLog};
use crate::file_category::Category;
use crate::output::OutputFormatter;
use filetime::FileTime;
use indicatif::ProgressBar;
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How a file is relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Copy,
    Move,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "COPY"),
            Self::Move => write!(f, "MOVE"),
        }
    }
}

/// A single relocation, performed or planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Where the file was cataloged.
    pub source: PathBuf,
    /// Where the file ends up.
    pub destination: PathBuf,
    pub category: Category,
    pub action: Action,
}

/// Counters for one organize call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl OperationStats {
    /// Number of files the call dealt with, whatever the outcome.
    pub fn total(&self) -> u64 {
        self.successful + self.failed + self.skipped
    }
}

/// Outcome of one organize call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeReport {
    pub stats: OperationStats,
    /// Operations in processing order: performed in real mode, planned in a dry run.
    pub operations: Vec<Operation>,
}

/// Settings for one organize call.
#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    /// Root under which one directory per category is created.
    pub destination_root: PathBuf,
    /// Copy when true, move otherwise.
    pub copy: bool,
    /// Report planned operations without touching the file system.
    pub dry_run: bool,
    /// Only this category is processed; parsed case-insensitively.
    pub type_filter: Option<String>,
    /// Every file lands directly in this directory, regardless of category.
    pub flatten_to: Option<PathBuf>,
    pub verbose: bool,
    /// Operations printed per category when not verbose.
    pub preview_limit: usize,
    pub show_progress: bool,
}

impl OrganizeOptions {
    /// Dry-run copy into `destination_root`, the safe defaults.
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
            copy: true,
            dry_run: true,
            type_filter: None,
            flatten_to: None,
            verbose: false,
            preview_limit: 5,
            show_progress: true,
        }
    }

    fn action(&self) -> Action {
        if self.copy { Action::Copy } else { Action::Move }
    }

    fn target_dir(&self, category: Category) -> PathBuf {
        match &self.flatten_to {
            Some(dir) => dir.clone(),
            None => self.destination_root.join(category.dir_name()),
        }
    }
}

/// Errors that abort an organize call.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The category filter does not name a known category.
    #[error("Unknown file type '{0}'. Valid types: photos, ebooks, documents, movies, music, other")]
    UnknownCategory(String),
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Per-file and per-directory failures; recorded in the log, never returned by `organize`.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// The destination directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The source changed since the scan.
    #[error("Source file not found: {}", .path.display())]
    SourceMissing { path: PathBuf },
    /// The source directory is not writable, so the file cannot be moved out of it.
    #[error("No write permission on source directory: {}", .dir.display())]
    SourceNotWritable { dir: PathBuf },
    /// The destination directory is not writable.
    #[error("No write permission on destination directory: {}", .dir.display())]
    DestinationNotWritable { dir: PathBuf },
    /// The OS refused the operation.
    #[error("Permission denied relocating {} to {}: {source}", .from.display(), .to.display())]
    PermissionDenied {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// No space left on the destination device.
    #[error("Destination full while writing {}: {source}", .to.display())]
    DestinationFull {
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The destination name exceeds what the file system accepts.
    #[error("Destination name too long: {}: {source}", .to.display())]
    NameTooLong {
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Any other OS-level failure.
    #[error("System error relocating {} to {}: {source}", .from.display(), .to.display())]
    Os {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unexpected error processing {}: {reason}", .path.display())]
    Unexpected { path: PathBuf, reason: String },
}

impl RelocateError {
    fn from_io(from: &Path, to: &Path, source: io::Error) -> Self {
        let from = from.to_path_buf();
        let to = to.to_path_buf();
        match source.kind() {
            ErrorKind::NotFound if !from.exists() => Self::SourceMissing { path: from },
            ErrorKind::PermissionDenied => Self::PermissionDenied { from, to, source },
            ErrorKind::StorageFull => Self::DestinationFull { to, source },
            ErrorKind::InvalidFilename => Self::NameTooLong { to, source },
            _ => Self::Os { from, to, source },
        }
    }
}

/// Copies or moves cataloged files into category directories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Organizes every record of `catalog` according to `options`.
    ///
    /// Stats start from zero on every call. In a dry run nothing is created, moved or
    /// copied; each planned operation counts as successful. Failures are recorded in
    /// `log` and counted, and processing continues with the next file.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::UnknownCategory`] before doing anything if
    /// `options.type_filter` is not a category name.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filecat::catalog::{Catalog, OperationLog};
    /// use filecat::file_organizer::{FileOrganizer, OrganizeOptions};
    ///
    /// let catalog = Catalog::new();
    /// let mut log = OperationLog::new();
    /// let report = FileOrganizer::organize(&catalog, &OrganizeOptions::new("sorted"), &mut log)
    ///     .expect("valid options");
    /// println!("{} planned", report.stats.successful);
    /// ```
    pub fn organize(
        catalog: &Catalog,
        options: &OrganizeOptions,
        log: &mut OperationLog,
    ) -> OrganizeResult<OrganizeReport> {
        let filter = match options.type_filter.as_deref() {
            Some(name) => Some(
                name.parse::<Category>()
                    .map_err(|e| OrganizeError::UnknownCategory(e.0))?,
            ),
            None => None,
        };

        if options.dry_run {
            OutputFormatter::dry_run_notice("No files will be moved or copied");
        }
        match &options.flatten_to {
            Some(dir) => OutputFormatter::info(&format!("Moving files to: {}", dir.display())),
            None => OutputFormatter::info(&format!(
                "Organizing files into: {}",
                options.destination_root.display()
            )),
        }
        if let Some(category) = filter {
            OutputFormatter::info(&format!("Only processing: {}", category));
        }

        let selected: Vec<(Category, &[FileRecord])> = catalog
            .categories()
            .filter(|(category, _)| filter.is_none_or(|f| f == *category))
            .collect();
        let total: usize = selected.iter().map(|(_, records)| records.len()).sum();
        info!("Organizing {} files", total);

        let pb = if options.show_progress {
            OutputFormatter::create_progress_bar(total as u64)
        } else {
            ProgressBar::hidden()
        };

        let mut report = OrganizeReport::default();
        for (category, records) in selected {
            Self::organize_category(category, records, options, &pb, &mut report, log);
        }
        pb.finish_and_clear();

        Self::print_summary(&report.stats, log, options.verbose);
        Ok(report)
    }

    fn organize_category(
        category: Category,
        records: &[FileRecord],
        options: &OrganizeOptions,
        pb: &ProgressBar,
        report: &mut OrganizeReport,
        log: &mut OperationLog,
    ) {
        let target_dir = options.target_dir(category);

        if !options.dry_run {
            if let Err(source) = fs::create_dir_all(&target_dir) {
                log.record(
                    RelocateError::DirectoryCreationFailed {
                        path: target_dir,
                        source,
                    }
                    .to_string(),
                );
                report.stats.skipped += records.len() as u64;
                pb.inc(records.len() as u64);
                return;
            }
            debug!("Directory ready: {}", target_dir.display());
        }

        pb.suspend(|| {
            OutputFormatter::plain(&format!("\n{}: {} files", category.label(), records.len()))
        });

        for (i, record) in records.iter().enumerate() {
            let show = options.verbose || i < options.preview_limit;
            match Self::relocate(&record.path, &target_dir, category, options) {
                Ok(operation) => {
                    if show {
                        pb.suspend(|| Self::print_operation(&operation, options.dry_run));
                    }
                    report.stats.successful += 1;
                    report.operations.push(operation);
                }
                Err(e) => {
                    if show {
                        pb.suspend(|| OutputFormatter::error(&format!("  {}", e)));
                    }
                    log.record(e.to_string());
                    report.stats.failed += 1;
                }
            }
            pb.inc(1);
        }

        if !options.verbose && records.len() > options.preview_limit {
            let remaining = records.len() - options.preview_limit;
            pb.suspend(|| {
                OutputFormatter::plain(&format!(
                    "  ... and {} more (processed silently)",
                    remaining
                ))
            });
        }
    }

    /// Relocates one file into `target_dir`, or plans it in a dry run.
    ///
    /// In real mode an existing destination name gets a `_1`, `_2`, ... suffix before
    /// the extension. Permissions on the destination directory (and on the source
    /// directory for a move) are checked before anything is touched.
    pub fn relocate(
        source: &Path,
        target_dir: &Path,
        category: Category,
        options: &OrganizeOptions,
    ) -> Result<Operation, RelocateError> {
        if !source.exists() {
            return Err(RelocateError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| RelocateError::Unexpected {
                path: source.to_path_buf(),
                reason: "path has no file name".to_string(),
            })?;

        let action = options.action();
        let destination = if options.dry_run {
            target_dir.join(file_name)
        } else {
            unique_destination(target_dir, source)?
        };

        let operation = Operation {
            source: source.to_path_buf(),
            destination,
            category,
            action,
        };
        if options.dry_run {
            return Ok(operation);
        }

        if action == Action::Move
            && let Some(parent) = source.parent()
            && is_read_only(parent)
        {
            return Err(RelocateError::SourceNotWritable {
                dir: parent.to_path_buf(),
            });
        }
        if is_read_only(target_dir) {
            return Err(RelocateError::DestinationNotWritable {
                dir: target_dir.to_path_buf(),
            });
        }

        let result = match action {
            Action::Copy => copy_with_metadata(source, &operation.destination),
            Action::Move => move_file(source, &operation.destination),
        };
        result.map_err(|e| RelocateError::from_io(source, &operation.destination, e))?;

        debug!(
            "{} {} -> {}",
            action,
            operation.source.display(),
            operation.destination.display()
        );
        Ok(operation)
    }

    fn print_operation(operation: &Operation, dry_run: bool) {
        let line = format!(
            "  {}: {} -> {}",
            operation.action,
            operation.source.display(),
            operation.destination.display()
        );
        if dry_run {
            OutputFormatter::plain(&line);
        } else {
            OutputFormatter::success(line.trim_start());
        }
    }

    /// Prints the successful/failed/skipped counters, and the latest log entries when verbose.
    pub fn print_summary(stats: &OperationStats, log: &OperationLog, verbose: bool) {
        OutputFormatter::header("OPERATION SUMMARY");
        OutputFormatter::success(&format!("Successful: {}", stats.successful));
        if stats.failed > 0 {
            OutputFormatter::error(&format!("Failed: {}", stats.failed));
        } else {
            OutputFormatter::plain("Failed: 0");
        }
        if stats.skipped > 0 {
            OutputFormatter::warning(&format!("Skipped: {}", stats.skipped));
        } else {
            OutputFormatter::plain("Skipped: 0");
        }

        if verbose && !log.is_empty() {
            OutputFormatter::plain("\nMost recent errors:");
            for entry in log.last(5) {
                OutputFormatter::plain(&format!("  - {}", entry));
            }
        }
    }
}

/// First free name in `dir` for `source`'s file name: `a.txt`, then `a_1.txt`, `a_2.txt`, ...
fn unique_destination(dir: &Path, source: &Path) -> Result<PathBuf, RelocateError> {
    let unexpected = |reason: &str| RelocateError::Unexpected {
        path: source.to_path_buf(),
        reason: reason.to_string(),
    };
    let file_name = source
        .file_name()
        .ok_or_else(|| unexpected("path has no file name"))?;

    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let stem = source
        .file_stem()
        .ok_or_else(|| unexpected("path has no file stem"))?
        .to_string_lossy();
    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1..u32::MAX)
        .map(|n| dir.join(format!("{}_{}{}", stem, n, extension)))
        .find(|path| !path.exists())
        .ok_or_else(|| unexpected("could not generate a unique name"))
}

/// True when the process may not create entries in `dir`.
#[cfg(unix)]
fn is_read_only(dir: &Path) -> bool {
    dir.exists() && rustix::fs::access(dir, rustix::fs::Access::WRITE_OK).is_err()
}

#[cfg(not(unix))]
fn is_read_only(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|meta| meta.permissions().readonly())
        .unwrap_or(false)
}

/// Copies contents and permissions, then carries over access and modification times.
/// A partially written destination is removed on failure.
fn copy_with_metadata(source: &Path, destination: &Path) -> io::Result<()> {
    let copied = fs::copy(source, destination).and_then(|_| {
        let meta = fs::metadata(source)?;
        filetime::set_file_times(
            destination,
            FileTime::from_last_access_time(&meta),
            FileTime::from_last_modification_time(&meta),
        )
    });
    if copied.is_err() && destination.exists() {
        let _ = fs::remove_file(destination);
    }
    copied
}

/// Renames, falling back to [`move_across_devices`] when source and destination live on
/// different file systems.
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!("Cross-device move of {}", source.display());
            move_across_devices(source, destination)
        }
        result => result,
    }
}

/// Copies `source` to `destination` and removes the source, keeping its timestamps.
///
/// Never overwrites. Once the full contents have reached the destination the move
/// counts as done, even if the source cannot be removed afterwards.
fn move_across_devices(source: &Path, destination: &Path) -> io::Result<()> {
    let meta = fs::metadata(source)?;
    if destination.exists() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }
    let mut options = fs_extra::file::CopyOptions::new();
    options.overwrite = false;

    if let Err(e) = fs_extra::file::move_file(source, destination, &options) {
        let copied = source.exists()
            && fs::metadata(destination).is_ok_and(|dest| dest.len() == meta.len());
        if !copied {
            if destination.exists() {
                let _ = fs::remove_file(destination);
            }
            return Err(io_error_from_fs_extra(e));
        }
        warn!(
            "Copied {} but could not remove the source: {}",
            source.display(),
            e
        );
    }

    if let Err(e) = filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    ) {
        warn!("Failed to keep timestamps of {}: {}", destination.display(), e);
    }
    Ok(())
}

fn io_error_from_fs_extra(error: fs_extra::error::Error) -> io::Error {
    use fs_extra::error::ErrorKind as Kind;

    let message = error.to_string();
    match error.kind {
        Kind::Io(e) => e,
        Kind::NotFound => io::Error::new(ErrorKind::NotFound, message),
        Kind::PermissionDenied => io::Error::new(ErrorKind::PermissionDenied, message),
        Kind::AlreadyExists => io::Error::new(ErrorKind::AlreadyExists, message),
        _ => io::Error::other(message),
    }
}
