//! Archive extraction ahead of cataloging.
//!
//! Walks a directory tree and runs an external unarchiver on every `.zip` archive, in
//! place. A `.rar` archive is only extracted when its directory holds no `.zip` at that
//! moment, so ZIPs always go first. Archive names are matched literally: only lowercase
//! `.zip` and `.rar` count, so `PHOTOS.ZIP` is left alone.

use crate::catalog::OperationLog;
use crate::config::ExtractorSettings;
use crate::output::OutputFormatter;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extraction root not found: {}", .path.display())]
    RootNotFound { path: PathBuf },
    #[error("Failed to start {program} for {}: {source}", .archive.display())]
    SpawnFailed {
        program: String,
        archive: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{program} failed on {} ({status})", .archive.display())]
    ArchiveFailed {
        program: String,
        archive: PathBuf,
        status: ExitStatus,
    },
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Archives handled by one run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: Vec<PathBuf>,
    /// RAR archives left alone because a ZIP shared their directory.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    Rar,
}

impl ArchiveKind {
    fn of(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "zip" => Some(Self::Zip),
            "rar" => Some(Self::Rar),
            _ => None,
        }
    }
}

/// Runs `<program> <args...> <archive> <directory>` for each archive found.
#[derive(Debug, Clone)]
pub struct Extractor {
    program: String,
    args: Vec<String>,
}

impl Extractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &ExtractorSettings) -> Self {
        Self::new(settings.program.clone(), settings.args.clone())
    }

    /// Extracts every archive under `root`.
    ///
    /// Directories are visited in name order; directories produced by the extraction
    /// itself are not revisited. Failures of single archives are recorded in `log` and
    /// listed in the report.
    pub fn run(&self, root: &Path, log: &mut OperationLog) -> ExtractResult<ExtractReport> {
        if !root.is_dir() {
            return Err(ExtractError::RootNotFound {
                path: root.to_path_buf(),
            });
        }

        let directories: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => entry.file_type().is_dir().then(|| entry.into_path()),
                Err(e) => {
                    log.record(format!("Failed to walk {}: {}", root.display(), e));
                    None
                }
            })
            .collect();

        let mut report = ExtractReport::default();
        for dir in &directories {
            self.extract_directory(dir, &mut report, log);
        }

        info!(
            "Extraction finished: {} extracted, {} skipped, {} failed",
            report.extracted.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn extract_directory(&self, dir: &Path, report: &mut ExtractReport, log: &mut OperationLog) {
        let mut archives: Vec<(PathBuf, ArchiveKind)> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
                .filter_map(|entry| {
                    let path = entry.path();
                    ArchiveKind::of(&path).map(|kind| (path, kind))
                })
                .collect(),
            Err(e) => {
                log.record(format!("Failed to read {}: {}", dir.display(), e));
                return;
            }
        };
        archives.sort_by(|a, b| a.0.cmp(&b.0));

        for (archive, kind) in archives {
            if kind == ArchiveKind::Rar && contains_zip(dir) {
                debug!("Skipping {}: ZIP archives present", archive.display());
                report.skipped.push(archive);
                continue;
            }

            OutputFormatter::info(&format!("Extracting: {}", archive.display()));
            match self.extract(&archive, dir) {
                Ok(()) => report.extracted.push(archive),
                Err(e) => {
                    OutputFormatter::error(&e.to_string());
                    log.record(e.to_string());
                    report.failed.push(archive);
                }
            }
        }
    }

    fn extract(&self, archive: &Path, dir: &Path) -> ExtractResult<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(archive)
            .arg(dir)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ExtractError::SpawnFailed {
                program: self.program.clone(),
                archive: archive.to_path_buf(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ExtractError::ArchiveFailed {
                program: self.program.clone(),
                archive: archive.to_path_buf(),
                status,
            })
        }
    }
}

fn contains_zip(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| ArchiveKind::of(&entry.path()) == Some(ArchiveKind::Zip))
        })
        .unwrap_or(false)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "archive").unwrap();
    }

    #[test]
    fn test_zip_before_rar_in_same_directory() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.zip"));
        touch(&temp.path().join("b.rar"));

        let mut log = OperationLog::new();
        let report = Extractor::new("true", vec![])
            .run(temp.path(), &mut log)
            .unwrap();

        assert_eq!(report.extracted, vec![temp.path().join("a.zip")]);
        assert_eq!(report.skipped, vec![temp.path().join("b.rar")]);
        assert!(report.failed.is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_rar_alone_is_extracted_recursively() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("nested/deeper/c.rar"));
        touch(&temp.path().join("nested/readme.txt"));

        let report = Extractor::new("true", vec![])
            .run(temp.path(), &mut OperationLog::new())
            .unwrap();

        assert_eq!(
            report.extracted,
            vec![temp.path().join("nested/deeper/c.rar")]
        );
    }

    #[test]
    fn test_command_receives_archive_and_directory() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sub/pack.zip");
        touch(&archive);

        let args = vec![
            "-c".to_string(),
            "touch \"$2/extracted_from_$(basename \"$1\")\"".to_string(),
            "sh".to_string(),
        ];
        Extractor::new("sh", args)
            .run(temp.path(), &mut OperationLog::new())
            .unwrap();

        assert!(temp.path().join("sub/extracted_from_pack.zip").exists());
    }

    #[test]
    fn test_failures_are_logged() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("bad.zip"));

        let mut log = OperationLog::new();
        let report = Extractor::new("false", vec![])
            .run(temp.path(), &mut log)
            .unwrap();

        assert_eq!(report.failed, vec![temp.path().join("bad.zip")]);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_missing_program_is_a_failure() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("a.zip"));

        let mut log = OperationLog::new();
        let report = Extractor::new("filecat-no-such-unarchiver", vec![])
            .run(temp.path(), &mut log)
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert!(log.entries()[0].starts_with("Failed to start"));
    }

    #[test]
    fn test_archive_names_match_lowercase_only() {
        assert_eq!(ArchiveKind::of(Path::new("a.zip")), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::of(Path::new("a.rar")), Some(ArchiveKind::Rar));
        assert_eq!(ArchiveKind::of(Path::new("A.ZIP")), None);
        assert_eq!(ArchiveKind::of(Path::new("a.Rar")), None);
        assert_eq!(ArchiveKind::of(Path::new("zip")), None);
    }

    #[test]
    fn test_uppercase_zip_does_not_block_rar() {
        let temp = TempDir::new().unwrap();
        touch(&temp.path().join("A.ZIP"));
        touch(&temp.path().join("b.rar"));

        let report = Extractor::new("true", vec![])
            .run(temp.path(), &mut OperationLog::new())
            .unwrap();

        assert_eq!(report.extracted, vec![temp.path().join("b.rar")]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let result =
            Extractor::new("true", vec![]).run(&temp.path().join("nope"), &mut OperationLog::new());
        assert!(matches!(result, Err(ExtractError::RootNotFound { .. })));
    }
}
