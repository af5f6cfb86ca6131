//! Path exclusion set.
//!
//! Holds resolved absolute paths; a candidate is excluded when it equals one of them
//! or lies underneath one. Paths come from the caller and, optionally, from a plain-text
//! exclusion list (one path per line, `#` comments and blank lines ignored).

use crate::catalog::OperationLog;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while building the exclusion set.
#[derive(Debug, Error)]
pub enum ExclusionError {
    /// The exclusion list file could not be read.
    #[error("Failed to read exclusion list {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A path could not be made absolute.
    #[error("Invalid exclusion path '{line}': {source}")]
    InvalidPath {
        line: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for exclusion operations.
pub type ExclusionResult<T> = Result<T, ExclusionError>;

/// Resolves a path to an absolute, normalized form.
///
/// Existing paths are canonicalized (symlinks resolved). For paths that do not exist yet,
/// such as an output directory about to be created, the deepest existing ancestor is
/// canonicalized and the missing components are appended to it.
pub fn resolve(path: &Path) -> io::Result<PathBuf> {
    if let Ok(resolved) = fs::canonicalize(path) {
        return Ok(resolved);
    }

    let absolute = std::path::absolute(path)?;
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    while let (Some(parent), Some(name)) = (current.parent(), current.file_name()) {
        missing.push(name);
        current = parent;
        if let Ok(base) = fs::canonicalize(current) {
            return Ok(missing.iter().rev().fold(base, |acc, name| acc.join(name)));
        }
    }
    Ok(absolute)
}

/// Set of absolute paths pruned from scanning.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    paths: BTreeSet<PathBuf>,
}

impl ExclusionSet {
    /// Creates an exclusion set from explicit paths.
    ///
    /// Paths that cannot be resolved are recorded in `log` and left out.
    pub fn new<I, P>(paths: I, log: &mut OperationLog) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self::default();
        for path in paths {
            let path = path.as_ref();
            if let Err(e) = set.add(path) {
                log.record(e.to_string());
            }
        }
        set
    }

    /// Resolves and adds one path.
    pub fn add(&mut self, path: &Path) -> ExclusionResult<()> {
        let resolved = resolve(path).map_err(|source| ExclusionError::InvalidPath {
            line: path.display().to_string(),
            source,
        })?;
        debug!("Excluding from scan: {}", resolved.display());
        self.paths.insert(resolved);
        Ok(())
    }

    /// Loads additional paths from an exclusion list file.
    ///
    /// Lines that fail to resolve are recorded in `log` and skipped. A missing file is not
    /// an error and loads nothing. Returns the number of paths added.
    pub fn load_file(&mut self, file: &Path, log: &mut OperationLog) -> ExclusionResult<usize> {
        if !file.exists() {
            return Ok(0);
        }

        let content = fs::read_to_string(file).map_err(|source| ExclusionError::ReadFailed {
            path: file.to_path_buf(),
            source,
        })?;

        let mut loaded = 0;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match resolve(Path::new(line)) {
                Ok(resolved) => {
                    debug!("Exclusion loaded from {}: {}", file.display(), resolved.display());
                    self.paths.insert(resolved);
                    loaded += 1;
                }
                Err(source) => {
                    let e = ExclusionError::InvalidPath {
                        line: line.to_string(),
                        source,
                    };
                    log.record(e.to_string());
                }
            }
        }

        if loaded > 0 {
            info!("Loaded {} folder exclusions from {}", loaded, file.display());
        }
        Ok(loaded)
    }

    /// Returns true if `path` is one of the excluded paths or nested under one.
    pub fn is_excluded(&self, path: &Path) -> bool {
        if self.paths.is_empty() {
            return false;
        }
        let Ok(candidate) = resolve(path) else {
            return false;
        };
        self.paths
            .iter()
            .any(|excluded| candidate.starts_with(excluded))
    }

    /// The resolved excluded paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
