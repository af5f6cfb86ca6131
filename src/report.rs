//! Catalog reports.
//!
//! Renders a scanned [`Catalog`] as a structured JSON export, a tabular export
//! (delimited text or an Excel workbook), a human-readable summary, and a plain list of
//! the directories that held cataloged files. None of these mutate the catalog.

use crate::catalog::{Catalog, FileRecord, OperationLog, Stats};
use crate::file_category::Category;
use crate::output::group_thousands;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the single worksheet in the Excel export.
pub const XLSX_SHEET: &str = "Catalog";

/// Column of [`CSV_HEADERS`] holding the size.
const SIZE_COLUMN: u16 = 3;

/// Column headers of the tabular export.
pub const CSV_HEADERS: [&str; 9] = [
    "Category",
    "Name",
    "Path",
    "Size",
    "Extension",
    "Modified",
    "Created",
    "Parent_Dir",
    "Hash",
];

/// File format of the tabular export.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TabularFormat {
    /// Delimited text, using the configured delimiter.
    #[default]
    Csv,
    /// Excel workbook with a single sheet.
    Xlsx,
}

impl TabularFormat {
    /// File extension of the export, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

/// Errors that can occur while writing or reading reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to create, write or read a report file.
    #[error("Failed to access report file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// JSON serialization or parsing failed.
    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// CSV writing failed.
    #[error("Failed to write CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// Excel workbook writing failed.
    #[error("Failed to write workbook {}: {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// The structured export: a self-describing snapshot of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogExport {
    /// When the export was generated.
    pub timestamp: DateTime<Local>,
    pub stats: Stats,
    pub catalog: BTreeMap<Category, Vec<FileRecord>>,
    /// Every error and warning recorded during the run.
    pub errors: Vec<String>,
}

impl CatalogExport {
    /// Builds an export stamped with the current time.
    pub fn new(catalog: &Catalog, log: &OperationLog) -> Self {
        Self {
            timestamp: Local::now(),
            stats: catalog.stats().clone(),
            catalog: catalog.as_map().clone(),
            errors: log.entries().to_vec(),
        }
    }

    /// Reads an export previously written by [`write_json`].
    pub fn load(path: &Path) -> ReportResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes the structured JSON export.
///
/// The export is serialized in memory, written next to `path` and renamed into place,
/// so a failed write never leaves a partial file behind.
pub fn write_json(catalog: &Catalog, log: &OperationLog, path: &Path) -> ReportResult<()> {
    let export = CatalogExport::new(catalog, log);
    let bytes = serde_json::to_vec_pretty(&export).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = temp_path_for(path);
    let written = fs::write(&temp_path, bytes).and_then(|()| fs::rename(&temp_path, path));
    if let Err(source) = written {
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }
        return Err(ReportError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// The tabular columns of one record, in [`CSV_HEADERS`] order.
pub fn tabular_row(record: &FileRecord) -> [String; 9] {
    [
        record.category.dir_name().to_string(),
        record.name.clone(),
        record.path.to_string_lossy().into_owned(),
        record.size.to_string(),
        record.extension.clone(),
        record.modified.to_rfc3339(),
        record.created.to_rfc3339(),
        record.parent_dir.to_string_lossy().into_owned(),
        record.hash.clone().unwrap_or_default(),
    ]
}

/// Writes one header row and one row per file, using `delimiter` between fields.
pub fn write_csv(catalog: &Catalog, path: &Path, delimiter: u8) -> ReportResult<()> {
    let file = create(path)?;
    let csv_error = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(file);
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;

    for record in catalog.records() {
        writer.write_record(tabular_row(record)).map_err(csv_error)?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the tabular export as an Excel workbook with a single [`XLSX_SHEET`] sheet.
///
/// Same columns as the delimited export; sizes are stored as numbers.
pub fn write_xlsx(catalog: &Catalog, path: &Path) -> ReportResult<()> {
    let xlsx_error = |source| ReportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET).map_err(xlsx_error)?;

    for (col, title) in (0_u16..).zip(CSV_HEADERS) {
        sheet
            .write_string_with_format(0, col, title, &header)
            .map_err(xlsx_error)?;
    }

    for (row, record) in (1_u32..).zip(catalog.records()) {
        for (col, value) in (0_u16..).zip(tabular_row(record)) {
            if col == SIZE_COLUMN {
                sheet
                    .write_number(row, col, record.size as f64)
                    .map_err(xlsx_error)?;
            } else {
                sheet.write_string(row, col, value).map_err(xlsx_error)?;
            }
        }
    }

    workbook.save(path).map_err(xlsx_error)
}

/// Writes the sorted list of directories that held cataloged files.
///
/// The list starts with a commented header so it can be trimmed and pasted into the
/// exclusion list. Nothing is written when no directory was recorded. Returns the
/// number of directories written.
pub fn write_folders_list(
    catalog: &Catalog,
    path: &Path,
    type_filter: Option<&str>,
) -> ReportResult<usize> {
    let folders = catalog.folders();
    if folders.is_empty() {
        return Ok(0);
    }

    let io_error = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(create(path)?);
    writeln!(writer, "# Folders containing cataloged files").map_err(io_error)?;
    writeln!(writer, "# Generated: {}", Local::now().to_rfc3339()).map_err(io_error)?;
    if let Some(filter) = type_filter {
        writeln!(writer, "# Filter applied: {}", filter).map_err(io_error)?;
    }
    writeln!(writer, "# Total folders: {}", folders.len()).map_err(io_error)?;
    writeln!(writer, "#").map_err(io_error)?;
    writeln!(
        writer,
        "# To skip a folder in the next run, copy its line into the exclusion list"
    )
    .map_err(io_error)?;
    writeln!(writer, "#\n").map_err(io_error)?;

    for folder in folders {
        writeln!(writer, "{}", folder.display()).map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;

    Ok(folders.len())
}

/// Renders the human-readable summary.
pub fn render_summary(catalog: &Catalog, log: &OperationLog) -> String {
    let stats = catalog.stats();
    let mut out = String::new();
    let _ = writeln!(out, "Total files: {}", group_thousands(stats.total_files));
    let _ = writeln!(out, "Total size: {}", format_size(stats.total_size));
    let _ = writeln!(out, "Errors: {}", log.len());

    let rows = category_rows(catalog);
    if !rows.is_empty() {
        let _ = writeln!(out, "\nFiles by category:");
        for (category, count, size) in rows {
            let _ = writeln!(
                out,
                "  {}: {} files ({})",
                category.label(),
                group_thousands(count),
                format_size(size)
            );
        }
    }
    out
}

/// `(category, file count, total bytes)` for every non-empty category, in summary order.
pub fn category_rows(catalog: &Catalog) -> Vec<(Category, u64, u64)> {
    Category::SUMMARY_ORDER
        .into_iter()
        .filter_map(|category| {
            let count = catalog.stats().count(category);
            (count > 0).then(|| (category, count, catalog.category_size(category)))
        })
        .collect()
}

/// Formats a byte count with binary units and one decimal place.
///
/// # Examples
///
/// ```
/// use filecat::report::format_size;
///
/// assert_eq!(format_size(512), "512.0 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn create(path: &Path) -> ReportResult<File> {
    File::create(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
