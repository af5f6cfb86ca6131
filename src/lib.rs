//! filecat - catalog files across volumes by category
//!
//! This library walks directory trees, classifies every file by extension, keeps the
//! results in an in-memory catalog, exports JSON/CSV reports and can copy or move the
//! cataloged files into one folder per category. A small helper extracts ZIP and RAR
//! archives in place before cataloging.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod exclusion;
pub mod extract;
pub mod file_category;
pub mod file_organizer;
pub mod logging;
pub mod output;
pub mod report;
pub mod scanner;

pub use catalog::{Catalog, FileRecord, OperationLog, Stats};
pub use config::{CatalogConfig, CompiledIgnoreRules, ConfigError};
pub use exclusion::ExclusionSet;
pub use extract::{ExtractReport, Extractor};
pub use file_category::{Category, classify};
pub use file_organizer::{FileOrganizer, OperationStats, OrganizeOptions, OrganizeReport};
pub use report::TabularFormat;
pub use scanner::{ScanOptions, Scanner};

pub use cli::{Cli, run_cli};
