//! Command-line interface module for filecat.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing (clap derive)
//! - Scan, report and organize orchestration
//! - Archive extraction
//!
//! Per-file problems never stop a run; they end up in the operation log and the
//! summary. Only setup errors (configuration, unknown extraction root) are returned.

use crate::catalog::{Catalog, OperationLog};
use crate::config::CatalogConfig;
use crate::exclusion::ExclusionSet;
use crate::extract::{ExtractReport, Extractor};
use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, OrganizeOptions, OrganizeReport};
use crate::output::OutputFormatter;
use crate::report::{self, TabularFormat};
use crate::scanner::{ScanOptions, Scanner};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(
    name = "filecat",
    version,
    about = "Catalog files across volumes by category",
    long_about = "filecat walks one or more volumes, classifies every file by extension, \
                  writes JSON and CSV or Excel reports and can copy or move the files into one folder \
                  per category. Organizing is a dry run unless --no-dry-run is given."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Catalog volumes, write reports and optionally organize the files
    Scan(ScanArgs),
    /// Extract ZIP and RAR archives in place, recursively
    Extract(ExtractArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Volumes or directories to catalog, scanned in order
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,

    /// Compute a content hash for every file (slower)
    #[arg(long)]
    pub include_hash: bool,

    /// Deepest directory level to enter; 0 reads only the files directly in each root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Only handle one category (photos, ebooks, documents, movies, music, other)
    #[arg(long, value_name = "CAT")]
    pub file_type: Option<String>,

    /// Organize the cataloged files into category folders
    #[arg(long)]
    pub organize: bool,

    /// Destination of organized files [default: organized_files_<timestamp>]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Move files instead of copying them
    #[arg(long = "move")]
    pub move_files: bool,

    /// Really copy or move files; without it organizing only prints the plan
    #[arg(long)]
    pub no_dry_run: bool,

    /// Put every organized file directly in this directory, ignoring categories
    #[arg(long, value_name = "DIR")]
    pub move_to: Option<PathBuf>,

    /// Do not write the JSON report
    #[arg(long)]
    pub no_json: bool,

    /// Do not write the tabular (CSV or Excel) report
    #[arg(long)]
    pub no_csv: bool,

    /// Format of the tabular report [default: from config, else csv]
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub tabular_format: Option<TabularFormat>,

    /// File name prefix of the JSON and tabular reports
    #[arg(long, value_name = "P", default_value = "catalog")]
    pub output_prefix: String,

    /// Directory the reports are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub report_dir: PathBuf,

    /// Skip this path and everything below it (repeatable)
    #[arg(long, value_name = "PATH")]
    pub exclude: Vec<PathBuf>,

    /// Exclusion list to load instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub exclusions_file: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print every file and operation
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Directory to walk
    pub root: PathBuf,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print every archive handled
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Scan(args) => args.verbose,
            Commands::Extract(args) => args.verbose,
        }
    }
}

/// Everything a scan run produced.
#[derive(Debug, Default)]
pub struct ScanRun {
    pub catalog: Catalog,
    pub log: OperationLog,
    /// Report files written, in the order they were written.
    pub reports: Vec<PathBuf>,
    /// Present when organizing ran to completion.
    pub organized: Option<OrganizeReport>,
}

/// Runs the parsed command line.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filecat::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["filecat", "scan", "/mnt/photos", "--no-csv"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Scan(args) => run_scan(&args).map(|_| ()),
        Commands::Extract(args) => run_extract(&args).map(|_| ()),
    }
}

/// Catalogs the roots, prints the summary, writes the reports and optionally organizes.
///
/// This function:
/// 1. Loads the configuration and compiles the ignore rules
/// 2. Builds the exclusion set from the flags and the persisted exclusion list
/// 3. Scans every root into one catalog
/// 4. Writes the JSON, CSV and folder-list reports
/// 5. Organizes the files when `--organize` is given
pub fn run_scan(args: &ScanArgs) -> Result<ScanRun, String> {
    let config = CatalogConfig::load(args.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let delimiter = config
        .delimiter()
        .map_err(|e| format!("Error in configuration: {}", e))?;
    let ignore = config
        .compile_ignore_rules()
        .map_err(|e| format!("Error compiling ignore rules: {}", e))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut run = ScanRun::default();

    OutputFormatter::header("FILE CATALOGER");
    OutputFormatter::plain(&format!("Volumes to process: {}", args.roots.len()));
    for (i, root) in args.roots.iter().enumerate() {
        OutputFormatter::plain(&format!("  {}. {}", i + 1, root.display()));
    }

    let exclusions = build_exclusions(args, &config, &mut run.log);

    let type_filter = match args.file_type.as_deref() {
        Some(name) => match name.parse::<Category>() {
            Ok(category) => Some(category),
            Err(e) => {
                OutputFormatter::warning(&format!("{}; cataloging every type", e));
                None
            }
        },
        None => None,
    };

    let options = ScanOptions {
        include_hash: args.include_hash,
        max_depth: args.max_depth,
        type_filter,
    };
    Scanner::new(&exclusions)
        .with_ignore_rules(ignore)
        .verbose(args.verbose)
        .progress_interval(config.catalog.progress_interval)
        .show_progress(true)
        .scan_all(&args.roots, &options, &mut run.catalog, &mut run.log);

    OutputFormatter::header("CATALOG SUMMARY");
    OutputFormatter::plain(&report::render_summary(&run.catalog, &run.log));

    let format = args
        .tabular_format
        .unwrap_or(config.catalog.tabular_format);
    let folders_file = write_reports(args, &timestamp, delimiter, format, &mut run);

    if args.organize {
        let destination = args
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("organized_files_{}", timestamp)));
        let options = OrganizeOptions {
            destination_root: destination,
            copy: !args.move_files,
            dry_run: !args.no_dry_run,
            type_filter: args.file_type.clone(),
            flatten_to: args.move_to.clone(),
            verbose: args.verbose,
            preview_limit: config.catalog.preview_limit,
            show_progress: true,
        };

        OutputFormatter::header("ORGANIZE");
        OutputFormatter::plain(&format!(
            "Output directory: {}",
            options.destination_root.display()
        ));
        OutputFormatter::plain(&format!(
            "Mode: {}",
            if options.dry_run { "dry run" } else { "real execution" }
        ));
        OutputFormatter::plain(&format!(
            "Action: {}",
            if options.copy { "copy" } else { "move" }
        ));
        if options.dry_run
            && let Some(folders_file) = &folders_file
        {
            OutputFormatter::info(&format!(
                "Tip: review {} and copy unwanted folders into {} before a real run.",
                folders_file.display(),
                config.catalog.exclusions_file.display()
            ));
        }

        match FileOrganizer::organize(&run.catalog, &options, &mut run.log) {
            Ok(organized) => run.organized = Some(organized),
            Err(e) => OutputFormatter::error(&e.to_string()),
        }
    }

    Ok(run)
}

/// Runs the archive extractor configured in `[extractor]`.
pub fn run_extract(args: &ExtractArgs) -> Result<ExtractReport, String> {
    let config = CatalogConfig::load(args.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;

    let mut log = OperationLog::new();
    let extractor = Extractor::from_settings(&config.extractor);
    let report = extractor
        .run(&args.root, &mut log)
        .map_err(|e| e.to_string())?;

    OutputFormatter::header("EXTRACTION SUMMARY");
    OutputFormatter::success(&format!("Extracted: {}", report.extracted.len()));
    OutputFormatter::plain(&format!("Skipped RAR: {}", report.skipped.len()));
    if report.failed.is_empty() {
        OutputFormatter::plain("Failed: 0");
    } else {
        OutputFormatter::error(&format!("Failed: {}", report.failed.len()));
    }
    if args.verbose {
        for archive in &report.skipped {
            OutputFormatter::plain(&format!("  skipped {}", archive.display()));
        }
    }

    Ok(report)
}

/// Excludes `--move-to`, `--output-dir` and every `--exclude`, then the persisted list.
fn build_exclusions(args: &ScanArgs, config: &CatalogConfig, log: &mut OperationLog) -> ExclusionSet {
    let explicit: Vec<&Path> = args
        .move_to
        .iter()
        .chain(args.output_dir.iter())
        .chain(args.exclude.iter())
        .map(PathBuf::as_path)
        .collect();
    let mut exclusions = ExclusionSet::new(explicit, log);

    let list = args
        .exclusions_file
        .as_deref()
        .unwrap_or(config.catalog.exclusions_file.as_path());
    match exclusions.load_file(list, log) {
        Ok(0) => debug!("No exclusions loaded from {}", list.display()),
        Ok(loaded) => {
            if args.verbose {
                OutputFormatter::info(&format!(
                    "Loaded {} folder exclusions from {}",
                    loaded,
                    list.display()
                ));
            }
        }
        Err(e) => {
            OutputFormatter::error(&e.to_string());
            log.record(e.to_string());
        }
    }

    if args.verbose {
        for path in exclusions.paths() {
            OutputFormatter::plain(&format!("Excluding: {}", path.display()));
        }
    }
    exclusions
}

/// Writes the requested reports into `--report-dir`; returns the folder list path if written.
///
/// A report that cannot be written is printed and recorded in the run's log.
fn write_reports(
    args: &ScanArgs,
    timestamp: &str,
    delimiter: u8,
    format: TabularFormat,
    run: &mut ScanRun,
) -> Option<PathBuf> {
    if let Err(e) = fs::create_dir_all(&args.report_dir) {
        let message = format!(
            "Failed to create report directory {}: {}",
            args.report_dir.display(),
            e
        );
        OutputFormatter::error(&message);
        run.log.record(message);
        return None;
    }

    if !args.no_json {
        let path = args
            .report_dir
            .join(format!("{}_{}.json", args.output_prefix, timestamp));
        match report::write_json(&run.catalog, &run.log, &path) {
            Ok(()) => {
                OutputFormatter::success(&format!("JSON catalog saved: {}", path.display()));
                run.reports.push(path);
            }
            Err(e) => report_failed(&mut run.log, &e),
        }
    }

    if !args.no_csv {
        let path = args.report_dir.join(format!(
            "{}_{}.{}",
            args.output_prefix,
            timestamp,
            format.extension()
        ));
        let written = match format {
            TabularFormat::Csv => report::write_csv(&run.catalog, &path, delimiter),
            TabularFormat::Xlsx => report::write_xlsx(&run.catalog, &path),
        };
        match written {
            Ok(()) => {
                OutputFormatter::success(&format!(
                    "{} catalog saved: {}",
                    format.extension().to_uppercase(),
                    path.display()
                ));
                run.reports.push(path);
            }
            Err(e) => report_failed(&mut run.log, &e),
        }
    }

    let path = args
        .report_dir
        .join(format!("folders_with_files_{}.txt", timestamp));
    match report::write_folders_list(&run.catalog, &path, args.file_type.as_deref()) {
        Ok(0) => {
            warn!("No folders with cataloged files; folder list not written");
            None
        }
        Ok(count) => {
            OutputFormatter::success(&format!(
                "Folder list saved: {} ({} folders)",
                path.display(),
                count
            ));
            run.reports.push(path.clone());
            Some(path)
        }
        Err(e) => {
            report_failed(&mut run.log, &e);
            None
        }
    }
}

fn report_failed(log: &mut OperationLog, error: &report::ReportError) {
    OutputFormatter::error(&error.to_string());
    log.record(error.to_string());
}
