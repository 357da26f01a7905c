//! OpenAPI Data Dictionary CLI
//!
//! Command-line interface for flattening OpenAPI schemas into data
//! dictionaries, element tables and HTTP error tables.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use oas_dictionary::{
    build_dictionary, collect_input_files, compile_error_table, concatenate, flatten_pointer,
    list_files, load_document, load_document_auto, read_tables, resolve_path_with_dir,
    resolve_with_dir, scan_folder, to_sheets, with_format_extension, write_csv, write_table,
    write_xlsx, CombineOptions, DictionaryOptions, OutputFormat, Sheet, SinkError, SourceTable,
    Table,
};

#[derive(Parser)]
#[command(name = "oas-dictionary")]
#[command(about = "Flatten OpenAPI 3.x schemas into data dictionaries and error tables")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a data dictionary from an OpenAPI document
    Dictionary {
        /// OpenAPI source: file path or URL (http:// or https://)
        source: String,

        /// Base directory for relative source and output paths
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output file
        #[arg(long, short, default_value = "data_dictionary.xlsx")]
        output: PathBuf,

        /// Output format (default: inferred from the output extension)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Also write a CSV next to the output
        #[arg(long)]
        csv: bool,

        /// Drop rows that repeat an earlier row exactly
        #[arg(long)]
        dedupe: bool,
    },

    /// Flatten a JSON Schema into one row per element
    Extract {
        /// JSON Schema file
        input: String,

        /// Output file
        #[arg(long, short)]
        output: PathBuf,

        /// Pointer to the schema root
        #[arg(long, default_value = "#")]
        root_pointer: String,

        /// Base directory for relative input and output paths
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Output format (default: inferred from the output extension)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Tabulate HTTP statuses and error codes of every spec in a folder
    Errors {
        /// Folder scanned recursively for .json, .yaml and .yml specs
        folder: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "md")]
        format: OutputFormat,

        /// Output file
        #[arg(long, short, default_value = "http_error_codes_table.md")]
        output: PathBuf,

        /// Collapse to one row per HTTP status
        #[arg(long)]
        group_by_status: bool,
    },

    /// Combine the CSV files and workbooks of a directory into one workbook
    Combine {
        /// Directory to scan
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Include subdirectories
        #[arg(long, short)]
        recursive: bool,

        /// Output workbook (default: combined.xlsx in the scanned directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Use the first file's columns for every file
        #[arg(long)]
        strict_columns: bool,

        /// Write one sheet per file (first sheet of each workbook) instead of
        /// one combined sheet
        #[arg(long)]
        tabs: bool,

        /// Read at most this many rows per file
        #[arg(long)]
        limit_rows: Option<usize>,
    },

    /// Build a data dictionary for every .json spec in a directory
    Batch {
        /// Directory holding the specs
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Format of the per-spec dictionaries
        #[arg(long, value_enum, default_value = "xlsx")]
        format: OutputFormat,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Dictionary {
            source,
            dir,
            output,
            format,
            csv,
            dedupe,
        } => run_dictionary(DictionaryArgs {
            source,
            dir,
            output,
            format,
            csv,
            dedupe,
        }),

        Commands::Extract {
            input,
            output,
            root_pointer,
            dir,
            format,
        } => run_extract(&input, &output, &root_pointer, dir.as_deref(), format),

        Commands::Errors {
            folder,
            format,
            output,
            group_by_status,
        } => run_errors(&folder, format, &output, group_by_status),

        Commands::Combine {
            dir,
            recursive,
            output,
            strict_columns,
            tabs,
            limit_rows,
        } => {
            let options = CombineOptions::new()
                .recursive(recursive)
                .strict_columns(strict_columns)
                .limit_rows(limit_rows)
                .first_sheet_only(tabs);
            run_combine(&dir, output, &options, tabs)
        }

        Commands::Batch { dir, format } => run_batch(&dir, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Warnings are always shown; `-v` raises the level to info, `-vv` to debug
/// and `-vvv` to trace. `RUST_LOG` overrides both.
fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,oas_dictionary=info".to_string(),
            2 => "info,oas_dictionary=debug".to_string(),
            _ => "debug,oas_dictionary=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose >= 2)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn sink_failed(e: SinkError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

struct DictionaryArgs {
    source: String,
    dir: Option<PathBuf>,
    output: PathBuf,
    format: Option<OutputFormat>,
    csv: bool,
    dedupe: bool,
}

fn run_dictionary(args: DictionaryArgs) -> Result<(), u8> {
    let DictionaryArgs {
        source,
        dir,
        output,
        format,
        csv,
        dedupe,
    } = args;

    let source = resolve_with_dir(&source, dir.as_deref());
    let output = resolve_path_with_dir(&output, dir.as_deref());

    let document = load_document_auto(&source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let options = DictionaryOptions::new().dedupe(dedupe);
    let entries = build_dictionary(&document, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    if entries.is_empty() {
        tracing::warn!(%source, "no data elements found");
    }

    let table = Table::from_records(&entries);
    let written = write_table(&output, &table, format).map_err(sink_failed)?;
    println!("Data dictionary written to: {}", output.display());

    if csv && written != OutputFormat::Csv {
        let csv_path = with_format_extension(&output, OutputFormat::Csv);
        write_csv(&csv_path, &table).map_err(sink_failed)?;
        println!("CSV written to: {}", csv_path.display());
    }

    tracing::info!(rows = table.len(), "dictionary complete");
    Ok(())
}

fn run_extract(
    input: &str,
    output: &Path,
    root_pointer: &str,
    dir: Option<&Path>,
    format: Option<OutputFormat>,
) -> Result<(), u8> {
    let input = resolve_path_with_dir(Path::new(input), dir);
    let output = resolve_path_with_dir(output, dir);

    let document = load_document(&input).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let records = flatten_pointer(&document, root_pointer).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    if records.is_empty() {
        tracing::warn!("no elements found; the schema has no properties or items");
    }

    let table = Table::from_records(&records);
    write_table(&output, &table, format).map_err(sink_failed)?;
    println!("Wrote {} rows to {}", table.len(), output.display());
    Ok(())
}

fn run_errors(
    folder: &Path,
    format: OutputFormat,
    output: &Path,
    group_by_status: bool,
) -> Result<(), u8> {
    let rows = scan_folder(folder).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    if rows.is_empty() {
        tracing::warn!(
            folder = %folder.display(),
            "no rows produced; check that the folder contains OpenAPI specs"
        );
    }

    let rows = compile_error_table(rows, group_by_status);
    let table = Table::from_records(&rows);
    write_table(output, &table, Some(format)).map_err(sink_failed)?;
    println!("Wrote {} rows to {}", table.len(), output.display());
    Ok(())
}

fn run_combine(
    dir: &Path,
    output: Option<PathBuf>,
    options: &CombineOptions,
    tabs: bool,
) -> Result<(), u8> {
    let output = output.unwrap_or_else(|| dir.join("combined.xlsx"));

    let files = collect_input_files(dir, options.recursive, Some(&output)).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .csv or .xlsx files found");
        return Ok(());
    }

    let tables = read_tables(&files, options);
    if tables.is_empty() {
        tracing::warn!("no readable tables; nothing to combine");
        return Ok(());
    }

    let sheets = if tabs {
        to_sheets(&tables)
    } else {
        vec![Sheet {
            name: "combined".to_string(),
            table: concatenate(&tables, options.strict_columns),
        }]
    };
    write_xlsx(&output, &sheets).map_err(sink_failed)?;
    let sources: HashSet<&str> = tables.iter().map(|t| t.source.as_str()).collect();
    println!(
        "Combined {} file(s) into {}",
        sources.len(),
        output.display()
    );
    Ok(())
}

fn run_batch(dir: &Path, format: OutputFormat) -> Result<(), u8> {
    let files = list_files(dir, &["json"], false).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "no .json files found");
        return Ok(());
    }

    let mut generated = Vec::new();
    let mut failed = 0usize;
    for file in &files {
        match batch_one(dir, file, format) {
            Ok(source) => generated.push(source),
            Err(message) => {
                failed += 1;
                eprintln!("Failed processing {}: {}", file.display(), message);
            }
        }
    }

    if failed > 0 {
        eprintln!(
            "{} of {} file(s) failed; combined workbook not written",
            failed,
            files.len()
        );
        return Err(1);
    }

    let combined = dir.join("combined.xlsx");
    let sheet = Sheet {
        name: "combined".to_string(),
        table: concatenate(&generated, false),
    };
    write_xlsx(&combined, &[sheet]).map_err(sink_failed)?;
    println!("Combined workbook written to: {}", combined.display());
    Ok(())
}

/// Build and write the dictionary of one spec, returning its table tagged
/// with the output file name.
fn batch_one(dir: &Path, file: &Path, format: OutputFormat) -> Result<SourceTable, String> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let output_name = format!("{}_data_dictionary.{}", stem, format.extension());
    let output = dir.join(&output_name);
    tracing::info!(file = %file.display(), output = %output.display(), "processing");

    let document = load_document(file).map_err(|e| e.to_string())?;
    let entries =
        build_dictionary(&document, &DictionaryOptions::new()).map_err(|e| e.to_string())?;
    let table = Table::from_records(&entries);
    write_table(&output, &table, Some(format)).map_err(|e| e.to_string())?;
    println!("Processed {} -> {}", file.display(), output.display());

    Ok(SourceTable {
        source: output_name,
        sheet: None,
        table,
    })
}
