//! Combining CSV files and workbooks from a directory into one workbook.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};

use crate::error::{InputError, ScanError};
use crate::scan::list_files;
use crate::sink::{dedupe_sheet_name, sanitise_sheet_name, Sheet, Table};
use crate::types::CombineOptions;

/// Column naming the file each concatenated row came from.
pub const SOURCE_FILE_COLUMN: &str = "__source_file";

/// Column naming the worksheet each concatenated row came from; empty for
/// CSV input.
pub const SOURCE_SHEET_COLUMN: &str = "__source_sheet";

/// File extensions picked up by [`collect_input_files`].
pub const INPUT_EXTENSIONS: &[&str] = &["csv", "xlsx"];

/// A table read from one input file, or one sheet of an input workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    /// File name of the input, without directories.
    pub source: String,
    /// Worksheet name for workbook input.
    pub sheet: Option<String>,
    pub table: Table,
}

/// Find the CSV files and workbooks to combine, sorted by path.
///
/// Office lock files (`~$*`) and `exclude` (usually the output file itself)
/// are skipped.
pub fn collect_input_files(
    dir: &Path,
    recursive: bool,
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>, ScanError> {
    let excluded = exclude.map(canonical);
    let files = list_files(dir, INPUT_EXTENSIONS, recursive)?
        .into_iter()
        .filter(|path| {
            let lock_file = path
                .file_name()
                .map_or(false, |name| name.to_string_lossy().starts_with("~$"));
            !lock_file && excluded.as_ref() != Some(&canonical(path))
        })
        .collect();
    Ok(files)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("xlsx"))
}

/// Read a CSV file with a header row.
///
/// Records may have varying lengths; short rows are padded and long rows
/// truncated to the header. At most `limit_rows` data rows are read.
pub fn read_csv_table(path: &Path, limit_rows: Option<usize>) -> Result<Table, InputError> {
    let csv_err = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(String::from)
        .collect();

    let mut table = Table::new(columns);
    let width = table.columns.len();
    for record in reader.records().take(limit_rows.unwrap_or(usize::MAX)) {
        let record = record.map_err(csv_err)?;
        let mut row: Vec<String> = record.iter().take(width).map(String::from).collect();
        row.resize(width, String::new());
        table.rows.push(row);
    }
    Ok(table)
}

/// Read the sheets of a workbook, the first row of each being its header.
///
/// Every sheet is read unless `first_sheet_only` is set. A sheet that cannot
/// be read is skipped with a warning; so is a sheet with no cells.
pub fn read_workbook_tables(
    path: &Path,
    options: &CombineOptions,
) -> Result<Vec<SourceTable>, InputError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| InputError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;
    let source = file_name(path);
    let names = workbook.sheet_names();
    let wanted = if options.first_sheet_only { 1 } else { names.len() };

    let mut tables = Vec::new();
    for name in names.into_iter().take(wanted) {
        match workbook.worksheet_range(&name) {
            Ok(range) => match range_table(&range, options.limit_rows) {
                Some(table) => tables.push(SourceTable {
                    source: source.clone(),
                    sheet: Some(name),
                    table,
                }),
                None => tracing::debug!(path = %path.display(), sheet = %name, "empty sheet"),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), sheet = %name, "skipping unreadable sheet: {}", e);
            }
        }
    }
    Ok(tables)
}

fn range_table(range: &Range<Data>, limit_rows: Option<usize>) -> Option<Table> {
    let mut rows = range.rows();
    let header = rows.next()?;
    let mut table = Table::new(header.iter().map(|cell| cell.to_string()).collect());
    table.rows.extend(
        rows.take(limit_rows.unwrap_or(usize::MAX))
            .map(|row| row.iter().map(|cell| cell.to_string()).collect()),
    );
    Some(table)
}

/// Read every file, skipping (with a warning) those that cannot be parsed.
pub fn read_tables(files: &[PathBuf], options: &CombineOptions) -> Vec<SourceTable> {
    let mut tables = Vec::new();
    for path in files {
        let read = if is_workbook(path) {
            read_workbook_tables(path, options)
        } else {
            read_csv_table(path, options.limit_rows).map(|table| {
                vec![SourceTable {
                    source: file_name(path),
                    sheet: None,
                    table,
                }]
            })
        };
        match read {
            Ok(read) => {
                tracing::debug!(path = %path.display(), tables = read.len(), "input read");
                tables.extend(read);
            }
            Err(e) => tracing::warn!("skipping unreadable file: {}", e),
        }
    }
    tables
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_provenance(column: &str) -> bool {
    column == SOURCE_FILE_COLUMN || column == SOURCE_SHEET_COLUMN
}

/// Stack tables into one, appending [`SOURCE_FILE_COLUMN`] and
/// [`SOURCE_SHEET_COLUMN`].
///
/// Columns are the union of all tables' columns in first-seen order, or with
/// `strict_columns` the first table's columns only (missing cells are empty,
/// extra columns dropped).
pub fn concatenate(tables: &[SourceTable], strict_columns: bool) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut known: HashSet<&str> = HashSet::new();
    let sources = if strict_columns {
        &tables[..tables.len().min(1)]
    } else {
        tables
    };
    for source in sources {
        for column in &source.table.columns {
            if !is_provenance(column) && known.insert(column.as_str()) {
                columns.push(column.clone());
            }
        }
    }

    let mut combined = Table::new(columns);
    for source in tables {
        let positions: HashMap<&str, usize> = source
            .table
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        for row in &source.table.rows {
            let mut out: Vec<String> = combined
                .columns
                .iter()
                .map(|c| {
                    positions
                        .get(c.as_str())
                        .and_then(|&i| row.get(i))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            out.push(source.source.clone());
            out.push(source.sheet.clone().unwrap_or_default());
            combined.rows.push(out);
        }
    }
    combined.columns.push(SOURCE_FILE_COLUMN.to_string());
    combined.columns.push(SOURCE_SHEET_COLUMN.to_string());
    combined
}

/// One sheet per table, named after its file stem.
pub fn to_sheets(tables: &[SourceTable]) -> Vec<Sheet> {
    let mut used = HashSet::new();
    tables
        .iter()
        .map(|source| {
            let stem = Path::new(&source.source)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            Sheet {
                name: dedupe_sheet_name(&sanitise_sheet_name(&stem), &mut used),
                table: source.table.clone(),
            }
        })
        .collect()
}
