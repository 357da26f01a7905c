//! Tabular output: Markdown, CSV and Excel workbooks.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::SinkError;
use crate::types::OutputFormat;

/// Longest sheet name Excel accepts.
pub const MAX_SHEET_NAME: usize = 31;

/// Widest column written to a workbook, in characters.
const MAX_COLUMN_WIDTH: usize = 80;

/// A record type with a fixed set of named columns.
pub trait TabularRecord {
    /// Column headers, in output order.
    const COLUMNS: &'static [&'static str];

    /// Cell values, one per column.
    fn cells(&self) -> Vec<String>;
}

/// Named columns and rows of string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from records, one row each.
    pub fn from_records<T: TabularRecord>(records: &[T]) -> Self {
        Self {
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: records.iter().map(TabularRecord::cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A table destined for one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Render a table as a pipe-delimited Markdown table.
///
/// Pipes in cells are escaped as `\|` and line breaks become spaces. A table
/// without rows renders as its header.
pub fn render_markdown(table: &Table) -> String {
    let line = |cells: &[String]| {
        let escaped: Vec<String> = cells.iter().map(|c| escape_markdown_cell(c)).collect();
        format!("| {} |\n", escaped.join(" | "))
    };

    let mut out = line(&table.columns);
    let separator: Vec<String> = table.columns.iter().map(|_| "---".to_string()).collect();
    out.push_str(&format!("| {} |\n", separator.join(" | ")));
    for row in &table.rows {
        out.push_str(&line(row));
    }
    out
}

fn escape_markdown_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace("\r\n", " ").replace('\n', " ")
}

/// Write a table as Markdown.
pub fn write_markdown(path: &Path, table: &Table) -> Result<(), SinkError> {
    create_parent(path)?;
    fs::write(path, render_markdown(table)).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a table as UTF-8 CSV with a header row.
pub fn write_csv(path: &Path, table: &Table) -> Result<(), SinkError> {
    create_parent(path)?;
    let file = fs::File::create(path).map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let csv_err = |source| SinkError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&table.columns).map_err(csv_err)?;
    for row in &table.rows {
        writer.write_record(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write one or more sheets to an Excel workbook.
///
/// Each sheet gets a header row; column widths fit the longest cell, capped
/// at 80 characters.
pub fn write_xlsx(path: &Path, sheets: &[Sheet]) -> Result<(), SinkError> {
    create_parent(path)?;
    let xlsx_err = |source: XlsxError| SinkError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name.as_str()).map_err(xlsx_err)?;

        let table = &sheet.table;
        for (col, header) in table.columns.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, header.as_str())
                .map_err(xlsx_err)?;
        }
        for (row_idx, row) in table.rows.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                worksheet
                    .write_string(row_idx as u32 + 1, col as u16, cell.as_str())
                    .map_err(xlsx_err)?;
            }
        }
        for (col, width) in column_widths(table).into_iter().enumerate() {
            worksheet
                .set_column_width(col as u16, width as f64)
                .map_err(xlsx_err)?;
        }
    }

    workbook.save(path).map_err(xlsx_err)
}

/// Write a table in `format`, or in the format implied by the extension of
/// `path`. Returns the format used.
pub fn write_table(
    path: &Path,
    table: &Table,
    format: Option<OutputFormat>,
) -> Result<OutputFormat, SinkError> {
    let format = match format.or_else(|| OutputFormat::from_path(path)) {
        Some(f) => f,
        None => {
            return Err(SinkError::UnknownFormat {
                path: path.to_path_buf(),
            })
        }
    };

    match format {
        OutputFormat::Markdown => write_markdown(path, table)?,
        OutputFormat::Csv => write_csv(path, table)?,
        OutputFormat::Xlsx => write_xlsx(
            path,
            &[Sheet {
                name: "Sheet1".to_string(),
                table: table.clone(),
            }],
        )?,
    }
    tracing::debug!(path = %path.display(), rows = table.len(), "table written");
    Ok(format)
}

/// Replace `path`'s extension with the one `format` writes.
pub fn with_format_extension(path: &Path, format: OutputFormat) -> PathBuf {
    path.with_extension(format.extension())
}

fn column_widths(table: &Table) -> Vec<usize> {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (col, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(col) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }
    widths
        .into_iter()
        .map(|w| (w + 2).min(MAX_COLUMN_WIDTH))
        .collect()
}

fn create_parent(path: &Path) -> Result<(), SinkError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Make `name` acceptable as an Excel sheet name.
///
/// `: \ / ? * [ ]` become `_`, surrounding quotes and whitespace are trimmed,
/// the result is cut to 31 characters and an empty name becomes `Sheet`.
pub fn sanitise_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            ':' | '\\' | '/' | '?' | '*' | '[' | ']' => '_',
            other => other,
        })
        .collect();
    let edge = |c: char| c == '\'' || c == '"' || c.is_whitespace();
    let cut: String = replaced.trim_matches(edge).chars().take(MAX_SHEET_NAME).collect();
    let cut = cut.trim_end_matches(edge);
    if cut.is_empty() {
        "Sheet".to_string()
    } else {
        cut.to_string()
    }
}

/// Return `name`, or `name (2)`, `name (3)`... if already in `used`; the
/// chosen name is recorded. Names compare case-insensitively, as in Excel.
pub fn dedupe_sheet_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_lowercase()) {
        return name.to_string();
    }
    let mut n = 2;
    loop {
        let suffix = format!(" ({})", n);
        let room = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        let base: String = name.chars().take(room).collect();
        let candidate = format!("{}{}", base, suffix);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Pair(&'static str, &'static str);

    impl TabularRecord for Pair {
        const COLUMNS: &'static [&'static str] = &["left", "right"];

        fn cells(&self) -> Vec<String> {
            vec![self.0.to_string(), self.1.to_string()]
        }
    }

    #[test]
    fn table_from_records() {
        let table = Table::from_records(&[Pair("a", "b"), Pair("c", "d")]);
        assert_eq!(table.columns, ["left", "right"]);
        assert_eq!(table.rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn markdown_escapes_pipes() {
        let table = Table::from_records(&[Pair("a|b", "line\nbreak")]);
        assert_eq!(
            render_markdown(&table),
            "| left | right |\n| --- | --- |\n| a\\|b | line break |\n"
        );
    }

    #[test]
    fn markdown_header_only_when_empty() {
        let table = Table::from_records::<Pair>(&[]);
        assert_eq!(render_markdown(&table), "| left | right |\n| --- | --- |\n");
    }

    #[test]
    fn csv_written_with_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.csv");
        let table = Table::from_records(&[Pair("x", "y,z")]);
        write_csv(&path, &table).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "left,right\nx,\"y,z\"\n");
    }

    #[test]
    fn xlsx_workbook_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let table = Table::from_records(&[Pair("x", "y")]);
        write_xlsx(
            &path,
            &[
                Sheet { name: "one".into(), table: table.clone() },
                Sheet { name: "two".into(), table },
            ],
        )
        .unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn write_table_infers_format() {
        let dir = TempDir::new().unwrap();
        let table = Table::from_records(&[Pair("x", "y")]);
        let format = write_table(&dir.path().join("t.md"), &table, None).unwrap();
        assert_eq!(format, OutputFormat::Markdown);

        let err = write_table(&dir.path().join("t.txt"), &table, None).unwrap_err();
        assert!(matches!(err, SinkError::UnknownFormat { .. }));
    }

    #[test]
    fn column_widths_are_capped() {
        let long = "x".repeat(200);
        let table = Table {
            columns: vec!["a".into(), "bb".into()],
            rows: vec![vec![long, "c".into()]],
        };
        assert_eq!(column_widths(&table), [80, 4]);
    }

    #[test]
    fn sheet_names_are_sanitised() {
        assert_eq!(sanitise_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitise_sheet_name("  'quoted'  "), "quoted");
        assert_eq!(sanitise_sheet_name(""), "Sheet");
        assert_eq!(sanitise_sheet_name(&"n".repeat(40)).len(), 31);
    }

    #[test]
    fn cut_sheet_name_does_not_end_in_quote_or_space() {
        let name = format!("{}' x", "n".repeat(30));
        assert_eq!(sanitise_sheet_name(&name), "n".repeat(30));

        let name = format!("{} tail", "n".repeat(30));
        assert_eq!(sanitise_sheet_name(&name), "n".repeat(30));
    }

    #[test]
    fn sheet_names_are_deduplicated() {
        let mut used = HashSet::new();
        assert_eq!(dedupe_sheet_name("Orders", &mut used), "Orders");
        assert_eq!(dedupe_sheet_name("orders", &mut used), "orders (2)");
        assert_eq!(dedupe_sheet_name("Orders", &mut used), "Orders (3)");

        let long = "L".repeat(31);
        assert_eq!(dedupe_sheet_name(&long, &mut used), long);
        let second = dedupe_sheet_name(&long, &mut used);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with(" (2)"));
    }
}
