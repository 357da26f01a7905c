//! Core types and constants shared across the flattening pipeline.

use std::path::Path;

use clap::ValueEnum;
use serde_json::Value;

/// Composite keywords, in the order they are expanded.
pub const COMPOSITE_KEYWORDS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// HTTP methods of an OpenAPI path item, in traversal order.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "patch", "head", "options", "trace",
];

/// Constraint keywords reported in the data dictionary, in display order.
pub const CONSTRAINT_KEYWORDS: &[&str] = &[
    "pattern",
    "enum",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "uniqueItems",
];

/// Render a schema value as a table cell.
///
/// Strings are emitted verbatim, containers as compact JSON, and a missing
/// value as an empty cell.
pub fn cell_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Destination format of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pipe-delimited Markdown table.
    #[value(name = "md")]
    Markdown,
    /// UTF-8 CSV with a header row.
    Csv,
    /// Excel workbook.
    Xlsx,
}

impl OutputFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(OutputFormat::Markdown),
            "csv" => Some(OutputFormat::Csv),
            "xlsx" => Some(OutputFormat::Xlsx),
            _ => None,
        }
    }

    /// File extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

/// Options for building a data dictionary.
#[derive(Debug, Clone, Default)]
pub struct DictionaryOptions {
    /// Drop rows that repeat an earlier row exactly.
    /// Defaults to false so that every occurrence of a schema is listed.
    pub dedupe: bool,
}

impl DictionaryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set de-duplication of identical rows.
    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }
}

/// Options for combining CSV tables from a directory.
#[derive(Debug, Clone, Default)]
pub struct CombineOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Use the first table's columns for every table.
    pub strict_columns: bool,
    /// Read at most this many data rows per file.
    pub limit_rows: Option<usize>,
    /// Read only the first sheet of each workbook.
    pub first_sheet_only: bool,
}

impl CombineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn strict_columns(mut self, strict: bool) -> Self {
        self.strict_columns = strict;
        self
    }

    pub fn limit_rows(mut self, limit: Option<usize>) -> Self {
        self.limit_rows = limit;
        self
    }

    pub fn first_sheet_only(mut self, first_only: bool) -> Self {
        self.first_sheet_only = first_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_value_renders_scalars_and_containers() {
        assert_eq!(cell_value(None), "");
        assert_eq!(cell_value(Some(&json!(null))), "");
        assert_eq!(cell_value(Some(&json!("text"))), "text");
        assert_eq!(cell_value(Some(&json!(3))), "3");
        assert_eq!(cell_value(Some(&json!(true))), "true");
        assert_eq!(cell_value(Some(&json!(["a", 1]))), r#"["a",1]"#);
        assert_eq!(cell_value(Some(&json!({"k": "v"}))), r#"{"k":"v"}"#);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/table.MD")),
            Some(OutputFormat::Markdown)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("rows.csv")),
            Some(OutputFormat::Csv)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("dict.xlsx")),
            Some(OutputFormat::Xlsx)
        );
        assert_eq!(OutputFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn combine_options_builder() {
        let opts = CombineOptions::new()
            .recursive(true)
            .strict_columns(true)
            .limit_rows(Some(10))
            .first_sheet_only(true);
        assert!(opts.recursive);
        assert!(opts.first_sheet_only);
        assert!(opts.strict_columns);
        assert_eq!(opts.limit_rows, Some(10));
    }
}
