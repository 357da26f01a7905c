//! OpenAPI Data Dictionary
//!
//! Flattening of OpenAPI 3.x schemas into tables of data elements.
//!
//! This library resolves local `$ref` pointers, merges `allOf`/`anyOf`/`oneOf`
//! branches into a single schema, and walks the result into one flat record
//! per addressable element, with a stable dotted path.
//!
//! # Example
//!
//! ```
//! use oas_dictionary::{flatten_pointer, load_document_str};
//!
//! let document = load_document_str(r##"{
//!     "components": { "schemas": {
//!         "Base": { "type": "object", "properties": { "id": { "type": "string" } }, "required": ["id"] },
//!         "Order": {
//!             "allOf": [
//!                 { "$ref": "#/components/schemas/Base" },
//!                 { "properties": { "lines": { "type": "array", "items": {
//!                     "type": "object", "properties": { "sku": { "type": "string" } }
//!                 } } } }
//!             ]
//!         }
//!     } }
//! }"##).unwrap();
//!
//! let records = flatten_pointer(&document, "#/components/schemas/Order").unwrap();
//! let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
//! assert_eq!(paths, ["id", "lines", "lines[]", "lines[].sku"]);
//! assert!(records[0].required);
//! ```
//!
//! # Path Syntax
//!
//! | Step | Path | Leaf element |
//! |------|------|--------------|
//! | property `name` | `parent.name` | `name` |
//! | property `a.b` (or `*`) | `parent["a.b"]` | `a.b` |
//! | `additionalProperties` | `parent.*` | `*` |
//! | array items | `parent[]` | parent's leaf |
//! | tuple item `i` | `parent[i]` | parent's leaf + `[i]` |
//!
//! # Merge Rules
//!
//! Composite branches and `$ref` siblings are merged conservatively: `enum`
//! and `required` are unioned, `properties` are unioned by name, and for any
//! other keyword the first value seen wins.

mod aggregate;
mod combine;
mod dictionary;
mod error;
mod expand;
mod flatten;
mod kind;
mod loader;
mod merge;
mod pointer;
mod scan;
mod sink;
mod status;
mod types;

pub use aggregate::{dedupe, group_by_key, numeric_aware_cmp, smart_sort, sort_error_rows, Groupable};
pub use combine::{
    collect_input_files, concatenate, read_csv_table, read_tables, read_workbook_tables,
    to_sheets, SourceTable, INPUT_EXTENSIONS, SOURCE_FILE_COLUMN, SOURCE_SHEET_COLUMN,
};
pub use dictionary::{build_dictionary, DictionaryEntry};
pub use error::{InputError, LoadError, PointerError, ScanError, SinkError};
pub use expand::{expand, is_cut, Expander, Expansion, Slot};
pub use flatten::{flatten, flatten_pointer, FlatRecord, Flattener};
pub use kind::{required_names, ArrayShape, Items, ObjectShape, SchemaKind};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, resolve_path_with_dir,
    resolve_with_dir,
};
pub use merge::merge;
pub use pointer::{escape_segment, resolve_pointer, unescape_segment};
pub use scan::list_files;
pub use sink::{
    dedupe_sheet_name, render_markdown, sanitise_sheet_name, with_format_extension, write_csv,
    write_markdown, write_table, write_xlsx, Sheet, Table, TabularRecord,
};
pub use status::{compile_error_table, extract_error_rows, scan_folder, ErrorRow};
pub use types::{
    cell_value, CombineOptions, DictionaryOptions, OutputFormat,
    COMPOSITE_KEYWORDS, CONSTRAINT_KEYWORDS, HTTP_METHODS,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
