//! HTTP status and error-code extraction from OpenAPI responses.
//!
//! For every operation response this collects `(error code, message)` pairs
//! from response examples and from the response schema, plus the enum values
//! declared for the error-code property. Responses with nothing to report
//! still produce one row so that every documented status appears.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::aggregate::{dedupe, group_by_key, smart_sort, sort_error_rows, Groupable};
use crate::error::ScanError;
use crate::loader::load_document;
use crate::pointer::resolve_pointer;
use crate::scan::list_files;
use crate::sink::TabularRecord;
use crate::types::{cell_value, COMPOSITE_KEYWORDS, HTTP_METHODS};

/// Media types tried first when picking a response body, in order.
pub const JSON_MIME_CANDIDATES: &[&str] = &[
    "application/json",
    "application/problem+json",
    "application/vnd.api+json",
    "text/json",
];

/// Property names holding an error code, by priority.
pub const CODE_KEYS: &[&str] = &["code", "errorCode", "error_code", "statusCode", "status_code"];

/// Property names holding a human-readable message, by priority.
pub const MESSAGE_KEYS: &[&str] = &["message", "error", "reason", "detail", "description"];

/// Document file extensions picked up by [`scan_folder`].
pub const DOCUMENT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// One line of the HTTP error table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorRow {
    pub status: String,
    pub error_code: String,
    pub description: String,
    /// Enum values of the error-code property, joined by `, `.
    pub enum_values: String,
}

impl TabularRecord for ErrorRow {
    const COLUMNS: &'static [&'static str] = &["Status", "ErrorCode", "Description", "EnumValues"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.status.clone(),
            self.error_code.clone(),
            self.description.clone(),
            self.enum_values.clone(),
        ]
    }
}

impl Groupable for ErrorRow {
    fn combine(key: &str, group: Vec<Self>) -> Self {
        let mut codes = Vec::new();
        let mut descriptions = Vec::new();
        let mut enums = Vec::new();
        for row in group {
            codes.push(row.error_code);
            descriptions.push(row.description);
            enums.extend(
                row.enum_values
                    .split(',')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            );
        }

        descriptions.retain(|d| !d.is_empty());
        descriptions.sort();
        descriptions.dedup();

        ErrorRow {
            status: key.to_string(),
            error_code: smart_sort(codes).join(", "),
            description: descriptions.join("; "),
            enum_values: smart_sort(enums).join(", "),
        }
    }
}

/// Rows for every response of every operation in `document`.
pub fn extract_error_rows(document: &Value) -> Vec<ErrorRow> {
    let mut rows = Vec::new();
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return rows;
    };

    for (path, item) in paths {
        for method in HTTP_METHODS {
            let Some(responses) = item
                .get(*method)
                .and_then(|op| op.get("responses"))
                .and_then(Value::as_object)
            else {
                continue;
            };
            for (status, response) in responses {
                let response = follow_ref(document, response);
                let (pairs, enums) = response_details(document, response);
                let enum_values = enums.join(", ");
                tracing::trace!(%path, %method, %status, pairs = pairs.len(), "response scanned");

                if pairs.is_empty() {
                    let description = if is_success(status) {
                        "Success"
                    } else {
                        "No detail found in schema/examples"
                    };
                    rows.push(ErrorRow {
                        status: status.clone(),
                        error_code: String::new(),
                        description: description.to_string(),
                        enum_values,
                    });
                    continue;
                }
                for (code, message) in pairs {
                    rows.push(ErrorRow {
                        status: status.clone(),
                        error_code: code,
                        description: message,
                        enum_values: enum_values.clone(),
                    });
                }
            }
        }
    }
    rows
}

/// Extract rows from every OpenAPI document under `dir`, recursively.
///
/// Files that fail to load are skipped with a warning; documents without an
/// `openapi` key are skipped silently.
pub fn scan_folder(dir: &Path) -> Result<Vec<ErrorRow>, ScanError> {
    let mut rows = Vec::new();
    for path in list_files(dir, DOCUMENT_EXTENSIONS, true)? {
        let document = match load_document(&path) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(path = %path.display(), "skipping: {}", e);
                continue;
            }
        };
        if document.get("openapi").is_none() {
            tracing::debug!(path = %path.display(), "not an OpenAPI document, skipping");
            continue;
        }
        let found = extract_error_rows(&document);
        tracing::debug!(path = %path.display(), rows = found.len(), "document scanned");
        rows.extend(found);
    }
    Ok(rows)
}

/// De-duplicate rows, then either collapse them to one row per status or
/// sort them.
pub fn compile_error_table(rows: Vec<ErrorRow>, group_by_status: bool) -> Vec<ErrorRow> {
    let rows = dedupe(rows);
    if group_by_status {
        group_by_key(rows, |r| r.status.clone())
    } else {
        let mut rows = rows;
        sort_error_rows(&mut rows);
        rows
    }
}

fn is_success(status: &str) -> bool {
    status
        .parse::<u16>()
        .map_or(false, |code| (200..300).contains(&code))
}

/// Follow a local `$ref`, falling back to the node itself when the reference
/// does not resolve.
fn follow_ref<'a>(document: &'a Value, node: &'a Value) -> &'a Value {
    match node.get("$ref").and_then(Value::as_str) {
        Some(pointer) => match resolve_pointer(document, pointer) {
            Ok(target) if target.is_object() => target,
            Ok(_) => node,
            Err(e) => {
                tracing::debug!("unresolved response reference: {}", e);
                node
            }
        },
        None => node,
    }
}

/// Pick the JSON body of a response, else the first media type with a schema.
fn json_content(response: &Value) -> Option<&Map<String, Value>> {
    let content = response.get("content")?.as_object()?;
    JSON_MIME_CANDIDATES
        .iter()
        .find_map(|mime| content.get(*mime).and_then(Value::as_object))
        .or_else(|| {
            content
                .values()
                .filter_map(Value::as_object)
                .find(|block| block.contains_key("schema"))
        })
}

/// `(code, message)` pairs and sorted enum values for one response.
fn response_details(document: &Value, response: &Value) -> (Vec<(String, String)>, Vec<String>) {
    let Some(content) = json_content(response) else {
        return (Vec::new(), Vec::new());
    };

    let mut pairs = example_pairs(content);
    let mut enums = Vec::new();
    if let Some(schema) = content.get("schema").filter(|s| s.is_object()) {
        let found = collect_from_schema(document, schema);
        enums = found.enums;
        pairs.extend(pair_up(found.codes, found.messages));
    }

    let mut seen = HashSet::new();
    pairs.retain(|pair| seen.insert(pair.clone()));

    enums.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    enums.dedup();
    (pairs, enums)
}

/// Pairs from named examples and the schema-level example.
fn example_pairs(content: &Map<String, Value>) -> Vec<(String, String)> {
    let named = content
        .get("examples")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|examples| examples.values())
        .filter_map(|example| example.get("value"));
    let inline = content.get("schema").and_then(|s| s.get("example"));

    named
        .chain(inline)
        .filter_map(Value::as_object)
        .filter_map(|value| {
            let code = first_string(value, CODE_KEYS);
            let message = first_string(value, MESSAGE_KEYS);
            (!code.is_empty() || !message.is_empty()).then_some((code, message))
        })
        .collect()
}

/// The first non-empty string or integer stored under one of `keys`.
fn first_string(object: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Combine schema-derived codes and messages into pairs.
///
/// Equal counts are zipped. Otherwise every code takes the first message and
/// the remaining messages stand alone.
fn pair_up(codes: Vec<String>, messages: Vec<String>) -> Vec<(String, String)> {
    if codes.is_empty() {
        return messages.into_iter().map(|m| (String::new(), m)).collect();
    }
    if messages.is_empty() {
        return codes.into_iter().map(|c| (c, String::new())).collect();
    }
    if codes.len() == messages.len() {
        return codes.into_iter().zip(messages).collect();
    }

    let first = messages[0].clone();
    let mut pairs: Vec<(String, String)> = codes.into_iter().map(|c| (c, first.clone())).collect();
    pairs.extend(messages.into_iter().skip(1).map(|m| (String::new(), m)));
    pairs
}

#[derive(Debug, Default)]
struct Collected {
    codes: Vec<String>,
    messages: Vec<String>,
    enums: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Walk the fragments of a response schema, collecting codes, messages and
/// code enums from code- and message-named properties.
fn collect_from_schema(document: &Value, schema: &Value) -> Collected {
    let mut found = Collected::default();
    for fragment in schema_fragments(document, schema) {
        if let Some(properties) = fragment.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                if !property.is_object() {
                    continue;
                }
                if CODE_KEYS.contains(&name.as_str()) {
                    if let Some(values) = property.get("enum").and_then(Value::as_array) {
                        for v in values {
                            push_unique(&mut found.enums, cell_value(Some(v)));
                        }
                    }
                    for key in ["example", "default", "const"] {
                        if let Some(v) = property.get(key).filter(|v| !v.is_null()) {
                            push_unique(&mut found.codes, cell_value(Some(v)));
                        }
                    }
                }
                if MESSAGE_KEYS.contains(&name.as_str()) {
                    for key in ["example", "default", "description"] {
                        if let Some(text) = property.get(key).and_then(Value::as_str) {
                            let text = text.trim();
                            if !text.is_empty() {
                                push_unique(&mut found.messages, text.to_string());
                            }
                        }
                    }
                }
            }
        }
        if let Some(text) = fragment.get("description").and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                push_unique(&mut found.messages, text.to_string());
            }
        }
    }
    found
}

/// Object fragments reachable from `schema` through references, array items,
/// composites and object/array/reference properties, each visited once.
fn schema_fragments<'a>(document: &'a Value, schema: &'a Value) -> Vec<&'a Map<String, Value>> {
    let mut seen: HashSet<*const Value> = HashSet::new();
    let mut fragments = Vec::new();
    let mut stack = vec![schema];

    while let Some(node) = stack.pop() {
        if !node.is_object() || !seen.insert(node as *const Value) {
            continue;
        }
        let target = follow_ref(document, node);
        if !std::ptr::eq(target, node) && !seen.insert(target as *const Value) {
            continue;
        }
        let Some(map) = target.as_object() else {
            continue;
        };
        fragments.push(map);

        let mut children: Vec<&Value> = Vec::new();
        if map.get("type").and_then(Value::as_str) == Some("array") {
            if let Some(items) = map.get("items").filter(|i| i.is_object()) {
                children.push(items);
            }
        }
        for keyword in COMPOSITE_KEYWORDS {
            if let Some(branches) = map.get(*keyword).and_then(Value::as_array) {
                children.extend(branches.iter().filter(|b| b.is_object()));
            }
        }
        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            children.extend(properties.values().filter(|p| {
                p.get("$ref").is_some()
                    || matches!(p.get("type").and_then(Value::as_str), Some("array" | "object"))
            }));
        }
        stack.extend(children.into_iter().rev());
    }
    fragments
}
