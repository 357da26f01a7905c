//! Conservative merging of schema fragments.
//!
//! | Key | Rule |
//! |-----|------|
//! | `enum` | Union, sorted by serialized length then lexically |
//! | `required` | Union, sorted lexically |
//! | `properties` | Union by name; shared names merged recursively |
//! | anything else | Copied when absent from base; base wins on conflict |
//!
//! Conflicts are never reported: the earlier-seen value is kept.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Merge `overlay` onto `base`, returning a new schema.
///
/// Non-object inputs are treated as empty schemas.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    let mut out = base.as_object().cloned().unwrap_or_default();
    let Some(overlay) = overlay.as_object() else {
        return Value::Object(out);
    };

    for (key, value) in overlay {
        match key.as_str() {
            "enum" => {
                if let Some(merged) = merge_enums(out.get("enum"), value) {
                    out.insert(key.clone(), merged);
                }
            }
            "required" => {
                if let Some(merged) = merge_required(out.get("required"), value) {
                    out.insert(key.clone(), merged);
                }
            }
            "properties" => {
                let merged = match (out.get("properties"), value) {
                    (Some(Value::Object(existing)), Value::Object(incoming)) => {
                        Some(merge_properties(existing, incoming))
                    }
                    (None, _) => Some(value.clone()),
                    // conflicting non-mapping shapes: keep base
                    _ => None,
                };
                if let Some(merged) = merged {
                    out.insert(key.clone(), merged);
                }
            }
            _ => {
                if !out.contains_key(key) {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Value::Object(out)
}

fn merge_enums(existing: Option<&Value>, incoming: &Value) -> Option<Value> {
    let mut seen = BTreeSet::new();
    let mut values: Vec<(String, Value)> = Vec::new();
    for source in [existing, Some(incoming)].into_iter().flatten() {
        let Value::Array(items) = source else {
            continue;
        };
        for item in items {
            let key = item.to_string();
            if seen.insert(key.clone()) {
                values.push((key, item.clone()));
            }
        }
    }
    if values.is_empty() {
        return None;
    }
    values.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    Some(Value::Array(values.into_iter().map(|(_, v)| v).collect()))
}

fn merge_required(existing: Option<&Value>, incoming: &Value) -> Option<Value> {
    let names: BTreeSet<&str> = [existing, Some(incoming)]
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    if names.is_empty() {
        return None;
    }
    Some(Value::Array(
        names.into_iter().map(|n| Value::String(n.to_string())).collect(),
    ))
}

fn merge_properties(existing: &Map<String, Value>, incoming: &Map<String, Value>) -> Value {
    let mut out = existing.clone();
    for (name, schema) in incoming {
        let merged = match out.get(name) {
            Some(current) => merge(current, schema),
            None => schema.clone(),
        };
        out.insert(name.clone(), merged);
    }
    Value::Object(out)
}
