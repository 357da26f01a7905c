//! Local JSON Pointer resolution (RFC 6901).

use serde_json::Value;

use crate::error::PointerError;

/// Resolve a local reference such as `#/components/schemas/Pet` against a
/// document root.
///
/// `#` alone yields the root. Segments are unescaped (`~1` then `~0`) and
/// index into mappings by key and into sequences by integer position.
///
/// # Errors
///
/// - `UnsupportedReferenceKind` if the pointer does not start with `#`
///   (external files and remote URLs are not supported).
/// - `PointerNotFound` for a missing key or an out-of-range index.
/// - `InvalidPointerSegment` for a non-numeric sequence index or an attempt
///   to descend into a scalar.
pub fn resolve_pointer<'a>(document: &'a Value, pointer: &str) -> Result<&'a Value, PointerError> {
    let Some(rest) = pointer.strip_prefix('#') else {
        return Err(PointerError::UnsupportedReferenceKind {
            reference: pointer.to_string(),
        });
    };
    if rest.is_empty() {
        return Ok(document);
    }
    let Some(rest) = rest.strip_prefix('/') else {
        return Err(PointerError::InvalidPointerSegment {
            pointer: pointer.to_string(),
            segment: rest.to_string(),
        });
    };

    let mut current = document;
    for raw in rest.split('/') {
        let segment = unescape_segment(raw);
        current = match current {
            Value::Object(map) => {
                map.get(&segment)
                    .ok_or_else(|| PointerError::PointerNotFound {
                        pointer: pointer.to_string(),
                    })?
            }
            Value::Array(items) => {
                let index: usize =
                    segment
                        .parse()
                        .map_err(|_| PointerError::InvalidPointerSegment {
                            pointer: pointer.to_string(),
                            segment: segment.clone(),
                        })?;
                items.get(index).ok_or_else(|| PointerError::PointerNotFound {
                    pointer: pointer.to_string(),
                })?
            }
            _ => {
                return Err(PointerError::InvalidPointerSegment {
                    pointer: pointer.to_string(),
                    segment,
                })
            }
        };
    }
    Ok(current)
}

/// Decode one pointer segment: `~1` becomes `/`, then `~0` becomes `~`.
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Encode a key for use as a pointer segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "components": {
                "schemas": {
                    "Pet": { "type": "object" },
                    "a/b": { "type": "string" },
                    "m~n": { "type": "integer" }
                }
            },
            "tags": [ { "name": "pets" }, { "name": "store" } ],
            "openapi": "3.0.3"
        })
    }

    #[test]
    fn root_pointer_returns_document() {
        let doc = doc();
        assert_eq!(resolve_pointer(&doc, "#").unwrap(), &doc);
    }

    #[test]
    fn resolves_nested_keys() {
        let doc = doc();
        let pet = resolve_pointer(&doc, "#/components/schemas/Pet").unwrap();
        assert_eq!(pet, &doc["components"]["schemas"]["Pet"]);
    }

    #[test]
    fn resolves_array_indices() {
        let doc = doc();
        assert_eq!(resolve_pointer(&doc, "#/tags/1/name").unwrap(), "store");
    }

    #[test]
    fn unescapes_segments() {
        let doc = doc();
        assert_eq!(
            resolve_pointer(&doc, "#/components/schemas/a~1b/type").unwrap(),
            "string"
        );
        assert_eq!(
            resolve_pointer(&doc, "#/components/schemas/m~0n/type").unwrap(),
            "integer"
        );
    }

    #[test]
    fn tilde_one_is_not_double_decoded() {
        let doc = json!({ "~1": "literal", "/": "slash" });
        // "~01" decodes to "~1", not "/"
        assert_eq!(resolve_pointer(&doc, "#/~01").unwrap(), "literal");
    }

    #[test]
    fn external_reference_is_unsupported() {
        let doc = doc();
        let err = resolve_pointer(&doc, "other.json#/Pet").unwrap_err();
        assert!(matches!(err, PointerError::UnsupportedReferenceKind { .. }));
        let err = resolve_pointer(&doc, "https://example.com/schema.json").unwrap_err();
        assert!(matches!(err, PointerError::UnsupportedReferenceKind { .. }));
    }

    #[test]
    fn missing_key_is_not_found() {
        let doc = doc();
        let err = resolve_pointer(&doc, "#/components/schemas/Missing").unwrap_err();
        assert_eq!(
            err,
            PointerError::PointerNotFound {
                pointer: "#/components/schemas/Missing".into()
            }
        );
    }

    #[test]
    fn index_out_of_range_is_not_found() {
        let doc = doc();
        let err = resolve_pointer(&doc, "#/tags/5").unwrap_err();
        assert!(matches!(err, PointerError::PointerNotFound { .. }));
    }

    #[test]
    fn non_numeric_index_is_invalid() {
        let doc = doc();
        let err = resolve_pointer(&doc, "#/tags/first").unwrap_err();
        assert_eq!(
            err,
            PointerError::InvalidPointerSegment {
                pointer: "#/tags/first".into(),
                segment: "first".into()
            }
        );
    }

    #[test]
    fn descending_into_scalar_is_invalid() {
        let doc = doc();
        let err = resolve_pointer(&doc, "#/openapi/version").unwrap_err();
        assert!(matches!(err, PointerError::InvalidPointerSegment { .. }));
    }

    #[test]
    fn escape_round_trips_through_resolution() {
        let doc = doc();
        let pointer = format!("#/components/schemas/{}", escape_segment("a/b"));
        assert_eq!(pointer, "#/components/schemas/a~1b");
        assert!(resolve_pointer(&doc, &pointer).is_ok());
    }
}
