//! Document loading from files, strings and HTTP URLs.
//!
//! Text is parsed as JSON first and as YAML when that fails, so OpenAPI
//! documents can be supplied in either encoding. JSON nesting depth is
//! bounded only by memory; YAML input keeps the YAML parser's own limit.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Number, Value};

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Timeout for HTTP requests (60 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content is neither JSON nor YAML.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    parse_document(&content, &path.display().to_string())
}

/// Load a document from a JSON or YAML string.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    parse_document(content, "<string>")
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let text = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    parse_document(&text, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Resolve a relative path against an optional base directory.
///
/// Absolute paths and URLs are returned unchanged.
pub fn resolve_with_dir(path: &str, base_dir: Option<&Path>) -> String {
    if is_url(path) || Path::new(path).is_absolute() {
        return path.to_string();
    }
    match base_dir {
        Some(base) => base.join(path).display().to_string(),
        None => path.to_string(),
    }
}

/// Like [`resolve_with_dir`], for output paths.
pub fn resolve_path_with_dir(path: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

/// Parse text as JSON, falling back to YAML.
///
/// A YAML fallback that yields a bare scalar is rejected: any stray text is
/// valid YAML, and a document must be a mapping or a sequence.
fn parse_document(text: &str, origin: &str) -> Result<Value, LoadError> {
    let json = match parse_json(text) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(yaml) => match yaml_to_json(yaml) {
            value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
            _ => Err(LoadError::NotADocument {
                origin: origin.to_string(),
                source: json,
            }),
        },
        Err(yaml) => Err(LoadError::Parse {
            origin: origin.to_string(),
            json,
            yaml,
        }),
    }
}

/// Parse JSON without a recursion limit, growing the stack on demand.
fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

/// Convert a YAML tree to JSON.
///
/// Non-string mapping keys (OpenAPI response codes such as `200:`) are
/// stringified; tags are dropped.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                map.insert(yaml_key(key), yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => yaml_to_json(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"openapi": "3.0.3", "paths": {{}}}}"#).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["openapi"], "3.0.3");
    }

    #[test]
    fn load_document_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "openapi: 3.1.0\ninfo:\n  title: Pets\n").unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["openapi"], "3.1.0");
        assert_eq!(doc["info"]["title"], "Pets");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/openapi.yaml"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_yaml() {
        let result = load_document_str("paths: [unclosed");
        assert!(matches!(result, Err(LoadError::Parse { .. })));
    }

    #[test]
    fn load_document_rejects_bare_scalar() {
        let result = load_document_str("not a document");
        assert!(matches!(result, Err(LoadError::NotADocument { .. })));
    }

    #[test]
    fn yaml_integer_keys_become_strings() {
        let doc = load_document_str(
            "responses:\n  200:\n    description: ok\n  404:\n    description: missing\n",
        )
        .unwrap();
        let keys: Vec<&String> = doc["responses"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["200", "404"]);
    }

    #[test]
    fn yaml_preserves_key_order() {
        let doc = load_document_str("properties:\n  zeta: {}\n  alpha: {}\n  mid: {}\n").unwrap();
        let keys: Vec<&String> = doc["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn deeply_nested_json_loads() {
        let mut text = r#"{"type":"string"}"#.to_string();
        for _ in 0..200 {
            text = format!(r#"{{"properties":{{"n":{}}}}}"#, text);
        }
        let doc = load_document_str(&text).unwrap();

        let mut node = &doc;
        let mut depth = 0;
        while let Some(child) = node.get("properties").and_then(|p| p.get("n")) {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, 200);
        assert_eq!(node["type"], "string");
    }

    #[test]
    fn trailing_text_after_json_is_not_json() {
        let err = parse_json(r#"{"a": 1} x"#).unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/openapi.json"));
        assert!(is_url("HTTP://example.com/openapi.yaml"));
        assert!(!is_url("./openapi.json"));
        assert!(!is_url("/specs/openapi.json"));
    }

    #[test]
    fn resolve_with_dir_joins_relative_paths() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_with_dir("spec.json", Some(base)),
            Path::new("/work/spec.json").display().to_string()
        );
        assert_eq!(resolve_with_dir("spec.json", None), "spec.json");
        assert_eq!(
            resolve_with_dir("https://example.com/spec.json", Some(base)),
            "https://example.com/spec.json"
        );
    }

    #[test]
    fn resolve_path_with_dir_keeps_absolute() {
        let base = Path::new("/work");
        assert_eq!(
            resolve_path_with_dir(Path::new("out.csv"), Some(base)),
            PathBuf::from("/work/out.csv")
        );
        assert_eq!(
            resolve_path_with_dir(Path::new("/tmp/out.csv"), Some(base)),
            PathBuf::from("/tmp/out.csv")
        );
    }

    #[test]
    fn load_document_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let doc = load_document_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(doc["type"], "object");
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_yaml() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/openapi.yaml")
                .with_status(200)
                .with_body("openapi: 3.0.0\npaths: {}\n")
                .create();

            let doc = load_document_url(&format!("{}/openapi.yaml", server.url())).unwrap();
            assert_eq!(doc["openapi"], "3.0.0");
            mock.assert();
        }

        #[test]
        fn load_document_url_error_status() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("GET", "/missing.json")
                .with_status(404)
                .create();

            let result = load_document_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }
    }
}
