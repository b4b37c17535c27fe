use crate::config::schema::{BatchRequest, Operation, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Json { path: None, source } => ConfigError::Json {
                path: Some(path),
                source,
            },
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read refactor operations from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse refactor operations ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse refactor operations: {}", source),
            },
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse refactor operations TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse refactor operations TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid refactor request ({}): {}", path.display(), source),
                None => write!(f, "invalid refactor request: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Json { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Decode a raw request into a validated [`BatchRequest`].
///
/// Accepts a `{operations, options}` object, a bare array of operations or a
/// single operation. Markdown fences and prose around the payload are
/// ignored: decoding starts at the first `[`/`{` and ends at the last
/// `]`/`}`.
pub fn parse_request(raw: &str) -> Result<BatchRequest, ConfigError> {
    let payload = extract_payload(raw);
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|source| ConfigError::Json { path: None, source })?;

    let decode = |source| ConfigError::Json { path: None, source };
    let request = match value {
        serde_json::Value::Object(ref map) if map.contains_key("operations") => {
            serde_json::from_value::<BatchRequest>(value).map_err(decode)?
        }
        serde_json::Value::Array(_) => {
            BatchRequest::new(serde_json::from_value::<Vec<Operation>>(value).map_err(decode)?)
        }
        _ => BatchRequest::new(vec![serde_json::from_value::<Operation>(value).map_err(decode)?]),
    };

    request
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(request)
}

/// Decode a TOML request (`[[operations]]` tables plus optional `[options]`).
pub fn load_toml_str(input: &str) -> Result<BatchRequest, ConfigError> {
    let request: BatchRequest = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    request
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(request)
}

/// Load a request file; `.toml` files are TOML, everything else JSON.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<BatchRequest, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        load_toml_str(&contents)
    } else {
        parse_request(&contents)
    };
    parsed.map_err(|error| error.with_path(path))
}

fn extract_payload(raw: &str) -> &str {
    let start = raw.find(['[', '{']);
    let end = raw.rfind([']', '}']);
    match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENAME: &str = r#"{"operation": "rename", "selector": {"kind": "function", "name": "a", "filePath": "src/a.ts"}, "newName": "b"}"#;

    #[test]
    fn parses_all_request_shapes() {
        let object = format!(r#"{{"operations": [{RENAME}], "options": {{"stopOnError": false}}}}"#);
        let request = parse_request(&object).unwrap();
        assert_eq!(request.operations.len(), 1);
        assert!(!request.options.stop_on_error);

        let array = format!("[{RENAME}, {RENAME}]");
        let request = parse_request(&array).unwrap();
        assert_eq!(request.operations.len(), 2);
        assert!(request.options.stop_on_error);

        let single = parse_request(RENAME).unwrap();
        assert_eq!(single.operations[0].name(), "rename");
    }

    #[test]
    fn strips_fences_and_prose() {
        let raw = format!("Here are the operations:\n```json\n[{RENAME}]\n```\nDone.");
        let request = parse_request(&raw).unwrap();
        assert_eq!(request.operations.len(), 1);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_request("rename everything please").unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().starts_with("failed to parse refactor operations"));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let raw = r#"[{"operation": "inline", "selector": {"kind": "function", "name": "a", "filePath": "a.ts"}}]"#;
        assert!(matches!(parse_request(raw), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn empty_request_fails_validation() {
        let err = parse_request("[]").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn toml_request() {
        let input = r#"
[options]
stopOnError = false

[[operations]]
operation = "remove"
reason = "unused"

[operations.selector]
kind = "function"
name = "deprecatedHelper"
filePath = "src/utils.ts"
"#;
        let request = load_toml_str(input).unwrap();
        assert!(!request.options.stop_on_error);
        assert_eq!(
            request.operations[0].describe(),
            "Remove deprecatedHelper from src/utils.ts (Reason: unused)"
        );
    }

    #[test]
    fn path_is_attached_to_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.json");
        fs::write(&path, "[]").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("ops.json"));
    }
}
