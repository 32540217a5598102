//! Argument extraction and routing: every `url` through the URL
//! sanitizer, every `branch`/`name` through the branch sanitizer, every
//! other string through the generic input sanitizer, every path through the
//! path sanitizer, every `message` through the commit-message sanitizer.

use std::path::{Path, PathBuf};

use gitforge_core::sanitize::{
    assert_not_empty, sanitize_branch_name, sanitize_commit_message, sanitize_input, sanitize_path,
    sanitize_remote_url,
};
use gitforge_core::AppError;
use serde_json::Value;

fn field<'a>(args: &'a Value, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

pub fn require_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, AppError> {
    field(args, name)
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::InvalidArgument(format!("missing required argument: {name}")))
}

pub fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    field(args, name).and_then(Value::as_str)
}

pub fn optional_bool(args: &Value, name: &str, default: bool) -> bool {
    field(args, name).and_then(Value::as_bool).unwrap_or(default)
}

pub fn optional_i64(args: &Value, name: &str) -> Option<i64> {
    field(args, name).and_then(Value::as_i64)
}

pub fn optional_f64(args: &Value, name: &str, default: f64) -> f64 {
    field(args, name).and_then(Value::as_f64).unwrap_or(default)
}

pub fn optional_usize(args: &Value, name: &str, default: usize) -> usize {
    field(args, name)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .unwrap_or(default)
}

fn require_str_array(args: &Value, name: &str) -> Result<Vec<String>, AppError> {
    let Some(raw) = field(args, name) else {
        return Err(AppError::InvalidArgument(format!("missing required argument: {name}")));
    };
    let array = raw
        .as_array()
        .ok_or_else(|| AppError::InvalidArgument(format!("{name} must be an array of strings")))?;
    array
        .iter()
        .map(|v| {
            v.as_str()
                .map(sanitize_input)
                .ok_or_else(|| AppError::InvalidArgument(format!("{name} entries must be strings")))
        })
        .collect()
}

/// `files`/`patterns`/`paths` arrays: sanitized as generic strings, not as
/// filesystem paths, since they are glob-like patterns relative to a
/// repository the adapter resolves, not paths this process touches.
pub fn string_array(args: &Value, name: &str) -> Result<Vec<String>, AppError> {
    require_str_array(args, name)
}

/// Required `branch`/`name`-shaped argument.
pub fn branch_or_name(args: &Value, name: &str) -> Result<String, AppError> {
    let raw = require_str(args, name)?;
    sanitize_branch_name(raw)
}

/// Optional `branch`/`name`-shaped argument.
pub fn optional_branch_or_name(args: &Value, name: &str) -> Result<Option<String>, AppError> {
    match optional_str(args, name) {
        Some(raw) => Ok(Some(sanitize_branch_name(raw)?)),
        None => Ok(None),
    }
}

/// Required remote URL argument (async because it resolves DNS
/// to rule out SSRF targets).
pub async fn remote_url(args: &Value, name: &str) -> Result<String, AppError> {
    let raw = require_str(args, name)?;
    sanitize_remote_url(raw).await
}

/// Required free-text argument routed through the generic input sanitizer.
pub fn input_text(args: &Value, name: &str) -> Result<String, AppError> {
    let raw = require_str(args, name)?;
    assert_not_empty(name, raw)?;
    Ok(sanitize_input(raw))
}

/// Optional free-text argument routed through the generic input sanitizer.
pub fn optional_input_text(args: &Value, name: &str) -> Option<String> {
    optional_str(args, name).map(sanitize_input)
}

/// Required commit message argument.
pub fn commit_message(args: &Value, name: &str) -> Result<String, AppError> {
    let raw = require_str(args, name)?;
    Ok(sanitize_commit_message(raw))
}

/// Optional commit/tag message argument.
pub fn optional_commit_message(args: &Value, name: &str) -> Option<String> {
    optional_str(args, name).map(sanitize_commit_message)
}

/// Required filesystem path argument, resolved against
/// `base` (the configured workspace root).
pub fn path(args: &Value, name: &str, base: &Path) -> Result<PathBuf, AppError> {
    let raw = require_str(args, name)?;
    sanitize_path(Path::new(raw), base)
}

pub fn workspace_id(args: &Value) -> Result<String, AppError> {
    let raw = require_str(args, "workspace_id")?;
    assert_not_empty("workspace_id", raw)?;
    Ok(sanitize_input(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_str_rejects_missing_field() {
        let args = json!({});
        assert!(require_str(&args, "workspace_id").is_err());
    }

    #[test]
    fn optional_bool_falls_back_to_default() {
        let args = json!({"force": true});
        assert!(optional_bool(&args, "force", false));
        assert!(!optional_bool(&args, "missing", false));
    }

    #[test]
    fn string_array_sanitizes_each_entry() {
        let args = json!({"files": ["a.rs", "b.rs"]});
        let files = string_array(&args, "files").unwrap();
        assert_eq!(files, vec!["a.rs".to_string(), "b.rs".to_string()]);
    }
}
