//! Branch-name sanitizer.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::{MAX_BRANCH_NAME_LENGTH, RESERVED_BRANCH_NAMES};
use crate::error::AppError;

fn shell_metacharacters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[;&|`$(){}\[\]<>\\"']"#).expect("static pattern"))
}

/// Validate and sanitize a Git branch name.
///
/// Rejects empty names, names over [`MAX_BRANCH_NAME_LENGTH`], names that
/// become empty after stripping shell metacharacters, and the reserved ref
/// names (`HEAD`, `FETCH_HEAD`, `ORIG_HEAD`, `ORIGIN_HEAD`).
pub fn sanitize_branch_name(name: &str) -> Result<String, AppError> {
    if name.is_empty() {
        return Err(AppError::InvalidArgument(
            "Branch name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_BRANCH_NAME_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "Branch name too long: {} characters (max {})",
            name.chars().count(),
            MAX_BRANCH_NAME_LENGTH
        )));
    }

    let stripped = shell_metacharacters().replace_all(name, "").into_owned();
    let result = stripped.trim().to_string();

    if result.is_empty() {
        return Err(AppError::InvalidArgument(
            "Branch name contains only invalid characters".to_string(),
        ));
    }

    if RESERVED_BRANCH_NAMES.contains(&result.as_str()) {
        return Err(AppError::InvalidArgument(format!(
            "Reserved branch name: {result}"
        )));
    }

    Ok(result)
}
