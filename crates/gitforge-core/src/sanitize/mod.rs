//! Sanitizer battery: pure functions applied at every external
//! edge before a string reaches a Git invocation, a log line, or a client.

mod branch;
mod commit;
mod input;
mod path;
mod redact;
mod url;

pub use branch::sanitize_branch_name;
pub use commit::sanitize_commit_message;
pub use input::sanitize_input;
pub use path::sanitize_path;
pub use redact::{redact_dict, redact_error};
pub use url::sanitize_remote_url;

use crate::error::AppError;

/// Strip NUL bytes from raw adapter output before it reaches the redactor.
pub fn escape_git_output(output: &str) -> String {
    output.chars().filter(|&c| c != '\0').collect()
}

/// Reject an argument whose length exceeds `max_len`.
pub fn assert_length(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.chars().count() > max_len {
        return Err(AppError::InvalidArgument(format!(
            "{field} too long: {} characters (max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Reject an empty (or whitespace-only) argument.
pub fn assert_not_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidArgument(format!("{field} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_git_output_strips_nul() {
        assert_eq!(escape_git_output("a\0b"), "ab");
    }

    #[test]
    fn assert_length_rejects_over_limit() {
        assert!(assert_length("name", "abcdef", 5).is_err());
        assert!(assert_length("name", "abcde", 5).is_ok());
    }

    #[test]
    fn assert_not_empty_rejects_blank() {
        assert!(assert_not_empty("name", "   ").is_err());
        assert!(assert_not_empty("name", "x").is_ok());
    }
}
