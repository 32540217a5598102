//! Commit-message sanitizer.

use crate::constants::MAX_COMMIT_MESSAGE_LENGTH;

/// Strip NUL bytes, truncate to [`MAX_COMMIT_MESSAGE_LENGTH`], and trim.
pub fn sanitize_commit_message(message: &str) -> String {
    let without_nul: String = message.chars().filter(|&c| c != '\0').collect();
    let truncated: String = without_nul.chars().take(MAX_COMMIT_MESSAGE_LENGTH).collect();
    truncated.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nul_bytes() {
        assert_eq!(sanitize_commit_message("hello\0world"), "helloworld");
    }

    #[test]
    fn truncates_long_messages() {
        let long = "a".repeat(MAX_COMMIT_MESSAGE_LENGTH + 100);
        assert_eq!(
            sanitize_commit_message(&long).len(),
            MAX_COMMIT_MESSAGE_LENGTH
        );
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_commit_message("  fix bug  "), "fix bug");
    }
}
