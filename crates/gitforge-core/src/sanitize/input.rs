//! General input sanitizer.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

use crate::constants::MAX_INPUT_LENGTH;

struct DangerousPattern(Regex);

fn dangerous_patterns() -> &'static Vec<DangerousPattern> {
    static PATTERNS: OnceLock<Vec<DangerousPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let raw: &[&str] = &[
            r"\brm\b[^\s;]*\s*(?:-[a-z]+|--[a-z-]+)?\s*[^\s;]*",
            r"\bcat\b\s+/etc/[^\s;]*",
            r"\bcat\b\s+/root/[^\s;]*",
            r"\bpasswd\b\s+/etc/[^\s;]*",
            r"\bsudo\b\s+-[a-z]+\s+[^\s;]*",
            r"\bchmod\b\s+[0-7]{3,4}\s+[^\s;]*",
            r"\bchown\b\s+[^\s;]+:[^\s;]*\s+[^\s;]*",
            r"\bwget\b\s+https?://[^\s;]*",
            r"\bcurl\b\s+https?://[^\s;]*",
            r"\bnc\b\s+-[lc]\s+[^\s;]*",
            r"\bbash\b\s+-c\s+[^\s;]*",
            r"\bsh\b\s+-c\s+[^\s;]*",
            r"\bpython\b\s+-[cE]\s+[^\s;]*",
            r"\bperl\s+-e\s+[^\s;]*",
            r"/etc/passwd",
            r"/etc/shadow",
            r"/etc/sudoers",
            r"/root/",
            r"/home/",
            r"\$",
            r"`",
        ];
        raw.iter()
            .map(|p| {
                DangerousPattern(
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .expect("static dangerous pattern must compile"),
                )
            })
            .collect()
    })
}

fn shell_metacharacters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[;&|`$(){}\[\]<>\\"']"#).expect("static pattern"))
}

fn newline_and_nul() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\n\r\0]").expect("static pattern"))
}

/// Remove hyphens that are not adjacent to a word character on either side
/// (e.g. the `-` in ` - `), i.e. likely command-line flags.
///
/// The `regex` crate has no lookaround support, so this is done by hand
/// rather than via `(?<!\w)-(?!\w)`.
fn strip_standalone_hyphens(s: &str) -> String {
    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }

    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '-' {
            let prev_is_word = i > 0 && is_word_char(chars[i - 1]);
            let next_is_word = i + 1 < chars.len() && is_word_char(chars[i + 1]);
            if prev_is_word || next_is_word {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Sanitize free-form user input to prevent command injection.
///
/// NFKC-normalizes, truncates to [`MAX_INPUT_LENGTH`], strips shell
/// metacharacters and newlines/NUL, removes a denylist of dangerous command
/// patterns and sensitive path literals, strips standalone hyphen flags,
/// collapses whitespace, and trims.
pub fn sanitize_input(input: &str) -> String {
    if input.is_empty() {
        return input.to_string();
    }

    let normalized: String = input.nfkc().collect();
    let truncated: String = normalized.chars().take(MAX_INPUT_LENGTH).collect();

    let mut result = shell_metacharacters().replace_all(&truncated, "").into_owned();
    result = newline_and_nul().replace_all(&result, "").into_owned();

    for pattern in dangerous_patterns() {
        result = pattern.0.replace_all(&result, "").into_owned();
    }

    result = strip_standalone_hyphens(&result);
    result = whitespace_run().replace_all(&result, " ").into_owned();

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_normal_input() {
        assert_eq!(sanitize_input("normal input"), "normal input");
    }

    #[test]
    fn strips_command_injection_attempt() {
        let out = sanitize_input("test; rm -rf /");
        assert!(!out.contains("rm -rf"));
        assert!(!out.contains(';'));
    }

    #[test]
    fn strips_shell_metacharacters() {
        let out = sanitize_input("echo `whoami` && $(id)");
        assert!(!out.contains('`'));
        assert!(!out.contains('$'));
        assert!(!out.contains('('));
    }

    #[test]
    fn truncates_to_max_length() {
        let long = "a".repeat(MAX_INPUT_LENGTH + 500);
        assert_eq!(sanitize_input(&long).len(), MAX_INPUT_LENGTH);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert_eq!(sanitize_input(""), "");
    }

    #[test]
    fn idempotent() {
        let once = sanitize_input("test; rm -rf / && cat /etc/passwd");
        let twice = sanitize_input(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn strips_sensitive_path_literals() {
        let out = sanitize_input("cat /etc/passwd");
        assert!(!out.contains("/etc/passwd"));
    }
}
