//! Remote-URL sanitizer with SSRF defenses.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::constants::MAX_REMOTE_URL_LENGTH;
use crate::error::AppError;

const ALLOWED_PROTOCOLS: &[&str] = &["https://", "http://", "git://", "ssh://", "git@", "/"];

const LITERAL_LOOPBACK_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "0.0.0.0",
    "127.0.0.2",
    "127.1",
    "127.1.1.1",
    "0177.0.0.1",
    "0x7f.0.0.1",
    "2130706433",
];

fn has_dangerous_characters(url: &str) -> bool {
    url.chars()
        .any(|c| matches!(c, ';' | '&' | '|' | '`' | '$' | '(' | ')' | '{' | '}' | '[' | ']' | '<' | '>' | '\\' | '"' | '\'' | '\n' | '\r'))
}

/// Validate and normalize a Git remote URL.
///
/// Enforces the length cap, rejects shell metacharacters/CR/LF, restricts
/// the scheme to a whitelist, and for `http(s)` URLs applies full SSRF
/// defense: literal and obfuscated localhost detection, private/reserved IP
/// rejection, and DNS-rebinding re-checks on resolved addresses.
pub async fn sanitize_remote_url(url: &str) -> Result<String, AppError> {
    if url.chars().count() > MAX_REMOTE_URL_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "Remote URL too long: {} characters (max {})",
            url.chars().count(),
            MAX_REMOTE_URL_LENGTH
        )));
    }

    if has_dangerous_characters(url) {
        return Err(AppError::InvalidArgument(format!(
            "Invalid characters in URL: {url}"
        )));
    }

    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument("URL cannot be empty".to_string()));
    }

    let lower = trimmed.to_lowercase();
    if !ALLOWED_PROTOCOLS.iter().any(|prefix| lower.starts_with(prefix)) {
        return Err(AppError::InvalidArgument(format!(
            "Invalid URL format or unsupported protocol: {trimmed}. Allowed protocols: {}",
            ALLOWED_PROTOCOLS.join(", ")
        )));
    }

    if lower.starts_with("http://") || lower.starts_with("https://") {
        validate_http_host(trimmed).await?;
    }

    Ok(trimmed.to_string())
}

async fn validate_http_host(url: &str) -> Result<(), AppError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| AppError::InvalidArgument(format!("Invalid URL: {e}")))?;

    let Some(host) = parsed.host_str() else {
        return Ok(());
    };
    let host_lower = host.to_lowercase();

    if LITERAL_LOOPBACK_HOSTS.contains(&host_lower.as_str()) {
        return Err(AppError::InvalidArgument(format!(
            "Localhost URLs are not allowed for security reasons: {url}"
        )));
    }

    if let Ok(ip) = host_lower.parse::<IpAddr>() {
        if is_blocked_ip(&ip) {
            return Err(AppError::InvalidArgument(format!(
                "Private/local IP addresses are not allowed: {host_lower}"
            )));
        }
    } else if let Some(obfuscated) = parse_obfuscated_ipv4(&host_lower) {
        if is_blocked_ip(&IpAddr::V4(obfuscated)) {
            return Err(AppError::InvalidArgument(format!(
                "Private/local IP addresses are not allowed: {host_lower}"
            )));
        }
    } else {
        // Not an IP literal: resolve DNS and re-check every candidate
        // address to defend against DNS rebinding. A failed lookup does
        // not reject the URL (the hostname may simply not exist yet).
        let port = parsed
            .port()
            .unwrap_or(if parsed.scheme() == "https" { 443 } else { 80 });
        match tokio::net::lookup_host((host_lower.as_str(), port)).await {
            Ok(addrs) => {
                for addr in addrs {
                    if is_blocked_ip(&addr.ip()) {
                        return Err(AppError::InvalidArgument(format!(
                            "Hostname resolves to private/local IP: {host_lower} -> {}",
                            addr.ip()
                        )));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(host = %host_lower, error = %e, "Failed to resolve hostname for SSRF validation");
            }
        }
    }

    Ok(())
}

fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    ip.is_loopback()
        || ip.is_link_local()
        || ip.is_private()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || (octets[0] >= 224) // multicast/reserved space
}

fn is_blocked_ipv6(ip: &Ipv6Addr) -> bool {
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || is_ipv6_link_local(ip)
        || is_ipv6_unique_local(ip)
        // IPv4-mapped addresses inherit the IPv4 blocklist.
        || ip.to_ipv4_mapped().is_some_and(|v4| is_blocked_ipv4(&v4))
}

fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}

/// Parse decimal/hex/octal dotted-quad (and BSD shorthand) IPv4 obfuscations
/// that `std::net::Ipv4Addr::from_str` rejects, e.g. `2130706433`,
/// `0x7f.0.0.1`, `0177.0.0.1`, `127.1`.
fn parse_obfuscated_ipv4(host: &str) -> Option<Ipv4Addr> {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return None;
    }

    let mut nums = Vec::with_capacity(parts.len());
    for part in &parts {
        nums.push(parse_number_component(part)?);
    }

    let value: u32 = match nums.len() {
        1 => nums[0],
        2 => (nums[0] << 24) | (nums[1] & 0x00ff_ffff),
        3 => (nums[0] << 24) | (nums[1] << 16) | (nums[2] & 0x0000_ffff),
        4 => (nums[0] << 24) | (nums[1] << 16) | (nums[2] << 8) | nums[3],
        _ => return None,
    };

    Some(Ipv4Addr::from(value))
}

fn parse_number_component(part: &str) -> Option<u32> {
    if part.is_empty() {
        return None;
    }
    if let Some(hex) = part.strip_prefix("0x").or_else(|| part.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    if part.len() > 1 && part.starts_with('0') && part.chars().all(|c| c.is_digit(8)) {
        return u32::from_str_radix(part, 8).ok();
    }
    part.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_plain_https_url() {
        assert!(sanitize_remote_url("https://github.com/u/r").await.is_ok());
    }

    #[tokio::test]
    async fn accepts_ssh_shorthand() {
        assert!(sanitize_remote_url("git@github.com:u/r.git").await.is_ok());
    }

    #[tokio::test]
    async fn rejects_loopback_literal() {
        assert!(sanitize_remote_url("http://127.0.0.1/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_decimal_obfuscated_loopback() {
        assert!(sanitize_remote_url("http://2130706433/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_hex_obfuscated_loopback() {
        assert!(sanitize_remote_url("http://0x7f.0.0.1/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_octal_obfuscated_loopback() {
        assert!(sanitize_remote_url("http://0177.0.0.1/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_private_ipv4() {
        assert!(sanitize_remote_url("http://192.168.1.10/x").await.is_err());
    }

    #[tokio::test]
    async fn rejects_shell_metacharacters() {
        assert!(sanitize_remote_url("https://github.com/u/r;rm -rf /").await.is_err());
    }

    #[tokio::test]
    async fn rejects_unsupported_protocol() {
        assert!(sanitize_remote_url("file:///etc/passwd").await.is_err());
        assert!(sanitize_remote_url("ftp://example.com/x").await.is_err());
    }

    #[tokio::test]
    async fn boundary_length_2048_accepted_2049_rejected() {
        let suffix_len = 2048 - "https://a.example/".len();
        let ok_url = format!("https://a.example/{}", "a".repeat(suffix_len));
        assert_eq!(ok_url.chars().count(), 2048);
        assert!(sanitize_remote_url(&ok_url).await.is_ok());

        let bad_url = format!("{ok_url}a");
        assert_eq!(bad_url.chars().count(), 2049);
        assert!(sanitize_remote_url(&bad_url).await.is_err());
    }
}
