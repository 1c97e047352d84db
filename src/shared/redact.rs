pub const REDACTED: &str = "<redacted>";

/// Replaces every occurrence of `secret` in `message`.
pub fn redact_secret(message: &str, secret: Option<&str>) -> String {
    match secret.map(str::trim).filter(|s| !s.is_empty()) {
        Some(secret) => message.replace(secret, REDACTED),
        None => message.to_string(),
    }
}
