//! Logging helpers for objfs
//!
//! objfs logs through the `tracing` macros. The levels are used as follows:
//!
//! - **WARN**: duplicate directory creates that had to be reconciled
//! - **INFO**: adapter lifecycle (backend init, namespace root ready)
//! - **DEBUG**: path resolution, direct-get fallbacks, backend list calls
//! - **TRACE**: coalescer joins, upload progress
//!
//! # Redaction
//!
//! Backend additions usually carry credentials. They are only ever logged
//! through [`LogConfig::redact_addition`], which masks values whose key looks
//! sensitive or whose content looks like a secret, and truncates the rest.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

/// Configuration for logging of backend additions.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to redact sensitive values (default: true)
    pub redact_sensitive: bool,

    /// Key patterns to redact (case-insensitive substring match)
    pub redact_keys: HashSet<String>,

    /// Maximum length of logged values before truncation (default: 64)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        let mut redact_keys = HashSet::new();
        for pattern in &[
            "PASSWORD",
            "PASSWD",
            "SECRET",
            "TOKEN",
            "KEY",
            "CREDENTIAL",
            "AUTH",
            "COOKIE",
            "SESSION",
            "SIGNATURE",
            "PRIVATE",
        ] {
            redact_keys.insert(pattern.to_string());
        }
        Self {
            redact_sensitive: true,
            redact_keys,
            max_value_length: 64,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable redaction (UNSAFE - use only for debugging)
    pub fn unsafe_disable_redaction(mut self) -> Self {
        self.redact_sensitive = false;
        self
    }

    /// Add a key pattern to redact
    pub fn redact_key(mut self, pattern: &str) -> Self {
        self.redact_keys.insert(pattern.to_uppercase());
        self
    }

    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Check if an addition key should be redacted
    pub fn should_redact_key(&self, key: &str) -> bool {
        if !self.redact_sensitive {
            return false;
        }
        let upper = key.to_uppercase();
        self.redact_keys.iter().any(|pattern| upper.contains(pattern))
    }

    /// Redact a value if it looks like a secret, truncate it otherwise
    pub fn redact_value<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if self.redact_sensitive && is_likely_secret(value) {
            return Cow::Borrowed("[REDACTED]");
        }
        self.truncate(value)
    }

    /// Render an addition for logging, one `key=value` pair per top-level field.
    ///
    /// Nested objects and arrays are summarized, never expanded.
    pub fn redact_addition(&self, addition: &Value) -> String {
        let Value::Object(fields) = addition else {
            return format!("[{}]", kind(addition));
        };
        let mut keys: Vec<&String> = fields.keys().collect();
        keys.sort();
        let pairs: Vec<String> = keys
            .into_iter()
            .map(|key| {
                let shown = match &fields[key] {
                    _ if self.should_redact_key(key) => Cow::Borrowed("[REDACTED]"),
                    Value::String(s) => self.redact_value(s),
                    v @ (Value::Null | Value::Bool(_) | Value::Number(_)) => {
                        Cow::Owned(v.to_string())
                    }
                    other => Cow::Owned(format!("[{}]", kind(other))),
                };
                format!("{}={}", sanitize_for_log(key), sanitize_for_log(&shown))
            })
            .collect();
        pairs.join(" ")
    }

    /// Truncate value if it exceeds max length
    ///
    /// Handles UTF-8 char boundaries properly to avoid panics on multi-byte chars.
    fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            Cow::Borrowed(value)
        } else {
            let mut end = self.max_value_length;
            while end > 0 && !value.is_char_boundary(end) {
                end -= 1;
            }
            Cow::Owned(format!(
                "{}...[truncated {} bytes]",
                &value[..end],
                value.len() - end
            ))
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check if a value looks like a secret (JWTs, prefixed API keys, random tokens)
fn is_likely_secret(value: &str) -> bool {
    let trimmed = value.trim();

    if trimmed.matches('.').count() == 2 {
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.iter().all(|p| p.len() > 10 && is_base64_like(p)) {
            return true;
        }
    }

    let prefixes = [
        "sk-", "sk_live_", "sk_test_", "ghp_", "gho_", "xoxb-", "xoxp-", "AKIA", "eyJ",
    ];
    for prefix in prefixes {
        if trimmed.starts_with(prefix) && trimmed.len() > prefix.len() + 10 {
            return true;
        }
    }

    trimmed.len() >= 32 && is_high_entropy(trimmed)
}

fn is_base64_like(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=' || c == '_' || c == '-'
    })
}

/// High ratio of unique chars suggests random data
fn is_high_entropy(s: &str) -> bool {
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return false;
    }
    let unique: HashSet<char> = s.chars().collect();
    let ratio = unique.len() as f64 / s.len() as f64;
    ratio > 0.5 && unique.len() > 15
}

/// Escape characters that could forge extra log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
