//! Provider credential handling
//!
//! Credentials are caller-supplied per request and never stored. The
//! `ApiKey` newtype keeps the plaintext out of logs: `Debug` and
//! `Display` render only a masked suffix.

use serde::Deserialize;
use std::fmt;

/// A caller-supplied provider API key.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The plaintext key, for Authorization headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked rendering: all but the last four characters starred.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len().max(4));
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.masked())
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_last_four() {
        let key = ApiKey::new("sk-abcdef123456");
        assert_eq!(key.masked(), "**********3456");
    }

    #[test]
    fn short_keys_are_fully_masked() {
        assert_eq!(ApiKey::new("abc").masked(), "****");
        assert_eq!(ApiKey::new("abcd").masked(), "****");
    }

    #[test]
    fn debug_never_shows_plaintext() {
        let key = ApiKey::new("sk-secret-value-9999");
        let rendered = format!("{:?} {}", key, key);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("9999"));
    }

    #[test]
    fn deserializes_from_a_bare_string() {
        let key: ApiKey = serde_json::from_str("\"sk-test\"").unwrap();
        assert_eq!(key.expose(), "sk-test");
    }
}
