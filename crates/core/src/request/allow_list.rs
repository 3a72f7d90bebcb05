//! Wildcard allow-list for client supplied URLs.

use regex_lite::Regex;
use reqwest::Url;

/// Host patterns a URL must match to be accepted.
///
/// `*` matches any run of characters and `?` a single one; matching is
/// case-insensitive and anchored at both ends. `"*"` accepts every host.
#[derive(Debug, Clone)]
pub struct DomainAllowList {
    patterns: Vec<Regex>,
}

impl DomainAllowList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, String> {
        let patterns = patterns
            .iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Allow-list accepting any host.
    pub fn allow_all() -> Self {
        Self::new(&["*"]).unwrap_or(Self {
            patterns: Vec::new(),
        })
    }

    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(host))
    }

    /// Whether `raw` is an absolute http(s) URL with an allowed host.
    pub fn is_url_allowed(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        url.host_str()
            .map(|host| self.is_host_allowed(host))
            .unwrap_or(false)
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, String> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err("empty domain pattern".to_string());
    }

    let mut expr = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex_lite::escape(&other.to_string())),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(|e| format!("invalid domain pattern '{}': {}", pattern, e))
}
