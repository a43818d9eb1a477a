//! Target-site match patterns.
//!
//! Syntax is `<scheme>://<host><path>`:
//! - scheme: `*` (http or https), `http`, `https`, `ws`, `wss` or `file`
//! - host: `*`, `*.` followed by a domain (the domain and all subdomains),
//!   or an exact host
//! - path: starts with `/`, `*` matches any run of characters
//!
//! The special pattern `<all_urls>` matches every http(s), ws(s) and file URL.

use crate::PatternError;
use std::fmt;
use std::str::FromStr;
use url::Url;

const ALL_URLS: &str = "<all_urls>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SchemeMatch {
    HttpOrHttps,
    Exact(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMatch {
    Any,
    DomainAndSubdomains(String),
    Exact(String),
}

/// A parsed target-site pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPattern {
    raw: String,
    scheme: SchemeMatch,
    host: HostMatch,
    path: String,
}

impl MatchPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let raw = pattern.trim().to_string();
        if raw == ALL_URLS {
            return Ok(Self {
                raw,
                scheme: SchemeMatch::Any,
                host: HostMatch::Any,
                path: "/*".to_string(),
            });
        }

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| PatternError::MissingScheme(raw.clone()))?;
        let scheme = match scheme {
            "*" => SchemeMatch::HttpOrHttps,
            "http" | "https" | "ws" | "wss" | "file" => SchemeMatch::Exact(scheme.to_string()),
            _ => return Err(PatternError::InvalidScheme(raw.clone())),
        };

        let slash = rest
            .find('/')
            .ok_or_else(|| PatternError::MissingPath(raw.clone()))?;
        let (host, path) = rest.split_at(slash);
        let host = parse_host(host, &scheme).ok_or_else(|| PatternError::InvalidHost(raw.clone()))?;

        Ok(Self {
            scheme,
            host,
            path: path.to_string(),
            raw,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `url` is covered by this pattern. Unparseable URLs never match.
    pub fn matches(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(url) => self.matches_url(&url),
            Err(_) => false,
        }
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        let scheme_ok = match &self.scheme {
            SchemeMatch::HttpOrHttps => matches!(url.scheme(), "http" | "https"),
            SchemeMatch::Exact(scheme) => url.scheme() == scheme,
            SchemeMatch::Any => matches!(url.scheme(), "http" | "https" | "ws" | "wss" | "file"),
        };
        if !scheme_ok {
            return false;
        }

        let host = url.host_str().unwrap_or("").to_ascii_lowercase();
        let host_ok = match &self.host {
            HostMatch::Any => true,
            HostMatch::Exact(expected) => host == *expected,
            HostMatch::DomainAndSubdomains(domain) => {
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        };
        if !host_ok {
            return false;
        }

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }
        glob_matches(&self.path, &path)
    }
}

impl FromStr for MatchPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_host(host: &str, scheme: &SchemeMatch) -> Option<HostMatch> {
    if host.is_empty() {
        return matches!(scheme, SchemeMatch::Exact(s) if s == "file").then_some(HostMatch::Any);
    }
    if host == "*" {
        return Some(HostMatch::Any);
    }
    if let Some(domain) = host.strip_prefix("*.") {
        if domain.is_empty() || domain.contains('*') {
            return None;
        }
        return Some(HostMatch::DomainAndSubdomains(domain.to_ascii_lowercase()));
    }
    if host.contains('*') {
        return None;
    }
    Some(HostMatch::Exact(host.to_ascii_lowercase()))
}

/// `*` matches any run of characters, everything else matches itself.
fn glob_matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, consumed)) = backtrack {
            p = star + 1;
            t = consumed + 1;
            backtrack = Some((star, consumed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
