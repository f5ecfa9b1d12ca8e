//! LAN server address normalization.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

fn api_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"(?:/api)?/*$").expect("Invalid regex"))
}

/// Base address of a LAN server, without the `/api` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerUrl(String);

impl ServerUrl {
    /// Normalize user input such as `192.168.1.5:3000`, `http://host/api/`
    /// or `https://quiz.local`.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = normalize_text_option(Some(raw.to_string()))
            .ok_or_else(|| Error::Validation("server address is required".to_string()))?;

        let with_scheme = if is_http_url(&value) {
            value
        } else {
            format!("http://{value}")
        };
        let base = api_suffix().replace(&with_scheme, "").into_owned();

        let host = base
            .split_once("://")
            .map_or("", |(_, rest)| rest)
            .trim_matches('/');
        if host.is_empty() || host.contains(char::is_whitespace) {
            return Err(Error::Validation(format!(
                "invalid server address: {}",
                raw.trim()
            )));
        }

        Ok(Self(base))
    }

    /// Server reached on `host:port` over plain HTTP.
    pub fn from_host(host: &str, port: u16) -> Self {
        Self(format!("http://{host}:{port}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base of the REST API (`<server>/api`).
    pub fn api_base(&self) -> String {
        format!("{}/api", self.0)
    }

    /// Full URL of an API route; `route` starts with `/`.
    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/api{route}", self.0)
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_adds_scheme_and_strips_api_suffix() {
        let url = ServerUrl::parse(" 192.168.1.100:3000/api/ ").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.100:3000");
        assert_eq!(url.api_base(), "http://192.168.1.100:3000/api");
    }

    #[test]
    fn parse_keeps_https_and_paths() {
        let url = ServerUrl::parse("https://quiz.example.com/school/").unwrap();
        assert_eq!(url.as_str(), "https://quiz.example.com/school");
        assert_eq!(
            url.endpoint("/shared-quizzes"),
            "https://quiz.example.com/school/api/shared-quizzes"
        );
    }

    #[test]
    fn parse_accepts_saved_api_base() {
        let url = ServerUrl::parse("http://localhost:3000/api").unwrap();
        assert_eq!(url, ServerUrl::from_host("localhost", 3000));
    }

    #[test]
    fn parse_rejects_empty_values() {
        assert!(matches!(ServerUrl::parse("   "), Err(Error::Validation(_))));
        assert!(matches!(ServerUrl::parse("http://"), Err(Error::Validation(_))));
        assert!(matches!(ServerUrl::parse("http:///api"), Err(Error::Validation(_))));
    }
}
