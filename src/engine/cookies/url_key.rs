//! URL key normalization.
//!
//! Jars never see raw URL strings. Every URL handed to the
//! [`CookieManager`](crate::cookies::CookieManager) is first turned into a
//! [`CanonicalAddress`]: the host and path a cookie is scoped by, plus the class
//! of scheme it was requested over. URLs that differ only in ways cookies do not
//! care about (letter case of the host, port, query, fragment, dot segments,
//! `http` vs `ws`) produce the same address.
//!
//! Input without a scheme is treated as `http`, so `"example.com/a"` and
//! `"http://example.com/a"` are the same address.

use std::fmt::Display;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlKeyError {
    #[error("empty URL")]
    Empty,

    #[error("malformed URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("URL has no host")]
    MissingHost,

    #[error("scheme '{0}' cannot carry cookies")]
    UnsupportedScheme(String),
}

/// Kind of channel a cookie address was requested over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SchemeClass {
    /// `http` and `ws`.
    Plain,
    /// `https` and `wss`. Only these addresses see `Secure` cookies.
    Secure,
    /// `file`. Only usable when file scheme cookies are enabled.
    File,
}

impl SchemeClass {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" | "ws" => Some(SchemeClass::Plain),
            "https" | "wss" => Some(SchemeClass::Secure),
            "file" => Some(SchemeClass::File),
            _ => None,
        }
    }
}

/// Normalized identity of a URL used as the lookup key into a cookie jar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalAddress {
    host: String,
    path: String,
    scheme: SchemeClass,
}

impl CanonicalAddress {
    /// Lower-cased, IDNA-encoded host without port or trailing dot. Empty for `file:` URLs.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Normalized path without query or fragment; always starts with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scheme(&self) -> SchemeClass {
        self.scheme
    }

    pub fn is_secure(&self) -> bool {
        self.scheme == SchemeClass::Secure
    }

    pub fn is_file(&self) -> bool {
        self.scheme == SchemeClass::File
    }
}

impl Display for CanonicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.scheme {
            SchemeClass::Plain => "http",
            SchemeClass::Secure => "https",
            SchemeClass::File => "file",
        };
        write!(f, "{}://{}{}", scheme, self.host, self.path)
    }
}

impl TryFrom<&Url> for CanonicalAddress {
    type Error = UrlKeyError;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        let scheme = SchemeClass::from_scheme(url.scheme())
            .ok_or_else(|| UrlKeyError::UnsupportedScheme(url.scheme().to_string()))?;

        let host = match (scheme, url.host_str()) {
            (SchemeClass::File, host) => host.unwrap_or_default().to_ascii_lowercase(),
            (_, Some(host)) if !host.is_empty() => {
                host.trim_end_matches('.').to_ascii_lowercase()
            }
            _ => return Err(UrlKeyError::MissingHost),
        };

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok(CanonicalAddress { host, path, scheme })
    }
}

/// Normalizes `raw` into the address cookies are stored under.
pub fn normalize(raw: &str) -> Result<CanonicalAddress, UrlKeyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlKeyError::Empty);
    }

    let url = if has_scheme(trimmed) {
        Url::parse(trimmed)?
    } else {
        Url::parse(&format!("http://{trimmed}"))?
    };

    CanonicalAddress::try_from(&url)
}

fn has_scheme(s: &str) -> bool {
    s.contains("://") || s.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("file:"))
}
