//! Cookie core types.
//!
//! This module defines the **type-erased handles** used by the manager, the
//! serializable [`Cookie`] record and the [`PrivacyMode`] that pins every
//! operation to one jar.
//!
//! # Concurrency model
//! - [`CookieJarHandle`] is `Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!   - Callers take a **read lock** for non-mutating operations and a **write lock**
//!     for mutating operations on the underlying jar.
//! - [`CookieStoreHandle`] is `Arc<dyn CookieStore + Send + Sync>`.
//!   - Stores manage their **own internal synchronization** (`Mutex`, connection
//!     pools, etc.). The trait methods take `&self`.
//!
//! The [`Cookie`] struct is used for persistence/inspection and can be (de)serialized
//! via `serde` to JSON or other formats.
//!
//! ```rust
//! use gosub_cookies::cookies::Cookie;
//! use time::macros::datetime;
//!
//! let c = Cookie {
//!     name: "session".into(),
//!     value: "abc123".into(),
//!     domain: "example.com".into(),
//!     path: "/".into(),
//!     host_only: true,
//!     secure: true,
//!     http_only: true,
//!     same_site: Some("Lax".into()),
//!     expires: Some(datetime!(2030-12-31 23:59:59 UTC)),
//!     creation_time: datetime!(2025-01-01 00:00:00 UTC),
//! };
//! assert!(c.is_persistent());
//! ```

use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::CookieJar;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;

/// A handle to a cookie jar trait.
///
/// This is a reference-counted, read/write-locked pointer to a type-erased
/// [`CookieJar`]. Obtain a **read lock** for queries and a **write lock** for
/// mutations.
pub type CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>;

/// A handle to a cookie store trait.
///
/// Store implementations must be **`Send + Sync` and internally synchronized**,
/// since callers hold only `&self` when invoking trait methods.
pub type CookieStoreHandle = Arc<dyn CookieStore + Send + Sync>;

/// Selects which of the two isolated jars an operation runs against.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrivacyMode {
    #[default]
    Normal,
    /// Private browsing. Its jar is never persisted and never shares cookies with `Normal`.
    Private,
}

impl PrivacyMode {
    pub fn is_private(self) -> bool {
        self == PrivacyMode::Private
    }
}

impl From<bool> for PrivacyMode {
    /// Maps a `private_browsing` flag onto a mode.
    fn from(private_browsing: bool) -> Self {
        if private_browsing {
            PrivacyMode::Private
        } else {
            PrivacyMode::Normal
        }
    }
}

impl Display for PrivacyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivacyMode::Normal => write!(f, "normal"),
            PrivacyMode::Private => write!(f, "private"),
        }
    }
}

/// A cookie as stored/serialized by the jars.
///
/// This structure captures the essential attributes of an HTTP cookie and
/// is suitable for persistence (e.g., JSON, SQLite) via `serde`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive).
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain the cookie is scoped to, without a leading dot. Empty for `file:` cookies.
    pub domain: String,

    /// Path scoping (e.g., `"/"`).
    pub path: String,

    /// If `true`, the cookie is only returned for exactly `domain`, never for subdomains.
    pub host_only: bool,

    /// If `true`, cookie is returned only for secure schemes.
    pub secure: bool,

    /// If `true`, cookie is blocked from access by client-side scripts (`document.cookie`).
    pub http_only: bool,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    pub same_site: Option<String>,

    /// Expiration timestamp. Session cookies have `None`.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,

    /// When the cookie was first stored. Replacing a cookie keeps the original value.
    #[serde(with = "time::serde::rfc3339")]
    pub creation_time: OffsetDateTime,
}

impl Cookie {
    /// Session cookies have no expiry and are never written to a store.
    pub fn is_session(&self) -> bool {
        self.expires.is_none()
    }

    pub fn is_persistent(&self) -> bool {
        self.expires.is_some()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Name/value pair in `Cookie` request header form.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn cookie(expires: Option<OffsetDateTime>) -> Cookie {
        Cookie {
            name: "a".into(),
            value: "1".into(),
            domain: "example.com".into(),
            path: "/".into(),
            host_only: true,
            secure: false,
            http_only: false,
            same_site: None,
            expires,
            creation_time: datetime!(2024-01-01 00:00:00 UTC),
        }
    }

    #[test]
    fn privacy_mode_from_flag() {
        assert_eq!(PrivacyMode::from(false), PrivacyMode::Normal);
        assert_eq!(PrivacyMode::from(true), PrivacyMode::Private);
        assert!(PrivacyMode::Private.is_private());
        assert_eq!(PrivacyMode::default(), PrivacyMode::Normal);
        assert_eq!(PrivacyMode::Private.to_string(), "private");
    }

    #[test]
    fn session_and_expiry_flags() {
        let now = datetime!(2025-06-01 12:00:00 UTC);

        let session = cookie(None);
        assert!(session.is_session());
        assert!(!session.is_expired(now));

        let past = cookie(Some(datetime!(2025-01-01 00:00:00 UTC)));
        assert!(past.is_persistent());
        assert!(past.is_expired(now));

        let future = cookie(Some(datetime!(2026-01-01 00:00:00 UTC)));
        assert!(!future.is_expired(now));
        assert_eq!(future.pair(), "a=1");
    }

    #[test]
    fn serializes_timestamps_as_rfc3339() {
        let c = cookie(Some(datetime!(2030-05-04 03:02:01 UTC)));
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("2030-05-04T03:02:01Z"), "{json}");

        let back: Cookie = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
