//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** holds all cookies of one privacy mode. The
//! [`CookieManager`](crate::cookies::CookieManager) hands it already
//! normalized [`CanonicalAddress`]es together with raw `Set-Cookie` strings;
//! parsing attributes, deciding what gets stored and matching cookies to an
//! address is entirely up to the jar.
//!
//! This module defines the [`CookieJar`] trait and a reference implementation,
//! [`DefaultCookieJar`], which stores cookies **in memory only** (see
//! [`PersistentCookieJar`](crate::cookies::PersistentCookieJar) for persistence)
//! and follows RFC 6265 domain and path matching.
//!
//! ## Notes & limitations
//! - `Set-Cookie` strings are parsed with the `cookie` crate. `Max-Age` wins over
//!   `Expires`, and expiry dates are capped at 400 days in the future.
//! - A cookie whose expiry is already in the past deletes the cookie it would
//!   replace and is not stored.
//! - There is no public suffix list: a `Domain` attribute without a dot is only
//!   accepted when it equals the request host.
//! - Cookies are bucketed by **domain**. Each bucket holds at most
//!   `max_cookies_per_host` cookies and the jar at most `max_cookies_total`;
//!   the oldest cookies are evicted first.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
//!
//! See also: RFC 6265bis (HTTP State Management Mechanism).

use std::collections::HashMap;
use std::net::IpAddr;

use time::{Duration, OffsetDateTime};

use crate::engine::config::{DEFAULT_MAX_COOKIES_PER_HOST, DEFAULT_MAX_COOKIES_TOTAL};
use crate::engine::cookies::url_key::CanonicalAddress;
use crate::engine::cookies::Cookie;
use crate::engine::errors::CookieError;

/// Upper bound for how far in the future a cookie may expire.
const MAX_EXPIRY_DAYS: i64 = 400;

/// A cookie jar keeps the cookies for one privacy mode.
///
/// Implementations encapsulate storage, retrieval and mutation of cookies. All
/// mutations go through `&mut self`; the manager serializes them with the write
/// lock of the jar's [`CookieJarHandle`](crate::cookies::CookieJarHandle).
pub trait CookieJar: Send + Sync {
    /// Parses `encoded` (a `Set-Cookie` header value) and stores it for `address`.
    ///
    /// Returns `true` if a cookie was stored. Rejected, expired and unparsable
    /// cookies return `false`.
    fn set_cookie(&mut self, address: &CanonicalAddress, encoded: &str) -> bool;

    /// Returns the `Cookie` request header value to send for `address`, if any.
    ///
    /// Implementations should filter by domain, path, expiry and the `Secure` flag.
    fn get_cookie(&self, address: &CanonicalAddress) -> Option<String>;

    /// Returns `true` when the jar holds at least one cookie.
    fn has_cookies(&self) -> bool {
        self.cookie_count() > 0
    }

    /// Number of cookies currently held, expired ones included.
    fn cookie_count(&self) -> usize;

    /// Removes all cookies from the jar.
    fn remove_all(&mut self);

    /// Removes cookies whose expiry has passed.
    fn remove_expired(&mut self);

    /// Removes cookies without an expiry.
    fn remove_session(&mut self);

    /// Writes any unsaved state to durable storage. In-memory jars do nothing.
    fn flush(&mut self) -> Result<(), CookieError>;

    /// While `false`, new cookies are ignored. Retrieval is unaffected.
    fn set_accept_cookies(&mut self, accept: bool);

    fn accepts_cookies(&self) -> bool;
}

/// Default cookie jar which holds cookies for a single privacy mode.
///
/// This implementation is **in-memory only** and performs **no persistence**.
#[derive(Debug, Clone)]
pub struct DefaultCookieJar {
    /// Cookies bucketed by the domain they are scoped to (no leading dot).
    entries: HashMap<String, Vec<Cookie>>,
    accept: bool,
    max_per_host: usize,
    max_total: usize,
}

impl Default for DefaultCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_COOKIES_PER_HOST, DEFAULT_MAX_COOKIES_TOTAL)
    }

    pub fn with_limits(max_per_host: usize, max_total: usize) -> Self {
        DefaultCookieJar {
            entries: HashMap::new(),
            accept: true,
            max_per_host: max_per_host.max(1),
            max_total: max_total.max(1),
        }
    }

    /// Fills the jar with previously persisted cookies, dropping any that expired meanwhile.
    ///
    /// Loading ignores the accept policy.
    pub fn load(&mut self, cookies: impl IntoIterator<Item = Cookie>) {
        let now = OffsetDateTime::now_utc();
        for cookie in cookies.into_iter().filter(|c| !c.is_expired(now)) {
            self.insert(cookie);
        }
    }

    /// All stored cookies, in no particular order.
    pub fn cookies(&self) -> impl Iterator<Item = &Cookie> {
        self.entries.values().flatten()
    }

    /// Cookies that may be written to disk: persistent and not yet expired,
    /// ordered by domain, path and name.
    pub fn persistent_snapshot(&self) -> Vec<Cookie> {
        let now = OffsetDateTime::now_utc();
        let mut cookies: Vec<Cookie> = self
            .cookies()
            .filter(|c| c.is_persistent() && !c.is_expired(now))
            .cloned()
            .collect();
        cookies.sort_by(|a, b| {
            (&a.domain, &a.path, &a.name).cmp(&(&b.domain, &b.path, &b.name))
        });
        cookies
    }

    /// Stores `cookie`, replacing the one with the same domain, path and name.
    pub(crate) fn insert(&mut self, mut cookie: Cookie) {
        let bucket = self.entries.entry(cookie.domain.clone()).or_default();

        if let Some(existing) = bucket
            .iter_mut()
            .find(|c| c.name == cookie.name && c.path == cookie.path)
        {
            cookie.creation_time = existing.creation_time;
            *existing = cookie;
            return;
        }

        while bucket.len() >= self.max_per_host {
            match oldest_index(bucket) {
                Some(idx) => {
                    let evicted = bucket.remove(idx);
                    log::debug!("Evicting cookie '{}' for {}", evicted.name, evicted.domain);
                }
                None => break,
            }
        }

        bucket.push(cookie);
        self.enforce_global_limit();
    }

    fn remove_matching(&mut self, domain: &str, path: &str, name: &str) {
        if let Some(bucket) = self.entries.get_mut(domain) {
            bucket.retain(|c| c.name != name || c.path != path);
            if bucket.is_empty() {
                self.entries.remove(domain);
            }
        }
    }

    fn retain(&mut self, keep: impl Fn(&Cookie) -> bool) {
        for bucket in self.entries.values_mut() {
            bucket.retain(&keep);
        }
        self.entries.retain(|_, bucket| !bucket.is_empty());
    }

    /// Evicts the oldest cookies across all buckets until the global limit holds.
    fn enforce_global_limit(&mut self) {
        while self.cookie_count() > self.max_total {
            let oldest = self
                .entries
                .iter()
                .filter_map(|(domain, bucket)| {
                    oldest_index(bucket).map(|idx| (domain.clone(), idx, bucket[idx].creation_time))
                })
                .min_by_key(|(_, _, created)| *created);

            match oldest {
                Some((domain, idx, _)) => {
                    if let Some(bucket) = self.entries.get_mut(&domain) {
                        bucket.remove(idx);
                        if bucket.is_empty() {
                            self.entries.remove(&domain);
                        }
                    }
                }
                None => break,
            }
        }
    }

    /// Turns a `Set-Cookie` value into a [`Cookie`] scoped to `address`.
    ///
    /// Returns `None` when the value is unparsable or not allowed for `address`.
    fn parse(address: &CanonicalAddress, encoded: &str, now: OffsetDateTime) -> Option<Cookie> {
        let parsed = match cookie::Cookie::parse(encoded.to_string()) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Ignoring unparsable cookie for {address}: {e}");
                return None;
            }
        };

        if parsed.name().trim().is_empty() {
            log::debug!("Ignoring nameless cookie for {address}");
            return None;
        }

        let host = address.host();
        let (domain, host_only) = match parsed.domain().map(|d| d.trim_start_matches('.')) {
            Some(d) if !d.is_empty() => {
                let d = d.to_ascii_lowercase();
                if address.is_file() {
                    log::debug!("Ignoring cookie with Domain attribute for {address}");
                    return None;
                }
                if (!d.contains('.') && d != host) || !domain_matches(&d, host, false) {
                    log::debug!("Ignoring cookie for domain '{d}' set from {address}");
                    return None;
                }
                (d, false)
            }
            _ => (host.to_string(), true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(address.path()).to_string(),
        };

        let secure = parsed.secure().unwrap_or(false);
        if secure && !address.is_secure() {
            log::debug!("Ignoring secure cookie '{}' set from {address}", parsed.name());
            return None;
        }

        let cap = now + Duration::days(MAX_EXPIRY_DAYS);
        let expires = match parsed.max_age() {
            Some(max_age) if max_age >= Duration::days(MAX_EXPIRY_DAYS) => Some(cap),
            Some(max_age) => Some(now + max_age),
            None => parsed.expires_datetime().map(|dt| dt.min(cap)),
        };

        Some(Cookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            host_only,
            secure,
            http_only: parsed.http_only().unwrap_or(false),
            same_site: parsed.same_site().map(|s| s.to_string()),
            expires,
            creation_time: now,
        })
    }
}

impl CookieJar for DefaultCookieJar {
    fn set_cookie(&mut self, address: &CanonicalAddress, encoded: &str) -> bool {
        if !self.accept {
            log::debug!("Cookies are disabled; ignoring cookie for {address}");
            return false;
        }

        let now = OffsetDateTime::now_utc();
        let Some(cookie) = Self::parse(address, encoded, now) else {
            return false;
        };

        if cookie.is_expired(now) {
            // An already expired cookie is how servers delete one.
            self.remove_matching(&cookie.domain, &cookie.path, &cookie.name);
            return false;
        }

        self.insert(cookie);
        true
    }

    fn get_cookie(&self, address: &CanonicalAddress) -> Option<String> {
        let now = OffsetDateTime::now_utc();
        let host = address.host();

        let mut matched: Vec<&Cookie> = candidate_domains(host)
            .iter()
            .filter_map(|domain| self.entries.get(*domain))
            .flatten()
            .filter(|c| domain_matches(&c.domain, host, c.host_only))
            .filter(|c| path_matches(&c.path, address.path()))
            .filter(|c| !c.secure || address.is_secure())
            .filter(|c| !c.is_expired(now))
            .collect();

        if matched.is_empty() {
            return None;
        }

        // Longest path first, then oldest first.
        matched.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });

        Some(matched.iter().map(|c| c.pair()).collect::<Vec<_>>().join("; "))
    }

    fn cookie_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    fn remove_all(&mut self) {
        self.entries.clear();
    }

    fn remove_expired(&mut self) {
        let now = OffsetDateTime::now_utc();
        self.retain(|c| !c.is_expired(now));
    }

    fn remove_session(&mut self) {
        self.retain(Cookie::is_persistent);
    }

    fn flush(&mut self) -> Result<(), CookieError> {
        Ok(())
    }

    fn set_accept_cookies(&mut self, accept: bool) {
        self.accept = accept;
    }

    fn accepts_cookies(&self) -> bool {
        self.accept
    }
}

fn oldest_index(bucket: &[Cookie]) -> Option<usize> {
    bucket
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.creation_time)
        .map(|(i, _)| i)
}

/// The host itself and all of its parent domains.
fn candidate_domains(host: &str) -> Vec<&str> {
    let mut domains = vec![host];
    if is_ip_literal(host) {
        return domains;
    }

    let mut rest = host;
    while let Some((_, parent)) = rest.split_once('.') {
        if parent.is_empty() {
            break;
        }
        domains.push(parent);
        rest = parent;
    }
    domains
}

fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[') || host.parse::<IpAddr>().is_ok()
}

/// RFC 6265 domain matching.
fn domain_matches(cookie_domain: &str, request_host: &str, host_only: bool) -> bool {
    if cookie_domain.eq_ignore_ascii_case(request_host) {
        return true;
    }
    if host_only || is_ip_literal(request_host) {
        return false;
    }

    request_host.len() > cookie_domain.len()
        && request_host
            .get(request_host.len() - cookie_domain.len()..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(cookie_domain))
        && request_host.as_bytes()[request_host.len() - cookie_domain.len() - 1] == b'.'
}

/// RFC 6265 path matching.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }

    if let Some(rest) = request_path.strip_prefix(cookie_path) {
        return cookie_path.ends_with('/') || rest.starts_with('/');
    }

    false
}

/// RFC 6265 default path: the request path up to, not including, its last `/`.
fn default_path(request_path: &str) -> &str {
    match request_path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &request_path[..idx],
    }
}
