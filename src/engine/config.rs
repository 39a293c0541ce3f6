//! Cookie manager configuration.
//!
//! `CookieManagerConfig` controls how the [`CookieManager`](crate::cookies::CookieManager)
//! builds its jars and its background executor: where the normal jar is
//! persisted, when snapshots are written, and how many cookies a jar keeps
//! before evicting the oldest ones.
//!
//! The private browsing jar is never persisted, regardless of the configured store.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_cookies::config::CookieManagerConfig;
//! let cfg = CookieManagerConfig::default();
//! assert!(cfg.accept_cookies);
//! assert_eq!(cfg.max_cookies_per_host, 50);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_cookies::config::{CookieManagerConfig, PersistMode, StoreKind};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = CookieManagerConfig::builder()
//!     .store(StoreKind::Json("cookies.json".into()))
//!     .persist_mode(PersistMode::OnWrite)
//!     .worker_threads(2)
//!     .max_cookies_per_host(80)
//!     .build()?; // returns Result<CookieManagerConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns [`ConfigError`] when `worker_threads` or
//! `max_cookies_per_host` is zero, or when the per-host limit exceeds the
//! global limit.

use std::fmt;
use std::path::PathBuf;

/// Chromium's per-domain default.
pub const DEFAULT_MAX_COOKIES_PER_HOST: usize = 50;
/// Slightly lower than Chromium's 3300 so memory use stays predictable.
pub const DEFAULT_MAX_COOKIES_TOTAL: usize = 3000;

/// Backing store for the normal (non-private) cookie jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// Nothing is written to disk; cookies live as long as the process.
    InMemory,
    /// Single JSON file.
    Json(PathBuf),
    /// SQLite database (requires the `sqlite_cookie_store` feature).
    #[cfg(feature = "sqlite_cookie_store")]
    Sqlite(PathBuf),
}

/// When a persistent jar writes its snapshot to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Only when the jar is flushed.
    OnFlush,
    /// After every mutation, and again on flush if a write failed.
    OnWrite,
}

#[derive(Debug, Clone)]
pub struct CookieManagerConfig {
    /// Initial accept policy for both jars.
    pub accept_cookies: bool,
    pub store: StoreKind,
    pub persist_mode: PersistMode,
    /// Threads available to asynchronous cookie removals.
    pub worker_threads: usize,
    pub max_cookies_per_host: usize,
    pub max_cookies_total: usize,
}

impl Default for CookieManagerConfig {
    fn default() -> Self {
        Self {
            accept_cookies: true,
            store: StoreKind::InMemory,
            persist_mode: PersistMode::OnFlush,
            worker_threads: 1,
            max_cookies_per_host: DEFAULT_MAX_COOKIES_PER_HOST,
            max_cookies_total: DEFAULT_MAX_COOKIES_TOTAL,
        }
    }
}

impl CookieManagerConfig {
    pub fn builder() -> CookieManagerConfigBuilder {
        CookieManagerConfigBuilder::default()
    }

    /// Checks the limits of a config that was built by hand instead of through the builder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self)
    }
}

/// Builder for [`CookieManagerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CookieManagerConfigBuilder {
    inner: CookieManagerConfig,
}

impl CookieManagerConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieManagerConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn accept_cookies(self, on: bool) -> Self { self.map(|c| c.accept_cookies = on) }
    pub fn store(self, store: StoreKind) -> Self { self.map(|c| c.store = store) }
    pub fn persist_mode(self, mode: PersistMode) -> Self { self.map(|c| c.persist_mode = mode) }
    pub fn worker_threads(self, n: usize) -> Self { self.map(|c| c.worker_threads = n) }
    pub fn max_cookies_per_host(self, n: usize) -> Self { self.map(|c| c.max_cookies_per_host = n) }
    pub fn max_cookies_total(self, n: usize) -> Self { self.map(|c| c.max_cookies_total = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut CookieManagerConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<CookieManagerConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroWorkers,
    ZeroHostLimit,
    HostLimitAboveTotal { per_host: usize, total: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroWorkers =>
                write!(f, "worker_threads must be at least 1"),
            ConfigError::ZeroHostLimit =>
                write!(f, "max_cookies_per_host must be at least 1"),
            ConfigError::HostLimitAboveTotal { per_host, total } =>
                write!(f, "max_cookies_per_host ({per_host}) > max_cookies_total ({total})"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &CookieManagerConfig) -> Result<(), ConfigError> {
    if c.worker_threads == 0 {
        return Err(ConfigError::ZeroWorkers);
    }
    if c.max_cookies_per_host == 0 {
        return Err(ConfigError::ZeroHostLimit);
    }
    if c.max_cookies_per_host > c.max_cookies_total {
        return Err(ConfigError::HostLimitAboveTotal {
            per_host: c.max_cookies_per_host,
            total: c.max_cookies_total,
        });
    }
    Ok(())
}
