//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind the normal cookie jar.
//! - The [`CookieManager`](crate::cookies::CookieManager) only ever talks to
//!   jars; a store is reached through a
//!   [`PersistentCookieJar`](crate::cookies::PersistentCookieJar) wrapping the
//!   in-memory jar.
//! - A store loads the cookies that survived the previous run and writes
//!   snapshots of the jar's **persistent** cookies. Session cookies never reach
//!   a store.
//! - Private browsing never uses a store.
//!
//! This module exports three implementations:
//! - [`InMemoryCookieStore`]: keeps the last snapshot in memory (tests, embedders
//!   that persist elsewhere).
//! - [`JsonCookieStore`]: file-backed JSON store (good for simple setups).
//! - [`SqliteCookieStore`]: SQLite-backed store (feature `sqlite_cookie_store`).
//!
//! ## Example
//! ```rust,no_run
//! use gosub_cookies::config::{CookieManagerConfig, StoreKind};
//! use gosub_cookies::cookies::CookieManager;
//!
//! let config = CookieManagerConfig::builder()
//!     .store(StoreKind::Json("cookies.json".into()))
//!     .build()?;
//! let manager = CookieManager::new(config)?;
//! manager.flush_cookie_store();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod in_memory;
mod json;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use crate::engine::cookies::Cookie;
use crate::engine::errors::CookieError;

pub use in_memory::InMemoryCookieStore;
/// File-backed JSON cookie store.
pub use json::JsonCookieStore;
/// SQLite-backed cookie store.
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteCookieStore;

/// A cookie **store** reads and writes the persistent cookies of one jar.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
pub trait CookieStore: Send + Sync {
    /// Returns every cookie stored by the last successful [`persist`](Self::persist).
    ///
    /// An empty or missing backing file/database yields an empty list.
    fn load(&self) -> Result<Vec<Cookie>, CookieError>;

    /// Replaces the stored state with `cookies`.
    ///
    /// Callers only pass persistent cookies. Implementations replace, never merge.
    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieError>;
}
