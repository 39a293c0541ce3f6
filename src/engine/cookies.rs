// src/engine/cookies.rs
//! Cookies: [`CookieManager`], [`CookieJar`], [`CookieStore`] and backends.
//!
//! The [`CookieManager`] is the single authority callers talk to. It owns one
//! jar per [`PrivacyMode`], normalizes every URL into a [`CanonicalAddress`]
//! before a jar sees it, and counts asynchronous removals with a
//! [`PendingOperationBarrier`] so that callers can wait for them.

mod barrier;
mod cookies;
mod cookie_jar;
mod executor;
mod manager;
mod persistent_cookie_jar;
mod policy;
mod store;
pub mod url_key;

pub use barrier::PendingOperation;
pub use barrier::PendingOperationBarrier;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::CookieStoreHandle;
pub use cookies::PrivacyMode;

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use manager::CookieManager;
pub use policy::FileSchemePolicy;

pub use store::CookieStore;
pub use store::InMemoryCookieStore;
pub use store::JsonCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
pub use store::SqliteCookieStore;

pub use url_key::{normalize, CanonicalAddress, SchemeClass, UrlKeyError};
