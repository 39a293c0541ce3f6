#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cookie file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] r2d2_sqlite::rusqlite::Error),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Unsupported cookie file version {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid cookie manager configuration: {0}")]
    Config(#[from] crate::engine::config::ConfigError),

    #[error("Cookie manager is already initialized")]
    AlreadyInitialized,
}
