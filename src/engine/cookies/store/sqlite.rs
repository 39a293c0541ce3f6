//! SQLite-backed cookie store.
//!
//! `SqliteCookieStore` persists the normal jar's cookies in a single SQLite
//! database, one row per cookie.
//!
//! ## Design
//! - One **table** (`cookies`), keyed by `(domain, path, name)`.
//! - `persist` **rewrites** the table (DELETE + INSERT) inside one transaction,
//!   so readers only ever see a complete snapshot.
//! - Timestamps are stored as unix seconds; sub-second precision is dropped.
//! - Database access is via an `r2d2` pool for safe multi-threaded use.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{self, params, types::Type};
use r2d2_sqlite::SqliteConnectionManager;
use time::OffsetDateTime;

use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::Cookie;
use crate::engine::errors::CookieError;

/// A SQLite-based cookie store that persists cookies across sessions.
pub struct SqliteCookieStore {
    /// Connection pool for SQLite database (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteCookieStore {
    /// Opens (or creates) a SQLite database at `path` and ensures the schema exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CookieError> {
        let manager = SqliteConnectionManager::file(path.as_ref());
        let pool = Pool::new(manager)?;

        {
            let conn = pool.get()?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS cookies (
                    domain TEXT NOT NULL,
                    path TEXT NOT NULL,
                    name TEXT NOT NULL,
                    value TEXT NOT NULL,
                    host_only INTEGER NOT NULL,
                    secure INTEGER NOT NULL,
                    http_only INTEGER NOT NULL,
                    same_site TEXT,
                    expires INTEGER,
                    creation_time INTEGER NOT NULL,
                    PRIMARY KEY (domain, path, name)
                );",
            )?;
        }

        Ok(Self { pool })
    }

    /// Borrows a pooled SQLite connection.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, CookieError> {
        Ok(self.pool.get()?)
    }
}

fn timestamp(column: usize, secs: i64) -> rusqlite::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Integer, Box::new(e)))
}

impl CookieStore for SqliteCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, CookieError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT domain, path, name, value, host_only, secure, http_only, same_site, expires, creation_time
             FROM cookies ORDER BY domain, path, name",
        )?;

        let rows = stmt.query_map([], |row| {
            let expires = match row.get::<_, Option<i64>>(8)? {
                Some(secs) => Some(timestamp(8, secs)?),
                None => None,
            };
            Ok(Cookie {
                domain: row.get(0)?,
                path: row.get(1)?,
                name: row.get(2)?,
                value: row.get(3)?,
                host_only: row.get::<_, i64>(4)? != 0,
                secure: row.get::<_, i64>(5)? != 0,
                http_only: row.get::<_, i64>(6)? != 0,
                same_site: row.get(7)?,
                expires,
                creation_time: timestamp(9, row.get(9)?)?,
            })
        })?;

        let mut cookies = Vec::new();
        for row in rows {
            match row {
                Ok(cookie) => cookies.push(cookie),
                Err(e) => log::warn!("Skipping unreadable cookie row: {e}"),
            }
        }
        Ok(cookies)
    }

    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM cookies", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO cookies
                    (domain, path, name, value, host_only, secure, http_only, same_site, expires, creation_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;

            for cookie in cookies {
                stmt.execute(params![
                    cookie.domain,
                    cookie.path,
                    cookie.name,
                    cookie.value,
                    cookie.host_only as i64,
                    cookie.secure as i64,
                    cookie.http_only as i64,
                    cookie.same_site,
                    cookie.expires.map(|t| t.unix_timestamp()),
                    cookie.creation_time.unix_timestamp(),
                ])?;
            }
        }

        tx.commit()?;
        log::debug!("Persisted {} cookies to SQLite", cookies.len());
        Ok(())
    }
}
