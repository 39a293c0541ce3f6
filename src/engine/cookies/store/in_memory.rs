use std::sync::{Mutex, PoisonError};

use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::Cookie;
use crate::engine::errors::CookieError;

/// Keeps the last persisted snapshot in memory.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    cookies: Mutex<Vec<Cookie>>,
    /// Number of snapshots written so far.
    writes: Mutex<usize>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that starts out holding `cookies`.
    pub fn with_cookies(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies: Mutex::new(cookies),
            writes: Mutex::new(0),
        }
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for InMemoryCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, CookieError> {
        Ok(self.cookies.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieError> {
        *self.cookies.lock().unwrap_or_else(PoisonError::into_inner) = cookies.to_vec();
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
