use crate::engine::config::PersistMode;
use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::url_key::CanonicalAddress;
use crate::engine::cookies::{CookieJar, CookieStoreHandle};
use crate::engine::errors::CookieError;

/// A `CookieJar` decorator that writes the persistent cookies of an in-memory
/// jar to a [`CookieStore`](crate::cookies::CookieStore).
///
/// Reads are passed through. Mutations mark the jar dirty; depending on the
/// [`PersistMode`] the snapshot is written on [`flush`](CookieJar::flush) only,
/// or after every mutation as well.
pub struct PersistentCookieJar {
    /// Inner cookie jar that holds the actual cookie state.
    inner: DefaultCookieJar,
    /// Handle to the cookie store responsible for persistence.
    store_handle: CookieStoreHandle,
    mode: PersistMode,
    dirty: bool,
}

impl PersistentCookieJar {
    /// Creates a jar around `inner` without reading the store.
    pub fn new(inner: DefaultCookieJar, store_handle: CookieStoreHandle, mode: PersistMode) -> Self {
        Self {
            inner,
            store_handle,
            mode,
            dirty: false,
        }
    }

    /// Creates a jar pre-filled with the cookies currently held by `store_handle`.
    pub fn open(
        mut inner: DefaultCookieJar,
        store_handle: CookieStoreHandle,
        mode: PersistMode,
    ) -> Result<Self, CookieError> {
        let cookies = store_handle.load()?;
        log::debug!("Loaded {} persisted cookies", cookies.len());
        inner.load(cookies);
        Ok(Self::new(inner, store_handle, mode))
    }

    pub fn inner(&self) -> &DefaultCookieJar {
        &self.inner
    }

    /// `true` while there are changes the store has not seen yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshots the inner jar and persists it to the backing store.
    fn persist(&mut self) -> Result<(), CookieError> {
        let snapshot = self.inner.persistent_snapshot();
        self.store_handle.persist(&snapshot)?;
        self.dirty = false;
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if self.mode == PersistMode::OnWrite {
            // Best effort; the jar stays dirty and the next flush retries.
            if let Err(e) = self.persist() {
                log::error!("Cannot persist cookies: {e}");
            }
        }
    }
}

impl CookieJar for PersistentCookieJar {
    fn set_cookie(&mut self, address: &CanonicalAddress, encoded: &str) -> bool {
        let before = self.inner.cookie_count();
        let stored = self.inner.set_cookie(address, encoded);
        // Expired cookies store nothing but may delete an existing one.
        if stored || self.inner.cookie_count() != before {
            self.mark_dirty();
        }
        stored
    }

    fn get_cookie(&self, address: &CanonicalAddress) -> Option<String> {
        self.inner.get_cookie(address)
    }

    fn cookie_count(&self) -> usize {
        self.inner.cookie_count()
    }

    fn remove_all(&mut self) {
        self.inner.remove_all();
        self.mark_dirty();
    }

    fn remove_expired(&mut self) {
        let before = self.inner.cookie_count();
        self.inner.remove_expired();
        if self.inner.cookie_count() != before {
            self.mark_dirty();
        }
    }

    fn remove_session(&mut self) {
        // Session cookies are never part of a snapshot, so the store is unaffected.
        self.inner.remove_session();
    }

    fn flush(&mut self) -> Result<(), CookieError> {
        if !self.dirty {
            return Ok(());
        }
        self.persist()
    }

    fn set_accept_cookies(&mut self, accept: bool) {
        self.inner.set_accept_cookies(accept);
    }

    fn accepts_cookies(&self) -> bool {
        self.inner.accepts_cookies()
    }
}
