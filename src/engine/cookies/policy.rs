//! File scheme cookie policy.
//!
//! Whether `file:` URLs may carry cookies is decided once per process: the
//! flag can be changed freely until the first cookie jar is created, after
//! which it is latched. Later calls are accepted but have no effect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// The policy consulted by [`CookieManager::instance`](crate::cookies::CookieManager::instance)
/// and [`CookieManager::new`](crate::cookies::CookieManager::new).
pub(crate) static GLOBAL_FILE_SCHEME_POLICY: FileSchemePolicy = FileSchemePolicy::new(false);

#[derive(Debug)]
pub struct FileSchemePolicy {
    accept: AtomicBool,
    frozen: AtomicBool,
    // Serializes set_accept against freeze so a change cannot slip in after the latch.
    latch: Mutex<()>,
}

impl FileSchemePolicy {
    pub const fn new(accept: bool) -> Self {
        Self {
            accept: AtomicBool::new(accept),
            frozen: AtomicBool::new(false),
            latch: Mutex::new(()),
        }
    }

    /// Current value of the flag.
    pub fn accept(&self) -> bool {
        self.accept.load(Ordering::SeqCst)
    }

    /// Changes the flag. Returns `false` (and changes nothing) once the policy is frozen.
    pub fn set_accept(&self, accept: bool) -> bool {
        let _latch = self.latch.lock().unwrap_or_else(|e| e.into_inner());
        if self.frozen.load(Ordering::SeqCst) {
            log::warn!(
                "File scheme cookie policy is already in use; ignoring change to {accept}"
            );
            return false;
        }
        self.accept.store(accept, Ordering::SeqCst);
        true
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Latches the flag and returns the value that is now in effect.
    pub fn freeze(&self) -> bool {
        let _latch = self.latch.lock().unwrap_or_else(|e| e.into_inner());
        self.frozen.store(true, Ordering::SeqCst);
        self.accept.load(Ordering::SeqCst)
    }
}

impl Default for FileSchemePolicy {
    fn default() -> Self {
        Self::new(false)
    }
}
