//! The cookie manager.
//!
//! [`CookieManager`] is the single authority that accepts, validates and
//! retrieves cookies for every browsing context of the process. It owns two
//! fully isolated jars, one for normal and one for private browsing, and is the
//! only thing that ever mutates them.
//!
//! Most calls are synchronous and go straight to the selected jar. Removing
//! session cookies is the exception: it is scheduled on a background executor
//! and counted by a [`PendingOperationBarrier`], so callers that need a settled
//! jar (before flushing, before tearing down state) can block with
//! [`wait_for_cookie_operations_to_complete`](CookieManager::wait_for_cookie_operations_to_complete).
//!
//! ```rust
//! use gosub_cookies::cookies::{CookieManager, PrivacyMode};
//!
//! let manager = CookieManager::instance();
//! manager.set_cookie("http://example.com/", "theme=dark", PrivacyMode::Normal);
//! assert_eq!(
//!     manager.get_cookie("http://example.com/docs", PrivacyMode::Normal).as_deref(),
//!     Some("theme=dark"),
//! );
//! assert!(manager.get_cookie("http://example.com/", PrivacyMode::Private).is_none());
//!
//! manager.remove_session_cookie();
//! manager.wait_for_cookie_operations_to_complete();
//! assert!(!manager.has_cookies(PrivacyMode::Normal));
//! ```

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::engine::config::{CookieManagerConfig, StoreKind};
use crate::engine::cookies::barrier::PendingOperationBarrier;
use crate::engine::cookies::cookie_jar::{CookieJar, DefaultCookieJar};
use crate::engine::cookies::executor::BackgroundExecutor;
use crate::engine::cookies::persistent_cookie_jar::PersistentCookieJar;
use crate::engine::cookies::policy::{FileSchemePolicy, GLOBAL_FILE_SCHEME_POLICY};
use crate::engine::cookies::store::JsonCookieStore;
#[cfg(feature = "sqlite_cookie_store")]
use crate::engine::cookies::store::SqliteCookieStore;
use crate::engine::cookies::url_key::{normalize, CanonicalAddress};
use crate::engine::cookies::{CookieJarHandle, CookieStoreHandle, PrivacyMode};
use crate::engine::errors::CookieError;

static INSTANCE: OnceLock<CookieManager> = OnceLock::new();

pub struct CookieManager {
    normal: CookieJarHandle,
    private: CookieJarHandle,
    barrier: Arc<PendingOperationBarrier>,
    executor: BackgroundExecutor,
    /// File scheme policy latched when this manager was created.
    file_scheme: bool,
}

impl std::fmt::Debug for CookieManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieManager")
            .field("pending", &self.barrier.pending())
            .field("executor", &self.executor)
            .field("file_scheme", &self.file_scheme)
            .finish_non_exhaustive()
    }
}

impl CookieManager {
    /// Returns the process-wide manager, creating it with the default
    /// configuration on first use.
    ///
    /// Concurrent first calls construct the manager exactly once; every caller
    /// observes the same, fully built instance.
    pub fn instance() -> &'static CookieManager {
        INSTANCE.get_or_init(|| {
            log::debug!("Creating process-wide cookie manager");
            Self::in_memory(CookieManagerConfig::default(), &GLOBAL_FILE_SCHEME_POLICY)
        })
    }

    /// Installs a configured manager as the process-wide instance.
    ///
    /// Fails with [`CookieError::AlreadyInitialized`] once [`instance`](Self::instance)
    /// or `install` has already produced one.
    pub fn install(config: CookieManagerConfig) -> Result<&'static CookieManager, CookieError> {
        if INSTANCE.get().is_some() {
            return Err(CookieError::AlreadyInitialized);
        }

        let manager = Self::new(config)?;
        let mut installed = false;
        let instance = INSTANCE.get_or_init(|| {
            installed = true;
            manager
        });

        if installed {
            Ok(instance)
        } else {
            Err(CookieError::AlreadyInitialized)
        }
    }

    /// Creates a standalone manager that follows the process-wide file scheme policy.
    pub fn new(config: CookieManagerConfig) -> Result<Self, CookieError> {
        Self::with_policy(config, &GLOBAL_FILE_SCHEME_POLICY)
    }

    /// Creates a standalone manager that latches `policy` instead of the
    /// process-wide file scheme policy.
    ///
    /// The normal jar is backed by the configured store and starts out with the
    /// cookies it holds. The private jar always lives in memory.
    pub fn with_policy(config: CookieManagerConfig, policy: &FileSchemePolicy) -> Result<Self, CookieError> {
        config.validate()?;

        let normal: CookieJarHandle = match &config.store {
            StoreKind::InMemory => Arc::new(RwLock::new(Self::jar_for(&config))),
            StoreKind::Json(path) => {
                let store: CookieStoreHandle = Arc::new(JsonCookieStore::new(path.clone()));
                Self::persistent(&config, store)?
            }
            #[cfg(feature = "sqlite_cookie_store")]
            StoreKind::Sqlite(path) => {
                let store: CookieStoreHandle = Arc::new(SqliteCookieStore::new(path)?);
                Self::persistent(&config, store)?
            }
        };
        let private: CookieJarHandle = Arc::new(RwLock::new(Self::jar_for(&config)));

        Ok(Self::with_jars(config, normal, private, policy))
    }

    /// Creates a manager around caller-provided jars.
    ///
    /// The configured accept policy is applied to both jars.
    pub fn with_jars(
        config: CookieManagerConfig,
        normal: CookieJarHandle,
        private: CookieJarHandle,
        policy: &FileSchemePolicy,
    ) -> Self {
        let manager = Self {
            normal,
            private,
            barrier: Arc::new(PendingOperationBarrier::new()),
            executor: BackgroundExecutor::new(config.worker_threads),
            file_scheme: policy.freeze(),
        };
        manager.set_accept_cookie(config.accept_cookies);

        log::debug!(
            "Cookie manager ready (file scheme cookies: {}, workers: {})",
            manager.file_scheme,
            config.worker_threads
        );
        manager
    }

    fn in_memory(config: CookieManagerConfig, policy: &FileSchemePolicy) -> Self {
        let normal: CookieJarHandle = Arc::new(RwLock::new(Self::jar_for(&config)));
        let private: CookieJarHandle = Arc::new(RwLock::new(Self::jar_for(&config)));
        Self::with_jars(config, normal, private, policy)
    }

    fn jar_for(config: &CookieManagerConfig) -> DefaultCookieJar {
        DefaultCookieJar::with_limits(config.max_cookies_per_host, config.max_cookies_total)
    }

    fn persistent(config: &CookieManagerConfig, store: CookieStoreHandle) -> Result<CookieJarHandle, CookieError> {
        let jar = PersistentCookieJar::open(Self::jar_for(config), store, config.persist_mode)?;
        Ok(Arc::new(RwLock::new(jar)))
    }

    fn jar(&self, mode: PrivacyMode) -> &CookieJarHandle {
        match mode {
            PrivacyMode::Normal => &self.normal,
            PrivacyMode::Private => &self.private,
        }
    }

    fn read(&self, mode: PrivacyMode) -> RwLockReadGuard<'_, dyn CookieJar + Send + Sync + 'static> {
        self.jar(mode).read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, mode: PrivacyMode) -> RwLockWriteGuard<'_, dyn CookieJar + Send + Sync + 'static> {
        self.jar(mode).write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Normalizes `url`, or logs why it cannot carry cookies.
    fn address(&self, url: &str) -> Option<CanonicalAddress> {
        let address = match normalize(url) {
            Ok(address) => address,
            Err(e) => {
                log::error!("Ignoring cookie call for bad url '{url}': {e}");
                return None;
            }
        };

        if address.is_file() && !self.file_scheme {
            log::debug!("File scheme cookies are disabled; ignoring {address}");
            return None;
        }
        Some(address)
    }

    /// Enables or disables accepting new cookies in both jars.
    pub fn set_accept_cookie(&self, accept: bool) {
        self.write(PrivacyMode::Normal).set_accept_cookies(accept);
        self.write(PrivacyMode::Private).set_accept_cookies(accept);
    }

    pub fn accept_cookie(&self) -> bool {
        self.read(PrivacyMode::Normal).accepts_cookies()
    }

    /// Stores `value` (a `Set-Cookie` header value) for `url` in the jar of `mode`.
    ///
    /// Bad URLs are logged and otherwise ignored. Whether the cookie is kept is
    /// up to the jar.
    pub fn set_cookie(&self, url: &str, value: &str, mode: PrivacyMode) {
        let Some(address) = self.address(url) else {
            return;
        };

        let stored = self.write(mode).set_cookie(&address, value);
        log::trace!("set_cookie {address} ({mode}): stored={stored}");
    }

    /// Returns the `Cookie` header value for `url` in the jar of `mode`.
    ///
    /// Returns `None` for bad URLs and when no cookie matches.
    pub fn get_cookie(&self, url: &str, mode: PrivacyMode) -> Option<String> {
        let address = self.address(url)?;
        self.read(mode).get_cookie(&address)
    }

    pub fn has_cookies(&self, mode: PrivacyMode) -> bool {
        self.read(mode).has_cookies()
    }

    /// Removes all session cookies of the normal jar in the background.
    ///
    /// Returns immediately. Use [`wait_for_cookie_operations_to_complete`](Self::wait_for_cookie_operations_to_complete)
    /// to observe completion.
    pub fn remove_session_cookie(&self) {
        let operation = self.barrier.begin();
        let jar = Arc::clone(&self.normal);

        self.executor.execute(move || {
            jar.write().unwrap_or_else(PoisonError::into_inner).remove_session();
            log::debug!("Removed session cookies");
            drop(operation);
        });
    }

    /// Removes every cookie of the normal jar. Runs synchronously.
    pub fn remove_all_cookie(&self) {
        self.write(PrivacyMode::Normal).remove_all();
    }

    /// Removes expired cookies from the normal jar. Runs synchronously.
    pub fn remove_expired_cookie(&self) {
        self.write(PrivacyMode::Normal).remove_expired();
    }

    /// Writes the normal jar's pending changes to its store.
    ///
    /// Returns `false` when the store failed; the error is logged.
    pub fn flush_cookie_store(&self) -> bool {
        match self.write(PrivacyMode::Normal).flush() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Cannot flush cookie store: {e}");
                false
            }
        }
    }

    /// Drops every private browsing cookie, e.g. when the last private context closes.
    pub fn clear_private_browsing_cookies(&self) {
        self.write(PrivacyMode::Private).remove_all();
    }

    /// Blocks until every background cookie operation scheduled so far has finished.
    pub fn wait_for_cookie_operations_to_complete(&self) {
        self.barrier.wait_until_idle();
    }

    /// Like [`wait_for_cookie_operations_to_complete`](Self::wait_for_cookie_operations_to_complete),
    /// but gives up after `timeout`. Returns `true` if nothing is pending anymore.
    pub fn wait_for_cookie_operations_timeout(&self, timeout: Duration) -> bool {
        self.barrier.wait_until_idle_timeout(timeout)
    }

    pub fn pending_cookie_operations(&self) -> usize {
        self.barrier.pending()
    }

    /// Whether cookies for `file:` URLs are enabled process-wide.
    pub fn allow_file_scheme_cookies() -> bool {
        GLOBAL_FILE_SCHEME_POLICY.accept()
    }

    /// Enables or disables cookies for `file:` URLs process-wide.
    ///
    /// Only effective before the first manager is created. Later calls are
    /// accepted, logged and ignored.
    pub fn set_accept_file_scheme_cookies(accept: bool) {
        GLOBAL_FILE_SCHEME_POLICY.set_accept(accept);
    }

    /// The file scheme policy this manager latched on creation.
    pub fn file_scheme_cookies_enabled(&self) -> bool {
        self.file_scheme
    }
}

#[cfg(test)]
impl CookieManager {
    fn with_executor(mut self, executor: BackgroundExecutor) -> Self {
        self.executor = executor;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::thread;

    #[derive(Default)]
    struct Calls {
        remove_session: AtomicUsize,
        remove_all: AtomicUsize,
        remove_expired: AtomicUsize,
        flush: AtomicUsize,
    }

    /// Minimal jar: a cookie is visible on every path below the path it was set for.
    /// `remove_session` blocks until `gate` receives, when a gate is set.
    struct FakeJar {
        calls: Arc<Calls>,
        entries: Vec<(CanonicalAddress, String)>,
        accept: bool,
        gate: Option<Mutex<mpsc::Receiver<()>>>,
        removal_delay: Duration,
        fail_flush: bool,
    }

    impl FakeJar {
        fn new(calls: Arc<Calls>) -> Self {
            Self {
                calls,
                entries: Vec::new(),
                accept: true,
                gate: None,
                removal_delay: Duration::ZERO,
                fail_flush: false,
            }
        }

        fn handle(self) -> CookieJarHandle {
            Arc::new(RwLock::new(self))
        }
    }

    impl CookieJar for FakeJar {
        fn set_cookie(&mut self, address: &CanonicalAddress, encoded: &str) -> bool {
            if !self.accept {
                return false;
            }
            self.entries.push((address.clone(), encoded.to_string()));
            true
        }

        fn get_cookie(&self, address: &CanonicalAddress) -> Option<String> {
            let values: Vec<&str> = self
                .entries
                .iter()
                .filter(|(a, _)| a.host() == address.host() && address.path().starts_with(a.path()))
                .map(|(_, v)| v.as_str())
                .collect();
            (!values.is_empty()).then(|| values.join("; "))
        }

        fn cookie_count(&self) -> usize {
            self.entries.len()
        }

        fn remove_all(&mut self) {
            self.calls.remove_all.fetch_add(1, Ordering::SeqCst);
            self.entries.clear();
        }

        fn remove_expired(&mut self) {
            self.calls.remove_expired.fetch_add(1, Ordering::SeqCst);
        }

        fn remove_session(&mut self) {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            thread::sleep(self.removal_delay);
            self.calls.remove_session.fetch_add(1, Ordering::SeqCst);
        }

        fn flush(&mut self) -> Result<(), CookieError> {
            self.calls.flush.fetch_add(1, Ordering::SeqCst);
            if self.fail_flush {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "read-only").into());
            }
            Ok(())
        }

        fn set_accept_cookies(&mut self, accept: bool) {
            self.accept = accept;
        }

        fn accepts_cookies(&self) -> bool {
            self.accept
        }
    }

    fn manager() -> CookieManager {
        CookieManager::with_policy(CookieManagerConfig::default(), &FileSchemePolicy::new(false)).unwrap()
    }

    fn fake_manager(normal: FakeJar, workers: usize) -> CookieManager {
        let config = CookieManagerConfig::builder().worker_threads(workers).build().unwrap();
        let private = FakeJar::new(Arc::new(Calls::default())).handle();
        CookieManager::with_jars(config, normal.handle(), private, &FileSchemePolicy::new(false))
    }

    #[test]
    fn set_then_get_round_trips_in_both_modes() {
        let m = manager();

        for mode in [PrivacyMode::Normal, PrivacyMode::Private] {
            m.set_cookie("http://example.com/", &format!("{mode}=1"), mode);
            assert_eq!(m.get_cookie("http://example.com/", mode), Some(format!("{mode}=1")));
            assert!(m.has_cookies(mode));
        }
    }

    #[test]
    fn private_cookies_do_not_leak_into_normal_jar() {
        let m = manager();
        m.set_cookie("http://example.com/", "secret=1", PrivacyMode::Private);

        assert!(m.get_cookie("http://example.com/", PrivacyMode::Normal).is_none());
        assert!(!m.has_cookies(PrivacyMode::Normal));

        m.set_cookie("http://example.com/", "public=1", PrivacyMode::Normal);
        assert_eq!(m.get_cookie("http://example.com/", PrivacyMode::Private).as_deref(), Some("secret=1"));
    }

    #[test]
    fn equivalent_urls_address_the_same_cookies() {
        let m = manager();
        m.set_cookie("HTTP://Example.COM:8080/a/../", "a=1", PrivacyMode::Normal);

        assert_eq!(m.get_cookie("http://example.com/", PrivacyMode::Normal).as_deref(), Some("a=1"));
        assert_eq!(m.get_cookie("example.com", PrivacyMode::Normal).as_deref(), Some("a=1"));
        assert_eq!(m.get_cookie("ws://example.com/#frag", PrivacyMode::Normal).as_deref(), Some("a=1"));
    }

    #[test]
    fn malformed_urls_are_silent_no_ops() {
        let m = manager();

        for url in ["", "   ", "http://", "http://[::1", "ftp://example.com/"] {
            m.set_cookie(url, "a=1", PrivacyMode::Normal);
            assert!(m.get_cookie(url, PrivacyMode::Normal).is_none());
        }
        assert!(!m.has_cookies(PrivacyMode::Normal));
    }

    #[test]
    fn path_matching_is_left_to_the_jar() {
        let calls = Arc::new(Calls::default());
        let m = fake_manager(FakeJar::new(calls), 1);

        m.set_cookie("http://example.com/", "a=1", PrivacyMode::Normal);
        m.set_cookie("http://other.com/private/", "b=1", PrivacyMode::Normal);

        assert_eq!(m.get_cookie("http://example.com/path", PrivacyMode::Normal).as_deref(), Some("a=1"));
        assert_eq!(m.get_cookie("http://other.com/private/x", PrivacyMode::Normal).as_deref(), Some("b=1"));
        assert!(m.get_cookie("http://other.com/", PrivacyMode::Normal).is_none());
    }

    #[test]
    fn accept_policy_applies_to_both_jars() {
        let m = manager();
        assert!(m.accept_cookie());

        m.set_accept_cookie(false);
        assert!(!m.accept_cookie());
        m.set_cookie("http://example.com/", "a=1", PrivacyMode::Normal);
        m.set_cookie("http://example.com/", "a=1", PrivacyMode::Private);
        assert!(!m.has_cookies(PrivacyMode::Normal));
        assert!(!m.has_cookies(PrivacyMode::Private));

        m.set_accept_cookie(true);
        m.set_cookie("http://example.com/", "a=1", PrivacyMode::Normal);
        assert!(m.has_cookies(PrivacyMode::Normal));
    }

    #[test]
    fn configured_accept_policy_is_applied_on_creation() {
        let config = CookieManagerConfig::builder().accept_cookies(false).build().unwrap();
        let m = CookieManager::with_policy(config, &FileSchemePolicy::new(false)).unwrap();
        assert!(!m.accept_cookie());
    }

    #[test]
    fn remove_session_cookie_is_observed_through_the_barrier() {
        let m = manager();
        m.set_cookie("http://example.com/", "session=1", PrivacyMode::Normal);
        m.set_cookie("http://example.com/", "keep=1; Max-Age=3600", PrivacyMode::Normal);
        m.set_cookie("http://example.com/", "private=1", PrivacyMode::Private);

        m.remove_session_cookie();
        m.wait_for_cookie_operations_to_complete();

        assert_eq!(m.pending_cookie_operations(), 0);
        assert_eq!(m.get_cookie("http://example.com/", PrivacyMode::Normal).as_deref(), Some("keep=1"));
        // the private jar is not touched
        assert!(m.has_cookies(PrivacyMode::Private));
    }

    #[test]
    fn wait_returns_after_every_concurrent_removal_ran() {
        const N: usize = 16;
        let calls = Arc::new(Calls::default());
        let mut jar = FakeJar::new(calls.clone());
        jar.removal_delay = Duration::from_millis(5);
        let m = Arc::new(fake_manager(jar, 4));

        let callers: Vec<_> = (0..N)
            .map(|_| {
                let m = Arc::clone(&m);
                thread::spawn(move || m.remove_session_cookie())
            })
            .collect();
        for caller in callers {
            caller.join().unwrap();
        }

        m.wait_for_cookie_operations_to_complete();
        assert_eq!(calls.remove_session.load(Ordering::SeqCst), N);
        assert_eq!(m.pending_cookie_operations(), 0);
    }

    #[test]
    fn timed_wait_gives_up_while_a_removal_is_blocked() {
        let calls = Arc::new(Calls::default());
        let (release, gate) = mpsc::channel();
        let mut jar = FakeJar::new(calls.clone());
        jar.gate = Some(Mutex::new(gate));
        let m = fake_manager(jar, 1);

        m.remove_session_cookie();
        assert!(!m.wait_for_cookie_operations_timeout(Duration::from_millis(50)));
        assert_eq!(m.pending_cookie_operations(), 1);

        release.send(()).unwrap();
        assert!(m.wait_for_cookie_operations_timeout(Duration::from_secs(5)));
        assert_eq!(calls.remove_session.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synchronous_removals_bypass_the_barrier() {
        let calls = Arc::new(Calls::default());
        let m = fake_manager(FakeJar::new(calls.clone()), 1).with_executor(BackgroundExecutor::inline());

        m.remove_all_cookie();
        m.remove_expired_cookie();
        assert!(m.flush_cookie_store());

        // done by the time the calls return, and never counted
        assert_eq!(calls.remove_all.load(Ordering::SeqCst), 1);
        assert_eq!(calls.remove_expired.load(Ordering::SeqCst), 1);
        assert_eq!(calls.flush.load(Ordering::SeqCst), 1);
        assert_eq!(m.pending_cookie_operations(), 0);

        m.remove_session_cookie();
        assert_eq!(calls.remove_session.load(Ordering::SeqCst), 1);
        assert_eq!(m.pending_cookie_operations(), 0);
    }

    #[test]
    fn flush_failure_is_reported_as_false() {
        let calls = Arc::new(Calls::default());
        let mut jar = FakeJar::new(calls);
        jar.fail_flush = true;
        let m = fake_manager(jar, 1);

        assert!(!m.flush_cookie_store());
    }

    #[test]
    fn clear_private_browsing_cookies_leaves_normal_jar() {
        let m = manager();
        m.set_cookie("http://example.com/", "n=1", PrivacyMode::Normal);
        m.set_cookie("http://example.com/", "p=1", PrivacyMode::Private);

        m.clear_private_browsing_cookies();
        assert!(!m.has_cookies(PrivacyMode::Private));
        assert!(m.has_cookies(PrivacyMode::Normal));
    }

    #[test]
    fn remove_all_and_expired_only_touch_normal_jar() {
        let m = manager();
        m.set_cookie("http://example.com/", "n=1", PrivacyMode::Normal);
        m.set_cookie("http://example.com/", "p=1", PrivacyMode::Private);

        m.remove_expired_cookie();
        assert!(m.has_cookies(PrivacyMode::Normal));

        m.remove_all_cookie();
        assert!(!m.has_cookies(PrivacyMode::Normal));
        assert!(m.has_cookies(PrivacyMode::Private));
    }

    #[test]
    fn file_scheme_cookies_follow_the_latched_policy() {
        let policy = FileSchemePolicy::new(false);
        let m = CookieManager::with_policy(CookieManagerConfig::default(), &policy).unwrap();

        // too late: the manager already latched `false`
        assert!(!policy.set_accept(true));
        assert!(!m.file_scheme_cookies_enabled());
        m.set_cookie("file:///tmp/page.html", "f=1", PrivacyMode::Normal);
        assert!(m.get_cookie("file:///tmp/page.html", PrivacyMode::Normal).is_none());
        assert!(!m.has_cookies(PrivacyMode::Normal));

        let policy = FileSchemePolicy::new(false);
        assert!(policy.set_accept(true));
        let m = CookieManager::with_policy(CookieManagerConfig::default(), &policy).unwrap();
        assert!(m.file_scheme_cookies_enabled());
        m.set_cookie("file:///tmp/page.html", "f=1", PrivacyMode::Normal);
        assert_eq!(m.get_cookie("file:///tmp/other.html", PrivacyMode::Normal).as_deref(), Some("f=1"));
    }

    #[test]
    fn json_store_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = CookieManagerConfig::builder()
            .store(StoreKind::Json(dir.path().join("cookies.json")))
            .build()
            .unwrap();

        {
            let m = CookieManager::with_policy(config.clone(), &FileSchemePolicy::new(false)).unwrap();
            m.set_cookie("http://example.com/", "session=1", PrivacyMode::Normal);
            m.set_cookie("http://example.com/", "keep=1; Max-Age=3600", PrivacyMode::Normal);
            m.set_cookie("http://example.com/", "private=1; Max-Age=3600", PrivacyMode::Private);
            assert!(m.flush_cookie_store());
        }

        let m = CookieManager::with_policy(config, &FileSchemePolicy::new(false)).unwrap();
        assert_eq!(m.get_cookie("http://example.com/", PrivacyMode::Normal).as_deref(), Some("keep=1"));
        assert!(!m.has_cookies(PrivacyMode::Private));
    }

    #[cfg(feature = "sqlite_cookie_store")]
    #[test]
    fn sqlite_store_persists_on_write() {
        use crate::engine::config::PersistMode;

        let dir = tempfile::tempdir().unwrap();
        let config = CookieManagerConfig::builder()
            .store(StoreKind::Sqlite(dir.path().join("cookies.sqlite")))
            .persist_mode(PersistMode::OnWrite)
            .build()
            .unwrap();

        {
            let m = CookieManager::with_policy(config.clone(), &FileSchemePolicy::new(false)).unwrap();
            m.set_cookie("https://example.com/", "keep=1; Max-Age=3600; Secure", PrivacyMode::Normal);
            // no flush
        }

        let m = CookieManager::with_policy(config, &FileSchemePolicy::new(false)).unwrap();
        assert_eq!(m.get_cookie("https://example.com/", PrivacyMode::Normal).as_deref(), Some("keep=1"));
        assert!(m.get_cookie("http://example.com/", PrivacyMode::Normal).is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CookieManagerConfig { worker_threads: 0, ..CookieManagerConfig::default() };
        let err = CookieManager::with_policy(config, &FileSchemePolicy::new(false)).unwrap_err();
        assert!(matches!(err, CookieError::Config(_)));
    }

    #[test]
    fn manager_can_be_dropped_inside_async_code() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let m = manager();
            m.set_cookie("http://example.com/", "a=1", PrivacyMode::Normal);
            m.remove_session_cookie();
            assert!(m.wait_for_cookie_operations_timeout(Duration::from_secs(5)));
            assert!(!m.has_cookies(PrivacyMode::Normal));
            drop(m);
        });
    }

    #[test]
    fn singleton_is_shared_across_threads() {
        let addresses: Vec<usize> = (0..8)
            .map(|_| thread::spawn(|| CookieManager::instance() as *const CookieManager as usize))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect();

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert!(matches!(
            CookieManager::install(CookieManagerConfig::default()),
            Err(CookieError::AlreadyInitialized)
        ));

        // the process-wide policy is latched once the singleton exists
        let before = CookieManager::allow_file_scheme_cookies();
        CookieManager::set_accept_file_scheme_cookies(!before);
        assert_eq!(CookieManager::allow_file_scheme_cookies(), before);
        assert_eq!(CookieManager::instance().file_scheme_cookies_enabled(), before);
    }
}
