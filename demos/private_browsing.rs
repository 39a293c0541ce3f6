use gosub_cookies::config::{CookieManagerConfig, PersistMode, StoreKind};
use gosub_cookies::cookies::{CookieManager, PrivacyMode};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // File scheme cookies must be decided before the first manager exists. After that the
    // policy is latched and this call would only log a warning.
    CookieManager::set_accept_file_scheme_cookies(true);

    // Configure the manager through the config builder. The normal jar is persisted to a JSON
    // file; the private jar always stays in memory.
    let store_path = std::env::temp_dir().join("gosub-cookies-demo.json");
    let config = CookieManagerConfig::builder()
        .store(StoreKind::Json(store_path.clone()))
        .persist_mode(PersistMode::OnFlush)
        .worker_threads(2)
        .build()?;

    // Install it as the process-wide instance. Any later `CookieManager::instance()` call
    // returns this same manager.
    let manager = CookieManager::install(config)?;
    println!("file scheme cookies enabled: {}", manager.file_scheme_cookies_enabled());

    // A normal browsing context receives a session cookie and a persistent one.
    manager.set_cookie("https://example.com/", "session=abc", PrivacyMode::Normal);
    manager.set_cookie("https://example.com/", "theme=dark; Max-Age=86400", PrivacyMode::Normal);

    // A private context visits the same site. Its cookies never mix with the normal jar.
    manager.set_cookie("https://example.com/", "tracking=xyz", PrivacyMode::Private);

    for mode in [PrivacyMode::Normal, PrivacyMode::Private] {
        println!(
            "{mode:>7}: {}",
            manager.get_cookie("https://example.com/account", mode).unwrap_or_default()
        );
    }

    // Malformed URLs are logged and ignored, never surfaced to the caller.
    manager.set_cookie("http://[broken", "x=1", PrivacyMode::Normal);

    // Session cleanup runs in the background. Wait for it before flushing so the store sees
    // a settled jar.
    manager.remove_session_cookie();
    if !manager.wait_for_cookie_operations_timeout(Duration::from_secs(5)) {
        anyhow::bail!("session cookie removal did not finish in time");
    }
    println!(" normal: {}", manager.get_cookie("https://example.com/", PrivacyMode::Normal).unwrap_or_default());

    // The last private window closed.
    manager.clear_private_browsing_cookies();
    println!("private jar empty: {}", !manager.has_cookies(PrivacyMode::Private));

    if manager.flush_cookie_store() {
        println!("persistent cookies written to {}", store_path.display());
    }

    Ok(())
}
