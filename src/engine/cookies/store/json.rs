//! JSON-backed cookie store.
//!
//! `JsonCookieStore` persists the normal jar's cookies in a single JSON file on
//! disk. Every [`persist`](CookieStore::persist) rewrites the whole file.
//!
//! ### File format
//! ```json
//! { "version": 1, "cookies": [ { "name": "a", "value": "1", ... } ] }
//! ```
//!
//! ### I/O characteristics & caveats
//! - Writes go to a temporary sibling file that is then renamed over the
//!   original, so a crash mid-write leaves the previous snapshot intact.
//! - For large cookie sets, consider the SQLite-backed store.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::engine::cookies::store::CookieStore;
use crate::engine::cookies::Cookie;
use crate::engine::errors::CookieError;

const FILE_VERSION: u32 = 1;

/// On-disk representation of the cookie jar.
#[derive(Debug, Serialize, Deserialize)]
struct CookieStoreFile {
    version: u32,
    cookies: Vec<Cookie>,
}

/// A JSON-based cookie store that persists cookies across sessions.
#[derive(Debug)]
pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Serializes writers so two snapshots never interleave on disk.
    write_lock: Mutex<()>,
}

impl JsonCookieStore {
    /// Opens a JSON cookie store at `path`.
    ///
    /// The file is created on the first write; a missing file loads as empty.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the full cookie store file.
    fn load_file(&self) -> Result<CookieStoreFile, CookieError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(CookieStoreFile { version: FILE_VERSION, cookies: Vec::new() });
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(CookieStoreFile { version: FILE_VERSION, cookies: Vec::new() });
        }

        let file: CookieStoreFile = serde_json::from_str(&contents)?;
        if file.version != FILE_VERSION {
            return Err(CookieError::UnsupportedVersion(file.version));
        }
        Ok(file)
    }

    /// Serializes and writes the full cookie store file (pretty-printed).
    fn save_file(&self, store_file: &CookieStoreFile) -> Result<(), CookieError> {
        let contents = serde_json::to_string_pretty(store_file)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CookieStore for JsonCookieStore {
    fn load(&self) -> Result<Vec<Cookie>, CookieError> {
        Ok(self.load_file()?.cookies)
    }

    fn persist(&self, cookies: &[Cookie]) -> Result<(), CookieError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.save_file(&CookieStoreFile {
            version: FILE_VERSION,
            cookies: cookies.to_vec(),
        })?;
        log::debug!("Persisted {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}
