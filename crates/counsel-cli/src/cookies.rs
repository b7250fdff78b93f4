//! Session cookies saved between CLI invocations.
//!
//! Each command runs in a fresh process, so the cookie jar is loaded from
//! `~/.counsel/cookies.json` at start and written back once the command has
//! talked to the server. Session cookies without an expiry are kept too;
//! they are the whole point of the file.

use anyhow::{anyhow, Context, Result};
use cookie_store::CookieStore;
use reqwest_cookie_store::CookieStoreMutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Cookie jar backed by a JSON file.
pub struct CookieFile {
    path: PathBuf,
    store: Arc<CookieStoreMutex>,
}

impl CookieFile {
    /// Load the jar from `path`, or start empty if the file does not exist.
    pub fn load(path: PathBuf) -> Result<Self> {
        let store = if path.exists() {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            cookie_store::serde::json::load_all(BufReader::new(file))
                .map_err(|e| anyhow!("Failed to read cookies from {}: {}", path.display(), e))?
        } else {
            CookieStore::default()
        };

        debug!(path = %path.display(), "Loaded cookie jar");
        Ok(Self {
            path,
            store: Arc::new(CookieStoreMutex::new(store)),
        })
    }

    /// The jar shared with the HTTP client.
    pub fn store(&self) -> Arc<CookieStoreMutex> {
        Arc::clone(&self.store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the jar back to disk, readable by the owner only.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options
            .open(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        {
            let store = self
                .store
                .lock()
                .map_err(|_| anyhow!("Cookie jar lock poisoned"))?;
            cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut writer)
                .map_err(|e| anyhow!("Failed to save cookies: {}", e))?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), "Saved cookie jar");
        Ok(())
    }

    /// Drop every cookie and save the empty jar.
    pub fn clear(&self) -> Result<()> {
        self.store
            .lock()
            .map_err(|_| anyhow!("Cookie jar lock poisoned"))?
            .clear();
        self.save()
    }
}
