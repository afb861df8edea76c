// src/cache.rs
//! Content-addressed cache of fetched article bodies.
//!
//! Keyed by a hash of the locator, not the body: once a locator is stored it
//! is never refreshed, trading staleness risk for fetch avoidance. The
//! scheduled job runs at low concurrency, so no locking; a duplicate write
//! for the same locator is benign (same content, last rename wins).

use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

pub struct ContentCache {
    dir: PathBuf,
}

impl ContentCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Return the cached body for `locator`, fetching and persisting it on
    /// first sight. Fetch errors propagate untouched; the cache makes no
    /// retry decision.
    pub async fn get_or_fetch<F, Fut>(&self, locator: &str, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let path = self.entry_path(locator);
        if path.exists() {
            debug!(locator, path = %path.display(), "cache hit");
            return fs::read_to_string(&path)
                .with_context(|| format!("reading cached body from {}", path.display()));
        }

        let body = fetch().await?;
        self.store(&path, &body)?;
        debug!(locator, bytes = body.len(), "cache miss, stored");
        Ok(body)
    }

    fn entry_path(&self, locator: &str) -> PathBuf {
        let digest = Sha256::digest(locator.as_bytes());
        self.dir.join(format!("{digest:x}.html"))
    }

    fn store(&self, path: &Path, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache dir {}", self.dir.display()))?;
        let tmp = path.with_extension("html.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(body.as_bytes())
            .with_context(|| format!("writing {}", tmp.display()))?;
        f.flush()?;
        fs::rename(&tmp, path)
            .with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn second_call_does_not_fetch_again() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(tmp.path());
        let calls = AtomicUsize::new(0);

        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok("<html>body</html>".to_string()) }
        };

        let first = cache.get_or_fetch("https://x/1", fetch).await.unwrap();
        let second = cache
            .get_or_fetch("https://x/1", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(String::from("should not be called"))
            })
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_locators_get_distinct_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(tmp.path());

        let a = cache
            .get_or_fetch("https://x/1", || async { Ok("A".to_string()) })
            .await
            .unwrap();
        let b = cache
            .get_or_fetch("https://x/2", || async { Ok("B".to_string()) })
            .await
            .unwrap();
        assert_eq!(a, "A");
        assert_eq!(b, "B");
    }

    #[tokio::test]
    async fn fetch_error_propagates_and_nothing_is_stored() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ContentCache::new(tmp.path().join("sub"));

        let err = cache
            .get_or_fetch("https://x/1", || async {
                Err(anyhow::anyhow!("connection timed out"))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        // A later successful fetch still runs (no poisoned entry).
        let body = cache
            .get_or_fetch("https://x/1", || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
