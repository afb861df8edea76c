// src/registry.rs
//! Persisted subscriber set backed by a flat file, one id per line.
//!
//! The listener process and the pipeline share this file. Mutations rewrite
//! the whole file through a temp file + rename so a concurrent reader never
//! observes a partially written state. I/O failures surface to the caller; a
//! registry mutation must not silently fail to persist.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub struct SubscriberRegistry {
    path: PathBuf,
}

impl SubscriberRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Idempotent add. Returns true when `id` was newly registered.
    pub fn add(&self, id: &str) -> Result<bool> {
        let mut ids = self.read_ids()?;
        if ids.iter().any(|x| x == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.write_ids(&ids)?;
        info!(id, total = ids.len(), "subscriber added");
        Ok(true)
    }

    /// Idempotent remove. Returns true when `id` was present and removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut ids = self.read_ids()?;
        let before = ids.len();
        ids.retain(|x| x != id);
        if ids.len() == before {
            return Ok(false);
        }
        self.write_ids(&ids)?;
        info!(id, total = ids.len(), "subscriber removed");
        Ok(true)
    }

    /// Full membership for fan-out. A missing backing file is first-run
    /// tolerance, not an error.
    pub fn list_all(&self) -> Result<Vec<String>> {
        self.read_ids()
    }

    fn read_ids(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("reading subscriber store {}", self.path.display())
                })
            }
        };
        let mut ids = Vec::new();
        for line in content.lines() {
            let t = line.trim();
            if !t.is_empty() && !ids.iter().any(|x| x == t) {
                ids.push(t.to_string());
            }
        }
        Ok(ids)
    }

    fn write_ids(&self, ids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        for id in ids {
            writeln!(f, "{id}").with_context(|| format!("writing {}", tmp.display()))?;
        }
        f.flush()?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming into {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &tempfile::TempDir) -> SubscriberRegistry {
        SubscriberRegistry::new(dir.path().join("chat_ids.txt"))
    }

    #[test]
    fn missing_store_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(registry_in(&tmp).list_all().unwrap().is_empty());
    }

    #[test]
    fn add_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry_in(&tmp);
        assert!(reg.add("100").unwrap());
        assert!(!reg.add("100").unwrap());
        assert_eq!(reg.list_all().unwrap(), vec!["100".to_string()]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let reg = registry_in(&tmp);
        reg.add("100").unwrap();
        assert!(!reg.remove("200").unwrap());
        assert!(reg.remove("100").unwrap());
        assert!(!reg.remove("100").unwrap());
        assert!(reg.list_all().unwrap().is_empty());
    }

    #[test]
    fn blank_lines_and_duplicates_in_store_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chat_ids.txt");
        fs::write(&path, "100\n\n  \n200\n100\n").unwrap();
        let reg = SubscriberRegistry::new(&path);
        assert_eq!(
            reg.list_all().unwrap(),
            vec!["100".to_string(), "200".to_string()]
        );
    }

    #[test]
    fn mutations_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("chat_ids.txt");
        {
            let reg = SubscriberRegistry::new(&path);
            reg.add("100").unwrap();
            reg.add("200").unwrap();
            reg.remove("100").unwrap();
        }
        let reg = SubscriberRegistry::new(&path);
        assert_eq!(reg.list_all().unwrap(), vec!["200".to_string()]);
    }
}
