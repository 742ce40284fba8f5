// src/dedup/ledger.rs
//! Restart-safe ledger of recently notified identities.
//!
//! Stored as a JSON array of strings, oldest first. Every call is a full
//! read-through (no in-memory cache), so the file is the only state. The
//! read-modify-write in `record` is safe inside one process because the
//! pipeline is single-writer; concurrent processes sharing a file are not
//! supported (no locking).

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::AlertIdentity;
use crate::error::RelayError;

pub const DEFAULT_LEDGER_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct SentLedger {
    path: PathBuf,
    capacity: usize,
}

impl SentLedger {
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current entries, oldest first. A missing file is an empty ledger.
    pub fn load(&self) -> Result<Vec<String>, RelayError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RelayError::Persistence(format!(
                    "read {}: {e}",
                    self.path.display()
                )))
            }
        };
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&data)
            .map_err(|e| RelayError::Persistence(format!("decode {}: {e}", self.path.display())))
    }

    /// Membership test. An unreadable ledger counts as "not yet sent": a
    /// possible duplicate beats a silently suppressed alert.
    pub fn has(&self, id: &AlertIdentity) -> bool {
        match self.load() {
            Ok(entries) => entries.iter().any(|e| e == id.as_str()),
            Err(e) => {
                tracing::warn!(target: "dedup", error = %e, "ledger unreadable; treating as not sent");
                false
            }
        }
    }

    /// Append `id` (idempotent), evicting the oldest entries beyond capacity,
    /// and persist before returning.
    pub fn record(&self, id: &AlertIdentity) -> Result<(), RelayError> {
        let mut entries = self.load().unwrap_or_else(|e| {
            tracing::warn!(target: "dedup", error = %e, "ledger unreadable; starting fresh");
            Vec::new()
        });
        if entries.iter().any(|e| e == id.as_str()) {
            return Ok(());
        }
        entries.push(id.as_str().to_string());
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(0..excess);
        }
        self.persist(&entries)
    }

    fn persist(&self, entries: &[String]) -> Result<(), RelayError> {
        let err = |what: &str, e: std::io::Error| {
            RelayError::Persistence(format!("{what} {}: {e}", self.path.display()))
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| err("create dir for", e))?;
        }
        let body = serde_json::to_vec(entries)
            .map_err(|e| RelayError::Persistence(format!("encode ledger: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written ledger.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| err("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| err("rename into", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_files_are_empty_ledgers() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SentLedger::new(dir.path().join("sent.json"), 10);
        assert!(ledger.load().unwrap().is_empty());

        fs::write(ledger.path(), "").unwrap();
        assert!(ledger.load().unwrap().is_empty());
    }

    #[test]
    fn record_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SentLedger::new(dir.path().join("state/nested/sent.json"), 10);
        ledger.record(&AlertIdentity::new("a")).unwrap();
        assert_eq!(ledger.load().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn file_is_a_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SentLedger::new(dir.path().join("sent.json"), 10);
        ledger.record(&AlertIdentity::new("a")).unwrap();
        ledger.record(&AlertIdentity::new("b")).unwrap();
        let raw = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(raw, r#"["a","b"]"#);
    }
}
