//! Recent-targets history
//!
//! Keeps the most recently used accepted URLs, newest first, without duplicates.
//! Storage is a ranked list of backends; the first one that works wins and the
//! last resort is memory. Storage failures are logged, never returned.

use crate::config::HistoryOptions;
use crate::error::{Error, Result};
use crate::validate;
use std::fs;
use std::path::{Path, PathBuf};

/// Entries kept when no capacity is configured.
pub const DEFAULT_CAPACITY: usize = 5;

const FILE_NAME: &str = "history.json";
const SESSION_FILE_NAME: &str = "qrcard-session-history.json";

/// A place history can be loaded from and saved to
pub trait HistoryStore: Send {
    /// Short name for logs.
    fn label(&self) -> &str;
    /// Read stored entries; a missing store is an empty list.
    fn load(&self) -> Result<Vec<String>>;
    /// Replace stored entries.
    fn save(&mut self, entries: &[String]) -> Result<()>;
}

/// JSON array on disk
#[derive(Debug, Clone)]
pub struct FileStore {
    label: &'static str,
    path: PathBuf,
}

impl FileStore {
    /// Store at `path`, named `label` in logs.
    pub fn new(label: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            label,
            path: path.into(),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for FileStore {
    fn label(&self) -> &str {
        self.label
    }

    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            Error::Persistence(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Persistence(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }

    fn save(&mut self, entries: &[String]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                Error::Persistence(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        let body = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, body).map_err(|e| {
            Error::Persistence(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

/// Process-lifetime store; never fails
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<String>,
}

impl HistoryStore for MemoryStore {
    fn label(&self) -> &str {
        "memory"
    }

    fn load(&self) -> Result<Vec<String>> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[String]) -> Result<()> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

/// Bounded most-recent-first list of accepted targets
pub struct History {
    entries: Vec<String>,
    capacity: usize,
    backends: Vec<Box<dyn HistoryStore>>,
    active: usize,
}

impl History {
    /// History that lives only in memory.
    pub fn in_memory(capacity: usize) -> Self {
        Self::with_backends(capacity, Vec::new())
    }

    /// History over ranked `backends`; a memory store is appended as last resort.
    pub fn with_backends(capacity: usize, mut backends: Vec<Box<dyn HistoryStore>>) -> Self {
        backends.push(Box::new(MemoryStore::default()));
        let mut history = Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            backends,
            active: 0,
        };
        history.load();
        history
    }

    /// History using the persistent file, then a session file, then memory.
    pub fn open(options: &HistoryOptions) -> Self {
        if !options.enabled {
            return Self::in_memory(options.capacity);
        }

        let mut backends: Vec<Box<dyn HistoryStore>> = Vec::new();
        let persistent = options
            .path
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("qrcard").join(FILE_NAME)));
        if let Some(path) = persistent {
            backends.push(Box::new(FileStore::new("persistent", path)));
        }
        let session_dir = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        backends.push(Box::new(FileStore::new(
            "session",
            session_dir.join(SESSION_FILE_NAME),
        )));

        Self::with_backends(options.capacity, backends)
    }

    fn load(&mut self) {
        for (index, backend) in self.backends.iter().enumerate() {
            match backend.load() {
                Ok(stored) => {
                    self.active = index;
                    self.entries = sanitize(stored, self.capacity);
                    tracing::debug!(
                        store = backend.label(),
                        entries = self.entries.len(),
                        "Loaded history"
                    );
                    return;
                }
                Err(err) => {
                    tracing::warn!(store = backend.label(), "History unavailable: {err}");
                }
            }
        }
    }

    fn persist(&mut self) {
        for (index, backend) in self.backends.iter_mut().enumerate() {
            match backend.save(&self.entries) {
                Ok(()) => {
                    if index != self.active {
                        tracing::debug!(store = backend.label(), "History store changed");
                    }
                    self.active = index;
                    return;
                }
                Err(err) => {
                    tracing::warn!(store = backend.label(), "Failed to save history: {err}");
                }
            }
        }
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Label of the store that last loaded or saved successfully.
    pub fn active_store(&self) -> &str {
        self.backends
            .get(self.active)
            .map(|b| b.label())
            .unwrap_or("memory")
    }

    /// Move `candidate` to the front, dropping the oldest entry past capacity.
    ///
    /// Returns false without changing anything when the URL is not acceptable.
    pub fn record(&mut self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if !validate::is_acceptable(candidate) {
            return false;
        }

        self.entries.retain(|entry| entry != candidate);
        self.entries.insert(0, candidate.to_string());
        self.entries.truncate(self.capacity);
        self.persist();
        true
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries)
            .field("capacity", &self.capacity)
            .field("active_store", &self.active_store())
            .finish()
    }
}

fn sanitize(stored: Vec<String>, capacity: usize) -> Vec<String> {
    let mut entries: Vec<String> = Vec::with_capacity(capacity);
    for entry in stored {
        let entry = entry.trim().to_string();
        if validate::is_acceptable(&entry) && !entries.contains(&entry) {
            entries.push(entry);
        }
        if entries.len() == capacity {
            break;
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_five_most_recent() {
        let mut history = History::in_memory(DEFAULT_CAPACITY);
        for i in 1..=6 {
            assert!(history.record(&format!("https://site{i}.example/")));
        }
        assert_eq!(
            history.entries(),
            &[
                "https://site6.example/",
                "https://site5.example/",
                "https://site4.example/",
                "https://site3.example/",
                "https://site2.example/",
            ]
        );
    }

    #[test]
    fn readding_moves_to_front() {
        let mut history = History::in_memory(DEFAULT_CAPACITY);
        history.record("https://a.example/");
        history.record("https://b.example/");
        history.record("https://c.example/");
        history.record("https://a.example/");

        assert_eq!(history.entries().len(), 3);
        assert_eq!(history.entries()[0], "https://a.example/");
        assert_eq!(history.entries()[2], "https://b.example/");
    }

    #[test]
    fn rejects_unacceptable_entries() {
        let mut history = History::in_memory(DEFAULT_CAPACITY);
        assert!(!history.record("ftp://x.com"));
        assert!(!history.record("not a url"));
        assert!(history.entries().is_empty());
    }

    #[test]
    fn sanitize_filters_and_dedups() {
        let stored = vec![
            "https://a.example/".to_string(),
            "javascript:alert(1)".to_string(),
            "https://a.example/".to_string(),
            "https://b.example/".to_string(),
        ];
        assert_eq!(
            sanitize(stored, 5),
            vec!["https://a.example/", "https://b.example/"]
        );
    }

    #[test]
    fn disabled_history_is_memory_only() {
        let options = HistoryOptions {
            enabled: false,
            ..HistoryOptions::default()
        };
        let history = History::open(&options);
        assert_eq!(history.active_store(), "memory");
    }
}
