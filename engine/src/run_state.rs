//! Run state tracker.
//!
//! Persists, per allocation list, the 1-based index of the next recipient
//! to process. The file is a JSON object mapping list identity to index and
//! is rewritten in full after every recipient.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::EngineError;

/// Resume positions keyed by allocation-list identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState {
    positions: BTreeMap<String, usize>,
}

impl RunState {
    /// Next unprocessed index for `list_id`; 1 when the list was never run.
    pub fn next_index(&self, list_id: &str) -> usize {
        self.positions.get(list_id).copied().unwrap_or(1)
    }

    /// The state with `list_id` positioned at `index`.
    pub fn with_next_index(mut self, list_id: &str, index: usize) -> Self {
        self.positions.insert(list_id.to_string(), index);
        self
    }

    /// Ensure `list_id` has an entry, starting at index 1.
    fn with_entry(mut self, list_id: &str) -> Self {
        self.positions.entry(list_id.to_string()).or_insert(1);
        self
    }
}

/// File-backed [`RunState`] persistence. Single writer by construction.
#[derive(Clone, Debug)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state, creating an entry for `list_id` if missing.
    ///
    /// An absent file is a fresh start; any other read or parse failure is fatal.
    pub fn load(&self, list_id: &str) -> Result<RunState, EngineError> {
        let state = match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => RunState::default(),
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| EngineError::persistence(&self.path, e))?,
            Err(e) if e.kind() == ErrorKind::NotFound => RunState::default(),
            Err(e) => return Err(EngineError::persistence(&self.path, e)),
        };
        Ok(state.with_entry(list_id))
    }

    /// Overwrite the state file and flush it before returning.
    ///
    /// Writes a sibling temp file and renames it over the target, so a crash
    /// mid-write leaves the previous state intact.
    pub fn save(&self, state: &RunState) -> Result<(), EngineError> {
        let err = |e: std::io::Error| EngineError::persistence(&self.path, e);
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| EngineError::persistence(&self.path, e))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path).map_err(err)?;
        file.write_all(json.as_bytes()).map_err(err)?;
        file.write_all(b"\n").map_err(err)?;
        file.sync_all().map_err(err)?;
        fs::rename(&tmp_path, &self.path).map_err(err)?;
        debug!(path = %self.path.display(), "run state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("state.json"));
        let state = store.load("lists/a.json").unwrap();
        assert_eq!(state.next_index("lists/a.json"), 1);
    }

    #[test]
    fn save_then_load_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("state.json"));
        let state = store.load("a").unwrap().with_next_index("a", 42);
        store.save(&state).unwrap();

        let reloaded = store.load("a").unwrap();
        assert_eq!(reloaded.next_index("a"), 42);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn other_lists_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let store = RunStateStore::new(dir.path().join("state.json"));
        store
            .save(&RunState::default().with_next_index("a", 7))
            .unwrap();

        let state = store.load("b").unwrap();
        assert_eq!(state.next_index("b"), 1);
        store.save(&state.with_next_index("b", 3)).unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        let raw: BTreeMap<String, usize> = serde_json::from_str(&text).unwrap();
        assert_eq!(raw.get("a"), Some(&7));
        assert_eq!(raw.get("b"), Some(&3));
    }

    #[test]
    fn corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = RunStateStore::new(&path);
        assert!(matches!(store.load("a"), Err(EngineError::Persistence { .. })));
    }
}
