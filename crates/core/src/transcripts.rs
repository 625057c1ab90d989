use crate::error::IngestError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durable file name → transcript mapping kept as one pretty-printed JSON object.
///
/// Every save reads the current file, merges the entry in and rewrites the
/// whole object, so a later run for the same file name replaces the earlier
/// transcript.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    path: PathBuf,
}

impl TranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<BTreeMap<String, String>, IngestError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    pub fn get(&self, file_name: &str) -> Result<Option<String>, IngestError> {
        Ok(self.load()?.remove(file_name))
    }

    /// Returns `false` without touching the file when `transcript` is blank.
    pub fn save(&self, file_name: &str, transcript: &str) -> Result<bool, IngestError> {
        if transcript.trim().is_empty() {
            debug!(file = file_name, "blank transcript not persisted");
            return Ok(false);
        }

        let mut entries = self.load()?;
        entries.insert(file_name.to_string(), transcript.to_string());
        self.write_all(&entries)?;

        debug!(file = file_name, path = %self.path.display(), "transcript persisted");
        Ok(true)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), IngestError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
