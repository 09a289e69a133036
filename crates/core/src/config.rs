use crate::history::UndoPush;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Write crash-recovery checkpoints at all.
    pub autosave_enabled: bool,
    /// Where checkpoints go. Defaults to the platform data dir.
    pub autosave_dir: Option<PathBuf>,
    /// Whether a push that names no flags is an autosave candidate.
    pub autosave_on_push: bool,
    /// Prompt to save on close even when the project has no tracks left.
    pub empty_can_be_dirty: bool,
    /// Capacity of the UI notification ring.
    pub event_capacity: usize,
    /// Capacity of the checkpoint request and outcome rings.
    pub checkpoint_queue: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_dir: None,
            autosave_on_push: true,
            empty_can_be_dirty: true,
            event_capacity: 64,
            checkpoint_queue: 16,
        }
    }
}

impl HistoryConfig {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("daw").join("history.toml"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Missing or malformed files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed history config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("no config directory on this platform"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn default_push_flags(&self) -> UndoPush {
        if self.autosave_on_push {
            UndoPush::AUTOSAVE
        } else {
            UndoPush::empty()
        }
    }

    pub fn autosave_dir(&self) -> Option<PathBuf> {
        self.autosave_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|p| p.join("daw").join("autosave")))
    }

    /// Checkpoint file for the document called `name`.
    pub fn autosave_path(&self, name: &str) -> Option<PathBuf> {
        let file_name: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.autosave_dir()
            .map(|dir| dir.join(format!("{file_name}.autosave")))
    }
}
