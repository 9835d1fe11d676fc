//! Persisted preferences: the last-used voice and chaptering settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// Defaults used when no preferences file exists yet
pub const DEFAULT_RATE: u32 = 200;
pub const DEFAULT_PITCH: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Speech rate in words per minute
    #[serde(default = "default_rate")]
    pub rate: u32,

    /// Pitch multiplier around 1.0
    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Voice identifier. None means the engine default.
    #[serde(default)]
    pub voice: Option<String>,

    /// Pages per chapter. None disables chaptering.
    #[serde(default)]
    pub pages_per_chapter: Option<usize>,

    /// Open the produced audio files once conversion finishes
    #[serde(default)]
    pub open_after_save: bool,
}

fn default_rate() -> u32 {
    DEFAULT_RATE
}

fn default_pitch() -> f32 {
    DEFAULT_PITCH
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            pitch: default_pitch(),
            voice: None,
            pages_per_chapter: None,
            open_after_save: false,
        }
    }
}

/// Reads and writes the preferences file.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    /// Store at the default location: <config_dir>/pdf-audio/preferences.json
    pub fn open_default() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(Self::at(config_dir.join("pdf-audio").join("preferences.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load preferences, returning defaults if the file doesn't exist
    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            log::debug!("No preferences at {}, using defaults", self.path.display());
            return Ok(Preferences::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let prefs: Preferences = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(prefs)
    }

    /// Replace the stored record with `prefs`
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(prefs)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        log::debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }

    /// Delete the stored record so defaults apply again
    pub fn reset(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
