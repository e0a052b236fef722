//! Whole-collection persistence of saved layouts

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::constants::paths;
use crate::types::Layout;

/// Get-all / save-all storage. No partial updates.
pub trait LayoutStore {
    fn load(&self) -> Result<Vec<Layout>>;
    fn save(&self, layouts: &[Layout]) -> Result<()>;
}

/// Pretty-printed JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/folder-layout/layouts.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(paths::APP_DIR);
        path.push(paths::LAYOUTS_FILENAME);
        path
    }
}

impl LayoutStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Layout>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No layouts file yet");
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read layouts from {:?}", self.path))?;
        let layouts: Vec<Layout> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse layouts JSON from {:?}", self.path))?;

        info!(count = layouts.len(), path = %self.path.display(), "Loaded layouts");
        Ok(layouts)
    }

    fn save(&self, layouts: &[Layout]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create layouts directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(layouts)
            .context("Failed to serialize layouts to JSON")?;

        // Write next to the target and rename so a crash never leaves a torn file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write layouts to {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace layouts file {:?}", self.path))?;

        info!(count = layouts.len(), path = %self.path.display(), "Saved layouts");
        Ok(())
    }
}
