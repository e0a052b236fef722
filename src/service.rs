//! Working set of saved layouts
//!
//! Loaded once from the store at construction and written back in full after
//! every successful mutation. Callers get it by reference; there is no global
//! layout list.

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::store::LayoutStore;
use crate::types::{Layout, WindowDescriptor};

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Created(Layout),
    Overwritten(Layout),
    /// Name already taken and the overwrite was declined; nothing changed
    Aborted,
}

pub struct LayoutService<S: LayoutStore> {
    store: S,
    layouts: Vec<Layout>,
}

impl<S: LayoutStore> LayoutService<S> {
    pub fn load(store: S) -> Result<Self> {
        let layouts = store.load().context("Failed to load saved layouts")?;
        Ok(Self { store, layouts })
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }

    pub fn get(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|layout| layout.name == name)
    }

    /// Store `live_windows` under `name`
    ///
    /// If `name` exists, `confirm` is asked with the current layout and the
    /// save only proceeds when it returns `true`. The stored windows are always
    /// replaced wholesale, never merged.
    pub fn save(
        &mut self,
        name: &str,
        live_windows: Vec<WindowDescriptor>,
        confirm: impl FnOnce(&Layout) -> bool,
    ) -> Result<SaveOutcome> {
        let mut updated = self.layouts.clone();

        let outcome = match updated.iter_mut().find(|layout| layout.name == name) {
            Some(existing) => {
                if !confirm(existing) {
                    info!(layout = %name, "Overwrite declined, layout left unchanged");
                    return Ok(SaveOutcome::Aborted);
                }
                existing.saved_at = Local::now();
                existing.windows = live_windows;
                existing.applications.clear();
                SaveOutcome::Overwritten(existing.clone())
            }
            None => {
                let layout = Layout::new(name, live_windows);
                updated.push(layout.clone());
                SaveOutcome::Created(layout)
            }
        };

        self.commit(updated)
            .with_context(|| format!("Failed to save layout '{}'", name))?;

        let windows = match &outcome {
            SaveOutcome::Created(layout) | SaveOutcome::Overwritten(layout) => layout.windows.len(),
            SaveOutcome::Aborted => 0,
        };
        info!(layout = %name, windows, "Saved layout");
        Ok(outcome)
    }

    /// Remove a layout; `false` if no layout has that name
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let mut updated = self.layouts.clone();
        let before = updated.len();
        updated.retain(|layout| layout.name != name);
        if updated.len() == before {
            return Ok(false);
        }

        self.commit(updated)
            .with_context(|| format!("Failed to delete layout '{}'", name))?;
        info!(layout = %name, "Deleted layout");
        Ok(true)
    }

    /// Persist first so memory never runs ahead of disk
    fn commit(&mut self, updated: Vec<Layout>) -> Result<()> {
        self.store.save(&updated)?;
        self.layouts = updated;
        Ok(())
    }
}
