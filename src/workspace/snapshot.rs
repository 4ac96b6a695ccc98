//! Named workspace snapshots.
//!
//! A snapshot records which roots are open and how the user arranged them,
//! never the entities themselves: loading one clears the live state,
//! rescans every root and re-opens whatever still resolves.
//!
//! ```text
//! Idle ──save──▶ Saving ──▶ Idle
//! Idle ──load──▶ LoadRequested ──▶ Loading ──▶ Idle | Failed
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::state::WorkspaceState;
use super::tabs::Tab;
use super::Workspace;
use crate::core::order::OrderMap;
use crate::core::tree::{ExpandedNodes, SortBy, SortDirection, SortSettings};
use crate::error::{Result, ValidationError, WorkspaceError};
use crate::gateway::FileGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub root_folders: Vec<String>,
    #[serde(default)]
    pub expanded_nodes: ExpandedNodes,
    #[serde(default)]
    pub open_files: Vec<String>,
    #[serde(default)]
    pub item_order: OrderMap,
    #[serde(default)]
    pub explorer_sort_by: SortBy,
    #[serde(default)]
    pub explorer_sort_direction: SortDirection,
    #[serde(default)]
    pub active_file_path: Option<String>,
}

impl WorkspaceSnapshot {
    /// Capture the restorable parts of `state`.
    pub fn capture(name: &str, state: &WorkspaceState) -> Self {
        Self {
            name: name.to_string(),
            timestamp: Utc::now(),
            root_folders: state.roots.clone(),
            expanded_nodes: state.expanded.clone(),
            open_files: state.tabs.paths(),
            item_order: state.order.clone(),
            explorer_sort_by: state.sort.by,
            explorer_sort_direction: state.sort.direction,
            active_file_path: state.active_file().map(str::to_string),
        }
    }

    pub fn sort(&self) -> SortSettings {
        SortSettings {
            by: self.explorer_sort_by,
            direction: self.explorer_sort_direction,
        }
    }
}

/// Saved snapshots by name, plus the one currently "active".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotRegistry {
    entries: BTreeMap<String, WorkspaceSnapshot>,
    active: Option<String>,
}

impl SnapshotRegistry {
    pub fn from_parts(entries: BTreeMap<String, WorkspaceSnapshot>, active: Option<String>) -> Self {
        let active = active.filter(|name| entries.contains_key(name));
        Self { entries, active }
    }

    pub fn entries(&self) -> &BTreeMap<String, WorkspaceSnapshot> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&WorkspaceSnapshot> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Insert or overwrite (last write wins).
    pub fn insert(&mut self, snapshot: WorkspaceSnapshot) {
        self.entries.insert(snapshot.name.clone(), snapshot);
    }

    pub fn remove(&mut self, name: &str) -> Option<WorkspaceSnapshot> {
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.entries.remove(name)
    }

    fn set_active(&mut self, name: Option<&str>) {
        self.active = name.map(str::to_string);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Saving,
    LoadRequested(String),
    Loading(String),
    /// The last load failed; the workspace was reset to empty.
    Failed(String),
}

impl LoadPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::LoadRequested(_) | LoadPhase::Loading(_))
    }
}

impl<G: FileGateway> Workspace<G> {
    pub fn set_registry(&mut self, registry: SnapshotRegistry) {
        self.registry = registry;
    }

    /// Snapshot the live state under `name`, overwriting any previous entry,
    /// and make it the active named workspace.
    #[instrument(skip(self))]
    pub fn save_workspace(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptySnapshotName.into());
        }
        self.phase = LoadPhase::Saving;
        self.registry
            .insert(WorkspaceSnapshot::capture(name, &self.state));
        self.registry.set_active(Some(name));
        self.phase = LoadPhase::Idle;
        info!(name, "workspace saved");
        Ok(())
    }

    /// Re-snapshot the active named workspace from live state.
    pub fn auto_save_active(&mut self) -> bool {
        let Some(name) = self.registry.active().map(str::to_string) else {
            return false;
        };
        self.registry
            .insert(WorkspaceSnapshot::capture(&name, &self.state));
        info!(%name, "workspace auto-saved");
        true
    }

    pub fn delete_workspace(&mut self, name: &str) -> Result<()> {
        self.registry
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| WorkspaceError::SnapshotNotFound(name.to_string()))
    }

    /// Auto-save the active named workspace, then empty the live state.
    pub fn clear_workspace(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.auto_save_active();
        let cleared = self.state.cleared();
        self.commit(cleared);
        self.registry.set_active(None);
        Ok(())
    }

    /// Replace the live state with the named snapshot.
    ///
    /// The active named workspace (if it is a different one) is auto-saved
    /// first.  Any failure resets the workspace to empty.
    #[instrument(skip(self))]
    pub async fn load_workspace(&mut self, name: &str) -> Result<()> {
        self.ensure_idle()?;
        let snapshot = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| WorkspaceError::SnapshotNotFound(name.to_string()))?;

        self.phase = LoadPhase::LoadRequested(name.to_string());
        if self.registry.active().is_some_and(|active| active != name) {
            self.auto_save_active();
        }
        self.load_snapshot(&snapshot).await?;
        self.registry.set_active(Some(name));
        Ok(())
    }

    /// Restore an unnamed snapshot (e.g. the last session).
    pub async fn restore_session(&mut self, snapshot: &WorkspaceSnapshot) -> Result<()> {
        self.ensure_idle()?;
        self.phase = LoadPhase::LoadRequested(snapshot.name.clone());
        self.load_snapshot(snapshot).await
    }

    async fn load_snapshot(&mut self, snapshot: &WorkspaceSnapshot) -> Result<()> {
        self.phase = LoadPhase::Loading(snapshot.name.clone());
        match self.replay(snapshot).await {
            Ok(()) => {
                self.phase = LoadPhase::Idle;
                info!(
                    name = %snapshot.name,
                    roots = self.state.roots.len(),
                    tabs = self.state.tabs.len(),
                    "workspace loaded"
                );
                Ok(())
            }
            Err(err) => {
                warn!(name = %snapshot.name, %err, "workspace load failed, resetting");
                let cleared = self.state.cleared();
                self.commit(cleared);
                self.registry.set_active(None);
                self.phase = LoadPhase::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Clear, install, scan roots in order, re-open tabs, pick the active
    /// file.  Safe to retry: it always starts from a cleared state.
    async fn replay(&mut self, snapshot: &WorkspaceSnapshot) -> Result<()> {
        let cleared = self.state.cleared();
        self.commit(cleared);

        let mut next = self.state.clone();
        for root in &snapshot.root_folders {
            if !next.roots.contains(root) {
                next.roots.push(root.clone());
            }
        }
        next.expanded = snapshot.expanded_nodes.clone();
        next.order = snapshot.item_order.clone();
        next.sort = snapshot.sort();

        for root in &next.roots {
            let scan = self.gateway.scan_directory(root).await?;
            scan.merge_into(&mut next.store);
        }

        for p in &snapshot.open_files {
            if next.store.get(p).is_some_and(|e| !e.is_folder()) {
                next.tabs.open(Tab::new(p));
            }
        }

        let active = snapshot
            .active_file_path
            .clone()
            .filter(|p| next.tabs.contains(p))
            .or_else(|| next.tabs.paths().into_iter().next());
        if let Some(path) = active {
            let content = self.gateway.read_file(&path).await?;
            if let Some(tab) = next.tabs.get_mut(&path) {
                tab.content = Some(content);
            }
            next.tabs.activate(&path);
        }

        self.commit(next);
        Ok(())
    }
}
