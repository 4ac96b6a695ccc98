//! On-disk session record.
//!
//! One JSON document at `$XDG_DATA_HOME/md-explorer/state.json` (default
//! `~/.local/share/md-explorer/state.json`) holding the live session, recent
//! files and every saved named workspace.  Keys this crate does not know
//! about under `preferences` and `editor` are carried through untouched.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::core::order::OrderMap;
use crate::core::tree::{ExpandedNodes, SortBy, SortDirection};
use crate::error::Result as WorkspaceResult;
use crate::gateway::FileGateway;
use crate::workspace::{SnapshotRegistry, Workspace, WorkspaceSnapshot};

/// Name given to the unnamed live session when it is replayed.
pub const SESSION_NAME: &str = "session";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed state file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub file_history: Vec<String>,
    pub open_files: Vec<String>,
    pub ui: UiState,
    pub editor: EditorState,
    pub saved_workspace_states: BTreeMap<String, WorkspaceSnapshot>,
    pub active_workspace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub active_root_folders: Vec<String>,
    pub active_expanded_nodes: ExpandedNodes,
    pub item_order: OrderMap,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub explorer_sort_by: SortBy,
    pub explorer_sort_direction: SortDirection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorState {
    pub active_file_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistedState {
    /// Overwrite the session fields from `ws`, keeping unknown keys.
    pub fn record<G: FileGateway>(&mut self, ws: &Workspace<G>) {
        let state = ws.state();
        self.file_history = state.file_history.clone();
        self.open_files = state.tabs.paths();
        self.ui.active_root_folders = state.roots.clone();
        self.ui.active_expanded_nodes = state.expanded.clone();
        self.ui.item_order = state.order.clone();
        self.ui.preferences.explorer_sort_by = state.sort.by;
        self.ui.preferences.explorer_sort_direction = state.sort.direction;
        self.editor.active_file_path = state.active_file().map(str::to_string);
        self.saved_workspace_states = ws.registry().entries().clone();
        self.active_workspace = ws.registry().active().map(str::to_string);
    }

    /// The live session as an unnamed snapshot.
    pub fn session(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            name: SESSION_NAME.to_string(),
            timestamp: chrono::Utc::now(),
            root_folders: self.ui.active_root_folders.clone(),
            expanded_nodes: self.ui.active_expanded_nodes.clone(),
            open_files: self.open_files.clone(),
            item_order: self.ui.item_order.clone(),
            explorer_sort_by: self.ui.preferences.explorer_sort_by,
            explorer_sort_direction: self.ui.preferences.explorer_sort_direction,
            active_file_path: self.editor.active_file_path.clone(),
        }
    }

    pub fn registry(&self) -> SnapshotRegistry {
        SnapshotRegistry::from_parts(
            self.saved_workspace_states.clone(),
            self.active_workspace.clone(),
        )
    }

    /// Install saved workspaces and history into `ws`, then replay the
    /// session.  A failed replay leaves `ws` empty but keeps the saved
    /// workspaces.
    pub async fn restore_into<G: FileGateway>(&self, ws: &mut Workspace<G>) -> WorkspaceResult<()> {
        ws.set_registry(self.registry());
        ws.set_file_history(self.file_history.clone());
        if self.ui.active_root_folders.is_empty() {
            return Ok(());
        }
        ws.restore_session(&self.session()).await
    }
}

/// The state file on disk.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/md-explorer/state.json`.
    pub fn default_location() -> Self {
        Self::new(state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record; a missing file is an empty record.
    pub fn load(&self) -> Result<PersistedState, PersistError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet");
                return Ok(PersistedState::default());
            }
            Err(source) => return Err(self.io_error(source)),
        };
        if text.trim().is_empty() {
            return Ok(PersistedState::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Write through a temporary sibling and rename it into place.
    pub fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

fn state_path() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".local").join("share")
        });
    data_dir.join("md-explorer").join("state.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;

    fn gateway() -> MemoryGateway {
        MemoryGateway::new()
            .with_file("/notes/a.md", "alpha")
            .with_file("/notes/b.md", "beta")
            .with_file("/work/plan.md", "plan")
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("nope").join("state.json"));
        assert_eq!(file.load().unwrap(), PersistedState::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            StateFile::new(path).load(),
            Err(PersistError::Json(_))
        ));
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let raw = r#"{
            "fileHistory": ["/notes/a.md"],
            "ui": { "preferences": { "explorerSortBy": "size", "fontSize": 14 } },
            "editor": { "activeFilePath": "/notes/a.md", "wordWrap": true },
            "somethingElse": 1
        }"#;
        let state: PersistedState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.ui.preferences.explorer_sort_by, SortBy::Size);
        assert_eq!(state.ui.preferences.extra.get("fontSize"), Some(&Value::from(14)));

        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        file.save(&state).unwrap();
        let back = file.load().unwrap();
        assert_eq!(back, state);
        assert_eq!(back.editor.extra.get("wordWrap"), Some(&Value::Bool(true)));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn session_survives_restart() {
        let gw = gateway();
        let mut ws = Workspace::new(gw.clone());
        ws.add_root_folder("/notes").await.unwrap();
        ws.add_root_folder("/work").await.unwrap();
        ws.open_file("/notes/b.md").await.unwrap();
        ws.open_file("/work/plan.md").await.unwrap();
        ws.save_workspace("daily").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file = StateFile::new(dir.path().join("state.json"));
        let mut record = PersistedState::default();
        record.record(&ws);
        file.save(&record).unwrap();

        let mut restored = Workspace::new(gw);
        file.load().unwrap().restore_into(&mut restored).await.unwrap();
        assert_eq!(restored.state().roots, ws.state().roots);
        assert_eq!(restored.state().tabs.paths(), ws.state().tabs.paths());
        assert_eq!(restored.state().active_file(), Some("/work/plan.md"));
        assert_eq!(restored.active_content(), Some("plan"));
        assert_eq!(restored.state().file_history, ws.state().file_history);
        assert_eq!(restored.registry().names(), vec!["daily".to_string()]);
        assert_eq!(restored.registry().active(), Some("daily"));
    }
}
