//! Workspace engine: the single mutation surface over [`WorkspaceState`].
//!
//! Every operation follows the same shape:
//!
//! 1. clone the live state into `next`,
//! 2. await gateway calls one at a time, applying each success to `next`,
//! 3. [`Workspace::commit`] `next` in one assignment and rebuild the tree.
//!
//! Single-item operations bail out before step 3 on any error, leaving the
//! live state untouched.  Multi-item operations always commit whatever
//! succeeded and describe the rest in a [`BatchReport`].
//!
//! Structural changes live in [`mutation`]; named-workspace save/load lives
//! in [`snapshot`].

pub mod mutation;
pub mod report;
pub mod snapshot;
pub mod state;
pub mod tabs;

use tracing::{debug, info, instrument, warn};

use crate::core::path;
use crate::core::tree::{is_expanded, SortSettings, WorkspaceTree};
use crate::error::{Result, WorkspaceError};
use crate::gateway::FileGateway;

pub use report::{BatchOp, BatchReport, ItemError, Outcome};
pub use snapshot::{LoadPhase, SnapshotRegistry, WorkspaceSnapshot};
pub use state::{StaleRef, WorkspaceState};
pub use tabs::{OpenTabs, Tab};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub struct Workspace<G> {
    gateway: G,
    state: WorkspaceState,
    tree: WorkspaceTree,
    registry: SnapshotRegistry,
    phase: LoadPhase,
    history_limit: usize,
}

impl<G: FileGateway> Workspace<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: WorkspaceState::default(),
            tree: WorkspaceTree::default(),
            registry: SnapshotRegistry::default(),
            phase: LoadPhase::Idle,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn set_file_history(&mut self, mut history: Vec<String>) {
        history.truncate(self.history_limit);
        self.state.file_history = history;
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    pub fn tree(&self) -> &WorkspaceTree {
        &self.tree
    }

    pub fn registry(&self) -> &SnapshotRegistry {
        &self.registry
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_loading()
    }

    /// Visible paths in display order.
    pub fn visible_paths(&self) -> Vec<String> {
        self.tree.visible_paths(&self.state.expanded)
    }

    pub fn active_content(&self) -> Option<&str> {
        self.state.tabs.active_tab().and_then(|t| t.content.as_deref())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            return Err(WorkspaceError::Busy);
        }
        Ok(())
    }

    /// Swap in `next` and rebuild the derived tree.
    fn commit(&mut self, next: WorkspaceState) {
        self.tree = next.build_tree();
        self.state = next;
        if !self.tree.orphans.is_empty() {
            debug!(orphans = self.tree.orphans.len(), "tree has unattached entities");
        }
    }

    /// Make sure the active tab has its buffer loaded.  A read failure
    /// leaves the editor empty.
    async fn load_active_content(&mut self) {
        let Some(path) = self.state.tabs.active().map(str::to_string) else {
            return;
        };
        if self
            .state
            .tabs
            .get(&path)
            .is_some_and(|t| t.content.is_some())
        {
            return;
        }
        match self.gateway.read_file(&path).await {
            Ok(content) => {
                if let Some(tab) = self.state.tabs.get_mut(&path) {
                    tab.content = Some(content);
                }
            }
            Err(err) => warn!(%path, %err, "could not load file content"),
        }
    }

    // ───────────────────────────────────── tabs / editor ─────

    /// Open `path` in a tab (or focus its tab) and make it active.
    #[instrument(skip(self))]
    pub async fn open_file(&mut self, path: &str) -> Result<()> {
        match self.state.store.get(path) {
            Some(e) if !e.is_folder() => {}
            Some(_) => return Err(WorkspaceError::Unresolved(path.to_string())),
            None => return Err(WorkspaceError::Unresolved(path.to_string())),
        }
        let mut next = self.state.clone();
        if !next.tabs.contains(path) {
            let content = self.gateway.read_file(path).await?;
            next.tabs.open(Tab::with_content(path, content));
        }
        next.tabs.activate(path);
        next.push_history(path, self.history_limit);
        self.commit(next);
        self.load_active_content().await;
        Ok(())
    }

    /// Focus an already open tab.
    pub async fn activate_tab(&mut self, path: &str) -> bool {
        if !self.state.tabs.activate(path) {
            return false;
        }
        self.load_active_content().await;
        true
    }

    pub async fn close_tab(&mut self, path: &str) -> bool {
        let mut next = self.state.clone();
        if next.tabs.close(path).is_none() {
            return false;
        }
        self.commit(next);
        self.load_active_content().await;
        true
    }

    /// Replace the active buffer and mark it dirty.
    pub fn edit_active(&mut self, content: impl Into<String>) -> bool {
        match self.state.tabs.active_tab_mut() {
            Some(tab) => {
                tab.content = Some(content.into());
                tab.is_dirty = true;
                true
            }
            None => false,
        }
    }

    /// Write the active buffer through the gateway and clear its dirty flag.
    #[instrument(skip(self))]
    pub async fn save_active(&mut self) -> Result<()> {
        let Some(tab) = self.state.tabs.active_tab() else {
            return Ok(());
        };
        let path = tab.path.clone();
        let content = tab.content.clone().unwrap_or_default();
        self.gateway.write_file(&path, &content).await?;

        let mut next = self.state.clone();
        if let Some(tab) = next.tabs.get_mut(&path) {
            tab.is_dirty = false;
        }
        if let Some(entity) = next.store.files.iter_mut().find(|e| e.path == path) {
            entity.size = Some(content.len() as u64);
        }
        self.commit(next);
        debug!(%path, "saved");
        Ok(())
    }

    // ───────────────────────────────────── roots ─────────────

    /// Scan `path` and add it as a root folder.  Returns `false` if it was
    /// already a root.
    #[instrument(skip(self))]
    pub async fn add_root_folder(&mut self, path: &str) -> Result<bool> {
        self.ensure_idle()?;
        let root = path::normalize(path);
        if self.state.is_root(&root) {
            return Ok(false);
        }
        let scan = self.gateway.scan_directory(&root).await?;
        let mut next = self.state.clone();
        let added = scan.merge_into(&mut next.store);
        if !next.store.is_folder(&root) {
            return Err(WorkspaceError::NotAFolder(root));
        }
        next.roots.push(root.clone());
        next.expanded.insert(root.clone(), true);
        self.commit(next);
        info!(%root, added, "root folder added");
        Ok(true)
    }

    /// Drop a root folder from the view.  Nothing is deleted on disk.
    pub async fn remove_root_folder(&mut self, path: &str) -> Result<()> {
        self.ensure_idle()?;
        if !self.state.is_root(path) {
            return Err(WorkspaceError::Unresolved(path.to_string()));
        }
        let mut next = self.state.clone();
        next.remove_scope(path);
        self.commit(next);
        self.load_active_content().await;
        info!(root = path, "root folder removed");
        Ok(())
    }

    /// Rescan every root, keep the order map, prune stale references.
    /// Roots that fail to scan are reported and dropped.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<Vec<ItemError>> {
        self.ensure_idle()?;
        let mut next = self.state.clone();
        next.store.clear();
        let mut failures = Vec::new();
        for root in &self.state.roots {
            match self.gateway.scan_directory(root).await {
                Ok(scan) => {
                    scan.merge_into(&mut next.store);
                }
                Err(err) => {
                    warn!(%root, %err, "rescan failed");
                    failures.push(ItemError {
                        path: root.clone(),
                        name: path::basename(root).to_string(),
                        error: err.into(),
                    });
                }
            }
        }
        let pruned = next.prune_stale();
        self.commit(next);
        self.load_active_content().await;
        debug!(pruned, "refreshed");
        Ok(failures)
    }

    // ───────────────────────────────────── view state ────────

    pub fn toggle_expanded(&mut self, path: &str) -> bool {
        let open = !is_expanded(&self.state.expanded, path);
        self.set_expanded(path, open);
        open
    }

    pub fn set_expanded(&mut self, path: &str, open: bool) {
        if !self.state.store.is_folder(path) {
            return;
        }
        self.state.expanded.insert(path.to_string(), open);
    }

    /// Expand every ancestor folder of `path` so it becomes visible.
    pub fn expand_to(&mut self, path: &str) {
        let mut current = path::dirname(path);
        loop {
            if self.state.store.is_folder(&current) {
                self.state.expanded.insert(current.clone(), true);
            }
            if self.state.is_root(&current) || path::is_root(&current) {
                break;
            }
            current = path::dirname(&current);
        }
    }

    pub fn collapse_all(&mut self) {
        self.state.expanded.clear();
    }

    pub fn set_sort(&mut self, sort: SortSettings) {
        let mut next = self.state.clone();
        next.sort = sort;
        self.commit(next);
    }

    /// Stale references in the live state.
    pub fn validate(&self) -> Vec<StaleRef> {
        self.state.validate()
    }

    pub fn prune_stale(&mut self) -> usize {
        let mut next = self.state.clone();
        let removed = next.prune_stale();
        if removed > 0 {
            self.commit(next);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;

    fn gateway() -> MemoryGateway {
        MemoryGateway::new()
            .with_file("/r/a.md", "# a")
            .with_file("/r/b.md", "# b")
            .with_file("/r/c.md", "# c")
            .with_file("/r/f/x.md", "# x")
    }

    async fn workspace() -> Workspace<MemoryGateway> {
        let mut ws = Workspace::new(gateway());
        ws.add_root_folder("/r").await.unwrap();
        ws
    }

    #[tokio::test]
    async fn add_root_scans_and_expands() {
        let mut ws = workspace().await;
        assert_eq!(ws.state().roots, vec!["/r".to_string()]);
        assert_eq!(ws.visible_paths()[..2], ["/r".to_string(), "/r/f".into()]);
        assert!(!ws.add_root_folder("/r").await.unwrap());
    }

    #[tokio::test]
    async fn open_edit_save_cycle() {
        let mut ws = workspace().await;
        ws.open_file("/r/a.md").await.unwrap();
        assert_eq!(ws.active_content(), Some("# a"));
        assert!(ws.edit_active("# changed"));
        assert_eq!(ws.state().tabs.dirty_paths(), vec!["/r/a.md".to_string()]);

        ws.save_active().await.unwrap();
        assert!(ws.state().tabs.dirty_paths().is_empty());
        assert_eq!(ws.gateway().content("/r/a.md").as_deref(), Some("# changed"));
        assert_eq!(ws.state().file_history, vec!["/r/a.md".to_string()]);
    }

    #[tokio::test]
    async fn closing_active_tab_loads_fallback_content() {
        let mut ws = workspace().await;
        ws.open_file("/r/a.md").await.unwrap();
        ws.open_file("/r/b.md").await.unwrap();
        ws.close_tab("/r/b.md").await;
        assert_eq!(ws.state().active_file(), Some("/r/a.md"));
        assert_eq!(ws.active_content(), Some("# a"));
    }

    #[tokio::test]
    async fn opening_a_folder_is_unresolved() {
        let mut ws = workspace().await;
        assert!(matches!(
            ws.open_file("/r/f").await,
            Err(WorkspaceError::Unresolved(_))
        ));
    }

    #[tokio::test]
    async fn refresh_picks_up_external_changes() {
        let mut ws = workspace().await;
        ws.open_file("/r/c.md").await.unwrap();
        ws.gateway().add_file("/r/new.md", "");
        ws.gateway().remove_external("/r/c.md");

        let failures = ws.refresh().await.unwrap();
        assert!(failures.is_empty());
        assert!(ws.state().store.contains("/r/new.md"));
        assert!(!ws.state().tabs.contains("/r/c.md"));
        assert!(ws.validate().is_empty());
    }

    #[tokio::test]
    async fn expand_to_reveals_nested_file() {
        let mut ws = workspace().await;
        ws.collapse_all();
        ws.expand_to("/r/f/x.md");
        assert!(ws.visible_paths().contains(&"/r/f/x.md".to_string()));
    }
}
