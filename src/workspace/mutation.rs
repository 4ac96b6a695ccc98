//! Structural operations: move/reorder, rename, delete, create, copy.

use tracing::{debug, info, instrument, warn};

use super::report::{BatchOp, BatchReport};
use super::state::WorkspaceState;
use super::tabs::Tab;
use super::Workspace;
use crate::core::entity::EntityKind;
use crate::core::naming::{default_name, unique_name};
use crate::core::order::Placement;
use crate::core::path;
use crate::core::selection::DropPosition;
use crate::error::{Result, ValidationError, WorkspaceError};
use crate::gateway::FileGateway;

/// Drop duplicates and paths already covered by another selected folder;
/// those travel with their ancestor.
fn top_level(paths: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let covered = paths
            .iter()
            .any(|other| other != p && path::is_descendant(p, other));
        if !covered && !out.contains(p) {
            out.push(p.clone());
        }
    }
    out
}

fn placement(position: DropPosition) -> Placement {
    match position {
        DropPosition::Top => Placement::Before,
        _ => Placement::After,
    }
}

impl<G: FileGateway> Workspace<G> {
    // ───────────────────────────────────── move / reorder ────

    /// Apply a drop of `sources` onto `target`.
    ///
    /// A top/bottom drop whose sources all share the target's parent only
    /// rewrites the order map (or the root list, when every source and the
    /// target are roots).  Anything else moves the sources into a folder:
    /// the target itself for a middle drop, otherwise the target's parent.
    #[instrument(skip(self))]
    pub async fn apply_move(
        &mut self,
        sources: &[String],
        target: &str,
        position: DropPosition,
    ) -> Result<BatchReport> {
        self.ensure_idle()?;
        let sources = top_level(sources);
        if sources.is_empty() {
            return Ok(BatchReport::new(BatchOp::Move));
        }
        let target_is_folder = match self.state.store.get(target) {
            Some(entity) => entity.is_folder(),
            None => return Err(WorkspaceError::Unresolved(target.to_string())),
        };
        if let Some(source) = sources
            .iter()
            .find(|s| path::is_same_or_descendant(target, s))
        {
            debug!(%source, target, "drop onto dragged item or its subtree rejected");
            return Err(ValidationError::InvalidDropTarget {
                source_path: source.clone(),
            }
            .into());
        }

        let position = position.for_target(target_is_folder);
        if position == DropPosition::Middle {
            return self.move_into(&sources, target).await;
        }

        let parent = path::dirname(target);
        if self.state.is_root(target) {
            if sources.iter().all(|s| self.state.is_root(s)) {
                return Ok(self.reorder_roots(&sources, target, placement(position)));
            }
            if !self.state.store.is_folder(&parent) {
                debug!(target, "edge drop beside a top-level root");
                return Err(ValidationError::OutsideWorkspace(target.to_string()).into());
            }
            return self.move_into(&sources, &parent).await;
        }

        let same_parent = sources
            .iter()
            .all(|s| !self.state.is_root(s) && path::dirname(s) == parent);
        if same_parent {
            Ok(self.reorder_within(&parent, &sources, target, placement(position)))
        } else {
            self.move_into(&sources, &parent).await
        }
    }

    fn reorder_within(
        &mut self,
        parent: &str,
        sources: &[String],
        target: &str,
        placement: Placement,
    ) -> BatchReport {
        let displayed = self.tree.child_paths(parent);
        let mut next = self.state.clone();
        if !next
            .order
            .reorder_block(parent, &displayed, sources, target, placement)
        {
            let mut report = BatchReport::new(BatchOp::Move);
            sources.iter().for_each(|s| report.skip(s));
            return report;
        }
        self.commit(next);
        info!(parent, count = sources.len(), "reordered");
        BatchReport::reorder()
    }

    fn reorder_roots(&mut self, sources: &[String], target: &str, placement: Placement) -> BatchReport {
        let mut roots = self.state.roots.clone();
        let block: Vec<String> = roots.iter().filter(|r| sources.contains(r)).cloned().collect();
        roots.retain(|r| !sources.contains(r));
        let Some(idx) = roots.iter().position(|r| r == target) else {
            let mut report = BatchReport::new(BatchOp::Move);
            sources.iter().for_each(|s| report.skip(s));
            return report;
        };
        let at = match placement {
            Placement::Before => idx,
            Placement::After => idx + 1,
        };
        roots.splice(at..at, block);

        let mut next = self.state.clone();
        next.roots = roots;
        self.commit(next);
        info!(count = sources.len(), "reordered roots");
        BatchReport::reorder()
    }

    /// Move each source into `folder`, one at a time, committing whatever
    /// succeeded.
    #[instrument(skip(self))]
    pub async fn move_into(&mut self, sources: &[String], folder: &str) -> Result<BatchReport> {
        self.ensure_idle()?;
        if !self.state.store.is_folder(folder) {
            return Err(WorkspaceError::NotAFolder(folder.to_string()));
        }
        let mut next = self.state.clone();
        let mut report = BatchReport::new(BatchOp::Move);
        for source in top_level(sources) {
            match self.move_one(&mut next, &source, folder).await {
                Ok(Some(dest)) => report.success(&source, &dest),
                Ok(None) => report.skip(&source),
                Err(err) => {
                    warn!(%source, %err, "move failed");
                    report.fail(&source, err);
                }
            }
        }
        if !report.succeeded.is_empty() {
            next.expanded.insert(folder.to_string(), true);
            self.commit(next);
            self.load_active_content().await;
        }
        info!(outcome = ?report.outcome(), "move finished");
        Ok(report)
    }

    /// Move a single item into `folder` inside the in-progress `next`
    /// state.  `Ok(None)` means it already lives there.
    async fn move_one(
        &self,
        next: &mut WorkspaceState,
        source: &str,
        folder: &str,
    ) -> Result<Option<String>> {
        let kind = next
            .store
            .kind_of(source)
            .ok_or_else(|| WorkspaceError::Unresolved(source.to_string()))?;
        if path::is_same_or_descendant(folder, source) {
            return Err(ValidationError::InvalidDropTarget {
                source_path: source.to_string(),
            }
            .into());
        }
        if path::dirname(source) == folder && !next.is_root(source) {
            return Ok(None);
        }

        let name = unique_name(path::basename(source), kind, &next.store.child_names(folder));
        let dest = path::join(folder, &name);
        self.gateway
            .move_item(source, &dest, kind.is_folder())
            .await?;

        next.relocate(source, &dest);
        // A root dropped into a workspace folder becomes an ordinary child.
        if next.is_root(&dest) {
            next.roots.retain(|r| r != &dest);
            next.append_to_order(folder, &dest);
        }
        Ok(Some(dest))
    }

    // ───────────────────────────────────── rename ────────────

    /// Rename (or relocate) `old` to `new_path`.  Any failure leaves the
    /// workspace untouched.  A pending new file is opened once renamed.
    #[instrument(skip(self))]
    pub async fn rename_item(&mut self, old: &str, new_path: &str) -> Result<String> {
        self.ensure_idle()?;
        let new_path = path::normalize(new_path);
        let kind = self
            .state
            .store
            .kind_of(old)
            .ok_or_else(|| WorkspaceError::Unresolved(old.to_string()))?;
        let name = path::basename(&new_path).to_string();
        if !path::is_valid_name(&name) || name != name.trim() {
            return Err(ValidationError::InvalidName(name).into());
        }
        if new_path == old {
            // Keeping the suggested name still names a pending file.
            self.confirm_pending(old).await?;
            return Ok(new_path);
        }
        if path::is_descendant(&new_path, old) {
            return Err(ValidationError::InvalidDropTarget {
                source_path: old.to_string(),
            }
            .into());
        }
        if self.state.store.contains(&new_path) {
            return Err(ValidationError::NameTaken(name).into());
        }
        let new_parent = path::dirname(&new_path);
        if !self.state.is_root(old) && !self.state.store.is_folder(&new_parent) {
            return Err(ValidationError::OutsideWorkspace(new_path).into());
        }

        self.gateway
            .move_item(old, &new_path, kind.is_folder())
            .await?;

        let mut next = self.state.clone();
        next.relocate(old, &new_path);
        if next.pending.remove(&new_path) {
            next.tabs.open(Tab::new(&new_path));
            next.tabs.activate(&new_path);
            next.push_history(&new_path, self.history_limit);
        }
        self.commit(next);
        self.load_active_content().await;
        info!(from = old, to = %new_path, "renamed");
        Ok(new_path)
    }

    /// Rename `path` to `new_name` inside its current parent.
    pub async fn rename_to(&mut self, path: &str, new_name: &str) -> Result<String> {
        let trimmed = new_name.trim();
        if !path::is_valid_name(trimmed) {
            return Err(ValidationError::InvalidName(new_name.to_string()).into());
        }
        let target = path::join(&path::dirname(path), trimmed);
        self.rename_item(path, &target).await
    }

    // ───────────────────────────────────── delete ────────────

    /// Delete one item.  Files are removed from disk; folders are only
    /// removed from the workspace view.
    #[instrument(skip(self))]
    pub async fn delete_item(&mut self, path: &str) -> Result<()> {
        self.ensure_idle()?;
        let mut next = self.state.clone();
        self.delete_one(&mut next, path).await?;
        self.commit(next);
        self.load_active_content().await;
        Ok(())
    }

    /// Delete several items with per-item error collection.
    #[instrument(skip(self))]
    pub async fn delete_items(&mut self, paths: &[String]) -> Result<BatchReport> {
        self.ensure_idle()?;
        let mut next = self.state.clone();
        let mut report = BatchReport::new(BatchOp::Delete);
        for p in top_level(paths) {
            match self.delete_one(&mut next, &p).await {
                Ok(()) => report.success(&p, &p),
                Err(err) => {
                    warn!(path = %p, %err, "delete failed");
                    report.fail(&p, err);
                }
            }
        }
        if !report.succeeded.is_empty() {
            self.commit(next);
            self.load_active_content().await;
        }
        info!(outcome = ?report.outcome(), "delete finished");
        Ok(report)
    }

    async fn delete_one(&self, next: &mut WorkspaceState, path: &str) -> Result<()> {
        let kind = next
            .store
            .kind_of(path)
            .ok_or_else(|| WorkspaceError::Unresolved(path.to_string()))?;
        if !kind.is_folder() {
            self.gateway.delete_file(path).await?;
            next.file_history.retain(|p| p != path);
        }
        let closed = next.remove_scope(path);
        info!(path, folder = kind.is_folder(), closed_tabs = closed.len(), "deleted");
        Ok(())
    }

    // ───────────────────────────────────── create ────────────

    /// Create `Untitled.md` (or `Untitled (n).md`) in `parent`.  The file
    /// stays pending until it is renamed or confirmed.
    pub async fn create_file(&mut self, parent: &str) -> Result<String> {
        self.create_entity(parent, EntityKind::File).await
    }

    /// Create `New Folder` (or `New Folder (n)`) in `parent`.
    pub async fn create_folder(&mut self, parent: &str) -> Result<String> {
        self.create_entity(parent, EntityKind::Folder).await
    }

    #[instrument(skip(self))]
    async fn create_entity(&mut self, parent: &str, kind: EntityKind) -> Result<String> {
        self.ensure_idle()?;
        match self.state.store.get(parent) {
            Some(entity) if entity.is_folder() => {}
            Some(_) => return Err(WorkspaceError::NotAFolder(parent.to_string())),
            None => return Err(WorkspaceError::Unresolved(parent.to_string())),
        }
        let name = unique_name(
            default_name(kind),
            kind,
            &self.state.store.child_names(parent),
        );
        let path = path::join(parent, &name);
        let mut entity = match kind {
            EntityKind::File => self.gateway.create_file(&path, None).await?,
            EntityKind::Folder => self.gateway.create_folder(&path).await?,
        };
        entity.relocate_to(path.clone());

        let mut next = self.state.clone();
        next.store.insert(entity);
        next.append_to_order(parent, &path);
        match kind {
            EntityKind::File => {
                next.pending.insert(path.clone());
            }
            EntityKind::Folder => next.order.ensure(&path),
        }
        next.expanded.insert(parent.to_string(), true);
        self.commit(next);
        info!(%path, "created");
        Ok(path)
    }

    /// Accept a pending file under its current name and open it.
    pub async fn confirm_pending(&mut self, path: &str) -> Result<()> {
        if !self.state.pending.contains(path) {
            return Ok(());
        }
        let mut next = self.state.clone();
        next.pending.remove(path);
        self.commit(next);
        self.open_file(path).await
    }

    // ───────────────────────────────────── copy ──────────────

    /// Copy each source into `folder`, suffixing names on collision.
    #[instrument(skip(self))]
    pub async fn copy_items(&mut self, sources: &[String], folder: &str) -> Result<BatchReport> {
        self.ensure_idle()?;
        if !self.state.store.is_folder(folder) {
            return Err(WorkspaceError::NotAFolder(folder.to_string()));
        }
        let mut next = self.state.clone();
        let mut report = BatchReport::new(BatchOp::Copy);
        for source in top_level(sources) {
            match self.copy_one(&mut next, &source, folder).await {
                Ok(dest) => report.success(&source, &dest),
                Err(err) => {
                    warn!(%source, %err, "copy failed");
                    report.fail(&source, err);
                }
            }
        }
        if !report.succeeded.is_empty() {
            next.expanded.insert(folder.to_string(), true);
            self.commit(next);
        }
        info!(outcome = ?report.outcome(), "copy finished");
        Ok(report)
    }

    async fn copy_one(&self, next: &mut WorkspaceState, source: &str, folder: &str) -> Result<String> {
        let kind = next
            .store
            .kind_of(source)
            .ok_or_else(|| WorkspaceError::Unresolved(source.to_string()))?;
        if path::is_same_or_descendant(folder, source) {
            return Err(ValidationError::InvalidDropTarget {
                source_path: source.to_string(),
            }
            .into());
        }
        let name = unique_name(path::basename(source), kind, &next.store.child_names(folder));
        let dest = path::join(folder, &name);
        let mut entity = self
            .gateway
            .copy_item(source, &dest, kind.is_folder())
            .await?;
        entity.relocate_to(dest.clone());
        next.store.insert(entity);

        if kind.is_folder() {
            match self.gateway.scan_directory(&dest).await {
                Ok(scan) => {
                    scan.merge_into(&mut next.store);
                }
                Err(err) => warn!(%dest, %err, "copied folder could not be scanned"),
            }
            // Carry the explicit ordering of the copied subtree along.
            let copied: Vec<(String, Vec<String>)> = next
                .order
                .iter()
                .filter(|(key, _)| path::is_same_or_descendant(key, source))
                .filter_map(|(key, children)| {
                    let key = path::rebase(key, source, &dest)?;
                    let children = children
                        .iter()
                        .filter_map(|c| path::rebase(c, source, &dest))
                        .collect();
                    Some((key, children))
                })
                .collect();
            for (key, children) in copied {
                next.order.set(key, children);
            }
        }
        next.append_to_order(folder, &dest);
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::memory::{GatewayCall, MemoryGateway};
    use crate::workspace::Outcome;

    fn s(p: &str) -> String {
        p.to_string()
    }

    async fn workspace() -> Workspace<MemoryGateway> {
        let gw = MemoryGateway::new()
            .with_file("/r/a.md", "a")
            .with_file("/r/b.md", "b")
            .with_file("/r/c.md", "c")
            .with_file("/r/f/x.md", "x")
            .with_folder("/r/f/sub")
            .with_folder("/r/g");
        let mut ws = Workspace::new(gw);
        ws.add_root_folder("/r").await.unwrap();
        ws.gateway().clear_calls();
        ws
    }

    #[test]
    fn top_level_drops_nested_and_duplicates() {
        let picked = top_level(&[s("/r/f/x.md"), s("/r/f"), s("/r/a.md"), s("/r/a.md")]);
        assert_eq!(picked, vec![s("/r/f"), s("/r/a.md")]);
    }

    #[tokio::test]
    async fn same_parent_edge_drop_only_reorders() {
        let mut ws = workspace().await;
        let report = ws
            .apply_move(&[s("/r/c.md")], "/r/a.md", DropPosition::Top)
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Reordered);
        assert!(ws.gateway().structural_calls().is_empty());
        let children = ws.tree().child_paths("/r");
        let c = children.iter().position(|p| p == "/r/c.md").unwrap();
        assert_eq!(children[c + 1], "/r/a.md");
    }

    #[tokio::test]
    async fn middle_drop_on_file_row_becomes_bottom_reorder() {
        let mut ws = workspace().await;
        let report = ws
            .apply_move(&[s("/r/a.md")], "/r/b.md", DropPosition::Middle)
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Reordered);
        let children = ws.tree().child_paths("/r");
        let b = children.iter().position(|p| p == "/r/b.md").unwrap();
        assert_eq!(children[b + 1], "/r/a.md");
    }

    #[tokio::test]
    async fn dropping_on_folder_moves_and_suffixes() {
        let mut ws = workspace().await;
        ws.gateway().add_file("/r/g/a.md", "other");
        ws.refresh().await.unwrap();

        let report = ws
            .apply_move(&[s("/r/a.md")], "/r/g", DropPosition::Middle)
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Completed);
        assert_eq!(report.destination_of("/r/a.md"), Some("/r/g/a (1).md"));
        assert!(ws.state().store.contains("/r/g/a (1).md"));
        assert_eq!(
            ws.gateway().structural_calls(),
            vec![GatewayCall::Move {
                from: s("/r/a.md"),
                to: s("/r/g/a (1).md")
            }]
        );
    }

    #[tokio::test]
    async fn dropping_into_current_parent_is_unchanged() {
        let mut ws = workspace().await;
        let report = ws
            .apply_move(&[s("/r/a.md")], "/r", DropPosition::Middle)
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Unchanged);
        assert!(ws.gateway().structural_calls().is_empty());
    }

    #[tokio::test]
    async fn folder_onto_own_descendant_is_rejected_untouched() {
        let mut ws = workspace().await;
        let before = ws.state().clone();
        let err = ws
            .apply_move(&[s("/r/f")], "/r/f/sub", DropPosition::Middle)
            .await
            .unwrap_err();
        assert!(err.is_silent());
        assert_eq!(ws.state(), &before);
        assert!(ws.gateway().calls().is_empty());
    }

    #[tokio::test]
    async fn mixed_parent_edge_drop_moves_into_target_parent() {
        let mut ws = workspace().await;
        let report = ws
            .apply_move(&[s("/r/f/x.md"), s("/r/a.md")], "/r/b.md", DropPosition::Bottom)
            .await
            .unwrap();
        assert_eq!(report.succeeded, vec![(s("/r/f/x.md"), s("/r/x.md"))]);
        assert_eq!(report.unchanged, vec![s("/r/a.md")]);
        assert!(ws.state().store.contains("/r/x.md"));
    }

    #[tokio::test]
    async fn rename_keeps_order_slot_and_opens_pending_file() {
        let mut ws = workspace().await;
        let created = ws.create_file("/r").await.unwrap();
        assert_eq!(created, "/r/Untitled.md");
        assert!(ws.state().pending.contains(&created));
        assert!(ws.state().tabs.is_empty());

        let slot = ws.state().order.get("/r").unwrap().iter().position(|p| p == &created);
        let renamed = ws.rename_to(&created, "notes.md").await.unwrap();
        assert_eq!(renamed, "/r/notes.md");
        assert_eq!(
            ws.state().order.get("/r").unwrap().iter().position(|p| p == &renamed),
            slot
        );
        assert!(ws.state().pending.is_empty());
        assert_eq!(ws.state().active_file(), Some("/r/notes.md"));
    }

    #[tokio::test]
    async fn rename_failure_leaves_state_untouched() {
        let mut ws = workspace().await;
        let before = ws.state().clone();
        ws.gateway()
            .fail_on("/r/a.md", GatewayError::PermissionDenied(s("locked")));
        let err = ws.rename_to("/r/a.md", "z.md").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Gateway(GatewayError::PermissionDenied(_))));
        assert_eq!(ws.state(), &before);

        assert!(matches!(
            ws.rename_to("/r/a.md", "b.md").await,
            Err(WorkspaceError::Validation(ValidationError::NameTaken(_)))
        ));
        assert!(matches!(
            ws.rename_to("/r/a.md", "  ").await,
            Err(WorkspaceError::Validation(ValidationError::InvalidName(_)))
        ));
    }

    #[tokio::test]
    async fn folder_delete_is_view_only() {
        let mut ws = workspace().await;
        ws.delete_item("/r/f").await.unwrap();
        assert!(!ws.state().store.contains("/r/f/x.md"));
        assert!(ws.gateway().exists("/r/f/x.md"));
        assert!(ws.gateway().structural_calls().is_empty());

        ws.delete_item("/r/a.md").await.unwrap();
        assert!(!ws.gateway().exists("/r/a.md"));
    }

    #[tokio::test]
    async fn create_folder_initialises_empty_order() {
        let mut ws = workspace().await;
        let first = ws.create_folder("/r").await.unwrap();
        let second = ws.create_folder("/r").await.unwrap();
        assert_eq!(first, "/r/New Folder");
        assert_eq!(second, "/r/New Folder (1)");
        assert_eq!(ws.state().order.get(&first), Some(&[][..]));
        assert!(ws.state().pending.is_empty());
    }

    #[tokio::test]
    async fn copy_folder_brings_descendants() {
        let mut ws = workspace().await;
        let report = ws.copy_items(&[s("/r/f")], "/r/g").await.unwrap();
        assert_eq!(report.outcome(), Outcome::Completed);
        assert!(ws.state().store.contains("/r/g/f/x.md"));
        assert!(ws.state().store.contains("/r/f/x.md"));

        let again = ws.copy_items(&[s("/r/a.md")], "/r").await.unwrap();
        assert_eq!(again.destination_of("/r/a.md"), Some("/r/a (1).md"));
    }

    #[tokio::test]
    async fn confirm_pending_opens_file() {
        let mut ws = workspace().await;
        let created = ws.create_file("/r/g").await.unwrap();
        ws.confirm_pending(&created).await.unwrap();
        assert_eq!(ws.state().active_file(), Some(created.as_str()));
        assert_eq!(ws.active_content(), Some(""));
    }

    #[tokio::test]
    async fn keeping_the_suggested_name_opens_pending_file() {
        let mut ws = workspace().await;
        let created = ws.create_file("/r").await.unwrap();
        let renamed = ws.rename_to(&created, "Untitled.md").await.unwrap();
        assert_eq!(renamed, created);
        assert!(ws.state().pending.is_empty());
        assert!(ws.state().tabs.contains(&created));
        assert_eq!(ws.state().active_file(), Some(created.as_str()));
        assert!(ws.gateway().calls().iter().all(|c| !matches!(c, GatewayCall::Move { .. })));
    }

    #[tokio::test]
    async fn deleted_file_leaves_history() {
        let mut ws = workspace().await;
        ws.open_file("/r/a.md").await.unwrap();
        ws.open_file("/r/b.md").await.unwrap();
        ws.delete_item("/r/a.md").await.unwrap();
        assert_eq!(ws.state().file_history, ["/r/b.md"]);
    }

    #[tokio::test]
    async fn root_reorder_touches_only_root_list() {
        let mut ws = workspace().await;
        ws.gateway().add_folder("/s");
        ws.add_root_folder("/s").await.unwrap();
        let report = ws
            .apply_move(&[s("/s")], "/r", DropPosition::Top)
            .await
            .unwrap();
        assert_eq!(report.outcome(), Outcome::Reordered);
        assert_eq!(ws.state().roots, vec![s("/s"), s("/r")]);
    }

    #[tokio::test]
    async fn edge_drop_beside_top_level_root_is_outside_workspace() {
        let mut ws = workspace().await;
        let err = ws
            .apply_move(&[s("/r/a.md")], "/r", DropPosition::Bottom)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Validation(ValidationError::OutsideWorkspace(_))
        ));
    }
}
