//! The live workspace value.
//!
//! `WorkspaceState` is plain data.  The engine clones it, applies one
//! logical operation to the clone and swaps the result in, so no observer
//! ever sees a half-applied change.  The helpers here are the building
//! blocks those operations share; none of them do I/O.

use std::collections::BTreeSet;

use crate::core::entity::FlatStore;
use crate::core::order::OrderMap;
use crate::core::path;
use crate::core::tree::{build_tree, sort_siblings, ExpandedNodes, SortSettings, WorkspaceTree};

use super::tabs::{OpenTabs, Tab};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    pub store: FlatStore,
    /// Ordered root folders.
    pub roots: Vec<String>,
    pub order: OrderMap,
    pub expanded: ExpandedNodes,
    pub tabs: OpenTabs,
    pub sort: SortSettings,
    /// Files created but not yet named; they open once renamed.
    pub pending: BTreeSet<String>,
    /// Recently opened files, most recent first.
    pub file_history: Vec<String>,
}

/// A reference that no longer matches the flat store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleRef {
    Root(String),
    OrderKey(String),
    OrderValue { parent: String, child: String },
    Tab(String),
    Expanded(String),
    Pending(String),
    /// An entity no root reaches.
    Orphan(String),
}

impl WorkspaceState {
    /// Same sort preferences and history, everything else empty.
    pub fn cleared(&self) -> Self {
        Self {
            sort: self.sort,
            file_history: self.file_history.clone(),
            ..Self::default()
        }
    }

    pub fn build_tree(&self) -> WorkspaceTree {
        build_tree(&self.store, &self.roots, &self.order, &self.sort)
    }

    pub fn is_root(&self, path: &str) -> bool {
        self.roots.iter().any(|r| r == path)
    }

    pub fn active_file(&self) -> Option<&str> {
        self.tabs.active()
    }

    /// Children of `parent` in the order the tree shows them.
    pub fn displayed_children(&self, parent: &str) -> Vec<String> {
        let children = self
            .store
            .children_of(parent)
            .into_iter()
            .filter(|e| !self.is_root(&e.path))
            .collect();
        sort_siblings(children, self.order.get(parent), &self.sort)
            .into_iter()
            .map(|e| e.path.clone())
            .collect()
    }

    /// Put `child` last in `parent`'s explicit order.  A parent without an
    /// explicit order is first seeded with what is currently displayed, so
    /// the other siblings keep their places.
    pub fn append_to_order(&mut self, parent: &str, child: &str) {
        if self.order.get(parent).is_none() {
            let seeded: Vec<String> = self
                .displayed_children(parent)
                .into_iter()
                .filter(|c| c != child)
                .collect();
            self.order.set(parent, seeded);
        }
        self.order.append_child(parent, child);
    }

    /// Rewrite every reference to `old` (and anything below it) so it points
    /// at `new`.  The flat store must not already hold `new`.
    ///
    /// Within the same parent the item keeps its slot in the order map and
    /// root list; across parents it leaves the old list and is appended to
    /// the new one.
    pub fn relocate(&mut self, old: &str, new: &str) {
        let old_parent = path::dirname(old);
        let new_parent = path::dirname(new);

        self.store.rebase_subtree(old, new);
        self.tabs.rebase(old, new);
        self.pending = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|p| path::rebase(&p, old, new).unwrap_or(p))
            .collect();
        for entry in self.file_history.iter_mut().chain(self.roots.iter_mut()) {
            if let Some(rebased) = path::rebase(entry, old, new) {
                *entry = rebased;
            }
        }
        self.expanded = std::mem::take(&mut self.expanded)
            .into_iter()
            .map(|(k, v)| (path::rebase(&k, old, new).unwrap_or(k), v))
            .collect();

        if old_parent == new_parent {
            self.order.rebase(old, new);
        } else {
            self.order.remove_child(&old_parent, old);
            self.order.rebase(old, new);
            if !self.is_root(new) {
                self.append_to_order(&new_parent, new);
            }
        }
    }

    /// Forget `scope` and everything below it.  Returns the closed tabs.
    pub fn remove_scope(&mut self, scope: &str) -> Vec<Tab> {
        let inside = |p: &str| path::is_same_or_descendant(p, scope);
        self.store.remove_subtree(scope);
        self.roots.retain(|r| !inside(r));
        self.order.prune(scope);
        self.expanded.retain(|k, _| !inside(k));
        self.pending.retain(|p| !inside(p));
        self.tabs.close_scope(scope)
    }

    /// Record `path` as the most recently opened file.
    pub fn push_history(&mut self, path: &str, limit: usize) {
        self.file_history.retain(|p| p != path);
        self.file_history.insert(0, path.to_string());
        self.file_history.truncate(limit);
    }

    /// Every reference that does not match the flat store.
    pub fn validate(&self) -> Vec<StaleRef> {
        let mut stale = Vec::new();
        let is_folder = |p: &str| self.store.is_folder(p);
        let is_file = |p: &str| self.store.get(p).is_some_and(|e| !e.is_folder());

        for root in &self.roots {
            if !is_folder(root) {
                stale.push(StaleRef::Root(root.clone()));
            }
        }
        for (parent, children) in self.order.iter() {
            if !is_folder(parent) {
                stale.push(StaleRef::OrderKey(parent.clone()));
                continue;
            }
            for child in children {
                if !self.store.contains(child) || path::dirname(child) != *parent {
                    stale.push(StaleRef::OrderValue {
                        parent: parent.clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        for tab in self.tabs.iter() {
            if !is_file(&tab.path) {
                stale.push(StaleRef::Tab(tab.path.clone()));
            }
        }
        for key in self.expanded.keys() {
            if !is_folder(key) {
                stale.push(StaleRef::Expanded(key.clone()));
            }
        }
        for p in &self.pending {
            if !self.store.contains(p) {
                stale.push(StaleRef::Pending(p.clone()));
            }
        }
        stale.extend(self.build_tree().orphans.into_iter().map(StaleRef::Orphan));
        stale
    }

    /// Drop every stale reference and orphaned entity.  Returns how many
    /// references were removed.
    pub fn prune_stale(&mut self) -> usize {
        let stale = self.validate();
        if stale.is_empty() {
            return 0;
        }
        for item in &stale {
            if let StaleRef::Orphan(p) = item {
                self.store.remove(p);
            }
        }

        let store = &self.store;
        let is_folder = |p: &str| store.is_folder(p);
        self.roots.retain(|r| is_folder(r));
        self.order.retain_paths(|p| store.contains(p));
        for (parent, child) in self.order.misplaced() {
            self.order.remove_child(&parent, &child);
        }
        self.expanded.retain(|k, _| is_folder(k));
        self.pending.retain(|p| store.contains(p));
        self.tabs
            .close_where(|t| store.get(&t.path).map_or(true, |e| e.is_folder()));
        stale.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Entity;

    fn state() -> WorkspaceState {
        let mut s = WorkspaceState::default();
        for f in ["/r", "/r/f", "/r/g"] {
            s.store.insert(Entity::folder(f));
        }
        for f in ["/r/a.md", "/r/f/x.md"] {
            s.store.insert(Entity::file(f));
        }
        s.roots.push("/r".into());
        s
    }

    #[test]
    fn append_seeds_with_displayed_order() {
        let mut s = state();
        s.store.insert(Entity::file("/r/0.md"));
        s.append_to_order("/r", "/r/0.md");
        assert_eq!(
            s.order.get("/r").unwrap(),
            &["/r/f".to_string(), "/r/g".into(), "/r/a.md".into(), "/r/0.md".into()]
        );
    }

    #[test]
    fn relocate_across_parents_rewrites_everything() {
        let mut s = state();
        s.order.set("/r", vec!["/r/f".into(), "/r/a.md".into()]);
        s.order.set("/r/f", vec!["/r/f/x.md".into()]);
        s.tabs.open(Tab::new("/r/f/x.md"));
        s.tabs.activate("/r/f/x.md");
        s.expanded.insert("/r/f".into(), true);

        s.relocate("/r/f", "/r/g/f");

        assert!(s.store.get("/r/g/f/x.md").is_some());
        assert_eq!(s.active_file(), Some("/r/g/f/x.md"));
        assert_eq!(s.order.get("/r").unwrap(), &["/r/a.md".to_string()]);
        assert_eq!(s.order.get("/r/g").unwrap().last().map(String::as_str), Some("/r/g/f"));
        assert!(s.order.keys().all(|k| !path::is_same_or_descendant(k, "/r/f")));
        assert_eq!(s.expanded.get("/r/g/f"), Some(&true));
        assert!(s.validate().is_empty());
    }

    #[test]
    fn relocate_within_parent_keeps_position() {
        let mut s = state();
        s.order.set("/r", vec!["/r/a.md".into(), "/r/f".into(), "/r/g".into()]);
        s.relocate("/r/f", "/r/notes");
        assert_eq!(
            s.order.get("/r").unwrap(),
            &["/r/a.md".to_string(), "/r/notes".into(), "/r/g".into()]
        );
    }

    #[test]
    fn remove_scope_prunes_references() {
        let mut s = state();
        s.order.set("/r/f", vec!["/r/f/x.md".into()]);
        s.order.set("/r", vec!["/r/f".into()]);
        s.tabs.open(Tab::new("/r/f/x.md"));
        s.remove_scope("/r/f");
        assert!(s.order.get("/r/f").is_none());
        assert!(s.order.get("/r").unwrap().is_empty());
        assert!(s.tabs.is_empty());
        assert!(!s.store.contains("/r/f/x.md"));
    }

    #[test]
    fn prune_stale_removes_dangling_refs() {
        let mut s = state();
        s.roots.push("/gone".into());
        s.order.set("/r", vec!["/r/missing.md".into(), "/r/a.md".into()]);
        s.expanded.insert("/r/zzz".into(), true);
        s.tabs.open(Tab::new("/r/ghost.md"));
        s.store.insert(Entity::file("/elsewhere/lost.md"));

        assert_eq!(s.validate().len(), 5);
        s.prune_stale();
        assert!(s.validate().is_empty());
        assert_eq!(s.roots, vec!["/r".to_string()]);
        assert_eq!(s.order.get("/r").unwrap(), &["/r/a.md".to_string()]);
    }

    #[test]
    fn history_is_capped_and_deduplicated() {
        let mut s = WorkspaceState::default();
        for p in ["/a", "/b", "/c", "/a"] {
            s.push_history(p, 2);
        }
        assert_eq!(s.file_history, vec!["/a".to_string(), "/c".into()]);
    }
}
