//! Flat entity store: the ground truth of what exists in the workspace.
//!
//! Files and folders are kept in two insertion-ordered lists keyed by their
//! unique path.  Display order lives elsewhere (see [`super::order`]); this
//! store only answers "does it exist, and what is it".
//!
//! Every entity carries an explicit `parent` path that is rewritten together
//! with its own path, so parent/child edges never have to be re-derived from
//! string surgery in the middle of a mutation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::path;

// ───────────────────────────────────────── entity ────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    File,
    Folder,
}

impl EntityKind {
    pub fn is_folder(self) -> bool {
        matches!(self, EntityKind::Folder)
    }
}

/// A file or folder record, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Parent directory path.  `None` only for a filesystem root.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last-modified time in unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<u64>,
}

impl Entity {
    /// Build an entity from a (possibly un-normalised) path.
    pub fn new(raw_path: &str, kind: EntityKind) -> Self {
        let path = path::normalize(raw_path);
        let mut entity = Self {
            name: String::new(),
            parent: None,
            path,
            kind,
            size: None,
            last_modified: None,
        };
        entity.relocate_to(entity.path.clone());
        entity
    }

    pub fn file(path: &str) -> Self {
        Self::new(path, EntityKind::File)
    }

    pub fn folder(path: &str) -> Self {
        Self::new(path, EntityKind::Folder)
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Point this entity at a new path, keeping `name` and `parent` in step.
    pub fn relocate_to(&mut self, new_path: String) {
        self.name = path::basename(&new_path).to_string();
        self.parent = if path::is_root(&new_path) {
            None
        } else {
            Some(path::dirname(&new_path))
        };
        self.path = new_path;
    }
}

// ───────────────────────────────────────── store ─────────────

/// Two ordered collections of entities, unique by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatStore {
    pub files: Vec<Entity>,
    pub folders: Vec<Entity>,
}

impl FlatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.folders.clear();
    }

    /// Iterate folders first, then files.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.folders.iter().chain(self.files.iter())
    }

    pub fn get(&self, path: &str) -> Option<&Entity> {
        self.iter().find(|e| e.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn kind_of(&self, path: &str) -> Option<EntityKind> {
        self.get(path).map(|e| e.kind)
    }

    pub fn is_folder(&self, path: &str) -> bool {
        self.kind_of(path) == Some(EntityKind::Folder)
    }

    /// Insert an entity.  Returns `false` (and keeps the existing record)
    /// when the path is already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.contains(&entity.path) {
            return false;
        }
        match entity.kind {
            EntityKind::File => self.files.push(entity),
            EntityKind::Folder => self.folders.push(entity),
        }
        true
    }

    /// Insert every entity, skipping paths already present.  Returns the
    /// number of entities actually added.
    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) -> usize {
        let mut seen: HashSet<String> = self.iter().map(|e| e.path.clone()).collect();
        let mut added = 0;
        for entity in entities {
            if seen.insert(entity.path.clone()) {
                match entity.kind {
                    EntityKind::File => self.files.push(entity),
                    EntityKind::Folder => self.folders.push(entity),
                }
                added += 1;
            }
        }
        added
    }

    /// Remove a single entity by path.
    pub fn remove(&mut self, path: &str) -> Option<Entity> {
        if let Some(idx) = self.files.iter().position(|e| e.path == path) {
            return Some(self.files.remove(idx));
        }
        if let Some(idx) = self.folders.iter().position(|e| e.path == path) {
            return Some(self.folders.remove(idx));
        }
        None
    }

    /// Remove `path` and everything below it.  Returns the removed paths.
    pub fn remove_subtree(&mut self, root: &str) -> Vec<String> {
        let mut removed = Vec::new();
        let mut take = |list: &mut Vec<Entity>| {
            list.retain(|e| {
                if path::is_same_or_descendant(&e.path, root) {
                    removed.push(e.path.clone());
                    false
                } else {
                    true
                }
            });
        };
        take(&mut self.folders);
        take(&mut self.files);
        removed
    }

    /// Move `old` (and, for folders, every descendant) under `new`.
    /// Returns the number of rewritten entities.
    pub fn rebase_subtree(&mut self, old: &str, new: &str) -> usize {
        let mut count = 0;
        for entity in self.folders.iter_mut().chain(self.files.iter_mut()) {
            if let Some(rebased) = path::rebase(&entity.path, old, new) {
                entity.relocate_to(rebased);
                count += 1;
            }
        }
        count
    }

    /// Names of the immediate children of `parent`.
    pub fn child_names(&self, parent: &str) -> HashSet<String> {
        self.iter()
            .filter(|e| e.parent.as_deref() == Some(parent))
            .map(|e| e.name.clone())
            .collect()
    }

    /// Paths of the immediate children of `parent`, in store order.
    pub fn children_of(&self, parent: &str) -> Vec<&Entity> {
        self.iter()
            .filter(|e| e.parent.as_deref() == Some(parent))
            .collect()
    }

    /// Non-root entities whose parent folder is not in the store.
    pub fn orphans(&self, roots: &[String]) -> Vec<String> {
        let present: HashSet<&str> = self.folders.iter().map(|e| e.path.as_str()).collect();
        self.iter()
            .filter(|e| !roots.iter().any(|r| r == &e.path))
            .filter(|e| match e.parent.as_deref() {
                Some(p) => !present.contains(p),
                None => false,
            })
            .map(|e| e.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatStore {
        let mut store = FlatStore::new();
        store.insert(Entity::folder("/r"));
        store.insert(Entity::folder("/r/f"));
        store.insert(Entity::file("/r/f/x.md"));
        store.insert(Entity::file("/r/a.md"));
        store
    }

    #[test]
    fn entity_tracks_name_and_parent() {
        let e = Entity::file("/notes/day.md");
        assert_eq!(e.name, "day.md");
        assert_eq!(e.parent.as_deref(), Some("/notes"));
        assert_eq!(Entity::folder("/").parent, None);
    }

    #[test]
    fn insert_rejects_duplicates() {
        let mut store = sample();
        assert!(!store.insert(Entity::file("/r/a.md")));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn rebase_subtree_rewrites_descendants_and_parents() {
        let mut store = sample();
        assert_eq!(store.rebase_subtree("/r/f", "/r/g"), 2);
        let moved = store.get("/r/g/x.md").expect("rebased child");
        assert_eq!(moved.parent.as_deref(), Some("/r/g"));
        assert!(store.get("/r/f").is_none());
        assert!(store.get("/r/a.md").is_some());
    }

    #[test]
    fn remove_subtree_takes_folder_and_children() {
        let mut store = sample();
        let mut removed = store.remove_subtree("/r/f");
        removed.sort();
        assert_eq!(removed, vec!["/r/f".to_string(), "/r/f/x.md".to_string()]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn orphans_are_detected() {
        let mut store = sample();
        store.insert(Entity::file("/elsewhere/lost.md"));
        assert_eq!(store.orphans(&["/r".to_string()]), vec!["/elsewhere/lost.md".to_string()]);
    }
}
