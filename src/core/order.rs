//! User-defined sibling ordering.
//!
//! The order map is the *only* source of display ordering: `parent path →
//! ordered child paths`.  Entries are advisory, the tree builder places any
//! child that is missing from its parent's list after the listed ones.
//!
//! Invariant: every value in a list is an immediate child of its key.  All
//! path-changing operations go through [`OrderMap::rebase`] or
//! [`OrderMap::prune`] so the invariant survives moves, renames and deletes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::path;

/// Where a dragged block lands relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderMap(BTreeMap<String, Vec<String>>);

impl OrderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, parent: &str) -> Option<&[String]> {
        self.0.get(parent).map(Vec::as_slice)
    }

    pub fn set(&mut self, parent: impl Into<String>, children: Vec<String>) {
        self.0.insert(parent.into(), children);
    }

    /// Make sure `parent` has a (possibly empty) list.
    pub fn ensure(&mut self, parent: &str) {
        self.0.entry(parent.to_string()).or_default();
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Append `child` to `parent`'s list unless it is already there.
    pub fn append_child(&mut self, parent: &str, child: &str) {
        let list = self.0.entry(parent.to_string()).or_default();
        if !list.iter().any(|c| c == child) {
            list.push(child.to_string());
        }
    }

    /// Remove `child` from `parent`'s list (the list itself stays).
    pub fn remove_child(&mut self, parent: &str, child: &str) {
        if let Some(list) = self.0.get_mut(parent) {
            list.retain(|c| c != child);
        }
    }

    /// Move `sources` as one contiguous block next to `target` inside
    /// `parent`.
    ///
    /// `displayed` is the sibling order the user currently sees; it seeds the
    /// list when `parent` has no explicit order yet and fills in any sibling
    /// the existing list does not mention.  Sources are removed first and the
    /// block is inserted at the target's post-removal index.  Returns `false`
    /// (and changes nothing) when the target is one of the sources or is not
    /// a sibling.
    pub fn reorder_block(
        &mut self,
        parent: &str,
        displayed: &[String],
        sources: &[String],
        target: &str,
        placement: Placement,
    ) -> bool {
        if sources.iter().any(|s| s == target) {
            return false;
        }

        let mut list: Vec<String> = displayed.to_vec();
        if let Some(existing) = self.0.get(parent) {
            // Keep explicitly-ordered entries that the display no longer
            // shows (e.g. filtered hidden files) at their relative spot.
            for (idx, child) in existing.iter().enumerate() {
                if !list.contains(child) {
                    list.insert(idx.min(list.len()), child.clone());
                }
            }
        }

        let block: Vec<String> = list
            .iter()
            .filter(|c| sources.contains(*c))
            .cloned()
            .collect();
        if block.is_empty() {
            return false;
        }
        list.retain(|c| !sources.contains(c));

        let Some(target_idx) = list.iter().position(|c| c == target) else {
            return false;
        };
        let at = match placement {
            Placement::Before => target_idx,
            Placement::After => target_idx + 1,
        };
        list.splice(at..at, block);
        self.0.insert(parent.to_string(), list);
        true
    }

    /// Rewrite every key and value equal to or below `old` so it sits under
    /// `new` instead.
    pub fn rebase(&mut self, old: &str, new: &str) {
        let entries = std::mem::take(&mut self.0);
        for (key, children) in entries {
            let key = path::rebase(&key, old, new).unwrap_or(key);
            let children: Vec<String> = children
                .into_iter()
                .map(|c| path::rebase(&c, old, new).unwrap_or(c))
                .collect();
            let slot = self.0.entry(key).or_default();
            for child in children {
                if !slot.contains(&child) {
                    slot.push(child);
                }
            }
        }
    }

    /// Drop every key and value equal to or below `scope`.
    pub fn prune(&mut self, scope: &str) {
        self.0.retain(|key, _| !path::is_same_or_descendant(key, scope));
        for children in self.0.values_mut() {
            children.retain(|c| !path::is_same_or_descendant(c, scope));
        }
    }

    /// Remove keys and values for which `keep` returns `false`.  Empty lists
    /// are kept so a folder's "explicitly empty" order survives.
    pub fn retain_paths(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|key, _| keep(key.as_str()));
        for children in self.0.values_mut() {
            children.retain(|c| keep(c.as_str()));
        }
    }

    /// Values that are not immediate children of their key.
    pub fn misplaced(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (parent, children) in &self.0 {
            for child in children {
                if path::dirname(child) != *parent {
                    out.push((parent.clone(), child.clone()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorder_moves_block_before_target() {
        let mut order = OrderMap::new();
        let displayed = paths(&["/r/a", "/r/b", "/r/c", "/r/d"]);
        assert!(order.reorder_block("/r", &displayed, &paths(&["/r/c", "/r/d"]), "/r/a", Placement::Before));
        assert_eq!(order.get("/r").unwrap(), paths(&["/r/c", "/r/d", "/r/a", "/r/b"]).as_slice());
    }

    #[test]
    fn reorder_after_uses_post_removal_index() {
        let mut order = OrderMap::new();
        let displayed = paths(&["/r/a", "/r/b", "/r/c"]);
        assert!(order.reorder_block("/r", &displayed, &paths(&["/r/a"]), "/r/b", Placement::After));
        assert_eq!(order.get("/r").unwrap(), paths(&["/r/b", "/r/a", "/r/c"]).as_slice());
    }

    #[test]
    fn reorder_onto_a_source_is_rejected() {
        let mut order = OrderMap::new();
        let displayed = paths(&["/r/a", "/r/b"]);
        assert!(!order.reorder_block("/r", &displayed, &paths(&["/r/a"]), "/r/a", Placement::After));
        assert!(order.is_empty());
    }

    #[test]
    fn rebase_rekeys_and_rewrites_values() {
        let mut order = OrderMap::new();
        order.set("/r", paths(&["/r/f", "/r/a.md"]));
        order.set("/r/f", paths(&["/r/f/x.md", "/r/f/sub"]));
        order.set("/r/f/sub", paths(&["/r/f/sub/y.md"]));
        order.rebase("/r/f", "/r/notes");

        assert_eq!(order.get("/r").unwrap(), paths(&["/r/notes", "/r/a.md"]).as_slice());
        assert_eq!(
            order.get("/r/notes").unwrap(),
            paths(&["/r/notes/x.md", "/r/notes/sub"]).as_slice()
        );
        assert!(order.keys().all(|k| !path::is_same_or_descendant(k, "/r/f")));
        assert!(order.misplaced().is_empty());
    }

    #[test]
    fn prune_removes_keys_and_values() {
        let mut order = OrderMap::new();
        order.set("/r", paths(&["/r/f", "/r/a.md"]));
        order.set("/r/f", paths(&["/r/f/x.md"]));
        order.prune("/r/f");
        assert_eq!(order.get("/r").unwrap(), paths(&["/r/a.md"]).as_slice());
        assert!(order.get("/r/f").is_none());
    }
}
