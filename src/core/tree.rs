//! In-memory forest that mirrors the workspace as the user sees it.
//!
//! The tree is *derived* data: [`build_tree`] turns the flat entity store,
//! the root-folder list and the order map into an arena of [`TreeNode`]s.
//! Building is a pure function, so the same inputs always produce the same
//! forest in the same order.  Nothing ever mutates a built tree; callers
//! rebuild it after each committed workspace change.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::entity::{Entity, FlatStore};
use super::order::OrderMap;

/// `folder path → expanded?`.  Absent or `false` means collapsed.
pub type ExpandedNodes = BTreeMap<String, bool>;

pub fn is_expanded(expanded: &ExpandedNodes, path: &str) -> bool {
    expanded.get(path).copied().unwrap_or(false)
}

// ───────────────────────────────────────── sort settings ─────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Modified,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Fallback ordering for siblings the order map does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSettings {
    pub by: SortBy,
    pub direction: SortDirection,
}

impl SortSettings {
    /// Folders before files, then the configured key, then path as a final
    /// tie-break so the order is total.
    fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        b.is_folder().cmp(&a.is_folder()).then_with(|| {
            let key = match self.by {
                SortBy::Name => compare_names(&a.name, &b.name),
                SortBy::Modified => a
                    .last_modified
                    .cmp(&b.last_modified)
                    .then_with(|| compare_names(&a.name, &b.name)),
                SortBy::Size => a
                    .size
                    .cmp(&b.size)
                    .then_with(|| compare_names(&a.name, &b.name)),
            };
            let key = match self.direction {
                SortDirection::Asc => key,
                SortDirection::Desc => key.reverse(),
            };
            key.then_with(|| a.path.cmp(&b.path))
        })
    }
}

/// Case-insensitive, with case only breaking ties (`a.md` < `B.md` < `b.md`).
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Order one sibling list: entries listed in `explicit` by their index,
/// everything else afterwards by the fallback comparator.
pub fn sort_siblings<'a>(
    mut items: Vec<&'a Entity>,
    explicit: Option<&[String]>,
    sort: &SortSettings,
) -> Vec<&'a Entity> {
    let rank: HashMap<&str, usize> = explicit
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    items.sort_by(|a, b| {
        match (rank.get(a.path.as_str()), rank.get(b.path.as_str())) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => sort.compare(a, b),
        }
    });
    items
}

// ───────────────────────────────────────── tree node ─────────

/// Index into [`WorkspaceTree::nodes`].
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub entity: Entity,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Depth below the owning root (0 = root).
    pub depth: usize,
}

impl TreeNode {
    pub fn path(&self) -> &str {
        &self.entity.path
    }

    pub fn is_folder(&self) -> bool {
        self.entity.is_folder()
    }
}

// ───────────────────────────────────────── arena forest ──────

/// Arena-backed forest, one tree per root folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceTree {
    pub nodes: Vec<TreeNode>,
    pub roots: Vec<NodeId>,
    /// Entities that could not be attached to any root.
    pub orphans: Vec<String>,
    /// Root paths with no matching folder in the store.
    pub missing_roots: Vec<String>,
    index: HashMap<String, NodeId>,
}

/// Build the forest for `roots` from the flat store, ordered by `order`.
pub fn build_tree(
    store: &FlatStore,
    roots: &[String],
    order: &OrderMap,
    sort: &SortSettings,
) -> WorkspaceTree {
    let root_set: HashSet<&str> = roots.iter().map(String::as_str).collect();

    // parent path → children (roots never appear as someone's child).
    let mut by_parent: HashMap<&str, Vec<&Entity>> = HashMap::new();
    for entity in store.iter() {
        if root_set.contains(entity.path.as_str()) {
            continue;
        }
        if let Some(parent) = entity.parent.as_deref() {
            by_parent.entry(parent).or_default().push(entity);
        }
    }

    let mut tree = WorkspaceTree::default();
    let mut seen_roots = HashSet::new();
    for root in roots {
        if !seen_roots.insert(root.as_str()) {
            continue;
        }
        match store.get(root) {
            Some(entity) if entity.is_folder() => {
                let id = tree.push(entity.clone(), None, 0);
                tree.roots.push(id);
                tree.attach_children(id, &by_parent, order, sort);
            }
            _ => tree.missing_roots.push(root.clone()),
        }
    }

    tree.orphans = store
        .iter()
        .filter(|e| !tree.index.contains_key(&e.path))
        .map(|e| e.path.clone())
        .collect();
    tree
}

impl WorkspaceTree {
    fn push(&mut self, entity: Entity, parent: Option<NodeId>, depth: usize) -> NodeId {
        let id = self.nodes.len();
        self.index.insert(entity.path.clone(), id);
        self.nodes.push(TreeNode {
            entity,
            parent,
            children: Vec::new(),
            depth,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id].children.push(id);
        }
        id
    }

    fn attach_children(
        &mut self,
        id: NodeId,
        by_parent: &HashMap<&str, Vec<&Entity>>,
        order: &OrderMap,
        sort: &SortSettings,
    ) {
        let path = self.nodes[id].entity.path.clone();
        let depth = self.nodes[id].depth + 1;
        let Some(kids) = by_parent.get(path.as_str()) else {
            return;
        };
        let sorted = sort_siblings(kids.clone(), order.get(&path), sort);
        for child in sorted {
            let child_id = self.push(child.clone(), Some(id), depth);
            if child.is_folder() {
                self.attach_children(child_id, by_parent, order, sort);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of nodes currently on screen: every root, plus the children of
    /// each expanded folder, depth-first.  This is the order shift-range
    /// selection walks.
    pub fn visible_nodes(&self, expanded: &ExpandedNodes) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            self.collect_visible(root, expanded, &mut out);
        }
        out
    }

    fn collect_visible(&self, id: NodeId, expanded: &ExpandedNodes, out: &mut Vec<NodeId>) {
        out.push(id);
        let node = &self.nodes[id];
        if node.is_folder() && is_expanded(expanded, node.path()) {
            for &child in &node.children {
                self.collect_visible(child, expanded, out);
            }
        }
    }

    pub fn visible_paths(&self, expanded: &ExpandedNodes) -> Vec<String> {
        self.visible_nodes(expanded)
            .into_iter()
            .map(|id| self.nodes[id].entity.path.clone())
            .collect()
    }

    /// Children of `path` in display order.
    pub fn child_paths(&self, path: &str) -> Vec<String> {
        self.find(path)
            .map(|id| {
                self.nodes[id]
                    .children
                    .iter()
                    .map(|&c| self.nodes[c].entity.path.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Root paths in display order.
    pub fn root_paths(&self) -> Vec<String> {
        self.roots
            .iter()
            .map(|&id| self.nodes[id].entity.path.clone())
            .collect()
    }

    pub fn is_root(&self, path: &str) -> bool {
        self.find(path)
            .is_some_and(|id| self.nodes[id].parent.is_none())
    }

    /// `(depth, path)` for every node, depth-first, ignoring expansion.
    pub fn outline(&self) -> Vec<(usize, String)> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            out.push((node.depth, node.entity.path.clone()));
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}
