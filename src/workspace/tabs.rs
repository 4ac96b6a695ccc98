//! Open editor tabs and the active-file pointer.

use serde::{Deserialize, Serialize};

use crate::core::path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub path: String,
    pub name: String,
    pub is_dirty: bool,
    /// Editor buffer.  Loaded lazily when the tab becomes active.
    #[serde(skip)]
    pub content: Option<String>,
}

impl Tab {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: path::basename(path).to_string(),
            is_dirty: false,
            content: None,
        }
    }

    pub fn with_content(path: &str, content: String) -> Self {
        Self {
            content: Some(content),
            ..Self::new(path)
        }
    }
}

/// Ordered tabs, unique by path.  `active` always names an open tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenTabs {
    tabs: Vec<Tab>,
    active: Option<String>,
}

impl OpenTabs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }

    pub fn paths(&self) -> Vec<String> {
        self.tabs.iter().map(|t| t.path.clone()).collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tabs.iter().any(|t| t.path == path)
    }

    pub fn get(&self, path: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.path == path)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.path == path)
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.as_deref().and_then(|p| self.get(p))
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let path = self.active.clone()?;
        self.get_mut(&path)
    }

    /// Add a tab at the end.  Returns `false` if it was already open.
    pub fn open(&mut self, tab: Tab) -> bool {
        if self.contains(&tab.path) {
            return false;
        }
        self.tabs.push(tab);
        true
    }

    /// Make `path` the active tab.  Returns `false` if it is not open.
    pub fn activate(&mut self, path: &str) -> bool {
        if !self.contains(path) {
            return false;
        }
        self.active = Some(path.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.active = None;
    }

    /// Close every tab for which `close` returns `true` and return them.
    ///
    /// If the active tab is among them, the new active tab is the nearest
    /// surviving tab *before* it in the original order, else the first
    /// surviving tab, else none.
    pub fn close_where(&mut self, mut close: impl FnMut(&Tab) -> bool) -> Vec<Tab> {
        let original = self.paths();
        let (closed, kept): (Vec<Tab>, Vec<Tab>) =
            std::mem::take(&mut self.tabs).into_iter().partition(|t| close(t));
        self.tabs = kept;

        let active_closed = self
            .active
            .as_deref()
            .is_some_and(|a| closed.iter().any(|t| t.path == a));
        if active_closed {
            let idx = self
                .active
                .as_deref()
                .and_then(|a| original.iter().position(|p| p == a))
                .unwrap_or(0);
            let fallback = original[..idx]
                .iter()
                .rev()
                .find(|p| self.contains(p))
                .cloned()
                .or_else(|| self.tabs.first().map(|t| t.path.clone()));
            self.active = fallback;
        }
        closed
    }

    pub fn close(&mut self, path: &str) -> Option<Tab> {
        self.close_where(|t| t.path == path).into_iter().next()
    }

    /// Close every tab at or below `scope`.
    pub fn close_scope(&mut self, scope: &str) -> Vec<Tab> {
        self.close_where(|t| path::is_same_or_descendant(&t.path, scope))
    }

    /// Rewrite tab paths (and the active pointer) from `old` to `new`.
    pub fn rebase(&mut self, old: &str, new: &str) {
        for tab in &mut self.tabs {
            if let Some(rebased) = path::rebase(&tab.path, old, new) {
                tab.name = path::basename(&rebased).to_string();
                tab.path = rebased;
            }
        }
        if let Some(active) = self.active.take() {
            self.active = Some(path::rebase(&active, old, new).unwrap_or(active));
        }
    }

    pub fn dirty_paths(&self) -> Vec<String> {
        self.tabs
            .iter()
            .filter(|t| t.is_dirty)
            .map(|t| t.path.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabs(paths: &[&str], active: &str) -> OpenTabs {
        let mut tabs = OpenTabs::new();
        for p in paths {
            tabs.open(Tab::new(p));
        }
        tabs.activate(active);
        tabs
    }

    #[test]
    fn closing_active_prefers_previous_tab() {
        let mut t = tabs(&["/a.md", "/b.md", "/c.md"], "/b.md");
        t.close("/b.md");
        assert_eq!(t.active(), Some("/a.md"));
    }

    #[test]
    fn closing_first_active_falls_back_to_first_remaining() {
        let mut t = tabs(&["/a.md", "/b.md", "/c.md"], "/a.md");
        t.close("/a.md");
        assert_eq!(t.active(), Some("/b.md"));
    }

    #[test]
    fn closing_last_tab_clears_active() {
        let mut t = tabs(&["/a.md"], "/a.md");
        t.close("/a.md");
        assert_eq!(t.active(), None);
        assert!(t.is_empty());
    }

    #[test]
    fn closing_scope_skips_closed_neighbours() {
        let mut t = tabs(&["/x.md", "/f/a.md", "/f/b.md", "/y.md"], "/f/b.md");
        let closed = t.close_scope("/f");
        assert_eq!(closed.len(), 2);
        assert_eq!(t.active(), Some("/x.md"));
    }

    #[test]
    fn closing_inactive_tab_keeps_active() {
        let mut t = tabs(&["/a.md", "/b.md"], "/b.md");
        t.close("/a.md");
        assert_eq!(t.active(), Some("/b.md"));
    }

    #[test]
    fn rebase_updates_name_and_active() {
        let mut t = tabs(&["/f/x.md"], "/f/x.md");
        t.rebase("/f", "/g/f");
        assert_eq!(t.active(), Some("/g/f/x.md"));
        assert_eq!(t.get("/g/f/x.md").map(|t| t.name.as_str()), Some("x.md"));
    }
}
