//! Multi-selection and drag/drop gesture tracking.
//!
//! Both controllers are plain data: they never touch the workspace.  A
//! completed drop yields a [`DropRequest`] that the caller hands to
//! `Workspace::apply_move`.

use std::collections::BTreeSet;

use tracing::debug;

use super::path;

// ───────────────────────────────────────── selection ─────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickModifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS.
    pub toggle: bool,
    pub range: bool,
}

impl ClickModifiers {
    pub const NONE: Self = Self {
        toggle: false,
        range: false,
    };
    pub const TOGGLE: Self = Self {
        toggle: true,
        range: false,
    };
    pub const RANGE: Self = Self {
        toggle: false,
        range: true,
    };
}

/// Which part of the row received the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Label,
    Row,
}

/// What the caller should do after a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The selection changed (or was re-confirmed).
    Selected,
    /// The item was already the sole selection and its label was clicked.
    BeginRename(String),
    /// The item was already the sole selection and is a folder.
    ToggleExpand(String),
    /// Nothing to do.
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: BTreeSet<String>,
    anchor: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.items.contains(path)
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.items.iter()
    }

    /// The sole selected path, if exactly one item is selected.
    pub fn single(&self) -> Option<&str> {
        if self.items.len() == 1 {
            self.items.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.anchor = None;
    }

    pub fn select_only(&mut self, path: &str) {
        self.items.clear();
        self.items.insert(path.to_string());
        self.anchor = Some(path.to_string());
    }

    /// Apply a click on `path`.
    ///
    /// `visible` is the expanded-aware flattened node order; shift-range
    /// selection walks it between the anchor and the clicked row.
    pub fn click(
        &mut self,
        path: &str,
        modifiers: ClickModifiers,
        target: ClickTarget,
        is_folder: bool,
        visible: &[String],
    ) -> ClickOutcome {
        if modifiers.range {
            if let Some(range) = self.range_to(path, visible) {
                self.items = range;
                return ClickOutcome::Selected;
            }
            // No usable anchor: behave like a plain click.
            self.select_only(path);
            return ClickOutcome::Selected;
        }

        if modifiers.toggle {
            if !self.items.remove(path) {
                self.items.insert(path.to_string());
                self.anchor = Some(path.to_string());
            }
            return ClickOutcome::Selected;
        }

        if self.single() == Some(path) {
            return match (target, is_folder) {
                (ClickTarget::Label, _) => ClickOutcome::BeginRename(path.to_string()),
                (ClickTarget::Row, true) => ClickOutcome::ToggleExpand(path.to_string()),
                (ClickTarget::Row, false) => ClickOutcome::Unchanged,
            };
        }

        self.select_only(path);
        ClickOutcome::Selected
    }

    fn range_to(&self, path: &str, visible: &[String]) -> Option<BTreeSet<String>> {
        let anchor = self.anchor.as_deref()?;
        let from = visible.iter().position(|p| p == anchor)?;
        let to = visible.iter().position(|p| p == path)?;
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        Some(visible[lo..=hi].iter().cloned().collect())
    }

    /// Selected paths in `visible` order; selected paths that are not on
    /// screen (collapsed away) follow in path order.
    pub fn ordered(&self, visible: &[String]) -> Vec<String> {
        let mut out: Vec<String> = visible
            .iter()
            .filter(|p| self.items.contains(*p))
            .cloned()
            .collect();
        let hidden: Vec<String> = self
            .items
            .iter()
            .filter(|p| !out.contains(p))
            .cloned()
            .collect();
        out.extend(hidden);
        out
    }

    /// Rewrite selected paths after a move or rename.
    pub fn rebase(&mut self, old: &str, new: &str) {
        self.items = std::mem::take(&mut self.items)
            .into_iter()
            .map(|p| path::rebase(&p, old, new).unwrap_or(p))
            .collect();
        if let Some(anchor) = self.anchor.take() {
            self.anchor = Some(path::rebase(&anchor, old, new).unwrap_or(anchor));
        }
    }

    /// Drop selected paths that no longer exist.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.items.retain(|p| keep(p.as_str()));
        if self.anchor.as_deref().is_some_and(|a| !keep(a)) {
            self.anchor = None;
        }
    }
}

// ───────────────────────────────────────── drag & drop ───────

/// Where on the target row the pointer is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Top,
    Middle,
    Bottom,
}

impl DropPosition {
    /// Top quarter, middle half, bottom quarter of the row.
    pub fn from_offset(offset: f64, row_height: f64) -> Self {
        if row_height <= 0.0 {
            return DropPosition::Middle;
        }
        let ratio = offset / row_height;
        if ratio < 0.25 {
            DropPosition::Top
        } else if ratio > 0.75 {
            DropPosition::Bottom
        } else {
            DropPosition::Middle
        }
    }

    /// Files cannot contain children, so a middle drop on a file row lands
    /// below it.
    pub fn for_target(self, target_is_folder: bool) -> Self {
        match (self, target_is_folder) {
            (DropPosition::Middle, false) => DropPosition::Bottom,
            (position, _) => position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub path: String,
    pub position: DropPosition,
}

/// A validated drop, ready for the mutation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRequest {
    pub sources: Vec<String>,
    pub target: String,
    pub position: DropPosition,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    sources: Vec<String>,
    hover: Option<DropTarget>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn hover(&self) -> Option<&DropTarget> {
        self.hover.as_ref()
    }

    pub fn drag_start(&mut self, items: Vec<String>) {
        let mut sources: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            if !sources.contains(&item) {
                sources.push(item);
            }
        }
        debug!(count = sources.len(), "drag start");
        self.sources = sources;
        self.hover = None;
    }

    /// Update the hover target.  Returns the accepted target, or `None` when
    /// dropping here would be rejected.
    pub fn drag_over(
        &mut self,
        target: &str,
        target_is_folder: bool,
        position: DropPosition,
    ) -> Option<&DropTarget> {
        if !self.is_dragging() || self.targets_own_subtree(target) {
            self.hover = None;
            return None;
        }
        self.hover = Some(DropTarget {
            path: target.to_string(),
            position: position.for_target(target_is_folder),
        });
        self.hover.as_ref()
    }

    /// Finish the gesture.  The controller is reset either way.
    pub fn drop(
        &mut self,
        target: &str,
        target_is_folder: bool,
        position: DropPosition,
    ) -> Option<DropRequest> {
        let sources = std::mem::take(&mut self.sources);
        self.hover = None;
        if sources.is_empty() {
            return None;
        }
        if sources.iter().any(|s| path::is_same_or_descendant(target, s)) {
            debug!(target, "drop onto dragged item or its descendant ignored");
            return None;
        }
        Some(DropRequest {
            sources,
            target: target.to_string(),
            position: position.for_target(target_is_folder),
        })
    }

    pub fn drag_end(&mut self) {
        self.sources.clear();
        self.hover = None;
    }

    fn targets_own_subtree(&self, target: &str) -> bool {
        self.sources
            .iter()
            .any(|s| path::is_same_or_descendant(target, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible() -> Vec<String> {
        ["/r", "/r/a.md", "/r/b.md", "/r/c.md", "/r/d.md"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn plain_click_replaces_selection() {
        let mut sel = Selection::new();
        sel.click("/r/a.md", ClickModifiers::NONE, ClickTarget::Row, false, &visible());
        sel.click("/r/c.md", ClickModifiers::NONE, ClickTarget::Row, false, &visible());
        assert_eq!(sel.single(), Some("/r/c.md"));
        assert_eq!(sel.anchor(), Some("/r/c.md"));
    }

    #[test]
    fn toggle_click_adds_and_removes() {
        let mut sel = Selection::new();
        sel.click("/r/a.md", ClickModifiers::NONE, ClickTarget::Row, false, &visible());
        sel.click("/r/c.md", ClickModifiers::TOGGLE, ClickTarget::Row, false, &visible());
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.anchor(), Some("/r/c.md"));
        sel.click("/r/a.md", ClickModifiers::TOGGLE, ClickTarget::Row, false, &visible());
        assert_eq!(sel.single(), Some("/r/c.md"));
    }

    #[test]
    fn range_click_spans_visible_order_and_keeps_anchor() {
        let mut sel = Selection::new();
        sel.click("/r/d.md", ClickModifiers::NONE, ClickTarget::Row, false, &visible());
        sel.click("/r/b.md", ClickModifiers::RANGE, ClickTarget::Row, false, &visible());
        assert_eq!(sel.ordered(&visible()), vec!["/r/b.md", "/r/c.md", "/r/d.md"]);
        assert_eq!(sel.anchor(), Some("/r/d.md"));
    }

    #[test]
    fn clicking_sole_selection_renames_or_expands() {
        let mut sel = Selection::new();
        sel.select_only("/r");
        assert_eq!(
            sel.click("/r", ClickModifiers::NONE, ClickTarget::Row, true, &visible()),
            ClickOutcome::ToggleExpand("/r".into())
        );
        assert_eq!(
            sel.click("/r", ClickModifiers::NONE, ClickTarget::Label, true, &visible()),
            ClickOutcome::BeginRename("/r".into())
        );
    }

    #[test]
    fn drop_position_from_row_offset() {
        assert_eq!(DropPosition::from_offset(1.0, 20.0), DropPosition::Top);
        assert_eq!(DropPosition::from_offset(10.0, 20.0), DropPosition::Middle);
        assert_eq!(DropPosition::from_offset(19.0, 20.0), DropPosition::Bottom);
        assert_eq!(DropPosition::Middle.for_target(false), DropPosition::Bottom);
        assert_eq!(DropPosition::Middle.for_target(true), DropPosition::Middle);
    }

    #[test]
    fn dropping_folder_into_itself_is_ignored() {
        let mut drag = DragController::new();
        drag.drag_start(vec!["/r/f".into()]);
        assert!(drag.drag_over("/r/f/sub", true, DropPosition::Middle).is_none());
        assert!(drag.drop("/r/f/sub", true, DropPosition::Middle).is_none());
        assert!(!drag.is_dragging());

        drag.drag_start(vec!["/r/f".into()]);
        assert!(drag.drop("/r/f", true, DropPosition::Middle).is_none());
    }

    #[test]
    fn drop_on_file_row_lands_below() {
        let mut drag = DragController::new();
        drag.drag_start(vec!["/r/a.md".into(), "/r/a.md".into()]);
        let request = drag.drop("/r/b.md", false, DropPosition::Middle).expect("accepted");
        assert_eq!(request.sources, vec!["/r/a.md".to_string()]);
        assert_eq!(request.position, DropPosition::Bottom);
    }
}
