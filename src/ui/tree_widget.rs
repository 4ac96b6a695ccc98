//! Custom Ratatui widget that renders a [`WorkspaceTree`] as an indented,
//! collapsible multi-root tree.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, StatefulWidget, Widget},
};

use md_explorer::core::selection::{DropPosition, Selection};
use md_explorer::core::tree::{is_expanded, ExpandedNodes, NodeId, WorkspaceTree};
use md_explorer::workspace::OpenTabs;

use super::theme::Theme;

/// Columns taken by the expand icon before the label.
pub const ICON_WIDTH: u16 = 2;

// ───────────────────────────────────────── state ─────────────

/// Cursor row and scroll offset of the tree view.
#[derive(Debug, Default)]
pub struct TreeWidgetState {
    /// Index into the visible rows.
    pub selected: usize,
    /// First visible row.
    pub offset: usize,
}

impl TreeWidgetState {
    pub fn select_next(&mut self, rows: usize) {
        if rows > 0 && self.selected < rows - 1 {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep `selected` inside `rows` and within a viewport of `height`.
    pub fn clamp(&mut self, rows: usize, height: usize) {
        if rows == 0 {
            self.selected = 0;
            self.offset = 0;
            return;
        }
        self.selected = self.selected.min(rows - 1);
        if height == 0 {
            return;
        }
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + height {
            self.offset = self.selected + 1 - height;
        }
    }
}

// ───────────────────────────────────────── row model ─────────

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub node_id: NodeId,
    pub path: String,
    pub label: String,
    pub depth: usize,
    pub is_folder: bool,
    pub is_root: bool,
    pub expanded: bool,
}

impl TreeRow {
    /// Column offset of the label from the left edge of the list.
    pub fn label_column(&self) -> u16 {
        (self.depth as u16).saturating_mul(2) + ICON_WIDTH
    }
}

/// The visible rows, depth-first, honouring expansion.
pub fn build_rows(tree: &WorkspaceTree, expanded: &ExpandedNodes) -> Vec<TreeRow> {
    tree.visible_nodes(expanded)
        .into_iter()
        .map(|id| {
            let node = tree.get(id);
            TreeRow {
                node_id: id,
                path: node.entity.path.clone(),
                label: node.entity.name.clone(),
                depth: node.depth,
                is_folder: node.is_folder(),
                is_root: node.parent.is_none(),
                expanded: node.is_folder() && is_expanded(expanded, node.path()),
            }
        })
        .collect()
}

// ───────────────────────────────────────── widget ────────────

/// Created fresh each frame.
pub struct TreeWidget<'a> {
    tree: &'a WorkspaceTree,
    expanded: &'a ExpandedNodes,
    selection: Option<&'a Selection>,
    tabs: Option<&'a OpenTabs>,
    cut: &'a [String],
    drop_hover: Option<(&'a str, DropPosition)>,
    rename: Option<(&'a str, &'a str)>,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree: &'a WorkspaceTree, expanded: &'a ExpandedNodes) -> Self {
        Self {
            tree,
            expanded,
            selection: None,
            tabs: None,
            cut: &[],
            drop_hover: None,
            rename: None,
            block: None,
        }
    }

    pub fn selection(mut self, selection: &'a Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Mark open files and dirty buffers.
    pub fn tabs(mut self, tabs: &'a OpenTabs) -> Self {
        self.tabs = Some(tabs);
        self
    }

    pub fn cut(mut self, paths: &'a [String]) -> Self {
        self.cut = paths;
        self
    }

    pub fn drop_hover(mut self, path: &'a str, position: DropPosition) -> Self {
        self.drop_hover = Some((path, position));
        self
    }

    /// Replace the label of `path` with an edit field showing `input`.
    pub fn rename(mut self, path: &'a str, input: &'a str) -> Self {
        self.rename = Some((path, input));
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn row_line(&self, row: &TreeRow, is_cursor: bool) -> Line<'a> {
        let indent = "  ".repeat(row.depth);
        let icon = match (row.is_folder, row.expanded) {
            (true, true) => "▼ ",
            (true, false) => "▶ ",
            (false, _) => "  ",
        };

        if let Some((path, input)) = self.rename {
            if path == row.path {
                return Line::from(vec![
                    Span::raw(indent),
                    Span::raw(icon),
                    Span::styled(format!("{input}▏"), Theme::input_style()),
                ]);
            }
        }

        let tab = self.tabs.and_then(|t| t.get(&row.path));
        let mut style = if row.is_root {
            Theme::root_style()
        } else if row.is_folder {
            Theme::folder_style()
        } else if tab.is_some() {
            Theme::open_file_style()
        } else {
            Theme::file_style()
        };
        if self.cut.iter().any(|p| p == &row.path) {
            style = Theme::cut_style();
        }
        if self.selection.is_some_and(|s| s.contains(&row.path)) {
            style = style.patch(Theme::selected_style());
        }
        if is_cursor {
            style = style.patch(Theme::cursor_style());
        }

        let mut spans = Vec::new();
        match self.drop_hover {
            Some((path, DropPosition::Top)) if path == row.path => {
                spans.push(Span::styled("▔", Theme::drop_target_style()));
                spans.push(Span::raw(indent.chars().skip(1).collect::<String>()));
            }
            Some((path, DropPosition::Bottom)) if path == row.path => {
                spans.push(Span::styled("▁", Theme::drop_target_style()));
                spans.push(Span::raw(indent.chars().skip(1).collect::<String>()));
            }
            Some((path, DropPosition::Middle)) if path == row.path => {
                spans.push(Span::raw(indent));
                style = Theme::drop_target_style();
            }
            _ => spans.push(Span::raw(indent)),
        }
        spans.push(Span::styled(format!("{icon}{}", row.label), style));

        if tab.is_some_and(|t| t.is_dirty) {
            spans.push(Span::styled(" ●", Theme::marker_style()));
        }
        if self.tabs.and_then(OpenTabs::active) == Some(row.path.as_str()) {
            spans.push(Span::styled(" ◀", Theme::marker_style()));
        }
        Line::from(spans)
    }
}

impl<'a> StatefulWidget for TreeWidget<'a> {
    type State = TreeWidgetState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let inner = match self.block {
            Some(ref block) => {
                let inner = block.inner(area);
                block.clone().render(area, buf);
                inner
            }
            None => area,
        };

        let rows = build_rows(self.tree, self.expanded);
        state.clamp(rows.len(), inner.height as usize);

        if rows.is_empty() {
            let hint = Line::from(Span::styled(
                "No folders open. Pass a folder on the command line.",
                Theme::dim_style(),
            ));
            buf.set_line(inner.x, inner.y, &hint, inner.width);
            return;
        }

        let visible = rows
            .iter()
            .enumerate()
            .skip(state.offset)
            .take(inner.height as usize);
        for (i, (row_idx, row)) in visible.enumerate() {
            let y = inner.y + i as u16;
            let line = self.row_line(row, row_idx == state.selected);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_explorer::core::entity::{Entity, FlatStore};
    use md_explorer::core::order::OrderMap;
    use md_explorer::core::tree::{build_tree, SortSettings};

    fn tree() -> WorkspaceTree {
        let mut store = FlatStore::default();
        for f in ["/r", "/r/sub"] {
            store.insert(Entity::folder(f));
        }
        for f in ["/r/a.md", "/r/sub/b.md"] {
            store.insert(Entity::file(f));
        }
        build_tree(&store, &["/r".to_string()], &OrderMap::default(), &SortSettings::default())
    }

    #[test]
    fn rows_follow_expansion() {
        let tree = tree();
        let mut expanded = ExpandedNodes::new();
        assert_eq!(build_rows(&tree, &expanded).len(), 1);

        expanded.insert("/r".into(), true);
        let rows = build_rows(&tree, &expanded);
        let paths: Vec<&str> = rows.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/r", "/r/sub", "/r/a.md"]);
        assert!(rows[0].is_root && rows[0].expanded);
        assert_eq!(rows[2].label_column(), 4);
    }

    #[test]
    fn clamp_scrolls_cursor_into_view() {
        let mut state = TreeWidgetState {
            selected: 9,
            offset: 0,
        };
        state.clamp(20, 5);
        assert_eq!(state.offset, 5);
        state.clamp(3, 5);
        assert_eq!(state.selected, 2);
        assert_eq!(state.offset, 2);
    }
}
