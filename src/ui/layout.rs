//! Layout helpers: split the terminal area into regions.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Tab bar on top, explorer beside a preview of the active file, status
/// line at the bottom.
pub struct AppLayout {
    pub tabs_area: Rect,
    pub tree_area: Rect,
    pub preview_area: Rect,
    pub status_area: Rect,
}

impl AppLayout {
    pub fn from_area(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // open tabs
                Constraint::Min(3),    // explorer + preview
                Constraint::Length(1), // status
            ])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);

        Self {
            tabs_area: rows[0],
            tree_area: panes[0],
            preview_area: panes[1],
            status_area: rows[2],
        }
    }

    /// Visible-row index under `(col, row)` in the bordered tree pane,
    /// given the current scroll `offset`.
    pub fn tree_row_at(&self, col: u16, row: u16, offset: usize) -> Option<usize> {
        let a = self.tree_area;
        let inside = col > a.x
            && col < a.x + a.width.saturating_sub(1)
            && row > a.y
            && row < a.y + a.height.saturating_sub(1);
        inside.then(|| (row - a.y - 1) as usize + offset)
    }

    /// First content column of the tree pane.
    pub fn tree_content_x(&self) -> u16 {
        self.tree_area.x + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_skips_the_border() {
        let layout = AppLayout::from_area(Rect::new(0, 0, 100, 30));
        assert_eq!(layout.tree_area.y, 1);
        assert_eq!(layout.tree_row_at(5, 1, 0), None);
        assert_eq!(layout.tree_row_at(5, 2, 0), Some(0));
        assert_eq!(layout.tree_row_at(5, 4, 3), Some(5));
        assert_eq!(layout.tree_row_at(70, 4, 0), None);
    }
}
