//! Popup overlays: controls, workspace picker, prompts.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Widget, Wrap},
};

use md_explorer::config::{Action, AppConfig};
use md_explorer::workspace::SnapshotRegistry;

use super::theme::Theme;

/// Label of the extra row under the saved workspaces.
pub const CLEAR_WORKSPACE_LABEL: &str = "⌫ Clear workspace";

// ───────────────────────────────────────── controls popup ────

/// Interactive key binding popup.
pub struct ControlsPopup<'a> {
    pub config: &'a AppConfig,
    pub selected: usize,
    pub awaiting_rebind: bool,
}

impl<'a> Widget for ControlsPopup<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let height = (Action::ALL.len() as u16) + 7;
        let inner = frame(" Controls ", 56, height, area, buf);

        let mut lines = vec![Line::raw("")];
        for (i, &action) in Action::ALL.iter().enumerate() {
            let is_selected = i == self.selected;
            let keys = if is_selected && self.awaiting_rebind {
                "Press a key…".to_string()
            } else {
                self.config.display_bindings(action)
            };
            let key_style = if is_selected && self.awaiting_rebind {
                highlight().fg(Color::Yellow)
            } else if is_selected {
                highlight().fg(Color::Yellow).remove_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Yellow)
            };

            let label_col = format!("{}{:<24}", prefix(is_selected), action.label());
            let keys_width = (inner.width as usize).saturating_sub(label_col.chars().count()).max(1);
            lines.push(Line::from(vec![
                Span::styled(label_col, row_style(is_selected)),
                Span::styled(format!("{keys:>keys_width$}"), key_style),
            ]));
        }

        let reset_selected = self.selected == Action::ALL.len();
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("{}⟳ Reset to defaults", prefix(reset_selected)),
            row_style(reset_selected),
        )));
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "  Enter: add key  Del: clear  Esc: back",
            Theme::dim_style(),
        )));

        Paragraph::new(lines).render(inner, buf);
    }
}

// ───────────────────────────────────────── workspaces ────────

/// Saved named workspaces, newest timestamp shown beside each.
pub struct WorkspacesPopup<'a> {
    pub registry: &'a SnapshotRegistry,
    pub selected: usize,
}

impl<'a> Widget for WorkspacesPopup<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let height = (self.registry.len() as u16) + 7;
        let inner = frame(" Workspaces ", 56, height, area, buf);

        let mut lines = vec![Line::raw("")];
        if self.registry.is_empty() {
            lines.push(Line::from(Span::styled("   (none saved yet)", Theme::dim_style())));
        }
        for (i, (name, snapshot)) in self.registry.entries().iter().enumerate() {
            let is_selected = i == self.selected;
            let mark = if self.registry.active() == Some(name.as_str()) { " ●" } else { "" };
            lines.push(Line::from(vec![
                Span::styled(format!("{}{name}{mark}", prefix(is_selected)), row_style(is_selected)),
                Span::styled(
                    format!("  {}", snapshot.timestamp.format("%Y-%m-%d %H:%M")),
                    Theme::dim_style(),
                ),
            ]));
        }
        let clear_selected = self.selected == self.registry.len();
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("{}{CLEAR_WORKSPACE_LABEL}", prefix(clear_selected)),
            row_style(clear_selected),
        )));
        lines.push(Line::from(Span::styled(
            "  Enter: load  Del: delete  Esc: close",
            Theme::dim_style(),
        )));

        Paragraph::new(lines).render(inner, buf);
    }
}

// ───────────────────────────────────────── prompts ───────────

/// One-line text prompt (e.g. the name to save a workspace under).
pub struct InputPopup<'a> {
    pub title: &'a str,
    pub input: &'a str,
}

impl<'a> Widget for InputPopup<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = format!(" {} ", self.title);
        let inner = frame(&title, 48, 5, area, buf);
        let lines = vec![
            Line::from(Span::styled(format!(" {}▏", self.input), Theme::input_style())),
            Line::from(Span::styled(" Enter: save  Esc: cancel", Theme::dim_style())),
        ];
        Paragraph::new(lines).render(inner, buf);
    }
}

/// Delete confirmation.  Folders are only removed from the workspace.
pub struct ConfirmDeletePopup<'a> {
    pub names: &'a [String],
    pub folders: usize,
}

impl<'a> Widget for ConfirmDeletePopup<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = frame(" Delete ", 52, 8, area, buf);
        let what = match self.names {
            [one] => format!("\"{one}\""),
            many => format!("{} items", many.len()),
        };
        let mut lines = vec![Line::from(format!(" Delete {what}?"))];
        if self.folders > 0 {
            lines.push(Line::from(Span::styled(
                " Folders are removed from the workspace, not from disk.",
                Theme::dim_style(),
            )));
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(" y: delete  n/Esc: cancel", Theme::dim_style())));
        Paragraph::new(lines).wrap(Wrap { trim: false }).render(inner, buf);
    }
}

// ───────────────────────────────────────── helpers ───────────

/// Clear a centred box, draw its border, return the inner area.
fn frame(title: &str, width: u16, height: u16, area: Rect, buf: &mut Buffer) -> Rect {
    let popup = centered_fixed(width, height, area);
    Clear.render(popup, buf);
    let block = Block::default()
        .title(title.to_string())
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(popup);
    block.render(popup, buf);
    inner
}

fn prefix(selected: bool) -> &'static str {
    if selected {
        " ▸ "
    } else {
        "   "
    }
}

fn highlight() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn row_style(selected: bool) -> Style {
    if selected {
        highlight()
    } else {
        Style::default().fg(Color::White)
    }
}

/// Centred rectangle of fixed size, clamped to `area`.
fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
