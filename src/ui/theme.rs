//! Colour palette and text styles used across the UI.

use ratatui::style::{Color, Modifier, Style};

/// Central theme.  Change colours here and they propagate everywhere.
pub struct Theme;

impl Theme {
    // ── tree view ──────────────────────────────────────────────
    pub fn folder_style() -> Style {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }

    pub fn root_style() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn file_style() -> Style {
        Style::default().fg(Color::White)
    }

    /// Files open in a tab.
    pub fn open_file_style() -> Style {
        Style::default()
            .fg(Color::LightBlue)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn cursor_style() -> Style {
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD)
    }

    /// Rows in the multi-selection.
    pub fn selected_style() -> Style {
        Style::default().bg(Color::Blue).fg(Color::White)
    }

    /// Rows waiting for a cut/paste.
    pub fn cut_style() -> Style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn drop_target_style() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
    }

    pub fn marker_style() -> Style {
        Style::default().fg(Color::Yellow)
    }

    // ── chrome ─────────────────────────────────────────────────
    pub fn border_style() -> Style {
        Style::default().fg(Color::Gray)
    }

    pub fn title_style() -> Style {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_style() -> Style {
        Style::default().bg(Color::DarkGray).fg(Color::White)
    }

    pub fn input_style() -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn error_style() -> Style {
        Style::default().fg(Color::Red)
    }

    pub fn dim_style() -> Style {
        Style::default().fg(Color::DarkGray)
    }
}
