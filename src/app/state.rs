//! Front-end state.
//!
//! Everything here is view state: cursor, selection, drag, prompts.  The
//! workspace itself is owned by the main loop and only ever changed through
//! [`Command`]s, so rendering is a pure function of `(&Workspace, &AppState)`.

use std::time::Instant;

use ratatui::layout::Rect;

use md_explorer::config::AppConfig;
use md_explorer::core::selection::{DragController, DropPosition, Selection};

use crate::ui::tree_widget::TreeWidgetState;

/// Which view / overlay is currently active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Tree,
    /// Inline rename of `path`; `error` shows under the field.
    Rename {
        path: String,
        input: String,
        error: Option<String>,
    },
    /// Waiting for y/n before deleting.
    ConfirmDelete { paths: Vec<String> },
    SaveWorkspace { input: String },
    Workspaces { selected: usize },
    ControlsSubmenu,
}

/// Paths waiting for a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clipboard {
    pub paths: Vec<String>,
    /// Cut moves on paste; otherwise the items are copied.
    pub cut: bool,
}

/// A workspace operation requested by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    ToggleExpanded(String),
    Drop {
        sources: Vec<String>,
        target: String,
        position: DropPosition,
    },
    Paste {
        clipboard: Clipboard,
        folder: String,
    },
    Rename { path: String, new_name: String },
    /// The initial rename of a new file was dismissed.
    ConfirmPending(String),
    Delete(Vec<String>),
    NewFile(String),
    NewFolder(String),
    SaveFile,
    CloseTab,
    NextTab,
    SaveWorkspace(String),
    LoadWorkspace(String),
    DeleteWorkspace(String),
    ClearWorkspace,
    Refresh,
    CycleSort,
}

/// Top-level front-end state.
pub struct AppState {
    pub config: AppConfig,
    /// Cursor row and scroll offset.
    pub tree_state: TreeWidgetState,
    pub selection: Selection,
    pub drag: DragController,
    pub clipboard: Option<Clipboard>,
    pub active_view: ActiveView,
    pub should_quit: bool,
    pub status_message: Option<String>,
    /// Highlighted row in the controls submenu.
    pub controls_selected: usize,
    /// The controls submenu is waiting for a key to bind.
    pub awaiting_rebind: bool,
    /// Last left-clicked path and when, for repeated-click detection.
    pub last_left_click: Option<(String, Instant)>,
    /// Row currently under a mouse drag, for highlighting.
    pub drag_hover: Option<usize>,
    pub terminal_area: Rect,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            tree_state: TreeWidgetState::default(),
            selection: Selection::default(),
            drag: DragController::default(),
            clipboard: None,
            active_view: ActiveView::default(),
            should_quit: false,
            status_message: None,
            controls_selected: 0,
            awaiting_rebind: false,
            last_left_click: None,
            drag_hover: None,
            terminal_area: Rect::default(),
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }
}
