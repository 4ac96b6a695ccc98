//! Input handling: maps key/mouse events to view-state changes and
//! workspace [`Command`]s.
//!
//! Nothing here awaits; every structural change is returned as a
//! [`Command`] for the main loop to run through the workspace.

use std::time::{Duration, Instant};

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use md_explorer::config::{Action, KeyBind};
use md_explorer::core::path;
use md_explorer::core::selection::{ClickModifiers, ClickOutcome, ClickTarget, DropPosition};
use md_explorer::gateway::FileGateway;
use md_explorer::workspace::Workspace;

use super::state::{ActiveView, AppState, Clipboard, Command};
use crate::ui::layout::AppLayout;
use crate::ui::tree_widget::{build_rows, TreeRow};

/// Total selectable rows in the controls submenu (actions + "Reset").
pub fn controls_item_count() -> usize {
    Action::ALL.len() + 1
}

fn rows<G: FileGateway>(ws: &Workspace<G>) -> Vec<TreeRow> {
    build_rows(ws.tree(), &ws.state().expanded)
}

fn cursor_row<G: FileGateway>(state: &AppState, ws: &Workspace<G>) -> Option<TreeRow> {
    rows(ws).into_iter().nth(state.tree_state.selected)
}

/// Process a key event, dispatching on the active view.
pub fn handle_key<G: FileGateway>(
    state: &mut AppState,
    ws: &Workspace<G>,
    key: KeyEvent,
) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    // Ctrl+c always quits, regardless of view.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        state.should_quit = true;
        return None;
    }
    state.status_message = None;

    match state.active_view.clone() {
        ActiveView::Tree => handle_tree_key(state, ws, key),
        ActiveView::Rename { path, input, .. } => handle_rename_key(state, ws, key, path, input),
        ActiveView::ConfirmDelete { paths } => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(Command::Delete(paths)),
            KeyCode::Char('n') | KeyCode::Esc => {
                state.active_view = ActiveView::Tree;
                None
            }
            _ => None,
        },
        ActiveView::SaveWorkspace { mut input } => match key.code {
            KeyCode::Enter => Some(Command::SaveWorkspace(input)),
            KeyCode::Esc => {
                state.active_view = ActiveView::Tree;
                None
            }
            code => {
                edit_line(&mut input, code);
                state.active_view = ActiveView::SaveWorkspace { input };
                None
            }
        },
        ActiveView::Workspaces { selected } => handle_workspaces_key(state, ws, key, selected),
        ActiveView::ControlsSubmenu => {
            if state.awaiting_rebind {
                handle_rebind_key(state, key);
            } else {
                handle_controls_key(state, key);
            }
            None
        }
    }
}

/// Bracketed paste goes into whichever text prompt is open.
pub fn handle_paste(state: &mut AppState, text: &str) {
    let line = text.lines().next().unwrap_or_default();
    match &mut state.active_view {
        ActiveView::Rename { input, error, .. } => {
            input.push_str(line);
            *error = None;
        }
        ActiveView::SaveWorkspace { input } => input.push_str(line),
        _ => {}
    }
}

// ── Tree view (configurable bindings) ───────────────────────────

fn handle_tree_key<G: FileGateway>(
    state: &mut AppState,
    ws: &Workspace<G>,
    key: KeyEvent,
) -> Option<Command> {
    let rows = rows(ws);
    match key.code {
        KeyCode::Home => {
            state.tree_state.selected = 0;
            return None;
        }
        KeyCode::End => {
            state.tree_state.selected = rows.len().saturating_sub(1);
            return None;
        }
        KeyCode::Esc => {
            state.selection.clear();
            state.clipboard = None;
            return None;
        }
        _ => {}
    }

    let action = state.config.match_key(key)?;
    let current = rows.get(state.tree_state.selected).cloned();
    let visible: Vec<String> = rows.iter().map(|r| r.path.clone()).collect();

    match action {
        Action::Quit => state.should_quit = true,
        Action::ShowControls => {
            state.active_view = ActiveView::ControlsSubmenu;
            state.controls_selected = 0;
        }
        Action::MoveUp | Action::MoveDown => {
            if action == Action::MoveUp {
                state.tree_state.select_prev();
            } else {
                state.tree_state.select_next(rows.len());
            }
            if let Some(row) = rows.get(state.tree_state.selected) {
                state.selection.select_only(&row.path);
            }
        }
        Action::ExtendUp | Action::ExtendDown => {
            if state.selection.anchor().is_none() {
                if let Some(row) = &current {
                    state.selection.select_only(&row.path);
                }
            }
            if action == Action::ExtendUp {
                state.tree_state.select_prev();
            } else {
                state.tree_state.select_next(rows.len());
            }
            if let Some(row) = rows.get(state.tree_state.selected) {
                state.selection.click(
                    &row.path,
                    ClickModifiers::RANGE,
                    ClickTarget::Row,
                    row.is_folder,
                    &visible,
                );
            }
        }
        Action::ToggleSelect => {
            let row = current?;
            state
                .selection
                .click(&row.path, ClickModifiers::TOGGLE, ClickTarget::Row, row.is_folder, &visible);
        }
        Action::Expand => {
            let row = current?;
            if row.is_folder && !row.expanded {
                return Some(Command::ToggleExpanded(row.path));
            }
            if row.is_folder {
                state.tree_state.select_next(rows.len());
            }
        }
        Action::Collapse => {
            let row = current?;
            if row.is_folder && row.expanded {
                return Some(Command::ToggleExpanded(row.path));
            }
            let parent = path::dirname(&row.path);
            if let Some(i) = rows.iter().position(|r| r.path == parent) {
                state.tree_state.selected = i;
            }
        }
        Action::Open => {
            let row = current?;
            state.selection.select_only(&row.path);
            return Some(if row.is_folder {
                Command::ToggleExpanded(row.path)
            } else {
                Command::Open(row.path)
            });
        }
        Action::Rename => {
            let row = current?;
            state.active_view = ActiveView::Rename {
                input: row.label.clone(),
                path: row.path,
                error: None,
            };
        }
        Action::Delete => {
            let paths = targets(state, current.as_ref(), &visible);
            if !paths.is_empty() {
                state.active_view = ActiveView::ConfirmDelete { paths };
            }
        }
        Action::NewFile | Action::NewFolder => {
            let folder = containing_folder(current.as_ref())?;
            return Some(if action == Action::NewFile {
                Command::NewFile(folder)
            } else {
                Command::NewFolder(folder)
            });
        }
        Action::Cut | Action::Copy => {
            let paths = targets(state, current.as_ref(), &visible);
            if paths.is_empty() {
                return None;
            }
            let cut = action == Action::Cut;
            state.status_message = Some(format!(
                "{} {} item(s); paste into a folder with {}",
                if cut { "Cut" } else { "Copied" },
                paths.len(),
                state.config.display_bindings(Action::Paste),
            ));
            state.clipboard = Some(Clipboard { paths, cut });
        }
        Action::Paste => {
            let clipboard = state.clipboard.clone()?;
            let folder = containing_folder(current.as_ref())?;
            return Some(Command::Paste { clipboard, folder });
        }
        Action::ReorderUp | Action::ReorderDown => {
            return reorder_command(state, ws, current.as_ref(), &visible, action == Action::ReorderUp);
        }
        Action::SaveFile => return Some(Command::SaveFile),
        Action::CloseTab => return Some(Command::CloseTab),
        Action::NextTab => return Some(Command::NextTab),
        Action::SaveWorkspace => {
            state.active_view = ActiveView::SaveWorkspace {
                input: ws.registry().active().unwrap_or_default().to_string(),
            };
        }
        Action::Workspaces => {
            state.active_view = ActiveView::Workspaces { selected: 0 };
        }
        Action::Refresh => return Some(Command::Refresh),
        Action::CycleSort => return Some(Command::CycleSort),
    }
    None
}

/// Selected paths if the cursor row is part of the selection, else the
/// cursor row alone.
fn targets(state: &AppState, current: Option<&TreeRow>, visible: &[String]) -> Vec<String> {
    match current {
        Some(row) if state.selection.contains(&row.path) => state.selection.ordered(visible),
        Some(row) => vec![row.path.clone()],
        None => Vec::new(),
    }
}

/// The cursor row if it is a folder, else its parent.
fn containing_folder(current: Option<&TreeRow>) -> Option<String> {
    let row = current?;
    Some(if row.is_folder {
        row.path.clone()
    } else {
        path::dirname(&row.path)
    })
}

/// Move the selected block one slot up or down among its siblings.
fn reorder_command<G: FileGateway>(
    state: &AppState,
    ws: &Workspace<G>,
    current: Option<&TreeRow>,
    visible: &[String],
    up: bool,
) -> Option<Command> {
    let row = current?;
    let sources = targets(state, Some(row), visible);
    let siblings = if row.is_root {
        ws.tree().root_paths()
    } else {
        ws.tree().child_paths(&path::dirname(&row.path))
    };
    let positions: Vec<usize> = sources
        .iter()
        .filter_map(|s| siblings.iter().position(|p| p == s))
        .collect();
    if positions.len() != sources.len() {
        return None;
    }
    let (target, position) = if up {
        let first = *positions.iter().min()?;
        (siblings.get(first.checked_sub(1)?)?, DropPosition::Top)
    } else {
        let last = *positions.iter().max()?;
        (siblings.get(last + 1)?, DropPosition::Bottom)
    };
    Some(Command::Drop {
        sources,
        target: target.clone(),
        position,
    })
}

// ── Prompts ─────────────────────────────────────────────────────

fn edit_line(input: &mut String, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(c) => input.push(c),
        _ => {}
    }
}

fn handle_rename_key<G: FileGateway>(
    state: &mut AppState,
    ws: &Workspace<G>,
    key: KeyEvent,
    path: String,
    mut input: String,
) -> Option<Command> {
    match key.code {
        KeyCode::Enter => {
            if input == path::basename(&path) && !ws.state().pending.contains(&path) {
                state.active_view = ActiveView::Tree;
                return None;
            }
            Some(Command::Rename {
                path,
                new_name: input,
            })
        }
        KeyCode::Esc => {
            state.active_view = ActiveView::Tree;
            ws.state()
                .pending
                .contains(&path)
                .then_some(Command::ConfirmPending(path))
        }
        code => {
            edit_line(&mut input, code);
            state.active_view = ActiveView::Rename {
                path,
                input,
                error: None,
            };
            None
        }
    }
}

fn handle_workspaces_key<G: FileGateway>(
    state: &mut AppState,
    ws: &Workspace<G>,
    key: KeyEvent,
    selected: usize,
) -> Option<Command> {
    let names = ws.registry().names();
    // The row after the names is "clear workspace".
    let count = names.len() + 1;
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            state.active_view = ActiveView::Tree;
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.active_view = ActiveView::Workspaces {
                selected: selected.saturating_sub(1),
            };
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.active_view = ActiveView::Workspaces {
                selected: (selected + 1).min(count - 1),
            };
            None
        }
        KeyCode::Enter => Some(match names.get(selected) {
            Some(name) => Command::LoadWorkspace(name.clone()),
            None => Command::ClearWorkspace,
        }),
        KeyCode::Delete | KeyCode::Char('d') => {
            let name = names.get(selected)?.clone();
            state.active_view = ActiveView::Workspaces {
                selected: selected.min(count.saturating_sub(2)),
            };
            Some(Command::DeleteWorkspace(name))
        }
        _ => None,
    }
}

// ── Controls submenu (hardcoded navigation, interactive rebinding) ──

fn handle_controls_key(state: &mut AppState, key: KeyEvent) {
    let item_count = controls_item_count();

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            state.active_view = ActiveView::Tree;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.controls_selected = state.controls_selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.controls_selected < item_count - 1 {
                state.controls_selected += 1;
            }
        }
        KeyCode::Enter => {
            if state.controls_selected < Action::ALL.len() {
                state.awaiting_rebind = true;
            } else {
                state.config.reset_defaults();
                save_config(state);
            }
        }
        KeyCode::Delete | KeyCode::Backspace => {
            if let Some(&action) = Action::ALL.get(state.controls_selected) {
                state.config.bindings.insert(action, Vec::new());
                save_config(state);
            }
        }
        _ => {}
    }
}

/// Capture the next key press as a new binding.
fn handle_rebind_key(state: &mut AppState, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.code == KeyCode::Esc {
        state.awaiting_rebind = false;
        return;
    }
    // Ctrl+c stays reserved for quitting.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return;
    }

    if let Some(&action) = Action::ALL.get(state.controls_selected) {
        state.config.add_binding(action, KeyBind::from_key_event(key));
        save_config(state);
    }
    state.awaiting_rebind = false;
}

fn save_config(state: &mut AppState) {
    if let Err(err) = state.config.save() {
        tracing::warn!(%err, "could not save config");
        state.status_message = Some(format!("Could not save config: {err}"));
    }
}

// ── Mouse ───────────────────────────────────────────────────────

/// Plain drop goes into a folder (or below a file); Ctrl drops above the
/// row, Alt below it.
fn drop_position(modifiers: KeyModifiers) -> DropPosition {
    if modifiers.contains(KeyModifiers::CONTROL) {
        DropPosition::Top
    } else if modifiers.contains(KeyModifiers::ALT) {
        DropPosition::Bottom
    } else {
        DropPosition::Middle
    }
}

/// Process a mouse event.
pub fn handle_mouse<G: FileGateway>(
    state: &mut AppState,
    ws: &Workspace<G>,
    mouse: MouseEvent,
) -> Option<Command> {
    if state.active_view != ActiveView::Tree {
        return None;
    }
    let layout = AppLayout::from_area(state.terminal_area);
    let rows = rows(ws);
    let hit = layout
        .tree_row_at(mouse.column, mouse.row, state.tree_state.offset)
        .and_then(|i| rows.get(i).map(|row| (i, row)));

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some((index, row)) = hit else {
                state.last_left_click = None;
                return None;
            };
            state.tree_state.selected = index;
            state.status_message = None;

            let now = Instant::now();
            let window = Duration::from_millis(state.config.double_click_ms);
            let repeated = state
                .last_left_click
                .as_ref()
                .is_some_and(|(p, at)| p == &row.path && now.duration_since(*at) <= window);
            state.last_left_click = Some((row.path.clone(), now));
            if repeated && !row.is_folder {
                state.last_left_click = None;
                return Some(Command::Open(row.path.clone()));
            }

            let modifiers = ClickModifiers {
                toggle: mouse.modifiers.contains(KeyModifiers::CONTROL),
                range: mouse.modifiers.contains(KeyModifiers::SHIFT),
            };
            let label_start = layout.tree_content_x() + row.label_column();
            let label_end = label_start + row.label.chars().count() as u16;
            let target = if (label_start..label_end).contains(&mouse.column) {
                ClickTarget::Label
            } else {
                ClickTarget::Row
            };
            let visible: Vec<String> = rows.iter().map(|r| r.path.clone()).collect();
            match state
                .selection
                .click(&row.path, modifiers, target, row.is_folder, &visible)
            {
                ClickOutcome::BeginRename(path) if !repeated => {
                    state.active_view = ActiveView::Rename {
                        input: row.label.clone(),
                        path,
                        error: None,
                    };
                    None
                }
                ClickOutcome::ToggleExpand(path) => Some(Command::ToggleExpanded(path)),
                _ => None,
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if !state.drag.is_dragging() {
                let (pressed, _) = state.last_left_click.clone()?;
                let visible: Vec<String> = rows.iter().map(|r| r.path.clone()).collect();
                let sources = if state.selection.contains(&pressed) {
                    state.selection.ordered(&visible)
                } else {
                    vec![pressed]
                };
                state.drag.drag_start(sources);
                state.status_message = Some("Drop: into folder | Ctrl: above | Alt: below".into());
            }
            state.drag_hover = None;
            if let Some((index, row)) = hit {
                if state
                    .drag
                    .drag_over(&row.path, row.is_folder, drop_position(mouse.modifiers))
                    .is_some()
                {
                    state.drag_hover = Some(index);
                }
            }
            None
        }
        MouseEventKind::Up(MouseButton::Left) => {
            state.drag_hover = None;
            if !state.drag.is_dragging() {
                return None;
            }
            state.status_message = None;
            let Some((_, row)) = hit else {
                state.drag.drag_end();
                return None;
            };
            state.last_left_click = None;
            let request = state
                .drag
                .drop(&row.path, row.is_folder, drop_position(mouse.modifiers))?;
            Some(Command::Drop {
                sources: request.sources,
                target: request.target,
                position: request.position,
            })
        }
        MouseEventKind::ScrollUp => {
            state.tree_state.select_prev();
            None
        }
        MouseEventKind::ScrollDown => {
            state.tree_state.select_next(rows.len());
            None
        }
        _ => None,
    }
}
