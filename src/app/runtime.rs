//! Executes UI [`Command`]s against the workspace and folds the results
//! back into view state (status line, selection, cursor, prompts).

use tracing::debug;

use md_explorer::core::path;
use md_explorer::core::tree::{SortBy, SortDirection, SortSettings};
use md_explorer::error::WorkspaceError;
use md_explorer::gateway::FileGateway;
use md_explorer::workspace::{BatchReport, Workspace};

use super::state::{ActiveView, AppState, Command};

pub async fn execute<G: FileGateway>(ws: &mut Workspace<G>, app: &mut AppState, cmd: Command) {
    debug!(?cmd, "execute");
    match cmd {
        Command::Open(path) => {
            if let Err(err) = ws.open_file(&path).await {
                report_error(app, &err);
            }
        }
        Command::ToggleExpanded(path) => {
            ws.toggle_expanded(&path);
        }
        Command::Drop {
            sources,
            target,
            position,
        } => match ws.apply_move(&sources, &target, position).await {
            Ok(report) => apply_report(app, &report),
            Err(err) => report_error(app, &err),
        },
        Command::Paste { clipboard, folder } => {
            let result = if clipboard.cut {
                ws.move_into(&clipboard.paths, &folder).await
            } else {
                ws.copy_items(&clipboard.paths, &folder).await
            };
            match result {
                Ok(report) => {
                    if clipboard.cut {
                        app.clipboard = None;
                    }
                    ws.set_expanded(&folder, true);
                    apply_report(app, &report);
                }
                Err(err) => report_error(app, &err),
            }
        }
        Command::Rename { path, new_name } => match ws.rename_to(&path, &new_name).await {
            Ok(new_path) => {
                app.active_view = ActiveView::Tree;
                app.selection.rebase(&path, &new_path);
                reveal(ws, app, &new_path);
                app.set_status(format!("Renamed to {}", path::basename(&new_path)));
            }
            Err(err) => {
                // Keep the field open with the message under it.
                if let ActiveView::Rename { error, .. } = &mut app.active_view {
                    *error = Some(err.to_string());
                } else {
                    report_error(app, &err);
                }
            }
        },
        Command::ConfirmPending(path) => {
            if let Err(err) = ws.confirm_pending(&path).await {
                report_error(app, &err);
            }
        }
        Command::Delete(paths) => {
            app.active_view = ActiveView::Tree;
            if let [single] = paths.as_slice() {
                match ws.delete_item(single).await {
                    Ok(()) => app.set_status(format!("Deleted {}", path::basename(single))),
                    Err(err) => report_error(app, &err),
                }
            } else {
                match ws.delete_items(&paths).await {
                    Ok(report) => apply_report(app, &report),
                    Err(err) => report_error(app, &err),
                }
            }
        }
        Command::NewFile(parent) | Command::NewFolder(parent) if !ws.state().store.is_folder(&parent) => {
            report_error(app, &WorkspaceError::NotAFolder(parent));
        }
        Command::NewFile(parent) => {
            let created = ws.create_file(&parent).await;
            begin_rename_of_created(ws, app, created);
        }
        Command::NewFolder(parent) => {
            let created = ws.create_folder(&parent).await;
            begin_rename_of_created(ws, app, created);
        }
        Command::SaveFile => match ws.save_active().await {
            Ok(()) => {
                if let Some(active) = ws.state().active_file() {
                    app.set_status(format!("Saved {}", path::basename(active)));
                }
            }
            Err(err) => report_error(app, &err),
        },
        Command::CloseTab => {
            if let Some(active) = ws.state().active_file().map(str::to_string) {
                ws.close_tab(&active).await;
            }
        }
        Command::NextTab => {
            let paths = ws.state().tabs.paths();
            let next = ws
                .state()
                .active_file()
                .and_then(|a| paths.iter().position(|p| p == a))
                .map_or(0, |i| (i + 1) % paths.len().max(1));
            if let Some(path) = paths.get(next) {
                let path = path.clone();
                ws.activate_tab(&path).await;
            }
        }
        Command::SaveWorkspace(name) => match ws.save_workspace(&name) {
            Ok(()) => {
                app.active_view = ActiveView::Tree;
                app.set_status(format!("Saved workspace \"{}\"", name.trim()));
            }
            Err(err) => report_error(app, &err),
        },
        Command::LoadWorkspace(name) => {
            app.active_view = ActiveView::Tree;
            app.selection.clear();
            app.tree_state.selected = 0;
            app.tree_state.offset = 0;
            match ws.load_workspace(&name).await {
                Ok(()) => app.set_status(format!("Loaded workspace \"{name}\"")),
                Err(err) => app.set_status(format!("Could not load \"{name}\": {err}")),
            }
        }
        Command::DeleteWorkspace(name) => match ws.delete_workspace(&name) {
            Ok(()) => app.set_status(format!("Deleted workspace \"{name}\"")),
            Err(err) => report_error(app, &err),
        },
        Command::ClearWorkspace => {
            app.active_view = ActiveView::Tree;
            match ws.clear_workspace() {
                Ok(()) => {
                    app.selection.clear();
                    app.clipboard = None;
                    app.set_status("Workspace cleared");
                }
                Err(err) => report_error(app, &err),
            }
        }
        Command::Refresh => match ws.refresh().await {
            Ok(failures) if failures.is_empty() => app.set_status("Refreshed"),
            Ok(failures) => {
                let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
                app.set_status(format!("Dropped unreadable roots: {}", names.join(", ")));
            }
            Err(err) => report_error(app, &err),
        },
        Command::CycleSort => {
            let next = next_sort(ws.state().sort);
            ws.set_sort(next);
            app.set_status(format!("Sort: {}", sort_label(next)));
        }
    }

    let store = &ws.state().store;
    app.selection.retain(|p| store.contains(p));
    if let Some(clipboard) = &mut app.clipboard {
        clipboard.paths.retain(|p| store.contains(p));
    }
}

fn begin_rename_of_created<G: FileGateway>(
    ws: &mut Workspace<G>,
    app: &mut AppState,
    created: md_explorer::error::Result<String>,
) {
    match created {
        Ok(path) => {
            app.selection.select_only(&path);
            reveal(ws, app, &path);
            app.active_view = ActiveView::Rename {
                input: path::basename(&path).to_string(),
                path,
                error: None,
            };
        }
        Err(err) => report_error(app, &err),
    }
}

/// Expand ancestors of `path` and put the cursor on it.
pub fn reveal<G: FileGateway>(ws: &mut Workspace<G>, app: &mut AppState, path: &str) {
    ws.expand_to(path);
    if let Some(i) = ws.visible_paths().iter().position(|p| p == path) {
        app.tree_state.selected = i;
    }
}

fn apply_report(app: &mut AppState, report: &BatchReport) {
    for (old, new) in &report.succeeded {
        app.selection.rebase(old, new);
    }
    app.set_status(report.summary());
}

fn report_error(app: &mut AppState, err: &WorkspaceError) {
    if err.is_silent() {
        debug!(%err, "rejected");
        return;
    }
    app.set_status(err.to_string());
}

fn next_sort(sort: SortSettings) -> SortSettings {
    use SortBy::*;
    use SortDirection::*;
    let (by, direction) = match (sort.by, sort.direction) {
        (Name, Asc) => (Name, Desc),
        (Name, Desc) => (Modified, Desc),
        (Modified, Desc) => (Modified, Asc),
        (Modified, Asc) => (Size, Desc),
        (Size, Desc) => (Size, Asc),
        (Size, Asc) => (Name, Asc),
    };
    SortSettings { by, direction }
}

fn sort_label(sort: SortSettings) -> String {
    let by = match sort.by {
        SortBy::Name => "name",
        SortBy::Modified => "modified",
        SortBy::Size => "size",
    };
    let dir = match sort.direction {
        SortDirection::Asc => "↑",
        SortDirection::Desc => "↓",
    };
    format!("{by} {dir}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::Clipboard;
    use md_explorer::config::AppConfig;
    use md_explorer::core::selection::DropPosition;
    use md_explorer::gateway::memory::MemoryGateway;

    async fn setup() -> (Workspace<MemoryGateway>, AppState) {
        let gw = MemoryGateway::new()
            .with_file("/r/a.md", "a")
            .with_file("/r/b.md", "b")
            .with_folder("/r/sub");
        let mut ws = Workspace::new(gw);
        ws.add_root_folder("/r").await.unwrap();
        (ws, AppState::new(AppConfig::default()))
    }

    #[tokio::test]
    async fn new_file_enters_rename_and_rename_opens_it() {
        let (mut ws, mut app) = setup().await;
        execute(&mut ws, &mut app, Command::NewFile("/r".into())).await;
        let ActiveView::Rename { path, input, .. } = app.active_view.clone() else {
            panic!("expected rename prompt, got {:?}", app.active_view);
        };
        assert_eq!(path, "/r/Untitled.md");
        assert_eq!(input, "Untitled.md");

        execute(
            &mut ws,
            &mut app,
            Command::Rename {
                path,
                new_name: "todo.md".into(),
            },
        )
        .await;
        assert_eq!(app.active_view, ActiveView::Tree);
        assert!(app.selection.contains("/r/todo.md"));
        assert_eq!(ws.state().active_file(), Some("/r/todo.md"));
    }

    #[tokio::test]
    async fn rename_error_stays_inline() {
        let (mut ws, mut app) = setup().await;
        app.active_view = ActiveView::Rename {
            path: "/r/a.md".into(),
            input: "b.md".into(),
            error: None,
        };
        execute(
            &mut ws,
            &mut app,
            Command::Rename {
                path: "/r/a.md".into(),
                new_name: "b.md".into(),
            },
        )
        .await;
        assert!(matches!(
            app.active_view,
            ActiveView::Rename { error: Some(_), .. }
        ));
        assert!(ws.state().store.contains("/r/a.md"));
    }

    #[tokio::test]
    async fn cut_paste_moves_and_follows_selection() {
        let (mut ws, mut app) = setup().await;
        app.selection.select_only("/r/a.md");
        app.clipboard = Some(Clipboard {
            paths: vec!["/r/a.md".into()],
            cut: true,
        });
        let clipboard = app.clipboard.clone().unwrap();
        execute(
            &mut ws,
            &mut app,
            Command::Paste {
                clipboard,
                folder: "/r/sub".into(),
            },
        )
        .await;
        assert!(ws.state().store.contains("/r/sub/a.md"));
        assert!(app.selection.contains("/r/sub/a.md"));
        assert!(app.clipboard.is_none());
        assert_eq!(app.status_message.as_deref(), Some("Moved 1 item"));
    }

    #[tokio::test]
    async fn invalid_drop_is_silent() {
        let (mut ws, mut app) = setup().await;
        execute(
            &mut ws,
            &mut app,
            Command::Drop {
                sources: vec!["/r/sub".into()],
                target: "/r/sub".into(),
                position: DropPosition::Middle,
            },
        )
        .await;
        assert!(app.status_message.is_none());
    }

    #[test]
    fn sort_cycle_returns_to_start() {
        let start = SortSettings::default();
        let mut sort = next_sort(start);
        let mut steps = 1;
        while sort != start {
            sort = next_sort(sort);
            steps += 1;
        }
        assert_eq!(steps, 6);
    }
}
