//! Terminal workspace explorer for Markdown notes.
//!
//! Run with one or more folders to open them as roots, or with no arguments
//! to pick up the previous session.  `--print-tree` prints the explorer
//! forest without starting the UI.

mod app;
mod ui;

use std::io::{self, stderr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        DisableBracketedPaste, DisableFocusChange, DisableMouseCapture, EnableBracketedPaste,
        EnableFocusChange, EnableMouseCapture,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tracing::{info, warn};

use md_explorer::config::AppConfig;
use md_explorer::core::path;
use md_explorer::gateway::local::{LocalGateway, WalkConfig};
use md_explorer::gateway::memory::MemoryGateway;
use md_explorer::gateway::FileGateway;
use md_explorer::persist::{PersistedState, StateFile};
use md_explorer::workspace::Workspace;

use crate::app::{
    event::{spawn_event_reader, AppEvent},
    handler, runtime,
    state::{ActiveView, AppState},
};
use crate::ui::{layout::AppLayout, popup, theme::Theme, tree_widget::TreeWidget};

// ───────────────────────────────────────── CLI ───────────────

#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"), about = "Workspace explorer for Markdown folders")]
struct Cli {
    /// Folders to open as workspace roots.
    roots: Vec<PathBuf>,

    /// Load a saved named workspace on start.
    #[arg(long, short = 'w')]
    workspace: Option<String>,

    /// Session state file (defaults to the XDG data directory).
    #[arg(long = "state-file")]
    state_file: Option<PathBuf>,

    /// Show hidden (dot) files.
    #[arg(long)]
    hidden: bool,

    /// Print the explorer tree and exit.
    #[arg(long = "print-tree")]
    print_tree: bool,

    /// List saved workspaces and exit.
    #[arg(long = "list-workspaces")]
    list_workspaces: bool,

    /// Explore a built-in in-memory folder instead of the disk.  Nothing is
    /// persisted.
    #[arg(long)]
    demo: bool,
}

// ───────────────────────────────────────── bootstrap ─────────

fn demo_gateway() -> MemoryGateway {
    MemoryGateway::new()
        .with_file("/demo/README.md", "# Demo\n\nDrag files around, rename them, make folders.\n")
        .with_file("/demo/journal/2024-01-01.md", "New year.\n")
        .with_file("/demo/journal/2024-01-02.md", "Second day.\n")
        .with_file("/demo/projects/explorer.md", "- [ ] ship it\n")
        .with_folder("/demo/archive")
}

/// Restore the previous session, then apply the command line on top.
async fn bootstrap<G: FileGateway>(
    ws: &mut Workspace<G>,
    persisted: &PersistedState,
    cli: &Cli,
    roots: &[String],
) -> Result<()> {
    if let Err(err) = persisted.restore_into(ws).await {
        warn!(%err, "could not restore previous session");
    }
    for root in roots {
        ws.add_root_folder(root)
            .await
            .with_context(|| format!("cannot open {root}"))?;
    }
    if let Some(name) = &cli.workspace {
        ws.load_workspace(name)
            .await
            .with_context(|| format!("cannot load workspace \"{name}\""))?;
    }
    Ok(())
}

fn print_tree<G: FileGateway>(ws: &Workspace<G>) {
    for (depth, p) in ws.tree().outline() {
        let folder = ws.state().store.is_folder(&p);
        let name = if depth == 0 { p.as_str() } else { path::basename(&p) };
        println!("{}{}{}", "  ".repeat(depth), name, if folder { "/" } else { "" });
    }
}

// ───────────────────────────────────────── drawing ───────────

fn draw<G: FileGateway>(frame: &mut Frame, ws: &Workspace<G>, state: &mut AppState) {
    state.terminal_area = frame.area();
    let layout = AppLayout::from_area(frame.area());

    // ── tab bar ───────────────────────────────────────────────
    let tabs = &ws.state().tabs;
    let mut spans = Vec::new();
    for tab in tabs.iter() {
        let active = tabs.active() == Some(tab.path.as_str());
        let dirty = if tab.is_dirty { " ●" } else { "" };
        let style = if active {
            Theme::cursor_style()
        } else {
            Theme::dim_style()
        };
        spans.push(Span::styled(format!(" {}{dirty} ", tab.name), style));
        spans.push(Span::raw("│"));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), layout.tabs_area);

    // ── explorer ──────────────────────────────────────────────
    let title = match ws.registry().active() {
        Some(name) => format!(" {name} "),
        None => " Explorer ".to_string(),
    };
    let tree_block = Block::default()
        .title(title)
        .title_style(Theme::title_style())
        .borders(Borders::ALL)
        .border_style(Theme::border_style());
    let cut: &[String] = match &state.clipboard {
        Some(clip) if clip.cut => &clip.paths,
        _ => &[],
    };
    let mut tree = TreeWidget::new(ws.tree(), &ws.state().expanded)
        .selection(&state.selection)
        .tabs(tabs)
        .cut(cut)
        .block(tree_block);
    if let Some(hover) = state.drag.hover() {
        tree = tree.drop_hover(&hover.path, hover.position);
    }
    if let ActiveView::Rename { path, input, .. } = &state.active_view {
        tree = tree.rename(path, input);
    }
    frame.render_stateful_widget(tree, layout.tree_area, &mut state.tree_state);

    // ── preview ───────────────────────────────────────────────
    let preview_title = ws
        .state()
        .active_file()
        .map_or_else(|| " Preview ".to_string(), |p| format!(" {} ", path::basename(p)));
    let preview = Paragraph::new(ws.active_content().unwrap_or_default())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(preview_title)
                .title_style(Theme::title_style())
                .borders(Borders::ALL)
                .border_style(Theme::border_style()),
        );
    frame.render_widget(preview, layout.preview_area);

    // ── status ────────────────────────────────────────────────
    let status = match &state.active_view {
        ActiveView::Rename {
            error: Some(err), ..
        } => Paragraph::new(err.as_str()).style(Theme::error_style()),
        ActiveView::Rename { .. } => {
            Paragraph::new("Enter: rename | Esc: cancel").style(Theme::status_bar_style())
        }
        _ => {
            let text = state
                .status_message
                .clone()
                .unwrap_or_else(|| state.config.status_bar_hint());
            Paragraph::new(text).style(Theme::status_bar_style())
        }
    };
    frame.render_widget(status, layout.status_area);

    // ── popups ────────────────────────────────────────────────
    match &state.active_view {
        ActiveView::ControlsSubmenu => frame.render_widget(
            popup::ControlsPopup {
                config: &state.config,
                selected: state.controls_selected,
                awaiting_rebind: state.awaiting_rebind,
            },
            frame.area(),
        ),
        ActiveView::Workspaces { selected } => frame.render_widget(
            popup::WorkspacesPopup {
                registry: ws.registry(),
                selected: *selected,
            },
            frame.area(),
        ),
        ActiveView::SaveWorkspace { input } => frame.render_widget(
            popup::InputPopup {
                title: "Save workspace as",
                input,
            },
            frame.area(),
        ),
        ActiveView::ConfirmDelete { paths } => {
            let folders = paths
                .iter()
                .filter(|p| ws.state().store.is_folder(p))
                .count();
            let names: Vec<String> = paths.iter().map(|p| path::basename(p).to_string()).collect();
            frame.render_widget(
                popup::ConfirmDeletePopup {
                    names: &names,
                    folders,
                },
                frame.area(),
            );
        }
        ActiveView::Tree | ActiveView::Rename { .. } => {}
    }
}

// ───────────────────────────────────────── event loop ────────

async fn run<G: FileGateway>(
    ws: &mut Workspace<G>,
    state: &mut AppState,
    persist: Option<(&StateFile, &mut PersistedState)>,
) -> Result<()> {
    // ── terminal setup ────────────────────────────────────────
    enable_raw_mode()?;
    let mut stderr_handle = stderr();
    execute!(
        stderr_handle,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stderr());
    let mut terminal = Terminal::new(backend)?;

    let mut events = spawn_event_reader(Duration::from_millis(250));
    let mut persist = persist;

    loop {
        terminal.draw(|frame| draw(frame, ws, state))?;

        let Some(event) = events.recv().await else {
            break;
        };
        let command = match event {
            AppEvent::Key(k) => handler::handle_key(state, ws, k),
            AppEvent::Mouse(m) => handler::handle_mouse(state, ws, m),
            AppEvent::Paste(text) => {
                handler::handle_paste(state, &text);
                None
            }
            AppEvent::FocusLost => {
                if let Some((file, record)) = persist.as_mut() {
                    flush(ws, file, record);
                }
                None
            }
            AppEvent::Resize(_, _) | AppEvent::Tick => None,
        };
        if let Some(command) = command {
            runtime::execute(ws, state, command).await;
        }

        if state.should_quit {
            break;
        }
    }

    // ── teardown ──────────────────────────────────────────────
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Some((file, record)) = persist {
        flush(ws, file, record);
    }
    Ok(())
}

/// Fold the live workspace into the record and write it out.
fn flush<G: FileGateway>(ws: &Workspace<G>, file: &StateFile, record: &mut PersistedState) {
    record.record(ws);
    match file.save(record) {
        Ok(()) => info!(path = %file.path().display(), "state saved"),
        Err(err) => warn!(%err, "could not save state"),
    }
}

// ───────────────────────────────────────── main ─────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Stderr only; stdout is reserved for `--print-tree`.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load();
    config.show_hidden |= cli.hidden;
    let state_file = cli
        .state_file
        .clone()
        .or_else(|| config.state_file.clone())
        .map_or_else(StateFile::default_location, StateFile::new);

    if cli.demo {
        let mut ws = Workspace::new(demo_gateway()).with_history_limit(config.history_limit);
        ws.add_root_folder("/demo").await?;
        if cli.print_tree {
            print_tree(&ws);
            return Ok(());
        }
        let mut state = AppState::new(config);
        return run(&mut ws, &mut state, None).await;
    }

    let mut persisted = state_file
        .load()
        .with_context(|| format!("cannot read {}", state_file.path().display()))?;

    if cli.list_workspaces {
        let registry = persisted.registry();
        for (name, snapshot) in registry.entries() {
            let mark = if registry.active() == Some(name.as_str()) { "*" } else { " " };
            println!(
                "{mark} {name}  ({} roots, saved {})",
                snapshot.root_folders.len(),
                snapshot.timestamp.format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    }

    let mut roots = Vec::with_capacity(cli.roots.len());
    for root in &cli.roots {
        let abs = root
            .canonicalize()
            .with_context(|| format!("cannot open {}", root.display()))?;
        roots.push(path::from_os(&abs));
    }

    let gateway = LocalGateway::new(WalkConfig {
        respect_gitignore: config.respect_gitignore,
        show_hidden: config.show_hidden,
    });
    let mut ws = Workspace::new(gateway).with_history_limit(config.history_limit);
    bootstrap(&mut ws, &persisted, &cli, &roots).await?;
    info!(roots = ws.state().roots.len(), "workspace ready");

    if cli.print_tree {
        print_tree(&ws);
        return Ok(());
    }

    let mut state = AppState::new(config);
    run(&mut ws, &mut state, Some((&state_file, &mut persisted))).await
}
