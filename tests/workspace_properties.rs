//! End-to-end behaviour of the workspace engine over the in-memory gateway.

use md_explorer::core::path;
use md_explorer::core::selection::DropPosition;
use md_explorer::error::{GatewayError, ValidationError, WorkspaceError};
use md_explorer::gateway::memory::MemoryGateway;
use md_explorer::workspace::{Outcome, Workspace};

fn strings(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

async fn workspace(gw: MemoryGateway, roots: &[&str]) -> Workspace<MemoryGateway> {
    let mut ws = Workspace::new(gw);
    for root in roots {
        ws.add_root_folder(root).await.unwrap();
    }
    ws
}

#[tokio::test]
async fn tree_building_is_deterministic() {
    let gw = MemoryGateway::new()
        .with_file("/r/b.md", "")
        .with_file("/r/a.md", "")
        .with_file("/r/sub/z.md", "")
        .with_file("/s/x.md", "");
    let mut ws = workspace(gw, &["/r", "/s"]).await;
    ws.apply_move(&strings(&["/r/b.md"]), "/r/a.md", DropPosition::Top)
        .await
        .unwrap();

    let first = ws.state().build_tree();
    let second = ws.state().build_tree();
    assert_eq!(first.outline(), second.outline());
    assert_eq!(first.outline(), ws.tree().outline());
}

#[tokio::test]
async fn reorder_places_item_before_target() {
    let gw = MemoryGateway::new()
        .with_file("/r/a.md", "")
        .with_file("/r/b.md", "")
        .with_file("/r/c.md", "");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    gw.clear_calls();

    let report = ws
        .apply_move(&strings(&["/r/c.md"]), "/r/a.md", DropPosition::Top)
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::Reordered);
    assert_eq!(ws.tree().child_paths("/r"), ["/r/c.md", "/r/a.md", "/r/b.md"]);
    assert!(gw.structural_calls().is_empty());
}

#[tokio::test]
async fn moving_a_folder_rewrites_every_reference() {
    let gw = MemoryGateway::new()
        .with_file("/r/F/x.md", "x")
        .with_file("/r/F/y.md", "y")
        .with_folder("/r/G");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    ws.open_file("/r/F/x.md").await.unwrap();
    // Give F its own order entry.
    ws.apply_move(&strings(&["/r/F/y.md"]), "/r/F/x.md", DropPosition::Top)
        .await
        .unwrap();
    assert!(ws.state().order.get("/r/F").is_some());

    let report = ws
        .apply_move(&strings(&["/r/F"]), "/r/G", DropPosition::Middle)
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::Completed);
    let state = ws.state();
    assert!(state.store.is_folder("/r/G/F"));
    assert!(!state.store.contains("/r/F"));
    assert!(state.tabs.contains("/r/G/F/x.md"));
    assert_eq!(state.active_file(), Some("/r/G/F/x.md"));
    assert!(state
        .order
        .keys()
        .all(|k| !path::is_same_or_descendant(k, "/r/F")));
    assert!(state
        .order
        .iter()
        .flat_map(|(_, children)| children)
        .all(|c| !path::is_same_or_descendant(c, "/r/F")));
    assert_eq!(ws.tree().child_paths("/r/G/F"), ["/r/G/F/y.md", "/r/G/F/x.md"]);
    assert!(gw.exists("/r/G/F/x.md"));
}

#[tokio::test]
async fn dropping_a_folder_into_itself_changes_nothing() {
    let gw = MemoryGateway::new()
        .with_file("/r/F/sub/n.md", "")
        .with_file("/r/F/a.md", "");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    ws.open_file("/r/F/a.md").await.unwrap();
    let before = ws.state().clone();
    gw.clear_calls();

    for target in ["/r/F", "/r/F/sub"] {
        for position in [DropPosition::Top, DropPosition::Middle, DropPosition::Bottom] {
            let err = ws
                .apply_move(&strings(&["/r/F"]), target, position)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                WorkspaceError::Validation(ValidationError::InvalidDropTarget { .. })
            ));
            assert!(err.is_silent());
        }
    }

    assert_eq!(ws.state(), &before);
    assert!(gw.structural_calls().is_empty());
}

#[tokio::test]
async fn one_failed_item_does_not_block_the_others() {
    let gw = MemoryGateway::new()
        .with_file("/r/a.md", "")
        .with_file("/r/b.md", "")
        .with_file("/r/c.md", "")
        .with_folder("/r/dest");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    for f in ["/r/a.md", "/r/b.md", "/r/c.md"] {
        ws.open_file(f).await.unwrap();
    }
    gw.fail_on("/r/b.md", GatewayError::PermissionDenied("/r/b.md".into()));

    let report = ws
        .apply_move(
            &strings(&["/r/a.md", "/r/b.md", "/r/c.md"]),
            "/r/dest",
            DropPosition::Middle,
        )
        .await
        .unwrap();

    assert_eq!(report.outcome(), Outcome::Partial);
    let store = &ws.state().store;
    assert!(store.contains("/r/dest/a.md"));
    assert!(store.contains("/r/dest/c.md"));
    assert!(store.contains("/r/b.md"));
    let tabs = ws.state().tabs.paths();
    assert_eq!(tabs, ["/r/dest/a.md", "/r/b.md", "/r/dest/c.md"]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].name, "b.md");
    assert!(report.summary().contains("b.md"));
}

#[tokio::test]
async fn deleting_active_tab_falls_back_to_previous() {
    let gw = MemoryGateway::new()
        .with_file("/r/a.md", "a")
        .with_file("/r/b.md", "b")
        .with_file("/r/c.md", "c");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    for f in ["/r/a.md", "/r/b.md", "/r/c.md"] {
        ws.open_file(f).await.unwrap();
    }
    ws.activate_tab("/r/b.md").await;

    ws.delete_item("/r/b.md").await.unwrap();

    assert_eq!(ws.state().tabs.paths(), ["/r/a.md", "/r/c.md"]);
    assert_eq!(ws.state().active_file(), Some("/r/a.md"));
    assert_eq!(ws.active_content(), Some("a"));
    assert!(!gw.exists("/r/b.md"));
}

#[tokio::test]
async fn named_workspace_restores_roots_tabs_and_order() {
    let gw = MemoryGateway::new()
        .with_file("/one/a.md", "")
        .with_file("/one/b.md", "")
        .with_file("/two/c.md", "")
        .with_file("/two/d.md", "");
    let mut ws = workspace(gw, &["/one", "/two"]).await;
    ws.apply_move(&strings(&["/one/b.md"]), "/one/a.md", DropPosition::Top)
        .await
        .unwrap();
    ws.open_file("/one/a.md").await.unwrap();
    ws.open_file("/two/d.md").await.unwrap();
    ws.save_workspace("notes").unwrap();
    let saved = ws.state().clone();

    ws.clear_workspace().unwrap();
    assert!(ws.state().roots.is_empty());
    assert!(ws.state().tabs.is_empty());

    ws.load_workspace("notes").await.unwrap();
    let state = ws.state();
    assert_eq!(state.roots, saved.roots);
    assert_eq!(state.tabs.paths(), saved.tabs.paths());
    assert_eq!(state.order.get("/one"), saved.order.get("/one"));
    assert_eq!(state.active_file(), Some("/two/d.md"));
    assert_eq!(ws.tree().child_paths("/one"), ["/one/b.md", "/one/a.md"]);
    assert_eq!(ws.registry().active(), Some("notes"));
}

#[tokio::test]
async fn new_file_name_skips_taken_suffixes() {
    let gw = MemoryGateway::new()
        .with_file("/r/Untitled.md", "")
        .with_file("/r/Untitled (1).md", "");
    let mut ws = workspace(gw.clone(), &["/r"]).await;

    let created = ws.create_file("/r").await.unwrap();

    assert_eq!(created, "/r/Untitled (2).md");
    assert!(gw.exists("/r/Untitled (2).md"));
    assert!(ws.state().pending.contains(&created));
}

#[tokio::test]
async fn gateway_failure_on_rename_keeps_state() {
    let gw = MemoryGateway::new().with_file("/r/a.md", "");
    let mut ws = workspace(gw.clone(), &["/r"]).await;
    let before = ws.state().clone();
    gw.fail_on("/r/a.md", GatewayError::Io("disk full".into()));

    let err = ws.rename_to("/r/a.md", "b.md").await.unwrap_err();

    assert!(matches!(err, WorkspaceError::Gateway(_)));
    assert_eq!(ws.state(), &before);
}
