//! The workspace engine against a real directory.

use std::fs;

use md_explorer::core::path;
use md_explorer::core::selection::DropPosition;
use md_explorer::gateway::local::{LocalGateway, WalkConfig};
use md_explorer::persist::{PersistedState, StateFile};
use md_explorer::workspace::{Outcome, Workspace};
use tempfile::tempdir;

fn local() -> Workspace<LocalGateway> {
    Workspace::new(LocalGateway::new(WalkConfig::default()))
}

#[tokio::test]
async fn structural_operations_reach_the_disk() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("notes")).unwrap();
    fs::write(dir.path().join("a.md"), "alpha").unwrap();
    fs::write(dir.path().join("b.md"), "beta").unwrap();
    let root = path::from_os(dir.path());
    let join = |name: &str| path::join(&root, name);

    let mut ws = local();
    ws.add_root_folder(&root).await.unwrap();
    assert!(ws.state().store.is_folder(&join("notes")));

    let renamed = ws.rename_to(&join("a.md"), "first.md").await.unwrap();
    assert_eq!(renamed, join("first.md"));
    assert_eq!(fs::read_to_string(dir.path().join("first.md")).unwrap(), "alpha");

    let report = ws
        .apply_move(&[renamed.clone()], &join("notes"), DropPosition::Middle)
        .await
        .unwrap();
    assert_eq!(report.outcome(), Outcome::Completed);
    assert!(dir.path().join("notes/first.md").is_file());
    assert!(ws.state().store.contains(&join("notes/first.md")));

    ws.delete_item(&join("b.md")).await.unwrap();
    assert!(!dir.path().join("b.md").exists());

    // Folders only leave the view.
    ws.delete_item(&join("notes")).await.unwrap();
    assert!(dir.path().join("notes/first.md").is_file());
    assert!(!ws.state().store.contains(&join("notes")));
}

#[tokio::test]
async fn edits_are_written_back() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("todo.md"), "- one\n").unwrap();
    let root = path::from_os(dir.path());
    let file = path::join(&root, "todo.md");

    let mut ws = local();
    ws.add_root_folder(&root).await.unwrap();
    ws.open_file(&file).await.unwrap();
    assert!(ws.edit_active("- one\n- two\n"));
    assert!(ws.state().tabs.get(&file).unwrap().is_dirty);

    ws.save_active().await.unwrap();

    assert!(!ws.state().tabs.get(&file).unwrap().is_dirty);
    assert_eq!(
        fs::read_to_string(dir.path().join("todo.md")).unwrap(),
        "- one\n- two\n"
    );
}

#[tokio::test]
async fn session_survives_a_restart() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("notes");
    fs::create_dir(&notes).unwrap();
    fs::write(notes.join("a.md"), "").unwrap();
    fs::write(notes.join("b.md"), "").unwrap();
    let root = path::from_os(&notes);
    let state_file = StateFile::new(dir.path().join("state/state.json"));

    let mut ws = local();
    ws.add_root_folder(&root).await.unwrap();
    ws.apply_move(
        &[path::join(&root, "b.md")],
        &path::join(&root, "a.md"),
        DropPosition::Top,
    )
    .await
    .unwrap();
    ws.open_file(&path::join(&root, "a.md")).await.unwrap();
    let mut record = PersistedState::default();
    record.record(&ws);
    state_file.save(&record).unwrap();

    let mut restarted = local();
    state_file
        .load()
        .unwrap()
        .restore_into(&mut restarted)
        .await
        .unwrap();

    assert_eq!(restarted.state().roots, [root.clone()]);
    assert_eq!(
        restarted.tree().child_paths(&root),
        [path::join(&root, "b.md"), path::join(&root, "a.md")]
    );
    assert_eq!(restarted.state().active_file(), Some(path::join(&root, "a.md").as_str()));
}
