use headless_exec::script::{CorrelationId, wrap};
use headless_exec::workspace::Workspace;

fn py_files(ws: &Workspace) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(ws.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "py"))
        .collect()
}

#[test]
fn test_open_creates_private_directory() {
    let ws = Workspace::open().unwrap();

    assert!(ws.path().is_dir());
    let name = ws.path().file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("headless_exec_"), "unexpected name {name}");
    assert!(py_files(&ws).is_empty());

    ws.close();
}

#[test]
fn test_open_in_uses_given_parent() {
    let parent = tempfile::tempdir().unwrap();

    let ws = Workspace::open_in(parent.path()).unwrap();

    assert_eq!(ws.path().parent().unwrap(), parent.path());
    ws.close();
}

#[test]
fn test_script_path_is_keyed_by_correlation_id() {
    let ws = Workspace::open().unwrap();
    let id = CorrelationId::parse("call_42").unwrap();

    assert_eq!(ws.script_path(&id), ws.path().join("call_42.py"));
    ws.close();
}

#[tokio::test]
async fn test_script_file_is_removed_on_drop() {
    let ws = Workspace::open().unwrap();
    let id = CorrelationId::parse("dropped").unwrap();

    let file = ws.write_script(&wrap("print(1)", &id)).await.unwrap();
    let path = file.path().to_path_buf();
    assert!(path.is_file());
    assert!(std::fs::read_to_string(&path).unwrap().contains("START:dropped"));

    drop(file);
    assert!(!path.exists());
    ws.close();
}

#[tokio::test]
async fn test_explicit_remove_deletes_file() {
    let ws = Workspace::open().unwrap();
    let id = CorrelationId::parse("removed").unwrap();

    let file = ws.write_script(&wrap("print(1)", &id)).await.unwrap();
    let path = file.path().to_path_buf();
    file.remove();

    assert!(!path.exists());
    // Removing a missing file is not an error.
    ws.remove(&path);
    ws.close();
}

#[tokio::test]
async fn test_concurrent_ids_get_separate_files() {
    let ws = Workspace::open().unwrap();
    let a = CorrelationId::parse("a").unwrap();
    let b = CorrelationId::parse("b").unwrap();

    let fa = ws.write_script(&wrap("print('a')", &a)).await.unwrap();
    let fb = ws.write_script(&wrap("print('b')", &b)).await.unwrap();

    assert_ne!(fa.path(), fb.path());
    assert_eq!(py_files(&ws).len(), 2);
    drop(fa);
    assert_eq!(py_files(&ws), vec![fb.path().to_path_buf()]);
    drop(fb);
    ws.close();
}

#[tokio::test]
async fn test_close_removes_directory_and_is_idempotent() {
    let ws = Workspace::open().unwrap();
    let id = CorrelationId::parse("left_behind").unwrap();
    let file = ws.write_script(&wrap("print(1)", &id)).await.unwrap();
    std::mem::forget(file);
    let path = ws.path().to_path_buf();

    ws.close();
    assert!(!path.exists());

    ws.close();
    assert!(!path.exists());
}
