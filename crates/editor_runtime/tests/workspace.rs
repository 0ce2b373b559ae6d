mod support;

use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use editor_runtime::{EditorError, EditorWorkspace, StoredRoot, ROOT_KEY};
use editor_session::SessionError;
use platform_host::{
    DirectoryHandle, HostServices, MemoryDirectory, MemoryNotificationService, StorageError,
};
use pretty_assertions::assert_eq;
use support::HeldBackups;
use tokio::sync::Semaphore;
use tokio::task::LocalSet;

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{prefix}_{}_{}", process::id(), nanos));
    fs::create_dir_all(&path).expect("create temp dir");
    path
}

async fn until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

async fn release_after_yields(gate: &Semaphore) {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    gate.add_permits(10);
}

/// Workspace whose root holds backup writes; returns once a backup write for `a.txt` is held.
async fn workspace_with_held_backup() -> (EditorWorkspace, Rc<Semaphore>, editor_session::TabId)
{
    let (services, _, _) = HostServices::memory();
    let workspace = EditorWorkspace::new(services, "0.1.0");
    let root = HeldBackups::new(MemoryDirectory::new_root());
    let gate = Rc::clone(&root.gate);
    let held = Rc::clone(&root.held);
    workspace.attach_root(Rc::new(root));
    workspace
        .gateway()
        .expect("root")
        .write_file("a.txt", "saved")
        .await
        .expect("seed");
    let id = workspace.open_file("a.txt").await.expect("open");
    workspace.edit(id, "draft").expect("edit");
    until(|| held.get() == 1).await;
    (workspace, gate, id)
}

struct Fixture {
    workspace: EditorWorkspace,
    root: MemoryDirectory,
    notices: MemoryNotificationService,
}

fn fixture() -> Fixture {
    let (services, _, notices) = HostServices::memory();
    let workspace = EditorWorkspace::new(services, "0.1.0");
    let root = MemoryDirectory::new_root();
    workspace.attach_root(root.shared());
    Fixture {
        workspace,
        root,
        notices,
    }
}

async fn seed(fixture: &Fixture, path: &str, text: &str) {
    fixture
        .workspace
        .gateway()
        .expect("root attached")
        .write_file(path, text)
        .await
        .expect("seed file");
}

async fn read(fixture: &Fixture, path: &str) -> Result<String, StorageError> {
    fixture
        .workspace
        .gateway()
        .expect("root attached")
        .read_file(path)
        .await
}

async fn names(fixture: &Fixture, dir: &str) -> Vec<String> {
    fixture
        .workspace
        .gateway()
        .expect("root attached")
        .list_directory(dir)
        .await
        .expect("list")
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[tokio::test]
async fn opening_a_file_with_a_backup_recovers_it_as_dirty() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "notes/todo.txt", "milk").await;
            seed(&fx, "notes/.tmp-sew-todo.txt", "milk, eggs").await;

            let id = fx.workspace.open_file("notes/todo.txt").await.expect("open");
            let tab = fx.workspace.store().get(id).expect("tab");

            assert_eq!(tab.content, "milk, eggs");
            assert_eq!(tab.title, "notes/todo.txt");
            assert!(tab.dirty);
            assert!(tab.backup_synced);
            assert!(tab.active);
        })
        .await;
}

#[tokio::test]
async fn empty_backup_falls_back_to_the_file() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "real").await;
            seed(&fx, ".tmp-sew-a.txt", "").await;

            let id = fx.workspace.open_file("a.txt").await.expect("open");
            let tab = fx.workspace.store().get(id).expect("tab");
            assert_eq!(tab.content, "real");
            assert!(!tab.dirty);
        })
        .await;
}

#[tokio::test]
async fn rename_during_backup_write_moves_the_landed_backup() {
    LocalSet::new()
        .run_until(async {
            let (workspace, gate, id) = workspace_with_held_backup().await;
            let gateway = workspace.gateway().expect("root");

            let (renamed, ()) = tokio::join!(
                workspace.rename_file("a.txt", "b.txt"),
                release_after_yields(&gate)
            );
            assert_eq!(renamed, Ok("b.txt".to_string()));
            workspace.backups_idle().await;

            assert_eq!(
                gateway.read_file(".tmp-sew-b.txt").await,
                Ok("draft".to_string())
            );
            assert!(gateway
                .read_file(".tmp-sew-a.txt")
                .await
                .expect_err("old backup moved")
                .is_not_found());
            let tab = workspace.store().get(id).expect("tab");
            assert_eq!(tab.file_name.as_deref(), Some("b.txt"));
            assert!(tab.dirty);
            assert!(tab.backup_synced);
        })
        .await;
}

#[tokio::test]
async fn delete_during_backup_write_leaves_no_backup() {
    LocalSet::new()
        .run_until(async {
            let (workspace, gate, _) = workspace_with_held_backup().await;
            let gateway = workspace.gateway().expect("root");

            let (deleted, ()) = tokio::join!(
                workspace.delete_file("a.txt", |_| true),
                release_after_yields(&gate)
            );
            assert_eq!(deleted, Ok(()));
            workspace.backups_idle().await;

            assert!(gateway.list_directory("").await.expect("list").is_empty());
        })
        .await;
}

#[tokio::test]
async fn opening_without_backup_reads_the_file_clean() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "plain").await;

            let id = fx.workspace.open_file("/a.txt").await.expect("open");
            let tab = fx.workspace.store().get(id).expect("tab");
            assert_eq!(tab.content, "plain");
            assert_eq!(tab.file_name.as_deref(), Some("a.txt"));
            assert!(!tab.dirty);
        })
        .await;
}

#[tokio::test]
async fn opening_an_open_file_activates_its_tab() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "a").await;
            seed(&fx, "b.txt", "b").await;

            let a = fx.workspace.open_file("a.txt").await.expect("open a");
            fx.workspace.open_file("b.txt").await.expect("open b");
            let again = fx.workspace.open_file("a.txt").await.expect("reopen a");

            assert_eq!(again, a);
            assert_eq!(fx.workspace.store().len(), 3);
            assert_eq!(fx.workspace.active_tab().map(|tab| tab.id), Some(a));
        })
        .await;
}

#[tokio::test]
async fn save_writes_file_and_leaves_no_backup() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "notes/todo.txt", "milk").await;
            let id = fx.workspace.open_file("notes/todo.txt").await.expect("open");

            fx.workspace.edit(id, "milk, eggs").expect("edit");
            fx.workspace.backups_idle().await;
            assert_eq!(
                read(&fx, "notes/.tmp-sew-todo.txt").await.expect("backup"),
                "milk, eggs"
            );

            fx.workspace.save(id).await.expect("save");

            assert_eq!(read(&fx, "notes/todo.txt").await.expect("file"), "milk, eggs");
            assert_eq!(names(&fx, "notes").await, vec!["todo.txt".to_string()]);
            let tab = fx.workspace.store().get(id).expect("tab");
            assert!(!tab.dirty);
            assert!(tab.backup_synced);
        })
        .await;
}

#[tokio::test]
async fn saving_read_only_tab_is_rejected_before_any_io() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            let welcome = fx.workspace.active_tab().expect("welcome tab");
            let gateway = fx.workspace.gateway().expect("root");

            let err = fx.workspace.save(welcome.id).await.expect_err("read-only");

            assert_eq!(err, EditorError::ReadOnly(welcome.title.clone()));
            assert_eq!(gateway.change_count(), 0);
            assert_eq!(fx.notices.notices().len(), 1);
            assert_eq!(fx.notices.notices()[0].title, "Could not save");
            assert!(matches!(
                fx.workspace.edit(welcome.id, "nope"),
                Err(EditorError::ReadOnly(_))
            ));
        })
        .await;
}

#[tokio::test]
async fn scratch_tab_needs_save_as() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            let id = fx.workspace.new_tab().expect("new tab");
            fx.workspace.edit(id, "draft").expect("edit");

            assert_eq!(
                fx.workspace.save(id).await,
                Err(EditorError::Untitled("Untitled".to_string()))
            );

            fx.workspace
                .save_as(id, "drafts/first.txt")
                .await
                .expect("save as");
            assert_eq!(read(&fx, "drafts/first.txt").await.expect("file"), "draft");
            let tab = fx.workspace.store().get(id).expect("tab");
            assert_eq!(tab.file_name.as_deref(), Some("drafts/first.txt"));
            assert!(!tab.dirty);

            fx.workspace.backups_idle().await;
            assert_eq!(names(&fx, "drafts").await, vec!["first.txt".to_string()]);
        })
        .await;
}

#[tokio::test]
async fn rename_moves_file_backup_and_open_tab() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "notes/a.txt", "a").await;
            let id = fx.workspace.open_file("notes/a.txt").await.expect("open");
            fx.workspace.edit(id, "unsaved").expect("edit");
            fx.workspace.backups_idle().await;

            let renamed = fx
                .workspace
                .rename_file("notes/a.txt", "b.txt")
                .await
                .expect("rename");

            assert_eq!(renamed, "notes/b.txt");
            assert_eq!(
                names(&fx, "notes").await,
                vec!["b.txt".to_string(), ".tmp-sew-b.txt".to_string()]
            );
            let tab = fx.workspace.store().get(id).expect("tab");
            assert_eq!(tab.file_name.as_deref(), Some("notes/b.txt"));
            assert_eq!(tab.title, "notes/b.txt");
        })
        .await;
}

#[tokio::test]
async fn duplicate_appends_copy_suffix() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "same").await;

            let copy = fx.workspace.duplicate_file("a.txt").await.expect("duplicate");

            assert_eq!(copy, "a.txt_copy");
            assert_eq!(read(&fx, "a.txt_copy").await.expect("copy"), "same");
            assert_eq!(read(&fx, "a.txt").await.expect("source"), "same");
        })
        .await;
}

#[tokio::test]
async fn delete_requires_confirmation() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "a").await;
            seed(&fx, ".tmp-sew-a.txt", "draft").await;

            let declined = fx.workspace.delete_file("a.txt", |_| false).await;
            assert_eq!(declined, Err(EditorError::Cancelled));
            assert!(read(&fx, "a.txt").await.is_ok());
            assert!(fx.notices.notices().is_empty());

            let mut asked = None;
            fx.workspace
                .delete_file("a.txt", |path| {
                    asked = Some(path.to_string());
                    true
                })
                .await
                .expect("delete");
            assert_eq!(asked.as_deref(), Some("a.txt"));
            assert!(names(&fx, "").await.is_empty());
        })
        .await;
}

#[tokio::test]
async fn create_file_validates_name_and_refuses_to_clobber() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();

            let path = fx.workspace.create_file("notes", " new.txt ").await.expect("create");
            assert_eq!(path, "notes/new.txt");
            assert_eq!(read(&fx, "notes/new.txt").await.expect("file"), "");

            assert_eq!(
                fx.workspace.create_file("notes", "new.txt").await,
                Err(EditorError::AlreadyExists("notes/new.txt".to_string()))
            );
            for bad in ["", "  ", "a/b", ".."] {
                assert_eq!(
                    fx.workspace.create_file("", bad).await,
                    Err(EditorError::InvalidName(bad.to_string()))
                );
            }
        })
        .await;
}

#[tokio::test]
async fn file_actions_without_a_root_report_no_folder() {
    let (services, _, notices) = HostServices::memory();
    let workspace = EditorWorkspace::new(services, "0.1.0");

    assert_eq!(
        workspace.open_file("a.txt").await,
        Err(EditorError::NoFolderOpen)
    );
    assert_eq!(notices.notices()[0].body, "no folder is open");
    assert!(workspace.file_tree().is_none());
}

#[tokio::test]
async fn storage_failures_are_notified_and_returned() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            seed(&fx, "a.txt", "a").await;
            let id = fx.workspace.open_file("a.txt").await.expect("open");
            fx.root.revoke();

            let err = fx.workspace.save(id).await.expect_err("revoked");
            assert!(matches!(
                err,
                EditorError::Storage(StorageError::PermissionDenied { .. })
            ));
            assert_eq!(fx.notices.notices().len(), 1);
            assert!(fx.workspace.store().get(id).is_some());
        })
        .await;
}

#[tokio::test]
async fn tab_actions_keep_one_active_tab() {
    let (services, _, _) = HostServices::memory();
    let workspace = EditorWorkspace::new(services, "0.1.0");
    let first = workspace.new_tab().expect("tab");
    let second = workspace.new_tab().expect("tab");

    workspace.reorder_tabs(2, 0).expect("reorder");
    assert_eq!(workspace.store().tabs()[0].id, second);

    workspace.activate(first).expect("activate");
    workspace.close_tab(first).expect("close");
    assert_eq!(
        workspace.store().tabs().iter().filter(|tab| tab.active).count(),
        1
    );
    let missing = editor_session::TabId::new();
    assert_eq!(
        workspace.activate(missing),
        Err(EditorError::Session(SessionError::TabNotFound(missing)))
    );
}

#[tokio::test]
async fn active_stats_follow_the_active_tab() {
    let (services, _, _) = HostServices::memory();
    let workspace = EditorWorkspace::new(services, "0.1.0");
    let id = workspace.new_tab().expect("tab");
    workspace.edit(id, "One two. Three!").expect("edit");

    let stats = workspace.active_stats();
    assert_eq!(stats.word_count, 3);
    assert_eq!(stats.sentence_count, 2);
    assert_eq!(stats.paragraph_count, 1);
}

#[tokio::test]
async fn native_root_is_remembered_and_restored() {
    let dir = temp_dir("sew_workspace_root");
    fs::write(dir.join("hello.txt"), "hi").expect("seed");

    LocalSet::new()
        .run_until(async {
            let (services, prefs, _) = HostServices::memory();
            let workspace = EditorWorkspace::new(services.clone(), "0.1.0");
            workspace
                .open_native_root(&dir.to_string_lossy())
                .await
                .expect("open root");
            assert!(prefs.raw(ROOT_KEY).is_some());

            let next_session = EditorWorkspace::new(services, "0.1.0");
            assert!(next_session.restore_root().await.expect("restore"));
            let id = next_session.open_file("hello.txt").await.expect("open");
            assert_eq!(next_session.store().get(id).expect("tab").content, "hi");
        })
        .await;

    let _ = fs::remove_dir_all(dir);
}

#[tokio::test]
async fn unreachable_stored_root_is_forgotten() {
    let (services, prefs, notices) = HostServices::memory();
    StoredRoot {
        location: "/definitely/not/a/real/sew/root".to_string(),
        label: "root".to_string(),
    }
    .save(&prefs)
    .await
    .expect("store root");

    let workspace = EditorWorkspace::new(services, "0.1.0");
    assert!(workspace.restore_root().await.is_err());
    assert_eq!(prefs.raw(ROOT_KEY), None);
    assert_eq!(notices.notices().len(), 1);

    let empty = EditorWorkspace::new(HostServices::memory().0, "0.1.0");
    assert_eq!(empty.restore_root().await, Ok(false));
}

#[tokio::test(start_paused = true)]
async fn external_file_appears_after_refresh() {
    LocalSet::new()
        .run_until(async {
            let fx = fixture();
            let mut updates = fx.workspace.subscribe_tree().expect("tree");
            updates.changed().await.expect("first listing");

            fx.root
                .write_file("late.txt", b"late")
                .await
                .expect("external write");
            fx.workspace.refresh_tree();
            updates.changed().await.expect("refresh");

            let tree = fx.workspace.file_tree().expect("tree");
            assert!(tree.node("late.txt").is_some());
        })
        .await;
}
