//! User-level editor actions over the session, the storage root and the sync workers.

use std::{cell::RefCell, rc::Rc};

use editor_session::{
    ContentStats, NewTab, SessionError, Tab, TabId, TabPatch, TabSessionStore,
};
use editor_sync::{
    backup_path, BackupReconciler, FileTree, FileTreePoller, StorageGateway, SyncConfig,
};
use futures::future::AbortRegistration;
use platform_host::{
    join_path, normalize_storage_path, parent_path, validate_entry_name, HostServices,
    NativeDirectory, SharedDirectory, StorageError,
};
use tracing::{debug, info, warn};

use crate::{
    assist::{run_assist, AssistConfig, AssistError, ChatTransport, Selection},
    error::EditorError,
    root::StoredRoot,
};

/// Suffix appended by [`EditorWorkspace::duplicate_file`].
pub const DUPLICATE_SUFFIX: &str = "_copy";

const UNTITLED_TITLE: &str = "Untitled";

struct Attached {
    gateway: StorageGateway,
    reconciler: BackupReconciler,
    poller: FileTreePoller,
}

/// One editing session bound to at most one storage root.
///
/// Workers run as local tasks, so attaching a root must happen inside a
/// [`tokio::task::LocalSet`]. Failures of user actions are returned and also surfaced through
/// the host [`platform_host::NotificationService`].
pub struct EditorWorkspace {
    services: HostServices,
    store: TabSessionStore,
    sync_config: SyncConfig,
    assist_config: AssistConfig,
    attached: RefCell<Option<Rc<Attached>>>,
}

impl EditorWorkspace {
    /// A session with the welcome tab and default configuration.
    pub fn new(services: HostServices, app_version: &str) -> Self {
        Self {
            services,
            store: TabSessionStore::with_welcome(app_version),
            sync_config: SyncConfig::default(),
            assist_config: AssistConfig::default(),
            attached: RefCell::new(None),
        }
    }

    /// Like [`EditorWorkspace::new`], with configuration read from the preference store.
    pub async fn load(services: HostServices, app_version: &str) -> Self {
        let sync_config = SyncConfig::load(services.prefs.as_ref()).await;
        let assist_config = AssistConfig::load(services.prefs.as_ref()).await;
        Self {
            sync_config,
            assist_config,
            ..Self::new(services, app_version)
        }
    }

    pub fn store(&self) -> &TabSessionStore {
        &self.store
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync_config
    }

    pub fn assist_config(&self) -> &AssistConfig {
        &self.assist_config
    }

    pub fn has_root(&self) -> bool {
        self.attached.borrow().is_some()
    }

    /// Binds the session to `root` and starts the backup and file tree workers, replacing any
    /// previous root.
    pub fn attach_root(&self, root: SharedDirectory) {
        let gateway = StorageGateway::new(root);
        let reconciler =
            BackupReconciler::spawn(self.store.clone(), gateway.clone(), &self.sync_config);
        let poller = FileTreePoller::spawn(gateway.clone(), &self.sync_config);
        *self.attached.borrow_mut() = Some(Rc::new(Attached {
            gateway,
            reconciler,
            poller,
        }));
    }

    /// Opens a native directory as the root and remembers it for the next session.
    pub async fn open_native_root(&self, path: &str) -> Result<(), EditorError> {
        let result = self.try_open_native_root(path).await;
        self.report("Could not open folder", result).await
    }

    async fn try_open_native_root(&self, path: &str) -> Result<(), EditorError> {
        let dir = NativeDirectory::open(path)?;
        let stored = StoredRoot::for_native(&dir);
        self.attach_root(Rc::new(dir));
        stored.save(self.services.prefs.as_ref()).await?;
        info!(root = %stored.location, "folder opened");
        Ok(())
    }

    /// Re-attaches the root remembered by a previous session. Returns `false` when none is
    /// stored. A stored root that can no longer be opened is forgotten.
    pub async fn restore_root(&self) -> Result<bool, EditorError> {
        let result = self.try_restore_root().await;
        self.report("Could not reopen folder", result).await
    }

    async fn try_restore_root(&self) -> Result<bool, EditorError> {
        let Some(stored) = StoredRoot::load(self.services.prefs.as_ref()).await? else {
            return Ok(false);
        };
        match stored.open() {
            Ok(root) => {
                self.attach_root(root);
                info!(root = %stored.location, "folder restored");
                Ok(true)
            }
            Err(err) => {
                StoredRoot::clear(self.services.prefs.as_ref()).await?;
                Err(err)
            }
        }
    }

    fn attached(&self) -> Result<Rc<Attached>, EditorError> {
        self.attached
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(EditorError::NoFolderOpen)
    }

    pub fn gateway(&self) -> Result<StorageGateway, EditorError> {
        Ok(self.attached()?.gateway.clone())
    }

    /// Snapshot of the file tree; `None` before a root is attached.
    pub fn file_tree(&self) -> Option<FileTree> {
        self.attached
            .borrow()
            .as_ref()
            .map(|attached| attached.poller.tree())
    }

    /// Receiver that ticks after every file tree update.
    pub fn subscribe_tree(&self) -> Result<tokio::sync::watch::Receiver<u64>, EditorError> {
        Ok(self.attached()?.poller.subscribe())
    }

    pub fn refresh_tree(&self) {
        if let Ok(attached) = self.attached() {
            attached.poller.refresh();
        }
    }

    pub fn expand_dir(&self, path: &str) {
        if let Ok(attached) = self.attached() {
            attached.poller.expand(path);
        }
    }

    pub fn collapse_dir(&self, path: &str) {
        if let Ok(attached) = self.attached() {
            attached.poller.collapse(path);
        }
    }

    /// Resolves once no backup work is pending.
    pub async fn backups_idle(&self) {
        if let Ok(attached) = self.attached() {
            attached.reconciler.idle().await;
        }
    }

    /// Opens `path` in a tab, or activates the tab already showing it.
    ///
    /// A non-empty shadow backup next to the file wins over the file itself; the tab then starts
    /// dirty. An empty backup counts as no backup.
    pub async fn open_file(&self, path: &str) -> Result<TabId, EditorError> {
        let result = self.try_open_file(path).await;
        self.report("Could not open file", result).await
    }

    async fn try_open_file(&self, path: &str) -> Result<TabId, EditorError> {
        let path = normalize_storage_path(path)?;
        if let Some(open) = self.store.find_by_file_name(&path) {
            self.store.set_active_by_id(open.id)?;
            return Ok(open.id);
        }

        let gateway = self.gateway()?;
        let backup = match gateway.read_file(&backup_path(&path)).await {
            Ok(text) => Some(text),
            Err(err) => {
                if !err.is_not_found() {
                    debug!(path = %path, error = %err, "backup unreadable; opening original");
                }
                None
            }
        };
        let tab = match backup.filter(|text| !text.is_empty()) {
            Some(text) => {
                info!(path = %path, "recovered unsaved changes from backup");
                NewTab::file(&path, text).recovered()
            }
            None => NewTab::file(&path, gateway.read_file(&path).await?),
        };
        Ok(self.store.add(tab)?)
    }

    /// Opens an empty scratch tab with no file.
    pub fn new_tab(&self) -> Result<TabId, EditorError> {
        Ok(self.store.add(NewTab::scratch(UNTITLED_TITLE))?)
    }

    /// Applies a user edit to a tab.
    pub fn edit(&self, id: TabId, content: impl Into<String>) -> Result<(), EditorError> {
        let tab = self.tab(id)?;
        if tab.read_only {
            return Err(EditorError::ReadOnly(tab.title));
        }
        self.store.patch_by_id(id, TabPatch::edit(content))?;
        Ok(())
    }

    /// Writes a tab to its file and removes its backup.
    pub async fn save(&self, id: TabId) -> Result<(), EditorError> {
        let result = self.try_save(id).await;
        self.report("Could not save", result).await
    }

    async fn try_save(&self, id: TabId) -> Result<(), EditorError> {
        let tab = self.tab(id)?;
        if tab.read_only {
            return Err(EditorError::ReadOnly(tab.title));
        }
        let Some(path) = tab.file_name.clone() else {
            return Err(EditorError::Untitled(tab.title));
        };
        let attached = self.attached()?;
        attached.gateway.write_file(&path, &tab.content).await?;
        self.finish_save(&attached, id, &tab.content, &[path]).await
    }

    /// Writes a tab to `path` and makes that its file.
    pub async fn save_as(&self, id: TabId, path: &str) -> Result<(), EditorError> {
        let result = self.try_save_as(id, path).await;
        self.report("Could not save", result).await
    }

    async fn try_save_as(&self, id: TabId, path: &str) -> Result<(), EditorError> {
        let tab = self.tab(id)?;
        if tab.read_only {
            return Err(EditorError::ReadOnly(tab.title));
        }
        let path = normalize_storage_path(path)?;
        if path.is_empty() {
            return Err(EditorError::InvalidName(path));
        }
        let attached = self.attached()?;
        attached.gateway.write_file(&path, &tab.content).await?;
        self.store.patch_by_id(
            id,
            TabPatch {
                file_name: Some(Some(path.clone())),
                title: Some(path.clone()),
                ..TabPatch::default()
            },
        )?;

        let mut stale = vec![path];
        stale.extend(tab.file_name.clone());
        self.finish_save(&attached, id, &tab.content, &stale).await
    }

    async fn finish_save(
        &self,
        attached: &Attached,
        id: TabId,
        written: &str,
        files: &[String],
    ) -> Result<(), EditorError> {
        let unchanged = self.store.get(id).is_some_and(|tab| tab.content == written);
        if !unchanged {
            debug!(tab = %id, "tab edited during save; keeping it dirty");
            return Ok(());
        }
        self.store.patch_by_id(id, TabPatch::saved())?;

        attached.reconciler.wait_tab_idle(id).await;
        if self.store.get(id).is_some_and(|tab| tab.needs_backup()) {
            debug!(tab = %id, "tab edited after save; keeping backup");
            return Ok(());
        }
        for file in files {
            remove_if_present(&attached.gateway, &backup_path(file)).await?;
        }
        Ok(())
    }

    /// Closes a tab. Unsaved content stays recoverable through its backup file.
    pub fn close_tab(&self, id: TabId) -> Option<Tab> {
        self.store.remove_by_id(id)
    }

    pub fn activate(&self, id: TabId) -> Result<(), EditorError> {
        Ok(self.store.set_active_by_id(id)?)
    }

    pub fn reorder_tabs(&self, from: usize, to: usize) -> Result<(), EditorError> {
        Ok(self.store.reorder(from, to)?)
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.store.get_active()
    }

    /// Counts for the active tab; zeros when no tab is open.
    pub fn active_stats(&self) -> ContentStats {
        self.store
            .get_active()
            .map(|tab| ContentStats::of(&tab.content))
            .unwrap_or_default()
    }

    /// Creates an empty file named `name` inside `dir`.
    pub async fn create_file(&self, dir: &str, name: &str) -> Result<String, EditorError> {
        let result = self.try_create_file(dir, name).await;
        self.report("Could not create file", result).await
    }

    async fn try_create_file(&self, dir: &str, name: &str) -> Result<String, EditorError> {
        let name = valid_name(name)?;
        let attached = self.attached()?;
        let dir = normalize_storage_path(dir)?;
        let path = join_path(&dir, name);
        match attached.gateway.read_file(&path).await {
            Ok(_) => return Err(EditorError::AlreadyExists(path)),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
        attached.gateway.write_file(&path, "").await?;
        attached.poller.refresh();
        Ok(path)
    }

    /// Renames a file within its directory. An open tab and a pending backup follow the file; a
    /// backup write in flight for that tab lands before anything moves.
    pub async fn rename_file(&self, path: &str, new_name: &str) -> Result<String, EditorError> {
        let result = self.try_rename_file(path, new_name).await;
        self.report("Could not rename file", result).await
    }

    async fn try_rename_file(&self, path: &str, new_name: &str) -> Result<String, EditorError> {
        let name = valid_name(new_name)?;
        let attached = self.attached()?;
        let from = normalize_storage_path(path)?;
        let to = join_path(parent_path(&from), name);
        if to == from {
            return Ok(to);
        }

        let open = self.store.find_by_file_name(&from);
        if let Some(tab) = &open {
            attached.reconciler.wait_tab_idle(tab.id).await;
        }
        attached.gateway.rename_file(&from, &to).await?;
        match attached
            .gateway
            .rename_file(&backup_path(&from), &backup_path(&to))
            .await
        {
            Ok(()) => debug!(from = %from, to = %to, "backup moved with file"),
            Err(err) if err.is_not_found() => {}
            Err(err) => warn!(from = %from, error = %err, "backup left behind on rename"),
        }
        if let Some(tab) = open {
            self.store.patch_by_id(
                tab.id,
                TabPatch {
                    file_name: Some(Some(to.clone())),
                    title: Some(to.clone()),
                    ..TabPatch::default()
                },
            )?;
        }
        attached.poller.refresh();
        Ok(to)
    }

    /// Copies a file next to itself with [`DUPLICATE_SUFFIX`] appended.
    pub async fn duplicate_file(&self, path: &str) -> Result<String, EditorError> {
        let result = self.try_duplicate_file(path).await;
        self.report("Could not duplicate file", result).await
    }

    async fn try_duplicate_file(&self, path: &str) -> Result<String, EditorError> {
        let attached = self.attached()?;
        let from = normalize_storage_path(path)?;
        let to = format!("{from}{DUPLICATE_SUFFIX}");
        attached.gateway.copy_file(&from, &to).await?;
        attached.poller.refresh();
        Ok(to)
    }

    /// Deletes a file after `confirm` approves it. Its backup goes with it, after any backup write
    /// in flight for an open tab on it has landed; open tabs stay.
    pub async fn delete_file(
        &self,
        path: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<(), EditorError> {
        let result = self.try_delete_file(path, confirm).await;
        self.report("Could not delete file", result).await
    }

    async fn try_delete_file(
        &self,
        path: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<(), EditorError> {
        let attached = self.attached()?;
        let path = normalize_storage_path(path)?;
        if !confirm(&path) {
            return Err(EditorError::Cancelled);
        }
        if let Some(tab) = self.store.find_by_file_name(&path) {
            attached.reconciler.wait_tab_idle(tab.id).await;
        }
        attached.gateway.delete_file(&path).await?;
        remove_if_present(&attached.gateway, &backup_path(&path)).await?;
        attached.poller.refresh();
        Ok(())
    }

    /// Streams an assistant reply into tab `id` at `selection`.
    pub async fn assist(
        &self,
        id: TabId,
        selection: Selection,
        instruction: &str,
        transport: &dyn ChatTransport,
        abort: AbortRegistration,
    ) -> Result<String, EditorError> {
        let result = run_assist(
            &self.store,
            id,
            selection,
            instruction,
            &self.assist_config.model,
            transport,
            abort,
        )
        .await
        .map_err(EditorError::from);
        self.report("Assistant failed", result).await
    }

    fn tab(&self, id: TabId) -> Result<Tab, EditorError> {
        self.store
            .get(id)
            .ok_or(EditorError::Session(SessionError::TabNotFound(id)))
    }

    async fn report<T>(
        &self,
        title: &str,
        result: Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        if let Err(err) = &result {
            if matches!(
                err,
                EditorError::Cancelled | EditorError::Assist(AssistError::Aborted)
            ) {
                return result;
            }
            warn!(action = title, error = %err, "editor action failed");
            let body = err.to_string();
            if let Err(notify_err) = self.services.notifications.notify(title, &body).await {
                debug!(error = %notify_err, "notification not delivered");
            }
        }
        result
    }
}

fn valid_name(name: &str) -> Result<&str, EditorError> {
    validate_entry_name(name).map_err(|_| EditorError::InvalidName(name.to_string()))
}

async fn remove_if_present(gateway: &StorageGateway, path: &str) -> Result<(), StorageError> {
    match gateway.delete_file(path).await {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}
