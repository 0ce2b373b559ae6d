//! Background worker that mirrors unsynced tab content to shadow backup files.

use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    rc::Rc,
};

use editor_session::{Subscription, TabId, TabPatch, TabSessionStore, TabsSnapshot};
use futures::{future::LocalBoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use platform_host::StorageError;
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{backup_path::backup_path, config::SyncConfig, gateway::StorageGateway};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Observable worker state.
pub struct ReconcilerStatus {
    /// A store change arrived that the worker has not scanned yet.
    pub scan_requested: bool,
    /// Tabs with a backup job waiting for a write slot.
    pub queued: BTreeSet<TabId>,
    /// Tabs with a backup write in flight.
    pub in_flight: BTreeSet<TabId>,
    /// Backup writes that failed since the worker started.
    pub failed_writes: u64,
}

impl ReconcilerStatus {
    pub fn is_idle(&self) -> bool {
        !self.scan_requested && self.queued.is_empty() && self.in_flight.is_empty()
    }

    /// No scan pending and nothing queued or in flight for `id`.
    pub fn is_tab_idle(&self, id: TabId) -> bool {
        !self.scan_requested && !self.queued.contains(&id) && !self.in_flight.contains(&id)
    }
}

struct Shared {
    wake: Notify,
    status: watch::Sender<ReconcilerStatus>,
}

impl Shared {
    fn request_scan(&self) {
        self.status.send_if_modified(|status| {
            let changed = !status.scan_requested;
            status.scan_requested = true;
            changed
        });
        self.wake.notify_one();
    }

    fn take_scan_request(&self) -> bool {
        let mut requested = false;
        self.status.send_if_modified(|status| {
            requested = std::mem::take(&mut status.scan_requested);
            requested
        });
        requested
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BackupJob {
    path: String,
    content: String,
}

type WriteOutcome = (TabId, BackupJob, Result<(), StorageError>);

/// Handle to the backup worker. Dropping it stops the worker and cancels writes in flight.
///
/// On every store change the worker scans for tabs whose content is not mirrored yet and queues
/// one job per tab (latest content wins). Jobs run as concurrent gateway writes, at most one per
/// tab and at most `max_concurrent_backup_writes` overall. A successful write marks the tab
/// synced when neither its content nor its file changed meanwhile; a failed write is logged and retried on the
/// next store change.
pub struct BackupReconciler {
    shared: Rc<Shared>,
    task: JoinHandle<()>,
    _subscription: Subscription,
}

impl BackupReconciler {
    /// Starts the worker on the current [`tokio::task::LocalSet`].
    ///
    /// Tabs that are already unsynced are picked up immediately.
    pub fn spawn(store: TabSessionStore, gateway: StorageGateway, config: &SyncConfig) -> Self {
        let (status, _) = watch::channel(ReconcilerStatus {
            scan_requested: true,
            ..ReconcilerStatus::default()
        });
        let shared = Rc::new(Shared {
            wake: Notify::new(),
            status,
        });

        let observer_shared = Rc::clone(&shared);
        let subscription = store.subscribe(move |_: &TabsSnapshot| observer_shared.request_scan());

        let worker = Worker {
            store,
            gateway,
            shared: Rc::clone(&shared),
            order: VecDeque::new(),
            jobs: HashMap::new(),
            in_flight: HashMap::new(),
            capacity: config.backup_queue_capacity.max(1),
            max_concurrent: config.max_concurrent_backup_writes.max(1),
        };
        let task = tokio::task::spawn_local(worker.run());

        Self {
            shared,
            task,
            _subscription: subscription,
        }
    }

    pub fn status(&self) -> ReconcilerStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ReconcilerStatus> {
        self.shared.status.subscribe()
    }

    /// Resolves once no scan, queued job or write in flight remains.
    pub async fn idle(&self) {
        let mut status = self.shared.status.subscribe();
        let _ = status.wait_for(ReconcilerStatus::is_idle).await;
    }

    /// Resolves once `id` has no pending or in-flight backup write.
    pub async fn wait_tab_idle(&self, id: TabId) {
        let mut status = self.shared.status.subscribe();
        let _ = status.wait_for(|status| status.is_tab_idle(id)).await;
    }
}

impl Drop for BackupReconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Worker {
    store: TabSessionStore,
    gateway: StorageGateway,
    shared: Rc<Shared>,
    order: VecDeque<TabId>,
    jobs: HashMap<TabId, BackupJob>,
    in_flight: HashMap<TabId, BackupJob>,
    capacity: usize,
    max_concurrent: usize,
}

impl Worker {
    async fn run(mut self) {
        let mut writes: FuturesUnordered<LocalBoxFuture<'static, WriteOutcome>> =
            FuturesUnordered::new();
        loop {
            if self.shared.take_scan_request() {
                self.scan();
            }
            self.dispatch(&mut writes);
            self.publish();

            let shared = Rc::clone(&self.shared);
            tokio::select! {
                _ = shared.wake.notified() => {}
                Some((id, job, result)) = writes.next(), if !writes.is_empty() => {
                    self.finish(id, job, result);
                }
            }
        }
    }

    fn scan(&mut self) {
        let tabs = self.store.tabs();
        let wanted: HashSet<TabId> = tabs
            .iter()
            .filter(|tab| tab.needs_backup())
            .map(|tab| tab.id)
            .collect();

        let jobs = &mut self.jobs;
        self.order.retain(|id| {
            let keep = wanted.contains(id);
            if !keep {
                jobs.remove(id);
            }
            keep
        });

        for tab in tabs.iter().filter(|tab| tab.needs_backup()) {
            let Some(file_name) = &tab.file_name else {
                continue;
            };
            let job = BackupJob {
                path: backup_path(file_name),
                content: tab.content.clone(),
            };
            if self.in_flight.get(&tab.id) == Some(&job) {
                self.order.retain(|id| *id != tab.id);
                self.jobs.remove(&tab.id);
                continue;
            }
            if let Some(existing) = self.jobs.get_mut(&tab.id) {
                *existing = job;
            } else if self.jobs.len() >= self.capacity {
                debug!(tab = %tab.id, "backup queue full; deferring");
            } else {
                self.jobs.insert(tab.id, job);
                self.order.push_back(tab.id);
            }
        }
    }

    fn dispatch(&mut self, writes: &mut FuturesUnordered<LocalBoxFuture<'static, WriteOutcome>>) {
        let mut index = 0;
        while writes.len() < self.max_concurrent && index < self.order.len() {
            let id = self.order[index];
            if self.in_flight.contains_key(&id) {
                index += 1;
                continue;
            }
            self.order.remove(index);
            let Some(job) = self.jobs.remove(&id) else {
                continue;
            };
            let still_needed = self
                .store
                .get(id)
                .is_some_and(|tab| tab.needs_backup());
            if !still_needed {
                continue;
            }

            self.in_flight.insert(id, job.clone());
            let gateway = self.gateway.clone();
            writes.push(
                async move {
                    let result = gateway.write_file(&job.path, &job.content).await;
                    (id, job, result)
                }
                .boxed_local(),
            );
        }
    }

    fn finish(&mut self, id: TabId, job: BackupJob, result: Result<(), StorageError>) {
        self.in_flight.remove(&id);
        match result {
            Ok(()) => {
                let unchanged = self.store.get(id).is_some_and(|tab| {
                    !tab.backup_synced
                        && tab.content == job.content
                        && tab
                            .file_name
                            .as_deref()
                            .is_some_and(|name| backup_path(name) == job.path)
                });
                if unchanged {
                    if let Err(err) = self.store.patch_by_id(id, TabPatch::backup_written()) {
                        debug!(tab = %id, error = %err, "tab closed before backup completed");
                    }
                }
                debug!(tab = %id, path = %job.path, "backup written");
            }
            Err(err) => {
                self.shared
                    .status
                    .send_modify(|status| status.failed_writes += 1);
                warn!(tab = %id, path = %job.path, error = %err, "backup write failed");
            }
        }
    }

    fn publish(&self) {
        let queued: BTreeSet<TabId> = self.order.iter().copied().collect();
        let in_flight: BTreeSet<TabId> = self.in_flight.keys().copied().collect();
        self.shared.status.send_if_modified(|status| {
            if status.queued == queued && status.in_flight == in_flight {
                return false;
            }
            status.queued = queued;
            status.in_flight = in_flight;
            true
        });
    }
}
