//! Throttled re-listing of the file tree.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    config::SyncConfig,
    gateway::StorageGateway,
    throttle::{Throttle, ThrottleDecision},
    tree::FileTree,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PollerCommand {
    Refresh,
    Expand(String),
    Collapse(String),
}

/// Keeps a [`FileTree`] in step with storage.
///
/// Gateway change notifications, the recurring poll timer and explicit [`FileTreePoller::refresh`]
/// calls all go through one [`Throttle`]. Expanding a directory lists it immediately. A failed
/// listing keeps the previous children.
pub struct FileTreePoller {
    tree: Rc<RefCell<FileTree>>,
    commands: mpsc::UnboundedSender<PollerCommand>,
    generation: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl FileTreePoller {
    /// Starts the poller on the current [`tokio::task::LocalSet`]. The first listing runs
    /// immediately.
    pub fn spawn(gateway: StorageGateway, config: &SyncConfig) -> Self {
        let tree = Rc::new(RefCell::new(FileTree::new()));
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (generation_tx, generation) = watch::channel(0);
        let driver = Driver {
            changes: gateway.subscribe(),
            gateway,
            tree: Rc::clone(&tree),
            throttle: Throttle::new(config.min_flush(), config.max_flush()),
            generation: generation_tx,
        };
        let task = tokio::task::spawn_local(driver.run(command_rx, config.poll_interval()));
        Self {
            tree,
            commands,
            generation,
            task,
        }
    }

    /// Snapshot of the current tree.
    pub fn tree(&self) -> FileTree {
        self.tree.borrow().clone()
    }

    /// Receiver whose value increments after every tree update.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.clone()
    }

    /// Requests a throttled re-listing.
    pub fn refresh(&self) {
        self.send(PollerCommand::Refresh);
    }

    pub fn expand(&self, path: impl Into<String>) {
        self.send(PollerCommand::Expand(path.into()));
    }

    pub fn collapse(&self, path: impl Into<String>) {
        self.send(PollerCommand::Collapse(path.into()));
    }

    fn send(&self, command: PollerCommand) {
        if self.commands.send(command).is_err() {
            debug!("file tree poller already stopped");
        }
    }
}

impl Drop for FileTreePoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    gateway: StorageGateway,
    changes: watch::Receiver<u64>,
    tree: Rc<RefCell<FileTree>>,
    throttle: Throttle,
    generation: watch::Sender<u64>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<PollerCommand>,
        poll_interval: std::time::Duration,
    ) {
        let mut ticker = time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut changes_open = true;

        loop {
            let deadline = self.throttle.deadline();
            tokio::select! {
                _ = ticker.tick() => self.trigger().await,
                changed = self.changes.changed(), if changes_open => {
                    if changed.is_ok() {
                        self.trigger().await;
                    } else {
                        changes_open = false;
                    }
                }
                command = commands.recv() => match command {
                    Some(PollerCommand::Refresh) => self.trigger().await,
                    Some(PollerCommand::Expand(path)) => self.expand(&path).await,
                    Some(PollerCommand::Collapse(path)) => {
                        if self.tree.borrow_mut().collapse(&path) {
                            self.bump();
                        }
                    }
                    None => break,
                },
                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.throttle.fire(Instant::now()) {
                        self.refresh_all().await;
                    }
                }
            }
        }
    }

    async fn trigger(&mut self) {
        match self.throttle.trigger(Instant::now()) {
            ThrottleDecision::RunNow => self.refresh_all().await,
            ThrottleDecision::RunAt(at) => debug!(?at, "file tree refresh scheduled"),
            ThrottleDecision::Coalesced => {}
        }
    }

    async fn refresh_all(&mut self) {
        let mut pending = VecDeque::from([String::new()]);
        while let Some(dir) = pending.pop_front() {
            self.list_into_tree(&dir).await;
            pending.extend(self.tree.borrow().expanded_children(&dir));
        }
        self.bump();
    }

    async fn expand(&mut self, path: &str) {
        if !self.tree.borrow_mut().expand(path) {
            debug!(path, "expand ignored; not a listed directory");
            return;
        }
        self.list_into_tree(path).await;
        self.bump();
    }

    async fn list_into_tree(&self, dir: &str) {
        match self.gateway.list_directory(dir).await {
            Ok(entries) => {
                self.tree.borrow_mut().apply_listing(dir, entries);
            }
            Err(err) => warn!(dir, error = %err, "directory listing failed; keeping previous view"),
        }
    }

    fn bump(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}
