use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use ns_core::{CancellationToken, LocalFuture, ScriptError};
use tokio::sync::{oneshot, Notify};
use tracing::debug;

use super::ScriptPlayer;

/// Work run once every in-flight command has finished.
pub type SyncTask = Box<dyn FnOnce() -> LocalFuture<'static, Result<(), ScriptError>>>;

type PendingTask = (SyncTask, oneshot::Sender<Result<(), ScriptError>>);

#[derive(Default)]
pub(super) struct SyncQueue {
    running: Cell<bool>,
    pending: RefCell<VecDeque<PendingTask>>,
    done: Notify,
}

/// Ends a synchronization pass however it exits.
struct SyncPass<'a>(&'a ScriptPlayer);

impl Drop for SyncPass<'_> {
    fn drop(&mut self) {
        let inner = &self.0.inner;
        // Requests left behind by an aborted pass resolve as canceled.
        inner.sync.pending.borrow_mut().clear();
        inner.tokens.borrow_mut().completed = CancellationToken::new();
        inner.sync.running.set(false);
        inner.sync.done.notify_waiters();
    }
}

impl ScriptPlayer {
    pub fn is_synchronizing(&self) -> bool {
        self.inner.sync.running.get()
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.get()
    }

    /// Asks running commands to complete, waits until none is in flight and then runs
    /// `task`. Requests made while a synchronization is underway join its queue and
    /// run in order. The pass runs on its own local task, so dropping a caller does not
    /// stall the queue.
    pub async fn synchronize_and_do(&self, task: SyncTask) -> Result<(), ScriptError> {
        let (sender, receiver) = oneshot::channel();
        self.inner.sync.pending.borrow_mut().push_back((task, sender));
        if !self.inner.sync.running.replace(true) {
            let player = self.clone();
            tokio::task::spawn_local(async move { player.run_synchronization().await });
        }
        receiver.await.map_err(|_| ScriptError::canceled())?
    }

    async fn run_synchronization(&self) {
        let _pass = SyncPass(self);
        debug!(in_flight = self.in_flight_count(), "synchronizing commands");
        let completed = self.inner.tokens.borrow().completed.clone();
        completed.cancel();
        loop {
            self.wait_for_in_flight().await;
            let next = self.inner.sync.pending.borrow_mut().pop_front();
            let Some((task, sender)) = next else {
                break;
            };
            let result = task().await;
            let _ = sender.send(result);
        }
    }

    /// Barrier the loop passes before and after each command.
    pub(super) async fn wait_for_synchronization(&self) {
        loop {
            let done = self.inner.sync.done.notified();
            if !self.is_synchronizing() {
                return;
            }
            done.await;
        }
    }

    async fn wait_for_in_flight(&self) {
        loop {
            let done = self.inner.in_flight_done.notified();
            if self.inner.in_flight.get() == 0 {
                return;
            }
            done.await;
        }
    }

    pub(super) fn begin_in_flight(&self) {
        self.inner.in_flight.set(self.inner.in_flight.get() + 1);
    }

    pub(super) fn end_in_flight(&self) {
        let remaining = self.inner.in_flight.get().saturating_sub(1);
        self.inner.in_flight.set(remaining);
        if remaining == 0 {
            self.inner.in_flight_done.notify_waiters();
        }
    }
}
