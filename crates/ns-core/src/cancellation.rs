use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::Notify;

use crate::error::ScriptError;

/// Boxed future bound to the local (single-threaded) task set.
pub type LocalFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

#[derive(Default)]
struct TokenState {
    cancelled: Cell<bool>,
    notify: Notify,
    children: RefCell<Vec<Weak<TokenState>>>,
}

fn cancel_state(state: &TokenState) {
    if state.cancelled.replace(true) {
        return;
    }
    state.notify.notify_waiters();
    let children = std::mem::take(&mut *state.children.borrow_mut());
    for child in children {
        if let Some(child) = child.upgrade() {
            cancel_state(&child);
        }
    }
}

/// Single-threaded cancellation signal; cancelling propagates to linked tokens.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Rc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled as soon as any of `sources` is.
    pub fn linked(sources: &[&CancellationToken]) -> Self {
        let token = Self::new();
        for source in sources {
            source.attach(&token);
        }
        token
    }

    pub fn child_token(&self) -> Self {
        Self::linked(&[self])
    }

    fn attach(&self, child: &CancellationToken) {
        if self.is_cancelled() {
            cancel_state(&child.state);
            return;
        }
        let mut children = self.state.children.borrow_mut();
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Rc::downgrade(&child.state));
    }

    pub fn cancel(&self) {
        cancel_state(&self.state);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.get()
    }

    pub fn error_if_cancelled(&self) -> Result<(), ScriptError> {
        if self.is_cancelled() {
            return Err(ScriptError::canceled());
        }
        Ok(())
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Tokens handed to a running command.
///
/// `canceled` aborts the command outright (state is being discarded);
/// `completed` asks it to finish as fast as possible (synchronization).
#[derive(Debug, Clone, Default)]
pub struct AsyncToken {
    pub canceled: CancellationToken,
    pub completed: CancellationToken,
}

impl AsyncToken {
    pub fn new(canceled: CancellationToken, completed: CancellationToken) -> Self {
        Self {
            canceled,
            completed,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.is_cancelled()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_cancelled()
    }

    pub fn ensure_not_canceled(&self) -> Result<(), ScriptError> {
        self.canceled.error_if_cancelled()
    }

    /// Same hard cancellation, completion also triggered by `extra`.
    pub fn with_completion(&self, extra: &CancellationToken) -> Self {
        Self {
            canceled: self.canceled.clone(),
            completed: CancellationToken::linked(&[&self.completed, extra]),
        }
    }

    /// Sleeps for `duration`; returns early on completion, fails on cancellation.
    pub async fn delay(&self, duration: Duration) -> Result<(), ScriptError> {
        self.ensure_not_canceled()?;
        if self.is_completed() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.completed.cancelled() => Ok(()),
            _ = self.canceled.cancelled() => Err(ScriptError::canceled()),
        }
    }
}
