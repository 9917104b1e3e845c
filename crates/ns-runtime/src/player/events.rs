use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ns_core::{PlaybackSpot, ScriptError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlayerEvent {
    Play { script_name: String, index: usize },
    Stop,
    CommandStarted { spot: PlaybackSpot },
    CommandFinished { spot: PlaybackSpot },
    SkipChanged { enabled: bool },
    AutoPlayChanged { enabled: bool },
    WaitingForInputChanged { enabled: bool },
    Error { code: String, message: String },
}

impl PlayerEvent {
    pub fn error(error: &ScriptError) -> Self {
        Self::Error {
            code: error.code.clone(),
            message: error.message.clone(),
        }
    }
}

pub type EventListener = Rc<dyn Fn(&PlayerEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(super) struct EventHub {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, EventListener)>>,
}

impl EventHub {
    pub(super) fn subscribe(&self, listener: EventListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    pub(super) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Listeners may subscribe or emit again while being notified.
    pub(super) fn emit(&self, event: &PlayerEvent) {
        let listeners = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(event);
        }
    }
}
