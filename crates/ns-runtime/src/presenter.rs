use std::cell::RefCell;

use ns_core::{AsyncToken, CharacterChange, LocalFuture, Presenter, PrintRequest, ScriptError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PresentedEvent {
    Print {
        author: Option<String>,
        text: String,
        instant: bool,
    },
    Character {
        id: String,
        appearance: Option<String>,
        visible: bool,
    },
}

/// Presenter without output that records what it was asked to show.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    events: RefCell<Vec<PresentedEvent>>,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_events(&self) -> Vec<PresentedEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn events(&self) -> Vec<PresentedEvent> {
        self.events.borrow().clone()
    }
}

impl Presenter for HeadlessPresenter {
    fn print_text(
        &self,
        request: PrintRequest,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        let result = token.ensure_not_canceled().map(|_| {
            self.events.borrow_mut().push(PresentedEvent::Print {
                author: request.author,
                text: request.text,
                instant: request.instant,
            });
        });
        Box::pin(async move { result })
    }

    fn modify_character(
        &self,
        change: CharacterChange,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        let result = token.ensure_not_canceled().map(|_| {
            self.events.borrow_mut().push(PresentedEvent::Character {
                id: change.id,
                appearance: change.appearance,
                visible: change.visible,
            });
        });
        Box::pin(async move { result })
    }
}
