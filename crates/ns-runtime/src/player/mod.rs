//! Playback state machine.
//!
//! The player runs its loop and non-blocking commands with `tokio::task::spawn_local`,
//! so starting playback must happen inside a `tokio::task::LocalSet`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ns_core::{AsyncToken, CancellationToken, Command, LocalFuture, PlaybackSpot, ScriptError};
use tokio::sync::Notify;

use crate::playlist::ScriptPlaylist;
use crate::register::PlayedScriptRegister;
use crate::services::PlaybackServices;
use crate::state::{PlayerSkipMode, ScriptPlayerConfig};

mod context;
mod events;
mod execution;
mod modes;
mod rewind;
mod serialization;
mod sync;

pub use events::{EventListener, PlayerEvent, SubscriptionId};
pub use sync::SyncTask;

use events::EventHub;
use sync::SyncQueue;

/// Resource holder name used for the played script's preloaded range.
pub const PLAYER_RESOURCE_HOLDER: &str = "script-player";
pub const PLAYER_STATE_KEY: &str = "scriptPlayer";
pub const PLAYED_REGISTER_STATE_KEY: &str = "playedScriptRegister";
pub const PLAYER_SETTINGS_KEY: &str = "scriptPlayerSettings";

/// Runs around every executed command; an error stops playback.
pub type ExecutionHook =
    Rc<dyn Fn(Rc<dyn Command>) -> LocalFuture<'static, Result<(), ScriptError>>>;

#[derive(Default)]
struct PlaybackState {
    playlist: Option<Rc<ScriptPlaylist>>,
    played_index: usize,
    playing: bool,
    executed_played_command: bool,
    waiting_for_input: bool,
    skip_active: bool,
    auto_play_active: bool,
    gosub_return_spots: Vec<PlaybackSpot>,
    last_printed_chars: usize,
    loop_token: Option<CancellationToken>,
    preloaded: Option<Rc<ScriptPlaylist>>,
    resume_after_load: bool,
}

#[derive(Default)]
struct CommandTokens {
    canceled: CancellationToken,
    completed: CancellationToken,
}

struct PlayerInner {
    config: RefCell<ScriptPlayerConfig>,
    services: PlaybackServices,
    state: RefCell<PlaybackState>,
    register: RefCell<PlayedScriptRegister>,
    events: EventHub,
    pre_hooks: RefCell<Vec<ExecutionHook>>,
    post_hooks: RefCell<Vec<ExecutionHook>>,
    tokens: RefCell<CommandTokens>,
    sync: SyncQueue,
    in_flight: Cell<usize>,
    in_flight_done: Notify,
    changed: Notify,
}

/// Walks a script playlist, executing commands in order.
#[derive(Clone)]
pub struct ScriptPlayer {
    inner: Rc<PlayerInner>,
}

#[derive(Clone)]
pub struct WeakScriptPlayer {
    inner: Weak<PlayerInner>,
}

impl WeakScriptPlayer {
    pub fn upgrade(&self) -> Option<ScriptPlayer> {
        self.inner.upgrade().map(|inner| ScriptPlayer { inner })
    }
}

impl ScriptPlayer {
    pub fn new(config: ScriptPlayerConfig, services: PlaybackServices) -> Self {
        let player = Self {
            inner: Rc::new(PlayerInner {
                config: RefCell::new(config),
                services,
                state: RefCell::new(PlaybackState::default()),
                register: RefCell::new(PlayedScriptRegister::new()),
                events: EventHub::default(),
                pre_hooks: RefCell::new(Vec::new()),
                post_hooks: RefCell::new(Vec::new()),
                tokens: RefCell::new(CommandTokens::default()),
                sync: SyncQueue::default(),
                in_flight: Cell::new(0),
                in_flight_done: Notify::new(),
                changed: Notify::new(),
            }),
        };
        player.attach_input();
        player
    }

    pub fn downgrade(&self) -> WeakScriptPlayer {
        WeakScriptPlayer {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn services(&self) -> &PlaybackServices {
        &self.inner.services
    }

    pub fn config(&self) -> ScriptPlayerConfig {
        self.inner.config.borrow().clone()
    }

    pub fn set_skip_mode(&self, skip_mode: PlayerSkipMode) {
        self.inner.config.borrow_mut().skip_mode = skip_mode;
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.borrow().playing
    }

    pub fn is_waiting_for_input(&self) -> bool {
        self.inner.state.borrow().waiting_for_input
    }

    pub fn is_skip_active(&self) -> bool {
        self.inner.state.borrow().skip_active
    }

    pub fn is_auto_play_active(&self) -> bool {
        self.inner.state.borrow().auto_play_active
    }

    pub fn played_index(&self) -> usize {
        self.inner.state.borrow().played_index
    }

    pub fn executed_played_command(&self) -> bool {
        self.inner.state.borrow().executed_played_command
    }

    pub fn playlist(&self) -> Option<Rc<ScriptPlaylist>> {
        self.inner.state.borrow().playlist.clone()
    }

    pub fn played_command(&self) -> Option<Rc<dyn Command>> {
        let state = self.inner.state.borrow();
        state
            .playlist
            .as_ref()
            .and_then(|playlist| playlist.get_command_by_index(state.played_index))
    }

    pub fn playback_spot(&self) -> Option<PlaybackSpot> {
        self.played_command().map(|command| command.spot().clone())
    }

    pub fn gosub_return_spots(&self) -> Vec<PlaybackSpot> {
        self.inner.state.borrow().gosub_return_spots.clone()
    }

    pub fn played_register(&self) -> PlayedScriptRegister {
        self.inner.register.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&PlayerEvent) + 'static) -> SubscriptionId {
        self.inner.events.subscribe(Rc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    pub fn add_pre_execution_hook(&self, hook: ExecutionHook) {
        self.inner.pre_hooks.borrow_mut().push(hook);
    }

    pub fn add_post_execution_hook(&self, hook: ExecutionHook) {
        self.inner.post_hooks.borrow_mut().push(hook);
    }

    fn emit(&self, event: PlayerEvent) {
        self.inner.events.emit(&event);
    }

    fn command_token(&self) -> AsyncToken {
        let tokens = self.inner.tokens.borrow();
        AsyncToken::new(tokens.canceled.clone(), tokens.completed.clone())
    }
}
