use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ns_core::{LocalFuture, PlaybackSpot, ScriptError};
use tracing::{debug, warn};

use crate::player::{PlayerEvent, ScriptPlayer, WeakScriptPlayer};
use crate::services::{GameStateParticipant, SpotPredicate, StateManager};
use crate::state::StateMap;

#[derive(Debug, Clone)]
struct Snapshot {
    spot: PlaybackSpot,
    state: StateMap,
}

/// In-memory state manager keeping one game-state snapshot per started command.
pub struct RollbackStack {
    this: Weak<RollbackStack>,
    capacity: usize,
    snapshots: RefCell<Vec<Snapshot>>,
    participants: RefCell<Vec<Rc<dyn GameStateParticipant>>>,
    player: RefCell<Option<WeakScriptPlayer>>,
    global: RefCell<StateMap>,
}

impl RollbackStack {
    pub const DEFAULT_CAPACITY: usize = 128;

    pub fn new(capacity: usize) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            capacity: capacity.max(1),
            snapshots: RefCell::new(Vec::new()),
            participants: RefCell::new(Vec::new()),
            player: RefCell::new(None),
            global: RefCell::new(StateMap::new()),
        })
    }

    pub fn add_participant(&self, participant: Rc<dyn GameStateParticipant>) {
        self.participants.borrow_mut().push(participant);
    }

    /// Starts snapshotting `player` whenever it starts a command.
    pub fn attach(self: &Rc<Self>, player: &ScriptPlayer) {
        *self.player.borrow_mut() = Some(player.downgrade());
        let stack = Rc::downgrade(self);
        let weak_player = player.downgrade();
        player.subscribe(move |event| {
            let PlayerEvent::CommandStarted { spot } = event else {
                return;
            };
            let (Some(stack), Some(player)) = (stack.upgrade(), weak_player.upgrade()) else {
                return;
            };
            if let Err(error) = stack.push_snapshot(spot, &player) {
                warn!(code = %error.code, spot = %spot, "snapshot failed: {}", error.message);
            }
        });
    }

    pub fn len(&self) -> usize {
        self.snapshots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.borrow().is_empty()
    }

    pub fn spots(&self) -> Vec<PlaybackSpot> {
        self.snapshots
            .borrow()
            .iter()
            .map(|snapshot| snapshot.spot.clone())
            .collect()
    }

    /// Global state written by the last `save_global`.
    pub fn global_state(&self) -> StateMap {
        self.global.borrow().clone()
    }

    fn push_snapshot(&self, spot: &PlaybackSpot, player: &ScriptPlayer) -> Result<(), ScriptError> {
        let mut state = StateMap::new();
        player.save_game_state(&mut state)?;
        for participant in self.participants.borrow().iter() {
            participant.save_game_state(&mut state)?;
        }
        let mut snapshots = self.snapshots.borrow_mut();
        if snapshots.len() == self.capacity {
            snapshots.remove(0);
        }
        snapshots.push(Snapshot {
            spot: spot.clone(),
            state,
        });
        Ok(())
    }

    fn player(&self) -> Result<ScriptPlayer, ScriptError> {
        self.player
            .borrow()
            .as_ref()
            .and_then(WeakScriptPlayer::upgrade)
            .ok_or_else(|| {
                ScriptError::new(
                    "ROLLBACK_PLAYER_MISSING",
                    "Rollback stack is not attached to a player.",
                )
            })
    }
}

impl StateManager for RollbackStack {
    fn rollback(&self, predicate: SpotPredicate) -> LocalFuture<'static, Result<bool, ScriptError>> {
        let stack = self.this.upgrade();
        Box::pin(async move {
            let Some(stack) = stack else {
                return Ok(false);
            };
            let found = {
                let mut snapshots = stack.snapshots.borrow_mut();
                let position = snapshots
                    .iter()
                    .rposition(|snapshot| predicate(&snapshot.spot));
                position.map(|position| {
                    snapshots.truncate(position + 1);
                    snapshots.pop()
                })
            };
            let Some(Some(snapshot)) = found else {
                debug!("no snapshot matches the rollback target");
                return Ok(false);
            };
            debug!(spot = %snapshot.spot, "restoring snapshot");

            let player = stack.player()?;
            let participants = stack.participants.borrow().clone();
            for participant in participants {
                participant.load_game_state(&snapshot.state)?;
            }
            player.load_game_state(&snapshot.state).await?;
            player.handle_game_load_finished();
            Ok(true)
        })
    }

    fn save_global(&self) -> LocalFuture<'static, Result<(), ScriptError>> {
        let result = self
            .player()
            .and_then(|player| player.save_global_state(&mut self.global.borrow_mut()));
        Box::pin(async move { result })
    }
}
