use std::rc::Rc;

use ns_core::ScriptError;
use tracing::{info, warn};

use super::{ScriptPlayer, PLAYED_REGISTER_STATE_KEY, PLAYER_SETTINGS_KEY, PLAYER_STATE_KEY};
use crate::register::PlayedScriptRegister;
use crate::state::{ScriptPlayerGameState, ScriptPlayerSettings, StateMap};

impl ScriptPlayer {
    pub fn save_game_state(&self, state: &mut StateMap) -> Result<(), ScriptError> {
        let saved = {
            let current = self.inner.state.borrow();
            ScriptPlayerGameState {
                playing: current.playing || current.resume_after_load,
                executed_played_command: current.executed_played_command,
                waiting_for_input: current.waiting_for_input,
                gosub_return_spots: current.gosub_return_spots.clone(),
                playback_spot: current.playlist.as_ref().and_then(|playlist| {
                    playlist
                        .get(current.played_index)
                        .map(|command| command.spot().clone())
                }),
            }
        };
        state.set(PLAYER_STATE_KEY, &saved)
    }

    /// Restores the saved position without starting the loop; call
    /// [`ScriptPlayer::handle_game_load_finished`] once every participant is loaded.
    pub async fn load_game_state(&self, state: &StateMap) -> Result<(), ScriptError> {
        let saved = state
            .get::<ScriptPlayerGameState>(PLAYER_STATE_KEY)?
            .unwrap_or_default();
        self.stop();
        self.cancel_commands();

        let Some(spot) = saved.playback_spot else {
            self.release_preloaded();
            {
                let mut current = self.inner.state.borrow_mut();
                current.playlist = None;
                current.played_index = 0;
                current.executed_played_command = false;
                current.gosub_return_spots = saved.gosub_return_spots;
                current.resume_after_load = false;
            }
            self.set_waiting_for_input_enabled(false);
            return Ok(());
        };

        let playlist = self.playlist_for(&spot.script_name).await?;
        let (index, executed) = match playlist.index_of(&spot) {
            Some(index) => (Some(index), saved.executed_played_command),
            None => {
                let fallback = playlist.index_after_line(spot.line_index, spot.inline_index);
                warn!(
                    spot = %spot,
                    fallback = ?fallback,
                    "saved spot no longer exists; continuing from the nearest later command"
                );
                (fallback, false)
            }
        };
        self.swap_preloaded(&playlist).await?;

        {
            let mut current = self.inner.state.borrow_mut();
            current.playlist = Some(Rc::clone(&playlist));
            current.played_index = index.unwrap_or(0);
            current.executed_played_command = executed;
            current.gosub_return_spots = saved.gosub_return_spots;
            current.resume_after_load = saved.playing && index.is_some();
        }
        self.set_waiting_for_input_enabled(saved.waiting_for_input && index.is_some());
        Ok(())
    }

    /// Resumes playback after a load when the saved state was playing.
    pub fn handle_game_load_finished(&self) -> bool {
        let resume = std::mem::take(&mut self.inner.state.borrow_mut().resume_after_load);
        if !resume {
            return false;
        }
        if !self.advance_after_executed() {
            info!("loaded state is past the last command; playback stays stopped");
            return false;
        }
        self.resume()
    }

    pub fn save_global_state(&self, state: &mut StateMap) -> Result<(), ScriptError> {
        state.set(PLAYED_REGISTER_STATE_KEY, &*self.inner.register.borrow())
    }

    pub fn load_global_state(&self, state: &StateMap) -> Result<(), ScriptError> {
        let register = state
            .get::<PlayedScriptRegister>(PLAYED_REGISTER_STATE_KEY)?
            .unwrap_or_default();
        *self.inner.register.borrow_mut() = register;
        Ok(())
    }

    pub fn save_settings(&self, state: &mut StateMap) -> Result<(), ScriptError> {
        let settings = ScriptPlayerSettings {
            skip_mode: self.inner.config.borrow().skip_mode,
        };
        state.set(PLAYER_SETTINGS_KEY, &settings)
    }

    pub fn load_settings(&self, state: &StateMap) -> Result<(), ScriptError> {
        if let Some(settings) = state.get::<ScriptPlayerSettings>(PLAYER_SETTINGS_KEY)? {
            self.set_skip_mode(settings.skip_mode);
        }
        Ok(())
    }
}
