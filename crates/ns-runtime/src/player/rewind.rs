use std::rc::Rc;

use ns_core::ScriptError;
use tracing::{debug, info};

use super::execution::Dispatch;
use super::ScriptPlayer;
use crate::playlist::ScriptPlaylist;

impl ScriptPlayer {
    /// Moves playback to `line_index` of the played script.
    ///
    /// Forward targets are reached by executing every command in between under forced
    /// skip, so gates and variable changes apply. Backward targets are restored through
    /// the state manager's rollback; `Ok(false)` means no snapshot matched.
    pub async fn rewind(&self, line_index: usize) -> Result<bool, ScriptError> {
        let (playlist, played_index) = {
            let state = self.inner.state.borrow();
            let playlist = state.playlist.clone().ok_or_else(|| {
                ScriptError::new("PLAYER_NOT_LOADED", "No script is loaded for playback.")
            })?;
            (playlist, state.played_index)
        };
        let current_line = playlist
            .get(played_index)
            .map(|command| command.spot().line_index)
            .unwrap_or_default();
        if line_index == current_line {
            return Ok(true);
        }

        let forward = line_index > current_line;
        let target_index = if forward {
            playlist.index_after_line(line_index, 0)
        } else {
            playlist.index_before_line(line_index, 0)
        }
        .ok_or_else(|| {
            ScriptError::new(
                "PLAYER_REWIND_TARGET_NOT_FOUND",
                format!(
                    "No command to rewind to around line {} of \"{}\".",
                    line_index + 1,
                    playlist.script_name()
                ),
            )
        })?;

        if forward {
            return self.fast_forward(&playlist, target_index).await;
        }
        let Some(target) = playlist.get(target_index).map(|command| command.spot().clone()) else {
            return Ok(false);
        };
        debug!(spot = %target, "rolling back");
        self.inner
            .services
            .state
            .rollback(Box::new(move |spot| *spot == target))
            .await
    }

    async fn fast_forward(
        &self,
        playlist: &Rc<ScriptPlaylist>,
        target_index: usize,
    ) -> Result<bool, ScriptError> {
        let was_playing = self.is_playing();
        self.stop();
        self.set_waiting_for_input_enabled(false);

        let (start, previous_skip) = {
            let mut state = self.inner.state.borrow_mut();
            let start = state.played_index + usize::from(state.executed_played_command);
            let previous_skip = std::mem::replace(&mut state.skip_active, true);
            (start, previous_skip)
        };
        info!(
            script = playlist.script_name(),
            from = start,
            to = target_index,
            "fast-forwarding"
        );

        let mut result = Ok(true);
        for index in start..target_index {
            let same_playlist = self
                .playlist()
                .is_some_and(|current| Rc::ptr_eq(&current, playlist));
            if !same_playlist || self.is_playing() {
                debug!("fast-forward interrupted by a jump");
                result = Ok(false);
                break;
            }
            {
                let mut state = self.inner.state.borrow_mut();
                state.played_index = index;
                state.executed_played_command = false;
            }
            if let Err(error) = self.execute_command(playlist, index, Dispatch::Blocking).await {
                result = Err(error);
                break;
            }
        }

        self.inner.state.borrow_mut().skip_active = previous_skip;
        if !matches!(result, Ok(true)) {
            return result;
        }
        {
            let mut state = self.inner.state.borrow_mut();
            state.played_index = target_index;
            state.executed_played_command = false;
        }
        self.set_waiting_for_input_enabled(false);
        if was_playing {
            self.resume();
        }
        Ok(true)
    }
}
