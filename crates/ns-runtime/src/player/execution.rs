use std::future::{poll_fn, Future};
use std::rc::Rc;
use std::task::Poll;

use ns_core::{CancellationToken, Command, CommandContext, LocalFuture, Script, ScriptError};
use tracing::{debug, error, info, warn};

use super::context::PlayerContext;
use super::{PlayerEvent, ScriptPlayer, PLAYER_RESOURCE_HOLDER};
use crate::playlist::ScriptPlaylist;

/// How a command is dispatched by [`ScriptPlayer::execute_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Dispatch {
    /// Await blocking commands, spawn the rest.
    Normal,
    /// Await every command; used while fast-forwarding.
    Blocking,
}

impl ScriptPlayer {
    pub fn play_script(&self, script: Rc<Script>, start_index: usize) -> bool {
        let playlist = match self.playlist() {
            Some(playlist) if Rc::ptr_eq(playlist.script(), &script) => playlist,
            _ => Rc::new(ScriptPlaylist::new(script)),
        };
        self.play_playlist(playlist, start_index)
    }

    pub fn play_playlist(&self, playlist: Rc<ScriptPlaylist>, start_index: usize) -> bool {
        self.stop();
        self.inner.state.borrow_mut().playlist = Some(playlist);
        self.play_at(start_index)
    }

    /// Starts the loop at `index` of the loaded playlist; any input wait is dropped.
    pub fn play_at(&self, index: usize) -> bool {
        self.stop();
        let valid = {
            let mut state = self.inner.state.borrow_mut();
            match &state.playlist {
                Some(playlist) if playlist.is_index_valid(index) => {
                    state.played_index = index;
                    state.executed_played_command = false;
                    true
                }
                Some(playlist) => {
                    info!(
                        script = playlist.script_name(),
                        index, "no command to play at index; playback stays stopped"
                    );
                    false
                }
                None => false,
            }
        };
        if !valid {
            return false;
        }
        self.set_waiting_for_input_enabled(false);
        self.start_loop()
    }

    /// Restarts the loop at the played index, keeping the input wait.
    pub fn resume(&self) -> bool {
        self.stop();
        let valid = {
            let state = self.inner.state.borrow();
            state
                .playlist
                .as_ref()
                .is_some_and(|playlist| playlist.is_index_valid(state.played_index))
        };
        valid && self.start_loop()
    }

    fn start_loop(&self) -> bool {
        let token = CancellationToken::new();
        let (script_name, index) = {
            let mut state = self.inner.state.borrow_mut();
            state.playing = true;
            state.loop_token = Some(token.clone());
            let name = state
                .playlist
                .as_ref()
                .map(|playlist| playlist.script_name().to_string())
                .unwrap_or_default();
            (name, state.played_index)
        };
        info!(script = %script_name, index, "playback started");
        self.emit(PlayerEvent::Play { script_name, index });
        self.inner.changed.notify_waiters();

        let player = self.clone();
        tokio::task::spawn_local(async move { player.play_routine(token).await });
        true
    }

    pub fn stop(&self) {
        let (was_playing, token) = {
            let mut state = self.inner.state.borrow_mut();
            let was_playing = state.playing;
            state.playing = false;
            (was_playing, state.loop_token.take())
        };
        if let Some(token) = token {
            token.cancel();
        }
        if was_playing {
            debug!("playback stopped");
            self.emit(PlayerEvent::Stop);
            self.inner.changed.notify_waiters();
        }
    }

    /// Hard-cancels every running command.
    pub fn cancel_commands(&self) {
        let previous = std::mem::take(&mut self.inner.tokens.borrow_mut().canceled);
        previous.cancel();
    }

    /// Stops, cancels commands, releases preloaded resources and forgets the playlist.
    pub fn reset(&self) {
        self.stop();
        self.cancel_commands();
        self.release_preloaded();
        self.set_waiting_for_input_enabled(false);
        let mut state = self.inner.state.borrow_mut();
        state.playlist = None;
        state.played_index = 0;
        state.executed_played_command = false;
        state.gosub_return_spots.clear();
        state.resume_after_load = false;
    }

    /// Loads `script_name`, preloads it and plays from the first command at or after
    /// the label line or `(start_line, start_inline)`.
    pub async fn preload_and_play(
        &self,
        script_name: &str,
        start_line: usize,
        start_inline: usize,
        label: Option<&str>,
    ) -> Result<bool, ScriptError> {
        let playlist = self.playlist_for(script_name).await?;
        let script = playlist.script();
        let (line, inline) = match label {
            Some(label) => {
                let line = script.get_line_index_for_label(label).ok_or_else(|| {
                    ScriptError::new(
                        "PLAYER_LABEL_NOT_FOUND",
                        format!("Label \"{}\" not found in script \"{}\".", label, script_name),
                    )
                })?;
                (line, 0)
            }
            None => {
                if start_line > 0 && start_line >= script.lines().len() {
                    return Err(ScriptError::new(
                        "PLAYER_START_LINE_INVALID",
                        format!(
                            "Line {} is out of range for script \"{}\".",
                            start_line + 1,
                            script_name
                        ),
                    ));
                }
                (start_line, start_inline)
            }
        };
        let start_index = playlist
            .index_after_line(line, inline)
            .unwrap_or(playlist.len());
        self.swap_preloaded(&playlist).await?;
        Ok(self.play_playlist(playlist, start_index))
    }

    pub(super) async fn playlist_for(
        &self,
        script_name: &str,
    ) -> Result<Rc<ScriptPlaylist>, ScriptError> {
        let script = self.inner.services.loader.load_script(script_name).await?;
        Ok(match self.playlist() {
            Some(playlist) if Rc::ptr_eq(playlist.script(), &script) => playlist,
            _ => Rc::new(ScriptPlaylist::new(script)),
        })
    }

    /// Holds the whole of `playlist` and then releases the previously held script.
    pub(super) async fn swap_preloaded(
        &self,
        playlist: &Rc<ScriptPlaylist>,
    ) -> Result<(), ScriptError> {
        if !self.inner.config.borrow().preload_on_play {
            return Ok(());
        }
        let already_held = self
            .inner
            .state
            .borrow()
            .preloaded
            .as_ref()
            .is_some_and(|held| Rc::ptr_eq(held.script(), playlist.script()));
        if already_held {
            return Ok(());
        }
        if !playlist.is_empty() {
            playlist
                .preload_resources(
                    0,
                    playlist.len() - 1,
                    self.inner.services.resources.clone(),
                    PLAYER_RESOURCE_HOLDER,
                    None,
                )
                .await?;
        }
        let previous = self
            .inner
            .state
            .borrow_mut()
            .preloaded
            .replace(Rc::clone(playlist));
        if let Some(previous) = previous {
            release_all(&previous, self);
        }
        Ok(())
    }

    pub(super) fn release_preloaded(&self) {
        let previous = self.inner.state.borrow_mut().preloaded.take();
        if let Some(previous) = previous {
            release_all(&previous, self);
        }
    }

    async fn play_routine(self, token: CancellationToken) {
        loop {
            self.wait_for_input_release(&token).await;
            self.wait_for_synchronization().await;
            if token.is_cancelled() {
                return;
            }

            let current = {
                let state = self.inner.state.borrow();
                state
                    .playlist
                    .clone()
                    .map(|playlist| (playlist, state.played_index))
            };
            let Some((playlist, index)) = current else {
                return;
            };
            if let Err(error) = self.execute_command(&playlist, index, Dispatch::Normal).await {
                self.report_error(&error);
                if !token.is_cancelled() {
                    self.stop();
                }
                return;
            }
            if token.is_cancelled() {
                return;
            }

            if !self.select_next_command() {
                info!(script = playlist.script_name(), "reached the end of script");
                self.stop();
                if let Err(error) = self.inner.services.state.save_global().await {
                    warn!(code = %error.code, "saving global state failed: {}", error.message);
                }
                return;
            }
            if self.is_skip_active() && !self.can_continue_skip() {
                self.set_skip_enabled(false);
            }
        }
    }

    /// Runs one command with its `if` gate, hooks and events. Cancellation of the
    /// command is not an error; any other failure is returned.
    pub(super) async fn execute_command(
        &self,
        playlist: &Rc<ScriptPlaylist>,
        index: usize,
        dispatch: Dispatch,
    ) -> Result<(), ScriptError> {
        let Some(command) = playlist.get_command_by_index(index) else {
            return Ok(());
        };
        let spot = command.spot().clone();
        let ctx: Rc<dyn CommandContext> = Rc::new(PlayerContext::new(
            self.clone(),
            Rc::clone(playlist.script()),
            spot.clone(),
        ));

        if let Some(condition) = &command.base().condition {
            if !self.inner.services.evaluator.evaluate_bool(condition)? {
                debug!(spot = %spot, condition = %condition, "command skipped by condition");
                return Ok(());
            }
        }

        self.emit(PlayerEvent::CommandStarted { spot: spot.clone() });
        self.inner.register.borrow_mut().add(playlist.script_name(), index);
        self.inner.state.borrow_mut().executed_played_command = true;

        let pre_hooks = self.inner.pre_hooks.borrow().clone();
        for hook in pre_hooks {
            hook(Rc::clone(&command)).await?;
        }
        self.wait_for_synchronization().await;

        self.dispatch(Rc::clone(&command), ctx, dispatch).await?;

        self.wait_for_synchronization().await;
        let post_hooks = self.inner.post_hooks.borrow().clone();
        for hook in post_hooks {
            hook(Rc::clone(&command)).await?;
        }
        self.emit(PlayerEvent::CommandFinished { spot });
        Ok(())
    }

    async fn dispatch(
        &self,
        command: Rc<dyn Command>,
        ctx: Rc<dyn CommandContext>,
        dispatch: Dispatch,
    ) -> Result<(), ScriptError> {
        let token = self.command_token();
        let blocking = dispatch == Dispatch::Blocking || command.base().should_wait(ctx.as_ref())?;
        debug!(spot = %command.spot(), command = command.base().type_name, blocking, "executing command");

        self.begin_in_flight();
        if blocking {
            let result = Rc::clone(&command).execute(ctx, token).await;
            self.end_in_flight();
            return swallow_cancellation(&command, result);
        }

        let player = self.clone();
        let mut task: LocalFuture<'static, ()> = Box::pin(async move {
            let result = Rc::clone(&command).execute(ctx, token).await;
            player.end_in_flight();
            if let Err(error) = swallow_cancellation(&command, result) {
                player.report_error(&error);
                player.stop();
            }
        });
        // First poll happens here so the command starts before the next one in the playlist.
        let finished = poll_fn(|cx| Poll::Ready(task.as_mut().poll(cx).is_ready())).await;
        if !finished {
            tokio::task::spawn_local(task);
        }
        Ok(())
    }

    fn select_next_command(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let next = state.played_index + 1;
        let valid = state
            .playlist
            .as_ref()
            .is_some_and(|playlist| playlist.is_index_valid(next));
        if valid {
            state.played_index = next;
            state.executed_played_command = false;
        }
        valid
    }

    pub(super) fn advance_after_executed(&self) -> bool {
        !self.executed_played_command() || self.select_next_command()
    }

    fn report_error(&self, error: &ScriptError) {
        error!(code = %error.code, "command execution failed: {}", error.message);
        self.emit(PlayerEvent::error(error));
    }

    /// Resolves once playback is stopped or waiting for input.
    pub async fn idle(&self) {
        loop {
            let changed = self.inner.changed.notified();
            if !self.is_playing() || self.is_waiting_for_input() {
                return;
            }
            changed.await;
        }
    }
}

fn release_all(playlist: &ScriptPlaylist, player: &ScriptPlayer) {
    if playlist.is_empty() {
        return;
    }
    if let Err(error) = playlist.release_preloaded_resources(
        0,
        playlist.len() - 1,
        player.inner.services.resources.as_ref(),
        PLAYER_RESOURCE_HOLDER,
    ) {
        warn!(code = %error.code, "releasing preloaded resources failed: {}", error.message);
    }
}

fn swallow_cancellation(
    command: &Rc<dyn Command>,
    result: Result<(), ScriptError>,
) -> Result<(), ScriptError> {
    match result {
        Err(error) if error.is_cancellation() => {
            debug!(spot = %command.spot(), "command canceled");
            Ok(())
        }
        other => other,
    }
}
