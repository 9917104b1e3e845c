use std::rc::Rc;
use std::time::Duration;

use ns_core::CancellationToken;
use tracing::debug;

use super::{PlayerEvent, ScriptPlayer};
use crate::services::InputBinding;
use crate::state::PlayerSkipMode;

impl ScriptPlayer {
    /// Whether skip may be enabled right now. In read-only mode the next command must
    /// have been played before.
    pub fn can_skip(&self) -> bool {
        if self.inner.config.borrow().skip_mode == PlayerSkipMode::Everything {
            return true;
        }
        let state = self.inner.state.borrow();
        state.playlist.as_ref().is_some_and(|playlist| {
            self.inner
                .register
                .borrow()
                .has_played(playlist.script_name(), state.played_index + 1)
        })
    }

    pub(super) fn can_continue_skip(&self) -> bool {
        if self.inner.config.borrow().skip_mode == PlayerSkipMode::Everything {
            return true;
        }
        let state = self.inner.state.borrow();
        state.playlist.as_ref().is_some_and(|playlist| {
            self.inner
                .register
                .borrow()
                .has_played(playlist.script_name(), state.played_index)
        })
    }

    /// Returns whether skip ends up in the requested state.
    pub fn set_skip_enabled(&self, enable: bool) -> bool {
        if self.is_skip_active() == enable {
            return true;
        }
        if enable && !self.can_skip() {
            debug!("skip refused: next command was not played before");
            return false;
        }
        self.inner.state.borrow_mut().skip_active = enable;
        self.emit(PlayerEvent::SkipChanged { enabled: enable });
        self.inner.changed.notify_waiters();
        if enable {
            self.set_waiting_for_input_enabled(false);
        }
        true
    }

    pub fn set_auto_play_enabled(&self, enable: bool) {
        if self.is_auto_play_active() == enable {
            return;
        }
        self.inner.state.borrow_mut().auto_play_active = enable;
        self.emit(PlayerEvent::AutoPlayChanged { enabled: enable });
        self.inner.changed.notify_waiters();
        if enable {
            self.set_waiting_for_input_enabled(false);
        }
    }

    /// Enabling is ignored while skip is active.
    pub fn set_waiting_for_input_enabled(&self, enable: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            if enable && state.skip_active {
                return;
            }
            if state.waiting_for_input == enable {
                return;
            }
            state.waiting_for_input = enable;
        }
        self.emit(PlayerEvent::WaitingForInputChanged { enabled: enable });
        self.inner.changed.notify_waiters();
    }

    pub(super) fn note_printed_chars(&self, count: usize) {
        self.inner.state.borrow_mut().last_printed_chars = count;
    }

    pub(super) fn continue_input_token(&self) -> CancellationToken {
        self.inner
            .services
            .input
            .sampler(InputBinding::Continue)
            .map(|sampler| sampler.start_token())
            .unwrap_or_default()
    }

    fn auto_play_delay(&self) -> Duration {
        let config = self.inner.config.borrow();
        let chars = self.inner.state.borrow().last_printed_chars as f32;
        let secs = config.auto_play_delay_secs + config.auto_play_delay_per_char_secs * chars;
        Duration::from_secs_f32(secs.max(0.0))
    }

    /// Blocks the loop while waiting for input; auto-play lifts the wait after a delay.
    pub(super) async fn wait_for_input_release(&self, token: &CancellationToken) {
        loop {
            let changed = self.inner.changed.notified();
            if token.is_cancelled() || !self.is_waiting_for_input() {
                return;
            }
            if self.is_auto_play_active() {
                let delay = self.auto_play_delay();
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        debug!(?delay, "auto-play continues");
                        self.set_waiting_for_input_enabled(false);
                    }
                    _ = changed => {}
                    _ = token.cancelled() => return,
                }
            } else {
                tokio::select! {
                    _ = changed => {}
                    _ = token.cancelled() => return,
                }
            }
        }
    }

    pub(super) fn attach_input(&self) {
        self.bind_input(InputBinding::Continue, Self::handle_continue_input, None);
        self.bind_input(InputBinding::Skip, Self::start_skip, Some(Self::end_skip as fn(&Self)));
        self.bind_input(InputBinding::ToggleSkip, Self::toggle_skip, None);
        self.bind_input(InputBinding::AutoPlay, Self::toggle_auto_play, None);
    }

    fn bind_input(
        &self,
        binding: InputBinding,
        on_start: fn(&ScriptPlayer),
        on_end: Option<fn(&ScriptPlayer)>,
    ) {
        let Some(sampler) = self.inner.services.input.sampler(binding) else {
            return;
        };
        let player = self.downgrade();
        sampler.on_start(Rc::new(move || {
            if let Some(player) = player.upgrade() {
                on_start(&player);
            }
        }));
        if let Some(on_end) = on_end {
            let player = self.downgrade();
            sampler.on_end(Rc::new(move || {
                if let Some(player) = player.upgrade() {
                    on_end(&player);
                }
            }));
        }
    }

    fn start_skip(&self) {
        self.set_skip_enabled(true);
    }

    fn end_skip(&self) {
        self.set_skip_enabled(false);
    }

    fn toggle_skip(&self) {
        self.set_skip_enabled(!self.is_skip_active());
    }

    fn toggle_auto_play(&self) {
        self.set_auto_play_enabled(!self.is_auto_play_active());
    }

    fn handle_continue_input(&self) {
        self.set_skip_enabled(false);
        self.set_waiting_for_input_enabled(false);
    }
}
