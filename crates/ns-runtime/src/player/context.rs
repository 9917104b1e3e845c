use std::rc::Rc;

use ns_core::{
    CancellationToken, CommandContext, ExpressionEvaluator, LocalFuture, PlaybackSpot, Presenter,
    RawValue, RawValuePart, Script, ScriptError,
};
use tracing::warn;

use super::ScriptPlayer;

/// Playback environment handed to one executing command.
pub(super) struct PlayerContext {
    player: ScriptPlayer,
    script: Rc<Script>,
    spot: PlaybackSpot,
}

impl PlayerContext {
    pub(super) fn new(player: ScriptPlayer, script: Rc<Script>, spot: PlaybackSpot) -> Self {
        Self {
            player,
            script,
            spot,
        }
    }
}

impl CommandContext for PlayerContext {
    fn resolve_text(&self, raw: &RawValue) -> Result<String, ScriptError> {
        let mut text = String::new();
        for part in &raw.parts {
            match part {
                RawValuePart::PlainText { text: plain } => text.push_str(plain),
                RawValuePart::IdentifiedText { id } => match self.script.text_map().get(id) {
                    Some(localized) => text.push_str(localized),
                    None => warn!(
                        spot = %self.spot,
                        id = %id,
                        "text id is missing from the script text map"
                    ),
                },
                RawValuePart::Expression { body } => {
                    text.push_str(&self.player.inner.services.evaluator.evaluate(body)?)
                }
            }
        }
        Ok(text)
    }

    fn evaluator(&self) -> Rc<dyn ExpressionEvaluator> {
        Rc::clone(&self.player.inner.services.evaluator)
    }

    fn presenter(&self) -> Rc<dyn Presenter> {
        Rc::clone(&self.player.inner.services.presenter)
    }

    fn is_skip_active(&self) -> bool {
        self.player.is_skip_active()
    }

    fn set_waiting_for_input(&self, enabled: bool) {
        self.player.set_waiting_for_input_enabled(enabled);
    }

    fn continue_input_token(&self) -> CancellationToken {
        self.player.continue_input_token()
    }

    fn note_printed_text(&self, text: &str) {
        self.player.note_printed_chars(text.chars().count());
    }

    fn goto(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        let player = self.player.clone();
        let script_name = script_name.to_string();
        let label = label.map(str::to_string);
        Box::pin(async move { player.goto(&script_name, label.as_deref()).await })
    }

    fn gosub(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        let player = self.player.clone();
        let script_name = script_name.to_string();
        let label = label.map(str::to_string);
        let return_spot = self.spot.clone();
        Box::pin(async move {
            player
                .gosub(return_spot, &script_name, label.as_deref())
                .await
        })
    }

    fn return_from_gosub(&self) -> LocalFuture<'static, Result<(), ScriptError>> {
        let player = self.player.clone();
        Box::pin(async move { player.return_from_gosub().await })
    }

    fn stop_playback(&self) {
        self.player.stop();
    }
}

impl ScriptPlayer {
    /// Plays `script_name` from `label`, or from its first command.
    pub async fn goto(&self, script_name: &str, label: Option<&str>) -> Result<(), ScriptError> {
        self.preload_and_play(script_name, 0, 0, label).await.map(|_| ())
    }

    /// Like [`ScriptPlayer::goto`], remembering `return_spot` for a later return.
    pub async fn gosub(
        &self,
        return_spot: PlaybackSpot,
        script_name: &str,
        label: Option<&str>,
    ) -> Result<(), ScriptError> {
        self.inner
            .state
            .borrow_mut()
            .gosub_return_spots
            .push(return_spot);
        self.goto(script_name, label).await
    }

    /// Continues after the most recent gosub; a return without one is ignored.
    pub async fn return_from_gosub(&self) -> Result<(), ScriptError> {
        let spot = self.inner.state.borrow_mut().gosub_return_spots.pop();
        let Some(spot) = spot else {
            warn!("return without a pending gosub; ignored");
            return Ok(());
        };
        self.preload_and_play(
            &spot.script_name,
            spot.line_index,
            spot.inline_index + 1,
            None,
        )
        .await
        .map(|_| ())
    }
}
