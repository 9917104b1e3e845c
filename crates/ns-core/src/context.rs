use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cancellation::{AsyncToken, CancellationToken, LocalFuture};
use crate::error::ScriptError;
use crate::value::RawValue;

/// Evaluates script expressions against host state.
pub trait ExpressionEvaluator {
    fn evaluate(&self, body: &str) -> Result<String, ScriptError>;

    fn assign(&self, name: &str, body: &str) -> Result<(), ScriptError>;

    fn evaluate_bool(&self, body: &str) -> Result<bool, ScriptError> {
        let value = self.evaluate(body)?;
        match value.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ScriptError::new(
                "EXPRESSION_BOOLEAN_EXPECTED",
                format!("Expression \"{}\" evaluated to \"{}\", not a boolean.", body, other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintRequest {
    pub author: Option<String>,
    pub text: String,
    pub instant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterChange {
    pub id: String,
    pub appearance: Option<String>,
    pub visible: bool,
    pub position: Option<Vec<f32>>,
}

/// Text printer and actor systems owned by the host.
pub trait Presenter {
    fn print_text(
        &self,
        request: PrintRequest,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn modify_character(
        &self,
        change: CharacterChange,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>>;
}

/// Reference-counted resource holds, tracked per holder.
pub trait ResourceProvider {
    fn load(&self, path: &str, holder: &str) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn release(&self, path: &str, holder: &str);

    fn is_loaded(&self, path: &str) -> bool;
}

/// Commands that need resources ready before they execute.
pub trait Preloadable {
    fn preload_resources(
        &self,
        resources: Rc<dyn ResourceProvider>,
        holder: String,
    ) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn release_preloaded_resources(&self, resources: &dyn ResourceProvider, holder: &str);
}

/// What a command sees of the playback environment while executing.
pub trait CommandContext {
    /// Resolves a dynamic raw value: text ids via the text map, expressions via the evaluator.
    fn resolve_text(&self, raw: &RawValue) -> Result<String, ScriptError>;

    fn evaluator(&self) -> Rc<dyn ExpressionEvaluator>;

    fn presenter(&self) -> Rc<dyn Presenter>;

    fn is_skip_active(&self) -> bool;

    fn set_waiting_for_input(&self, enabled: bool);

    /// Cancelled the next time the continue input starts.
    fn continue_input_token(&self) -> CancellationToken;

    fn note_printed_text(&self, text: &str);

    fn goto(&self, script_name: &str, label: Option<&str>)
        -> LocalFuture<'static, Result<(), ScriptError>>;

    fn gosub(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn return_from_gosub(&self) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn stop_playback(&self);
}
