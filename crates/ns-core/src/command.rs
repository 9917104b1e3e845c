use std::fmt;
use std::rc::Rc;

use crate::cancellation::{AsyncToken, LocalFuture};
use crate::context::{CommandContext, Preloadable};
use crate::error::ScriptError;
use crate::parameter::{CommandParameter, ParameterMap};
use crate::types::PlaybackSpot;
use crate::value::RawValue;

/// One parameter as it was assigned in the source, kept for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterAssignment {
    pub id: String,
    pub nameless: bool,
    pub raw: RawValue,
}

/// Data shared by every command kind.
#[derive(Debug, Clone)]
pub struct CommandBase {
    pub type_name: &'static str,
    pub alias: &'static str,
    pub spot: PlaybackSpot,
    pub default_wait: bool,
    pub wait: CommandParameter<bool>,
    pub condition: Option<String>,
    pub assignments: Vec<ParameterAssignment>,
}

impl CommandBase {
    /// Whether the player awaits this command before moving on.
    pub fn should_wait(&self, ctx: &dyn CommandContext) -> Result<bool, ScriptError> {
        self.wait.get_or(ctx, self.default_wait)
    }

    pub fn assigned(&self, id: &str) -> Option<&RawValue> {
        self.assignments
            .iter()
            .find(|assignment| assignment.id == id)
            .map(|assignment| &assignment.raw)
    }
}

/// Input to a command factory.
#[derive(Debug, Clone)]
pub struct CommandInit {
    pub base: CommandBase,
    pub parameters: ParameterMap,
}

pub trait Command: fmt::Debug {
    fn base(&self) -> &CommandBase;

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>>;

    fn as_preloadable(&self) -> Option<&dyn Preloadable> {
        None
    }

    fn spot(&self) -> &PlaybackSpot {
        &self.base().spot
    }
}
