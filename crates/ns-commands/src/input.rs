use std::rc::Rc;
use std::time::Duration;

use ns_core::well_known::{SKIP_INPUT, SKIP_INPUT_ALIAS, WAIT_FOR_INPUT, WAIT_FOR_INPUT_ALIAS};
use ns_core::{
    AsyncToken, Command, CommandBase, CommandContext, CommandDescriptor, CommandInit,
    CommandParameter, LocalFuture, ParameterDescriptor, ParameterKind, ScriptError,
};

pub const WAIT_FOR_INPUT_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: WAIT_FOR_INPUT,
    alias: Some(WAIT_FOR_INPUT_ALIAS),
    default_wait: true,
    parameters: &[],
    factory: WaitForInput::create,
};

/// Pauses playback until the continue input.
#[derive(Debug)]
pub struct WaitForInput {
    base: CommandBase,
}

impl WaitForInput {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
        }))
    }
}

impl Command for WaitForInput {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            if !ctx.is_skip_active() {
                ctx.set_waiting_for_input(true);
            }
            Ok(())
        })
    }
}

pub const SKIP_INPUT_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: SKIP_INPUT,
    alias: Some(SKIP_INPUT_ALIAS),
    default_wait: true,
    parameters: &[],
    factory: SkipInput::create,
};

/// Marks a generic text line as continuing without an input pause.
#[derive(Debug)]
pub struct SkipInput {
    base: CommandBase,
}

impl SkipInput {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
        }))
    }
}

impl Command for SkipInput {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        _ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async { Ok(()) })
    }
}

const WAIT_MODE_PARAMETER: &str = "waitMode";

const WAIT_PARAMETERS: &[ParameterDescriptor] =
    &[ParameterDescriptor::new(WAIT_MODE_PARAMETER, ParameterKind::String)
        .nameless()
        .required()];

pub const WAIT_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "Wait",
    alias: Some("wait"),
    default_wait: true,
    parameters: WAIT_PARAMETERS,
    factory: Wait::create,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitMode {
    pub input: bool,
    pub seconds: Option<f32>,
}

/// `i` waits for input, `1.5` delays, `i1.5` delays unless continue is pressed.
pub fn parse_wait_mode(text: &str) -> Result<WaitMode, ScriptError> {
    let text = text.trim();
    let (input, rest) = match text.strip_prefix(['i', 'I']) {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if rest.is_empty() {
        if !input {
            return Err(invalid_wait_mode(text));
        }
        return Ok(WaitMode {
            input,
            seconds: None,
        });
    }
    let seconds = rest
        .parse::<f32>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| invalid_wait_mode(text))?;
    Ok(WaitMode {
        input,
        seconds: Some(seconds),
    })
}

fn invalid_wait_mode(text: &str) -> ScriptError {
    ScriptError::new(
        "WAIT_MODE_INVALID",
        format!("\"{}\" is not a valid wait mode.", text),
    )
}

#[derive(Debug)]
pub struct Wait {
    base: CommandBase,
    wait_mode: CommandParameter<String>,
}

impl Wait {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        let wait_mode: CommandParameter<String> = init.parameters.take(WAIT_MODE_PARAMETER)?;
        if let Some(text) = wait_mode.static_value() {
            parse_wait_mode(text)?;
        }
        Ok(Rc::new(Self {
            base: init.base.clone(),
            wait_mode,
        }))
    }
}

impl Command for Wait {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let text = self.wait_mode.get(ctx.as_ref())?.unwrap_or_default();
            let mode = parse_wait_mode(&text)?;
            if ctx.is_skip_active() {
                return Ok(());
            }
            match mode.seconds {
                Some(seconds) => {
                    let token = if mode.input {
                        token.with_completion(&ctx.continue_input_token())
                    } else {
                        token
                    };
                    token.delay(Duration::from_secs_f32(seconds)).await
                }
                None => {
                    ctx.set_waiting_for_input(true);
                    Ok(())
                }
            }
        })
    }
}
