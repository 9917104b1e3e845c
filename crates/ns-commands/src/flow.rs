use std::rc::Rc;

use ns_core::{
    AsyncToken, Command, CommandBase, CommandContext, CommandDescriptor, CommandInit,
    CommandParameter, LocalFuture, NamedString, ParameterDescriptor, ParameterKind, ScriptError,
};

const PATH_PARAMETER: &str = "path";

const PATH_PARAMETERS: &[ParameterDescriptor] =
    &[ParameterDescriptor::new(PATH_PARAMETER, ParameterKind::NamedString)
        .nameless()
        .required()];

pub const GOTO_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "Goto",
    alias: Some("goto"),
    default_wait: true,
    parameters: PATH_PARAMETERS,
    factory: Goto::create,
};

pub const GOSUB_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "Gosub",
    alias: Some("gosub"),
    default_wait: true,
    parameters: PATH_PARAMETERS,
    factory: Gosub::create,
};

pub const RETURN_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "Return",
    alias: Some("return"),
    default_wait: true,
    parameters: &[],
    factory: Return::create,
};

pub const STOP_DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "Stop",
    alias: Some("stop"),
    default_wait: true,
    parameters: &[],
    factory: Stop::create,
};

/// `script.label`; an empty script name targets the script the command lives in.
fn resolve_path(
    base: &CommandBase,
    path: &CommandParameter<NamedString>,
    ctx: &dyn CommandContext,
) -> Result<(String, Option<String>), ScriptError> {
    let Some(named) = path.get(ctx)? else {
        return Err(ScriptError::new(
            "COMMAND_PARAMETER_MISSING",
            format!("{} requires a navigation path.", base.spot),
        ));
    };
    let script_name = if named.name.is_empty() {
        base.spot.script_name.clone()
    } else {
        named.name
    };
    Ok((script_name, named.value))
}

#[derive(Debug)]
pub struct Goto {
    base: CommandBase,
    path: CommandParameter<NamedString>,
}

impl Goto {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
            path: init.parameters.take(PATH_PARAMETER)?,
        }))
    }
}

impl Command for Goto {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let (script_name, label) = resolve_path(&self.base, &self.path, ctx.as_ref())?;
            ctx.goto(&script_name, label.as_deref()).await
        })
    }
}

/// Like goto, but remembers where to come back to.
#[derive(Debug)]
pub struct Gosub {
    base: CommandBase,
    path: CommandParameter<NamedString>,
}

impl Gosub {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
            path: init.parameters.take(PATH_PARAMETER)?,
        }))
    }
}

impl Command for Gosub {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let (script_name, label) = resolve_path(&self.base, &self.path, ctx.as_ref())?;
            ctx.gosub(&script_name, label.as_deref()).await
        })
    }
}

#[derive(Debug)]
pub struct Return {
    base: CommandBase,
}

impl Return {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
        }))
    }
}

impl Command for Return {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        ctx.return_from_gosub()
    }
}

#[derive(Debug)]
pub struct Stop {
    base: CommandBase,
}

impl Stop {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
        }))
    }
}

impl Command for Stop {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        ctx.stop_playback();
        Box::pin(async { Ok(()) })
    }
}
