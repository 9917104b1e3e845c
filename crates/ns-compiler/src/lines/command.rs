use std::rc::Rc;

use ns_core::{
    Command, CommandBase, CommandDescriptor, CommandInit, ParameterAssignment, ParameterKind,
    ParameterMap, RawValue, ScriptError, ScriptLineKind, CONDITION_PARAMETER, WAIT_PARAMETER,
};
use ns_parser::{CommandModel, ParameterModel, ValuePart};

use super::LineContext;

/// Command not yet instantiated: an identifier and its lexed arguments.
#[derive(Debug, Clone)]
pub(crate) struct PendingCommand {
    pub identifier: String,
    pub parameters: Vec<ParameterModel>,
    pub column: usize,
}

impl PendingCommand {
    pub fn from_model(model: &CommandModel) -> Self {
        Self {
            identifier: model.identifier.clone(),
            parameters: model.parameters.clone(),
            column: model.column,
        }
    }

    pub fn synthetic(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            parameters: Vec::new(),
            column: 0,
        }
    }

    pub fn with(mut self, name: Option<&str>, value: Vec<ValuePart>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: Option<&str>, value: Vec<ValuePart>) {
        self.parameters.push(match name {
            Some(name) => ParameterModel::named(name, value),
            None => ParameterModel::nameless(value),
        });
    }

    pub fn is_kind(&self, ctx: &LineContext<'_, '_>, type_name: &str) -> bool {
        ctx.registry()
            .resolve(&self.identifier)
            .is_some_and(|descriptor| descriptor.type_name == type_name)
    }

    /// Lexed value assigned to parameter `id`, by name or as the nameless argument.
    pub fn assigned<'p>(&'p self, ctx: &LineContext<'_, '_>, id: &str) -> Option<&'p [ValuePart]> {
        let descriptor = ctx.registry().resolve(&self.identifier)?;
        self.parameters
            .iter()
            .find(|parameter| {
                let found = match &parameter.name {
                    Some(name) => descriptor.find_parameter(name),
                    None => descriptor.nameless_parameter(),
                };
                found.is_some_and(|found| found.id == id)
            })
            .map(|parameter| parameter.value.as_slice())
    }
}

pub(crate) fn parse_command_line(ctx: &mut LineContext<'_, '_>, model: &CommandModel) -> ScriptLineKind {
    ScriptLineKind::Command {
        command: build_command(ctx, &PendingCommand::from_model(model), 0),
    }
}

/// Binds arguments to the command's declared parameters and runs its factory.
/// Every failure is reported on the line and yields `None`.
pub(crate) fn build_command(
    ctx: &mut LineContext<'_, '_>,
    pending: &PendingCommand,
    inline_index: usize,
) -> Option<Rc<dyn Command>> {
    let Some(descriptor) = ctx.registry().resolve(&pending.identifier).copied() else {
        let span = ctx.span(pending.column);
        ctx.error(ScriptError::with_span(
            "COMMAND_NOT_FOUND",
            format!("Command \"{}\" is not registered.", pending.identifier),
            span,
        ));
        return None;
    };

    let mut parameters = ParameterMap::new();
    let mut assignments = Vec::new();
    let mut failed = false;
    for model in &pending.parameters {
        let span = ctx.span(model.column);
        let found = match &model.name {
            Some(name) => descriptor.find_parameter(name).ok_or_else(|| {
                ScriptError::with_span(
                    "PARAMETER_NOT_FOUND",
                    format!(
                        "Command \"{}\" has no parameter \"{}\".",
                        descriptor.script_name(),
                        name
                    ),
                    span,
                )
            }),
            None => descriptor.nameless_parameter().ok_or_else(|| {
                ScriptError::with_span(
                    "PARAMETER_NAMELESS_UNSUPPORTED",
                    format!(
                        "Command \"{}\" does not accept a nameless parameter.",
                        descriptor.script_name()
                    ),
                    span,
                )
            }),
        };
        let parameter = match found {
            Ok(parameter) => parameter,
            Err(error) => {
                ctx.error(error);
                failed = true;
                continue;
            }
        };
        if parameters.contains(parameter.id) {
            ctx.error(ScriptError::with_span(
                "PARAMETER_DUPLICATE",
                format!("Parameter \"{}\" is assigned more than once.", parameter.id),
                span,
            ));
            failed = true;
            continue;
        }

        let raw = ctx.to_raw(&model.value, parameter.kind == ParameterKind::LocalizableText);
        parameters.insert(parameter.id, raw.clone());
        assignments.push(ParameterAssignment {
            id: parameter.id.to_string(),
            nameless: model.name.is_none(),
            raw,
        });
    }

    if !apply_defaults(ctx, &descriptor, &mut parameters, pending.column) || failed {
        return None;
    }

    let wait = match parameters.take::<bool>(WAIT_PARAMETER) {
        Ok(wait) => wait,
        Err(error) => {
            ctx.error(error);
            return None;
        }
    };
    let base = CommandBase {
        type_name: descriptor.type_name,
        alias: descriptor.script_name(),
        spot: ctx.spot(inline_index),
        default_wait: descriptor.default_wait,
        wait,
        condition: parameters.raw(CONDITION_PARAMETER).map(RawValue::source_text),
        assignments,
    };
    match (descriptor.factory)(&CommandInit { base, parameters }) {
        Ok(command) => Some(command),
        Err(error) => {
            let error = match error.span {
                Some(_) => error,
                None => ScriptError::with_span(error.code, error.message, ctx.span(pending.column)),
            };
            ctx.error(error);
            None
        }
    }
}

fn apply_defaults(
    ctx: &mut LineContext<'_, '_>,
    descriptor: &CommandDescriptor,
    parameters: &mut ParameterMap,
    column: usize,
) -> bool {
    let mut complete = true;
    for parameter in descriptor.parameters {
        if parameters.contains(parameter.id) {
            continue;
        }
        if let Some(default) = parameter.default {
            parameters.insert(parameter.id, RawValue::plain(default));
        } else if parameter.required {
            let span = ctx.span(column);
            ctx.error(ScriptError::with_span(
                "PARAMETER_REQUIRED_MISSING",
                format!(
                    "Command \"{}\" requires parameter \"{}\".",
                    descriptor.script_name(),
                    parameter.id
                ),
                span,
            ));
            complete = false;
        }
    }
    complete
}
