use std::rc::Rc;

use ns_core::{
    AsyncToken, Command, CommandBase, CommandContext, CommandDescriptor, CommandInit,
    CommandParameter, LocalFuture, ParameterDescriptor, ParameterKind, ScriptError,
};
use tracing::debug;

const EXPRESSION_PARAMETER: &str = "expression";

const PARAMETERS: &[ParameterDescriptor] =
    &[ParameterDescriptor::new(EXPRESSION_PARAMETER, ParameterKind::String)
        .nameless()
        .required()];

pub const DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: "SetCustomVariable",
    alias: Some("set"),
    default_wait: true,
    parameters: PARAMETERS,
    factory: SetCustomVariable::create,
};

/// Splits `a = 1; b = a + 1` into `(name, expression)` pairs.
pub fn parse_assignments(text: &str) -> Result<Vec<(String, String)>, ScriptError> {
    let mut assignments = Vec::new();
    for statement in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((name, body)) = statement.split_once('=') else {
            return Err(invalid_assignment(statement));
        };
        let name = name.trim();
        let body = body.trim();
        let valid_name = name
            .chars()
            .next()
            .is_some_and(|first| first.is_alphabetic() || first == '_')
            && name.chars().all(|ch| ch.is_alphanumeric() || ch == '_');
        if !valid_name || body.is_empty() {
            return Err(invalid_assignment(statement));
        }
        assignments.push((name.to_string(), body.to_string()));
    }
    if assignments.is_empty() {
        return Err(invalid_assignment(text));
    }
    Ok(assignments)
}

fn invalid_assignment(statement: &str) -> ScriptError {
    ScriptError::new(
        "SET_EXPRESSION_INVALID",
        format!("\"{}\" is not a valid assignment.", statement),
    )
}

#[derive(Debug)]
pub struct SetCustomVariable {
    base: CommandBase,
    expression: CommandParameter<String>,
}

impl SetCustomVariable {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        let expression: CommandParameter<String> = init.parameters.take(EXPRESSION_PARAMETER)?;
        if let Some(text) = expression.static_value() {
            parse_assignments(text)?;
        }
        Ok(Rc::new(Self {
            base: init.base.clone(),
            expression,
        }))
    }
}

impl Command for SetCustomVariable {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let text = self.expression.get(ctx.as_ref())?.unwrap_or_default();
            let evaluator = ctx.evaluator();
            for (name, body) in parse_assignments(&text)? {
                debug!(variable = %name, expression = %body, "assigning custom variable");
                evaluator.assign(&name, &body)?;
            }
            Ok(())
        })
    }
}
