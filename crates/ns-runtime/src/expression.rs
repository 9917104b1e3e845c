use std::cell::RefCell;
use std::collections::BTreeMap;

use ns_core::{ExpressionEvaluator, ScriptError};
use rhai::{Dynamic, Engine, ImmutableString, Scope, FLOAT, INT};
use serde_json::Value;

use crate::services::GameStateParticipant;
use crate::state::StateMap;

const VARIABLES_STATE_KEY: &str = "customVariables";

/// Rhai-backed evaluator over a flat set of custom variables.
pub struct RhaiExpressionEvaluator {
    engine: Engine,
    variables: RefCell<BTreeMap<String, Value>>,
}

impl RhaiExpressionEvaluator {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_strict_variables(true);
        Self {
            engine,
            variables: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.borrow().get(name).cloned()
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.variables.borrow_mut().insert(name.to_string(), value);
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.variables.borrow().clone()
    }

    fn eval(&self, body: &str) -> Result<Dynamic, ScriptError> {
        let mut scope = Scope::new();
        for (name, value) in self.variables.borrow().iter() {
            scope.push_dynamic(name.clone(), value_to_dynamic(value));
        }
        self.engine
            .eval_with_scope::<Dynamic>(&mut scope, body)
            .map_err(|error| {
                ScriptError::new(
                    "EXPRESSION_EVAL_FAILED",
                    format!("Expression \"{}\" failed: {}", body, error),
                )
            })
    }
}

impl Default for RhaiExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator for RhaiExpressionEvaluator {
    fn evaluate(&self, body: &str) -> Result<String, ScriptError> {
        self.eval(body).map(|value| dynamic_to_text(&value))
    }

    fn assign(&self, name: &str, body: &str) -> Result<(), ScriptError> {
        if name.is_empty() || !name.chars().all(|ch| ch.is_alphanumeric() || ch == '_') {
            return Err(ScriptError::new(
                "EXPRESSION_VARIABLE_INVALID",
                format!("\"{}\" is not a valid variable name.", name),
            ));
        }
        let value = dynamic_to_value(self.eval(body)?)?;
        self.set_variable(name, value);
        Ok(())
    }

    fn evaluate_bool(&self, body: &str) -> Result<bool, ScriptError> {
        let value = self.eval(body)?;
        value.as_bool().map_err(|_| {
            ScriptError::new(
                "EXPRESSION_BOOLEAN_EXPECTED",
                format!("Expression \"{}\" must evaluate to boolean.", body),
            )
        })
    }
}

impl GameStateParticipant for RhaiExpressionEvaluator {
    fn save_game_state(&self, state: &mut StateMap) -> Result<(), ScriptError> {
        state.set(VARIABLES_STATE_KEY, &*self.variables.borrow())
    }

    fn load_game_state(&self, state: &StateMap) -> Result<(), ScriptError> {
        let variables = state
            .get::<BTreeMap<String, Value>>(VARIABLES_STATE_KEY)?
            .unwrap_or_default();
        *self.variables.borrow_mut() = variables;
        Ok(())
    }
}

fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(value) => Dynamic::from_bool(*value),
        Value::Number(number) => match number.as_i64() {
            Some(value) => Dynamic::from_int(value as INT),
            None => Dynamic::from_float(number.as_f64().unwrap_or_default() as FLOAT),
        },
        Value::String(value) => Dynamic::from(value.clone()),
        Value::Array(values) => Dynamic::from_array(values.iter().map(value_to_dynamic).collect()),
        Value::Object(values) => Dynamic::from_map(
            values
                .iter()
                .map(|(key, value)| (key.as_str().into(), value_to_dynamic(value)))
                .collect(),
        ),
    }
}

fn dynamic_to_value(value: Dynamic) -> Result<Value, ScriptError> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if value.is::<bool>() {
        return Ok(Value::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(Value::from(value.cast::<INT>() as i64));
    }
    if value.is::<FLOAT>() {
        return Ok(Value::from(value.cast::<FLOAT>() as f64));
    }
    if value.is::<ImmutableString>() {
        return Ok(Value::String(value.cast::<ImmutableString>().to_string()));
    }
    Err(ScriptError::new(
        "EXPRESSION_VALUE_UNSUPPORTED",
        format!("Unsupported variable value type \"{}\".", value.type_name()),
    ))
}

fn dynamic_to_text(value: &Dynamic) -> String {
    if value.is::<FLOAT>() {
        let number = value.clone().cast::<FLOAT>();
        if number.fract().abs() < FLOAT::EPSILON {
            return (number as i64).to_string();
        }
        return number.to_string();
    }
    if value.is_unit() {
        return String::new();
    }
    value.to_string()
}
