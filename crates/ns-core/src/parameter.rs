use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::CommandContext;
use crate::error::ScriptError;
use crate::value::RawValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    String,
    LocalizableText,
    Integer,
    Decimal,
    Boolean,
    NamedString,
    StringList,
    DecimalList,
}

/// `name.value` pair; the value part is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedString {
    pub name: String,
    pub value: Option<String>,
}

impl fmt::Display for NamedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}.{}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Text shown to the player; always sourced from the script text map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizableText(pub String);

pub trait ParameterValue: Clone + fmt::Debug + Sized + 'static {
    const KIND: ParameterKind;

    fn parse_value(text: &str) -> Result<Self, String>;
}

impl ParameterValue for String {
    const KIND: ParameterKind = ParameterKind::String;

    fn parse_value(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }
}

impl ParameterValue for LocalizableText {
    const KIND: ParameterKind = ParameterKind::LocalizableText;

    fn parse_value(text: &str) -> Result<Self, String> {
        Ok(Self(text.to_string()))
    }
}

impl ParameterValue for i32 {
    const KIND: ParameterKind = ParameterKind::Integer;

    fn parse_value(text: &str) -> Result<Self, String> {
        text.trim()
            .parse::<i32>()
            .map_err(|_| format!("\"{}\" is not an integer", text))
    }
}

impl ParameterValue for f32 {
    const KIND: ParameterKind = ParameterKind::Decimal;

    fn parse_value(text: &str) -> Result<Self, String> {
        text.trim()
            .parse::<f32>()
            .map_err(|_| format!("\"{}\" is not a decimal", text))
    }
}

impl ParameterValue for bool {
    const KIND: ParameterKind = ParameterKind::Boolean;

    fn parse_value(text: &str) -> Result<Self, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(format!("\"{}\" is not a boolean", text)),
        }
    }
}

impl ParameterValue for NamedString {
    const KIND: ParameterKind = ParameterKind::NamedString;

    fn parse_value(text: &str) -> Result<Self, String> {
        let text = text.trim();
        Ok(match text.split_once('.') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: (!value.is_empty()).then(|| value.to_string()),
            },
            None => Self {
                name: text.to_string(),
                value: None,
            },
        })
    }
}

impl ParameterValue for Vec<String> {
    const KIND: ParameterKind = ParameterKind::StringList;

    fn parse_value(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split(',').map(|item| item.trim().to_string()).collect())
    }
}

impl ParameterValue for Vec<f32> {
    const KIND: ParameterKind = ParameterKind::DecimalList;

    fn parse_value(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        text.split(',').map(f32::parse_value).collect()
    }
}

/// Typed command parameter backed by the authored raw value.
///
/// Static values are parsed once when the command is built; dynamic ones
/// (expressions, localized text) are resolved against the context on every read.
#[derive(Debug, Clone)]
pub struct CommandParameter<T> {
    raw: Option<RawValue>,
    value: Option<T>,
}

impl<T> Default for CommandParameter<T> {
    fn default() -> Self {
        Self {
            raw: None,
            value: None,
        }
    }
}

impl<T: ParameterValue> CommandParameter<T> {
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn from_value(value: T) -> Self {
        Self {
            raw: None,
            value: Some(value),
        }
    }

    pub fn from_raw(raw: RawValue) -> Result<Self, ScriptError> {
        let value = match raw.plain_text() {
            Some(text) => Some(T::parse_value(&text).map_err(type_mismatch)?),
            None => None,
        };
        Ok(Self {
            raw: Some(raw),
            value,
        })
    }

    pub fn has_value(&self) -> bool {
        self.raw.is_some() || self.value.is_some()
    }

    pub fn is_dynamic(&self) -> bool {
        self.raw.as_ref().is_some_and(RawValue::is_dynamic)
    }

    pub fn raw(&self) -> Option<&RawValue> {
        self.raw.as_ref()
    }

    /// Static value when known without a context.
    pub fn static_value(&self) -> Option<&T> {
        if self.is_dynamic() {
            return None;
        }
        self.value.as_ref()
    }

    pub fn get(&self, ctx: &dyn CommandContext) -> Result<Option<T>, ScriptError> {
        match &self.raw {
            Some(raw) if raw.is_dynamic() => {
                let text = ctx.resolve_text(raw)?;
                T::parse_value(&text).map(Some).map_err(type_mismatch)
            }
            _ => Ok(self.value.clone()),
        }
    }

    pub fn get_or(&self, ctx: &dyn CommandContext, default: T) -> Result<T, ScriptError> {
        Ok(self.get(ctx)?.unwrap_or(default))
    }
}

fn type_mismatch(message: String) -> ScriptError {
    ScriptError::new("PARAMETER_TYPE_MISMATCH", message)
}

/// Raw values of one command keyed by parameter id, defaults included.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    values: BTreeMap<String, RawValue>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, raw: RawValue) {
        self.values.insert(id.into(), raw);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    pub fn raw(&self, id: &str) -> Option<&RawValue> {
        self.values.get(id)
    }

    pub fn take<T: ParameterValue>(&self, id: &str) -> Result<CommandParameter<T>, ScriptError> {
        match self.values.get(id) {
            Some(raw) => CommandParameter::from_raw(raw.clone()).map_err(|error| {
                ScriptError::new(
                    error.code,
                    format!("Parameter \"{}\": {}.", id, error.message),
                )
            }),
            None => Ok(CommandParameter::unassigned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_values_parse() {
        assert_eq!(i32::parse_value(" 42 "), Ok(42));
        assert_eq!(f32::parse_value("1.5"), Ok(1.5));
        assert_eq!(bool::parse_value("TRUE"), Ok(true));
        assert!(bool::parse_value("yes").is_err());
        assert!(i32::parse_value("x").is_err());
    }

    #[test]
    fn named_string_splits_on_first_dot() {
        let named = NamedString::parse_value("Alice.Happy").expect("named");
        assert_eq!(named.name, "Alice");
        assert_eq!(named.value.as_deref(), Some("Happy"));

        let label_only = NamedString::parse_value(".Start").expect("named");
        assert_eq!(label_only.name, "");
        assert_eq!(label_only.value.as_deref(), Some("Start"));
        assert_eq!(label_only.to_string(), ".Start");

        let name_only = NamedString::parse_value("Alice").expect("named");
        assert_eq!(name_only.value, None);
    }

    #[test]
    fn lists_split_on_commas() {
        assert_eq!(
            Vec::<String>::parse_value("a, b,c"),
            Ok(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(Vec::<f32>::parse_value("0.5,1"), Ok(vec![0.5, 1.0]));
        assert_eq!(Vec::<f32>::parse_value(""), Ok(Vec::new()));
        assert!(Vec::<f32>::parse_value("a,1").is_err());
    }

    #[test]
    fn static_parameters_parse_once() {
        let parameter = CommandParameter::<bool>::from_raw(RawValue::plain("false")).expect("bool");
        assert!(parameter.has_value());
        assert!(!parameter.is_dynamic());
        assert_eq!(parameter.static_value(), Some(&false));

        let error = CommandParameter::<i32>::from_raw(RawValue::plain("nope")).expect_err("mismatch");
        assert_eq!(error.code, "PARAMETER_TYPE_MISMATCH");
    }

    #[test]
    fn unassigned_parameters_have_no_value() {
        let map = ParameterMap::new();
        let parameter = map.take::<String>("author").expect("take");
        assert!(!parameter.has_value());
        assert_eq!(parameter.static_value(), None);
    }
}
