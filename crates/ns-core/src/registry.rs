use std::collections::BTreeMap;
use std::rc::Rc;

use crate::command::{Command, CommandInit};
use crate::error::ScriptError;
use crate::parameter::ParameterKind;

pub const WAIT_PARAMETER: &str = "wait";
pub const CONDITION_PARAMETER: &str = "if";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub id: &'static str,
    pub alias: Option<&'static str>,
    pub nameless: bool,
    pub required: bool,
    pub kind: ParameterKind,
    pub default: Option<&'static str>,
}

impl ParameterDescriptor {
    pub const fn new(id: &'static str, kind: ParameterKind) -> Self {
        Self {
            id,
            alias: None,
            nameless: false,
            required: false,
            kind,
            default: None,
        }
    }

    pub const fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub const fn nameless(mut self) -> Self {
        self.nameless = true;
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub fn matches(&self, name: &str) -> bool {
        self.id.eq_ignore_ascii_case(name)
            || self
                .alias
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
    }
}

/// Parameters accepted by every command.
pub const COMMON_PARAMETERS: &[ParameterDescriptor] = &[
    ParameterDescriptor::new(WAIT_PARAMETER, ParameterKind::Boolean),
    ParameterDescriptor::new(CONDITION_PARAMETER, ParameterKind::String),
];

pub type CommandFactory = fn(&CommandInit) -> Result<Rc<dyn Command>, ScriptError>;

#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub type_name: &'static str,
    pub alias: Option<&'static str>,
    pub default_wait: bool,
    pub parameters: &'static [ParameterDescriptor],
    pub factory: CommandFactory,
}

impl CommandDescriptor {
    /// Name written in scripts: the alias when present.
    pub fn script_name(&self) -> &'static str {
        self.alias.unwrap_or(self.type_name)
    }

    pub fn find_parameter(&self, name: &str) -> Option<&'static ParameterDescriptor> {
        self.parameters
            .iter()
            .chain(COMMON_PARAMETERS.iter())
            .find(|parameter| parameter.matches(name))
    }

    pub fn nameless_parameter(&self) -> Option<&'static ParameterDescriptor> {
        self.parameters.iter().find(|parameter| parameter.nameless)
    }
}

/// Command kinds known to the parser, looked up by type name or alias.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    descriptors: Vec<CommandDescriptor>,
    by_key: BTreeMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), ScriptError> {
        let keys = std::iter::once(descriptor.type_name)
            .chain(descriptor.alias)
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>();
        if let Some(key) = keys.iter().find(|key| self.by_key.contains_key(*key)) {
            return Err(ScriptError::new(
                "COMMAND_REGISTRY_DUPLICATE",
                format!("Command key \"{}\" is already registered.", key),
            ));
        }

        let index = self.descriptors.len();
        self.descriptors.push(descriptor);
        for key in keys {
            self.by_key.insert(key, index);
        }
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&CommandDescriptor> {
        self.by_key
            .get(&name.to_ascii_lowercase())
            .map(|index| &self.descriptors[*index])
    }

    pub fn descriptors(&self) -> &[CommandDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_factory(_: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Err(ScriptError::new("TEST", "not constructible"))
    }

    const SAMPLE_PARAMETERS: &[ParameterDescriptor] = &[
        ParameterDescriptor::new("text", ParameterKind::LocalizableText)
            .nameless()
            .required(),
        ParameterDescriptor::new("author", ParameterKind::String).alias("by"),
    ];

    fn sample(type_name: &'static str, alias: Option<&'static str>) -> CommandDescriptor {
        CommandDescriptor {
            type_name,
            alias,
            default_wait: true,
            parameters: SAMPLE_PARAMETERS,
            factory: failing_factory,
        }
    }

    #[test]
    fn resolve_is_case_insensitive_over_type_and_alias() {
        let mut registry = CommandRegistry::new();
        registry
            .register(sample("PrintText", Some("print")))
            .expect("register should pass");

        assert_eq!(
            registry.resolve("PRINT").map(|d| d.type_name),
            Some("PrintText")
        );
        assert_eq!(
            registry.resolve("printtext").map(|d| d.type_name),
            Some("PrintText")
        );
        assert!(registry.resolve("unknown").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut registry = CommandRegistry::new();
        registry
            .register(sample("PrintText", Some("print")))
            .expect("register should pass");
        let error = registry
            .register(sample("Print", None))
            .expect_err("alias collision");
        assert_eq!(error.code, "COMMAND_REGISTRY_DUPLICATE");
    }

    #[test]
    fn parameters_resolve_by_id_alias_and_common_set() {
        let descriptor = sample("PrintText", Some("print"));
        assert_eq!(descriptor.find_parameter("BY").map(|p| p.id), Some("author"));
        assert_eq!(descriptor.find_parameter("wait").map(|p| p.id), Some("wait"));
        assert_eq!(descriptor.find_parameter("if").map(|p| p.id), Some("if"));
        assert_eq!(descriptor.nameless_parameter().map(|p| p.id), Some("text"));
        assert_eq!(descriptor.script_name(), "print");
    }
}
