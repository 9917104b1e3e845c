use ns_core::ScriptError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuePart {
    /// `end` is the byte column right after the last source character of the run.
    Plain { text: String, end: usize },
    Identified { text: String, id: String, end: usize },
    Expression { body: String },
}

impl ValuePart {
    /// Plain part that does not originate from source text.
    pub fn synthetic(text: impl Into<String>) -> Self {
        Self::Plain {
            text: text.into(),
            end: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterModel {
    pub name: Option<String>,
    pub value: Vec<ValuePart>,
    pub column: usize,
}

impl ParameterModel {
    pub fn named(name: impl Into<String>, value: Vec<ValuePart>) -> Self {
        Self {
            name: Some(name.into()),
            value,
            column: 0,
        }
    }

    pub fn nameless(value: Vec<ValuePart>) -> Self {
        Self {
            name: None,
            value,
            column: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandModel {
    pub identifier: String,
    pub parameters: Vec<ParameterModel>,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericPrefix {
    pub author: String,
    pub appearance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericContent {
    Text(Vec<ValuePart>),
    Command(CommandModel),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTextModel {
    pub prefix: Option<GenericPrefix>,
    pub content: Vec<GenericContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineModel {
    Empty,
    Comment { text: String },
    Label { label: String },
    Command(CommandModel),
    GenericText(GenericTextModel),
}

impl LineModel {
    /// Explicit `|#id|` markers in source order.
    pub fn explicit_text_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        match self {
            Self::Command(command) => collect_command_ids(command, &mut ids),
            Self::GenericText(model) => {
                for content in &model.content {
                    match content {
                        GenericContent::Text(parts) => collect_part_ids(parts, &mut ids),
                        GenericContent::Command(command) => collect_command_ids(command, &mut ids),
                    }
                }
            }
            _ => {}
        }
        ids
    }
}

fn collect_command_ids<'a>(command: &'a CommandModel, ids: &mut Vec<&'a str>) {
    for parameter in &command.parameters {
        collect_part_ids(&parameter.value, ids);
    }
}

fn collect_part_ids<'a>(parts: &'a [ValuePart], ids: &mut Vec<&'a str>) {
    for part in parts {
        if let ValuePart::Identified { id, .. } = part {
            ids.push(id);
        }
    }
}

/// One classified physical line plus the syntax errors found on it.
#[derive(Debug, Clone, PartialEq)]
pub struct LexedLine {
    pub line_index: usize,
    pub text: String,
    pub model: LineModel,
    pub errors: Vec<ScriptError>,
}
