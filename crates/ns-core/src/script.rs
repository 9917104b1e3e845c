use std::collections::BTreeMap;
use std::rc::Rc;

use crate::command::Command;
use crate::value::TextMap;

#[derive(Debug, Clone)]
pub enum ScriptLineKind {
    Empty,
    Comment {
        text: String,
    },
    Label {
        label: String,
    },
    /// `None` when the command failed to compile; the failure is reported as a diagnostic.
    Command {
        command: Option<Rc<dyn Command>>,
    },
    GenericText {
        author: Option<String>,
        commands: Vec<Rc<dyn Command>>,
    },
}

#[derive(Debug, Clone)]
pub struct ScriptLine {
    pub line_index: usize,
    pub line_hash: String,
    pub kind: ScriptLineKind,
}

impl ScriptLine {
    pub fn commands(&self) -> Vec<Rc<dyn Command>> {
        match &self.kind {
            ScriptLineKind::Command {
                command: Some(command),
            } => vec![Rc::clone(command)],
            ScriptLineKind::GenericText { commands, .. } => commands.clone(),
            _ => Vec::new(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            ScriptLineKind::Label { label } => Some(label),
            _ => None,
        }
    }
}

/// Compiled, immutable script document.
#[derive(Debug, Clone)]
pub struct Script {
    name: String,
    lines: Vec<ScriptLine>,
    text_map: TextMap,
    text_revision: u64,
    labels: BTreeMap<String, usize>,
}

impl Script {
    pub fn new(
        name: impl Into<String>,
        lines: Vec<ScriptLine>,
        text_map: TextMap,
        text_revision: u64,
    ) -> Self {
        let mut labels = BTreeMap::new();
        for line in &lines {
            if let Some(label) = line.label() {
                labels.entry(label.to_string()).or_insert(line.line_index);
            }
        }
        Self {
            name: name.into(),
            lines,
            text_map,
            text_revision,
            labels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn line(&self, line_index: usize) -> Option<&ScriptLine> {
        self.lines.get(line_index)
    }

    pub fn text_map(&self) -> &TextMap {
        &self.text_map
    }

    pub fn text_revision(&self) -> u64 {
        self.text_revision
    }

    /// Every executable command in document order, inlined ones expanded.
    pub fn extract_commands(&self) -> Vec<Rc<dyn Command>> {
        self.lines.iter().flat_map(ScriptLine::commands).collect()
    }

    pub fn get_line_index_for_label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn label_exists(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    pub fn find_line(&self, predicate: impl Fn(&ScriptLine) -> bool) -> Option<&ScriptLine> {
        self.lines.iter().find(|line| predicate(line))
    }

    pub fn find_lines(&self, predicate: impl Fn(&ScriptLine) -> bool) -> Vec<&ScriptLine> {
        self.lines.iter().filter(|line| predicate(line)).collect()
    }

    pub fn get_comment(&self, line_index: usize) -> Option<&str> {
        match &self.lines.get(line_index)?.kind {
            ScriptLineKind::Comment { text } => Some(text),
            _ => None,
        }
    }
}
