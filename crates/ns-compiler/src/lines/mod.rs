//! Line parsers: each turns one lexed line model into a compiled `ScriptLineKind`.

mod command;
mod generic_text;

pub(crate) use command::{build_command, parse_command_line, PendingCommand};
pub(crate) use generic_text::parse_generic_text_line;

use ns_core::{
    CommandRegistry, Diagnostic, PlaybackSpot, RawValue, RawValuePart, ScriptError, ScriptLineKind,
    SourceSpan, TextMap,
};
use ns_parser::ValuePart;
use tracing::warn;

use crate::identifier::{Identification, TextIdentifier};
use crate::options::GeneratedTextId;

/// Mutable state shared by every line of one document.
pub(crate) struct ParseState<'a> {
    pub script_name: &'a str,
    pub registry: &'a CommandRegistry,
    pub identifier: TextIdentifier,
    pub text_map: TextMap,
    pub generated_ids: Vec<GeneratedTextId>,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) struct LineContext<'s, 'a> {
    state: &'s mut ParseState<'a>,
    line_index: usize,
    ordinal: usize,
}

impl<'s, 'a> LineContext<'s, 'a> {
    pub fn new(state: &'s mut ParseState<'a>, line_index: usize) -> Self {
        Self {
            state,
            line_index,
            ordinal: 0,
        }
    }

    pub fn registry(&self) -> &'a CommandRegistry {
        self.state.registry
    }

    pub fn spot(&self, inline_index: usize) -> PlaybackSpot {
        PlaybackSpot::new(self.state.script_name, self.line_index, inline_index)
    }

    pub fn span(&self, column: usize) -> SourceSpan {
        SourceSpan::on_line(self.line_index, column, column)
    }

    pub fn error(&mut self, error: ScriptError) {
        self.state.diagnostics.push(Diagnostic::error(
            self.state.script_name,
            self.line_index,
            error,
        ));
    }

    pub fn warning(&mut self, error: ScriptError) {
        warn!(
            script = self.state.script_name,
            line = self.line_index + 1,
            code = %error.code,
            "{}",
            error.message
        );
        self.state.diagnostics.push(Diagnostic::warning(
            self.state.script_name,
            self.line_index,
            error,
        ));
    }

    /// Converts lexed parts into a raw value; localizable runs become identified text.
    pub fn to_raw(&mut self, parts: &[ValuePart], localizable: bool) -> RawValue {
        let mut raw = Vec::with_capacity(parts.len());
        for part in parts {
            let converted = match part {
                ValuePart::Plain { text, end } if localizable => {
                    let id = self.identify(text, None, *end);
                    RawValuePart::IdentifiedText { id }
                }
                ValuePart::Identified { text, id, end } if localizable => {
                    let id = self.identify(text, Some(id), *end);
                    RawValuePart::IdentifiedText { id }
                }
                ValuePart::Plain { text, .. } | ValuePart::Identified { text, .. } => {
                    RawValuePart::PlainText { text: text.clone() }
                }
                ValuePart::Expression { body } => RawValuePart::Expression { body: body.clone() },
            };
            raw.push(converted);
        }
        RawValue::new(raw)
    }

    fn identify(&mut self, text: &str, explicit: Option<&str>, end: usize) -> String {
        let ordinal = self.ordinal;
        self.ordinal += 1;
        let identification =
            self.state
                .identifier
                .identify(text, self.line_index, ordinal, explicit);
        if let Identification::Generated(id) = &identification {
            self.state.generated_ids.push(GeneratedTextId {
                line_index: self.line_index,
                column: end,
                id: id.clone(),
            });
        }
        let id = identification.id().to_string();
        self.state.text_map.insert(id.clone(), text);
        id
    }
}

pub(crate) fn parse_comment_line(text: &str) -> ScriptLineKind {
    ScriptLineKind::Comment {
        text: text.to_string(),
    }
}

pub(crate) fn parse_label_line(label: &str) -> ScriptLineKind {
    ScriptLineKind::Label {
        label: label.to_string(),
    }
}
