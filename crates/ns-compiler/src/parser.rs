use ns_core::{
    persistent_hex, CommandRegistry, Diagnostic, Script, ScriptError, ScriptLine, ScriptLineKind,
    TextMap,
};
use ns_parser::{lex_document, LexedLine, LineModel};
use tracing::debug;

use crate::identifier::TextIdentifier;
use crate::lines::{
    parse_command_line, parse_comment_line, parse_generic_text_line, parse_label_line,
    LineContext, ParseState,
};
use crate::options::{ParseOptions, ScriptParseResult};

/// Compiles script documents against a fixed command registry.
#[derive(Debug, Clone)]
pub struct ScriptParser {
    registry: CommandRegistry,
    options: ParseOptions,
}

impl ScriptParser {
    pub fn new(registry: CommandRegistry, options: ParseOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses a whole document. Never fails: problems become line diagnostics and the
    /// affected command is left out.
    pub fn parse_text(&self, script_name: &str, text: &str) -> ScriptParseResult {
        parse_script(&self.registry, script_name, text, &self.options)
    }
}

pub fn parse_script(
    registry: &CommandRegistry,
    script_name: &str,
    text: &str,
    options: &ParseOptions,
) -> ScriptParseResult {
    let lexed = lex_document(text);
    let mut state = ParseState {
        script_name,
        registry,
        identifier: TextIdentifier::new(options),
        text_map: TextMap::new(),
        generated_ids: Vec::new(),
        diagnostics: Vec::new(),
    };

    if !options.transient {
        register_explicit_ids(&mut state, &lexed);
    }

    let lines = lexed
        .iter()
        .map(|line| parse_line(&mut state, line))
        .collect::<Vec<_>>();

    debug!(
        script = script_name,
        lines = lines.len(),
        texts = state.text_map.len(),
        diagnostics = state.diagnostics.len(),
        "parsed script"
    );
    let script = Script::new(
        script_name,
        lines,
        state.text_map,
        state.identifier.revision(),
    );
    ScriptParseResult {
        script,
        diagnostics: state.diagnostics,
        generated_ids: state.generated_ids,
    }
}

fn register_explicit_ids(state: &mut ParseState<'_>, lexed: &[LexedLine]) {
    for line in lexed {
        for id in line.model.explicit_text_ids() {
            if state.identifier.register_existing(id) {
                continue;
            }
            LineContext::new(state, line.line_index).warning(ScriptError::new(
                "TEXT_ID_DUPLICATE",
                format!("Text id \"{}\" is used more than once.", id),
            ));
        }
    }
}

fn parse_line(state: &mut ParseState<'_>, lexed: &LexedLine) -> ScriptLine {
    for error in &lexed.errors {
        state.diagnostics.push(Diagnostic::error(
            state.script_name,
            lexed.line_index,
            error.clone(),
        ));
    }

    let mut ctx = LineContext::new(state, lexed.line_index);
    let kind = match &lexed.model {
        LineModel::Empty => ScriptLineKind::Empty,
        LineModel::Comment { text } => parse_comment_line(text),
        LineModel::Label { label } => parse_label_line(label),
        LineModel::Command(model) => parse_command_line(&mut ctx, model),
        LineModel::GenericText(model) => parse_generic_text_line(&mut ctx, model),
    };
    ScriptLine {
        line_index: lexed.line_index,
        line_hash: persistent_hex(lexed.text.trim()),
        kind,
    }
}
