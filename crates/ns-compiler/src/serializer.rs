use ns_core::{
    is_volatile_text_id, CommandBase, RawValue, RawValuePart, Script, ScriptLine, ScriptLineKind,
};
use ns_parser::split_lines;

use crate::options::GeneratedTextId;

/// Writes a compiled script back to source form.
///
/// Generic text lines are written as inline command runs, so the output re-parses into
/// the same commands rather than the same characters. Persistent text ids are kept as
/// `|#id|` markers; volatile ones are dropped.
pub fn serialize_script(script: &Script) -> String {
    script
        .lines()
        .iter()
        .map(|line| serialize_line(script, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_line(script: &Script, line: &ScriptLine) -> String {
    match &line.kind {
        ScriptLineKind::Empty | ScriptLineKind::Command { command: None } => String::new(),
        ScriptLineKind::Comment { text } if text.is_empty() => ";".to_string(),
        ScriptLineKind::Comment { text } => format!("; {}", text),
        ScriptLineKind::Label { label } => format!("# {}", label),
        ScriptLineKind::Command {
            command: Some(command),
        } => format!("@{}", serialize_command(script, command.base())),
        ScriptLineKind::GenericText { commands, .. } => commands
            .iter()
            .map(|command| format!("[{}]", serialize_command(script, command.base())))
            .collect(),
    }
}

fn serialize_command(script: &Script, base: &CommandBase) -> String {
    let mut out = base.alias.to_string();
    let nameless = base.assignments.iter().filter(|assignment| assignment.nameless);
    let named = base.assignments.iter().filter(|assignment| !assignment.nameless);
    for assignment in nameless.chain(named) {
        out.push(' ');
        if !assignment.nameless {
            out.push_str(&assignment.id);
            out.push(':');
        }
        out.push_str(&serialize_value(script, &assignment.raw));
    }
    out
}

fn serialize_value(script: &Script, raw: &RawValue) -> String {
    let mut body = String::new();
    let mut quote = raw.parts.is_empty();
    for part in &raw.parts {
        match part {
            RawValuePart::PlainText { text } => {
                quote |= needs_quotes(text);
                push_escaped(&mut body, text);
            }
            RawValuePart::IdentifiedText { id } => {
                let text = script.text_map().get(id).unwrap_or_default();
                quote |= needs_quotes(text);
                push_escaped(&mut body, text);
                if !is_volatile_text_id(id) {
                    body.push_str("|#");
                    body.push_str(id);
                    body.push('|');
                }
            }
            RawValuePart::Expression { body: expression } => {
                quote |= expression.chars().any(char::is_whitespace);
                body.push('{');
                body.push_str(expression);
                body.push('}');
            }
        }
    }
    if quote {
        format!("\"{}\"", body)
    } else {
        body
    }
}

fn needs_quotes(text: &str) -> bool {
    text.is_empty()
        || text.starts_with('!')
        || text.ends_with('!')
        || text.chars().any(|ch| ch.is_whitespace() || ch == ':')
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        if matches!(ch, '\\' | '"' | '{' | '}' | '[' | ']' | '|') {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Inserts `|#id|` markers for generated ids into the original document.
/// Line endings are normalized to `\n`.
pub fn rewrite_with_generated_ids(text: &str, generated: &[GeneratedTextId]) -> String {
    let mut lines = split_lines(text);
    let mut ordered = generated.iter().collect::<Vec<_>>();
    ordered.sort_by(|a, b| (b.line_index, b.column).cmp(&(a.line_index, a.column)));
    for entry in ordered {
        let Some(line) = lines.get_mut(entry.line_index) else {
            continue;
        };
        if entry.column > line.len() || !line.is_char_boundary(entry.column) {
            continue;
        }
        line.insert_str(entry.column, &format!("|#{}|", entry.id));
    }
    lines.join("\n")
}
