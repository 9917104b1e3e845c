use std::sync::OnceLock;

use ns_core::{ScriptError, SourceSpan};
use regex::Regex;

use crate::model::{
    CommandModel, GenericContent, GenericPrefix, GenericTextModel, LexedLine, LineModel,
    ParameterModel, ValuePart,
};

fn generic_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^([\p{L}_][\p{L}\p{N}_]*)(?:\.([\p{L}\p{N}_-]+))?: ")
            .expect("generic prefix regex must compile")
    })
}

/// Splits into physical lines; `\r\n` and lone `\r` count as line breaks.
pub fn split_lines(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(str::to_string)
        .collect()
}

pub fn lex_document(text: &str) -> Vec<LexedLine> {
    split_lines(text)
        .iter()
        .enumerate()
        .map(|(line_index, line)| lex_line(line_index, line))
        .collect()
}

pub fn lex_line(line_index: usize, text: &str) -> LexedLine {
    let mut lexer = LineLexer {
        line_index,
        errors: Vec::new(),
    };
    let content = text.trim();
    let offset = text.len() - text.trim_start().len();

    let model = if content.is_empty() {
        LineModel::Empty
    } else if let Some(rest) = content.strip_prefix(';') {
        LineModel::Comment {
            text: rest.trim().to_string(),
        }
    } else if let Some(rest) = content.strip_prefix('#') {
        lexer.lex_label(rest, offset + 1)
    } else if let Some(rest) = content.strip_prefix('@') {
        LineModel::Command(lexer.lex_command(rest, offset + 1))
    } else {
        LineModel::GenericText(lexer.lex_generic_text(content, offset))
    };

    LexedLine {
        line_index,
        text: text.to_string(),
        model,
        errors: lexer.errors,
    }
}

struct LineLexer {
    line_index: usize,
    errors: Vec<ScriptError>,
}

impl LineLexer {
    fn error(&mut self, code: &str, message: impl Into<String>, start: usize, end: usize) {
        self.errors.push(ScriptError::with_span(
            code,
            message,
            SourceSpan::on_line(self.line_index, start, end),
        ));
    }

    fn lex_label(&mut self, rest: &str, base: usize) -> LineModel {
        let label = rest.trim();
        if label.is_empty() {
            self.error("PARSER_LABEL_EMPTY", "Label text is missing.", base, base);
        } else if label.contains(char::is_whitespace) {
            self.error(
                "PARSER_LABEL_INVALID",
                format!("Label \"{}\" must not contain whitespace.", label),
                base,
                base + rest.len(),
            );
        }
        LineModel::Label {
            label: label.to_string(),
        }
    }

    fn lex_command(&mut self, body: &str, base: usize) -> CommandModel {
        let identifier_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let identifier = &body[..identifier_end];
        if identifier.is_empty() {
            self.error(
                "PARSER_COMMAND_ID_MISSING",
                "Command identifier is missing.",
                base,
                base,
            );
        }

        let rest = &body[identifier_end..];
        let rest_base = base + identifier_end;
        let mut parameters = Vec::new();
        for (start, end) in tokenize(rest) {
            let first = parameters.is_empty();
            if let Some(parameter) = self.lex_parameter(&rest[start..end], rest_base + start, first)
            {
                parameters.push(parameter);
            }
        }

        CommandModel {
            identifier: identifier.to_string(),
            parameters,
            column: base,
        }
    }

    fn lex_parameter(&mut self, token: &str, column: usize, first: bool) -> Option<ParameterModel> {
        if let Some(separator) = find_unquoted(token, ':') {
            let name = &token[..separator];
            if is_identifier(name) {
                let source = &token[separator + 1..];
                if source.is_empty() {
                    self.error(
                        "PARSER_PARAMETER_VALUE_MISSING",
                        format!("Parameter \"{}\" has no value.", name),
                        column,
                        column + token.len(),
                    );
                    return None;
                }
                return Some(ParameterModel {
                    name: Some(name.to_string()),
                    value: self.lex_value(source, column + separator + 1, true),
                    column,
                });
            }
        }

        if let Some(name) = token.strip_suffix('!').filter(|name| is_identifier(name)) {
            return Some(flag_parameter(name, true, column));
        }
        if let Some(name) = token.strip_prefix('!').filter(|name| is_identifier(name)) {
            return Some(flag_parameter(name, false, column));
        }

        if !first {
            self.error(
                "PARSER_NAMELESS_NOT_FIRST",
                format!("Only the first parameter may be nameless: \"{}\".", token),
                column,
                column + token.len(),
            );
            return None;
        }
        Some(ParameterModel {
            name: None,
            value: self.lex_value(token, column, true),
            column,
        })
    }

    /// Splits a value into plain, identified (`text|#id|`) and `{expression}` parts.
    fn lex_value(&mut self, source: &str, base: usize, quotes_group: bool) -> Vec<ValuePart> {
        let mut parts = Vec::new();
        let mut plain = String::new();
        let mut plain_end = base;
        let mut index = 0usize;

        while let Some(ch) = source[index..].chars().next() {
            match ch {
                '\\' => {
                    let escaped_at = index + 1;
                    match source[escaped_at..].chars().next() {
                        Some(escaped) => {
                            plain.push(escaped);
                            index = escaped_at + escaped.len_utf8();
                        }
                        None => {
                            plain.push('\\');
                            index = escaped_at;
                        }
                    }
                    plain_end = base + index;
                }
                '"' if quotes_group => index += 1,
                '{' => {
                    flush_plain(&mut parts, &mut plain, plain_end);
                    match find_closing_brace(source, index) {
                        Some(close) => {
                            parts.push(ValuePart::Expression {
                                body: source[index + 1..close].trim().to_string(),
                            });
                            index = close + 1;
                        }
                        None => {
                            self.error(
                                "PARSER_EXPRESSION_UNCLOSED",
                                "Expression is missing closing \"}\".",
                                base + index,
                                base + source.len(),
                            );
                            plain.push_str(&source[index..]);
                            plain_end = base + source.len();
                            index = source.len();
                        }
                    }
                }
                '|' if source[index..].starts_with("|#") => {
                    let id_start = index + 2;
                    match source[id_start..].find('|') {
                        Some(relative) => {
                            let id_end = id_start + relative;
                            let id = source[id_start..id_end].trim();
                            if id.is_empty() {
                                self.error(
                                    "PARSER_TEXT_ID_EMPTY",
                                    "Text id marker is empty.",
                                    base + index,
                                    base + id_end + 1,
                                );
                            } else if plain.is_empty() {
                                self.error(
                                    "PARSER_TEXT_ID_ORPHAN",
                                    format!("Text id \"{}\" does not follow any text.", id),
                                    base + index,
                                    base + id_end + 1,
                                );
                            } else {
                                parts.push(ValuePart::Identified {
                                    text: std::mem::take(&mut plain),
                                    id: id.to_string(),
                                    end: plain_end,
                                });
                            }
                            index = id_end + 1;
                        }
                        None => {
                            self.error(
                                "PARSER_TEXT_ID_UNCLOSED",
                                "Text id marker is missing closing \"|\".",
                                base + index,
                                base + source.len(),
                            );
                            plain.push('|');
                            index += 1;
                            plain_end = base + index;
                        }
                    }
                }
                _ => {
                    plain.push(ch);
                    index += ch.len_utf8();
                    plain_end = base + index;
                }
            }
        }

        flush_plain(&mut parts, &mut plain, plain_end);
        parts
    }

    fn lex_generic_text(&mut self, content: &str, base: usize) -> GenericTextModel {
        let (prefix, body_start) = match generic_prefix_regex().captures(content) {
            Some(captures) => (
                Some(GenericPrefix {
                    author: captures[1].to_string(),
                    appearance: captures.get(2).map(|m| m.as_str().to_string()),
                }),
                captures.get(0).map_or(0, |m| m.end()),
            ),
            None => (None, 0),
        };

        let body = &content[body_start..];
        let body_base = base + body_start;
        let mut items = Vec::new();
        let mut run_start = 0usize;
        let mut index = 0usize;

        while let Some(ch) = body[index..].chars().next() {
            match ch {
                '\\' => {
                    index += 1;
                    if let Some(escaped) = body[index..].chars().next() {
                        index += escaped.len_utf8();
                    }
                }
                '{' => {
                    index = find_closing_brace(body, index).map_or(body.len(), |close| close + 1);
                }
                '[' => {
                    self.push_text_run(&mut items, &body[run_start..index], body_base + run_start);
                    match find_closing_bracket(body, index) {
                        Some(close) => {
                            let inner = &body[index + 1..close];
                            items.push(GenericContent::Command(
                                self.lex_command(inner.trim_end(), body_base + index + 1),
                            ));
                            index = close + 1;
                            run_start = index;
                        }
                        None => {
                            self.error(
                                "PARSER_INLINE_COMMAND_UNCLOSED",
                                "Inlined command is missing closing \"]\".",
                                body_base + index,
                                body_base + body.len(),
                            );
                            run_start = index;
                            index = body.len();
                        }
                    }
                }
                _ => index += ch.len_utf8(),
            }
        }
        self.push_text_run(&mut items, &body[run_start..], body_base + run_start);

        GenericTextModel {
            prefix,
            content: items,
        }
    }

    fn push_text_run(&mut self, items: &mut Vec<GenericContent>, source: &str, base: usize) {
        if source.trim().is_empty() {
            return;
        }
        let parts = self.lex_value(source, base, false);
        if !parts.is_empty() {
            items.push(GenericContent::Text(parts));
        }
    }
}

fn flag_parameter(name: &str, value: bool, column: usize) -> ParameterModel {
    ParameterModel {
        name: Some(name.to_string()),
        value: vec![ValuePart::synthetic(value.to_string())],
        column,
    }
}

fn flush_plain(parts: &mut Vec<ValuePart>, plain: &mut String, end: usize) {
    if plain.is_empty() {
        return;
    }
    parts.push(ValuePart::Plain {
        text: std::mem::take(plain),
        end,
    });
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
}

/// Byte ranges of whitespace-separated tokens; quotes and braces group.
fn tokenize(source: &str) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut escaped = false;
    let mut in_quotes = false;
    let mut depth = 0usize;

    for (index, ch) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if start.is_none() {
            if ch.is_whitespace() {
                continue;
            }
            start = Some(index);
        }
        match ch {
            '\\' => escaped = true,
            '"' if depth == 0 => in_quotes = !in_quotes,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ch if ch.is_whitespace() && !in_quotes && depth == 0 => {
                if let Some(token_start) = start.take() {
                    tokens.push((token_start, index));
                }
            }
            _ => {}
        }
    }
    if let Some(token_start) = start {
        tokens.push((token_start, source.len()));
    }
    tokens
}

fn find_unquoted(source: &str, target: char) -> Option<usize> {
    let mut escaped = false;
    let mut in_quotes = false;
    let mut depth = 0usize;
    for (index, ch) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' if depth == 0 => in_quotes = !in_quotes,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ch if ch == target && !in_quotes && depth == 0 => return Some(index),
            _ => {}
        }
    }
    None
}

fn find_closing_brace(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (index, ch) in source[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + index);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_closing_bracket(source: &str, open: usize) -> Option<usize> {
    let mut escaped = false;
    let mut in_quotes = false;
    let mut depth = 0usize;
    for (index, ch) in source[open + 1..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' if depth == 0 => in_quotes = !in_quotes,
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ']' if !in_quotes && depth == 0 => return Some(open + 1 + index),
            _ => {}
        }
    }
    None
}
