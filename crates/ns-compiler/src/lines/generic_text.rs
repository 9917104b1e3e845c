use ns_core::well_known::{
    MODIFY_CHARACTER_ALIAS, PRINT_AUTHOR_PARAMETER, PRINT_TEXT, PRINT_TEXT_ALIAS,
    PRINT_WAIT_INPUT_PARAMETER, SKIP_INPUT, WAIT_FOR_INPUT, WAIT_FOR_INPUT_ALIAS,
};
use ns_core::{ScriptLineKind, WAIT_PARAMETER};
use ns_parser::{GenericContent, GenericPrefix, GenericTextModel, ValuePart};

use super::{build_command, LineContext, PendingCommand};

/// Expands a generic text line into character, print and input commands.
pub(crate) fn parse_generic_text_line(
    ctx: &mut LineContext<'_, '_>,
    model: &GenericTextModel,
) -> ScriptLineKind {
    let author = model.prefix.as_ref().map(|prefix| prefix.author.clone());
    let mut pending = Vec::new();

    if let Some(GenericPrefix {
        author,
        appearance: Some(appearance),
    }) = &model.prefix
    {
        pending.push(
            PendingCommand::synthetic(MODIFY_CHARACTER_ALIAS)
                .with(
                    None,
                    vec![ValuePart::synthetic(format!("{}.{}", author, appearance))],
                )
                .with(Some(WAIT_PARAMETER), vec![ValuePart::synthetic("false")]),
        );
    }

    for content in &model.content {
        match content {
            GenericContent::Text(parts) => {
                let mut print = PendingCommand::synthetic(PRINT_TEXT_ALIAS).with(None, parts.clone());
                if let Some(author) = &author {
                    print.set(
                        Some(PRINT_AUTHOR_PARAMETER),
                        vec![ValuePart::synthetic(author.clone())],
                    );
                }
                pending.push(print);
            }
            GenericContent::Command(command) => {
                let command = PendingCommand::from_model(command);
                if command.parameters.is_empty()
                    && command.is_kind(ctx, WAIT_FOR_INPUT)
                    && fold_wait_into_print(ctx, &mut pending)
                {
                    continue;
                }
                pending.push(command);
            }
        }
    }
    close_line(ctx, &mut pending);

    let mut commands = Vec::with_capacity(pending.len());
    for command in &pending {
        if let Some(command) = build_command(ctx, command, commands.len()) {
            commands.push(command);
        }
    }
    ScriptLineKind::GenericText { author, commands }
}

/// `Hello[i]` waits through the print itself instead of a separate command.
/// An `[i]` right after a command that already waits is dropped.
fn fold_wait_into_print(ctx: &LineContext<'_, '_>, pending: &mut [PendingCommand]) -> bool {
    let Some(last) = pending.last_mut() else {
        return false;
    };
    if last.is_kind(ctx, WAIT_FOR_INPUT) {
        return true;
    }
    if !last.is_kind(ctx, PRINT_TEXT) {
        return false;
    }
    match last.assigned(ctx, PRINT_WAIT_INPUT_PARAMETER) {
        None => {
            last.set(
                Some(PRINT_WAIT_INPUT_PARAMETER),
                vec![ValuePart::synthetic("true")],
            );
            true
        }
        Some(value) => is_literal_true(value),
    }
}

/// A line that printed anything ends waiting for input unless it already does
/// or explicitly opts out with `[skipInput]`.
fn close_line(ctx: &LineContext<'_, '_>, pending: &mut Vec<PendingCommand>) {
    if !pending.iter().any(|command| command.is_kind(ctx, PRINT_TEXT)) {
        return;
    }
    let Some(last) = pending.last_mut() else {
        return;
    };
    if last.is_kind(ctx, WAIT_FOR_INPUT) || last.is_kind(ctx, SKIP_INPUT) {
        return;
    }
    if last.is_kind(ctx, PRINT_TEXT) {
        match last.assigned(ctx, PRINT_WAIT_INPUT_PARAMETER) {
            None => {
                last.set(
                    Some(PRINT_WAIT_INPUT_PARAMETER),
                    vec![ValuePart::synthetic("true")],
                );
                return;
            }
            Some(value) if is_literal_true(value) => return,
            Some(_) => {}
        }
    }
    pending.push(PendingCommand::synthetic(WAIT_FOR_INPUT_ALIAS));
}

fn is_literal_true(value: &[ValuePart]) -> bool {
    matches!(value, [ValuePart::Plain { text, .. }] if text.trim().eq_ignore_ascii_case("true"))
}
