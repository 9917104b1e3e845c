use ns_commands::builtin_registry;
use ns_core::{RawValue, RawValuePart, Script, ScriptLineKind, Severity};

use crate::{
    parse_script, rewrite_with_generated_ids, serialize_script, ParseOptions, ScriptParseResult,
    ScriptParser,
};

fn parse(text: &str) -> ScriptParseResult {
    parse_with("main", text, ParseOptions::default())
}

fn parse_with(name: &str, text: &str, options: ParseOptions) -> ScriptParseResult {
    ScriptParser::new(builtin_registry(), options).parse_text(name, text)
}

fn stable() -> ParseOptions {
    ParseOptions {
        stable_identification: true,
        ..ParseOptions::default()
    }
}

fn resolve(script: &Script, raw: &RawValue) -> String {
    raw.parts
        .iter()
        .map(|part| match part {
            RawValuePart::PlainText { text } => text.clone(),
            RawValuePart::IdentifiedText { id } => {
                script.text_map().get(id).unwrap_or_default().to_string()
            }
            RawValuePart::Expression { body } => format!("{{{}}}", body),
        })
        .collect()
}

/// Command kinds with their resolved parameters, in playback order.
fn describe(script: &Script) -> Vec<String> {
    script
        .extract_commands()
        .iter()
        .map(|command| {
            let base = command.base();
            let mut parameters = base
                .assignments
                .iter()
                .map(|assignment| format!("{}={}", assignment.id, resolve(script, &assignment.raw)))
                .collect::<Vec<_>>();
            parameters.sort();
            format!("{}({})", base.type_name, parameters.join(", "))
        })
        .collect()
}

fn error_codes(result: &ScriptParseResult) -> Vec<String> {
    result
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Error)
        .map(|diagnostic| diagnostic.error.code.clone())
        .collect()
}

#[test]
fn authored_line_compiles_to_single_waiting_print() {
    let result = parse("Alice: Hello!");
    assert!(result.diagnostics.is_empty());

    let line = result.script.line(0).expect("line should exist");
    let ScriptLineKind::GenericText { author, commands } = &line.kind else {
        panic!("expected generic text line");
    };
    assert_eq!(author.as_deref(), Some("Alice"));
    assert_eq!(commands.len(), 1);
    assert!(commands
        .iter()
        .all(|command| command.base().type_name != "ModifyCharacter"));
    assert_eq!(
        describe(&result.script),
        vec!["PrintText(author=Alice, text=Hello!, waitInput=true)"]
    );
}

#[test]
fn appearance_prefix_and_inline_wait_expand_in_order() {
    let result = parse("Alice.Happy: Hi[i] there");
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        describe(&result.script),
        vec![
            "ModifyCharacter(idAndAppearance=Alice.Happy, wait=false)",
            "PrintText(author=Alice, text=Hi, waitInput=true)",
            "PrintText(author=Alice, text= there, waitInput=true)",
        ]
    );
    let positions = result
        .script
        .extract_commands()
        .iter()
        .map(|command| command.spot().position())
        .collect::<Vec<_>>();
    assert_eq!(positions, vec![(0, 0), (0, 1), (0, 2)]);
}

#[test]
fn lines_with_text_end_waiting_unless_opted_out() {
    let result = parse("Hello[skipInput]\nHello[print World waitInput:false]\n[wait 1]");
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        describe(&result.script),
        vec![
            "PrintText(text=Hello)",
            "SkipInput()",
            "PrintText(text=Hello)",
            "PrintText(text=World, waitInput=false)",
            "WaitForInput()",
            "Wait(waitMode=1)",
        ]
    );
}

#[test]
fn repeated_input_waits_collapse_into_one() {
    let result = parse("Hello[i][i]\n[i][i]\nHi[print There waitInput:true][i]\nYo[i] there[i]");
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        describe(&result.script),
        vec![
            "PrintText(text=Hello, waitInput=true)",
            "WaitForInput()",
            "PrintText(text=Hi)",
            "PrintText(text=There, waitInput=true)",
            "PrintText(text=Yo, waitInput=true)",
            "PrintText(text= there, waitInput=true)",
        ]
    );
}

#[test]
fn command_positions_are_strictly_increasing() {
    let result = parse("; intro\n# Start\n@char Bob\nBob: One[i] two\n\n@goto .Start");
    let spots = result
        .script
        .extract_commands()
        .iter()
        .map(|command| command.spot().clone())
        .collect::<Vec<_>>();
    assert_eq!(spots.len(), 4);
    assert!(spots.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(result.script.get_line_index_for_label("Start"), Some(1));
    assert_eq!(result.script.get_comment(0), Some("intro"));
}

#[test]
fn binding_errors_are_line_scoped() {
    let result = parse(
        "@unknown\n@print\n@goto .Start foo:1\n@i Hello\n@print Hi text:Ho\n@print Hi waitInput:maybe\n@print Fine",
    );
    assert_eq!(
        error_codes(&result),
        vec![
            "COMMAND_NOT_FOUND",
            "PARAMETER_REQUIRED_MISSING",
            "PARAMETER_NOT_FOUND",
            "PARAMETER_NAMELESS_UNSUPPORTED",
            "PARAMETER_DUPLICATE",
            "PARAMETER_TYPE_MISMATCH",
        ]
    );
    let lines = result
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.line_index)
        .collect::<Vec<_>>();
    assert_eq!(lines, vec![0, 1, 2, 3, 4, 5]);

    assert_eq!(result.script.lines().len(), 7);
    assert_eq!(describe(&result.script), vec!["PrintText(text=Fine)"]);
    assert!(matches!(
        result.script.line(0).map(|line| &line.kind),
        Some(ScriptLineKind::Command { command: None })
    ));
}

#[test]
fn syntax_errors_surface_as_diagnostics() {
    let result = parse("#\n@print \"a\" b");
    assert_eq!(
        error_codes(&result),
        vec!["PARSER_LABEL_EMPTY", "PARSER_NAMELESS_NOT_FIRST"]
    );
}

#[test]
fn condition_and_wait_are_common_parameters() {
    let result = parse("@goto .End if:{score > 0} wait:false");
    assert!(result.diagnostics.is_empty());
    let commands = result.script.extract_commands();
    let base = commands[0].base();
    assert_eq!(base.condition.as_deref(), Some("score > 0"));
    assert_eq!(base.wait.static_value(), Some(&false));
}

#[test]
fn stable_identification_generates_missing_ids() {
    let source = "Hello\n@print \"World|#1|\"";
    let result = parse_with("main", source, stable());
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.generated_ids.len(), 1);
    assert_eq!(result.generated_ids[0].id, "2");
    assert_eq!(result.generated_ids[0].line_index, 0);
    assert_eq!(result.script.text_revision(), 2);

    let rewritten = rewrite_with_generated_ids(source, &result.generated_ids);
    assert_eq!(rewritten, "Hello|#2|\n@print \"World|#1|\"");

    let reparsed = parse_with(
        "main",
        &rewritten,
        ParseOptions {
            text_revision: result.script.text_revision(),
            ..stable()
        },
    );
    assert!(reparsed.generated_ids.is_empty());
    assert_eq!(reparsed.script.text_map().get("1"), Some("World"));
    assert_eq!(reparsed.script.text_map().get("2"), Some("Hello"));
}

#[test]
fn default_identification_is_volatile_and_per_occurrence() {
    let result = parse("Hi\nHi");
    assert!(result.generated_ids.is_empty());
    let ids = result
        .script
        .text_map()
        .iter()
        .map(|(id, _)| id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| id.starts_with('~')));
}

#[test]
fn transient_scripts_ignore_explicit_ids() {
    let options = ParseOptions {
        transient: true,
        ..stable()
    };
    let result = parse_with("temp", "Hello|#7|", options);
    assert!(result.generated_ids.is_empty());
    let (id, text) = result
        .script
        .text_map()
        .iter()
        .next()
        .expect("text should be mapped");
    assert!(id.starts_with('~'));
    assert_eq!(text, "Hello");
}

#[test]
fn duplicate_text_ids_warn_and_keep_first_text() {
    let result = parse_with("main", "A|#1|\nB|#1|", stable());
    assert!(error_codes(&result).is_empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    assert_eq!(result.diagnostics[0].error.code, "TEXT_ID_DUPLICATE");
    assert_eq!(result.diagnostics[0].line_index, 1);
    assert_eq!(result.script.text_map().get("1"), Some("A"));
}

#[test]
fn text_ids_differing_by_case_are_distinct() {
    let result = parse_with("main", "A|#1F|\nB|#1f|", stable());
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.script.text_map().get("1F"), Some("A"));
    assert_eq!(result.script.text_map().get("1f"), Some("B"));
}

#[test]
fn parsing_is_deterministic() {
    let source = "Alice: Hi {name}!\n@wait i1.5";
    let first = parse(source);
    let second = parse(source);
    assert_eq!(describe(&first.script), describe(&second.script));
    assert_eq!(first.script.text_map(), second.script.text_map());
    let hashes = |script: &Script| {
        script
            .lines()
            .iter()
            .map(|line| line.line_hash.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(hashes(&first.script), hashes(&second.script));
}

#[test]
fn line_hash_ignores_surrounding_whitespace() {
    let result = parse("  Hello  \nHello");
    let lines = result.script.lines();
    assert_eq!(lines[0].line_hash, lines[1].line_hash);
    assert_eq!(lines[0].line_hash.len(), 64);
}

#[test]
fn serialized_script_reparses_into_same_commands() {
    let source = [
        "; Intro",
        "# Start",
        "@set \"score = 1\"",
        "Alice.Happy: Hello, {name}! How are you?",
        "Narration with [i] pause.",
        "@goto .End if:{score > 0}",
        "# End",
        "@print \"Quoted \\\"text\\\" here\" waitInput!",
    ]
    .join("\n");
    let original = parse_with("main", &source, stable());
    assert!(original.diagnostics.is_empty(), "{:?}", original.diagnostics);

    let serialized = serialize_script(&original.script);
    let reparsed = parse_with("main", &serialized, stable());
    assert!(reparsed.diagnostics.is_empty(), "{}", serialized);
    assert!(reparsed.generated_ids.is_empty());
    assert_eq!(describe(&original.script), describe(&reparsed.script));
    assert_eq!(original.script.text_map(), reparsed.script.text_map());
    assert_eq!(reparsed.script.get_line_index_for_label("End"), Some(6));
}

#[test]
fn free_function_matches_parser() {
    let registry = builtin_registry();
    let result = parse_script(&registry, "main", "@stop", &ParseOptions::default());
    assert_eq!(describe(&result.script), vec!["Stop()"]);
}

#[test]
fn parse_options_deserialize_from_camel_case() {
    let options: ParseOptions =
        serde_json::from_str(r#"{"stableIdentification":true,"textRevision":4}"#)
            .expect("options should parse");
    assert!(options.stable_identification);
    assert!(!options.transient);
    assert_eq!(options.text_revision, 4);
}
