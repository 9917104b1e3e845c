use std::fs;

use ns_api::{
    compile_project_from_map, compile_scripts_from_map, script_name_from_path, CompiledProject,
};
use ns_commands::builtin_registry;
use ns_compiler::{rewrite_with_generated_ids, serialize_script, ParseOptions};
use ns_core::{Diagnostic, ScriptError};
use tracing::info;

use crate::{json_string, map_cli_source_write, CliConfig, LoadedScenario};

pub(crate) fn diagnostic_line(diagnostic: &Diagnostic) -> String {
    format!(
        "DIAG:{}|{}|{}|{}|{}",
        diagnostic.severity,
        diagnostic.script_name,
        diagnostic.line_index,
        diagnostic.error.code,
        json_string(&diagnostic.error.message)
    )
}

/// Returns the exit code and the report lines.
pub(crate) fn check_scenario(scenario: &LoadedScenario, config: &CliConfig) -> (i32, Vec<String>) {
    let project = compile_scripts_from_map(&scenario.sources, &builtin_registry(), &config.parser);
    let mut lines = Vec::new();
    let code = if project.has_errors() {
        lines.push("RESULT:ERROR".to_string());
        lines.push("ERROR_CODE:CLI_CHECK_FAILED".to_string());
        1
    } else {
        lines.push("RESULT:OK".to_string());
        0
    };
    lines.push(format!("SCRIPTS:{}", project.scripts.len()));
    lines.extend(project.diagnostics.iter().map(diagnostic_line));
    (code, lines)
}

pub(crate) fn dump_script(
    scenario: &LoadedScenario,
    config: &CliConfig,
    script_name: &str,
) -> Result<Vec<String>, ScriptError> {
    let project = compile_project_from_map(&scenario.sources, &config.parser)?;
    let script = project.scripts.get(script_name).ok_or_else(|| {
        ScriptError::new(
            "CLI_SCRIPT_NOT_FOUND",
            format!("Script \"{}\" is not in the scripts dir.", script_name),
        )
    })?;

    let mut lines = vec!["RESULT:OK".to_string(), format!("SCRIPT:{}", script.name())];
    lines.extend(
        serialize_script(script)
            .lines()
            .map(|line| format!("LINE_JSON:{}", json_string(line))),
    );
    Ok(lines)
}

fn identify_project(
    scenario: &LoadedScenario,
    config: &CliConfig,
) -> Result<CompiledProject, ScriptError> {
    let options = ParseOptions {
        stable_identification: true,
        ..config.parser.clone()
    };
    compile_project_from_map(&scenario.sources, &options)
}

/// Reports generated ids per script; `write` rewrites the sources that got any.
pub(crate) fn identify_scenario(
    scenario: &LoadedScenario,
    config: &CliConfig,
    write: bool,
) -> Result<Vec<String>, ScriptError> {
    let project = identify_project(scenario, config)?;
    let mut lines = vec!["RESULT:OK".to_string()];
    for (key, source) in &scenario.sources {
        let name = script_name_from_path(key);
        let Some(generated) = project.generated_ids.get(&name) else {
            continue;
        };
        lines.push(format!("IDENTIFIED:{}|{}", name, generated.len()));
        if write {
            let rewritten = rewrite_with_generated_ids(source, generated);
            fs::write(scenario.root.join(key), rewritten).map_err(map_cli_source_write)?;
            info!(script = %name, count = generated.len(), "wrote stable text ids");
            lines.push(format!("WROTE:{}", key));
        }
    }
    Ok(lines)
}
