use std::fmt::Display;

use ns_core::ScriptError;

fn map_error(code: &'static str, error: impl Display) -> ScriptError {
    ScriptError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: ScriptError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!("ERROR_MSG_JSON:{}", json_string(&error.message));
    1
}

pub(crate) fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn map_cli_io(error: std::io::Error) -> ScriptError {
    map_error("CLI_IO", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> ScriptError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_source_write(error: std::io::Error) -> ScriptError {
    map_error("CLI_SOURCE_WRITE", error)
}

pub(crate) fn map_cli_config_read(error: std::io::Error) -> ScriptError {
    map_error("CLI_CONFIG_READ", error)
}

pub(crate) fn map_cli_config_invalid(error: serde_json::Error) -> ScriptError {
    map_error("CLI_CONFIG_INVALID", error)
}

pub(crate) fn map_cli_state_write(error: std::io::Error) -> ScriptError {
    map_error("CLI_STATE_WRITE", error)
}

pub(crate) fn map_cli_state_read(error: std::io::Error) -> ScriptError {
    map_error("CLI_STATE_READ", error)
}

pub(crate) fn map_cli_state_invalid(error: serde_json::Error) -> ScriptError {
    map_error("CLI_STATE_INVALID", error)
}
