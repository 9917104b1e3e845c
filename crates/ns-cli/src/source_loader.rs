use std::fs;
use std::path::{Path, PathBuf};

use ns_api::load_sources_from_dir;
use ns_core::ScriptError;

use crate::{
    map_cli_config_invalid, map_cli_config_read, map_cli_source_path, CliConfig, LoadedScenario,
};

pub(crate) fn load_source_by_scripts_dir(scripts_dir: &str) -> Result<LoadedScenario, ScriptError> {
    let root = resolve_scripts_dir(scripts_dir)?;
    let sources = load_sources_from_dir(&root)?;
    Ok(LoadedScenario {
        id: make_scripts_dir_scenario_id(&root),
        root,
        sources,
    })
}

pub(crate) fn resolve_scripts_dir(scripts_dir: &str) -> Result<PathBuf, ScriptError> {
    let path = PathBuf::from(scripts_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(ScriptError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(ScriptError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("scripts-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

pub(crate) fn make_scripts_dir_scenario_id(scripts_dir: &Path) -> String {
    format!("scripts-dir:{}", scripts_dir.display())
}

/// Missing path means defaults.
pub(crate) fn load_config(path: Option<&str>) -> Result<CliConfig, ScriptError> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(map_cli_config_read)?;
    serde_json::from_str(&raw).map_err(map_cli_config_invalid)
}
