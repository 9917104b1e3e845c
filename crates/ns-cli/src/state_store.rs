use std::fs;
use std::path::Path;

use ns_core::ScriptError;

use crate::{
    map_cli_state_invalid, map_cli_state_read, map_cli_state_write, PlayerStateV1,
    PLAYER_STATE_SCHEMA,
};

pub(crate) fn save_player_state(path: &Path, state: &PlayerStateV1) -> Result<(), ScriptError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(map_cli_state_write)?;

    let payload = serde_json::to_string_pretty(state).map_err(map_cli_state_invalid)?;
    fs::write(path, payload).map_err(map_cli_state_write)
}

pub(crate) fn load_player_state(path: &Path) -> Result<PlayerStateV1, ScriptError> {
    if !path.exists() {
        return Err(ScriptError::new(
            "CLI_STATE_NOT_FOUND",
            format!("State file does not exist: {}", path.display()),
        ));
    }

    let raw = fs::read_to_string(path).map_err(map_cli_state_read)?;
    let state: PlayerStateV1 = serde_json::from_str(&raw).map_err(map_cli_state_invalid)?;

    if state.schema_version != PLAYER_STATE_SCHEMA {
        return Err(ScriptError::new(
            "CLI_STATE_SCHEMA",
            format!("Unsupported player state schema: {}", state.schema_version),
        ));
    }

    Ok(state)
}

#[cfg(test)]
mod state_store_tests {
    use super::*;
    use crate::cli_test_support::*;
    use ns_runtime::StateMap;

    fn sample_state() -> PlayerStateV1 {
        let mut game = StateMap::new();
        game.set("marker", &3).expect("set should pass");
        PlayerStateV1 {
            schema_version: PLAYER_STATE_SCHEMA.to_string(),
            scenario_id: "scripts-dir:/tmp/x".to_string(),
            entry_script: "main".to_string(),
            game,
            global: StateMap::new(),
        }
    }

    #[test]
    fn saved_state_loads_back() {
        let path = temp_path("state").join("nested").join("save.json");
        save_player_state(&path, &sample_state()).expect("save should pass");
        let loaded = load_player_state(&path).expect("load should pass");
        assert_eq!(loaded, sample_state());
    }

    #[test]
    fn load_rejects_missing_invalid_and_foreign_files() {
        let missing = temp_path("missing-state.json");
        assert_eq!(
            load_player_state(&missing).expect_err("missing").code,
            "CLI_STATE_NOT_FOUND"
        );

        let invalid = temp_path("invalid-state.json");
        write_file(&invalid, "not json");
        assert_eq!(
            load_player_state(&invalid).expect_err("invalid").code,
            "CLI_STATE_INVALID"
        );

        let foreign = temp_path("foreign-state.json");
        let mut state = sample_state();
        state.schema_version = "player-state.v3".to_string();
        save_player_state(&foreign, &state).expect("save should pass");
        assert_eq!(
            load_player_state(&foreign).expect_err("schema").code,
            "CLI_STATE_SCHEMA"
        );
    }
}
