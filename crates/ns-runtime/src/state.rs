use std::collections::BTreeMap;

use ns_core::{PlaybackSpot, ScriptError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Service state keyed by service name, stored as JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateMap {
    entries: BTreeMap<String, serde_json::Value>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), ScriptError> {
        let value = serde_json::to_value(value).map_err(|error| {
            ScriptError::new(
                "STATE_SERIALIZE_FAILED",
                format!("Failed to serialize state \"{}\": {}", key, error),
            )
        })?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ScriptError> {
        let Some(value) = self.entries.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|error| {
                ScriptError::new(
                    "STATE_DESERIALIZE_FAILED",
                    format!("Failed to deserialize state \"{}\": {}", key, error),
                )
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerSkipMode {
    /// Only commands already played in some session can be skipped.
    #[default]
    ReadOnly,
    Everything,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptPlayerConfig {
    pub skip_mode: PlayerSkipMode,
    pub auto_play_delay_secs: f32,
    pub auto_play_delay_per_char_secs: f32,
    pub preload_on_play: bool,
}

impl Default for ScriptPlayerConfig {
    fn default() -> Self {
        Self {
            skip_mode: PlayerSkipMode::ReadOnly,
            auto_play_delay_secs: 3.0,
            auto_play_delay_per_char_secs: 0.02,
            preload_on_play: true,
        }
    }
}

/// Per-save player state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPlayerGameState {
    pub playing: bool,
    pub executed_played_command: bool,
    pub waiting_for_input: bool,
    pub gosub_return_spots: Vec<PlaybackSpot>,
    pub playback_spot: Option<PlaybackSpot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPlayerSettings {
    pub skip_mode: PlayerSkipMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_map_stores_typed_values() {
        let mut state = StateMap::new();
        let saved = ScriptPlayerGameState {
            playing: true,
            playback_spot: Some(PlaybackSpot::new("main", 2, 1)),
            ..ScriptPlayerGameState::default()
        };
        state.set("player", &saved).expect("set should pass");
        assert_eq!(
            state.get::<ScriptPlayerGameState>("player").expect("get should pass"),
            Some(saved)
        );
        assert_eq!(state.get::<bool>("missing").expect("get should pass"), None);
    }

    #[test]
    fn mismatched_state_type_is_reported() {
        let mut state = StateMap::new();
        state.set("player", &"text").expect("set should pass");
        let error = state
            .get::<ScriptPlayerGameState>("player")
            .expect_err("type mismatch");
        assert_eq!(error.code, "STATE_DESERIALIZE_FAILED");
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: ScriptPlayerConfig =
            serde_json::from_str(r#"{"skipMode":"everything"}"#).expect("config should parse");
        assert_eq!(config.skip_mode, PlayerSkipMode::Everything);
        assert!(config.preload_on_play);
        assert_eq!(config.auto_play_delay_secs, 3.0);
    }
}
