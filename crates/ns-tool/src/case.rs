use ns_runtime::ScriptPlayerConfig;
use serde::{Deserialize, Serialize};

pub const TESTCASE_SCHEMA_V1: &str = "ns-tool-case.v1";
pub const TESTCASE_FILE_NAME: &str = "testcase.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default = "default_entry_script")]
    pub entry_script: String,
    #[serde(default)]
    pub player: ScriptPlayerConfig,
    /// Applied one per input wait; once exhausted every wait is continued.
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
}

fn default_entry_script() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TestAction {
    Continue,
    ToggleSkip,
    Save,
    Load,
    /// Zero-based line of the played script.
    Rewind { line_index: usize },
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::ToggleSkip => "toggleSkip",
            Self::Save => "save",
            Self::Load => "load",
            Self::Rewind { .. } => "rewind",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpectedEvent {
    Print {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
        text: String,
    },
    Character {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        appearance: Option<String>,
        #[serde(default = "default_visible")]
        visible: bool,
    },
    /// Playback stopped to wait for input.
    Wait,
    Error {
        code: String,
    },
    End,
}

fn default_visible() -> bool {
    true
}
