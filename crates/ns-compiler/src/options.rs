use ns_core::{Diagnostic, Script};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Runtime-only script: every text gets a volatile id, explicit ids are ignored.
    pub transient: bool,
    /// Assign persistent ids to text that has none.
    pub stable_identification: bool,
    /// Last revision used for generated ids of this script.
    pub text_revision: u64,
}

/// Id generated for a text run that had none; `column` is where `|#id|` belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTextId {
    pub line_index: usize,
    pub column: usize,
    pub id: String,
}

#[derive(Debug, Clone)]
pub struct ScriptParseResult {
    pub script: Script,
    pub diagnostics: Vec<Diagnostic>,
    pub generated_ids: Vec<GeneratedTextId>,
}

impl ScriptParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}
