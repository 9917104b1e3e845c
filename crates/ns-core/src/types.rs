use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    /// Span over `start..end` byte columns of a zero-based line.
    pub fn on_line(line: usize, start: usize, end: usize) -> Self {
        Self {
            start: SourceLocation {
                line,
                column: start,
            },
            end: SourceLocation { line, column: end },
        }
    }
}

/// Origin of one command: script, zero-based line and position inside the line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSpot {
    pub script_name: String,
    pub line_index: usize,
    pub inline_index: usize,
}

impl PlaybackSpot {
    pub fn new(script_name: impl Into<String>, line_index: usize, inline_index: usize) -> Self {
        Self {
            script_name: script_name.into(),
            line_index,
            inline_index,
        }
    }

    /// Orders spots inside one script by `(line, inline)`.
    pub fn position(&self) -> (usize, usize) {
        (self.line_index, self.inline_index)
    }
}

impl fmt::Display for PlaybackSpot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}.{}",
            self.script_name,
            self.line_index + 1,
            self.inline_index
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spots_order_by_script_then_line_then_inline() {
        let mut spots = vec![
            PlaybackSpot::new("b", 0, 0),
            PlaybackSpot::new("a", 2, 1),
            PlaybackSpot::new("a", 2, 0),
            PlaybackSpot::new("a", 1, 5),
        ];
        spots.sort();
        assert_eq!(
            spots,
            vec![
                PlaybackSpot::new("a", 1, 5),
                PlaybackSpot::new("a", 2, 0),
                PlaybackSpot::new("a", 2, 1),
                PlaybackSpot::new("b", 0, 0),
            ]
        );
    }

    #[test]
    fn spot_serializes_camel_case() {
        let json = serde_json::to_string(&PlaybackSpot::new("main", 3, 1)).expect("serialize");
        assert_eq!(json, r#"{"scriptName":"main","lineIndex":3,"inlineIndex":1}"#);
        assert_eq!(PlaybackSpot::new("main", 3, 1).to_string(), "main#4.1");
    }
}
