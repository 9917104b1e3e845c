use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix of text ids that are derived from content and never persisted.
pub const VOLATILE_TEXT_ID_PREFIX: char = '~';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawValuePart {
    PlainText { text: String },
    IdentifiedText { id: String },
    Expression { body: String },
}

/// Unparsed parameter value as authored, split into ordered parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    pub parts: Vec<RawValuePart>,
}

impl RawValue {
    pub fn new(parts: Vec<RawValuePart>) -> Self {
        Self { parts }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            parts: vec![RawValuePart::PlainText { text: text.into() }],
        }
    }

    /// Values with expressions or localized text must be resolved at execution time.
    pub fn is_dynamic(&self) -> bool {
        self.parts
            .iter()
            .any(|part| !matches!(part, RawValuePart::PlainText { .. }))
    }

    pub fn plain_text(&self) -> Option<String> {
        if self.is_dynamic() {
            return None;
        }
        let mut out = String::new();
        for part in &self.parts {
            if let RawValuePart::PlainText { text } = part {
                out.push_str(text);
            }
        }
        Some(out)
    }

    /// Concatenation of plain text and expression bodies, used for `if` gates.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                RawValuePart::PlainText { text } => out.push_str(text),
                RawValuePart::Expression { body } => out.push_str(body),
                RawValuePart::IdentifiedText { id } => out.push_str(id),
            }
        }
        out
    }

    pub fn text_ids(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            RawValuePart::IdentifiedText { id } => Some(id.as_str()),
            _ => None,
        })
    }
}

pub fn is_volatile_text_id(id: &str) -> bool {
    id.starts_with(VOLATILE_TEXT_ID_PREFIX)
}

/// Localizable source text of one script keyed by text id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMap {
    entries: BTreeMap<String, String>,
}

impl TextMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts unless the id is already mapped; the first-seen text wins.
    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) -> bool {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, text.into());
        true
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, text)| (id.as_str(), text.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_value_dynamic_detection() {
        assert!(!RawValue::plain("hi").is_dynamic());
        assert_eq!(RawValue::plain("hi").plain_text().as_deref(), Some("hi"));

        let dynamic = RawValue::new(vec![
            RawValuePart::PlainText {
                text: "score=".to_string(),
            },
            RawValuePart::Expression {
                body: "score".to_string(),
            },
        ]);
        assert!(dynamic.is_dynamic());
        assert_eq!(dynamic.plain_text(), None);
        assert_eq!(dynamic.source_text(), "score=score");
    }

    #[test]
    fn text_map_keeps_first_seen_text() {
        let mut map = TextMap::new();
        assert!(map.insert("1", "first"));
        assert!(!map.insert("1", "second"));
        assert_eq!(map.get("1"), Some("first"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn volatile_ids_are_prefixed() {
        assert!(is_volatile_text_id("~abc"));
        assert!(!is_volatile_text_id("1f"));
    }
}
