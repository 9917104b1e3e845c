use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Playlist indexes played at least once, per script, stored as merged inclusive ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedScriptRegister {
    scripts: BTreeMap<String, Vec<(usize, usize)>>,
}

impl PlayedScriptRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, script_name: &str, index: usize) {
        let ranges = self.scripts.entry(script_name.to_string()).or_default();
        let position = ranges.partition_point(|(_, end)| end.saturating_add(1) < index);
        match ranges.get_mut(position) {
            Some((start, end)) if *start <= index.saturating_add(1) => {
                *start = (*start).min(index);
                *end = (*end).max(index);
                if let Some(&(next_start, next_end)) = ranges.get(position + 1) {
                    if next_start <= ranges[position].1 + 1 {
                        ranges[position].1 = ranges[position].1.max(next_end);
                        ranges.remove(position + 1);
                    }
                }
            }
            _ => ranges.insert(position, (index, index)),
        }
    }

    pub fn has_played(&self, script_name: &str, index: usize) -> bool {
        self.scripts.get(script_name).is_some_and(|ranges| {
            ranges
                .iter()
                .any(|(start, end)| (*start..=*end).contains(&index))
        })
    }

    /// Number of distinct indexes played in the script.
    pub fn played_count(&self, script_name: &str) -> usize {
        self.scripts.get(script_name).map_or(0, |ranges| {
            ranges.iter().map(|(start, end)| end - start + 1).sum()
        })
    }

    pub fn script_names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.scripts.clear();
    }
}
