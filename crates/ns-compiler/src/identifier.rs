use std::collections::BTreeSet;

use ns_core::{persistent_hex, VOLATILE_TEXT_ID_PREFIX};

use crate::options::ParseOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    /// Id written in the source.
    Existing(String),
    /// Content hash, regenerated on every parse.
    Volatile(String),
    /// Newly assigned persistent id.
    Generated(String),
}

impl Identification {
    pub fn id(&self) -> &str {
        match self {
            Self::Existing(id) | Self::Volatile(id) | Self::Generated(id) => id,
        }
    }
}

/// Per-occurrence volatile id: the same text at another position gets another id.
pub fn volatile_text_id(text: &str, line_index: usize, ordinal: usize) -> String {
    let digest = persistent_hex(&format!("{}:{}:{}", line_index, ordinal, text));
    format!("{}{}", VOLATILE_TEXT_ID_PREFIX, &digest[..16])
}

/// Assigns text ids within one document.
#[derive(Debug, Clone)]
pub struct TextIdentifier {
    transient: bool,
    generate: bool,
    revision: u64,
    existing: BTreeSet<String>,
}

impl TextIdentifier {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            transient: options.transient,
            generate: options.stable_identification,
            revision: options.text_revision,
            existing: BTreeSet::new(),
        }
    }

    /// Records an explicit id; returns `false` when it was already seen. Ids compare
    /// case-sensitively, like the keys of the script text map.
    pub fn register_existing(&mut self, id: &str) -> bool {
        self.existing.insert(id.to_string())
    }

    pub fn identify(
        &mut self,
        text: &str,
        line_index: usize,
        ordinal: usize,
        explicit: Option<&str>,
    ) -> Identification {
        if self.transient {
            return Identification::Volatile(volatile_text_id(text, line_index, ordinal));
        }
        if let Some(id) = explicit {
            return Identification::Existing(id.to_string());
        }
        if !self.generate {
            return Identification::Volatile(volatile_text_id(text, line_index, ordinal));
        }
        loop {
            self.revision += 1;
            let id = format!("{:x}", self.revision);
            if self.existing.insert(id.clone()) {
                return Identification::Generated(id);
            }
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
